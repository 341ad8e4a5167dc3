use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, SpeakerbaseError};

/// How the resolver scores a same-fingerprint candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Compare the incoming name against the candidate's stored name.
    #[default]
    Candidate,
    /// Compare the incoming name against itself. Any same-fingerprint
    /// candidate then matches, which is how the existing collection was built.
    Legacy,
}

impl FromStr for MatchMode {
    type Err = SpeakerbaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "candidate" => Ok(MatchMode::Candidate),
            "legacy" => Ok(MatchMode::Legacy),
            other => Err(SpeakerbaseError::Config(format!(
                "MATCH_MODE must be `candidate` or `legacy`, got `{other}`"
            ))),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Candidate => write!(f, "candidate"),
            MatchMode::Legacy => write!(f, "legacy"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Store
    pub mongo_uri: String,
    pub target_database: String,
    pub target_collection: String,

    // Vocabulary
    pub topic_mapping_path: PathBuf,

    // Batch writer
    pub batch_size: usize,
    pub store_timeout: Duration,
    pub write_retries: u32,
    pub retry_backoff: Duration,

    // Resolution
    pub match_mode: MatchMode,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mongo_uri: "mongodb://localhost:27017".to_string(),
            target_database: "speaker_database".to_string(),
            target_collection: "unified_speakers".to_string(),
            topic_mapping_path: PathBuf::from("config/topic_mapping.json"),
            batch_size: 1000,
            store_timeout: Duration::from_secs(30),
            write_retries: 3,
            retry_backoff: Duration::from_millis(500),
            match_mode: MatchMode::Candidate,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    /// Every variable has a default; malformed values are an error.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let batch_size: usize = parse_env("BATCH_SIZE", defaults.batch_size)?;
        if batch_size == 0 {
            return Err(SpeakerbaseError::Config("BATCH_SIZE must be positive".to_string()));
        }

        Ok(Self {
            mongo_uri: env::var("MONGO_URI").unwrap_or(defaults.mongo_uri),
            target_database: env::var("TARGET_DATABASE").unwrap_or(defaults.target_database),
            target_collection: env::var("TARGET_COLLECTION")
                .unwrap_or(defaults.target_collection),
            topic_mapping_path: env::var("TOPIC_MAPPING_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.topic_mapping_path),
            batch_size,
            store_timeout: Duration::from_secs(parse_env(
                "STORE_TIMEOUT_SECS",
                defaults.store_timeout.as_secs(),
            )?),
            write_retries: parse_env("WRITE_RETRIES", defaults.write_retries)?,
            retry_backoff: Duration::from_millis(parse_env(
                "RETRY_BACKOFF_MS",
                defaults.retry_backoff.as_millis() as u64,
            )?),
            match_mode: match env::var("MATCH_MODE") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.match_mode,
            },
        })
    }

    /// Log the effective configuration with store credentials masked.
    pub fn log_redacted(&self) {
        info!(
            mongo_uri = redact_uri(&self.mongo_uri).as_str(),
            canonical = format!("{}.{}", self.target_database, self.target_collection).as_str(),
            topic_mapping = %self.topic_mapping_path.display(),
            batch_size = self.batch_size,
            store_timeout_secs = self.store_timeout.as_secs(),
            write_retries = self.write_retries,
            match_mode = %self.match_mode,
            "Loaded configuration"
        );
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SpeakerbaseError::Config(format!("{key} must be a number, got `{raw}`"))),
        Err(_) => Ok(default),
    }
}

/// Replace the `user:password@` part of a connection URI.
fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{scheme}://***@{host}"),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_uri_masks_credentials() {
        assert_eq!(
            redact_uri("mongodb://admin:secret@db:27017/?authSource=admin"),
            "mongodb://***@db:27017/?authSource=admin"
        );
    }

    #[test]
    fn redact_uri_leaves_anonymous_uri_alone() {
        assert_eq!(redact_uri("mongodb://localhost:27017"), "mongodb://localhost:27017");
    }

    #[test]
    fn match_mode_parses_case_insensitively() {
        assert_eq!("Legacy".parse::<MatchMode>().unwrap(), MatchMode::Legacy);
        assert_eq!(" candidate ".parse::<MatchMode>().unwrap(), MatchMode::Candidate);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.target_collection, "unified_speakers");
        assert_eq!(config.match_mode, MatchMode::Candidate);
    }
}

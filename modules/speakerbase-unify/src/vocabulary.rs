//! Controlled topic vocabulary.
//!
//! The mapping table on disk is `{"Canonical Term": ["raw synonym", ...]}`.
//! It is loaded once, inverted into a raw → canonical lookup, and passed
//! explicitly to every transformer.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{info, warn};

use speakerbase_common::{NormalizedTopics, Result, SpeakerbaseError};

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Immutable raw → canonical topic lookup.
#[derive(Debug, Clone, Default)]
pub struct TopicVocabulary {
    reverse: HashMap<String, String>,
}

impl TopicVocabulary {
    /// Invert a canonical → synonyms table. Each canonical term also maps to
    /// itself. A synonym listed under several terms resolves to the
    /// lexicographically first term.
    pub fn from_table(table: BTreeMap<String, Vec<String>>) -> Self {
        let mut reverse: HashMap<String, String> = HashMap::new();
        for (canonical, synonyms) in &table {
            let canonical_clean = clean_topic(canonical);
            reverse
                .entry(canonical_clean.clone())
                .or_insert_with(|| canonical.clone());

            for raw in synonyms {
                let raw = clean_topic(raw);
                if raw.is_empty() {
                    continue;
                }
                match reverse.get(&raw) {
                    Some(existing) if existing != canonical => {
                        warn!(
                            raw = raw.as_str(),
                            kept = existing.as_str(),
                            ignored = canonical.as_str(),
                            "Synonym mapped to more than one canonical topic"
                        );
                    }
                    Some(_) => {}
                    None => {
                        reverse.insert(raw, canonical.clone());
                    }
                }
            }
        }
        Self { reverse }
    }

    /// Parse the JSON mapping table.
    pub fn from_json(raw: &str) -> Result<Self> {
        let table: BTreeMap<String, Vec<String>> = serde_json::from_str(raw)
            .map_err(|e| SpeakerbaseError::Vocabulary(format!("invalid mapping table: {e}")))?;
        Ok(Self::from_table(table))
    }

    /// Load the JSON mapping table from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SpeakerbaseError::Vocabulary(format!("read {}: {e}", path.display()))
        })?;
        let vocabulary = Self::from_json(&raw)?;
        info!(path = %path.display(), entries = vocabulary.len(), "Loaded topic vocabulary");
        Ok(vocabulary)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    /// Canonical form of an already-cleaned topic.
    pub fn lookup(&self, cleaned: &str) -> Option<&str> {
        self.reverse.get(cleaned).map(String::as_str)
    }

    /// Canonicalize raw topic labels. Mapped topics contribute their canonical
    /// form; unmapped ones are kept as cleaned text and also flagged in
    /// `unmapped`. Blank labels are dropped. Both sets are sorted.
    pub fn normalize<I, S>(&self, raw_topics: I) -> NormalizedTopics
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut topics = NormalizedTopics::default();
        for raw in raw_topics {
            let cleaned = clean_topic(raw.as_ref());
            if cleaned.is_empty() {
                continue;
            }
            match self.lookup(&cleaned) {
                Some(canonical) => {
                    topics.canonical.insert(canonical.to_string());
                }
                None => {
                    topics.canonical.insert(cleaned.clone());
                    topics.unmapped.insert(cleaned);
                }
            }
        }
        topics
    }
}

/// Collapse internal whitespace runs to one space and trim.
pub fn clean_topic(raw: &str) -> String {
    WHITESPACE.replace_all(raw, " ").trim().to_string()
}

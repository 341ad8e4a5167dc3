// Source transformers. One module per scraped source; each maps that source's
// document shape onto the canonical record and nothing else. Zero storage
// dependency: a transformer is a pure function of (document, vocabulary).

mod a_speakers;
mod allamerican;
mod bigspeak;
mod eventraptor;
mod freespeaker;
mod leading_authorities;
mod sessionize;
mod speaker_handbook;
mod speakerhub;

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sha1::{Digest, Sha1};
use tracing::debug;

use speakerbase_common::{CanonicalSpeaker, Result, SourceInfo, SpeakerbaseError};

use crate::vocabulary::TopicVocabulary;

/// The closed set of sources the pipeline knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    ASpeakers,
    AllAmerican,
    BigSpeak,
    EventRaptor,
    FreeSpeaker,
    LeadingAuthorities,
    Sessionize,
    SpeakerHub,
    SpeakerHandbook,
}

impl SourceKind {
    /// Processing order.
    pub const ALL: [SourceKind; 9] = [
        SourceKind::ASpeakers,
        SourceKind::AllAmerican,
        SourceKind::BigSpeak,
        SourceKind::EventRaptor,
        SourceKind::FreeSpeaker,
        SourceKind::LeadingAuthorities,
        SourceKind::Sessionize,
        SourceKind::SpeakerHub,
        SourceKind::SpeakerHandbook,
    ];

    /// Database holding the scraped documents.
    pub fn database(self) -> &'static str {
        match self {
            SourceKind::ASpeakers => "a_speakers",
            SourceKind::AllAmerican => "allamericanspeakers",
            SourceKind::BigSpeak => "bigspeak_scraper",
            SourceKind::EventRaptor => "eventraptor",
            SourceKind::FreeSpeaker => "freespeakerbureau_scraper",
            SourceKind::LeadingAuthorities => "leading_authorities",
            SourceKind::Sessionize => "sessionize_scraper",
            SourceKind::SpeakerHub => "speakerhub_scraper",
            SourceKind::SpeakerHandbook => "thespeakerhandbook_scraper",
        }
    }

    /// Collection within [`Self::database`].
    pub fn collection(self) -> &'static str {
        match self {
            SourceKind::ASpeakers
            | SourceKind::AllAmerican
            | SourceKind::EventRaptor => "speakers",
            SourceKind::BigSpeak
            | SourceKind::Sessionize
            | SourceKind::SpeakerHandbook => "speaker_profiles",
            SourceKind::FreeSpeaker => "speakers_profiles",
            SourceKind::LeadingAuthorities => "speakers_final_details",
            SourceKind::SpeakerHub => "speaker_details",
        }
    }

    /// Prefix hashed into every record id from this source. Changing one
    /// re-keys every record the source has ever produced.
    pub fn id_tag(self) -> &'static str {
        match self {
            SourceKind::ASpeakers => "a_speakers",
            SourceKind::AllAmerican => "allamerican",
            SourceKind::BigSpeak => "bigspeak",
            SourceKind::EventRaptor => "eventraptor",
            SourceKind::FreeSpeaker => "freespeaker",
            SourceKind::LeadingAuthorities => "leadingauth",
            SourceKind::Sessionize => "sessionize",
            SourceKind::SpeakerHub => "speakerhub",
            SourceKind::SpeakerHandbook => "tsh",
        }
    }

    /// Value written to `source_info.original_source`.
    pub fn original_source(self) -> &'static str {
        match self {
            SourceKind::ASpeakers => "a_speakers",
            SourceKind::AllAmerican => "allamericanspeakers",
            SourceKind::BigSpeak => "bigspeak",
            SourceKind::EventRaptor => "eventraptor",
            SourceKind::FreeSpeaker => "freespeakerbureau",
            SourceKind::LeadingAuthorities => "leadingauthorities",
            SourceKind::Sessionize => "sessionize",
            SourceKind::SpeakerHub => "speakerhub",
            SourceKind::SpeakerHandbook => "thespeakerhandbook",
        }
    }

    /// Map one raw document to a canonical record.
    pub fn transform(self, doc: &Value, vocab: &TopicVocabulary) -> Result<CanonicalSpeaker> {
        match self {
            SourceKind::ASpeakers => a_speakers::transform(doc, vocab),
            SourceKind::AllAmerican => allamerican::transform(doc, vocab),
            SourceKind::BigSpeak => bigspeak::transform(doc, vocab),
            SourceKind::EventRaptor => eventraptor::transform(doc, vocab),
            SourceKind::FreeSpeaker => freespeaker::transform(doc, vocab),
            SourceKind::LeadingAuthorities => leading_authorities::transform(doc, vocab),
            SourceKind::Sessionize => sessionize::transform(doc, vocab),
            SourceKind::SpeakerHub => speakerhub::transform(doc, vocab),
            SourceKind::SpeakerHandbook => speaker_handbook::transform(doc, vocab),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.database())
    }
}

// ---------------------------------------------------------------------------
// Shared extraction helpers
// ---------------------------------------------------------------------------

/// Hex SHA-1 of `"<tag>|<native id>"`.
pub fn record_id(tag: &str, native_id: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(tag.as_bytes());
    hasher.update(b"|");
    hasher.update(native_id.as_bytes());
    hex::encode(hasher.finalize())
}

/// Stringify an identifier value. ObjectIds arrive as `{"$oid": "..."}`.
pub(crate) fn native_id(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// The store's own primary key, stringified.
pub(crate) fn primary_key(doc: &Value) -> Option<String> {
    native_id(doc.get("_id"))
}

/// Identifier under `key`, or `MissingIdentifier`.
pub(crate) fn require_id(doc: &Value, key: &'static str, kind: SourceKind) -> Result<String> {
    native_id(doc.get(key)).ok_or(SpeakerbaseError::MissingIdentifier {
        source_name: kind.database(),
        field: key,
    })
}

/// String at a JSON pointer (`/basic_info/name`) or top-level key.
pub(crate) fn text(doc: &Value, path: &str) -> Option<String> {
    lookup(doc, path).and_then(Value::as_str).map(str::to_string)
}

/// First non-empty string among `paths`.
pub(crate) fn first_text(doc: &Value, paths: &[&str]) -> Option<String> {
    paths
        .iter()
        .filter_map(|p| lookup(doc, p).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Any non-null value, cloned as-is.
pub(crate) fn raw(doc: &Value, path: &str) -> Option<Value> {
    lookup(doc, path).filter(|v| !v.is_null()).cloned()
}

/// A list of strings. A bare string counts as a one-element list.
pub(crate) fn strings(doc: &Value, path: &str) -> Vec<String> {
    match lookup(doc, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

/// `field` of each object in a list (`[{"name": "AI"}, ...]`).
pub(crate) fn field_strings(doc: &Value, path: &str, field: &str) -> Vec<String> {
    match lookup(doc, path) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(map) => map.get(field).and_then(Value::as_str),
                Value::String(s) => Some(s.as_str()),
                _ => None,
            })
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn lookup<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    if path.starts_with('/') {
        doc.pointer(path)
    } else {
        doc.get(path)
    }
}

pub(crate) fn source_info(
    kind: SourceKind,
    source_url: Option<String>,
    scraped_at: Option<&Value>,
    source_id: Option<String>,
) -> SourceInfo {
    SourceInfo {
        original_source: kind.original_source().to_string(),
        source_url,
        scraped_at: safe_date(scraped_at),
        source_id,
    }
}

#[cfg(test)]
pub(crate) fn test_vocabulary() -> TopicVocabulary {
    TopicVocabulary::from_json(
        r#"{
            "Artificial Intelligence": ["AI", "Machine Learning"],
            "Leadership": ["Leading Teams", "Executive Leadership"]
        }"#,
    )
    .expect("test vocabulary")
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"];

/// Best-effort timestamp parse. Anything unparseable is unset, never an error.
pub(crate) fn safe_date(value: Option<&Value>) -> Option<DateTime<Utc>> {
    match value? {
        Value::String(raw) => parse_timestamp(raw),
        // Extended JSON: {"$date": "<rfc3339>"} or {"$date": {"$numberLong": "<ms>"}}
        Value::Object(map) => match map.get("$date")? {
            Value::String(raw) => parse_timestamp(raw),
            Value::Object(inner) => inner
                .get("$numberLong")
                .and_then(Value::as_str)
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(DateTime::from_timestamp_millis),
            Value::Number(ms) => ms.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return date.and_hms_opt(0, 0, 0).map(|ts| ts.and_utc());
        }
    }
    debug!(raw, "Unparseable timestamp, leaving unset");
    None
}

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Canonical speaker record
// ---------------------------------------------------------------------------

/// The unified, source-agnostic representation of one speaker.
///
/// `id` is a digest of `(source tag, source-native identifier)` and never
/// depends on mutable content, so re-ingesting the same source record always
/// lands on the same key. Optional fields serialize as `null` rather than being
/// dropped: "unset" is an explicit value in the canonical collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSpeaker {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub job_title: Option<String>,
    pub description: Option<String>,
    pub biography: Option<String>,
    pub tagline: Option<String>,
    pub location: Location,
    pub speaking_info: Option<SpeakingInfo>,
    pub topics: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub topics_unmapped: BTreeSet<String>,
    pub keynotes: Option<Value>,
    pub reviews: Option<Value>,
    pub ratings: Option<Value>,
    pub books: Option<Value>,
    pub media: Option<Media>,
    pub contact: Option<Contact>,
    pub source_info: SourceInfo,
    /// Stamped by the pipeline on insert. Never present on a merge, so a
    /// field-replacing update leaves the stored value alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Stamped by the pipeline on merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CanonicalSpeaker {
    /// A record carrying only its key and provenance. Transformers fill in
    /// whatever their source provides on top of this.
    pub fn new(id: String, source_info: SourceInfo) -> Self {
        Self {
            id,
            name: None,
            display_name: None,
            job_title: None,
            description: None,
            biography: None,
            tagline: None,
            location: Location::default(),
            speaking_info: None,
            topics: BTreeSet::new(),
            categories: BTreeSet::new(),
            topics_unmapped: BTreeSet::new(),
            keynotes: None,
            reviews: None,
            ratings: None,
            books: None,
            media: None,
            contact: None,
            source_info,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set `topics`, `categories` and `topics_unmapped` from one normalization pass.
    pub fn set_topics(&mut self, topics: NormalizedTopics) {
        self.categories = topics.canonical.clone();
        self.topics = topics.canonical;
        self.topics_unmapped = topics.unmapped;
    }

    pub fn city(&self) -> Option<&str> {
        self.location.city.as_deref()
    }
}

/// Output of topic canonicalization: every raw topic lands in `canonical`
/// (mapped or as-is); the ones with no vocabulary entry also land in `unmapped`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedTopics {
    pub canonical: BTreeSet<String>,
    pub unmapped: BTreeSet<String>,
}

// ---------------------------------------------------------------------------
// Substructures
// ---------------------------------------------------------------------------

/// Structured location. An empty location serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_location: Option<String>,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.full_location.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeakingInfo {
    pub fee_ranges: Option<Value>,
    pub languages: Option<Vec<String>>,
}

impl SpeakingInfo {
    /// `None` when the source supplied none of the fields.
    pub fn non_empty(self) -> Option<Self> {
        (self.fee_ranges.is_some() || self.languages.is_some()).then_some(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub profile_image: Option<String>,
    pub videos: Option<Value>,
}

impl Media {
    pub fn non_empty(self) -> Option<Self> {
        (self.profile_image.is_some() || self.videos.is_some()).then_some(self)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
}

impl Contact {
    pub fn non_empty(self) -> Option<Self> {
        (self.email.is_some() || self.phone.is_some() || self.website.is_some()).then_some(self)
    }
}

/// Provenance of a canonical record. Replaced wholesale on merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub original_source: String,
    pub source_url: Option<String>,
    pub scraped_at: Option<DateTime<Utc>>,
    pub source_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Store-facing types
// ---------------------------------------------------------------------------

/// One resolved write, produced per incoming record.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Overwrite every field of an existing entity except its `_id`.
    Merge {
        target_id: String,
        record: CanonicalSpeaker,
    },
    /// Insert keyed by the record's own `_id`; no-op if that key exists.
    InsertIfAbsent { record: CanonicalSpeaker },
}

impl WriteOp {
    /// The `_id` this op writes to.
    pub fn key(&self) -> &str {
        match self {
            WriteOp::Merge { target_id, .. } => target_id,
            WriteOp::InsertIfAbsent { record } => &record.id,
        }
    }
}

/// Per-op result of one applied batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub applied: usize,
    pub failed: usize,
}

/// The slice of a canonical record the identity index needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRow {
    pub id: String,
    pub name: Option<String>,
    pub city: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> SourceInfo {
        SourceInfo {
            original_source: "bigspeak".to_string(),
            source_url: None,
            scraped_at: None,
            source_id: Some("42".to_string()),
        }
    }

    #[test]
    fn empty_location_serializes_as_empty_object() {
        let json = serde_json::to_value(Location::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn unset_text_fields_serialize_as_null() {
        let record = CanonicalSpeaker::new("abc".to_string(), info());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], "abc");
        assert!(json["tagline"].is_null());
        assert!(json["ratings"].is_null());
        assert!(json.get("created_at").is_none(), "pipeline timestamps are omitted until set");
    }

    #[test]
    fn substructures_collapse_when_every_field_is_unset() {
        assert_eq!(Media::default().non_empty(), None);
        assert_eq!(Contact::default().non_empty(), None);
        assert_eq!(SpeakingInfo::default().non_empty(), None);

        let media = Media {
            profile_image: Some("https://img".to_string()),
            videos: None,
        };
        assert!(media.non_empty().is_some());
    }

    #[test]
    fn set_topics_mirrors_canonical_into_categories() {
        let mut record = CanonicalSpeaker::new("abc".to_string(), info());
        let topics = NormalizedTopics {
            canonical: ["Leadership".to_string(), "AI".to_string()].into(),
            unmapped: ["AI".to_string()].into(),
        };
        record.set_topics(topics);
        assert_eq!(record.topics, record.categories);
        assert_eq!(record.topics.iter().next().map(String::as_str), Some("AI"));
        assert_eq!(record.topics_unmapped.len(), 1);
    }
}

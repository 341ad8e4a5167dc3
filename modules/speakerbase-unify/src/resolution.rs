//! Merge-or-insert decision for each transformed record.
//!
//! Only same-fingerprint candidates are scored. A candidate scores the name
//! similarity (0-100) plus a bonus when both sides name the same city; the
//! first candidate scoring above the threshold is the match.

use speakerbase_common::{CanonicalSpeaker, MatchMode};
use tracing::debug;

use crate::identity::{fingerprint, IdentityIndex, IndexEntry};

/// Added when both records carry a city and the cities match case-insensitively.
pub const CITY_BONUS: f64 = 10.0;

/// A candidate must score strictly above this to match.
pub const MATCH_THRESHOLD: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Same person as an existing entity.
    Merge { existing_id: String },
    /// New entity, keyed by the record's own id.
    Insert,
}

/// Edit-distance similarity on a 0-100 scale, ignoring case.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) * 100.0
}

fn same_city(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => false,
    }
}

/// Owns the run's identity index and applies each decision to it.
pub struct Resolver {
    index: IdentityIndex,
    mode: MatchMode,
}

impl Resolver {
    pub fn new(index: IdentityIndex, mode: MatchMode) -> Self {
        Self { index, mode }
    }

    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }

    /// Decide merge vs insert. An insert is registered in the index right
    /// away so later records in the same run can merge against it.
    pub fn resolve(&mut self, record: &CanonicalSpeaker) -> Resolution {
        let key = fingerprint(record.name.as_deref());
        if key.is_empty() {
            return Resolution::Insert;
        }

        let matched = self
            .index
            .candidates(&key)
            .iter()
            .find(|candidate| self.score(record, candidate) > MATCH_THRESHOLD)
            .map(|candidate| candidate.id.clone());

        match matched {
            Some(existing_id) => {
                debug!(
                    id = record.id.as_str(),
                    existing_id = existing_id.as_str(),
                    "Matched existing speaker"
                );
                Resolution::Merge { existing_id }
            }
            None => {
                self.index.insert(
                    record.id.clone(),
                    record.name.clone(),
                    record.city().map(str::to_string),
                );
                Resolution::Insert
            }
        }
    }

    fn score(&self, record: &CanonicalSpeaker, candidate: &IndexEntry) -> f64 {
        let incoming = record.name.as_deref().unwrap_or_default();
        let other = match self.mode {
            MatchMode::Candidate => candidate.name.as_deref().unwrap_or_default(),
            MatchMode::Legacy => incoming,
        };

        let mut score = name_similarity(incoming, other);
        if same_city(record.city(), candidate.city.as_deref()) {
            score += CITY_BONUS;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use speakerbase_common::{Location, SourceInfo};

    use super::*;

    fn speaker(id: &str, name: &str, city: Option<&str>) -> CanonicalSpeaker {
        let mut record = CanonicalSpeaker::new(
            id.to_string(),
            SourceInfo {
                original_source: "test".to_string(),
                source_url: None,
                scraped_at: None,
                source_id: None,
            },
        );
        record.name = (!name.is_empty()).then(|| name.to_string());
        record.location = Location {
            city: city.map(str::to_string),
            ..Location::default()
        };
        record
    }

    #[test]
    fn same_name_same_city_merges_within_a_run() {
        let mut resolver = Resolver::new(IdentityIndex::new(), MatchMode::Candidate);

        let first = speaker("a1", "Jane Doe", Some("Austin"));
        assert_eq!(resolver.resolve(&first), Resolution::Insert);

        let second = speaker("b1", "Jane Doe", Some("austin"));
        assert_eq!(
            resolver.resolve(&second),
            Resolution::Merge { existing_id: "a1".to_string() }
        );

        let other = speaker("c1", "John Smith", Some("Austin"));
        assert_eq!(resolver.resolve(&other), Resolution::Insert);
        assert_eq!(resolver.index().len(), 2);
    }

    #[test]
    fn identical_names_merge_without_city() {
        let mut resolver = Resolver::new(IdentityIndex::new(), MatchMode::Candidate);
        resolver.resolve(&speaker("a1", "Jane Doe", None));
        assert_eq!(
            resolver.resolve(&speaker("b1", "Jane Doe", Some("Paris"))),
            Resolution::Merge { existing_id: "a1".to_string() }
        );
    }

    #[test]
    fn candidate_mode_rejects_punctuation_heavy_variants() {
        // "J.A.N.E. Doe" and "Jane Doe" share a fingerprint but are far apart
        // by edit distance.
        let mut resolver = Resolver::new(IdentityIndex::new(), MatchMode::Candidate);
        resolver.resolve(&speaker("a1", "Jane Doe", None));
        assert_eq!(
            resolver.resolve(&speaker("b1", "J.A.N.E. Doe", None)),
            Resolution::Insert
        );
    }

    #[test]
    fn legacy_mode_merges_any_fingerprint_collision() {
        let mut resolver = Resolver::new(IdentityIndex::new(), MatchMode::Legacy);
        resolver.resolve(&speaker("a1", "Jane Doe", None));
        assert_eq!(
            resolver.resolve(&speaker("b1", "J.A.N.E. Doe", None)),
            Resolution::Merge { existing_id: "a1".to_string() }
        );
    }

    #[test]
    fn city_bonus_can_lift_a_near_miss() {
        // 7 of 8 characters survive: similarity 87.5.
        let near = name_similarity("Jane Doe", "Jane-Doe");
        assert!(near > MATCH_THRESHOLD - CITY_BONUS && near <= MATCH_THRESHOLD);

        let mut resolver = Resolver::new(IdentityIndex::new(), MatchMode::Candidate);
        resolver.resolve(&speaker("a1", "Jane Doe", Some("Austin")));
        assert_eq!(
            resolver.resolve(&speaker("b1", "Jane-Doe", Some("Dallas"))),
            Resolution::Insert
        );
        assert_eq!(
            resolver.resolve(&speaker("c1", "Jane-Doe", Some("AUSTIN"))),
            Resolution::Merge { existing_id: "a1".to_string() }
        );
    }

    #[test]
    fn first_accepted_candidate_wins() {
        let index = IdentityIndex::from_rows(vec![
            speakerbase_common::IdentityRow {
                id: "old".to_string(),
                name: Some("Jane Doe".to_string()),
                city: None,
            },
            speakerbase_common::IdentityRow {
                id: "newer".to_string(),
                name: Some("Jane Doe".to_string()),
                city: Some("Austin".to_string()),
            },
        ]);
        let mut resolver = Resolver::new(index, MatchMode::Candidate);
        assert_eq!(
            resolver.resolve(&speaker("x", "Jane Doe", Some("Austin"))),
            Resolution::Merge { existing_id: "old".to_string() }
        );
    }

    #[test]
    fn nameless_records_always_insert_and_stay_unindexed() {
        let mut resolver = Resolver::new(IdentityIndex::new(), MatchMode::Legacy);
        assert_eq!(resolver.resolve(&speaker("n1", "", None)), Resolution::Insert);
        assert_eq!(resolver.resolve(&speaker("n2", "", None)), Resolution::Insert);
        assert!(resolver.index().is_empty());
    }
}

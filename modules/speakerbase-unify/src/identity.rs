//! Identity index: canonical entities bucketed by name fingerprint.
//!
//! Built once per run from the canonical collection and appended to as the
//! run inserts new entities. Never persisted; it is rebuilt from the store
//! every time.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use speakerbase_common::IdentityRow;

static NON_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z]").unwrap());

/// Lowercase the name and keep only `a-z`. Empty for a missing or letterless name.
pub fn fingerprint(name: Option<&str>) -> String {
    match name {
        Some(name) => NON_LETTER.replace_all(&name.to_lowercase(), "").into_owned(),
        None => String::new(),
    }
}

/// One indexed canonical entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: String,
    pub name: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Default)]
pub struct IdentityIndex {
    buckets: HashMap<String, Vec<IndexEntry>>,
    entries: usize,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every row with a non-empty fingerprint, in the order given.
    pub fn from_rows(rows: impl IntoIterator<Item = IdentityRow>) -> Self {
        let mut index = Self::new();
        for row in rows {
            index.insert(row.id, row.name, row.city);
        }
        index
    }

    /// Same-fingerprint entities, oldest first.
    pub fn candidates(&self, fingerprint: &str) -> &[IndexEntry] {
        self.buckets
            .get(fingerprint)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Register an entity. Nameless entities are not indexed; returns whether
    /// the entity was added.
    pub fn insert(&mut self, id: String, name: Option<String>, city: Option<String>) -> bool {
        let key = fingerprint(name.as_deref());
        if key.is_empty() {
            return false;
        }
        self.buckets
            .entry(key)
            .or_default()
            .push(IndexEntry { id, name, city });
        self.entries += 1;
        true
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, name: Option<&str>, city: Option<&str>) -> IdentityRow {
        IdentityRow {
            id: id.to_string(),
            name: name.map(str::to_string),
            city: city.map(str::to_string),
        }
    }

    #[test]
    fn fingerprint_keeps_only_lowercase_letters() {
        assert_eq!(fingerprint(Some("Dr. Jane O'Neil")), "drjaneoneil");
        assert_eq!(fingerprint(Some("jane oneil")), fingerprint(Some("Jane O'Neil")));
        assert_eq!(fingerprint(Some("  Jane   DOE ")), "janedoe");
    }

    #[test]
    fn fingerprint_of_missing_or_letterless_name_is_empty() {
        assert_eq!(fingerprint(None), "");
        assert_eq!(fingerprint(Some("")), "");
        assert_eq!(fingerprint(Some("123 - 456")), "");
    }

    #[test]
    fn fingerprint_drops_non_ascii_letters() {
        assert_eq!(fingerprint(Some("José Núñez")), "josnez");
    }

    #[test]
    fn from_rows_buckets_by_fingerprint_in_order() {
        let index = IdentityIndex::from_rows(vec![
            row("a", Some("Jane Doe"), Some("Austin")),
            row("b", Some("JANE DOE"), None),
            row("c", Some("John Smith"), None),
            row("d", None, Some("Austin")),
        ]);

        assert_eq!(index.len(), 3);
        let ids: Vec<_> = index.candidates("janedoe").iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(index.candidates("nobody").is_empty());
    }

    #[test]
    fn nameless_entities_are_not_indexed() {
        let mut index = IdentityIndex::new();
        assert!(!index.insert("x".to_string(), None, None));
        assert!(!index.insert("y".to_string(), Some("!!".to_string()), None));
        assert!(index.is_empty());
        assert!(index.candidates("").is_empty());
    }
}

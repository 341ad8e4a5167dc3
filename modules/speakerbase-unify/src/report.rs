//! Read-only diagnostics: what the sources hold before a run, and what the
//! canonical collection looks like after one.

use std::collections::HashMap;
use std::fmt;

use futures::StreamExt;
use serde_json::Value;
use tracing::warn;

use speakerbase_common::Result;
use speakerbase_store::DocumentStore;

use crate::sources::SourceKind;

const TOP_TOPICS: usize = 20;
const TOP_UNMAPPED: usize = 10;
const SAMPLES: usize = 3;

// ---------------------------------------------------------------------------
// Source inventory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    pub database: &'static str,
    pub configured: &'static str,
    /// Collection a run would scan, when one exists.
    pub resolved: Option<String>,
    pub documents: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SourceInventory {
    pub sources: Vec<SourceEntry>,
    pub canonical: u64,
}

impl SourceInventory {
    pub async fn collect(store: &dyn DocumentStore) -> Result<Self> {
        let mut sources = Vec::with_capacity(SourceKind::ALL.len());
        for kind in SourceKind::ALL {
            let resolved = store.resolve_source(kind.database(), kind.collection()).await?;
            let documents = match &resolved {
                Some(collection) => store.count_source(kind.database(), collection).await?,
                None => 0,
            };
            sources.push(SourceEntry {
                database: kind.database(),
                configured: kind.collection(),
                resolved,
                documents,
            });
        }
        Ok(Self {
            sources,
            canonical: store.count_canonical().await?,
        })
    }

    pub fn found(&self) -> usize {
        self.sources.iter().filter(|s| s.resolved.is_some()).count()
    }

    pub fn total_documents(&self) -> u64 {
        self.sources.iter().map(|s| s.documents).sum()
    }
}

impl fmt::Display for SourceInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Source Inventory ===")?;
        for source in &self.sources {
            match &source.resolved {
                Some(collection) if collection == source.configured => writeln!(
                    f,
                    "  ok   {:<28} {:>8} documents",
                    source.database, source.documents
                )?,
                Some(collection) => writeln!(
                    f,
                    "  ok   {:<28} {:>8} documents (using {collection})",
                    source.database, source.documents
                )?,
                None => writeln!(f, "  --   {:<28} NOT FOUND", source.database)?,
            }
        }
        writeln!(f, "\nFound:            {}/{}", self.found(), self.sources.len())?;
        writeln!(f, "Source documents: {}", self.total_documents())?;
        writeln!(f, "Unified speakers: {}", self.canonical)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Canonical collection report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: Option<String>,
    pub source: Option<String>,
    pub topics: Vec<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Accumulates quality metrics one canonical document at a time.
#[derive(Debug, Clone, Default)]
pub struct CanonicalReport {
    pub total: u64,
    pub by_source: HashMap<String, u64>,
    pub with_biography: u64,
    pub with_city: u64,
    pub with_topics: u64,
    pub with_image: u64,
    topics: HashMap<String, u64>,
    unmapped: HashMap<String, u64>,
    pub samples: Vec<Sample>,
}

impl CanonicalReport {
    pub async fn collect(store: &dyn DocumentStore) -> Result<Self> {
        let mut report = Self::default();
        let mut docs = store.scan_canonical().await?;
        while let Some(doc) = docs.next().await {
            match doc {
                Ok(doc) => report.observe(&doc),
                Err(e) => {
                    warn!(error = %e, "Canonical scan ended early");
                    break;
                }
            }
        }
        Ok(report)
    }

    pub fn observe(&mut self, doc: &Value) {
        self.total += 1;

        let source = non_empty(doc.pointer("/source_info/original_source"));
        *self
            .by_source
            .entry(source.unwrap_or("unknown").to_string())
            .or_default() += 1;

        if non_empty(doc.get("biography")).is_some() {
            self.with_biography += 1;
        }
        if non_empty(doc.pointer("/location/city")).is_some() {
            self.with_city += 1;
        }
        if non_empty(doc.pointer("/media/profile_image")).is_some() {
            self.with_image += 1;
        }

        let topics = string_list(doc.get("topics"));
        if !topics.is_empty() {
            self.with_topics += 1;
        }
        for topic in &topics {
            *self.topics.entry(topic.clone()).or_default() += 1;
        }
        for topic in string_list(doc.get("topics_unmapped")) {
            *self.unmapped.entry(topic).or_default() += 1;
        }

        if self.samples.len() < SAMPLES {
            self.samples.push(Sample {
                name: non_empty(doc.get("name")).map(str::to_string),
                source: source.map(str::to_string),
                topics: topics.into_iter().take(5).collect(),
                city: non_empty(doc.pointer("/location/city")).map(str::to_string),
                country: non_empty(doc.pointer("/location/country")).map(str::to_string),
            });
        }
    }

    /// Most frequent topics, ties broken alphabetically.
    pub fn top_topics(&self) -> Vec<(&str, u64)> {
        ranked(&self.topics, TOP_TOPICS)
    }

    pub fn top_unmapped(&self) -> Vec<(&str, u64)> {
        ranked(&self.unmapped, TOP_UNMAPPED)
    }

    fn percent(&self, n: u64) -> f64 {
        n as f64 / self.total.max(1) as f64 * 100.0
    }
}

impl fmt::Display for CanonicalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Standardization Verification ===")?;
        writeln!(f, "Total unified speakers: {}", self.total)?;

        writeln!(f, "\nSpeakers by source:")?;
        for (source, count) in ranked(&self.by_source, usize::MAX) {
            writeln!(f, "  {source:<30} {count:>8}")?;
        }

        writeln!(f, "\nData quality:")?;
        for (label, n) in [
            ("With biography:", self.with_biography),
            ("With location: ", self.with_city),
            ("With topics:   ", self.with_topics),
            ("With image:    ", self.with_image),
        ] {
            writeln!(f, "  {label} {n} ({:.1}%)", self.percent(n))?;
        }

        writeln!(f, "\nTop {TOP_TOPICS} topics:")?;
        for (topic, count) in self.top_topics() {
            writeln!(f, "  {topic:<30} {count:>6}")?;
        }

        writeln!(f, "\nTop unmapped topics:")?;
        for (topic, count) in self.top_unmapped() {
            writeln!(f, "  {topic:<30} {count:>6}")?;
        }

        writeln!(f, "\nSamples:")?;
        for (i, sample) in self.samples.iter().enumerate() {
            writeln!(f, "\n{}. {}", i + 1, sample.name.as_deref().unwrap_or("Unknown"))?;
            writeln!(f, "   Source: {}", sample.source.as_deref().unwrap_or("unknown"))?;
            writeln!(f, "   Topics: {}", sample.topics.join(", "))?;
            if let Some(city) = &sample.city {
                writeln!(f, "   Location: {city}, {}", sample.country.as_deref().unwrap_or("-"))?;
            }
        }
        Ok(())
    }
}

fn ranked(counts: &HashMap<String, u64>, limit: usize) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = counts.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    entries.truncate(limit);
    entries
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

// In-memory DocumentStore for tests. Mirrors the MongoDB semantics the
// pipeline relies on: `$set` merges, `$setOnInsert` upserts, batches applied
// in write rounds with per-op failures. No Docker, no network.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;

use speakerbase_common::{
    BatchOutcome, CanonicalSpeaker, IdentityRow, Result, SpeakerbaseError, WriteOp,
};

use crate::store::{speaker_fallback, write_rounds, DocStream, DocumentStore};

#[derive(Default)]
struct State {
    sources: BTreeMap<(String, String), Vec<Value>>,
    canonical: BTreeMap<String, Value>,
    batch_sizes: Vec<usize>,
    failing_batches: usize,
    rejected_ids: HashSet<String>,
    scan_failures: HashMap<(String, String), usize>,
    scan_stalls: HashMap<(String, String), usize>,
    reads: Arc<AtomicUsize>,
    cancel_trigger: Option<(Arc<AtomicBool>, usize)>,
    unreachable: bool,
    write_delay: Option<Duration>,
}

/// Stateful in-memory store. Builder methods seed sources and the canonical
/// collection; knobs inject the failures the pipeline must absorb.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a source collection.
    pub fn with_source(self, database: &str, collection: &str, docs: Vec<Value>) -> Self {
        self.add_source(database, collection, docs);
        self
    }

    pub fn add_source(&self, database: &str, collection: &str, docs: Vec<Value>) {
        let mut state = self.state.lock().unwrap();
        state
            .sources
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .extend(docs);
    }

    /// Seed an existing canonical record.
    pub fn with_canonical(self, record: &CanonicalSpeaker) -> Self {
        let value = serde_json::to_value(record).expect("serialize canonical record");
        self.state
            .lock()
            .unwrap()
            .canonical
            .insert(record.id.clone(), value);
        self
    }

    /// The next `n` calls to `apply_batch` fail as a whole.
    pub fn fail_next_batches(&self, n: usize) {
        self.state.lock().unwrap().failing_batches = n;
    }

    /// Ops keyed by `id` fail individually.
    pub fn reject_id(&self, id: &str) {
        self.state.lock().unwrap().rejected_ids.insert(id.to_string());
    }

    /// The scan of this source errors after yielding `after` documents.
    pub fn fail_scan_after(&self, database: &str, collection: &str, after: usize) {
        self.state
            .lock()
            .unwrap()
            .scan_failures
            .insert((database.to_string(), collection.to_string()), after);
    }

    /// The scan of this source hangs after yielding `after` documents.
    pub fn stall_scan_after(&self, database: &str, collection: &str, after: usize) {
        self.state
            .lock()
            .unwrap()
            .scan_stalls
            .insert((database.to_string(), collection.to_string()), after);
    }

    /// Raise `flag` once `reads` source documents have been handed out,
    /// counted across every scan.
    pub fn cancel_after_reads(&self, flag: Arc<AtomicBool>, reads: usize) {
        self.state.lock().unwrap().cancel_trigger = Some((flag, reads));
    }

    pub fn set_unreachable(&self) {
        self.state.lock().unwrap().unreachable = true;
    }

    /// Every `apply_batch` sleeps this long before applying.
    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().unwrap().write_delay = Some(delay);
    }

    pub fn canonical(&self, id: &str) -> Option<Value> {
        self.state.lock().unwrap().canonical.get(id).cloned()
    }

    pub fn canonical_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().canonical.keys().cloned().collect()
    }

    /// Sizes of the batches that reached the store, in arrival order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.lock().unwrap().batch_sizes.clone()
    }

    fn databases(state: &State) -> BTreeSet<&str> {
        state.sources.keys().map(|(db, _)| db.as_str()).collect()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        if self.state.lock().unwrap().unreachable {
            return Err(SpeakerbaseError::StoreUnavailable(
                "in-memory store marked unreachable".to_string(),
            ));
        }
        Ok(())
    }

    async fn resolve_source(&self, database: &str, collection: &str) -> Result<Option<String>> {
        let state = self.state.lock().unwrap();
        if !Self::databases(&state).contains(database) {
            return Ok(None);
        }
        let collections: Vec<String> = state
            .sources
            .keys()
            .filter(|(db, _)| db == database)
            .map(|(_, c)| c.clone())
            .collect();
        if collections.iter().any(|c| c == collection) {
            return Ok(Some(collection.to_string()));
        }
        Ok(speaker_fallback(&collections))
    }

    async fn scan_source<'a>(&'a self, database: &str, collection: &str) -> Result<DocStream<'a>> {
        let state = self.state.lock().unwrap();
        let key = (database.to_string(), collection.to_string());
        let docs = state.sources.get(&key).cloned().unwrap_or_default();

        let mut items: Vec<Result<Value>> = docs.into_iter().map(Ok).collect();
        if let Some(&after) = state.scan_failures.get(&key) {
            items.truncate(after);
            items.push(Err(SpeakerbaseError::Store(format!(
                "cursor for {database}.{collection} lost"
            ))));
        }
        let stall = state.scan_stalls.get(&key).copied();
        if let Some(after) = stall {
            items.truncate(after);
        }

        let reads = state.reads.clone();
        let trigger = state.cancel_trigger.clone();
        let docs = futures::stream::iter(items).inspect(move |_| {
            let seen = reads.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some((flag, at)) = &trigger {
                if seen >= *at {
                    flag.store(true, Ordering::SeqCst);
                }
            }
        });
        match stall {
            Some(_) => Ok(docs.chain(futures::stream::pending()).boxed()),
            None => Ok(docs.boxed()),
        }
    }

    async fn identity_rows(&self) -> Result<Vec<IdentityRow>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .canonical
            .iter()
            .map(|(id, doc)| IdentityRow {
                id: id.clone(),
                name: doc["name"].as_str().map(str::to_string),
                city: doc["location"]["city"].as_str().map(str::to_string),
            })
            .collect())
    }

    async fn apply_batch(&self, ops: &[WriteOp]) -> Result<BatchOutcome> {
        let delay = self.state.lock().unwrap().write_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_batches > 0 {
            state.failing_batches -= 1;
            return Err(SpeakerbaseError::Store("injected batch failure".to_string()));
        }
        state.batch_sizes.push(ops.len());

        let mut outcome = BatchOutcome::default();
        for op in write_rounds(ops).into_iter().flatten() {
            if state.rejected_ids.contains(op.key()) {
                outcome.failed += 1;
                continue;
            }
            match op {
                WriteOp::Merge { target_id, record } => {
                    let fields = match serde_json::to_value(record) {
                        Ok(Value::Object(fields)) => fields,
                        _ => {
                            outcome.failed += 1;
                            continue;
                        }
                    };
                    let Some(Value::Object(existing)) = state.canonical.get_mut(target_id) else {
                        outcome.failed += 1;
                        continue;
                    };
                    for (k, v) in fields {
                        if k != "_id" {
                            existing.insert(k, v);
                        }
                    }
                }
                WriteOp::InsertIfAbsent { record } => {
                    if !state.canonical.contains_key(&record.id) {
                        let value = serde_json::to_value(record)
                            .map_err(|e| SpeakerbaseError::Store(e.to_string()))?;
                        state.canonical.insert(record.id.clone(), value);
                    }
                }
            }
            outcome.applied += 1;
        }
        Ok(outcome)
    }

    async fn count_source(&self, database: &str, collection: &str) -> Result<u64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sources
            .get(&(database.to_string(), collection.to_string()))
            .map(|docs| docs.len() as u64)
            .unwrap_or(0))
    }

    async fn count_canonical(&self) -> Result<u64> {
        Ok(self.state.lock().unwrap().canonical.len() as u64)
    }

    async fn scan_canonical<'a>(&'a self) -> Result<DocStream<'a>> {
        let docs: Vec<Result<Value>> = self
            .state
            .lock()
            .unwrap()
            .canonical
            .values()
            .cloned()
            .map(Ok)
            .collect();
        Ok(futures::stream::iter(docs).boxed())
    }
}

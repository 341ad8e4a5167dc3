// DocumentStore: everything the unification pipeline needs from the backing
// store. Source collections are read by full scan; the canonical collection is
// read once for the identity index and written in unordered batches.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use speakerbase_common::{BatchOutcome, IdentityRow, Result, WriteOp};

/// A stream of raw documents, one `Err` per failed cursor read.
pub type DocStream<'a> = BoxStream<'a, Result<Value>>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fails with `StoreUnavailable` when the store cannot be reached.
    async fn ping(&self) -> Result<()>;

    /// Resolve the collection to scan for a source. `None` when neither the
    /// configured collection nor a speaker-named fallback exists.
    async fn resolve_source(&self, database: &str, collection: &str) -> Result<Option<String>>;

    /// Scan every document of a source collection.
    async fn scan_source<'a>(&'a self, database: &str, collection: &str) -> Result<DocStream<'a>>;

    /// `(id, name, city)` of every canonical record.
    async fn identity_rows(&self) -> Result<Vec<IdentityRow>>;

    /// Apply a batch unordered. Individual failures are counted in the
    /// outcome; `Err` means the batch as a whole did not go through.
    async fn apply_batch(&self, ops: &[WriteOp]) -> Result<BatchOutcome>;

    /// Number of documents in a source collection.
    async fn count_source(&self, database: &str, collection: &str) -> Result<u64>;

    /// Number of canonical records.
    async fn count_canonical(&self) -> Result<u64>;

    /// Scan the canonical collection.
    async fn scan_canonical<'a>(&'a self) -> Result<DocStream<'a>>;
}

/// Name of a collection to fall back on when the configured one is missing:
/// the first (sorted) collection whose name mentions "speaker".
pub fn speaker_fallback(collections: &[String]) -> Option<String> {
    let mut candidates: Vec<&String> = collections
        .iter()
        .filter(|c| c.to_lowercase().contains("speaker"))
        .collect();
    candidates.sort();
    candidates.first().map(|c| c.to_string())
}

/// Split a batch into rounds whose ops touch distinct `_id`s and can run
/// concurrently. Inserts are placed ahead of merges, and each op on an `_id`
/// lands one round after the previous op on that `_id`.
pub fn write_rounds(ops: &[WriteOp]) -> Vec<Vec<&WriteOp>> {
    let inserts = ops.iter().filter(|op| matches!(op, WriteOp::InsertIfAbsent { .. }));
    let merges = ops.iter().filter(|op| matches!(op, WriteOp::Merge { .. }));

    let mut seen: HashMap<&str, usize> = HashMap::new();
    let mut rounds: Vec<Vec<&WriteOp>> = Vec::new();
    for op in inserts.chain(merges) {
        let round = seen.entry(op.key()).or_default();
        if *round == rounds.len() {
            rounds.push(Vec::new());
        }
        rounds[*round].push(op);
        *round += 1;
    }
    rounds
}

//! Buffered, unordered write-back to the canonical collection.
//!
//! Ops accumulate until the flush threshold, then go to the store as one
//! batch. A batch that errors or times out is retried with exponential
//! backoff; once retries are exhausted its ops count as failed and the run
//! carries on.

use std::time::Duration;

use tracing::{debug, error, warn};

use speakerbase_common::{Config, SpeakerbaseError, WriteOp};
use speakerbase_store::DocumentStore;

#[derive(Debug, Clone, Copy)]
pub struct WriterSettings {
    pub batch_size: usize,
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl From<&Config> for WriterSettings {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            timeout: config.store_timeout,
            retries: config.write_retries,
            backoff: config.retry_backoff,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub batches_flushed: u32,
    pub ops_applied: u64,
    pub ops_failed: u64,
    /// Batches abandoned after exhausting retries.
    pub batch_failures: u32,
}

pub struct BatchWriter<'a> {
    store: &'a dyn DocumentStore,
    settings: WriterSettings,
    buffer: Vec<WriteOp>,
    stats: WriterStats,
}

impl<'a> BatchWriter<'a> {
    pub fn new(store: &'a dyn DocumentStore, settings: WriterSettings) -> Self {
        Self {
            store,
            buffer: Vec::with_capacity(settings.batch_size),
            settings,
            stats: WriterStats::default(),
        }
    }

    /// Buffer one op, flushing once the threshold is reached.
    pub async fn push(&mut self, op: WriteOp) {
        self.buffer.push(op);
        if self.buffer.len() >= self.settings.batch_size {
            self.flush().await;
        }
    }

    /// Send whatever is buffered. Nothing reaches the store for an empty buffer.
    pub async fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.buffer);
        self.write_batch(&batch).await;
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> WriterStats {
        self.stats
    }

    async fn write_batch(&mut self, batch: &[WriteOp]) {
        let attempts = self.settings.retries + 1;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let result =
                tokio::time::timeout(self.settings.timeout, self.store.apply_batch(batch)).await;

            match result {
                Ok(Ok(outcome)) => {
                    self.stats.batches_flushed += 1;
                    self.stats.ops_applied += outcome.applied as u64;
                    self.stats.ops_failed += outcome.failed as u64;
                    if outcome.failed > 0 {
                        warn!(
                            failed = outcome.failed,
                            applied = outcome.applied,
                            "Batch applied with per-op failures"
                        );
                    } else {
                        debug!(ops = outcome.applied, "Batch flushed");
                    }
                    return;
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => {
                    last_error = format!("timed out after {:?}", self.settings.timeout);
                }
            }

            if attempt + 1 < attempts {
                let backoff = self.settings.backoff * 2u32.saturating_pow(attempt);
                warn!(
                    ops = batch.len(),
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = last_error.as_str(),
                    "Batch write failed, retrying after backoff"
                );
                tokio::time::sleep(backoff).await;
            }
        }

        let err = SpeakerbaseError::BatchWrite {
            failed: batch.len(),
            attempts,
            reason: last_error,
        };
        error!(error = %err, "Abandoning batch");
        self.stats.batch_failures += 1;
        self.stats.ops_failed += batch.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use speakerbase_common::{CanonicalSpeaker, SourceInfo};
    use speakerbase_store::InMemoryStore;

    use super::*;

    fn settings(batch_size: usize) -> WriterSettings {
        WriterSettings {
            batch_size,
            timeout: Duration::from_secs(5),
            retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    fn insert(id: usize) -> WriteOp {
        WriteOp::InsertIfAbsent {
            record: CanonicalSpeaker::new(
                format!("id-{id}"),
                SourceInfo {
                    original_source: "test".to_string(),
                    source_url: None,
                    scraped_at: None,
                    source_id: None,
                },
            ),
        }
    }

    #[tokio::test]
    async fn flushes_at_threshold_and_on_demand() {
        let store = InMemoryStore::new();
        let mut writer = BatchWriter::new(&store, settings(1000));

        for i in 0..2500 {
            writer.push(insert(i)).await;
        }
        assert_eq!(store.batch_sizes(), vec![1000, 1000]);
        assert_eq!(writer.pending(), 500);

        writer.flush().await;
        assert_eq!(store.batch_sizes(), vec![1000, 1000, 500]);
        assert_eq!(store.canonical_ids().len(), 2500);

        let stats = writer.stats();
        assert_eq!(stats.batches_flushed, 3);
        assert_eq!(stats.ops_applied, 2500);
        assert_eq!(stats.ops_failed, 0);
    }

    #[tokio::test]
    async fn empty_flush_never_reaches_the_store() {
        let store = InMemoryStore::new();
        let mut writer = BatchWriter::new(&store, settings(10));
        writer.flush().await;
        writer.flush().await;
        assert!(store.batch_sizes().is_empty());
        assert_eq!(writer.stats(), WriterStats::default());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let store = InMemoryStore::new();
        store.fail_next_batches(2);
        let mut writer = BatchWriter::new(&store, settings(3));

        for i in 0..3 {
            writer.push(insert(i)).await;
        }

        assert_eq!(store.batch_sizes(), vec![3]);
        let stats = writer.stats();
        assert_eq!(stats.ops_applied, 3);
        assert_eq!(stats.batch_failures, 0);
    }

    #[tokio::test]
    async fn exhausted_retries_count_the_batch_as_failed() {
        let store = InMemoryStore::new();
        store.fail_next_batches(3);
        let mut writer = BatchWriter::new(&store, settings(2));

        writer.push(insert(0)).await;
        writer.push(insert(1)).await;
        writer.push(insert(2)).await;
        writer.flush().await;

        let stats = writer.stats();
        assert_eq!(stats.batch_failures, 1);
        assert_eq!(stats.ops_failed, 2);
        assert_eq!(stats.ops_applied, 1);
        assert_eq!(store.canonical_ids(), vec!["id-2".to_string()]);
    }

    #[tokio::test]
    async fn slow_store_times_out_and_is_retried() {
        let store = InMemoryStore::new();
        store.set_write_delay(Duration::from_secs(5));
        let mut writer = BatchWriter::new(
            &store,
            WriterSettings {
                timeout: Duration::from_millis(20),
                ..settings(1)
            },
        );

        writer.push(insert(0)).await;

        let stats = writer.stats();
        assert_eq!(stats.batch_failures, 1);
        assert_eq!(stats.ops_failed, 1);
        assert!(store.canonical_ids().is_empty());
    }

    #[tokio::test]
    async fn per_op_failures_do_not_fail_the_batch() {
        let store = InMemoryStore::new();
        store.reject_id("id-1");
        let mut writer = BatchWriter::new(&store, settings(3));

        for i in 0..3 {
            writer.push(insert(i)).await;
        }

        let stats = writer.stats();
        assert_eq!(stats.batches_flushed, 1);
        assert_eq!(stats.ops_applied, 2);
        assert_eq!(stats.ops_failed, 1);
        assert_eq!(stats.batch_failures, 0);
    }
}

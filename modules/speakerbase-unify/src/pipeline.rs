//! The run driver: drain each source in turn, transform, resolve, write.
//!
//! Sources are processed strictly one after another. The identity index and
//! the batch buffer are owned by the run and never shared.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::time::error::Elapsed;
use tracing::{debug, info, warn};

use speakerbase_common::{Config, Result, SpeakerbaseError, WriteOp};
use speakerbase_store::DocumentStore;

use crate::identity::IdentityIndex;
use crate::resolution::{Resolution, Resolver};
use crate::sources::SourceKind;
use crate::stats::RunStats;
use crate::vocabulary::TopicVocabulary;
use crate::writer::{BatchWriter, WriterSettings};

pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    vocabulary: TopicVocabulary,
    config: Config,
}

/// How a single source scan ended.
enum ScanEnd {
    Drained,
    Failed,
    Cancelled,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        vocabulary: TopicVocabulary,
        config: Config,
    ) -> Self {
        Self {
            store,
            vocabulary,
            config,
        }
    }

    /// Run one full unification pass over every known source.
    ///
    /// Fails only when the store is unreachable at startup or the identity
    /// index cannot be loaded. Setting `cancel` stops reading after the
    /// current document; everything already buffered is still written.
    pub async fn run(&self, cancel: Arc<AtomicBool>) -> Result<RunStats> {
        let mut stats = RunStats::default();

        match self.bounded(self.store.ping()).await {
            Ok(Ok(())) => {}
            Ok(Err(SpeakerbaseError::StoreUnavailable(reason)))
            | Ok(Err(SpeakerbaseError::Store(reason))) => {
                return Err(SpeakerbaseError::StoreUnavailable(reason));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(SpeakerbaseError::StoreUnavailable(format!(
                    "no response within {}s",
                    self.config.store_timeout.as_secs()
                )))
            }
        }

        info!("Building deduplication index...");
        let rows = self
            .bounded(self.store.identity_rows())
            .await
            .map_err(|_| SpeakerbaseError::Store("identity scan timed out".to_string()))??;
        let index = IdentityIndex::from_rows(rows);
        info!(entries = index.len(), "Deduplication index ready");

        let mut resolver = Resolver::new(index, self.config.match_mode);
        let settings = WriterSettings::from(&self.config);
        let mut writer = BatchWriter::new(self.store.as_ref(), settings);

        for kind in SourceKind::ALL {
            if cancel.load(Ordering::Relaxed) {
                stats.cancelled = true;
                break;
            }

            let Some(collection) = self.locate(kind, &mut stats).await else {
                continue;
            };

            info!(source = %kind, collection = collection.as_str(), "Processing source");
            let before = stats.documents_ingested;
            let end = self
                .drain_source(kind, &collection, &mut resolver, &mut writer, &cancel, &mut stats)
                .await;
            writer.flush().await;

            let count = stats.documents_ingested - before;
            stats.by_source.push((kind.database().to_string(), count));
            match end {
                ScanEnd::Drained => {
                    stats.sources_processed += 1;
                    info!(source = %kind, documents = count, "Processed source");
                }
                ScanEnd::Failed => {
                    stats.sources_failed += 1;
                }
                ScanEnd::Cancelled => {
                    stats.cancelled = true;
                    info!(source = %kind, documents = count, "Cancelled mid-source");
                    break;
                }
            }
        }

        writer.flush().await;
        stats.writer = writer.stats();

        stats.canonical_total = match self.bounded(self.store.count_canonical()).await {
            Ok(Ok(total)) => Some(total),
            Ok(Err(e)) => {
                warn!(error = %e, "Could not count canonical collection");
                None
            }
            Err(_) => {
                warn!("Counting canonical collection timed out");
                None
            }
        };

        info!(
            ingested = stats.documents_ingested,
            inserted = stats.inserted,
            merged = stats.merged,
            skipped = stats.records_skipped,
            ops_failed = stats.writer.ops_failed,
            cancelled = stats.cancelled,
            "Unification finished"
        );
        Ok(stats)
    }

    /// Collection to scan for a source, or `None` (counted) when it is missing
    /// or the lookup fails.
    async fn locate(&self, kind: SourceKind, stats: &mut RunStats) -> Option<String> {
        let configured = kind.collection();
        let lookup = self.store.resolve_source(kind.database(), configured);
        match self.bounded(lookup).await {
            Ok(Ok(Some(collection))) => {
                if collection != configured {
                    info!(
                        source = %kind,
                        collection = collection.as_str(),
                        "Using fallback collection"
                    );
                }
                Some(collection)
            }
            Ok(Ok(None)) => {
                let err = SpeakerbaseError::MissingSource {
                    database: kind.database().to_string(),
                    collection: configured.to_string(),
                };
                warn!(error = %err, "Skipping source");
                stats.sources_skipped += 1;
                None
            }
            Ok(Err(e)) => {
                warn!(source = %kind, error = %e, "Could not resolve source");
                stats.sources_failed += 1;
                None
            }
            Err(_) => {
                warn!(source = %kind, "Resolving source timed out");
                stats.sources_failed += 1;
                None
            }
        }
    }

    async fn drain_source(
        &self,
        kind: SourceKind,
        collection: &str,
        resolver: &mut Resolver,
        writer: &mut BatchWriter<'_>,
        cancel: &AtomicBool,
        stats: &mut RunStats,
    ) -> ScanEnd {
        let scan = self.store.scan_source(kind.database(), collection);
        let mut docs = match self.bounded(scan).await {
            Ok(Ok(docs)) => docs,
            Ok(Err(e)) => {
                warn!(source = %kind, error = %e, "Could not open source cursor");
                return ScanEnd::Failed;
            }
            Err(_) => {
                warn!(source = %kind, "Opening source cursor timed out");
                return ScanEnd::Failed;
            }
        };

        loop {
            if cancel.load(Ordering::Relaxed) {
                return ScanEnd::Cancelled;
            }

            let doc = match self.bounded(docs.next()).await {
                Ok(Some(Ok(doc))) => doc,
                Ok(None) => return ScanEnd::Drained,
                Ok(Some(Err(e))) => {
                    warn!(source = %kind, error = %e, "Source read failed, ending source");
                    return ScanEnd::Failed;
                }
                Err(_) => {
                    warn!(source = %kind, "Source read timed out, ending source");
                    return ScanEnd::Failed;
                }
            };
            stats.documents_ingested += 1;

            let mut record = match kind.transform(&doc, &self.vocabulary) {
                Ok(record) => record,
                Err(e) => {
                    warn!(source = %kind, error = %e, "Skipping record");
                    stats.records_skipped += 1;
                    continue;
                }
            };

            let now = Utc::now();
            let op = match resolver.resolve(&record) {
                Resolution::Merge { existing_id } => {
                    record.updated_at = Some(now);
                    stats.merged += 1;
                    WriteOp::Merge {
                        target_id: existing_id,
                        record,
                    }
                }
                Resolution::Insert => {
                    record.created_at = Some(now);
                    stats.inserted += 1;
                    debug!(source = %kind, id = record.id.as_str(), "New speaker");
                    WriteOp::InsertIfAbsent { record }
                }
            };
            writer.push(op).await;
        }
    }

    /// Bound a store call by the configured timeout.
    async fn bounded<F: Future>(&self, fut: F) -> std::result::Result<F::Output, Elapsed> {
        tokio::time::timeout(self.config.store_timeout, fut).await
    }
}

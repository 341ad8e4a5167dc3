// MongoDB-backed DocumentStore. Source collections live in one database per
// source; the canonical collection lives in the target database.

use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use tracing::{debug, warn};

use speakerbase_common::{
    BatchOutcome, CanonicalSpeaker, IdentityRow, Result, SpeakerbaseError, WriteOp,
};

use crate::store::{speaker_fallback, write_rounds, DocStream, DocumentStore};

/// Ops in flight at once while applying a batch.
const WRITE_CONCURRENCY: usize = 16;

/// Thin wrapper around `mongodb::Client` bound to the canonical collection.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    target_database: String,
    target_collection: String,
}

impl MongoStore {
    /// Build a client for `uri`. No I/O happens until the first call; use
    /// [`DocumentStore::ping`] to verify reachability.
    pub async fn connect(
        uri: &str,
        target_database: &str,
        target_collection: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut options = ClientOptions::parse(uri)
            .await
            .map_err(|e| SpeakerbaseError::StoreUnavailable(e.to_string()))?;
        options.app_name = Some("speakerbase".to_string());
        options.server_selection_timeout = Some(timeout);
        options.connect_timeout = Some(timeout);

        let client = Client::with_options(options)
            .map_err(|e| SpeakerbaseError::StoreUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            target_database: target_database.to_string(),
            target_collection: target_collection.to_string(),
        })
    }

    /// Get a reference to the underlying client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn canonical(&self) -> Collection<Document> {
        self.client
            .database(&self.target_database)
            .collection(&self.target_collection)
    }

    async fn apply_one(&self, coll: &Collection<Document>, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::Merge { target_id, record } => {
                let mut fields = record_document(record)?;
                fields.remove("_id");
                let result = coll
                    .update_one(doc! { "_id": target_id.as_str() }, doc! { "$set": fields })
                    .await
                    .map_err(store_err)?;
                if result.matched_count == 0 {
                    return Err(SpeakerbaseError::Store(format!(
                        "merge target {target_id} not found"
                    )));
                }
            }
            WriteOp::InsertIfAbsent { record } => {
                let mut fields = record_document(record)?;
                fields.remove("_id");
                coll.update_one(
                    doc! { "_id": record.id.as_str() },
                    doc! { "$setOnInsert": fields },
                )
                .upsert(true)
                .await
                .map_err(store_err)?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SpeakerbaseError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }

    async fn resolve_source(&self, database: &str, collection: &str) -> Result<Option<String>> {
        let databases = self.client.list_database_names().await.map_err(store_err)?;
        if !databases.iter().any(|d| d == database) {
            return Ok(None);
        }

        let collections = self
            .client
            .database(database)
            .list_collection_names()
            .await
            .map_err(store_err)?;
        if collections.iter().any(|c| c == collection) {
            return Ok(Some(collection.to_string()));
        }

        let fallback = speaker_fallback(&collections);
        if let Some(ref name) = fallback {
            warn!(
                database,
                expected = collection,
                using = name.as_str(),
                "Falling back to speaker collection"
            );
        }
        Ok(fallback)
    }

    async fn scan_source<'a>(&'a self, database: &str, collection: &str) -> Result<DocStream<'a>> {
        let coll = self.client.database(database).collection::<Document>(collection);
        let cursor = coll.find(doc! {}).await.map_err(store_err)?;
        Ok(cursor
            .map(|res| {
                res.map(|d| Bson::Document(d).into_relaxed_extjson())
                    .map_err(store_err)
            })
            .boxed())
    }

    async fn identity_rows(&self) -> Result<Vec<IdentityRow>> {
        let mut cursor = self
            .canonical()
            .find(doc! {})
            .projection(doc! { "_id": 1, "name": 1, "location.city": 1 })
            .await
            .map_err(store_err)?;

        let mut rows = Vec::new();
        while let Some(d) = cursor.try_next().await.map_err(store_err)? {
            let Some(id) = d.get("_id").and_then(bson_to_string) else {
                continue;
            };
            rows.push(IdentityRow {
                id,
                name: d.get_str("name").ok().map(str::to_string),
                city: d
                    .get_document("location")
                    .ok()
                    .and_then(|l| l.get_str("city").ok())
                    .map(str::to_string),
            });
        }
        debug!(rows = rows.len(), "Loaded identity rows");
        Ok(rows)
    }

    async fn apply_batch(&self, ops: &[WriteOp]) -> Result<BatchOutcome> {
        let coll = self.canonical();
        let mut results: Vec<(String, Result<()>)> = Vec::with_capacity(ops.len());
        for round in write_rounds(ops) {
            let writes: Vec<_> = round
                .into_iter()
                .map(|op| {
                    let coll = &coll;
                    async move { (op.key().to_string(), self.apply_one(coll, op).await) }
                })
                .collect();
            let applied: Vec<(String, Result<()>)> = futures::stream::iter(writes)
                .buffer_unordered(WRITE_CONCURRENCY)
                .collect()
                .await;
            results.extend(applied);
        }

        let mut outcome = BatchOutcome::default();
        let mut first_error = None;
        for (key, result) in results {
            match result {
                Ok(()) => outcome.applied += 1,
                Err(e) => {
                    warn!(id = key.as_str(), error = %e, "Write op failed");
                    outcome.failed += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        // Nothing landed: treat as a batch-level failure so the caller retries.
        if outcome.applied == 0 {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        Ok(outcome)
    }

    async fn count_source(&self, database: &str, collection: &str) -> Result<u64> {
        self.client
            .database(database)
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await
            .map_err(store_err)
    }

    async fn count_canonical(&self) -> Result<u64> {
        self.canonical()
            .count_documents(doc! {})
            .await
            .map_err(store_err)
    }

    async fn scan_canonical<'a>(&'a self) -> Result<DocStream<'a>> {
        let cursor = self.canonical().find(doc! {}).await.map_err(store_err)?;
        Ok(cursor
            .map(|res| {
                res.map(|d| Bson::Document(d).into_relaxed_extjson())
                    .map_err(store_err)
            })
            .boxed())
    }
}

fn store_err(e: mongodb::error::Error) -> SpeakerbaseError {
    SpeakerbaseError::Store(e.to_string())
}

fn bson_to_string(value: &Bson) -> Option<String> {
    match value {
        Bson::String(s) => Some(s.clone()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::Int32(i) => Some(i.to_string()),
        Bson::Int64(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Serialize a record for the store, writing pipeline and scrape timestamps
/// as BSON dates rather than RFC 3339 strings.
pub(crate) fn record_document(record: &CanonicalSpeaker) -> Result<Document> {
    let mut document = mongodb::bson::to_document(record)
        .map_err(|e| SpeakerbaseError::Store(format!("serialize {}: {e}", record.id)))?;

    for key in ["created_at", "updated_at"] {
        stamp_date(&mut document, key);
    }
    if let Ok(info) = document.get_document_mut("source_info") {
        stamp_date(info, "scraped_at");
    }
    Ok(document)
}

fn stamp_date(document: &mut Document, key: &str) {
    let parsed = match document.get(key) {
        Some(Bson::String(raw)) => chrono::DateTime::parse_from_rfc3339(raw).ok(),
        _ => None,
    };
    if let Some(ts) = parsed {
        document.insert(
            key,
            Bson::DateTime(mongodb::bson::DateTime::from_millis(ts.timestamp_millis())),
        );
    }
}

use thiserror::Error;

/// Result type alias for speakerbase operations.
pub type Result<T> = std::result::Result<T, SpeakerbaseError>;

#[derive(Error, Debug)]
pub enum SpeakerbaseError {
    #[error("Record from {source_name} has no usable identifier (expected `{field}`)")]
    MissingIdentifier {
        source_name: &'static str,
        field: &'static str,
    },

    #[error("Source not found: {database}.{collection}")]
    MissingSource {
        database: String,
        collection: String,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Batch write failed after {attempts} attempts ({failed} ops): {reason}")]
    BatchWrite {
        failed: usize,
        attempts: u32,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Vocabulary error: {0}")]
    Vocabulary(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

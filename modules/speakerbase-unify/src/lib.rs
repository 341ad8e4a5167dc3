pub mod identity;
pub mod location;
pub mod pipeline;
pub mod report;
pub mod resolution;
pub mod sources;
pub mod stats;
pub mod vocabulary;
pub mod writer;

pub use identity::{fingerprint, IdentityIndex};
pub use pipeline::Pipeline;
pub use report::{CanonicalReport, SourceInventory};
pub use resolution::{Resolution, Resolver};
pub use sources::{record_id, SourceKind};
pub use stats::RunStats;
pub use vocabulary::TopicVocabulary;
pub use writer::{BatchWriter, WriterSettings, WriterStats};

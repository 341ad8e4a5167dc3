pub mod mongo;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use mongo::MongoStore;
pub use store::{speaker_fallback, write_rounds, DocStream, DocumentStore};

#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryStore;

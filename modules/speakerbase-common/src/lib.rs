pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, MatchMode};
pub use error::{Result, SpeakerbaseError};
pub use types::*;

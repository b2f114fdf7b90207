//! Memory subsystem errors.
//!
//! Persistence failures never escape [`crate::store::MemoryStore::save`];
//! they are logged and the store keeps working in memory. These types are
//! what the persistence layer returns internally and what configuration
//! validation reports.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding {what}: {detail}")]
    Encode { what: &'static str, detail: String },
    /// Another process holds `<path>.lock`.
    #[error("lock {path} is held")]
    LockHeld { path: PathBuf },
    #[error("invalid memory config: {detail}")]
    InvalidConfig { detail: String },
}

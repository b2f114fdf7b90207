//! Tessera Memory: task fingerprints and the distilled-pipeline store.
//!
//! # API Surface
//!
//! - [`fingerprint::fingerprint`] / [`fingerprint::similarity`] -- task signatures
//! - [`store::MemoryStore`] -- recall, distill, evict, save
//!
//! # Module Dependency Direction
//!
//! `fingerprint` ← `entry` ← `heuristics` ← `persist` ← `store`
//!
//! Depends on `tessera-kernel` only.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod heuristics;
mod persist;
pub mod store;

pub use config::MemoryConfig;
pub use entry::{Confidence, MemoryEntry, Method, Outcome};
pub use error::MemoryError;
pub use fingerprint::{fingerprint, similarity, Fingerprint};
pub use heuristics::Heuristics;
pub use persist::{HEURISTICS_FILE, MEMORY_FILE, STALE_LOCK_AGE};
pub use store::{MemoryStore, Recalled};

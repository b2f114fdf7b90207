//! Digest module: domain-separated hashing and canonical JSON.
//!
//! Depends on nothing internal. Everything that needs a stable identity
//! (grid dedup, fingerprints, registry digests) goes through here.

pub mod canon;
pub mod hash;
pub mod hash_domain;

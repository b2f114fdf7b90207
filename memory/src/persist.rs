//! Durable memory documents.
//!
//! Two files under the configured directory:
//!
//! - `memory.json`: `{ "schema_version": "memory.v1", "registry_digest", "entries": [...] }`
//! - `heuristics.json`: `{ "schema_version": "heuristics.v1", "heuristics": {...} }`
//!
//! Writes go to a temp file in the same directory and are renamed into
//! place. Load-merge-save cycles run under an advisory `<file>.lock`
//! created exclusively and removed on drop. A lock older than
//! [`STALE_LOCK_AGE`] was left by a process that died mid-save and is taken
//! over.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::entry::MemoryEntry;
use crate::error::MemoryError;
use crate::heuristics::Heuristics;

pub const MEMORY_FILE: &str = "memory.json";
pub const HEURISTICS_FILE: &str = "heuristics.json";
pub const MEMORY_SCHEMA_VERSION: &str = "memory.v1";
pub const HEURISTICS_SCHEMA_VERSION: &str = "heuristics.v1";

/// A save holds its lock for milliseconds; anything this old is abandoned.
pub const STALE_LOCK_AGE: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MemoryDocument {
    pub schema_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_digest: Option<String>,
    pub entries: Vec<MemoryEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HeuristicsDocument {
    pub schema_version: String,
    pub heuristics: Heuristics,
}

trait Versioned {
    fn schema_version(&self) -> &str;
}

impl Versioned for MemoryDocument {
    fn schema_version(&self) -> &str {
        &self.schema_version
    }
}

impl Versioned for HeuristicsDocument {
    fn schema_version(&self) -> &str {
        &self.schema_version
    }
}

// ---------------------------------------------------------------------------
// Lock
// ---------------------------------------------------------------------------

/// Advisory lock file. Held for the guard's lifetime.
#[derive(Debug)]
pub(crate) struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Create `path` exclusively, taking over a stale lock once.
    pub fn acquire(path: PathBuf) -> Result<Self, MemoryError> {
        match Self::create(path) {
            Err(MemoryError::LockHeld { path }) if is_stale(&path, SystemTime::now()) => {
                tracing::warn!(path = %path.display(), "taking over stale memory lock");
                match std::fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(source) => return Err(MemoryError::Io { path, source }),
                }
                Self::create(path)
            }
            other => other,
        }
    }

    fn create(path: PathBuf) -> Result<Self, MemoryError> {
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => Ok(Self { path }),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(MemoryError::LockHeld { path }),
            Err(source) => Err(MemoryError::Io { path, source }),
        }
    }
}

/// A lock whose mtime is at least [`STALE_LOCK_AGE`] before `now`.
/// Unreadable metadata or a future mtime counts as live.
fn is_stale(path: &Path, now: SystemTime) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| now.duration_since(modified).ok())
        .is_some_and(|age| age >= STALE_LOCK_AGE)
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release memory lock");
        }
    }
}

/// Lock path for a document path: `memory.json` → `memory.json.lock`.
pub(crate) fn lock_path(doc: &Path) -> PathBuf {
    let mut name = doc.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    doc.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Read / write
// ---------------------------------------------------------------------------

/// Read a versioned document. Missing, unreadable, unparsable or
/// wrong-version files yield `None` with a warning.
fn read_document<T: DeserializeOwned + Versioned>(path: &Path, expected: &str) -> Option<T> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable memory document; starting empty");
            return None;
        }
    };
    match serde_json::from_slice::<T>(&bytes) {
        Ok(doc) if doc.schema_version() == expected => Some(doc),
        Ok(doc) => {
            tracing::warn!(
                path = %path.display(),
                found = doc.schema_version(),
                expected,
                "memory document schema mismatch; starting empty"
            );
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt memory document; starting empty");
            None
        }
    }
}

pub(crate) fn load_entries(dir: &Path) -> (Vec<MemoryEntry>, Option<String>) {
    read_document::<MemoryDocument>(&dir.join(MEMORY_FILE), MEMORY_SCHEMA_VERSION)
        .map_or((Vec::new(), None), |doc| (doc.entries, doc.registry_digest))
}

pub(crate) fn load_heuristics(dir: &Path) -> Heuristics {
    read_document::<HeuristicsDocument>(&dir.join(HEURISTICS_FILE), HEURISTICS_SCHEMA_VERSION)
        .map(|doc| doc.heuristics)
        .unwrap_or_default()
}

pub(crate) fn write_json<T: Serialize>(path: &Path, doc: &T, what: &'static str) -> Result<(), MemoryError> {
    let mut bytes = serde_json::to_vec_pretty(doc).map_err(|e| MemoryError::Encode {
        what,
        detail: e.to_string(),
    })?;
    bytes.push(b'\n');
    write_atomic(path, &bytes)
}

/// Write to a temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), MemoryError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_name = format!(".tmp_{}", path.file_name().unwrap_or_default().to_string_lossy());
    let temp_path = dir.join(temp_name);

    std::fs::write(&temp_path, content).map_err(|source| MemoryError::Io {
        path: temp_path.clone(),
        source,
    })?;
    std::fs::rename(&temp_path, path).map_err(|source| MemoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

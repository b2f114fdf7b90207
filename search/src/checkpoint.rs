//! Periodic search checkpoints.
//!
//! A checkpoint records where a hybrid search is, not how to resume it.
//! Sinks report failure through [`CheckpointError`]; the engine logs it and
//! keeps searching.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::event::SearchPhase;

pub const CHECKPOINT_SCHEMA_VERSION: &str = "checkpoint.v1";

/// Snapshot of search progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointV1 {
    pub schema_version: String,
    pub phase: SearchPhase,
    pub depth: usize,
    pub steps: u64,
    #[serde(rename = "elapsed_ms", with = "crate::budget::millis")]
    pub elapsed: Duration,
    pub frontier: usize,
}

impl CheckpointV1 {
    #[must_use]
    pub fn new(phase: SearchPhase, depth: usize, steps: u64, elapsed: Duration, frontier: usize) -> Self {
        Self {
            schema_version: CHECKPOINT_SCHEMA_VERSION.into(),
            phase,
            depth,
            steps,
            elapsed,
            frontier,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checkpoint encoding: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("checkpoint sink unavailable: {detail}")]
    Unavailable { detail: String },
}

/// Destination for checkpoints.
pub trait CheckpointSink: Send + Sync {
    /// Persist one checkpoint.
    ///
    /// # Errors
    ///
    /// Any [`CheckpointError`]; callers treat it as non-fatal.
    fn write(&self, checkpoint: &CheckpointV1) -> Result<(), CheckpointError>;
}

/// Discards every checkpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl CheckpointSink for NullSink {
    fn write(&self, _checkpoint: &CheckpointV1) -> Result<(), CheckpointError> {
        Ok(())
    }
}

/// Keeps every checkpoint in memory, oldest first.
#[derive(Debug, Default)]
pub struct MemorySink {
    written: Mutex<Vec<CheckpointV1>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checkpoints written so far.
    #[must_use]
    pub fn written(&self) -> Vec<CheckpointV1> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }
}

impl CheckpointSink for MemorySink {
    fn write(&self, checkpoint: &CheckpointV1) -> Result<(), CheckpointError> {
        let mut written = self.written.lock().map_err(|_| CheckpointError::Unavailable {
            detail: "memory sink lock poisoned".into(),
        })?;
        written.push(checkpoint.clone());
        Ok(())
    }
}

/// Replaces one JSON file per write, atomically.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the last checkpoint written to `path`.
    ///
    /// # Errors
    ///
    /// I/O or decode failure.
    pub fn read(path: &Path) -> Result<CheckpointV1, CheckpointError> {
        let bytes = std::fs::read(path).map_err(|source| CheckpointError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl CheckpointSink for FileSink {
    fn write(&self, checkpoint: &CheckpointV1) -> Result<(), CheckpointError> {
        let mut bytes = serde_json::to_vec_pretty(checkpoint)?;
        bytes.push(b'\n');
        write_atomic(&self.path, &bytes)
    }
}

/// Write to a temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), CheckpointError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let temp_name = format!(".tmp_{}", path.file_name().unwrap_or_default().to_string_lossy());
    let temp_path = dir.join(temp_name);

    std::fs::write(&temp_path, content).map_err(|source| CheckpointError::Io {
        path: temp_path.clone(),
        source,
    })?;
    std::fs::rename(&temp_path, path).map_err(|source| CheckpointError::Io {
        path: path.to_path_buf(),
        source,
    })
}

//! Task documents: training pairs to reproduce, test inputs to answer.
//!
//! JSON layout:
//!
//! ```text
//! { "train": [ { "input": [[..]], "output": [[..]] }, .. ],
//!   "test":  [ { "input": [[..]], "output"?: [[..]] }, .. ] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// One (input, output) example a pipeline must reproduce exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPair {
    pub input: Grid,
    pub output: Grid,
}

impl TrainingPair {
    #[must_use]
    pub fn new(input: Grid, output: Grid) -> Self {
        Self { input, output }
    }
}

/// A test input, optionally with its expected output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPair {
    pub input: Grid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Grid>,
}

/// One puzzle instance. Immutable for the duration of a solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier for logs and results (file stem when loaded from disk).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub train: Vec<TrainingPair>,
    #[serde(default)]
    pub test: Vec<TestPair>,
}

/// Failure loading a task document.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("reading task {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// Malformed JSON, ragged/empty grids, or colors above 9.
    #[error("parsing task {id}: {detail}")]
    Parse { id: String, detail: String },
}

impl Task {
    #[must_use]
    pub fn new(id: impl Into<String>, train: Vec<TrainingPair>, test: Vec<TestPair>) -> Self {
        Self {
            id: id.into(),
            train,
            test,
        }
    }

    /// Parse a task document.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Parse`] if the JSON is malformed or any grid is
    /// invalid.
    pub fn from_json_str(id: &str, json: &str) -> Result<Self, TaskError> {
        let mut task: Self = serde_json::from_str(json).map_err(|e| TaskError::Parse {
            id: id.to_string(),
            detail: e.to_string(),
        })?;
        if task.id.is_empty() {
            task.id = id.to_string();
        }
        Ok(task)
    }

    /// Load a task document from disk; the id defaults to the file stem.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Io`] if the file cannot be read and
    /// [`TaskError::Parse`] if its content is invalid.
    pub fn from_json_file(path: &Path) -> Result<Self, TaskError> {
        let text = std::fs::read_to_string(path).map_err(|source| TaskError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_json_str(&id, &text)
    }

    /// Test inputs in order.
    pub fn test_inputs(&self) -> impl Iterator<Item = &Grid> {
        self.test.iter().map(|t| &t.input)
    }
}

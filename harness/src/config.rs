//! Solver configuration.
//!
//! A [`SolverConfig`] is a JSON document. Every top-level field is optional
//! and falls back to its default; budget objects, once present, must be
//! complete so a search never runs on a partly specified budget.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessera_kernel::{standard_registry, PrimitiveRegistryV1};
use tessera_memory::MemoryConfig;
use tessera_search::{ChainBudgetV1, HybridBudgetV1};

/// Default cell accuracy at which a failed solve is remembered as a near miss.
const DEFAULT_NEAR_MISS_THRESHOLD: f64 = 0.8;
const DEFAULT_CHAIN_SAMPLE_LIMIT: usize = 2_000;
const DEFAULT_CONVERGENCE_CANDIDATES: usize = 3;
const DEFAULT_CONVERGENCE_ITERATIONS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {detail}")]
    Invalid { detail: String },
    /// The primitive allowlist names something the catalogue lacks.
    #[error("unknown primitive in allowlist: {name}")]
    UnknownPrimitive { name: String },
}

/// Branch-factor control for the adaptive solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    pub initial_branch_factor: usize,
    pub max_branch_factor: usize,
    /// Mean feedback below this widens the next phase.
    pub explore_below: f64,
    /// Mean feedback above this narrows the next phase.
    pub narrow_above: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            initial_branch_factor: 2,
            max_branch_factor: 8,
            explore_below: 0.3,
            narrow_above: 0.7,
        }
    }
}

/// Everything a solver needs besides the task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub memory: MemoryConfig,
    pub chain: ChainBudgetV1,
    /// Candidates scored when ranking near misses.
    pub chain_sample_limit: usize,
    /// Near misses handed to the convergence collaborator.
    pub convergence_candidates: usize,
    pub convergence_iterations: usize,
    /// Run hybrid wins through the convergence collaborator.
    pub stabilize: bool,
    pub hybrid: HybridBudgetV1,
    pub near_miss_threshold: f64,
    /// Restrict search to these primitives. `None` uses the full catalogue.
    pub primitives: Option<Vec<String>>,
    /// Where hybrid checkpoints go. `None` discards them.
    pub checkpoint_path: Option<PathBuf>,
    pub swarm: SwarmConfig,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            memory: MemoryConfig::default(),
            chain: ChainBudgetV1::default(),
            chain_sample_limit: DEFAULT_CHAIN_SAMPLE_LIMIT,
            convergence_candidates: DEFAULT_CONVERGENCE_CANDIDATES,
            convergence_iterations: DEFAULT_CONVERGENCE_ITERATIONS,
            stabilize: false,
            hybrid: HybridBudgetV1::default(),
            near_miss_threshold: DEFAULT_NEAR_MISS_THRESHOLD,
            primitives: None,
            checkpoint_path: None,
            swarm: SwarmConfig::default(),
        }
    }
}

impl SolverConfig {
    /// Defaults with an in-memory store of `capacity` entries.
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self {
            memory: MemoryConfig::in_memory(capacity),
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON or an incomplete budget.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SolverConfig::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check every field the solvers rely on.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |detail: String| ConfigError::Invalid { detail };
        self.memory.validate().map_err(|e| invalid(e.to_string()))?;
        self.chain.validate().map_err(|e| invalid(e.to_string()))?;
        self.hybrid.validate().map_err(|e| invalid(e.to_string()))?;
        if self.chain_sample_limit == 0 {
            return Err(invalid("chain_sample_limit must be positive".into()));
        }
        if self.convergence_iterations == 0 {
            return Err(invalid("convergence_iterations must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.near_miss_threshold) {
            return Err(invalid(format!(
                "near_miss_threshold {} outside [0, 1]",
                self.near_miss_threshold
            )));
        }
        let swarm = &self.swarm;
        if swarm.initial_branch_factor == 0 || swarm.initial_branch_factor > swarm.max_branch_factor {
            return Err(invalid(format!(
                "branch factor {} outside [1, {}]",
                swarm.initial_branch_factor, swarm.max_branch_factor
            )));
        }
        if !(0.0..=1.0).contains(&swarm.explore_below)
            || !(0.0..=1.0).contains(&swarm.narrow_above)
            || swarm.explore_below > swarm.narrow_above
        {
            return Err(invalid("swarm thresholds must satisfy 0 <= explore_below <= narrow_above <= 1".into()));
        }
        Ok(())
    }

    /// The registry the solvers search with.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownPrimitive`] for a name outside the catalogue.
    pub fn registry(&self) -> Result<PrimitiveRegistryV1, ConfigError> {
        let full = standard_registry();
        let Some(names) = &self.primitives else {
            return Ok(full);
        };
        if let Some(unknown) = names.iter().find(|n| !full.contains(n)) {
            return Err(ConfigError::UnknownPrimitive { name: unknown.clone() });
        }
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        full.subset(&names).map_err(|e| ConfigError::Invalid { detail: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = SolverConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SolverConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_document_overrides_named_fields() {
        let config = SolverConfig::from_json_str(r#"{"near_miss_threshold": 0.5, "swarm": {"max_branch_factor": 4}}"#)
            .unwrap();
        assert!((config.near_miss_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.swarm.max_branch_factor, 4);
        assert_eq!(config.swarm.initial_branch_factor, 2);
    }

    // ACCEPTANCE: a budget object must be complete
    #[test]
    fn incomplete_budget_is_rejected() {
        let err = SolverConfig::from_json_str(r#"{"hybrid": {"max_depth": 2}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_budget_fails_validation() {
        let mut config = SolverConfig::default();
        config.hybrid.max_steps = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn bad_thresholds_fail_validation() {
        let mut config = SolverConfig::default();
        config.swarm.explore_below = 0.9;
        assert!(config.validate().is_err());
        let mut config = SolverConfig::default();
        config.swarm.initial_branch_factor = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn allowlist_builds_subset_registry() {
        let config = SolverConfig {
            primitives: Some(vec!["flip_v".into(), "replace".into()]),
            ..SolverConfig::default()
        };
        let reg = config.registry().unwrap();
        assert_eq!(reg.len(), 2);
        let config = SolverConfig {
            primitives: Some(vec!["levitate".into()]),
            ..SolverConfig::default()
        };
        assert!(matches!(config.registry(), Err(ConfigError::UnknownPrimitive { .. })));
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.json");
        std::fs::write(&path, r#"{"stabilize": true}"#).unwrap();
        assert!(SolverConfig::from_json_file(&path).unwrap().stabilize);
        assert!(matches!(
            SolverConfig::from_json_file(&dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}

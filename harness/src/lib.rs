//! Tessera Harness: solvers that orchestrate memory and search.
//!
//! The harness runs a task through the escalation phases
//! (memory → chain → convergence → hybrid) and packages the outcome as a
//! [`SolveResult`].
//!
//! The harness does NOT implement search; it delegates to `tessera-search`
//! and owns only phase order, memory distillation and result assembly.
//!
//! # Solvers
//!
//! - [`EscalationSolver`] -- one phase at a time, first success wins
//! - [`AdaptiveSwarmSolver`] -- each phase fanned out over parallel branches
//!   with an adaptive branch factor

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
mod shared;
pub mod error;
pub mod escalation;
pub mod result;
pub mod swarm;

pub use config::{ConfigError, SolverConfig, SwarmConfig};
pub use error::SolveError;
pub use escalation::EscalationSolver;
pub use result::{SolveResult, SolveStats, SolveStatus};
pub use swarm::{adapt, AdaptiveSwarmSolver};

//! Tessera Kernel: grids, primitives, pipelines and the validation oracle.
//!
//! # API Surface
//!
//! - [`primitives::apply::apply_step`] -- apply one registered primitive to a grid
//! - [`pipeline::Pipeline::apply`] -- apply a whole pipeline left to right
//! - [`pipeline::canonicalize::canonicalize`] -- reduce a pipeline to canonical form
//! - [`oracle::validate`] / [`oracle::score`] -- check a pipeline against training pairs
//!
//! # Module Dependency Direction
//!
//! `digest` ← `grid` ← `task` ← `primitives` ← `pipeline` ← `oracle`
//!
//! One-way only. No cycles. `digest` depends on nothing internal.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod digest;
pub mod grid;
pub mod oracle;
pub mod pipeline;
pub mod primitives;
pub mod task;

pub use grid::{Grid, GridError};
pub use pipeline::{Pipeline, Step};
pub use primitives::apply::KernelError;
pub use primitives::registry::{standard_registry, PrimitiveRegistryV1};
pub use task::{Task, TestPair, TrainingPair};

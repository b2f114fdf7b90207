//! Tessera Search: bounded pipeline enumeration over grid transformations.
//!
//! This crate provides the search layer. It depends on `tessera_kernel` and
//! `tessera_memory`; it does NOT depend on `tessera_harness`.
//!
//! # Crate dependency graph
//!
//! ```text
//! tessera_kernel  ←  tessera_memory  ←  tessera_search  ←  tessera_harness
//! (grids, oracle)    (fingerprints)      (chain, hybrid)     (orchestrators)
//! ```
//!
//! # Key types
//!
//! - [`ChainCursor`]: lazy BFS/DFS enumeration from one grid
//! - [`HybridSearch`]: beam + depth-first engine as an event stream
//! - [`SearchEvent`]: discriminated search events, one terminal per stream
//! - [`HybridBudgetV1`] / [`ChainBudgetV1`]: mandatory search budgets
//! - [`CandidateGenerator`]: trait proposing child steps
//! - [`Convergence`]: trait for the stabilization collaborator
//! - [`CheckpointSink`]: destination for periodic checkpoints

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod budget;
pub mod cancel;
pub mod candidates;
pub mod chain;
pub mod checkpoint;
pub mod convergence;
pub mod error;
pub mod event;
pub mod frontier;
pub mod hybrid;
pub mod state;

pub use budget::{ChainBudgetV1, HybridBudgetV1};
pub use cancel::CancelToken;
pub use candidates::{CandidateGenerator, RegistryGenerator};
pub use chain::{
    find_best_chain, find_valid_chain, rank_chains, ChainCandidate, ChainCursor, ChainOrder, ChainRanking, ChainReport,
    ChainSearch, ChainStop, RankedChain,
};
pub use checkpoint::{
    CheckpointError, CheckpointSink, CheckpointV1, FileSink, MemorySink, NullSink, CHECKPOINT_SCHEMA_VERSION,
};
pub use convergence::{converge_guarded, Converged, Convergence, FixedPointConvergence, NoConvergence};
pub use error::SearchError;
pub use event::{SearchEvent, SearchPhase};
pub use hybrid::{search, HybridSearch, SearchContext, SearchOutcome};
pub use state::SearchState;

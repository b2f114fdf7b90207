//! Typed solve errors.
//!
//! Only contract violations and configuration problems surface here. A task
//! the solver cannot answer is a [`crate::result::SolveStatus`], not an
//! error.

use tessera_kernel::KernelError;
use tessera_search::SearchError;

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum SolveError {
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Kernel(#[from] KernelError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

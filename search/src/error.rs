//! Typed search errors.
//!
//! `SearchError` represents pre-flight failures and kernel contract
//! violations only. Budget exhaustion is not an error: it is reported as a
//! terminal [`crate::event::SearchEvent`].

use tessera_kernel::KernelError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// A budget field is missing (zero) or inconsistent. Raised before any
    /// step runs.
    #[error("invalid search budget: {detail}")]
    InvalidBudget { detail: String },
    /// A pipeline named an unknown primitive or used the wrong arity.
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

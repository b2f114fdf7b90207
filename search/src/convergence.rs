//! Convergence collaborator: stabilizes a grid toward a fixed point.
//!
//! Search only depends on the [`Convergence`] trait. Two implementations
//! ship here: [`FixedPointConvergence`] and [`NoConvergence`].

use std::panic::{catch_unwind, AssertUnwindSafe};

use tessera_kernel::{Grid, Pipeline, PrimitiveRegistryV1};

/// A grid that stopped changing, with the iteration count that got it there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged {
    pub grid: Grid,
    pub iterations: usize,
}

/// `converge(input, operations, max_iterations) -> Grid | Absent`.
///
/// # Contract
///
/// - Deterministic for the same inputs.
/// - Returns `None` when no fixed point is reached within
///   `max_iterations` or the operations do not apply.
pub trait Convergence: Send + Sync {
    fn converge(
        &self,
        input: &Grid,
        operations: &Pipeline,
        max_iterations: usize,
        registry: &PrimitiveRegistryV1,
    ) -> Option<Converged>;
}

/// Reapplies the operations until the grid stops changing.
///
/// `iterations` counts applications that changed the grid; a pipeline that
/// leaves the input fixed converges after zero iterations.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPointConvergence;

impl Convergence for FixedPointConvergence {
    fn converge(
        &self,
        input: &Grid,
        operations: &Pipeline,
        max_iterations: usize,
        registry: &PrimitiveRegistryV1,
    ) -> Option<Converged> {
        let mut current = input.clone();
        for iterations in 0..max_iterations {
            let next = operations.apply(&current, registry).ok()??;
            if next == current {
                return Some(Converged {
                    grid: current,
                    iterations,
                });
            }
            current = next;
        }
        None
    }
}

/// Never converges.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoConvergence;

impl Convergence for NoConvergence {
    fn converge(&self, _: &Grid, _: &Pipeline, _: usize, _: &PrimitiveRegistryV1) -> Option<Converged> {
        None
    }
}

/// Run a collaborator, treating a panic as Absent.
pub fn converge_guarded(
    convergence: &dyn Convergence,
    input: &Grid,
    operations: &Pipeline,
    max_iterations: usize,
    registry: &PrimitiveRegistryV1,
) -> Option<Converged> {
    catch_unwind(AssertUnwindSafe(|| {
        convergence.converge(input, operations, max_iterations, registry)
    }))
    .unwrap_or_else(|_| {
        tracing::warn!(pipeline = %operations, "convergence collaborator panicked; treating as absent");
        None
    })
}

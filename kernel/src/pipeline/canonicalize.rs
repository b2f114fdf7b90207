//! Canonical form of a pipeline.
//!
//! A single stack-reduction pass over the steps:
//! - identity steps are dropped;
//! - a step immediately followed by its declared inverse cancels;
//! - a step with a declared square, applied twice, becomes that square.
//!
//! Every adjacent pair left on the stack is irreducible, so the result is a
//! fixed point: canonicalizing twice equals canonicalizing once. The output
//! is never longer than the input. Names the registry does not know pass
//! through untouched.

use super::{Pipeline, Step};
use crate::primitives::registry::PrimitiveRegistryV1;

/// Reduce `pipeline` to canonical form.
#[must_use]
pub fn canonicalize(pipeline: &Pipeline, registry: &PrimitiveRegistryV1) -> Pipeline {
    let mut stack: Vec<Step> = Vec::with_capacity(pipeline.depth());
    for step in pipeline.steps() {
        let is_identity = registry.get(&step.name).is_some_and(|e| e.algebra.identity);
        if !is_identity {
            push_reduced(&mut stack, step.clone(), registry);
        }
    }
    Pipeline::new(stack)
}

fn push_reduced(stack: &mut Vec<Step>, step: Step, registry: &PrimitiveRegistryV1) {
    let Some(top) = stack.last() else {
        stack.push(step);
        return;
    };
    let Some(algebra) = registry.get(&top.name).map(|e| e.algebra) else {
        stack.push(step);
        return;
    };
    if algebra.inverse == Some(step.name.as_str()) {
        let reversed = top.args.len() == 2
            && step.args.len() == 2
            && top.args[0] == step.args[1]
            && top.args[1] == step.args[0];
        if top.args == step.args || (algebra.symmetric_args && reversed) {
            stack.pop();
            return;
        }
    }
    if let Some(square) = algebra.square {
        if top.name == step.name && top.args == step.args {
            stack.pop();
            push_reduced(stack, Step::nullary(square), registry);
            return;
        }
    }
    stack.push(step);
}

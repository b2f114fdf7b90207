//! Pipelines: ordered primitive invocations applied left to right.
//!
//! A pipeline fails as a whole if any step is inapplicable. Rendering uses
//! `" > "` between steps, e.g. `replace(1,2) > flip_v`.

pub mod canonicalize;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::hash::{canonical_hash, ContentHash};
use crate::digest::hash_domain::HashDomain;
use crate::grid::Grid;
use crate::primitives::apply::{apply_step, KernelError};
use crate::primitives::registry::PrimitiveRegistryV1;

/// One primitive invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<u8>,
}

impl Step {
    #[must_use]
    pub fn new(name: impl Into<String>, args: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// A step without arguments.
    #[must_use]
    pub fn nullary(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    /// Apply this step to `grid`. See [`apply_step`].
    ///
    /// # Errors
    ///
    /// Propagates [`KernelError`] for unknown names or wrong arity.
    pub fn apply(&self, grid: &Grid, registry: &PrimitiveRegistryV1) -> Result<Option<Grid>, KernelError> {
        apply_step(grid, &self.name, &self.args, registry)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            let args: Vec<String> = self.args.iter().map(u8::to_string).collect();
            write!(f, "({})", args.join(","))?;
        }
        Ok(())
    }
}

/// Ordered composition of steps. Depth is the step count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    #[must_use]
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// A new pipeline with `step` appended.
    #[must_use]
    pub fn then(&self, step: Step) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend_from_slice(&self.steps);
        steps.push(step);
        Self { steps }
    }

    /// This pipeline's steps `times` times over.
    #[must_use]
    pub fn repeat(&self, times: usize) -> Self {
        Self {
            steps: (0..times).flat_map(|_| self.steps.iter().cloned()).collect(),
        }
    }

    /// Primitive names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.name.as_str())
    }

    /// Apply every step in order. `Ok(None)` if any step is inapplicable.
    ///
    /// # Errors
    ///
    /// Propagates [`KernelError`] for unknown names or wrong arity.
    pub fn apply(&self, grid: &Grid, registry: &PrimitiveRegistryV1) -> Result<Option<Grid>, KernelError> {
        let mut current = grid.clone();
        for step in &self.steps {
            match step.apply(&current, registry)? {
                Some(next) => current = next,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Stable identity: per step, name length (u32 LE), name, arg count
    /// (u32 LE), args.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        let mut bytes = Vec::new();
        for step in &self.steps {
            bytes.extend_from_slice(&u32::try_from(step.name.len()).unwrap_or(u32::MAX).to_le_bytes());
            bytes.extend_from_slice(step.name.as_bytes());
            bytes.extend_from_slice(&u32::try_from(step.args.len()).unwrap_or(u32::MAX).to_le_bytes());
            bytes.extend_from_slice(&step.args);
        }
        canonical_hash(HashDomain::Pipeline, &bytes)
    }
}

impl FromIterator<Step> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<empty>");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::grid;
    use crate::primitives::registry::standard_registry;

    #[test]
    fn applies_left_to_right() {
        let reg = standard_registry();
        let p = Pipeline::new(vec![Step::new("replace", vec![1, 2]), Step::nullary("flip_v")]);
        let out = p.apply(&grid(&[[1, 1], [0, 0]]), &reg).unwrap().unwrap();
        assert_eq!(out, grid(&[[0, 0], [2, 2]]));
        assert_eq!(p.to_string(), "replace(1,2) > flip_v");
    }

    #[test]
    fn inapplicable_step_fails_whole_pipeline() {
        let reg = standard_registry();
        let p = Pipeline::new(vec![Step::nullary("flip_h"), Step::nullary("crop")]);
        assert_eq!(p.apply(&grid(&[[0, 0]]), &reg).unwrap(), None);
    }

    #[test]
    fn unknown_step_is_error_even_after_absent() {
        let reg = standard_registry();
        let p = Pipeline::new(vec![Step::nullary("teleport")]);
        assert!(p.apply(&grid(&[[1]]), &reg).is_err());
    }

    #[test]
    fn empty_pipeline_is_identity() {
        let reg = standard_registry();
        let g = grid(&[[3, 4]]);
        assert_eq!(Pipeline::empty().apply(&g, &reg).unwrap(), Some(g));
        assert_eq!(Pipeline::empty().to_string(), "<empty>");
    }

    #[test]
    fn json_shape() {
        let p = Pipeline::new(vec![Step::nullary("flip_v"), Step::new("fill", vec![3])]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"[{"name":"flip_v"},{"name":"fill","args":[3]}]"#);
        let back: Pipeline = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn content_hash_separates_names_and_args() {
        let a = Pipeline::new(vec![Step::new("fill", vec![1])]);
        let b = Pipeline::new(vec![Step::new("fill", vec![2])]);
        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash(), a.clone().content_hash());
    }

    #[test]
    fn then_and_repeat() {
        let p = Pipeline::empty().then(Step::nullary("flip_h"));
        assert_eq!(p.repeat(3).depth(), 3);
        assert_eq!(p.names().collect::<Vec<_>>(), vec!["flip_h"]);
    }

    #[test]
    fn repeat_clones_steps_with_args_in_order() {
        let p = Pipeline::new(vec![Step::new("replace", vec![1, 2]), Step::nullary("flip_v")]);
        let twice = p.repeat(2);
        assert_eq!(
            twice,
            Pipeline::new(vec![
                Step::new("replace", vec![1, 2]),
                Step::nullary("flip_v"),
                Step::new("replace", vec![1, 2]),
                Step::nullary("flip_v"),
            ])
        );
        assert_eq!(p.repeat(0), Pipeline::empty());
    }
}

//! Per-primitive usage weights learned from distilled pipelines.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_kernel::Pipeline;

/// Usage counters for one primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveStat {
    pub uses: u64,
    pub wins: u64,
}

/// Primitive name → counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Heuristics {
    stats: BTreeMap<String, PrimitiveStat>,
}

impl Heuristics {
    /// Count every step of `pipeline` as used, and as a win if it solved.
    pub fn record(&mut self, pipeline: &Pipeline, won: bool) {
        for name in pipeline.names() {
            let stat = self.stats.entry(name.to_string()).or_default();
            stat.uses += 1;
            if won {
                stat.wins += 1;
            }
        }
    }

    /// Win ratio in `[0, 1)`; zero for primitives never seen.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn weight(&self, name: &str) -> f64 {
        self.stats
            .get(name)
            .map_or(0.0, |s| s.wins as f64 / (s.uses as f64 + 1.0))
    }

    /// Mean weight over a pipeline's steps.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pipeline_bonus(&self, pipeline: &Pipeline) -> f64 {
        if pipeline.is_empty() {
            return 0.0;
        }
        pipeline.names().map(|n| self.weight(n)).sum::<f64>() / pipeline.depth() as f64
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<PrimitiveStat> {
        self.stats.get(name).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Replace `self` with `disk` plus the increments made since `base`.
    ///
    /// `base` is the snapshot `self` started from. Writers that each add to
    /// the same base keep both increments.
    pub fn rebase(&mut self, base: &Self, disk: &Self) {
        let mut merged = disk.clone();
        for (name, mine) in &self.stats {
            let before = base.get(name).unwrap_or_default();
            let stat = merged.stats.entry(name.clone()).or_default();
            stat.uses += mine.uses.saturating_sub(before.uses);
            stat.wins += mine.wins.saturating_sub(before.wins);
        }
        *self = merged;
    }
}

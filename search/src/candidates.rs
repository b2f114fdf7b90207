//! Candidate generation: which steps to try from a search state.

use tessera_kernel::grid::PALETTE_SIZE;
use tessera_kernel::{Grid, PrimitiveRegistryV1, Step, TrainingPair};

/// Proposes child steps for a state.
///
/// # Contract
///
/// - Every proposed step must name a primitive in the registry the search
///   runs with, with the declared arity.
/// - Proposal must be deterministic: same `(grids, palette)`, same steps in
///   the same order.
pub trait CandidateGenerator: Send + Sync {
    fn candidates(&self, grids: &[Grid], palette: &[u8]) -> Vec<Step>;
}

/// Default generator: every registry primitive (except identity) with every
/// argument instance the palette allows, in catalogue order.
#[derive(Debug, Clone)]
pub struct RegistryGenerator {
    registry: PrimitiveRegistryV1,
}

impl RegistryGenerator {
    #[must_use]
    pub fn new(registry: PrimitiveRegistryV1) -> Self {
        Self { registry }
    }

    #[must_use]
    pub fn registry(&self) -> &PrimitiveRegistryV1 {
        &self.registry
    }
}

impl CandidateGenerator for RegistryGenerator {
    fn candidates(&self, _grids: &[Grid], palette: &[u8]) -> Vec<Step> {
        self.registry
            .iter()
            .filter(|e| !e.algebra.identity)
            .flat_map(|e| {
                e.params
                    .instances(palette)
                    .into_iter()
                    .map(move |args| Step::new(e.name, args))
            })
            .collect()
    }
}

/// Colors appearing in any training output, ascending.
#[must_use]
pub fn output_colors(pairs: &[TrainingPair]) -> Vec<u8> {
    palette(pairs.iter().map(|p| &p.output), &[])
}

/// Colors a generator may use as arguments: those present in `grids` plus
/// `extra`, ascending and deduplicated.
#[must_use]
pub fn palette<'a>(grids: impl IntoIterator<Item = &'a Grid>, extra: &[u8]) -> Vec<u8> {
    let mut present = [false; PALETTE_SIZE];
    for g in grids {
        for c in g.colors() {
            present[usize::from(c)] = true;
        }
    }
    for &c in extra {
        if let Some(slot) = present.get_mut(usize::from(c)) {
            *slot = true;
        }
    }
    present
        .iter()
        .enumerate()
        .filter(|(_, &on)| on)
        .filter_map(|(c, _)| u8::try_from(c).ok())
        .collect()
}

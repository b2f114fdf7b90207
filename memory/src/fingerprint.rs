//! Task fingerprints: a categorical signature of how training inputs relate
//! to their outputs, plus a stable hash used as the memory key.
//!
//! Classification uses the first pair; size ratios come from every pair.
//! Fingerprinting is a pure function of the training pairs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessera_kernel::digest::canon::canonical_json_of;
use tessera_kernel::digest::hash::{canonical_hash, ContentHash};
use tessera_kernel::digest::hash_domain::HashDomain;
use tessera_kernel::primitives::apply::apply_step;
use tessera_kernel::{standard_registry, Grid, TrainingPair};

// ---------------------------------------------------------------------------
// Feature classes
// ---------------------------------------------------------------------------

/// How output dimensions relate to input dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimChange {
    Same,
    /// Both sides exactly doubled.
    ScaleBy2,
    /// Rows and columns exchanged (non-square input).
    Transpose,
    Expand,
    Shrink,
    /// Different shape with the same area.
    Reshape,
}

/// How the number of distinct colors changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorChange {
    Preserve,
    Add,
    Reduce,
}

/// Coarse geometric relation between input and output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
    FlipH,
    FlipV,
    Rotate180,
    Rotate90,
    Rotate270,
    None,
}

/// Consistent per-cell color mapping, when shapes agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pairs", rename_all = "snake_case")]
pub enum Remap {
    /// Every cell keeps its color.
    Identity,
    /// Each listed `(from, to)` is applied everywhere; unlisted colors stay.
    Colors(Vec<(u8, u8)>),
    /// No single mapping explains the pair (or shapes differ).
    None,
}

/// Reduced fraction `output cells / input cells`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SizeRatio {
    pub num: u64,
    pub den: u64,
}

impl SizeRatio {
    #[must_use]
    pub fn of(output_cells: usize, input_cells: usize) -> Self {
        let (num, den) = (output_cells as u64, input_cells.max(1) as u64);
        let g = gcd(num, den).max(1);
        Self {
            num: num / g,
            den: den / g,
        }
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// Signature of a task's training pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub dim_change: DimChange,
    pub color_change: ColorChange,
    pub symmetry: Symmetry,
    pub remap: Remap,
    /// Change in non-zero fraction, per mille.
    pub density_delta: i32,
    pub size_ratios: Vec<SizeRatio>,
    pub hash: ContentHash,
    /// No training data; matches nothing.
    #[serde(default)]
    pub degenerate: bool,
}

/// The hashed subset of a fingerprint.
#[derive(Serialize)]
struct HashedFeatures<'a> {
    color_change: ColorChange,
    dim_change: DimChange,
    remap: &'a Remap,
    size_ratios: &'a [SizeRatio],
    symmetry: Symmetry,
}

impl Fingerprint {
    /// Sentinel for empty training data.
    #[must_use]
    pub fn degenerate() -> Self {
        Self {
            dim_change: DimChange::Same,
            color_change: ColorChange::Preserve,
            symmetry: Symmetry::None,
            remap: Remap::None,
            density_delta: 0,
            size_ratios: Vec::new(),
            hash: ContentHash::zero(),
            degenerate: true,
        }
    }
}

/// Compute the fingerprint of a task's training pairs.
#[must_use]
pub fn fingerprint(pairs: &[TrainingPair]) -> Fingerprint {
    let Some(first) = pairs.first() else {
        return Fingerprint::degenerate();
    };
    let (input, output) = (&first.input, &first.output);
    let dim_change = classify_dims(input, output);
    let color_change = classify_colors(input, output);
    let symmetry = classify_symmetry(input, output);
    let remap = classify_remap(input, output);
    let density_delta = density_per_mille(output) - density_per_mille(input);
    let size_ratios: Vec<SizeRatio> = pairs
        .iter()
        .map(|p| SizeRatio::of(p.output.area(), p.input.area()))
        .collect();

    let features = HashedFeatures {
        color_change,
        dim_change,
        remap: &remap,
        size_ratios: &size_ratios,
        symmetry,
    };
    let hash = match canonical_json_of(&features) {
        Ok(bytes) => canonical_hash(HashDomain::Fingerprint, &bytes),
        Err(e) => {
            tracing::warn!(error = %e, "fingerprint canonicalization failed; using degenerate sentinel");
            return Fingerprint::degenerate();
        }
    };

    Fingerprint {
        dim_change,
        color_change,
        symmetry,
        remap,
        density_delta,
        size_ratios,
        hash,
        degenerate: false,
    }
}

/// Equal-weighted fraction of agreeing top-level features, in `[0, 1]`.
///
/// Identical hashes give 1.0; a degenerate side gives 0.0.
#[must_use]
pub fn similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    if a.degenerate || b.degenerate {
        return 0.0;
    }
    if a.hash == b.hash {
        return 1.0;
    }
    let agreeing = [
        a.dim_change == b.dim_change,
        a.color_change == b.color_change,
        a.symmetry == b.symmetry,
        a.size_ratios.first() == b.size_ratios.first(),
    ]
    .iter()
    .filter(|&&same| same)
    .count();
    f64::from(u32::try_from(agreeing).unwrap_or(0)) / 4.0
}

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

fn classify_dims(input: &Grid, output: &Grid) -> DimChange {
    let (ir, ic) = input.dims();
    let (or, oc) = output.dims();
    if (ir, ic) == (or, oc) {
        DimChange::Same
    } else if (or, oc) == (ir * 2, ic * 2) {
        DimChange::ScaleBy2
    } else if (or, oc) == (ic, ir) {
        DimChange::Transpose
    } else if output.area() > input.area() {
        DimChange::Expand
    } else if output.area() < input.area() {
        DimChange::Shrink
    } else {
        DimChange::Reshape
    }
}

fn classify_colors(input: &Grid, output: &Grid) -> ColorChange {
    match output.colors().len().cmp(&input.colors().len()) {
        std::cmp::Ordering::Equal => ColorChange::Preserve,
        std::cmp::Ordering::Greater => ColorChange::Add,
        std::cmp::Ordering::Less => ColorChange::Reduce,
    }
}

fn classify_symmetry(input: &Grid, output: &Grid) -> Symmetry {
    let registry = standard_registry();
    let candidates = [
        ("flip_h", Symmetry::FlipH),
        ("flip_v", Symmetry::FlipV),
        ("rotate_180", Symmetry::Rotate180),
        ("rotate_90", Symmetry::Rotate90),
        ("rotate_270", Symmetry::Rotate270),
    ];
    for (name, class) in candidates {
        if let Ok(Some(out)) = apply_step(input, name, &[], &registry) {
            if &out == output {
                return class;
            }
        }
    }
    Symmetry::None
}

fn classify_remap(input: &Grid, output: &Grid) -> Remap {
    if input.dims() != output.dims() {
        return Remap::None;
    }
    let mut mapping: BTreeMap<u8, u8> = BTreeMap::new();
    for (&from, &to) in input.cells().iter().zip(output.cells()) {
        if *mapping.entry(from).or_insert(to) != to {
            return Remap::None;
        }
    }
    let changed: Vec<(u8, u8)> = mapping.into_iter().filter(|(f, t)| f != t).collect();
    if changed.is_empty() {
        Remap::Identity
    } else {
        Remap::Colors(changed)
    }
}

fn density_per_mille(g: &Grid) -> i32 {
    let per_mille = g.nonzero_count() * 1000 / g.area().max(1);
    i32::try_from(per_mille).unwrap_or(i32::MAX)
}

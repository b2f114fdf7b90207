//! `PrimitiveRegistryV1`: the catalogue of named grid primitives.
//!
//! The registry is the **contract surface**: it declares each primitive's
//! name, category, argument layout and algebraic relations. The dispatch
//! table in `apply.rs` is the **implementation**. Search and canonicalization
//! consult only the registry; application goes through both.

use std::collections::BTreeMap;

use crate::digest::canon::canonical_json_bytes;
use crate::digest::hash::{canonical_hash, ContentHash};
use crate::digest::hash_domain::HashDomain;
use crate::grid::MAX_COLOR;

// ---------------------------------------------------------------------------
// PrimitiveCategory / ParamKind
// ---------------------------------------------------------------------------

/// Coarse family, used for diagnostics and the registry digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveCategory {
    Geometry,
    Color,
    Resize,
    Gravity,
    Frame,
    Pattern,
    Object,
}

impl PrimitiveCategory {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Color => "color",
            Self::Resize => "resize",
            Self::Gravity => "gravity",
            Self::Frame => "frame",
            Self::Pattern => "pattern",
            Self::Object => "object",
        }
    }
}

/// Declared argument layout of a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// No arguments.
    Nullary,
    /// One color.
    Color,
    /// Two distinct colors. `ordered: false` means `(a, b)` and `(b, a)` are
    /// the same instance, so only `a < b` is enumerated.
    ColorPair { ordered: bool },
    /// One integer factor in `min..=max`.
    Factor { min: u8, max: u8 },
}

impl ParamKind {
    /// Exact number of argument bytes `apply` accepts.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Nullary => 0,
            Self::Color | Self::Factor { .. } => 1,
            Self::ColorPair { .. } => 2,
        }
    }

    /// Every argument instance drawn from `palette`.
    ///
    /// Colors above 9 in the palette are skipped; duplicates are ignored.
    #[must_use]
    pub fn instances(self, palette: &[u8]) -> Vec<Vec<u8>> {
        let mut colors: Vec<u8> = palette.iter().copied().filter(|&c| c <= MAX_COLOR).collect();
        colors.sort_unstable();
        colors.dedup();
        match self {
            Self::Nullary => vec![Vec::new()],
            Self::Color => colors.into_iter().map(|c| vec![c]).collect(),
            Self::ColorPair { ordered } => {
                let mut out = Vec::new();
                for &a in &colors {
                    for &b in &colors {
                        if a != b && (ordered || a < b) {
                            out.push(vec![a, b]);
                        }
                    }
                }
                out
            }
            Self::Factor { min, max } => (min..=max).map(|k| vec![k]).collect(),
        }
    }

    fn describe(self) -> String {
        match self {
            Self::Nullary => "nullary".into(),
            Self::Color => "color".into(),
            Self::ColorPair { ordered: true } => "color_pair".into(),
            Self::ColorPair { ordered: false } => "color_set".into(),
            Self::Factor { min, max } => format!("factor_{min}_{max}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Algebra: the relations canonicalization relies on
// ---------------------------------------------------------------------------

/// Algebraic facts about a primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Algebra {
    /// Applying it never changes the grid.
    pub identity: bool,
    /// Name of the primitive that undoes it when called with the same
    /// arguments.
    pub inverse: Option<&'static str>,
    /// The inverse also matches with the two arguments reversed.
    pub symmetric_args: bool,
    /// Name of the single primitive equal to applying this one twice.
    pub square: Option<&'static str>,
}

impl Algebra {
    const NONE: Self = Self {
        identity: false,
        inverse: None,
        symmetric_args: false,
        square: None,
    };

    const fn involution(name: &'static str) -> Self {
        Self {
            inverse: Some(name),
            ..Self::NONE
        }
    }
}

// ---------------------------------------------------------------------------
// PrimitiveEntry
// ---------------------------------------------------------------------------

/// A single entry in the primitive registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveEntry {
    pub name: &'static str,
    pub category: PrimitiveCategory,
    pub params: ParamKind,
    pub algebra: Algebra,
}

impl PrimitiveEntry {
    const fn new(name: &'static str, category: PrimitiveCategory, params: ParamKind) -> Self {
        Self {
            name,
            category,
            params,
            algebra: Algebra::NONE,
        }
    }

    const fn with_algebra(mut self, algebra: Algebra) -> Self {
        self.algebra = algebra;
        self
    }
}

// ---------------------------------------------------------------------------
// RegistryError
// ---------------------------------------------------------------------------

/// Error type for registry construction and digesting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate primitive name in registry: {name}")]
    DuplicateName { name: String },
    #[error("primitive not in registry: {name}")]
    UnknownName { name: String },
    #[error("primitive registry canonicalization failed: {detail}")]
    Canonicalization { detail: String },
}

// ---------------------------------------------------------------------------
// PrimitiveRegistryV1
// ---------------------------------------------------------------------------

/// Ordered catalogue of primitives, looked up by name.
///
/// Iteration follows declaration order, which is also the order the
/// candidate generator proposes primitives in.
#[derive(Debug, Clone)]
pub struct PrimitiveRegistryV1 {
    entries: Vec<PrimitiveEntry>,
    index: BTreeMap<&'static str, usize>,
    schema_version: String,
}

impl PrimitiveRegistryV1 {
    /// Build a registry from a list of entries.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateName`] if two entries share a name.
    pub fn new(schema_version: String, entries: Vec<PrimitiveEntry>) -> Result<Self, RegistryError> {
        let mut index = BTreeMap::new();
        for (i, entry) in entries.iter().enumerate() {
            if index.insert(entry.name, i).is_some() {
                return Err(RegistryError::DuplicateName {
                    name: entry.name.to_string(),
                });
            }
        }
        Ok(Self {
            entries,
            index,
            schema_version,
        })
    }

    /// A registry holding only `names`, in catalogue order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownName`] if a name is not registered.
    pub fn subset(&self, names: &[&str]) -> Result<Self, RegistryError> {
        if let Some(missing) = names.iter().find(|n| !self.contains(n)) {
            return Err(RegistryError::UnknownName {
                name: (*missing).to_string(),
            });
        }
        let entries = self
            .entries
            .iter()
            .filter(|e| names.contains(&e.name))
            .cloned()
            .collect();
        Self::new(self.schema_version.clone(), entries)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PrimitiveEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &PrimitiveEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Canonical JSON of the catalogue: names, categories and argument
    /// layouts in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Canonicalization`] if canonical JSON
    /// serialization fails.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, RegistryError> {
        let entries: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "arity": e.params.arity() as u64,
                    "category": e.category.as_str(),
                    "name": e.name,
                    "params": e.params.describe(),
                })
            })
            .collect();
        let value = serde_json::json!({
            "entries": entries,
            "schema_version": self.schema_version,
        });
        canonical_json_bytes(&value).map_err(|e| RegistryError::Canonicalization {
            detail: e.to_string(),
        })
    }

    /// Content digest of [`Self::canonical_bytes`].
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError::Canonicalization`].
    pub fn digest(&self) -> Result<ContentHash, RegistryError> {
        Ok(canonical_hash(HashDomain::PrimitiveRegistry, &self.canonical_bytes()?))
    }
}

// ---------------------------------------------------------------------------
// standard_registry(): the full catalogue
// ---------------------------------------------------------------------------

/// Registry schema tag.
pub const REGISTRY_SCHEMA_VERSION: &str = "primitive_registry.v1";

fn catalogue() -> Vec<PrimitiveEntry> {
    use ParamKind::{Color, ColorPair, Factor, Nullary};
    use PrimitiveCategory as Cat;

    vec![
        PrimitiveEntry::new("identity", Cat::Geometry, Nullary).with_algebra(Algebra {
            identity: true,
            ..Algebra::NONE
        }),
        PrimitiveEntry::new("rotate_90", Cat::Geometry, Nullary).with_algebra(Algebra {
            inverse: Some("rotate_270"),
            square: Some("rotate_180"),
            ..Algebra::NONE
        }),
        PrimitiveEntry::new("rotate_180", Cat::Geometry, Nullary)
            .with_algebra(Algebra::involution("rotate_180")),
        PrimitiveEntry::new("rotate_270", Cat::Geometry, Nullary).with_algebra(Algebra {
            inverse: Some("rotate_90"),
            square: Some("rotate_180"),
            ..Algebra::NONE
        }),
        PrimitiveEntry::new("flip_h", Cat::Geometry, Nullary).with_algebra(Algebra::involution("flip_h")),
        PrimitiveEntry::new("flip_v", Cat::Geometry, Nullary).with_algebra(Algebra::involution("flip_v")),
        PrimitiveEntry::new("flip_diag", Cat::Geometry, Nullary)
            .with_algebra(Algebra::involution("flip_diag")),
        PrimitiveEntry::new("transpose", Cat::Geometry, Nullary)
            .with_algebra(Algebra::involution("transpose")),
        PrimitiveEntry::new("fill", Cat::Color, Color),
        PrimitiveEntry::new("replace", Cat::Color, ColorPair { ordered: true }),
        PrimitiveEntry::new("swap", Cat::Color, ColorPair { ordered: false }).with_algebra(Algebra {
            inverse: Some("swap"),
            symmetric_args: true,
            ..Algebra::NONE
        }),
        PrimitiveEntry::new("majority_fill", Cat::Color, Nullary),
        PrimitiveEntry::new("count_fill", Cat::Color, Nullary),
        PrimitiveEntry::new("upscale", Cat::Resize, Factor { min: 2, max: 5 }),
        PrimitiveEntry::new("downscale", Cat::Resize, Factor { min: 2, max: 5 }),
        PrimitiveEntry::new("tile", Cat::Resize, Factor { min: 2, max: 4 }),
        PrimitiveEntry::new("mirror_h", Cat::Resize, Nullary),
        PrimitiveEntry::new("mirror_v", Cat::Resize, Nullary),
        PrimitiveEntry::new("gravity_down", Cat::Gravity, Nullary),
        PrimitiveEntry::new("gravity_up", Cat::Gravity, Nullary),
        PrimitiveEntry::new("gravity_left", Cat::Gravity, Nullary),
        PrimitiveEntry::new("gravity_right", Cat::Gravity, Nullary),
        PrimitiveEntry::new("border_extract", Cat::Frame, Nullary),
        PrimitiveEntry::new("border_fill", Cat::Frame, Color),
        PrimitiveEntry::new("border_remove", Cat::Frame, Nullary),
        PrimitiveEntry::new("crop", Cat::Frame, Nullary),
        PrimitiveEntry::new("pad", Cat::Frame, Factor { min: 1, max: 3 }),
        PrimitiveEntry::new("continue_rows", Cat::Pattern, Nullary),
        PrimitiveEntry::new("continue_cols", Cat::Pattern, Nullary),
        PrimitiveEntry::new("align_center", Cat::Object, Nullary),
        PrimitiveEntry::new("align_corner", Cat::Object, Nullary),
        PrimitiveEntry::new("largest_component", Cat::Object, Nullary),
    ]
}

/// The full catalogue every solver uses by default.
#[must_use]
pub fn standard_registry() -> PrimitiveRegistryV1 {
    let entries = catalogue();
    let index = entries.iter().enumerate().map(|(i, e)| (e.name, i)).collect();
    PrimitiveRegistryV1 {
        entries,
        index,
        schema_version: REGISTRY_SCHEMA_VERSION.into(),
    }
}

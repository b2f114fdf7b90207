//! Beam frontier with global loop detection.
//!
//! Uses a `BTreeSet` visited set (not `HashSet`) so membership and any
//! serialization of it are order-stable.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

use tessera_kernel::digest::hash::ContentHash;

use crate::state::SearchState;

type FrontierKey = (Reverse<i64>, usize, u64);

/// A frontier entry wrapping a state with its ordering key.
///
/// `BinaryHeap` is a max-heap, so the key is wrapped in `Reverse` to pop the
/// smallest key (best rank) first.
#[derive(Debug)]
struct FrontierEntry {
    key: Reverse<FrontierKey>,
    state: SearchState,
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Level-synchronous beam.
///
/// Maintains:
/// - A `BinaryHeap` of the states admitted to the next level
/// - A `BTreeSet<ContentHash>` of every state hash ever admitted
pub struct BeamFrontier {
    heap: BinaryHeap<FrontierEntry>,
    visited: BTreeSet<ContentHash>,
    high_water: u64,
}

impl BeamFrontier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            visited: BTreeSet::new(),
            high_water: 0,
        }
    }

    /// Admit a state and mark its hash as visited.
    ///
    /// Returns `false` if the hash was already visited (state not added).
    pub fn push(&mut self, state: SearchState) -> bool {
        if !self.visited.insert(state.hash.clone()) {
            return false;
        }
        self.heap.push(FrontierEntry {
            key: Reverse(state.key()),
            state,
        });
        let size = self.heap.len() as u64;
        if size > self.high_water {
            self.high_water = size;
        }
        true
    }

    /// Mark a hash visited without admitting a state (roots, memory seeds).
    pub fn mark_visited(&mut self, hash: &ContentHash) -> bool {
        self.visited.insert(hash.clone())
    }

    #[must_use]
    pub fn is_visited(&self, hash: &ContentHash) -> bool {
        self.visited.contains(hash)
    }

    /// Pop the best state.
    #[must_use]
    pub fn pop(&mut self) -> Option<SearchState> {
        self.heap.pop().map(|e| e.state)
    }

    /// Keep at most `max_size` states, best first by key.
    ///
    /// Returns the `creation_order` of pruned states. Pruned hashes stay
    /// visited.
    pub fn prune_to(&mut self, max_size: usize) -> Vec<u64> {
        if self.heap.len() <= max_size {
            return Vec::new();
        }
        let mut entries: Vec<FrontierEntry> = self.heap.drain().collect();
        entries.sort_by(|a, b| a.key.0.cmp(&b.key.0));
        let pruned = entries[max_size..].iter().map(|e| e.state.creation_order).collect();
        entries.truncate(max_size);
        self.heap = entries.into_iter().collect();
        pruned
    }

    /// Remove every state, best first. The visited set is kept.
    pub fn drain_sorted(&mut self) -> Vec<SearchState> {
        let mut entries: Vec<FrontierEntry> = self.heap.drain().collect();
        entries.sort_by(|a, b| a.key.0.cmp(&b.key.0));
        entries.into_iter().map(|e| e.state).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// High-water mark of frontier size.
    #[must_use]
    pub fn high_water(&self) -> u64 {
        self.high_water
    }
}

impl Default for BeamFrontier {
    fn default() -> Self {
        Self::new()
    }
}

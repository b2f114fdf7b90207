//! `MemoryStore`: bounded, score-ranked store of distilled pipelines.
//!
//! Keyed by fingerprint hash. Recall is heuristic only; callers must
//! re-validate whatever it returns. The store is the only shared mutable
//! state in a solve and is mutated by the orchestrator thread alone.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tessera_kernel::digest::hash::ContentHash;
use tessera_kernel::{Pipeline, PrimitiveRegistryV1};

use crate::config::MemoryConfig;
use crate::entry::{Confidence, MemoryEntry, Method, Outcome};
use crate::error::MemoryError;
use crate::fingerprint::{similarity, Fingerprint};
use crate::heuristics::Heuristics;
use crate::persist::{
    self, HeuristicsDocument, LockGuard, MemoryDocument, HEURISTICS_FILE, HEURISTICS_SCHEMA_VERSION,
    MEMORY_FILE, MEMORY_SCHEMA_VERSION,
};

/// A recalled pipeline with its ranking inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Recalled {
    pub pipeline: Pipeline,
    pub fingerprint_hash: ContentHash,
    pub similarity: f64,
    pub score: f64,
    pub verified: bool,
}

impl Recalled {
    /// Ranking key: similarity × score.
    #[must_use]
    pub fn rank(&self) -> f64 {
        self.similarity * self.score
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    config: MemoryConfig,
    entries: BTreeMap<ContentHash, MemoryEntry>,
    heuristics: Heuristics,
    /// Heuristics as last loaded or saved; increments since then are ours.
    heuristics_base: Heuristics,
    registry_digest: Option<String>,
}

impl MemoryStore {
    /// Open a store. With a configured directory, existing documents are
    /// loaded; missing or corrupt ones start empty.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] if the configuration is invalid.
    pub fn open(config: MemoryConfig, registry: &PrimitiveRegistryV1) -> Result<Self, MemoryError> {
        config.validate()?;
        let registry_digest = registry.digest().ok().map(|d| d.as_str().to_string());
        let mut store = Self {
            config,
            entries: BTreeMap::new(),
            heuristics: Heuristics::default(),
            heuristics_base: Heuristics::default(),
            registry_digest,
        };
        if let Some(dir) = store.config.dir.clone() {
            let (entries, digest) = persist::load_entries(&dir);
            if digest.is_some() && digest != store.registry_digest {
                tracing::warn!(
                    dir = %dir.display(),
                    "memory was written under a different primitive registry; recalled pipelines may not apply"
                );
            }
            for entry in entries {
                store.entries.insert(entry.fingerprint.hash.clone(), entry);
            }
            store.heuristics = persist::load_heuristics(&dir);
            store.heuristics_base = store.heuristics.clone();
            tracing::debug!(dir = %dir.display(), entries = store.entries.len(), "memory loaded");
            store.evict();
        }
        Ok(store)
    }

    /// A purely in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryError::InvalidConfig`] for a zero capacity.
    pub fn in_memory(capacity: usize, registry: &PrimitiveRegistryV1) -> Result<Self, MemoryError> {
        Self::open(MemoryConfig::in_memory(capacity), registry)
    }

    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
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
    pub fn get(&self, hash: &ContentHash) -> Option<&MemoryEntry> {
        self.entries.get(hash)
    }

    pub fn entries(&self) -> impl Iterator<Item = &MemoryEntry> {
        self.entries.values()
    }

    #[must_use]
    pub fn heuristics(&self) -> &Heuristics {
        &self.heuristics
    }

    // -----------------------------------------------------------------------
    // Recall
    // -----------------------------------------------------------------------

    /// Pipelines whose fingerprint similarity reaches the configured
    /// threshold, best `similarity × score` first (ties by fingerprint hash),
    /// at most `recall_limit` of them.
    #[must_use]
    pub fn recall(&self, fingerprint: &Fingerprint) -> Vec<Recalled> {
        if fingerprint.degenerate {
            return Vec::new();
        }
        let mut hits: Vec<Recalled> = self
            .entries
            .values()
            .filter_map(|e| {
                let sim = similarity(fingerprint, &e.fingerprint);
                (sim >= self.config.min_similarity).then(|| Recalled {
                    pipeline: e.pipeline.clone(),
                    fingerprint_hash: e.fingerprint.hash.clone(),
                    similarity: sim,
                    score: e.score,
                    verified: e.is_verified(),
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.rank()
                .total_cmp(&a.rank())
                .then_with(|| a.fingerprint_hash.cmp(&b.fingerprint_hash))
        });
        hits.truncate(self.config.recall_limit);
        tracing::debug!(fingerprint = %fingerprint.hash.short(12), recalled = hits.len(), "memory recall");
        hits
    }

    // -----------------------------------------------------------------------
    // Distill
    // -----------------------------------------------------------------------

    /// Record `outcome` for `pipeline` under `fingerprint`, then evict.
    pub fn distill(&mut self, fingerprint: &Fingerprint, pipeline: &Pipeline, method: Method, outcome: Outcome) {
        self.distill_at(fingerprint, pipeline, method, outcome, Utc::now());
    }

    /// [`Self::distill`] with an explicit clock.
    ///
    /// A new fingerprint is inserted on success or near miss; a failure for
    /// an unknown fingerprint is ignored. An existing entry gains a hit and
    /// a fresh last-used time. A success replaces a near-miss pipeline, or a
    /// verified one when strictly shorter. A better near miss replaces a
    /// worse near miss. Degenerate fingerprints are never stored.
    pub fn distill_at(
        &mut self,
        fingerprint: &Fingerprint,
        pipeline: &Pipeline,
        method: Method,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) {
        if fingerprint.degenerate {
            return;
        }
        match outcome {
            Outcome::Success => self.heuristics.record(pipeline, true),
            Outcome::NearMiss { .. } => self.heuristics.record(pipeline, false),
            Outcome::Failure => {}
        }

        if let Some(entry) = self.entries.get_mut(&fingerprint.hash) {
            entry.hits += 1;
            entry.last_used = now;
            match (outcome, entry.confidence) {
                (Outcome::Success, Confidence::NearMiss { .. }) => {
                    entry.successes += 1;
                    entry.pipeline = pipeline.clone();
                    entry.method = method;
                    entry.confidence = Confidence::Verified;
                }
                (Outcome::Success, Confidence::Verified) => {
                    entry.successes += 1;
                    if pipeline.depth() < entry.pipeline.depth() {
                        entry.pipeline = pipeline.clone();
                        entry.method = method;
                    }
                }
                (Outcome::NearMiss { accuracy }, Confidence::NearMiss { accuracy: held }) => {
                    if accuracy > held {
                        entry.pipeline = pipeline.clone();
                        entry.method = method;
                        entry.confidence = Confidence::NearMiss { accuracy };
                    }
                }
                (Outcome::NearMiss { .. }, Confidence::Verified) => {}
                (Outcome::Failure, _) => entry.failures += 1,
            }
            entry.rescore(now);
            tracing::debug!(fingerprint = %fingerprint.hash.short(12), hits = entry.hits, score = entry.score, "memory entry updated");
        } else {
            let (confidence, successes) = match outcome {
                Outcome::Success => (Confidence::Verified, 1),
                Outcome::NearMiss { accuracy } => (Confidence::NearMiss { accuracy }, 0),
                Outcome::Failure => return,
            };
            let mut entry = MemoryEntry {
                fingerprint: fingerprint.clone(),
                pipeline: pipeline.clone(),
                method,
                confidence,
                hits: 1,
                successes,
                failures: 0,
                score: 0.0,
                created_at: now,
                last_used: now,
            };
            entry.rescore(now);
            tracing::debug!(fingerprint = %fingerprint.hash.short(12), pipeline = %pipeline, score = entry.score, "memory entry created");
            self.entries.insert(fingerprint.hash.clone(), entry);
        }
        self.evict_at(now);
    }

    /// Count a failed re-validation against the entry for `fingerprint`.
    /// Returns whether such an entry existed.
    pub fn record_failure(&mut self, fingerprint: &Fingerprint) -> bool {
        self.record_failure_at(fingerprint, Utc::now())
    }

    /// [`Self::record_failure`] with an explicit clock.
    pub fn record_failure_at(&mut self, fingerprint: &Fingerprint, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.entries.get_mut(&fingerprint.hash) else {
            return false;
        };
        entry.failures += 1;
        entry.rescore(now);
        true
    }

    /// Record a failure against the entry whose fingerprint hash is `hash`.
    pub fn record_failure_by_hash(&mut self, hash: &ContentHash) -> bool {
        let now = Utc::now();
        let Some(entry) = self.entries.get_mut(hash) else {
            return false;
        };
        entry.failures += 1;
        entry.rescore(now);
        true
    }

    // -----------------------------------------------------------------------
    // Eviction
    // -----------------------------------------------------------------------

    /// Drop lowest-score entries until within capacity.
    pub fn evict(&mut self) {
        self.evict_at(Utc::now());
    }

    /// [`Self::evict`] with an explicit clock. Scores are refreshed first;
    /// ties go to the older last use, then the smaller hash.
    pub fn evict_at(&mut self, now: DateTime<Utc>) {
        if self.entries.len() <= self.config.capacity {
            return;
        }
        for entry in self.entries.values_mut() {
            entry.rescore(now);
        }
        let mut order: Vec<(f64, DateTime<Utc>, ContentHash)> = self
            .entries
            .values()
            .map(|e| (e.score, e.last_used, e.fingerprint.hash.clone()))
            .collect();
        order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).then_with(|| a.2.cmp(&b.2)));
        let excess = self.entries.len() - self.config.capacity;
        for (score, _, hash) in order.into_iter().take(excess) {
            tracing::debug!(fingerprint = %hash.short(12), score, "memory entry evicted");
            self.entries.remove(&hash);
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Load-merge-save under the directory lock. Returns whether the
    /// documents were written. Any failure (lock held, I/O) is logged and
    /// the store keeps its in-memory state.
    pub fn save(&mut self) -> bool {
        let Some(dir) = self.config.dir.clone() else {
            return false;
        };
        match self.try_save(dir.clone()) {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), entries = self.entries.len(), "memory saved");
                true
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "memory save skipped; continuing in memory");
                false
            }
        }
    }

    fn try_save(&mut self, dir: PathBuf) -> Result<(), MemoryError> {
        std::fs::create_dir_all(&dir).map_err(|source| MemoryError::Io {
            path: dir.clone(),
            source,
        })?;
        let memory_path = dir.join(MEMORY_FILE);
        let _lock = LockGuard::acquire(persist::lock_path(&memory_path))?;

        let (on_disk, _) = persist::load_entries(&dir);
        for theirs in on_disk {
            let key = theirs.fingerprint.hash.clone();
            let newer = self.entries.get(&key).is_none_or(|mine| theirs.last_used > mine.last_used);
            if newer {
                self.entries.insert(key, theirs);
            }
        }
        self.heuristics.rebase(&self.heuristics_base, &persist::load_heuristics(&dir));
        self.evict();

        let doc = MemoryDocument {
            schema_version: MEMORY_SCHEMA_VERSION.into(),
            registry_digest: self.registry_digest.clone(),
            entries: self.entries.values().cloned().collect(),
        };
        persist::write_json(&memory_path, &doc, "memory")?;
        let heuristics = HeuristicsDocument {
            schema_version: HEURISTICS_SCHEMA_VERSION.into(),
            heuristics: self.heuristics.clone(),
        };
        persist::write_json(&dir.join(HEURISTICS_FILE), &heuristics, "heuristics")?;
        self.heuristics_base = self.heuristics.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::heuristics::PrimitiveStat;
    use chrono::Duration;
    use tessera_kernel::grid::grid;
    use tessera_kernel::{standard_registry, Grid, Step, TrainingPair};

    fn fp_for(input: Grid, output: Grid) -> Fingerprint {
        fingerprint(&[TrainingPair::new(input, output)])
    }

    fn flip_fp() -> Fingerprint {
        fp_for(grid(&[[1, 1], [0, 0]]), grid(&[[0, 0], [1, 1]]))
    }

    fn one(name: &str) -> Pipeline {
        Pipeline::new(vec![Step::nullary(name)])
    }

    #[test]
    fn distill_then_recall() {
        let mut store = MemoryStore::in_memory(8, &standard_registry()).unwrap();
        store.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        let recalled = store.recall(&flip_fp());
        assert_eq!(recalled.len(), 1);
        assert_eq!(recalled[0].pipeline, one("flip_v"));
        assert!(recalled[0].verified);
        assert!((recalled[0].similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn repeat_hit_updates_counters() {
        let mut store = MemoryStore::in_memory(8, &standard_registry()).unwrap();
        let fp = flip_fp();
        let t0 = Utc::now();
        store.distill_at(&fp, &one("flip_v"), Method::Chain, Outcome::Success, t0);
        store.distill_at(&fp, &one("flip_v"), Method::Memory, Outcome::Success, t0 + Duration::days(1));
        let e = store.get(&fp.hash).unwrap();
        assert_eq!((e.hits, e.successes), (2, 2));
        assert_eq!(e.last_used, t0 + Duration::days(1));
        assert_eq!(e.created_at, t0);
    }

    #[test]
    fn success_upgrades_near_miss_and_shorter_replaces() {
        let mut store = MemoryStore::in_memory(8, &standard_registry()).unwrap();
        let fp = flip_fp();
        let long = Pipeline::new(vec![Step::nullary("flip_h"), Step::nullary("rotate_180")]);
        store.distill(&fp, &one("crop"), Method::Hybrid, Outcome::NearMiss { accuracy: 0.9 });
        assert!(!store.get(&fp.hash).unwrap().is_verified());
        store.distill(&fp, &long, Method::Hybrid, Outcome::Success);
        assert_eq!(store.get(&fp.hash).unwrap().pipeline, long);
        store.distill(&fp, &one("flip_v"), Method::Chain, Outcome::Success);
        assert_eq!(store.get(&fp.hash).unwrap().pipeline, one("flip_v"));
        store.distill(&fp, &one("crop"), Method::Chain, Outcome::NearMiss { accuracy: 0.99 });
        assert_eq!(store.get(&fp.hash).unwrap().pipeline, one("flip_v"), "near miss never replaces verified");
    }

    #[test]
    fn failure_for_unknown_fingerprint_is_ignored() {
        let mut store = MemoryStore::in_memory(8, &standard_registry()).unwrap();
        store.distill(&flip_fp(), &one("crop"), Method::Chain, Outcome::Failure);
        assert!(store.is_empty());
        assert!(!store.record_failure(&flip_fp()));
    }

    #[test]
    fn record_failure_lowers_score() {
        let mut store = MemoryStore::in_memory(8, &standard_registry()).unwrap();
        let fp = flip_fp();
        let now = Utc::now();
        store.distill_at(&fp, &one("flip_v"), Method::Chain, Outcome::Success, now);
        let before = store.get(&fp.hash).unwrap().score;
        assert!(store.record_failure_at(&fp, now));
        assert!(store.get(&fp.hash).unwrap().score < before);
        assert_eq!(store.get(&fp.hash).unwrap().failures, 1);
    }

    #[test]
    fn degenerate_never_stored_or_recalled() {
        let mut store = MemoryStore::in_memory(8, &standard_registry()).unwrap();
        let degenerate = fingerprint(&[]);
        store.distill(&degenerate, &one("flip_v"), Method::Chain, Outcome::Success);
        assert!(store.is_empty());
        assert!(store.recall(&degenerate).is_empty());
    }

    #[test]
    fn capacity_keeps_highest_scored() {
        let mut store = MemoryStore::in_memory(2, &standard_registry()).unwrap();
        let now = Utc::now();
        // Distinct size ratios give distinct fingerprints.
        let fps: Vec<Fingerprint> = (2..=4usize)
            .map(|w| fp_for(grid(&[[1]]), Grid::filled(1, w, 1).unwrap()))
            .collect();
        // Oldest use scores lowest through recency decay.
        store.distill_at(&fps[0], &one("tile"), Method::Chain, Outcome::Success, now - Duration::days(90));
        store.distill_at(&fps[1], &one("tile"), Method::Chain, Outcome::Success, now);
        store.distill_at(&fps[2], &one("tile"), Method::Chain, Outcome::Success, now);
        assert_eq!(store.len(), 2);
        assert!(store.get(&fps[0].hash).is_none());
    }

    #[test]
    fn save_and_reopen_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            dir: Some(dir.path().to_path_buf()),
            ..MemoryConfig::default()
        };
        let reg = standard_registry();
        let mut store = MemoryStore::open(config.clone(), &reg).unwrap();
        store.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        assert!(store.save());

        let reopened = MemoryStore::open(config, &reg).unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.recall(&flip_fp())[0].pipeline, one("flip_v"));
        assert!(reopened.heuristics().weight("flip_v") > 0.0);
    }

    #[test]
    fn held_lock_skips_save() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            dir: Some(dir.path().to_path_buf()),
            ..MemoryConfig::default()
        };
        let mut store = MemoryStore::open(config, &standard_registry()).unwrap();
        store.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        std::fs::write(dir.path().join("memory.json.lock"), b"").unwrap();
        assert!(!store.save());
        assert_eq!(store.len(), 1, "in-memory state survives");
        assert!(!dir.path().join(MEMORY_FILE).exists());
    }

    #[test]
    fn save_merges_concurrent_writer() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            dir: Some(dir.path().to_path_buf()),
            ..MemoryConfig::default()
        };
        let reg = standard_registry();
        let mut a = MemoryStore::open(config.clone(), &reg).unwrap();
        let mut b = MemoryStore::open(config.clone(), &reg).unwrap();
        let other = fp_for(grid(&[[1, 0]]), grid(&[[2, 0]]));
        a.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        b.distill(&other, &Pipeline::new(vec![Step::new("replace", vec![1, 2])]), Method::Chain, Outcome::Success);
        assert!(a.save());
        assert!(b.save());
        let merged = MemoryStore::open(config, &reg).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn concurrent_heuristic_increments_add_up() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            dir: Some(dir.path().to_path_buf()),
            ..MemoryConfig::default()
        };
        let reg = standard_registry();
        let mut seed = MemoryStore::open(config.clone(), &reg).unwrap();
        seed.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        assert!(seed.save());

        let mut a = MemoryStore::open(config.clone(), &reg).unwrap();
        let mut b = MemoryStore::open(config.clone(), &reg).unwrap();
        a.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        b.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        b.distill(&flip_fp(), &one("flip_v"), Method::Chain, Outcome::Success);
        assert!(a.save());
        assert!(b.save());
        assert!(a.save(), "a second save adds nothing new");

        let merged = MemoryStore::open(config, &reg).unwrap();
        assert_eq!(merged.heuristics().get("flip_v"), Some(PrimitiveStat { uses: 4, wins: 4 }));
    }

    #[test]
    fn in_memory_store_does_not_save() {
        let mut store = MemoryStore::in_memory(4, &standard_registry()).unwrap();
        assert!(!store.save());
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(
            MemoryStore::in_memory(0, &standard_registry()),
            Err(MemoryError::InvalidConfig { .. })
        ));
    }
}

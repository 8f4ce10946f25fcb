// Per-simulation table of caches and live structures for one kind.
//
// The registry answers three questions during formation: "what is the cache
// for this key", "which key last occupied this exact box", and "give me a key
// nobody uses". It also tracks which cells currently hold each key so that
// unheld caches can be evicted after a retention period.
//
// Entries:
// - `entries`: identity key -> latest cache, holder cells, last refresh tick.
// - `footprints`: footprint -> key, the last writer for that box.
// - `live`: weak references to live structures. The strong references live
//   in member cells; a structure all members dropped disappears here on the
//   next prune.
//
// The registry is owned by `ClusterSim` and cleared when the world unloads.
// Nothing here is global.

use crate::cache::Cache;
use crate::identity::{IdentityKey, KeyGenerator};
use crate::kind::ClusterKind;
use crate::structure::{Structure, StructureHandle};
use crate::types::{Footprint, VoxelCoord};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

/// One identity key's registry record.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry<S> {
    pub cache: Cache<S>,
    /// Cells that refreshed this key and have not been seen dropping it.
    pub holders: BTreeSet<VoxelCoord>,
    pub last_refresh: u64,
}

pub struct Registry<K: ClusterKind> {
    entries: BTreeMap<IdentityKey, CacheEntry<K::Snapshot>>,
    footprints: BTreeMap<Footprint, IdentityKey>,
    live: Vec<Weak<RefCell<Structure<K>>>>,
    keys: KeyGenerator,
}

impl<K: ClusterKind> Registry<K> {
    pub fn new(key_seed: u64) -> Self {
        Self {
            entries: BTreeMap::new(),
            footprints: BTreeMap::new(),
            live: Vec::new(),
            keys: KeyGenerator::new(key_seed),
        }
    }

    /// Record `cache` as the latest for its key, held by the cell at
    /// `holder`. The last writer in a tick wins. Unkeyed caches are ignored.
    pub fn update_cache(&mut self, holder: VoxelCoord, cache: &Cache<K::Snapshot>, tick: u64) {
        let Some(key) = &cache.identity else {
            return;
        };
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry {
                cache: Cache::default(),
                holders: BTreeSet::new(),
                last_refresh: tick,
            });
        if let Some(old) = entry.cache.footprint {
            if cache.footprint != Some(old) && self.footprints.get(&old) == Some(key) {
                self.footprints.remove(&old);
            }
        }
        entry.cache = cache.clone();
        entry.holders.insert(holder);
        entry.last_refresh = tick;
        if let Some(footprint) = cache.footprint {
            self.footprints.insert(footprint, key.clone());
        }
    }

    pub fn get(&self, key: &IdentityKey) -> Option<&Cache<K::Snapshot>> {
        self.entries.get(key).map(|e| &e.cache)
    }

    pub fn entry(&self, key: &IdentityKey) -> Option<&CacheEntry<K::Snapshot>> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove a key and hand back its cache. Used when a key is merged into
    /// another.
    pub fn pull(&mut self, key: &IdentityKey) -> Option<Cache<K::Snapshot>> {
        let entry = self.entries.remove(key)?;
        self.footprints.retain(|_, k| k != key);
        Some(entry.cache)
    }

    /// The key whose structure last occupied exactly `footprint`.
    pub fn key_for_footprint(&self, footprint: &Footprint) -> Option<&IdentityKey> {
        self.footprints.get(footprint)
    }

    /// A fresh key not present in the table.
    pub fn unique_key(&mut self) -> IdentityKey {
        loop {
            let key = self.keys.next_key();
            if !self.entries.contains_key(&key) {
                return key;
            }
        }
    }

    pub fn register_structure(&mut self, handle: &StructureHandle<K>) {
        self.prune_dead();
        self.live.push(Rc::downgrade(handle));
    }

    /// Strong handles to every structure still held by some cell.
    pub fn live_structures(&self) -> Vec<StructureHandle<K>> {
        self.live.iter().filter_map(Weak::upgrade).collect()
    }

    fn prune_dead(&mut self) {
        self.live.retain(|w| w.strong_count() > 0);
    }

    /// Drop holders for which `holds(cell, key)` is false, then evict keys
    /// that have no holders and were last refreshed at least `retention`
    /// ticks ago. Returns the evicted keys in order.
    pub fn collect_garbage(
        &mut self,
        tick: u64,
        retention: u64,
        holds: impl Fn(VoxelCoord, &IdentityKey) -> bool,
    ) -> Vec<IdentityKey> {
        self.prune_dead();
        let mut evicted = Vec::new();
        for (key, entry) in &mut self.entries {
            entry.holders.retain(|&pos| holds(pos, key));
            if entry.holders.is_empty() && tick.saturating_sub(entry.last_refresh) >= retention {
                evicted.push(key.clone());
            }
        }
        for key in &evicted {
            self.entries.remove(key);
        }
        if !evicted.is_empty() {
            self.footprints
                .retain(|_, k| self.entries.contains_key(k));
        }
        evicted
    }

    /// Forget everything except the key generator's position.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.footprints.clear();
        self.live.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.entries.keys()
    }

    pub fn key_generator(&self) -> &KeyGenerator {
        &self.keys
    }

    pub fn set_key_generator(&mut self, keys: KeyGenerator) {
        self.keys = keys;
    }
}

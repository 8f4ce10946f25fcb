// One participating node: a logic-member voxel of some structure kind.
//
// A cell holds an optional shared handle to the structure it belongs to, its
// own cache, and the bookkeeping the tick loop in `sim.rs` needs: whether it
// is the structure's renderer, whether it had a structure last tick, whether
// its structure description still has to go out to observers, and which
// viewers have an interaction open on it.
//
// Invariant: `is_rendering` implies `structure.is_some()`. `detach` is the
// only way a cell leaves a structure and clears both together.

use crate::cache::Cache;
use crate::error::PersistError;
use crate::kind::ClusterKind;
use crate::structure::StructureHandle;
use crate::types::{ViewerId, VoxelCoord};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

pub struct Cell<K: ClusterKind> {
    pub position: VoxelCoord,
    pub structure: Option<StructureHandle<K>>,
    pub cache: Cache<K::Snapshot>,
    pub is_rendering: bool,
    /// Whether the cell had a structure at the end of its previous tick.
    pub prev_structure: bool,
    /// The structure description changed and has not been encoded yet.
    pub send_structure: bool,
    pub viewers: BTreeSet<ViewerId>,
}

impl<K: ClusterKind> Cell<K> {
    pub fn new(position: VoxelCoord) -> Self {
        Self {
            position,
            structure: None,
            cache: Cache::default(),
            is_rendering: false,
            prev_structure: false,
            send_structure: false,
            viewers: BTreeSet::new(),
        }
    }

    pub fn has_structure(&self) -> bool {
        self.structure.is_some()
    }

    /// Whether the cell currently belongs to exactly `handle`.
    pub fn belongs_to(&self, handle: &StructureHandle<K>) -> bool {
        self.structure
            .as_ref()
            .is_some_and(|s| Rc::ptr_eq(s, handle))
    }

    /// Leave the current structure, if any.
    pub fn detach(&mut self) -> Option<StructureHandle<K>> {
        self.is_rendering = false;
        self.structure.take()
    }

    pub fn save_cache(&self, storage: &mut Map<String, Value>) -> Result<(), PersistError> {
        self.cache.save(storage)
    }

    /// Replace the cache from persisted storage. Only meaningful before the
    /// cell has formed; a cell that already has a structure keeps the cache
    /// its structure feeds.
    pub fn load_cache(&mut self, storage: &Map<String, Value>) -> Result<(), PersistError> {
        let cache = Cache::load(storage)?;
        if self.structure.is_some() {
            tracing::debug!(cell = %self.position, "ignoring cache load for formed cell");
            return Ok(());
        }
        self.cache = cache;
        Ok(())
    }
}

impl<K: ClusterKind> fmt::Debug for Cell<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("position", &self.position)
            .field(
                "structure",
                &self
                    .structure
                    .as_ref()
                    .and_then(|s| s.try_borrow().ok().map(|s| s.serial)),
            )
            .field("identity", &self.cache.identity)
            .field("is_rendering", &self.is_rendering)
            .field("prev_structure", &self.prev_structure)
            .field("send_structure", &self.send_structure)
            .field("viewers", &self.viewers)
            .finish()
    }
}

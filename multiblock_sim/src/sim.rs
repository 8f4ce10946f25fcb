// Top-level cluster simulation: cells, structures, registry, and the step.
//
// `ClusterSim` owns the voxel grid, one `Cell` per logic-member voxel, and
// the registry for its kind. The host drives it with
// `step(&commands) -> StepResult`. A step runs in this order:
//
// 1. Advance the tick and apply commands in slice order. Voxel edits add or
//    remove cells and flag every structure whose box (grown by one) contains
//    the edit.
// 2. Re-run formation for each flagged structure from one of its surviving
//    members. If it fails or comes back with a different shape, the
//    structure is dismantled: every member leaves it in this step and the
//    voxels around it are notified.
// 3. Tick every cell, in coordinate order (`step`) or a caller-supplied order
//    (`step_in_order`). Per cell:
//      0. viewers on a cell without a structure are force-closed;
//      1. a cell without a structure refreshes its cache into the registry
//         and tries to form one, unless an earlier failed attempt this step
//         already explored it;
//      2. the first member of a structure to tick runs the structure's
//         single logical update with every input queued for its members,
//         in delivery order;
//      3. a cell whose membership changed since its last tick is queued for
//         observers, and takes the renderer role if the structure has none;
//      4. a cell in a keyed structure syncs its cache and files it in the
//         registry.
// 4. Clear every live structure's updated flag; drop inputs nobody consumed.
// 5. Every `cache_gc_interval_ticks`, collect registry garbage.
//
// Observers pull encoded deltas with `drain_outbound()`. Structures are never
// saved: `to_json` stores the grid and each cell's cache, and structures
// re-form from those after `from_json`.
//
// See also: `formation.rs` for the flood fill, `registry.rs` for identity
// bookkeeping, `sync.rs` for the delta layout, `command.rs`, `event.rs`.
//
// **Critical constraint: determinism.** Every collection that is iterated
// is a `BTreeMap`/`BTreeSet` or built from one, and identity keys come from
// the seeded generator.

use crate::cache::Cache;
use crate::cell::Cell;
use crate::command::ClusterCommand;
use crate::config::ClusterConfig;
use crate::error::PersistError;
use crate::event::{ClusterEvent, DismantleReason, StepResult};
use crate::formation::{self, FormationFailure};
use crate::identity::{IdentityKey, KeyGenerator};
use crate::kind::ClusterKind;
use crate::registry::Registry;
use crate::structure::{ClusterShape, Structure, StructureHandle};
use crate::sync;
use crate::types::{StructureSerial, ViewerId, VoxelCoord, VoxelType};
use crate::world::VoxelWorld;
use multiblock_protocol::ObserverMessage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Save format. Structures and the registry are rebuilt, not stored.
#[derive(Serialize, Deserialize)]
struct SavedSim {
    tick: u64,
    config: ClusterConfig,
    world: VoxelWorld,
    cells: Vec<SavedCell>,
    keys: KeyGenerator,
}

#[derive(Serialize, Deserialize)]
struct SavedCell {
    position: VoxelCoord,
    storage: Map<String, Value>,
}

pub struct ClusterSim<K: ClusterKind> {
    tick: u64,
    config: ClusterConfig,
    kind: K,
    world: VoxelWorld,
    cells: BTreeMap<VoxelCoord, Cell<K>>,
    registry: Registry<K>,
    next_serial: u64,
    /// Structures touched by a voxel edit this step.
    revalidate: BTreeMap<StructureSerial, StructureHandle<K>>,
    /// Inputs waiting for the next logical update, in delivery order.
    inputs: Vec<(VoxelCoord, K::Input)>,
    /// Cells with a delta to send.
    outbound: BTreeSet<VoxelCoord>,
    /// Cells removed since the last drain.
    removed: BTreeSet<VoxelCoord>,
    events: Vec<ClusterEvent>,
}

impl<K: ClusterKind> ClusterSim<K> {
    /// Build a sim over `world`, with a cell for every logic-member voxel.
    /// Nothing forms until the first step.
    pub fn new(kind: K, config: ClusterConfig, world: VoxelWorld) -> Self {
        if !world.is_well_formed() {
            tracing::warn!("voxel grid storage does not match its size; missing voxels read as air");
        }
        let cells = world
            .positions_of_where(|v| kind.is_frame_member(v))
            .into_iter()
            .map(|pos| (pos, Cell::new(pos)))
            .collect();
        let registry = Registry::new(config.key_seed);
        Self {
            tick: 0,
            config,
            kind,
            world,
            cells,
            registry,
            next_serial: 0,
            revalidate: BTreeMap::new(),
            inputs: Vec::new(),
            outbound: BTreeSet::new(),
            removed: BTreeSet::new(),
            events: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advance one tick, ticking cells in coordinate order.
    pub fn step(&mut self, commands: &[ClusterCommand<K::Input>]) -> StepResult {
        self.advance(commands, None)
    }

    /// Advance one tick, ticking cells in `order`. Positions without a cell
    /// are skipped; cells missing from `order` do not tick this step.
    pub fn step_in_order(
        &mut self,
        commands: &[ClusterCommand<K::Input>],
        order: &[VoxelCoord],
    ) -> StepResult {
        self.advance(commands, Some(order))
    }

    fn advance(
        &mut self,
        commands: &[ClusterCommand<K::Input>],
        order: Option<&[VoxelCoord]>,
    ) -> StepResult {
        self.tick += 1;
        for command in commands {
            self.apply_command(command.clone());
        }
        self.revalidate_touched();

        let order: Vec<VoxelCoord> = match order {
            Some(order) => order.to_vec(),
            None => self.cells.keys().copied().collect(),
        };
        let mut failed = BTreeSet::new();
        for pos in order {
            self.tick_cell(pos, &mut failed);
        }

        for handle in self.registry.live_structures() {
            handle.borrow_mut().already_updated = false;
        }
        if !self.inputs.is_empty() {
            tracing::trace!(
                tick = self.tick,
                inputs = self.inputs.len(),
                "dropping inputs for cells without a structure"
            );
            self.inputs.clear();
        }

        let interval = self.config.cache_gc_interval_ticks;
        if interval > 0 && self.tick % interval == 0 {
            self.collect_garbage();
        }

        StepResult {
            tick: self.tick,
            events: std::mem::take(&mut self.events),
        }
    }

    fn tick_cell(&mut self, pos: VoxelCoord, failed: &mut BTreeSet<VoxelCoord>) {
        let Some(cell) = self.cells.get_mut(&pos) else {
            return;
        };

        if cell.structure.is_none() {
            if !cell.viewers.is_empty() {
                let viewers = std::mem::take(&mut cell.viewers).into_iter().collect();
                self.events.push(ClusterEvent::ViewersClosed { cell: pos, viewers });
            }
            cell.is_rendering = false;
            if cell.cache.is_keyed() {
                self.registry.update_cache(pos, &cell.cache, self.tick);
            }
            if !failed.contains(&pos) {
                if let Err(explored) = self.try_form(pos) {
                    failed.extend(explored);
                }
            }
        }

        let Some(cell) = self.cells.get_mut(&pos) else {
            return;
        };

        if let Some(handle) = &cell.structure {
            let mut structure = handle.borrow_mut();
            if !structure.already_updated {
                let structure = &mut *structure;
                let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.inputs)
                    .into_iter()
                    .partition(|(at, _)| structure.shape.locations.contains(at));
                self.inputs = rest;
                let queued = mine.into_iter().map(|(_, input)| input).collect();
                self.kind
                    .update(&structure.shape, &mut structure.data, queued);
                structure.already_updated = true;
            }
        }

        let has_structure = cell.structure.is_some();
        if has_structure != cell.prev_structure {
            if let Some(handle) = &cell.structure {
                let mut structure = handle.borrow_mut();
                if !structure.has_renderer {
                    structure.has_renderer = true;
                    cell.is_rendering = true;
                    cell.send_structure = true;
                    tracing::trace!(cell = %pos, serial = %structure.serial, "renderer elected");
                }
            }
            self.outbound.insert(pos);
        }
        cell.prev_structure = has_structure;

        if let Some(handle) = &cell.structure {
            let structure = handle.borrow();
            if structure.identity.is_some() {
                cell.cache.sync(&self.kind, &structure);
                self.registry.update_cache(pos, &cell.cache, self.tick);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Formation and teardown
    // -----------------------------------------------------------------------

    /// Try to form a structure from the cell at `pos` right now. Returns the
    /// serial of the structure the cell ends up in.
    pub fn attempt_formation(&mut self, pos: VoxelCoord) -> Result<StructureSerial, FormationFailure> {
        let Some(cell) = self.cells.get(&pos) else {
            return Err(FormationFailure::NotAMember { at: pos });
        };
        if let Some(handle) = &cell.structure {
            return Ok(handle.borrow().serial);
        }
        match self.run_formation(pos, None) {
            Ok(shape) => Ok(self.assemble(shape)),
            Err(rejected) => Err(rejected.reason),
        }
    }

    /// Formation from a cell during its tick. On failure returns the explored
    /// positions.
    fn try_form(&mut self, pos: VoxelCoord) -> Result<StructureSerial, Vec<VoxelCoord>> {
        match self.run_formation(pos, None) {
            Ok(shape) => Ok(self.assemble(shape)),
            Err(rejected) => {
                tracing::debug!(
                    cell = %pos,
                    tick = self.tick,
                    reason = %rejected.reason,
                    "formation failed"
                );
                Err(rejected.explored)
            }
        }
    }

    /// Run the protocol from `start`, treating positions owned by any live
    /// structure other than `ignore` as claimed.
    fn run_formation(
        &self,
        start: VoxelCoord,
        ignore: Option<StructureSerial>,
    ) -> Result<ClusterShape, formation::Rejected> {
        let mut claimed_structural = BTreeSet::new();
        for handle in self.registry.live_structures() {
            let structure = handle.borrow();
            if Some(structure.serial) != ignore {
                claimed_structural.extend(structure.shape.structural_locations.iter().copied());
            }
        }
        let is_claimed = |c: VoxelCoord| {
            let owned_cell = self.cells.get(&c).is_some_and(|cell| {
                cell.structure
                    .as_ref()
                    .is_some_and(|s| Some(s.borrow().serial) != ignore)
            });
            owned_cell || claimed_structural.contains(&c)
        };
        formation::attempt_formation(&self.world, &self.kind, &self.config, start, is_claimed)
    }

    fn assemble(&mut self, shape: ClusterShape) -> StructureSerial {
        let (identity, snapshot) = self.resolve_identity(&shape);
        let mut data = self.kind.initial_data(&shape);
        if let Some(snapshot) = &snapshot {
            self.kind.restore(&shape, &mut data, snapshot);
        }

        let serial = StructureSerial(self.next_serial);
        self.next_serial += 1;
        let anchor = shape.render_anchor;
        let bounds = shape.bounds;
        let members = shape.locations.len() + shape.structural_locations.len();
        let handle = Rc::new(RefCell::new(Structure {
            serial,
            shape,
            identity: identity.clone(),
            has_renderer: false,
            already_updated: false,
            data,
        }));
        self.registry.register_structure(&handle);

        let structure = handle.borrow();
        for member in &structure.shape.locations {
            if let Some(cell) = self.cells.get_mut(member) {
                cell.structure = Some(Rc::clone(&handle));
            }
        }
        tracing::debug!(
            serial = %serial,
            anchor = %anchor,
            bounds = %bounds,
            identity = ?identity,
            "structure formed"
        );
        self.events.push(ClusterEvent::StructureFormed {
            serial,
            anchor,
            bounds,
            identity,
            members,
        });
        self.notify_boundary(&structure.shape);
        serial
    }

    /// Pick the identity for a newly formed shape: the key most member caches
    /// claim (smallest key on ties, other claimed keys merged in), else the
    /// key last seen on this exact footprint, else a fresh one. Keys already
    /// carried by a live structure are never picked, and every key taken here
    /// is withdrawn from the registry and from caches outside the shape.
    fn resolve_identity(
        &mut self,
        shape: &ClusterShape,
    ) -> (Option<IdentityKey>, Option<K::Snapshot>) {
        if !self.kind.wants_identity() {
            return (None, None);
        }

        let live_keys: BTreeSet<IdentityKey> = self
            .cells
            .values()
            .filter_map(|c| c.structure.as_ref())
            .filter_map(|s| s.borrow().identity.clone())
            .collect();

        let mut claims: BTreeMap<IdentityKey, usize> = BTreeMap::new();
        for member in &shape.locations {
            if let Some(key) = self.cells.get(member).and_then(|c| c.cache.identity.as_ref()) {
                if !live_keys.contains(key) {
                    *claims.entry(key.clone()).or_default() += 1;
                }
            }
        }
        let mut winner: Option<(&IdentityKey, usize)> = None;
        for (key, &count) in &claims {
            if winner.is_none_or(|(_, best)| count > best) {
                winner = Some((key, count));
            }
        }

        if let Some((key, _)) = winner {
            let key = key.clone();
            let mut snapshot = self.claimed_snapshot(shape, &key);
            for other in claims.keys().filter(|k| **k != key) {
                let other_snapshot = self.claimed_snapshot(shape, other);
                self.kind.merge(&mut snapshot, &other_snapshot);
                self.claim_key(shape, other);
                tracing::debug!(winner = %key, merged = %other, "merged identities");
                self.events.push(ClusterEvent::CacheEvicted {
                    identity: other.clone(),
                });
            }
            self.claim_key(shape, &key);
            return (Some(key), Some(snapshot));
        }

        let by_footprint = self
            .registry
            .key_for_footprint(&shape.footprint())
            .filter(|k| !live_keys.contains(*k))
            .cloned();
        if let Some(key) = by_footprint {
            let snapshot = self.registry.get(&key).map(|c| c.snapshot.clone());
            self.claim_key(shape, &key);
            return (Some(key), snapshot);
        }

        (Some(self.registry.unique_key()), None)
    }

    /// Withdraw `key` from the registry and from every cell cache outside
    /// `shape`. Members file it again on their next sync.
    fn claim_key(&mut self, shape: &ClusterShape, key: &IdentityKey) {
        self.registry.pull(key);
        for (pos, cell) in &mut self.cells {
            if !shape.locations.contains(pos) && cell.cache.identity.as_ref() == Some(key) {
                tracing::trace!(cell = %pos, identity = %key, "cache released to claiming structure");
                cell.cache = Cache::default();
            }
        }
    }

    /// The snapshot for a key claimed by some member: the registry's copy if
    /// it has one, otherwise the first member cache holding the key.
    fn claimed_snapshot(&self, shape: &ClusterShape, key: &IdentityKey) -> K::Snapshot {
        if let Some(cache) = self.registry.get(key) {
            return cache.snapshot.clone();
        }
        shape
            .locations
            .iter()
            .filter_map(|m| self.cells.get(m))
            .find(|c| c.cache.identity.as_ref() == Some(key))
            .map(|c| c.cache.snapshot.clone())
            .unwrap_or_default()
    }

    /// Emit one `NeighborChanged` per non-member, non-air, non-multiblock
    /// voxel face-adjacent to the shape.
    fn notify_boundary(&mut self, shape: &ClusterShape) {
        let mut notified = BTreeSet::new();
        for member in shape.members() {
            for neighbor in member.face_neighbors() {
                if shape.is_linked(neighbor) || notified.contains(&neighbor) {
                    continue;
                }
                let voxel = self.world.get(neighbor);
                if voxel.is_air() || voxel.is_multiblock_part() {
                    continue;
                }
                notified.insert(neighbor);
                self.events.push(ClusterEvent::NeighborChanged {
                    neighbor,
                    source: member,
                });
            }
        }
    }

    fn dismantle(&mut self, handle: &StructureHandle<K>, reason: DismantleReason) {
        let (serial, identity, shape) = {
            let structure = handle.borrow();
            (
                structure.serial,
                structure.identity.clone(),
                structure.shape.clone(),
            )
        };
        for member in &shape.locations {
            if let Some(cell) = self.cells.get_mut(member) {
                if cell.belongs_to(handle) {
                    cell.detach();
                }
            }
        }
        tracing::debug!(serial = %serial, identity = ?identity, ?reason, "structure dismantled");
        self.events.push(ClusterEvent::StructureDismantled {
            serial,
            identity,
            reason,
        });
        self.notify_boundary(&shape);
    }

    fn revalidate_touched(&mut self) {
        let pending = std::mem::take(&mut self.revalidate);
        for (serial, handle) in pending {
            let shape = handle.borrow().shape.clone();
            let start = shape
                .locations
                .iter()
                .copied()
                .find(|m| self.cells.get(m).is_some_and(|c| c.belongs_to(&handle)));
            let member_lost = shape
                .locations
                .iter()
                .any(|m| !self.cells.contains_key(m));
            let reason = if member_lost {
                DismantleReason::MemberRemoved
            } else {
                DismantleReason::ValidationFailed
            };

            let Some(start) = start else {
                self.dismantle(&handle, reason);
                continue;
            };
            match self.run_formation(start, Some(serial)) {
                Ok(reformed) if reformed.same_geometry(&shape) => {
                    tracing::trace!(serial = %serial, "structure still valid");
                }
                Ok(_) => self.dismantle(&handle, reason),
                Err(rejected) => {
                    tracing::debug!(serial = %serial, reason = %rejected.reason, "revalidation failed");
                    self.dismantle(&handle, reason);
                }
            }
        }
    }

    /// Dismantle every structure and clear the registry. Cells keep their
    /// caches, so a save taken afterwards still restores identities.
    pub fn unload(&mut self) {
        for handle in self.registry.live_structures() {
            self.dismantle(&handle, DismantleReason::Unloaded);
        }
        self.revalidate.clear();
        self.registry.clear();
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    fn apply_command(&mut self, command: ClusterCommand<K::Input>) {
        match command {
            ClusterCommand::PlaceVoxel { coord, voxel } => self.set_voxel(coord, voxel),
            ClusterCommand::BreakVoxel { coord } => self.set_voxel(coord, VoxelType::Air),
            ClusterCommand::OpenViewer { cell, viewer } => {
                if !self.open_viewer(cell, viewer) {
                    tracing::trace!(cell = %cell, "viewer refused: no structure");
                }
            }
            ClusterCommand::CloseViewer { cell, viewer } => self.close_viewer(cell, viewer),
            ClusterCommand::Deliver { cell, input } => {
                if self.cells.contains_key(&cell) {
                    self.inputs.push((cell, input));
                } else {
                    tracing::trace!(cell = %cell, "input for unknown cell dropped");
                }
            }
        }
    }

    /// Write a voxel, keeping cells and structures consistent with it.
    pub fn set_voxel(&mut self, coord: VoxelCoord, voxel: VoxelType) {
        let Some(previous) = self.world.set(coord, voxel) else {
            return;
        };
        if previous == voxel {
            return;
        }

        if self.kind.is_frame_member(previous) {
            if let Some(mut cell) = self.cells.remove(&coord) {
                if !cell.viewers.is_empty() {
                    let viewers = std::mem::take(&mut cell.viewers).into_iter().collect();
                    self.events.push(ClusterEvent::ViewersClosed { cell: coord, viewers });
                }
                self.inputs.retain(|(at, _)| *at != coord);
                self.outbound.remove(&coord);
                self.removed.insert(coord);
            }
        }
        if self.kind.is_frame_member(voxel) {
            self.cells.insert(coord, Cell::new(coord));
        }

        for handle in self.registry.live_structures() {
            let (serial, touched) = {
                let structure = handle.borrow();
                (structure.serial, structure.shape.touches(coord))
            };
            if touched {
                self.revalidate.insert(serial, handle);
            }
        }
    }

    /// Open a viewer on a cell. Only cells with a structure accept viewers.
    pub fn open_viewer(&mut self, pos: VoxelCoord, viewer: ViewerId) -> bool {
        match self.cells.get_mut(&pos) {
            Some(cell) if cell.has_structure() => {
                cell.viewers.insert(viewer);
                true
            }
            _ => false,
        }
    }

    pub fn close_viewer(&mut self, pos: VoxelCoord, viewer: ViewerId) {
        if let Some(cell) = self.cells.get_mut(&pos) {
            cell.viewers.remove(&viewer);
        }
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Queue the renderer of structure `serial` for a network update. False
    /// if the structure is gone or has no renderer yet.
    pub fn request_renderer_sync(&mut self, serial: StructureSerial) -> bool {
        let renderer = self
            .cells
            .values()
            .find(|c| {
                c.is_rendering
                    && c.structure
                        .as_ref()
                        .is_some_and(|s| s.borrow().serial == serial)
            })
            .map(|c| c.position);
        match renderer {
            Some(pos) => {
                self.outbound.insert(pos);
                true
            }
            None => false,
        }
    }

    /// Encode every pending delta: removals first, then cell deltas in
    /// coordinate order.
    pub fn drain_outbound(&mut self) -> Vec<ObserverMessage> {
        let tick = self.tick;
        let mut out: Vec<ObserverMessage> = std::mem::take(&mut self.removed)
            .into_iter()
            .map(|pos| ObserverMessage::CellRemoved {
                tick,
                cell: pos.to_array(),
            })
            .collect();
        for pos in std::mem::take(&mut self.outbound) {
            let Some(cell) = self.cells.get_mut(&pos) else {
                continue;
            };
            match sync::encode_delta(cell) {
                Ok(payload) => out.push(ObserverMessage::CellDelta {
                    tick,
                    cell: pos.to_array(),
                    payload,
                }),
                Err(e) => tracing::warn!(cell = %pos, error = %e, "could not encode delta"),
            }
        }
        out
    }

    /// Full state for an observer attaching now. Pending deltas are not
    /// consumed.
    pub fn snapshot_for_observer(&self) -> Vec<ObserverMessage> {
        let mut out = Vec::new();
        for (pos, cell) in &self.cells {
            match sync::snapshot_delta(cell) {
                Ok(payload) => out.push(ObserverMessage::CellDelta {
                    tick: self.tick,
                    cell: pos.to_array(),
                    payload,
                }),
                Err(e) => tracing::warn!(cell = %pos, error = %e, "could not encode snapshot"),
            }
        }
        out
    }

    // -----------------------------------------------------------------------
    // Registry upkeep
    // -----------------------------------------------------------------------

    fn collect_garbage(&mut self) {
        let cells = &self.cells;
        let evicted = self.registry.collect_garbage(
            self.tick,
            self.config.cache_retention_ticks,
            |pos, key| {
                cells
                    .get(&pos)
                    .is_some_and(|c| c.cache.identity.as_ref() == Some(key))
            },
        );
        for identity in evicted {
            tracing::debug!(identity = %identity, tick = self.tick, "cache evicted");
            self.events.push(ClusterEvent::CacheEvicted { identity });
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Save grid, cell caches, and key generator state. Only keyed caches
    /// produce cell records.
    pub fn to_json(&self) -> Result<String, PersistError> {
        let mut cells = Vec::new();
        for (pos, cell) in &self.cells {
            let mut storage = Map::new();
            cell.save_cache(&mut storage)?;
            if !storage.is_empty() {
                cells.push(SavedCell {
                    position: *pos,
                    storage,
                });
            }
        }
        let saved = SavedSim {
            tick: self.tick,
            config: self.config.clone(),
            world: self.world.clone(),
            cells,
            keys: self.registry.key_generator().clone(),
        };
        Ok(serde_json::to_string(&saved)?)
    }

    /// Rebuild a sim from `to_json` output. Caches load into their cells;
    /// structures form again on the next step.
    pub fn from_json(kind: K, json: &str) -> Result<Self, PersistError> {
        let saved: SavedSim = serde_json::from_str(json)?;
        if !saved.world.is_well_formed() {
            return Err(PersistError::MalformedWorld);
        }
        let mut sim = Self::new(kind, saved.config, saved.world);
        sim.tick = saved.tick;
        sim.registry.set_key_generator(saved.keys);
        for record in saved.cells {
            match sim.cells.get_mut(&record.position) {
                Some(cell) => cell.load_cache(&record.storage)?,
                None => tracing::debug!(cell = %record.position, "saved cache for a missing cell"),
            }
        }
        Ok(sim)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn world(&self) -> &VoxelWorld {
        &self.world
    }

    pub fn cell(&self, pos: VoxelCoord) -> Option<&Cell<K>> {
        self.cells.get(&pos)
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell<K>> {
        self.cells.values()
    }

    pub fn registry(&self) -> &Registry<K> {
        &self.registry
    }

    pub fn live_structures(&self) -> Vec<StructureHandle<K>> {
        self.registry.live_structures()
    }

    /// The structure the cell at `pos` belongs to.
    pub fn structure_at(&self, pos: VoxelCoord) -> Option<StructureHandle<K>> {
        self.cells.get(&pos).and_then(|c| c.structure.clone())
    }

    /// The cache a cell would persist right now.
    pub fn cache_at(&self, pos: VoxelCoord) -> Option<&Cache<K::Snapshot>> {
        self.cells.get(&pos).map(|c| &c.cache)
    }
}

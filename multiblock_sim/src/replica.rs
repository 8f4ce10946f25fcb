// Observer-side mirror of cell state, built only from sync deltas.
//
// A `ReplicaCell` knows what the authoritative side told it: whether the cell
// renders, whether it has a structure, and (for renderers) the last
// description received. Cells that are members but not renderers only get a
// placeholder structure with no anchor or identity.
//
// `ReplicaWorld` routes `ObserverMessage`s to cells and runs the replica
// tick, which produces presentation events:
// - `FormationEffect` on the tick a rendering cell first learns it has a
//   structure, provided the description (and so the anchor) is known.
// - `ViewersClosed` whenever a cell with open viewers has no structure, or
//   is removed outright.
//
// Malformed deltas are logged and dropped without touching any cell.

use crate::error::SyncError;
use crate::identity::IdentityKey;
use crate::sync::{Delta, ShapeUpdate};
use crate::types::{DimCoord, ViewerId, VolumeBounds, VoxelCoord};
use multiblock_protocol::ObserverMessage;
use std::collections::{BTreeMap, BTreeSet};

/// What an observer knows about a cell's structure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplicaStructure {
    pub bounds: VolumeBounds,
    /// `None` until a description arrives.
    pub render_anchor: Option<DimCoord>,
    pub identity: Option<IdentityKey>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaCell {
    pub position: VoxelCoord,
    pub structure: Option<ReplicaStructure>,
    pub is_rendering: bool,
    /// The `has_structure` flag from the latest delta.
    pub client_has_structure: bool,
    /// `client_has_structure` as of the previous replica tick.
    pub prev_structure: bool,
    pub viewers: BTreeSet<ViewerId>,
}

impl ReplicaCell {
    pub fn new(position: VoxelCoord) -> Self {
        Self {
            position,
            structure: None,
            is_rendering: false,
            client_has_structure: false,
            prev_structure: false,
            viewers: BTreeSet::new(),
        }
    }

    /// Apply an already-validated delta.
    pub fn apply(&mut self, delta: Delta) {
        self.is_rendering = delta.is_rendering;
        self.client_has_structure = delta.has_structure;
        if !delta.has_structure {
            self.structure = None;
            return;
        }
        let structure = self.structure.get_or_insert_with(ReplicaStructure::default);
        if let ShapeUpdate::Changed(desc) = delta.shape {
            structure.bounds = desc.bounds;
            structure.render_anchor = Some(desc.render_anchor);
            structure.identity = desc.identity;
        }
    }

    fn tick(&mut self, events: &mut Vec<ReplicaEvent>) {
        if !self.client_has_structure && !self.viewers.is_empty() {
            let viewers = std::mem::take(&mut self.viewers).into_iter().collect();
            events.push(ReplicaEvent::ViewersClosed {
                cell: self.position,
                viewers,
            });
        }
        if !self.prev_structure && self.client_has_structure && self.is_rendering {
            if let Some(structure) = &self.structure {
                if let Some(anchor) = structure.render_anchor {
                    events.push(ReplicaEvent::FormationEffect {
                        cell: self.position,
                        anchor,
                        bounds: structure.bounds,
                        identity: structure.identity.clone(),
                    });
                }
            }
        }
        self.prev_structure = self.client_has_structure;
    }
}

/// Presentation events from a replica tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplicaEvent {
    FormationEffect {
        cell: VoxelCoord,
        anchor: DimCoord,
        bounds: VolumeBounds,
        identity: Option<IdentityKey>,
    },
    ViewersClosed {
        cell: VoxelCoord,
        viewers: Vec<ViewerId>,
    },
}

/// All replica cells known to one observer.
#[derive(Clone, Debug, Default)]
pub struct ReplicaWorld {
    cells: BTreeMap<VoxelCoord, ReplicaCell>,
    pending: Vec<ReplicaEvent>,
    last_tick: u64,
}

impl ReplicaWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_message(&mut self, msg: &ObserverMessage) -> Result<(), SyncError> {
        let pos = VoxelCoord::from_array(msg.cell());
        match msg {
            ObserverMessage::CellDelta { tick, payload, .. } => {
                let delta = Delta::decode(payload).inspect_err(|e| {
                    tracing::warn!(cell = %pos, tick, error = %e, "dropping malformed delta");
                })?;
                self.cells
                    .entry(pos)
                    .or_insert_with(|| ReplicaCell::new(pos))
                    .apply(delta);
            }
            ObserverMessage::CellRemoved { .. } => {
                if let Some(removed) = self.cells.remove(&pos) {
                    if !removed.viewers.is_empty() {
                        self.pending.push(ReplicaEvent::ViewersClosed {
                            cell: pos,
                            viewers: removed.viewers.into_iter().collect(),
                        });
                    }
                }
            }
        }
        self.last_tick = self.last_tick.max(msg.tick());
        Ok(())
    }

    /// Run the replica tick over every cell.
    pub fn tick(&mut self) -> Vec<ReplicaEvent> {
        let mut events = std::mem::take(&mut self.pending);
        let mut cell_events = Vec::new();
        for cell in self.cells.values_mut() {
            cell.tick(&mut cell_events);
        }
        // One effect per cluster per tick.
        let mut effected: Vec<VoxelCoord> = Vec::new();
        for event in cell_events {
            if let ReplicaEvent::FormationEffect { cell, .. } = &event {
                if effected.iter().any(|&other| self.same_cluster(*cell, other)) {
                    continue;
                }
                effected.push(*cell);
            }
            events.push(event);
        }
        events
    }

    /// Whether two cells show the same described structure: same identity
    /// key if both have one, otherwise same render anchor.
    pub fn same_cluster(&self, a: VoxelCoord, b: VoxelCoord) -> bool {
        let (Some(sa), Some(sb)) = (
            self.cells.get(&a).and_then(|c| c.structure.as_ref()),
            self.cells.get(&b).and_then(|c| c.structure.as_ref()),
        ) else {
            return false;
        };
        match (&sa.identity, &sb.identity) {
            (Some(ka), Some(kb)) => ka == kb,
            _ => sa.render_anchor.is_some() && sa.render_anchor == sb.render_anchor,
        }
    }

    /// Open a viewer on a known cell. Returns false for unknown cells.
    pub fn open_viewer(&mut self, cell: VoxelCoord, viewer: ViewerId) -> bool {
        match self.cells.get_mut(&cell) {
            Some(c) => {
                c.viewers.insert(viewer);
                true
            }
            None => false,
        }
    }

    pub fn cell(&self, pos: VoxelCoord) -> Option<&ReplicaCell> {
        self.cells.get(&pos)
    }

    pub fn cells(&self) -> impl Iterator<Item = &ReplicaCell> {
        self.cells.values()
    }

    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }
}

// Events emitted by a simulation step.
//
// The sim does not call out to collaborators. Anything another system has to
// react to (neighbour updates, viewers that must close, structures coming
// and going) is returned as a `ClusterEvent` in the step's `StepResult`, in
// the order it happened.
//
// See also: `sim.rs` for where each event is produced, `replica.rs` for the
// observer-side `ReplicaEvent`.

use crate::identity::IdentityKey;
use crate::types::{DimCoord, StructureSerial, ViewerId, VolumeBounds, VoxelCoord};
use serde::{Deserialize, Serialize};

/// Why a structure was taken apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DismantleReason {
    /// Re-running formation failed or found a different shape.
    ValidationFailed,
    /// A logic member's voxel was removed.
    MemberRemoved,
    /// The world was unloaded.
    Unloaded,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterEvent {
    StructureFormed {
        serial: StructureSerial,
        anchor: DimCoord,
        bounds: VolumeBounds,
        identity: Option<IdentityKey>,
        /// Logic plus shape-only members.
        members: usize,
    },
    StructureDismantled {
        serial: StructureSerial,
        identity: Option<IdentityKey>,
        reason: DismantleReason,
    },
    /// A non-member voxel next to a structure that formed or broke.
    NeighborChanged {
        neighbor: VoxelCoord,
        source: VoxelCoord,
    },
    /// Viewers on a cell were forced closed.
    ViewersClosed {
        cell: VoxelCoord,
        viewers: Vec<ViewerId>,
    },
    /// A cache was dropped from the registry, by garbage collection or by
    /// being merged into another identity.
    CacheEvicted { identity: IdentityKey },
}

/// Output of one `ClusterSim::step`.
#[derive(Clone, Debug, Default)]
pub struct StepResult {
    pub tick: u64,
    pub events: Vec<ClusterEvent>,
}

impl StepResult {
    pub fn formed(&self) -> impl Iterator<Item = &ClusterEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, ClusterEvent::StructureFormed { .. }))
    }

    pub fn dismantled(&self) -> impl Iterator<Item = &ClusterEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, ClusterEvent::StructureDismantled { .. }))
    }
}

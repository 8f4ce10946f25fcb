// Commands that mutate the cluster simulation.
//
// All outside changes go through `ClusterCommand`: voxel edits, viewers
// opening and closing, and kind-specific inputs for a structure's logical
// update. Commands passed to `ClusterSim::step` are applied in slice order at
// the start of the step, before any cell ticks.
//
// See also: `sim.rs` for `apply_command()`.
//
// **Critical constraint: determinism.** Commands are the only external
// input. Two sims fed the same command slices from the same state stay
// identical.

use crate::types::{ViewerId, VoxelCoord, VoxelType};
use serde::{Deserialize, Serialize};

/// One external change, generic over the kind's input type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterCommand<I> {
    PlaceVoxel { coord: VoxelCoord, voxel: VoxelType },
    /// Same as placing `Air`.
    BreakVoxel { coord: VoxelCoord },
    /// Ignored unless the cell currently has a structure.
    OpenViewer { cell: VoxelCoord, viewer: ViewerId },
    CloseViewer { cell: VoxelCoord, viewer: ViewerId },
    /// Queue an input for the structure the cell belongs to. Inputs for a
    /// cell without a structure at update time are dropped.
    Deliver { cell: VoxelCoord, input: I },
}

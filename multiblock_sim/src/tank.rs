// Dynamic tank: the reference structure kind.
//
// Shape: a hollow box of `TankCasing`. Edges and corners must be casing;
// face positions may be casing or `StructuralGlass`; the interior must be
// empty. Capacity is `interior volume * capacity_per_block`.
//
// Each tick the tank's single logical update applies the queued `Fill` and
// `Drain` inputs, clamping the stored amount to `[0, capacity]`. Only the
// stored amount survives teardown (`TankSnapshot`); when two tanks' caches
// end up in one rebuilt tank, their fluid is added together and clamped to
// the new capacity on restore.

use crate::config::TankConfig;
use crate::formation::{BoxPosition, Candidate, FormationFailure};
use crate::kind::{FormationRules, IdentityKeyed, LogicUpdate};
use crate::structure::ClusterShape;
use crate::types::{VolumeBounds, VoxelCoord, VoxelType};
use crate::world::VoxelWorld;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DynamicTank {
    pub config: TankConfig,
}

impl DynamicTank {
    pub fn new(config: TankConfig) -> Self {
        Self { config }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TankData {
    pub stored: u64,
    pub capacity: u64,
    /// Number of logical updates run on this instance.
    pub updates: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TankInput {
    Fill(u32),
    Drain(u32),
}

/// Persisted part of a tank.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TankSnapshot {
    pub stored_fluid: u64,
}

impl FormationRules for DynamicTank {
    fn is_frame_member(&self, voxel: VoxelType) -> bool {
        voxel == VoxelType::TankCasing
    }

    fn validate(&self, world: &VoxelWorld, candidate: &Candidate) -> Result<(), FormationFailure> {
        for at in candidate.positions() {
            let found = world.get(at);
            match candidate.classify(at) {
                Some(BoxPosition::Interior) => {
                    if !found.is_air() {
                        return Err(FormationFailure::InvalidInterior { at, found });
                    }
                }
                Some(position) => {
                    let allowed = match position {
                        BoxPosition::Edge => self.is_frame_member(found),
                        _ => self.is_participant(found),
                    };
                    if found.is_air() {
                        return Err(FormationFailure::BoundaryBreach { at });
                    }
                    if !allowed {
                        return Err(FormationFailure::FrameMismatch { at, found });
                    }
                    // Right voxel, but the fill never got there: some other
                    // structure owns it.
                    if !candidate.reached(at) {
                        return Err(FormationFailure::Claimed { at });
                    }
                }
                None => {}
            }
        }
        Ok(())
    }
}

impl LogicUpdate for DynamicTank {
    type Data = TankData;
    type Input = TankInput;

    fn initial_data(&self, shape: &ClusterShape) -> TankData {
        TankData {
            stored: 0,
            capacity: shape.bounds.interior_volume() * u64::from(self.config.capacity_per_block),
            updates: 0,
        }
    }

    fn update(&self, _shape: &ClusterShape, data: &mut TankData, inputs: Vec<TankInput>) {
        for input in inputs {
            data.stored = match input {
                TankInput::Fill(amount) => data.stored.saturating_add(u64::from(amount)).min(data.capacity),
                TankInput::Drain(amount) => data.stored.saturating_sub(u64::from(amount)),
            };
        }
        data.updates += 1;
    }
}

impl IdentityKeyed for DynamicTank {
    type Snapshot = TankSnapshot;

    fn snapshot(&self, data: &TankData) -> TankSnapshot {
        TankSnapshot {
            stored_fluid: data.stored,
        }
    }

    fn restore(&self, _shape: &ClusterShape, data: &mut TankData, snapshot: &TankSnapshot) {
        data.stored = snapshot.stored_fluid.min(data.capacity);
    }

    fn merge(&self, into: &mut TankSnapshot, other: &TankSnapshot) {
        into.stored_fluid = into.stored_fluid.saturating_add(other.stored_fluid);
    }
}

/// Fill every shell position of the box at `min` with extents `bounds` with
/// tank casing. The interior is left as it was.
pub fn place_tank_shell(world: &mut VoxelWorld, min: VoxelCoord, bounds: VolumeBounds) {
    for dy in 0..bounds.height {
        for dz in 0..bounds.width {
            for dx in 0..bounds.length {
                let on_shell = dx == 0
                    || dy == 0
                    || dz == 0
                    || dx == bounds.length - 1
                    || dy == bounds.height - 1
                    || dz == bounds.width - 1;
                if on_shell {
                    let coord = VoxelCoord::new(min.x + dx, min.y + dy, min.z + dz);
                    world.set(coord, VoxelType::TankCasing);
                }
            }
        }
    }
}

// Capability traits that make a structure type.
//
// The substrate (formation, tick coordination, caching, sync) is generic over
// a `ClusterKind`. A kind is assembled from three capabilities:
// - `FormationRules`: which voxels take part in the flood fill and what a
//   valid box looks like.
// - `LogicUpdate`: the type's application data and its once-per-tick update.
// - `IdentityKeyed`: what part of that data survives teardown, keyed by the
//   structure's identity.
//
// Any type implementing all three is a `ClusterKind` through the blanket
// impl at the bottom; there is nothing else to implement. See `tank.rs` for
// the reference kind.

use crate::formation::{Candidate, FormationFailure};
use crate::structure::ClusterShape;
use crate::types::VoxelType;
use crate::world::VoxelWorld;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Shape rules for one structure type.
pub trait FormationRules {
    /// Logic members: voxels that get a cell and drive the protocol.
    fn is_frame_member(&self, voxel: VoxelType) -> bool;

    /// Shape-only members: part of the structure but without a cell.
    fn is_structural(&self, voxel: VoxelType) -> bool {
        voxel == VoxelType::StructuralGlass
    }

    /// Whether the flood fill may pass through `voxel`.
    fn is_participant(&self, voxel: VoxelType) -> bool {
        self.is_frame_member(voxel) || self.is_structural(voxel)
    }

    /// Accept or reject the bounding box found by the flood fill. Called only
    /// for candidates already inside the configured size range.
    fn validate(&self, world: &VoxelWorld, candidate: &Candidate) -> Result<(), FormationFailure>;
}

/// Per-structure application state and its single update per tick.
pub trait LogicUpdate {
    type Data: Clone + Debug;
    /// Inputs queued against member cells between updates.
    type Input: Clone + Debug + Serialize + DeserializeOwned;

    fn initial_data(&self, shape: &ClusterShape) -> Self::Data;

    /// Run once per structure per tick, with every input queued for any of
    /// its member cells since the last update.
    fn update(&self, shape: &ClusterShape, data: &mut Self::Data, inputs: Vec<Self::Input>);
}

/// The persisted slice of a structure's data.
pub trait IdentityKeyed: LogicUpdate {
    /// Must serialize as a JSON object: its fields are flattened into the
    /// owning cell's persisted storage.
    type Snapshot: Clone + Debug + Default + PartialEq + Serialize + DeserializeOwned;

    /// Kinds that never need continuity can opt out; their structures carry
    /// no identity key and never touch the registry.
    fn wants_identity(&self) -> bool {
        true
    }

    fn snapshot(&self, data: &Self::Data) -> Self::Snapshot;

    /// Load a cached snapshot into freshly built data for `shape`.
    fn restore(&self, shape: &ClusterShape, data: &mut Self::Data, snapshot: &Self::Snapshot);

    /// Fold a losing cache into the winner when two identities reunite in
    /// one structure. The default drops `other`.
    fn merge(&self, _into: &mut Self::Snapshot, _other: &Self::Snapshot) {}
}

/// A complete structure type.
pub trait ClusterKind: FormationRules + IdentityKeyed {}

impl<T: FormationRules + IdentityKeyed> ClusterKind for T {}

// The aggregate for one validated cluster.
//
// `ClusterShape` is the geometry found by the formation protocol: the box
// corners and extents, the render anchor, and the three disjoint member
// sets (logic members that own cells, shape-only members, interior
// positions). It is immutable once built; a structure whose geometry
// changes is dismantled and formed again.
//
// `Structure` adds the per-instance state around the shape: identity key,
// renderer election flag, the once-per-tick update flag, and the kind's
// data. Member cells share one instance through `StructureHandle`; the
// registry only keeps weak references, so the instance goes away when the
// last member lets go of it.

use crate::identity::IdentityKey;
use crate::kind::LogicUpdate;
use crate::types::{DimCoord, Footprint, StructureSerial, VolumeBounds, VoxelCoord};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// Shared handle held by every member cell.
pub type StructureHandle<K> = Rc<RefCell<Structure<K>>>;

/// Geometry of a formed structure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterShape {
    pub min: VoxelCoord,
    pub max: VoxelCoord,
    pub bounds: VolumeBounds,
    pub render_anchor: DimCoord,
    /// Logic members. Each has a cell.
    pub locations: BTreeSet<VoxelCoord>,
    /// Shape-only members.
    pub structural_locations: BTreeSet<VoxelCoord>,
    /// Positions strictly inside the shell.
    pub internal_locations: BTreeSet<VoxelCoord>,
}

impl ClusterShape {
    pub fn footprint(&self) -> Footprint {
        Footprint {
            dimension: self.render_anchor.dimension,
            min: self.min,
            max: self.max,
        }
    }

    /// Whether `coord` is a member of the structure, logic or shape-only.
    pub fn is_linked(&self, coord: VoxelCoord) -> bool {
        self.locations.contains(&coord) || self.structural_locations.contains(&coord)
    }

    /// Whether a change at `coord` can affect this structure: anywhere in the
    /// box or directly against it.
    pub fn touches(&self, coord: VoxelCoord) -> bool {
        (self.min.x - 1..=self.max.x + 1).contains(&coord.x)
            && (self.min.y - 1..=self.max.y + 1).contains(&coord.y)
            && (self.min.z - 1..=self.max.z + 1).contains(&coord.z)
    }

    /// Logic and shape-only members, each set in coordinate order.
    pub fn members(&self) -> impl Iterator<Item = VoxelCoord> + '_ {
        self.locations
            .iter()
            .chain(self.structural_locations.iter())
            .copied()
    }

    /// Same member sets and box. Anchor and bounds follow from these.
    pub fn same_geometry(&self, other: &ClusterShape) -> bool {
        self.min == other.min
            && self.max == other.max
            && self.locations == other.locations
            && self.structural_locations == other.structural_locations
    }
}

/// One live structure instance.
pub struct Structure<K: LogicUpdate> {
    pub serial: StructureSerial,
    pub shape: ClusterShape,
    pub identity: Option<IdentityKey>,
    /// Set once a member cell has taken the renderer role.
    pub has_renderer: bool,
    /// Set by the first member to run the logical update this tick; cleared
    /// at the end of the step.
    pub already_updated: bool,
    pub data: K::Data,
}

impl<K: LogicUpdate> fmt::Debug for Structure<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Structure")
            .field("serial", &self.serial)
            .field("bounds", &self.shape.bounds)
            .field("render_anchor", &self.shape.render_anchor)
            .field("identity", &self.identity)
            .field("has_renderer", &self.has_renderer)
            .field("already_updated", &self.already_updated)
            .field("data", &self.data)
            .finish()
    }
}

// Core types shared across the multiblock simulation.
//
// Defines grid coordinates (`VoxelCoord`, `DimCoord`), face directions,
// structure extents (`VolumeBounds`, `Footprint`), voxel materials, and
// small ID newtypes. All types derive `Serialize`/`Deserialize` for the
// save format.
//
// Axis conventions match the structure volume fields: a structure's
// `length` runs along X, `height` along Y, `width` along Z.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in the 3D voxel grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dir: FaceDirection) -> Self {
        let (dx, dy, dz) = dir.to_offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The 6 face-adjacent coordinates, in `FaceDirection::ALL` order.
    pub fn face_neighbors(self) -> [VoxelCoord; 6] {
        FaceDirection::ALL.map(|dir| self.offset(dir))
    }

    /// Sort key for picking a render anchor: lowest Y first, then Z, then X.
    pub fn anchor_order(self) -> (i32, i32, i32) {
        (self.y, self.z, self.x)
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six axis-aligned face directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FaceDirection {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl FaceDirection {
    pub const ALL: [FaceDirection; 6] = [
        FaceDirection::PosX,
        FaceDirection::NegX,
        FaceDirection::PosY,
        FaceDirection::NegY,
        FaceDirection::PosZ,
        FaceDirection::NegZ,
    ];

    pub fn to_offset(self) -> (i32, i32, i32) {
        match self {
            FaceDirection::PosX => (1, 0, 0),
            FaceDirection::NegX => (-1, 0, 0),
            FaceDirection::PosY => (0, 1, 0),
            FaceDirection::NegY => (0, -1, 0),
            FaceDirection::PosZ => (0, 0, 1),
            FaceDirection::NegZ => (0, 0, -1),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            FaceDirection::PosX => FaceDirection::NegX,
            FaceDirection::NegX => FaceDirection::PosX,
            FaceDirection::PosY => FaceDirection::NegY,
            FaceDirection::NegY => FaceDirection::PosY,
            FaceDirection::PosZ => FaceDirection::NegZ,
            FaceDirection::NegZ => FaceDirection::PosZ,
        }
    }
}

/// Which world (dimension) a coordinate belongs to.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DimensionId(pub i32);

/// A grid coordinate tagged with its dimension. Used for render anchors,
/// which observers need to place in the right world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimCoord {
    pub coord: VoxelCoord,
    pub dimension: DimensionId,
}

impl DimCoord {
    pub const fn new(coord: VoxelCoord, dimension: DimensionId) -> Self {
        Self { coord, dimension }
    }
}

impl fmt::Display for DimCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@dim{}", self.coord, self.dimension.0)
    }
}

/// Outer extents of a structure, in voxels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeBounds {
    /// Y extent.
    pub height: i32,
    /// Z extent.
    pub width: i32,
    /// X extent.
    pub length: i32,
}

impl VolumeBounds {
    pub const fn new(height: i32, width: i32, length: i32) -> Self {
        Self {
            height,
            width,
            length,
        }
    }

    /// Extents of the inclusive box `min..=max`.
    pub fn from_corners(min: VoxelCoord, max: VoxelCoord) -> Self {
        Self {
            height: max.y - min.y + 1,
            width: max.z - min.z + 1,
            length: max.x - min.x + 1,
        }
    }

    pub fn min_extent(&self) -> i32 {
        self.height.min(self.width).min(self.length)
    }

    pub fn max_extent(&self) -> i32 {
        self.height.max(self.width).max(self.length)
    }

    /// Voxels strictly inside the shell (zero for boxes thinner than 3).
    pub fn interior_volume(&self) -> u64 {
        let inner = |extent: i32| u64::try_from(extent - 2).unwrap_or(0);
        inner(self.height) * inner(self.width) * inner(self.length)
    }
}

impl fmt::Display for VolumeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.length, self.height, self.width)
    }
}

/// The spatial signature of a structure: its dimension and bounding corners.
/// Two structures with equal footprints occupy exactly the same box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Footprint {
    pub dimension: DimensionId,
    pub min: VoxelCoord,
    pub max: VoxelCoord,
}

// ---------------------------------------------------------------------------
// Voxel types
// ---------------------------------------------------------------------------

/// The material occupying one grid position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoxelType {
    #[default]
    Air,
    /// Ordinary solid block. Never part of a structure; receives neighbour
    /// notifications.
    Stone,
    /// Logic member of a dynamic tank.
    TankCasing,
    /// Logic member of a boiler. Foreign to tanks.
    BoilerCasing,
    /// Shape-only member usable by any structure type that allows it.
    StructuralGlass,
}

impl VoxelType {
    pub fn is_air(self) -> bool {
        self == VoxelType::Air
    }

    /// Whether this voxel belongs to some multiblock, of any type. Such
    /// voxels are not sent neighbour notifications when a structure forms
    /// or breaks next to them.
    pub fn is_multiblock_part(self) -> bool {
        matches!(
            self,
            VoxelType::TankCasing | VoxelType::BoilerCasing | VoxelType::StructuralGlass
        )
    }
}

// ---------------------------------------------------------------------------
// IDs
// ---------------------------------------------------------------------------

/// A player (or other agent) with an interaction open on a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(pub u32);

/// Per-simulation sequence number of a structure instance. Not persisted;
/// used to tell structure instances apart in events and logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StructureSerial(pub u64);

impl fmt::Display for StructureSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "structure#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_neighbors_are_unit_offsets() {
        let c = VoxelCoord::new(5, 5, 5);
        for n in c.face_neighbors() {
            let d = (n.x - c.x).abs() + (n.y - c.y).abs() + (n.z - c.z).abs();
            assert_eq!(d, 1);
        }
    }

    #[test]
    fn offset_and_opposite_cancel() {
        let c = VoxelCoord::new(-2, 7, 3);
        for dir in FaceDirection::ALL {
            assert_eq!(c.offset(dir).offset(dir.opposite()), c);
        }
    }

    #[test]
    fn anchor_order_prefers_lowest_y() {
        let low = VoxelCoord::new(9, 0, 9);
        let high = VoxelCoord::new(0, 1, 0);
        assert!(low.anchor_order() < high.anchor_order());
        // Plain Ord is x-major, so the two orders disagree here.
        assert!(high < low);
    }

    #[test]
    fn bounds_from_corners_are_inclusive() {
        let b = VolumeBounds::from_corners(VoxelCoord::new(0, 0, 0), VoxelCoord::new(4, 2, 3));
        assert_eq!(b, VolumeBounds::new(3, 4, 5));
        assert_eq!(b.min_extent(), 3);
        assert_eq!(b.max_extent(), 5);
        assert_eq!(b.interior_volume(), 3 * 2);
    }

    #[test]
    fn thin_bounds_have_no_interior() {
        assert_eq!(VolumeBounds::new(1, 5, 5).interior_volume(), 0);
        assert_eq!(VolumeBounds::new(2, 5, 5).interior_volume(), 0);
    }

    #[test]
    fn footprint_json_roundtrip() {
        let fp = Footprint {
            dimension: DimensionId(-1),
            min: VoxelCoord::new(1, 2, 3),
            max: VoxelCoord::new(4, 5, 6),
        };
        let json = serde_json::to_string(&fp).unwrap();
        let restored: Footprint = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, fp);
    }
}

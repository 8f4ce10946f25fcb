// Dense 3D voxel grid: the spatial truth that formation reads.
//
// Stored as a flat `Vec<VoxelType>` indexed by
// `x + z * size_x + y * size_x * size_z`, giving O(1) read/write access.
// Out-of-bounds reads return `Air`; out-of-bounds writes are no-ops. Since a
// flood fill treats Air as "stop here", the grid edge behaves like open air
// and a structure touching it can still form.
//
// The grid is the grid-query collaborator for the formation protocol: node
// lookup (`get`), empty-space test (`is_air`), and neighbour enumeration
// (`face_neighbors_where`).
//
// Unlike structures, the grid is saved (see `sim.rs`), because structures are
// rebuilt from it after load.

use crate::types::{VoxelCoord, VoxelType};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Dense 3D voxel grid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoxelWorld {
    /// Flat storage: index = x + z * size_x + y * size_x * size_z.
    voxels: Vec<VoxelType>,
    size_x: u32,
    size_y: u32,
    size_z: u32,
}

impl VoxelWorld {
    /// Create a new world filled with `Air`.
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        Self {
            voxels: vec![VoxelType::Air; total],
            size_x,
            size_y,
            size_z,
        }
    }

    pub fn size_x(&self) -> u32 {
        self.size_x
    }

    pub fn size_y(&self) -> u32 {
        self.size_y
    }

    pub fn size_z(&self) -> u32 {
        self.size_z
    }

    /// Whether the storage length matches the declared size. Only a
    /// hand-edited or corrupted save can break this; reads from such a grid
    /// past the end of storage return `Air`.
    pub fn is_well_formed(&self) -> bool {
        let total = (self.size_x as usize) * (self.size_y as usize) * (self.size_z as usize);
        self.voxels.len() == total
    }

    pub fn in_bounds(&self, coord: VoxelCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && coord.z >= 0
            && (coord.x as u32) < self.size_x
            && (coord.y as u32) < self.size_y
            && (coord.z as u32) < self.size_z
    }

    fn index(&self, coord: VoxelCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            let x = coord.x as usize;
            let y = coord.y as usize;
            let z = coord.z as usize;
            let sx = self.size_x as usize;
            let sz = self.size_z as usize;
            Some(x + z * sx + y * sx * sz)
        } else {
            None
        }
    }

    /// Read a voxel. Returns `Air` for out-of-bounds coordinates.
    pub fn get(&self, coord: VoxelCoord) -> VoxelType {
        self.index(coord)
            .and_then(|i| self.voxels.get(i).copied())
            .unwrap_or(VoxelType::Air)
    }

    pub fn is_air(&self, coord: VoxelCoord) -> bool {
        self.get(coord).is_air()
    }

    /// Write a voxel and return what was there before. Out-of-bounds writes
    /// change nothing and return `None`.
    pub fn set(&mut self, coord: VoxelCoord, voxel: VoxelType) -> Option<VoxelType> {
        let i = self.index(coord)?;
        let slot = self.voxels.get_mut(i)?;
        Some(std::mem::replace(slot, voxel))
    }

    /// Face neighbours of `coord` whose voxel satisfies `pred`.
    pub fn face_neighbors_where(
        &self,
        coord: VoxelCoord,
        pred: impl Fn(VoxelType) -> bool,
    ) -> SmallVec<[VoxelCoord; 6]> {
        coord
            .face_neighbors()
            .into_iter()
            .filter(|&n| self.in_bounds(n) && pred(self.get(n)))
            .collect()
    }

    /// Every in-bounds coordinate holding `voxel`, in flat-array order
    /// (x inner, z mid, y outer).
    pub fn positions_of(&self, voxel: VoxelType) -> Vec<VoxelCoord> {
        self.positions_of_where(|v| v == voxel)
    }

    /// Every in-bounds coordinate whose voxel satisfies `pred`, in
    /// flat-array order.
    pub fn positions_of_where(&self, pred: impl Fn(VoxelType) -> bool) -> Vec<VoxelCoord> {
        let mut out = Vec::new();
        for y in 0..self.size_y as i32 {
            for z in 0..self.size_z as i32 {
                for x in 0..self.size_x as i32 {
                    let coord = VoxelCoord::new(x, y, z);
                    if pred(self.get(coord)) {
                        out.push(coord);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_is_all_air() {
        let world = VoxelWorld::new(4, 4, 4);
        assert!(world.positions_of(VoxelType::Air).len() == 64);
    }

    #[test]
    fn set_returns_previous_voxel() {
        let mut world = VoxelWorld::new(8, 8, 8);
        let coord = VoxelCoord::new(3, 5, 2);
        assert_eq!(world.set(coord, VoxelType::TankCasing), Some(VoxelType::Air));
        assert_eq!(world.set(coord, VoxelType::Stone), Some(VoxelType::TankCasing));
        assert_eq!(world.get(coord), VoxelType::Stone);
        assert!(world.is_air(VoxelCoord::new(3, 5, 3)));
    }

    #[test]
    fn out_of_bounds_read_returns_air() {
        let world = VoxelWorld::new(4, 4, 4);
        assert_eq!(world.get(VoxelCoord::new(-1, 0, 0)), VoxelType::Air);
        assert_eq!(world.get(VoxelCoord::new(0, 4, 0)), VoxelType::Air);
        assert_eq!(world.get(VoxelCoord::new(100, 100, 100)), VoxelType::Air);
    }

    #[test]
    fn out_of_bounds_write_is_noop() {
        let mut world = VoxelWorld::new(4, 4, 4);
        assert_eq!(world.set(VoxelCoord::new(-1, 0, 0), VoxelType::Stone), None);
        assert_eq!(world.set(VoxelCoord::new(4, 0, 0), VoxelType::Stone), None);
        assert_eq!(world.positions_of(VoxelType::Stone).len(), 0);
    }

    #[test]
    fn indexing_is_correct() {
        let mut world = VoxelWorld::new(10, 8, 6);
        let coord = VoxelCoord::new(5, 3, 4);
        world.set(coord, VoxelType::StructuralGlass);
        assert_eq!(world.positions_of(VoxelType::StructuralGlass), vec![coord]);
        assert!(world.is_air(VoxelCoord::new(4, 3, 4)));
        assert!(world.is_air(VoxelCoord::new(5, 2, 4)));
        assert!(world.is_air(VoxelCoord::new(5, 3, 3)));
    }

    #[test]
    fn face_neighbors_where_skips_out_of_bounds() {
        let mut world = VoxelWorld::new(4, 4, 4);
        world.set(VoxelCoord::new(1, 0, 0), VoxelType::TankCasing);
        world.set(VoxelCoord::new(0, 1, 0), VoxelType::TankCasing);
        let found =
            world.face_neighbors_where(VoxelCoord::new(0, 0, 0), |v| v == VoxelType::TankCasing);
        assert_eq!(found.len(), 2);
        // The three negative neighbours are out of bounds and read as Air,
        // but they are not reported even when the predicate accepts Air.
        let air = world.face_neighbors_where(VoxelCoord::new(0, 0, 0), VoxelType::is_air);
        assert_eq!(air.len(), 1);
    }

    #[test]
    fn positions_are_in_flat_array_order() {
        let mut world = VoxelWorld::new(3, 3, 3);
        let a = VoxelCoord::new(2, 0, 0);
        let b = VoxelCoord::new(0, 0, 1);
        let c = VoxelCoord::new(0, 1, 0);
        for coord in [c, b, a] {
            world.set(coord, VoxelType::Stone);
        }
        assert_eq!(world.positions_of(VoxelType::Stone), vec![a, b, c]);
    }

    #[test]
    fn short_storage_reads_air_and_ignores_writes() {
        let mut world: VoxelWorld =
            serde_json::from_str(r#"{"voxels":["Stone"],"size_x":2,"size_y":2,"size_z":2}"#)
                .unwrap();
        assert!(!world.is_well_formed());
        assert_eq!(world.get(VoxelCoord::new(0, 0, 0)), VoxelType::Stone);
        assert_eq!(world.get(VoxelCoord::new(1, 1, 1)), VoxelType::Air);
        assert_eq!(world.set(VoxelCoord::new(1, 1, 1), VoxelType::Stone), None);
        assert_eq!(world.positions_of(VoxelType::Stone).len(), 1);
    }

    #[test]
    fn world_json_roundtrip() {
        let mut world = VoxelWorld::new(3, 2, 2);
        world.set(VoxelCoord::new(1, 1, 1), VoxelType::TankCasing);
        let json = serde_json::to_string(&world).unwrap();
        let restored: VoxelWorld = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, world);
    }
}

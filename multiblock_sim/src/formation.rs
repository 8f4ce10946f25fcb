// Formation protocol: discover a cluster from one member and validate it.
//
// `attempt_formation` runs in four stages:
//
// 1. **Bail-out.** The start must be a logic member of the kind, not already
//    claimed, and have at least `min_member_neighbors` participating face
//    neighbours. Every shell position of a box with side >= 3 has three, so
//    this rejects stray voxels without a fill.
// 2. **Flood fill.** BFS through participating voxels (logic or shape-only).
//    Anything else stops the branch: air, out-of-world, foreign voxels, and
//    positions another live structure already owns. Exceeding
//    `max_explored_blocks` fails as `TooLarge`, and a box that already
//    outgrows `max_size` fails without finishing the fill.
// 3. **Box check.** The minimal bounding box of everything reached must lie
//    in `[min_size, max_size]` on every axis. The kind's
//    `FormationRules::validate` then decides what each box position must
//    hold.
// 4. **Shape.** Render anchor is the lowest logic member by (y, z, x);
//    interior positions are everything strictly inside the box.
//
// A failed attempt returns the positions it explored. Every one of them
// reaches the same component, so the caller skips them for the rest of the
// tick instead of repeating the fill.
//
// See also: `kind.rs` for `FormationRules`, `sim.rs` for assembly and
// revalidation, `tank.rs` for a concrete `validate`.

use crate::config::ClusterConfig;
use crate::kind::FormationRules;
use crate::structure::ClusterShape;
use crate::types::{DimCoord, VolumeBounds, VoxelCoord, VoxelType};
use crate::world::VoxelWorld;
use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

/// Why a cluster did not form.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormationFailure {
    #[error("{at} is not a logic member of this structure type")]
    NotAMember { at: VoxelCoord },
    #[error("{at} already belongs to a live structure")]
    Claimed { at: VoxelCoord },
    #[error("{at} has only {neighbors} participating neighbours")]
    Isolated { at: VoxelCoord, neighbors: usize },
    #[error("flood fill explored more than {explored} positions")]
    TooLarge { explored: usize },
    #[error("bounds {bounds} outside the allowed size range")]
    OutOfSizeRange { bounds: VolumeBounds },
    #[error("shell is open to air at {at}")]
    BoundaryBreach { at: VoxelCoord },
    #[error("{at} holds {found:?}, not a valid frame voxel")]
    FrameMismatch { at: VoxelCoord, found: VoxelType },
    #[error("interior position {at} holds {found:?}")]
    InvalidInterior { at: VoxelCoord, found: VoxelType },
}

/// A failed attempt with the positions it reached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rejected {
    pub reason: FormationFailure,
    pub explored: Vec<VoxelCoord>,
}

impl Rejected {
    fn new(reason: FormationFailure, explored: Vec<VoxelCoord>) -> Self {
        Self { reason, explored }
    }
}

/// Where a position sits relative to a box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoxPosition {
    /// On the boundary in two or more axes (corners included).
    Edge,
    /// On the boundary in exactly one axis.
    Face,
    Interior,
}

/// The bounding box of a flood fill, handed to `FormationRules::validate`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub min: VoxelCoord,
    pub max: VoxelCoord,
    pub bounds: VolumeBounds,
    /// Logic members reached by the fill.
    pub members: BTreeSet<VoxelCoord>,
    /// Shape-only members reached by the fill.
    pub structural: BTreeSet<VoxelCoord>,
}

impl Candidate {
    pub fn contains(&self, coord: VoxelCoord) -> bool {
        (self.min.x..=self.max.x).contains(&coord.x)
            && (self.min.y..=self.max.y).contains(&coord.y)
            && (self.min.z..=self.max.z).contains(&coord.z)
    }

    /// Whether the fill reached `coord`.
    pub fn reached(&self, coord: VoxelCoord) -> bool {
        self.members.contains(&coord) || self.structural.contains(&coord)
    }

    /// `None` for positions outside the box.
    pub fn classify(&self, coord: VoxelCoord) -> Option<BoxPosition> {
        if !self.contains(coord) {
            return None;
        }
        let on_boundary = [
            coord.x == self.min.x || coord.x == self.max.x,
            coord.y == self.min.y || coord.y == self.max.y,
            coord.z == self.min.z || coord.z == self.max.z,
        ];
        Some(match on_boundary.iter().filter(|&&b| b).count() {
            0 => BoxPosition::Interior,
            1 => BoxPosition::Face,
            _ => BoxPosition::Edge,
        })
    }

    /// Every position in the box, y outermost then z then x.
    pub fn positions(&self) -> impl Iterator<Item = VoxelCoord> + '_ {
        (self.min.y..=self.max.y).flat_map(move |y| {
            (self.min.z..=self.max.z).flat_map(move |z| {
                (self.min.x..=self.max.x).map(move |x| VoxelCoord::new(x, y, z))
            })
        })
    }
}

/// Try to form a cluster starting at `start`. `is_claimed` reports positions
/// owned by some other live structure.
pub fn attempt_formation<R: FormationRules + ?Sized>(
    world: &VoxelWorld,
    rules: &R,
    config: &ClusterConfig,
    start: VoxelCoord,
    is_claimed: impl Fn(VoxelCoord) -> bool,
) -> Result<ClusterShape, Rejected> {
    if !rules.is_frame_member(world.get(start)) {
        return Err(Rejected::new(
            FormationFailure::NotAMember { at: start },
            vec![start],
        ));
    }
    if is_claimed(start) {
        return Err(Rejected::new(
            FormationFailure::Claimed { at: start },
            vec![start],
        ));
    }
    let neighbors = world
        .face_neighbors_where(start, |v| rules.is_participant(v))
        .len();
    if neighbors < config.min_member_neighbors {
        return Err(Rejected::new(
            FormationFailure::Isolated {
                at: start,
                neighbors,
            },
            vec![start],
        ));
    }

    let mut visited: FxHashSet<VoxelCoord> = FxHashSet::default();
    visited.insert(start);
    let mut queue = VecDeque::from([start]);
    let mut members = BTreeSet::new();
    let mut structural = BTreeSet::new();
    let (mut min, mut max) = (start, start);

    while let Some(pos) = queue.pop_front() {
        if rules.is_frame_member(world.get(pos)) {
            members.insert(pos);
        } else {
            structural.insert(pos);
        }
        min = VoxelCoord::new(min.x.min(pos.x), min.y.min(pos.y), min.z.min(pos.z));
        max = VoxelCoord::new(max.x.max(pos.x), max.y.max(pos.y), max.z.max(pos.z));

        let explored = members.len() + structural.len();
        if explored > config.max_explored_blocks {
            return Err(Rejected::new(
                FormationFailure::TooLarge { explored },
                collect_explored(&members, &structural),
            ));
        }
        let bounds = VolumeBounds::from_corners(min, max);
        if bounds.max_extent() > config.max_size {
            return Err(Rejected::new(
                FormationFailure::OutOfSizeRange { bounds },
                collect_explored(&members, &structural),
            ));
        }

        for next in world.face_neighbors_where(pos, |v| rules.is_participant(v)) {
            if visited.insert(next) && !is_claimed(next) {
                queue.push_back(next);
            }
        }
    }

    tracing::trace!(
        start = %start,
        members = members.len(),
        structural = structural.len(),
        "flood fill finished"
    );

    let bounds = VolumeBounds::from_corners(min, max);
    if bounds.min_extent() < config.min_size || bounds.max_extent() > config.max_size {
        return Err(Rejected::new(
            FormationFailure::OutOfSizeRange { bounds },
            collect_explored(&members, &structural),
        ));
    }

    let candidate = Candidate {
        min,
        max,
        bounds,
        members,
        structural,
    };
    if let Err(reason) = rules.validate(world, &candidate) {
        let explored = collect_explored(&candidate.members, &candidate.structural);
        return Err(Rejected::new(reason, explored));
    }

    let anchor = candidate
        .members
        .iter()
        .copied()
        .min_by_key(|c| c.anchor_order())
        .unwrap_or(start);
    let internal_locations = candidate
        .positions()
        .filter(|&c| candidate.classify(c) == Some(BoxPosition::Interior))
        .collect();

    Ok(ClusterShape {
        min: candidate.min,
        max: candidate.max,
        bounds: candidate.bounds,
        render_anchor: DimCoord::new(anchor, config.dimension),
        locations: candidate.members,
        structural_locations: candidate.structural,
        internal_locations,
    })
}

fn collect_explored(
    members: &BTreeSet<VoxelCoord>,
    structural: &BTreeSet<VoxelCoord>,
) -> Vec<VoxelCoord> {
    members.iter().chain(structural.iter()).copied().collect()
}

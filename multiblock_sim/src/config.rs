// Data-driven configuration for the cluster simulation.
//
// `ClusterConfig` holds the substrate's tunables: size limits for formation,
// the flood-fill budget, cache retention, and the seed for identity keys.
// `TankConfig` holds the parameters of the reference tank structure type.
// Both load from JSON; omitted fields take their defaults, so a config file
// only needs to list what it changes.
//
// See also: `formation.rs` for how the size limits and explored-volume bound
// are applied, `registry.rs` for cache retention, `tank.rs` for `TankConfig`.
//
// **Critical constraint: determinism.** Config values feed directly into
// formation and key generation. Authoritative side and any replay must use
// identical configs.

use crate::types::DimensionId;
use serde::{Deserialize, Serialize};

/// Tunables for formation, caching, and identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Dimension tag written into render anchors.
    pub dimension: DimensionId,
    /// Smallest allowed extent along any axis.
    pub min_size: i32,
    /// Largest allowed extent along any axis.
    pub max_size: i32,
    /// Flood-fill budget: an attempt that reaches more member positions
    /// than this fails as too large.
    pub max_explored_blocks: usize,
    /// Cheap bail-out: a start position with fewer member face neighbours
    /// than this is not tried.
    pub min_member_neighbors: usize,
    /// How often the registry drops stale cache holders and evicts caches.
    pub cache_gc_interval_ticks: u64,
    /// How long an unheld cache stays claimable by footprint.
    pub cache_retention_ticks: u64,
    /// Seed for fresh identity keys.
    pub key_seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            dimension: DimensionId(0),
            min_size: 3,
            max_size: 18,
            // Surface of an 18^3 box is 1736 positions; leave headroom for
            // stray members attached to the outside.
            max_explored_blocks: 4096,
            min_member_neighbors: 3,
            cache_gc_interval_ticks: 20,
            cache_retention_ticks: 200,
            key_seed: 0,
        }
    }
}

impl ClusterConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Parameters of the dynamic tank structure type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TankConfig {
    /// Fluid capacity contributed by each interior voxel.
    pub capacity_per_block: u32,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            capacity_per_block: 16_000,
        }
    }
}

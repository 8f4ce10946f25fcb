// multiblock_sim — multiblock cluster simulation library.
//
// Many adjacent voxels ("cells") discover that together they form one larger
// structure, elect a single owner for its per-tick logic and its network
// description, keep an identity for it across teardown and rebuild, and
// replicate a compact description to observers. Everything here is
// single-threaded and tick-driven; there are no locks.
//
// Module overview:
// - `sim.rs`:       ClusterSim: cells, the step loop, assembly, teardown,
//                   commands, observer output, save/load.
// - `formation.rs`: Flood fill + bounding box + pluggable validation.
// - `kind.rs`:      Capability traits a structure type implements.
// - `structure.rs`: ClusterShape and the shared Structure instance.
// - `cell.rs`:      Per-voxel participant state.
// - `cache.rs`:     Per-cell durable snapshot and its JSON storage form.
// - `registry.rs`:  Identity key -> cache table, footprint index, GC.
// - `identity.rs`:  IdentityKey and the seeded key generator.
// - `sync.rs`:      Per-cell delta encode/decode.
// - `replica.rs`:   Observer-side mirror built from deltas.
// - `tank.rs`:      Dynamic tank, the reference structure type.
// - `command.rs`:   ClusterCommand: all external mutations.
// - `event.rs`:     ClusterEvent and StepResult.
// - `config.rs`:    ClusterConfig and TankConfig.
// - `error.rs`:     PersistError and SyncError.
// - `world.rs`:     Dense 3D voxel grid.
// - `types.rs`:     Coordinates, bounds, voxel types, small IDs.
//
// The wire primitives and observer framing live in the companion crate
// `multiblock_protocol`.
//
// **Critical constraint: determinism.** Same state plus same commands gives
// the same result: `BTreeMap`/`BTreeSet` for anything iterated, no system
// time, no OS entropy. Identity keys come from a seeded generator.

pub mod cache;
pub mod cell;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod formation;
pub mod identity;
pub mod kind;
pub mod registry;
pub mod replica;
pub mod sim;
pub mod structure;
pub mod sync;
pub mod tank;
pub mod types;
pub mod world;

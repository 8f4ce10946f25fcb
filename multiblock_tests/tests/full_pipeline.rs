// End-to-end tests for the cluster pipeline.
//
// Each test builds a real `ClusterSim<DynamicTank>` over a small voxel grid,
// drives it with commands, and checks the result on both sides: the
// authoritative cells/registry and a `TestObserver` whose replica is fed
// only through framed observer messages.

use multiblock_protocol::ObserverMessage;
use multiblock_sim::command::ClusterCommand;
use multiblock_sim::config::{ClusterConfig, TankConfig};
use multiblock_sim::event::{ClusterEvent, DismantleReason};
use multiblock_sim::formation::FormationFailure;
use multiblock_sim::identity::IdentityKey;
use multiblock_sim::replica::ReplicaEvent;
use multiblock_sim::sim::ClusterSim;
use multiblock_sim::sync::{Delta, ShapeUpdate};
use multiblock_sim::tank::{DynamicTank, TankInput, place_tank_shell};
use multiblock_sim::types::{StructureSerial, ViewerId, VolumeBounds, VoxelCoord, VoxelType};
use multiblock_sim::world::VoxelWorld;
use multiblock_tests::TestObserver;

type TankSim = ClusterSim<DynamicTank>;
type Command = ClusterCommand<TankInput>;

const MIN: VoxelCoord = VoxelCoord::new(2, 1, 2);
const CUBE: VolumeBounds = VolumeBounds::new(3, 3, 3);
/// A face centre of the cube at `MIN`.
const FACE: VoxelCoord = VoxelCoord::new(3, 2, 2);

fn cube_world() -> VoxelWorld {
    let mut world = VoxelWorld::new(16, 16, 16);
    place_tank_shell(&mut world, MIN, CUBE);
    world
}

fn sim_with(world: VoxelWorld, config: ClusterConfig) -> TankSim {
    ClusterSim::new(DynamicTank::new(TankConfig::default()), config, world)
}

fn cube_sim() -> TankSim {
    sim_with(cube_world(), ClusterConfig::default())
}

/// Step twice so every member has seen its membership transition.
fn settle(sim: &mut TankSim) {
    sim.step(&[]);
    sim.step(&[]);
}

fn identity_at(sim: &TankSim, pos: VoxelCoord) -> Option<IdentityKey> {
    sim.structure_at(pos).and_then(|s| s.borrow().identity.clone())
}

fn stored_at(sim: &TankSim, pos: VoxelCoord) -> u64 {
    sim.structure_at(pos)
        .map(|s| s.borrow().data.stored)
        .unwrap_or(0)
}

fn shell_positions(min: VoxelCoord, bounds: VolumeBounds) -> Vec<VoxelCoord> {
    let mut world = VoxelWorld::new(16, 16, 16);
    place_tank_shell(&mut world, min, bounds);
    world.positions_of(VoxelType::TankCasing)
}

fn break_all(positions: &[VoxelCoord]) -> Vec<Command> {
    positions
        .iter()
        .map(|&coord| Command::BreakVoxel { coord })
        .collect()
}

fn place_all(positions: &[VoxelCoord]) -> Vec<Command> {
    positions
        .iter()
        .map(|&coord| Command::PlaceVoxel {
            coord,
            voxel: VoxelType::TankCasing,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Formation and renderer election
// ---------------------------------------------------------------------------

#[test]
fn breached_cube_never_forms_then_sealed_cube_does() {
    let mut world = cube_world();
    world.set(FACE, VoxelType::Air);
    let mut sim = sim_with(world, ClusterConfig::default());

    let result = sim.step(&[]);
    assert_eq!(result.formed().count(), 0);
    let members: Vec<VoxelCoord> = sim.cells().map(|c| c.position).collect();
    assert_eq!(members.len(), 25);
    for pos in members {
        assert_eq!(
            sim.attempt_formation(pos),
            Err(FormationFailure::BoundaryBreach { at: FACE }),
            "attempt from {pos}"
        );
    }
    assert!(sim.cells().all(|c| !c.has_structure()));
    // Nothing has a transition to report yet.
    assert!(sim.drain_outbound().is_empty());

    let result = sim.step(&[Command::PlaceVoxel {
        coord: FACE,
        voxel: VoxelType::TankCasing,
    }]);
    assert_eq!(result.formed().count(), 1);
    assert_eq!(sim.live_structures().len(), 1);
    let handle = sim.structure_at(MIN).unwrap();
    assert_eq!(handle.borrow().shape.bounds, CUBE);

    let renderers: Vec<VoxelCoord> = sim
        .cells()
        .filter(|c| c.is_rendering)
        .map(|c| c.position)
        .collect();
    assert_eq!(renderers, vec![MIN]);

    let out = sim.drain_outbound();
    let ObserverMessage::CellDelta { cell, payload, .. } = &out[0] else {
        panic!("expected a cell delta first");
    };
    assert_eq!(*cell, MIN.to_array());
    assert_eq!(
        &payload[..15],
        &[1, 1, 1, 0, 0, 0, 3, 0, 0, 0, 3, 0, 0, 0, 3],
        "isRendering, hasStructure, descriptionChanged, height, width, length"
    );
    let delta = Delta::decode(payload).unwrap();
    let ShapeUpdate::Changed(desc) = delta.shape else {
        panic!("renderer delta should carry a description");
    };
    assert_eq!(desc.render_anchor.coord, MIN);
    assert_eq!(desc.identity, identity_at(&sim, MIN));
}

#[test]
fn formation_is_identical_from_every_member() {
    let sim = cube_sim();
    let members: Vec<VoxelCoord> = sim.cells().map(|c| c.position).collect();
    let mut seen = None;
    for start in members {
        let mut sim = cube_sim();
        sim.attempt_formation(start).unwrap();
        let handle = sim.structure_at(start).unwrap();
        let shape = handle.borrow().shape.clone();
        match &seen {
            None => seen = Some(shape),
            Some(first) => assert_eq!(&shape, first, "started from {start}"),
        }
    }
}

#[test]
fn single_update_per_tick_in_any_order() {
    let order: Vec<VoxelCoord> = cube_sim().cells().map(|c| c.position).collect();
    let mut reversed = order.clone();
    reversed.reverse();
    let mut strided: Vec<VoxelCoord> = order.iter().step_by(2).copied().collect();
    strided.extend(order.iter().skip(1).step_by(2).copied());

    for tick_order in [&order, &reversed, &strided] {
        let mut sim = cube_sim();
        for expected in 1..=5u64 {
            sim.step_in_order(&[], tick_order);
            assert_eq!(
                sim.structure_at(MIN).unwrap().borrow().data.updates,
                expected
            );
        }
        let renderers = sim.cells().filter(|c| c.is_rendering).count();
        assert_eq!(renderers, 1);
    }
}

#[test]
fn inputs_from_several_members_reach_one_update() {
    let mut sim = cube_sim();
    settle(&mut sim);
    let result = sim.step(&[
        Command::Deliver {
            cell: MIN,
            input: TankInput::Fill(700),
        },
        Command::Deliver {
            cell: VoxelCoord::new(4, 3, 4),
            input: TankInput::Fill(300),
        },
        Command::Deliver {
            cell: VoxelCoord::new(3, 1, 3),
            input: TankInput::Drain(200),
        },
    ]);
    assert_eq!(result.tick, 3);
    assert_eq!(stored_at(&sim, MIN), 800);
    assert_eq!(sim.cache_at(FACE).unwrap().snapshot.stored_fluid, 800);
}

#[test]
fn glass_face_forms_without_a_cell() {
    let mut world = cube_world();
    world.set(FACE, VoxelType::StructuralGlass);
    let mut sim = sim_with(world, ClusterConfig::default());
    assert!(sim.cell(FACE).is_none());
    let result = sim.step(&[]);
    assert!(matches!(
        result.formed().next(),
        Some(ClusterEvent::StructureFormed { members: 26, .. })
    ));
    let handle = sim.structure_at(MIN).unwrap();
    assert!(handle.borrow().shape.structural_locations.contains(&FACE));
}

#[test]
fn two_separate_tanks_form_independently() {
    let mut world = cube_world();
    let other_min = VoxelCoord::new(8, 1, 2);
    place_tank_shell(&mut world, other_min, VolumeBounds::new(4, 3, 5));
    let mut sim = sim_with(world, ClusterConfig::default());
    let result = sim.step(&[]);
    assert_eq!(result.formed().count(), 2);
    assert_ne!(identity_at(&sim, MIN), identity_at(&sim, other_min));
    settle(&mut sim);
    assert_eq!(sim.cells().filter(|c| c.is_rendering).count(), 2);
}

// ---------------------------------------------------------------------------
// Dismantling
// ---------------------------------------------------------------------------

#[test]
fn dismantle_cascades_and_notifies_neighbours() {
    let mut world = cube_world();
    let stone = VoxelCoord::new(5, 2, 3);
    world.set(stone, VoxelType::Stone);
    let mut sim = sim_with(world, ClusterConfig::default());
    settle(&mut sim);
    let key = identity_at(&sim, MIN);

    let result = sim.step(&[Command::BreakVoxel { coord: FACE }]);
    assert!(result.events.contains(&ClusterEvent::StructureDismantled {
        serial: StructureSerial(0),
        identity: key,
        reason: DismantleReason::MemberRemoved,
    }));
    assert!(result.events.contains(&ClusterEvent::NeighborChanged {
        neighbor: stone,
        source: VoxelCoord::new(4, 2, 3),
    }));
    assert!(sim.cells().all(|c| !c.has_structure() && !c.is_rendering));
    assert!(sim.live_structures().is_empty());

    let out = sim.drain_outbound();
    assert!(out.contains(&ObserverMessage::CellRemoved {
        tick: 3,
        cell: FACE.to_array(),
    }));
}

#[test]
fn viewers_are_forced_closed_on_both_sides() {
    let mut sim = cube_sim();
    let mut observer = TestObserver::new();
    sim.step(&[]);
    observer.pump(&mut sim);
    observer.tick();

    let result = sim.step(&[Command::OpenViewer {
        cell: MIN,
        viewer: ViewerId(9),
    }]);
    assert!(result.events.is_empty());
    assert!(observer.replica.open_viewer(MIN, ViewerId(9)));

    let result = sim.step(&[Command::BreakVoxel { coord: FACE }]);
    assert!(result.events.contains(&ClusterEvent::ViewersClosed {
        cell: MIN,
        viewers: vec![ViewerId(9)],
    }));

    observer.pump(&mut sim);
    assert!(observer.tick().contains(&ReplicaEvent::ViewersClosed {
        cell: MIN,
        viewers: vec![ViewerId(9)],
    }));
}

// ---------------------------------------------------------------------------
// Identity continuity and the registry
// ---------------------------------------------------------------------------

#[test]
fn identity_survives_rebuild_through_member_caches() {
    let mut sim = cube_sim();
    settle(&mut sim);
    sim.step(&[Command::Deliver {
        cell: MIN,
        input: TankInput::Fill(1234),
    }]);
    let key = identity_at(&sim, MIN).unwrap();

    sim.step(&[Command::BreakVoxel { coord: FACE }]);
    assert!(sim.live_structures().is_empty());
    assert_eq!(sim.cache_at(MIN).unwrap().identity.as_ref(), Some(&key));

    let result = sim.step(&[Command::PlaceVoxel {
        coord: FACE,
        voxel: VoxelType::TankCasing,
    }]);
    assert_eq!(result.formed().count(), 1);
    assert_eq!(identity_at(&sim, MIN), Some(key));
    assert_eq!(stored_at(&sim, MIN), 1234);
}

#[test]
fn identity_survives_rebuild_through_footprint() {
    let shell = shell_positions(MIN, CUBE);
    let mut sim = cube_sim();
    settle(&mut sim);
    sim.step(&[Command::Deliver {
        cell: MIN,
        input: TankInput::Fill(42),
    }]);
    let key = identity_at(&sim, MIN).unwrap();

    sim.step(&break_all(&shell));
    assert_eq!(sim.cells().count(), 0);

    let result = sim.step(&place_all(&shell));
    assert_eq!(result.formed().count(), 1);
    assert!(sim.cache_at(MIN).is_some());
    assert_eq!(identity_at(&sim, MIN), Some(key));
    assert_eq!(stored_at(&sim, MIN), 42);
}

#[test]
fn different_footprint_gets_a_fresh_identity() {
    let mut sim = cube_sim();
    settle(&mut sim);
    let key = identity_at(&sim, MIN).unwrap();
    sim.step(&break_all(&shell_positions(MIN, CUBE)));

    let moved = VoxelCoord::new(6, 1, 2);
    sim.step(&place_all(&shell_positions(moved, CUBE)));
    let new_key = identity_at(&sim, moved).unwrap();
    assert_ne!(new_key, key);
}

#[test]
fn merging_two_identities_sums_fluid_and_evicts_loser() {
    // Two 3x3x3 tanks side by side, then the shared wall is rebuilt as one
    // 3x3x5 tank made of both sets of cells.
    let left = MIN;
    let right = VoxelCoord::new(6, 1, 2);
    let mut world = VoxelWorld::new(16, 16, 16);
    place_tank_shell(&mut world, left, CUBE);
    place_tank_shell(&mut world, right, CUBE);
    let mut sim = sim_with(world, ClusterConfig::default());
    settle(&mut sim);
    sim.step(&[
        Command::Deliver {
            cell: left,
            input: TankInput::Fill(10),
        },
        Command::Deliver {
            cell: right,
            input: TankInput::Fill(5),
        },
    ]);
    let left_key = identity_at(&sim, left).unwrap();
    let right_key = identity_at(&sim, right).unwrap();

    // Bridge x = 5 between the two boxes and hollow out the old walls at
    // x = 4 and x = 6 so the combined box is 3 high, 3 wide, 7 long.
    let mut commands = Vec::new();
    for y in 1..=3 {
        for z in 2..=4 {
            let on_shell = y == 1 || y == 3 || z == 2 || z == 4;
            let bridge = VoxelCoord::new(5, y, z);
            if on_shell {
                commands.push(Command::PlaceVoxel {
                    coord: bridge,
                    voxel: VoxelType::TankCasing,
                });
            } else {
                commands.push(Command::BreakVoxel {
                    coord: VoxelCoord::new(4, y, z),
                });
                commands.push(Command::BreakVoxel {
                    coord: VoxelCoord::new(6, y, z),
                });
            }
        }
    }
    let result = sim.step(&commands);
    assert_eq!(result.dismantled().count(), 2);
    assert_eq!(result.formed().count(), 1);

    let merged = identity_at(&sim, left).unwrap();
    let (winner, loser) = if left_key < right_key {
        (left_key, right_key)
    } else {
        (right_key, left_key)
    };
    // 25 cells of each old tank survive; the tie goes to the smaller key.
    assert_eq!(merged, winner);
    assert!(result.events.contains(&ClusterEvent::CacheEvicted { identity: loser.clone() }));
    assert!(!sim.registry().contains(&loser));
    assert_eq!(stored_at(&sim, left), 15);
}

/// Shell positions of the cube at `MIN` whose x is `x`.
fn ring_at(x: i32) -> Vec<VoxelCoord> {
    shell_positions(MIN, CUBE)
        .into_iter()
        .filter(|c| c.x == x)
        .collect()
}

#[test]
fn split_tank_keeps_its_identity_in_one_half_only() {
    let mut sim = cube_sim();
    settle(&mut sim);
    sim.step(&[Command::Deliver {
        cell: MIN,
        input: TankInput::Fill(100),
    }]);
    let key = identity_at(&sim, MIN).unwrap();

    // Drop the middle ring; the walls at x = 2 and x = 4 survive with the key
    // in their caches.
    let result = sim.step(&break_all(&ring_at(3)));
    assert_eq!(result.dismantled().count(), 1);
    let right_wall = VoxelCoord::new(4, 1, 2);
    assert_eq!(sim.cache_at(right_wall).unwrap().identity.as_ref(), Some(&key));

    // Build a new tank onto each surviving wall.
    let left_min = VoxelCoord::new(0, 1, 2);
    let right_min = VoxelCoord::new(4, 1, 2);
    let mut commands = place_all(&shell_positions(left_min, CUBE));
    commands.extend(place_all(&shell_positions(right_min, CUBE)));
    let result = sim.step(&commands);
    assert_eq!(result.formed().count(), 2);

    let left_key = identity_at(&sim, left_min).unwrap();
    let right_key = identity_at(&sim, right_min).unwrap();
    assert_eq!(left_key, key);
    assert_ne!(right_key, key);
    assert_eq!(stored_at(&sim, left_min) + stored_at(&sim, right_min), 100);

    settle(&mut sim);
    assert!(
        sim.cells()
            .filter(|c| c.cache.identity.as_ref() == Some(&key))
            .all(|c| c.position.x <= 2)
    );
    assert_eq!(identity_at(&sim, right_min), Some(right_key));
}

#[test]
fn merged_away_identity_stays_gone() {
    // Tanks at x 2..4 and x 6..8. The new box spans x 2..6: all of the left
    // tank plus the right tank's x = 6 wall. The right tank's x = 8 wall is
    // cut loose and stays outside, still caching the right tank's key.
    let left = MIN;
    let right = VoxelCoord::new(6, 1, 2);
    let mut world = VoxelWorld::new(16, 16, 16);
    place_tank_shell(&mut world, left, CUBE);
    place_tank_shell(&mut world, right, CUBE);
    let mut sim = sim_with(world, ClusterConfig::default());
    settle(&mut sim);
    sim.step(&[
        Command::Deliver {
            cell: left,
            input: TankInput::Fill(10),
        },
        Command::Deliver {
            cell: right,
            input: TankInput::Fill(5),
        },
    ]);
    let left_key = identity_at(&sim, left).unwrap();
    let right_key = identity_at(&sim, right).unwrap();

    let mut commands = Vec::new();
    for y in 1..=3 {
        for z in 2..=4 {
            if y == 2 && z == 3 {
                commands.push(Command::BreakVoxel {
                    coord: VoxelCoord::new(4, y, z),
                });
                continue;
            }
            commands.push(Command::PlaceVoxel {
                coord: VoxelCoord::new(5, y, z),
                voxel: VoxelType::TankCasing,
            });
            commands.push(Command::BreakVoxel {
                coord: VoxelCoord::new(7, y, z),
            });
        }
    }
    let result = sim.step(&commands);
    assert_eq!(result.dismantled().count(), 2);
    assert_eq!(result.formed().count(), 1);
    // 25 left cells against 9 right cells.
    assert_eq!(identity_at(&sim, left), Some(left_key));
    assert!(result.events.contains(&ClusterEvent::CacheEvicted {
        identity: right_key.clone()
    }));
    assert_eq!(stored_at(&sim, left), 15);

    let outside = VoxelCoord::new(8, 2, 3);
    assert!(sim.structure_at(outside).is_none());
    assert!(!sim.cache_at(outside).unwrap().is_keyed());

    settle(&mut sim);
    assert!(!sim.registry().contains(&right_key));
    assert!(sim.cells().all(|c| c.cache.identity.as_ref() != Some(&right_key)));
}

#[test]
fn unheld_cache_is_evicted_after_retention() {
    let config = ClusterConfig {
        cache_gc_interval_ticks: 5,
        cache_retention_ticks: 10,
        ..ClusterConfig::default()
    };
    let shell = shell_positions(MIN, CUBE);
    let mut sim = sim_with(cube_world(), config);
    settle(&mut sim);
    let key = identity_at(&sim, MIN).unwrap();
    assert!(sim.registry().contains(&key));

    sim.step(&break_all(&shell));
    let mut evicted_at = None;
    for _ in 0..20 {
        let result = sim.step(&[]);
        if result.events.contains(&ClusterEvent::CacheEvicted { identity: key.clone() }) {
            evicted_at = Some(result.tick);
            break;
        }
    }
    // Last refresh at tick 2, eviction at the first GC tick at least 10 later.
    assert_eq!(evicted_at, Some(15));
    assert!(!sim.registry().contains(&key));

    sim.step(&place_all(&shell));
    assert_ne!(identity_at(&sim, MIN), Some(key));
}

#[test]
fn held_cache_is_not_evicted() {
    let config = ClusterConfig {
        cache_gc_interval_ticks: 2,
        cache_retention_ticks: 3,
        ..ClusterConfig::default()
    };
    let mut sim = sim_with(cube_world(), config);
    settle(&mut sim);
    let key = identity_at(&sim, MIN).unwrap();
    sim.step(&[Command::BreakVoxel { coord: FACE }]);
    for _ in 0..10 {
        let result = sim.step(&[]);
        assert!(!result.events.iter().any(|e| matches!(e, ClusterEvent::CacheEvicted { .. })));
    }
    assert!(sim.registry().contains(&key));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn save_and_load_reforms_with_same_identity() {
    let mut sim = cube_sim();
    settle(&mut sim);
    sim.step(&[Command::Deliver {
        cell: FACE,
        input: TankInput::Fill(900),
    }]);
    let key = identity_at(&sim, MIN).unwrap();

    let json = sim.to_json().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["cells"].as_array().unwrap().len(), 26);
    assert_eq!(parsed["cells"][0]["storage"]["cachedID"], key.as_str());
    assert_eq!(parsed["cells"][0]["storage"]["storedFluid"], 900);

    let mut restored = TankSim::from_json(DynamicTank::new(TankConfig::default()), &json).unwrap();
    assert_eq!(restored.tick(), 3);
    assert!(restored.live_structures().is_empty());
    let result = restored.step(&[]);
    assert_eq!(result.tick, 4);
    assert_eq!(identity_at(&restored, MIN), Some(key));
    assert_eq!(stored_at(&restored, MIN), 900);
}

#[test]
fn load_rejects_malformed_cell_storage() {
    let mut sim = cube_sim();
    settle(&mut sim);
    let json = sim.to_json().unwrap();
    let mut parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    parsed["cells"][0]["storage"]["cachedID"] = serde_json::json!(17);
    let broken = parsed.to_string();
    assert!(TankSim::from_json(DynamicTank::new(TankConfig::default()), &broken).is_err());
    assert!(TankSim::from_json(DynamicTank::new(TankConfig::default()), "{").is_err());
}

#[test]
fn config_loads_from_json() {
    let config = ClusterConfig::from_json(r#"{"min_size": 4}"#).unwrap();
    let mut sim = sim_with(cube_world(), config);
    let result = sim.step(&[]);
    assert_eq!(result.formed().count(), 0);
}

// ---------------------------------------------------------------------------
// Observer pipeline
// ---------------------------------------------------------------------------

#[test]
fn observer_sees_one_formation_effect() {
    let mut sim = cube_sim();
    let mut observer = TestObserver::new();
    sim.step(&[]);
    observer.pump(&mut sim);
    assert_eq!(observer.received, 26);
    assert_eq!(observer.rejected, 0);

    let events = observer.tick();
    let effects: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, ReplicaEvent::FormationEffect { .. }))
        .collect();
    assert_eq!(effects.len(), 1);
    let ReplicaEvent::FormationEffect { cell, bounds, identity, .. } = effects[0] else {
        unreachable!()
    };
    assert_eq!(*cell, MIN);
    assert_eq!(*bounds, CUBE);
    assert_eq!(*identity, identity_at(&sim, MIN));

    sim.step(&[]);
    observer.pump(&mut sim);
    assert!(observer.tick().is_empty());
}

#[test]
fn late_observer_gets_full_description() {
    let mut sim = cube_sim();
    settle(&mut sim);
    // Drop pending deltas so only the snapshot describes the structure.
    sim.drain_outbound();

    let mut observer = TestObserver::attach(&sim);
    assert_eq!(observer.received, 26);
    let renderer = observer.replica.cell(MIN).unwrap();
    let structure = renderer.structure.as_ref().unwrap();
    assert_eq!(structure.bounds, CUBE);
    assert_eq!(structure.identity, identity_at(&sim, MIN));
    assert!(observer.replica.same_cluster(MIN, MIN));
    assert!(matches!(
        observer.tick().as_slice(),
        [ReplicaEvent::FormationEffect { .. }]
    ));
}

#[test]
fn unchanged_delta_is_idempotent() {
    let mut sim = cube_sim();
    let mut observer = TestObserver::new();
    settle(&mut sim);
    observer.pump(&mut sim);
    observer.tick();
    let before = observer.replica.cell(MIN).cloned();

    for _ in 0..3 {
        assert!(sim.request_renderer_sync(StructureSerial(0)));
        let out = sim.drain_outbound();
        let ObserverMessage::CellDelta { payload, .. } = &out[0] else {
            panic!("expected a delta");
        };
        assert_eq!(payload, &vec![1, 1, 0]);
        observer.receive(&out);
        assert_eq!(observer.replica.cell(MIN).cloned(), before);
    }
    assert!(observer.tick().is_empty());
}

#[test]
fn truncated_delta_leaves_replica_untouched() {
    let mut sim = cube_sim();
    let mut observer = TestObserver::new();
    sim.step(&[]);
    let out = sim.drain_outbound();
    let ObserverMessage::CellDelta { tick, cell, payload } = out[0].clone() else {
        panic!("expected a delta");
    };

    for cut in [1, 2, 10, payload.len() - 1] {
        let truncated = ObserverMessage::CellDelta {
            tick,
            cell,
            payload: payload[..cut].to_vec(),
        };
        observer.receive(&[truncated]);
    }
    assert_eq!(observer.rejected, 4);
    assert!(observer.replica.cell(MIN).is_none());

    observer.receive(&out);
    assert_eq!(observer.rejected, 4);
    let good = observer.replica.cell(MIN).cloned();
    let bad = ObserverMessage::CellDelta {
        tick: tick + 1,
        cell,
        payload: vec![1, 1, 1, 0, 0],
    };
    observer.receive(&[bad]);
    assert_eq!(observer.rejected, 5);
    assert_eq!(observer.replica.cell(MIN).cloned(), good);
}

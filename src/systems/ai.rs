//! AI decision engine.
//!
//! One finite-state-machine update per AI entity per logic tick, reading the
//! per-tick snapshot cache and emitting movement intents and attack events.
//! The state machine is: Idle, Wander, Chase, Attack, Return, with Dead as
//! the terminal state entered via death events.

use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::error::SimError;
use crate::events::{AttackEvent, MoveIntent};
use crate::snapshot::SnapshotCache;
use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::warn;

// ============================================================================
// INITIALIZATION
// ============================================================================

/// Disables AI for entities that gained a [`Brain`] without the components
/// the engine needs. The brain is removed, so the entity is never retried.
pub fn ai_init_system(
    query: Query<
        (
            Entity,
            Option<&GridPosition>,
            Option<&Origin>,
            Option<&Faction>,
            Option<&Stats>,
            Option<&AiTuning>,
        ),
        Added<Brain>,
    >,
    mut commands: Commands,
) {
    for (entity, pos, origin, faction, stats, tuning) in query.iter() {
        let missing = if pos.is_none() {
            Some("GridPosition")
        } else if origin.is_none() {
            Some("Origin")
        } else if faction.is_none() {
            Some("Faction")
        } else if stats.is_none() {
            Some("Stats")
        } else if tuning.is_none() {
            Some("AiTuning")
        } else {
            None
        };

        if let Some(component) = missing {
            warn!(
                ?entity,
                "disabling AI: {}",
                SimError::MissingComponent(component)
            );
            commands.entity(entity).remove::<Brain>();
        }
    }
}

// ============================================================================
// TARGET ACQUISITION
// ============================================================================

/// Nearest snapshot entity hostile per the acting entity's faction rules.
/// Returns the candidate and its squared tile distance.
fn acquire_target(
    cache: &SnapshotCache,
    actor: Entity,
    actor_pos: GridPosition,
    actor_faction: &Faction,
) -> Option<(Entity, GridPosition, i64)> {
    let mut nearest: Option<(Entity, GridPosition, i64)> = None;
    for snap in cache.iter() {
        if snap.entity == actor || !snap.stats.is_alive() {
            continue;
        }
        if !actor_faction.is_hostile_to(snap.faction, snap.is_player) {
            continue;
        }
        let dist_sq = actor_pos.distance_sq(&snap.pos);
        if nearest.map_or(true, |(_, _, best)| dist_sq < best) {
            nearest = Some((snap.entity, snap.pos, dist_sq));
        }
    }
    nearest
}

/// Adjacent tile of `target` closest to `from` - the chase destination.
fn approach_tile(target: GridPosition, from: GridPosition) -> GridPosition {
    target
        .neighbors()
        .into_iter()
        .min_by_key(|tile| tile.distance_sq(&from))
        .unwrap()
}

/// Queue a movement intent and derive facing from the destination delta.
fn queue_move(
    moves: &mut EventWriter<MoveIntent>,
    facing: &mut Facing,
    entity: Entity,
    from: GridPosition,
    to: GridPosition,
    run: bool,
) {
    if let Some(dir) = Direction::from_delta(to.x - from.x, to.y - from.y) {
        facing.0 = dir;
    }
    moves.send(MoveIntent {
        entity,
        target: to,
        run,
    });
}

/// One-tile shuffle off a shared tile. A 2-in-3 draw moves the entity to an
/// unoccupied neighbor, falling back to a uniformly random direction when
/// all four are taken.
fn separation_shuffle(
    rng: &mut ChaCha8Rng,
    cache: &SnapshotCache,
    moves: &mut EventWriter<MoveIntent>,
    facing: &mut Facing,
    entity: Entity,
    pos: GridPosition,
) {
    if !rng.gen_bool(2.0 / 3.0) {
        return;
    }
    let neighbors = pos.neighbors();
    let open: Vec<GridPosition> = neighbors
        .iter()
        .copied()
        .filter(|tile| !cache.is_occupied(*tile))
        .collect();
    let dest = match open.choose(rng) {
        Some(tile) => *tile,
        None => *neighbors.choose(rng).unwrap(),
    };
    queue_move(moves, facing, entity, pos, dest, false);
}

// ============================================================================
// DECISION SYSTEM
// ============================================================================

/// Runs every AI state machine once per logic tick.
///
/// ## Data Access
/// - Reads: SimConfig, SnapshotCache
/// - Writes: Brain, Facing, SimRng, MoveIntent/AttackEvent channels
pub fn ai_decision_system(
    config: Res<SimConfig>,
    cache: Res<SnapshotCache>,
    mut rng: ResMut<SimRng>,
    mut moves: EventWriter<MoveIntent>,
    mut attacks: EventWriter<AttackEvent>,
    mut query: Query<(
        Entity,
        &GridPosition,
        &Origin,
        &Faction,
        &Stats,
        &AiTuning,
        &mut Brain,
        &mut Facing,
    )>,
) {
    let dt = config.tick_interval;

    for (entity, pos, origin, faction, stats, tuning, mut brain, mut facing) in query.iter_mut() {
        if brain.state == AiState::Dead {
            continue;
        }

        // Leash: beyond chase range of origin, everything else yields.
        let chase_sq = (tuning.chase_range as i64).pow(2);
        if pos.distance_sq(&origin.0) > chase_sq {
            brain.state = AiState::Return;
            brain.attack_timer = 0.0;
            queue_move(&mut moves, &mut facing, entity, *pos, origin.0, false);
            continue;
        }

        let awareness_sq = (tuning.awareness_range as i64).pow(2);
        let attack_sq = (stats.attack_range as i64).pow(2);
        // A target is only real to this entity while inside awareness range.
        let target = acquire_target(&cache, entity, *pos, faction)
            .filter(|(_, _, dist_sq)| *dist_sq <= awareness_sq);

        match brain.state {
            AiState::Idle => match target {
                Some((_, target_pos, dist_sq)) => {
                    if dist_sq == 0 {
                        separation_shuffle(&mut rng.0, &cache, &mut moves, &mut facing, entity, *pos);
                    } else if dist_sq <= attack_sq {
                        brain.state = AiState::Attack;
                        brain.attack_timer = 0.0;
                    } else {
                        brain.state = AiState::Chase;
                        let dest = approach_tile(target_pos, *pos);
                        queue_move(&mut moves, &mut facing, entity, *pos, dest, false);
                    }
                }
                None => {
                    if rng.0.gen::<f64>() < tuning.wander_chance {
                        brain.state = AiState::Wander;
                    }
                }
            },

            AiState::Wander => {
                // One-shot: pick a destination near origin, then settle.
                let radius = tuning.wander_radius;
                let dx = rng.0.gen_range(-radius..=radius);
                let dy = rng.0.gen_range(-radius..=radius);
                let dest = GridPosition::new(origin.0.x + dx, origin.0.y + dy);
                queue_move(&mut moves, &mut facing, entity, *pos, dest, false);
                brain.state = AiState::Idle;
            }

            AiState::Chase => match target {
                None => {
                    brain.state = AiState::Return;
                    queue_move(&mut moves, &mut facing, entity, *pos, origin.0, false);
                }
                Some((_, target_pos, dist_sq)) => {
                    if dist_sq == 0 {
                        separation_shuffle(&mut rng.0, &cache, &mut moves, &mut facing, entity, *pos);
                    } else if dist_sq <= attack_sq {
                        brain.state = AiState::Attack;
                        brain.attack_timer = 0.0;
                    } else {
                        let dest = approach_tile(target_pos, *pos);
                        queue_move(&mut moves, &mut facing, entity, *pos, dest, false);
                    }
                }
            },

            AiState::Attack => match target {
                None => {
                    brain.state = AiState::Chase;
                    brain.attack_timer = 0.0;
                }
                Some((victim, target_pos, dist_sq)) => {
                    let in_range = dist_sq <= attack_sq && dist_sq != 0;
                    if !in_range {
                        brain.state = AiState::Chase;
                        brain.attack_timer = 0.0;
                        queue_move(&mut moves, &mut facing, entity, *pos, target_pos, false);
                    } else {
                        brain.attack_timer += dt;
                        if brain.attack_timer >= stats.attack_speed {
                            brain.attack_timer = 0.0;
                            if let Some(dir) =
                                Direction::from_delta(target_pos.x - pos.x, target_pos.y - pos.y)
                            {
                                facing.0 = dir;
                            }
                            attacks.send(AttackEvent {
                                attacker: entity,
                                victim,
                            });
                        }
                    }
                }
            },

            AiState::Return => {
                if *pos == origin.0 {
                    brain.state = AiState::Idle;
                } else {
                    // Step one tile toward origin, x axis first.
                    let dx = origin.0.x - pos.x;
                    let dy = origin.0.y - pos.y;
                    let step = if dx != 0 {
                        GridPosition::new(pos.x + dx.signum(), pos.y)
                    } else {
                        GridPosition::new(pos.x, pos.y + dy.signum())
                    };
                    queue_move(&mut moves, &mut facing, entity, *pos, step, false);
                }
            }

            AiState::Dead => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::register_events;
    use crate::snapshot::snapshot_rebuild_system;

    fn test_world(tick_interval: f32) -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(SimConfig {
            tick_interval,
            ..Default::default()
        });
        world.insert_resource(SimRng::from_seed(7));
        world.init_resource::<SnapshotCache>();
        register_events(&mut world);

        let mut schedule = Schedule::default();
        schedule.add_systems((snapshot_rebuild_system, ai_decision_system).chain());
        (world, schedule)
    }

    fn npc_faction() -> Faction {
        let mut faction = Faction::new("goblins", Alignment::Bad);
        faction.hostile_to_player = true;
        faction
    }

    fn spawn_npc(world: &mut World, pos: GridPosition, tuning: AiTuning) -> Entity {
        world
            .spawn((
                pos,
                Origin(pos),
                npc_faction(),
                Stats::default(),
                tuning,
                Brain::default(),
                Facing::default(),
            ))
            .id()
    }

    fn spawn_victim(world: &mut World, pos: GridPosition) -> Entity {
        world
            .spawn((pos, Faction::new("adventurers", Alignment::Good), Stats::new(10), Player))
            .id()
    }

    fn move_intents(world: &World) -> Vec<MoveIntent> {
        world
            .resource::<Events<MoveIntent>>()
            .iter_current_update_events()
            .copied()
            .collect()
    }

    #[test]
    fn test_dead_is_terminal() {
        let (mut world, mut schedule) = test_world(0.3);
        let npc = spawn_npc(&mut world, GridPosition::new(0, 0), AiTuning::default());
        world.get_mut::<Brain>(npc).unwrap().state = AiState::Dead;
        spawn_victim(&mut world, GridPosition::new(1, 0));

        for _ in 0..10 {
            schedule.run(&mut world);
        }

        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Dead);
        assert!(move_intents(&world).is_empty());
        assert_eq!(world.resource::<Events<AttackEvent>>().len(), 0);
    }

    #[test]
    fn test_leash_forces_return_from_any_state() {
        let (mut world, mut schedule) = test_world(0.3);
        let tuning = AiTuning {
            chase_range: 3,
            ..Default::default()
        };
        let npc = spawn_npc(&mut world, GridPosition::new(0, 0), tuning);
        // Drag the entity far past its leash while mid-chase.
        world.get_mut::<Brain>(npc).unwrap().state = AiState::Chase;
        *world.get_mut::<GridPosition>(npc).unwrap() = GridPosition::new(9, 0);
        let origin = world.get::<Origin>(npc).unwrap().0;

        schedule.run(&mut world);

        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Return);
        let intents = move_intents(&world);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].target, origin);
    }

    #[test]
    fn test_idle_to_attack_when_hostile_adjacent() {
        let (mut world, mut schedule) = test_world(0.3);
        let npc = spawn_npc(&mut world, GridPosition::new(0, 0), AiTuning::default());
        spawn_victim(&mut world, GridPosition::new(1, 0));

        schedule.run(&mut world);

        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Attack);
    }

    #[test]
    fn test_idle_to_chase_queues_approach() {
        let (mut world, mut schedule) = test_world(0.3);
        let npc = spawn_npc(&mut world, GridPosition::new(0, 0), AiTuning::default());
        spawn_victim(&mut world, GridPosition::new(4, 0));

        schedule.run(&mut world);

        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Chase);
        let intents = move_intents(&world);
        assert_eq!(intents.len(), 1);
        // Destination is the target's adjacent tile nearest the chaser.
        assert_eq!(intents[0].target, GridPosition::new(3, 0));
        // Facing follows the queued move.
        assert_eq!(world.get::<Facing>(npc).unwrap().0, Direction::East);
    }

    #[test]
    fn test_hostiles_beyond_awareness_are_ignored() {
        let (mut world, mut schedule) = test_world(0.3);
        let tuning = AiTuning {
            awareness_range: 3,
            wander_chance: 0.0,
            ..Default::default()
        };
        let npc = spawn_npc(&mut world, GridPosition::new(0, 0), tuning);
        spawn_victim(&mut world, GridPosition::new(8, 0));

        schedule.run(&mut world);

        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Idle);
        assert!(move_intents(&world).is_empty());
    }

    #[test]
    fn test_wander_is_one_shot() {
        let (mut world, mut schedule) = test_world(0.3);
        let tuning = AiTuning {
            wander_chance: 1.0,
            wander_radius: 2,
            ..Default::default()
        };
        let npc = spawn_npc(&mut world, GridPosition::new(5, 5), tuning);

        schedule.run(&mut world);
        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Wander);
        assert!(move_intents(&world).is_empty(), "no move queued entering Wander");

        schedule.run(&mut world);
        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Idle);
        let intents = move_intents(&world);
        assert_eq!(intents.len(), 1);
        let dest = intents[0].target;
        assert!((dest.x - 5).abs() <= 2 && (dest.y - 5).abs() <= 2);
    }

    #[test]
    fn test_return_steps_prefer_x_axis() {
        let (mut world, mut schedule) = test_world(0.3);
        let tuning = AiTuning {
            chase_range: 10,
            wander_chance: 0.0,
            ..Default::default()
        };
        let npc = spawn_npc(&mut world, GridPosition::new(0, 0), tuning);
        world.get_mut::<Brain>(npc).unwrap().state = AiState::Return;
        *world.get_mut::<GridPosition>(npc).unwrap() = GridPosition::new(2, 2);

        schedule.run(&mut world);

        let intents = move_intents(&world);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].target, GridPosition::new(1, 2));
    }

    #[test]
    fn test_return_at_origin_settles_to_idle() {
        let (mut world, mut schedule) = test_world(0.3);
        let tuning = AiTuning {
            wander_chance: 0.0,
            ..Default::default()
        };
        let npc = spawn_npc(&mut world, GridPosition::new(3, 3), tuning);
        world.get_mut::<Brain>(npc).unwrap().state = AiState::Return;

        schedule.run(&mut world);

        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Idle);
    }

    #[test]
    fn test_attack_fires_after_interval_and_faces_target() {
        let (mut world, mut schedule) = test_world(0.3);
        let npc = spawn_npc(&mut world, GridPosition::new(1, 0), AiTuning::default());
        world.get_mut::<Stats>(npc).unwrap().attack_speed = 0.6;
        world.get_mut::<Brain>(npc).unwrap().state = AiState::Attack;
        let victim = spawn_victim(&mut world, GridPosition::new(0, 0));

        // First tick accumulates 0.3s - below the 0.6s interval.
        schedule.run(&mut world);
        assert_eq!(world.resource::<Events<AttackEvent>>().len(), 0);

        // Second tick reaches the interval: fire, reset, face the target.
        schedule.run(&mut world);
        let attacks: Vec<AttackEvent> = world
            .resource::<Events<AttackEvent>>()
            .iter_current_update_events()
            .copied()
            .collect();
        assert_eq!(attacks.len(), 1);
        assert_eq!(attacks[0].victim, victim);
        assert_eq!(world.get::<Facing>(npc).unwrap().0, Direction::West);
        assert_eq!(world.get::<Brain>(npc).unwrap().attack_timer, 0.0);
    }

    #[test]
    fn test_attack_out_of_range_falls_back_to_chase() {
        let (mut world, mut schedule) = test_world(0.3);
        let npc = spawn_npc(&mut world, GridPosition::new(0, 0), AiTuning::default());
        world.get_mut::<Brain>(npc).unwrap().state = AiState::Attack;
        spawn_victim(&mut world, GridPosition::new(4, 0));

        schedule.run(&mut world);

        assert_eq!(world.get::<Brain>(npc).unwrap().state, AiState::Chase);
        let intents = move_intents(&world);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].target, GridPosition::new(4, 0));
    }

    #[test]
    fn test_ai_init_disables_incomplete_entities() {
        let mut world = World::new();
        let mut schedule = Schedule::default();
        schedule.add_systems(ai_init_system);

        // Missing Stats, Faction, AiTuning.
        let broken = world
            .spawn((GridPosition::new(0, 0), Origin(GridPosition::new(0, 0)), Brain::default()))
            .id();
        let complete = world
            .spawn((
                GridPosition::new(1, 1),
                Origin(GridPosition::new(1, 1)),
                npc_faction(),
                Stats::default(),
                AiTuning::default(),
                Brain::default(),
            ))
            .id();

        schedule.run(&mut world);

        assert!(world.get::<Brain>(broken).is_none());
        assert!(world.get::<Brain>(complete).is_some());
    }
}

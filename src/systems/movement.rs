//! Movement coordinator.
//!
//! Consumes movement intents, requests paths from the injected pathfinder,
//! and advances each moving entity's logical grid position tile-by-tile once
//! per logic tick. The on-screen position is handled separately: the first
//! tick of every accepted path hands an interpolation run covering the whole
//! path to the frame domain, keeping logic determinism decoupled from frame
//! rate.

use crate::components::*;
use crate::config::SimConfig;
use crate::events::{MoveCompleted, MoveIntent, MoveStarted};
use crate::path::{PathfinderHandle, RUN_NODE_BUDGET, WALK_NODE_BUDGET};
use crate::systems::interpolation::InterpolationState;
use bevy_ecs::prelude::*;
use tracing::debug;

/// Turns accepted movement intents into [`MovementState`]s.
///
/// Intents referencing stale entities, intents the pathfinder cannot serve,
/// and degenerate paths (< 2 tiles) are dropped without retry; a fresh
/// intent must come from whatever produced the original one.
pub fn movement_intent_system(
    config: Res<SimConfig>,
    pathfinder: Res<PathfinderHandle>,
    mut intents: EventReader<MoveIntent>,
    positions: Query<&GridPosition, Without<Dying>>,
    mut commands: Commands,
) {
    for intent in intents.read() {
        let Ok(start) = positions.get(intent.entity) else {
            debug!(entity = ?intent.entity, "move intent dropped: stale entity");
            continue;
        };

        let budget = if intent.run {
            RUN_NODE_BUDGET
        } else {
            WALK_NODE_BUDGET
        };
        let Some(path) = pathfinder.find_path(*start, intent.target, budget) else {
            debug!(entity = ?intent.entity, goal = ?intent.target, "move intent dropped: no path");
            continue;
        };
        if path.len() < 2 {
            debug!(entity = ?intent.entity, "move intent dropped: degenerate path");
            continue;
        }

        commands
            .entity(intent.entity)
            .insert(MovementState::new(path, intent.run, config.tick_interval));
    }
}

/// Advances every active path by one tile per tick (two when running).
///
/// The first tick of a path also kicks off the visual interpolation run for
/// the entire path and publishes `MoveStarted`; reaching the last tile
/// publishes `MoveCompleted` and removes the movement state.
pub fn movement_step_system(
    config: Res<SimConfig>,
    mut started: EventWriter<MoveStarted>,
    mut completed: EventWriter<MoveCompleted>,
    mut query: Query<(Entity, &mut MovementState, &mut GridPosition, &mut AnimationState)>,
    mut commands: Commands,
) {
    for (entity, mut movement, mut pos, mut animation) in query.iter_mut() {
        if !movement.interpolation_started {
            let interpolation = InterpolationState::from_tile_path(
                &movement.path,
                config.tile_size,
                movement.tile_duration,
            );
            commands.entity(entity).insert(interpolation);
            movement.interpolation_started = true;
        }

        for _ in 0..movement.tiles_per_tick() {
            if movement.is_complete() {
                break;
            }
            if movement.next_index == 1 {
                started.send(MoveStarted { entity });
                animation.0 = Animation::Walk;
            }
            *pos = movement.path[movement.next_index];
            movement.next_index += 1;
        }

        if movement.is_complete() {
            completed.send(MoveCompleted { entity });
            commands.entity(entity).remove::<MovementState>();
        }
    }
}

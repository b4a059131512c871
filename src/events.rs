//! Typed event channels flowing between the simulation's components.
//!
//! Events are `bevy_ecs` double-buffered channels registered once at world
//! construction. Tick-domain buffers are aged once per logic tick and
//! frame-domain buffers once per render frame, so a subscriber in either
//! callback always sees an event at least once.

use crate::components::GridPosition;
use bevy_ecs::prelude::*;

/// Request to move an entity to a target tile. Produced by the AI engine and
/// by external input; consumed by the movement coordinator. Intents that
/// fail to path are dropped, never retried.
#[derive(Event, Debug, Clone, Copy)]
pub struct MoveIntent {
    pub entity: Entity,
    pub target: GridPosition,
    pub run: bool,
}

/// Published on the first real step of an accepted path.
#[derive(Event, Debug, Clone, Copy)]
pub struct MoveStarted {
    pub entity: Entity,
}

/// Published on the tick the last tile of a path is reached.
#[derive(Event, Debug, Clone, Copy)]
pub struct MoveCompleted {
    pub entity: Entity,
}

/// One swing/shot/cast from attacker to victim.
#[derive(Event, Debug, Clone, Copy)]
pub struct AttackEvent {
    pub attacker: Entity,
    pub victim: Entity,
}

/// Damage resolved against an entity. `damage` of zero is a miss; it still
/// refreshes the victim's in-combat marker.
#[derive(Event, Debug, Clone, Copy)]
pub struct HurtEvent {
    pub entity: Entity,
    pub damage: i32,
    pub source: Option<Entity>,
}

/// Published exactly once when an entity's hitpoints reach zero. Doubles as
/// the cancellation signal clearing movement and interpolation state.
#[derive(Event, Debug, Clone, Copy)]
pub struct DeathEvent {
    pub entity: Entity,
}

/// Published exactly once when a visual tween reaches its path's endpoint.
#[derive(Event, Debug, Clone, Copy)]
pub struct InterpolationFinished {
    pub entity: Entity,
}

/// Register every event channel on a fresh world.
pub fn register_events(world: &mut World) {
    world.init_resource::<Events<MoveIntent>>();
    world.init_resource::<Events<MoveStarted>>();
    world.init_resource::<Events<MoveCompleted>>();
    world.init_resource::<Events<AttackEvent>>();
    world.init_resource::<Events<HurtEvent>>();
    world.init_resource::<Events<DeathEvent>>();
    world.init_resource::<Events<InterpolationFinished>>();
}

/// Age the tick-domain buffers. Called once at the end of every logic tick.
pub fn update_tick_events(world: &mut World) {
    world.resource_mut::<Events<MoveIntent>>().update();
    world.resource_mut::<Events<MoveStarted>>().update();
    world.resource_mut::<Events<MoveCompleted>>().update();
    world.resource_mut::<Events<AttackEvent>>().update();
    world.resource_mut::<Events<HurtEvent>>().update();
    world.resource_mut::<Events<DeathEvent>>().update();
}

/// Age the frame-domain buffers. Called once at the end of every frame.
pub fn update_frame_events(world: &mut World) {
    world.resource_mut::<Events<InterpolationFinished>>().update();
}

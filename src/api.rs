//! Public API for the simulation.
//!
//! This module provides the main interface for the render client (or any
//! other host) to interact with the simulation.
//!
//! ## Two Clock Domains
//!
//! The host drives the core through two callbacks that never overlap:
//! [`SimWorld::logic_tick`] at a fixed interval for AI decisions, logical
//! movement and combat, and [`SimWorld::frame`] once per render frame for
//! visual interpolation only. [`SimWorld::step`] is a convenience driver
//! that accumulates wall-clock time into fixed ticks and then runs the
//! frame, for hosts with a single update callback.
//!
//! All state lives in the `World` owned by this struct: caches, registries
//! and event channels are constructed here and torn down with it, so several
//! simulations can coexist in one process.

use crate::components::*;
use crate::config::{SimConfig, SimRng, SimTick};
use crate::error::SimError;
use crate::events::*;
use crate::path::{PathProvider, PathfinderHandle};
use crate::snapshot::{snapshot_rebuild_system, SnapshotCache};
use crate::systems::*;
use crate::world::ViewSnapshot;
use bevy_ecs::prelude::*;
use std::sync::Arc;

/// The main simulation world container.
///
/// Holds the ECS world and the tick/frame schedules, providing a clean API
/// for spawning units, issuing commands, stepping the simulation and
/// extracting render snapshots.
pub struct SimWorld {
    world: World,
    tick_schedule: Schedule,
    frame_schedule: Schedule,
    tick: u64,
    time: f32,
    /// Accumulated time for the fixed-timestep `step` driver.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a new empty simulation world.
    pub fn new() -> Self {
        Self::with_config(SimConfig::default())
    }

    /// Create a new simulation world with custom configuration.
    pub fn with_config(config: SimConfig) -> Self {
        let mut world = World::new();

        world.insert_resource(SimRng::from_seed(config.rng_seed));
        world.insert_resource(SimTick::default());
        world.init_resource::<SnapshotCache>();
        world.init_resource::<PathfinderHandle>();
        world.init_resource::<CameraTarget>();
        world.init_resource::<ControlledEntity>();
        world.init_resource::<FrameDelta>();
        register_events(&mut world);
        world.insert_resource(config);

        // Logic tick: snapshot first, then decisions, then their effects.
        // Chained, so every system sees its predecessors' writes.
        let mut tick_schedule = Schedule::default();
        tick_schedule.add_systems(
            (
                snapshot_rebuild_system,
                ai_init_system,
                combat_flag_system,
                ai_decision_system,
                movement_intent_system,
                movement_step_system,
                attack_resolve_system,
                hurt_apply_system,
                death_system,
                dying_system,
            )
                .chain(),
        );

        // Render frame: interpolation only.
        let mut frame_schedule = Schedule::default();
        frame_schedule.add_systems(interpolation_system);

        Self {
            world,
            tick_schedule,
            frame_schedule,
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
        }
    }

    // ------------------------------------------------------------------
    // Clock callbacks
    // ------------------------------------------------------------------

    /// Run exactly one logic tick. Hosts with a fixed-interval timer call
    /// this directly.
    pub fn logic_tick(&mut self) {
        let tick_interval = self.config().tick_interval;

        if let Some(mut tick_res) = self.world.get_resource_mut::<SimTick>() {
            tick_res.increment();
        }
        self.tick_schedule.run(&mut self.world);
        update_tick_events(&mut self.world);

        self.tick += 1;
        self.time += tick_interval;
    }

    /// Run one render frame with the given wall-clock delta.
    pub fn frame(&mut self, dt: f32) {
        self.world.resource_mut::<FrameDelta>().0 = dt;
        self.frame_schedule.run(&mut self.world);
        update_frame_events(&mut self.world);
    }

    /// Convenience driver: accumulate `dt` into fixed logic ticks, then run
    /// the frame. Deterministic regardless of the host's frame rate.
    pub fn step(&mut self, dt: f32) {
        let tick_interval = self.config().tick_interval;
        self.time_accumulator += dt;
        while self.time_accumulator >= tick_interval {
            self.logic_tick();
            self.time_accumulator -= tick_interval;
        }
        self.frame(dt);
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    // ------------------------------------------------------------------
    // Spawning
    // ------------------------------------------------------------------

    /// Spawn a plain unit (no AI) at the given tile.
    pub fn spawn_unit(&mut self, id: u32, faction: Faction, x: i32, y: i32, stats: Stats) -> Entity {
        let tile_size = self.config().tile_size;
        self.world
            .spawn(UnitBundle::new(id, faction, GridPosition::new(x, y), stats, tile_size))
            .id()
    }

    /// Spawn an AI-controlled unit at the given tile.
    pub fn spawn_npc(
        &mut self,
        id: u32,
        faction: Faction,
        x: i32,
        y: i32,
        stats: Stats,
        tuning: AiTuning,
    ) -> Entity {
        let tile_size = self.config().tile_size;
        self.world
            .spawn((
                UnitBundle::new(id, faction, GridPosition::new(x, y), stats, tile_size),
                AiBundle {
                    brain: Brain::default(),
                    tuning,
                },
            ))
            .id()
    }

    /// Spawn the player entity and arm it as camera target and controlled
    /// entity.
    pub fn spawn_player(&mut self, id: u32, x: i32, y: i32, stats: Stats) -> Entity {
        let tile_size = self.config().tile_size;
        let faction = Faction::new("player", Alignment::Good);
        let entity = self
            .world
            .spawn((
                UnitBundle::new(id, faction, GridPosition::new(x, y), stats, tile_size),
                Player,
            ))
            .id();
        self.world.resource_mut::<CameraTarget>().0 = Some(entity);
        self.world.resource_mut::<ControlledEntity>().0 = Some(entity);
        entity
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Queue a movement intent for a unit. The intent is resolved on the
    /// next logic tick and silently dropped if no path exists.
    pub fn command_move(&mut self, unit: u32, x: i32, y: i32, run: bool) -> Result<(), SimError> {
        let entity = self.find_unit(unit).ok_or(SimError::UnknownUnit(unit))?;
        self.world.send_event(MoveIntent {
            entity,
            target: GridPosition::new(x, y),
            run,
        });
        Ok(())
    }

    /// Queue an attack from one unit against another, as external input
    /// (e.g. a player click) would.
    pub fn command_attack(&mut self, attacker: u32, victim: u32) -> Result<(), SimError> {
        let attacker = self
            .find_unit(attacker)
            .ok_or(SimError::UnknownUnit(attacker))?;
        let victim = self.find_unit(victim).ok_or(SimError::UnknownUnit(victim))?;
        self.world.send_event(AttackEvent { attacker, victim });
        Ok(())
    }

    /// Explicitly stop a unit's movement: the visual position snaps to the
    /// active path's final endpoint and both movement and interpolation
    /// state are discarded.
    pub fn command_stop(&mut self, unit: u32) -> Result<(), SimError> {
        let entity = self.find_unit(unit).ok_or(SimError::UnknownUnit(unit))?;

        let end = self
            .world
            .get::<InterpolationState>(entity)
            .map(|interpolation| interpolation.end_point());
        if let Some((x, y)) = end {
            if let Some(mut visual) = self.world.get_mut::<VisualPosition>(entity) {
                visual.x = x;
                visual.y = y;
            }
        }

        let mut entity_mut = self.world.entity_mut(entity);
        entity_mut.remove::<MovementState>();
        entity_mut.remove::<InterpolationState>();
        Ok(())
    }

    /// Replace the injected path provider.
    pub fn set_path_provider(&mut self, provider: Arc<dyn PathProvider>) {
        self.world.insert_resource(PathfinderHandle(provider));
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Current interpolated world position of a unit, for camera-follow and
    /// debugging.
    pub fn visual_position(&mut self, unit: u32) -> Option<(f32, f32)> {
        let entity = self.find_unit(unit)?;
        self.world
            .get::<VisualPosition>(entity)
            .map(|visual| (visual.x, visual.y))
    }

    /// World position the camera should follow, if any.
    pub fn camera_focus(&mut self) -> Option<(f32, f32)> {
        let target = self.world.resource::<CameraTarget>().0?;
        self.world
            .get::<VisualPosition>(target)
            .map(|visual| (visual.x, visual.y))
    }

    /// Whether a unit was hurt recently enough for its health display.
    pub fn in_combat(&mut self, unit: u32) -> Result<bool, SimError> {
        let entity = self.find_unit(unit).ok_or(SimError::UnknownUnit(unit))?;
        Ok(self.world.get::<RecentCombat>(entity).is_some())
    }

    /// Get a render snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> ViewSnapshot {
        ViewSnapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn config(&self) -> SimConfig {
        self.world.resource::<SimConfig>().clone()
    }

    fn find_unit(&mut self, unit: u32) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &UnitId)>();
        query
            .iter(&self.world)
            .find(|(_, id)| id.0 == unit)
            .map(|(entity, _)| entity)
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

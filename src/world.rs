//! Render-facing view of the simulation state.
//!
//! The `ViewSnapshot` struct provides a serializable picture of every unit
//! that the external render client consumes once per frame: logical tile,
//! interpolated world position, facing, active animation and health. The
//! core owns no wire format beyond this plain JSON.

use crate::components::*;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of a single unit's render-relevant state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub tile_x: i32,
    pub tile_y: i32,
    /// Interpolated world position.
    pub x: f32,
    pub y: f32,
    pub facing: String,
    pub animation: String,
    pub hitpoints: i32,
    pub max_hitpoints: i32,
    pub faction: String,
    pub is_player: bool,
    /// Set while the unit's "recently in combat" marker is alive; the
    /// health-display overlay keys off it.
    pub in_combat: bool,
}

/// Complete per-frame view for the render client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewSnapshot {
    /// Current logic tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// All units.
    pub units: Vec<UnitSnapshot>,
}

impl ViewSnapshot {
    /// Build the view from the ECS world.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let mut units = Vec::new();

        let mut query = world.query::<(
            &UnitId,
            &GridPosition,
            &VisualPosition,
            &Facing,
            &AnimationState,
            &Stats,
            &Faction,
            Option<&Player>,
            Option<&RecentCombat>,
        )>();

        for (id, tile, visual, facing, animation, stats, faction, player, combat) in
            query.iter(world)
        {
            let facing_str = match facing.0 {
                Direction::North => "North",
                Direction::South => "South",
                Direction::East => "East",
                Direction::West => "West",
            };

            let animation_str = match animation.0 {
                Animation::Idle => "Idle".to_string(),
                Animation::Walk => "Walk".to_string(),
                Animation::Attack(dir) => format!("Attack({:?})", dir),
                Animation::Death => "Death".to_string(),
            };

            units.push(UnitSnapshot {
                id: id.0,
                tile_x: tile.x,
                tile_y: tile.y,
                x: visual.x,
                y: visual.y,
                facing: facing_str.to_string(),
                animation: animation_str,
                hitpoints: stats.hitpoints,
                max_hitpoints: stats.max_hitpoints,
                faction: faction.name.clone(),
                is_player: player.is_some(),
                in_combat: combat.is_some(),
            });
        }

        Self { tick, time, units }
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

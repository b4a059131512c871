//! Simulation configuration and shared clock/RNG resources.

use bevy_ecs::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Tuning knobs for a simulation world. Injected once at construction.
#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    /// Fixed logic-tick interval in seconds. Walking covers one tile per
    /// tick; the visual tween spends this long per tile.
    pub tick_interval: f32,
    /// World units per tile edge.
    pub tile_size: f32,
    /// Seconds a death animation plays before respawn/despawn.
    pub death_animation_secs: f32,
    /// Seconds the "recently in combat" marker survives after a hurt event.
    pub combat_flag_secs: f32,
    /// Seed for the single simulation RNG. Same seed, same run.
    pub rng_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_interval: 0.3,
            tile_size: 16.0,
            death_animation_secs: 0.9,
            combat_flag_secs: 5.0,
            rng_seed: 0,
        }
    }
}

/// Global logic-tick counter. Increments once per fixed update.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// The one seeded generator behind every random draw in the simulation.
/// Injecting it as a resource keeps AI and combat sequences reproducible.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub ChaCha8Rng);

impl SimRng {
    pub fn from_seed(seed: u64) -> Self {
        use rand::SeedableRng;
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

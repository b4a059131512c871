//! Emberfield - Simulation Core
//!
//! The gameplay-logic core of a tile-based real-time game, built as a
//! deterministic fixed-timestep ECS on `bevy_ecs`. It decides what
//! AI-controlled entities do, moves entities across the grid with decoupled
//! logical and visual timing, and resolves combat. Rendering, persistence
//! and input are external collaborators: they drive the two clock callbacks,
//! consume the JSON view snapshot and inject a pathfinder.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod events;
pub mod path;
pub mod snapshot;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::{SimConfig, SimRng, SimTick};
pub use error::SimError;
pub use events::*;
pub use path::{GridPathfinder, PathProvider, PathfinderHandle};
pub use snapshot::{EntitySnapshot, SnapshotCache};
pub use systems::*;
pub use world::{UnitSnapshot, ViewSnapshot};

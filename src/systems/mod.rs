//! ECS Systems for the Emberfield simulation.
//!
//! Systems contain the game logic that operates on components. Two callback
//! domains drive them, and they never overlap:
//!
//! **Logic tick** (fixed interval, chained in order):
//! - `snapshot_rebuild_system` - Rebuilds the per-tick entity snapshot
//! - `ai_init_system` - Disables AI on misconfigured entities
//! - `combat_flag_system` - Expires "recently in combat" markers
//! - `ai_decision_system` - Runs each AI state machine
//! - `movement_intent_system` - Paths accepted movement intents
//! - `movement_step_system` - Teleports logical positions along paths
//! - `attack_resolve_system` - Rolls hit chance and damage
//! - `hurt_apply_system` - Applies damage, emits deaths
//! - `death_system` - Cancels movement/AI state for the dead
//! - `dying_system` - Respawns players, despawns everything else
//!
//! **Render frame** (variable rate):
//! - `interpolation_system` - Tweens visual positions along queued paths

pub mod ai;
pub mod combat;
pub mod interpolation;
pub mod movement;

pub use ai::*;
pub use combat::*;
pub use interpolation::*;
pub use movement::*;

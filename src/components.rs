//! ECS Components for the Emberfield simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that query these components.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Logical tile coordinate on the movement grid.
///
/// This is the source of truth for game logic. It is teleported forward by
/// the movement coordinator once per logic tick; the on-screen position is
/// tracked separately in [`VisualPosition`].
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: i32,
    pub y: i32,
}

impl GridPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared tile distance. All range checks in the AI use squared values.
    pub fn distance_sq(&self, other: &GridPosition) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// The four cardinal neighbors.
    pub fn neighbors(&self) -> [GridPosition; 4] {
        [
            GridPosition::new(self.x + 1, self.y),
            GridPosition::new(self.x - 1, self.y),
            GridPosition::new(self.x, self.y + 1),
            GridPosition::new(self.x, self.y - 1),
        ]
    }

    pub fn manhattan(&self, other: &GridPosition) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// World-coordinate center of this tile.
    pub fn world_center(&self, tile_size: f32) -> (f32, f32) {
        (
            (self.x as f32 + 0.5) * tile_size,
            (self.y as f32 + 0.5) * tile_size,
        )
    }
}

/// World-coordinate position used for rendering.
///
/// Written by the frame-driven interpolator while a path is being tweened,
/// and teleported on spawn/respawn. Never read by game logic.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct VisualPosition {
    pub x: f32,
    pub y: f32,
}

impl VisualPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn at_tile(tile: GridPosition, tile_size: f32) -> Self {
        let (x, y) = tile.world_center(tile_size);
        Self { x, y }
    }
}

/// Tile the entity spawned at. Wander and leash ranges are measured from it,
/// and players respawn on it.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Origin(pub GridPosition);

/// Cardinal facing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Facing derived from a movement delta. The x axis wins ties.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Direction> {
        if dx > 0 {
            Some(Direction::East)
        } else if dx < 0 {
            Some(Direction::West)
        } else if dy > 0 {
            Some(Direction::South)
        } else if dy < 0 {
            Some(Direction::North)
        } else {
            None
        }
    }
}

#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Facing(pub Direction);

impl Default for Facing {
    fn default() -> Self {
        Self(Direction::South)
    }
}

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Stable public identifier for a unit, used by external commands.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Marker for the player-controlled entity.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Player;

/// Broad moral alignment of a faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Good,
    Neutral,
    Bad,
}

impl Default for Alignment {
    fn default() -> Self {
        Self::Neutral
    }
}

/// Faction tag determining who this entity will treat as a target.
///
/// Hostility is always evaluated from the acting entity's own settings: the
/// candidate's flags are irrelevant, only its alignment, name and player
/// status are looked at.
#[derive(Component, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Faction {
    pub name: String,
    pub alignment: Alignment,
    pub hostile_to_player: bool,
    pub hostile_to_good: bool,
    pub hostile_to_neutral: bool,
    pub hostile_to_bad: bool,
    /// Extra faction names this faction attacks on sight.
    pub hostile_factions: Vec<String>,
}

impl Faction {
    pub fn new(name: impl Into<String>, alignment: Alignment) -> Self {
        Self {
            name: name.into(),
            alignment,
            ..Default::default()
        }
    }

    /// Parse a comma-separated custom hostile list, as stored in prefab data.
    pub fn parse_hostile_list(csv: &str) -> Vec<String> {
        csv.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Whether this faction treats `other` as an attack target.
    pub fn is_hostile_to(&self, other: &Faction, other_is_player: bool) -> bool {
        if other_is_player && self.hostile_to_player {
            return true;
        }
        let alignment_hostile = match other.alignment {
            Alignment::Good => self.hostile_to_good,
            Alignment::Neutral => self.hostile_to_neutral,
            Alignment::Bad => self.hostile_to_bad,
        };
        alignment_hostile || self.hostile_factions.iter().any(|n| n == &other.name)
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Damage style of an attack, selecting the matching defence on the victim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackType {
    Stab,
    Slash,
    Crush,
    Ranged,
    Magic,
}

impl Default for AttackType {
    fn default() -> Self {
        Self::Stab
    }
}

impl AttackType {
    /// Parse from prefab data. Unknown strings fall back to `Stab`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "stab" => AttackType::Stab,
            "slash" => AttackType::Slash,
            "crush" => AttackType::Crush,
            "ranged" => AttackType::Ranged,
            "magic" => AttackType::Magic,
            _ => AttackType::Stab,
        }
    }
}

/// Per-style defence values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Defences {
    pub stab: i32,
    pub slash: i32,
    pub crush: i32,
    pub ranged: i32,
    pub magic: i32,
}

impl Defences {
    pub fn uniform(value: i32) -> Self {
        Self {
            stab: value,
            slash: value,
            crush: value,
            ranged: value,
            magic: value,
        }
    }

    pub fn against(&self, attack_type: AttackType) -> i32 {
        match attack_type {
            AttackType::Stab => self.stab,
            AttackType::Slash => self.slash,
            AttackType::Crush => self.crush,
            AttackType::Ranged => self.ranged,
            AttackType::Magic => self.magic,
        }
    }
}

/// Combat statistics for a unit.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Stats {
    pub hitpoints: i32,
    pub max_hitpoints: i32,
    pub accuracy: i32,
    pub strength: f32,
    pub attack_type: AttackType,
    pub defences: Defences,
    /// Attack reach in tiles. Range checks compare squared distances, so a
    /// reach of 1 does not cover diagonals.
    pub attack_range: i32,
    /// Seconds between attacks.
    pub attack_speed: f32,
}

impl Stats {
    pub fn new(max_hitpoints: i32) -> Self {
        Self {
            hitpoints: max_hitpoints,
            max_hitpoints,
            ..Default::default()
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hitpoints > 0
    }

    /// Apply damage, clamping hitpoints to `[0, max]`. Returns true if this
    /// application brought the entity from alive to dead.
    pub fn apply_damage(&mut self, damage: i32) -> bool {
        let was_alive = self.is_alive();
        self.hitpoints = (self.hitpoints - damage.max(0)).max(0);
        was_alive && self.hitpoints == 0
    }

    pub fn heal_full(&mut self) {
        self.hitpoints = self.max_hitpoints;
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            hitpoints: 10,
            max_hitpoints: 10,
            accuracy: 5,
            strength: 4.0,
            attack_type: AttackType::Stab,
            defences: Defences::uniform(3),
            attack_range: 1,
            attack_speed: 1.8,
        }
    }
}

/// Death-animation countdown. While present the entity is out of the
/// simulation (no snapshot entry, no AI, no movement); at zero, players
/// respawn and everything else is despawned.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Dying {
    pub remaining: f32,
}

/// "Recently in combat" marker kept alive by hurt events. Health-display
/// collaborators read it; it expires after a fixed duration.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecentCombat {
    pub remaining: f32,
}

// ============================================================================
// AI COMPONENTS
// ============================================================================

/// Finite-state-machine state for an AI entity. `Dead` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiState {
    Idle,
    Wander,
    Chase,
    Attack,
    Return,
    Dead,
}

impl Default for AiState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Per-entity AI state machine. Created on spawn, mutated only by that
/// entity's own update, destroyed with the entity.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Brain {
    pub state: AiState,
    /// Seconds accumulated toward the next attack while in `Attack`.
    pub attack_timer: f32,
}

/// Behavior tuning for an AI entity. Ranges are in tiles.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AiTuning {
    /// Radius within which hostiles are perceived.
    pub awareness_range: i32,
    /// Leash radius from origin before the entity is forced to return.
    pub chase_range: i32,
    /// Per-tick probability of starting a wander while idle.
    pub wander_chance: f64,
    /// Wander destinations are drawn within this radius of origin.
    pub wander_radius: i32,
}

impl Default for AiTuning {
    fn default() -> Self {
        Self {
            awareness_range: 6,
            chase_range: 10,
            wander_chance: 0.05,
            wander_radius: 3,
        }
    }
}

// ============================================================================
// MOVEMENT / INTERPOLATION COMPONENTS
// ============================================================================

/// Active path being walked. Exists only while the entity is moving; the
/// movement coordinator removes it when the last tile is reached.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct MovementState {
    /// Tile sequence from the pathfinder, start tile included. Always >= 2.
    pub path: Vec<GridPosition>,
    pub run: bool,
    /// Index of the next tile to teleport onto.
    pub next_index: usize,
    /// Seconds the visual tween spends per tile.
    pub tile_duration: f32,
    /// Set once the interpolation run for this path has been handed off.
    pub interpolation_started: bool,
}

impl MovementState {
    pub fn new(path: Vec<GridPosition>, run: bool, tick_interval: f32) -> Self {
        let tile_duration = tick_interval * if run { 0.5 } else { 1.0 };
        Self {
            path,
            run,
            next_index: 1,
            tile_duration,
            interpolation_started: false,
        }
    }

    /// Tiles advanced per logic tick.
    pub fn tiles_per_tick(&self) -> usize {
        if self.run {
            2
        } else {
            1
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_index >= self.path.len()
    }
}

/// Render-facing animation cue. The external renderer maps these onto its
/// own clips; the core only decides which one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Animation {
    Idle,
    Walk,
    Attack(Direction),
    Death,
}

#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnimationState(pub Animation);

impl Default for AnimationState {
    fn default() -> Self {
        Self(Animation::Idle)
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete simulated unit.
#[derive(Bundle, Default)]
pub struct UnitBundle {
    pub unit_id: UnitId,
    pub faction: Faction,
    pub position: GridPosition,
    pub visual: VisualPosition,
    pub origin: Origin,
    pub facing: Facing,
    pub stats: Stats,
    pub animation: AnimationState,
}

impl UnitBundle {
    pub fn new(id: u32, faction: Faction, tile: GridPosition, stats: Stats, tile_size: f32) -> Self {
        Self {
            unit_id: UnitId(id),
            faction,
            position: tile,
            visual: VisualPosition::at_tile(tile, tile_size),
            origin: Origin(tile),
            facing: Facing::default(),
            stats,
            animation: AnimationState::default(),
        }
    }
}

/// AI components to add on top of a [`UnitBundle`].
#[derive(Bundle, Default)]
pub struct AiBundle {
    pub brain: Brain,
    pub tuning: AiTuning,
}

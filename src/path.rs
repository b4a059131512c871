//! Tile pathfinding contract.
//!
//! The core does not own pathfinding: it consumes a [`PathProvider`] behind
//! a resource handle, asking for an ordered tile sequence under a
//! node-expansion budget. [`GridPathfinder`] is the default provider, an A*
//! adapter over a static set of blocked tiles; hosts with their own
//! navigation data inject a different provider at construction.

use crate::components::GridPosition;
use bevy_ecs::prelude::*;
use pathfinding::prelude::astar;
use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

/// Node budget for a walking move request.
pub const WALK_NODE_BUDGET: u32 = 512;
/// Node budget for a running move request. Runs cover longer paths, so the
/// coordinator grants a larger search.
pub const RUN_NODE_BUDGET: u32 = 1024;

/// External pathfinder contract: ordered tile sequence from start to goal
/// (start included), or `None` when no path exists within the budget.
pub trait PathProvider: Send + Sync {
    fn find_path(
        &self,
        start: GridPosition,
        goal: GridPosition,
        node_budget: u32,
    ) -> Option<Vec<GridPosition>>;
}

/// Resource handle to the injected path provider.
#[derive(Resource, Clone)]
pub struct PathfinderHandle(pub Arc<dyn PathProvider>);

impl Default for PathfinderHandle {
    fn default() -> Self {
        Self(Arc::new(GridPathfinder::open()))
    }
}

impl PathfinderHandle {
    pub fn find_path(
        &self,
        start: GridPosition,
        goal: GridPosition,
        node_budget: u32,
    ) -> Option<Vec<GridPosition>> {
        self.0.find_path(start, goal, node_budget)
    }
}

/// A* pathfinder over a 4-connected grid with a static blocked-tile set.
#[derive(Debug, Clone, Default)]
pub struct GridPathfinder {
    blocked: HashSet<GridPosition>,
}

impl GridPathfinder {
    /// A pathfinder where every tile is walkable.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn with_blocked(blocked: impl IntoIterator<Item = GridPosition>) -> Self {
        Self {
            blocked: blocked.into_iter().collect(),
        }
    }

    fn walkable(&self, tile: GridPosition) -> bool {
        !self.blocked.contains(&tile)
    }
}

impl PathProvider for GridPathfinder {
    fn find_path(
        &self,
        start: GridPosition,
        goal: GridPosition,
        node_budget: u32,
    ) -> Option<Vec<GridPosition>> {
        if start == goal || !self.walkable(goal) {
            return None;
        }

        // Once the budget is spent, nodes stop yielding successors and the
        // search runs dry, turning budget exhaustion into a no-path result.
        let expanded = Cell::new(0u32);
        let result = astar(
            &start,
            |tile| {
                if expanded.get() >= node_budget {
                    return Vec::new();
                }
                expanded.set(expanded.get() + 1);
                tile.neighbors()
                    .into_iter()
                    .filter(|n| self.walkable(*n))
                    .map(|n| (n, 1u32))
                    .collect::<Vec<_>>()
            },
            |tile| tile.manhattan(&goal),
            |tile| *tile == goal,
        );

        result.map(|(path, _cost)| path)
    }
}

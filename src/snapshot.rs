//! Per-tick entity snapshot cache.
//!
//! Rebuilt wholesale at the start of every logic tick so that every AI
//! decision made within the tick reads one consistent view of who is where.
//! Positions are refreshed each tick; faction/stats are read from storage
//! once per entity and kept until a death event evicts them, with hurt
//! application patching the cached hitpoints in between.

use crate::components::{Dying, Faction, GridPosition, Player, Stats};
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// Faction/stats profile cached across ticks.
#[derive(Debug, Clone)]
struct Profile {
    faction: Faction,
    stats: Stats,
    is_player: bool,
}

/// Read-only view of one entity for the current tick.
#[derive(Debug, Clone, Copy)]
pub struct EntitySnapshot<'a> {
    pub entity: Entity,
    pub pos: GridPosition,
    pub faction: &'a Faction,
    pub stats: &'a Stats,
    pub is_player: bool,
}

/// The snapshot cache resource. Owned by the simulation world, never shared
/// across worlds.
#[derive(Resource, Debug, Default)]
pub struct SnapshotCache {
    profiles: HashMap<Entity, Profile>,
    entries: Vec<(Entity, GridPosition)>,
}

impl SnapshotCache {
    /// Iterate this tick's snapshots.
    pub fn iter(&self) -> impl Iterator<Item = EntitySnapshot<'_>> {
        self.entries.iter().filter_map(|(entity, pos)| {
            self.profiles.get(entity).map(|profile| EntitySnapshot {
                entity: *entity,
                pos: *pos,
                faction: &profile.faction,
                stats: &profile.stats,
                is_player: profile.is_player,
            })
        })
    }

    /// Current tile of an entity, as of this tick's rebuild.
    pub fn position_of(&self, entity: Entity) -> Option<GridPosition> {
        self.entries
            .iter()
            .find(|(e, _)| *e == entity)
            .map(|(_, pos)| *pos)
    }

    /// Whether any snapshotted entity stands on `tile`.
    pub fn is_occupied(&self, tile: GridPosition) -> bool {
        self.entries.iter().any(|(_, pos)| *pos == tile)
    }

    /// Patch the cached hitpoints after a hurt event so the cache stays
    /// consistent between full entity reads.
    pub fn apply_damage(&mut self, entity: Entity, damage: i32) {
        if let Some(profile) = self.profiles.get_mut(&entity) {
            profile.stats.apply_damage(damage);
        }
    }

    /// Drop an entity from the cache entirely. Death events call this; the
    /// entity's profile will be re-read from storage if it ever comes back.
    pub fn evict(&mut self, entity: Entity) {
        self.profiles.remove(&entity);
        self.entries.retain(|(e, _)| *e != entity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn cached_hitpoints(&self, entity: Entity) -> Option<i32> {
        self.profiles.get(&entity).map(|p| p.stats.hitpoints)
    }
}

/// Rebuilds the snapshot at the start of every logic tick. Entities playing
/// a death animation are excluded; everyone else with a grid position is in.
pub fn snapshot_rebuild_system(
    mut cache: ResMut<SnapshotCache>,
    query: Query<(Entity, &GridPosition, &Faction, &Stats, Option<&Player>), Without<Dying>>,
) {
    let cache = &mut *cache;
    cache.entries.clear();
    for (entity, pos, faction, stats, player) in query.iter() {
        cache.profiles.entry(entity).or_insert_with(|| Profile {
            faction: faction.clone(),
            stats: *stats,
            is_player: player.is_some(),
        });
        cache.entries.push((entity, *pos));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Alignment, UnitId};

    fn test_world() -> (World, Schedule) {
        let mut world = World::new();
        world.init_resource::<SnapshotCache>();
        let mut schedule = Schedule::default();
        schedule.add_systems(snapshot_rebuild_system);
        (world, schedule)
    }

    #[test]
    fn test_rebuild_tracks_positions_per_tick() {
        let (mut world, mut schedule) = test_world();
        let e = world
            .spawn((
                UnitId(1),
                GridPosition::new(2, 2),
                Faction::new("goblins", Alignment::Bad),
                Stats::new(10),
            ))
            .id();

        schedule.run(&mut world);
        let cache = world.resource::<SnapshotCache>();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.position_of(e), Some(GridPosition::new(2, 2)));
        assert!(cache.is_occupied(GridPosition::new(2, 2)));

        *world.get_mut::<GridPosition>(e).unwrap() = GridPosition::new(3, 2);
        schedule.run(&mut world);
        let cache = world.resource::<SnapshotCache>();
        assert_eq!(cache.position_of(e), Some(GridPosition::new(3, 2)));
        assert!(!cache.is_occupied(GridPosition::new(2, 2)));
    }

    #[test]
    fn test_profile_cached_until_evicted() {
        let (mut world, mut schedule) = test_world();
        let e = world
            .spawn((
                GridPosition::new(0, 0),
                Faction::new("goblins", Alignment::Bad),
                Stats::new(10),
            ))
            .id();

        schedule.run(&mut world);
        // Storage changes after the first read are not picked up...
        world.get_mut::<Stats>(e).unwrap().accuracy = 99;
        schedule.run(&mut world);
        let cache = world.resource::<SnapshotCache>();
        let snap = cache.iter().next().unwrap();
        assert_eq!(snap.stats.accuracy, Stats::default().accuracy);

        // ...but damage patches the cached copy directly.
        world.resource_mut::<SnapshotCache>().apply_damage(e, 4);
        let cache = world.resource::<SnapshotCache>();
        assert_eq!(cache.cached_hitpoints(e), Some(6));

        // Eviction forces a fresh read on the next rebuild.
        world.resource_mut::<SnapshotCache>().evict(e);
        schedule.run(&mut world);
        let cache = world.resource::<SnapshotCache>();
        assert_eq!(cache.iter().next().unwrap().stats.accuracy, 99);
    }

    #[test]
    fn test_dying_entities_are_excluded() {
        let (mut world, mut schedule) = test_world();
        world.spawn((
            GridPosition::new(0, 0),
            Faction::default(),
            Stats::new(5),
            Dying { remaining: 0.5 },
        ));
        schedule.run(&mut world);
        assert!(world.resource::<SnapshotCache>().is_empty());
    }
}

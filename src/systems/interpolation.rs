//! Visual interpolator.
//!
//! Runs every render frame, never on the logic tick. While an entity walks a
//! path its logical position teleports tile-by-tile, and this module tweens
//! the on-screen position smoothly across the entire queued path using the
//! frame callback's elapsed time.

use crate::components::{Animation, AnimationState, GridPosition, VisualPosition};
use crate::events::InterpolationFinished;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Elapsed wall-clock seconds of the current render frame. Written by the
/// frame callback before the frame schedule runs.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct FrameDelta(pub f32);

/// Active visual tween across a whole path. Created by the movement
/// coordinator on a path's first tick, destroyed on completion or explicit
/// stop.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationState {
    /// World-coordinate segments, one per tile step.
    segments: Vec<((f32, f32), (f32, f32))>,
    /// Wall-clock seconds accumulated so far.
    pub elapsed: f32,
    /// Seconds the full path takes.
    pub total: f32,
}

impl InterpolationState {
    /// Build the tween for a tile path (length >= 2), spending
    /// `tile_duration` seconds per segment.
    pub fn from_tile_path(path: &[GridPosition], tile_size: f32, tile_duration: f32) -> Self {
        debug_assert!(path.len() >= 2);
        let segments = path
            .windows(2)
            .map(|pair| {
                (
                    pair[0].world_center(tile_size),
                    pair[1].world_center(tile_size),
                )
            })
            .collect::<Vec<_>>();
        let total = tile_duration * segments.len() as f32;
        Self {
            segments,
            elapsed: 0.0,
            total,
        }
    }

    /// World position at `elapsed` seconds into the tween. Global progress
    /// maps into a segment index and a local fraction, so the sampled
    /// position depends only on elapsed time and segment count.
    pub fn sample(&self, elapsed: f32) -> (f32, f32) {
        let progress = (elapsed / self.total).clamp(0.0, 1.0);
        if progress >= 1.0 {
            return self.end_point();
        }
        let scaled = progress * self.segments.len() as f32;
        let index = (scaled.floor() as usize).min(self.segments.len() - 1);
        let t = scaled - index as f32;
        let (from, to) = self.segments[index];
        (from.0 + (to.0 - from.0) * t, from.1 + (to.1 - from.1) * t)
    }

    /// The path's final tile's world center.
    pub fn end_point(&self) -> (f32, f32) {
        self.segments.last().map(|(_, to)| *to).unwrap_or_default()
    }
}

/// Advances every active tween by the frame delta and writes the resulting
/// world position. On reaching the total duration: snap to the endpoint,
/// publish exactly one completion event, retire the state.
pub fn interpolation_system(
    dt: Res<FrameDelta>,
    mut finished: EventWriter<InterpolationFinished>,
    mut query: Query<(
        Entity,
        &mut InterpolationState,
        &mut VisualPosition,
        &mut AnimationState,
    )>,
    mut commands: Commands,
) {
    for (entity, mut interpolation, mut visual, mut animation) in query.iter_mut() {
        interpolation.elapsed += dt.0;

        if interpolation.elapsed >= interpolation.total {
            let (x, y) = interpolation.end_point();
            visual.x = x;
            visual.y = y;
            if animation.0 == Animation::Walk {
                animation.0 = Animation::Idle;
            }
            finished.send(InterpolationFinished { entity });
            commands.entity(entity).remove::<InterpolationState>();
        } else {
            let elapsed = interpolation.elapsed;
            let (x, y) = interpolation.sample(elapsed);
            visual.x = x;
            visual.y = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::register_events;

    fn three_segment_state() -> InterpolationState {
        let path = [
            GridPosition::new(0, 0),
            GridPosition::new(1, 0),
            GridPosition::new(2, 0),
            GridPosition::new(3, 0),
        ];
        // tile_size 1.0 puts tile centers at x + 0.5.
        InterpolationState::from_tile_path(&path, 1.0, 1.0)
    }

    #[test]
    fn test_half_duration_lands_mid_second_segment() {
        let state = three_segment_state();
        assert!((state.total - 3.0).abs() < 1e-6);

        // progress 0.5 * 3 segments = 1.5: second segment, local t = 0.5.
        let (x, y) = state.sample(state.total / 2.0);
        assert!((x - 2.0).abs() < 1e-5);
        assert!((y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_sample_is_deterministic_in_elapsed_time() {
        let state = three_segment_state();
        let a = state.sample(1.2);
        let b = state.sample(1.2);
        assert_eq!(a, b);
        // Segment boundaries map exactly onto tile centers.
        let (x, _) = state.sample(1.0);
        assert!((x - 1.5).abs() < 1e-5);
    }

    fn test_world() -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(FrameDelta(0.0));
        register_events(&mut world);
        let mut schedule = Schedule::default();
        schedule.add_systems(interpolation_system);
        (world, schedule)
    }

    #[test]
    fn test_completion_fires_exactly_once_and_snaps() {
        let (mut world, mut schedule) = test_world();
        let mover = world
            .spawn((
                three_segment_state(),
                VisualPosition::new(0.5, 0.5),
                AnimationState(Animation::Walk),
            ))
            .id();

        // Frames far past the total duration, several times over.
        world.resource_mut::<FrameDelta>().0 = 2.0;
        for _ in 0..5 {
            schedule.run(&mut world);
        }

        assert_eq!(world.resource::<Events<InterpolationFinished>>().len(), 1);
        let visual = world.get::<VisualPosition>(mover).unwrap();
        assert!((visual.x - 3.5).abs() < 1e-5);
        assert!((visual.y - 0.5).abs() < 1e-5);
        assert!(world.get::<InterpolationState>(mover).is_none());
        assert_eq!(world.get::<AnimationState>(mover).unwrap().0, Animation::Idle);
    }

    #[test]
    fn test_frames_write_visual_position_along_path() {
        let (mut world, mut schedule) = test_world();
        let mover = world
            .spawn((
                three_segment_state(),
                VisualPosition::new(0.5, 0.5),
                AnimationState(Animation::Walk),
            ))
            .id();

        // Uneven frame deltas accumulate to 1.5s = midpoint of the path.
        for dt in [0.4, 0.7, 0.4] {
            world.resource_mut::<FrameDelta>().0 = dt;
            schedule.run(&mut world);
        }

        let visual = world.get::<VisualPosition>(mover).unwrap();
        assert!((visual.x - 2.0).abs() < 1e-5);
        assert_eq!(world.resource::<Events<InterpolationFinished>>().len(), 0);
    }
}

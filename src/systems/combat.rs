//! Combat resolver.
//!
//! Consumes attack events, rolls hit chance and damage, applies hurt events
//! to storage and the snapshot cache, and owns the death/respawn pipeline.
//! All randomness goes through the injected simulation RNG.

use crate::components::*;
use crate::config::{SimConfig, SimRng};
use crate::events::{AttackEvent, DeathEvent, HurtEvent};
use crate::snapshot::SnapshotCache;
use crate::systems::interpolation::InterpolationState;
use bevy_ecs::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Entity the external camera follows. Cleared while its target is dead,
/// re-armed on respawn.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct CameraTarget(pub Option<Entity>);

/// Entity external input controls. Same lifecycle as [`CameraTarget`].
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct ControlledEntity(pub Option<Entity>);

// ============================================================================
// HIT RESOLUTION
// ============================================================================

/// Chance for an attack with `accuracy` to land against `defence`.
pub fn hit_chance(accuracy: i32, defence: i32) -> f64 {
    let acc = accuracy as f64;
    let def = defence as f64;
    if acc > def {
        1.0 - (def + 2.0) / (2.0 * acc + 1.0)
    } else {
        acc / (2.0 * def + 1.0)
    }
}

/// Largest damage a hit with `strength` can deal.
pub fn max_hit(strength: f32) -> i32 {
    (0.5 + strength).floor() as i32
}

/// Roll one attack: zero damage on a miss, otherwise uniform in
/// `[0, max_hit]`.
pub fn roll_damage(rng: &mut ChaCha8Rng, accuracy: i32, defence: i32, strength: f32) -> i32 {
    if rng.gen::<f64>() < hit_chance(accuracy, defence) {
        rng.gen_range(0..=max_hit(strength))
    } else {
        0
    }
}

/// Resolves attack events into hurt events.
///
/// Sets the attacker's directional attack animation from the relative grid
/// position, selects the victim's defence by the attacker's attack type and
/// rolls damage. Attacks with a missing or already-dead participant are
/// ignored.
pub fn attack_resolve_system(
    mut attacks: EventReader<AttackEvent>,
    mut rng: ResMut<SimRng>,
    mut hurts: EventWriter<HurtEvent>,
    mut query: Query<(&GridPosition, &Stats, &mut AnimationState, &mut Facing)>,
) {
    for attack in attacks.read() {
        let Ok(
            [(attacker_pos, attacker_stats, mut attacker_anim, mut attacker_facing), (victim_pos, victim_stats, _, _)],
        ) = query.get_many_mut([attack.attacker, attack.victim])
        else {
            debug!(?attack, "attack ignored: participant not found");
            continue;
        };
        if !victim_stats.is_alive() {
            continue;
        }

        let direction = Direction::from_delta(
            victim_pos.x - attacker_pos.x,
            victim_pos.y - attacker_pos.y,
        )
        .unwrap_or(attacker_facing.0);
        attacker_facing.0 = direction;
        attacker_anim.0 = Animation::Attack(direction);

        let defence = victim_stats.defences.against(attacker_stats.attack_type);
        let damage = roll_damage(
            &mut rng.0,
            attacker_stats.accuracy,
            defence,
            attacker_stats.strength,
        );

        hurts.send(HurtEvent {
            entity: attack.victim,
            damage,
            source: Some(attack.attacker),
        });
    }
}

/// Applies hurt events: clamped damage to storage and the cached snapshot
/// copy, a refreshed in-combat marker, and exactly one death event when
/// hitpoints reach zero.
pub fn hurt_apply_system(
    config: Res<SimConfig>,
    mut hurts: EventReader<HurtEvent>,
    mut cache: ResMut<SnapshotCache>,
    mut deaths: EventWriter<DeathEvent>,
    mut query: Query<&mut Stats>,
    mut commands: Commands,
) {
    for hurt in hurts.read() {
        let Ok(mut stats) = query.get_mut(hurt.entity) else {
            continue;
        };
        let died = stats.apply_damage(hurt.damage);
        cache.apply_damage(hurt.entity, hurt.damage);
        commands.entity(hurt.entity).insert(RecentCombat {
            remaining: config.combat_flag_secs,
        });
        if died {
            deaths.send(DeathEvent { entity: hurt.entity });
        }
    }
}

/// Handles death events: the designated cancellation signal.
///
/// Removes the dead entity from movement and interpolation, terminates its
/// state machine, evicts its cached profile and starts the death animation.
pub fn death_system(
    config: Res<SimConfig>,
    mut deaths: EventReader<DeathEvent>,
    mut cache: ResMut<SnapshotCache>,
    mut camera: ResMut<CameraTarget>,
    mut controlled: ResMut<ControlledEntity>,
    mut query: Query<(Option<&mut Brain>, Option<&mut AnimationState>)>,
    mut commands: Commands,
) {
    for death in deaths.read() {
        let Ok((brain, animation)) = query.get_mut(death.entity) else {
            continue;
        };
        if let Some(mut brain) = brain {
            brain.state = AiState::Dead;
            brain.attack_timer = 0.0;
        }
        if let Some(mut animation) = animation {
            animation.0 = Animation::Death;
        }
        commands
            .entity(death.entity)
            .remove::<MovementState>()
            .remove::<InterpolationState>()
            .insert(Dying {
                remaining: config.death_animation_secs,
            });
        cache.evict(death.entity);
        if camera.0 == Some(death.entity) {
            camera.0 = None;
        }
        if controlled.0 == Some(death.entity) {
            controlled.0 = None;
        }
    }
}

/// Counts down death animations. Players respawn at their origin fully
/// healed and re-armed as camera target and controlled entity; everything
/// else is destroyed.
pub fn dying_system(
    config: Res<SimConfig>,
    mut camera: ResMut<CameraTarget>,
    mut controlled: ResMut<ControlledEntity>,
    mut query: Query<(
        Entity,
        &mut Dying,
        &mut Stats,
        &mut GridPosition,
        &mut VisualPosition,
        &mut AnimationState,
        &Origin,
        Option<&Player>,
    )>,
    mut commands: Commands,
) {
    for (entity, mut dying, mut stats, mut pos, mut visual, mut animation, origin, player) in
        query.iter_mut()
    {
        dying.remaining -= config.tick_interval;
        if dying.remaining > 0.0 {
            continue;
        }

        if player.is_some() {
            stats.heal_full();
            *pos = origin.0;
            *visual = VisualPosition::at_tile(origin.0, config.tile_size);
            animation.0 = Animation::Idle;
            commands
                .entity(entity)
                .remove::<Dying>()
                .remove::<RecentCombat>();
            camera.0 = Some(entity);
            controlled.0 = Some(entity);
        } else {
            commands.entity(entity).despawn();
        }
    }
}

/// Expires "recently in combat" markers once their timeout elapses.
pub fn combat_flag_system(
    config: Res<SimConfig>,
    mut query: Query<(Entity, &mut RecentCombat)>,
    mut commands: Commands,
) {
    for (entity, mut flag) in query.iter_mut() {
        flag.remaining -= config.tick_interval;
        if flag.remaining <= 0.0 {
            commands.entity(entity).remove::<RecentCombat>();
        }
    }
}

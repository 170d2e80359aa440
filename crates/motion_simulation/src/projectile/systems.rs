//! Projectile systems
//!
//! Intake: `fire_projectiles` (ShootProjectile → assembly)
//! React: `tick_projectile_timers` → `handle_projectile_contacts`
//!
//! Таймеры идут первыми: тик попадания не тратит dead timer.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use rand::Rng;

use super::{
    EffectKind, Projectile, ProjectileAsset, ProjectileAssets, ProjectileDied, ProjectileEffect, ProjectileHit,
    ProjectileState, ShootProjectile,
};
use crate::components::{BoundingBox, CollisionFilter, PhysicsBody, PhysicsValues, TimeToLive};
use crate::knockback::{Knockback, KnockbackEvent};
use crate::physics::{CollisionListener, ContactReport, EntityBounced, EntityImpacted};
use crate::replication::MotionSnapshot;
use crate::DeterministicRng;

/// Assembly: every projectile component in one spawn.
///
/// Физика, фильтр создателя, TTL и listener создаются вместе, поэтому
/// projectile без провайдеров существовать не может.
pub fn spawn_projectile(
    commands: &mut Commands,
    asset: &ProjectileAsset,
    origin: Vec3,
    direction: Vec3,
    creator: Option<Entity>,
) -> Entity {
    let (projectile, velocity) = Projectile::shoot(asset, direction, creator);

    let entity = commands
        .spawn((
            projectile,
            velocity,
            Transform::from_translation(origin),
            PhysicsBody::projectile(asset.gravity, asset.restitution),
            PhysicsValues::new(asset.mass, asset.drag_coefficient),
            BoundingBox::cube(asset.half_size),
            CollisionFilter { ignore: creator },
            CollisionListener::default(),
            TimeToLive::new(asset.time_to_live),
            MotionSnapshot::default(),
        ))
        .id();

    crate::logger::log(&format!(
        "Projectile '{}' spawned: {:?} at {:?} (creator {:?})",
        asset.id, entity, origin, creator
    ));

    entity
}

/// Система: ShootProjectile → spawn (Intake)
pub fn fire_projectiles(
    mut commands: Commands,
    mut requests: EventReader<ShootProjectile>,
    assets: Res<ProjectileAssets>,
) {
    for request in requests.read() {
        let Some(asset) = assets.get(&request.asset) else {
            crate::logger::log_warning(&format!("Unknown projectile asset '{}', shot skipped", request.asset));
            continue;
        };

        if request.direction.length_squared() <= f32::EPSILON {
            crate::logger::log_warning(&format!("Projectile '{}' fired with zero direction", request.asset));
        }

        spawn_projectile(&mut commands, asset, request.origin, request.direction, request.creator);
    }
}

fn pitch(rng: &mut DeterministicRng) -> f32 {
    rng.rng.gen_range(0.9..1.1)
}

/// Система: TTL (InFlight), dead timer (Impacted), despawn (Dead)
pub fn tick_projectile_timers(
    mut commands: Commands,
    mut projectiles: Query<(Entity, &mut Projectile, &mut TimeToLive, &Transform)>,
    assets: Res<ProjectileAssets>,
    mut effects: EventWriter<ProjectileEffect>,
    mut died: EventWriter<ProjectileDied>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut projectile, mut ttl, transform) in projectiles.iter_mut() {
        let finished = match projectile.state() {
            ProjectileState::InFlight => {
                let expired = ttl.tick(delta);
                if expired {
                    crate::logger::log(&format!("Projectile {:?} ttl expired in flight", entity));
                }
                expired
            }
            ProjectileState::Impacted => projectile.consume_dead_timer(delta),
            ProjectileState::Dead => true,
        };

        if !finished {
            continue;
        }

        projectile.kill();

        let effect = assets.get(projectile.asset_id()).and_then(|asset| asset.death_effect.clone());
        effects.write(ProjectileEffect {
            projectile: entity,
            kind: EffectKind::Death,
            effect,
            position: transform.translation,
            normal: Vec3::Y,
            pitch: pitch(&mut rng),
        });
        died.write(ProjectileDied {
            projectile: entity,
            has_impacted: projectile.has_impacted(),
        });

        crate::logger::log(&format!("Projectile {:?} dead, despawning", entity));
        commands.entity(entity).despawn();
    }
}

/// Outgoing projectile events
#[derive(SystemParam)]
pub struct ProjectileOutput<'w> {
    effects: EventWriter<'w, ProjectileEffect>,
    hits: EventWriter<'w, ProjectileHit>,
    knockback: EventWriter<'w, KnockbackEvent>,
}

/// Система: bounce/impact callbacks → state machine + effects
pub fn handle_projectile_contacts(
    mut bounced: EventReader<EntityBounced>,
    mut impacted: EventReader<EntityImpacted>,
    mut projectiles: Query<&mut Projectile>,
    assets: Res<ProjectileAssets>,
    mut rng: ResMut<DeterministicRng>,
    mut output: ProjectileOutput,
) {
    for event in bounced.read() {
        let Ok(projectile) = projectiles.get(event.entity) else {
            continue;
        };
        if !projectile.on_bounce() {
            continue;
        }

        let effect = assets.get(projectile.asset_id()).and_then(|asset| asset.bounce_effect.clone());
        output.effects.write(ProjectileEffect {
            projectile: event.entity,
            kind: EffectKind::Bounce,
            effect,
            position: event.contact.point,
            normal: event.contact.normal,
            pitch: pitch(&mut rng),
        });
    }

    for event in impacted.read() {
        let Ok(mut projectile) = projectiles.get_mut(event.entity) else {
            continue;
        };
        if !projectile.on_impact() {
            continue;
        }

        let asset = assets.get(projectile.asset_id());
        if asset.is_none() {
            crate::logger::log_warning(&format!(
                "Projectile {:?} has unknown asset '{}'",
                event.entity,
                projectile.asset_id()
            ));
        }

        crate::logger::log(&format!(
            "Projectile {:?} impacted at {:?} (other {:?})",
            event.entity, event.contact.point, event.contact.other
        ));

        output.effects.write(ProjectileEffect {
            projectile: event.entity,
            kind: EffectKind::Impact,
            effect: asset.and_then(|asset| asset.impact_effect.clone()),
            position: event.contact.point,
            normal: event.contact.normal,
            pitch: pitch(&mut rng),
        });

        if let Some(target) = event.contact.other {
            emit_hit(&mut output, event.entity, &projectile, asset, target, &event.contact);
        }
    }
}

fn emit_hit(
    output: &mut ProjectileOutput,
    entity: Entity,
    projectile: &Projectile,
    asset: Option<&ProjectileAsset>,
    target: Entity,
    contact: &ContactReport,
) {
    output.hits.write(ProjectileHit {
        projectile: entity,
        shooter: projectile.creator(),
        target,
        damage: asset.map_or(0, |asset| asset.damage),
        point: contact.point,
    });

    if let Some(profile) = asset.and_then(|asset| asset.knockback) {
        // Normal смотрит от цели к projectile → толкаем в обратную сторону
        let push = -contact.normal * profile.speed + Vec3::Y * profile.lift;
        output.knockback.write(KnockbackEvent {
            target,
            knockback: Knockback::new(push, profile.duration),
        });
    }
}

//! Physics integrator
//!
//! Per entity per tick:
//! 1. Standing forces: gravity, drag (`drag_coefficient / mass`), buoyancy
//!    + fluid drag, decay profile из последней configured инструкции
//! 2. Sweep: бокс вдоль resolved velocity, substeps ≤ `max_substep_distance`
//!    (thin geometry не пролетаем), до `max_clip_iterations` контактов на substep
//! 3. Contact response: Bounce / Slide / Rest
//! 4. Write-back: Transform + Velocity (через `WriteAuthority::integrator`)
//! 5. Reports для `CollisionListener` (bounce/impact callbacks)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::collision::{sweep_aabb, Contact, ContactSource, GeometrySource};
use super::events::{CollisionListener, ContactReport};
use super::spatial::{SpatialGrid, SpatialQuery};
use super::WorldGeometry;
use crate::components::{BoundingBox, CollisionFilter, PhysicsBody, PhysicsValues};
use crate::schedule::ParallelSettings;
use crate::velocity::{Velocity, VelocityConfig, WriteAuthority};

/// Sweep / contact tunables (configuration)
#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegratorSettings {
    /// Longest distance a single substep may cover (m)
    pub max_substep_distance: f32,
    pub max_substeps: u32,
    /// Contacts handled per substep before the leftover time is dropped
    pub max_clip_iterations: u32,
    /// Distance kept between a box and the surface it touched
    pub skin: f32,
    /// Outgoing speed below which a bouncy contact is treated as slide/rest
    pub min_bounce_speed: f32,
    /// Tangential speed below which a contact on a floor comes to rest
    pub rest_speed: f32,
    /// `normal.y` threshold for "floor-like" surfaces
    pub ground_normal_min_y: f32,
    /// Extra radius for entity candidates
    pub entity_query_margin: f32,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            max_substep_distance: 0.25,
            max_substeps: 16,
            max_clip_iterations: 4,
            skin: 0.001,
            min_bounce_speed: 0.5,
            rest_speed: 0.15,
            ground_normal_min_y: 0.7,
            entity_query_margin: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ContactResponse {
    /// Normal component reflected, scaled by restitution
    Bounce,
    /// Normal component removed, tangential damped by friction
    Slide,
    /// Velocity zeroed (slow contact on a floor)
    Rest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    /// Region not loaded: nothing changes, retried next tick
    Deferred,
}

/// Result of one integration step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepResult {
    pub outcome: StepOutcome,
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
    pub in_fluid: bool,
    /// Body hit something with `stop_on_impact`
    pub stopped: bool,
    /// Decay profile fell under its threshold this tick
    pub decay_finished: bool,
}

/// Providers and per-entity filters for [`step_body`]
pub struct StepContext<'a> {
    pub entity: Entity,
    pub geometry: &'a dyn GeometrySource,
    pub spatial: &'a dyn SpatialQuery,
    pub settings: &'a IntegratorSettings,
    pub filter: Option<&'a CollisionFilter>,
}

pub fn classify_contact(
    velocity: Vec3,
    normal: Vec3,
    body: &PhysicsBody,
    settings: &IntegratorSettings,
) -> ContactResponse {
    let into_surface = -velocity.dot(normal);
    if body.restitution > 0.0 && into_surface * body.restitution >= settings.min_bounce_speed {
        return ContactResponse::Bounce;
    }

    let tangential = velocity - normal * velocity.dot(normal);
    if normal.y >= settings.ground_normal_min_y && tangential.length() < settings.rest_speed {
        ContactResponse::Rest
    } else {
        ContactResponse::Slide
    }
}

/// Velocity after contact; `delta` scales the per-second friction.
pub fn respond_to_contact(
    velocity: Vec3,
    normal: Vec3,
    response: ContactResponse,
    body: &PhysicsBody,
    delta: f32,
) -> Vec3 {
    let normal_speed = velocity.dot(normal);
    match response {
        ContactResponse::Bounce => velocity - normal * normal_speed * (1.0 + body.restitution),
        ContactResponse::Slide => {
            let tangential = velocity - normal * normal_speed.min(0.0);
            tangential * (1.0 - body.friction * delta).max(0.0)
        }
        ContactResponse::Rest => Vec3::ZERO,
    }
}

/// Standing forces for one tick: gravity, drag, buoyancy, decay
fn apply_standing_forces(
    velocity: Vec3,
    body: &PhysicsBody,
    values: &PhysicsValues,
    fluid: Option<super::collision::FluidSample>,
    decay: Option<&VelocityConfig>,
    delta: f32,
) -> Vec3 {
    let mut velocity = velocity;
    let mut gravity = body.gravity;
    let mut damping = values.drag_per_second();

    if let Some(fluid) = fluid {
        gravity -= body.gravity * fluid.properties.buoyancy * fluid.submerged;
        damping += fluid.properties.viscosity * fluid.submerged;
    }

    if let Some(decay) = decay {
        damping += if body.on_ground {
            decay.ground_resistance
        } else {
            decay.air_resistance
        };
    }

    velocity.y -= gravity * delta;
    velocity * (1.0 - damping * delta).clamp(0.0, 1.0)
}

fn earliest_contact(
    ctx: &StepContext,
    half_extents: Vec3,
    nearby: &[super::spatial::SpatialEntry],
    from: Vec3,
    to: Vec3,
) -> Option<Contact> {
    let moving = crate::physics::collision::Aabb::from_center(from, half_extents);
    let world = ctx.geometry.sweep(&moving, from, to).into_iter().next();

    let entity = nearby
        .iter()
        .filter_map(|entry| {
            sweep_aabb(half_extents, from, to, &entry.bounds).map(|(fraction, normal)| Contact {
                fraction,
                normal,
                point: from.lerp(to, fraction),
                source: ContactSource::Entity(entry.entity),
            })
        })
        .min_by(|a, b| a.fraction.total_cmp(&b.fraction));

    match (world, entity) {
        (Some(w), Some(e)) => Some(if e.fraction < w.fraction { e } else { w }),
        (w, e) => w.or(e),
    }
}

/// One integration step for a single body. Pure: no ECS access.
#[allow(clippy::too_many_arguments)]
pub fn step_body(
    ctx: &StepContext,
    body: &PhysicsBody,
    values: &PhysicsValues,
    bounds: &BoundingBox,
    decay: Option<&VelocityConfig>,
    position: Vec3,
    velocity: Vec3,
    delta: f32,
    contacts: &mut Vec<ContactReport>,
) -> StepResult {
    let settings = ctx.settings;
    let half_extents = bounds.half_extents;
    let aabb = bounds.aabb_at(position);

    if !ctx.geometry.region_loaded(&aabb.swept(velocity * delta)) {
        return StepResult {
            outcome: StepOutcome::Deferred,
            position,
            velocity,
            on_ground: body.on_ground,
            in_fluid: body.in_fluid,
            stopped: false,
            decay_finished: false,
        };
    }

    // 1. Forces
    let fluid = ctx.geometry.fluid_at(&aabb);
    let mut velocity = apply_standing_forces(velocity, body, values, fluid, decay, delta);
    let decay_finished = decay.is_some_and(|d| velocity.length() < d.threshold);

    // 2. Candidates (snapshot at tick start)
    let nearby: Vec<_> = if body.collide_with_entities {
        let reach = velocity.length() * delta + half_extents.max_element() + settings.entity_query_margin;
        ctx.spatial
            .query_nearby(position, reach)
            .into_iter()
            .filter(|entry| entry.entity != ctx.entity)
            .filter(|entry| ctx.filter.map_or(true, |f| f.allows(entry.entity)))
            .collect()
    } else {
        Vec::new()
    };

    let travel = velocity.length() * delta;
    let substeps = ((travel / settings.max_substep_distance.max(0.001)).ceil() as u32).clamp(1, settings.max_substeps.max(1));
    let substep_delta = delta / substeps as f32;

    let mut position = position;
    let mut on_ground = false;
    let mut stopped = false;

    'substeps: for _ in 0..substeps {
        let mut remaining = substep_delta;

        for _ in 0..settings.max_clip_iterations.max(1) {
            if remaining <= 0.0 || velocity.length_squared() < 1e-10 {
                break;
            }

            let target = position + velocity * remaining;
            let Some(contact) = earliest_contact(ctx, half_extents, &nearby, position, target) else {
                position = target;
                break;
            };

            // 3. Response
            position = position.lerp(target, contact.fraction) + contact.normal * settings.skin;
            remaining *= 1.0 - contact.fraction;

            let response = classify_contact(velocity, contact.normal, body, settings);
            let impact_speed = -velocity.dot(contact.normal);
            velocity = respond_to_contact(velocity, contact.normal, response, body, substep_delta);

            if response != ContactResponse::Bounce && contact.normal.y >= settings.ground_normal_min_y {
                on_ground = true;
            }

            let other = match contact.source {
                ContactSource::Entity(entity) => Some(entity),
                ContactSource::World => None,
            };
            contacts.push(ContactReport {
                point: position,
                normal: contact.normal,
                other,
                response,
                impact_speed,
            });

            if body.stop_on_impact && (response != ContactResponse::Bounce || other.is_some()) {
                velocity = Vec3::ZERO;
                stopped = true;
                break 'substeps;
            }
        }
    }

    StepResult {
        outcome: StepOutcome::Moved,
        position,
        velocity,
        on_ground,
        in_fluid: fluid.is_some(),
        stopped,
        decay_finished,
    }
}

/// System: integrate all active bodies (parallel over entity batches)
///
/// Runs in `TickSet::Integrate` after the spatial grid rebuild.
pub fn integrate_bodies(
    mut bodies: Query<(
        Entity,
        &mut Transform,
        &mut Velocity,
        &mut PhysicsBody,
        &PhysicsValues,
        &BoundingBox,
        Option<&CollisionFilter>,
        Option<&mut CollisionListener>,
    )>,
    geometry: Res<WorldGeometry>,
    grid: Res<SpatialGrid>,
    settings: Res<IntegratorSettings>,
    parallel: Res<ParallelSettings>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    if delta <= 0.0 {
        return;
    }

    let geometry = geometry.source();
    let spatial: &dyn SpatialQuery = grid.as_ref();
    let settings = settings.as_ref();

    bodies.par_iter_mut().batching_strategy(parallel.batching()).for_each(
        |(entity, mut transform, mut velocity, mut body, values, bounds, filter, listener)| {
            if !body.active {
                return;
            }

            let ctx = StepContext {
                entity,
                geometry,
                spatial,
                settings,
                filter,
            };
            let mut contacts = Vec::new();
            let step = step_body(
                &ctx,
                &body,
                values,
                bounds,
                velocity.decay(),
                transform.translation,
                velocity.authoritative(),
                delta,
                &mut contacts,
            );

            if step.outcome == StepOutcome::Deferred {
                body.deferred_ticks += 1;
                crate::logger::log(&format!(
                    "Entity {:?} waits for region (deferred {} ticks)",
                    entity, body.deferred_ticks
                ));
                return;
            }

            // 4. Write-back
            let authority = WriteAuthority::integrator();
            transform.translation = step.position;
            velocity.set(step.velocity, authority);
            if step.decay_finished {
                velocity.clear_decay(authority);
            }

            body.on_ground = step.on_ground;
            body.in_fluid = step.in_fluid;
            body.deferred_ticks = 0;
            if step.stopped {
                body.active = false;
            }

            // 5. Callbacks (drained by dispatch_collision_events)
            if let Some(mut listener) = listener {
                if !contacts.is_empty() {
                    listener.pending.extend(contacts);
                }
            }
        },
    );
}

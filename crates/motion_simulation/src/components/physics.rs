//! Physics components: tunables, integrator body state, bounds

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::physics::collision::Aabb;

/// Read-only physics inputs (supplied by configuration)
///
/// Integrator только читает. Менять можно только через `scale` / `replace`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct PhysicsValues {
    /// kg
    mass: f64,
    /// Linear drag, applied as `drag_coefficient / mass` per second
    drag_coefficient: f64,
}

impl Default for PhysicsValues {
    fn default() -> Self {
        Self {
            mass: 1.0,
            drag_coefficient: 0.0,
        }
    }
}

/// Меняются только через `scale` / `replace`:
///
/// ```compile_fail
/// let mut values = motion_simulation::PhysicsValues::default();
/// values.mass = 2.0;
/// ```
impl PhysicsValues {
    pub fn new(mass: f64, drag_coefficient: f64) -> Self {
        Self { mass, drag_coefficient }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn drag_coefficient(&self) -> f64 {
        self.drag_coefficient
    }

    /// Scales mass and drag together (size modifiers, potions)
    pub fn scale(&mut self, factor: f64) {
        self.mass *= factor;
        self.drag_coefficient *= factor;
    }

    pub fn replace(&mut self, other: PhysicsValues) {
        *self = other;
    }

    /// Fraction of velocity removed per second by drag
    pub fn drag_per_second(&self) -> f32 {
        if self.mass <= f64::EPSILON {
            return 0.0;
        }
        (self.drag_coefficient / self.mass) as f32
    }
}

/// Integrator-owned body state (physics provider handle)
///
/// `active == false` → integrator пропускает entity (застрявший projectile,
/// frozen NPC).
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct PhysicsBody {
    /// Gravity acceleration (m/s², направлена вниз)
    pub gravity: f32,
    /// 0 = no bounce, 1 = perfect reflection
    pub restitution: f32,
    /// Tangential damping while sliding (fraction per second)
    pub friction: f32,
    /// Sweeps against nearby entities
    pub collide_with_entities: bool,
    /// Registered in the spatial grid (others collide with it)
    pub blocks_entities: bool,
    /// Non-bounce contact zeroes velocity and deactivates the body
    pub stop_on_impact: bool,
    pub active: bool,
    pub on_ground: bool,
    pub in_fluid: bool,
    /// Ticks skipped because the surrounding region was not loaded
    pub deferred_ticks: u32,
}

impl Default for PhysicsBody {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            restitution: 0.0,
            friction: 0.2,
            collide_with_entities: true,
            blocks_entities: true,
            stop_on_impact: false,
            active: true,
            on_ground: false,
            in_fluid: false,
            deferred_ticks: 0,
        }
    }
}

impl PhysicsBody {
    pub fn projectile(gravity: f32, restitution: f32) -> Self {
        Self {
            gravity,
            restitution,
            friction: 0.0,
            blocks_entities: false,
            stop_on_impact: true,
            ..default()
        }
    }
}

/// Axis-aligned collision box centered on `Transform::translation`
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct BoundingBox {
    pub half_extents: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        // Capsule-ish actor 0.8 x 1.8 x 0.8
        Self {
            half_extents: Vec3::new(0.4, 0.9, 0.4),
        }
    }
}

impl BoundingBox {
    pub fn cube(half_size: f32) -> Self {
        Self {
            half_extents: Vec3::splat(half_size),
        }
    }

    pub fn aabb_at(&self, center: Vec3) -> Aabb {
        Aabb::from_center(center, self.half_extents)
    }
}

/// Entity collisions to skip (projectile creator)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct CollisionFilter {
    pub ignore: Option<Entity>,
}

impl CollisionFilter {
    pub fn allows(&self, other: Entity) -> bool {
        self.ignore != Some(other)
    }
}

/// Remaining lifetime (seconds)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct TimeToLive {
    pub remaining: f32,
}

impl TimeToLive {
    pub fn new(seconds: f32) -> Self {
        Self { remaining: seconds }
    }

    /// Returns true once the lifetime is used up
    pub fn tick(&mut self, delta: f32) -> bool {
        self.remaining -= delta;
        self.remaining <= 0.0
    }
}

/// System: despawn generic entities whose lifetime ran out
///
/// Projectiles handle their own TTL through the state machine.
pub fn expire_time_to_live(
    mut commands: Commands,
    mut query: Query<(Entity, &mut TimeToLive), Without<crate::projectile::Projectile>>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut ttl) in query.iter_mut() {
        if ttl.tick(delta) {
            crate::logger::log(&format!("Despawning entity {:?} (ttl expired)", entity));
            commands.entity(entity).despawn();
        }
    }
}

//! Projectile events

use bevy::prelude::*;

/// Event: запрос выстрела (host/AI → ECS)
///
/// Обрабатывается в Intake (`fire_projectiles`); неизвестный asset логируется
/// и пропускается.
#[derive(Event, Debug, Clone)]
pub struct ShootProjectile {
    pub asset: String,
    pub origin: Vec3,
    pub direction: Vec3,
    /// Стрелявший (projectile его не задевает)
    pub creator: Option<Entity>,
}

/// Event: projectile попал в entity
#[derive(Event, Debug, Clone)]
pub struct ProjectileHit {
    pub projectile: Entity,
    pub shooter: Option<Entity>,
    pub target: Entity,
    pub damage: u32,
    pub point: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Bounce,
    Impact,
    Death,
}

/// Event: визуальный/звуковой эффект (ECS → host)
#[derive(Event, Debug, Clone)]
pub struct ProjectileEffect {
    pub projectile: Entity,
    pub kind: EffectKind,
    /// Effect asset id (None = host default)
    pub effect: Option<String>,
    pub position: Vec3,
    pub normal: Vec3,
    /// Sound pitch variance from the deterministic RNG
    pub pitch: f32,
}

/// Event: projectile перешёл в Dead (despawn в конце тика)
#[derive(Event, Debug, Clone)]
pub struct ProjectileDied {
    pub projectile: Entity,
    pub has_impacted: bool,
}

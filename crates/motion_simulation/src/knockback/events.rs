//! Knockback events

use bevy::prelude::*;

use super::Knockback;

/// Event: запрос knockback на entity
///
/// Генерируется:
/// - Projectile impact (asset с knockback)
/// - Host layer (взрывы, способности)
///
/// Обрабатывается в Intake: `attach_knockback` (policy из `KnockbackSettings`)
#[derive(Event, Debug, Clone)]
pub struct KnockbackEvent {
    pub target: Entity,
    pub knockback: Knockback,
}

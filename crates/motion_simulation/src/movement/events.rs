//! Movement events

use bevy::prelude::*;

/// Event: намерение прыгнуть (jump intent)
///
/// Генерируется:
/// - Host input layer (client packet)
/// - AI (для NPC, если нужно)
///
/// Обрабатывается:
/// - collect_jump_intents → MovementInput.jump, прыжок применяет input producer
///   только если body.on_ground
#[derive(Event, Debug, Clone)]
pub struct JumpIntent {
    pub entity: Entity,
}

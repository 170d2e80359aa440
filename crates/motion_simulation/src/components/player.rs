//! Player control marker component
//!
//! Отмечает entity которым управляет удалённый клиент (в отличие от AI/NPC).

use bevy::prelude::*;

use crate::knockback::PredictedKnockback;

/// Marker component для player-controlled entity
///
/// # Архитектурная заметка
/// - Direct knockback использует `Without<Player>` filter
/// - Predicted knockback использует `With<Player>` filter и пишет в
///   [`PredictedKnockback`] channel (reconciliation вне ядра)
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
#[require(PredictedKnockback)]
pub struct Player;

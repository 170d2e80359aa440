//! Knockback domain
//!
//! Два режима доставки:
//! - Direct (NPC, `Without<Player>`): вектор идёт в Velocity как инструкция
//! - Predicted (player, `With<Player>`): вектор идёт в `PredictedKnockback`,
//!   клиент предсказывает сам, сервер сверяет через reconciliation
//!
//! Тайминг и снятие компонента одинаковые для обоих режимов.

pub mod components;
pub mod events;
pub mod settings;
pub mod systems;

#[cfg(test)]
mod components_tests;
#[cfg(test)]
mod systems_tests;

pub use components::*;
pub use events::*;
pub use settings::*;
pub use systems::*;

use bevy::prelude::*;

use crate::schedule::{MotionPipelineAppExt, MotionProducer, TickSet};

/// Producer label: knockback (registered after input)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct KnockbackProducer;

impl MotionProducer for KnockbackProducer {}

pub struct KnockbackPlugin;

impl Plugin for KnockbackPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KnockbackSettings>()
            .add_event::<KnockbackEvent>()
            .add_systems(
                FixedUpdate,
                (reset_predicted_channels, attach_knockback).chain().in_set(TickSet::Intake),
            )
            .add_motion_producer(KnockbackProducer, (apply_direct_knockback, apply_predicted_knockback));
    }
}

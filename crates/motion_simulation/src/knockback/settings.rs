//! Knockback configuration

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::velocity::InstructionKind;

/// What happens when a knockback arrives for an entity that already has one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect, Serialize, Deserialize)]
pub enum AttachPolicy {
    /// Новый knockback заменяет активный (elapsed сбрасывается)
    #[default]
    Replace,
    /// Активный knockback сохраняется, новый отбрасывается
    Reject,
}

#[derive(Resource, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockbackSettings {
    /// Player knockback goes to `PredictedKnockback` instead of Velocity
    pub prediction_enabled: bool,
    pub attach_policy: AttachPolicy,
    /// Kind for requests that do not pick one
    pub instruction_kind: InstructionKind,
}

impl Default for KnockbackSettings {
    fn default() -> Self {
        Self {
            prediction_enabled: true,
            attach_policy: AttachPolicy::Replace,
            instruction_kind: InstructionKind::Add,
        }
    }
}

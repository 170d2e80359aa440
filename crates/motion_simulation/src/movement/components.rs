//! Movement компоненты: ввод и скорость

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Desired motion for this tick (from client input or AI)
///
/// `direction` - world-space, Y игнорируется.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MovementInput {
    pub direction: Vec3,
    /// One-shot; consumed by the input producer
    pub jump: bool,
}

impl MovementInput {
    pub fn walking(direction: Vec3) -> Self {
        Self { direction, jump: false }
    }
}

/// Скорость движения актора
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct MovementSpeed {
    /// m/s
    pub speed: f32,
    /// Vertical velocity added by a grounded jump (m/s)
    pub jump_impulse: f32,
    /// Share of the steering correction applied while airborne
    pub air_control: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self {
            speed: 5.0,
            jump_impulse: 6.0,
            air_control: 0.1,
        }
    }
}

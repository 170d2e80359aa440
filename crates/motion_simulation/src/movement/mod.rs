//! Movement domain - input-driven motion producer
//!
//! Содержит:
//! - MovementInput (направление + прыжок от клиента/AI)
//! - MovementSpeed (скорость, импульс прыжка, air control)
//! - JumpIntent (event для прыжка)
//! - InputProducer (первый motion producer в тике)

pub mod components;
pub mod events;

pub use components::*;
pub use events::*;

use bevy::prelude::*;

use crate::components::PhysicsBody;
use crate::schedule::{MotionPipelineAppExt, MotionProducer, ParallelSettings, TickSet};
use crate::velocity::Velocity;

/// Producer label: input steering
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputProducer;

impl MotionProducer for InputProducer {}

/// Система: JumpIntent events → MovementInput.jump
///
/// Intake phase (events приходят из host layer между тиками).
pub fn collect_jump_intents(mut events: EventReader<JumpIntent>, mut inputs: Query<&mut MovementInput>) {
    for intent in events.read() {
        match inputs.get_mut(intent.entity) {
            Ok(mut input) => input.jump = true,
            Err(_) => {
                crate::logger::log_warning(&format!("JumpIntent for {:?} without MovementInput", intent.entity));
            }
        }
    }
}

/// Система: steering + jump → Add instructions
///
/// Horizontal: разница между desired и текущей скоростью (на земле целиком,
/// в воздухе доля `air_control`). Без ввода в воздухе ничего не трогаем,
/// чтобы не гасить knockback/отскоки.
pub fn apply_movement_input(
    mut query: Query<(&mut MovementInput, &MovementSpeed, &PhysicsBody, &mut Velocity)>,
    parallel: Res<ParallelSettings>,
) {
    query
        .par_iter_mut()
        .batching_strategy(parallel.batching())
        .for_each(|(mut input, speed, body, mut velocity)| {
            let correction = steering_correction(&input, speed, body.on_ground, velocity.authoritative());
            if correction != Vec3::ZERO {
                velocity.add_force(correction);
            }

            if input.jump {
                if body.on_ground {
                    velocity.add_force(Vec3::Y * speed.jump_impulse);
                }
                // Intent одноразовый (в воздухе просто теряется)
                input.jump = false;
            }
        });
}

/// Horizontal delta that moves `current` toward the desired velocity
pub fn steering_correction(input: &MovementInput, speed: &MovementSpeed, on_ground: bool, current: Vec3) -> Vec3 {
    let direction = Vec3::new(input.direction.x, 0.0, input.direction.z).normalize_or_zero();
    if direction == Vec3::ZERO && !on_ground {
        return Vec3::ZERO;
    }

    let desired = direction * speed.speed;
    let horizontal = Vec3::new(current.x, 0.0, current.z);
    let control = if on_ground { 1.0 } else { speed.air_control.clamp(0.0, 1.0) };

    (desired - horizontal) * control
}

/// Movement plugin: input producer (регистрируется первым)
pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<JumpIntent>()
            .add_systems(FixedUpdate, collect_jump_intents.in_set(TickSet::Intake))
            .add_motion_producer(InputProducer, apply_movement_input);
    }
}

//! Knockback systems
//!
//! Intake: `reset_predicted_channels`, `attach_knockback`
//! Produce (KnockbackProducer): `apply_direct_knockback`, `apply_predicted_knockback`

use std::collections::HashMap;

use bevy::ecs::system::ParallelCommands;
use bevy::prelude::*;

use super::{AttachPolicy, Knockback, KnockbackEvent, KnockbackSettings, PredictedKnockback};
use crate::components::Player;
use crate::schedule::ParallelSettings;
use crate::velocity::{Instruction, InstructionKind, Velocity};

/// One tick of an attached knockback: modifiers → instruction → elapsed.
///
/// Returns the instruction to deliver and whether the knockback expired.
pub fn step_knockback(knockback: &mut Knockback, default_kind: InstructionKind, delta: f32) -> (Instruction, bool) {
    knockback.apply_modifiers();
    let instruction = knockback.instruction(default_kind);
    let expired = knockback.advance(delta);
    (instruction, expired)
}

/// Система: очищает predicted channels перед новым тиком
pub fn reset_predicted_channels(mut channels: Query<&mut PredictedKnockback>) {
    for mut channel in channels.iter_mut() {
        if !channel.pending().is_empty() {
            channel.clear();
        }
    }
}

/// Система: KnockbackEvent → Knockback component
///
/// Duplicate attachment решается `AttachPolicy`:
/// - активный knockback заменяется на месте (Replace) или сохраняется (Reject)
/// - несколько событий на одну entity в одном тике сворачиваются по той же политике
/// - новые компоненты вставляются через Commands (видны со следующего тика)
pub fn attach_knockback(
    mut commands: Commands,
    mut events: EventReader<KnockbackEvent>,
    mut active: Query<&mut Knockback>,
    targets: Query<(), With<Velocity>>,
    settings: Res<KnockbackSettings>,
) {
    let mut incoming: HashMap<Entity, Knockback> = HashMap::new();
    let mut order: Vec<Entity> = Vec::new();

    for event in events.read() {
        let target = event.target;
        if !targets.contains(target) {
            crate::logger::log_warning(&format!("Knockback target {:?} has no Velocity, skipped", target));
            continue;
        }

        if let Ok(mut current) = active.get_mut(target) {
            match settings.attach_policy {
                AttachPolicy::Replace => {
                    crate::logger::log(&format!(
                        "Knockback on {:?} replaced (elapsed {:.2}/{:.2})",
                        target, current.elapsed, current.duration
                    ));
                    *current = event.knockback.clone();
                }
                AttachPolicy::Reject => {
                    crate::logger::log(&format!("Knockback on {:?} rejected (already active)", target));
                }
            }
            continue;
        }

        match incoming.get_mut(&target) {
            Some(pending) => match settings.attach_policy {
                AttachPolicy::Replace => {
                    crate::logger::log(&format!("Knockback on {:?} replaced within tick", target));
                    *pending = event.knockback.clone();
                }
                AttachPolicy::Reject => {
                    crate::logger::log(&format!("Knockback on {:?} rejected within tick", target));
                }
            },
            None => {
                incoming.insert(target, event.knockback.clone());
                order.push(target);
            }
        }
    }

    for target in order {
        if let Some(knockback) = incoming.remove(&target) {
            crate::logger::log(&format!(
                "Knockback attached to {:?}: {:?} for {:.2}s",
                target, knockback.base_velocity, knockback.duration
            ));
            commands.entity(target).insert(knockback);
        }
    }
}

/// Система: direct knockback (NPC) → Velocity instruction queue
pub fn apply_direct_knockback(
    par_commands: ParallelCommands,
    mut query: Query<(Entity, &mut Knockback, &mut Velocity), Without<Player>>,
    settings: Res<KnockbackSettings>,
    parallel: Res<ParallelSettings>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let default_kind = settings.instruction_kind;

    query
        .par_iter_mut()
        .batching_strategy(parallel.batching())
        .for_each(|(entity, mut knockback, mut velocity)| {
            let (instruction, expired) = step_knockback(&mut knockback, default_kind, delta);
            velocity.push(instruction);

            if expired {
                par_commands.command_scope(|mut commands| {
                    commands.entity(entity).remove::<Knockback>();
                });
            }
        });
}

/// Система: predicted knockback (player)
///
/// Prediction выключен → ведёт себя как direct.
pub fn apply_predicted_knockback(
    par_commands: ParallelCommands,
    mut query: Query<(Entity, &mut Knockback, &mut Velocity, Option<&mut PredictedKnockback>), With<Player>>,
    settings: Res<KnockbackSettings>,
    parallel: Res<ParallelSettings>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();
    let default_kind = settings.instruction_kind;
    let predicted = settings.prediction_enabled;

    query
        .par_iter_mut()
        .batching_strategy(parallel.batching())
        .for_each(|(entity, mut knockback, mut velocity, channel)| {
            let (instruction, expired) = step_knockback(&mut knockback, default_kind, delta);

            match channel {
                Some(mut channel) if predicted => channel.push(instruction),
                _ => velocity.push(instruction),
            }

            if expired {
                par_commands.command_scope(|mut commands| {
                    commands.entity(entity).remove::<Knockback>();
                });
            }
        });
}

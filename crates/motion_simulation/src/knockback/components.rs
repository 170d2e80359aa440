//! Knockback components: active request + predicted channel

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::velocity::{Instruction, InstructionKind, VelocityConfig};

/// Active knockback on an entity
///
/// Lifecycle (один раз за тик, пока компонент висит):
/// 1. `apply_modifiers()` - множители сворачиваются в `base_velocity`
/// 2. вектор уходит в Velocity (direct) или в `PredictedKnockback` (player)
/// 3. `advance(dt)` - как только `elapsed > duration`, компонент снимается
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct Knockback {
    pub base_velocity: Vec3,
    /// Pending multipliers (armor, resistances, crits), applied in order
    pub modifiers: Vec<f64>,
    /// Seconds
    pub duration: f32,
    pub elapsed: f32,
    /// `None` = `KnockbackSettings::instruction_kind`
    pub kind: Option<InstructionKind>,
    pub config: Option<VelocityConfig>,
}

impl Knockback {
    pub fn new(base_velocity: Vec3, duration: f32) -> Self {
        Self {
            base_velocity,
            modifiers: Vec::new(),
            duration,
            elapsed: 0.0,
            kind: None,
            config: None,
        }
    }

    pub fn with_modifiers(mut self, modifiers: impl IntoIterator<Item = f64>) -> Self {
        self.modifiers.extend(modifiers);
        self
    }

    pub fn with_kind(mut self, kind: InstructionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_config(mut self, config: VelocityConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Folds pending modifiers into the base vector and empties the list.
    ///
    /// Повторный вызов без новых модификаторов ничего не меняет.
    pub fn apply_modifiers(&mut self) -> Vec3 {
        if self.modifiers.is_empty() {
            return self.base_velocity;
        }

        let mut scaled = self.base_velocity.as_dvec3();
        for modifier in self.modifiers.drain(..) {
            scaled *= modifier;
        }
        self.base_velocity = scaled.as_vec3();
        self.base_velocity
    }

    pub fn instruction(&self, default_kind: InstructionKind) -> Instruction {
        Instruction {
            delta: self.base_velocity,
            kind: self.kind.unwrap_or(default_kind),
            config: self.config,
        }
    }

    /// Advances `elapsed`; returns true once the knockback has expired.
    pub fn advance(&mut self, delta: f32) -> bool {
        self.elapsed += delta;
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.elapsed > self.duration
    }
}

/// Reconciliation channel for player knockback
///
/// Сервер не пишет knockback игроку напрямую: вектор уходит сюда, клиент
/// предсказывает его сам, reconciliation (см. [`crate::velocity::Reconciler`])
/// сверяет результат. Очищается в Intake следующего тика.
#[derive(Component, Debug, Clone, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct PredictedKnockback {
    pending: Vec<Instruction>,
    /// Sum of every predicted delta since spawn (diagnostics)
    pub total_sent: Vec3,
}

impl PredictedKnockback {
    pub fn push(&mut self, instruction: Instruction) {
        self.total_sent += instruction.delta;
        self.pending.push(instruction);
    }

    pub fn pending(&self) -> &[Instruction] {
        &self.pending
    }

    pub fn drain(&mut self) -> Vec<Instruction> {
        std::mem::take(&mut self.pending)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

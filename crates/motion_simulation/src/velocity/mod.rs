//! Velocity component and instruction queue
//!
//! Архитектура:
//! - Producers (input, knockback, AI, status effects) только добавляют
//!   инструкции через `add_force` / `add_instruction`
//! - Resolver (единственный) сворачивает очередь в authoritative vector
//! - Integrator читает resolved vector и пишет результат коллизий обратно
//!
//! Прямая запись (`Velocity::set`) требует [`WriteAuthority`], который
//! обычный producer построить не может.

use std::marker::PhantomData;

use bevy::ecs::system::ScheduleSystem;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub mod resolver;

pub use resolver::{fold_instructions, resolve_instructions};

use crate::schedule::{ensure_plugin, TickPipelinePlugin, TickSet};

/// Registers the resolver (single system in `TickSet::Resolve`)
pub struct VelocityPlugin;

impl Plugin for VelocityPlugin {
    fn build(&self, app: &mut App) {
        ensure_plugin(app, TickPipelinePlugin);
        app.configure_sets(
            FixedUpdate,
            ReconcileSet.in_set(TickSet::Resolve).after(resolve_instructions),
        )
        .add_systems(FixedUpdate, resolve_instructions.in_set(TickSet::Resolve));
    }
}

/// Reconciliation systems: after the resolver, before the integrator reads the vector
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReconcileSet;

/// Как инструкция комбинируется с уже накопленной скоростью
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect, Serialize, Deserialize)]
pub enum InstructionKind {
    /// Прибавить delta к рабочей сумме
    #[default]
    Add,
    /// Отбросить всё накопленное до этого момента, delta становится новой базой
    SetAbsolute,
}

/// Decay profile carried by an instruction.
///
/// While active, the integrator damps the authoritative vector with
/// `ground_resistance` or `air_resistance` (per second) until its length
/// drops under `threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    pub ground_resistance: f32,
    pub air_resistance: f32,
    pub threshold: f32,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            ground_resistance: 8.0,
            air_resistance: 1.5,
            threshold: 0.1,
        }
    }
}

/// Queued, not yet applied motion change
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Instruction {
    pub delta: Vec3,
    pub kind: InstructionKind,
    pub config: Option<VelocityConfig>,
}

impl Instruction {
    pub fn add(delta: Vec3) -> Self {
        Self {
            delta,
            kind: InstructionKind::Add,
            config: None,
        }
    }

    pub fn set_absolute(delta: Vec3) -> Self {
        Self {
            delta,
            kind: InstructionKind::SetAbsolute,
            config: None,
        }
    }

    pub fn with_config(mut self, config: VelocityConfig) -> Self {
        self.config = Some(config);
        self
    }
}

/// Capability token for the direct-write path of [`Velocity`].
///
/// Only the resolver, the integrator write-back and reconcilers registered
/// through [`ReconcilerAppExt::add_reconciler`] can obtain one.
///
/// ```compile_fail
/// let _ = motion_simulation::WriteAuthority::integrator();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WriteAuthority {
    _private: (),
}

impl WriteAuthority {
    pub(crate) const fn resolver() -> Self {
        Self { _private: () }
    }

    pub(crate) const fn integrator() -> Self {
        Self { _private: () }
    }

    const fn reconciliation() -> Self {
        Self { _private: () }
    }
}

/// Marker for network reconciliation steps that blend client-reported
/// motion into the authoritative vector.
///
/// Implementing it grants nothing by itself: authority exists only as the
/// [`ReconcilerGrant`] resource inserted by `add_reconciler`.
pub trait Reconciler: Send + Sync + 'static {}

/// Write authority issued to one registered [`Reconciler`]
#[derive(Resource)]
pub struct ReconcilerGrant<R: Reconciler> {
    authority: WriteAuthority,
    _reconciler: PhantomData<fn() -> R>,
}

impl<R: Reconciler> ReconcilerGrant<R> {
    pub fn authority(&self) -> WriteAuthority {
        self.authority
    }
}

pub trait ReconcilerAppExt {
    /// Declares reconciler `R`, issues its grant and runs `systems` in [`ReconcileSet`].
    fn add_reconciler<R: Reconciler, M>(&mut self, systems: impl IntoScheduleConfigs<ScheduleSystem, M>) -> &mut Self;
}

impl ReconcilerAppExt for App {
    fn add_reconciler<R: Reconciler, M>(&mut self, systems: impl IntoScheduleConfigs<ScheduleSystem, M>) -> &mut Self {
        ensure_plugin(self, VelocityPlugin);

        crate::logger::log(&format!("Reconciler registered: {}", std::any::type_name::<R>()));

        self.insert_resource(ReconcilerGrant::<R> {
            authority: WriteAuthority::reconciliation(),
            _reconciler: PhantomData,
        })
        .add_systems(FixedUpdate, systems.in_set(ReconcileSet))
    }
}

/// Per-entity motion state
///
/// Инвариант: `instructions` пуст вне окна между producer phase и resolver phase.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component)]
pub struct Velocity {
    /// Server ground truth (resolver / integrator / reconciliation only)
    authoritative: Vec3,
    /// Последний вектор от клиента (только для сравнения, integrator не читает)
    client_reported: Vec3,
    instructions: Vec<Instruction>,
    /// Decay profile from the last configured instruction
    decay: Option<VelocityConfig>,
}

impl Velocity {
    /// Initial velocity at construction (assembly time, not a write)
    pub fn new(initial: Vec3) -> Self {
        Self {
            authoritative: initial,
            ..default()
        }
    }

    pub fn authoritative(&self) -> Vec3 {
        self.authoritative
    }

    pub fn client_reported(&self) -> Vec3 {
        self.client_reported
    }

    /// Network input path: stores what the remote peer claims, nothing else.
    pub fn record_client_report(&mut self, reported: Vec3) {
        self.client_reported = reported;
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn has_pending(&self) -> bool {
        !self.instructions.is_empty()
    }

    pub fn decay(&self) -> Option<&VelocityConfig> {
        self.decay.as_ref()
    }

    /// Shorthand for an `Add` instruction without config
    pub fn add_force(&mut self, delta: Vec3) {
        self.instructions.push(Instruction::add(delta));
    }

    pub fn add_instruction(&mut self, delta: Vec3, kind: InstructionKind, config: Option<VelocityConfig>) {
        self.instructions.push(Instruction { delta, kind, config });
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Privileged direct write
    pub fn set(&mut self, value: Vec3, _authority: WriteAuthority) {
        self.authoritative = value;
    }

    pub(crate) fn clear_decay(&mut self, _authority: WriteAuthority) {
        self.decay = None;
    }

    /// Folds and drains the queue. Returns false when there was nothing to fold.
    pub(crate) fn resolve(&mut self) -> bool {
        if self.instructions.is_empty() {
            return false;
        }

        let resolved = fold_instructions(self.authoritative, &self.instructions);
        if let Some(config) = self.instructions.iter().rev().find_map(|i| i.config) {
            self.decay = Some(config);
        }
        self.set(resolved, WriteAuthority::resolver());
        self.instructions.clear();
        true
    }
}

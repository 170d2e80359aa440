//! Motion Simulation Core
//!
//! Server-side tick pipeline на Bevy 0.16 (FixedUpdate):
//! Intake → Produce → Resolve → Integrate → React → Sync
//!
//! - Producers (input, knockback) только добавляют инструкции в Velocity
//! - Resolver сворачивает очереди, integrator двигает тела и репортит контакты
//! - Projectile state machine реагирует на контакты, Sync пишет snapshots
//!
//! Все structural changes идут через Commands и применяются в конце тика.

use std::time::Duration;

use bevy::ecs::event::event_update_system;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod components;
pub mod config;
pub mod knockback;
pub mod logger;
pub mod movement;
pub mod physics;
pub mod projectile;
pub mod replication;
pub mod schedule;
pub mod velocity;

// Re-export базовых типов для удобства
pub use components::*;
pub use config::{ConfigError, ConfigResult, SimulationConfig};
pub use knockback::{AttachPolicy, Knockback, KnockbackEvent, KnockbackPlugin, KnockbackSettings, PredictedKnockback};
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel, LogPrinter};
pub use movement::{JumpIntent, MovementInput, MovementPlugin, MovementSpeed};
pub use physics::{
    Aabb, BoxWorld, CollisionListener, ContactReport, ContactResponse, EntityBounced, EntityImpacted,
    FluidProperties, GeometrySource, IntegratorSettings, PhysicsPlugin, SpatialGrid, SpatialQuery, WorldGeometry,
};
pub use projectile::{
    spawn_projectile, Projectile, ProjectileAsset, ProjectileAssets, ProjectileDied, ProjectileEffect, ProjectileHit,
    ProjectilePlugin, ProjectileState, ShootProjectile,
};
pub use replication::{MotionSnapshot, MotionState, ReplicationPlugin};
pub use schedule::{MotionPipelineAppExt, MotionProducer, ParallelSettings, TickPipelinePlugin, TickSet};
pub use velocity::{
    Instruction, InstructionKind, ReconcileSet, Reconciler, ReconcilerAppExt, ReconcilerGrant, Velocity,
    VelocityConfig, VelocityPlugin, WriteAuthority,
};

/// Главный plugin симуляции (объединяет все подсистемы)
///
/// Конфигурация вставляется ресурсами один раз; геометрия мира инжектится
/// сюда же (по умолчанию - пол на y = 0).
pub struct SimulationPlugin {
    config: SimulationConfig,
    geometry: Option<WorldGeometry>,
}

impl Default for SimulationPlugin {
    fn default() -> Self {
        Self::new(SimulationConfig::default())
    }
}

impl SimulationPlugin {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config, geometry: None }
    }

    pub fn with_geometry(mut self, geometry: impl GeometrySource + 'static) -> Self {
        self.geometry = Some(WorldGeometry::new(geometry));
        self
    }
}

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        let config = &self.config;
        let physics = match &self.geometry {
            Some(geometry) => PhysicsPlugin::with_world(geometry.clone()),
            None => PhysicsPlugin::default(),
        };

        app
            // Fixed timestep для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(config.tick_rate))
            // Детерминистичный RNG (seed из конфига)
            .insert_resource(DeterministicRng::new(config.seed))
            .insert_resource(config.integrator)
            .insert_resource(config.knockback)
            .insert_resource(config.parallel)
            .insert_resource(config.projectile_assets())
            .insert_resource(config.clone())
            // Порядок важен: producers регистрируются в порядке объявления
            .add_plugins((
                TickPipelinePlugin,
                MovementPlugin,
                KnockbackPlugin,
                VelocityPlugin,
                physics,
                ProjectilePlugin,
                ReplicationPlugin,
            ));

        log_info(&format!(
            "SimulationPlugin: {} Hz, seed {}, {} projectile assets, knockback policy {:?}",
            config.tick_rate,
            config.seed,
            config.projectiles.len(),
            config.knockback.attach_policy
        ));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Создаёт headless App с полной симуляцией (config по умолчанию + seed)
pub fn create_headless_app(seed: u64) -> App {
    let config = SimulationConfig { seed, ..default() };
    create_simulation_app(SimulationPlugin::new(config))
}

/// Headless App с заданным plugin (своя конфигурация / геометрия)
pub fn create_simulation_app(simulation: SimulationPlugin) -> App {
    init_logger();
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, simulation));
    app
}

/// Один детерминированный тик: сдвигаем `Time<Fixed>` вручную и гоняем FixedUpdate.
///
/// `First` здесь не запускается, поэтому event buffers ротируются вручную
/// после каждого тика: событие живёт два тика, затем удаляется.
pub fn run_tick(app: &mut App, delta: Duration) {
    let world = app.world_mut();
    world.resource_mut::<Time<Fixed>>().advance_by(delta);
    world.run_schedule(FixedUpdate);

    if let Err(err) = world.run_system_cached(event_update_system) {
        log_error(&format!("Event buffer rotation failed: {:?}", err));
    }
}

/// `count` тиков с шагом из `Time<Fixed>`
pub fn run_ticks(app: &mut App, count: usize) {
    let timestep = app.world().resource::<Time<Fixed>>().timestep();
    for _ in 0..count {
        run_tick(app, timestep);
    }
}

/// Events of type `E` collected by an `EventReader` in `TickSet::Sync`.
///
/// Buffers rotate every tick, so headless runs and tests read history from here.
#[derive(Resource)]
pub struct EventLog<E: Event> {
    events: Vec<E>,
}

impl<E: Event> Default for EventLog<E> {
    fn default() -> Self {
        Self { events: Vec::new() }
    }
}

impl<E: Event> EventLog<E> {
    pub fn events(&self) -> &[E] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

fn collect_events<E: Event + Clone>(mut reader: EventReader<E>, mut log: ResMut<EventLog<E>>) {
    log.events.extend(reader.read().cloned());
}

pub trait EventLogAppExt {
    /// Starts collecting `E` into [`EventLog<E>`] (event must already be registered)
    fn record_events<E: Event + Clone>(&mut self) -> &mut Self;
}

impl EventLogAppExt for App {
    fn record_events<E: Event + Clone>(&mut self) -> &mut Self {
        schedule::ensure_plugin(self, TickPipelinePlugin);
        self.init_resource::<EventLog<E>>()
            .add_systems(FixedUpdate, collect_events::<E>.in_set(TickSet::Sync))
    }
}

/// Snapshot движения мира для сравнения детерминизма
///
/// Позиции и authoritative velocity побитово, отсортированные по Entity.
pub fn world_snapshot(world: &mut World) -> Vec<u8> {
    let mut query = world.query::<(Entity, &Transform, &Velocity)>();
    let mut entities: Vec<_> = query
        .iter(world)
        .map(|(entity, transform, velocity)| (entity, transform.translation, velocity.authoritative()))
        .collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _, _)| entity.to_bits());

    let mut snapshot = Vec::with_capacity(entities.len() * 32);
    for (entity, position, velocity) in entities {
        snapshot.extend_from_slice(&entity.to_bits().to_le_bytes());
        for value in position.to_array().into_iter().chain(velocity.to_array()) {
            snapshot.extend_from_slice(&value.to_bits().to_le_bytes());
        }
    }

    snapshot
}

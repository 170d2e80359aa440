//! Property-based тесты детерминизма
//!
//! Проверяем что симуляция с одинаковым seed даёт идентичные результаты,
//! независимо от того как entities разбиты на parallel batches.

use std::time::Duration;

use bevy::ecs::schedule::ExecutorKind;
use bevy::prelude::*;
use motion_simulation::{
    create_simulation_app, run_tick, world_snapshot, BoundingBox, BoxWorld, Knockback, MovementInput, MovementSpeed,
    ParallelSettings, PhysicsBody, ProjectileAsset, ShootProjectile, SimulationConfig, SimulationPlugin, Velocity,
};
use proptest::prelude::*;

const TICK: Duration = Duration::from_millis(16);

fn config(seed: u64, batch_size: Option<usize>) -> SimulationConfig {
    SimulationConfig {
        seed,
        parallel: ParallelSettings { batch_size },
        projectiles: vec![ProjectileAsset {
            id: "pellet".into(),
            gravity: 9.81,
            restitution: 0.4,
            muzzle_velocity: 25.0,
            ..default()
        }],
        ..default()
    }
}

/// Сцена: сетка тел с разными скоростями, часть с knockback/input, залп pellets
fn spawn_scene(world: &mut World, entity_count: usize) {
    for i in 0..entity_count {
        let x = (i % 10) as f32 * 1.5;
        let z = (i / 10) as f32 * 1.5;
        let mut entity = world.spawn((
            Transform::from_xyz(x, 1.0 + (i % 3) as f32, z),
            Velocity::new(Vec3::new((i % 5) as f32 - 2.0, 0.0, (i % 7) as f32 - 3.0)),
            PhysicsBody {
                restitution: if i % 4 == 0 { 0.5 } else { 0.0 },
                ..default()
            },
            motion_simulation::PhysicsValues::new(1.0 + i as f64 * 0.1, 0.2),
            BoundingBox::cube(0.4),
        ));

        if i % 3 == 0 {
            entity.insert(Knockback::new(Vec3::new(1.0, 2.0, 0.5), 0.3).with_modifiers([1.5]));
        }
        if i % 5 == 0 {
            entity.insert((MovementInput::walking(Vec3::Z), MovementSpeed::default()));
        }
    }

    for i in 0..6 {
        world.send_event(ShootProjectile {
            asset: "pellet".into(),
            origin: Vec3::new(-2.0, 1.0 + i as f32 * 0.3, i as f32),
            direction: Vec3::new(1.0, -0.1, 0.0),
            creator: None,
        });
    }
}

/// Запускает симуляцию и возвращает snapshot мира
fn run_simulation(seed: u64, batch_size: Option<usize>, single_threaded: bool, ticks: usize) -> Vec<u8> {
    let plugin = SimulationPlugin::new(config(seed, batch_size)).with_geometry(BoxWorld::new().with_ground(0.0));
    let mut app = create_simulation_app(plugin);

    if single_threaded {
        app.edit_schedule(FixedUpdate, |schedule| {
            schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        });
    }

    spawn_scene(app.world_mut(), 60);

    for _ in 0..ticks {
        run_tick(&mut app, TICK);
    }

    world_snapshot(app.world_mut())
}

#[test]
fn test_determinism_same_seed() {
    const SEED: u64 = 12345;

    let snapshot1 = run_simulation(SEED, None, false, 120);
    let snapshot2 = run_simulation(SEED, None, false, 120);

    assert!(!snapshot1.is_empty());
    assert_eq!(snapshot1, snapshot2, "Симуляция с одинаковым seed ({}) дала разные результаты!", SEED);
}

#[test]
fn test_batches_match_single_threaded() {
    let reference = run_simulation(42, Some(1), true, 90);

    for batch_size in [Some(1), Some(3), Some(16), Some(1000), None] {
        let snapshot = run_simulation(42, batch_size, false, 90);
        assert_eq!(
            reference, snapshot,
            "batch size {:?} разошёлся с single-threaded прогоном",
            batch_size
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn prop_any_batch_size_is_equivalent(batch_size in 1usize..64) {
        let reference = run_simulation(7, None, true, 40);
        let snapshot = run_simulation(7, Some(batch_size), false, 40);
        prop_assert_eq!(reference, snapshot);
    }
}

//! Headless симуляция движения
//!
//! Демо-сцена: пол, бассейн, NPC с knockback, игрок, залп projectiles.
//! `motion_simulation [config.json] [ticks]`

use bevy::prelude::*;
use motion_simulation::{
    create_simulation_app, init_logger, log_error, log_info, run_ticks, Aabb, BoundingBox, BoxWorld, CollisionListener,
    FluidProperties, Knockback, KnockbackEvent, MotionSnapshot, MovementInput, MovementSpeed, PhysicsBody, Player,
    ProjectileHit, ShootProjectile, SimulationConfig, SimulationPlugin, TickSet, Velocity,
};

/// Projectile hits since start (buffers rotate every tick)
#[derive(Resource, Default)]
struct HitCounter(usize);

fn count_hits(mut hits: EventReader<ProjectileHit>, mut counter: ResMut<HitCounter>) {
    counter.0 += hits.read().count();
}

fn load_config(path: Option<String>) -> SimulationConfig {
    let Some(path) = path else {
        return SimulationConfig::default();
    };

    match SimulationConfig::from_path(&path) {
        Ok(config) => {
            log_info(&format!("Loaded configuration from {}", path));
            config
        }
        Err(err) => {
            log_error(&format!("Config {} rejected ({}), using defaults", path, err));
            SimulationConfig::default()
        }
    }
}

fn demo_world() -> BoxWorld {
    BoxWorld::new()
        .with_ground(0.0)
        .with_solid(Aabb::new(Vec3::new(12.0, 0.0, -4.0), Vec3::new(12.5, 3.0, 4.0)))
        .with_fluid(
            Aabb::new(Vec3::new(-10.0, 0.0, -10.0), Vec3::new(-4.0, 2.0, -4.0)),
            FluidProperties::default(),
        )
}

fn spawn_demo_scene(world: &mut World, config: &SimulationConfig) {
    let npc = world
        .spawn((
            Transform::from_xyz(6.0, 0.91, 0.0),
            Velocity::default(),
            PhysicsBody::default(),
            config.default_physics,
            BoundingBox::default(),
            MotionSnapshot::default(),
        ))
        .id();

    let player = world
        .spawn((
            Player,
            Transform::from_xyz(0.0, 0.91, 0.0),
            Velocity::default(),
            PhysicsBody::default(),
            config.default_physics,
            BoundingBox::default(),
            MovementInput::walking(Vec3::X),
            MovementSpeed::default(),
            CollisionListener::default(),
            MotionSnapshot::default(),
        ))
        .id();

    world.spawn((
        Transform::from_xyz(-7.0, 3.0, -7.0),
        Velocity::default(),
        PhysicsBody::default(),
        config.default_physics,
        BoundingBox::cube(0.3),
    ));

    world.send_event(KnockbackEvent {
        target: npc,
        knockback: Knockback::new(Vec3::new(6.0, 3.0, 0.0), 0.25).with_modifiers([0.8]),
    });

    let Some(asset) = config.projectiles.first() else {
        log_info("No projectile assets configured, skipping volley");
        return;
    };
    for (i, angle) in [-0.2_f32, 0.0, 0.2].into_iter().enumerate() {
        world.send_event(ShootProjectile {
            asset: asset.id.clone(),
            origin: Vec3::new(0.5, 1.5 + i as f32 * 0.1, 0.0),
            direction: Vec3::new(angle.cos(), 0.0, angle.sin()),
            creator: Some(player),
        });
    }
}

fn main() {
    init_logger();

    let mut args = std::env::args().skip(1);
    let config = load_config(args.next());
    let ticks: usize = args.next().and_then(|t| t.parse().ok()).unwrap_or(600);

    log_info(&format!("Starting headless motion simulation (seed: {})", config.seed));

    let mut app = create_simulation_app(SimulationPlugin::new(config.clone()).with_geometry(demo_world()));
    app.init_resource::<HitCounter>()
        .add_systems(FixedUpdate, count_hits.in_set(TickSet::Sync));
    spawn_demo_scene(app.world_mut(), &config);

    let report_every = (config.tick_rate.round() as usize).max(1);
    let mut elapsed = 0;
    while elapsed < ticks {
        let batch = report_every.min(ticks - elapsed);
        run_ticks(&mut app, batch);
        elapsed += batch;

        let world = app.world();
        let hits = world.resource::<HitCounter>().0;
        log_info(&format!("Tick {}: {} entities, {} hits so far", elapsed, world.entities().len(), hits));
    }

    log_info("Simulation complete!");
}

//! Integration tests: projectile lifecycle на полном pipeline
//!
//! shoot → InFlight → (bounce)* → impact → Impacted → dead timer → Dead → despawn

use std::time::Duration;

use bevy::prelude::*;
use motion_simulation::{
    create_simulation_app, run_tick, Aabb, BoundingBox, BoxWorld, EntityBounced, EventLog, EventLogAppExt, Knockback,
    KnockbackEvent,
    PhysicsBody, PhysicsValues, Projectile, ProjectileAsset, ProjectileDied, ProjectileEffect, ProjectileHit,
    ProjectileState, ShootProjectile, SimulationConfig, SimulationPlugin, Velocity,
};
use motion_simulation::projectile::{EffectKind, KnockbackProfile};

const HALF_SECOND: Duration = Duration::from_millis(500);
const FRAME: Duration = Duration::from_nanos(16_666_667);

fn assets() -> Vec<ProjectileAsset> {
    vec![
        ProjectileAsset {
            id: "slug".into(),
            muzzle_velocity: 40.0,
            dead_time: 2.0,
            knockback: Some(KnockbackProfile::default()),
            ..default()
        },
        ProjectileAsset {
            id: "grenade".into(),
            muzzle_velocity: 10.0,
            gravity: 9.81,
            restitution: 0.5,
            dead_time: 2.0,
            bounce_effect: Some("thud".into()),
            ..default()
        },
    ]
}

fn app(world: BoxWorld) -> App {
    let config = SimulationConfig {
        projectiles: assets(),
        ..default()
    };
    let mut app = create_simulation_app(SimulationPlugin::new(config).with_geometry(world));
    app.record_events::<ProjectileDied>()
        .record_events::<ProjectileEffect>()
        .record_events::<ProjectileHit>()
        .record_events::<KnockbackEvent>()
        .record_events::<EntityBounced>();
    app
}

fn shoot(app: &mut App, asset: &str, origin: Vec3, direction: Vec3, creator: Option<Entity>) {
    app.world_mut().send_event(ShootProjectile {
        asset: asset.into(),
        origin,
        direction,
        creator,
    });
}

fn only_projectile(app: &mut App) -> Option<(Entity, ProjectileState)> {
    let world = app.world_mut();
    let mut query = world.query::<(Entity, &Projectile)>();
    let found: Vec<_> = query.iter(world).map(|(entity, p)| (entity, p.state())).collect();
    assert!(found.len() <= 1, "expected at most one projectile");
    found.first().copied()
}

#[test]
fn test_wall_impact_then_dead_after_four_half_second_ticks() {
    let wall = Aabb::new(Vec3::new(5.0, 0.0, -5.0), Vec3::new(6.0, 5.0, 5.0));
    let mut app = app(BoxWorld::new().with_ground(0.0).with_solid(wall));

    shoot(&mut app, "slug", Vec3::new(0.0, 1.5, 0.0), Vec3::X, None);
    run_tick(&mut app, HALF_SECOND);
    let (slug, state) = only_projectile(&mut app).expect("spawned at end of first tick");
    assert_eq!(state, ProjectileState::InFlight);

    // 20 м за тик - упирается в стену, не пролетает
    run_tick(&mut app, HALF_SECOND);
    assert_eq!(only_projectile(&mut app), Some((slug, ProjectileState::Impacted)));
    let x = app.world().get::<Transform>(slug).map(|t| t.translation.x).unwrap_or_default();
    assert!(x < 5.0 && x > 4.9, "stopped at the wall, x = {}", x);
    assert!(app.world().get::<PhysicsBody>(slug).is_some_and(|body| !body.active));

    for tick in 1..=3 {
        run_tick(&mut app, HALF_SECOND);
        assert_eq!(
            only_projectile(&mut app),
            Some((slug, ProjectileState::Impacted)),
            "dead timer tick {}",
            tick
        );
    }

    run_tick(&mut app, HALF_SECOND);
    assert!(only_projectile(&mut app).is_none(), "despawned on the fourth tick");

    let world = app.world();
    let died = world.resource::<EventLog<ProjectileDied>>().events();
    assert_eq!(died.len(), 1);
    assert!(died[0].has_impacted);

    let kinds: Vec<_> = world
        .resource::<EventLog<ProjectileEffect>>()
        .events()
        .iter()
        .map(|effect| effect.kind)
        .collect();
    assert_eq!(kinds, vec![EffectKind::Impact, EffectKind::Death]);
    // Стена - не entity
    assert!(world.resource::<EventLog<ProjectileHit>>().is_empty());
}

#[test]
fn test_grenade_bounces_and_stays_in_flight() {
    let mut app = app(BoxWorld::new().with_ground(0.0));

    shoot(&mut app, "grenade", Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, None);
    for _ in 0..30 {
        run_tick(&mut app, FRAME);
    }

    let (grenade, state) = only_projectile(&mut app).expect("grenade alive");
    assert_eq!(state, ProjectileState::InFlight);

    let world = app.world();
    assert!(!world.resource::<EventLog<EntityBounced>>().is_empty());
    let bounce_effects: Vec<_> = world
        .resource::<EventLog<ProjectileEffect>>()
        .events()
        .iter()
        .filter(|effect| effect.kind == EffectKind::Bounce)
        .collect();
    assert!(!bounce_effects.is_empty());
    assert_eq!(bounce_effects[0].effect.as_deref(), Some("thud"));
    assert!(world.get::<Velocity>(grenade).is_some_and(|v| v.authoritative().y > 0.0));
}

#[test]
fn test_hit_on_entity_ignores_creator_and_knocks_target() {
    let mut app = app(BoxWorld::new().with_ground(0.0));

    let body = |x: f32| {
        (
            Transform::from_xyz(x, 0.9, 0.0),
            Velocity::default(),
            PhysicsBody::default(),
            PhysicsValues::default(),
            BoundingBox::default(),
        )
    };
    let shooter = app.world_mut().spawn(body(0.0)).id();
    let target = app.world_mut().spawn(body(5.0)).id();

    // Старт внутри бокса стрелка: его collider игнорируется
    shoot(&mut app, "slug", Vec3::new(0.0, 1.0, 0.0), Vec3::X, Some(shooter));
    for _ in 0..20 {
        run_tick(&mut app, FRAME);
    }

    let world = app.world();
    let hits = world.resource::<EventLog<ProjectileHit>>().events();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].target, target);
    assert_eq!(hits[0].shooter, Some(shooter));

    let knockbacks = world.resource::<EventLog<KnockbackEvent>>().events();
    assert_eq!(knockbacks.len(), 1);
    assert!(knockbacks[0].knockback.base_velocity.x > 0.0);

    let pushed = world.get::<Knockback>(target).is_some()
        || world.get::<Transform>(target).is_some_and(|t| t.translation.x > 5.0);
    assert!(pushed, "target received knockback");
    assert_eq!(world.get::<Transform>(shooter).map(|t| t.translation.x), Some(0.0));
}

#[test]
fn test_ttl_kills_projectile_in_flight() {
    let mut app = app(BoxWorld::new());
    app.world_mut().resource_mut::<motion_simulation::ProjectileAssets>().insert(ProjectileAsset {
        id: "flare".into(),
        muzzle_velocity: 1.0,
        time_to_live: 1.0,
        ..default()
    });

    shoot(&mut app, "flare", Vec3::new(0.0, 50.0, 0.0), Vec3::Y, None);
    run_tick(&mut app, HALF_SECOND);
    assert!(only_projectile(&mut app).is_some());

    run_tick(&mut app, HALF_SECOND);
    assert!(only_projectile(&mut app).is_some(), "ttl 0.5 left");
    run_tick(&mut app, HALF_SECOND);
    assert!(only_projectile(&mut app).is_none(), "ttl exhausted");

    let died = app.world().resource::<EventLog<ProjectileDied>>().events();
    assert_eq!(died.len(), 1);
    assert!(!died[0].has_impacted);
}

//! Tests for knockback systems (intake policy + producers).

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::prelude::*;

    use crate::components::Player;
    use crate::knockback::{AttachPolicy, Knockback, KnockbackEvent, KnockbackPlugin, KnockbackSettings, PredictedKnockback};
    use crate::schedule::TickPipelinePlugin;
    use crate::run_tick;
    use crate::velocity::Velocity;

    const TICK: Duration = Duration::from_millis(250);

    fn app_with(settings: KnockbackSettings) -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .insert_resource(Time::<Fixed>::default())
            .insert_resource(settings)
            .add_plugins((TickPipelinePlugin, KnockbackPlugin));
        app
    }

    fn tick(app: &mut App) {
        run_tick(app, TICK);
    }

    fn send(app: &mut App, target: Entity, knockback: Knockback) {
        app.world_mut().send_event(KnockbackEvent { target, knockback });
    }

    #[test]
    fn test_attach_then_detach_on_exact_tick() {
        let mut app = app_with(KnockbackSettings::default());
        let npc = app.world_mut().spawn(Velocity::default()).id();
        // Компонент вставлен напрямую: attach через события проверяется отдельно
        app.world_mut().entity_mut(npc).insert(Knockback::new(Vec3::X, 0.5));

        tick(&mut app);
        assert!(app.world().get::<Knockback>(npc).is_some(), "tick 1: elapsed 0.25");
        tick(&mut app);
        assert!(app.world().get::<Knockback>(npc).is_some(), "tick 2: elapsed 0.5");
        tick(&mut app);
        assert!(app.world().get::<Knockback>(npc).is_none(), "tick 3: elapsed 0.75 > 0.5");
    }

    #[test]
    fn test_elapsed_tracks_sixtieth_second_ticks() {
        let frame = Duration::from_secs_f64(1.0 / 60.0);
        let dt = frame.as_secs_f32();
        let mut app = app_with(KnockbackSettings::default());
        // 0.105 лежит между 6 и 7 кадрами, граница не зависит от округления
        let npc = app
            .world_mut()
            .spawn((Velocity::default(), Knockback::new(Vec3::X, 0.105)))
            .id();

        for n in 1..=6 {
            run_tick(&mut app, frame);
            let elapsed = app.world().get::<Knockback>(npc).map(|k| k.elapsed);
            let elapsed = elapsed.unwrap_or_else(|| panic!("detached early on tick {}", n));
            assert!(
                (elapsed - n as f32 * dt).abs() < 1e-5,
                "tick {}: elapsed {} vs {}",
                n,
                elapsed,
                n as f32 * dt
            );
        }

        run_tick(&mut app, frame);
        assert!(app.world().get::<Knockback>(npc).is_none(), "tick 7: elapsed > 0.105");
        // Семь кадров, семь инструкций (resolver не зарегистрирован)
        assert_eq!(app.world().get::<Velocity>(npc).map(|v| v.instructions().len()), Some(7));
    }

    #[test]
    fn test_direct_knockback_enqueues_instruction() {
        let mut app = app_with(KnockbackSettings::default());
        let npc = app
            .world_mut()
            .spawn((Velocity::default(), Knockback::new(Vec3::new(2.0, 0.0, 0.0), 1.0).with_modifiers([1.5])))
            .id();

        tick(&mut app);

        // Resolver в этом App не зарегистрирован - инструкция остаётся в очереди
        let velocity = app.world().get::<Velocity>(npc).expect("velocity");
        assert_eq!(velocity.instructions().len(), 1);
        assert_eq!(velocity.instructions()[0].delta, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_event_attach_is_visible_next_tick() {
        let mut app = app_with(KnockbackSettings::default());
        let npc = app.world_mut().spawn(Velocity::default()).id();

        send(&mut app, npc, Knockback::new(Vec3::Z, 1.0));
        tick(&mut app);

        let knockback = app.world().get::<Knockback>(npc).expect("attached at end of tick");
        assert_eq!(knockback.elapsed, 0.0);
        assert!(app.world().get::<Velocity>(npc).map_or(false, |v| v.instructions().is_empty()));
    }

    #[test]
    fn test_replace_policy_resets_active_knockback() {
        let mut app = app_with(KnockbackSettings::default());
        let npc = app.world_mut().spawn((Velocity::default(), Knockback::new(Vec3::X, 1.0))).id();

        tick(&mut app);
        send(&mut app, npc, Knockback::new(Vec3::Y, 2.0));
        tick(&mut app);

        let knockback = app.world().get::<Knockback>(npc).expect("still attached");
        assert_eq!(knockback.base_velocity, Vec3::Y);
        // Заменён в Intake, затем один тик Produce
        assert_eq!(knockback.elapsed, 0.25);
    }

    #[test]
    fn test_reject_policy_keeps_first() {
        let settings = KnockbackSettings {
            attach_policy: AttachPolicy::Reject,
            ..default()
        };
        let mut app = app_with(settings);
        let npc = app.world_mut().spawn(Velocity::default()).id();

        send(&mut app, npc, Knockback::new(Vec3::X, 1.0));
        send(&mut app, npc, Knockback::new(Vec3::Y, 1.0));
        tick(&mut app);

        let knockback = app.world().get::<Knockback>(npc).expect("first attached");
        assert_eq!(knockback.base_velocity, Vec3::X);
    }

    #[test]
    fn test_player_knockback_goes_to_channel() {
        let mut app = app_with(KnockbackSettings::default());
        let player = app
            .world_mut()
            .spawn((Player, Velocity::default(), Knockback::new(Vec3::X, 1.0)))
            .id();

        tick(&mut app);

        let world = app.world();
        assert!(world.get::<Velocity>(player).map_or(false, |v| v.instructions().is_empty()));
        let channel = world.get::<PredictedKnockback>(player).expect("required by Player");
        assert_eq!(channel.pending().len(), 1);
    }

    #[test]
    fn test_player_falls_back_to_direct_when_disabled() {
        let settings = KnockbackSettings {
            prediction_enabled: false,
            ..default()
        };
        let mut app = app_with(settings);
        let player = app
            .world_mut()
            .spawn((Player, Velocity::default(), Knockback::new(Vec3::X, 1.0)))
            .id();

        tick(&mut app);

        let world = app.world();
        assert_eq!(world.get::<Velocity>(player).map(|v| v.instructions().len()), Some(1));
        assert!(world.get::<PredictedKnockback>(player).map_or(false, |c| c.pending().is_empty()));
    }
}

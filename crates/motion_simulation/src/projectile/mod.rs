//! Projectile domain - state machine, assembly, launch requests
//!
//! Содержит:
//! - Projectile (InFlight → Impacted → Dead)
//! - ProjectileAsset / ProjectileAssets (configuration)
//! - ShootProjectile, ProjectileHit, ProjectileEffect, ProjectileDied events
//! - spawn_projectile (единственный способ собрать projectile)

pub mod components;
pub mod events;
pub mod systems;


pub use components::*;
pub use events::*;
pub use systems::*;

use bevy::prelude::*;

use crate::knockback::KnockbackEvent;
use crate::schedule::{ensure_plugin, TickPipelinePlugin, TickSet};
use crate::DeterministicRng;

pub struct ProjectilePlugin;

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        ensure_plugin(app, TickPipelinePlugin);
        app.init_resource::<ProjectileAssets>()
            .init_resource::<DeterministicRng>()
            .add_event::<ShootProjectile>()
            .add_event::<ProjectileHit>()
            .add_event::<ProjectileEffect>()
            .add_event::<ProjectileDied>()
            .add_event::<KnockbackEvent>()
            .add_systems(FixedUpdate, fire_projectiles.in_set(TickSet::Intake))
            .add_systems(
                FixedUpdate,
                (tick_projectile_timers, handle_projectile_contacts)
                    .chain_ignore_deferred()
                    .in_set(TickSet::React),
            );
    }
}

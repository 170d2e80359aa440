//! Projectile components and assets
//!
//! State machine:
//! - `InFlight` (вход только через `shoot`) - bounce оставляет в InFlight,
//!   impact переводит в `Impacted`
//! - `Impacted` - эффекты попадания один раз на входе, тикает dead timer
//! - `Dead` - терминальное, death effects + despawn через Commands
//!
//! Обратного перехода в InFlight нет.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::velocity::Velocity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum ProjectileState {
    InFlight,
    Impacted,
    Dead,
}

/// Projectile state machine component
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Projectile {
    state: ProjectileState,
    /// Seconds left in `Impacted` before the projectile dies
    dead_timer: f32,
    dead_time: f32,
    has_impacted: bool,
    creator: Option<Entity>,
    asset: String,
}

impl Projectile {
    /// Enters `InFlight`: returns the state machine plus the launch velocity.
    pub fn shoot(asset: &ProjectileAsset, direction: Vec3, creator: Option<Entity>) -> (Self, Velocity) {
        let projectile = Self {
            state: ProjectileState::InFlight,
            dead_timer: 0.0,
            dead_time: asset.dead_time.max(0.0),
            has_impacted: false,
            creator,
            asset: asset.id.clone(),
        };
        let velocity = Velocity::new(direction.normalize_or_zero() * asset.muzzle_velocity);
        (projectile, velocity)
    }

    pub fn state(&self) -> ProjectileState {
        self.state
    }

    pub fn creator(&self) -> Option<Entity> {
        self.creator
    }

    pub fn asset_id(&self) -> &str {
        &self.asset
    }

    pub fn has_impacted(&self) -> bool {
        self.has_impacted
    }

    pub fn dead_timer(&self) -> f32 {
        self.dead_timer
    }

    /// True if the bounce should produce effects (only while in flight)
    pub fn on_bounce(&self) -> bool {
        self.state == ProjectileState::InFlight
    }

    /// `InFlight → Impacted`. Returns true on the transition only.
    pub fn on_impact(&mut self) -> bool {
        if self.state != ProjectileState::InFlight {
            return false;
        }
        self.state = ProjectileState::Impacted;
        self.has_impacted = true;
        self.dead_timer = self.dead_time;
        true
    }

    /// Decrements the dead timer while `Impacted`; true once it is used up.
    pub fn consume_dead_timer(&mut self, delta: f32) -> bool {
        if self.state != ProjectileState::Impacted {
            return false;
        }
        self.dead_timer -= delta;
        self.dead_timer <= 0.0
    }

    /// `* → Dead`. Returns true on the transition only.
    pub fn kill(&mut self) -> bool {
        if self.state == ProjectileState::Dead {
            return false;
        }
        self.state = ProjectileState::Dead;
        true
    }
}

/// Knockback applied to whatever a projectile hits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockbackProfile {
    /// m/s along the hit direction
    pub speed: f32,
    /// Extra upward m/s
    pub lift: f32,
    pub duration: f32,
}

impl Default for KnockbackProfile {
    fn default() -> Self {
        Self {
            speed: 4.0,
            lift: 1.0,
            duration: 0.25,
        }
    }
}

/// Projectile definition (configuration)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileAsset {
    pub id: String,
    /// m/s
    pub muzzle_velocity: f32,
    pub gravity: f32,
    pub restitution: f32,
    pub mass: f64,
    pub drag_coefficient: f64,
    /// Seconds between impact and death
    pub dead_time: f32,
    /// Seconds in flight before the projectile is killed
    pub time_to_live: f32,
    pub damage: u32,
    pub half_size: f32,
    pub knockback: Option<KnockbackProfile>,
    pub bounce_effect: Option<String>,
    pub impact_effect: Option<String>,
    pub death_effect: Option<String>,
}

impl Default for ProjectileAsset {
    fn default() -> Self {
        Self {
            id: String::from("bullet"),
            muzzle_velocity: 40.0,
            gravity: 0.0,
            restitution: 0.0,
            mass: 0.05,
            drag_coefficient: 0.0,
            dead_time: 2.0,
            time_to_live: 10.0,
            damage: 10,
            half_size: 0.05,
            knockback: None,
            bounce_effect: None,
            impact_effect: Some(String::from("impact_spark")),
            death_effect: None,
        }
    }
}

/// Loaded projectile assets by id
#[derive(Resource, Debug, Clone, Default)]
pub struct ProjectileAssets {
    assets: HashMap<String, ProjectileAsset>,
}

impl ProjectileAssets {
    pub fn from_assets(assets: impl IntoIterator<Item = ProjectileAsset>) -> Self {
        let mut loaded = Self::default();
        for asset in assets {
            loaded.insert(asset);
        }
        loaded
    }

    pub fn insert(&mut self, asset: ProjectileAsset) {
        self.assets.insert(asset.id.clone(), asset);
    }

    pub fn get(&self, id: &str) -> Option<&ProjectileAsset> {
        self.assets.get(id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

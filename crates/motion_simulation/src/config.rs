//! Simulation configuration (JSON, loaded once at startup)

use std::collections::HashSet;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::PhysicsValues;
use crate::knockback::KnockbackSettings;
use crate::physics::IntegratorSettings;
use crate::projectile::{ProjectileAsset, ProjectileAssets};
use crate::schedule::ParallelSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// NaN is not positive
fn is_positive(value: f64) -> bool {
    value > 0.0
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// FixedUpdate rate (Hz)
    pub tick_rate: f64,
    pub seed: u64,
    pub integrator: IntegratorSettings,
    pub knockback: KnockbackSettings,
    pub parallel: ParallelSettings,
    /// Physics values for bodies spawned without explicit ones
    pub default_physics: PhysicsValues,
    pub projectiles: Vec<ProjectileAsset>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            seed: 42,
            integrator: IntegratorSettings::default(),
            knockback: KnockbackSettings::default(),
            parallel: ParallelSettings::default(),
            default_physics: PhysicsValues::default(),
            projectiles: vec![ProjectileAsset::default()],
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !is_positive(self.tick_rate) {
            return Err(ConfigError::Invalid(format!("tick_rate must be positive, got {}", self.tick_rate)));
        }
        if !is_positive(self.default_physics.mass()) {
            return Err(ConfigError::Invalid(format!(
                "default_physics.mass must be positive, got {}",
                self.default_physics.mass()
            )));
        }
        if self.integrator.max_substep_distance <= 0.0 {
            return Err(ConfigError::Invalid("integrator.max_substep_distance must be positive".into()));
        }

        let mut ids = HashSet::new();
        for asset in &self.projectiles {
            if !ids.insert(asset.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate projectile asset id '{}'", asset.id)));
            }
            if !is_positive(asset.mass) {
                return Err(ConfigError::Invalid(format!("projectile '{}': mass must be positive", asset.id)));
            }
            if asset.dead_time < 0.0 || asset.time_to_live < 0.0 {
                return Err(ConfigError::Invalid(format!("projectile '{}': negative duration", asset.id)));
            }
            if let Some(knockback) = asset.knockback {
                if knockback.duration < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "projectile '{}': negative knockback duration",
                        asset.id
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn projectile_assets(&self) -> ProjectileAssets {
        ProjectileAssets::from_assets(self.projectiles.iter().cloned())
    }
}

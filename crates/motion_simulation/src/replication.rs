//! Replication snapshots
//!
//! Sync phase пишет состояние движения в `MotionSnapshot`; версия растёт
//! только при изменении. Сетевой слой берёт `encoded()` - JSON payload
//! кэшируется по версии и пересобирается только после bump.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::PhysicsBody;
use crate::schedule::{ensure_plugin, ParallelSettings, TickPipelinePlugin, TickSet};
use crate::velocity::Velocity;

/// Replicated motion state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
}

#[derive(Serialize)]
struct Payload<'a> {
    version: u64,
    state: &'a MotionState,
}

#[derive(Component, Debug, Clone, Default)]
pub struct MotionSnapshot {
    version: u64,
    state: Option<MotionState>,
    cached: Option<(u64, String)>,
}

impl MotionSnapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn state(&self) -> Option<&MotionState> {
        self.state.as_ref()
    }

    /// Stores `state`; bumps the version and returns true if it changed.
    pub fn update(&mut self, state: MotionState) -> bool {
        if self.state.as_ref() == Some(&state) {
            return false;
        }
        self.state = Some(state);
        self.version += 1;
        true
    }

    /// Serialized payload for the current version (`None` before the first update)
    pub fn encoded(&mut self) -> Result<Option<&str>, serde_json::Error> {
        let Some(state) = self.state.as_ref() else {
            return Ok(None);
        };

        let stale = self.cached.as_ref().map_or(true, |(version, _)| *version != self.version);
        if stale {
            let payload = serde_json::to_string(&Payload {
                version: self.version,
                state,
            })?;
            self.cached = Some((self.version, payload));
        }

        Ok(self.cached.as_ref().map(|(_, payload)| payload.as_str()))
    }

    /// Version the cache was built for (diagnostics)
    pub fn cached_version(&self) -> Option<u64> {
        self.cached.as_ref().map(|(version, _)| *version)
    }
}

pub struct ReplicationPlugin;

impl Plugin for ReplicationPlugin {
    fn build(&self, app: &mut App) {
        ensure_plugin(app, TickPipelinePlugin);
        app.add_systems(FixedUpdate, publish_motion_snapshots.in_set(TickSet::Sync));
    }
}

/// Система: Transform + Velocity → MotionSnapshot (Sync phase)
pub fn publish_motion_snapshots(
    mut query: Query<(&Transform, &Velocity, Option<&PhysicsBody>, &mut MotionSnapshot)>,
    parallel: Res<ParallelSettings>,
) {
    query
        .par_iter_mut()
        .batching_strategy(parallel.batching())
        .for_each(|(transform, velocity, body, mut snapshot)| {
            snapshot.update(MotionState {
                position: transform.translation,
                velocity: velocity.authoritative(),
                on_ground: body.is_some_and(|body| body.on_ground),
            });
        });
}

//! Physics integration
//!
//! Integrate phase (chained):
//! 1. `rebuild_spatial_grid` - snapshot позиций для entity-entity contacts
//! 2. `integrate_bodies` - forces + sweep + response (parallel)
//! 3. `dispatch_collision_events` - bounce/impact callbacks
//!
//! Геометрия мира приходит снаружи через [`GeometrySource`].

pub mod collision;
pub mod events;
pub mod integrator;
pub mod spatial;

use std::sync::Arc;

use bevy::prelude::*;

pub use collision::{Aabb, BoxWorld, Contact, ContactSource, FluidProperties, FluidSample, GeometrySource};
pub use events::{CollisionListener, ContactReport, EntityBounced, EntityImpacted};
pub use integrator::{
    classify_contact, integrate_bodies, respond_to_contact, step_body, ContactResponse, IntegratorSettings,
    StepContext, StepOutcome, StepResult,
};
pub use spatial::{SpatialEntry, SpatialGrid, SpatialQuery};

use crate::components::expire_time_to_live;
use crate::schedule::{ensure_plugin, TickPipelinePlugin, TickSet};

/// World geometry provider shared by all integrator workers
#[derive(Resource, Clone)]
pub struct WorldGeometry(Arc<dyn GeometrySource>);

impl WorldGeometry {
    pub fn new(source: impl GeometrySource + 'static) -> Self {
        Self(Arc::new(source))
    }

    pub fn source(&self) -> &dyn GeometrySource {
        self.0.as_ref()
    }
}

impl Default for WorldGeometry {
    fn default() -> Self {
        Self::new(BoxWorld::new().with_ground(0.0))
    }
}

/// Physics plugin
///
/// Без явной геометрии - плоский пол на y = 0.
#[derive(Default)]
pub struct PhysicsPlugin {
    geometry: Option<WorldGeometry>,
}

impl PhysicsPlugin {
    pub fn new(geometry: impl GeometrySource + 'static) -> Self {
        Self {
            geometry: Some(WorldGeometry::new(geometry)),
        }
    }
}

impl PhysicsPlugin {
    pub fn with_world(geometry: WorldGeometry) -> Self {
        Self {
            geometry: Some(geometry),
        }
    }
}

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        ensure_plugin(app, TickPipelinePlugin);

        match &self.geometry {
            Some(geometry) => {
                app.insert_resource(geometry.clone());
            }
            None => {
                app.init_resource::<WorldGeometry>();
            }
        }

        app.init_resource::<IntegratorSettings>()
            .init_resource::<SpatialGrid>()
            .add_event::<EntityBounced>()
            .add_event::<EntityImpacted>()
            .add_systems(
                FixedUpdate,
                (
                    spatial::rebuild_spatial_grid,
                    integrate_bodies,
                    events::dispatch_collision_events,
                )
                    .chain()
                    .in_set(TickSet::Integrate),
            )
            .add_systems(FixedUpdate, expire_time_to_live.in_set(TickSet::React));
    }
}

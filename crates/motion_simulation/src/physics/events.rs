//! Collision callbacks
//!
//! Integrator пишет контакты в `CollisionListener` (параллельно, per entity),
//! `dispatch_collision_events` переводит их в события по одному на контакт,
//! в порядке возникновения внутри тика.

use bevy::prelude::*;

use super::integrator::ContactResponse;

/// One contact produced during integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactReport {
    /// Box center after backing off the surface
    pub point: Vec3,
    pub normal: Vec3,
    /// `None` = world geometry
    pub other: Option<Entity>,
    pub response: ContactResponse,
    /// Speed along `-normal` before the response
    pub impact_speed: f32,
}

/// Registration point for bounce/impact callbacks
///
/// Entity без этого компонента контакты не репортит.
#[derive(Component, Debug, Clone, Default)]
pub struct CollisionListener {
    pub pending: Vec<ContactReport>,
}

/// Event: контакт с отскоком
#[derive(Event, Debug, Clone)]
pub struct EntityBounced {
    pub entity: Entity,
    pub contact: ContactReport,
}

/// Event: контакт без отскока (slide/rest или попадание в entity)
#[derive(Event, Debug, Clone)]
pub struct EntityImpacted {
    pub entity: Entity,
    pub contact: ContactReport,
}

pub fn dispatch_collision_events(
    mut listeners: Query<(Entity, &mut CollisionListener)>,
    mut bounced: EventWriter<EntityBounced>,
    mut impacted: EventWriter<EntityImpacted>,
) {
    let mut drained: Vec<(Entity, Vec<ContactReport>)> = listeners
        .iter_mut()
        .filter(|(_, listener)| !listener.pending.is_empty())
        .map(|(entity, mut listener)| (entity, std::mem::take(&mut listener.pending)))
        .collect();

    // Query order не стабилен между запусками с разными batch sizes
    drained.sort_by_key(|(entity, _)| entity.to_bits());

    for (entity, contacts) in drained {
        for contact in contacts {
            if contact.response == ContactResponse::Bounce && contact.other.is_none() {
                bounced.write(EntityBounced { entity, contact });
            } else {
                impacted.write(EntityImpacted { entity, contact });
            }
        }
    }
}

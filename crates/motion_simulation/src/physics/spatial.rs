//! Spatial index for entity-entity collision candidates
//!
//! Uniform hash grid, full rebuild each tick (before integration) from the
//! positions at the start of the Integrate phase. Integrator читает снапшот,
//! поэтому параллельная запись Transform не конфликтует с запросами.

use std::collections::HashMap;

use bevy::prelude::*;

use super::collision::Aabb;
use crate::components::{BoundingBox, PhysicsBody};

/// Candidate returned by a spatial query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry {
    pub entity: Entity,
    pub bounds: Aabb,
}

/// Provider interface: nearby dynamic bodies
pub trait SpatialQuery: Send + Sync {
    fn query_nearby(&self, position: Vec3, radius: f32) -> Vec<SpatialEntry>;
}

#[derive(Resource, Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<SpatialEntry>>,
    entries: usize,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(0.01),
            cells: HashMap::new(),
            entries: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    pub fn clear(&mut self) {
        // Сохраняем аллокации ячеек между тиками
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
        self.entries = 0;
    }

    #[inline]
    fn cell_of(&self, point: Vec3) -> IVec3 {
        (point / self.cell_size).floor().as_ivec3()
    }

    /// Registers `entity` in every cell its bounds touch
    pub fn insert(&mut self, entity: Entity, bounds: Aabb) {
        let min = self.cell_of(bounds.min);
        let max = self.cell_of(bounds.max);
        let entry = SpatialEntry { entity, bounds };

        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.cells.entry(IVec3::new(x, y, z)).or_default().push(entry);
                }
            }
        }
        self.entries += 1;
    }
}

impl SpatialQuery for SpatialGrid {
    fn query_nearby(&self, position: Vec3, radius: f32) -> Vec<SpatialEntry> {
        let area = Aabb::from_center(position, Vec3::splat(radius.max(0.0)));
        let min = self.cell_of(area.min);
        let max = self.cell_of(area.max);

        let mut found: Vec<SpatialEntry> = Vec::new();
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    let Some(bucket) = self.cells.get(&IVec3::new(x, y, z)) else {
                        continue;
                    };
                    for entry in bucket {
                        if entry.bounds.intersects(&area) && !found.iter().any(|f| f.entity == entry.entity) {
                            found.push(*entry);
                        }
                    }
                }
            }
        }

        // Детерминированный порядок независимо от HashMap iteration
        found.sort_by_key(|entry| entry.entity.to_bits());
        found
    }
}

/// System: rebuild the grid from current transforms
pub fn rebuild_spatial_grid(
    mut grid: ResMut<SpatialGrid>,
    bodies: Query<(Entity, &Transform, &BoundingBox, &PhysicsBody)>,
) {
    grid.clear();
    for (entity, transform, bounds, body) in bodies.iter() {
        if body.blocks_entities {
            grid.insert(entity, bounds.aabb_at(transform.translation));
        }
    }
}

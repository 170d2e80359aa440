//! Collision primitives and the world geometry provider
//!
//! Sweep = Minkowski expansion статического бокса на half extents
//! движущегося + ray/slab test. Контакт засчитывается только если
//! движение направлено в поверхность (separating motion игнорируется).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn expanded(&self, by: Vec3) -> Self {
        Self {
            min: self.min - by,
            max: self.max + by,
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Box covering both `self` and `self` moved by `offset`
    pub fn swept(&self, offset: Vec3) -> Self {
        Self {
            min: self.min.min(self.min + offset),
            max: self.max.max(self.max + offset),
        }
    }

    /// Fraction of `self`'s height inside `other`
    pub fn vertical_overlap_fraction(&self, other: &Aabb) -> f32 {
        if !self.intersects(other) {
            return 0.0;
        }
        let height = self.max.y - self.min.y;
        if height <= f32::EPSILON {
            return 1.0;
        }
        let overlap = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
        (overlap / height).clamp(0.0, 1.0)
    }
}

/// What a sweep ran into
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContactSource {
    World,
    Entity(Entity),
}

/// Sweep hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// 0.0 = at start, 1.0 = at end of the swept segment
    pub fraction: f32,
    /// Points away from the surface that was hit
    pub normal: Vec3,
    /// Center of the moving box at the moment of contact
    pub point: Vec3,
    pub source: ContactSource,
}

/// Fluid volume sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidProperties {
    /// Upward acceleration as a fraction of body gravity when fully submerged
    pub buoyancy: f32,
    /// Extra drag (fraction of velocity per second) while submerged
    pub viscosity: f32,
}

impl Default for FluidProperties {
    fn default() -> Self {
        // Вода: почти нейтральная плавучесть
        Self {
            buoyancy: 0.9,
            viscosity: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidSample {
    pub properties: FluidProperties,
    /// 0..=1
    pub submerged: f32,
}

/// Static collision source (world storage lives outside the core)
pub trait GeometrySource: Send + Sync {
    /// Contacts of `bounds` swept from `from` to `to` (box centers).
    fn sweep(&self, bounds: &Aabb, from: Vec3, to: Vec3) -> Vec<Contact>;

    /// Deepest fluid the box currently overlaps
    fn fluid_at(&self, bounds: &Aabb) -> Option<FluidSample>;

    /// False while the region around `bounds` is still streaming in
    fn region_loaded(&self, bounds: &Aabb) -> bool;
}

/// Swept box vs static box.
///
/// `half_extents` - moving box, `start → end` - its center path.
pub fn sweep_aabb(half_extents: Vec3, start: Vec3, end: Vec3, target: &Aabb) -> Option<(f32, Vec3)> {
    let expanded = target.expanded(half_extents);
    let delta = end - start;

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let origin = start[axis];
        let direction = delta[axis];
        let (slab_min, slab_max) = (expanded.min[axis], expanded.max[axis]);

        if direction.abs() < f32::EPSILON {
            if origin < slab_min || origin > slab_max {
                return None;
            }
            continue;
        }

        let inv = 1.0 / direction;
        let mut near = (slab_min - origin) * inv;
        let mut far = (slab_max - origin) * inv;
        if near > far {
            std::mem::swap(&mut near, &mut far);
        }

        if near > t_enter {
            t_enter = near;
            normal = Vec3::ZERO;
            normal[axis] = -direction.signum();
        }
        t_exit = t_exit.min(far);

        if t_enter > t_exit {
            return None;
        }
    }

    // Started inside (t_enter < 0) → не блокируем, даём выйти
    if !(0.0..=1.0).contains(&t_enter) || t_exit < 0.0 {
        return None;
    }
    if normal == Vec3::ZERO || delta.dot(normal) >= 0.0 {
        return None;
    }

    Some((t_enter, normal))
}

/// Simple geometry provider: ground plane, solid boxes, fluid volumes
///
/// Для headless runs и тестов; real world storage реализует
/// [`GeometrySource`] сам.
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    ground_height: Option<f32>,
    solids: Vec<Aabb>,
    fluids: Vec<(Aabb, FluidProperties)>,
    unloaded: Vec<Aabb>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ground(mut self, height: f32) -> Self {
        self.ground_height = Some(height);
        self
    }

    pub fn with_solid(mut self, solid: Aabb) -> Self {
        self.solids.push(solid);
        self
    }

    pub fn with_fluid(mut self, volume: Aabb, properties: FluidProperties) -> Self {
        self.fluids.push((volume, properties));
        self
    }

    pub fn with_unloaded_region(mut self, region: Aabb) -> Self {
        self.unloaded.push(region);
        self
    }

    fn ground_contact(&self, half_extents: Vec3, from: Vec3, to: Vec3) -> Option<Contact> {
        let height = self.ground_height?;
        let rest_y = height + half_extents.y;
        let (start_y, end_y) = (from.y, to.y);

        if start_y < rest_y - 1e-4 || end_y >= rest_y || end_y >= start_y {
            return None;
        }

        let fraction = ((start_y - rest_y) / (start_y - end_y)).clamp(0.0, 1.0);
        Some(Contact {
            fraction,
            normal: Vec3::Y,
            point: from.lerp(to, fraction),
            source: ContactSource::World,
        })
    }
}

impl GeometrySource for BoxWorld {
    fn sweep(&self, bounds: &Aabb, from: Vec3, to: Vec3) -> Vec<Contact> {
        let half_extents = bounds.half_extents();
        let mut contacts: Vec<Contact> = self
            .solids
            .iter()
            .filter_map(|solid| sweep_aabb(half_extents, from, to, solid))
            .map(|(fraction, normal)| Contact {
                fraction,
                normal,
                point: from.lerp(to, fraction),
                source: ContactSource::World,
            })
            .collect();

        if let Some(ground) = self.ground_contact(half_extents, from, to) {
            contacts.push(ground);
        }

        contacts.sort_by(|a, b| a.fraction.total_cmp(&b.fraction));
        contacts
    }

    fn fluid_at(&self, bounds: &Aabb) -> Option<FluidSample> {
        self.fluids
            .iter()
            .map(|(volume, properties)| FluidSample {
                properties: *properties,
                submerged: bounds.vertical_overlap_fraction(volume),
            })
            .filter(|sample| sample.submerged > 0.0)
            .max_by(|a, b| a.submerged.total_cmp(&b.submerged))
    }

    fn region_loaded(&self, bounds: &Aabb) -> bool {
        !self.unloaded.iter().any(|region| region.intersects(bounds))
    }
}

use crate::data::types::{Point, PointId};
use crate::picking::Ray;
use glam::Vec3;
use rayon::prelude::*;

/// Analytic pick sphere for one included point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionPrimitive {
    pub id: PointId,
    pub center: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub id: PointId,
    /// Distance along the ray to the reported surface point.
    pub distance: f32,
    pub point: Vec3,
}

/// Pick spheres for every included point, independent of draw batching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionIndex {
    primitives: Vec<CollisionPrimitive>,
}

impl CollisionIndex {
    /// Pick radius is `point_radius + pick_tolerance`.
    pub fn build(points: &[Point], point_radius: f32, pick_tolerance: f32) -> Self {
        let radius = point_radius + pick_tolerance;
        let primitives: Vec<CollisionPrimitive> = points
            .iter()
            .filter(|p| p.include)
            .map(|p| CollisionPrimitive {
                id: p.id,
                center: p.position,
                radius,
            })
            .collect();
        log::debug!("Collision index: {} primitives", primitives.len());
        Self { primitives }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    #[inline]
    pub fn primitives(&self) -> &[CollisionPrimitive] {
        &self.primitives
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.primitives.iter().any(|p| p.id == id)
    }

    /// Nearest hit within `[ray.near, ray.far]`.
    ///
    /// Ordering contract: smaller distance wins; equal distances go to the
    /// lower id. The parallel reduction uses that total order, so the
    /// result never depends on scheduling.
    pub fn raycast(&self, ray: &Ray) -> Option<Hit> {
        let (distance, id) = self
            .primitives
            .par_iter()
            .filter_map(|p| {
                let t = ray_sphere(ray, p.center, p.radius)?;
                (t >= ray.near && t <= ray.far).then_some((t, p.id))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))?;

        log::trace!("Ray hit {id} at {distance}");
        Some(Hit {
            id,
            distance,
            point: ray.at(distance),
        })
    }
}

/// Distance to the first surface crossing ahead of the origin: the entry
/// point, or the exit point when the origin is inside the sphere.
pub fn ray_sphere(ray: &Ray, center: Vec3, radius: f32) -> Option<f32> {
    let to_center = center - ray.origin;
    let tca = to_center.dot(ray.dir);
    let d2 = to_center.length_squared() - tca * tca;
    let r2 = radius * radius;
    if d2 > r2 {
        return None;
    }
    let thc = (r2 - d2).sqrt();
    let t0 = tca - thc;
    let t1 = tca + thc;
    if t1 < 0.0 {
        return None;
    }
    Some(if t0 < 0.0 { t1 } else { t0 })
}

use crate::bounds::BoundingSphere;
use glam::{Mat4, Vec3, Vec4};

/// A plane `n·p + d = 0`, stored as `(n, d)` with `n` unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane(pub Vec4);

impl Plane {
    fn normalized(v: Vec4) -> Self {
        let len = v.truncate().length();
        if len > 0.0 {
            Self(v / len)
        } else {
            Self(v)
        }
    }

    #[inline]
    pub fn normal(&self) -> Vec3 {
        self.0.truncate()
    }

    /// Signed distance; positive on the inside.
    #[inline]
    pub fn distance(&self, p: Vec3) -> f32 {
        self.normal().dot(p) + self.0.w
    }
}

/// View frustum as six inward-facing world-space planes.
///
/// A point is inside iff its distance to every plane is `>= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the planes of a view-projection matrix with `[0, 1]` clip depth
    /// (the `glam::Mat4::perspective_rh` convention).
    pub fn from_view_proj(view_proj: Mat4) -> Self {
        let r0 = view_proj.row(0);
        let r1 = view_proj.row(1);
        let r2 = view_proj.row(2);
        let r3 = view_proj.row(3);

        Self {
            planes: [
                Plane::normalized(r3 + r0), // left
                Plane::normalized(r3 - r0), // right
                Plane::normalized(r3 + r1), // bottom
                Plane::normalized(r3 - r1), // top
                Plane::normalized(r2),      // near (z >= 0)
                Plane::normalized(r3 - r2), // far
            ],
        }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance(p) >= 0.0)
    }

    /// Conservative: may report spheres near frustum corners as visible.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.distance(center) >= -radius)
    }

    #[inline]
    pub fn intersects_bounds(&self, bounds: &BoundingSphere) -> bool {
        self.intersects_sphere(bounds.center, bounds.radius)
    }
}

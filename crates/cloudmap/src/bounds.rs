use glam::Vec3;

/// Conservative bounding sphere used for culling and camera framing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    #[inline]
    pub const fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Encloses `points` with the center of their axis-aligned box, radius
    /// floored at `min_radius`.
    ///
    /// Not the minimal sphere, but it always contains every input point, and
    /// the floor keeps single-point or zero-extent sets cullable.
    pub fn from_points(points: &[Vec3], min_radius: f32) -> Option<Self> {
        let (min, max) = aabb(points)?;
        let center = (min + max) * 0.5;
        let r2 = points
            .iter()
            .map(|p| p.distance_squared(center))
            .fold(0.0f32, f32::max);
        Some(Self::new(center, r2.sqrt().max(min_radius)))
    }

    #[inline]
    pub fn contains_point(&self, p: Vec3, eps: f32) -> bool {
        p.distance(self.center) <= self.radius + eps
    }

    /// Whether `other` lies entirely inside `self`.
    #[inline]
    pub fn contains_sphere(&self, other: &BoundingSphere, eps: f32) -> bool {
        other.center.distance(self.center) + other.radius <= self.radius + eps
    }

    /// Smallest sphere enclosing both `self` and `other`.
    pub fn merge(&self, other: &BoundingSphere) -> BoundingSphere {
        let offset = other.center - self.center;
        let d = offset.length();
        if d + other.radius <= self.radius {
            return *self;
        }
        if d + self.radius <= other.radius {
            return *other;
        }
        let radius = (d + self.radius + other.radius) * 0.5;
        // d > 0 here: coincident centers are handled by the containment cases.
        let center = self.center + offset * ((radius - self.radius) / d);
        BoundingSphere::new(center, radius)
    }
}

/// Component-wise min/max, `None` for an empty slice.
pub fn aabb(points: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let first = *points.first()?;
    Some(
        points
            .iter()
            .fold((first, first), |(min, max), &p| (min.min(p), max.max(p))),
    )
}

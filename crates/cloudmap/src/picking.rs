//! Screen-space pointer handling: ray construction from a view camera and
//! click/drag discrimination.

use crate::camera::CameraPose;
use glam::{Mat4, Vec2, Vec3};

/// World-space ray with a unit direction and the accepted hit range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub near: f32,
    pub far: f32,
}

impl Ray {
    /// `None` for a zero or non-finite direction.
    pub fn new(origin: Vec3, dir: Vec3) -> Option<Self> {
        let dir = dir.try_normalize()?;
        Some(Self {
            origin,
            dir,
            near: 0.0,
            far: f32::INFINITY,
        })
    }

    pub fn with_range(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }
}

/// The view and projection a pick is resolved against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    pub view: Mat4,
    /// `[0, 1]` depth projection, as built by `Mat4::perspective_rh`.
    pub proj: Mat4,
    /// Viewport size in pixels.
    pub viewport: Vec2,
    pub near: f32,
    pub far: f32,
}

impl ViewCamera {
    pub fn perspective(
        pose: &CameraPose,
        fov_y_radians: f32,
        viewport: Vec2,
        near: f32,
        far: f32,
    ) -> Self {
        let aspect = if viewport.y > 0.0 {
            viewport.x / viewport.y
        } else {
            1.0
        };
        Self {
            view: pose.view_matrix(),
            proj: Mat4::perspective_rh(fov_y_radians, aspect, near, far),
            viewport,
            near,
            far,
        }
    }

    #[inline]
    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view
    }

    pub fn eye(&self) -> Vec3 {
        self.view.inverse().w_axis.truncate()
    }

    /// Ray from the eye through pixel `(x, y)` (origin top-left).
    ///
    /// `None` for a degenerate viewport or a non-invertible matrix.
    pub fn screen_ray(&self, x: f32, y: f32) -> Option<Ray> {
        if !(self.viewport.x > 0.0 && self.viewport.y > 0.0) {
            return None;
        }
        let ndc_x = 2.0 * x / self.viewport.x - 1.0;
        let ndc_y = 1.0 - 2.0 * y / self.viewport.y;

        let inv = self.view_proj().inverse();
        if !inv.is_finite() {
            return None;
        }
        let eye = self.eye();
        let far_point = inv.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        Ray::new(eye, far_point - eye).map(|r| r.with_range(self.near, self.far))
    }

    /// Pixel position of a world point, `None` if it is behind the eye.
    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        let clip = self.view_proj() * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * self.viewport.x,
            (1.0 - ndc.y) * 0.5 * self.viewport.y,
        ))
    }
}

/// How a pointer release is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerRelease {
    Click,
    Drag,
}

/// Remembers where the pointer went down so the release can be classified.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerTracker {
    threshold_px: f32,
    down: Option<Vec2>,
}

impl PointerTracker {
    pub fn new(threshold_px: f32) -> Self {
        Self {
            threshold_px,
            down: None,
        }
    }

    #[inline]
    pub fn threshold_px(&self) -> f32 {
        self.threshold_px
    }

    pub fn press(&mut self, x: f32, y: f32) {
        self.down = Some(Vec2::new(x, y));
    }

    /// Travel strictly beyond the threshold (Euclidean) is a drag. A release
    /// with no recorded press counts as a click.
    pub fn release(&mut self, x: f32, y: f32) -> PointerRelease {
        match self.down.take() {
            Some(down) if down.distance(Vec2::new(x, y)) > self.threshold_px => {
                PointerRelease::Drag
            }
            _ => PointerRelease::Click,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> ViewCamera {
        let pose = CameraPose {
            position: [0.0, 0.0, 40.0],
            target: [0.0, 0.0, 0.0],
        };
        ViewCamera::perspective(&pose, 60f32.to_radians(), Vec2::new(800.0, 600.0), 0.1, 5000.0)
    }

    #[test]
    fn center_pixel_looks_at_target() {
        let cam = camera();
        let ray = cam.screen_ray(400.0, 300.0).unwrap();
        assert!((ray.origin - Vec3::new(0.0, 0.0, 40.0)).length() < 1e-3);
        assert!((ray.dir - Vec3::NEG_Z).length() < 1e-4);
        assert_eq!(ray.near, 0.1);
        assert_eq!(ray.far, 5000.0);
    }

    #[test]
    fn projected_point_unprojects_through_itself() {
        let cam = camera();
        let world = Vec3::new(6.0, -3.0, 2.0);
        let px = cam.project(world).unwrap();
        let ray = cam.screen_ray(px.x, px.y).unwrap();
        let t = (world - ray.origin).dot(ray.dir);
        assert!(ray.at(t).distance(world) < 1e-2);
    }

    #[test]
    fn points_behind_the_eye_do_not_project() {
        assert!(camera().project(Vec3::new(0.0, 0.0, 100.0)).is_none());
    }

    #[test]
    fn degenerate_viewport_has_no_ray() {
        let mut cam = camera();
        cam.viewport = Vec2::ZERO;
        assert!(cam.screen_ray(0.0, 0.0).is_none());
    }

    #[test]
    fn drag_uses_euclidean_distance() {
        let mut t = PointerTracker::new(5.0);
        // 4 px on each axis: 5.66 px overall, more than either leg.
        t.press(100.0, 100.0);
        assert_eq!(t.release(104.0, 104.0), PointerRelease::Drag);

        t.press(100.0, 100.0);
        assert_eq!(t.release(103.0, 104.0), PointerRelease::Click);

        t.press(0.0, 0.0);
        assert_eq!(t.release(5.0, 0.0), PointerRelease::Click);
    }

    #[test]
    fn release_without_press_is_a_click() {
        let mut t = PointerTracker::new(5.0);
        assert_eq!(t.release(300.0, 300.0), PointerRelease::Click);
        t.press(0.0, 0.0);
        t.release(50.0, 0.0);
        assert_eq!(t.release(50.0, 0.0), PointerRelease::Click);
    }
}

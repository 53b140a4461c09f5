//! Core data types, focused on the point record and GPU instance layouts.

use glam::{Mat4, Vec3};
use std::fmt;
use std::sync::Arc;

/// Dense index of a point within one dataset load.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct PointId(pub u32);

impl PointId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One community in the embedding.
///
/// Points are immutable once they enter a [`PointStore`](super::PointStore):
/// a filter change produces a fresh array with `include` recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: PointId,
    /// Display name, unique within a dataset.
    pub subreddit: Arc<str>,
    /// World-space embedding coordinates.
    pub position: Vec3,
    /// Cluster label for the currently selected cluster count.
    pub cluster: u32,
    /// Share of flagged content, 0..=100.
    pub percent_nsfw: f32,
    /// Passes the current content/visibility filters.
    pub include: bool,
}

impl Point {
    pub fn new(
        id: u32,
        subreddit: impl Into<Arc<str>>,
        position: Vec3,
        cluster: u32,
        percent_nsfw: f32,
    ) -> Self {
        Self {
            id: PointId(id),
            subreddit: subreddit.into(),
            position,
            cluster,
            percent_nsfw,
            include: true,
        }
    }
}

/// Per-instance model matrix uploaded to the instance vertex buffer.
///
/// Translation only: the point radius is baked into the shared sphere
/// geometry, so every instance carries identity rotation and unit scale.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct InstanceTransform {
    /// Column-major 4x4 matrix.
    pub model: [[f32; 4]; 4],
}

impl InstanceTransform {
    #[inline]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            model: Mat4::from_translation(translation).to_cols_array_2d(),
        }
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        let c = self.model[3];
        Vec3::new(c[0], c[1], c[2])
    }
}

/// Per-instance linear RGB color uploaded alongside the transforms.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Debug, PartialEq)]
pub struct InstanceColor {
    pub rgb: [f32; 3],
}

impl InstanceColor {
    #[inline]
    pub const fn new(rgb: [f32; 3]) -> Self {
        Self { rgb }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_is_translation_only() {
        let t = InstanceTransform::from_translation(Vec3::new(1.0, -2.0, 3.5));
        assert_eq!(t.translation(), Vec3::new(1.0, -2.0, 3.5));

        let m = Mat4::from_cols_array_2d(&t.model);
        let (scale, rotation, _) = m.to_scale_rotation_translation();
        assert!(scale.abs_diff_eq(Vec3::ONE, 1e-6));
        assert!(rotation.abs_diff_eq(glam::Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn instance_layouts_are_tightly_packed() {
        assert_eq!(std::mem::size_of::<InstanceTransform>(), 64);
        assert_eq!(std::mem::size_of::<InstanceColor>(), 12);

        let colors = [InstanceColor::new([1.0, 0.5, 0.0]); 4];
        let bytes: &[u8] = bytemuck::cast_slice(&colors);
        assert_eq!(bytes.len(), 48);
    }
}

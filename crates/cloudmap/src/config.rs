use crate::camera::CameraConfig;
use crate::color::ColorMode;
use crate::voxel;
use serde::{Deserialize, Serialize};

/// Half side length of the cubic domain every coordinate must lie in.
pub const DOMAIN_HALF_EXTENT: f32 = 1001.0;
/// World-space radius of one rendered point.
pub const POINT_RADIUS: f32 = 1.0;
/// Pointer travel (px) above which a press/release pair is a drag.
pub const DRAG_THRESHOLD_PX: f32 = 5.0;

/// Every engine tunable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub half_extent: f32,
    pub point_radius: f32,
    /// Added to the point radius for picking only.
    pub pick_tolerance: f32,
    pub drag_threshold_px: f32,
    /// `None` picks a resolution from the point count.
    pub voxel_resolution: Option<u32>,
    pub color_mode: ColorMode,
    pub camera: CameraConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            half_extent: DOMAIN_HALF_EXTENT,
            point_radius: POINT_RADIUS,
            pick_tolerance: 0.0,
            drag_threshold_px: DRAG_THRESHOLD_PX,
            voxel_resolution: None,
            color_mode: ColorMode::default(),
            camera: CameraConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Replaces values that would break an invariant with their defaults.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if !(self.half_extent.is_finite() && self.half_extent > 0.0) {
            log::warn!(
                "Invalid half_extent {}; using {}.",
                self.half_extent,
                defaults.half_extent
            );
            self.half_extent = defaults.half_extent;
        }
        if !(self.point_radius.is_finite() && self.point_radius > 0.0) {
            log::warn!(
                "Invalid point_radius {}; using {}.",
                self.point_radius,
                defaults.point_radius
            );
            self.point_radius = defaults.point_radius;
        }
        if !(self.pick_tolerance.is_finite() && self.pick_tolerance >= 0.0) {
            log::warn!("Invalid pick_tolerance {}; using 0.", self.pick_tolerance);
            self.pick_tolerance = 0.0;
        }
        if !(self.drag_threshold_px.is_finite() && self.drag_threshold_px >= 0.0) {
            log::warn!(
                "Invalid drag_threshold_px {}; using {}.",
                self.drag_threshold_px,
                defaults.drag_threshold_px
            );
            self.drag_threshold_px = defaults.drag_threshold_px;
        }
        self.voxel_resolution = self.voxel_resolution.map(voxel::clamp_resolution);
        self.camera = self.camera.sanitized();
        self
    }
}

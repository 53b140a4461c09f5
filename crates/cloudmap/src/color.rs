//! Instance coloring: the cluster palette, selection highlight and the
//! per-voxel debug palette.

use crate::data::types::{InstanceColor, Point, PointId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Highlight for selected points (`#5E5`).
pub const SELECTED_COLOR: u32 = 0x55EE55;

/// Cluster palette, indexed by `cluster % len`.
#[rustfmt::skip]
pub const CLUSTER_PALETTE: [u32; 103] = [
    0x263B3B, 0x0B195E, 0xBC3C00, 0x773B08, 0x541818, 0x340534, 0x0E2412, 0x3B0C1A,
    0x790579, 0x0D620B, 0xFFFF00, 0x1CE6FF, 0xFF34FF, 0xFF4A46, 0x008941, 0x006FA6,
    0xA30059, 0xFFDBE5, 0x7A4900, 0x0000A6, 0x63FFAC, 0xB79762, 0x004D43, 0x8FB0FF,
    0x997D87, 0x5A0007, 0x809693, 0xFEFFE6, 0x1B4400, 0x4FC601, 0x3B5DFF, 0x4A3B53,
    0xFF2F80, 0x61615A, 0xBA0900, 0x6B7900, 0x00C2A0, 0xFFAA92, 0xFF90C9, 0xB903AA,
    0xD16100, 0xDDEFFF, 0x000035, 0x7B4F4B, 0xA1C299, 0x300018, 0x0AA6D8, 0x013349,
    0x00846F, 0x372101, 0xFFB500, 0xC2FFED, 0xA079BF, 0xCC0744, 0xC0B9B2, 0xC2FF99,
    0x001E09, 0x00489C, 0x6F0062, 0x0CBD66, 0xEEC3FF, 0x456D75, 0xB77B68, 0x7A87A1,
    0x788D66, 0x885578, 0xFAD09F, 0xFF8A9A, 0xD157A0, 0xBEC459, 0x456648, 0x0086ED,
    0x886F4C, 0x34362D, 0xB4A8BD, 0x00A6AA, 0x452C2C, 0x636375, 0xA3C8C9, 0xFF913F,
    0x938A81, 0x575329, 0x00FECF, 0xB05B6F, 0x8CD0FF, 0x3B9700, 0x04F757, 0xC8A1A1,
    0x1E6E00, 0x7900D7, 0xA77500, 0x6367A9, 0xA05837, 0x6B002C, 0x772600, 0xD790FF,
    0x9B9700, 0x549E79, 0xFFF69F, 0x201625, 0x72418F, 0xBC23FF, 0x99ADC0,
];

/// Unpacks `0xRRGGBB` into normalized channels.
#[inline]
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    ]
}

#[inline]
pub fn cluster_color(cluster: u32) -> [f32; 3] {
    hex_to_rgb(CLUSTER_PALETTE[cluster as usize % CLUSTER_PALETTE.len()])
}

/// Debug color for a voxel; neighbouring ids land far apart on the hue wheel.
pub fn voxel_color(voxel_id: u32) -> [f32; 3] {
    const GOLDEN_RATIO_CONJUGATE: f32 = 0.618_034;
    let hue = (voxel_id as f32 * GOLDEN_RATIO_CONJUGATE).fract();
    hsv_to_rgb(hue, 0.65, 0.95)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [f32; 3] {
    let h6 = h * 6.0;
    let sector = h6.floor() as i32 % 6;
    let f = h6 - h6.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - f * s);
    let t = v * (1.0 - (1.0 - f) * s);
    match sector {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}

/// What drives the base color of an instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    #[default]
    Cluster,
    /// Debug view: every point takes the color of its voxel.
    Voxel,
}

/// Per-point color function used by the batch builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorPolicy {
    pub mode: ColorMode,
    highlight: HashSet<PointId>,
}

impl ColorPolicy {
    pub fn new(mode: ColorMode) -> Self {
        Self {
            mode,
            highlight: HashSet::new(),
        }
    }

    /// Points drawn in [`SELECTED_COLOR`] regardless of mode.
    pub fn with_highlight<I: IntoIterator<Item = PointId>>(mut self, ids: I) -> Self {
        self.highlight = ids.into_iter().collect();
        self
    }

    pub fn is_highlighted(&self, id: PointId) -> bool {
        self.highlight.contains(&id)
    }

    pub fn color(&self, point: &Point, voxel_id: u32) -> InstanceColor {
        if self.is_highlighted(point.id) {
            return InstanceColor::new(hex_to_rgb(SELECTED_COLOR));
        }
        InstanceColor::new(match self.mode {
            ColorMode::Cluster => cluster_color(point.cluster),
            ColorMode::Voxel => voxel_color(voxel_id),
        })
    }
}

//! Uniform voxel partitioning of the included points.
//!
//! The grid is a cube of side `2S` centred on the origin, split into `R^3`
//! cells. A cell is addressed by `ix + iy*R + iz*R^2`. The grid is rebuilt
//! from scratch whenever the points or `R` change; it is never patched.

use crate::data::types::Point;
use glam::Vec3;

/// Bounds for [`auto_resolution`].
pub const MIN_AUTO_RESOLUTION: u32 = 6;
pub const MAX_AUTO_RESOLUTION: u32 = 12;
/// Target number of points per voxel when picking a resolution automatically.
const AUTO_POINTS_PER_VOXEL: f64 = 80.0;

/// Largest accepted resolution. `R^3` cells are allocated up front and voxel
/// ids are `u32`.
pub const MAX_RESOLUTION: u32 = 128;

/// Resolution 0 degrades to a single cell; anything above
/// [`MAX_RESOLUTION`] is capped.
pub fn clamp_resolution(resolution: u32) -> u32 {
    if resolution == 0 {
        log::warn!("Voxel resolution 0 is invalid; clamping to 1.");
        1
    } else if resolution > MAX_RESOLUTION {
        log::warn!("Voxel resolution {resolution} is too large; clamping to {MAX_RESOLUTION}.");
        MAX_RESOLUTION
    } else {
        resolution
    }
}

/// Resolution that keeps roughly 80 points per voxel, within [6, 12].
pub fn auto_resolution(point_count: usize) -> u32 {
    let r = (point_count as f64 / AUTO_POINTS_PER_VOXEL).cbrt().floor() as u32;
    r.clamp(MIN_AUTO_RESOLUTION, MAX_AUTO_RESOLUTION)
}

/// Per-axis cell coordinates of `position`.
///
/// Coordinates exactly on the upper domain face land in the last cell.
/// Anything outside the domain is a caller bug: it asserts in debug builds
/// and is clamped in release builds.
pub fn cell_coords(position: Vec3, resolution: u32, half_extent: f32) -> [u32; 3] {
    debug_assert!(resolution >= 1);
    debug_assert!(
        position.is_finite() && position.abs().max_element() <= half_extent * (1.0 + 1e-6),
        "point {position:?} outside voxel domain +/-{half_extent}"
    );

    let step = 2.0 * half_extent / resolution as f32;
    let last = resolution as i64 - 1;
    let axis = |c: f32| -> u32 {
        let i = ((c + half_extent) / step).floor() as i64;
        i.clamp(0, last) as u32
    };
    [axis(position.x), axis(position.y), axis(position.z)]
}

#[inline]
pub fn linear_index([ix, iy, iz]: [u32; 3], resolution: u32) -> u32 {
    ix + iy * resolution + iz * resolution * resolution
}

/// Occupancy summary of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridStats {
    pub total: usize,
    pub occupied: usize,
    pub empty: usize,
}

impl GridStats {
    pub fn empty_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.empty as f64 * 100.0 / self.total as f64
        }
    }
}

/// Included points bucketed into `R^3` cells, in dataset order within a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid {
    resolution: u32,
    half_extent: f32,
    cells: Vec<Vec<u32>>,
}

impl VoxelGrid {
    /// A grid with every cell empty.
    pub fn empty(resolution: u32, half_extent: f32) -> Self {
        let resolution = clamp_resolution(resolution);
        let n = (resolution as usize).pow(3);
        Self {
            resolution,
            half_extent,
            cells: vec![Vec::new(); n],
        }
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    /// Side length of one cell.
    #[inline]
    pub fn cell_size(&self) -> f32 {
        2.0 * self.half_extent / self.resolution as f32
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// All cells indexed by voxel id, including empty ones.
    #[inline]
    pub fn cells(&self) -> &[Vec<u32>] {
        &self.cells
    }

    /// Point indices in cell `voxel_id`.
    pub fn cell(&self, voxel_id: u32) -> &[u32] {
        self.cells
            .get(voxel_id as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Non-empty cells as `(voxel_id, members)`.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, &[u32])> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_empty())
            .map(|(i, c)| (i as u32, c.as_slice()))
    }

    /// Voxel id that `position` falls into.
    pub fn voxel_of(&self, position: Vec3) -> u32 {
        linear_index(
            cell_coords(position, self.resolution, self.half_extent),
            self.resolution,
        )
    }

    /// Total number of bucketed points.
    pub fn member_count(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    pub fn stats(&self) -> GridStats {
        let occupied = self.cells.iter().filter(|c| !c.is_empty()).count();
        GridStats {
            total: self.cells.len(),
            occupied,
            empty: self.cells.len() - occupied,
        }
    }
}

/// Buckets every included point into a fresh grid.
///
/// Excluded points are dropped entirely. The result depends only on the
/// point positions, their order and `resolution`.
pub fn partition(points: &[Point], resolution: u32, half_extent: f32) -> VoxelGrid {
    let mut grid = VoxelGrid::empty(resolution, half_extent);
    let r = grid.resolution;
    let n = grid.cells.len() as u32;

    for (i, p) in points.iter().enumerate() {
        if !p.include {
            continue;
        }
        let id = linear_index(cell_coords(p.position, r, half_extent), r);
        debug_assert!(id < n, "voxel index {id} out of range for R={r}");
        grid.cells[id.min(n - 1) as usize].push(i as u32);
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::types::PointId;

    const S: f32 = 1001.0;

    fn pt(i: u32, x: f32, y: f32, z: f32) -> Point {
        Point::new(i, format!("p{i}"), Vec3::new(x, y, z), 0, 0.0)
    }

    #[test]
    fn zero_resolution_clamps_to_single_cell() {
        let grid = partition(&[pt(0, 1.0, 2.0, 3.0)], 0, S);
        assert_eq!(grid.resolution(), 1);
        assert_eq!(grid.cell_count(), 1);
        assert_eq!(grid.cell(0), &[0]);
    }

    #[test]
    fn huge_resolution_is_capped() {
        assert_eq!(clamp_resolution(1700), MAX_RESOLUTION);
        assert_eq!(clamp_resolution(u32::MAX), MAX_RESOLUTION);
        assert_eq!(clamp_resolution(MAX_RESOLUTION), MAX_RESOLUTION);

        let r = clamp_resolution(1700);
        let corner = linear_index(cell_coords(Vec3::splat(1000.0), r, S), r);
        assert_eq!(corner, r.pow(3) - 1);
    }

    #[test]
    fn cell_size_spans_the_domain() {
        let grid = VoxelGrid::empty(4, S);
        assert_eq!(grid.cell_size(), 2.0 * S / 4.0);
        assert_eq!(cell_coords(Vec3::splat(-S + grid.cell_size() * 1.5), 4, S), [1, 1, 1]);
    }

    #[test]
    fn linearizes_x_then_y_then_z() {
        let r = 4;
        assert_eq!(linear_index([1, 0, 0], r), 1);
        assert_eq!(linear_index([0, 1, 0], r), 4);
        assert_eq!(linear_index([0, 0, 1], r), 16);
        assert_eq!(linear_index([3, 3, 3], r), 63);
    }

    #[test]
    fn domain_faces_clamp_into_valid_cells() {
        let r = 3;
        assert_eq!(cell_coords(Vec3::splat(S), r, S), [2, 2, 2]);
        assert_eq!(cell_coords(Vec3::splat(-S), r, S), [0, 0, 0]);
        assert_eq!(cell_coords(Vec3::new(0.0, -S, S), r, S), [1, 0, 2]);
    }

    #[test]
    fn neighbours_share_the_low_corner_cell() {
        let points = [
            pt(0, -1000.0, -1000.0, -1000.0),
            pt(1, -995.0, -1000.0, -1000.0),
            pt(2, 20.0, 20.0, 20.0),
        ];
        let grid = partition(&points, 2, S);
        let occupied: Vec<(u32, Vec<u32>)> =
            grid.occupied().map(|(id, m)| (id, m.to_vec())).collect();
        assert_eq!(occupied, vec![(0, vec![0, 1]), (7, vec![2])]);
    }

    #[test]
    fn origin_is_on_the_upper_side_of_the_split() {
        // At R=2 the cell boundary is the origin itself.
        assert_eq!(cell_coords(Vec3::ZERO, 2, S), [1, 1, 1]);
        assert_eq!(cell_coords(Vec3::splat(-0.01), 2, S), [0, 0, 0]);
    }

    #[test]
    fn excluded_points_are_dropped() {
        let mut hidden = pt(1, 3.0, 3.0, 3.0);
        hidden.include = false;
        let grid = partition(&[pt(0, 0.0, 0.0, 0.0), hidden, pt(2, -4.0, 0.0, 0.0)], 5, S);
        let all: Vec<u32> = grid.cells().iter().flatten().copied().collect();
        assert_eq!(grid.member_count(), 2);
        assert!(all.contains(&0) && all.contains(&2) && !all.contains(&1));
    }

    #[test]
    fn partition_is_complete_and_deterministic() {
        let points: Vec<Point> = (0..500u32)
            .map(|i| {
                let f = i as f32;
                let mut p = pt(
                    i,
                    (f * 37.3) % (2.0 * S) - S,
                    (f * 91.7) % (2.0 * S) - S,
                    (f * 13.1) % (2.0 * S) - S,
                );
                p.include = i % 7 != 0;
                p
            })
            .collect();

        for r in 1..=12 {
            let a = partition(&points, r, S);
            let b = partition(&points, r, S);
            assert_eq!(a, b, "R={r} not deterministic");

            let mut members: Vec<u32> = a.cells().iter().flatten().copied().collect();
            members.sort_unstable();
            let expected: Vec<u32> = points
                .iter()
                .filter(|p| p.include)
                .map(|p| p.id.0)
                .collect();
            assert_eq!(members, expected, "R={r} lost or duplicated points");

            for (id, m) in a.occupied() {
                for &i in m {
                    assert_eq!(a.voxel_of(points[i as usize].position), id);
                    assert_eq!(points[i as usize].id, PointId(i));
                }
            }
        }
    }

    #[test]
    fn intra_cell_order_follows_dataset_order() {
        let points = [pt(0, 1.0, 1.0, 1.0), pt(1, 2.0, 2.0, 2.0), pt(2, 3.0, 3.0, 3.0)];
        let grid = partition(&points, 1, S);
        assert_eq!(grid.cell(0), &[0, 1, 2]);
    }

    #[test]
    fn stats_count_empty_cells() {
        let grid = partition(&[pt(0, 0.0, 0.0, 0.0)], 2, S);
        let stats = grid.stats();
        assert_eq!(stats.total, 8);
        assert_eq!(stats.occupied, 1);
        assert_eq!(stats.empty, 7);
        assert!((stats.empty_percent() - 87.5).abs() < 1e-9);
    }

    #[test]
    fn auto_resolution_is_bounded() {
        assert_eq!(auto_resolution(0), 6);
        assert_eq!(auto_resolution(10_000), 6);
        assert_eq!(auto_resolution(80 * 9 * 9 * 9), 9);
        assert_eq!(auto_resolution(1_000_000), 12);
    }
}

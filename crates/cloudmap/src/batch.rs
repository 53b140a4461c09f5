//! Per-voxel instanced draw batches and the arena that tracks their lifecycle.
//!
//! A batch owns only the per-instance buffers (transform + color) and a
//! culling volume. Geometry and material are shared and live in the renderer.

use crate::bounds::BoundingSphere;
use crate::color::ColorPolicy;
use crate::data::types::{InstanceColor, InstanceTransform, Point};
use crate::frustum::Frustum;
use crate::voxel::VoxelGrid;
use rayon::prelude::*;
use serde::Serialize;

/// Which instance buffers need re-uploading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchDirty {
    pub transforms: bool,
    pub colors: bool,
}

impl BatchDirty {
    pub const ALL: Self = Self {
        transforms: true,
        colors: true,
    };

    #[inline]
    pub fn any(&self) -> bool {
        self.transforms || self.colors
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub voxel_id: u32,
    /// Indices into the point array, in instance order.
    pub point_indices: Vec<u32>,
    pub transforms: Vec<InstanceTransform>,
    pub colors: Vec<InstanceColor>,
    pub bounds: BoundingSphere,
    pub dirty: BatchDirty,
}

impl DrawBatch {
    /// Builds the batch for one non-empty cell. `None` if `members` is empty.
    pub fn from_cell(
        voxel_id: u32,
        members: &[u32],
        points: &[Point],
        policy: &ColorPolicy,
        min_radius: f32,
    ) -> Option<Self> {
        let resolved: Vec<&Point> = members
            .iter()
            .filter_map(|&i| points.get(i as usize))
            .collect();
        debug_assert_eq!(resolved.len(), members.len(), "stale cell in voxel {voxel_id}");

        let positions: Vec<_> = resolved.iter().map(|p| p.position).collect();
        let bounds = BoundingSphere::from_points(&positions, min_radius)?;

        Some(Self {
            voxel_id,
            point_indices: resolved.iter().map(|p| p.id.0).collect(),
            transforms: positions
                .iter()
                .map(|&p| InstanceTransform::from_translation(p))
                .collect(),
            colors: resolved.iter().map(|p| policy.color(p, voxel_id)).collect(),
            bounds,
            dirty: BatchDirty::ALL,
        })
    }

    #[inline]
    pub fn instance_count(&self) -> usize {
        self.point_indices.len()
    }

    /// Raw bytes for the instance vertex buffers.
    pub fn transform_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.transforms)
    }

    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }

    /// Rewrites colors in the existing instance order; returns whether any changed.
    fn recolor(&mut self, points: &[Point], policy: &ColorPolicy) -> bool {
        let mut changed = false;
        for (slot, &i) in self.colors.iter_mut().zip(&self.point_indices) {
            let Some(p) = points.get(i as usize) else {
                continue;
            };
            let c = policy.color(p, self.voxel_id);
            if *slot != c {
                *slot = c;
                changed = true;
            }
        }
        if changed {
            self.dirty.colors = true;
        }
        changed
    }
}

/// One batch per non-empty cell, in voxel-id order.
pub fn build(
    points: &[Point],
    grid: &VoxelGrid,
    policy: &ColorPolicy,
    min_radius: f32,
) -> Vec<DrawBatch> {
    let occupied: Vec<(u32, &[u32])> = grid.occupied().collect();
    let batches: Vec<DrawBatch> = occupied
        .par_iter()
        .filter_map(|&(voxel_id, members)| {
            DrawBatch::from_cell(voxel_id, members, points, policy, min_radius)
        })
        .collect();

    log::debug!(
        "Built {} batches, {} instances",
        batches.len(),
        batches.iter().map(DrawBatch::instance_count).sum::<usize>()
    );
    batches
}

/// Rewrites color arrays only. Returns the number of batches that changed.
pub fn recolor(batches: &mut [DrawBatch], points: &[Point], policy: &ColorPolicy) -> usize {
    batches
        .par_iter_mut()
        .map(|b| b.recolor(points, policy) as usize)
        .sum()
}

/// Instance slots of `batch` whose point sphere touches the frustum.
///
/// Used when there is a single batch and coarse culling is useless.
pub fn visible_instances(batch: &DrawBatch, frustum: &Frustum, point_radius: f32) -> Vec<u32> {
    batch
        .transforms
        .iter()
        .enumerate()
        .filter(|(_, t)| frustum.intersects_sphere(t.translation(), point_radius))
        .map(|(i, _)| i as u32)
        .collect()
}

/// Generational handle to a batch slot. A handle outlives its batch; lookups
/// through a stale handle return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BatchHandle {
    pub voxel_id: u32,
    pub generation: u32,
}

/// What the renderer has to do with its GPU resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "handle", rename_all = "snake_case")]
pub enum BatchEvent {
    Created(BatchHandle),
    Updated(BatchHandle),
    Destroyed(BatchHandle),
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    batch: Option<DrawBatch>,
}

/// Draw batches keyed by voxel id.
#[derive(Debug, Clone, Default)]
pub struct BatchArena {
    resolution: u32,
    slots: Vec<Slot>,
    live: usize,
}

impl BatchArena {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Grid resolution the current batches were built for.
    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn get(&self, handle: BatchHandle) -> Option<&DrawBatch> {
        let slot = self.slots.get(handle.voxel_id as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.batch.as_ref()
    }

    pub fn handle_of(&self, voxel_id: u32) -> Option<BatchHandle> {
        let slot = self.slots.get(voxel_id as usize)?;
        slot.batch.as_ref().map(|_| BatchHandle {
            voxel_id,
            generation: slot.generation,
        })
    }

    /// Live batches in voxel-id order.
    pub fn iter(&self) -> impl Iterator<Item = (BatchHandle, &DrawBatch)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.batch.as_ref().map(|b| {
                (
                    BatchHandle {
                        voxel_id: i as u32,
                        generation: s.generation,
                    },
                    b,
                )
            })
        })
    }

    pub fn batches(&self) -> impl Iterator<Item = &DrawBatch> + '_ {
        self.iter().map(|(_, b)| b)
    }

    /// Replaces every batch with `batches` (built for `resolution`) in one step.
    ///
    /// Batches for a voxel that already had one are `Updated`; new voxels are
    /// `Created` with a fresh generation; voxels that lost their batch are
    /// `Destroyed`. A resolution change destroys everything first, since voxel
    /// ids then name different cells.
    pub fn sync(&mut self, resolution: u32, batches: Vec<DrawBatch>) -> Vec<BatchEvent> {
        let mut events = Vec::new();

        if resolution != self.resolution {
            events.extend(self.destroy_all());
            self.slots.clear();
            self.resolution = resolution;
        }

        let needed = batches
            .iter()
            .map(|b| b.voxel_id as usize + 1)
            .max()
            .unwrap_or(0);
        if self.slots.len() < needed {
            self.slots.resize_with(needed, Slot::default);
        }

        let mut present = vec![false; self.slots.len()];
        for batch in batches {
            let voxel_id = batch.voxel_id;
            let slot = &mut self.slots[voxel_id as usize];
            present[voxel_id as usize] = true;
            match slot.batch.replace(batch) {
                Some(_) => events.push(BatchEvent::Updated(BatchHandle {
                    voxel_id,
                    generation: slot.generation,
                })),
                None => {
                    slot.generation = slot.generation.wrapping_add(1);
                    self.live += 1;
                    events.push(BatchEvent::Created(BatchHandle {
                        voxel_id,
                        generation: slot.generation,
                    }));
                }
            }
        }

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !present[i] && slot.batch.take().is_some() {
                self.live -= 1;
                events.push(BatchEvent::Destroyed(BatchHandle {
                    voxel_id: i as u32,
                    generation: slot.generation,
                }));
            }
        }

        events
    }

    fn destroy_all(&mut self) -> Vec<BatchEvent> {
        let mut events = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.batch.take().is_some() {
                events.push(BatchEvent::Destroyed(BatchHandle {
                    voxel_id: i as u32,
                    generation: slot.generation,
                }));
            }
        }
        self.live = 0;
        events
    }

    /// Recolors every live batch; `Updated` only for those whose colors changed.
    pub fn recolor(&mut self, points: &[Point], policy: &ColorPolicy) -> Vec<BatchEvent> {
        self.slots
            .par_iter_mut()
            .enumerate()
            .filter_map(|(i, slot)| {
                let batch = slot.batch.as_mut()?;
                batch.recolor(points, policy).then_some(BatchEvent::Updated(BatchHandle {
                    voxel_id: i as u32,
                    generation: slot.generation,
                }))
            })
            .collect()
    }

    /// Batches whose bounds touch the frustum.
    /// Sphere enclosing every live batch, `None` when the arena is empty.
    pub fn bounds(&self) -> Option<BoundingSphere> {
        self.batches()
            .map(|b| b.bounds)
            .reduce(|acc, b| acc.merge(&b))
    }

    pub fn visible(&self, frustum: &Frustum) -> Vec<BatchHandle> {
        self.iter()
            .filter(|(_, b)| frustum.intersects_bounds(&b.bounds))
            .map(|(h, _)| h)
            .collect()
    }

    /// Hands back the pending upload flags and clears them.
    pub fn take_dirty(&mut self) -> Vec<(BatchHandle, BatchDirty)> {
        let mut out = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let generation = slot.generation;
            if let Some(batch) = slot.batch.as_mut() {
                if batch.dirty.any() {
                    out.push((
                        BatchHandle {
                            voxel_id: i as u32,
                            generation,
                        },
                        std::mem::take(&mut batch.dirty),
                    ));
                }
            }
        }
        out
    }
}

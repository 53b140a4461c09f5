//! The host-facing facade. Owns every component and decides, once per frame,
//! what has to be rebuilt and in which order.

use crate::batch::{self, BatchArena, BatchEvent, BatchHandle, DrawBatch};
use crate::camera::{CameraController, CameraPose, MoveKey};
use crate::collision::CollisionIndex;
use crate::color::{ColorMode, ColorPolicy};
use crate::config::EngineConfig;
use crate::data::{Dataset, FilterThresholds, Point, PointId, PointStore};
use crate::error::DatasetError;
use crate::frustum::Frustum;
use crate::picking::ViewCamera;
use crate::selection::{self, PickOutcome, SelectMode, SelectionResolver, SelectionState};
use crate::voxel::{self, VoxelGrid};
use serde::Serialize;
use std::sync::Arc;

/// Input that needs the rebuilt structures of the frame it lands in.
#[derive(Debug, Clone, PartialEq)]
enum Queued {
    PointerDown { x: f32, y: f32 },
    PointerUp { x: f32, y: f32, ctrl: bool },
    Search { term: String, multi: bool },
}

#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    grid: bool,
    collision: bool,
    colors: bool,
    camera: bool,
    selection: bool,
}

/// Everything the renderer and UI need after one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameOutput {
    pub frame: u64,
    /// Batch lifecycle in the order it happened this frame.
    pub batch_events: Vec<BatchEvent>,
    pub camera: CameraPose,
    pub selection_changed: bool,
    pub selection: Vec<PointId>,
    /// One entry per pointer release resolved this frame.
    pub picks: Vec<PickOutcome>,
    /// One entry per name search resolved this frame.
    pub searches: Vec<Option<PointId>>,
}

pub struct Engine {
    config: EngineConfig,
    store: PointStore,
    grid: VoxelGrid,
    arena: BatchArena,
    collision: CollisionIndex,
    selection: SelectionState,
    resolver: SelectionResolver,
    camera: CameraController,
    view: Option<ViewCamera>,
    color_mode: ColorMode,
    voxel_resolution: Option<u32>,
    queue: Vec<Queued>,
    dirty: Dirty,
    frame: u64,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let config = config.sanitized();
        Self {
            store: PointStore::default(),
            grid: VoxelGrid::empty(1, config.half_extent),
            arena: BatchArena::new(),
            collision: CollisionIndex::default(),
            selection: SelectionState::default(),
            resolver: SelectionResolver::new(config.drag_threshold_px),
            camera: CameraController::new(config.camera.clone()),
            view: None,
            color_mode: config.color_mode,
            voxel_resolution: config.voxel_resolution,
            queue: Vec::new(),
            dirty: Dirty::default(),
            frame: 0,
            config,
        }
    }

    // ---- inputs -----------------------------------------------------------

    /// Replaces the whole point array. Rebuilds happen on the next frame.
    pub fn set_dataset(&mut self, points: Vec<Point>) {
        let previous = self.store.set_dataset(points);
        self.points_replaced(&previous);
    }

    /// Materializes `dataset` for one cluster count and loads it.
    pub fn load(&mut self, dataset: &Dataset, cluster_index: usize) -> Result<(), DatasetError> {
        let points = dataset.points(cluster_index)?;
        log::info!(
            "Loading {} points (cluster index {})",
            points.len(),
            cluster_index
        );
        self.set_dataset(points);
        Ok(())
    }

    pub fn set_filter_thresholds(&mut self, thresholds: FilterThresholds) {
        let previous = self.store.set_filter_thresholds(thresholds);
        self.points_replaced(&previous);
    }

    fn points_replaced(&mut self, previous: &[Point]) {
        if self.selection.reconcile(previous, self.store.points()) {
            self.dirty.selection = true;
        }
        self.dirty.grid = true;
        self.dirty.collision = true;
        self.dirty.camera = true;
    }

    /// Fixes the grid resolution, clamped to `1..=MAX_RESOLUTION`.
    pub fn set_voxel_resolution(&mut self, resolution: u32) {
        let resolution = voxel::clamp_resolution(resolution);
        if self.voxel_resolution != Some(resolution) {
            self.voxel_resolution = Some(resolution);
            self.dirty.grid = true;
        }
    }

    /// Goes back to picking the resolution from the point count.
    pub fn set_auto_resolution(&mut self) {
        if self.voxel_resolution.is_some() {
            self.voxel_resolution = None;
            self.dirty.grid = true;
        }
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        if self.color_mode != mode {
            self.color_mode = mode;
            self.dirty.colors = true;
        }
    }

    pub fn set_select_mode(&mut self, mode: SelectMode) {
        self.selection.mode = mode;
    }

    /// View used to build pick rays. Until one is set, picks are no-ops.
    pub fn set_camera(&mut self, view: ViewCamera) {
        self.view = Some(view);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.queue.push(Queued::PointerDown { x, y });
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, ctrl: bool) {
        self.queue.push(Queued::PointerUp { x, y, ctrl });
    }

    pub fn search_by_name(&mut self, term: impl Into<String>, multi: bool) {
        self.queue.push(Queued::Search {
            term: term.into(),
            multi,
        });
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.dirty.selection = true;
        }
    }

    pub fn set_auto_target(&mut self, enabled: bool) {
        self.camera.set_auto_target(enabled);
        self.dirty.camera = true;
    }

    /// Jumps back to the configured home pose. With auto-target on, the
    /// camera then animates toward the selection again.
    pub fn home_camera(&mut self) {
        self.camera.home();
    }

    pub fn key_down(&mut self, key: MoveKey, now_ms: f64) {
        self.camera.key_down(key, now_ms);
    }

    pub fn key_up(&mut self, key: MoveKey) {
        self.camera.key_up(key);
    }

    // ---- frame ------------------------------------------------------------

    /// Runs one frame: partition, batches, collision, queued input, recolor,
    /// then the camera.
    ///
    /// Rebuilds are synchronous and replace whole structures, so a large
    /// dataset change costs one long frame.
    pub fn frame(&mut self, dt: f32, now_ms: f64) -> FrameOutput {
        self.frame += 1;
        let points: Arc<[Point]> = self.store.points().clone();
        let mut batch_events = Vec::new();
        let mut selection_changed = std::mem::take(&mut self.dirty.selection);

        if std::mem::take(&mut self.dirty.grid) {
            let resolution = self.voxel_resolution();
            self.grid = voxel::partition(&points, resolution, self.config.half_extent);
            let stats = self.grid.stats();
            log::debug!(
                "Voxel grid R={}: {} cells, {} empty ({:.1}%)",
                self.grid.resolution(),
                stats.total,
                stats.empty,
                stats.empty_percent()
            );

            let batches = batch::build(
                &points,
                &self.grid,
                &self.color_policy(),
                self.config.point_radius,
            );
            batch_events.extend(self.arena.sync(self.grid.resolution(), batches));
            self.dirty.colors = false;
        }

        if std::mem::take(&mut self.dirty.collision) {
            self.collision = CollisionIndex::build(
                &points,
                self.config.point_radius,
                self.config.pick_tolerance,
            );
        }

        let mut picks = Vec::new();
        let mut searches = Vec::new();
        for input in std::mem::take(&mut self.queue) {
            match input {
                Queued::PointerDown { x, y } => self.resolver.pointer_down(x, y),
                Queued::PointerUp { x, y, ctrl } => {
                    let outcome = self.resolver.pointer_up(
                        x,
                        y,
                        ctrl,
                        self.view.as_ref(),
                        &self.collision,
                        &mut self.selection,
                    );
                    if let PickOutcome::Hit { changed: true, .. } = outcome {
                        selection_changed = true;
                    }
                    picks.push(outcome);
                }
                Queued::Search { term, multi } => {
                    let found =
                        selection::search_by_name(&mut self.selection, &points, &term, multi);
                    if found.is_some() {
                        selection_changed = true;
                    } else {
                        log::debug!("No included point named {term:?}");
                    }
                    searches.push(found);
                }
            }
        }

        if std::mem::take(&mut self.dirty.colors) || selection_changed {
            let policy = self.color_policy();
            batch_events.extend(self.arena.recolor(&points, &policy));
        }

        let camera_dirty = std::mem::take(&mut self.dirty.camera);
        if selection_changed || camera_dirty {
            self.camera.set_selection_bounds(
                self.selection
                    .bounding_sphere(&points, self.config.point_radius),
            );
        }
        self.camera.advance(dt, now_ms);

        FrameOutput {
            frame: self.frame,
            batch_events,
            camera: self.camera.pose(),
            selection_changed,
            selection: self.selection.ids().to_vec(),
            picks,
            searches,
        }
    }

    // ---- queries ----------------------------------------------------------

    fn color_policy(&self) -> ColorPolicy {
        ColorPolicy::new(self.color_mode).with_highlight(self.selection.ids().iter().copied())
    }

    /// The resolution the next rebuild will use.
    pub fn voxel_resolution(&self) -> u32 {
        match self.voxel_resolution {
            Some(r) => r,
            None => voxel::auto_resolution(self.store.len()),
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn store(&self) -> &PointStore {
        &self.store
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        self.store.points()
    }

    #[inline]
    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    #[inline]
    pub fn arena(&self) -> &BatchArena {
        &self.arena
    }

    pub fn batches(&self) -> impl Iterator<Item = &DrawBatch> + '_ {
        self.arena.batches()
    }

    /// Hands back pending upload flags; call after uploading instance buffers.
    pub fn take_dirty_batches(&mut self) -> Vec<(BatchHandle, batch::BatchDirty)> {
        self.arena.take_dirty()
    }

    /// Coarse culling, one sphere test per batch.
    pub fn visible_batches(&self, frustum: &Frustum) -> Vec<BatchHandle> {
        self.arena.visible(frustum)
    }

    #[inline]
    pub fn collision(&self) -> &CollisionIndex {
        &self.collision
    }

    #[inline]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Names of the selected points, in selection order.
    pub fn selected_names(&self) -> Vec<Arc<str>> {
        self.selection
            .ids()
            .iter()
            .filter_map(|&id| self.store.get(id))
            .map(|p| p.subreddit.clone())
            .collect()
    }

    #[inline]
    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    #[inline]
    pub fn view(&self) -> Option<&ViewCamera> {
        self.view.as_ref()
    }

    #[inline]
    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

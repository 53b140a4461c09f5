use cloudmap::camera::CameraPose;
use cloudmap::selection::PickOutcome;
use cloudmap::Engine;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventCounts {
    pub created: usize,
    pub updated: usize,
    pub destroyed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRecord {
    pub term: String,
    pub found: Option<String>,
}

/// Sphere around every batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SceneBounds {
    pub center: [f32; 3],
    pub radius: f32,
}

/// Final state of a replay session.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub points: usize,
    pub included: usize,
    pub voxel_resolution: u32,
    pub occupied_voxels: usize,
    pub empty_voxels: usize,
    pub batch_count: usize,
    /// Instance count per batch, in voxel order.
    pub batch_sizes: Vec<usize>,
    pub collision_primitives: usize,
    pub scene_bounds: Option<SceneBounds>,
    pub selected: Vec<String>,
    pub camera: CameraPose,
    pub camera_animating: bool,
    pub frames: u64,
    pub events: EventCounts,
    pub picks: Vec<PickOutcome>,
    pub searches: Vec<SearchRecord>,
}

impl Report {
    pub fn collect(
        engine: &Engine,
        frames: u64,
        events: EventCounts,
        picks: Vec<PickOutcome>,
        searches: Vec<SearchRecord>,
    ) -> Self {
        let stats = engine.grid().stats();
        let batch_sizes: Vec<usize> = engine.batches().map(|b| b.instance_count()).collect();
        Self {
            points: engine.store().len(),
            included: engine.store().included_count(),
            voxel_resolution: engine.grid().resolution(),
            occupied_voxels: stats.occupied,
            empty_voxels: stats.empty,
            batch_count: batch_sizes.len(),
            batch_sizes,
            collision_primitives: engine.collision().len(),
            scene_bounds: engine.arena().bounds().map(|b| SceneBounds {
                center: b.center.to_array(),
                radius: b.radius,
            }),
            selected: engine
                .selected_names()
                .iter()
                .map(|n| n.to_string())
                .collect(),
            camera: engine.camera().pose(),
            camera_animating: engine.camera().is_animating(),
            frames,
            events,
            picks,
            searches,
        }
    }
}

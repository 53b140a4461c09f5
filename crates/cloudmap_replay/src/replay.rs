use crate::report::{EventCounts, Report, SearchRecord};
use crate::script::Step;
use anyhow::{anyhow, Result};
use cloudmap::batch::BatchEvent;
use cloudmap::picking::ViewCamera;
use cloudmap::selection::PickOutcome;
use cloudmap::{Dataset, Engine, FilterThresholds, FrameOutput};
use glam::Vec2;

/// Projection the replay host renders with.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub size: Vec2,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

/// Drives an [`Engine`] the way a render loop would: a fixed time step, a
/// view camera that follows the animated pose, and one frame after every
/// input so its outcome is visible.
pub struct Replay<'a> {
    engine: Engine,
    dataset: &'a Dataset,
    viewport: Viewport,
    dt: f32,
    now_ms: f64,
    frames: u64,
    events: EventCounts,
    picks: Vec<PickOutcome>,
    searches: Vec<SearchRecord>,
    pending_terms: Vec<String>,
}

impl<'a> Replay<'a> {
    pub fn new(engine: Engine, dataset: &'a Dataset, viewport: Viewport, dt: f32) -> Self {
        let mut replay = Self {
            engine,
            dataset,
            viewport,
            dt,
            now_ms: 0.0,
            frames: 0,
            events: EventCounts::default(),
            picks: Vec::new(),
            searches: Vec::new(),
            pending_terms: Vec::new(),
        };
        replay.sync_view();
        replay
    }

    #[inline]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn sync_view(&mut self) {
        let pose = self.engine.camera().pose();
        self.engine.set_camera(ViewCamera::perspective(
            &pose,
            self.viewport.fov_y_radians,
            self.viewport.size,
            self.viewport.near,
            self.viewport.far,
        ));
    }

    pub fn frame(&mut self) -> FrameOutput {
        let out = self.engine.frame(self.dt, self.now_ms);
        self.now_ms += f64::from(self.dt) * 1000.0;
        self.frames += 1;

        for event in &out.batch_events {
            match event {
                BatchEvent::Created(_) => self.events.created += 1,
                BatchEvent::Updated(_) => self.events.updated += 1,
                BatchEvent::Destroyed(_) => self.events.destroyed += 1,
            }
        }
        self.picks.extend(out.picks.iter().copied());
        for (term, found) in self.pending_terms.drain(..).zip(&out.searches) {
            let found = found
                .and_then(|id| self.engine.store().get(id))
                .map(|p| p.subreddit.to_string());
            self.searches.push(SearchRecord { term, found });
        }
        if out.selection_changed {
            log::info!(
                "Frame {}: selection is now {:?}",
                out.frame,
                self.engine.selected_names()
            );
        }

        self.sync_view();
        out
    }

    pub fn run_frames(&mut self, count: u32) {
        for _ in 0..count {
            self.frame();
        }
    }

    pub fn apply(&mut self, step: &Step) -> Result<()> {
        log::debug!("Step {step:?}");
        match step {
            Step::Frames { count } => {
                self.run_frames(*count);
                return Ok(());
            }
            Step::Click { x, y, ctrl } => {
                self.engine.pointer_down(*x, *y);
                self.engine.pointer_up(*x, *y, *ctrl);
            }
            Step::ClickPoint { name, ctrl } => {
                let at = self.screen_position(name)?;
                self.engine.pointer_down(at.x, at.y);
                self.engine.pointer_up(at.x, at.y, *ctrl);
            }
            Step::Drag { from, to } => {
                self.engine.pointer_down(from[0], from[1]);
                self.engine.pointer_up(to[0], to[1], false);
            }
            Step::Search { term, multi } => {
                self.pending_terms.push(term.clone());
                self.engine.search_by_name(term.clone(), *multi);
            }
            Step::Clear => self.engine.clear_selection(),
            Step::Filter {
                max_nsfw,
                hidden_prefix,
            } => self
                .engine
                .set_filter_thresholds(FilterThresholds::new(*max_nsfw, hidden_prefix.clone())),
            Step::Resolution { value } => match value {
                Some(r) => self.engine.set_voxel_resolution(*r),
                None => self.engine.set_auto_resolution(),
            },
            Step::AutoTarget { enabled } => self.engine.set_auto_target(*enabled),
            Step::SelectMode { mode } => self.engine.set_select_mode(*mode),
            Step::KeyDown { key } => self.engine.key_down(*key, self.now_ms),
            Step::KeyUp { key } => self.engine.key_up(*key),
            Step::ColorMode { mode } => self.engine.set_color_mode(*mode),
            Step::ClusterIndex { index } => self.engine.load(self.dataset, *index)?,
            Step::Home => self.engine.home_camera(),
        }
        self.frame();
        Ok(())
    }

    /// Pixel position of an included point, from the current view.
    fn screen_position(&self, name: &str) -> Result<Vec2> {
        let point = self
            .engine
            .points()
            .iter()
            .find(|p| p.include && &*p.subreddit == name)
            .ok_or_else(|| anyhow!("no included point named {name:?}"))?;
        let view = self
            .engine
            .view()
            .ok_or_else(|| anyhow!("no view camera to project {name:?}"))?;
        view.project(point.position)
            .ok_or_else(|| anyhow!("point {name:?} is behind the camera"))
    }

    pub fn report(&self) -> Report {
        Report::collect(
            &self.engine,
            self.frames,
            self.events,
            self.picks.clone(),
            self.searches.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script;
    use cloudmap::camera::MoveKey;
    use cloudmap::EngineConfig;

    const DATASET: &[u8] = br#"{
        "data": [
            {"subreddit": "rust", "x": 0, "y": 0, "z": 0, "cluster": [0, 1], "percentNsfw": 0},
            {"subreddit": "golang", "x": 30, "y": 0, "z": 0, "cluster": [0, 2], "percentNsfw": 0},
            {"subreddit": "spicy", "x": -30, "y": 5, "z": 0, "cluster": [1, 3], "percentNsfw": 90},
            {"subreddit": "u_someone", "x": -600, "y": -600, "z": -600, "cluster": [1, 0], "percentNsfw": 0}
        ],
        "clusterCounts": [2, 4]
    }"#;

    fn replay(dataset: &Dataset) -> Replay<'_> {
        let mut engine = Engine::new(EngineConfig {
            voxel_resolution: Some(3),
            ..EngineConfig::default()
        });
        engine.load(dataset, 0).unwrap();
        let viewport = Viewport {
            size: Vec2::new(800.0, 600.0),
            fov_y_radians: 75f32.to_radians(),
            near: 0.1,
            far: 5000.0,
        };
        Replay::new(engine, dataset, viewport, 1.0 / 60.0)
    }

    #[test]
    fn scripted_session_produces_a_report() {
        let dataset = Dataset::from_json_slice(DATASET, 1001.0).unwrap();
        let mut r = replay(&dataset);
        r.run_frames(1);

        let steps = script::parse(
            r#"[
                {"step": "click_point", "name": "rust"},
                {"step": "search", "term": "Go Lang", "multi": true},
                {"step": "search", "term": "python"},
                {"step": "filter", "max_nsfw": 50, "hidden_prefix": "U_"},
                {"step": "frames", "count": 5}
            ]"#,
        )
        .unwrap();
        for step in &steps {
            r.apply(step).unwrap();
        }

        let report = r.report();
        assert_eq!(report.points, 4);
        assert_eq!(report.included, 2);
        assert_eq!(report.collision_primitives, 2);
        assert_eq!(report.selected, vec!["rust".to_string(), "golang".to_string()]);
        assert_eq!(report.searches.len(), 2);
        assert_eq!(report.searches[0].found.as_deref(), Some("golang"));
        assert_eq!(report.searches[1].found, None);
        assert_eq!(report.frames, 10);
        assert!(report.events.created > 0);
        let bounds = report.scene_bounds.unwrap();
        assert!(bounds.radius > 14.9);
    }

    #[test]
    fn home_step_resets_the_eye() {
        let dataset = Dataset::from_json_slice(DATASET, 1001.0).unwrap();
        let mut r = replay(&dataset);
        r.apply(&Step::AutoTarget { enabled: false }).unwrap();
        r.apply(&Step::KeyDown { key: MoveKey::Forward }).unwrap();
        r.apply(&Step::KeyUp { key: MoveKey::Forward }).unwrap();
        assert_ne!(r.engine().camera().pose().position, [0.0, 0.0, 40.0]);

        r.apply(&Step::Home).unwrap();
        assert_eq!(r.engine().camera().pose().position, [0.0, 0.0, 40.0]);
    }

    #[test]
    fn drag_step_does_not_select() {
        let dataset = Dataset::from_json_slice(DATASET, 1001.0).unwrap();
        let mut r = replay(&dataset);
        r.run_frames(1);
        r.apply(&Step::Drag {
            from: [400.0, 300.0],
            to: [420.0, 300.0],
        })
        .unwrap();
        assert!(r.engine().selection().is_empty());
        assert_eq!(r.report().picks, vec![PickOutcome::Dragged]);
    }

    #[test]
    fn cluster_index_reloads_labels() {
        let dataset = Dataset::from_json_slice(DATASET, 1001.0).unwrap();
        let mut r = replay(&dataset);
        r.apply(&Step::ClusterIndex { index: 1 }).unwrap();
        let clusters: Vec<u32> = r.engine().points().iter().map(|p| p.cluster).collect();
        assert_eq!(clusters, vec![1, 2, 3, 0]);
        assert!(r.apply(&Step::ClusterIndex { index: 5 }).is_err());
    }

    #[test]
    fn clicking_a_hidden_point_is_an_error() {
        let dataset = Dataset::from_json_slice(DATASET, 1001.0).unwrap();
        let mut r = replay(&dataset);
        r.apply(&Step::Filter {
            max_nsfw: 10.0,
            hidden_prefix: None,
        })
        .unwrap();
        assert!(r
            .apply(&Step::ClickPoint {
                name: "spicy".into(),
                ctrl: false
            })
            .is_err());
    }
}

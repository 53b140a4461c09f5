//! The selection set and the rules that change it.

use crate::bounds::BoundingSphere;
use crate::collision::CollisionIndex;
use crate::data::types::{Point, PointId};
use crate::picking::{PointerRelease, PointerTracker, ViewCamera};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectMode {
    /// A click replaces the selection; clicking the sole selected point clears it.
    #[default]
    Single,
    /// Clicks toggle membership.
    Multi,
}

/// Selected point ids in selection order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    ids: Vec<PointId>,
    pub mode: SelectMode,
}

impl SelectionState {
    pub fn new(mode: SelectMode) -> Self {
        Self {
            ids: Vec::new(),
            mode,
        }
    }

    #[inline]
    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.ids.contains(&id)
    }

    /// Applies a click on `id`; `multi` is the modifier key and is OR-ed with
    /// the mode. Returns whether the selection changed.
    pub fn click(&mut self, id: PointId, multi: bool) -> bool {
        if multi || self.mode == SelectMode::Multi {
            match self.ids.iter().position(|&s| s == id) {
                Some(at) => {
                    self.ids.remove(at);
                }
                None => self.ids.push(id),
            }
            return true;
        }

        if self.ids == [id] {
            self.ids.clear();
        } else {
            self.ids.clear();
            self.ids.push(id);
        }
        true
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    /// Keeps ids matching `keep`, preserving order. Returns whether any were dropped.
    pub fn retain<F: FnMut(PointId) -> bool>(&mut self, mut keep: F) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&id| keep(id));
        self.ids.len() != before
    }

    /// Drops ids that do not survive a point-array swap: the id must still
    /// exist, name the same subreddit, and be included.
    pub fn reconcile(&mut self, old: &[Point], new: &[Point]) -> bool {
        let dropped = self.retain(|id| {
            match (old.get(id.index()), new.get(id.index())) {
                (Some(o), Some(n)) => n.include && o.subreddit == n.subreddit,
                _ => false,
            }
        });
        if dropped {
            log::debug!("Selection reconciled to {} points", self.ids.len());
        }
        dropped
    }

    /// Framing volume of the selected points.
    pub fn bounding_sphere(&self, points: &[Point], min_radius: f32) -> Option<BoundingSphere> {
        let positions: Vec<_> = self
            .ids
            .iter()
            .filter_map(|id| points.get(id.index()))
            .map(|p| p.position)
            .collect();
        BoundingSphere::from_points(&positions, min_radius)
    }
}

/// Lowercased with all whitespace removed.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// First included point whose normalized name equals the normalized term.
pub fn find_by_name(points: &[Point], term: &str) -> Option<PointId> {
    let needle = normalize_name(term);
    if needle.is_empty() {
        return None;
    }
    points
        .iter()
        .find(|p| p.include && normalize_name(&p.subreddit) == needle)
        .map(|p| p.id)
}

/// Selects (or toggles, with `multi`) the point named `term`.
/// No match leaves the selection alone and returns `None`.
pub fn search_by_name(
    selection: &mut SelectionState,
    points: &[Point],
    term: &str,
    multi: bool,
) -> Option<PointId> {
    let id = find_by_name(points, term)?;
    selection.click(id, multi);
    Some(id)
}

/// Result of one pointer release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PickOutcome {
    /// Moved past the drag threshold; selection untouched.
    Dragged,
    /// No camera to build a ray from yet.
    NoCamera,
    /// The ray hit nothing; selection untouched.
    Missed,
    Hit { id: PointId, changed: bool },
}

/// Turns pointer press/release pairs into selection changes.
#[derive(Debug, Clone)]
pub struct SelectionResolver {
    tracker: PointerTracker,
}

impl SelectionResolver {
    pub fn new(drag_threshold_px: f32) -> Self {
        Self {
            tracker: PointerTracker::new(drag_threshold_px),
        }
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.tracker.press(x, y);
    }

    pub fn pointer_up(
        &mut self,
        x: f32,
        y: f32,
        ctrl: bool,
        camera: Option<&ViewCamera>,
        index: &CollisionIndex,
        selection: &mut SelectionState,
    ) -> PickOutcome {
        if self.tracker.release(x, y) == PointerRelease::Drag {
            return PickOutcome::Dragged;
        }
        let Some(camera) = camera else {
            return PickOutcome::NoCamera;
        };
        let hit = camera.screen_ray(x, y).and_then(|ray| index.raycast(&ray));
        match hit {
            Some(hit) => PickOutcome::Hit {
                id: hit.id,
                changed: selection.click(hit.id, ctrl),
            },
            None => PickOutcome::Missed,
        }
    }
}

impl Default for SelectionResolver {
    fn default() -> Self {
        Self::new(crate::config::DRAG_THRESHOLD_PX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraPose;
    use glam::{Vec2, Vec3};

    fn ids(v: &[u32]) -> Vec<PointId> {
        v.iter().copied().map(PointId).collect()
    }

    fn points() -> Vec<Point> {
        vec![
            Point::new(0, "AskReddit", Vec3::new(0.0, 0.0, 0.0), 0, 0.0),
            Point::new(1, "rust", Vec3::new(10.0, 0.0, 0.0), 0, 0.0),
            Point::new(2, "Ask Science", Vec3::new(-10.0, 0.0, 0.0), 1, 0.0),
        ]
    }

    #[test]
    fn single_click_replaces_and_second_click_clears() {
        let mut s = SelectionState::default();
        s.click(PointId(1), false);
        s.click(PointId(2), false);
        assert_eq!(s.ids(), ids(&[2]));
        s.click(PointId(2), false);
        assert!(s.is_empty());
    }

    #[test]
    fn multi_click_toggles_and_keeps_order() {
        let mut s = SelectionState::default();
        for i in [3, 1, 4, 5] {
            s.click(PointId(i), true);
        }
        s.click(PointId(4), true);
        assert_eq!(s.ids(), ids(&[3, 1, 5]));
        s.click(PointId(4), true);
        assert_eq!(s.ids(), ids(&[3, 1, 5, 4]));

        let mut m = SelectionState::new(SelectMode::Multi);
        m.click(PointId(7), false);
        m.click(PointId(8), false);
        m.click(PointId(7), false);
        assert_eq!(m.ids(), ids(&[8]));
    }

    #[test]
    fn single_click_collapses_a_multi_selection() {
        let mut s = SelectionState::default();
        s.click(PointId(1), true);
        s.click(PointId(2), true);
        s.click(PointId(1), false);
        assert_eq!(s.ids(), ids(&[1]));
    }

    #[test]
    fn names_normalize_case_and_whitespace() {
        assert_eq!(normalize_name("  Ask Sci ence\t"), "askscience");
        let pts = points();
        assert_eq!(find_by_name(&pts, "askscience"), Some(PointId(2)));
        assert_eq!(find_by_name(&pts, "RUST "), Some(PointId(1)));
        assert_eq!(find_by_name(&pts, "golang"), None);
        assert_eq!(find_by_name(&pts, "   "), None);
    }

    #[test]
    fn search_skips_excluded_points() {
        let mut pts = points();
        pts[1].include = false;
        let mut s = SelectionState::default();
        assert_eq!(search_by_name(&mut s, &pts, "rust", false), None);
        assert!(s.is_empty());
        assert_eq!(search_by_name(&mut s, &pts, "askreddit", true), Some(PointId(0)));
        assert_eq!(s.ids(), ids(&[0]));
    }

    #[test]
    fn reconcile_drops_stale_and_excluded_ids() {
        let old = points();
        let mut new = points();
        new[0].include = false;
        new[2] = Point::new(2, "different", Vec3::ZERO, 0, 0.0);

        let mut s = SelectionState::default();
        for i in [0, 1, 2, 9] {
            s.click(PointId(i), true);
        }
        assert!(s.reconcile(&old, &new));
        assert_eq!(s.ids(), ids(&[1]));
        assert!(!s.reconcile(&new, &new));
    }

    #[test]
    fn bounding_sphere_covers_selection() {
        let pts = points();
        let mut s = SelectionState::default();
        assert!(s.bounding_sphere(&pts, 1.0).is_none());
        s.click(PointId(1), true);
        s.click(PointId(2), true);
        let b = s.bounding_sphere(&pts, 1.0).unwrap();
        assert_eq!(b.center, Vec3::ZERO);
        assert_eq!(b.radius, 10.0);
    }

    fn camera() -> ViewCamera {
        let pose = CameraPose {
            position: [0.0, 0.0, 40.0],
            target: [0.0, 0.0, 0.0],
        };
        ViewCamera::perspective(&pose, 60f32.to_radians(), Vec2::new(800.0, 600.0), 0.1, 5000.0)
    }

    #[test]
    fn drag_over_a_point_changes_nothing() {
        let pts = points();
        let index = CollisionIndex::build(&pts, 1.0, 0.0);
        let cam = camera();
        let mut s = SelectionState::default();
        let mut r = SelectionResolver::default();

        r.pointer_down(380.0, 300.0);
        let out = r.pointer_up(400.0, 300.0, false, Some(&cam), &index, &mut s);
        assert_eq!(out, PickOutcome::Dragged);
        assert!(s.is_empty());

        r.pointer_down(400.0, 300.0);
        let out = r.pointer_up(402.0, 301.0, false, Some(&cam), &index, &mut s);
        assert_eq!(
            out,
            PickOutcome::Hit {
                id: PointId(0),
                changed: true
            }
        );
        assert_eq!(s.ids(), ids(&[0]));
    }

    #[test]
    fn empty_space_and_missing_camera_leave_selection() {
        let pts = points();
        let index = CollisionIndex::build(&pts, 1.0, 0.0);
        let cam = camera();
        let mut s = SelectionState::default();
        s.click(PointId(1), false);
        let mut r = SelectionResolver::default();

        r.pointer_down(10.0, 10.0);
        assert_eq!(
            r.pointer_up(10.0, 10.0, false, Some(&cam), &index, &mut s),
            PickOutcome::Missed
        );
        r.pointer_down(400.0, 300.0);
        assert_eq!(
            r.pointer_up(400.0, 300.0, false, None, &index, &mut s),
            PickOutcome::NoCamera
        );
        assert_eq!(s.ids(), ids(&[1]));
    }
}

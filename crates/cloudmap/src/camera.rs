use crate::bounds::BoundingSphere;
use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Frame time the keyboard momentum curve was tuned at (seconds).
const MOMENTUM_REFERENCE_DT: f32 = 0.008;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Interpolation rate; the lerp factor per frame is `speed * dt`.
    pub speed: f32,
    /// Distance below which the orbit target counts as converged.
    pub target_threshold: f32,
    /// The position only starts moving once the target is within
    /// `target_threshold * position_gate_multiplier` of its goal.
    ///
    /// The default of 1.0 keeps the eye still until the target has snapped
    /// onto its goal, so framing a selection always pans first and then
    /// dollies. A coarse gate such as 200 lets both move together for most
    /// of the approach.
    pub position_gate_multiplier: f32,
    /// Final orbit distance is `orbit_offset + orbit_scale * radius`.
    pub orbit_offset: f32,
    pub orbit_scale: f32,
    /// Pose used on construction and by [`CameraController::home`].
    pub home_position: [f32; 3],
    pub home_target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            target_threshold: 0.1,
            position_gate_multiplier: 1.0,
            orbit_offset: 12.0,
            orbit_scale: 2.0,
            home_position: [0.0, 0.0, 40.0],
            home_target: [0.0, 0.0, 0.0],
        }
    }
}

impl CameraConfig {
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let fix = |value: &mut f32, default: f32, name: &str| {
            if !(value.is_finite() && *value >= 0.0) {
                log::warn!("Invalid camera {name} {value}; using {default}.");
                *value = default;
            }
        };
        fix(&mut self.speed, defaults.speed, "speed");
        fix(
            &mut self.target_threshold,
            defaults.target_threshold,
            "target_threshold",
        );
        fix(
            &mut self.position_gate_multiplier,
            defaults.position_gate_multiplier,
            "position_gate_multiplier",
        );
        fix(&mut self.orbit_offset, defaults.orbit_offset, "orbit_offset");
        fix(&mut self.orbit_scale, defaults.orbit_scale, "orbit_scale");
        self
    }

    /// Orbit distance that frames a selection of the given radius.
    #[inline]
    pub fn orbit_distance(&self, radius: f32) -> f32 {
        self.orbit_offset + self.orbit_scale * radius
    }
}

/// Held-key translation directions, in camera-local terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveKey {
    #[serde(alias = "w")]
    Forward,
    #[serde(alias = "s")]
    Back,
    #[serde(alias = "a")]
    Left,
    #[serde(alias = "d")]
    Right,
}

impl MoveKey {
    pub const ALL: [MoveKey; 4] = [Self::Forward, Self::Back, Self::Left, Self::Right];

    /// Maps the W/A/S/D keys, case-insensitively.
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "w" | "forward" => Some(Self::Forward),
            "s" | "back" => Some(Self::Back),
            "a" | "left" => Some(Self::Left),
            "d" | "right" => Some(Self::Right),
            _ => None,
        }
    }

    #[inline]
    fn slot(self) -> usize {
        self as usize
    }
}

/// What the renderer needs to place the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl CameraPose {
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(
            Vec3::from(self.position),
            Vec3::from(self.target),
            Vec3::Y,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraAnimState {
    pub target: Vec3,
    pub position: Vec3,
    pub desired_target: Option<Vec3>,
    /// The point the camera approaches; it stops `desired_distance` short of it.
    pub desired_position: Option<Vec3>,
    pub desired_distance: f32,
    pub target_converged: bool,
    pub position_converged: bool,
}

impl CameraAnimState {
    fn at(position: Vec3, target: Vec3) -> Self {
        Self {
            target,
            position,
            desired_target: None,
            desired_position: None,
            desired_distance: 0.0,
            target_converged: false,
            position_converged: false,
        }
    }
}

/// Animates the orbit target and eye toward the current selection and applies
/// held-key translation on top.
#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraConfig,
    state: CameraAnimState,
    auto_target: bool,
    /// Press time (ms) per [`MoveKey`] slot.
    held: [Option<f64>; 4],
}

impl CameraController {
    pub fn new(config: CameraConfig) -> Self {
        let state = CameraAnimState::at(
            Vec3::from(config.home_position),
            Vec3::from(config.home_target),
        );
        Self {
            config,
            state,
            auto_target: true,
            held: [None; 4],
        }
    }

    #[inline]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &CameraAnimState {
        &self.state
    }

    #[inline]
    pub fn auto_target(&self) -> bool {
        self.auto_target
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.state.position.to_array(),
            target: self.state.target.to_array(),
        }
    }

    /// True while an automatic move has not finished.
    pub fn is_animating(&self) -> bool {
        self.auto_target
            && ((self.state.desired_target.is_some() && !self.state.target_converged)
                || (self.state.desired_position.is_some() && !self.state.position_converged))
    }

    /// Points the animation at a selection volume, or stops it for `None`.
    ///
    /// Convergence restarts only when the goal actually changes, so calling
    /// this every frame with the same bounds is harmless.
    pub fn set_selection_bounds(&mut self, bounds: Option<BoundingSphere>) {
        let s = &mut self.state;
        match bounds {
            Some(sphere) => {
                let distance = self.config.orbit_distance(sphere.radius);
                if s.desired_target != Some(sphere.center) || s.desired_distance != distance {
                    s.desired_target = Some(sphere.center);
                    s.desired_position = Some(sphere.center);
                    s.desired_distance = distance;
                    s.target_converged = false;
                    s.position_converged = false;
                }
            }
            None => {
                s.desired_target = None;
                s.desired_position = None;
                s.desired_distance = 0.0;
                s.target_converged = false;
                s.position_converged = false;
            }
        }
    }

    /// Turning auto-targeting back on resumes convergence toward the current goal.
    pub fn set_auto_target(&mut self, enabled: bool) {
        if enabled && !self.auto_target {
            self.state.target_converged = false;
            self.state.position_converged = false;
        }
        self.auto_target = enabled;
    }

    /// Records a key press; repeats while held keep the first timestamp.
    pub fn key_down(&mut self, key: MoveKey, now_ms: f64) {
        let slot = &mut self.held[key.slot()];
        if slot.is_none() {
            *slot = Some(now_ms);
        }
    }

    pub fn key_up(&mut self, key: MoveKey) {
        self.held[key.slot()] = None;
    }

    pub fn held_keys(&self) -> impl Iterator<Item = MoveKey> + '_ {
        MoveKey::ALL
            .into_iter()
            .filter(|k| self.held[k.slot()].is_some())
    }

    /// Jumps to a pose, dropping held keys. The goal, if any, is kept and
    /// animated toward again.
    pub fn reset(&mut self, position: Vec3, target: Vec3) {
        self.state.position = position;
        self.state.target = target;
        self.state.target_converged = false;
        self.state.position_converged = false;
        self.held = [None; 4];
    }

    pub fn home(&mut self) {
        self.reset(
            Vec3::from(self.config.home_position),
            Vec3::from(self.config.home_target),
        );
    }

    /// One frame of animation followed by keyboard translation.
    pub fn advance(&mut self, dt: f32, now_ms: f64) {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if self.auto_target {
            self.animate(dt);
        }
        self.translate(dt, now_ms);
    }

    fn animate(&mut self, dt: f32) {
        let cfg = &self.config;
        let s = &mut self.state;
        let t = (cfg.speed * dt).clamp(0.0, 1.0);

        // The gate is checked against the target as it was when the frame
        // started, so the eye never moves in the frame the target settles.
        let gate_open = match s.desired_target {
            Some(goal) => {
                s.target_converged
                    || s.target.distance(goal) <= cfg.target_threshold * cfg.position_gate_multiplier
            }
            None => false,
        };

        if let Some(goal) = s.desired_target {
            if !s.target_converged {
                if s.target.distance(goal) > cfg.target_threshold {
                    s.target = s.target.lerp(goal, t);
                }
                if s.target.distance(goal) <= cfg.target_threshold {
                    s.target = goal;
                    s.target_converged = true;
                    log::trace!("Camera target converged at {goal:?}");
                }
            }
        }

        if let Some(goal) = s.desired_position {
            if !s.position_converged && gate_open {
                let before = s.position;
                if before.distance(goal) > s.desired_distance {
                    s.position = before.lerp(goal, t);
                }
                if s.position.distance(goal) <= s.desired_distance {
                    let approach = (before - goal).try_normalize().unwrap_or(Vec3::Z);
                    s.position = goal + approach * s.desired_distance;
                    s.position_converged = true;
                    log::trace!("Camera position converged at {:?}", s.position);
                }
            }
        }
    }

    fn translate(&mut self, dt: f32, now_ms: f64) {
        if self.held.iter().all(Option::is_none) || dt == 0.0 {
            return;
        }

        let s = &mut self.state;
        let forward = (s.target - s.position)
            .try_normalize()
            .unwrap_or(Vec3::NEG_Z);
        let right = forward.cross(Vec3::Y).try_normalize().unwrap_or(Vec3::X);

        let mut delta = Vec3::ZERO;
        for key in MoveKey::ALL {
            let Some(pressed) = self.held[key.slot()] else {
                continue;
            };
            let amount = momentum((now_ms - pressed).max(0.0), dt);
            delta += match key {
                MoveKey::Forward => forward * amount,
                MoveKey::Back => -forward * amount,
                MoveKey::Right => right * amount,
                MoveKey::Left => -right * amount,
            };
        }

        s.position += delta;
        s.target += delta;
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

/// World units moved this frame for a key held `held_ms`; grows with the
/// hold time and scales linearly with `dt`.
pub fn momentum(held_ms: f64, dt: f32) -> f32 {
    let base = (held_ms + 200.0).sqrt() as f32 * 0.01 + 0.05;
    base * dt / MOMENTUM_REFERENCE_DT
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn select(cam: &mut CameraController, center: Vec3, radius: f32) {
        cam.set_selection_bounds(Some(BoundingSphere::new(center, radius)));
    }

    #[test]
    fn home_returns_to_the_configured_pose() {
        let mut cam = CameraController::default();
        cam.key_down(MoveKey::Forward, 0.0);
        cam.advance(DT, 100.0);
        assert_ne!(cam.pose().position, [0.0, 0.0, 40.0]);

        cam.home();
        assert_eq!(cam.pose().position, [0.0, 0.0, 40.0]);
        assert_eq!(cam.pose().target, [0.0, 0.0, 0.0]);
        assert_eq!(cam.held_keys().count(), 0);
    }

    #[test]
    fn target_settles_before_position_moves() {
        let mut cam = CameraController::default();
        let goal = Vec3::new(10.0, 0.0, 0.0);
        select(&mut cam, goal, 1.0);

        let start = cam.state().position;
        let mut settled_at = None;
        let mut moved_at = None;
        for frame in 0..600 {
            let target_was_settled = cam.state().target_converged;
            cam.advance(DT, frame as f64 * 16.0);
            if cam.state().target_converged && settled_at.is_none() {
                settled_at = Some(frame);
            }
            if cam.state().position != start && moved_at.is_none() {
                assert!(target_was_settled, "position moved at frame {frame} before target settled");
                moved_at = Some(frame);
            }
        }

        let settled_at = settled_at.expect("target never converged");
        let moved_at = moved_at.expect("position never moved");
        assert!(settled_at < moved_at);
        assert_eq!(cam.state().target, goal);
        assert!(cam.state().position_converged);
    }

    #[test]
    fn coarse_gate_lets_position_move_during_the_pan() {
        let mut cam = CameraController::new(CameraConfig {
            position_gate_multiplier: 200.0,
            ..CameraConfig::default()
        });
        select(&mut cam, Vec3::new(10.0, 0.0, 0.0), 1.0);

        let start = cam.state().position;
        cam.advance(DT, 0.0);
        cam.advance(DT, 16.0);
        assert!(!cam.state().target_converged);
        assert_ne!(cam.state().position, start);
    }

    #[test]
    fn position_snaps_to_exact_orbit_distance() {
        let mut cam = CameraController::default();
        let goal = Vec3::new(0.0, 0.0, -30.0);
        select(&mut cam, goal, 3.0);
        for frame in 0..1000 {
            cam.advance(DT, frame as f64 * 16.0);
        }
        let expected = cam.config().orbit_distance(3.0);
        assert_eq!(expected, 18.0);
        let d = cam.state().position.distance(goal);
        assert!((d - expected).abs() < 1e-4, "distance {d}");
        // Approached from +Z, so the eye stays on that side.
        assert!(cam.state().position.z > goal.z);
        assert!(!cam.is_animating());
    }

    #[test]
    fn already_close_camera_is_pushed_out_along_approach() {
        let mut cam = CameraController::default();
        cam.reset(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO);
        select(&mut cam, Vec3::ZERO, 1.0);
        cam.advance(DT, 0.0);
        cam.advance(DT, 16.0);
        assert!(cam.state().position_converged);
        assert!((cam.state().position - Vec3::new(0.0, 0.0, 14.0)).length() < 1e-5);
    }

    #[test]
    fn same_bounds_do_not_restart_animation() {
        let mut cam = CameraController::default();
        select(&mut cam, Vec3::X, 1.0);
        for frame in 0..1000 {
            cam.advance(DT, frame as f64);
        }
        assert!(!cam.is_animating());
        select(&mut cam, Vec3::X, 1.0);
        assert!(!cam.is_animating());
        select(&mut cam, Vec3::Y, 1.0);
        assert!(cam.is_animating());
    }

    #[test]
    fn empty_selection_leaves_camera_alone() {
        let mut cam = CameraController::default();
        let before = cam.state().clone();
        cam.set_selection_bounds(None);
        cam.advance(DT, 0.0);
        assert_eq!(cam.state().position, before.position);
        assert_eq!(cam.state().target, before.target);
    }

    #[test]
    fn disabled_auto_target_freezes_animation() {
        let mut cam = CameraController::default();
        cam.set_auto_target(false);
        select(&mut cam, Vec3::new(50.0, 0.0, 0.0), 1.0);
        let before = cam.pose();
        for frame in 0..100 {
            cam.advance(DT, frame as f64);
        }
        assert_eq!(cam.pose(), before);

        cam.set_auto_target(true);
        cam.advance(DT, 100.0);
        assert_ne!(cam.pose().target, before.target);
    }

    #[test]
    fn forward_key_moves_eye_and_target_together() {
        let mut cam = CameraController::default();
        cam.set_auto_target(false);
        cam.key_down(MoveKey::Forward, 0.0);
        cam.advance(0.008, 0.0);

        let step = momentum(0.0, 0.008);
        assert!((step - (200f32.sqrt() * 0.01 + 0.05)).abs() < 1e-6);
        assert!((cam.state().position - Vec3::new(0.0, 0.0, 40.0 - step)).length() < 1e-5);
        assert!((cam.state().target - Vec3::new(0.0, 0.0, -step)).length() < 1e-5);

        cam.key_up(MoveKey::Forward);
        let pose = cam.pose();
        cam.advance(0.008, 8.0);
        assert_eq!(cam.pose(), pose);
    }

    #[test]
    fn strafe_is_perpendicular_to_view() {
        let mut cam = CameraController::default();
        cam.set_auto_target(false);
        cam.key_down(MoveKey::Right, 0.0);
        cam.advance(DT, 0.0);
        let p = cam.state().position;
        assert!(p.x > 0.0);
        assert!((p.z - 40.0).abs() < 1e-5);
    }

    #[test]
    fn movement_is_frame_rate_independent() {
        let mut coarse = CameraController::default();
        let mut fine = CameraController::default();
        for cam in [&mut coarse, &mut fine] {
            cam.set_auto_target(false);
            cam.key_down(MoveKey::Back, 0.0);
        }
        coarse.advance(0.016, 500.0);
        fine.advance(0.008, 500.0);
        fine.advance(0.008, 500.0);
        let a = coarse.state().position;
        let b = fine.state().position;
        assert!((a - b).length() < 1e-4, "{a:?} vs {b:?}");
    }

    #[test]
    fn momentum_grows_with_hold_time() {
        assert!(momentum(2000.0, DT) > momentum(0.0, DT));
        assert_eq!(momentum(100.0, 0.0), 0.0);
    }

    #[test]
    fn repeated_key_down_keeps_first_press() {
        let mut cam = CameraController::default();
        cam.key_down(MoveKey::Left, 10.0);
        cam.key_down(MoveKey::Left, 500.0);
        assert_eq!(cam.held[MoveKey::Left.slot()], Some(10.0));
        assert_eq!(cam.held_keys().collect::<Vec<_>>(), vec![MoveKey::Left]);
    }

    #[test]
    fn keys_parse_from_wasd() {
        assert_eq!(MoveKey::from_key("W"), Some(MoveKey::Forward));
        assert_eq!(MoveKey::from_key("d"), Some(MoveKey::Right));
        assert_eq!(MoveKey::from_key("q"), None);
        let k: MoveKey = serde_json::from_str("\"a\"").unwrap();
        assert_eq!(k, MoveKey::Left);
    }
}

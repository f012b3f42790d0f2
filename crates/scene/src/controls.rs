//! Orbit controls: rotate and zoom the camera around its target.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::camera::PerspectiveCamera;

const EPS: f32 = 1e-6;

/// Orbit behaviour knobs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub auto_rotate: bool,
    /// 2.0 is one full orbit every 30 seconds at 60 updates per second.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
        }
    }
}

impl ControlsConfig {
    /// Polar limits in ascending order within `[0, π]`.
    pub fn polar_range(&self) -> (f32, f32) {
        let defaults = Self::default();
        let (min, max) = ordered(
            (self.min_polar_angle, defaults.min_polar_angle),
            (self.max_polar_angle, defaults.max_polar_angle),
        );
        (min.clamp(0.0, PI), max.clamp(0.0, PI))
    }

    /// Distance limits in ascending order, never negative.
    pub fn distance_range(&self) -> (f32, f32) {
        let defaults = Self::default();
        let (min, max) = ordered(
            (self.min_distance, defaults.min_distance),
            (self.max_distance, defaults.max_distance),
        );
        (min.max(0.0), max.max(0.0))
    }
}

/// `(value, fallback)` pairs; NaN takes the fallback and the pair is sorted.
fn ordered(lo: (f32, f32), hi: (f32, f32)) -> (f32, f32) {
    let pick = |(value, fallback): (f32, f32)| if value.is_nan() { fallback } else { value };
    let (a, b) = (pick(lo), pick(hi));
    (a.min(b), a.max(b))
}

/// Orbit-style camera controller.
///
/// Input methods only accumulate deltas; [`OrbitControls::update`] applies
/// them to the camera, once per frame.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub config: ControlsConfig,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    position0: Vec3,
    target0: Vec3,
}

impl OrbitControls {
    /// Bind to a camera, remembering its current pose for [`Self::reset`].
    pub fn new(camera: &PerspectiveCamera, config: ControlsConfig) -> Self {
        Self {
            config,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            position0: camera.position,
            target0: camera.target,
        }
    }

    /// Pointer drag of `dx`/`dy` logical pixels on a surface `surface_height` tall.
    pub fn rotate(&mut self, dx: f32, dy: f32, surface_height: u32) {
        let height = surface_height.max(1) as f32;
        self.delta_theta -= TAU * dx / height * self.config.rotate_speed;
        self.delta_phi -= TAU * dy / height * self.config.rotate_speed;
    }

    /// Zoom by wheel steps; positive steps move the camera closer.
    pub fn zoom(&mut self, steps: f32) {
        self.scale *= 0.95_f32.powf(self.config.zoom_speed * steps);
    }

    /// Per-update auto-rotation angle in radians.
    pub fn auto_rotation_angle(&self) -> f32 {
        TAU / 60.0 / 60.0 * self.config.auto_rotate_speed
    }

    /// Apply accumulated input (and auto-rotation) to the camera.
    /// Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - camera.target;
        let mut radius = offset.length();
        if radius < EPS {
            self.clear_deltas();
            return false;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        if self.config.auto_rotate {
            self.delta_theta -= self.auto_rotation_angle();
        }

        theta += self.delta_theta;
        phi += self.delta_phi;
        let (min_phi, max_phi) = self.config.polar_range();
        phi = phi.clamp(min_phi, max_phi).clamp(EPS, PI - EPS);

        let (min_distance, max_distance) = self.config.distance_range();
        radius = (radius * self.scale).clamp(min_distance, max_distance);

        let sin_phi_radius = phi.sin() * radius;
        let new_offset = Vec3::new(
            sin_phi_radius * theta.sin(),
            phi.cos() * radius,
            sin_phi_radius * theta.cos(),
        );

        let previous = camera.position;
        camera.position = camera.target + new_offset;
        self.clear_deltas();

        previous.distance_squared(camera.position) > EPS
    }

    /// Return the camera to the pose it had when the controls were created.
    pub fn reset(&mut self, camera: &mut PerspectiveCamera) {
        camera.position = self.position0;
        camera.target = self.target0;
        self.clear_deltas();
    }

    fn clear_deltas(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraConfig;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera::new(&CameraConfig::default(), 1.0)
    }

    #[test]
    fn idle_update_keeps_camera_still() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, ControlsConfig::default());
        let start = cam.position;
        assert!(!controls.update(&mut cam));
        assert!(cam.position.distance(start) < 1e-3);
    }

    #[test]
    fn rotation_preserves_distance_to_target() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, ControlsConfig::default());
        let radius = cam.position.distance(cam.target);
        controls.rotate(120.0, -40.0, 700);
        assert!(controls.update(&mut cam));
        assert!((cam.position.distance(cam.target) - radius).abs() < 1e-2);
    }

    #[test]
    fn polar_angle_is_clamped_at_the_pole() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, ControlsConfig::default());
        // Drag far enough to flip over the top several times.
        controls.rotate(0.0, 10_000.0, 100);
        controls.update(&mut cam);
        let offset = cam.position - cam.target;
        assert!(offset.y > 0.0);
        assert!(offset.x.is_finite() && offset.z.is_finite());
    }

    #[test]
    fn zoom_moves_closer_and_respects_min_distance() {
        let mut cam = camera();
        let config = ControlsConfig {
            min_distance: 20.0,
            ..ControlsConfig::default()
        };
        let mut controls = OrbitControls::new(&cam, config);
        let radius = cam.position.distance(cam.target);
        controls.zoom(1.0);
        controls.update(&mut cam);
        let closer = cam.position.distance(cam.target);
        assert!(closer < radius);

        controls.zoom(500.0);
        controls.update(&mut cam);
        assert!((cam.position.distance(cam.target) - 20.0).abs() < 1e-3);
    }

    #[test]
    fn inverted_or_nan_limits_are_normalised() {
        let config = ControlsConfig {
            min_polar_angle: 2.0,
            max_polar_angle: 1.0,
            min_distance: 100.0,
            max_distance: 10.0,
            ..ControlsConfig::default()
        };
        assert_eq!(config.polar_range(), (1.0, 2.0));
        assert_eq!(config.distance_range(), (10.0, 100.0));

        let nan = ControlsConfig {
            min_polar_angle: f32::NAN,
            max_polar_angle: 7.0,
            min_distance: -5.0,
            max_distance: f32::NAN,
            ..ControlsConfig::default()
        };
        assert_eq!(nan.polar_range(), (0.0, PI));
        assert_eq!(nan.distance_range(), (0.0, f32::INFINITY));
    }

    #[test]
    fn inverted_limits_from_yaml_do_not_break_updates() {
        let config = crate::config::SceneConfig::from_yaml_str(
            "controls:\n  min_polar_angle: 2.0\n  max_polar_angle: 1.0\n  min_distance: 100.0\n  max_distance: 10.0\n",
        )
        .unwrap();
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, config.controls);
        controls.rotate(50.0, 20.0, 700);
        controls.update(&mut cam);
        let offset = cam.position - cam.target;
        let radius = offset.length();
        assert!((10.0..=100.0 + 1e-3).contains(&radius));
        let phi = (offset.y / radius).acos();
        assert!((1.0 - 1e-3..=2.0 + 1e-3).contains(&phi));
    }

    #[test]
    fn auto_rotate_advances_every_update() {
        let mut cam = camera();
        let config = ControlsConfig {
            auto_rotate: true,
            ..ControlsConfig::default()
        };
        let mut controls = OrbitControls::new(&cam, config);
        let start = cam.position;
        assert!(controls.update(&mut cam));
        assert!(controls.update(&mut cam));
        assert_ne!(cam.position, start);
        assert!((cam.position.y - start.y).abs() < 1e-3);
    }

    #[test]
    fn reset_restores_initial_pose() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(&cam, ControlsConfig::default());
        let start = cam.position;
        controls.rotate(300.0, 0.0, 500);
        controls.update(&mut cam);
        controls.reset(&mut cam);
        assert_eq!(cam.position, start);
    }
}

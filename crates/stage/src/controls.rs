use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};
use hatchlight_render::PerspectiveCamera;

use crate::config::ControlsConfig;

/// Keeps the polar angle off the poles, where the up vector degenerates.
const POLAR_EPSILON: f32 = 1e-6;

/// Orbit camera controls.
///
/// The camera sits on a sphere around `target`.
/// - Pointer drag: rotate around the target
/// - Wheel: dolly in/out
///
/// Input accumulates into a pending delta; [`OrbitControls::update`] applies
/// it once per frame. With damping the delta is applied a fraction at a time
/// and decays, so motion eases out instead of stopping dead.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pending (azimuth, polar) rotation in radians.
    delta: Vec2,
    /// Pending radius multiplier.
    scale: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self::from_config(target, &ControlsConfig::default())
    }

    pub fn from_config(target: Vec3, config: &ControlsConfig) -> Self {
        Self {
            target,
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            delta: Vec2::ZERO,
            scale: 1.0,
        }
    }

    /// Pointer moved by `delta` pixels while dragging, in a viewport
    /// `viewport_height` pixels tall. A full-height drag is one turn.
    pub fn pointer_drag(&mut self, delta: Vec2, viewport_height: f32) {
        if !(viewport_height > 0.0) || !delta.is_finite() {
            return;
        }
        self.rotate_left(TAU * delta.x / viewport_height * self.rotate_speed);
        self.rotate_up(TAU * delta.y / viewport_height * self.rotate_speed);
    }

    /// Wheel scrolled by `lines`; positive moves toward the target.
    pub fn wheel(&mut self, lines: f32) {
        if !lines.is_finite() || lines == 0.0 {
            return;
        }
        let step = 0.95_f32.powf(self.zoom_speed * lines.abs());
        if lines > 0.0 {
            self.scale *= step;
        } else {
            self.scale /= step;
        }
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.delta.x -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.delta.y -= angle;
    }

    /// True while input is still being applied.
    pub fn is_moving(&self) -> bool {
        self.delta.abs().max_element() > 1e-6 || (self.scale - 1.0).abs() > 1e-6
    }

    /// Apply pending input to `camera`. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let radius = offset.length();
        if !(radius > f32::EPSILON) {
            // Camera on the target: no sphere to move on, keep its heading.
            self.delta = Vec2::ZERO;
            self.scale = 1.0;
            return false;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        if self.enable_damping {
            theta += self.delta.x * self.damping_factor;
            phi += self.delta.y * self.damping_factor;
        } else {
            theta += self.delta.x;
            phi += self.delta.y;
        }
        phi = phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        let radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let sin_phi = phi.sin();
        let new_offset = Vec3::new(
            radius * sin_phi * theta.sin(),
            radius * phi.cos(),
            radius * sin_phi * theta.cos(),
        );
        let position = self.target + new_offset;

        if self.enable_damping {
            self.delta *= 1.0 - self.damping_factor;
        } else {
            self.delta = Vec2::ZERO;
        }
        self.scale = 1.0;

        let moved = (position - camera.position).length_squared() > 1e-10
            || camera.target != self.target;
        camera.position = position;
        camera.target = self.target;
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> PerspectiveCamera {
        PerspectiveCamera {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            ..PerspectiveCamera::default()
        }
    }

    fn undamped() -> OrbitControls {
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.enable_damping = false;
        controls
    }

    #[test]
    fn idle_update_keeps_camera() {
        let mut cam = camera();
        let mut controls = undamped();
        controls.update(&mut cam);
        assert!((cam.position - Vec3::new(0.0, 0.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn undamped_rotation_applies_fully_once() {
        let mut cam = camera();
        let mut controls = undamped();
        controls.rotate_left(-std::f32::consts::FRAC_PI_2);
        assert!(controls.update(&mut cam));
        assert!((cam.position - Vec3::new(10.0, 0.0, 0.0)).length() < 1e-3);
        assert!(!controls.is_moving());
        assert!(!controls.update(&mut cam));
    }

    #[test]
    fn damping_eases_toward_full_rotation() {
        let mut cam = camera();
        let mut controls = OrbitControls::new(Vec3::ZERO);
        controls.rotate_left(-0.5);

        controls.update(&mut cam);
        let first = cam.position.x.atan2(cam.position.z);
        assert!((first - 0.5 * 0.05).abs() < 1e-4);

        for _ in 0..400 {
            controls.update(&mut cam);
        }
        let settled = cam.position.x.atan2(cam.position.z);
        assert!((settled - 0.5).abs() < 1e-3, "settled at {settled}");
        assert!(!controls.is_moving());
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut cam = camera();
        let mut controls = undamped();
        controls.rotate_up(10.0);
        controls.update(&mut cam);
        assert!(cam.position.is_finite());
        assert!(cam.view_matrix().is_finite());
        assert!(cam.position.y > 9.99);
    }

    #[test]
    fn wheel_dollies_within_bounds() {
        let mut cam = camera();
        let mut controls = undamped();
        controls.min_distance = 5.0;
        controls.wheel(1.0);
        controls.update(&mut cam);
        assert!((cam.position.length() - 9.5).abs() < 1e-3);

        controls.wheel(200.0);
        controls.update(&mut cam);
        assert!((cam.position.length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn drag_converts_pixels_to_angle() {
        let mut controls = undamped();
        controls.pointer_drag(Vec2::new(100.0, 0.0), 400.0);
        let mut cam = camera();
        controls.update(&mut cam);
        let theta = cam.position.x.atan2(cam.position.z);
        assert!((theta + TAU / 4.0).abs() < 1e-3);
    }

    #[test]
    fn zero_radius_keeps_heading() {
        let mut cam = PerspectiveCamera::default();
        let mut controls = OrbitControls::new(cam.position);
        controls.rotate_left(1.0);
        assert!(!controls.update(&mut cam));
        assert_eq!(cam.forward(), Vec3::NEG_Z);
        assert!(!controls.is_moving());
    }

    #[test]
    fn degenerate_drag_input_is_ignored() {
        let mut controls = undamped();
        controls.pointer_drag(Vec2::new(5.0, 5.0), 0.0);
        controls.pointer_drag(Vec2::new(f32::NAN, 0.0), 100.0);
        controls.wheel(f32::INFINITY);
        assert!(!controls.is_moving());
    }
}

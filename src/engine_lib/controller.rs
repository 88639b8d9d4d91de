// src/engine_lib/controller.rs

use glam::Vec3;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::engine_lib::camera::PerspectiveCamera;

const POLAR_EPSILON: f32 = 1e-6;
/// Pixels per "line" when converting precise wheel deltas.
const PIXELS_PER_WHEEL_STEP: f32 = 50.0;

/// Damped orbit around `camera.target`.
///
/// Input accumulates into spherical deltas; `update` applies a fraction of
/// them every frame and decays the rest, so motion eases out after the
/// pointer is released.
pub struct OrbitController {
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    theta_delta: f32,
    phi_delta: f32,
    scale: f32,

    dragging: bool,
    last_cursor: Option<(f64, f64)>,
    viewport_height: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::new(0.05)
    }
}

impl OrbitController {
    pub fn new(damping_factor: f32) -> Self {
        Self {
            damping_factor,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            theta_delta: 0.0,
            phi_delta: 0.0,
            scale: 1.0,
            dragging: false,
            last_cursor: None,
            viewport_height: 1.0,
        }
    }

    pub fn with_distance_limits(mut self, min: f32, max: f32) -> Self {
        self.min_distance = min;
        self.max_distance = max;
        self
    }

    pub fn set_viewport_height(&mut self, height: f32) {
        if height > 0.0 {
            self.viewport_height = height;
        }
    }

    /// Pointer drag in logical pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let full_turn = 2.0 * std::f32::consts::PI * self.rotate_speed / self.viewport_height;
        self.theta_delta -= dx * full_turn;
        self.phi_delta -= dy * full_turn;
    }

    /// Positive steps move the camera away from the target.
    pub fn dolly(&mut self, steps: f32) {
        self.scale *= 0.95f32.powf(-steps * self.zoom_speed);
    }

    pub fn handle_window_event(&mut self, event: &WindowEvent, scale_factor: f64) -> bool {
        match event {
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                self.dragging = *state == ElementState::Pressed;
                if !self.dragging {
                    self.last_cursor = None;
                }
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = (position.x / scale_factor, position.y / scale_factor);
                if self.dragging {
                    if let Some((x, y)) = self.last_cursor {
                        self.rotate((logical.0 - x) as f32, (logical.1 - y) as f32);
                    }
                }
                self.last_cursor = Some(logical);
                self.dragging
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / PIXELS_PER_WHEEL_STEP,
                };
                self.dolly(-steps);
                true
            }
            WindowEvent::CursorLeft { .. } | WindowEvent::Focused(false) => {
                self.dragging = false;
                self.last_cursor = None;
                false
            }
            _ => false,
        }
    }

    /// One damped step; call once per frame.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let offset = camera.position - camera.target;
        let mut radius = offset.length();
        if radius <= f32::EPSILON {
            return;
        }

        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        theta += self.theta_delta * self.damping_factor;
        phi += self.phi_delta * self.damping_factor;
        phi = phi.clamp(POLAR_EPSILON, std::f32::consts::PI - POLAR_EPSILON);

        radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let ring = radius * phi.sin();
        camera.position = camera.target + Vec3::new(ring * theta.sin(), radius * phi.cos(), ring * theta.cos());

        self.theta_delta *= 1.0 - self.damping_factor;
        self.phi_delta *= 1.0 - self.damping_factor;
        self.scale = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Vec3) -> PerspectiveCamera {
        PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0).with_position(position)
    }

    #[test]
    fn idle_update_keeps_the_camera_still() {
        let mut camera = camera_at(Vec3::new(1.0, 1.0, 1.0));
        let mut controls = OrbitController::default();
        controls.update(&mut camera);
        assert!((camera.position - Vec3::new(1.0, 1.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn rotation_eases_out() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 2.0));
        let mut controls = OrbitController::default();
        controls.set_viewport_height(100.0);
        controls.rotate(10.0, 0.0);

        let mut steps = Vec::new();
        let mut previous = camera.position;
        for _ in 0..3 {
            controls.update(&mut camera);
            steps.push((camera.position - previous).length());
            previous = camera.position;
        }
        assert!(steps[0] > steps[1] && steps[1] > steps[2]);
        assert!((camera.position.length() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn dolly_respects_distance_limits() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 1.0));
        let mut controls = OrbitController::default().with_distance_limits(0.5, 15.0);
        for _ in 0..200 {
            controls.dolly(5.0);
            controls.update(&mut camera);
        }
        assert!((camera.position.length() - 15.0).abs() < 1e-3);

        for _ in 0..200 {
            controls.dolly(-5.0);
            controls.update(&mut camera);
        }
        assert!((camera.position.length() - 0.5).abs() < 1e-3);
    }
}

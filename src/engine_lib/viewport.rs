// src/engine_lib/viewport.rs

use crate::engine_lib::camera::PerspectiveCamera;
use crate::rendering_lib::backend::RenderBackend;

/// Fill-rate cap for high density displays.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

/// Whatever hosts the canvas: reports its size in logical pixels and the
/// device pixel ratio.
pub trait DisplaySurface {
    fn logical_size(&self) -> (f64, f64);
    fn device_pixel_ratio(&self) -> f64;
}

impl DisplaySurface for winit::window::Window {
    fn logical_size(&self) -> (f64, f64) {
        let size = self.inner_size().to_logical::<f64>(self.scale_factor());
        (size.width, size.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.scale_factor()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportState {
    pub width_px: u32,
    pub height_px: u32,
    pub device_pixel_ratio_capped: f32,
}

impl ViewportState {
    pub fn from_surface(surface: &dyn DisplaySurface) -> Self {
        let (width, height) = surface.logical_size();
        let ratio = surface.device_pixel_ratio().min(MAX_PIXEL_RATIO);
        Self {
            width_px: width.max(0.0).round() as u32,
            height_px: height.max(0.0).round() as u32,
            device_pixel_ratio_capped: ratio as f32,
        }
    }

    pub fn aspect(&self) -> Option<f32> {
        (self.height_px > 0).then(|| self.width_px as f32 / self.height_px as f32)
    }

    /// Size of the drawing buffer in physical pixels.
    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |v: u32| (v as f32 * self.device_pixel_ratio_capped).round() as u32;
        (scale(self.width_px), scale(self.height_px))
    }
}

pub type ResizeObserver = Box<dyn FnMut(&ViewportState)>;

/// Recomputes viewport, camera projection and render target on resize.
#[derive(Default)]
pub struct ViewportController {
    state: Option<ViewportState>,
    observers: Vec<ResizeObserver>,
}

impl ViewportController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_resize(&mut self, observer: impl FnMut(&ViewportState) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Camera first, then renderer size, then pixel ratio, then observers.
    /// The renderer must never see a size whose aspect the projection
    /// does not match yet.
    pub fn resize<B: RenderBackend + ?Sized>(
        &mut self,
        surface: &dyn DisplaySurface,
        camera: &mut PerspectiveCamera,
        backend: &mut B,
    ) -> ViewportState {
        let state = ViewportState::from_surface(surface);

        if let Some(aspect) = state.aspect() {
            camera.aspect = aspect;
            camera.update_projection_matrix();
        }
        backend.set_size(state.width_px, state.height_px);
        backend.set_pixel_ratio(state.device_pixel_ratio_capped);

        log::debug!(
            "viewport {}x{} @{} -> buffer {:?}",
            state.width_px,
            state.height_px,
            state.device_pixel_ratio_capped,
            state.drawing_buffer_size()
        );

        for observer in self.observers.iter_mut() {
            observer(&state);
        }
        self.state = Some(state);
        state
    }

    pub fn state(&self) -> Option<ViewportState> {
        self.state
    }
}

/// Fixed-size surface for headless hosts and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedSurface {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl DisplaySurface for FixedSurface {
    fn logical_size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering_lib::headless::{BackendCall, RecordingBackend};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn caps_pixel_ratio_at_two() {
        let surface = FixedSurface { width: 1920.0, height: 1080.0, device_pixel_ratio: 3.0 };
        let state = ViewportState::from_surface(&surface);
        assert_eq!(state.device_pixel_ratio_capped, 2.0);
        assert_eq!(state.drawing_buffer_size(), (3840, 2160));
    }

    #[test]
    fn updates_camera_before_renderer() {
        let surface = FixedSurface { width: 800.0, height: 400.0, device_pixel_ratio: 1.0 };
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let mut backend = RecordingBackend::new();

        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        let mut viewport = ViewportController::new();
        viewport.on_resize(move |state| *sink.borrow_mut() = Some(*state));

        viewport.resize(&surface, &mut camera, &mut backend);

        assert_eq!(camera.aspect, 2.0);
        assert_eq!(
            backend.calls(),
            &[BackendCall::SetSize(800, 400), BackendCall::SetPixelRatio(1.0)]
        );
        assert_eq!(backend.drawing_buffer_size(), (800, 400));
        assert_eq!(seen.borrow().unwrap().width_px, 800);
    }

    #[test]
    fn zero_height_keeps_previous_aspect() {
        let surface = FixedSurface { width: 800.0, height: 0.0, device_pixel_ratio: 1.0 };
        let mut camera = PerspectiveCamera::new(75.0, 1.5, 0.1, 100.0);
        let mut backend = RecordingBackend::new();
        ViewportController::new().resize(&surface, &mut camera, &mut backend);
        assert_eq!(camera.aspect, 1.5);
    }
}

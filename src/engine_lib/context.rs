// src/engine_lib/context.rs

use std::cell::Cell;
use std::rc::Rc;

use rand::rngs::StdRng;
use winit::event::WindowEvent;

use crate::demo_scene::{DemoDefinition, DemoKind, CAMERA_FOV_DEG, CAMERA_NEAR, RESOLUTION_UNIFORM};
use crate::engine_lib::camera::PerspectiveCamera;
use crate::engine_lib::controller::OrbitController;
use crate::engine_lib::lifecycle::{LifecycleState, SceneLifecycle};
use crate::engine_lib::params::{ParamValue, ParameterSet};
use crate::engine_lib::render_loop::FrameTime;
use crate::engine_lib::uniforms::{color_to_linear, SharedUniforms, UniformBinding, UniformTable, UniformValue};
use crate::engine_lib::viewport::{DisplaySurface, ViewportController, ViewportState};
use crate::error::SceneError;
use crate::rendering_lib::backend::RenderBackend;
use crate::rendering_lib::generator::GeometryGenerator;
use crate::rendering_lib::material::MaterialDescriptor;

const DEFAULT_CLEAR_COLOR: [f32; 3] = [0.0, 0.0, 0.0];

/// One running demo: its parameters, uniforms, geometry source, mesh,
/// camera and controls.
pub struct DemoContext {
    kind: DemoKind,
    params: ParameterSet,
    binding: UniformBinding,
    generator: GeometryGenerator,
    rng: StdRng,
    lifecycle: SceneLifecycle,
    camera: PerspectiveCamera,
    controls: OrbitController,
    viewport: ViewportController,
    needs_regeneration: Rc<Cell<bool>>,
    pending_background: Rc<Cell<Option<[f32; 3]>>>,
}

impl DemoContext {
    /// Declares everything `definition` describes, activates the mesh and
    /// sizes the viewport to `surface`.
    pub fn new<B: RenderBackend + ?Sized>(
        definition: DemoDefinition,
        backend: &mut B,
        surface: &dyn DisplaySurface,
        mut rng: StdRng,
    ) -> Result<Self, SceneError> {
        let DemoDefinition {
            kind,
            parameters,
            uniforms: declared_uniforms,
            bindings,
            generator,
            shaders,
            blend,
            depth_write,
            side,
            transparent,
            transform,
            camera_position,
            camera_far,
            orbit_distance,
            background_parameter,
        } = definition;

        let mut params = ParameterSet::new();
        for parameter in parameters {
            params.declare(parameter)?;
        }

        let mut table = UniformTable::new();
        for (name, value) in declared_uniforms {
            table.declare(name, value)?;
        }
        let uniforms = table.into_shared();
        let binding = UniformBinding::new(&mut params, Rc::clone(&uniforms), bindings)?;

        let needs_regeneration = Rc::new(Cell::new(false));
        for input in generator.inputs() {
            let flag = Rc::clone(&needs_regeneration);
            params.subscribe(input, move |_| flag.set(true))?;
        }

        let pending_background = Rc::new(Cell::new(Some(DEFAULT_CLEAR_COLOR)));
        if let Some(name) = background_parameter {
            let initial = params
                .value(name)
                .and_then(linear_color)
                .ok_or_else(|| SceneError::configuration(format!("background parameter '{}' is not a color", name)))?;
            pending_background.set(Some(initial));

            let target = Rc::clone(&pending_background);
            params.subscribe(name, move |value| match linear_color(value) {
                Some(color) => target.set(Some(color)),
                None => log::warn!("ignoring background value {}", value),
            })?;
        }

        let mut camera = PerspectiveCamera::new(CAMERA_FOV_DEG, 1.0, CAMERA_NEAR, camera_far).with_position(camera_position);
        let mut controls = OrbitController::default();
        if let Some((min, max)) = orbit_distance {
            controls = controls.with_distance_limits(min, max);
        }

        let mut viewport = ViewportController::new();
        let resolution_target = Rc::clone(&uniforms);
        viewport.on_resize(move |state: &ViewportState| {
            let (width, height) = state.drawing_buffer_size();
            resolution_target
                .borrow_mut()
                .set(RESOLUTION_UNIFORM, UniformValue::Vec2([width as f32, height as f32]));
        });

        let mut material = MaterialDescriptor::new(kind.name(), shaders.vertex, shaders.fragment, Rc::clone(&uniforms));
        material.blend = blend;
        material.depth_write = depth_write;
        material.side = side;
        material.transparent = transparent;

        let geometry = generator.generate(&params, &mut rng)?;
        let mut lifecycle = SceneLifecycle::new(material, transform);

        // Size first so uResolution is current before the initial upload.
        let state = viewport.resize(surface, &mut camera, backend);
        controls.set_viewport_height(state.height_px as f32);
        lifecycle.activate(backend, &geometry)?;

        log::info!("demo '{}' ready with {} parameters", kind.name(), params.len());
        Ok(Self {
            kind,
            params,
            binding,
            generator,
            rng,
            lifecycle,
            camera,
            controls,
            viewport,
            needs_regeneration,
            pending_background,
        })
    }

    pub fn kind(&self) -> DemoKind {
        self.kind
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterSet {
        &mut self.params
    }

    pub fn set_parameter(&mut self, name: &str, value: ParamValue) -> Result<(), SceneError> {
        self.params.set(name, value)
    }

    pub fn uniforms(&self) -> &SharedUniforms {
        self.binding.uniforms()
    }

    pub fn binding(&self) -> &UniformBinding {
        &self.binding
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn controls_mut(&mut self) -> &mut OrbitController {
        &mut self.controls
    }

    pub fn lifecycle(&self) -> &SceneLifecycle {
        &self.lifecycle
    }

    pub fn viewport(&self) -> Option<ViewportState> {
        self.viewport.state()
    }

    /// Feeds pointer input to the orbit controls.
    pub fn handle_window_event(&mut self, event: &WindowEvent, scale_factor: f64) -> bool {
        self.controls.handle_window_event(event, scale_factor)
    }

    pub fn resize<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, surface: &dyn DisplaySurface) -> ViewportState {
        let state = self.viewport.resize(surface, &mut self.camera, backend);
        self.controls.set_viewport_height(state.height_px as f32);
        state
    }

    /// One tick: pending regeneration and background, `uTime`, uniform
    /// upload, orbit damping, then a single render call.
    pub fn frame<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, time: FrameTime) -> Result<(), SceneError> {
        if self.lifecycle.state() != LifecycleState::Active {
            return Err(SceneError::state(format!(
                "frame on '{}' while {:?}",
                self.kind.name(),
                self.lifecycle.state()
            )));
        }

        if self.needs_regeneration.replace(false) {
            let geometry = self.generator.generate(&self.params, &mut self.rng)?;
            self.lifecycle.regenerate(backend, &geometry)?;
        }
        if let Some(color) = self.pending_background.take() {
            backend.set_clear_color(color);
        }

        self.lifecycle.update(backend, time.elapsed)?;
        self.controls.update(&mut self.camera);
        backend.render(&self.camera)
    }

    pub fn dispose<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), SceneError> {
        self.lifecycle.dispose(backend)
    }
}

fn linear_color(value: &ParamValue) -> Option<[f32; 3]> {
    match color_to_linear(value)? {
        UniformValue::Color(rgb) => Some(rgb),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_scene::grid_floor;
    use crate::engine_lib::viewport::FixedSurface;
    use crate::rendering_lib::headless::RecordingBackend;
    use rand::SeedableRng;

    const SURFACE: FixedSurface = FixedSurface { width: 800.0, height: 600.0, device_pixel_ratio: 1.0 };

    fn tick(frame: u64) -> FrameTime {
        FrameTime { elapsed: frame as f32 / 60.0, delta: 1.0 / 60.0, frame }
    }

    #[test]
    fn background_parameter_drives_clear_color() {
        let mut backend = RecordingBackend::new();
        let mut demo = DemoContext::new(grid_floor(), &mut backend, &SURFACE, StdRng::seed_from_u64(1)).unwrap();

        demo.frame(&mut backend, tick(0)).unwrap();
        let initial = backend.clear_color();
        assert!(initial.iter().all(|c| *c > 0.8), "{:?}", initial);

        demo.set_parameter("backgroundColor", ParamValue::Color("#000000".into()))
            .unwrap();
        assert_eq!(backend.clear_color(), initial);
        demo.frame(&mut backend, tick(1)).unwrap();
        assert_eq!(backend.clear_color(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn plane_demos_never_regenerate() {
        let mut backend = RecordingBackend::new();
        let mut demo = DemoContext::new(grid_floor(), &mut backend, &SURFACE, StdRng::seed_from_u64(1)).unwrap();
        let before = demo.lifecycle().resources().unwrap();

        demo.set_parameter("cross", ParamValue::Scalar(0.5)).unwrap();
        demo.frame(&mut backend, tick(0)).unwrap();
        assert_eq!(demo.lifecycle().resources().unwrap(), before);
    }

    #[test]
    fn camera_far_and_orbit_limits_come_from_the_definition() {
        let mut backend = RecordingBackend::new();
        let mut demo = DemoContext::new(grid_floor(), &mut backend, &SURFACE, StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(demo.camera().zfar, 50.0);
        assert_eq!(demo.controls_mut().max_distance, 15.0);
        assert!((demo.camera().aspect - 800.0 / 600.0).abs() < 1e-6);
    }
}

// tests/end_to_end.rs

use std::time::Duration;

use procedural_scenes::demo_scene::{fireflies, grass, RESOLUTION_UNIFORM};
use procedural_scenes::engine_lib::context::DemoContext;
use procedural_scenes::engine_lib::lifecycle::LifecycleState;
use procedural_scenes::engine_lib::params::ParamValue;
use procedural_scenes::engine_lib::render_loop::{Clock, FrameScheduler, FrameTime, ManualTime, RenderLoop};
use procedural_scenes::engine_lib::uniforms::UniformValue;
use procedural_scenes::engine_lib::viewport::FixedSurface;
use procedural_scenes::rendering_lib::generator::PointVolume;
use procedural_scenes::rendering_lib::headless::{BackendCall, RecordingBackend};
use procedural_scenes::{DemoKind, SceneError};
use rand::rngs::StdRng;
use rand::SeedableRng;

const DESKTOP: FixedSurface = FixedSurface { width: 1280.0, height: 720.0, device_pixel_ratio: 1.0 };

fn at(frame: u64) -> FrameTime {
    FrameTime { elapsed: frame as f32 * 0.016, delta: 0.016, frame }
}

fn shell_demo(backend: &mut RecordingBackend) -> DemoContext {
    let mut demo = DemoContext::new(fireflies(PointVolume::Shell), backend, &DESKTOP, StdRng::seed_from_u64(42)).unwrap();
    demo.set_parameter("count", ParamValue::Integer(100)).unwrap();
    demo.set_parameter("radius", ParamValue::Scalar(0.5)).unwrap();
    demo.set_parameter("fillRadius", ParamValue::Scalar(0.8)).unwrap();
    demo
}

#[test]
fn fireflies_shell_points_stay_in_shell_and_size_reaches_the_shader() {
    let mut backend = RecordingBackend::new();
    let mut demo = shell_demo(&mut backend);
    demo.frame(&mut backend, at(0)).unwrap();

    let resources = demo.lifecycle().resources().unwrap();
    let geometry = backend.geometry(resources.geometry).unwrap();
    assert_eq!(geometry.vertex_count(), 100);
    for i in 0..100 {
        let p = geometry.vec3("position", i).unwrap();
        let d = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
        assert!(d >= 0.1 - 1e-5 && d <= 0.5 + 1e-5, "point {} at distance {}", i, d);
    }

    demo.set_parameter("size", ParamValue::Scalar(0.5)).unwrap();
    demo.frame(&mut backend, at(1)).unwrap();
    let record = backend.last_render().unwrap();
    let uniforms = &record.uniforms[&resources.material];
    assert_eq!(uniforms.value("uSize"), Some(UniformValue::Float(0.5)));
    assert_eq!(uniforms.value("uTime"), Some(UniformValue::Float(0.016)));
}

#[test]
fn out_of_range_edit_changes_nothing() {
    let mut backend = RecordingBackend::new();
    let mut demo = shell_demo(&mut backend);

    let err = demo.set_parameter("size", ParamValue::Scalar(3.0)).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(demo.params().value("size"), Some(&ParamValue::Scalar(0.1)));
    assert_eq!(demo.uniforms().borrow().value("uSize"), Some(UniformValue::Float(0.1)));
}

#[test]
fn count_and_width_edits_regenerate_on_next_frame() {
    let mut backend = RecordingBackend::new();
    let mut demo = DemoContext::new(grass(), &mut backend, &DESKTOP, StdRng::seed_from_u64(3)).unwrap();
    let first = demo.lifecycle().resources().unwrap();
    assert_eq!(backend.geometry(first.geometry).unwrap().vertex_count(), 300);

    demo.set_parameter("count", ParamValue::Integer(10)).unwrap();
    demo.set_parameter("width", ParamValue::Scalar(0.2)).unwrap();
    // Nothing is rebuilt until the frame runs.
    assert_eq!(demo.lifecycle().resources().unwrap(), first);

    backend.clear_calls();
    demo.frame(&mut backend, at(0)).unwrap();
    let second = demo.lifecycle().resources().unwrap();
    assert_ne!(second.geometry, first.geometry);
    assert_eq!(second.material, first.material);
    assert_eq!(backend.geometry(second.geometry).unwrap().vertex_count(), 30);
    assert_eq!(
        backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::CreateGeometry(_)))
            .count(),
        1
    );
    assert!(backend.geometry(first.geometry).is_none());

    let blade = backend.geometry(second.geometry).unwrap();
    let left = blade.vec3("position", 0).unwrap();
    let right = blade.vec3("position", 1).unwrap();
    let apex = blade.vec3("position", 2).unwrap();
    assert!((right[0] - left[0] - 0.4).abs() < 1e-5);
    assert!((apex[1] - 0.4).abs() < 1e-5);
}

#[test]
fn disposed_demo_leaves_nothing_behind() {
    let mut backend = RecordingBackend::new();
    let mut demo = shell_demo(&mut backend);
    demo.frame(&mut backend, at(0)).unwrap();
    let resources = demo.lifecycle().resources().unwrap();

    demo.dispose(&mut backend).unwrap();
    assert_eq!(demo.lifecycle().state(), LifecycleState::Disposed);
    assert!(!backend.scene_contains(resources.mesh));
    assert_eq!(backend.live_geometries(), 0);
    assert_eq!(backend.live_materials(), 0);

    let renders_before = backend.renders().len();
    assert!(matches!(demo.frame(&mut backend, at(1)), Err(SceneError::State(_))));
    assert_eq!(backend.renders().len(), renders_before);
    assert!(matches!(demo.dispose(&mut backend), Err(SceneError::State(_))));
}

#[test]
fn switching_demos_releases_the_previous_one() {
    let mut backend = RecordingBackend::new();
    let mut current = DemoContext::new(DemoKind::Pattern.definition(), &mut backend, &DESKTOP, StdRng::seed_from_u64(0)).unwrap();
    for kind in DemoKind::ALL {
        current.dispose(&mut backend).unwrap();
        current = DemoContext::new(kind.definition(), &mut backend, &DESKTOP, StdRng::seed_from_u64(0)).unwrap();
        current.frame(&mut backend, at(0)).unwrap();

        assert_eq!(backend.live_geometries(), 1, "{}", kind.name());
        assert_eq!(backend.live_materials(), 1, "{}", kind.name());
        assert_eq!(backend.last_render().unwrap().meshes.len(), 1);
    }
}

#[test]
fn high_density_display_is_capped() {
    let mut backend = RecordingBackend::new();
    let mut demo = shell_demo(&mut backend);
    let retina = FixedSurface { width: 1920.0, height: 1080.0, device_pixel_ratio: 3.0 };

    let state = demo.resize(&mut backend, &retina);
    assert_eq!(state.device_pixel_ratio_capped, 2.0);
    assert_eq!(backend.size(), (1920, 1080));
    assert_eq!(backend.drawing_buffer_size(), (3840, 2160));
    assert!((demo.camera().aspect - 16.0 / 9.0).abs() < 1e-6);
    assert_eq!(
        demo.uniforms().borrow().value(RESOLUTION_UNIFORM),
        Some(UniformValue::Vec2([3840.0, 2160.0]))
    );

    demo.frame(&mut backend, at(0)).unwrap();
    assert!((backend.last_render().unwrap().camera_aspect - 16.0 / 9.0).abs() < 1e-6);
}

struct Vsync {
    time: ManualTime,
    frames_left: u32,
}

impl FrameScheduler for Vsync {
    fn next_frame(&mut self) -> bool {
        if self.frames_left == 0 {
            return false;
        }
        self.frames_left -= 1;
        self.time.advance(Duration::from_millis(16));
        true
    }
}

#[test]
fn render_loop_drives_one_render_per_frame_until_stopped() {
    let mut backend = RecordingBackend::new();
    let mut demo = shell_demo(&mut backend);
    let time = ManualTime::new();
    let mut render_loop = RenderLoop::new(Clock::with_source(time.clone()));
    let control = render_loop.control();
    let mut vsync = Vsync { time, frames_left: 60 };

    let mut failures = Vec::new();
    let frames = render_loop.run(&mut vsync, |t| {
        if let Err(err) = demo.frame(&mut backend, t) {
            failures.push(err);
        }
        if t.frame == 9 {
            control.stop();
        }
    });

    assert!(failures.is_empty());
    assert_eq!(frames, 10);
    assert_eq!(backend.renders().len(), 10);
    let material = demo.lifecycle().resources().unwrap().material;
    let last = backend.last_render().unwrap();
    match last.uniforms[&material].value("uTime") {
        Some(UniformValue::Float(t)) => assert!((t - 0.160).abs() < 1e-4, "{}", t),
        other => panic!("uTime missing: {:?}", other),
    }
}

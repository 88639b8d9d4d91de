// src/demo_scene.rs

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Vec3};

use crate::engine_lib::params::Parameter;
use crate::engine_lib::uniforms::{Binding, UniformValue};
use crate::rendering_lib::generator::{GeometryGenerator, PlaneSpec, PointVolume};
use crate::rendering_lib::material::{BlendMode, Side};
use crate::rendering_lib::shader::{sources_for, ShaderSources};

pub const CAMERA_FOV_DEG: f32 = 75.0;
pub const CAMERA_NEAR: f32 = 0.1;
pub const CAMERA_FAR: f32 = 100.0;

/// Uniform the viewport keeps equal to the drawing buffer size.
pub const RESOLUTION_UNIFORM: &str = "uResolution";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DemoKind {
    Fireflies,
    Grass,
    GridFloor,
    Pattern,
}

impl DemoKind {
    pub const ALL: [DemoKind; 4] = [DemoKind::Fireflies, DemoKind::Grass, DemoKind::GridFloor, DemoKind::Pattern];

    pub fn name(self) -> &'static str {
        match self {
            DemoKind::Fireflies => "fireflies",
            DemoKind::Grass => "grass",
            DemoKind::GridFloor => "grid-floor",
            DemoKind::Pattern => "pattern",
        }
    }

    pub fn definition(self) -> DemoDefinition {
        match self {
            DemoKind::Fireflies => fireflies(PointVolume::Cube),
            DemoKind::Grass => grass(),
            DemoKind::GridFloor => grid_floor(),
            DemoKind::Pattern => pattern(),
        }
    }
}

/// Static declaration of one demo: what it exposes, how it is drawn and
/// where the camera starts.
#[derive(Clone)]
pub struct DemoDefinition {
    pub kind: DemoKind,
    pub parameters: Vec<Parameter>,
    pub uniforms: Vec<(&'static str, UniformValue)>,
    pub bindings: Vec<Binding>,
    pub generator: GeometryGenerator,
    pub shaders: ShaderSources,
    pub blend: BlendMode,
    pub depth_write: bool,
    pub side: Side,
    pub transparent: bool,
    pub transform: Mat4,
    pub camera_position: Vec3,
    pub camera_far: f32,
    pub orbit_distance: Option<(f32, f32)>,
    /// Color parameter that drives the renderer clear color.
    pub background_parameter: Option<&'static str>,
}

impl DemoDefinition {
    fn new(kind: DemoKind, generator: GeometryGenerator) -> Self {
        // Every kind has a program in the shader table.
        let shaders = sources_for(kind.name()).unwrap_or(ShaderSources { vertex: "", fragment: "" });
        Self {
            kind,
            parameters: Vec::new(),
            uniforms: Vec::new(),
            bindings: Vec::new(),
            generator,
            shaders,
            blend: BlendMode::Normal,
            depth_write: true,
            side: Side::Front,
            transparent: false,
            transform: Mat4::IDENTITY,
            camera_position: Vec3::new(0.0, 0.0, 1.0),
            camera_far: CAMERA_FAR,
            orbit_distance: None,
            background_parameter: None,
        }
    }

    fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    fn uniform(mut self, name: &'static str, value: UniformValue) -> Self {
        self.uniforms.push((name, value));
        self
    }

    /// Declares `uniform` and binds it to `parameter`.
    fn bound(mut self, parameter: &str, uniform: &'static str, placeholder: UniformValue) -> Self {
        self.uniforms.push((uniform, placeholder));
        self.bindings.push(Binding::new(parameter, uniform));
        self
    }
}

const NO_COLOR: UniformValue = UniformValue::Color([0.0; 3]);
const ZERO: UniformValue = UniformValue::Float(0.0);

/// Glowing points flickering out of phase. `volume` picks the cube or the
/// shell scatter.
pub fn fireflies(volume: PointVolume) -> DemoDefinition {
    let mut def = DemoDefinition::new(DemoKind::Fireflies, GeometryGenerator::PointCloud { volume })
        .param(Parameter::color("color", "#e2ff0a"))
        .param(Parameter::scalar("size", 0.1).with_range(0.01, 1.0, 0.01))
        .param(
            Parameter::scalar("speed", 2.0)
                .with_range(1.0, 10.0, 1.0)
                .in_folder("Flicker Animation"),
        )
        .param(
            Parameter::scalar("phaseShift", 80.0)
                .with_range(1.0, 100.0, 1.0)
                .with_label("phase shift")
                .in_folder("Flicker Animation"),
        )
        .param(Parameter::integer("count", 24).with_bounds(0.0, 500.0));
    if volume == PointVolume::Shell {
        def = def
            .param(Parameter::scalar("radius", 0.5).with_bounds(0.01, 5.0))
            .param(Parameter::scalar("fillRadius", 0.8).with_bounds(0.0, 1.0).with_label("fill radius"));
    }

    let mut def = def
        .bound("color", "uColor", NO_COLOR)
        .bound("size", "uSize", ZERO)
        .uniform(RESOLUTION_UNIFORM, UniformValue::Vec2([0.0, 0.0]))
        .uniform("uTime", ZERO)
        .bound("speed", "uSpeed", ZERO)
        .bound("phaseShift", "uPhaseShift", ZERO);
    def.blend = BlendMode::Additive;
    def.depth_write = false;
    def.transparent = true;
    def.camera_position = Vec3::new(1.0, 0.0, 1.0);
    def
}

pub fn grass() -> DemoDefinition {
    let mut def = DemoDefinition::new(DemoKind::Grass, GeometryGenerator::BladeField)
        .param(Parameter::integer("count", 100).with_bounds(1.0, 500.0).in_folder("🌿 Grass"))
        .param(Parameter::scalar("width", 0.4).with_range(0.1, 0.5, 0.01).in_folder("🌿 Grass"))
        .uniform("uTime", ZERO);
    def.side = Side::Double;
    def.camera_position = Vec3::new(1.0, 1.0, 1.0);
    def
}

pub fn grid_floor() -> DemoDefinition {
    let spec = PlaneSpec { width: 10.0, height: 10.0, width_segments: 32, height_segments: 32 };
    let mut def = DemoDefinition::new(DemoKind::GridFloor, GeometryGenerator::Plane(spec))
        .param(Parameter::color("floorColor", "#ffffff").with_label("floor color").in_folder("🌐 Grid Floor"))
        .param(
            Parameter::scalar("gridThickness", 0.02)
                .with_range(0.0, 1.0, 0.001)
                .with_label("grid thickness")
                .in_folder("🌐 Grid Floor"),
        )
        .param(Parameter::color("gridColor", "#c4d6ff").with_label("grid color").in_folder("🌐 Grid Floor"))
        .param(
            Parameter::scalar("crossThickness", 0.02)
                .with_range(0.0, 1.0, 0.001)
                .with_label("cross thickness")
                .in_folder("❎ Cross Floor"),
        )
        .param(Parameter::scalar("cross", 0.2).with_range(0.0, 1.0, 0.01).in_folder("❎ Cross Floor"))
        .param(Parameter::color("crossColor", "#a7bbff").with_label("cross color").in_folder("❎ Cross Floor"))
        .param(Parameter::color("fogColor", "#c3dce2").with_label("fog color").in_folder("💨 Fog"))
        .param(Parameter::scalar("fogNear", 1.0).with_range(-5.0, 2.0, 0.1).with_label("fog near").in_folder("💨 Fog"))
        .param(Parameter::scalar("fogFar", 10.0).with_range(2.0, 50.0, 0.1).with_label("fog far").in_folder("💨 Fog"))
        .param(
            Parameter::color("backgroundColor", "#e9f6f8")
                .with_label("background color")
                .in_folder("🏡 Environment"),
        )
        .bound("floorColor", "uFloorColor", NO_COLOR)
        .bound("gridThickness", "uGridThickness", ZERO)
        .bound("gridColor", "uGridColor", NO_COLOR)
        .bound("crossThickness", "uCrossThickness", ZERO)
        .bound("cross", "uCross", ZERO)
        .bound("crossColor", "uCrossColor", NO_COLOR)
        .bound("fogColor", "fogColor", NO_COLOR)
        .bound("fogNear", "fogNear", ZERO)
        .bound("fogFar", "fogFar", ZERO);
    def.side = Side::Double;
    def.transparent = true;
    def.transform = Mat4::from_rotation_x(FRAC_PI_2);
    def.camera_position = Vec3::new(1.0, 1.0, 1.0);
    def.camera_far = 50.0;
    def.orbit_distance = Some((0.5, 15.0));
    def.background_parameter = Some("backgroundColor");
    def
}

pub fn pattern() -> DemoDefinition {
    let spec = PlaneSpec { width: 1.0, height: 1.0, width_segments: 32, height_segments: 32 };
    let mut def = DemoDefinition::new(DemoKind::Pattern, GeometryGenerator::Plane(spec))
        .param(Parameter::scalar("amplitude", 0.2).with_bounds(0.0, 2.0).in_folder("Pattern"))
        .param(Parameter::scalar("frequency", 40.0).with_bounds(0.0, 100.0).in_folder("Pattern"))
        .param(Parameter::scalar("speed", 8.0).with_bounds(0.0, 20.0).in_folder("Pattern"))
        .param(Parameter::color("color1", "#5deea8").with_label("color 1").in_folder("Palette"))
        .param(Parameter::color("color2", "#ef31e3").with_label("color 2").in_folder("Palette"))
        .uniform("uTime", ZERO)
        .bound("amplitude", "uAmplitude", ZERO)
        .bound("frequency", "uFrequency", ZERO)
        .bound("speed", "uSpeed", ZERO)
        .bound("color1", "uColor1", NO_COLOR)
        .bound("color2", "uColor2", NO_COLOR);
    def.side = Side::Double;
    def
}

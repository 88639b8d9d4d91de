// src/engine_lib/mod.rs

pub mod camera;
pub mod context;
pub mod controller;
pub mod lifecycle;
pub mod params;
pub mod render_loop;
pub mod uniforms;
pub mod viewport;

pub use camera::PerspectiveCamera;
pub use context::DemoContext;
pub use controller::OrbitController;
pub use params::{ParamValue, Parameter, ParameterSet};
pub use render_loop::{Clock, FrameTime, RenderLoop};

// src/rendering_lib/mod.rs

pub mod backend;
pub mod generator;
pub mod geometry;
pub mod headless;
pub mod material;
pub mod renderer;
pub mod shader;
pub mod vertex;

pub use backend::RenderBackend;
pub use headless::RecordingBackend;
pub use renderer::WgpuBackend;

// src/lib.rs

pub mod demo_scene;
pub mod engine_lib;
pub mod error;
pub mod rendering_lib;

pub use demo_scene::{DemoDefinition, DemoKind};
pub use error::SceneError;

// src/rendering_lib/material.rs

use crate::engine_lib::uniforms::SharedUniforms;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Front,
    Double,
}

/// Everything the rendering backend needs to build a shader material.
///
/// The uniform table is shared with the binding that keeps it current; the
/// backend only reads it when `write_uniforms` is called.
#[derive(Clone, Debug)]
pub struct MaterialDescriptor {
    pub label: String,
    pub vertex_source: &'static str,
    pub fragment_source: &'static str,
    pub uniforms: SharedUniforms,
    pub blend: BlendMode,
    pub depth_write: bool,
    pub side: Side,
    pub transparent: bool,
}

impl MaterialDescriptor {
    pub fn new(
        label: impl Into<String>,
        vertex_source: &'static str,
        fragment_source: &'static str,
        uniforms: SharedUniforms,
    ) -> Self {
        Self {
            label: label.into(),
            vertex_source,
            fragment_source,
            uniforms,
            blend: BlendMode::Normal,
            depth_write: true,
            side: Side::Front,
            transparent: false,
        }
    }
}

// src/rendering_lib/vertex.rs

use crate::rendering_lib::geometry::{GeometryDescriptor, Topology};

pub fn vertex_format(components: usize) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        _ => wgpu::VertexFormat::Float32x4,
    }
}

/// One non-interleaved buffer per attribute, shader location = attribute
/// order in the descriptor.
#[derive(Clone, Debug)]
pub struct AttributeLayouts {
    step_mode: wgpu::VertexStepMode,
    entries: Vec<(wgpu::BufferAddress, [wgpu::VertexAttribute; 1])>,
}

impl AttributeLayouts {
    pub fn for_geometry(geometry: &GeometryDescriptor) -> Self {
        // Point sprites expand each vertex into a quad, so attributes advance
        // per instance.
        let step_mode = match geometry.topology() {
            Topology::Points => wgpu::VertexStepMode::Instance,
            Topology::TriangleList => wgpu::VertexStepMode::Vertex,
        };
        let entries = geometry
            .attributes()
            .iter()
            .enumerate()
            .map(|(location, attr)| {
                let stride = (attr.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress;
                let attribute = wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: location as u32,
                    format: vertex_format(attr.components()),
                };
                (stride, [attribute])
            })
            .collect();
        Self { step_mode, entries }
    }

    pub fn desc(&self) -> Vec<wgpu::VertexBufferLayout<'_>> {
        self.entries
            .iter()
            .map(|(stride, attribute)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: self.step_mode,
                attributes: attribute,
            })
            .collect()
    }
}

// src/rendering_lib/backend.rs

//! The seam between the scene runtime and whatever actually draws.

use glam::Mat4;

use crate::engine_lib::camera::PerspectiveCamera;
use crate::engine_lib::uniforms::UniformTable;
use crate::error::SceneError;
use crate::rendering_lib::geometry::GeometryDescriptor;
use crate::rendering_lib::material::MaterialDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GeometryHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// GPU-side resource management plus the scene the backend draws.
///
/// Meshes created through `create_mesh` are attached to the scene until
/// `remove_mesh`. Disposing a geometry or material that a mesh still uses is
/// a caller bug; `SceneLifecycle` always detaches first.
pub trait RenderBackend {
    fn create_geometry(&mut self, geometry: &GeometryDescriptor) -> Result<GeometryHandle, SceneError>;

    /// Compiles the shader program. Compilation failures are `Resource` errors.
    fn create_material(&mut self, material: &MaterialDescriptor) -> Result<MaterialHandle, SceneError>;

    fn create_mesh(
        &mut self,
        geometry: GeometryHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> Result<MeshHandle, SceneError>;

    fn remove_mesh(&mut self, mesh: MeshHandle);

    fn write_uniforms(&mut self, material: MaterialHandle, uniforms: &UniformTable);

    fn dispose_geometry(&mut self, geometry: GeometryHandle);

    fn dispose_material(&mut self, material: MaterialHandle);

    /// Logical size of the render target.
    fn set_size(&mut self, width: u32, height: u32);

    fn set_pixel_ratio(&mut self, ratio: f32);

    /// Linear RGB.
    fn set_clear_color(&mut self, color: [f32; 3]);

    /// Draws every attached mesh once.
    fn render(&mut self, camera: &PerspectiveCamera) -> Result<(), SceneError>;
}

// src/rendering_lib/headless.rs

//! A backend that draws nothing and remembers everything.
//!
//! Used by the integration tests and benchmarks, and handy for running a
//! demo without a GPU.

use std::collections::HashMap;

use glam::Mat4;

use crate::engine_lib::camera::PerspectiveCamera;
use crate::engine_lib::uniforms::UniformTable;
use crate::error::SceneError;
use crate::rendering_lib::backend::{GeometryHandle, MaterialHandle, MeshHandle, RenderBackend};
use crate::rendering_lib::geometry::GeometryDescriptor;
use crate::rendering_lib::material::MaterialDescriptor;

#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    CreateGeometry(GeometryHandle),
    CreateMaterial(MaterialHandle),
    CreateMesh(MeshHandle),
    RemoveMesh(MeshHandle),
    WriteUniforms(MaterialHandle),
    DisposeGeometry(GeometryHandle),
    DisposeMaterial(MaterialHandle),
    SetSize(u32, u32),
    SetPixelRatio(f32),
    SetClearColor([f32; 3]),
    Render,
}

#[derive(Clone, Debug)]
pub struct AttachedMesh {
    pub mesh: MeshHandle,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub transform: Mat4,
}

/// What one `render` call saw.
#[derive(Clone, Debug)]
pub struct RenderRecord {
    pub meshes: Vec<AttachedMesh>,
    /// Last uploaded uniforms of every drawn material.
    pub uniforms: HashMap<MaterialHandle, UniformTable>,
    pub camera_aspect: f32,
}

#[derive(Default)]
pub struct RecordingBackend {
    next_id: u64,
    geometries: HashMap<GeometryHandle, GeometryDescriptor>,
    materials: HashMap<MaterialHandle, String>,
    uploaded: HashMap<MaterialHandle, UniformTable>,
    scene: Vec<AttachedMesh>,
    calls: Vec<BackendCall>,
    renders: Vec<RenderRecord>,
    size: (u32, u32),
    pixel_ratio: f32,
    clear_color: [f32; 3],
    /// Makes the next `create_material` fail as if the shader did not compile.
    pub fail_next_material: bool,
    /// Makes the next `create_geometry` fail as if buffer allocation did.
    pub fail_next_geometry: bool,
    pub fail_next_mesh: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self { pixel_ratio: 1.0, ..Self::default() }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn renders(&self) -> &[RenderRecord] {
        &self.renders
    }

    pub fn last_render(&self) -> Option<&RenderRecord> {
        self.renders.last()
    }

    pub fn scene(&self) -> &[AttachedMesh] {
        &self.scene
    }

    pub fn scene_contains(&self, mesh: MeshHandle) -> bool {
        self.scene.iter().any(|m| m.mesh == mesh)
    }

    pub fn geometry(&self, handle: GeometryHandle) -> Option<&GeometryDescriptor> {
        self.geometries.get(&handle)
    }

    pub fn has_material(&self, handle: MaterialHandle) -> bool {
        self.materials.contains_key(&handle)
    }

    pub fn live_geometries(&self) -> usize {
        self.geometries.len()
    }

    pub fn live_materials(&self) -> usize {
        self.materials.len()
    }

    pub fn uploaded_uniforms(&self, handle: MaterialHandle) -> Option<&UniformTable> {
        self.uploaded.get(&handle)
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn drawing_buffer_size(&self) -> (u32, u32) {
        let scale = |v: u32| (v as f32 * self.pixel_ratio).round() as u32;
        (scale(self.size.0), scale(self.size.1))
    }

    pub fn clear_color(&self) -> [f32; 3] {
        self.clear_color
    }
}

impl RenderBackend for RecordingBackend {
    fn create_geometry(&mut self, geometry: &GeometryDescriptor) -> Result<GeometryHandle, SceneError> {
        if std::mem::take(&mut self.fail_next_geometry) {
            return Err(SceneError::resource("out of memory for vertex buffers"));
        }
        let handle = GeometryHandle(self.next_id());
        self.geometries.insert(handle, geometry.clone());
        self.calls.push(BackendCall::CreateGeometry(handle));
        Ok(handle)
    }

    fn create_material(&mut self, material: &MaterialDescriptor) -> Result<MaterialHandle, SceneError> {
        if std::mem::take(&mut self.fail_next_material) {
            return Err(SceneError::resource(format!("shader for '{}' failed to compile", material.label)));
        }
        let handle = MaterialHandle(self.next_id());
        self.materials.insert(handle, material.label.clone());
        self.calls.push(BackendCall::CreateMaterial(handle));
        Ok(handle)
    }

    fn create_mesh(
        &mut self,
        geometry: GeometryHandle,
        material: MaterialHandle,
        transform: Mat4,
    ) -> Result<MeshHandle, SceneError> {
        if std::mem::take(&mut self.fail_next_mesh) {
            return Err(SceneError::resource("pipeline creation failed"));
        }
        if !self.geometries.contains_key(&geometry) || !self.materials.contains_key(&material) {
            return Err(SceneError::resource("mesh references a released resource"));
        }
        let mesh = MeshHandle(self.next_id());
        self.scene.push(AttachedMesh { mesh, geometry, material, transform });
        self.calls.push(BackendCall::CreateMesh(mesh));
        Ok(mesh)
    }

    fn remove_mesh(&mut self, mesh: MeshHandle) {
        self.scene.retain(|m| m.mesh != mesh);
        self.calls.push(BackendCall::RemoveMesh(mesh));
    }

    fn write_uniforms(&mut self, material: MaterialHandle, uniforms: &UniformTable) {
        self.uploaded.insert(material, uniforms.clone());
        self.calls.push(BackendCall::WriteUniforms(material));
    }

    fn dispose_geometry(&mut self, geometry: GeometryHandle) {
        self.geometries.remove(&geometry);
        self.calls.push(BackendCall::DisposeGeometry(geometry));
    }

    fn dispose_material(&mut self, material: MaterialHandle) {
        self.materials.remove(&material);
        self.uploaded.remove(&material);
        self.calls.push(BackendCall::DisposeMaterial(material));
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.calls.push(BackendCall::SetSize(width, height));
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        self.pixel_ratio = ratio;
        self.calls.push(BackendCall::SetPixelRatio(ratio));
    }

    fn set_clear_color(&mut self, color: [f32; 3]) {
        self.clear_color = color;
        self.calls.push(BackendCall::SetClearColor(color));
    }

    fn render(&mut self, camera: &PerspectiveCamera) -> Result<(), SceneError> {
        for attached in &self.scene {
            if !self.geometries.contains_key(&attached.geometry) || !self.materials.contains_key(&attached.material) {
                return Err(SceneError::state(format!("mesh {:?} uses a disposed resource", attached.mesh)));
            }
        }
        let uniforms = self
            .scene
            .iter()
            .filter_map(|m| self.uploaded.get(&m.material).map(|u| (m.material, u.clone())))
            .collect();
        self.renders.push(RenderRecord {
            meshes: self.scene.clone(),
            uniforms,
            camera_aspect: camera.aspect,
        });
        self.calls.push(BackendCall::Render);
        Ok(())
    }
}

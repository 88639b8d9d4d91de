// src/engine_lib/lifecycle.rs

use glam::Mat4;

use crate::engine_lib::uniforms::UniformValue;
use crate::error::SceneError;
use crate::rendering_lib::backend::{GeometryHandle, MaterialHandle, MeshHandle, RenderBackend};
use crate::rendering_lib::geometry::GeometryDescriptor;
use crate::rendering_lib::material::MaterialDescriptor;

/// Name of the uniform the render loop writes elapsed seconds into.
pub const TIME_UNIFORM: &str = "uTime";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Active,
    /// Terminal.
    Disposed,
}

/// The live geometry/material/mesh triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneResources {
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub mesh: MeshHandle,
}

/// Creation, per-frame update and teardown of one mesh and what it owns.
///
/// Geometry and material are only ever released together, except that
/// `regenerate` swaps the geometry while the material stays.
pub struct SceneLifecycle {
    state: LifecycleState,
    material: MaterialDescriptor,
    transform: Mat4,
    resources: Option<SceneResources>,
}

impl SceneLifecycle {
    pub fn new(material: MaterialDescriptor, transform: Mat4) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            material,
            transform,
            resources: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn resources(&self) -> Option<SceneResources> {
        self.resources
    }

    pub fn material(&self) -> &MaterialDescriptor {
        &self.material
    }

    /// Builds the triple and attaches the mesh. On failure everything created
    /// so far is released and the lifecycle stays `Uninitialized`.
    pub fn activate<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        geometry: &GeometryDescriptor,
    ) -> Result<SceneResources, SceneError> {
        if self.state != LifecycleState::Uninitialized {
            return Err(SceneError::state(format!(
                "cannot activate '{}' while {:?}",
                self.material.label, self.state
            )));
        }

        let geometry = backend.create_geometry(geometry)?;
        let material = match backend.create_material(&self.material) {
            Ok(material) => material,
            Err(err) => {
                backend.dispose_geometry(geometry);
                return Err(err);
            }
        };
        let mesh = match backend.create_mesh(geometry, material, self.transform) {
            Ok(mesh) => mesh,
            Err(err) => {
                backend.dispose_geometry(geometry);
                backend.dispose_material(material);
                return Err(err);
            }
        };
        backend.write_uniforms(material, &self.material.uniforms.borrow());

        let resources = SceneResources { geometry, material, mesh };
        self.resources = Some(resources);
        self.state = LifecycleState::Active;
        log::info!("scene '{}' active", self.material.label);
        Ok(resources)
    }

    /// Writes the elapsed time (when the material has a time uniform) and
    /// uploads the whole uniform table.
    pub fn update<B: RenderBackend + ?Sized>(&mut self, backend: &mut B, elapsed: f32) -> Result<(), SceneError> {
        let resources = self.require_active("update")?;
        {
            let mut uniforms = self.material.uniforms.borrow_mut();
            uniforms.set(TIME_UNIFORM, UniformValue::Float(elapsed));
        }
        backend.write_uniforms(resources.material, &self.material.uniforms.borrow());
        Ok(())
    }

    /// Replaces the geometry wholesale and re-attaches the mesh.
    pub fn regenerate<B: RenderBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        geometry: &GeometryDescriptor,
    ) -> Result<(), SceneError> {
        let old = self.require_active("regenerate")?;

        backend.remove_mesh(old.mesh);
        backend.dispose_geometry(old.geometry);

        let rebuilt = backend.create_geometry(geometry).and_then(|handle| {
            match backend.create_mesh(handle, old.material, self.transform) {
                Ok(mesh) => Ok((handle, mesh)),
                Err(err) => {
                    backend.dispose_geometry(handle);
                    Err(err)
                }
            }
        });

        match rebuilt {
            Ok((handle, mesh)) => {
                self.resources = Some(SceneResources { geometry: handle, material: old.material, mesh });
                log::debug!(
                    "scene '{}' regenerated with {} vertices",
                    self.material.label,
                    geometry.vertex_count()
                );
                Ok(())
            }
            Err(err) => {
                // Without geometry the material has nothing left to draw.
                backend.dispose_material(old.material);
                self.resources = None;
                self.state = LifecycleState::Disposed;
                log::error!("scene '{}' lost its geometry: {}", self.material.label, err);
                Err(err)
            }
        }
    }

    /// Detaches the mesh and releases geometry and material together.
    pub fn dispose<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<(), SceneError> {
        match self.state {
            LifecycleState::Disposed => {
                return Err(SceneError::state(format!("'{}' already disposed", self.material.label)));
            }
            LifecycleState::Uninitialized => {}
            LifecycleState::Active => {
                if let Some(resources) = self.resources.take() {
                    backend.remove_mesh(resources.mesh);
                    backend.dispose_geometry(resources.geometry);
                    backend.dispose_material(resources.material);
                }
            }
        }
        self.state = LifecycleState::Disposed;
        log::info!("scene '{}' disposed", self.material.label);
        Ok(())
    }

    fn require_active(&self, operation: &str) -> Result<SceneResources, SceneError> {
        match (self.state, self.resources) {
            (LifecycleState::Active, Some(resources)) => Ok(resources),
            (state, _) => Err(SceneError::state(format!(
                "{} on '{}' while {:?}",
                operation, self.material.label, state
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::uniforms::UniformTable;
    use crate::rendering_lib::geometry::Topology;
    use crate::rendering_lib::headless::{BackendCall, RecordingBackend};

    fn material() -> MaterialDescriptor {
        let mut table = UniformTable::new();
        table.declare(TIME_UNIFORM, UniformValue::Float(0.0)).unwrap();
        MaterialDescriptor::new("test", "vs", "fs", table.into_shared())
    }

    fn triangle() -> GeometryDescriptor {
        GeometryDescriptor::new(3, Topology::TriangleList)
            .with_attribute("position", 3, vec![0.0; 9])
            .unwrap()
    }

    #[test]
    fn walks_through_all_states() {
        let mut backend = RecordingBackend::new();
        let mut scene = SceneLifecycle::new(material(), Mat4::IDENTITY);
        assert_eq!(scene.state(), LifecycleState::Uninitialized);

        let resources = scene.activate(&mut backend, &triangle()).unwrap();
        assert_eq!(scene.state(), LifecycleState::Active);
        assert!(backend.scene_contains(resources.mesh));

        scene.update(&mut backend, 1.5).unwrap();
        let uploaded = backend.uploaded_uniforms(resources.material).unwrap();
        assert_eq!(uploaded.value(TIME_UNIFORM), Some(UniformValue::Float(1.5)));

        scene.dispose(&mut backend).unwrap();
        assert_eq!(scene.state(), LifecycleState::Disposed);
        assert!(!backend.scene_contains(resources.mesh));
        assert_eq!(backend.live_geometries(), 0);
        assert_eq!(backend.live_materials(), 0);
    }

    #[test]
    fn disposed_scene_rejects_everything() {
        let mut backend = RecordingBackend::new();
        let mut scene = SceneLifecycle::new(material(), Mat4::IDENTITY);
        scene.activate(&mut backend, &triangle()).unwrap();
        scene.dispose(&mut backend).unwrap();

        assert!(matches!(scene.update(&mut backend, 0.0), Err(SceneError::State(_))));
        assert!(matches!(scene.regenerate(&mut backend, &triangle()), Err(SceneError::State(_))));
        assert!(matches!(scene.dispose(&mut backend), Err(SceneError::State(_))));
        assert!(matches!(scene.activate(&mut backend, &triangle()), Err(SceneError::State(_))));
    }

    #[test]
    fn failed_shader_releases_geometry() {
        let mut backend = RecordingBackend::new();
        backend.fail_next_material = true;
        let mut scene = SceneLifecycle::new(material(), Mat4::IDENTITY);

        let err = scene.activate(&mut backend, &triangle()).unwrap_err();
        assert!(matches!(err, SceneError::Resource(_)));
        assert_eq!(scene.state(), LifecycleState::Uninitialized);
        assert_eq!(backend.live_geometries(), 0);
        assert!(backend.scene().is_empty());
    }

    #[test]
    fn failed_mesh_releases_geometry_and_material() {
        let mut backend = RecordingBackend::new();
        backend.fail_next_mesh = true;
        let mut scene = SceneLifecycle::new(material(), Mat4::IDENTITY);

        assert!(matches!(scene.activate(&mut backend, &triangle()), Err(SceneError::Resource(_))));
        assert_eq!(scene.state(), LifecycleState::Uninitialized);
        assert_eq!(scene.resources(), None);
        assert_eq!(backend.live_geometries(), 0);
        assert_eq!(backend.live_materials(), 0);
        assert!(backend.scene().is_empty());
    }

    #[test]
    fn failed_geometry_during_regenerate_disposes_the_scene() {
        let mut backend = RecordingBackend::new();
        let mut scene = SceneLifecycle::new(material(), Mat4::IDENTITY);
        scene.activate(&mut backend, &triangle()).unwrap();

        backend.fail_next_geometry = true;
        assert!(matches!(scene.regenerate(&mut backend, &triangle()), Err(SceneError::Resource(_))));
        assert_eq!(scene.state(), LifecycleState::Disposed);
        assert_eq!(scene.resources(), None);
        assert_eq!(backend.live_geometries(), 0);
        assert_eq!(backend.live_materials(), 0);
        assert!(backend.scene().is_empty());
        assert!(matches!(scene.update(&mut backend, 1.0), Err(SceneError::State(_))));
    }

    #[test]
    fn failed_mesh_during_regenerate_disposes_the_scene() {
        let mut backend = RecordingBackend::new();
        let mut scene = SceneLifecycle::new(material(), Mat4::IDENTITY);
        scene.activate(&mut backend, &triangle()).unwrap();

        backend.fail_next_mesh = true;
        assert!(matches!(scene.regenerate(&mut backend, &triangle()), Err(SceneError::Resource(_))));
        assert_eq!(scene.state(), LifecycleState::Disposed);
        assert_eq!(backend.live_geometries(), 0);
        assert_eq!(backend.live_materials(), 0);
        assert!(backend.scene().is_empty());
    }

    #[test]
    fn regenerate_swaps_geometry_and_keeps_material() {
        let mut backend = RecordingBackend::new();
        let mut scene = SceneLifecycle::new(material(), Mat4::IDENTITY);
        let before = scene.activate(&mut backend, &triangle()).unwrap();
        backend.clear_calls();

        let bigger = GeometryDescriptor::new(6, Topology::TriangleList)
            .with_attribute("position", 3, vec![0.0; 18])
            .unwrap();
        scene.regenerate(&mut backend, &bigger).unwrap();
        let after = scene.resources().unwrap();

        assert_eq!(after.material, before.material);
        assert_ne!(after.geometry, before.geometry);
        assert_eq!(
            backend.calls(),
            &[
                BackendCall::RemoveMesh(before.mesh),
                BackendCall::DisposeGeometry(before.geometry),
                BackendCall::CreateGeometry(after.geometry),
                BackendCall::CreateMesh(after.mesh),
            ]
        );
        assert_eq!(backend.geometry(after.geometry).unwrap().vertex_count(), 6);
        assert_eq!(backend.live_geometries(), 1);
    }
}

// src/rendering_lib/geometry.rs

use crate::error::SceneError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    /// One sprite per vertex.
    Points,
    TriangleList,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VertexAttribute {
    name: String,
    components: usize,
    data: Vec<f32>,
}

impl VertexAttribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Immutable vertex data produced by a generator.
///
/// Every attribute describes the same `vertex_count`; a new parameter value
/// means a whole new descriptor, never an in-place edit.
#[derive(Clone, Debug, PartialEq)]
pub struct GeometryDescriptor {
    vertex_count: usize,
    topology: Topology,
    attributes: Vec<VertexAttribute>,
    indices: Option<Vec<u32>>,
}

impl GeometryDescriptor {
    pub fn new(vertex_count: usize, topology: Topology) -> Self {
        Self {
            vertex_count,
            topology,
            attributes: Vec::new(),
            indices: None,
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        components: usize,
        data: Vec<f32>,
    ) -> Result<Self, SceneError> {
        let name = name.into();
        if components == 0 || components > 4 {
            return Err(SceneError::configuration(format!(
                "attribute '{}' has {} components",
                name, components
            )));
        }
        if data.len() != self.vertex_count * components {
            return Err(SceneError::configuration(format!(
                "attribute '{}' holds {} floats, expected {} ({} vertices x {})",
                name,
                data.len(),
                self.vertex_count * components,
                self.vertex_count,
                components
            )));
        }
        if self.attribute(&name).is_some() {
            return Err(SceneError::configuration(format!("attribute '{}' set twice", name)));
        }
        self.attributes.push(VertexAttribute { name, components, data });
        Ok(self)
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Result<Self, SceneError> {
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= self.vertex_count) {
            return Err(SceneError::configuration(format!(
                "index {} out of range for {} vertices",
                bad, self.vertex_count
            )));
        }
        self.indices = Some(indices);
        Ok(self)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn topology(&self) -> Topology {
        self.topology
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Vertex `i` of a 3-component attribute.
    pub fn vec3(&self, name: &str, i: usize) -> Option<[f32; 3]> {
        let attr = self.attribute(name).filter(|a| a.components == 3)?;
        let v = attr.data.get(i * 3..i * 3 + 3)?;
        Some([v[0], v[1], v[2]])
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer_lengths() {
        let geometry = GeometryDescriptor::new(2, Topology::Points);
        let err = geometry.with_attribute("position", 3, vec![0.0; 5]).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let geometry = GeometryDescriptor::new(3, Topology::TriangleList)
            .with_attribute("position", 3, vec![0.0; 9])
            .unwrap();
        assert!(geometry.clone().with_indices(vec![0, 1, 3]).is_err());
        assert!(geometry.with_indices(vec![0, 1, 2]).is_ok());
    }

    #[test]
    fn reads_back_vertices() {
        let geometry = GeometryDescriptor::new(2, Topology::Points)
            .with_attribute("position", 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
            .unwrap();
        assert_eq!(geometry.vec3("position", 1), Some([4.0, 5.0, 6.0]));
        assert_eq!(geometry.vec3("position", 2), None);
    }
}

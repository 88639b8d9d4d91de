// src/rendering_lib/generator.rs

use std::f32::consts::PI;

use rand::Rng;

use crate::engine_lib::params::ParameterSet;
use crate::error::SceneError;
use crate::rendering_lib::geometry::{GeometryDescriptor, Topology};

/// Uniform samples in `[0, 1)`.
pub trait RandomSource {
    fn uniform(&mut self) -> f32;
}

impl<R: Rng> RandomSource for R {
    fn uniform(&mut self) -> f32 {
        self.gen::<f32>()
    }
}

/// Half extent of the square the grass blades are scattered over.
pub const BLADE_FIELD_HALF_EXTENT: f32 = 2.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointVolume {
    /// `[-0.5, 0.5]^3`
    Cube,
    /// Shell between `radius * (1 - fillRadius)` and `radius`.
    Shell,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneSpec {
    pub width: f32,
    pub height: f32,
    pub width_segments: u32,
    pub height_segments: u32,
}

/// Which procedural recipe a demo uses, and which parameters feed it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GeometryGenerator {
    /// Reads `count`, plus `radius` and `fillRadius` for the shell.
    PointCloud { volume: PointVolume },
    /// Reads `count` and `width`.
    BladeField,
    /// Fixed tessellated canvas; ignores parameters.
    Plane(PlaneSpec),
}

impl GeometryGenerator {
    pub fn generate(
        &self,
        params: &ParameterSet,
        rng: &mut dyn RandomSource,
    ) -> Result<GeometryDescriptor, SceneError> {
        match *self {
            GeometryGenerator::PointCloud { volume } => {
                let count = read_count(params)?;
                match volume {
                    PointVolume::Cube => point_cloud_cube(count, rng),
                    PointVolume::Shell => {
                        let radius = read_scalar(params, "radius")?;
                        let fill = read_scalar(params, "fillRadius")?;
                        point_cloud_shell(count, radius, fill, rng)
                    }
                }
            }
            GeometryGenerator::BladeField => {
                let count = read_count(params)?;
                let width = read_scalar(params, "width")?;
                blade_field(count, width, rng)
            }
            GeometryGenerator::Plane(spec) => plane(spec),
        }
    }

    /// Parameters whose edits change the generated vertices.
    pub fn inputs(&self) -> &'static [&'static str] {
        match self {
            GeometryGenerator::PointCloud { volume: PointVolume::Cube } => &["count"],
            GeometryGenerator::PointCloud { volume: PointVolume::Shell } => &["count", "radius", "fillRadius"],
            GeometryGenerator::BladeField => &["count", "width"],
            GeometryGenerator::Plane(_) => &[],
        }
    }
}

fn read_count(params: &ParameterSet) -> Result<i64, SceneError> {
    params
        .value("count")
        .and_then(|v| v.as_integer())
        .ok_or_else(|| SceneError::configuration("generator needs an integer 'count' parameter"))
}

fn read_scalar(params: &ParameterSet, name: &str) -> Result<f32, SceneError> {
    params
        .value(name)
        .and_then(|v| v.as_scalar())
        .ok_or_else(|| SceneError::configuration(format!("generator needs a scalar '{}' parameter", name)))
}

fn checked_count(count: i64) -> Result<usize, SceneError> {
    usize::try_from(count)
        .map_err(|_| SceneError::configuration(format!("count must be non-negative, got {}", count)))
}

pub fn point_cloud_cube(count: i64, rng: &mut dyn RandomSource) -> Result<GeometryDescriptor, SceneError> {
    let count = checked_count(count)?;
    let mut positions = Vec::with_capacity(count * 3);
    let mut randomness = Vec::with_capacity(count);

    for _ in 0..count {
        positions.push(rng.uniform() - 0.5);
        positions.push(rng.uniform() - 0.5);
        positions.push(rng.uniform() - 0.5);
        randomness.push(rng.uniform());
    }

    GeometryDescriptor::new(count, Topology::Points)
        .with_attribute("position", 3, positions)?
        .with_attribute("aRandomness", 1, randomness)
}

pub fn point_cloud_shell(
    count: i64,
    radius: f32,
    fill_radius: f32,
    rng: &mut dyn RandomSource,
) -> Result<GeometryDescriptor, SceneError> {
    let count = checked_count(count)?;
    if !(radius > 0.0) {
        return Err(SceneError::configuration(format!("radius must be positive, got {}", radius)));
    }
    if !(0.0..=1.0).contains(&fill_radius) {
        return Err(SceneError::configuration(format!(
            "fillRadius must lie in [0, 1], got {}",
            fill_radius
        )));
    }

    let inner_radius = radius * (1.0 - fill_radius);
    let outer_radius = radius;

    let mut positions = Vec::with_capacity(count * 3);
    let mut randomness = Vec::with_capacity(count);

    for _ in 0..count {
        let distance = inner_radius + rng.uniform() * (outer_radius - inner_radius);
        let polar = rng.uniform() * PI;
        let azimuth = rng.uniform() * 2.0 * PI;

        let ring = distance * polar.sin();
        positions.push(ring * azimuth.sin());
        positions.push(distance * polar.cos());
        positions.push(ring * azimuth.cos());
        randomness.push(rng.uniform());
    }

    GeometryDescriptor::new(count, Topology::Points)
        .with_attribute("position", 3, positions)?
        .with_attribute("aRandomness", 1, randomness)
}

/// Flat-bottomed isosceles triangles standing on the XZ plane.
pub fn blade_field(count: i64, width: f32, rng: &mut dyn RandomSource) -> Result<GeometryDescriptor, SceneError> {
    let count = checked_count(count)?;
    if !(width > 0.0) {
        return Err(SceneError::configuration(format!("width must be positive, got {}", width)));
    }

    let mut positions = Vec::with_capacity(count * 9);
    for _ in 0..count {
        let x = (rng.uniform() - 0.5) * 2.0 * BLADE_FIELD_HALF_EXTENT;
        let z = (rng.uniform() - 0.5) * 2.0 * BLADE_FIELD_HALF_EXTENT;

        positions.extend_from_slice(&[x - width, 0.0, z]);
        positions.extend_from_slice(&[x + width, 0.0, z]);
        positions.extend_from_slice(&[x, width * 2.0, z]);
    }

    GeometryDescriptor::new(count * 3, Topology::TriangleList).with_attribute("position", 3, positions)
}

/// Row-major grid in the XY plane, centred on the origin, facing +Z.
pub fn plane(spec: PlaneSpec) -> Result<GeometryDescriptor, SceneError> {
    if !(spec.width > 0.0 && spec.height > 0.0) {
        return Err(SceneError::configuration("plane width and height must be positive"));
    }
    if spec.width_segments == 0 || spec.height_segments == 0 {
        return Err(SceneError::configuration("plane needs at least one segment per axis"));
    }

    let grid_x = spec.width_segments as usize;
    let grid_y = spec.height_segments as usize;
    let columns = grid_x + 1;
    let rows = grid_y + 1;
    let vertex_count = columns * rows;

    let segment_w = spec.width / grid_x as f32;
    let segment_h = spec.height / grid_y as f32;

    let mut positions = Vec::with_capacity(vertex_count * 3);
    let mut normals = Vec::with_capacity(vertex_count * 3);
    let mut uvs = Vec::with_capacity(vertex_count * 2);

    for iy in 0..rows {
        let y = iy as f32 * segment_h - spec.height / 2.0;
        for ix in 0..columns {
            let x = ix as f32 * segment_w - spec.width / 2.0;
            positions.extend_from_slice(&[x, -y, 0.0]);
            normals.extend_from_slice(&[0.0, 0.0, 1.0]);
            uvs.push(ix as f32 / grid_x as f32);
            uvs.push(1.0 - iy as f32 / grid_y as f32);
        }
    }

    let mut indices = Vec::with_capacity(grid_x * grid_y * 6);
    for iy in 0..grid_y {
        for ix in 0..grid_x {
            let a = (ix + columns * iy) as u32;
            let b = (ix + columns * (iy + 1)) as u32;
            let c = (ix + 1 + columns * (iy + 1)) as u32;
            let d = (ix + 1 + columns * iy) as u32;
            indices.extend_from_slice(&[a, b, d, b, c, d]);
        }
    }

    GeometryDescriptor::new(vertex_count, Topology::TriangleList)
        .with_attribute("position", 3, positions)?
        .with_attribute("normal", 3, normals)?
        .with_attribute("uv", 2, uvs)?
        .with_indices(indices)
}

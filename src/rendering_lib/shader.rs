// src/rendering_lib/shader.rs

//! WGSL programs of the demos.
//!
//! Stage sources only contain the entry points. `compose` prepends the
//! shared transform block and a `Material` struct generated from the uniform
//! table, one `vec4<f32>` per slot, so every uniform is read as
//! `material.<name>.x` (scalars) or `material.<name>.rgb` (colors).

use crate::engine_lib::uniforms::UniformTable;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShaderSources {
    pub vertex: &'static str,
    pub fragment: &'static str,
}

pub const TRANSFORMS_WGSL: &str = r#"
struct Transforms {
    view: mat4x4<f32>,
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
    camera_position: vec4<f32>,
}

@group(0) @binding(0)
var<uniform> transforms: Transforms;
"#;

/// Builds the full module text for one stage.
pub fn compose(stage_source: &str, uniforms: &UniformTable) -> String {
    let mut out = String::with_capacity(TRANSFORMS_WGSL.len() + stage_source.len() + 256);
    out.push_str(TRANSFORMS_WGSL);
    out.push_str("\nstruct Material {\n");
    if uniforms.is_empty() {
        out.push_str("    _unused: vec4<f32>,\n");
    }
    for slot in uniforms.slots() {
        out.push_str(&format!("    {}: vec4<f32>,\n", slot.name));
    }
    out.push_str("}\n\n@group(1) @binding(0)\nvar<uniform> material: Material;\n");
    out.push_str(stage_source);
    out
}

/// Programs keyed by demo name.
pub fn sources_for(demo: &str) -> Option<ShaderSources> {
    match demo {
        "fireflies" => Some(ShaderSources { vertex: FIREFLIES_VERTEX, fragment: FIREFLIES_FRAGMENT }),
        "grass" => Some(ShaderSources { vertex: GRASS_VERTEX, fragment: GRASS_FRAGMENT }),
        "grid-floor" => Some(ShaderSources { vertex: GRID_FLOOR_VERTEX, fragment: GRID_FLOOR_FRAGMENT }),
        "pattern" => Some(ShaderSources { vertex: PATTERN_VERTEX, fragment: PATTERN_FRAGMENT }),
        _ => None,
    }
}

// Points are drawn as instanced quads: one instance per firefly, six
// vertices per quad picked by vertex_index.
pub const FIREFLIES_VERTEX: &str = r#"
struct VertexInput {
    @builtin(vertex_index) corner_index: u32,
    @location(0) position: vec3<f32>,
    @location(1) randomness: f32,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) quad_uv: vec2<f32>,
    @location(1) randomness: f32,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, -1.0), vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0), vec2<f32>(1.0, 1.0), vec2<f32>(-1.0, 1.0),
    );
    let corner = corners[in.corner_index % 6u];

    var out: VertexOutput;
    let world = transforms.model * vec4<f32>(in.position, 1.0);
    var clip = transforms.projection * transforms.view * world;

    // Size scales with 1/depth like a perspective point sprite.
    let resolution = max(material.uResolution.xy, vec2<f32>(1.0, 1.0));
    let aspect_fix = vec2<f32>(resolution.y / resolution.x, 1.0);
    clip = vec4<f32>(clip.xy + corner * material.uSize.x * aspect_fix, clip.zw);

    out.clip_position = clip;
    out.quad_uv = corner * 0.5 + vec2<f32>(0.5, 0.5);
    out.randomness = in.randomness;
    return out;
}
"#;

pub const FIREFLIES_FRAGMENT: &str = r#"
struct FragmentInput {
    @location(0) quad_uv: vec2<f32>,
    @location(1) randomness: f32,
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let d = distance(in.quad_uv, vec2<f32>(0.5, 0.5));
    if (d > 0.5) {
        discard;
    }
    let glow = clamp(0.05 / max(d, 0.0001) - 0.1, 0.0, 1.0);
    let flicker = sin(material.uTime.x * material.uSpeed.x + in.randomness * material.uPhaseShift.x) * 0.5 + 0.5;
    return vec4<f32>(material.uColor.rgb, glow * flicker);
}
"#;

pub const GRASS_VERTEX: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) height: f32,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var local = in.position;
    // Only apexes sway; base vertices sit at y = 0.
    local.x = local.x + sin(material.uTime.x * 2.0 + local.z * 3.0) * 0.1 * local.y;

    var out: VertexOutput;
    out.clip_position = transforms.projection * transforms.view * transforms.model * vec4<f32>(local, 1.0);
    out.height = in.position.y;
    return out;
}
"#;

pub const GRASS_FRAGMENT: &str = r#"
struct FragmentInput {
    @location(0) height: f32,
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let root = vec3<f32>(0.02, 0.12, 0.02);
    let tip = vec3<f32>(0.35, 0.75, 0.15);
    let t = clamp(in.height, 0.0, 1.0);
    return vec4<f32>(mix(root, tip, t), 1.0);
}
"#;

pub const GRID_FLOOR_VERTEX: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) local: vec2<f32>,
    @location(1) view_depth: f32,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    let view_position = transforms.view * transforms.model * vec4<f32>(in.position, 1.0);

    var out: VertexOutput;
    out.clip_position = transforms.projection * view_position;
    out.local = in.position.xy;
    out.view_depth = -view_position.z;
    return out;
}
"#;

pub const GRID_FLOOR_FRAGMENT: &str = r#"
struct FragmentInput {
    @location(0) local: vec2<f32>,
    @location(1) view_depth: f32,
}

fn line_distance(coord: vec2<f32>) -> vec2<f32> {
    let f = fract(coord);
    return min(f, vec2<f32>(1.0, 1.0) - f);
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let d = line_distance(in.local);

    let half_grid = material.uGridThickness.x * 0.5;
    let on_grid = max(step(d.x, half_grid), step(d.y, half_grid));

    let half_cross = material.uCrossThickness.x * 0.5;
    let arm = material.uCross.x;
    let horizontal = step(d.y, half_cross) * step(d.x, arm);
    let vertical = step(d.x, half_cross) * step(d.y, arm);
    let on_cross = max(horizontal, vertical);

    var color = material.uFloorColor.rgb;
    color = mix(color, material.uGridColor.rgb, on_grid);
    color = mix(color, material.uCrossColor.rgb, on_cross);

    let fog = smoothstep(material.fogNear.x, material.fogFar.x, in.view_depth);
    color = mix(color, material.fogColor.rgb, fog);
    return vec4<f32>(color, 1.0);
}
"#;

pub const PATTERN_VERTEX: &str = r#"
struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = transforms.projection * transforms.view * transforms.model * vec4<f32>(in.position, 1.0);
    out.uv = in.uv;
    return out;
}
"#;

pub const PATTERN_FRAGMENT: &str = r#"
struct FragmentInput {
    @location(0) uv: vec2<f32>,
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let wave = sin(in.uv.x * material.uFrequency.x + material.uTime.x * material.uSpeed.x) * material.uAmplitude.x;
    let stripes = fract((in.uv.y + wave * 0.1) * 10.0);
    let color = mix(material.uColor1.rgb, material.uColor2.rgb, step(0.5, stripes));
    return vec4<f32>(color, 1.0);
}
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::uniforms::UniformValue;

    #[test]
    fn material_block_follows_table_order() {
        let mut table = UniformTable::new();
        table.declare("uTime", UniformValue::Float(0.0)).unwrap();
        table.declare("uColor1", UniformValue::Color([0.0; 3])).unwrap();
        let module = compose(PATTERN_FRAGMENT, &table);

        let time = module.find("uTime: vec4<f32>").unwrap();
        let color = module.find("uColor1: vec4<f32>").unwrap();
        assert!(time < color);
        assert!(module.contains("var<uniform> transforms: Transforms;"));
        assert!(module.ends_with(PATTERN_FRAGMENT));
    }

    #[test]
    fn every_demo_has_sources() {
        for demo in ["fireflies", "grass", "grid-floor", "pattern"] {
            let sources = sources_for(demo).unwrap();
            assert!(sources.vertex.contains("fn vs_main"));
            assert!(sources.fragment.contains("fn fs_main"));
        }
        assert!(sources_for("teapot").is_none());
    }
}

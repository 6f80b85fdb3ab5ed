//! Built-in hatched toon program.
//!
//! Bind groups: 0 = camera, 1 = node transform, 2 = material uniforms.
//! The material block is one `vec4<f32>` per uniform in schema order, which is
//! exactly what [`crate::MaterialInstance::pack_slots`] produces.

use crate::program::ShaderSource;
use crate::uniform::{UniformSchema, UniformType};

/// Number of hatch line colors the toon program reads.
pub const LINE_COLOR_COUNT: usize = 5;

pub const TOON_HATCH_VERTEX: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
};

struct Node {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(1) @binding(0)
var<uniform> node: Node;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = camera.view_proj * node.model * vec4<f32>(vertex.position, 1.0);
    out.world_normal = normalize((node.normal * vec4<f32>(vertex.normal, 0.0)).xyz);
    return out;
}
"#;

pub const TOON_HATCH_FRAGMENT: &str = r#"
struct Material {
    dir_light_pos: vec4<f32>,
    dir_light_color: vec4<f32>,
    ambient_light_color: vec4<f32>,
    base_color: vec4<f32>,
    line_color_0: vec4<f32>,
    line_color_1: vec4<f32>,
    line_color_2: vec4<f32>,
    line_color_3: vec4<f32>,
    line_color_4: vec4<f32>,
};

@group(2) @binding(0)
var<uniform> material: Material;

struct FragmentInput {
    @builtin(position) frag_coord: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
};

fn on_hatch(coord: vec2<f32>, slope: f32, offset: f32, spacing: f32) -> bool {
    let p = floor(coord);
    let v = p.x + slope * p.y + offset;
    return v - spacing * floor(v / spacing) == 0.0;
}

@fragment
fn fs_main(in: FragmentInput) -> @location(0) vec4<f32> {
    let light_dir = normalize(material.dir_light_pos.xyz);
    let weight = max(dot(normalize(in.world_normal), light_dir), 0.0);
    let lighting = material.ambient_light_color.rgb + material.dir_light_color.rgb * weight;
    let intensity = length(lighting);
    let xy = in.frag_coord.xy;

    var color = material.base_color.rgb;
    if (intensity >= 1.0 && on_hatch(xy, 1.0, 0.0, 20.0)) {
        color = material.line_color_0.rgb;
    }
    if (intensity < 1.0 && on_hatch(xy, 1.0, 0.0, 10.0)) {
        color = material.line_color_1.rgb;
    }
    if (intensity < 0.75 && on_hatch(xy, -1.0, 0.0, 10.0)) {
        color = material.line_color_2.rgb;
    }
    if (intensity < 0.5 && on_hatch(xy, 1.0, -5.0, 10.0)) {
        color = material.line_color_3.rgb;
    }
    if (intensity < 0.3465 && on_hatch(xy, -1.0, -5.0, 10.0)) {
        color = material.line_color_4.rgb;
    }
    return vec4<f32>(color, 1.0);
}
"#;

pub const DIR_LIGHT_POS: &str = "uDirLightPos";
pub const DIR_LIGHT_COLOR: &str = "uDirLightColor";
pub const AMBIENT_LIGHT_COLOR: &str = "uAmbientLightColor";
pub const BASE_COLOR: &str = "uBaseColor";

/// Uniform name of hatch line color `index` (`uLineColor0` ..).
pub fn line_color(index: usize) -> String {
    format!("uLineColor{index}")
}

/// Label of the built-in program; also its pipeline cache key.
pub const TOON_HATCH_LABEL: &str = "toon_hatch";

pub fn toon_hatch_source() -> ShaderSource {
    ShaderSource::new(TOON_HATCH_LABEL, TOON_HATCH_VERTEX, TOON_HATCH_FRAGMENT)
}

/// Schema matching the `Material` block of [`TOON_HATCH_FRAGMENT`].
pub fn toon_hatch_schema() -> UniformSchema {
    let schema = UniformSchema::new()
        .with(DIR_LIGHT_POS, UniformType::Vec3)
        .with(DIR_LIGHT_COLOR, UniformType::Color)
        .with(AMBIENT_LIGHT_COLOR, UniformType::Color)
        .with(BASE_COLOR, UniformType::Color);
    (0..LINE_COLOR_COUNT).fold(schema, |schema, i| schema.with(line_color(i), UniformType::Color))
}

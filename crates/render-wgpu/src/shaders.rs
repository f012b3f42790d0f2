//! WGSL programs for the noise torus and the `#include` expansion step.
//!
//! Shader sources reference shared chunks with `#include <name>` lines.
//! [`IncludeRegistry::expand`] inlines them before the text reaches the
//! shader compiler; each chunk is inlined at most once per program.

use std::collections::BTreeMap;

/// Deepest chain of nested includes accepted.
pub const MAX_INCLUDE_DEPTH: usize = 8;

/// Uniform blocks, bindings and stage interface shared by both programs.
pub const TORUS_COMMON: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
};

struct Material {
    color: vec3<f32>,
    light_intensity: f32,
    light_pos: vec3<f32>,
    noise_coef: f32,
    light_color: vec3<f32>,
    noise_min: f32,
    noise_max: f32,
    noise_scale: f32,
};

@group(0) @binding(0)
var<uniform> camera: Camera;

@group(0) @binding(1)
var<uniform> material: Material;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_position: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) noise: f32,
};
"#;

/// 2D simplex noise (Ashima Arts / Ian McEwan), returns roughly `[-1, 1]`.
pub const SIMPLEX_NOISE_2D: &str = r#"
fn mod289_v2(x: vec2<f32>) -> vec2<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn mod289_v3(x: vec3<f32>) -> vec3<f32> {
    return x - floor(x * (1.0 / 289.0)) * 289.0;
}

fn permute_v3(x: vec3<f32>) -> vec3<f32> {
    return mod289_v3(((x * 34.0) + 1.0) * x);
}

fn snoise(v: vec2<f32>) -> f32 {
    let C = vec4<f32>(
        0.211324865405187,
        0.366025403784439,
        -0.577350269189626,
        0.024390243902439,
    );

    var i = floor(v + dot(v, C.yy));
    let x0 = v - i + dot(i, C.xx);

    let i1 = select(vec2<f32>(0.0, 1.0), vec2<f32>(1.0, 0.0), x0.x > x0.y);
    var x12 = x0.xyxy + C.xxzz;
    x12 = vec4<f32>(x12.xy - i1, x12.zw);

    i = mod289_v2(i);
    let p = permute_v3(
        permute_v3(i.y + vec3<f32>(0.0, i1.y, 1.0)) + i.x + vec3<f32>(0.0, i1.x, 1.0)
    );

    var m = max(
        0.5 - vec3<f32>(dot(x0, x0), dot(x12.xy, x12.xy), dot(x12.zw, x12.zw)),
        vec3<f32>(0.0),
    );
    m = m * m;
    m = m * m;

    let x = 2.0 * fract(p * C.www) - 1.0;
    let h = abs(x) - 0.5;
    let ox = floor(x + 0.5);
    let a0 = x - ox;

    m = m * (1.79284291400159 - 0.85373472095314 * (a0 * a0 + h * h));

    let g = vec3<f32>(a0.x * x0.x + h.x * x0.y, a0.yz * x12.xz + h.yz * x12.yw);
    return 130.0 * dot(m, g);
}
"#;

/// Vertex stage: push each vertex along its normal by the noise field.
pub const NOISE_VERTEX_SHADER: &str = r#"
#include <torus/common>
#include <noise/simplex2d>

const DISPLACEMENT_FACTOR: f32 = 0.25;
const NOISE_FREQUENCY: f32 = 0.05;

fn displacement_amplitude() -> f32 {
    let lo = min(material.noise_min, material.noise_max);
    let hi = max(material.noise_min, material.noise_max);
    return clamp(material.noise_coef * material.noise_scale, lo, hi) * DISPLACEMENT_FACTOR;
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    // Sample by position, not uv, so the duplicated seam vertices move together.
    let p = input.position;
    let coords = vec2<f32>(p.x + p.z, p.y - p.z) * material.noise_coef * NOISE_FREQUENCY;
    let n = snoise(coords);
    let displaced = p + input.normal * n * displacement_amplitude();

    var out: VertexOutput;
    out.clip_position = camera.view_proj * vec4<f32>(displaced, 1.0);
    out.world_position = displaced;
    out.world_normal = input.normal;
    out.noise = n;
    return out;
}
"#;

/// Fragment stage: Lambert shading from one point light plus screen grain.
pub const NOISE_FRAGMENT_SHADER: &str = r#"
#include <torus/common>
#include <noise/simplex2d>

const AMBIENT: f32 = 0.25;
const GRAIN: f32 = 0.04;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let normal = normalize(in.world_normal);
    let to_light = normalize(material.light_pos - in.world_position);
    let diffuse = max(dot(normal, to_light), 0.0) * material.light_intensity;
    let lit = material.color * (AMBIENT + diffuse * material.light_color);
    let shade = 0.85 + 0.15 * in.noise;
    let grain = snoise(in.clip_position.xy * 0.5) * GRAIN;
    return vec4<f32>(lit * shade + vec3<f32>(grain), 1.0);
}
"#;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("unknown shader include <{0}>")]
    UnknownInclude(String),
    #[error("shader includes nested deeper than {MAX_INCLUDE_DEPTH} levels at <{0}>")]
    TooDeep(String),
}

/// Named WGSL chunks available to `#include`.
#[derive(Debug, Clone, Default)]
pub struct IncludeRegistry {
    chunks: BTreeMap<String, String>,
}

impl IncludeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the chunks the torus programs use.
    pub fn builtin() -> Self {
        Self::new()
            .with_chunk("torus/common", TORUS_COMMON)
            .with_chunk("noise/simplex2d", SIMPLEX_NOISE_2D)
    }

    pub fn with_chunk(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.chunks.insert(name.into(), source.into());
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chunks.keys().map(String::as_str)
    }

    /// Replace every `#include <name>` line with the chunk's (expanded) text.
    pub fn expand(&self, source: &str) -> Result<String, ShaderError> {
        let mut out = String::with_capacity(source.len());
        let mut seen = Vec::new();
        self.expand_into(source, &mut out, &mut seen, 0)?;
        Ok(out)
    }

    fn expand_into<'a>(
        &'a self,
        source: &str,
        out: &mut String,
        seen: &mut Vec<&'a str>,
        depth: usize,
    ) -> Result<(), ShaderError> {
        for line in source.lines() {
            let Some(name) = parse_include(line) else {
                out.push_str(line);
                out.push('\n');
                continue;
            };
            let (key, chunk) = self
                .chunks
                .get_key_value(name)
                .ok_or_else(|| ShaderError::UnknownInclude(name.to_string()))?;
            if seen.contains(&key.as_str()) {
                continue;
            }
            if depth >= MAX_INCLUDE_DEPTH {
                return Err(ShaderError::TooDeep(name.to_string()));
            }
            seen.push(key.as_str());
            self.expand_into(chunk, out, seen, depth + 1)?;
        }
        Ok(())
    }
}

fn parse_include(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix("#include")?;
    let name = rest.trim().strip_prefix('<')?.strip_suffix('>')?;
    Some(name.trim())
}

/// Fully expanded vertex program.
pub fn vertex_source() -> Result<String, ShaderError> {
    IncludeRegistry::builtin().expand(NOISE_VERTEX_SHADER)
}

/// Fully expanded fragment program.
pub fn fragment_source() -> Result<String, ShaderError> {
    IncludeRegistry::builtin().expand(NOISE_FRAGMENT_SHADER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programs_expand_without_leftover_directives() {
        for source in [vertex_source().unwrap(), fragment_source().unwrap()] {
            assert!(!source.contains("#include"));
            assert!(source.contains("fn snoise("));
            assert!(source.contains("var<uniform> material: Material;"));
        }
    }

    #[test]
    fn entry_points_are_present() {
        assert!(vertex_source().unwrap().contains("fn vs_main("));
        assert!(fragment_source().unwrap().contains("fn fs_main("));
    }

    #[test]
    fn chunk_is_inlined_once() {
        let registry = IncludeRegistry::new().with_chunk("a", "fn a() {}");
        let out = registry.expand("#include <a>\n#include <a>\nfn main() {}").unwrap();
        assert_eq!(out.matches("fn a()").count(), 1);
        assert!(out.contains("fn main()"));
    }

    #[test]
    fn whitespace_in_directive_is_tolerated() {
        let registry = IncludeRegistry::new().with_chunk("noise/x", "fn x() {}");
        let out = registry.expand("   #include   < noise/x >  ").unwrap();
        assert!(out.contains("fn x() {}"));
    }

    #[test]
    fn unknown_include_is_an_error() {
        let err = IncludeRegistry::builtin()
            .expand("#include <noise/simplex4d>")
            .unwrap_err();
        assert_eq!(err, ShaderError::UnknownInclude("noise/simplex4d".into()));
    }

    #[test]
    fn include_cycle_terminates() {
        let registry = IncludeRegistry::new()
            .with_chunk("a", "#include <b>\nfn a() {}")
            .with_chunk("b", "#include <a>\nfn b() {}");
        let out = registry.expand("#include <a>").unwrap();
        assert_eq!(out.matches("fn a()").count(), 1);
        assert_eq!(out.matches("fn b()").count(), 1);
    }

    #[test]
    fn overly_deep_chain_is_rejected() {
        let mut registry = IncludeRegistry::new();
        for level in 0..=MAX_INCLUDE_DEPTH {
            registry = registry.with_chunk(
                format!("c{level}"),
                format!("#include <c{}>\nfn c{level}() {{}}", level + 1),
            );
        }
        registry = registry.with_chunk(format!("c{}", MAX_INCLUDE_DEPTH + 1), "fn end() {}");
        assert!(matches!(
            registry.expand("#include <c0>"),
            Err(ShaderError::TooDeep(_))
        ));
    }

    #[test]
    fn builtin_lists_its_chunks() {
        let names: Vec<_> = IncludeRegistry::builtin().names().map(str::to_owned).collect();
        assert_eq!(names, vec!["noise/simplex2d", "torus/common"]);
    }
}

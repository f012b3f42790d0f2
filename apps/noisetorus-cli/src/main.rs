use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use glam::Vec3;
use noisetorus_render_wgpu::shaders;
use noisetorus_scene::{
    ContainerSize, DebugTextRenderer, ManualRefreshDriver, ResizeOutcome, SceneConfig,
    SceneController, SceneStats, StaticHost, TorusGeometry, UniformName, UniformSet, UniformValue,
};
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "noisetorus-cli", about = "Headless tools for the noise torus scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print a fully expanded WGSL program
    Shader {
        #[arg(value_enum, default_value = "vertex")]
        stage: Stage,
    },
    /// Build the torus mesh and report its size and bounds
    Mesh {
        #[arg(long, default_value_t = TorusGeometry::SCENE.radius)]
        radius: f32,
        #[arg(long, default_value_t = TorusGeometry::SCENE.tube)]
        tube: f32,
        #[arg(
            long,
            default_value_t = TorusGeometry::SCENE.radial_segments,
            value_parser = clap::value_parser!(u32).range(
                TorusGeometry::MIN_RADIAL_SEGMENTS as i64..=TorusGeometry::MAX_SEGMENTS as i64
            )
        )]
        radial_segments: u32,
        #[arg(
            long,
            default_value_t = TorusGeometry::SCENE.tubular_segments,
            value_parser = clap::value_parser!(u32).range(
                TorusGeometry::MIN_TUBULAR_SEGMENTS as i64..=TorusGeometry::MAX_SEGMENTS as i64
            )
        )]
        tubular_segments: u32,
    },
    /// Drive the scene with a manual refresh source and the debug text renderer
    Simulate {
        /// Number of display refreshes to fire
        #[arg(short, long, default_value_t = 5)]
        frames: u64,
        /// Container width in logical pixels
        #[arg(long, default_value_t = 800)]
        width: u32,
        /// Container height in logical pixels
        #[arg(long, default_value_t = 600)]
        height: u32,
        #[arg(long, default_value_t = 1.0)]
        pixel_ratio: f64,
        /// Resize the container before a frame, e.g. `1024x768@3`
        #[arg(long = "resize", value_parser = parse_resize)]
        resizes: Vec<ResizeStep>,
        /// Scene config file (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the material uniforms as JSON
    Uniforms {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override a uniform, e.g. `uNoiseCoef=7` or `uLightPos=0,5,3`
        #[arg(long = "set", value_parser = parse_assignment)]
        sets: Vec<(String, String)>,
    },
    /// Print the effective scene config as YAML
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Vertex,
    Fragment,
}

/// A container resize applied before the given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResizeStep {
    frame: u64,
    container: ContainerSize,
}

fn parse_resize(s: &str) -> Result<ResizeStep, String> {
    let (size, frame) = s
        .split_once('@')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT@FRAME, got {s:?}"))?;
    let (w, h) = size
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {size:?}"))?;
    let number = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("{v:?}: {e}"));
    Ok(ResizeStep {
        frame: frame.trim().parse().map_err(|e| format!("{frame:?}: {e}"))?,
        container: ContainerSize::new(number(w)?, number(h)?),
    })
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    Ok((name.trim().to_string(), value.to_string()))
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SceneConfig> {
    match path {
        Some(path) => {
            SceneConfig::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None => Ok(SceneConfig::default()),
    }
}

struct SimulationReport {
    prepared: Vec<String>,
    frames: Vec<String>,
    resizes: Vec<(u64, ResizeOutcome)>,
    stats: SceneStats,
    pending_after: usize,
    revoked: u64,
    listeners_after: usize,
}

fn simulate(
    container: ContainerSize,
    pixel_ratio: f64,
    frames: u64,
    resizes: &[ResizeStep],
    config: &SceneConfig,
) -> anyhow::Result<SimulationReport> {
    let host = StaticHost::new(container, pixel_ratio);
    let driver = ManualRefreshDriver::new();
    let mut controller =
        SceneController::attach(DebugTextRenderer::new(), host.clone(), driver.clone(), config)?;

    let mut applied = Vec::new();
    for frame in 0..frames {
        for step in resizes.iter().filter(|s| s.frame == frame) {
            host.set_container(step.container);
            applied.push((frame, controller.on_host_resized()));
        }
        for handle in driver.fire() {
            controller.on_refresh(handle);
        }
    }

    let stats = controller.stats();
    let backend = controller.detach();
    tracing::debug!(frames = stats.frames_rendered, "simulation finished");
    Ok(SimulationReport {
        prepared: backend.prepared().to_vec(),
        frames: backend.frames().to_vec(),
        resizes: applied,
        stats,
        pending_after: driver.pending(),
        revoked: driver.revoked_count(),
        listeners_after: host.listener_count(),
    })
}

fn uniforms_json(uniforms: &UniformSet) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for name in UniformName::ALL {
        let value = match uniforms.get(name) {
            UniformValue::Scalar(v) => json!(v),
            UniformValue::Vec3(v) => json!(v.to_array()),
            UniformValue::Color(c) => json!(c.to_string()),
        };
        map.insert(name.as_str().to_string(), value);
    }
    map.insert("revision".into(), json!(uniforms.revision()));
    serde_json::Value::Object(map)
}

fn shader_chunks() -> Vec<String> {
    let registry = shaders::IncludeRegistry::builtin();
    registry.names().map(str::to_owned).collect()
}

fn mesh_bounds(geometry: &TorusGeometry) -> (usize, usize, Vec3, Vec3) {
    let data = geometry.build();
    let (min, max) = data.vertices.iter().fold(
        (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
        |(min, max), v| {
            let p = Vec3::from(v.position);
            (min.min(p), max.max(p))
        },
    );
    (data.vertices.len(), data.indices.len(), min, max)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("noisetorus-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("scene: {}", noisetorus_scene::crate_info());
            println!("input: {}", noisetorus_input::crate_info());
            println!("render: {}", noisetorus_render_wgpu::crate_info());
            println!("shader chunks: {}", shader_chunks().join(", "));
        }
        Commands::Shader { stage } => {
            let source = match stage {
                Stage::Vertex => shaders::vertex_source()?,
                Stage::Fragment => shaders::fragment_source()?,
            };
            print!("{source}");
        }
        Commands::Mesh {
            radius,
            tube,
            radial_segments,
            tubular_segments,
        } => {
            let geometry = TorusGeometry {
                radius,
                tube,
                radial_segments,
                tubular_segments,
            };
            let (vertices, indices, min, max) = mesh_bounds(&geometry);
            println!(
                "torus R={radius} r={tube} segments={radial_segments}x{tubular_segments}"
            );
            println!("vertices={vertices} indices={indices} triangles={}", indices / 3);
            println!(
                "bounds min=({:.3}, {:.3}, {:.3}) max=({:.3}, {:.3}, {:.3})",
                min.x, min.y, min.z, max.x, max.y, max.z
            );
        }
        Commands::Simulate {
            frames,
            width,
            height,
            pixel_ratio,
            resizes,
            config,
        } => {
            let config = load_config(config.as_ref())?;
            let report = simulate(
                ContainerSize::new(width, height),
                pixel_ratio,
                frames,
                &resizes,
                &config,
            )?;
            for line in &report.prepared {
                println!("prepared {line}");
            }
            for (frame, outcome) in &report.resizes {
                println!("resize before frame {frame}: {outcome:?}");
            }
            for line in &report.frames {
                println!("{line}");
            }
            let s = report.stats;
            println!(
                "rendered={} dropped={} viewport={}x{} aspect={:.4}",
                s.frames_rendered, s.frames_dropped, s.viewport.width, s.viewport.height, s.aspect
            );
            println!(
                "after detach: pending={} revoked={} listeners={}",
                report.pending_after, report.revoked, report.listeners_after
            );
        }
        Commands::Uniforms { config, sets } => {
            let mut uniforms = load_config(config.as_ref())?.uniforms;
            for (name, value) in &sets {
                uniforms.set_from_str(name, value)?;
            }
            println!("{}", serde_json::to_string_pretty(&uniforms_json(&uniforms))?);
        }
        Commands::Config { config } => {
            print!("{}", load_config(config.as_ref())?.to_yaml()?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_steps_parse() {
        assert_eq!(
            parse_resize("1024x768@3").unwrap(),
            ResizeStep {
                frame: 3,
                container: ContainerSize::new(1024, 768)
            }
        );
        assert!(parse_resize("1024x768").is_err());
        assert!(parse_resize("wide@1").is_err());
    }

    #[test]
    fn assignments_parse() {
        assert_eq!(
            parse_assignment("uLightPos=0,5,3").unwrap(),
            ("uLightPos".to_string(), "0,5,3".to_string())
        );
        assert!(parse_assignment("uNoiseCoef").is_err());
    }

    #[test]
    fn simulation_renders_and_tears_down() {
        let report = simulate(
            ContainerSize::new(800, 600),
            2.0,
            4,
            &[],
            &SceneConfig::default(),
        )
        .unwrap();
        assert_eq!(report.frames.len(), 4);
        assert_eq!(report.stats.frames_rendered, 4);
        assert!(report.frames[0].contains("surface=1600x1400"));
        assert_eq!(report.pending_after, 0);
        assert_eq!(report.revoked, 1);
        assert_eq!(report.listeners_after, 0);
    }

    #[test]
    fn simulation_applies_and_skips_resizes() {
        let steps = [
            parse_resize("400x300@1").unwrap(),
            parse_resize("0x300@2").unwrap(),
        ];
        let report = simulate(
            ContainerSize::new(800, 600),
            1.0,
            3,
            &steps,
            &SceneConfig::default(),
        )
        .unwrap();
        assert_eq!(report.resizes.len(), 2);
        assert!(matches!(report.resizes[0].1, ResizeOutcome::Applied(_)));
        assert_eq!(report.resizes[1].1, ResizeOutcome::Skipped);
        // the skipped resize keeps the 400x400 viewport
        assert_eq!(report.stats.viewport.width, 400);
        assert_eq!(report.stats.viewport.height, 400);
        assert!((report.stats.aspect - 1.0).abs() < 1e-6);
    }

    #[test]
    fn uniforms_json_uses_shader_names() {
        let mut uniforms = UniformSet::default();
        uniforms.set_from_str("uNoiseCoef", "7").unwrap();
        let value = uniforms_json(&uniforms);
        assert_eq!(value["uColor"], "#7b8bff");
        assert_eq!(value["uNoiseCoef"], 7.0);
        assert_eq!(value["uLightPos"], json!([0.0, 5.0, 3.0]));
        assert_eq!(value["revision"], 1);
    }

    #[test]
    fn builtin_shader_chunks_are_listed() {
        assert_eq!(shader_chunks(), vec!["noise/simplex2d", "torus/common"]);
    }

    #[test]
    fn mesh_segments_are_range_checked() {
        assert!(Cli::try_parse_from(["noisetorus-cli", "mesh", "--radial-segments", "70000"]).is_err());
        assert!(Cli::try_parse_from(["noisetorus-cli", "mesh", "--tubular-segments", "2"]).is_err());
        let cli = Cli::try_parse_from([
            "noisetorus-cli",
            "mesh",
            "--radial-segments",
            "4096",
            "--tubular-segments",
            "3",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Mesh {
                radial_segments: 4096,
                tubular_segments: 3,
                ..
            }
        ));
    }

    #[test]
    fn scene_mesh_bounds() {
        let (vertices, indices, min, max) = mesh_bounds(&TorusGeometry::SCENE);
        assert_eq!(vertices, 17 * 101);
        assert_eq!(indices, 16 * 100 * 6);
        assert!((max.x - 13.0).abs() < 1e-3);
        assert!((min.z + 3.0).abs() < 1e-3);
    }
}

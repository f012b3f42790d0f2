//! wgpu render backend for the noise torus.
//!
//! [`WgpuBackend`] implements [`noisetorus_scene::RenderBackend`] on a
//! window surface. The torus is displaced in the vertex stage by 2D simplex
//! noise and lit by a single point light in the fragment stage.
//!
//! # Invariants
//! - The backend never mutates the scene or camera.
//! - Material uniforms are re-uploaded only when their revision changes.
//! - Shader and pipeline validation errors surface as
//!   [`noisetorus_scene::BackendError::ShaderCompilation`], never as a panic.

mod camera;
mod gpu;
pub mod shaders;
mod surface;

pub use camera::{CameraUniforms, overflow_crop};
pub use gpu::{DEPTH_FORMAT, MaterialUniforms, TorusRenderer};
pub use shaders::{IncludeRegistry, ShaderError};
pub use surface::{SurfaceFrame, WgpuBackend, surface_size_for};

pub fn crate_info() -> &'static str {
    "noisetorus-render-wgpu v0.1.0"
}

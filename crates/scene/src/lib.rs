//! Scene core: everything about the noise torus that does not touch a GPU.
//!
//! The controller owns a scene graph with one torus mesh, a perspective
//! camera, orbit controls and a render loop, and talks to the outside world
//! through three traits: [`RenderBackend`] (the surface-bound renderer),
//! [`HostEnvironment`] (container layout, pixel ratio, resize listeners) and
//! [`RefreshScheduler`] (the display refresh signal).
//!
//! # Invariants
//! - Camera aspect always equals the latest viewport width / height.
//! - Frames are drawn strictly one after another.
//! - Dropping the controller revokes the pending frame and removes the
//!   resize listener.

pub mod backend;
pub mod camera;
pub mod config;
pub mod controller;
pub mod controls;
pub mod geometry;
pub mod graph;
pub mod host;
pub mod render_loop;
pub mod uniforms;
pub mod viewport;

pub use backend::{BackendError, DebugTextRenderer, FrameError, RenderBackend};
pub use camera::{CameraConfig, PerspectiveCamera};
pub use config::{ConfigError, RendererConfig, SceneConfig};
pub use controller::{ResizeOutcome, SceneController, SceneError, SceneStats};
pub use controls::{ControlsConfig, OrbitControls};
pub use geometry::{MeshData, TorusGeometry, TorusVertex};
pub use graph::{Mesh, NoiseMaterial, Scene};
pub use host::{ContainerSize, HostEnvironment, ListenerId, ListenerRegistry, StaticHost};
pub use render_loop::{
    FrameHandle, FrameOutcome, LoopError, LoopState, ManualRefreshDriver, RefreshScheduler,
    RenderLoop,
};
pub use uniforms::{UniformError, UniformKind, UniformName, UniformSet, UniformValue};
pub use viewport::{HEIGHT_OVERFLOW, ViewportState};

pub fn crate_info() -> &'static str {
    "noisetorus-scene v0.1.0"
}

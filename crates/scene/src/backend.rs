use crate::camera::PerspectiveCamera;
use crate::graph::{Mesh, Scene};
use crate::viewport::ViewportState;

/// Failures while bringing a backend up. None of these are recoverable.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("drawing surface unsupported: {0}")]
    UnsupportedSurface(String),
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("device request failed: {0}")]
    Device(String),
    #[error("shader {label} failed to compile: {message}")]
    ShaderCompilation { label: String, message: String },
}

/// Failures while drawing one frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Skip this frame and try again on the next refresh.
    #[error("transient frame failure: {0}")]
    Transient(String),
    /// The backend is gone; no more frames can be drawn.
    #[error("fatal frame failure: {0}")]
    Fatal(String),
}

impl FrameError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Fatal(_))
    }
}

/// Renderer bound to a drawing surface.
///
/// The backend reads the scene and camera; it never mutates them.
pub trait RenderBackend {
    /// Compile the mesh's material and upload its geometry.
    fn prepare(&mut self, mesh: &Mesh) -> Result<(), BackendError>;

    fn set_pixel_ratio(&mut self, ratio: f64);

    /// Resize the backing surface to the viewport (scaled by the pixel ratio).
    fn set_size(&mut self, viewport: &ViewportState);

    /// Draw the scene from the camera.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), FrameError>;
}

/// Debug text backend: records a line per frame instead of drawing.
///
/// Useful for headless runs, logging, and testing the backend interface.
#[derive(Debug, Default)]
pub struct DebugTextRenderer {
    prepared: Vec<String>,
    pixel_ratio: f64,
    viewport: Option<ViewportState>,
    frames: Vec<String>,
}

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self {
            pixel_ratio: 1.0,
            ..Default::default()
        }
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn prepared(&self) -> &[String] {
        &self.prepared
    }

    pub fn viewport(&self) -> Option<ViewportState> {
        self.viewport
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }
}

impl RenderBackend for DebugTextRenderer {
    fn prepare(&mut self, mesh: &Mesh) -> Result<(), BackendError> {
        let g = &mesh.geometry;
        self.prepared.push(format!(
            "torus R={} r={} segments={}x{}",
            g.radius, g.tube, g.radial_segments, g.tubular_segments
        ));
        Ok(())
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn set_size(&mut self, viewport: &ViewportState) {
        self.viewport = Some(*viewport);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), FrameError> {
        let size = self
            .viewport
            .map(|vp| vp.size().scaled(self.pixel_ratio))
            .unwrap_or_default();
        let p = camera.position;
        let mut line = format!(
            "frame {} surface={}x{} aspect={:.4} eye=({:.2}, {:.2}, {:.2}) meshes={}",
            self.frames.len(),
            size.width,
            size.height,
            camera.aspect(),
            p.x,
            p.y,
            p.z,
            scene.meshes().len()
        );
        for mesh in scene.meshes() {
            let u = &mesh.material.uniforms;
            line.push_str(&format!(
                " [color={} coef={} rev={}]",
                u.color(),
                u.noise_coef(),
                u.revision()
            ));
        }
        self.frames.push(line);
        Ok(())
    }
}

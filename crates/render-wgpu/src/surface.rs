use crate::camera::CameraUniforms;
use crate::gpu::{TorusRenderer, encode_clear};
use noisetorus_common::PixelSize;
use noisetorus_scene::{
    BackendError, FrameError, Mesh, PerspectiveCamera, RenderBackend, RendererConfig, Scene,
    ViewportState,
};

const MSAA_SAMPLES: u32 = 4;

/// A surface texture acquired for one frame.
pub struct SurfaceFrame {
    texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

impl SurfaceFrame {
    pub fn present(self) {
        self.texture.present();
    }
}

/// Renderer bound to a window surface.
///
/// Owns the device and queue. The surface is sized to the container part of
/// the viewport; see [`crate::overflow_crop`].
pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    adapter_info: wgpu::AdapterInfo,
    options: RendererConfig,
    sample_count: u32,
    pixel_ratio: f64,
    viewport: ViewportState,
    torus: Option<TorusRenderer>,
}

impl WgpuBackend {
    /// Create the device and configure a surface for `target`.
    ///
    /// `size` is the initial physical surface size.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: PixelSize,
        options: RendererConfig,
    ) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(target)
            .map_err(|e| BackendError::UnsupportedSurface(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        tracing::info!("GPU adapter: {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("noisetorus_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::Device(e.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| {
                BackendError::UnsupportedSurface("surface reports no formats".into())
            })?;

        let alpha_mode = pick_alpha_mode(&caps.alpha_modes, options.alpha);

        let sample_count = if options.antialias
            && adapter
                .get_texture_format_features(format)
                .flags
                .sample_count_supported(MSAA_SAMPLES)
        {
            MSAA_SAMPLES
        } else {
            1
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!(
            "surface {}x{} format={:?} alpha={:?} msaa={}",
            config.width,
            config.height,
            format,
            alpha_mode,
            sample_count
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            adapter_info,
            options,
            sample_count,
            pixel_ratio: 1.0,
            viewport: ViewportState::default(),
            torus: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn surface_size(&self) -> PixelSize {
        PixelSize::new(self.config.width, self.config.height)
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Acquire the next surface texture.
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    pub fn begin_frame(&mut self) -> Result<SurfaceFrame, FrameError> {
        let texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                tracing::warn!("surface {err}, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Err(FrameError::Transient(err.to_string()));
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(FrameError::Fatal("out of GPU memory".into()));
            }
            Err(err) => return Err(FrameError::Transient(err.to_string())),
        };
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(SurfaceFrame { texture, view })
    }

    /// Record the scene into `encoder`, targeting `view`.
    pub fn encode_scene(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) {
        let clear = self.clear_color(scene);
        match (&mut self.torus, scene.meshes().first()) {
            (Some(torus), Some(mesh)) => {
                let camera = CameraUniforms::new(camera, &self.viewport);
                torus.upload(&self.queue, &camera, &mesh.material.uniforms);
                torus.encode(encoder, view, clear);
            }
            _ => encode_clear(encoder, view, clear),
        }
    }

    fn clear_color(&self, scene: &Scene) -> wgpu::Color {
        match scene.background {
            Some(color) => {
                let c = color.to_linear();
                wgpu::Color {
                    r: c.x as f64,
                    g: c.y as f64,
                    b: c.z as f64,
                    a: 1.0,
                }
            }
            None if self.options.alpha => wgpu::Color::TRANSPARENT,
            None => wgpu::Color::BLACK,
        }
    }
}

impl RenderBackend for WgpuBackend {
    fn prepare(&mut self, mesh: &Mesh) -> Result<(), BackendError> {
        let torus = TorusRenderer::new(
            &self.device,
            self.config.format,
            self.sample_count,
            self.surface_size(),
            mesh,
        )?;
        self.torus = Some(torus);
        Ok(())
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn set_size(&mut self, viewport: &ViewportState) {
        self.viewport = *viewport;
        let physical = surface_size_for(viewport, self.pixel_ratio);
        if physical.width == self.config.width && physical.height == self.config.height {
            return;
        }
        self.config.width = physical.width;
        self.config.height = physical.height;
        self.surface.configure(&self.device, &self.config);
        if let Some(torus) = &mut self.torus {
            torus.resize(&self.device, physical);
        }
        tracing::debug!("surface resized to {}x{}", physical.width, physical.height);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), FrameError> {
        let frame = self.begin_frame()?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        self.encode_scene(&mut encoder, &frame.view, scene, camera);
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// Physical surface size for a viewport: the container part only.
pub fn surface_size_for(viewport: &ViewportState, pixel_ratio: f64) -> PixelSize {
    PixelSize::new(viewport.width, viewport.container_height()).scaled(pixel_ratio)
}

fn pick_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    want_alpha: bool,
) -> wgpu::CompositeAlphaMode {
    let preferred: &[wgpu::CompositeAlphaMode] = if want_alpha {
        &[
            wgpu::CompositeAlphaMode::PreMultiplied,
            wgpu::CompositeAlphaMode::PostMultiplied,
            wgpu::CompositeAlphaMode::Opaque,
        ]
    } else {
        &[wgpu::CompositeAlphaMode::Opaque]
    };
    preferred
        .iter()
        .copied()
        .find(|mode| supported.contains(mode))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

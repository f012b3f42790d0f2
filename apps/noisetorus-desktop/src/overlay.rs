use egui::Context as EguiContext;
use noisetorus_common::Color;
use noisetorus_render_wgpu::WgpuBackend;
use noisetorus_scene::{
    BackendError, FrameError, Mesh, PerspectiveCamera, RenderBackend, Scene, SceneStats,
    UniformSet, ViewportState,
};

/// Paint jobs for the next frame.
struct PendingOverlay {
    paint_jobs: Vec<egui::ClippedPrimitive>,
    pixels_per_point: f32,
}

/// wgpu backend plus the egui panel drawn on top of the torus.
pub struct DesktopBackend {
    gpu: WgpuBackend,
    egui_renderer: egui_wgpu::Renderer,
    overlay: Option<PendingOverlay>,
    to_free: Vec<egui::TextureId>,
}

impl DesktopBackend {
    pub fn new(gpu: WgpuBackend) -> Self {
        let egui_renderer =
            egui_wgpu::Renderer::new(gpu.device(), gpu.surface_format(), None, 1, false);
        Self {
            gpu,
            egui_renderer,
            overlay: None,
            to_free: Vec::new(),
        }
    }

    /// Upload texture changes now and queue the paint jobs for the next frame.
    pub fn submit_overlay(
        &mut self,
        textures: egui::TexturesDelta,
        paint_jobs: Vec<egui::ClippedPrimitive>,
        pixels_per_point: f32,
    ) {
        for id in self.to_free.drain(..) {
            self.egui_renderer.free_texture(&id);
        }
        for (id, delta) in &textures.set {
            self.egui_renderer
                .update_texture(self.gpu.device(), self.gpu.queue(), *id, delta);
        }
        self.to_free = textures.free;
        self.overlay = Some(PendingOverlay {
            paint_jobs,
            pixels_per_point,
        });
    }

    fn paint_overlay(
        &mut self,
        overlay: PendingOverlay,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        let size = self.gpu.surface_size();
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: overlay.pixels_per_point,
        };
        self.egui_renderer.update_buffers(
            self.gpu.device(),
            self.gpu.queue(),
            encoder,
            &overlay.paint_jobs,
            &screen,
        );
        let mut pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            })
            .forget_lifetime();
        self.egui_renderer
            .render(&mut pass, &overlay.paint_jobs, &screen);
    }
}

impl RenderBackend for DesktopBackend {
    fn prepare(&mut self, mesh: &Mesh) -> Result<(), BackendError> {
        self.gpu.prepare(mesh)
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.gpu.set_pixel_ratio(ratio);
    }

    fn set_size(&mut self, viewport: &ViewportState) {
        self.gpu.set_size(viewport);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), FrameError> {
        let frame = self.gpu.begin_frame()?;
        let mut encoder =
            self.gpu
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame_encoder"),
                });
        self.gpu
            .encode_scene(&mut encoder, &frame.view, scene, camera);
        if let Some(overlay) = self.overlay.take() {
            self.paint_overlay(overlay, &mut encoder, &frame.view);
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

/// What the panel asked for beyond uniform edits.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PanelRequests {
    pub reset_view: bool,
    pub auto_rotate: Option<bool>,
}

/// Material tweak panel (F1).
pub fn draw_panel(
    ctx: &EguiContext,
    uniforms: &mut UniformSet,
    stats: &SceneStats,
    auto_rotate: bool,
    adapter: &str,
) -> PanelRequests {
    let mut requests = PanelRequests::default();
    egui::SidePanel::left("material")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.heading("Noise torus");
            ui.label(adapter);
            ui.separator();

            ui.label(format!(
                "Viewport: {}x{}  aspect {:.3}",
                stats.viewport.width, stats.viewport.height, stats.aspect
            ));
            ui.label(format!(
                "Frames: {}  dropped: {}",
                stats.frames_rendered, stats.frames_dropped
            ));
            ui.label(format!("Uniform revision: {}", stats.uniforms_revision));
            ui.separator();

            ui.heading("Material");
            color_row(ui, "uColor", uniforms.color(), |c| uniforms.set_color(c));
            color_row(ui, "uLightColor", uniforms.light_color(), |c| {
                uniforms.set_light_color(c)
            });

            let mut pos = uniforms.light_pos().to_array();
            ui.label("uLightPos");
            let moved = ui
                .horizontal(|ui| {
                    let mut changed = false;
                    for (axis, prefix) in pos.iter_mut().zip(["X: ", "Y: ", "Z: "]) {
                        changed |= ui
                            .add(egui::DragValue::new(axis).prefix(prefix).speed(0.1))
                            .changed();
                    }
                    changed
                })
                .inner;
            if moved {
                uniforms.set_light_pos(pos.into());
            }

            slider(ui, "uLightIntensity", uniforms.light_intensity(), 0.0..=3.0, |v| {
                uniforms.set_light_intensity(v)
            });
            slider(ui, "uNoiseCoef", uniforms.noise_coef(), 0.0..=20.0, |v| {
                uniforms.set_noise_coef(v)
            });
            slider(ui, "uNoiseMin", uniforms.noise_min(), 0.0..=10.0, |v| {
                uniforms.set_noise_min(v)
            });
            slider(ui, "uNoiseMax", uniforms.noise_max(), 0.0..=300.0, |v| {
                uniforms.set_noise_max(v)
            });
            slider(ui, "uNoiseScale", uniforms.noise_scale(), 0.0..=4.0, |v| {
                uniforms.set_noise_scale(v)
            });
            ui.label(format!(
                "Displacement: {:.3}",
                uniforms.displacement_amplitude()
            ));
            if ui.button("Restore defaults").clicked() {
                uniforms.restore_defaults();
            }

            ui.separator();
            ui.heading("View");
            let mut rotate = auto_rotate;
            if ui.checkbox(&mut rotate, "Auto-rotate (Space)").changed() {
                requests.auto_rotate = Some(rotate);
            }
            if ui.button("Reset view (R)").clicked() {
                requests.reset_view = true;
            }

            ui.separator();
            ui.small("F1: Panel | LMB drag: Orbit | Wheel: Zoom | Esc: Quit");
        });
    requests
}

fn color_row(ui: &mut egui::Ui, label: &str, color: Color, apply: impl FnOnce(Color)) {
    let mut rgb = color.to_array();
    ui.horizontal(|ui| {
        ui.label(label);
        if ui.color_edit_button_rgb(&mut rgb).changed() {
            apply(Color::from_array(rgb));
        }
    });
}

fn slider(
    ui: &mut egui::Ui,
    label: &str,
    value: f32,
    range: std::ops::RangeInclusive<f32>,
    apply: impl FnOnce(f32),
) {
    let mut v = value;
    if ui
        .add(egui::Slider::new(&mut v, range).text(label))
        .changed()
    {
        apply(v);
    }
}

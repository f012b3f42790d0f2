mod host;
mod overlay;

use anyhow::{Context as _, Result};
use clap::Parser;
use egui::Context as EguiContext;
use glam::Vec2;
use noisetorus_common::PixelSize;
use noisetorus_input::{Action, Key, PointerButton, PointerTracker, map_key};
use noisetorus_render_wgpu::WgpuBackend;
use noisetorus_scene::{FrameOutcome, SceneConfig, SceneController};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::host::{WindowHost, WindowScheduler};
use crate::overlay::{DesktopBackend, PanelRequests, draw_panel};

type DesktopController = SceneController<DesktopBackend, WindowHost, WindowScheduler>;

/// Wheel pixels per zoom step for touchpads that report pixel deltas.
const PIXELS_PER_ZOOM_STEP: f64 = 50.0;

#[derive(Parser)]
#[command(name = "noisetorus-desktop", about = "Noise-displaced torus viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Start with the camera auto-rotating
    #[arg(long)]
    auto_rotate: bool,

    /// Disable multisampling
    #[arg(long)]
    no_msaa: bool,
}

impl Cli {
    fn scene_config(&self) -> Result<SceneConfig> {
        let mut config = match &self.config {
            Some(path) => SceneConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => SceneConfig::default(),
        };
        if self.auto_rotate {
            config.controls.auto_rotate = true;
        }
        if self.no_msaa {
            config.renderer.antialias = false;
        }
        Ok(config)
    }
}

struct GpuApp {
    config: SceneConfig,
    initial_size: LogicalSize<u32>,
    window: Option<Arc<Window>>,
    scheduler: Option<WindowScheduler>,
    controller: Option<DesktopController>,
    adapter_label: String,
    egui_ctx: EguiContext,
    egui_winit: Option<egui_winit::State>,
    pointer: PointerTracker,
    show_panel: bool,
    failure: Option<anyhow::Error>,
}

impl GpuApp {
    fn new(config: SceneConfig, initial_size: LogicalSize<u32>) -> Self {
        Self {
            config,
            initial_size,
            window: None,
            scheduler: None,
            controller: None,
            adapter_label: String::new(),
            egui_ctx: EguiContext::default(),
            egui_winit: None,
            pointer: PointerTracker::new(),
            show_panel: false,
            failure: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title("Noise Torus")
            .with_transparent(self.config.renderer.alpha)
            .with_inner_size(self.initial_size);
        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        let gpu = pollster::block_on(WgpuBackend::new(
            window.clone(),
            PixelSize::new(size.width, size.height),
            self.config.renderer,
        ))?;
        let info = gpu.adapter_info();
        self.adapter_label = format!("{} ({})", info.name, info.backend.to_str());

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let scheduler = WindowScheduler::new(window.clone());
        let controller = SceneController::attach(
            DesktopBackend::new(gpu),
            WindowHost::new(window.clone()),
            scheduler.clone(),
            &self.config,
        )?;

        self.window = Some(window);
        self.scheduler = Some(scheduler);
        self.controller = Some(controller);
        self.egui_winit = Some(egui_winit);
        Ok(())
    }

    fn apply(&mut self, action: Action, event_loop: &ActiveEventLoop) {
        if action == Action::Quit {
            self.teardown();
            event_loop.exit();
            return;
        }
        if action == Action::TogglePanel {
            self.show_panel = !self.show_panel;
            return;
        }
        let Some(controller) = &mut self.controller else {
            return;
        };
        match action {
            Action::Orbit(delta) => controller.orbit(delta.x, delta.y),
            Action::Zoom(steps) => controller.zoom(steps),
            Action::ResetView => controller.reset_view(),
            Action::ToggleAutoRotate => {
                let enabled = !controller.auto_rotate();
                controller.set_auto_rotate(enabled);
                tracing::info!("auto-rotate {}", if enabled { "on" } else { "off" });
            }
            Action::TogglePanel | Action::Quit | Action::Noop => {}
        }
    }

    /// Run the panel for this frame and hand its paint jobs to the backend.
    fn build_overlay(&mut self) {
        let (Some(window), Some(egui_winit), Some(controller)) =
            (&self.window, &mut self.egui_winit, &mut self.controller)
        else {
            return;
        };
        let raw_input = egui_winit.take_egui_input(window);
        let stats = controller.stats();
        let auto_rotate = controller.auto_rotate();
        let mut requests = PanelRequests::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            requests = draw_panel(
                ctx,
                controller.uniforms_mut(),
                &stats,
                auto_rotate,
                &self.adapter_label,
            );
        });
        egui_winit.handle_platform_output(window, full_output.platform_output);

        if let Some(enabled) = requests.auto_rotate {
            controller.set_auto_rotate(enabled);
        }
        if requests.reset_view {
            controller.reset_view();
        }

        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        controller.backend_mut().submit_overlay(
            full_output.textures_delta,
            paint_jobs,
            full_output.pixels_per_point,
        );
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(handle) = self.scheduler.as_ref().and_then(WindowScheduler::take_pending) else {
            return;
        };
        if self.show_panel {
            self.build_overlay();
        }
        let Some(controller) = &mut self.controller else {
            return;
        };
        if controller.on_refresh(handle) == FrameOutcome::Halted {
            self.failure = Some(anyhow::anyhow!("render backend failed, see log"));
            self.teardown();
            event_loop.exit();
        }
    }

    fn teardown(&mut self) {
        if let Some(mut controller) = self.controller.take() {
            controller.stop();
            let stats = controller.stats();
            tracing::info!(
                frames = stats.frames_rendered,
                dropped = stats.frames_dropped,
                listeners = controller.host().listener_count(),
                "scene detached"
            );
            drop(controller);
        }
    }
}

impl ApplicationHandler for GpuApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init(event_loop) {
            tracing::error!("failed to start: {err:#}");
            self.failure = Some(err);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.show_panel {
            if let (Some(window), Some(egui_winit)) = (&self.window, &mut self.egui_winit) {
                if egui_winit.on_window_event(window, &event).consumed {
                    return;
                }
            }
        }

        match event {
            WindowEvent::CloseRequested => {
                self.teardown();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(controller) = &mut self.controller {
                    controller.on_host_resized();
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                self.apply(map_key(key_from_code(code)), event_loop);
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button) = pointer_button(button) {
                    self.pointer
                        .button(button, state == ElementState::Pressed);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale = self.window.as_ref().map_or(1.0, |w| w.scale_factor());
                let logical = position.to_logical::<f32>(scale);
                let action = self.pointer.moved(Vec2::new(logical.x, logical.y));
                self.apply(action, event_loop);
            }
            WindowEvent::CursorLeft { .. } => self.pointer.left(),
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => (p.y / PIXELS_PER_ZOOM_STEP) as f32,
                };
                self.apply(Action::Zoom(steps), event_loop);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

fn key_from_code(code: KeyCode) -> Key {
    match code {
        KeyCode::KeyR => Key::R,
        KeyCode::Space => Key::Space,
        KeyCode::F1 => Key::F1,
        KeyCode::Escape => Key::Escape,
        KeyCode::Equal | KeyCode::NumpadAdd => Key::Plus,
        KeyCode::Minus | KeyCode::NumpadSubtract => Key::Minus,
        _ => Key::Other,
    }
}

fn pointer_button(button: MouseButton) -> Option<PointerButton> {
    match button {
        MouseButton::Left => Some(PointerButton::Primary),
        MouseButton::Right => Some(PointerButton::Secondary),
        MouseButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    tracing::info!("noisetorus-desktop starting");

    let config = cli.scene_config()?;
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = GpuApp::new(config, LogicalSize::new(cli.width.max(1), cli.height.max(1)));
    event_loop.run_app(&mut app)?;

    match app.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

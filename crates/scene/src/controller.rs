use crate::backend::{BackendError, RenderBackend};
use crate::camera::PerspectiveCamera;
use crate::config::SceneConfig;
use crate::controls::OrbitControls;
use crate::graph::{Mesh, Scene};
use crate::host::{HostEnvironment, ListenerId};
use crate::render_loop::{FrameHandle, FrameOutcome, LoopError, LoopState, RefreshScheduler, RenderLoop};
use crate::uniforms::UniformSet;
use crate::viewport::ViewportState;

/// Aspect used between camera creation and the first resize.
const PLACEHOLDER_ASPECT: f32 = 1.0;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Loop(#[from] LoopError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeOutcome {
    Applied(ViewportState),
    /// The container had no width; nothing was touched.
    Skipped,
    /// The resize listener is not registered.
    Ignored,
}

/// Snapshot of controller state for panels and logs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStats {
    pub viewport: ViewportState,
    pub aspect: f32,
    pub loop_state: LoopState,
    pub frames_rendered: u64,
    pub frames_dropped: u64,
    pub uniforms_revision: u64,
}

/// Owns the scene, camera, controls, renderer and render loop, and wires
/// them to the host environment.
///
/// Dropping the controller stops the loop and deregisters the resize
/// listener.
pub struct SceneController<B: RenderBackend, H: HostEnvironment, S: RefreshScheduler> {
    scene: Scene,
    camera: PerspectiveCamera,
    controls: OrbitControls,
    backend: B,
    host: H,
    scheduler: S,
    viewport: ViewportState,
    render_loop: RenderLoop,
    resize_listener: Option<ListenerId>,
}

impl<B: RenderBackend, H: HostEnvironment, S: RefreshScheduler> SceneController<B, H, S> {
    /// Build the scene on an already surface-bound backend and start drawing.
    ///
    /// Backend failures (shader compilation included) propagate; nothing is
    /// registered with the host when attach fails.
    pub fn attach(backend: B, host: H, scheduler: S, config: &SceneConfig) -> Result<Self, SceneError> {
        let mut scene = Scene::new();
        scene.background = None;

        let camera = PerspectiveCamera::new(&config.camera, PLACEHOLDER_ASPECT);
        let controls = OrbitControls::new(&camera, config.controls);

        let mut controller = Self {
            scene,
            camera,
            controls,
            backend,
            host,
            scheduler,
            viewport: ViewportState::default(),
            render_loop: RenderLoop::new(),
            resize_listener: None,
        };

        let mesh = Mesh::noise_torus(config.uniforms.clone());
        controller.backend.prepare(&mesh)?;
        controller.scene.add(mesh);
        tracing::debug!("noise torus added to scene");

        controller.handle_resize();
        controller.resize_listener = Some(controller.host.add_resize_listener());
        controller.render_loop.start(&mut controller.scheduler)?;

        tracing::info!(
            width = controller.viewport.width,
            height = controller.viewport.height,
            "scene attached"
        );
        Ok(controller)
    }

    /// Re-read the container and push the new size into camera and backend.
    pub fn handle_resize(&mut self) -> ResizeOutcome {
        let container = self.host.container_size();
        let Some(viewport) = ViewportState::from_container(container) else {
            tracing::warn!(
                width = container.offset_width,
                height = container.offset_height,
                "skipping resize for degenerate container"
            );
            return ResizeOutcome::Skipped;
        };

        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());

        let ratio = self.host.device_pixel_ratio();
        let ratio = if ratio.is_finite() && ratio > 0.0 { ratio } else { 1.0 };
        self.backend.set_pixel_ratio(ratio);
        self.backend.set_size(&viewport);

        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            aspect = viewport.aspect(),
            pixel_ratio = ratio,
            "viewport resized"
        );
        ResizeOutcome::Applied(viewport)
    }

    /// Resize callback from the host; only acts while the listener is registered.
    pub fn on_host_resized(&mut self) -> ResizeOutcome {
        if self.resize_listener.is_none() {
            return ResizeOutcome::Ignored;
        }
        self.handle_resize()
    }

    /// Display refresh callback for `handle`.
    pub fn on_refresh(&mut self, handle: FrameHandle) -> FrameOutcome {
        if self.render_loop.state() == LoopState::Scheduled(handle) {
            self.controls.update(&mut self.camera);
        }
        let Self {
            render_loop,
            scheduler,
            backend,
            scene,
            camera,
            ..
        } = self;
        render_loop.tick(handle, scheduler, || backend.render(scene, camera))
    }

    /// Pointer drag in logical pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.controls.rotate(dx, dy, self.viewport.height);
    }

    pub fn zoom(&mut self, steps: f32) {
        self.controls.zoom(steps);
    }

    pub fn reset_view(&mut self) {
        self.controls.reset(&mut self.camera);
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.controls.config.auto_rotate = enabled;
    }

    pub fn auto_rotate(&self) -> bool {
        self.controls.config.auto_rotate
    }

    /// Uniforms of the torus material. Changes reach the GPU on the next frame.
    pub fn uniforms(&self) -> &UniformSet {
        &self.scene.meshes()[0].material.uniforms
    }

    pub fn uniforms_mut(&mut self) -> &mut UniformSet {
        &mut self.scene.meshes_mut()[0].material.uniforms
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn loop_state(&self) -> LoopState {
        self.render_loop.state()
    }

    pub fn stats(&self) -> SceneStats {
        SceneStats {
            viewport: self.viewport,
            aspect: self.camera.aspect(),
            loop_state: self.render_loop.state(),
            frames_rendered: self.render_loop.frames_rendered(),
            frames_dropped: self.render_loop.frames_dropped(),
            uniforms_revision: self.uniforms().revision(),
        }
    }

    /// Stop drawing and release host registrations. Safe to call twice.
    pub fn stop(&mut self) {
        self.render_loop.stop(&mut self.scheduler);
        if let Some(id) = self.resize_listener.take() {
            self.host.remove_resize_listener(id);
            tracing::debug!("resize listener removed");
        }
    }

    /// Tear down and hand the backend back.
    pub fn detach(mut self) -> B
    where
        B: Default,
    {
        self.stop();
        std::mem::take(&mut self.backend)
    }
}

impl<B: RenderBackend, H: HostEnvironment, S: RefreshScheduler> Drop for SceneController<B, H, S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DebugTextRenderer, FrameError};
    use crate::geometry::TorusGeometry;
    use crate::host::{ContainerSize, StaticHost};
    use crate::render_loop::ManualRefreshDriver;
    use noisetorus_common::Color;

    type TestController = SceneController<DebugTextRenderer, StaticHost, ManualRefreshDriver>;

    fn attach(width: u32, height: u32) -> (TestController, StaticHost, ManualRefreshDriver) {
        let host = StaticHost::new(ContainerSize::new(width, height), 1.0);
        let driver = ManualRefreshDriver::new();
        let controller = SceneController::attach(
            DebugTextRenderer::new(),
            host.clone(),
            driver.clone(),
            &SceneConfig::default(),
        )
        .unwrap();
        (controller, host, driver)
    }

    fn pump<B: RenderBackend>(
        controller: &mut SceneController<B, StaticHost, ManualRefreshDriver>,
        driver: &ManualRefreshDriver,
    ) -> Vec<FrameOutcome> {
        driver
            .fire()
            .into_iter()
            .map(|handle| controller.on_refresh(handle))
            .collect()
    }

    #[test]
    fn attach_resizes_registers_and_schedules() {
        let (controller, host, driver) = attach(800, 600);
        assert_eq!(controller.viewport(), ViewportState { width: 800, height: 700 });
        assert_eq!(controller.camera().aspect(), 800.0 / 700.0);
        assert_eq!(host.listener_count(), 1);
        assert_eq!(driver.pending(), 1);
        assert!(matches!(controller.loop_state(), LoopState::Scheduled(_)));
        assert_eq!(controller.backend().prepared().len(), 1);
        assert_eq!(controller.scene().meshes().len(), 1);
    }

    #[test]
    fn aspect_tracks_container_exactly() {
        for (w, h) in [(1, 1), (320, 240), (1920, 1080), (3840, 0), (7, 13)] {
            let (controller, _, _) = attach(w, h);
            assert_eq!(controller.camera().aspect(), w as f32 / (h + 100) as f32);
        }
    }

    #[test]
    fn one_render_per_refresh_tick() {
        let (mut controller, _, driver) = attach(640, 480);
        for tick in 1..=10 {
            assert_eq!(pump(&mut controller, &driver), vec![FrameOutcome::Rendered]);
            assert_eq!(controller.backend().frames().len(), tick);
        }
        let frames = controller.backend().frames();
        for (i, frame) in frames.iter().enumerate() {
            assert!(frame.starts_with(&format!("frame {i} ")));
        }
    }

    #[test]
    fn last_resize_wins() {
        let (mut controller, host, _) = attach(640, 480);
        host.set_container(ContainerSize::new(1000, 500));
        controller.on_host_resized();
        host.set_container(ContainerSize::new(300, 900));
        controller.on_host_resized();
        assert_eq!(controller.camera().aspect(), 300.0 / 1000.0);
        assert_eq!(controller.backend().viewport(), Some(controller.viewport()));
    }

    #[test]
    fn repeated_resize_is_idempotent() {
        let (mut controller, host, _) = attach(640, 480);
        host.set_container(ContainerSize::new(1280, 720));
        let first = controller.handle_resize();
        let aspect = controller.camera().aspect();
        let projection = controller.camera().projection_matrix();
        let second = controller.handle_resize();
        assert_eq!(first, second);
        assert_eq!(controller.camera().aspect(), aspect);
        assert_eq!(controller.camera().projection_matrix(), projection);
    }

    #[test]
    fn degenerate_container_keeps_previous_state() {
        let (mut controller, host, _) = attach(640, 480);
        let before = controller.viewport();
        host.set_container(ContainerSize::new(0, 480));
        assert_eq!(controller.handle_resize(), ResizeOutcome::Skipped);
        assert_eq!(controller.viewport(), before);
        assert_eq!(controller.camera().aspect(), before.aspect());
    }

    #[test]
    fn pixel_ratio_reaches_backend() {
        let (mut controller, host, _) = attach(640, 480);
        host.set_pixel_ratio(2.0);
        controller.handle_resize();
        assert_eq!(controller.backend().pixel_ratio(), 2.0);
        host.set_pixel_ratio(f64::NAN);
        controller.handle_resize();
        assert_eq!(controller.backend().pixel_ratio(), 1.0);
    }

    #[test]
    fn geometry_is_unchanged_by_resizes() {
        let (mut controller, host, _) = attach(640, 480);
        for w in [10, 2000, 333] {
            host.set_container(ContainerSize::new(w, w / 2));
            controller.handle_resize();
        }
        assert_eq!(controller.scene().meshes()[0].geometry, TorusGeometry::SCENE);
    }

    #[test]
    fn uniform_edits_show_up_in_next_frame() {
        let (mut controller, _, driver) = attach(640, 480);
        assert_eq!(*controller.uniforms(), UniformSet::default());
        controller.uniforms_mut().set_color(Color::from_hex(0xff0000));
        pump(&mut controller, &driver);
        let frame = controller.backend().frames().last().unwrap().clone();
        assert!(frame.contains("color=#ff0000"));
        assert_eq!(controller.stats().uniforms_revision, 1);
    }

    #[test]
    fn orbit_input_moves_camera_on_next_frame() {
        let (mut controller, _, driver) = attach(640, 480);
        let start = controller.camera().position;
        controller.orbit(50.0, 0.0);
        assert_eq!(controller.camera().position, start);
        pump(&mut controller, &driver);
        assert_ne!(controller.camera().position, start);
        controller.reset_view();
        assert_eq!(controller.camera().position, start);
    }

    #[test]
    fn drop_revokes_frame_and_removes_listener() {
        let (controller, host, driver) = attach(640, 480);
        drop(controller);
        assert_eq!(driver.pending(), 0);
        assert_eq!(driver.revoked_count(), 1);
        assert_eq!(host.listener_count(), 0);
        assert_eq!(host.removed_count(), 1);
    }

    #[test]
    fn stopped_controller_ignores_refresh_and_resize() {
        let (mut controller, host, driver) = attach(640, 480);
        let handle = driver.fire()[0];
        controller.stop();
        assert_eq!(controller.on_refresh(handle), FrameOutcome::Ignored);
        host.set_container(ContainerSize::new(100, 100));
        assert_eq!(controller.on_host_resized(), ResizeOutcome::Ignored);
        assert!(controller.backend().frames().is_empty());
        controller.stop();
        assert_eq!(host.removed_count(), 1);
    }

    #[test]
    fn detach_returns_backend_after_teardown() {
        let (mut controller, host, driver) = attach(640, 480);
        pump(&mut controller, &driver);
        let backend = controller.detach();
        assert_eq!(backend.frames().len(), 1);
        assert_eq!(host.listener_count(), 0);
        assert_eq!(driver.pending(), 0);
    }

    #[derive(Default)]
    struct BrokenShaderBackend;

    impl RenderBackend for BrokenShaderBackend {
        fn prepare(&mut self, _mesh: &Mesh) -> Result<(), BackendError> {
            Err(BackendError::ShaderCompilation {
                label: "noise".into(),
                message: "unknown identifier".into(),
            })
        }
        fn set_pixel_ratio(&mut self, _ratio: f64) {}
        fn set_size(&mut self, _viewport: &ViewportState) {}
        fn render(&mut self, _: &Scene, _: &PerspectiveCamera) -> Result<(), FrameError> {
            Ok(())
        }
    }

    #[test]
    fn shader_failure_aborts_attach_cleanly() {
        let host = StaticHost::new(ContainerSize::new(640, 480), 1.0);
        let driver = ManualRefreshDriver::new();
        let result = SceneController::attach(
            BrokenShaderBackend,
            host.clone(),
            driver.clone(),
            &SceneConfig::default(),
        );
        assert!(matches!(
            result,
            Err(SceneError::Backend(BackendError::ShaderCompilation { .. }))
        ));
        assert_eq!(host.listener_count(), 0);
        assert_eq!(driver.scheduled_count(), 0);
    }

    struct LostDeviceBackend;

    impl RenderBackend for LostDeviceBackend {
        fn prepare(&mut self, _mesh: &Mesh) -> Result<(), BackendError> {
            Ok(())
        }
        fn set_pixel_ratio(&mut self, _ratio: f64) {}
        fn set_size(&mut self, _viewport: &ViewportState) {}
        fn render(&mut self, _: &Scene, _: &PerspectiveCamera) -> Result<(), FrameError> {
            Err(FrameError::Fatal("device lost".into()))
        }
    }

    #[test]
    fn lost_backend_stops_the_cycle() {
        let host = StaticHost::new(ContainerSize::new(640, 480), 1.0);
        let driver = ManualRefreshDriver::new();
        let mut controller = SceneController::attach(
            LostDeviceBackend,
            host.clone(),
            driver.clone(),
            &SceneConfig::default(),
        )
        .unwrap();
        assert_eq!(pump(&mut controller, &driver), vec![FrameOutcome::Halted]);
        assert_eq!(controller.loop_state(), LoopState::Cancelled);
        assert_eq!(driver.pending(), 0);
        assert!(pump(&mut controller, &driver).is_empty());
    }
}

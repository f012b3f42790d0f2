use noisetorus_scene::{
    ContainerSize, FrameHandle, HostEnvironment, ListenerId, ListenerRegistry, RefreshScheduler,
};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use winit::dpi::LogicalSize;
use winit::window::Window;

/// The window's client area is the container.
pub struct WindowHost {
    window: Arc<Window>,
    listeners: ListenerRegistry,
}

impl WindowHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Resize listeners still registered; zero after a clean teardown.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl HostEnvironment for WindowHost {
    fn container_size(&self) -> ContainerSize {
        let logical: LogicalSize<f64> = self
            .window
            .inner_size()
            .to_logical(self.window.scale_factor());
        ContainerSize::new(logical.width.round() as u32, logical.height.round() as u32)
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.window.scale_factor()
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        self.listeners.add()
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        if !self.listeners.remove(id) {
            tracing::debug!(id = id.0, "resize listener was not registered");
        }
    }
}

/// Refresh source backed by `Window::request_redraw`.
///
/// At most one frame is pending. The event loop takes it with
/// [`WindowScheduler::take_pending`] when `RedrawRequested` arrives; a
/// revoked frame leaves nothing to take, so the redraw is ignored.
#[derive(Clone)]
pub struct WindowScheduler {
    window: Arc<Window>,
    pending: Rc<Cell<Option<FrameHandle>>>,
    next: Rc<Cell<u64>>,
}

impl WindowScheduler {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            pending: Rc::new(Cell::new(None)),
            next: Rc::new(Cell::new(0)),
        }
    }

    pub fn take_pending(&self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl RefreshScheduler for WindowScheduler {
    fn schedule(&mut self) -> FrameHandle {
        let handle = FrameHandle(self.next.get() + 1);
        self.next.set(handle.0);
        self.pending.set(Some(handle));
        self.window.request_redraw();
        handle
    }

    fn revoke(&mut self, handle: FrameHandle) {
        if self.pending.get() == Some(handle) {
            self.pending.set(None);
        }
    }
}

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

/// Layout box of the element that hosts the drawing surface, in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContainerSize {
    pub offset_width: u32,
    pub offset_height: u32,
}

impl ContainerSize {
    pub const fn new(offset_width: u32, offset_height: u32) -> Self {
        Self {
            offset_width,
            offset_height,
        }
    }
}

/// Registration token for a resize listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub u64);

/// Live resize listener ids, handed out in increasing order.
#[derive(Debug, Clone, Default)]
pub struct ListenerRegistry {
    live: BTreeSet<ListenerId>,
    next: u64,
    removed: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self) -> ListenerId {
        let id = ListenerId(self.next);
        self.next += 1;
        self.live.insert(id);
        id
    }

    /// Returns whether `id` was registered.
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let removed = self.live.remove(&id);
        if removed {
            self.removed += 1;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Total number of listeners ever removed.
    pub fn removed(&self) -> u64 {
        self.removed
    }
}

/// Everything the scene reads from its surroundings.
///
/// The window (or a test double) supplies layout and pixel density, and keeps
/// track of who is listening for resizes so teardown can be verified.
pub trait HostEnvironment {
    /// Current container layout box.
    fn container_size(&self) -> ContainerSize;

    /// Physical pixels per logical pixel.
    fn device_pixel_ratio(&self) -> f64;

    fn add_resize_listener(&mut self) -> ListenerId;

    fn remove_resize_listener(&mut self, id: ListenerId);
}

#[derive(Debug)]
struct StaticHostState {
    container: ContainerSize,
    pixel_ratio: f64,
    listeners: ListenerRegistry,
}

/// A host with a container size set by hand.
///
/// Clones share state, so a test (or the headless CLI) can keep one handle,
/// give the other to a controller, and still change the layout or inspect the
/// listener registry afterwards.
#[derive(Debug, Clone)]
pub struct StaticHost {
    inner: Rc<RefCell<StaticHostState>>,
}

impl StaticHost {
    pub fn new(container: ContainerSize, pixel_ratio: f64) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StaticHostState {
                container,
                pixel_ratio,
                listeners: ListenerRegistry::new(),
            })),
        }
    }

    pub fn set_container(&self, container: ContainerSize) {
        self.inner.borrow_mut().container = container;
    }

    pub fn set_pixel_ratio(&self, pixel_ratio: f64) {
        self.inner.borrow_mut().pixel_ratio = pixel_ratio;
    }

    /// Number of currently registered resize listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Total number of listeners ever removed.
    pub fn removed_count(&self) -> u64 {
        self.inner.borrow().listeners.removed()
    }
}

impl HostEnvironment for StaticHost {
    fn container_size(&self) -> ContainerSize {
        self.inner.borrow().container
    }

    fn device_pixel_ratio(&self) -> f64 {
        self.inner.borrow().pixel_ratio
    }

    fn add_resize_listener(&mut self) -> ListenerId {
        self.inner.borrow_mut().listeners.add()
    }

    fn remove_resize_listener(&mut self, id: ListenerId) {
        self.inner.borrow_mut().listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_listener_registry() {
        let observer = StaticHost::new(ContainerSize::new(10, 10), 1.0);
        let mut host = observer.clone();
        let id = host.add_resize_listener();
        assert_eq!(observer.listener_count(), 1);
        host.remove_resize_listener(id);
        host.remove_resize_listener(id);
        assert_eq!(observer.listener_count(), 0);
        assert_eq!(observer.removed_count(), 1);
    }

    #[test]
    fn registry_hands_out_fresh_ids_and_counts_removals() {
        let mut registry = ListenerRegistry::new();
        let first = registry.add();
        let second = registry.add();
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(first));
        assert!(!registry.remove(first));
        assert!(!registry.remove(ListenerId(99)));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.removed(), 1);
        let third = registry.add();
        assert_ne!(third, first);
        assert!(registry.remove(second) && registry.remove(third));
        assert!(registry.is_empty());
    }

    #[test]
    fn container_updates_are_visible() {
        let observer = StaticHost::new(ContainerSize::new(10, 10), 1.0);
        let host = observer.clone();
        observer.set_container(ContainerSize::new(640, 480));
        assert_eq!(host.container_size(), ContainerSize::new(640, 480));
    }
}

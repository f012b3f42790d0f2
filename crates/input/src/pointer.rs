use glam::Vec2;

use crate::action::Action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Turns pointer positions into orbit deltas while the primary button is held.
#[derive(Debug, Default)]
pub struct PointerTracker {
    dragging: bool,
    last: Option<Vec2>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn button(&mut self, button: PointerButton, pressed: bool) {
        if button != PointerButton::Primary {
            return;
        }
        self.dragging = pressed;
        tracing::trace!(dragging = pressed, "orbit drag");
    }

    /// Record a pointer position (logical pixels) and return the orbit action, if any.
    pub fn moved(&mut self, position: Vec2) -> Action {
        let previous = self.last.replace(position);
        match previous {
            Some(prev) if self.dragging => {
                let delta = position - prev;
                if delta == Vec2::ZERO {
                    Action::Noop
                } else {
                    Action::Orbit(delta)
                }
            }
            _ => Action::Noop,
        }
    }

    /// Pointer left the surface: forget the last position so re-entry does not jump.
    pub fn left(&mut self) {
        self.last = None;
        self.dragging = false;
    }
}

use noisetorus_common::PixelSize;

use crate::host::ContainerSize;

/// Extra pixels added below the container height. The drawing surface is
/// taller than its container and overflows it at the bottom.
pub const HEIGHT_OVERFLOW: u32 = 100;

/// Logical drawing size derived from the host container's layout box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
}

impl ViewportState {
    /// Derive the viewport from a container layout box.
    ///
    /// Returns `None` when the container has no width: the aspect ratio
    /// would be zero and the projection degenerate.
    pub fn from_container(container: ContainerSize) -> Option<Self> {
        if container.offset_width == 0 {
            return None;
        }
        Some(Self {
            width: container.offset_width,
            height: container.offset_height.saturating_add(HEIGHT_OVERFLOW),
        })
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Height of the container that clips this viewport.
    pub fn container_height(&self) -> u32 {
        self.height.saturating_sub(HEIGHT_OVERFLOW)
    }

    pub fn size(&self) -> PixelSize {
        PixelSize::new(self.width, self.height)
    }
}

impl Default for ViewportState {
    /// Placeholder used before the first resize, aspect 1.0.
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }
}

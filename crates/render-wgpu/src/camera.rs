use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};
use noisetorus_scene::{PerspectiveCamera, ViewportState};

/// Camera block as laid out in the `Camera` WGSL struct.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
}

impl CameraUniforms {
    /// Camera matrices for a surface that only shows the container part of the viewport.
    pub fn new(camera: &PerspectiveCamera, viewport: &ViewportState) -> Self {
        let view_proj = overflow_crop(viewport) * camera.view_projection();
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            eye: camera.position.extend(1.0).to_array(),
        }
    }
}

/// Clip-space transform that maps the top `container_height` rows of the
/// viewport onto the whole surface.
///
/// The projection is built for the full viewport height (container plus
/// overflow). The surface is only as tall as the container, so the overflow
/// strip at the bottom falls outside clip space, the same picture a taller
/// canvas clipped by its container would show.
pub fn overflow_crop(viewport: &ViewportState) -> Mat4 {
    let visible = viewport.container_height();
    if visible == 0 || visible >= viewport.height {
        return Mat4::IDENTITY;
    }
    let scale = viewport.height as f32 / visible as f32;
    // NDC y of the container's bottom edge within the full viewport.
    let bottom = 1.0 - 2.0 / scale;
    Mat4::from_cols(
        Vec4::X,
        Vec4::new(0.0, scale, 0.0, 0.0),
        Vec4::Z,
        Vec4::new(0.0, -(bottom * scale) - 1.0, 0.0, 1.0),
    )
}

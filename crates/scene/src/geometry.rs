use std::f32::consts::TAU;

/// Ring-shaped surface parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TorusGeometry {
    /// Distance from the torus center to the tube center.
    pub radius: f32,
    pub tube: f32,
    pub radial_segments: u32,
    pub tubular_segments: u32,
}

impl TorusGeometry {
    /// The ring rendered by the scene.
    pub const SCENE: TorusGeometry = TorusGeometry {
        radius: 10.0,
        tube: 3.0,
        radial_segments: 16,
        tubular_segments: 100,
    };

    pub const MIN_RADIAL_SEGMENTS: u32 = 2;
    pub const MIN_TUBULAR_SEGMENTS: u32 = 3;
    /// Upper bound for either segment count; keeps every index inside `u32`.
    pub const MAX_SEGMENTS: u32 = 4096;

    /// Segment counts actually used by [`Self::build`].
    pub fn segments(&self) -> (u32, u32) {
        (
            self.radial_segments
                .clamp(Self::MIN_RADIAL_SEGMENTS, Self::MAX_SEGMENTS),
            self.tubular_segments
                .clamp(Self::MIN_TUBULAR_SEGMENTS, Self::MAX_SEGMENTS),
        )
    }

    pub fn vertex_count(&self) -> usize {
        let (radial, tubular) = self.segments();
        (radial as usize + 1) * (tubular as usize + 1)
    }

    pub fn index_count(&self) -> usize {
        let (radial, tubular) = self.segments();
        radial as usize * tubular as usize * 6
    }

    /// Build the indexed triangle mesh.
    ///
    /// Seams are duplicated (one extra ring and column) so uvs run cleanly
    /// from 0 to 1 in both directions. The ring lies in the XY plane.
    pub fn build(&self) -> MeshData {
        let (radial, tubular) = self.segments();
        let mut vertices = Vec::with_capacity(self.vertex_count());

        for j in 0..=radial {
            let v = j as f32 / radial as f32 * TAU;
            for i in 0..=tubular {
                let u = i as f32 / tubular as f32 * TAU;
                let ring = self.radius + self.tube * v.cos();
                let position = [ring * u.cos(), ring * u.sin(), self.tube * v.sin()];
                let center = [self.radius * u.cos(), self.radius * u.sin(), 0.0];
                let normal = normalize([
                    position[0] - center[0],
                    position[1] - center[1],
                    position[2] - center[2],
                ]);
                vertices.push(TorusVertex {
                    position,
                    normal,
                    uv: [i as f32 / tubular as f32, j as f32 / radial as f32],
                });
            }
        }

        let mut indices = Vec::with_capacity(self.index_count());
        let row = tubular + 1;
        for j in 1..=radial {
            for i in 1..=tubular {
                let a = row * j + i - 1;
                let b = row * (j - 1) + i - 1;
                let c = row * (j - 1) + i;
                let d = row * j + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        MeshData { vertices, indices }
    }
}

impl Default for TorusGeometry {
    fn default() -> Self {
        Self::SCENE
    }
}

/// Vertex layout shared by every backend.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TorusVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU-side mesh ready for upload.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<TorusVertex>,
    pub indices: Vec<u32>,
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if len == 0.0 {
        return [0.0, 0.0, 1.0];
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

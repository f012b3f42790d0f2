use noisetorus_common::Color;

use crate::geometry::TorusGeometry;
use crate::uniforms::UniformSet;

/// Shader-driven surface: the noise-displacement material and its uniforms.
#[derive(Debug, Clone, Default)]
pub struct NoiseMaterial {
    pub uniforms: UniformSet,
}

#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: TorusGeometry,
    pub material: NoiseMaterial,
}

impl Mesh {
    pub fn noise_torus(uniforms: UniformSet) -> Self {
        Self {
            geometry: TorusGeometry::SCENE,
            material: NoiseMaterial { uniforms },
        }
    }
}

/// Scene graph root: an optional background and the meshes to draw.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    /// `None` clears to transparent.
    pub background: Option<Color>,
    meshes: Vec<Mesh>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, mesh: Mesh) {
        self.meshes.push(mesh);
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [Mesh] {
        &mut self.meshes
    }
}

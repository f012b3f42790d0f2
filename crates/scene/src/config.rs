use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::CameraConfig;
use crate::controls::ControlsConfig;
use crate::uniforms::UniformSet;

/// Options for the surface-bound renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Multisample the color target.
    pub antialias: bool,
    /// Keep an alpha channel so the transparent background shows through.
    pub alpha: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
        }
    }
}

/// Everything tunable about the scene. Every field has a default, so a
/// config file only needs the values it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub uniforms: UniformSet,
    pub renderer: RendererConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SceneConfig {
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&source)?;
        tracing::info!("loaded scene config from {}", path.display());
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

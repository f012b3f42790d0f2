//! Shader parameters for the noise material.
//!
//! The set is fixed: eight named uniforms. Values live on the GPU and are
//! uploaded again only when [`UniformSet::revision`] changes, so hosts that
//! want animation mutate the set between frames and nothing else.

use std::fmt;

use glam::Vec3;
use noisetorus_common::Color;
use serde::{Deserialize, Serialize};

/// Amplitude multiplier applied to the clamped noise strength in the vertex stage.
pub const DISPLACEMENT_FACTOR: f32 = 0.25;

/// Names of the uniforms, as the shader programs refer to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformName {
    Color,
    LightPos,
    LightColor,
    LightIntensity,
    NoiseCoef,
    NoiseMin,
    NoiseMax,
    NoiseScale,
}

impl UniformName {
    pub const ALL: [UniformName; 8] = [
        UniformName::Color,
        UniformName::LightPos,
        UniformName::LightColor,
        UniformName::LightIntensity,
        UniformName::NoiseCoef,
        UniformName::NoiseMin,
        UniformName::NoiseMax,
        UniformName::NoiseScale,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UniformName::Color => "uColor",
            UniformName::LightPos => "uLightPos",
            UniformName::LightColor => "uLightColor",
            UniformName::LightIntensity => "uLightIntensity",
            UniformName::NoiseCoef => "uNoiseCoef",
            UniformName::NoiseMin => "uNoiseMin",
            UniformName::NoiseMax => "uNoiseMax",
            UniformName::NoiseScale => "uNoiseScale",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }

    pub fn kind(self) -> UniformKind {
        match self {
            UniformName::Color | UniformName::LightColor => UniformKind::Color,
            UniformName::LightPos => UniformKind::Vec3,
            _ => UniformKind::Scalar,
        }
    }
}

impl fmt::Display for UniformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Scalar,
    Vec3,
    Color,
}

/// A single uniform value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vec3(Vec3),
    Color(Color),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Scalar(_) => UniformKind::Scalar,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Color(_) => UniformKind::Color,
        }
    }

    /// Parse text as a value of `kind`: `0.5`, `1,2,3` or `#7b8bff`.
    /// Non-finite numbers are rejected.
    pub fn parse(kind: UniformKind, text: &str) -> Option<Self> {
        let text = text.trim();
        match kind {
            UniformKind::Scalar => text
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .map(UniformValue::Scalar),
            UniformKind::Color => text.parse().ok().map(UniformValue::Color),
            UniformKind::Vec3 => {
                let parts = text
                    .split(',')
                    .map(|p| p.trim().parse::<f32>())
                    .collect::<Result<Vec<_>, _>>()
                    .ok()?;
                match parts[..] {
                    [x, y, z] => Some(Vec3::new(x, y, z))
                        .filter(|v| v.is_finite())
                        .map(UniformValue::Vec3),
                    _ => None,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniformError {
    #[error("unknown uniform: {0}")]
    UnknownName(String),
    #[error("uniform {name} expects a {expected:?} value, got {actual:?}")]
    WrongKind {
        name: UniformName,
        expected: UniformKind,
        actual: UniformKind,
    },
    #[error("invalid value {value:?} for {name}")]
    InvalidValue { name: UniformName, value: String },
}

/// The material's uniform values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniformSet {
    color: Color,
    light_pos: Vec3,
    light_color: Color,
    light_intensity: f32,
    noise_coef: f32,
    noise_min: f32,
    noise_max: f32,
    noise_scale: f32,
    #[serde(skip)]
    revision: u64,
}

impl Default for UniformSet {
    fn default() -> Self {
        Self {
            color: Color::from_hex(0x7b8bff),
            light_pos: Vec3::new(0.0, 5.0, 3.0),
            light_color: Color::from_hex(0xffffff),
            light_intensity: 0.8,
            noise_coef: 5.0,
            noise_min: 0.5,
            noise_max: 200.0,
            noise_scale: 0.8,
            revision: 0,
        }
    }
}

impl UniformSet {
    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn light_pos(&self) -> Vec3 {
        self.light_pos
    }

    pub fn light_color(&self) -> Color {
        self.light_color
    }

    pub fn light_intensity(&self) -> f32 {
        self.light_intensity
    }

    pub fn noise_coef(&self) -> f32 {
        self.noise_coef
    }

    pub fn noise_min(&self) -> f32 {
        self.noise_min
    }

    pub fn noise_max(&self) -> f32 {
        self.noise_max
    }

    pub fn noise_scale(&self) -> f32 {
        self.noise_scale
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.touch();
    }

    pub fn set_light_pos(&mut self, pos: Vec3) {
        self.light_pos = pos;
        self.touch();
    }

    pub fn set_light_color(&mut self, color: Color) {
        self.light_color = color;
        self.touch();
    }

    pub fn set_light_intensity(&mut self, intensity: f32) {
        self.light_intensity = intensity;
        self.touch();
    }

    pub fn set_noise_coef(&mut self, coef: f32) {
        self.noise_coef = coef;
        self.touch();
    }

    pub fn set_noise_min(&mut self, min: f32) {
        self.noise_min = min;
        self.touch();
    }

    pub fn set_noise_max(&mut self, max: f32) {
        self.noise_max = max;
        self.touch();
    }

    pub fn set_noise_scale(&mut self, scale: f32) {
        self.noise_scale = scale;
        self.touch();
    }

    /// Reset every value to its default. The revision keeps counting up.
    pub fn restore_defaults(&mut self) {
        let revision = self.revision;
        *self = Self::default();
        self.revision = revision;
        self.touch();
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    pub fn get(&self, name: UniformName) -> UniformValue {
        match name {
            UniformName::Color => UniformValue::Color(self.color),
            UniformName::LightPos => UniformValue::Vec3(self.light_pos),
            UniformName::LightColor => UniformValue::Color(self.light_color),
            UniformName::LightIntensity => UniformValue::Scalar(self.light_intensity),
            UniformName::NoiseCoef => UniformValue::Scalar(self.noise_coef),
            UniformName::NoiseMin => UniformValue::Scalar(self.noise_min),
            UniformName::NoiseMax => UniformValue::Scalar(self.noise_max),
            UniformName::NoiseScale => UniformValue::Scalar(self.noise_scale),
        }
    }

    /// Set a uniform by its shader name, e.g. `"uNoiseCoef"`.
    pub fn set_by_name(&mut self, name: &str, value: UniformValue) -> Result<(), UniformError> {
        let name = UniformName::parse(name).ok_or_else(|| UniformError::UnknownName(name.into()))?;
        self.set(name, value)
    }

    /// Set a uniform from text, e.g. `("uLightPos", "0,5,3")`.
    pub fn set_from_str(&mut self, name: &str, text: &str) -> Result<(), UniformError> {
        let name = UniformName::parse(name).ok_or_else(|| UniformError::UnknownName(name.into()))?;
        let value = UniformValue::parse(name.kind(), text).ok_or_else(|| UniformError::InvalidValue {
            name,
            value: text.into(),
        })?;
        self.set(name, value)
    }

    pub fn set(&mut self, name: UniformName, value: UniformValue) -> Result<(), UniformError> {
        match (name, value) {
            (UniformName::Color, UniformValue::Color(c)) => self.set_color(c),
            (UniformName::LightColor, UniformValue::Color(c)) => self.set_light_color(c),
            (UniformName::LightPos, UniformValue::Vec3(v)) => self.set_light_pos(v),
            (UniformName::LightIntensity, UniformValue::Scalar(s)) => self.set_light_intensity(s),
            (UniformName::NoiseCoef, UniformValue::Scalar(s)) => self.set_noise_coef(s),
            (UniformName::NoiseMin, UniformValue::Scalar(s)) => self.set_noise_min(s),
            (UniformName::NoiseMax, UniformValue::Scalar(s)) => self.set_noise_max(s),
            (UniformName::NoiseScale, UniformValue::Scalar(s)) => self.set_noise_scale(s),
            (name, value) => {
                return Err(UniformError::WrongKind {
                    name,
                    expected: name.kind(),
                    actual: value.kind(),
                });
            }
        }
        Ok(())
    }

    /// Peak vertex displacement along the normal, in world units.
    ///
    /// Mirrors the vertex shader: the coefficient/scale product is clamped
    /// into `[noise_min, noise_max]` before scaling.
    pub fn displacement_amplitude(&self) -> f32 {
        let (lo, hi) = if self.noise_min <= self.noise_max {
            (self.noise_min, self.noise_max)
        } else {
            (self.noise_max, self.noise_min)
        };
        (self.noise_coef * self.noise_scale).clamp(lo, hi) * DISPLACEMENT_FACTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_material_setup() {
        let u = UniformSet::default();
        assert_eq!(u.color().to_hex(), 0x7b8bff);
        assert_eq!(u.light_intensity(), 0.8);
        assert_eq!(u.noise_coef(), 5.0);
        assert_eq!(u.noise_min(), 0.5);
        assert_eq!(u.noise_max(), 200.0);
        assert_eq!(u.noise_scale(), 0.8);
        assert_eq!(u.light_color().to_hex(), 0xffffff);
        assert_eq!(u.light_pos(), Vec3::new(0.0, 5.0, 3.0));
        assert_eq!(u.revision(), 0);
    }

    #[test]
    fn values_parse_by_kind() {
        assert_eq!(
            UniformValue::parse(UniformKind::Scalar, " 2.5 "),
            Some(UniformValue::Scalar(2.5))
        );
        assert_eq!(
            UniformValue::parse(UniformKind::Vec3, "1, 2,3"),
            Some(UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)))
        );
        assert_eq!(
            UniformValue::parse(UniformKind::Color, "#ff0000"),
            Some(UniformValue::Color(Color::from_hex(0xff0000)))
        );
        assert_eq!(UniformValue::parse(UniformKind::Vec3, "1,2"), None);
        assert_eq!(UniformValue::parse(UniformKind::Scalar, "lots"), None);
    }

    #[test]
    fn set_from_str_checks_name_and_value() {
        let mut u = UniformSet::default();
        u.set_from_str("uLightPos", "0,10,3").unwrap();
        assert_eq!(u.light_pos(), Vec3::new(0.0, 10.0, 3.0));
        assert_eq!(
            u.set_from_str("uNoiseCoef", "#ffffff"),
            Err(UniformError::InvalidValue {
                name: UniformName::NoiseCoef,
                value: "#ffffff".into()
            })
        );
        assert!(matches!(
            u.set_from_str("uTime", "1"),
            Err(UniformError::UnknownName(_))
        ));
        assert_eq!(u.revision(), 1);
    }

    #[test]
    fn non_finite_text_is_rejected() {
        for text in ["nan", "inf", "-inf", "NaN"] {
            assert_eq!(UniformValue::parse(UniformKind::Scalar, text), None);
        }
        for text in ["nan,1,2", "0,inf,0", "1,2,-inf"] {
            assert_eq!(UniformValue::parse(UniformKind::Vec3, text), None);
        }
        let mut u = UniformSet::default();
        assert!(matches!(
            u.set_from_str("uLightPos", "nan,1,2"),
            Err(UniformError::InvalidValue { .. })
        ));
        assert!(matches!(
            u.set_from_str("uNoiseScale", "inf"),
            Err(UniformError::InvalidValue { .. })
        ));
        assert_eq!(u.light_pos(), Vec3::new(0.0, 5.0, 3.0));
        assert_eq!(u.revision(), 0);
    }

    #[test]
    fn restoring_defaults_still_advances_revision() {
        let mut u = UniformSet::default();
        u.set_noise_coef(9.0);
        u.set_color(Color::BLACK);
        u.restore_defaults();
        assert_eq!(u.noise_coef(), 5.0);
        assert_eq!(u.color().to_hex(), 0x7b8bff);
        assert_eq!(u.revision(), 3);
    }

    #[test]
    fn every_name_round_trips() {
        for name in UniformName::ALL {
            assert_eq!(UniformName::parse(name.as_str()), Some(name));
        }
        assert_eq!(UniformName::parse("uTime"), None);
    }

    #[test]
    fn set_by_name_updates_value_and_revision() {
        let mut u = UniformSet::default();
        u.set_by_name("uNoiseCoef", UniformValue::Scalar(9.0)).unwrap();
        assert_eq!(u.noise_coef(), 9.0);
        assert_eq!(u.revision(), 1);
        u.set_light_pos(Vec3::ONE);
        assert_eq!(u.get(UniformName::LightPos), UniformValue::Vec3(Vec3::ONE));
        assert_eq!(u.revision(), 2);
    }

    #[test]
    fn wrong_kind_is_rejected_without_touching() {
        let mut u = UniformSet::default();
        let err = u
            .set(UniformName::Color, UniformValue::Scalar(1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            UniformError::WrongKind {
                expected: UniformKind::Color,
                actual: UniformKind::Scalar,
                ..
            }
        ));
        assert_eq!(u.revision(), 0);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let mut u = UniformSet::default();
        assert_eq!(
            u.set_by_name("uTime", UniformValue::Scalar(0.0)),
            Err(UniformError::UnknownName("uTime".into()))
        );
    }

    #[test]
    fn displacement_amplitude_is_clamped() {
        let mut u = UniformSet::default();
        // 5.0 * 0.8 = 4.0, inside [0.5, 200]
        assert!((u.displacement_amplitude() - 1.0).abs() < 1e-6);
        u.set_noise_scale(0.0);
        assert!((u.displacement_amplitude() - 0.5 * DISPLACEMENT_FACTOR).abs() < 1e-6);
        u.set_noise_scale(1000.0);
        assert!((u.displacement_amplitude() - 200.0 * DISPLACEMENT_FACTOR).abs() < 1e-3);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let u: UniformSet = serde_yaml::from_str("noise_coef: 2.5\ncolor: '#ff0000'\n").unwrap();
        assert_eq!(u.noise_coef(), 2.5);
        assert_eq!(u.color().to_hex(), 0xff0000);
        assert_eq!(u.noise_max(), 200.0);
    }
}

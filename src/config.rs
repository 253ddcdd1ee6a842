// Runtime configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glam::{Vec3, Vec4};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Rates and limits used when turning input into motion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Robot and free-camera speed in units per second
    pub movement_speed: f32,
    /// Joint speed in degrees per second
    pub angular_speed: f32,
    /// Camera degrees per pixel of pointer motion
    pub mouse_sensitivity: f32,
    /// Symmetric limit for hinge joints, in degrees
    pub max_vertical_angle: f32,
    /// Ambient light change per key press
    pub ambient_step: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            movement_speed: 1.5,
            angular_speed: 45.0,
            mouse_sensitivity: 0.1,
            max_vertical_angle: 60.0,
            ambient_step: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub near_plane: f32,
    pub far_plane: f32,
    /// Vertical field of view in degrees
    pub field_of_view: f32,
}

impl CameraConfig {
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }

    pub fn look_at(&self) -> Vec3 {
        Vec3::from(self.look_at)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 2.0, 0.0],
            look_at: [0.0, 2.0, -1.0],
            near_plane: 0.2,
            far_plane: 100.0,
            field_of_view: 45.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub diffuse: f32,
    pub specular: f32,
    pub ambient: f32,
    pub attenuation: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [5.0, 3.0, -2.0],
            diffuse: 0.5,
            specular: 1.0,
            ambient: 1.5,
            attenuation: 1.2,
        }
    }
}

impl LightConfig {
    pub fn to_light(&self) -> crate::light::Light {
        crate::light::Light::new(
            Vec3::from(self.position),
            Vec4::splat(self.diffuse),
            Vec4::splat(self.specular),
            Vec4::splat(self.ambient),
            self.attenuation,
        )
    }
}

/// Top-level configuration. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub window_width: u32,
    pub window_height: u32,
    pub asset_dir: PathBuf,
    pub motion: MotionConfig,
    pub camera: CameraConfig,
    pub light: LightConfig,
    /// Texture file per model name, relative to `asset_dir`
    pub textures: BTreeMap<String, PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_width: 1024,
            window_height: 768,
            asset_dir: PathBuf::from("assets"),
            motion: MotionConfig::default(),
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            textures: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Reads a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Checks the constraints the camera and joint limits rely on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        if !(camera.near_plane > 0.0 && camera.far_plane > camera.near_plane) {
            return Err(ConfigError::Invalid(format!(
                "camera planes must satisfy 0 < near < far (near = {}, far = {})",
                camera.near_plane, camera.far_plane
            )));
        }
        if !(camera.field_of_view > 0.0 && camera.field_of_view < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "field of view must be in (0, 180), got {}",
                camera.field_of_view
            )));
        }
        if self.motion.max_vertical_angle < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max vertical angle must not be negative, got {}",
                self.motion.max_vertical_angle
            )));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(ConfigError::Invalid("window size must be non-zero".to_string()));
        }
        Ok(())
    }
}

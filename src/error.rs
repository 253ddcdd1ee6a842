// Error types for setup-time failures

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::obj::ObjError;

/// Failure while loading models or textures from disk.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse geometry file '{path}': {source}")]
    Obj {
        path: PathBuf,
        #[source]
        source: ObjError,
    },

    #[error("failed to decode texture '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("object '{name}' not found in '{path}'")]
    MissingObject { name: String, path: PathBuf },

    #[error("model '{0}' was not loaded")]
    MissingModel(String),
}

/// Failure while bringing up the window or GPU.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("window error: {0}")]
    Window(String),

    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable graphics adapter found")]
    NoAdapter,

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Top-level error reported by `main` before exiting.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

//! # Engine Error Types
//!
//! All errors that can surface from the runtime: configuration, the ECS core,
//! the renderer collaborator and asset bookkeeping.

use std::path::PathBuf;

use thiserror::Error;
use trajan_core::EcsError;

use crate::assets::AssetError;
use crate::render::{RenderApi, RenderError};

/// Errors that can occur in the engine runtime.
#[derive(Error, Debug)]
pub enum EngineError {
    /// An ECS call failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// The renderer rejected a call.
    #[error("renderer: {0}")]
    Render(#[from] RenderError),

    /// An asset handle could not be resolved.
    #[error(transparent)]
    Asset(#[from] AssetError),

    /// An asset source file could not be read.
    #[error("failed to read asset {}: {source}", path.display())]
    AssetIo {
        /// The file that failed to load.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Configuration file is not valid TOML for [`EngineConfig`](crate::EngineConfig).
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No backend is available for the requested API.
    #[error("unsupported render API: {0:?}")]
    UnsupportedRenderApi(RenderApi),

    /// Frame loop used before [`Engine::initialize`](crate::Engine::initialize).
    #[error("engine is not initialized")]
    NotInitialized,

    /// [`Engine::initialize`](crate::Engine::initialize) called twice, or after shutdown.
    #[error("engine was already initialized")]
    AlreadyInitialized,
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every section is optional:
//!
//! ```toml
//! render_api = "headless"
//!
//! [window]
//! width = 1280
//! height = 720
//! title = "Trajan"
//!
//! [ecs]
//! max_entities = 1024
//!
//! [timing]
//! max_delta_seconds = 0.1
//! slow_frame_ms = 33
//! ```

use std::path::Path;

use serde::Deserialize;
use trajan_core::EcsConfig;

use crate::error::{EngineError, EngineResult};
use crate::render::RenderApi;

/// Top-level engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window / framebuffer settings.
    pub window: WindowConfig,
    /// Rendering backend.
    pub render_api: RenderApi,
    /// ECS capacities.
    pub ecs: EcsConfig,
    /// Frame timing.
    pub timing: TimingConfig,
}

/// Window settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Trajan".to_owned(),
        }
    }
}

/// Frame timing settings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Upper clamp for a frame's delta time, so a stall does not become one
    /// giant simulation step.
    pub max_delta_seconds: f32,
    /// Frames slower than this are logged as warnings.
    pub slow_frame_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            max_delta_seconds: 0.1,
            slow_frame_ms: 33,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigParse`] or [`EngineError::InvalidConfig`].
    pub fn from_toml_str(source: &str) -> EngineResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`EngineError::ConfigIo`], [`EngineError::ConfigParse`] or
    /// [`EngineError::InvalidConfig`].
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Rejects values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> EngineResult<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(EngineError::InvalidConfig(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        self.ecs
            .validate()
            .map_err(|e| EngineError::InvalidConfig(format!("ecs.max_entities: {e}")))?;
        let max_dt = self.timing.max_delta_seconds;
        if max_dt.is_nan() || max_dt <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "timing.max_delta_seconds must be positive, got {max_dt}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.ecs.max_entities, trajan_core::MAX_ENTITIES);
        assert_eq!(config.render_api, RenderApi::Headless);
    }

    #[test]
    fn test_partial_sections() {
        let config = EngineConfig::from_toml_str(
            r#"
            render_api = "opengl"

            [window]
            title = "Demo"

            [ecs]
            max_entities = 64
            "#,
        )
        .unwrap();

        assert_eq!(config.render_api, RenderApi::OpenGl);
        assert_eq!(config.window.title, "Demo");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.ecs.max_entities, 64);
        assert_eq!(config.timing, TimingConfig::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml_str("[ecs]\nmax_entities = 0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = EngineConfig::from_toml_str("[window]\nwidth = 0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = EngineConfig::from_toml_str("[timing]\nmax_delta_seconds = -1.0").unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_toml_str("render_api = \"metal\"").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParse(_)));
    }
}

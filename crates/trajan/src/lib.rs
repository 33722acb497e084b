//! # Trajan
//!
//! The runtime around [`trajan_core`]: configuration, a frame loop, a
//! renderer interface with a headless backend, reference-counted assets and
//! the built-in 2D components and systems.
//!
//! ## Modules
//!
//! - `config`: TOML engine configuration
//! - `engine`: Frame orchestration and lifecycle
//! - `render`: Renderer trait, draw commands, headless backend
//! - `platform`: Window / event-loop abstraction
//! - `assets`: Reference-counted asset stores
//! - `components` / `systems`: Built-in 2D sprite pipeline
//!
//! ## Example
//!
//! ```rust,ignore
//! use trajan::{Engine, EngineConfig, HeadlessPlatform, Sprite, Transform2D};
//!
//! let platform = HeadlessPlatform::new(1280, 720);
//! let mut engine = Engine::with_config(EngineConfig::default(), platform)?;
//! engine.initialize()?;
//!
//! let quad = engine.context_mut().load_quad()?;
//! let shader = engine.context_mut().load_shader("flat", &flat_shader)?;
//!
//! let ecs = engine.ecs_mut();
//! let e = ecs.create_entity()?;
//! ecs.add_component(e, Transform2D::default())?;
//! ecs.add_component(e, Sprite::new(quad, shader))?;
//!
//! engine.run()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assets;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod math;
pub mod platform;
pub mod render;
pub mod systems;

pub use trajan_core as core;

pub use assets::{AssetError, AssetHandle, AssetId, AssetStore, Mesh, Shader, Texture};
pub use components::{Sprite, Transform2D, Velocity2D};
pub use config::{EngineConfig, TimingConfig, WindowConfig};
pub use engine::{Engine, EngineContext, EngineState, FrameStats, QUAD_MESH};
pub use error::{EngineError, EngineResult};
pub use math::{Mat4, Vec2, Vec3};
pub use platform::{HeadlessPlatform, Platform};
pub use render::{
    create_renderer, FrameData, GpuHandle, HeadlessRenderer, MeshDescriptor, RenderApi,
    RenderCommand, RenderError, Renderer, RendererInitInfo, ShaderDescriptor, TextureDescriptor,
};
pub use systems::{MotionSystem, RenderSystem};

//! # Trajan Core
//!
//! The Entity Component System at the heart of the Trajan engine:
//! - Entity slot allocation and recycling with generation checks
//! - Packed per-type component storage with O(1) insert and remove
//! - Systems whose entity sets follow component signatures automatically
//!
//! ## Architecture Rules
//!
//! 1. **Fixed capacity** - Entity and component memory is reserved up front
//! 2. **One owner** - The [`Orchestrator`] owns every registry; nothing aliases them
//! 3. **Tagged errors** - Every fallible call returns an [`EcsResult`], never a sentinel
//! 4. **Single thread** - No internal locking; serialize access externally if needed
//!
//! ## Example
//!
//! ```rust,ignore
//! use trajan_core::{EcsConfig, Orchestrator};
//!
//! let mut ecs: Orchestrator = Orchestrator::new(EcsConfig::with_capacity(1024));
//! ecs.register_component::<Position>()?;
//! let e = ecs.create_entity()?;
//! ecs.add_component(e, Position::default())?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;

pub use config::{EcsConfig, MAX_COMPONENT_TYPES, MAX_ENTITIES};
pub use ecs::{
    AsAny, Component, ComponentRegistry, ComponentSet, ComponentStore, ComponentTypeIndex,
    ComponentView, Entity, EntityRegistry, Members, Orchestrator, Signature, System, SystemFrame,
    SystemHandle, SystemRegistry,
};
pub use error::{EcsError, EcsResult};

//! # Entity Component System
//!
//! A fixed-capacity ECS with signature-driven system membership.
//!
//! ## Design Philosophy
//!
//! - All entity and component storage is reserved when the orchestrator is built
//! - Components are stored in packed arrays with O(1) swap-remove
//! - Entity handles carry a generation counter, so recycled slots reject stale handles
//! - Systems see a maintained set of matching entities instead of querying

mod component;
mod entity;
mod orchestrator;
mod registry;
mod storage;
mod system;

pub use component::{Component, ComponentSet, ComponentTypeIndex, Signature};
pub use entity::{Entity, EntityRegistry};
pub use orchestrator::Orchestrator;
pub use registry::ComponentRegistry;
pub use storage::ComponentStore;
pub use system::{AsAny, ComponentView, Members, System, SystemFrame, SystemHandle, SystemRegistry};

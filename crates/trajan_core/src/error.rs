//! # ECS Error Types
//!
//! Every fallible ECS operation returns one of these. None of them are
//! transient: each one is a logic or configuration error on the caller's side,
//! so nothing in the core retries.

use thiserror::Error;

use crate::ecs::Entity;

/// Errors that can occur in the ECS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The configured entity capacity cannot back an entity pool.
    #[error("entity capacity must be in 1..=u32::MAX, got {requested}")]
    InvalidCapacity {
        /// The configured capacity.
        requested: usize,
    },

    /// The entity pool is exhausted.
    #[error("entity capacity exceeded: all {capacity} slots are alive")]
    CapacityExceeded {
        /// Fixed capacity of the entity pool.
        capacity: usize,
    },

    /// The entity index lies beyond the allocated capacity.
    #[error("entity index {index} out of range (capacity {capacity})")]
    OutOfRange {
        /// The offending slot index.
        index: u32,
        /// Fixed capacity of the entity pool.
        capacity: usize,
    },

    /// The entity slot is dead, or was recycled under a newer generation.
    #[error("stale entity handle {0}")]
    StaleEntity(Entity),

    /// A component or system type was registered twice.
    #[error("type {type_name} is already registered")]
    AlreadyRegistered {
        /// Rust name of the type.
        type_name: &'static str,
    },

    /// Operation on a component or system type that was never registered.
    #[error("type {type_name} is not registered")]
    NotRegistered {
        /// Rust name of the type.
        type_name: &'static str,
    },

    /// Second insert of the same component type for one entity.
    #[error("entity {entity} already has a {type_name} component")]
    DuplicateComponent {
        /// The entity.
        entity: Entity,
        /// Rust name of the component type.
        type_name: &'static str,
    },

    /// Remove or get for an entity lacking that component type.
    #[error("entity {entity} has no {type_name} component")]
    MissingComponent {
        /// The entity.
        entity: Entity,
        /// Rust name of the component type.
        type_name: &'static str,
    },

    /// Every signature bit is already assigned to a component type.
    #[error("cannot register more than {limit} component types")]
    TooManyComponentTypes {
        /// Maximum number of component types.
        limit: usize,
    },
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EcsError::MissingComponent {
            entity: Entity::new(3, 1),
            type_name: "Position",
        };
        assert_eq!(err.to_string(), "entity 3v1 has no Position component");

        let err = EcsError::CapacityExceeded { capacity: 8 };
        assert_eq!(err.to_string(), "entity capacity exceeded: all 8 slots are alive");
    }
}

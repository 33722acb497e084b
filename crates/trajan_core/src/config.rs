//! # ECS Configuration
//!
//! Capacities are fixed when the orchestrator is built. Nothing grows
//! afterwards, which is what keeps component stores allocation-free in the
//! steady state.

use serde::Deserialize;

use crate::error::{EcsError, EcsResult};

/// Default number of entity slots.
pub const MAX_ENTITIES: usize = 1024;

/// Number of bits in a [`Signature`](crate::Signature), and therefore the
/// maximum number of registered component types.
pub const MAX_COMPONENT_TYPES: usize = 32;

/// Sizing for an [`Orchestrator`](crate::Orchestrator).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Number of entity slots (and rows per component store).
    pub max_entities: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: MAX_ENTITIES,
        }
    }
}

impl EcsConfig {
    /// Creates a config with the given entity capacity.
    #[must_use]
    pub const fn with_capacity(max_entities: usize) -> Self {
        Self { max_entities }
    }

    /// Checks that the capacity can back an entity pool: at least one slot,
    /// and every index addressable by an [`Entity`](crate::Entity).
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidCapacity`].
    pub fn validate(&self) -> EcsResult<()> {
        if self.max_entities == 0 || u32::try_from(self.max_entities).is_err() {
            return Err(EcsError::InvalidCapacity {
                requested: self.max_entities,
            });
        }
        Ok(())
    }
}

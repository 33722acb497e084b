//! # Component Storage
//!
//! Pre-allocated, packed component storage.
//!
//! The storage uses a sparse/dense strategy:
//! - Values live in a gap-free array: occupied rows are exactly `[0, len)`
//! - A fixed sparse map takes an entity index to its row in O(1)
//! - A parallel dense array takes a row back to its entity
//! - Removal swaps the last row into the hole, so it is O(1) and never shifts
//!
//! All three arrays are sized for the entity capacity up front.

use std::any::{type_name, Any};

use super::component::Component;
use super::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// Sentinel for an empty sparse slot.
const NO_ROW: u32 = u32::MAX;

/// Packed storage for a single component type.
///
/// This storage guarantees:
/// - No allocation after construction
/// - O(1) insert, remove and lookup
/// - The entity↔row maps are mutual inverses over `[0, len)`
///
/// # Example
///
/// ```rust,ignore
/// let mut store: ComponentStore<Position> = ComponentStore::new(1024);
/// store.insert(entity, Position::new(1.0, 2.0))?;
/// ```
pub struct ComponentStore<T: Component> {
    /// Component values, packed.
    values: Vec<T>,
    /// Row → owning entity.
    entities: Vec<Entity>,
    /// Entity index → row, or [`NO_ROW`].
    rows: Box<[u32]>,
}

impl<T: Component> ComponentStore<T> {
    /// Creates an empty store able to hold one row per entity slot.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");

        Self {
            values: Vec::with_capacity(capacity),
            entities: Vec::with_capacity(capacity),
            rows: vec![NO_ROW; capacity].into_boxed_slice(),
        }
    }

    /// Maximum number of rows.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.rows.len()
    }

    /// Number of occupied rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if no rows are occupied.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Appends a row for `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateComponent`] if the entity slot already has a row,
    /// [`EcsError::OutOfRange`] if its index exceeds the store capacity.
    pub fn insert(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        let capacity = self.rows.len();
        let slot = self
            .rows
            .get_mut(entity.index() as usize)
            .ok_or(EcsError::OutOfRange {
                index: entity.index(),
                capacity,
            })?;
        if *slot != NO_ROW {
            return Err(EcsError::DuplicateComponent {
                entity,
                type_name: type_name::<T>(),
            });
        }

        // Bounded by the sparse slice, so this never reallocates
        *slot = self.values.len() as u32;
        self.values.push(value);
        self.entities.push(entity);
        Ok(())
    }

    /// Removes the entity's row and returns its value.
    ///
    /// The last row moves into the freed slot and its sparse entry is patched.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if the entity has no row.
    pub fn remove(&mut self, entity: Entity) -> EcsResult<T> {
        let Some(row) = self.row_of(entity) else {
            return Err(EcsError::MissingComponent {
                entity,
                type_name: type_name::<T>(),
            });
        };

        let value = self.values.swap_remove(row);
        self.entities.swap_remove(row);
        self.rows[entity.index() as usize] = NO_ROW;

        if let Some(moved) = self.entities.get(row) {
            self.rows[moved.index() as usize] = row as u32;
        }

        Ok(value)
    }

    /// Gets the entity's component, or `None` if it has no row.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        let row = self.row_of(entity)?;
        self.values.get(row)
    }

    /// Gets the entity's component mutably, or `None` if it has no row.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let row = self.row_of(entity)?;
        self.values.get_mut(row)
    }

    /// Returns true if the entity has a row.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.row_of(entity).is_some()
    }

    /// Removes the entity's row if it has one; otherwise does nothing.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        if self.contains(entity) {
            // Cannot fail: presence was just checked
            let _ = self.remove(entity);
        }
    }

    /// Packed component values.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// Owning entity of each packed row.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterates over `(entity, component)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    /// Iterates mutably over `(entity, component)` pairs in row order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }

    /// Row of the entity, checking that the stored handle has the same
    /// generation.
    #[inline]
    fn row_of(&self, entity: Entity) -> Option<usize> {
        let row = *self.rows.get(entity.index() as usize)?;
        if row == NO_ROW {
            return None;
        }
        let row = row as usize;
        (self.entities[row] == entity).then_some(row)
    }
}

/// Type-erased view of a [`ComponentStore`], so the registry can keep stores
/// of different types in one table.
pub(crate) trait ErasedStore {
    /// Drops the entity's row, if any.
    fn on_entity_destroyed(&mut self, entity: Entity);

    /// Number of occupied rows.
    fn len(&self) -> usize;

    /// Upcast for downcasting to the concrete store.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete store.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ErasedStore for ComponentStore<T> {
    fn on_entity_destroyed(&mut self, entity: Entity) {
        ComponentStore::on_entity_destroyed(self, entity);
    }

    fn len(&self) -> usize {
        ComponentStore::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! # Component Registry
//!
//! Maps component types to their [`ComponentTypeIndex`] and owns one
//! [`ComponentStore`] per registered type. Stores sit in a table indexed by
//! type-index; only the `TypeId → index` lookup goes through a hash map.
//!
//! The registry never touches signatures. Keeping signature bits in step with
//! store rows is the orchestrator's job.

use std::any::{type_name, TypeId};
use std::collections::HashMap;

use super::component::{Component, ComponentTypeIndex};
use super::entity::Entity;
use super::storage::{ComponentStore, ErasedStore};
use crate::config::MAX_COMPONENT_TYPES;
use crate::error::{EcsError, EcsResult};

/// Registered component types and their stores.
pub struct ComponentRegistry {
    /// Type → assigned index.
    indices: HashMap<TypeId, ComponentTypeIndex>,
    /// Stores, indexed by type-index.
    stores: Vec<Box<dyn ErasedStore>>,
    /// Rows per store.
    capacity: usize,
}

impl ComponentRegistry {
    /// Creates an empty registry whose stores will hold `capacity` rows.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            indices: HashMap::with_capacity(MAX_COMPONENT_TYPES),
            stores: Vec::with_capacity(MAX_COMPONENT_TYPES),
            capacity,
        }
    }

    /// Number of registered component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.stores.len()
    }

    /// Returns true if no component type is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Assigns `T` the next type-index and creates its empty store.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`] if `T` already has an index (the
    /// existing registration is kept), [`EcsError::TooManyComponentTypes`]
    /// once every signature bit is taken.
    pub fn register<T: Component>(&mut self) -> EcsResult<ComponentTypeIndex> {
        let key = TypeId::of::<T>();
        if self.indices.contains_key(&key) {
            return Err(EcsError::AlreadyRegistered {
                type_name: type_name::<T>(),
            });
        }

        let next = self.stores.len();
        if next >= MAX_COMPONENT_TYPES {
            return Err(EcsError::TooManyComponentTypes {
                limit: MAX_COMPONENT_TYPES,
            });
        }
        let index = ComponentTypeIndex::new(next as u8);

        self.indices.insert(key, index);
        self.stores
            .push(Box::new(ComponentStore::<T>::new(self.capacity)));
        Ok(index)
    }

    /// Returns the type-index assigned to `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn type_index<T: Component>(&self) -> EcsResult<ComponentTypeIndex> {
        self.indices
            .get(&TypeId::of::<T>())
            .copied()
            .ok_or(EcsError::NotRegistered {
                type_name: type_name::<T>(),
            })
    }

    /// Returns true if `T` is registered.
    #[must_use]
    pub fn is_registered<T: Component>(&self) -> bool {
        self.indices.contains_key(&TypeId::of::<T>())
    }

    /// Typed read access to the store for `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn store<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        let index = self.type_index::<T>()?;
        self.stores[index.as_usize()]
            .as_any()
            .downcast_ref::<ComponentStore<T>>()
            .ok_or(EcsError::NotRegistered {
                type_name: type_name::<T>(),
            })
    }

    /// Typed write access to the store for `T`.
    ///
    /// Crate-private: adding or removing rows through the store directly
    /// would bypass signature bookkeeping.
    pub(crate) fn store_mut<T: Component>(&mut self) -> EcsResult<&mut ComponentStore<T>> {
        let index = self.type_index::<T>()?;
        self.stores[index.as_usize()]
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .ok_or(EcsError::NotRegistered {
                type_name: type_name::<T>(),
            })
    }

    /// Inserts a component row for the entity.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`] or [`EcsError::DuplicateComponent`].
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        self.store_mut::<T>()?.insert(entity, value)
    }

    /// Removes the entity's row and returns the value.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`] or [`EcsError::MissingComponent`].
    pub fn remove<T: Component>(&mut self, entity: Entity) -> EcsResult<T> {
        self.store_mut::<T>()?.remove(entity)
    }

    /// Gets the entity's component.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`] or [`EcsError::MissingComponent`].
    pub fn get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.store::<T>()?
            .get(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                type_name: type_name::<T>(),
            })
    }

    /// Gets the entity's component mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`] or [`EcsError::MissingComponent`].
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.store_mut::<T>()?
            .get_mut(entity)
            .ok_or(EcsError::MissingComponent {
                entity,
                type_name: type_name::<T>(),
            })
    }

    /// Returns true if the entity has a `T` row.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn contains<T: Component>(&self, entity: Entity) -> EcsResult<bool> {
        Ok(self.store::<T>()?.contains(entity))
    }

    /// Number of rows in the store at `index`, or `None` if no type has that
    /// index.
    #[must_use]
    pub fn row_count(&self, index: ComponentTypeIndex) -> Option<usize> {
        self.stores.get(index.as_usize()).map(|store| store.len())
    }

    /// Drops every row the entity owns. Stores without a row are untouched.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        for store in &mut self.stores {
            store.on_entity_destroyed(entity);
        }
    }
}

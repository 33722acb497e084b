//! # Systems
//!
//! A system is per-frame behavior plus an interest set: a required
//! [`Signature`] and the entities that currently match it.
//!
//! The [`SystemRegistry`] owns exactly one instance of each system type,
//! keeps them in registration order, and recomputes membership whenever an
//! entity's signature changes. Recomputing touches every system on every
//! component add or remove. Entity, type and system counts are small and
//! bounded, so a dirty-bit scheme is not worth its bookkeeping here.
//!
//! ## Lifecycle
//!
//! ```text
//! initialize_all(ctx) ──> update_all(dt) ... update_all(dt) ──> shutdown_all(ctx)
//!      (each runs every system in registration order)
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, trace};

use super::component::{Component, Signature};
use super::entity::Entity;
use super::registry::ComponentRegistry;
use super::storage::ComponentStore;
use crate::error::{EcsError, EcsResult};

/// Entities currently matching a system's required signature, in entity
/// order.
pub type Members = BTreeSet<Entity>;

/// Upcast helper so boxed systems can be downcast to their concrete type.
pub trait AsAny: Any {
    /// Upcast to `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Upcast to `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit of per-frame behavior.
///
/// `C` is the collaborator context (renderer, window, assets...) supplied by
/// the embedding runtime. The ECS core passes it through untouched and never
/// constructs one. It is handed to every lifecycle call, since a system cannot
/// keep a borrow of it between frames.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Default)]
/// struct Physics;
///
/// impl System<()> for Physics {
///     fn update(&mut self, mut frame: SystemFrame<'_, ()>) {
///         for &entity in frame.entities {
///             let vel = *frame.components.get::<Velocity>(entity)?;
///             frame.components.get_mut::<Position>(entity)?.x += vel.x * frame.dt;
///         }
///     }
/// }
/// ```
pub trait System<C>: AsAny {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }

    /// Called once by [`SystemRegistry::initialize_all`].
    fn initialize(&mut self, _ctx: &mut C) {}

    /// Called once per frame.
    fn update(&mut self, frame: SystemFrame<'_, C>);

    /// Called once by [`SystemRegistry::shutdown_all`].
    fn shutdown(&mut self, _ctx: &mut C) {}
}

/// Everything a system sees during one update.
pub struct SystemFrame<'a, C> {
    /// Seconds since the previous frame.
    pub dt: f32,
    /// Entities matching this system's signature.
    pub entities: &'a Members,
    /// Read/write access to component values.
    pub components: ComponentView<'a>,
    /// The runtime's collaborator context.
    pub context: &'a mut C,
}

/// Component access for systems.
///
/// Values can be read and modified in place, but rows can be neither added
/// nor removed, so no signature (and no membership set) changes while
/// systems are running.
pub struct ComponentView<'a> {
    registry: &'a mut ComponentRegistry,
}

impl<'a> ComponentView<'a> {
    pub(crate) fn new(registry: &'a mut ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Gets the entity's component.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`] or [`EcsError::MissingComponent`].
    pub fn get<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.registry.get(entity)
    }

    /// Gets the entity's component mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`] or [`EcsError::MissingComponent`].
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.registry.get_mut(entity)
    }

    /// Returns true if the entity has a `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn contains<T: Component>(&self, entity: Entity) -> EcsResult<bool> {
        self.registry.contains::<T>(entity)
    }

    /// Read access to the whole store, for packed iteration.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn store<T: Component>(&self) -> EcsResult<&ComponentStore<T>> {
        self.registry.store()
    }
}

/// Typed handle to a registered system.
pub struct SystemHandle<S> {
    index: usize,
    _marker: PhantomData<fn() -> S>,
}

impl<S> SystemHandle<S> {
    /// Position of the system in registration (and execution) order.
    #[inline]
    #[must_use]
    pub const fn order(&self) -> usize {
        self.index
    }
}

impl<S> Clone for SystemHandle<S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SystemHandle<S> {}

impl<S> PartialEq for SystemHandle<S> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<S> Eq for SystemHandle<S> {}

impl<S> fmt::Debug for SystemHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SystemHandle<{}>({})", type_name::<S>(), self.index)
    }
}

struct SystemSlot<C> {
    system: Box<dyn System<C>>,
    required: Signature,
    members: Members,
}

/// One instance per system type, in registration order.
pub struct SystemRegistry<C> {
    /// Type → position in `slots`.
    indices: HashMap<TypeId, usize>,
    slots: Vec<SystemSlot<C>>,
}

impl<C: 'static> Default for SystemRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> SystemRegistry<C> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            indices: HashMap::new(),
            slots: Vec::new(),
        }
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no system is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// System names in execution order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|slot| slot.system.name())
    }

    /// Stores `system` and appends it to the execution order. Its required
    /// signature starts empty and its membership set starts empty.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`] if a system of type `S` exists.
    pub fn register<S: System<C>>(&mut self, system: S) -> EcsResult<SystemHandle<S>> {
        let key = TypeId::of::<S>();
        if self.indices.contains_key(&key) {
            return Err(EcsError::AlreadyRegistered {
                type_name: type_name::<S>(),
            });
        }

        let index = self.slots.len();
        debug!(system = system.name(), order = index, "system registered");
        self.indices.insert(key, index);
        self.slots.push(SystemSlot {
            system: Box::new(system),
            required: Signature::EMPTY,
            members: Members::new(),
        });

        Ok(SystemHandle {
            index,
            _marker: PhantomData,
        })
    }

    /// Handle to the registered system of type `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn handle<S: System<C>>(&self) -> EcsResult<SystemHandle<S>> {
        self.index_of::<S>().map(|index| SystemHandle {
            index,
            _marker: PhantomData,
        })
    }

    /// Replaces the required signature of `S` and empties its membership
    /// set. The caller must re-offer every alive entity via
    /// [`rebuild_members`](Self::rebuild_members).
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn set_signature<S: System<C>>(
        &mut self,
        signature: Signature,
    ) -> EcsResult<SystemHandle<S>> {
        let handle = self.handle::<S>()?;
        let slot = &mut self.slots[handle.index];
        slot.required = signature;
        slot.members.clear();
        Ok(handle)
    }

    /// Required signature of `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn signature<S: System<C>>(&self) -> EcsResult<Signature> {
        Ok(self.slots[self.index_of::<S>()?].required)
    }

    /// The system instance of type `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn get<S: System<C>>(&self) -> EcsResult<&S> {
        let index = self.index_of::<S>()?;
        // Deref first: the Box itself is also `Any`
        (*self.slots[index].system)
            .as_any()
            .downcast_ref::<S>()
            .ok_or(EcsError::NotRegistered {
                type_name: type_name::<S>(),
            })
    }

    /// The system instance of type `S`, mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn get_mut<S: System<C>>(&mut self) -> EcsResult<&mut S> {
        let index = self.index_of::<S>()?;
        (*self.slots[index].system)
            .as_any_mut()
            .downcast_mut::<S>()
            .ok_or(EcsError::NotRegistered {
                type_name: type_name::<S>(),
            })
    }

    /// Membership set of `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`].
    pub fn members<S: System<C>>(&self) -> EcsResult<&Members> {
        Ok(&self.slots[self.index_of::<S>()?].members)
    }

    /// Membership set of the system behind `handle`.
    #[must_use]
    pub fn members_of<S>(&self, handle: SystemHandle<S>) -> &Members {
        &self.slots[handle.index].members
    }

    /// Recomputes membership of the system behind `handle` from scratch.
    pub fn rebuild_members<S, I>(&mut self, handle: SystemHandle<S>, alive: I)
    where
        I: IntoIterator<Item = (Entity, Signature)>,
    {
        let slot = &mut self.slots[handle.index];
        let required = slot.required;
        slot.members = alive
            .into_iter()
            .filter(|(_, signature)| signature.matches(required))
            .map(|(entity, _)| entity)
            .collect();
        trace!(
            system = slot.system.name(),
            members = slot.members.len(),
            "membership rebuilt"
        );
    }

    /// Drops the entity from every membership set.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        for slot in &mut self.slots {
            slot.members.remove(&entity);
        }
    }

    /// Re-evaluates the entity against every system's required signature,
    /// inserting or erasing it as needed.
    pub fn on_signature_changed(&mut self, entity: Entity, signature: Signature) {
        for slot in &mut self.slots {
            if signature.matches(slot.required) {
                if slot.members.insert(entity) {
                    trace!(%entity, system = slot.system.name(), "entity joined system");
                }
            } else if slot.members.remove(&entity) {
                trace!(%entity, system = slot.system.name(), "entity left system");
            }
        }
    }

    /// Runs [`System::initialize`] on every system in registration order.
    pub fn initialize_all(&mut self, ctx: &mut C) {
        for slot in &mut self.slots {
            debug!(system = slot.system.name(), "initializing system");
            slot.system.initialize(ctx);
        }
    }

    /// Runs [`System::update`] on every system in registration order.
    pub fn update_all(&mut self, dt: f32, components: &mut ComponentRegistry, ctx: &mut C) {
        for slot in &mut self.slots {
            let frame = SystemFrame {
                dt,
                entities: &slot.members,
                components: ComponentView::new(components),
                context: &mut *ctx,
            };
            slot.system.update(frame);
        }
    }

    /// Runs [`System::shutdown`] on every system in registration order.
    pub fn shutdown_all(&mut self, ctx: &mut C) {
        for slot in &mut self.slots {
            debug!(system = slot.system.name(), "shutting down system");
            slot.system.shutdown(ctx);
        }
    }

    fn index_of<S: System<C>>(&self) -> EcsResult<usize> {
        self.indices
            .get(&TypeId::of::<S>())
            .copied()
            .ok_or(EcsError::NotRegistered {
                type_name: type_name::<S>(),
            })
    }
}

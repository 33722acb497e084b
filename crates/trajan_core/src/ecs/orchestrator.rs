//! # Orchestrator
//!
//! The single owner of the entity, component and system registries, and the
//! only place their cross-registry invariants are enforced:
//!
//! - A signature bit is set iff the matching store has a row for the entity.
//! - Every system's membership set equals the alive entities whose signature
//!   covers its required signature.
//!
//! Each mutating call below sequences the registries so that a failure in
//! the first step leaves all three untouched.

use std::any::type_name;

use tracing::debug;

use super::component::{Component, ComponentSet, ComponentTypeIndex, Signature};
use super::entity::{Entity, EntityRegistry};
use super::registry::ComponentRegistry;
use super::system::{Members, System, SystemHandle, SystemRegistry};
use crate::config::EcsConfig;
use crate::error::EcsResult;

/// The ECS facade.
///
/// All memory for entities and component rows is reserved up front from
/// [`EcsConfig::max_entities`]; the capacity cannot change afterwards.
///
/// `C` is the collaborator context handed to systems. Use `()` when systems
/// need nothing beyond their components.
///
/// # Example
///
/// ```rust,ignore
/// let mut ecs: Orchestrator = Orchestrator::new(EcsConfig::default());
/// ecs.register_component::<Position>()?;
/// ecs.register_component::<Velocity>()?;
/// ecs.create_system::<Physics, (Position, Velocity)>()?;
///
/// let e = ecs.create_entity()?;
/// ecs.add_component(e, Position::default())?;
/// ecs.add_component(e, Velocity::default())?;
/// ecs.update_systems(1.0 / 60.0, &mut ());
/// ```
pub struct Orchestrator<C = ()> {
    entities: EntityRegistry,
    components: ComponentRegistry,
    systems: SystemRegistry<C>,
}

impl<C: 'static> Orchestrator<C> {
    /// Creates an orchestrator with the configured entity capacity.
    ///
    /// # Panics
    ///
    /// Panics if `config.max_entities` is zero or exceeds `u32::MAX`. Use
    /// [`try_new`](Self::try_new) for capacities read from configuration.
    #[must_use]
    pub fn new(config: EcsConfig) -> Self {
        debug!(max_entities = config.max_entities, "creating orchestrator");
        Self {
            entities: EntityRegistry::new(config.max_entities),
            components: ComponentRegistry::new(config.max_entities),
            systems: SystemRegistry::new(),
        }
    }

    /// Like [`new`](Self::new), but reports an unusable capacity as an
    /// error instead of panicking.
    ///
    /// # Errors
    ///
    /// [`EcsError::InvalidCapacity`](crate::EcsError::InvalidCapacity).
    pub fn try_new(config: EcsConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Maximum number of simultaneously alive entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entities.capacity()
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.entities.alive_count()
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates an entity with an empty signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::CapacityExceeded`](crate::EcsError::CapacityExceeded).
    pub fn create_entity(&mut self) -> EcsResult<Entity> {
        let entity = self.entities.create()?;
        debug!(%entity, "entity created");
        // Systems with an empty requirement match the empty signature
        self.systems.on_signature_changed(entity, Signature::EMPTY);
        Ok(entity)
    }

    /// Destroys an entity, dropping all of its component rows and system
    /// memberships before its slot goes back to the free queue.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange) or
    /// [`EcsError::StaleEntity`](crate::EcsError::StaleEntity). Nothing is
    /// touched on error.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.entities.validate(entity)?;

        self.components.on_entity_destroyed(entity);
        self.systems.on_entity_destroyed(entity);
        self.entities.destroy(entity)?;
        debug!(%entity, "entity destroyed");
        Ok(())
    }

    /// Returns true if the handle refers to a live entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// The entity's current signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange) or
    /// [`EcsError::StaleEntity`](crate::EcsError::StaleEntity).
    pub fn signature(&self, entity: Entity) -> EcsResult<Signature> {
        self.entities.signature(entity)
    }

    /// Iterates over alive entities in index order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive().map(|(entity, _)| entity)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers component type `T`, assigning its type-index.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`](crate::EcsError::AlreadyRegistered) or
    /// [`EcsError::TooManyComponentTypes`](crate::EcsError::TooManyComponentTypes).
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentTypeIndex> {
        let index = self.components.register::<T>()?;
        debug!(component = type_name::<T>(), index = index.as_usize(), "component type registered");
        Ok(index)
    }

    /// Type-index of component type `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered).
    pub fn component_type<T: Component>(&self) -> EcsResult<ComponentTypeIndex> {
        self.components.type_index::<T>()
    }

    /// Attaches `value` to the entity, sets its signature bit and updates
    /// system membership.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange),
    /// [`EcsError::StaleEntity`](crate::EcsError::StaleEntity),
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered) or
    /// [`EcsError::DuplicateComponent`](crate::EcsError::DuplicateComponent).
    /// The signature is left untouched on error.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> EcsResult<()> {
        let signature = self.entities.signature(entity)?;
        let ty = self.components.type_index::<T>()?;

        self.components.add(entity, value)?;

        let signature = signature.with(ty);
        self.entities.set_signature(entity, signature)?;
        self.systems.on_signature_changed(entity, signature);
        Ok(())
    }

    /// Detaches the entity's `T`, clears its signature bit and updates system
    /// membership. Returns the removed value.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange),
    /// [`EcsError::StaleEntity`](crate::EcsError::StaleEntity),
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered) or
    /// [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    /// The signature is left untouched on error.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> EcsResult<T> {
        let signature = self.entities.signature(entity)?;
        let ty = self.components.type_index::<T>()?;

        let value = self.components.remove::<T>(entity)?;

        let signature = signature.without(ty);
        self.entities.set_signature(entity, signature)?;
        self.systems.on_signature_changed(entity, signature);
        Ok(value)
    }

    /// The entity's `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange),
    /// [`EcsError::StaleEntity`](crate::EcsError::StaleEntity),
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered) or
    /// [`EcsError::MissingComponent`](crate::EcsError::MissingComponent).
    pub fn get_component<T: Component>(&self, entity: Entity) -> EcsResult<&T> {
        self.entities.validate(entity)?;
        self.components.get(entity)
    }

    /// The entity's `T`, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`get_component`](Self::get_component).
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> EcsResult<&mut T> {
        self.entities.validate(entity)?;
        self.components.get_mut(entity)
    }

    /// Returns true if the entity currently has a `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`](crate::EcsError::OutOfRange),
    /// [`EcsError::StaleEntity`](crate::EcsError::StaleEntity) or
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered).
    pub fn has_component<T: Component>(&self, entity: Entity) -> EcsResult<bool> {
        let signature = self.entities.signature(entity)?;
        Ok(signature.contains(self.components.type_index::<T>()?))
    }

    /// Read access to the component registry.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    // =========================================================================
    // Systems
    // =========================================================================

    /// Registers a default-constructed `S` at the end of the execution order.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`](crate::EcsError::AlreadyRegistered).
    pub fn register_system<S: System<C> + Default>(&mut self) -> EcsResult<SystemHandle<S>> {
        self.register_system_with(S::default())
    }

    /// Registers a pre-built system instance at the end of the execution
    /// order.
    ///
    /// # Errors
    ///
    /// [`EcsError::AlreadyRegistered`](crate::EcsError::AlreadyRegistered).
    pub fn register_system_with<S: System<C>>(&mut self, system: S) -> EcsResult<SystemHandle<S>> {
        let handle = self.systems.register(system)?;
        // An empty requirement matches every alive entity
        self.systems.rebuild_members(handle, self.entities.iter_alive());
        Ok(handle)
    }

    /// Sets the required signature of `S` and recomputes its membership over
    /// all alive entities.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered).
    pub fn set_system_signature<S: System<C>>(&mut self, signature: Signature) -> EcsResult<()> {
        let handle = self.systems.set_signature::<S>(signature)?;
        self.systems.rebuild_members(handle, self.entities.iter_alive());
        Ok(())
    }

    /// Registers a default-constructed `S` whose required signature is the
    /// union of the component types in the tuple `Q`.
    ///
    /// The signature is computed first, so an unregistered component type
    /// leaves no half-registered system behind.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered) or
    /// [`EcsError::AlreadyRegistered`](crate::EcsError::AlreadyRegistered).
    pub fn create_system<S, Q>(&mut self) -> EcsResult<SystemHandle<S>>
    where
        S: System<C> + Default,
        Q: ComponentSet,
    {
        self.create_system_with::<S, Q>(S::default())
    }

    /// Like [`create_system`](Self::create_system), with a pre-built instance.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered) or
    /// [`EcsError::AlreadyRegistered`](crate::EcsError::AlreadyRegistered).
    pub fn create_system_with<S, Q>(&mut self, system: S) -> EcsResult<SystemHandle<S>>
    where
        S: System<C>,
        Q: ComponentSet,
    {
        let signature = Q::signature(&self.components)?;
        let handle = self.systems.register(system)?;
        self.systems.set_signature::<S>(signature)?;
        self.systems.rebuild_members(handle, self.entities.iter_alive());
        debug!(system = type_name::<S>(), ?signature, "system created");
        Ok(handle)
    }

    /// The system instance of type `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered).
    pub fn system<S: System<C>>(&self) -> EcsResult<&S> {
        self.systems.get()
    }

    /// The system instance of type `S`, mutably.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered).
    pub fn system_mut<S: System<C>>(&mut self) -> EcsResult<&mut S> {
        self.systems.get_mut()
    }

    /// Required signature of `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered).
    pub fn system_signature<S: System<C>>(&self) -> EcsResult<Signature> {
        self.systems.signature::<S>()
    }

    /// Entities currently matching `S`.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered).
    pub fn members<S: System<C>>(&self) -> EcsResult<&Members> {
        self.systems.members::<S>()
    }

    /// Read access to the system registry.
    #[inline]
    #[must_use]
    pub fn systems(&self) -> &SystemRegistry<C> {
        &self.systems
    }

    /// Runs every system's `initialize` in registration order.
    pub fn initialize_systems(&mut self, ctx: &mut C) {
        self.systems.initialize_all(ctx);
    }

    /// Runs every system's `update` in registration order.
    pub fn update_systems(&mut self, dt: f32, ctx: &mut C) {
        self.systems.update_all(dt, &mut self.components, ctx);
    }

    /// Runs every system's `shutdown` in registration order.
    pub fn shutdown_systems(&mut self, ctx: &mut C) {
        self.systems.shutdown_all(ctx);
    }
}

impl<C: 'static> Default for Orchestrator<C> {
    fn default() -> Self {
        Self::new(EcsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::system::SystemFrame;
    use crate::error::EcsError;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[derive(Default)]
    struct Physics;

    impl System<()> for Physics {
        fn update(&mut self, mut frame: SystemFrame<'_, ()>) {
            for &entity in frame.entities {
                let Ok(vel) = frame.components.get::<Velocity>(entity).copied() else {
                    continue;
                };
                if let Ok(pos) = frame.components.get_mut::<Position>(entity) {
                    pos.x += vel.x * frame.dt;
                    pos.y += vel.y * frame.dt;
                }
            }
        }
    }

    #[derive(Default)]
    struct Everything;

    impl System<()> for Everything {
        fn update(&mut self, _frame: SystemFrame<'_, ()>) {}
    }

    fn orchestrator() -> Orchestrator {
        let mut ecs = Orchestrator::new(EcsConfig::with_capacity(8));
        ecs.register_component::<Position>().unwrap();
        ecs.register_component::<Velocity>().unwrap();
        ecs
    }

    #[test]
    fn test_orchestrator_creation() {
        let ecs: Orchestrator = Orchestrator::new(EcsConfig::with_capacity(100));
        assert_eq!(ecs.capacity(), 100);
        assert_eq!(ecs.alive_count(), 0);
    }

    #[test]
    fn test_try_new_rejects_zero_capacity() {
        let result = Orchestrator::<()>::try_new(EcsConfig::with_capacity(0));
        assert!(matches!(
            result,
            Err(EcsError::InvalidCapacity { requested: 0 })
        ));
        assert!(Orchestrator::<()>::try_new(EcsConfig::with_capacity(8)).is_ok());
    }

    #[test]
    fn test_add_sets_signature_bit() {
        let mut ecs = orchestrator();
        let e = ecs.create_entity().unwrap();
        ecs.add_component(e, Position { x: 1.0, y: 2.0 }).unwrap();

        let pos = ecs.component_type::<Position>().unwrap();
        assert!(ecs.signature(e).unwrap().contains(pos));
        assert!(ecs.has_component::<Position>(e).unwrap());
        assert!(!ecs.has_component::<Velocity>(e).unwrap());
    }

    #[test]
    fn test_duplicate_add_keeps_value_and_signature() {
        let mut ecs = orchestrator();
        let e = ecs.create_entity().unwrap();
        ecs.add_component(e, Position { x: 1.0, y: 0.0 }).unwrap();
        let before = ecs.signature(e).unwrap();

        let err = ecs.add_component(e, Position { x: 9.0, y: 9.0 }).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(ecs.signature(e).unwrap(), before);
        assert_eq!(ecs.get_component::<Position>(e).unwrap().x, 1.0);
    }

    #[test]
    fn test_unregistered_add_leaves_signature() {
        let mut ecs: Orchestrator = Orchestrator::new(EcsConfig::with_capacity(2));
        let e = ecs.create_entity().unwrap();

        let err = ecs.add_component(e, Position::default()).unwrap_err();
        assert!(matches!(err, EcsError::NotRegistered { .. }));
        assert_eq!(ecs.signature(e).unwrap(), Signature::EMPTY);
    }

    #[test]
    fn test_destroy_then_reuse_slot() {
        let mut ecs = orchestrator();
        ecs.create_system::<Physics, (Position, Velocity)>().unwrap();

        let e = ecs.create_entity().unwrap();
        ecs.add_component(e, Position::default()).unwrap();
        ecs.add_component(e, Velocity::default()).unwrap();
        assert!(ecs.members::<Physics>().unwrap().contains(&e));

        ecs.destroy_entity(e).unwrap();
        assert!(ecs.members::<Physics>().unwrap().is_empty());
        assert_eq!(ecs.components().row_count(ecs.component_type::<Position>().unwrap()), Some(0));

        // FIFO: burn through the other seven slots first
        let mut reused = None;
        for _ in 0..8 {
            let next = ecs.create_entity().unwrap();
            if next.index() == e.index() {
                reused = Some(next);
            }
        }
        let reused = reused.unwrap();
        assert_eq!(ecs.signature(reused).unwrap(), Signature::EMPTY);
        assert!(ecs.get_component::<Position>(reused).is_err());
        assert_eq!(ecs.signature(e), Err(EcsError::StaleEntity(e)));
    }

    #[test]
    fn test_destroy_stale_touches_nothing() {
        let mut ecs = orchestrator();
        let e = ecs.create_entity().unwrap();
        ecs.destroy_entity(e).unwrap();

        assert_eq!(ecs.destroy_entity(e), Err(EcsError::StaleEntity(e)));
        assert_eq!(ecs.alive_count(), 0);
    }

    #[test]
    fn test_update_moves_members_only() {
        let mut ecs = orchestrator();
        ecs.create_system::<Physics, (Position, Velocity)>().unwrap();

        let moving = ecs.create_entity().unwrap();
        ecs.add_component(moving, Position::default()).unwrap();
        ecs.add_component(moving, Velocity { x: 2.0, y: -1.0 }).unwrap();

        let still = ecs.create_entity().unwrap();
        ecs.add_component(still, Position::default()).unwrap();

        ecs.update_systems(0.5, &mut ());

        assert_eq!(
            *ecs.get_component::<Position>(moving).unwrap(),
            Position { x: 1.0, y: -0.5 }
        );
        assert_eq!(*ecs.get_component::<Position>(still).unwrap(), Position::default());
    }

    #[test]
    fn test_late_system_is_backfilled() {
        let mut ecs = orchestrator();
        let a = ecs.create_entity().unwrap();
        let b = ecs.create_entity().unwrap();
        ecs.add_component(a, Position::default()).unwrap();
        ecs.add_component(a, Velocity::default()).unwrap();
        ecs.add_component(b, Position::default()).unwrap();

        ecs.register_system::<Physics>().unwrap();
        // Empty requirement: everyone
        assert_eq!(ecs.members::<Physics>().unwrap().len(), 2);

        let sig = ecs.signature(a).unwrap();
        ecs.set_system_signature::<Physics>(sig).unwrap();
        let members: Vec<Entity> = ecs.members::<Physics>().unwrap().iter().copied().collect();
        assert_eq!(members, vec![a]);
    }

    #[test]
    fn test_empty_requirement_tracks_new_entities() {
        let mut ecs = orchestrator();
        ecs.create_system::<Everything, ()>().unwrap();

        let e = ecs.create_entity().unwrap();
        assert!(ecs.members::<Everything>().unwrap().contains(&e));
        ecs.destroy_entity(e).unwrap();
        assert!(ecs.members::<Everything>().unwrap().is_empty());
    }

    #[test]
    fn test_create_system_with_unregistered_type() {
        let mut ecs: Orchestrator = Orchestrator::new(EcsConfig::with_capacity(4));
        ecs.register_component::<Position>().unwrap();

        let err = ecs.create_system::<Physics, (Position, Velocity)>().unwrap_err();
        assert!(matches!(err, EcsError::NotRegistered { .. }));
        assert!(ecs.system::<Physics>().is_err());
        assert!(ecs.systems().is_empty());
    }
}

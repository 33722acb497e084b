//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into per-entity arrays and component sparse maps
//! - A generation counter for safe reuse
//!
//! The [`EntityRegistry`] hands out slots from a FIFO of free indices and owns
//! the per-slot [`Signature`].

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use super::component::Signature;
use crate::error::{EcsError, EcsResult};

/// Handle to an entity.
///
/// The handle is split into two parts:
/// - Lower 32 bits: Slot index
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Creates a handle from slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the slot index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Returns the raw packed representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index()
            .cmp(&other.index())
            .then(self.generation().cmp(&other.generation()))
    }
}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Per-slot bookkeeping.
#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    generation: u32,
    alive: bool,
    signature: Signature,
}

/// Allocates and recycles entity slots up to a fixed capacity.
///
/// All memory is reserved at construction. Freed indices go to the back of
/// the queue, so a destroyed slot is reused only after every slot freed
/// before it.
pub struct EntityRegistry {
    /// One slot per possible entity.
    slots: Box<[Slot]>,
    /// Free indices, popped from the front.
    free: VecDeque<u32>,
    /// Number of currently alive entities.
    alive_count: usize,
}

impl EntityRegistry {
    /// Creates a registry with `capacity` slots, all free.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero or exceeds `u32::MAX`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        assert!(
            u32::try_from(capacity).is_ok(),
            "Capacity cannot exceed u32::MAX"
        );

        let slots = vec![Slot::default(); capacity].into_boxed_slice();

        // Lowest index first
        let mut free = VecDeque::with_capacity(capacity);
        free.extend(0..capacity as u32);

        Self {
            slots,
            free,
            alive_count: 0,
        }
    }

    /// Maximum number of simultaneously alive entities.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Number of slots waiting in the free queue.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Allocates the slot at the front of the free queue.
    ///
    /// # Errors
    ///
    /// [`EcsError::CapacityExceeded`] when every slot is alive. The queue and
    /// live count are left untouched.
    pub fn create(&mut self) -> EcsResult<Entity> {
        if self.alive_count >= self.slots.len() {
            return Err(EcsError::CapacityExceeded {
                capacity: self.slots.len(),
            });
        }
        let Some(index) = self.free.pop_front() else {
            return Err(EcsError::CapacityExceeded {
                capacity: self.slots.len(),
            });
        };

        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        slot.signature = Signature::EMPTY;
        self.alive_count += 1;

        Ok(Entity::new(index, slot.generation))
    }

    /// Destroys an entity: clears its signature, bumps the slot generation and
    /// returns the index to the back of the free queue.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] or [`EcsError::StaleEntity`] (which also covers
    /// destroying the same handle twice).
    pub fn destroy(&mut self, entity: Entity) -> EcsResult<()> {
        let slot = self.slot_mut(entity)?;
        slot.alive = false;
        slot.signature = Signature::EMPTY;
        slot.generation = slot.generation.wrapping_add(1);

        self.free.push_back(entity.index());
        self.alive_count -= 1;
        Ok(())
    }

    /// Checks that `entity` refers to the current occupant of a live slot.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] or [`EcsError::StaleEntity`].
    pub fn validate(&self, entity: Entity) -> EcsResult<()> {
        self.slot(entity).map(|_| ())
    }

    /// Returns true if `entity` is alive and not stale.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slot(entity).is_ok()
    }

    /// Returns the entity's signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] or [`EcsError::StaleEntity`].
    pub fn signature(&self, entity: Entity) -> EcsResult<Signature> {
        self.slot(entity).map(|slot| slot.signature)
    }

    /// Overwrites the entity's signature.
    ///
    /// # Errors
    ///
    /// [`EcsError::OutOfRange`] or [`EcsError::StaleEntity`].
    pub fn set_signature(&mut self, entity: Entity, signature: Signature) -> EcsResult<()> {
        self.slot_mut(entity)?.signature = signature;
        Ok(())
    }

    /// Iterates over all alive entities with their signatures, in index order.
    pub fn iter_alive(&self) -> impl Iterator<Item = (Entity, Signature)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.alive
                .then(|| (Entity::new(index as u32, slot.generation), slot.signature))
        })
    }

    fn slot(&self, entity: Entity) -> EcsResult<&Slot> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get(entity.index() as usize)
            .ok_or(EcsError::OutOfRange {
                index: entity.index(),
                capacity,
            })?;
        if !slot.alive || slot.generation != entity.generation() {
            return Err(EcsError::StaleEntity(entity));
        }
        Ok(slot)
    }

    fn slot_mut(&mut self, entity: Entity) -> EcsResult<&mut Slot> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(entity.index() as usize)
            .ok_or(EcsError::OutOfRange {
                index: entity.index(),
                capacity,
            })?;
        if !slot.alive || slot.generation != entity.generation() {
            return Err(EcsError::StaleEntity(entity));
        }
        Ok(slot)
    }
}

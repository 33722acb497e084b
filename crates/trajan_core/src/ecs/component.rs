//! # Component Types and Signatures
//!
//! Components are plain data values with no behavior. Each registered type
//! gets a small [`ComponentTypeIndex`], which doubles as its bit in a
//! [`Signature`].

use std::fmt;

use super::registry::ComponentRegistry;
use crate::config::MAX_COMPONENT_TYPES;
use crate::error::EcsResult;

/// Marker trait for ECS components.
///
/// Implemented for every `'static` type; any plain value can be attached to
/// an entity once its type is registered.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Debug, Default)]
/// struct Position {
///     x: f32,
///     y: f32,
/// }
///
/// orchestrator.register_component::<Position>()?;
/// orchestrator.add_component(entity, Position { x: 1.0, y: 2.0 })?;
/// ```
pub trait Component: 'static {}

impl<T: 'static> Component for T {}

/// Stable small integer identifying a registered component type.
///
/// Assigned monotonically from 0 at registration and never reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentTypeIndex(u8);

impl ComponentTypeIndex {
    /// Creates a type index.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit in a signature.
    #[inline]
    #[must_use]
    pub const fn new(index: u8) -> Self {
        assert!((index as usize) < MAX_COMPONENT_TYPES, "type index out of signature range");
        Self(index)
    }

    /// Returns the index as a `usize`, for addressing store tables.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// Fixed-width bitset recording which component types an entity has.
///
/// Bit *i* is set iff the entity owns a component of type-index *i*.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Signature(u32);

impl Signature {
    /// The signature with no bits set.
    pub const EMPTY: Self = Self(0);

    /// Creates a signature from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns a copy with the bit for `ty` set.
    #[inline]
    #[must_use]
    pub const fn with(self, ty: ComponentTypeIndex) -> Self {
        Self(self.0 | (1 << ty.0))
    }

    /// Returns a copy with the bit for `ty` cleared.
    #[inline]
    #[must_use]
    pub const fn without(self, ty: ComponentTypeIndex) -> Self {
        Self(self.0 & !(1 << ty.0))
    }

    /// Sets the bit for `ty`.
    #[inline]
    pub fn insert(&mut self, ty: ComponentTypeIndex) {
        self.0 |= 1 << ty.0;
    }

    /// Clears the bit for `ty`.
    #[inline]
    pub fn remove(&mut self, ty: ComponentTypeIndex) {
        self.0 &= !(1 << ty.0);
    }

    /// Checks the bit for `ty`.
    #[inline]
    #[must_use]
    pub const fn contains(self, ty: ComponentTypeIndex) -> bool {
        self.0 & (1 << ty.0) != 0
    }

    /// Returns true if every bit of `required` is also set in `self`.
    #[inline]
    #[must_use]
    pub const fn matches(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Returns true if no bits are set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:#034b})", self.0)
    }
}

impl FromIterator<ComponentTypeIndex> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentTypeIndex>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// A list of component types, written as a tuple, whose combined signature
/// can be computed against a registry.
///
/// Used by [`Orchestrator::create_system`](crate::Orchestrator::create_system).
pub trait ComponentSet {
    /// ORs together the bits of every listed type.
    ///
    /// # Errors
    ///
    /// [`EcsError::NotRegistered`](crate::EcsError::NotRegistered) if any
    /// listed type is unregistered.
    fn signature(registry: &ComponentRegistry) -> EcsResult<Signature>;
}

impl ComponentSet for () {
    fn signature(_registry: &ComponentRegistry) -> EcsResult<Signature> {
        Ok(Signature::EMPTY)
    }
}

macro_rules! component_set {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn signature(registry: &ComponentRegistry) -> EcsResult<Signature> {
                let mut signature = Signature::EMPTY;
                $(signature.insert(registry.type_index::<$ty>()?);)+
                Ok(signature)
            }
        }
    };
}

component_set!(A);
component_set!(A, B);
component_set!(A, B, C);
component_set!(A, B, C, D);
component_set!(A, B, C, D, E);
component_set!(A, B, C, D, E, F);
component_set!(A, B, C, D, E, F, G);
component_set!(A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_bits() {
        let a = ComponentTypeIndex::new(0);
        let b = ComponentTypeIndex::new(31);

        let mut sig = Signature::EMPTY;
        assert!(sig.is_empty());

        sig.insert(a);
        sig.insert(b);
        assert!(sig.contains(a));
        assert!(sig.contains(b));
        assert_eq!(sig.len(), 2);

        sig.remove(a);
        assert!(!sig.contains(a));
        assert_eq!(sig.bits(), 1 << 31);
    }

    #[test]
    fn test_signature_matches() {
        let pos = ComponentTypeIndex::new(0);
        let vel = ComponentTypeIndex::new(1);
        let required: Signature = [pos, vel].into_iter().collect();

        assert!(!Signature::EMPTY.with(pos).matches(required));
        assert!(Signature::EMPTY.with(pos).with(vel).matches(required));
        assert!(Signature::from_bits(0b111).matches(required));
        // Everything matches the empty requirement
        assert!(Signature::EMPTY.matches(Signature::EMPTY));
    }
}

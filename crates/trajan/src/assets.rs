//! # Assets
//!
//! CPU-side records for renderer resources, shared by reference count.
//!
//! An [`AssetHandle`] is a plain copyable id, so it can live inside
//! components. Ownership is explicit: every [`AssetStore::insert`] or
//! [`AssetStore::retain`] must be matched by one [`AssetStore::release`]. The
//! release that drops the count to zero removes the asset and hands it back,
//! so the caller can free its GPU resource.

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use thiserror::Error;
use tracing::trace;

use crate::render::GpuHandle;

/// Untyped asset id, unique per store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetId(u64);

impl AssetId {
    /// Raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Typed reference to an asset of type `T`.
pub struct AssetHandle<T> {
    id: AssetId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AssetHandle<T> {
    const fn new(id: AssetId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The untyped id.
    #[inline]
    #[must_use]
    pub const fn id(self) -> AssetId {
        self.id
    }
}

impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AssetHandle<T> {}

impl<T> PartialEq for AssetHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for AssetHandle<T> {}

impl<T> std::hash::Hash for AssetHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for AssetHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = type_name::<T>().rsplit("::").next().unwrap_or("?");
        write!(f, "AssetHandle<{short}>({})", self.id.0)
    }
}

/// Asset lookup failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    /// The handle was never issued by this store, or its asset was freed.
    #[error("{type_name} asset {id:?} is not loaded")]
    NotLoaded {
        /// Asset type.
        type_name: &'static str,
        /// Offending id.
        id: AssetId,
    },
}

struct Entry<T> {
    value: T,
    refs: u32,
    name: Option<String>,
}

/// Reference-counted storage for one asset type.
pub struct AssetStore<T> {
    entries: HashMap<AssetId, Entry<T>>,
    names: HashMap<String, AssetId>,
    next_id: u64,
}

impl<T> Default for AssetStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssetStore<T> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            names: HashMap::new(),
            next_id: 1,
        }
    }

    /// Number of loaded assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stores `value` with a reference count of one.
    pub fn insert(&mut self, value: T) -> AssetHandle<T> {
        self.insert_entry(value, None)
    }

    /// Stores `value` under `name` so later loads can share it via
    /// [`find`](Self::find).
    pub fn insert_named(&mut self, name: impl Into<String>, value: T) -> AssetHandle<T> {
        let name = name.into();
        let handle = self.insert_entry(value, Some(name.clone()));
        self.names.insert(name, handle.id);
        handle
    }

    /// Looks up a named asset and takes a reference to it.
    pub fn find(&mut self, name: &str) -> Option<AssetHandle<T>> {
        let id = *self.names.get(name)?;
        let entry = self.entries.get_mut(&id)?;
        entry.refs += 1;
        Some(AssetHandle::new(id))
    }

    /// Takes another reference.
    ///
    /// # Errors
    ///
    /// [`AssetError::NotLoaded`].
    pub fn retain(&mut self, handle: AssetHandle<T>) -> Result<(), AssetError> {
        self.entry_mut(handle)?.refs += 1;
        Ok(())
    }

    /// Drops a reference. Returns the asset once the last reference is gone.
    ///
    /// # Errors
    ///
    /// [`AssetError::NotLoaded`].
    pub fn release(&mut self, handle: AssetHandle<T>) -> Result<Option<T>, AssetError> {
        let entry = self.entry_mut(handle)?;
        entry.refs -= 1;
        if entry.refs > 0 {
            return Ok(None);
        }

        let Some(entry) = self.entries.remove(&handle.id) else {
            return Ok(None);
        };
        if let Some(name) = &entry.name {
            self.names.remove(name);
        }
        trace!(asset = type_name::<T>(), id = handle.id.0, "asset freed");
        Ok(Some(entry.value))
    }

    /// The asset behind `handle`.
    ///
    /// # Errors
    ///
    /// [`AssetError::NotLoaded`].
    pub fn get(&self, handle: AssetHandle<T>) -> Result<&T, AssetError> {
        self.entries
            .get(&handle.id)
            .map(|entry| &entry.value)
            .ok_or(AssetError::NotLoaded {
                type_name: type_name::<T>(),
                id: handle.id,
            })
    }

    /// Current reference count, zero if not loaded.
    #[must_use]
    pub fn ref_count(&self, handle: AssetHandle<T>) -> u32 {
        self.entries.get(&handle.id).map_or(0, |entry| entry.refs)
    }

    /// Removes every asset regardless of reference counts.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.names.clear();
        self.entries.drain().map(|(_, entry)| entry.value)
    }

    fn insert_entry(&mut self, value: T, name: Option<String>) -> AssetHandle<T> {
        let id = AssetId(self.next_id);
        self.next_id += 1;
        self.entries.insert(id, Entry { value, refs: 1, name });
        AssetHandle::new(id)
    }

    fn entry_mut(&mut self, handle: AssetHandle<T>) -> Result<&mut Entry<T>, AssetError> {
        self.entries.get_mut(&handle.id).ok_or(AssetError::NotLoaded {
            type_name: type_name::<T>(),
            id: handle.id,
        })
    }
}

/// A mesh uploaded to the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mesh {
    /// Debug name.
    pub name: String,
    /// Vertices in the GPU buffer.
    pub vertex_count: u32,
    /// Indices in the GPU buffer.
    pub index_count: u32,
    /// Renderer resource.
    pub gpu: GpuHandle,
}

/// A compiled shader program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shader {
    /// Debug name.
    pub name: String,
    /// Renderer resource.
    pub gpu: GpuHandle,
}

/// A texture uploaded to the renderer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    /// Debug name.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Renderer resource.
    pub gpu: GpuHandle,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_counting() {
        let mut store = AssetStore::new();
        let handle = store.insert("quad");
        store.retain(handle).unwrap();
        assert_eq!(store.ref_count(handle), 2);

        assert_eq!(store.release(handle).unwrap(), None);
        assert_eq!(store.get(handle).unwrap(), &"quad");
        assert_eq!(store.release(handle).unwrap(), Some("quad"));

        assert_eq!(store.ref_count(handle), 0);
        assert!(matches!(store.get(handle), Err(AssetError::NotLoaded { .. })));
        assert!(store.release(handle).is_err());
    }

    #[test]
    fn test_named_assets_are_shared() {
        let mut store = AssetStore::new();
        let first = store.insert_named("quad", 4u32);
        let second = store.find("quad").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.ref_count(first), 2);

        store.release(first).unwrap();
        store.release(second).unwrap();
        assert!(store.find("quad").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut store = AssetStore::new();
        let a = store.insert(1);
        store.release(a).unwrap();
        let b = store.insert(2);
        assert_ne!(a, b);
        assert!(store.get(a).is_err());
    }

    #[test]
    fn test_drain() {
        let mut store = AssetStore::new();
        store.insert(1);
        store.insert_named("two", 2);
        let mut drained: Vec<i32> = store.drain().collect();
        drained.sort_unstable();
        assert_eq!(drained, vec![1, 2]);
        assert!(store.find("two").is_none());
    }
}

use core::any::TypeId;

use crate::hash::NoOpHashState;
use crate::hash::hashbrown::HashMap;
use crate::hash::hashbrown::hash_map::Entry;

// -----------------------------------------------------------------------------
// TypeIdMap

/// A map from [`TypeId`] to `V`.
///
/// A `TypeId` already is a high-quality hash, so entries are placed through
/// [`NoOpHashState`] without rehashing. The underlying table is not exposed;
/// the surface is the handful of operations the type registries in this
/// workspace need.
pub struct TypeIdMap<V> {
    entries: HashMap<TypeId, V, NoOpHashState>,
}

impl<V> TypeIdMap<V> {
    /// An empty map.
    ///
    /// # Examples
    ///
    /// ```
    /// use dp_utils::TypeIdMap;
    /// let map = TypeIdMap::<i32>::new();
    /// assert!(map.is_empty());
    /// ```
    #[inline]
    pub const fn new() -> Self {
        Self {
            entries: HashMap::with_hasher(NoOpHashState),
        }
    }

    /// An empty map with room for `capacity` entries.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity_and_hasher(capacity, NoOpHashState),
        }
    }

    /// Number of entries in the map.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The value stored for `type_id`.
    #[inline]
    pub fn get(&self, type_id: &TypeId) -> Option<&V> {
        self.entries.get(type_id)
    }

    /// The value stored for the type `T`.
    #[inline]
    pub fn get_type<T: ?Sized + 'static>(&self) -> Option<&V> {
        self.entries.get(&TypeId::of::<T>())
    }

    /// Store `value` for the type `T`, returning the displaced value when
    /// `T` was already present.
    #[inline]
    pub fn insert_type<T: ?Sized + 'static>(&mut self, value: V) -> Option<V> {
        self.entries.insert(TypeId::of::<T>(), value)
    }

    /// The value stored for `type_id`, filling a vacant entry from `f`.
    ///
    /// An existing entry is never replaced; `f` runs only when the entry is
    /// vacant.
    #[inline]
    pub fn get_or_insert(&mut self, type_id: TypeId, f: impl FnOnce() -> V) -> &mut V {
        match self.entries.entry(type_id) {
            Entry::Vacant(vacant) => vacant.insert(f()),
            Entry::Occupied(occupied) => occupied.into_mut(),
        }
    }
}

impl<V> Default for TypeIdMap<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_lookup() {
        let mut map = TypeIdMap::new();
        map.insert_type::<u8>(1);
        map.insert_type::<u16>(2);

        assert_eq!(map.get_type::<u8>(), Some(&1));
        assert_eq!(map.get_type::<u16>(), Some(&2));
        assert_eq!(map.get_type::<u32>(), None);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn get_or_insert_keeps_the_first_entry() {
        let mut map = TypeIdMap::new();
        assert_eq!(*map.get_or_insert(TypeId::of::<u8>(), || 10), 10);
        assert_eq!(*map.get_or_insert(TypeId::of::<u8>(), || 99), 10);
    }

    #[test]
    fn get_or_insert_hands_out_the_live_entry() {
        let mut map = TypeIdMap::new();
        *map.get_or_insert(TypeId::of::<u8>(), || 10) += 1;
        *map.get_or_insert(TypeId::of::<u8>(), || 99) += 1;
        assert_eq!(map.get_type::<u8>(), Some(&12));
    }
}

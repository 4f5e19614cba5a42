//! The aggregate half of the transfer protocol.
//!
//! Objects and arrays travel as keyed collections of values. [`DataReader`]
//! exposes entries of an existing aggregate, [`DataWriter`] accepts entries
//! into one being built. Keys are either names ([`String`]) or positions
//! ([`usize`]); no other key types exist in the protocol.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::error::Result;
use crate::value::{ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// DataKey

mod sealed {
    pub trait Sealed {}

    impl Sealed for alloc::string::String {}
    impl Sealed for usize {}
}

/// A key addressing one entry of an aggregate.
///
/// Implemented for [`String`] (object entries) and [`usize`] (array entries)
/// only; the trait is sealed.
pub trait DataKey: sealed::Sealed + Clone + fmt::Display + 'static {}

impl DataKey for String {}
impl DataKey for usize {}

// -----------------------------------------------------------------------------
// DataReader

/// Read access to one aggregate of an existing value.
///
/// Entry enumeration order is unspecified for named aggregates; indexed
/// aggregates enumerate `0..len`. Asking for an absent key yields `None`, not
/// an error, so consumers can probe freely.
pub trait DataReader<K: DataKey> {
    /// Number of entries in this aggregate.
    fn len(&self) -> usize;

    /// The keys of all entries.
    fn keys(&self) -> Vec<K>;

    /// A value reader positioned on the entry at `key`.
    ///
    /// Every call produces a fresh reader, so an entry may be read more than
    /// once.
    fn entry(&self, key: &K) -> Option<Box<dyn ValueReader + '_>>;

    /// The entry at `key` viewed as a named aggregate, if it is one.
    ///
    /// This hook lets path resolution descend without decomposing values.
    /// Sources that cannot offer the view return `None` and path consumers
    /// fall back to nothing, never to an error.
    fn nested_named(&self, key: &K) -> Option<Box<dyn DataReader<String> + '_>> {
        let _ = key;
        None
    }

    /// The entry at `key` viewed as an indexed aggregate, if it is one.
    fn nested_indexed(&self, key: &K) -> Option<Box<dyn DataReader<usize> + '_>> {
        let _ = key;
        None
    }
}

impl<K: DataKey, T: DataReader<K> + ?Sized> DataReader<K> for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn keys(&self) -> Vec<K> {
        (**self).keys()
    }

    fn entry(&self, key: &K) -> Option<Box<dyn ValueReader + '_>> {
        (**self).entry(key)
    }

    fn nested_named(&self, key: &K) -> Option<Box<dyn DataReader<String> + '_>> {
        (**self).nested_named(key)
    }

    fn nested_indexed(&self, key: &K) -> Option<Box<dyn DataReader<usize> + '_>> {
        (**self).nested_indexed(key)
    }
}

// -----------------------------------------------------------------------------
// DataWriter

/// Write access to one aggregate of a value being built.
pub trait DataWriter<K: DataKey> {
    /// Reset the aggregate before filling it, optionally reserving room.
    ///
    /// Writers that build up state lazily may treat this as a no-op; that is
    /// the default.
    fn initialize(&mut self, capacity: Option<usize>) -> Result<()> {
        let _ = capacity;
        Ok(())
    }

    /// Number of entries currently present.
    fn len(&self) -> usize;

    /// The keys of all entries currently present.
    fn keys(&self) -> Vec<K>;

    /// A value writer positioned on the entry at `key`, creating the slot on
    /// demand where the aggregate allows it.
    ///
    /// Writing to the returned writer replaces the entry.
    fn entry(&mut self, key: &K) -> Option<Box<dyn ValueWriter + '_>>;

    /// The entry at `key` viewed as a named aggregate for writing, created on
    /// demand where possible.
    fn nested_named(&mut self, key: &K) -> Option<Box<dyn DataWriter<String> + '_>> {
        let _ = key;
        None
    }

    /// The entry at `key` viewed as an indexed aggregate for writing, created
    /// on demand where possible.
    fn nested_indexed(&mut self, key: &K) -> Option<Box<dyn DataWriter<usize> + '_>> {
        let _ = key;
        None
    }
}

impl<K: DataKey, T: DataWriter<K> + ?Sized> DataWriter<K> for &mut T {
    fn initialize(&mut self, capacity: Option<usize>) -> Result<()> {
        (**self).initialize(capacity)
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn keys(&self) -> Vec<K> {
        (**self).keys()
    }

    fn entry(&mut self, key: &K) -> Option<Box<dyn ValueWriter + '_>> {
        (**self).entry(key)
    }

    fn nested_named(&mut self, key: &K) -> Option<Box<dyn DataWriter<String> + '_>> {
        (**self).nested_named(key)
    }

    fn nested_indexed(&mut self, key: &K) -> Option<Box<dyn DataWriter<usize> + '_>> {
        (**self).nested_indexed(key)
    }
}

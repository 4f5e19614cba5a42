//! Containers for static storage of shapes.
//!
//! Non-generic types store their [`Shape`] in a [`NonGenericShapeCell`], a
//! thin wrapper over [`OnceLock`].
//!
//! If the type is generic, the `static CELL` inside `shape()` is shared by
//! every instantiation, so [`GenericShapeCell`] keys the stored shapes by
//! `TypeId` behind an [`RwLock`].

use alloc::boxed::Box;
use core::any::{Any, TypeId};
use std::sync::{OnceLock, PoisonError, RwLock};

use dp_utils::TypeIdMap;

use super::Shape;

/// Static storage for the shape of one non-generic type.
pub struct NonGenericShapeCell(OnceLock<Shape>);

impl NonGenericShapeCell {
    /// Create an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the stored shape, building it on first use.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &Shape
    where
        F: FnOnce() -> Shape,
    {
        self.0.get_or_init(f)
    }
}

impl Default for NonGenericShapeCell {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Static storage for the shapes of a generic type's instantiations.
pub struct GenericShapeCell(RwLock<TypeIdMap<&'static Shape>>);

impl GenericShapeCell {
    /// Create an empty cell.
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(TypeIdMap::new()))
    }

    /// Returns the shape stored for `G`, building it on first use.
    #[inline(always)]
    pub fn get_or_insert<G: Any + ?Sized>(&self, f: impl FnOnce() -> Shape) -> &'static Shape {
        // Separate to reduce code compilation times
        self.get_or_insert_by_type_id(TypeId::of::<G>(), f)
    }

    // Separate to reduce code compilation times
    #[inline(never)]
    fn get_or_insert_by_type_id(
        &self,
        type_id: TypeId,
        f: impl FnOnce() -> Shape,
    ) -> &'static Shape {
        match self.get_by_type_id(type_id) {
            Some(shape) => shape,
            None => self.insert_by_type_id(type_id, f()),
        }
    }

    // Separate to reduce code compilation times
    #[inline(never)]
    fn get_by_type_id(&self, type_id: TypeId) -> Option<&'static Shape> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .copied()
    }

    // Separate to reduce code compilation times
    #[inline(never)]
    fn insert_by_type_id(&self, type_id: TypeId, shape: Shape) -> &'static Shape {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(type_id, || Box::leak(Box::new(shape)))
    }
}

impl Default for GenericShapeCell {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

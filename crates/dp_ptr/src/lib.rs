//! Type-erased pointer wrappers for member access without monomorphized types.
//!
//! Member accessors address a field as "base pointer plus byte offset" where the
//! field type is only known inside a handful of monomorphized helper functions.
//! Raw pointers would work, but they drop the lifetime of the borrow they came
//! from. [`Ptr<'a>`] and [`PtrMut<'a>`] keep that lifetime attached, so the
//! borrow checker still rules out use-after-free, and the remaining obligations
//! (type and alignment) are concentrated in the few `unsafe` conversions.
//!
//! [`Ptr<'a>`] is the erased equivalent of `&'a T`, [`PtrMut<'a>`] of
//! `&'a mut T`.
#![expect(unsafe_code, reason = "Raw pointers are inherently unsafe.")]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// Modules

mod erased;

// -----------------------------------------------------------------------------
// Top-level exports

pub use erased::{Ptr, PtrMut};

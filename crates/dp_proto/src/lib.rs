#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

pub mod access;
pub mod convert;
pub mod data;
pub mod error;
pub mod mem;
pub mod path;
pub mod scratch;
pub mod shape;
pub mod strategy;
pub mod value;

#[cfg(feature = "serde")]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub mod serde;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use access::FastAccessor;
pub use data::{DataReader, DataWriter};
pub use error::{Error, Result};
pub use path::{Path, PathKey};
pub use shape::{Shape, Shaped};
pub use strategy::{Strategy, StrategyMapper, TypeStrategy, register_mapper};
pub use value::{ValueKind, ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// Macro support

// Not public API; referenced by the expansion of the `impl_*_shape!` and
// `register_mapper!` macros.
#[doc(hidden)]
pub mod __private {
    pub use alloc::boxed::Box;
    pub use std::sync::OnceLock;

    #[cfg(feature = "auto_register")]
    pub use inventory;
}

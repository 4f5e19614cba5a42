//! Shared containers and hashing for the transfer protocol crates.
//!
//! - [`TypeIdMap`]: a map keyed by [`TypeId`](core::any::TypeId), backed by a
//!   pass-through hasher since `TypeId` is already a high-quality hash.
//! - [`hash`]: fixed-seed hashing so results are stable across runs, plus
//!   re-exports of *hashbrown* and *foldhash*.
//! - [`vec`]: re-exports of *fastvec*'s small-size-optimized vectors.
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// No STD Support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod typeid_map;

pub mod hash;
pub mod vec;

// -----------------------------------------------------------------------------
// Top-level exports

pub use typeid_map::TypeIdMap;

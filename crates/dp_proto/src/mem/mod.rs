//! The in-memory reference codec.
//!
//! [`MemValue`] is a plain tree mirroring the protocol's data model one to
//! one: the closed scalar set, objects, arrays and the empty value.
//! [`MemWriter`] collects protocol writes into such trees, [`MemReader`]
//! replays them. Every other codec can be checked against this one, and the
//! protocol itself uses it for staging and as the raw-value escape hatch.

mod reader;
mod value;
mod writer;

pub use reader::{MemArrayReader, MemObjectReader, MemReader};
pub use value::MemValue;
pub use writer::{MemArrayWriter, MemObjectWriter, MemSlotWriter, MemWriter};

//! The built-in links of the resolution chain.
//!
//! Each mapper claims one shape category and lifts the shape's transfer
//! functions into a strategy. They sit at the bottom of the chain, so any
//! registered mapper can shadow them.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use core::any::Any;

use crate::error::{Error, Result};
use crate::shape::{Shape, ShapeKind};
use crate::strategy::resolve::{MapTarget, StrategyMapper};
use crate::strategy::{ErasedStrategy, FnStrategy};
use crate::value::{ValueKind, ValueReader, ValueWriter};

macro_rules! shape_fn_mapper {
    ($(#[$doc:meta])* $mapper:ident => $kind:ident) => {
        $(#[$doc])*
        pub struct $mapper;

        impl StrategyMapper for $mapper {
            fn try_map(&self, target: &MapTarget) -> Option<Arc<dyn ErasedStrategy>> {
                match target.shape.kind() {
                    ShapeKind::$kind(ops) => Some(Arc::new(FnStrategy {
                        read: ops.read,
                        write: ops.write,
                    })),
                    _ => None,
                }
            }
        }
    };
}

shape_fn_mapper! {
    /// Claims every scalar shape.
    ScalarMapper => Scalar
}

shape_fn_mapper! {
    /// Claims tuples, transferred as sequential values.
    TupleMapper => Tuple
}

shape_fn_mapper! {
    /// Claims `Option`-like shapes.
    OptionalMapper => Optional
}

shape_fn_mapper! {
    /// Claims homogeneous sequences.
    SequenceMapper => Sequence
}

shape_fn_mapper! {
    /// Claims string-keyed mappings.
    MappingMapper => Mapping
}

// -----------------------------------------------------------------------------
// EnumMapper

/// Claims fieldless enums, transferred as their variant name.
pub struct EnumMapper;

impl StrategyMapper for EnumMapper {
    fn try_map(&self, target: &MapTarget) -> Option<Arc<dyn ErasedStrategy>> {
        match target.shape.kind() {
            ShapeKind::Enum(_) => Some(Arc::new(EnumStrategy {
                shape: target.shape,
            })),
            _ => None,
        }
    }
}

struct EnumStrategy {
    shape: &'static Shape,
}

impl ErasedStrategy for EnumStrategy {
    fn read_boxed(&self, reader: &mut dyn ValueReader) -> Result<Box<dyn Any>> {
        let ShapeKind::Enum(shape) = self.shape.kind() else {
            return Err(Error::strategy_resolution(
                self.shape.ty().name(),
                "enum strategy attached to a non-enum shape",
            ));
        };
        if reader.kind() == ValueKind::Empty {
            reader.read_empty()?;
            return self.shape.default_value().ok_or_else(|| {
                Error::strategy_resolution(self.shape.ty().name(), "enum has no default variant")
            });
        }
        let name: String = reader.read_str()?;
        shape.from_name(&name).ok_or_else(|| {
            Error::custom(format!(
                "`{name}` is not a variant of `{}`",
                self.shape.ty().name()
            ))
        })
    }

    fn write_boxed(&self, writer: &mut dyn ValueWriter, value: &dyn Any) -> Result<()> {
        let ShapeKind::Enum(shape) = self.shape.kind() else {
            return Err(Error::strategy_resolution(
                self.shape.ty().name(),
                "enum strategy attached to a non-enum shape",
            ));
        };
        writer.write_str(shape.to_name(value)?)
    }
}

// -----------------------------------------------------------------------------
// Auto-registration

/// A mapper queued for the chain at startup.
///
/// Collected when the `auto_register` feature is enabled; the chain picks
/// these up the first time a strategy resolves.
pub struct MapperRegistration {
    pub ctor: fn() -> Box<dyn StrategyMapper>,
}

#[cfg(feature = "auto_register")]
inventory::collect!(MapperRegistration);

/// Registers a [`StrategyMapper`](crate::strategy::StrategyMapper) at
/// startup, without a call at run time.
///
/// ```ignore
/// register_mapper!(MyMapper);
/// ```
#[cfg(feature = "auto_register")]
#[macro_export]
macro_rules! register_mapper {
    ($mapper:expr) => {
        $crate::__private::inventory::submit! {
            $crate::strategy::MapperRegistration {
                ctor: || $crate::__private::Box::new($mapper),
            }
        }
    };
}

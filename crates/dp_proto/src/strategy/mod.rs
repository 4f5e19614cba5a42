//! Transfer strategies: how a type moves through a value stream.
//!
//! A [`Strategy<T>`] pairs a read with a write for one type. Strategies are
//! resolved through an ordered chain of [`StrategyMapper`]s, cached per type,
//! and reached through the [`TypeStrategy`] entry points. Types no mapper
//! claims fall back to the struct [`ObjectStrategy`].

mod mappers;
mod object;
mod resolve;

pub use mappers::{
    EnumMapper, MapperRegistration, MappingMapper, OptionalMapper, ScalarMapper, SequenceMapper,
    TupleMapper,
};
pub use object::{MapSource, ObjectStrategy, SliceSource, StrategyReader, StructSource};
pub use resolve::{MapTarget, StrategyMapper, TypeStrategy, register_mapper};

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::{Any, type_name};
use core::marker::PhantomData;

use crate::error::{Error, Result};
use crate::shape::{ReadFn, WriteFn};
use crate::value::{ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// Strategy

/// Reads and writes values of `T` on a value stream.
pub trait Strategy<T>: Send + Sync + 'static {
    fn read(&self, reader: &mut dyn ValueReader) -> Result<T>;

    fn write(&self, writer: &mut dyn ValueWriter, value: &T) -> Result<()>;
}

/// A [`Strategy`] with its value type erased, as stored in the cache.
pub trait ErasedStrategy: Send + Sync {
    fn read_boxed(&self, reader: &mut dyn ValueReader) -> Result<Box<dyn Any>>;

    fn write_boxed(&self, writer: &mut dyn ValueWriter, value: &dyn Any) -> Result<()>;
}

struct Erase<T, S> {
    inner: S,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static, S: Strategy<T>> ErasedStrategy for Erase<T, S> {
    fn read_boxed(&self, reader: &mut dyn ValueReader) -> Result<Box<dyn Any>> {
        self.inner.read(reader).map(|v| Box::new(v) as Box<dyn Any>)
    }

    fn write_boxed(&self, writer: &mut dyn ValueWriter, value: &dyn Any) -> Result<()> {
        let value = value
            .downcast_ref::<T>()
            .ok_or_else(|| Error::target_mismatch(type_name::<T>(), "value of a different type"))?;
        self.inner.write(writer, value)
    }
}

/// Erase a typed strategy for storage in the resolution cache.
pub fn erase<T: 'static>(strategy: impl Strategy<T>) -> Arc<dyn ErasedStrategy> {
    Arc::new(Erase {
        inner: strategy,
        _marker: PhantomData,
    })
}

// -----------------------------------------------------------------------------
// FnStrategy

/// A strategy built from two plain transfer functions, as found on shapes.
pub struct FnStrategy {
    pub read: ReadFn,
    pub write: WriteFn,
}

impl ErasedStrategy for FnStrategy {
    #[inline]
    fn read_boxed(&self, reader: &mut dyn ValueReader) -> Result<Box<dyn Any>> {
        (self.read)(reader)
    }

    #[inline]
    fn write_boxed(&self, writer: &mut dyn ValueWriter, value: &dyn Any) -> Result<()> {
        (self.write)(writer, value)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::{MemReader, MemValue, MemWriter};

    struct DoublingStrategy;

    impl Strategy<u32> for DoublingStrategy {
        fn read(&self, reader: &mut dyn ValueReader) -> Result<u32> {
            reader.read_u32().map(|v| v / 2)
        }

        fn write(&self, writer: &mut dyn ValueWriter, value: &u32) -> Result<()> {
            writer.write_u32(value * 2)
        }
    }

    #[test]
    fn erased_strategy_round_trip() {
        let strategy = erase(DoublingStrategy);

        let mut writer = MemWriter::new();
        strategy.write_boxed(&mut writer, &21u32).unwrap();
        let value = writer.into_single().unwrap();
        assert_eq!(value, MemValue::U32(42));

        let mut reader = MemReader::single(&value);
        let back = strategy.read_boxed(&mut reader).unwrap();
        assert_eq!(back.downcast_ref::<u32>(), Some(&21));
    }

    #[test]
    fn erased_strategy_rejects_foreign_values() {
        let strategy = erase(DoublingStrategy);
        let mut writer = MemWriter::new();
        assert!(strategy.write_boxed(&mut writer, &"nope").is_err());
    }
}

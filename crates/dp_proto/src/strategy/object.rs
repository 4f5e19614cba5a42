//! The struct fallback strategy and the lazy sources backing it.
//!
//! When no mapper claims a type, [`ObjectStrategy`] transfers it as an
//! object: one entry per field, each moved by the field's own resolved
//! strategy through its accessor. [`StrategyReader`] exposes a single value
//! behind a strategy as a [`ValueReader`] without materializing it unless a
//! codec actually asks for pieces.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::data::DataReader;
use crate::error::{Error, Result};
use crate::mem::{MemArrayReader, MemObjectReader, MemValue, MemWriter};
use crate::shape::{FieldShape, Shape, ShapeKind, Shaped};
use crate::strategy::resolve::{MapTarget, TypeStrategy};
use crate::strategy::ErasedStrategy;
use crate::value::{ValueKind, ValueReader, ValueWriter, kind_mismatch};

// -----------------------------------------------------------------------------
// ObjectStrategy

/// Transfers a struct as an object of its fields.
///
/// Reading starts from the type's `Default` instance; absent entries keep
/// their default value, and an empty value reads as the default instance
/// itself.
pub struct ObjectStrategy {
    shape: &'static Shape,
}

impl ObjectStrategy {
    /// The fallback strategy for `target`, when it is an eligible struct.
    pub fn try_new(target: &MapTarget) -> Result<Arc<dyn ErasedStrategy>> {
        match target.shape.kind() {
            ShapeKind::Struct(_) if target.shape.default_fn().is_some() => {
                Ok(Arc::new(ObjectStrategy {
                    shape: target.shape,
                }))
            }
            ShapeKind::Struct(_) => Err(Error::strategy_resolution(
                target.ty.name(),
                "struct has no default constructor",
            )),
            _ => Err(Error::strategy_resolution(
                target.ty.name(),
                "no mapper claimed the type and it is not a struct",
            )),
        }
    }

    fn fields(&self) -> &'static [FieldShape] {
        match self.shape.kind() {
            ShapeKind::Struct(shape) => shape.fields(),
            _ => &[],
        }
    }
}

impl ErasedStrategy for ObjectStrategy {
    fn read_boxed(&self, reader: &mut dyn ValueReader) -> Result<Box<dyn Any>> {
        let mut instance = self.shape.default_value().ok_or_else(|| {
            Error::strategy_resolution(self.shape.ty().name(), "struct has no default constructor")
        })?;
        if reader.kind() == ValueKind::Empty {
            reader.read_empty()?;
            return Ok(instance);
        }
        let source = reader.read_object()?;
        for field in self.fields() {
            // An absent entry keeps the field's default.
            let Some(mut entry) = source.entry(&field.name().to_string()) else {
                continue;
            };
            let value = field.strategy()?.read_boxed(entry.as_mut())?;
            field.accessor().set_value(instance.as_mut(), value)?;
        }
        Ok(instance)
    }

    fn write_boxed(&self, writer: &mut dyn ValueWriter, value: &dyn Any) -> Result<()> {
        if !self.shape.ty().is(value) {
            return Err(Error::target_mismatch(
                self.shape.ty().name(),
                "value of a different type",
            ));
        }
        writer.write_object(&StructSource::new(value, self.fields()))
    }
}

// -----------------------------------------------------------------------------
// StrategyReader

/// A [`ValueReader`] over one value that lives behind a strategy.
///
/// The cheap path is [`transfer_to`](ValueReader::transfer_to), which runs
/// the strategy's write directly against the destination. Piecewise reads
/// stage the value through a [`MemWriter`] first.
pub struct StrategyReader<'a> {
    kind: ValueKind,
    emit: Box<dyn Fn(&mut dyn ValueWriter) -> Result<()> + 'a>,
    staged: Option<MemValue>,
}

impl<'a> StrategyReader<'a> {
    /// A reader over `value`, moved by its type's resolved strategy.
    pub fn for_value<T: Shaped>(value: &'a T) -> Self {
        Self {
            kind: T::shape().value_kind(),
            emit: Box::new(move |writer| TypeStrategy::<T>::write(writer, value)),
            staged: None,
        }
    }

    /// A reader over one field of `owner`.
    pub(crate) fn for_field(owner: &'a dyn Any, field: &'static FieldShape) -> Self {
        Self {
            kind: field.shape().value_kind(),
            emit: Box::new(move |writer| {
                let value = field.accessor().get_value(owner)?;
                field.strategy()?.write_boxed(writer, value.as_ref())
            }),
            staged: None,
        }
    }

    fn stage(&mut self) -> Result<()> {
        if self.staged.is_none() {
            let mut writer = MemWriter::new();
            (self.emit)(&mut writer)?;
            self.staged = Some(writer.into_slot());
        }
        Ok(())
    }

    fn take(&mut self) -> Result<MemValue> {
        self.stage()?;
        self.staged.take().ok_or(Error::EndOfStream)
    }
}

macro_rules! staged_read_scalar {
    ($($fn:ident -> $t:ty = $variant:ident / $name:literal),+ $(,)?) => {$(
        fn $fn(&mut self) -> Result<$t> {
            match self.take()? {
                MemValue::$variant(v) => Ok(v),
                other => Err(kind_mismatch($name, other.kind())),
            }
        }
    )+};
}

impl ValueReader for StrategyReader<'_> {
    fn kind(&self) -> ValueKind {
        match &self.staged {
            Some(value) => value.kind(),
            None => self.kind,
        }
    }

    staged_read_scalar! {
        read_bool -> bool = Bool / "bool",
        read_i8 -> i8 = I8 / "i8",
        read_i16 -> i16 = I16 / "i16",
        read_i32 -> i32 = I32 / "i32",
        read_i64 -> i64 = I64 / "i64",
        read_i128 -> i128 = I128 / "i128",
        read_u8 -> u8 = U8 / "u8",
        read_u16 -> u16 = U16 / "u16",
        read_u32 -> u32 = U32 / "u32",
        read_u64 -> u64 = U64 / "u64",
        read_u128 -> u128 = U128 / "u128",
        read_f32 -> f32 = F32 / "f32",
        read_f64 -> f64 = F64 / "f64",
        read_decimal -> Decimal = Decimal / "decimal",
        read_char -> char = Char / "char",
        read_str -> String = Str / "str",
        read_datetime -> DateTime<Utc> = DateTime / "datetime",
    }

    fn read_empty(&mut self) -> Result<()> {
        match self.take()? {
            MemValue::Empty => Ok(()),
            other => Err(kind_mismatch("empty", other.kind())),
        }
    }

    fn read_object(&mut self) -> Result<Box<dyn DataReader<String> + '_>> {
        self.stage()?;
        match self.staged.as_ref() {
            Some(MemValue::Object(entries)) => Ok(Box::new(MemObjectReader::new(entries))),
            Some(other) => Err(kind_mismatch("object", other.kind())),
            None => Err(Error::EndOfStream),
        }
    }

    fn read_array(&mut self) -> Result<Box<dyn DataReader<usize> + '_>> {
        self.stage()?;
        match self.staged.as_ref() {
            Some(MemValue::Array(items)) => Ok(Box::new(MemArrayReader::new(items))),
            Some(other) => Err(kind_mismatch("array", other.kind())),
            None => Err(Error::EndOfStream),
        }
    }

    fn read_raw(&mut self) -> Result<MemValue> {
        self.take()
    }

    fn transfer_to(&mut self, writer: &mut dyn ValueWriter) -> Result<()> {
        match &self.staged {
            Some(value) => writer.write_raw(value),
            None => (self.emit)(writer),
        }
    }
}

// -----------------------------------------------------------------------------
// StructSource

/// A [`DataReader`] over a struct's fields, read through their accessors.
pub struct StructSource<'a> {
    value: &'a dyn Any,
    fields: &'static [FieldShape],
}

impl<'a> StructSource<'a> {
    pub fn new(value: &'a dyn Any, fields: &'static [FieldShape]) -> Self {
        Self { value, fields }
    }
}

impl DataReader<String> for StructSource<'_> {
    fn len(&self) -> usize {
        self.fields.len()
    }

    fn keys(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name().to_string()).collect()
    }

    fn entry(&self, key: &String) -> Option<Box<dyn ValueReader + '_>> {
        let field = self.fields.iter().find(|f| f.name() == key)?;
        Some(Box::new(StrategyReader::for_field(self.value, field)))
    }
}

// -----------------------------------------------------------------------------
// SliceSource

/// A [`DataReader`] over a slice, one strategy-backed entry per item.
pub struct SliceSource<'a, T> {
    items: &'a [T],
}

impl<'a, T> SliceSource<'a, T> {
    #[inline]
    pub fn new(items: &'a [T]) -> Self {
        Self { items }
    }
}

impl<T: Shaped> DataReader<usize> for SliceSource<'_, T> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn keys(&self) -> Vec<usize> {
        (0..self.items.len()).collect()
    }

    fn entry(&self, key: &usize) -> Option<Box<dyn ValueReader + '_>> {
        self.items
            .get(*key)
            .map(|item| Box::new(StrategyReader::for_value(item)) as Box<dyn ValueReader>)
    }
}

// -----------------------------------------------------------------------------
// MapSource

/// A [`DataReader`] over borrowed map entries.
pub struct MapSource<'a, V> {
    entries: Vec<(&'a String, &'a V)>,
}

impl<'a, V> MapSource<'a, V> {
    pub fn new(entries: impl Iterator<Item = (&'a String, &'a V)>) -> Self {
        Self {
            entries: entries.collect(),
        }
    }
}

impl<V: Shaped> DataReader<String> for MapSource<'_, V> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(key, _)| (*key).clone()).collect()
    }

    fn entry(&self, key: &String) -> Option<Box<dyn ValueReader + '_>> {
        self.entries
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| Box::new(StrategyReader::for_value(*value)) as Box<dyn ValueReader>)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemReader;
    use alloc::vec;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Reading {
        channel: u8,
        label: String,
        samples: Vec<i16>,
    }

    crate::impl_struct_shape!(Reading {
        channel: u8,
        label: String,
        samples: Vec<i16>,
    });

    fn sample() -> Reading {
        Reading {
            channel: 3,
            label: "left".into(),
            samples: vec![-1, 0, 1],
        }
    }

    #[test]
    fn struct_writes_as_an_object() {
        let mut writer = MemWriter::new();
        TypeStrategy::<Reading>::write(&mut writer, &sample()).unwrap();
        let value = writer.into_single().unwrap();
        assert_eq!(value.get("channel"), Some(&MemValue::U8(3)));
        assert_eq!(value.get("label"), Some(&MemValue::from("left")));
        assert_eq!(
            value.get("samples"),
            Some(&MemValue::Array(vec![
                MemValue::I16(-1),
                MemValue::I16(0),
                MemValue::I16(1),
            ]))
        );
    }

    #[test]
    fn struct_round_trip() {
        let mut writer = MemWriter::new();
        TypeStrategy::<Reading>::write(&mut writer, &sample()).unwrap();
        let value = writer.into_single().unwrap();
        let mut reader = MemReader::single(&value);
        assert_eq!(TypeStrategy::<Reading>::read(&mut reader).unwrap(), sample());
    }

    #[test]
    fn absent_entries_keep_defaults() {
        let value = MemValue::Object(vec![("channel".into(), MemValue::U8(9))]);
        let mut reader = MemReader::single(&value);
        let reading = TypeStrategy::<Reading>::read(&mut reader).unwrap();
        assert_eq!(reading.channel, 9);
        assert_eq!(reading.label, "");
        assert!(reading.samples.is_empty());
    }

    #[test]
    fn empty_reads_as_the_default_instance() {
        let value = MemValue::Empty;
        let mut reader = MemReader::single(&value);
        assert_eq!(
            TypeStrategy::<Reading>::read(&mut reader).unwrap(),
            Reading::default()
        );
    }

    #[test]
    fn strategy_reader_stages_on_demand() {
        let reading = sample();
        let mut reader = StrategyReader::for_value(&reading);
        assert_eq!(reader.kind(), ValueKind::Object);
        let object = reader.read_object().unwrap();
        let mut entry = object.entry(&"channel".to_string()).unwrap();
        assert_eq!(entry.read_u8().unwrap(), 3);
    }

    #[test]
    fn strategy_reader_reports_mismatches() {
        let value = 5u32;
        let mut reader = StrategyReader::for_value(&value);
        match reader.read_str() {
            Err(Error::TargetMismatch { expected, received }) => {
                assert_eq!(expected, "str");
                assert_eq!(received, "u32");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

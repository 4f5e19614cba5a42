use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::data::{DataReader, DataWriter};
use crate::error::{Error, Result};
use crate::mem::MemValue;
use crate::value::{ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// Collection helpers

/// Drain a named source into an object tree.
pub(crate) fn collect_object(source: &dyn DataReader<String>) -> Result<MemValue> {
    let mut entries = Vec::with_capacity(source.len());
    for key in source.keys() {
        if let Some(mut entry) = source.entry(&key) {
            let mut nested = MemWriter::new();
            entry.transfer_to(&mut nested)?;
            entries.push((key, nested.into_slot()));
        }
    }
    Ok(MemValue::Object(entries))
}

/// Drain an indexed source into an array tree.
pub(crate) fn collect_array(source: &dyn DataReader<usize>) -> Result<MemValue> {
    let len = source.len();
    let mut items = Vec::with_capacity(len);
    for index in 0..len {
        match source.entry(&index) {
            Some(mut entry) => {
                let mut nested = MemWriter::new();
                entry.transfer_to(&mut nested)?;
                items.push(nested.into_slot());
            }
            None => items.push(MemValue::Empty),
        }
    }
    Ok(MemValue::Array(items))
}

// -----------------------------------------------------------------------------
// MemWriter

/// Collects a value stream into [`MemValue`] trees.
///
/// Each write appends one root. A writer that received several roots (a tuple
/// written at top level, for example) folds them into an array when collapsed
/// with [`into_slot`](MemWriter::into_slot).
///
/// # Examples
///
/// ```
/// use dp_proto::mem::{MemValue, MemWriter};
/// use dp_proto::value::ValueWriter;
///
/// let mut writer = MemWriter::new();
/// writer.write_i32(5).unwrap();
/// assert_eq!(writer.into_single().unwrap(), MemValue::I32(5));
/// ```
#[derive(Default)]
pub struct MemWriter {
    roots: Vec<MemValue>,
}

impl MemWriter {
    #[inline]
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    /// The roots written so far.
    #[inline]
    pub fn values(&self) -> &[MemValue] {
        &self.roots
    }

    /// All roots, in write order.
    #[inline]
    pub fn into_values(self) -> Vec<MemValue> {
        self.roots
    }

    /// The single root, erroring when zero or several were written.
    pub fn into_single(self) -> Result<MemValue> {
        let mut roots = self.roots;
        match roots.len() {
            1 => match roots.pop() {
                Some(value) => Ok(value),
                None => Err(Error::EndOfStream),
            },
            0 => Err(Error::EndOfStream),
            _ => Err(Error::custom("several root values were written")),
        }
    }

    /// Collapse the roots into one value for a single slot.
    ///
    /// Zero roots become [`MemValue::Empty`], several become an array.
    pub fn into_slot(self) -> MemValue {
        let mut roots = self.roots;
        match roots.len() {
            0 => MemValue::Empty,
            1 => match roots.pop() {
                Some(value) => value,
                None => MemValue::Empty,
            },
            _ => MemValue::Array(roots),
        }
    }

    #[inline]
    fn push(&mut self, value: MemValue) -> Result<()> {
        self.roots.push(value);
        Ok(())
    }
}

macro_rules! mem_write_scalar {
    ($($fn:ident($t:ty) = $variant:ident),+ $(,)?) => {
        $(
            fn $fn(&mut self, value: $t) -> Result<()> {
                self.push(MemValue::$variant(value))
            }
        )+
    };
}

impl ValueWriter for MemWriter {
    mem_write_scalar! {
        write_bool(bool) = Bool,
        write_i8(i8) = I8,
        write_i16(i16) = I16,
        write_i32(i32) = I32,
        write_i64(i64) = I64,
        write_i128(i128) = I128,
        write_u8(u8) = U8,
        write_u16(u16) = U16,
        write_u32(u32) = U32,
        write_u64(u64) = U64,
        write_u128(u128) = U128,
        write_f32(f32) = F32,
        write_f64(f64) = F64,
        write_decimal(Decimal) = Decimal,
        write_char(char) = Char,
        write_datetime(DateTime<Utc>) = DateTime,
    }

    fn write_str(&mut self, value: &str) -> Result<()> {
        self.push(MemValue::Str(value.into()))
    }

    fn write_empty(&mut self) -> Result<()> {
        self.push(MemValue::Empty)
    }

    fn write_object(&mut self, source: &dyn DataReader<String>) -> Result<()> {
        let object = collect_object(source)?;
        self.push(object)
    }

    fn write_array(&mut self, source: &dyn DataReader<usize>) -> Result<()> {
        let array = collect_array(source)?;
        self.push(array)
    }

    fn write_raw(&mut self, value: &MemValue) -> Result<()> {
        self.push(value.clone())
    }
}

// -----------------------------------------------------------------------------
// MemSlotWriter

/// A [`ValueWriter`] replacing one slot of a tree.
pub struct MemSlotWriter<'a> {
    slot: &'a mut MemValue,
}

impl<'a> MemSlotWriter<'a> {
    #[inline]
    pub fn new(slot: &'a mut MemValue) -> Self {
        Self { slot }
    }

    #[inline]
    fn set(&mut self, value: MemValue) -> Result<()> {
        *self.slot = value;
        Ok(())
    }
}

macro_rules! slot_write_scalar {
    ($($fn:ident($t:ty) = $variant:ident),+ $(,)?) => {
        $(
            fn $fn(&mut self, value: $t) -> Result<()> {
                self.set(MemValue::$variant(value))
            }
        )+
    };
}

impl ValueWriter for MemSlotWriter<'_> {
    slot_write_scalar! {
        write_bool(bool) = Bool,
        write_i8(i8) = I8,
        write_i16(i16) = I16,
        write_i32(i32) = I32,
        write_i64(i64) = I64,
        write_i128(i128) = I128,
        write_u8(u8) = U8,
        write_u16(u16) = U16,
        write_u32(u32) = U32,
        write_u64(u64) = U64,
        write_u128(u128) = U128,
        write_f32(f32) = F32,
        write_f64(f64) = F64,
        write_decimal(Decimal) = Decimal,
        write_char(char) = Char,
        write_datetime(DateTime<Utc>) = DateTime,
    }

    fn write_str(&mut self, value: &str) -> Result<()> {
        self.set(MemValue::Str(value.into()))
    }

    fn write_empty(&mut self) -> Result<()> {
        self.set(MemValue::Empty)
    }

    fn write_object(&mut self, source: &dyn DataReader<String>) -> Result<()> {
        let object = collect_object(source)?;
        self.set(object)
    }

    fn write_array(&mut self, source: &dyn DataReader<usize>) -> Result<()> {
        let array = collect_array(source)?;
        self.set(array)
    }

    fn write_raw(&mut self, value: &MemValue) -> Result<()> {
        self.set(value.clone())
    }
}

// -----------------------------------------------------------------------------
// MemObjectWriter

/// A [`DataWriter`] filling the entries of a [`MemValue::Object`].
pub struct MemObjectWriter<'a> {
    entries: &'a mut Vec<(String, MemValue)>,
}

impl<'a> MemObjectWriter<'a> {
    #[inline]
    pub fn new(entries: &'a mut Vec<(String, MemValue)>) -> Self {
        Self { entries }
    }

    fn slot(&mut self, key: &str) -> usize {
        match self.entries.iter().position(|(name, _)| name == key) {
            Some(index) => index,
            None => {
                self.entries.push((key.into(), MemValue::Empty));
                self.entries.len() - 1
            }
        }
    }
}

impl DataWriter<String> for MemObjectWriter<'_> {
    fn initialize(&mut self, capacity: Option<usize>) -> Result<()> {
        self.entries.clear();
        if let Some(capacity) = capacity {
            self.entries.reserve(capacity);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn entry(&mut self, key: &String) -> Option<Box<dyn ValueWriter + '_>> {
        let index = self.slot(key);
        Some(Box::new(MemSlotWriter::new(&mut self.entries[index].1)))
    }

    fn nested_named(&mut self, key: &String) -> Option<Box<dyn DataWriter<String> + '_>> {
        let index = self.slot(key);
        let slot = &mut self.entries[index].1;
        if slot.is_empty() {
            *slot = MemValue::Object(Vec::new());
        }
        match slot {
            MemValue::Object(entries) => {
                Some(Box::new(MemObjectWriter::new(entries)) as Box<dyn DataWriter<String>>)
            }
            _ => None,
        }
    }

    fn nested_indexed(&mut self, key: &String) -> Option<Box<dyn DataWriter<usize> + '_>> {
        let index = self.slot(key);
        let slot = &mut self.entries[index].1;
        if slot.is_empty() {
            *slot = MemValue::Array(Vec::new());
        }
        match slot {
            MemValue::Array(items) => {
                Some(Box::new(MemArrayWriter::new(items)) as Box<dyn DataWriter<usize>>)
            }
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// MemArrayWriter

/// A [`DataWriter`] filling the items of a [`MemValue::Array`].
///
/// Writing past the current length pads the gap with empty values.
pub struct MemArrayWriter<'a> {
    items: &'a mut Vec<MemValue>,
}

impl<'a> MemArrayWriter<'a> {
    #[inline]
    pub fn new(items: &'a mut Vec<MemValue>) -> Self {
        Self { items }
    }

    fn slot(&mut self, index: usize) -> usize {
        if index >= self.items.len() {
            self.items.resize(index + 1, MemValue::Empty);
        }
        index
    }
}

impl DataWriter<usize> for MemArrayWriter<'_> {
    fn initialize(&mut self, capacity: Option<usize>) -> Result<()> {
        self.items.clear();
        if let Some(capacity) = capacity {
            self.items.reserve(capacity);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn keys(&self) -> Vec<usize> {
        (0..self.items.len()).collect()
    }

    fn entry(&mut self, key: &usize) -> Option<Box<dyn ValueWriter + '_>> {
        let index = self.slot(*key);
        Some(Box::new(MemSlotWriter::new(&mut self.items[index])))
    }

    fn nested_named(&mut self, key: &usize) -> Option<Box<dyn DataWriter<String> + '_>> {
        let index = self.slot(*key);
        let slot = &mut self.items[index];
        if slot.is_empty() {
            *slot = MemValue::Object(Vec::new());
        }
        match slot {
            MemValue::Object(entries) => {
                Some(Box::new(MemObjectWriter::new(entries)) as Box<dyn DataWriter<String>>)
            }
            _ => None,
        }
    }

    fn nested_indexed(&mut self, key: &usize) -> Option<Box<dyn DataWriter<usize> + '_>> {
        let index = self.slot(*key);
        let slot = &mut self.items[index];
        if slot.is_empty() {
            *slot = MemValue::Array(Vec::new());
        }
        match slot {
            MemValue::Array(items) => {
                Some(Box::new(MemArrayWriter::new(items)) as Box<dyn DataWriter<usize>>)
            }
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemReader;

    #[test]
    fn roots_collapse_into_slot() {
        let mut writer = MemWriter::new();
        writer.write_i32(1).unwrap();
        writer.write_i32(2).unwrap();
        assert_eq!(
            writer.into_slot(),
            MemValue::Array(vec![MemValue::I32(1), MemValue::I32(2)])
        );

        assert_eq!(MemWriter::new().into_slot(), MemValue::Empty);
    }

    #[test]
    fn into_single_rejects_multiple_roots() {
        let mut writer = MemWriter::new();
        writer.write_bool(true).unwrap();
        writer.write_bool(false).unwrap();
        assert!(writer.into_single().is_err());
    }

    #[test]
    fn transfer_roundtrip() {
        let value = MemValue::Object(vec![
            ("a".into(), MemValue::I32(1)),
            ("b".into(), MemValue::Array(vec![MemValue::from("x")])),
        ]);
        let mut reader = MemReader::single(&value);
        let mut writer = MemWriter::new();
        reader.transfer_to(&mut writer).unwrap();
        assert_eq!(writer.into_single().unwrap(), value);
    }

    #[test]
    fn object_writer_replaces_and_appends() {
        let mut entries = vec![("a".to_string(), MemValue::I32(1))];
        let mut writer = MemObjectWriter::new(&mut entries);

        let mut slot = writer.entry(&"a".to_string()).unwrap();
        slot.write_i32(5).unwrap();
        drop(slot);

        let mut slot = writer.entry(&"b".to_string()).unwrap();
        slot.write_bool(true).unwrap();
        drop(slot);

        assert_eq!(entries[0].1, MemValue::I32(5));
        assert_eq!(entries[1], ("b".to_string(), MemValue::Bool(true)));
    }

    #[test]
    fn array_writer_pads_gaps() {
        let mut items = Vec::new();
        let mut writer = MemArrayWriter::new(&mut items);
        writer.entry(&2).unwrap().write_u8(9).unwrap();
        assert_eq!(
            items,
            vec![MemValue::Empty, MemValue::Empty, MemValue::U8(9)]
        );
    }

    #[test]
    fn nested_writer_creates_on_demand() {
        let mut entries = Vec::new();
        let mut writer = MemObjectWriter::new(&mut entries);
        {
            let mut inner = writer.nested_named(&"inner".to_string()).unwrap();
            inner
                .entry(&"x".to_string())
                .unwrap()
                .write_i64(3)
                .unwrap();
        }
        assert_eq!(
            entries[0].1,
            MemValue::Object(vec![("x".to_string(), MemValue::I64(3))])
        );
    }
}

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::data::DataReader;
use crate::error::{Error, Result};
use crate::mem::MemValue;
use crate::value::{ValueKind, ValueReader, kind_mismatch};

// -----------------------------------------------------------------------------
// MemReader

/// Replays [`MemValue`]s as a value stream.
///
/// Most readers hold a single root, but a reader over several values is a
/// plain sequence: strategies that issue several sequential reads (tuples)
/// consume one value per read.
///
/// # Examples
///
/// ```
/// use dp_proto::mem::{MemReader, MemValue};
/// use dp_proto::value::ValueReader;
///
/// let value = MemValue::I32(5);
/// let mut reader = MemReader::single(&value);
/// assert_eq!(reader.read_i32().unwrap(), 5);
/// ```
pub struct MemReader<'a> {
    queue: VecDeque<&'a MemValue>,
}

impl<'a> MemReader<'a> {
    /// A reader positioned on one value.
    pub fn single(value: &'a MemValue) -> Self {
        let mut queue = VecDeque::with_capacity(1);
        queue.push_back(value);
        Self { queue }
    }

    /// A reader replaying `values` in order.
    pub fn sequence(values: &'a [MemValue]) -> Self {
        Self {
            queue: values.iter().collect(),
        }
    }

    fn next(&mut self) -> Result<&'a MemValue> {
        self.queue.pop_front().ok_or(Error::EndOfStream)
    }
}

macro_rules! mem_read_scalar {
    ($($fn:ident -> $t:ty = $variant:ident / $name:literal),+ $(,)?) => {
        $(
            fn $fn(&mut self) -> Result<$t> {
                match self.next()? {
                    MemValue::$variant(v) => Ok(v.clone()),
                    other => Err(kind_mismatch($name, other.kind())),
                }
            }
        )+
    };
}

impl ValueReader for MemReader<'_> {
    fn kind(&self) -> ValueKind {
        self.queue
            .front()
            .map(|value| value.kind())
            .unwrap_or(ValueKind::Empty)
    }

    mem_read_scalar! {
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
        match self.next()? {
            MemValue::Empty => Ok(()),
            other => Err(kind_mismatch("empty", other.kind())),
        }
    }

    fn read_object(&mut self) -> Result<Box<dyn DataReader<String> + '_>> {
        match self.next()? {
            MemValue::Object(entries) => Ok(Box::new(MemObjectReader::new(entries))),
            other => Err(kind_mismatch("object", other.kind())),
        }
    }

    fn read_array(&mut self) -> Result<Box<dyn DataReader<usize> + '_>> {
        match self.next()? {
            MemValue::Array(items) => Ok(Box::new(MemArrayReader::new(items))),
            other => Err(kind_mismatch("array", other.kind())),
        }
    }

    fn read_raw(&mut self) -> Result<MemValue> {
        self.next().cloned()
    }
}

// -----------------------------------------------------------------------------
// MemObjectReader

/// A [`DataReader`] over the entries of a [`MemValue::Object`].
pub struct MemObjectReader<'a> {
    entries: &'a [(String, MemValue)],
}

impl<'a> MemObjectReader<'a> {
    #[inline]
    pub fn new(entries: &'a [(String, MemValue)]) -> Self {
        Self { entries }
    }

    fn find(&self, key: &str) -> Option<&'a MemValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

impl DataReader<String> for MemObjectReader<'_> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }

    fn entry(&self, key: &String) -> Option<Box<dyn ValueReader + '_>> {
        self.find(key)
            .map(|value| Box::new(MemReader::single(value)) as Box<dyn ValueReader>)
    }

    fn nested_named(&self, key: &String) -> Option<Box<dyn DataReader<String> + '_>> {
        match self.find(key) {
            Some(MemValue::Object(entries)) => {
                Some(Box::new(MemObjectReader::new(entries)) as Box<dyn DataReader<String>>)
            }
            _ => None,
        }
    }

    fn nested_indexed(&self, key: &String) -> Option<Box<dyn DataReader<usize> + '_>> {
        match self.find(key) {
            Some(MemValue::Array(items)) => {
                Some(Box::new(MemArrayReader::new(items)) as Box<dyn DataReader<usize>>)
            }
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// MemArrayReader

/// A [`DataReader`] over the items of a [`MemValue::Array`].
pub struct MemArrayReader<'a> {
    items: &'a [MemValue],
}

impl<'a> MemArrayReader<'a> {
    #[inline]
    pub fn new(items: &'a [MemValue]) -> Self {
        Self { items }
    }
}

impl DataReader<usize> for MemArrayReader<'_> {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn keys(&self) -> Vec<usize> {
        (0..self.items.len()).collect()
    }

    fn entry(&self, key: &usize) -> Option<Box<dyn ValueReader + '_>> {
        self.items
            .get(*key)
            .map(|value| Box::new(MemReader::single(value)) as Box<dyn ValueReader>)
    }

    fn nested_named(&self, key: &usize) -> Option<Box<dyn DataReader<String> + '_>> {
        match self.items.get(*key) {
            Some(MemValue::Object(entries)) => {
                Some(Box::new(MemObjectReader::new(entries)) as Box<dyn DataReader<String>>)
            }
            _ => None,
        }
    }

    fn nested_indexed(&self, key: &usize) -> Option<Box<dyn DataReader<usize> + '_>> {
        match self.items.get(*key) {
            Some(MemValue::Array(items)) => {
                Some(Box::new(MemArrayReader::new(items)) as Box<dyn DataReader<usize>>)
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
    use alloc::vec;

    #[test]
    fn sequence_reads_in_order() {
        let values = vec![MemValue::I32(1), MemValue::Str("two".into())];
        let mut reader = MemReader::sequence(&values);
        assert_eq!(reader.read_i32().unwrap(), 1);
        assert_eq!(reader.read_str().unwrap(), "two");
        assert!(matches!(reader.read_i32(), Err(Error::EndOfStream)));
    }

    #[test]
    fn kind_mismatch_reports_both_sides() {
        let value = MemValue::Str("x".into());
        let mut reader = MemReader::single(&value);
        match reader.read_bool() {
            Err(Error::TargetMismatch { expected, received }) => {
                assert_eq!(expected, "bool");
                assert_eq!(received, "str");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn object_entries_reread() {
        let value = MemValue::Object(vec![("a".into(), MemValue::U8(7))]);
        let mut reader = MemReader::single(&value);
        let object = reader.read_object().unwrap();
        // entry() hands out fresh readers, reading twice is fine
        for _ in 0..2 {
            let mut entry = object.entry(&"a".to_string()).unwrap();
            assert_eq!(entry.read_u8().unwrap(), 7);
        }
        assert!(object.entry(&"missing".to_string()).is_none());
    }

    #[test]
    fn nested_views() {
        let value = MemValue::Object(vec![(
            "inner".into(),
            MemValue::Array(vec![MemValue::Bool(true)]),
        )]);
        let mut reader = MemReader::single(&value);
        let object = reader.read_object().unwrap();
        let array = object.nested_indexed(&"inner".to_string()).unwrap();
        assert_eq!(array.len(), 1);
        assert!(object.nested_named(&"inner".to_string()).is_none());
    }

    #[test]
    fn read_raw_snapshots() {
        let value = MemValue::Object(vec![("a".into(), MemValue::I64(3))]);
        let mut reader = MemReader::single(&value);
        assert_eq!(reader.read_raw().unwrap(), value);
    }
}

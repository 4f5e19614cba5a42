use alloc::string::String;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::value::{ScalarKind, ValueKind};

// -----------------------------------------------------------------------------
// MemValue

/// A value held in memory, mirroring the protocol's data model.
///
/// Object entries keep their insertion order. Comparing trees with `==`
/// compares entry order too, which is what round-trip tests want.
#[derive(Clone, Debug, PartialEq)]
pub enum MemValue {
    Empty,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Char(char),
    Str(String),
    DateTime(DateTime<Utc>),
    Object(Vec<(String, MemValue)>),
    Array(Vec<MemValue>),
}

impl MemValue {
    /// The protocol kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            MemValue::Empty => ValueKind::Empty,
            MemValue::Bool(_) => ValueKind::Scalar(ScalarKind::Bool),
            MemValue::I8(_) => ValueKind::Scalar(ScalarKind::I8),
            MemValue::I16(_) => ValueKind::Scalar(ScalarKind::I16),
            MemValue::I32(_) => ValueKind::Scalar(ScalarKind::I32),
            MemValue::I64(_) => ValueKind::Scalar(ScalarKind::I64),
            MemValue::I128(_) => ValueKind::Scalar(ScalarKind::I128),
            MemValue::U8(_) => ValueKind::Scalar(ScalarKind::U8),
            MemValue::U16(_) => ValueKind::Scalar(ScalarKind::U16),
            MemValue::U32(_) => ValueKind::Scalar(ScalarKind::U32),
            MemValue::U64(_) => ValueKind::Scalar(ScalarKind::U64),
            MemValue::U128(_) => ValueKind::Scalar(ScalarKind::U128),
            MemValue::F32(_) => ValueKind::Scalar(ScalarKind::F32),
            MemValue::F64(_) => ValueKind::Scalar(ScalarKind::F64),
            MemValue::Decimal(_) => ValueKind::Scalar(ScalarKind::Decimal),
            MemValue::Char(_) => ValueKind::Scalar(ScalarKind::Char),
            MemValue::Str(_) => ValueKind::Scalar(ScalarKind::Str),
            MemValue::DateTime(_) => ValueKind::Scalar(ScalarKind::DateTime),
            MemValue::Object(_) => ValueKind::Object,
            MemValue::Array(_) => ValueKind::Array,
        }
    }

    /// A short kind name for diagnostics.
    #[inline]
    pub fn kind_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Is this the empty value?
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, MemValue::Empty)
    }

    /// The entry named `key`, when this is an object.
    pub fn get(&self, key: &str) -> Option<&MemValue> {
        match self {
            MemValue::Object(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// The entry at `index`, when this is an array.
    pub fn index(&self, index: usize) -> Option<&MemValue> {
        match self {
            MemValue::Array(items) => items.get(index),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// Conversions

macro_rules! impl_from_scalar {
    ($($variant:ident : $t:ty),+ $(,)?) => {
        $(
            impl From<$t> for MemValue {
                #[inline]
                fn from(value: $t) -> Self {
                    MemValue::$variant(value)
                }
            }
        )+
    };
}

impl_from_scalar! {
    Bool: bool,
    I8: i8, I16: i16, I32: i32, I64: i64, I128: i128,
    U8: u8, U16: u16, U32: u32, U64: u64, U128: u128,
    F32: f32, F64: f64,
    Decimal: Decimal,
    Char: char,
    Str: String,
    DateTime: DateTime<Utc>,
}

impl From<&str> for MemValue {
    #[inline]
    fn from(value: &str) -> Self {
        MemValue::Str(value.into())
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_lookup() {
        let value = MemValue::Object(alloc::vec![
            ("a".into(), MemValue::I32(1)),
            ("b".into(), MemValue::from("x")),
        ]);
        assert_eq!(value.get("a"), Some(&MemValue::I32(1)));
        assert_eq!(value.get("b"), Some(&MemValue::Str("x".into())));
        assert_eq!(value.get("c"), None);
        assert_eq!(value.index(0), None);
    }

    #[test]
    fn kinds() {
        assert_eq!(MemValue::Empty.kind(), ValueKind::Empty);
        assert_eq!(MemValue::from(1u8).kind(), ValueKind::Scalar(ScalarKind::U8));
        assert_eq!(MemValue::Array(Vec::new()).kind(), ValueKind::Array);
    }
}

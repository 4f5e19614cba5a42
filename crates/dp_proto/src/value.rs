//! The single-value half of the transfer protocol.
//!
//! A [`ValueReader`] produces values one at a time, a [`ValueWriter`] consumes
//! them. Scalars come from a closed set ([`ScalarKind`]); anything structured
//! travels as an object or array aggregate through the
//! [`DataReader`](crate::data::DataReader) /
//! [`DataWriter`](crate::data::DataWriter) traits.
//!
//! Neither side knows what encoding is behind the other. A codec implements
//! the traits once and works for every type; a type maps onto the traits once
//! (through its strategy) and works with every codec.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::data::DataReader;
use crate::error::{Error, Result};
use crate::mem::MemValue;

// -----------------------------------------------------------------------------
// Kinds

/// The closed set of scalar types the protocol moves without decomposition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    Decimal,
    Char,
    Str,
    DateTime,
}

/// What kind of value a reader is currently positioned on.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Scalar(ScalarKind),
    Object,
    Array,
    /// The absence of a value. Strategies read this as the default for their
    /// type, so reads stay total.
    Empty,
}

impl ValueKind {
    /// A short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Scalar(ScalarKind::Bool) => "bool",
            ValueKind::Scalar(ScalarKind::I8) => "i8",
            ValueKind::Scalar(ScalarKind::I16) => "i16",
            ValueKind::Scalar(ScalarKind::I32) => "i32",
            ValueKind::Scalar(ScalarKind::I64) => "i64",
            ValueKind::Scalar(ScalarKind::I128) => "i128",
            ValueKind::Scalar(ScalarKind::U8) => "u8",
            ValueKind::Scalar(ScalarKind::U16) => "u16",
            ValueKind::Scalar(ScalarKind::U32) => "u32",
            ValueKind::Scalar(ScalarKind::U64) => "u64",
            ValueKind::Scalar(ScalarKind::U128) => "u128",
            ValueKind::Scalar(ScalarKind::F32) => "f32",
            ValueKind::Scalar(ScalarKind::F64) => "f64",
            ValueKind::Scalar(ScalarKind::Decimal) => "decimal",
            ValueKind::Scalar(ScalarKind::Char) => "char",
            ValueKind::Scalar(ScalarKind::Str) => "str",
            ValueKind::Scalar(ScalarKind::DateTime) => "datetime",
            ValueKind::Object => "object",
            ValueKind::Array => "array",
            ValueKind::Empty => "empty",
        }
    }
}

// -----------------------------------------------------------------------------
// ValueReader

/// A stream of values read one at a time.
///
/// [`kind`](ValueReader::kind) peeks at the kind of the next value without
/// consuming it; every `read_*` method consumes exactly one value. Reading a
/// value as the wrong kind is a [`TargetMismatch`](Error::TargetMismatch),
/// reading past the end of the stream is [`EndOfStream`](Error::EndOfStream).
pub trait ValueReader {
    /// The kind of the next value, or [`ValueKind::Empty`] when exhausted.
    fn kind(&self) -> ValueKind;

    fn read_bool(&mut self) -> Result<bool>;
    fn read_i8(&mut self) -> Result<i8>;
    fn read_i16(&mut self) -> Result<i16>;
    fn read_i32(&mut self) -> Result<i32>;
    fn read_i64(&mut self) -> Result<i64>;
    fn read_i128(&mut self) -> Result<i128>;
    fn read_u8(&mut self) -> Result<u8>;
    fn read_u16(&mut self) -> Result<u16>;
    fn read_u32(&mut self) -> Result<u32>;
    fn read_u64(&mut self) -> Result<u64>;
    fn read_u128(&mut self) -> Result<u128>;
    fn read_f32(&mut self) -> Result<f32>;
    fn read_f64(&mut self) -> Result<f64>;
    fn read_decimal(&mut self) -> Result<Decimal>;
    fn read_char(&mut self) -> Result<char>;
    fn read_str(&mut self) -> Result<String>;
    fn read_datetime(&mut self) -> Result<DateTime<Utc>>;

    /// Consume an empty value.
    fn read_empty(&mut self) -> Result<()>;

    /// Consume an object aggregate, exposing its entries by name.
    fn read_object(&mut self) -> Result<Box<dyn DataReader<String> + '_>>;

    /// Consume an array aggregate, exposing its entries by index.
    fn read_array(&mut self) -> Result<Box<dyn DataReader<usize> + '_>>;

    /// Consume the next value whole, as a [`MemValue`] tree.
    ///
    /// This is the escape hatch for callers that need a value without knowing
    /// its type. The default implementation decomposes through the protocol.
    fn read_raw(&mut self) -> Result<MemValue> {
        match self.kind() {
            ValueKind::Scalar(ScalarKind::Bool) => self.read_bool().map(MemValue::Bool),
            ValueKind::Scalar(ScalarKind::I8) => self.read_i8().map(MemValue::I8),
            ValueKind::Scalar(ScalarKind::I16) => self.read_i16().map(MemValue::I16),
            ValueKind::Scalar(ScalarKind::I32) => self.read_i32().map(MemValue::I32),
            ValueKind::Scalar(ScalarKind::I64) => self.read_i64().map(MemValue::I64),
            ValueKind::Scalar(ScalarKind::I128) => self.read_i128().map(MemValue::I128),
            ValueKind::Scalar(ScalarKind::U8) => self.read_u8().map(MemValue::U8),
            ValueKind::Scalar(ScalarKind::U16) => self.read_u16().map(MemValue::U16),
            ValueKind::Scalar(ScalarKind::U32) => self.read_u32().map(MemValue::U32),
            ValueKind::Scalar(ScalarKind::U64) => self.read_u64().map(MemValue::U64),
            ValueKind::Scalar(ScalarKind::U128) => self.read_u128().map(MemValue::U128),
            ValueKind::Scalar(ScalarKind::F32) => self.read_f32().map(MemValue::F32),
            ValueKind::Scalar(ScalarKind::F64) => self.read_f64().map(MemValue::F64),
            ValueKind::Scalar(ScalarKind::Decimal) => self.read_decimal().map(MemValue::Decimal),
            ValueKind::Scalar(ScalarKind::Char) => self.read_char().map(MemValue::Char),
            ValueKind::Scalar(ScalarKind::Str) => self.read_str().map(MemValue::Str),
            ValueKind::Scalar(ScalarKind::DateTime) => {
                self.read_datetime().map(MemValue::DateTime)
            }
            ValueKind::Object => {
                let object = self.read_object()?;
                let mut entries = Vec::with_capacity(object.len());
                for key in object.keys() {
                    if let Some(mut entry) = object.entry(&key) {
                        entries.push((key, entry.read_raw()?));
                    }
                }
                Ok(MemValue::Object(entries))
            }
            ValueKind::Array => {
                let array = self.read_array()?;
                let len = array.len();
                let mut items = Vec::with_capacity(len);
                for index in 0..len {
                    match array.entry(&index) {
                        Some(mut entry) => items.push(entry.read_raw()?),
                        None => items.push(MemValue::Empty),
                    }
                }
                Ok(MemValue::Array(items))
            }
            ValueKind::Empty => {
                self.read_empty()?;
                Ok(MemValue::Empty)
            }
        }
    }

    /// Move the next value from this reader into `writer`.
    ///
    /// The default implementation switches on [`kind`](ValueReader::kind) and
    /// pairs up the matching read and write calls. Readers that know a cheaper
    /// route (a strategy-backed entry, for example) override this.
    fn transfer_to(&mut self, writer: &mut dyn ValueWriter) -> Result<()> {
        match self.kind() {
            ValueKind::Scalar(ScalarKind::Bool) => writer.write_bool(self.read_bool()?),
            ValueKind::Scalar(ScalarKind::I8) => writer.write_i8(self.read_i8()?),
            ValueKind::Scalar(ScalarKind::I16) => writer.write_i16(self.read_i16()?),
            ValueKind::Scalar(ScalarKind::I32) => writer.write_i32(self.read_i32()?),
            ValueKind::Scalar(ScalarKind::I64) => writer.write_i64(self.read_i64()?),
            ValueKind::Scalar(ScalarKind::I128) => writer.write_i128(self.read_i128()?),
            ValueKind::Scalar(ScalarKind::U8) => writer.write_u8(self.read_u8()?),
            ValueKind::Scalar(ScalarKind::U16) => writer.write_u16(self.read_u16()?),
            ValueKind::Scalar(ScalarKind::U32) => writer.write_u32(self.read_u32()?),
            ValueKind::Scalar(ScalarKind::U64) => writer.write_u64(self.read_u64()?),
            ValueKind::Scalar(ScalarKind::U128) => writer.write_u128(self.read_u128()?),
            ValueKind::Scalar(ScalarKind::F32) => writer.write_f32(self.read_f32()?),
            ValueKind::Scalar(ScalarKind::F64) => writer.write_f64(self.read_f64()?),
            ValueKind::Scalar(ScalarKind::Decimal) => writer.write_decimal(self.read_decimal()?),
            ValueKind::Scalar(ScalarKind::Char) => writer.write_char(self.read_char()?),
            ValueKind::Scalar(ScalarKind::Str) => writer.write_str(&self.read_str()?),
            ValueKind::Scalar(ScalarKind::DateTime) => {
                writer.write_datetime(self.read_datetime()?)
            }
            ValueKind::Object => {
                let object = self.read_object()?;
                writer.write_object(&*object)
            }
            ValueKind::Array => {
                let array = self.read_array()?;
                writer.write_array(&*array)
            }
            ValueKind::Empty => {
                self.read_empty()?;
                writer.write_empty()
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ValueWriter

/// A sink consuming values one at a time.
///
/// Aggregates are written inversion-of-control style: the writer receives a
/// [`DataReader`] describing the aggregate and pulls entries out of it however
/// its encoding requires. Entry order and visit count are the writer's choice.
pub trait ValueWriter {
    fn write_bool(&mut self, value: bool) -> Result<()>;
    fn write_i8(&mut self, value: i8) -> Result<()>;
    fn write_i16(&mut self, value: i16) -> Result<()>;
    fn write_i32(&mut self, value: i32) -> Result<()>;
    fn write_i64(&mut self, value: i64) -> Result<()>;
    fn write_i128(&mut self, value: i128) -> Result<()>;
    fn write_u8(&mut self, value: u8) -> Result<()>;
    fn write_u16(&mut self, value: u16) -> Result<()>;
    fn write_u32(&mut self, value: u32) -> Result<()>;
    fn write_u64(&mut self, value: u64) -> Result<()>;
    fn write_u128(&mut self, value: u128) -> Result<()>;
    fn write_f32(&mut self, value: f32) -> Result<()>;
    fn write_f64(&mut self, value: f64) -> Result<()>;
    fn write_decimal(&mut self, value: Decimal) -> Result<()>;
    fn write_char(&mut self, value: char) -> Result<()>;
    fn write_str(&mut self, value: &str) -> Result<()>;
    fn write_datetime(&mut self, value: DateTime<Utc>) -> Result<()>;

    /// Write the absence of a value.
    fn write_empty(&mut self) -> Result<()>;

    /// Write an object aggregate by pulling named entries from `source`.
    fn write_object(&mut self, source: &dyn DataReader<String>) -> Result<()>;

    /// Write an array aggregate by pulling indexed entries from `source`.
    fn write_array(&mut self, source: &dyn DataReader<usize>) -> Result<()>;

    /// Write a [`MemValue`] tree whole.
    ///
    /// The default implementation decomposes the tree through the protocol, so
    /// writers never have to special-case it.
    fn write_raw(&mut self, value: &MemValue) -> Result<()> {
        match value {
            MemValue::Bool(v) => self.write_bool(*v),
            MemValue::I8(v) => self.write_i8(*v),
            MemValue::I16(v) => self.write_i16(*v),
            MemValue::I32(v) => self.write_i32(*v),
            MemValue::I64(v) => self.write_i64(*v),
            MemValue::I128(v) => self.write_i128(*v),
            MemValue::U8(v) => self.write_u8(*v),
            MemValue::U16(v) => self.write_u16(*v),
            MemValue::U32(v) => self.write_u32(*v),
            MemValue::U64(v) => self.write_u64(*v),
            MemValue::U128(v) => self.write_u128(*v),
            MemValue::F32(v) => self.write_f32(*v),
            MemValue::F64(v) => self.write_f64(*v),
            MemValue::Decimal(v) => self.write_decimal(*v),
            MemValue::Char(v) => self.write_char(*v),
            MemValue::Str(v) => self.write_str(v),
            MemValue::DateTime(v) => self.write_datetime(*v),
            MemValue::Object(entries) => {
                self.write_object(&crate::mem::MemObjectReader::new(entries))
            }
            MemValue::Array(items) => self.write_array(&crate::mem::MemArrayReader::new(items)),
            MemValue::Empty => self.write_empty(),
        }
    }
}

// -----------------------------------------------------------------------------
// Helpers

/// Build a reader-side kind mismatch error.
#[inline]
pub(crate) fn kind_mismatch(expected: &'static str, received: ValueKind) -> Error {
    Error::target_mismatch(expected, received.name())
}

//! Bridges the protocol onto serde serializers.
//!
//! [`MemValue`] trees serialize directly. Arbitrary [`Shaped`] types go
//! through [`sink`], which stages the value through its transfer strategy and
//! hands the resulting tree to the serializer; [`boxed_sink`] erases the
//! value type for collections of heterogeneous values.

use alloc::boxed::Box;
use alloc::string::ToString;
use core::fmt::{self, Write as _};

use serde_core::ser::{Error as _, Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::mem::{MemValue, MemWriter};
use crate::scratch::ByteScratch;
use crate::shape::Shaped;
use crate::strategy::TypeStrategy;

// -----------------------------------------------------------------------------
// Display staging

struct Utf8Scratch {
    buffer: ByteScratch,
}

impl fmt::Write for Utf8Scratch {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.buffer
            .extend_from_slice(s.as_bytes())
            .map_err(|_| fmt::Error)
    }
}

/// Serialize a `Display` value as a string, formatted through pooled scratch
/// memory instead of a fresh allocation per value.
fn serialize_display<S: Serializer>(
    serializer: S,
    value: &dyn fmt::Display,
) -> Result<S::Ok, S::Error> {
    let Ok(buffer) = ByteScratch::try_acquire() else {
        // Pool exhausted; one plain allocation is still correct.
        return serializer.serialize_str(&value.to_string());
    };
    let mut scratch = Utf8Scratch { buffer };
    write!(&mut scratch, "{value}").map_err(|_| S::Error::custom("formatting failed"))?;
    let text = core::str::from_utf8(scratch.buffer.as_slice())
        .map_err(|_| S::Error::custom("formatted text was not UTF-8"))?;
    serializer.serialize_str(text)
}

// -----------------------------------------------------------------------------
// MemValue

impl Serialize for MemValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MemValue::Empty => serializer.serialize_unit(),
            MemValue::Bool(v) => serializer.serialize_bool(*v),
            MemValue::I8(v) => serializer.serialize_i8(*v),
            MemValue::I16(v) => serializer.serialize_i16(*v),
            MemValue::I32(v) => serializer.serialize_i32(*v),
            MemValue::I64(v) => serializer.serialize_i64(*v),
            MemValue::I128(v) => serializer.serialize_i128(*v),
            MemValue::U8(v) => serializer.serialize_u8(*v),
            MemValue::U16(v) => serializer.serialize_u16(*v),
            MemValue::U32(v) => serializer.serialize_u32(*v),
            MemValue::U64(v) => serializer.serialize_u64(*v),
            MemValue::U128(v) => serializer.serialize_u128(*v),
            MemValue::F32(v) => serializer.serialize_f32(*v),
            MemValue::F64(v) => serializer.serialize_f64(*v),
            MemValue::Decimal(v) => serialize_display(serializer, v),
            MemValue::Char(v) => serializer.serialize_char(*v),
            MemValue::Str(v) => serializer.serialize_str(v),
            MemValue::DateTime(v) => serialize_display(serializer, &v.format("%+")),
            MemValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            MemValue::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ValueSink

/// Serializes a borrowed value through its transfer strategy.
pub struct ValueSink<'a, T> {
    value: &'a T,
}

/// A serde view of `value`, staged through its strategy on demand.
#[inline]
pub fn sink<T: Shaped>(value: &T) -> ValueSink<'_, T> {
    ValueSink { value }
}

/// Like [`sink`], with the value type erased.
pub fn boxed_sink<'a, T: Shaped>(value: &'a T) -> Box<dyn erased_serde::Serialize + 'a> {
    Box::new(sink(value))
}

impl<T: Shaped> Serialize for ValueSink<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut writer = MemWriter::new();
        TypeStrategy::<T>::write(&mut writer, self.value).map_err(S::Error::custom)?;
        writer.into_slot().serialize(serializer)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Marker {
        label: String,
        weight: u32,
    }

    crate::impl_struct_shape!(Marker {
        label: String,
        weight: u32,
    });

    #[test]
    fn trees_serialize_to_json() {
        let value = MemValue::Object(vec![
            ("id".into(), MemValue::U8(7)),
            (
                "tags".into(),
                MemValue::Array(vec![MemValue::from("a"), MemValue::from("b")]),
            ),
            ("gone".into(), MemValue::Empty),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"id":7,"tags":["a","b"],"gone":null}"#);
    }

    #[test]
    fn decimals_and_datetimes_serialize_as_strings() {
        let value = MemValue::Decimal(Decimal::new(250, 2));
        assert_eq!(serde_json::to_string(&value).unwrap(), r#""2.50""#);

        let stamp = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let value = MemValue::DateTime(stamp);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#""2024-05-01T12:00:00+00:00""#
        );
    }

    #[test]
    fn sink_serializes_through_the_strategy() {
        let marker = Marker {
            label: "north".into(),
            weight: 3,
        };
        let json = serde_json::to_string(&sink(&marker)).unwrap();
        assert_eq!(json, r#"{"label":"north","weight":3}"#);
    }

    #[test]
    fn boxed_sink_erases_the_value_type() {
        let marker = Marker::default();
        let count = 5u8;
        let sinks = vec![boxed_sink(&marker), boxed_sink(&count)];
        let json = serde_json::to_string(&*sinks[1]).unwrap();
        assert_eq!(json, "5");
        let json = serde_json::to_string(&*sinks[0]).unwrap();
        assert_eq!(json, r#"{"label":"","weight":0}"#);
    }
}

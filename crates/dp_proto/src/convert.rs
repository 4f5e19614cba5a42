//! Checked conversions between the protocol's scalar types.
//!
//! Member accessors use these when the requested type differs from the
//! declared member type: a `u8` field can be read as `i64`, an `i32` value can
//! be stored into a `u16` field when it fits. Conversions never lose
//! information silently; anything out of range or inexact is an
//! [`UnsupportedConversion`](Error::UnsupportedConversion) error.

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use core::any::{Any, TypeId, type_name};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use dp_utils::TypeIdMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::error::{Error, Result};
use crate::value::ScalarKind;

// -----------------------------------------------------------------------------
// Scalar

/// One owned value of the closed scalar set.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
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
}

macro_rules! scalar_variants {
    ($($variant:ident : $t:ty),+ $(,)?) => {
        impl Scalar {
            /// Capture any value of a scalar type, by reference.
            ///
            /// Returns `None` when `value` is not one of the scalar types.
            pub fn from_any(value: &dyn Any) -> Option<Scalar> {
                $(
                    if let Some(v) = value.downcast_ref::<$t>() {
                        return Some(Scalar::$variant(v.clone()));
                    }
                )+
                None
            }

            /// The kind of this scalar.
            pub fn kind(&self) -> ScalarKind {
                match self {
                    $( Scalar::$variant(_) => ScalarKind::$variant, )+
                }
            }
        }

        $(
            impl From<$t> for Scalar {
                #[inline]
                fn from(value: $t) -> Self {
                    Scalar::$variant(value)
                }
            }
        )+
    };
}

scalar_variants! {
    Bool: bool,
    I8: i8, I16: i16, I32: i32, I64: i64, I128: i128,
    U8: u8, U16: u16, U32: u32, U64: u64, U128: u128,
    F32: f32, F64: f64,
    Decimal: Decimal,
    Char: char,
    Str: String,
    DateTime: DateTime<Utc>,
}

impl Scalar {
    /// A short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        crate::value::ValueKind::Scalar(self.kind()).name()
    }

    /// The value as a signed integer, when exactly representable.
    fn as_i128(&self) -> Option<i128> {
        match self {
            Scalar::I8(v) => Some(*v as i128),
            Scalar::I16(v) => Some(*v as i128),
            Scalar::I32(v) => Some(*v as i128),
            Scalar::I64(v) => Some(*v as i128),
            Scalar::I128(v) => Some(*v),
            Scalar::U8(v) => Some(*v as i128),
            Scalar::U16(v) => Some(*v as i128),
            Scalar::U32(v) => Some(*v as i128),
            Scalar::U64(v) => Some(*v as i128),
            Scalar::U128(v) => i128::try_from(*v).ok(),
            Scalar::F32(v) => float_to_i128(*v as f64),
            Scalar::F64(v) => float_to_i128(*v),
            Scalar::Decimal(v) if v.is_integer() => v.to_i128(),
            _ => None,
        }
    }

    /// The value as an unsigned integer, when exactly representable.
    fn as_u128(&self) -> Option<u128> {
        match self {
            Scalar::U128(v) => Some(*v),
            Scalar::I128(v) => u128::try_from(*v).ok(),
            other => other.as_i128().and_then(|v| u128::try_from(v).ok()),
        }
    }

    /// The value as a float, when numeric.
    fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::F32(v) => Some(*v as f64),
            Scalar::F64(v) => Some(*v),
            Scalar::Decimal(v) => v.to_f64(),
            Scalar::I8(v) => Some(*v as f64),
            Scalar::I16(v) => Some(*v as f64),
            Scalar::I32(v) => Some(*v as f64),
            Scalar::I64(v) => Some(*v as f64),
            Scalar::I128(v) => Some(*v as f64),
            Scalar::U8(v) => Some(*v as f64),
            Scalar::U16(v) => Some(*v as f64),
            Scalar::U32(v) => Some(*v as f64),
            Scalar::U64(v) => Some(*v as f64),
            Scalar::U128(v) => Some(*v as f64),
            _ => None,
        }
    }
}

fn float_to_i128(value: f64) -> Option<i128> {
    const MAX: f64 = i128::MAX as f64;
    const MIN: f64 = i128::MIN as f64;
    if value.fract() == 0.0 && (MIN..=MAX).contains(&value) {
        Some(value as i128)
    } else {
        None
    }
}

// -----------------------------------------------------------------------------
// FromScalar

/// Checked construction of a scalar type from any [`Scalar`].
pub trait FromScalar: Sized + 'static {
    fn from_scalar(scalar: Scalar) -> Result<Self>;
}

fn unsupported<T>(scalar: &Scalar) -> Error {
    Error::unsupported_conversion(scalar.type_name(), type_name::<T>())
}

macro_rules! int_from_scalar {
    ($($t:ty : $via:ident),+ $(,)?) => {
        $(
            impl FromScalar for $t {
                fn from_scalar(scalar: Scalar) -> Result<Self> {
                    scalar
                        .$via()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or_else(|| unsupported::<$t>(&scalar))
                }
            }
        )+
    };
}

int_from_scalar! {
    i8: as_i128, i16: as_i128, i32: as_i128, i64: as_i128, i128: as_i128,
    u8: as_u128, u16: as_u128, u32: as_u128, u64: as_u128, u128: as_u128,
}

impl FromScalar for bool {
    fn from_scalar(scalar: Scalar) -> Result<Self> {
        match scalar {
            Scalar::Bool(v) => Ok(v),
            other => Err(unsupported::<bool>(&other)),
        }
    }
}

impl FromScalar for f64 {
    fn from_scalar(scalar: Scalar) -> Result<Self> {
        scalar.as_f64().ok_or_else(|| unsupported::<f64>(&scalar))
    }
}

impl FromScalar for f32 {
    fn from_scalar(scalar: Scalar) -> Result<Self> {
        // Narrowing to f32 keeps the nearest representable value, matching
        // the usual numeric conversion rules for floats.
        scalar
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| unsupported::<f32>(&scalar))
    }
}

impl FromScalar for Decimal {
    fn from_scalar(scalar: Scalar) -> Result<Self> {
        match &scalar {
            Scalar::Decimal(v) => Ok(*v),
            Scalar::F32(v) => Decimal::from_f32(*v).ok_or_else(|| unsupported::<Decimal>(&scalar)),
            Scalar::F64(v) => Decimal::from_f64(*v).ok_or_else(|| unsupported::<Decimal>(&scalar)),
            _ => scalar
                .as_i128()
                .and_then(Decimal::from_i128)
                .ok_or_else(|| unsupported::<Decimal>(&scalar)),
        }
    }
}

impl FromScalar for char {
    fn from_scalar(scalar: Scalar) -> Result<Self> {
        match &scalar {
            Scalar::Char(v) => Ok(*v),
            Scalar::Str(v) => {
                let mut chars = v.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(unsupported::<char>(&scalar)),
                }
            }
            _ => Err(unsupported::<char>(&scalar)),
        }
    }
}

impl FromScalar for String {
    fn from_scalar(scalar: Scalar) -> Result<Self> {
        match scalar {
            Scalar::Str(v) => Ok(v),
            Scalar::Char(v) => Ok(v.to_string()),
            other => Err(unsupported::<String>(&other)),
        }
    }
}

impl FromScalar for DateTime<Utc> {
    fn from_scalar(scalar: Scalar) -> Result<Self> {
        match &scalar {
            Scalar::DateTime(v) => Ok(*v),
            Scalar::Str(v) => DateTime::parse_from_rfc3339(v)
                .map(|parsed| parsed.with_timezone(&Utc))
                .map_err(|_| unsupported::<DateTime<Utc>>(&scalar)),
            _ => Err(unsupported::<DateTime<Utc>>(&scalar)),
        }
    }
}

// -----------------------------------------------------------------------------
// Erased conversion

type BoxedFromScalar = fn(Scalar) -> Result<Box<dyn Any>>;

fn boxed_from_scalar<T: FromScalar>(scalar: Scalar) -> Result<Box<dyn Any>> {
    T::from_scalar(scalar).map(|v| Box::new(v) as Box<dyn Any>)
}

/// One converter per scalar target type, for callers that only hold a
/// `TypeId` of the target.
static SCALAR_TARGETS: LazyLock<TypeIdMap<BoxedFromScalar>> = LazyLock::new(|| {
    let mut map: TypeIdMap<BoxedFromScalar> = TypeIdMap::with_capacity(17);
    map.insert_type::<bool>(boxed_from_scalar::<bool>);
    map.insert_type::<i8>(boxed_from_scalar::<i8>);
    map.insert_type::<i16>(boxed_from_scalar::<i16>);
    map.insert_type::<i32>(boxed_from_scalar::<i32>);
    map.insert_type::<i64>(boxed_from_scalar::<i64>);
    map.insert_type::<i128>(boxed_from_scalar::<i128>);
    map.insert_type::<u8>(boxed_from_scalar::<u8>);
    map.insert_type::<u16>(boxed_from_scalar::<u16>);
    map.insert_type::<u32>(boxed_from_scalar::<u32>);
    map.insert_type::<u64>(boxed_from_scalar::<u64>);
    map.insert_type::<u128>(boxed_from_scalar::<u128>);
    map.insert_type::<f32>(boxed_from_scalar::<f32>);
    map.insert_type::<f64>(boxed_from_scalar::<f64>);
    map.insert_type::<Decimal>(boxed_from_scalar::<Decimal>);
    map.insert_type::<char>(boxed_from_scalar::<char>);
    map.insert_type::<String>(boxed_from_scalar::<String>);
    map.insert_type::<DateTime<Utc>>(boxed_from_scalar::<DateTime<Utc>>);
    map
});

/// Convert an erased scalar value into the target type named only by id.
///
/// `from_name` is used for diagnostics when the source is not a scalar.
pub(crate) fn convert_erased(
    target: TypeId,
    target_name: &'static str,
    value: &dyn Any,
    from_name: &'static str,
) -> Result<Box<dyn Any>> {
    let scalar = Scalar::from_any(value)
        .ok_or_else(|| Error::unsupported_conversion(from_name, target_name))?;
    let converter = SCALAR_TARGETS
        .get(&target)
        .ok_or_else(|| Error::unsupported_conversion(from_name, target_name))?;
    converter(scalar)
}

/// Convert an erased scalar value into `V`.
pub fn convert<V: FromScalar>(value: &dyn Any, from_name: &'static str) -> Result<V> {
    let scalar = Scalar::from_any(value)
        .ok_or_else(|| Error::unsupported_conversion(from_name, type_name::<V>()))?;
    V::from_scalar(scalar)
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn widening_and_narrowing_ints() {
        assert_eq!(i64::from_scalar(Scalar::U8(7)).unwrap(), 7);
        assert_eq!(u16::from_scalar(Scalar::I32(300)).unwrap(), 300);
        assert!(u8::from_scalar(Scalar::I32(300)).is_err());
        assert!(u32::from_scalar(Scalar::I8(-1)).is_err());
    }

    #[test]
    fn floats_to_ints_only_when_exact() {
        assert_eq!(i32::from_scalar(Scalar::F64(5.0)).unwrap(), 5);
        assert!(i32::from_scalar(Scalar::F64(5.5)).is_err());
    }

    #[test]
    fn ints_to_floats() {
        assert_eq!(f64::from_scalar(Scalar::I64(3)).unwrap(), 3.0);
        assert_eq!(f32::from_scalar(Scalar::U32(4)).unwrap(), 4.0);
    }

    #[test]
    fn decimal_conversions() {
        let d = Decimal::new(250, 2); // 2.50
        assert_eq!(f64::from_scalar(Scalar::Decimal(d)).unwrap(), 2.5);
        assert!(i32::from_scalar(Scalar::Decimal(d)).is_err());
        assert_eq!(
            i32::from_scalar(Scalar::Decimal(Decimal::new(4, 0))).unwrap(),
            4
        );
        assert_eq!(
            Decimal::from_scalar(Scalar::I32(12)).unwrap(),
            Decimal::new(12, 0)
        );
    }

    #[test]
    fn chars_and_strings() {
        assert_eq!(char::from_scalar(Scalar::Str("x".into())).unwrap(), 'x');
        assert!(char::from_scalar(Scalar::Str("xy".into())).is_err());
        assert_eq!(String::from_scalar(Scalar::Char('q')).unwrap(), "q");
    }

    #[test]
    fn datetime_from_rfc3339() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let parsed =
            DateTime::<Utc>::from_scalar(Scalar::Str("2024-05-01T12:00:00Z".into())).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn erased_conversion() {
        let value: Box<dyn Any> = Box::new(41i64);
        let converted = convert_erased(TypeId::of::<i32>(), "i32", value.as_ref(), "i64").unwrap();
        assert_eq!(converted.downcast_ref::<i32>(), Some(&41));

        assert!(convert_erased(TypeId::of::<bool>(), "bool", value.as_ref(), "i64").is_err());
    }

    #[test]
    fn every_scalar_type_has_an_erased_target() {
        let targets: [TypeId; 17] = [
            TypeId::of::<bool>(),
            TypeId::of::<i8>(),
            TypeId::of::<i16>(),
            TypeId::of::<i32>(),
            TypeId::of::<i64>(),
            TypeId::of::<i128>(),
            TypeId::of::<u8>(),
            TypeId::of::<u16>(),
            TypeId::of::<u32>(),
            TypeId::of::<u64>(),
            TypeId::of::<u128>(),
            TypeId::of::<f32>(),
            TypeId::of::<f64>(),
            TypeId::of::<Decimal>(),
            TypeId::of::<char>(),
            TypeId::of::<String>(),
            TypeId::of::<DateTime<Utc>>(),
        ];
        for target in targets {
            assert!(SCALAR_TARGETS.get(&target).is_some());
        }

        let value: Box<dyn Any> = Box::new(7i32);
        let converted =
            convert_erased(TypeId::of::<Decimal>(), "decimal", value.as_ref(), "i32").unwrap();
        assert_eq!(converted.downcast_ref::<Decimal>(), Some(&Decimal::new(7, 0)));
    }

    #[test]
    fn bool_is_identity_only() {
        assert!(bool::from_scalar(Scalar::I32(1)).is_err());
        assert!(bool::from_scalar(Scalar::Bool(true)).unwrap());
    }
}

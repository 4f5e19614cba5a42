//! Built-in [`Shaped`] implementations.
//!
//! Covers the closed scalar set, tuples up to arity 12, `Option`, `Vec` and
//! string-keyed hash maps. Structs and enums come from the
//! [`impl_struct_shape!`](crate::impl_struct_shape) and
//! [`impl_enum_shape!`](crate::impl_enum_shape) macros.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::{Any, type_name};
use core::hash::BuildHasher;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::shape::{GenericShapeCell, NonGenericShapeCell, Shape, Shaped};
use crate::strategy::{MapSource, SliceSource, TypeStrategy};
use crate::value::{ScalarKind, ValueKind, ValueReader, ValueWriter};

fn write_mismatch<T>() -> Error {
    Error::target_mismatch(type_name::<T>(), "value of a different type")
}

fn downcast<T: 'static>(value: &dyn Any) -> Result<&T> {
    value.downcast_ref::<T>().ok_or_else(write_mismatch::<T>)
}

// -----------------------------------------------------------------------------
// Scalars

macro_rules! impl_scalar_shape {
    ($($t:ty => $kind:ident, $read:ident, $write:ident;)+) => {$(
        impl Shaped for $t {
            fn shape() -> &'static Shape {
                static CELL: NonGenericShapeCell = NonGenericShapeCell::new();
                CELL.get_or_init(|| {
                    Shape::scalar::<$t>(
                        ScalarKind::$kind,
                        |reader| {
                            // An absent value reads as the type's default.
                            if reader.kind() == ValueKind::Empty {
                                reader.read_empty()?;
                                return Ok(Box::new(<$t>::default()) as Box<dyn Any>);
                            }
                            reader.$read().map(|v| Box::new(v) as Box<dyn Any>)
                        },
                        |writer, value| writer.$write(*downcast::<$t>(value)?),
                    )
                })
            }
        }
    )+};
}

impl_scalar_shape! {
    bool => Bool, read_bool, write_bool;
    i8 => I8, read_i8, write_i8;
    i16 => I16, read_i16, write_i16;
    i32 => I32, read_i32, write_i32;
    i64 => I64, read_i64, write_i64;
    i128 => I128, read_i128, write_i128;
    u8 => U8, read_u8, write_u8;
    u16 => U16, read_u16, write_u16;
    u32 => U32, read_u32, write_u32;
    u64 => U64, read_u64, write_u64;
    u128 => U128, read_u128, write_u128;
    f32 => F32, read_f32, write_f32;
    f64 => F64, read_f64, write_f64;
    char => Char, read_char, write_char;
    Decimal => Decimal, read_decimal, write_decimal;
    DateTime<Utc> => DateTime, read_datetime, write_datetime;
}

impl Shaped for String {
    fn shape() -> &'static Shape {
        static CELL: NonGenericShapeCell = NonGenericShapeCell::new();
        CELL.get_or_init(|| {
            Shape::scalar::<String>(
                ScalarKind::Str,
                |reader| {
                    if reader.kind() == ValueKind::Empty {
                        reader.read_empty()?;
                        return Ok(Box::new(String::new()) as Box<dyn Any>);
                    }
                    reader.read_str().map(|v| Box::new(v) as Box<dyn Any>)
                },
                |writer, value| writer.write_str(downcast::<String>(value)?),
            )
        })
    }
}

// -----------------------------------------------------------------------------
// Tuples

// The unit type transfers as a tuple of zero values.
impl Shaped for () {
    fn shape() -> &'static Shape {
        static CELL: NonGenericShapeCell = NonGenericShapeCell::new();
        CELL.get_or_init(|| {
            Shape::tuple::<()>(
                0,
                |_reader| Ok(Box::new(())),
                |_writer, value| downcast::<()>(value).map(|_| ()),
            )
        })
    }
}

macro_rules! impl_tuple_shape {
    ($arity:literal; $($t:ident . $idx:tt),+) => {
        impl<$($t: Shaped + Default),+> Shaped for ($($t,)+) {
            fn shape() -> &'static Shape {
                static CELL: GenericShapeCell = GenericShapeCell::new();
                CELL.get_or_insert::<Self>(|| {
                    Shape::tuple::<Self>(
                        $arity,
                        |reader| {
                            // A tuple nested in a container arrives as one
                            // array value instead of sequential values.
                            if reader.kind() == ValueKind::Array {
                                let source = reader.read_array()?;
                                let value: Self = ($({
                                    let mut entry =
                                        source.entry(&($idx as usize)).ok_or(Error::EndOfStream)?;
                                    TypeStrategy::<$t>::read(entry.as_mut())?
                                },)+);
                                return Ok(Box::new(value) as Box<dyn Any>);
                            }
                            let value: Self = ($(TypeStrategy::<$t>::read(reader)?,)+);
                            Ok(Box::new(value))
                        },
                        |writer, value| {
                            let value = downcast::<Self>(value)?;
                            $(TypeStrategy::<$t>::write(writer, &value.$idx)?;)+
                            Ok(())
                        },
                    )
                })
            }
        }
    };
}

impl_tuple_shape!(1; A.0);
impl_tuple_shape!(2; A.0, B.1);
impl_tuple_shape!(3; A.0, B.1, C.2);
impl_tuple_shape!(4; A.0, B.1, C.2, D.3);
impl_tuple_shape!(5; A.0, B.1, C.2, D.3, E.4);
impl_tuple_shape!(6; A.0, B.1, C.2, D.3, E.4, F.5);
impl_tuple_shape!(7; A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_tuple_shape!(8; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
impl_tuple_shape!(9; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8);
impl_tuple_shape!(10; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9);
impl_tuple_shape!(11; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10);
impl_tuple_shape!(12; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10, L.11);

// -----------------------------------------------------------------------------
// Option

impl<T: Shaped> Shaped for Option<T> {
    fn shape() -> &'static Shape {
        static CELL: GenericShapeCell = GenericShapeCell::new();
        CELL.get_or_insert::<Self>(|| {
            Shape::optional::<Self>(
                T::shape,
                |reader| {
                    if reader.kind() == ValueKind::Empty {
                        reader.read_empty()?;
                        return Ok(Box::new(None::<T>));
                    }
                    TypeStrategy::<T>::read(reader).map(|v| Box::new(Some(v)) as Box<dyn Any>)
                },
                |writer, value| match downcast::<Self>(value)? {
                    Some(inner) => TypeStrategy::<T>::write(writer, inner),
                    None => writer.write_empty(),
                },
            )
        })
    }
}

// -----------------------------------------------------------------------------
// Sequences

fn read_sequence<T: Shaped>(reader: &mut dyn ValueReader) -> Result<Box<dyn Any>> {
    if reader.kind() == ValueKind::Empty {
        reader.read_empty()?;
        return Ok(Box::new(Vec::<T>::new()));
    }
    let source = reader.read_array()?;
    let mut items = Vec::with_capacity(source.len());
    for index in 0..source.len() {
        let mut entry = source
            .entry(&index)
            .ok_or_else(|| Error::custom("array source skipped an index"))?;
        items.push(TypeStrategy::<T>::read(entry.as_mut())?);
    }
    Ok(Box::new(items))
}

impl<T: Shaped> Shaped for Vec<T> {
    fn shape() -> &'static Shape {
        static CELL: GenericShapeCell = GenericShapeCell::new();
        CELL.get_or_insert::<Self>(|| {
            Shape::sequence::<Self>(T::shape, read_sequence::<T>, |writer, value| {
                let items = downcast::<Self>(value)?;
                writer.write_array(&SliceSource::new(items))
            })
        })
    }
}

// -----------------------------------------------------------------------------
// Mappings

fn read_mapping<M, V>(reader: &mut dyn ValueReader) -> Result<M>
where
    M: Default + Extend<(String, V)>,
    V: Shaped,
{
    let mut map = M::default();
    if reader.kind() == ValueKind::Empty {
        reader.read_empty()?;
        return Ok(map);
    }
    let source = reader.read_object()?;
    for key in source.keys() {
        let mut entry = source
            .entry(&key)
            .ok_or_else(|| Error::custom("object source dropped a listed key"))?;
        let value = TypeStrategy::<V>::read(entry.as_mut())?;
        map.extend([(key, value)]);
    }
    Ok(map)
}

macro_rules! impl_map_shape {
    ($map:ident) => {
        impl<V, S> Shaped for $map<String, V, S>
        where
            V: Shaped,
            S: BuildHasher + Default + 'static,
        {
            fn shape() -> &'static Shape {
                static CELL: GenericShapeCell = GenericShapeCell::new();
                CELL.get_or_insert::<Self>(|| {
                    Shape::mapping::<Self>(
                        V::shape,
                        |reader| read_mapping::<Self, V>(reader).map(|m| Box::new(m) as Box<dyn Any>),
                        |writer, value| {
                            let map = downcast::<Self>(value)?;
                            writer.write_object(&MapSource::new(map.iter()))
                        },
                    )
                })
            }
        }
    };
}

use dp_utils::hash::hashbrown::HashMap as BrownMap;
use std::collections::HashMap as StdMap;

impl_map_shape!(StdMap);
impl_map_shape!(BrownMap);

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::{MemReader, MemValue, MemWriter};
    use crate::shape::ShapeKind;
    use alloc::vec;

    fn write_one<T: Shaped>(value: &T) -> MemValue {
        let mut writer = MemWriter::new();
        TypeStrategy::<T>::write(&mut writer, value).unwrap();
        writer.into_slot()
    }

    fn read_one<T: Shaped>(value: &MemValue) -> T {
        let mut reader = MemReader::single(value);
        TypeStrategy::<T>::read(&mut reader).unwrap()
    }

    #[test]
    fn scalars_round_trip() {
        assert_eq!(write_one(&42i32), MemValue::I32(42));
        assert_eq!(read_one::<i32>(&MemValue::I32(42)), 42);
        assert_eq!(write_one(&String::from("hi")), MemValue::from("hi"));
        assert_eq!(read_one::<String>(&MemValue::from("hi")), "hi");
    }

    #[test]
    fn scalars_read_empty_as_default() {
        assert_eq!(read_one::<i32>(&MemValue::Empty), 0);
        assert_eq!(read_one::<String>(&MemValue::Empty), "");
        assert_eq!(
            read_one::<DateTime<Utc>>(&MemValue::Empty),
            DateTime::<Utc>::UNIX_EPOCH
        );
    }

    #[test]
    fn tuple_is_sequential_values() {
        let mut writer = MemWriter::new();
        TypeStrategy::<(i32, bool, String)>::write(&mut writer, &(1, true, "x".into())).unwrap();
        // Three roots, not a nested container.
        assert_eq!(
            writer.values(),
            &[MemValue::I32(1), MemValue::Bool(true), MemValue::from("x")]
        );

        let values = vec![MemValue::I32(1), MemValue::Bool(true), MemValue::from("x")];
        let mut reader = MemReader::sequence(&values);
        let tuple = TypeStrategy::<(i32, bool, String)>::read(&mut reader).unwrap();
        assert_eq!(tuple, (1, true, String::from("x")));
    }

    #[test]
    fn tuple_reads_from_array_form() {
        let value = MemValue::Array(vec![MemValue::I32(1), MemValue::Bool(true)]);
        let mut reader = MemReader::single(&value);
        let tuple = TypeStrategy::<(i32, bool)>::read(&mut reader).unwrap();
        assert_eq!(tuple, (1, true));
    }

    #[test]
    fn option_round_trip() {
        assert_eq!(write_one(&Some(5u8)), MemValue::U8(5));
        assert_eq!(write_one(&None::<u8>), MemValue::Empty);
        assert_eq!(read_one::<Option<u8>>(&MemValue::U8(5)), Some(5));
        assert_eq!(read_one::<Option<u8>>(&MemValue::Empty), None);
    }

    #[test]
    fn vec_round_trip() {
        let items = vec![1i64, 2, 3];
        let written = write_one(&items);
        assert_eq!(
            written,
            MemValue::Array(vec![MemValue::I64(1), MemValue::I64(2), MemValue::I64(3)])
        );
        assert_eq!(read_one::<Vec<i64>>(&written), items);
    }

    #[test]
    fn map_round_trip() {
        let mut map = StdMap::new();
        map.insert(String::from("a"), 1u32);
        map.insert(String::from("b"), 2u32);
        let written = write_one(&map);
        assert_eq!(read_one::<StdMap<String, u32>>(&written), map);
    }

    #[test]
    fn generic_cell_separates_instantiations() {
        let a = Vec::<u8>::shape();
        let b = Vec::<u16>::shape();
        assert_ne!(a.ty(), b.ty());
        match a.kind() {
            ShapeKind::Sequence(seq) => assert_eq!((seq.item)().ty(), u8::shape().ty()),
            _ => panic!("expected a sequence shape"),
        }
    }
}

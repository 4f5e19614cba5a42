//! Declarative [`Shaped`](crate::shape::Shaped) implementations for user
//! types.

/// Implements [`Shaped`](crate::shape::Shaped) for a struct with named
/// fields.
///
/// Every field type must itself be `Shaped`, and the struct must implement
/// `Default` so an instance can be rebuilt from a value stream. Each field
/// gets a cached offset-based [`FastAccessor`](crate::access::FastAccessor).
///
/// # Examples
///
/// ```
/// use dp_proto::impl_struct_shape;
///
/// #[derive(Clone, Debug, Default, PartialEq)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl_struct_shape!(Point { x: i32, y: i32 });
/// ```
#[macro_export]
macro_rules! impl_struct_shape {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }) => {
        impl $crate::shape::Shaped for $ty {
            fn shape() -> &'static $crate::shape::Shape {
                static CELL: $crate::shape::NonGenericShapeCell =
                    $crate::shape::NonGenericShapeCell::new();
                CELL.get_or_init(|| {
                    $crate::shape::Shape::structure::<$ty>($crate::__private::Box::new([
                        $(
                            $crate::shape::FieldShape::new::<$fty>(
                                ::core::stringify!($field),
                                || {
                                    static ACCESSOR: $crate::__private::OnceLock<
                                        $crate::access::FastAccessor,
                                    > = $crate::__private::OnceLock::new();
                                    ACCESSOR.get_or_init(|| {
                                        $crate::access::FastAccessor::field::<$ty, $fty>(
                                            ::core::stringify!($field),
                                            ::core::mem::offset_of!($ty, $field),
                                        )
                                    })
                                },
                            ),
                        )*
                    ]))
                })
            }
        }
    };
}

/// Implements [`Shaped`](crate::shape::Shaped) for a fieldless enum.
///
/// The enum transfers as its variant name. Reading an empty value yields the
/// first listed variant.
///
/// # Examples
///
/// ```
/// use dp_proto::impl_enum_shape;
///
/// #[derive(Clone, Copy, Debug, PartialEq)]
/// enum Mode {
///     Idle,
///     Active,
/// }
///
/// impl_enum_shape!(Mode { Idle, Active });
/// ```
#[macro_export]
macro_rules! impl_enum_shape {
    ($ty:ident { $first:ident $(, $rest:ident)* $(,)? }) => {
        impl $crate::shape::Shaped for $ty {
            fn shape() -> &'static $crate::shape::Shape {
                static CELL: $crate::shape::NonGenericShapeCell =
                    $crate::shape::NonGenericShapeCell::new();
                CELL.get_or_init(|| {
                    $crate::shape::Shape::enumeration::<$ty>(
                        $crate::shape::EnumShape::new(
                            $crate::__private::Box::new([
                                $crate::shape::VariantShape {
                                    name: ::core::stringify!($first),
                                    discriminant: $ty::$first as i64,
                                },
                                $(
                                    $crate::shape::VariantShape {
                                        name: ::core::stringify!($rest),
                                        discriminant: $ty::$rest as i64,
                                    },
                                )*
                            ]),
                            |value| match value.downcast_ref::<$ty>() {
                                Some($ty::$first) => Ok(::core::stringify!($first)),
                                $(Some($ty::$rest) => Ok(::core::stringify!($rest)),)*
                                None => Err($crate::error::Error::target_mismatch(
                                    ::core::any::type_name::<$ty>(),
                                    "value of a different type",
                                )),
                            },
                            |name| match name {
                                ::core::stringify!($first) => Some(
                                    $crate::__private::Box::new($ty::$first)
                                        as $crate::__private::Box<dyn ::core::any::Any>,
                                ),
                                $(
                                    ::core::stringify!($rest) => Some(
                                        $crate::__private::Box::new($ty::$rest)
                                            as $crate::__private::Box<dyn ::core::any::Any>,
                                    ),
                                )*
                                _ => None,
                            },
                        ),
                        || $crate::__private::Box::new($ty::$first),
                    )
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::mem::{MemReader, MemValue, MemWriter};
    use crate::shape::{ShapeKind, Shaped};
    use crate::strategy::TypeStrategy;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl_struct_shape!(Point { x: i32, y: i32 });

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    enum Mode {
        #[default]
        Idle,
        Active,
        Faulted,
    }

    impl_enum_shape!(Mode { Idle, Active, Faulted });

    #[test]
    fn struct_shape_lists_fields() {
        let ShapeKind::Struct(shape) = Point::shape().kind() else {
            panic!("expected a struct shape");
        };
        let names: Vec<_> = shape.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["x", "y"]);
        assert_eq!(shape.field("y").unwrap().index(), 1);
        assert!(shape.field("z").is_none());
    }

    #[test]
    fn struct_round_trip() {
        let point = Point { x: 3, y: -4 };
        let mut writer = MemWriter::new();
        TypeStrategy::<Point>::write(&mut writer, &point).unwrap();
        let value = writer.into_single().unwrap();
        assert_eq!(value.get("x"), Some(&MemValue::I32(3)));

        let mut reader = MemReader::single(&value);
        let back = TypeStrategy::<Point>::read(&mut reader).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn enum_transfers_by_name() {
        let mut writer = MemWriter::new();
        TypeStrategy::<Mode>::write(&mut writer, &Mode::Active).unwrap();
        let value = writer.into_single().unwrap();
        assert_eq!(value, MemValue::from("Active"));

        let mut reader = MemReader::single(&value);
        assert_eq!(TypeStrategy::<Mode>::read(&mut reader).unwrap(), Mode::Active);
    }

    #[test]
    fn enum_reads_empty_as_first_variant() {
        let value = MemValue::Empty;
        let mut reader = MemReader::single(&value);
        assert_eq!(TypeStrategy::<Mode>::read(&mut reader).unwrap(), Mode::Idle);
    }

    #[test]
    fn enum_rejects_unknown_names() {
        let value = MemValue::from("Sleeping");
        let mut reader = MemReader::single(&value);
        assert!(TypeStrategy::<Mode>::read(&mut reader).is_err());
    }

    #[test]
    fn enum_variant_metadata() {
        let ShapeKind::Enum(shape) = Mode::shape().kind() else {
            panic!("expected an enum shape");
        };
        assert_eq!(shape.variants().len(), 3);
        assert_eq!(shape.variants()[2].name, "Faulted");
        assert_eq!(shape.variants()[2].discriminant, 2);
    }
}

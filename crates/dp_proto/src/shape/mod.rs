//! Static descriptions of transferable types.
//!
//! A [`Shape`] records how a type maps onto the protocol's data model: which
//! scalar it is, which fields a struct carries, what an enum's variants are
//! called. Shapes are built once per type and cached in statics, so every
//! lookup after the first is a pointer read.
//!
//! Types opt in by implementing [`Shaped`], usually through the
//! [`impl_struct_shape!`](crate::impl_struct_shape) and
//! [`impl_enum_shape!`](crate::impl_enum_shape) macros or the built-in
//! implementations for scalars, tuples, `Option`, `Vec` and string-keyed
//! maps.

mod cell;
mod impls;
mod macros;

pub use cell::{GenericShapeCell, NonGenericShapeCell};

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::any::{Any, TypeId, type_name};
use core::fmt;

use crate::access::FastAccessor;
use crate::error::Result;
use crate::strategy::{ErasedStrategy, TypeStrategy};
use crate::value::{ScalarKind, ValueKind, ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// Type

/// A type's identity: its `TypeId` plus a readable name for diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Type {
    id: TypeId,
    name: &'static str,
}

impl Type {
    /// The identity of `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Does `value` have this type?
    #[inline]
    pub fn is(&self, value: &dyn Any) -> bool {
        value.type_id() == self.id
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// -----------------------------------------------------------------------------
// Shaped

/// A type with a static [`Shape`].
pub trait Shaped: 'static {
    fn shape() -> &'static Shape;
}

// -----------------------------------------------------------------------------
// Shape

/// Reads a value of the described type off a value stream.
pub type ReadFn = fn(&mut dyn ValueReader) -> Result<Box<dyn Any>>;

/// Writes a value of the described type onto a value stream.
pub type WriteFn = fn(&mut dyn ValueWriter, &dyn Any) -> Result<()>;

/// How a type maps onto the protocol's data model.
pub struct Shape {
    ty: Type,
    kind: ShapeKind,
    default_fn: Option<fn() -> Box<dyn Any>>,
}

impl Shape {
    /// A shape for a type the protocol treats as opaque.
    pub fn opaque<T: 'static>() -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Opaque,
            default_fn: None,
        }
    }

    /// A scalar shape.
    pub fn scalar<T: Default + 'static>(kind: ScalarKind, read: ReadFn, write: WriteFn) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Scalar(ScalarOps { kind, read, write }),
            default_fn: Some(default_boxed::<T>),
        }
    }

    /// A struct shape over `fields`.
    pub fn structure<T: Default + 'static>(fields: Box<[FieldShape]>) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Struct(StructShape::new(fields)),
            default_fn: Some(default_boxed::<T>),
        }
    }

    /// An enum shape over `variants`.
    pub fn enumeration<T: 'static>(shape: EnumShape, default_fn: fn() -> Box<dyn Any>) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Enum(shape),
            default_fn: Some(default_fn),
        }
    }

    /// A tuple shape of the given arity.
    pub fn tuple<T: Default + 'static>(arity: usize, read: ReadFn, write: WriteFn) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Tuple(TupleShape { arity, read, write }),
            default_fn: Some(default_boxed::<T>),
        }
    }

    /// An optional shape wrapping `inner`.
    pub fn optional<T: Default + 'static>(
        inner: fn() -> &'static Shape,
        read: ReadFn,
        write: WriteFn,
    ) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Optional(OptionalShape { inner, read, write }),
            default_fn: Some(default_boxed::<T>),
        }
    }

    /// A sequence shape over items of `item`'s shape.
    pub fn sequence<T: Default + 'static>(
        item: fn() -> &'static Shape,
        read: ReadFn,
        write: WriteFn,
    ) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Sequence(SequenceShape { item, read, write }),
            default_fn: Some(default_boxed::<T>),
        }
    }

    /// A string-keyed mapping shape over values of `value`'s shape.
    pub fn mapping<T: Default + 'static>(
        value: fn() -> &'static Shape,
        read: ReadFn,
        write: WriteFn,
    ) -> Self {
        Self {
            ty: Type::of::<T>(),
            kind: ShapeKind::Mapping(MappingShape { value, read, write }),
            default_fn: Some(default_boxed::<T>),
        }
    }

    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    #[inline]
    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// The protocol kind values of this shape produce.
    pub fn value_kind(&self) -> ValueKind {
        match &self.kind {
            ShapeKind::Scalar(ops) => ValueKind::Scalar(ops.kind),
            ShapeKind::Struct(_) | ShapeKind::Mapping(_) => ValueKind::Object,
            ShapeKind::Tuple(_) | ShapeKind::Sequence(_) => ValueKind::Array,
            ShapeKind::Enum(_) => ValueKind::Scalar(ScalarKind::Str),
            ShapeKind::Optional(optional) => (optional.inner)().value_kind(),
            ShapeKind::Opaque => ValueKind::Empty,
        }
    }

    /// A fresh default value, when the type has one.
    pub fn default_value(&self) -> Option<Box<dyn Any>> {
        self.default_fn.map(|ctor| ctor())
    }

    #[inline]
    pub(crate) fn default_fn(&self) -> Option<fn() -> Box<dyn Any>> {
        self.default_fn
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("ty", &self.ty)
            .field("kind", &self.kind.discriminant_name())
            .finish_non_exhaustive()
    }
}

fn default_boxed<T: Default + 'static>() -> Box<dyn Any> {
    Box::new(T::default())
}

// -----------------------------------------------------------------------------
// ShapeKind

/// The structural category of a [`Shape`].
pub enum ShapeKind {
    Scalar(ScalarOps),
    Tuple(TupleShape),
    Struct(StructShape),
    Enum(EnumShape),
    Optional(OptionalShape),
    Sequence(SequenceShape),
    Mapping(MappingShape),
    Opaque,
}

impl ShapeKind {
    fn discriminant_name(&self) -> &'static str {
        match self {
            ShapeKind::Scalar(_) => "scalar",
            ShapeKind::Tuple(_) => "tuple",
            ShapeKind::Struct(_) => "struct",
            ShapeKind::Enum(_) => "enum",
            ShapeKind::Optional(_) => "optional",
            ShapeKind::Sequence(_) => "sequence",
            ShapeKind::Mapping(_) => "mapping",
            ShapeKind::Opaque => "opaque",
        }
    }
}

/// Transfer functions for a scalar type.
pub struct ScalarOps {
    pub kind: ScalarKind,
    pub read: ReadFn,
    pub write: WriteFn,
}

/// Transfer functions for a tuple, written as `arity` sequential values.
pub struct TupleShape {
    pub arity: usize,
    pub read: ReadFn,
    pub write: WriteFn,
}

/// The named fields of a struct, in declaration order.
pub struct StructShape {
    fields: Box<[FieldShape]>,
}

impl StructShape {
    pub fn new(mut fields: Box<[FieldShape]>) -> Self {
        for (index, field) in fields.iter_mut().enumerate() {
            field.index = index;
        }
        Self { fields }
    }

    #[inline]
    pub fn fields(&self) -> &[FieldShape] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldShape> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// One named struct field.
pub struct FieldShape {
    name: &'static str,
    index: usize,
    shape: fn() -> &'static Shape,
    strategy: fn() -> Result<Arc<dyn ErasedStrategy>>,
    accessor: fn() -> &'static FastAccessor,
}

impl FieldShape {
    /// Describe a field of type `F` reached through `accessor`.
    pub fn new<F: Shaped>(name: &'static str, accessor: fn() -> &'static FastAccessor) -> Self {
        Self {
            name,
            index: 0,
            shape: F::shape,
            strategy: TypeStrategy::<F>::erased,
            accessor,
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Position within the declaring struct.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn shape(&self) -> &'static Shape {
        (self.shape)()
    }

    /// The transfer strategy resolved for the field's type.
    pub fn strategy(&self) -> Result<Arc<dyn ErasedStrategy>> {
        (self.strategy)()
    }

    #[inline]
    pub fn accessor(&self) -> &'static FastAccessor {
        (self.accessor)()
    }
}

/// An enum transferred by variant name.
pub struct EnumShape {
    variants: Box<[VariantShape]>,
    to_name: fn(&dyn Any) -> Result<&'static str>,
    from_name: fn(&str) -> Option<Box<dyn Any>>,
}

impl EnumShape {
    pub fn new(
        variants: Box<[VariantShape]>,
        to_name: fn(&dyn Any) -> Result<&'static str>,
        from_name: fn(&str) -> Option<Box<dyn Any>>,
    ) -> Self {
        Self {
            variants,
            to_name,
            from_name,
        }
    }

    #[inline]
    pub fn variants(&self) -> &[VariantShape] {
        &self.variants
    }

    /// The variant name of `value`.
    pub fn to_name(&self, value: &dyn Any) -> Result<&'static str> {
        (self.to_name)(value)
    }

    /// Construct the variant called `name`.
    pub fn from_name(&self, name: &str) -> Option<Box<dyn Any>> {
        (self.from_name)(name)
    }
}

/// One enum variant.
#[derive(Clone, Copy, Debug)]
pub struct VariantShape {
    pub name: &'static str,
    pub discriminant: i64,
}

/// An `Option`-like type: empty on the wire when absent.
pub struct OptionalShape {
    pub inner: fn() -> &'static Shape,
    pub read: ReadFn,
    pub write: WriteFn,
}

/// A homogeneous sequence, transferred as an array.
pub struct SequenceShape {
    pub item: fn() -> &'static Shape,
    pub read: ReadFn,
    pub write: WriteFn,
}

/// A string-keyed mapping, transferred as an object.
pub struct MappingShape {
    pub value: fn() -> &'static Shape,
    pub read: ReadFn,
    pub write: WriteFn,
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_identity() {
        let ty = Type::of::<u32>();
        assert_eq!(ty.id(), TypeId::of::<u32>());
        assert!(ty.is(&7u32));
        assert!(!ty.is(&7u64));
    }

    #[test]
    fn scalar_value_kinds() {
        assert_eq!(
            u8::shape().value_kind(),
            ValueKind::Scalar(ScalarKind::U8)
        );
        assert_eq!(
            Option::<u8>::shape().value_kind(),
            ValueKind::Scalar(ScalarKind::U8)
        );
        assert_eq!(
            alloc::vec::Vec::<u8>::shape().value_kind(),
            ValueKind::Array
        );
    }

    #[test]
    fn defaults() {
        let value = u32::shape().default_value().unwrap();
        assert_eq!(value.downcast_ref::<u32>(), Some(&0));
    }
}

//! Fast type-erased member access.
//!
//! A [`FastAccessor`] reaches one member of an owner type without going
//! through a value stream: plain fields by offset, computed members through
//! getter and setter functions, statics and constants without an instance.
//! The owner's identity is checked before any pointer is dereferenced, so a
//! mismatched instance is an error, never undefined behavior.
//!
//! When the requested type differs from the member's declared type, reads
//! and writes go through the checked conversions in [`convert`](crate::convert).
#![expect(
    unsafe_code,
    reason = "Offset access dereferences raw member pointers."
)]

use alloc::boxed::Box;
use core::any::{Any, TypeId, type_name};

use dp_ptr::{Ptr, PtrMut};

use crate::convert::convert_erased;
use crate::error::{AccessOp, Error, Result};
use crate::shape::Type;

// -----------------------------------------------------------------------------
// Flags

/// What a [`FastAccessor`] permits.
#[derive(Clone, Copy, Debug)]
pub struct AccessorFlags {
    pub readable: bool,
    pub writable: bool,
    pub is_static: bool,
    pub is_public: bool,
}

// -----------------------------------------------------------------------------
// Kinds

type InstanceGetFn = Box<dyn Fn(Ptr<'_>) -> Result<Box<dyn Any>> + Send + Sync>;
type InstanceSetFn = Box<dyn Fn(PtrMut<'_>, Box<dyn Any>) -> Result<()> + Send + Sync>;
type StaticGetFn = Box<dyn Fn() -> Result<Box<dyn Any>> + Send + Sync>;
type StaticSetFn = Box<dyn Fn(Box<dyn Any>) -> Result<()> + Send + Sync>;

enum AccessorKind {
    /// A plain field at a fixed offset inside the owner.
    Offset {
        offset: usize,
        clone_at: unsafe fn(Ptr<'_>) -> Box<dyn Any>,
        store_at: unsafe fn(PtrMut<'_>, Box<dyn Any>) -> Result<()>,
    },
    /// A computed member behind getter and setter functions.
    Property {
        get: Option<InstanceGetFn>,
        set: Option<InstanceSetFn>,
    },
    /// A member that needs no instance.
    Static {
        get: Option<StaticGetFn>,
        set: Option<StaticSetFn>,
    },
}

// SAFETY: caller guarantees `ptr` addresses an initialized `F`.
unsafe fn clone_field<F: Clone + 'static>(ptr: Ptr<'_>) -> Box<dyn Any> {
    Box::new(unsafe { ptr.as_ref::<F>() }.clone())
}

// SAFETY: caller guarantees `ptr` addresses an initialized `F` and that
// `value` holds an `F`.
unsafe fn store_field<F: 'static>(ptr: PtrMut<'_>, value: Box<dyn Any>) -> Result<()> {
    match value.downcast::<F>() {
        Ok(value) => {
            *unsafe { ptr.consume::<F>() } = *value;
            Ok(())
        }
        Err(_) => Err(Error::target_mismatch(
            type_name::<F>(),
            "value of a different type",
        )),
    }
}

// -----------------------------------------------------------------------------
// FastAccessor

/// Type-erased access to one member of an owner type.
pub struct FastAccessor {
    owner: Type,
    declared: Type,
    name: &'static str,
    flags: AccessorFlags,
    kind: AccessorKind,
}

impl FastAccessor {
    /// An accessor for the field of `O` at `offset`, declared as `F`.
    ///
    /// `offset` must come from `offset_of!`; anything else reads the wrong
    /// memory.
    pub fn field<O: 'static, F: Clone + 'static>(name: &'static str, offset: usize) -> Self {
        Self {
            owner: Type::of::<O>(),
            declared: Type::of::<F>(),
            name,
            flags: AccessorFlags {
                readable: true,
                writable: true,
                is_static: false,
                is_public: true,
            },
            kind: AccessorKind::Offset {
                offset,
                clone_at: clone_field::<F>,
                store_at: store_field::<F>,
            },
        }
    }

    /// An accessor for a computed member with an optional setter.
    pub fn property<O: 'static, F: 'static>(
        name: &'static str,
        get: fn(&O) -> F,
        set: Option<fn(&mut O, F)>,
    ) -> Self {
        let get_fn: InstanceGetFn = Box::new(move |ptr| {
            // SAFETY: get_value verified the owner type before handing out ptr.
            let owner = unsafe { ptr.as_ref::<O>() };
            Ok(Box::new(get(owner)))
        });
        let set_fn = set.map(|set| -> InstanceSetFn {
            Box::new(move |ptr, value| {
                let value = value.downcast::<F>().map_err(|_| {
                    Error::target_mismatch(type_name::<F>(), "value of a different type")
                })?;
                // SAFETY: set_value verified the owner type before handing out ptr.
                set(unsafe { ptr.consume::<O>() }, *value);
                Ok(())
            })
        });
        Self {
            owner: Type::of::<O>(),
            declared: Type::of::<F>(),
            name,
            flags: AccessorFlags {
                readable: true,
                writable: set_fn.is_some(),
                is_static: false,
                is_public: true,
            },
            kind: AccessorKind::Property {
                get: Some(get_fn),
                set: set_fn,
            },
        }
    }

    /// An accessor for a member that needs no instance.
    pub fn static_property<O: 'static, F: 'static>(
        name: &'static str,
        get: fn() -> F,
        set: Option<fn(F)>,
    ) -> Self {
        let get_fn: StaticGetFn = Box::new(move || Ok(Box::new(get()) as Box<dyn Any>));
        let set_fn = set.map(|set| -> StaticSetFn {
            Box::new(move |value| {
                let value = value.downcast::<F>().map_err(|_| {
                    Error::target_mismatch(type_name::<F>(), "value of a different type")
                })?;
                set(*value);
                Ok(())
            })
        });
        Self {
            owner: Type::of::<O>(),
            declared: Type::of::<F>(),
            name,
            flags: AccessorFlags {
                readable: true,
                writable: set_fn.is_some(),
                is_static: true,
                is_public: true,
            },
            kind: AccessorKind::Static {
                get: Some(get_fn),
                set: set_fn,
            },
        }
    }

    /// An accessor for a fixed value: a static without a setter.
    pub fn constant<O: 'static, F: 'static>(name: &'static str, value: fn() -> F) -> Self {
        Self {
            owner: Type::of::<O>(),
            declared: Type::of::<F>(),
            name,
            flags: AccessorFlags {
                readable: true,
                writable: false,
                is_static: true,
                is_public: true,
            },
            kind: AccessorKind::Static {
                get: Some(Box::new(move || Ok(Box::new(value()) as Box<dyn Any>))),
                set: None,
            },
        }
    }

    /// Mark the member as non-public metadata.
    pub fn non_public(mut self) -> Self {
        self.flags.is_public = false;
        self
    }

    #[inline]
    pub fn owner(&self) -> Type {
        self.owner
    }

    /// The member's declared type.
    #[inline]
    pub fn declared(&self) -> Type {
        self.declared
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn flags(&self) -> AccessorFlags {
        self.flags
    }

    fn check_owner(&self, instance: &dyn Any) -> Result<()> {
        if self.owner.is(instance) {
            Ok(())
        } else {
            Err(Error::target_mismatch(
                self.owner.name(),
                "instance of a different type",
            ))
        }
    }

    fn no_access(&self, op: AccessOp) -> Error {
        Error::missing_accessor(self.owner.name(), self.name, op)
    }

    /// Read the member from `instance`, boxed as its declared type.
    ///
    /// Static and constant members ignore `instance`.
    pub fn get_value(&self, instance: &dyn Any) -> Result<Box<dyn Any>> {
        if !self.flags.readable {
            return Err(self.no_access(AccessOp::Read));
        }
        match &self.kind {
            AccessorKind::Offset {
                offset, clone_at, ..
            } => {
                self.check_owner(instance)?;
                let ptr = Ptr::from_ref(instance);
                // SAFETY: the owner type matched, so offset lands on an
                // initialized member of the declared type.
                Ok(unsafe { clone_at(ptr.byte_add(*offset)) })
            }
            AccessorKind::Property { get, .. } => {
                let get = get.as_ref().ok_or_else(|| self.no_access(AccessOp::Read))?;
                self.check_owner(instance)?;
                get(Ptr::from_ref(instance))
            }
            AccessorKind::Static { get, .. } => {
                let get = get.as_ref().ok_or_else(|| self.no_access(AccessOp::Read))?;
                get()
            }
        }
    }

    /// Store `value` into the member of `instance`.
    ///
    /// A value of a different scalar type is converted to the declared type
    /// first, when the conversion is lossless.
    pub fn set_value(&self, instance: &mut dyn Any, value: Box<dyn Any>) -> Result<()> {
        if !self.flags.writable {
            return Err(self.no_access(AccessOp::Write));
        }
        let value = if value.as_ref().type_id() == self.declared.id() {
            value
        } else {
            convert_erased(
                self.declared.id(),
                self.declared.name(),
                value.as_ref(),
                "incoming value",
            )?
        };
        match &self.kind {
            AccessorKind::Offset {
                offset, store_at, ..
            } => {
                self.check_owner(instance)?;
                let ptr = PtrMut::from_mut(instance);
                // SAFETY: the owner type matched and the value was converted
                // to the declared type above.
                unsafe { store_at(ptr.byte_add(*offset), value) }
            }
            AccessorKind::Property { set, .. } => {
                let set = set.as_ref().ok_or_else(|| self.no_access(AccessOp::Write))?;
                self.check_owner(instance)?;
                set(PtrMut::from_mut(instance), value)
            }
            AccessorKind::Static { set, .. } => {
                let set = set.as_ref().ok_or_else(|| self.no_access(AccessOp::Write))?;
                set(value)
            }
        }
    }

    /// Read the member as `V`, converting when the declared type differs.
    pub fn read_value<V: Clone + 'static>(&self, instance: &dyn Any) -> Result<V> {
        if TypeId::of::<V>() == self.declared.id()
            && self.flags.readable
            && let AccessorKind::Offset { offset, .. } = &self.kind
        {
            self.check_owner(instance)?;
            let ptr = Ptr::from_ref(instance);
            // SAFETY: V is the declared member type and the owner matched.
            return Ok(unsafe { ptr.byte_add(*offset).as_ref::<V>() }.clone());
        }
        let boxed = self.get_value(instance)?;
        match boxed.downcast::<V>() {
            Ok(value) => Ok(*value),
            Err(boxed) => {
                let converted = convert_erased(
                    TypeId::of::<V>(),
                    type_name::<V>(),
                    boxed.as_ref(),
                    self.declared.name(),
                )?;
                converted
                    .downcast::<V>()
                    .map(|value| *value)
                    .map_err(|_| Error::unsupported_conversion(self.declared.name(), type_name::<V>()))
            }
        }
    }

    /// Store `value` into the member, converting when the declared type
    /// differs.
    pub fn write_value<V: 'static>(&self, instance: &mut dyn Any, value: V) -> Result<()> {
        if TypeId::of::<V>() == self.declared.id()
            && self.flags.writable
            && let AccessorKind::Offset { offset, .. } = &self.kind
        {
            self.check_owner(instance)?;
            let ptr = PtrMut::from_mut(instance);
            // SAFETY: V is the declared member type and the owner matched.
            *unsafe { ptr.byte_add(*offset).consume::<V>() } = value;
            return Ok(());
        }
        self.set_value(instance, Box::new(value))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::offset_of;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Sensor {
        id: u32,
        gain: f64,
    }

    fn id_accessor() -> FastAccessor {
        FastAccessor::field::<Sensor, u32>("id", offset_of!(Sensor, id))
    }

    #[test]
    fn field_round_trip() {
        let mut sensor = Sensor { id: 7, gain: 1.5 };
        let accessor = id_accessor();
        assert_eq!(accessor.read_value::<u32>(&sensor).unwrap(), 7);
        accessor.write_value(&mut sensor, 9u32).unwrap();
        assert_eq!(sensor.id, 9);
    }

    #[test]
    fn owner_is_checked_before_deref() {
        let wrong = 3.5f64;
        let accessor = id_accessor();
        match accessor.get_value(&wrong) {
            Err(Error::TargetMismatch { expected, .. }) => {
                assert!(expected.contains("Sensor"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn converting_reads_and_writes() {
        let mut sensor = Sensor { id: 250, gain: 0.0 };
        let accessor = id_accessor();
        // Widening read.
        assert_eq!(accessor.read_value::<i64>(&sensor).unwrap(), 250);
        // Narrowing write within range.
        accessor.write_value(&mut sensor, 12i64).unwrap();
        assert_eq!(sensor.id, 12);
        // Out of range.
        assert!(accessor.write_value(&mut sensor, -1i64).is_err());
        assert_eq!(sensor.id, 12);
    }

    #[test]
    fn properties() {
        let accessor = FastAccessor::property::<Sensor, f64>(
            "gain_db",
            |sensor| sensor.gain * 10.0,
            Some(|sensor, value: f64| sensor.gain = value / 10.0),
        );
        let mut sensor = Sensor { id: 0, gain: 2.0 };
        assert_eq!(accessor.read_value::<f64>(&sensor).unwrap(), 20.0);
        accessor.write_value(&mut sensor, 30.0f64).unwrap();
        assert_eq!(sensor.gain, 3.0);
    }

    #[test]
    fn getter_only_property_rejects_writes() {
        let accessor = FastAccessor::property::<Sensor, u32>("id_copy", |sensor| sensor.id, None);
        let mut sensor = Sensor::default();
        match accessor.write_value(&mut sensor, 1u32) {
            Err(Error::MissingAccessor { member, op, .. }) => {
                assert_eq!(member, "id_copy");
                assert_eq!(op, AccessOp::Write);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn statics_ignore_the_instance() {
        let accessor =
            FastAccessor::static_property::<Sensor, u32>("max_channels", || 16, None);
        assert_eq!(accessor.read_value::<u32>(&()).unwrap(), 16);
        assert!(accessor.flags().is_static);
    }

    #[test]
    fn constants_are_read_only() {
        let accessor = FastAccessor::constant::<Sensor, &'static str>("vendor", || "acme");
        assert_eq!(accessor.read_value::<&'static str>(&()).unwrap(), "acme");
        let mut unit = ();
        assert!(accessor.set_value(&mut unit, Box::new("other")).is_err());
    }
}

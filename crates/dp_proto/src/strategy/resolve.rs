//! Strategy resolution: an ordered mapper chain with a per-type cache.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::type_name;
use core::marker::PhantomData;
use std::sync::{LazyLock, PoisonError, RwLock};

use dp_utils::TypeIdMap;

use crate::error::{Error, Result};
use crate::shape::{Shape, Shaped, Type};
use crate::strategy::object::ObjectStrategy;
use crate::strategy::{ErasedStrategy, mappers};
use crate::value::{ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// StrategyMapper

/// The type a mapper is asked to cover.
pub struct MapTarget {
    pub ty: Type,
    pub shape: &'static Shape,
}

/// One link of the resolution chain.
///
/// A mapper inspects the target and either claims it by returning a strategy
/// or passes. Registered mappers are consulted in registration order before
/// any built-in, and the first to claim a type wins.
pub trait StrategyMapper: Send + Sync + 'static {
    fn try_map(&self, target: &MapTarget) -> Option<Arc<dyn ErasedStrategy>>;
}

// -----------------------------------------------------------------------------
// Registry

static CACHE: LazyLock<RwLock<TypeIdMap<Arc<dyn ErasedStrategy>>>> =
    LazyLock::new(|| RwLock::new(TypeIdMap::new()));

static CHAIN: LazyLock<RwLock<Vec<Arc<dyn StrategyMapper>>>> = LazyLock::new(|| {
    #[allow(unused_mut)]
    let mut chain: Vec<Arc<dyn StrategyMapper>> = Vec::new();
    #[cfg(feature = "auto_register")]
    for registration in inventory::iter::<mappers::MapperRegistration> {
        chain.push((registration.ctor)().into());
    }
    RwLock::new(chain)
});

/// The built-in shape mappers, consulted after every registered mapper.
static BUILTINS: [&dyn StrategyMapper; 6] = [
    &mappers::ScalarMapper,
    &mappers::TupleMapper,
    &mappers::EnumMapper,
    &mappers::OptionalMapper,
    &mappers::SequenceMapper,
    &mappers::MappingMapper,
];

/// Append `mapper` to the resolution chain.
///
/// Mappers registered earlier keep precedence; all of them outrank the
/// built-ins. Types already resolved keep their cached strategy, so mappers
/// should be registered before the first transfer touches the types they
/// cover.
pub fn register_mapper(mapper: impl StrategyMapper) {
    CHAIN
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Arc::new(mapper));
}

fn resolve(target: MapTarget) -> Result<Arc<dyn ErasedStrategy>> {
    if let Some(found) = CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&target.ty.id())
    {
        return Ok(found.clone());
    }

    // Snapshot the chain so mappers may resolve nested strategies without
    // holding the lock.
    let chain: Vec<Arc<dyn StrategyMapper>> = CHAIN
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    let mut resolved = None;
    for mapper in chain
        .iter()
        .map(Arc::as_ref)
        .chain(BUILTINS.iter().copied())
    {
        if let Some(strategy) = mapper.try_map(&target) {
            resolved = Some(strategy);
            break;
        }
    }
    let strategy = match resolved {
        Some(strategy) => strategy,
        None => ObjectStrategy::try_new(&target)?,
    };

    // First resolution wins; a concurrent resolver may have gotten there
    // before us.
    Ok(CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert(target.ty.id(), || strategy)
        .clone())
}

// -----------------------------------------------------------------------------
// TypeStrategy

/// The resolved transfer strategy of one type.
///
/// # Examples
///
/// ```
/// use dp_proto::mem::{MemReader, MemValue, MemWriter};
/// use dp_proto::strategy::TypeStrategy;
///
/// let mut writer = MemWriter::new();
/// TypeStrategy::<i32>::write(&mut writer, &7).unwrap();
/// let value = writer.into_single().unwrap();
/// assert_eq!(value, MemValue::I32(7));
///
/// let mut reader = MemReader::single(&value);
/// assert_eq!(TypeStrategy::<i32>::read(&mut reader).unwrap(), 7);
/// ```
pub struct TypeStrategy<T: ?Sized>(PhantomData<fn() -> T>);

impl<T: Shaped> TypeStrategy<T> {
    /// The erased strategy for `T`, resolving and caching it on first use.
    pub fn erased() -> Result<Arc<dyn ErasedStrategy>> {
        resolve(MapTarget {
            ty: Type::of::<T>(),
            shape: T::shape(),
        })
    }

    /// Read one `T` off the stream with the resolved strategy.
    pub fn read(reader: &mut dyn ValueReader) -> Result<T> {
        let boxed = Self::erased()?.read_boxed(reader)?;
        boxed.downcast::<T>().map(|v| *v).map_err(|_| {
            Error::strategy_resolution(
                type_name::<T>(),
                "the strategy produced a value of a different type",
            )
        })
    }

    /// Write one `T` onto the stream with the resolved strategy.
    pub fn write(writer: &mut dyn ValueWriter, value: &T) -> Result<()> {
        Self::erased()?.write_boxed(writer, value)
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::{MemReader, MemValue, MemWriter};
    use crate::strategy::{Strategy, erase};

    // Types used here must not be touched by other tests, since the cache
    // and chain are process-wide.
    #[derive(Clone, Debug, Default, PartialEq)]
    struct Fahrenheit {
        degrees: f64,
    }

    crate::impl_struct_shape!(Fahrenheit { degrees: f64 });

    struct FahrenheitAsScalar;

    impl Strategy<Fahrenheit> for FahrenheitAsScalar {
        fn read(&self, reader: &mut dyn ValueReader) -> Result<Fahrenheit> {
            reader.read_f64().map(|degrees| Fahrenheit { degrees })
        }

        fn write(&self, writer: &mut dyn ValueWriter, value: &Fahrenheit) -> Result<()> {
            writer.write_f64(value.degrees)
        }
    }

    struct FahrenheitMapper;

    impl StrategyMapper for FahrenheitMapper {
        fn try_map(&self, target: &MapTarget) -> Option<Arc<dyn ErasedStrategy>> {
            (target.ty == Type::of::<Fahrenheit>()).then(|| erase(FahrenheitAsScalar))
        }
    }

    #[test]
    fn custom_mapper_overrides_the_struct_fallback() {
        register_mapper(FahrenheitMapper);

        let mut writer = MemWriter::new();
        TypeStrategy::<Fahrenheit>::write(&mut writer, &Fahrenheit { degrees: 98.6 }).unwrap();
        // A scalar, not an object: the custom mapper won.
        assert_eq!(writer.into_single().unwrap(), MemValue::F64(98.6));
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Kelvin {
        degrees: f64,
    }

    crate::impl_struct_shape!(Kelvin { degrees: f64 });

    struct KelvinAs(u8);

    impl Strategy<Kelvin> for KelvinAs {
        fn read(&self, reader: &mut dyn ValueReader) -> Result<Kelvin> {
            reader.read_f64().map(|degrees| Kelvin { degrees })
        }

        fn write(&self, writer: &mut dyn ValueWriter, _value: &Kelvin) -> Result<()> {
            writer.write_u8(self.0)
        }
    }

    struct KelvinMapper(u8);

    impl StrategyMapper for KelvinMapper {
        fn try_map(&self, target: &MapTarget) -> Option<Arc<dyn ErasedStrategy>> {
            (target.ty == Type::of::<Kelvin>()).then(|| erase(KelvinAs(self.0)))
        }
    }

    #[test]
    fn earlier_registration_wins() {
        register_mapper(KelvinMapper(1));
        register_mapper(KelvinMapper(2));

        let mut writer = MemWriter::new();
        TypeStrategy::<Kelvin>::write(&mut writer, &Kelvin::default()).unwrap();
        assert_eq!(writer.into_single().unwrap(), MemValue::U8(1));
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Polarity {
        North,
        South,
    }

    crate::impl_enum_shape!(Polarity { North, South });

    struct PolarityAsBool;

    impl Strategy<Polarity> for PolarityAsBool {
        fn read(&self, reader: &mut dyn ValueReader) -> Result<Polarity> {
            reader.read_bool().map(|north| {
                if north {
                    Polarity::North
                } else {
                    Polarity::South
                }
            })
        }

        fn write(&self, writer: &mut dyn ValueWriter, value: &Polarity) -> Result<()> {
            writer.write_bool(*value == Polarity::North)
        }
    }

    struct PolarityMapper;

    impl StrategyMapper for PolarityMapper {
        fn try_map(&self, target: &MapTarget) -> Option<Arc<dyn ErasedStrategy>> {
            (target.ty == Type::of::<Polarity>()).then(|| erase(PolarityAsBool))
        }
    }

    #[test]
    fn registered_mappers_shadow_the_builtins() {
        register_mapper(PolarityMapper);

        let mut writer = MemWriter::new();
        TypeStrategy::<Polarity>::write(&mut writer, &Polarity::South).unwrap();
        // A bool, not a variant name: the registered mapper outranked the
        // built-in enum mapper.
        assert_eq!(writer.into_single().unwrap(), MemValue::Bool(false));
    }

    #[test]
    fn resolution_is_cached() {
        let first = TypeStrategy::<u64>::erased().unwrap();
        let second = TypeStrategy::<u64>::erased().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unmapped_non_struct_types_fail_to_resolve() {
        // The mapper chain passes and the object fallback wants a struct.
        struct Opaque;
        impl Shaped for Opaque {
            fn shape() -> &'static Shape {
                static CELL: crate::shape::NonGenericShapeCell =
                    crate::shape::NonGenericShapeCell::new();
                CELL.get_or_init(Shape::opaque::<Opaque>)
            }
        }
        assert!(matches!(
            TypeStrategy::<Opaque>::erased(),
            Err(Error::StrategyResolution { .. })
        ));
    }
}

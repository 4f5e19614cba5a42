//! Path addressing over data sources.
//!
//! A [`Path`] is an ordered sequence of constant keys, written like
//! `points[3].label`. Resolving one against a set of root sources walks the
//! keys level by level, fanning out over every root: a key a source does not
//! hold silently contributes nothing, so absence shrinks the result set
//! instead of failing. The empty path resolves to a whole-value view of each
//! root.
//!
//! Resolution is restartable: every call walks again from the roots, so the
//! same path can be applied repeatedly or against different sources.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::ops::ControlFlow;
use core::str::FromStr;

use dp_utils::vec::FastVec;

use crate::data::{DataReader, DataWriter};
use crate::error::{Error, PathFormatError, Result};
use crate::mem::MemValue;
use crate::value::{ValueKind, ValueReader, ValueWriter};

// -----------------------------------------------------------------------------
// PathKey

/// One constant key of a [`Path`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PathKey {
    /// A named entry of a string-keyed aggregate.
    Name(Cow<'static, str>),
    /// A positional entry of a sequential aggregate.
    Index(usize),
}

impl PathKey {
    #[inline]
    pub fn name(name: impl Into<Cow<'static, str>>) -> Self {
        PathKey::Name(name.into())
    }

    #[inline]
    pub fn index(index: usize) -> Self {
        PathKey::Index(index)
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathKey::Name(name) => write!(f, ".{name}"),
            PathKey::Index(index) => write!(f, "[{index}]"),
        }
    }
}

// -----------------------------------------------------------------------------
// Path

/// An ordered sequence of constant keys addressing a nested value.
///
/// # Examples
///
/// ```
/// use dp_proto::path::{Path, PathKey};
///
/// let path: Path = "points[3].label".parse().unwrap();
/// assert_eq!(path.keys().len(), 3);
/// assert_eq!(path.keys()[1], PathKey::Index(3));
/// assert_eq!(path.to_string(), "points[3].label");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    keys: Box<[PathKey]>,
}

impl Path {
    /// A path over the given keys.
    pub fn new(keys: impl IntoIterator<Item = PathKey>) -> Self {
        Self {
            keys: keys.into_iter().collect::<Vec<_>>().into_boxed_slice(),
        }
    }

    /// The empty path: a whole-value view of each root.
    pub fn root() -> Self {
        Self { keys: Box::new([]) }
    }

    #[inline]
    pub fn keys(&self) -> &[PathKey] {
        &self.keys
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Parse a path string.
    ///
    /// The grammar is a leading bare name or index, followed by `.name` and
    /// `[index]` segments in any combination. The empty string is the empty
    /// path.
    pub fn parse(input: &str) -> Result<Self, PathFormatError> {
        let mut keys: FastVec<PathKey, 8> = FastVec::new();
        let data = keys.data();

        let mut rest = input;
        let mut offset = 0;
        if let Some(first) = rest.chars().next()
            && first != '.'
            && first != '['
        {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            data.push(PathKey::Name(Cow::Owned(rest[..end].to_string())));
            offset += end;
            rest = &rest[end..];
        }
        while !rest.is_empty() {
            if let Some(stripped) = rest.strip_prefix('.') {
                let end = stripped.find(['.', '[']).unwrap_or(stripped.len());
                if end == 0 {
                    return Err(PathFormatError::new(
                        offset + 1,
                        "expected a member name after `.`",
                    ));
                }
                data.push(PathKey::Name(Cow::Owned(stripped[..end].to_string())));
                offset += 1 + end;
                rest = &stripped[end..];
            } else if let Some(stripped) = rest.strip_prefix('[') {
                let Some(close) = stripped.find(']') else {
                    return Err(PathFormatError::new(offset, "unterminated `[`, expected `]`"));
                };
                let index: usize = stripped[..close].parse().map_err(|_| {
                    PathFormatError::new(offset + 1, "expected a non-negative integer index")
                })?;
                data.push(PathKey::Index(index));
                offset += close + 2;
                rest = &stripped[close + 1..];
            } else {
                return Err(PathFormatError::new(offset, "expected `.` or `[`"));
            }
        }
        Ok(Self {
            keys: keys.into_boxed_slice(),
        })
    }
}

impl FromStr for Path {
    type Err = PathFormatError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, PathFormatError> {
        Self::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, key) in self.keys.iter().enumerate() {
            match key {
                // The leading name is written bare.
                PathKey::Name(name) if position == 0 => f.write_str(name)?,
                key => fmt::Display::fmt(key, f)?,
            }
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Sources

/// A borrowed data source a path can read from.
#[derive(Clone, Copy)]
pub enum SourceRef<'a> {
    Named(&'a dyn DataReader<String>),
    Indexed(&'a dyn DataReader<usize>),
}

impl<'a> From<&'a dyn DataReader<String>> for SourceRef<'a> {
    #[inline]
    fn from(source: &'a dyn DataReader<String>) -> Self {
        SourceRef::Named(source)
    }
}

impl<'a> From<&'a dyn DataReader<usize>> for SourceRef<'a> {
    #[inline]
    fn from(source: &'a dyn DataReader<usize>) -> Self {
        SourceRef::Indexed(source)
    }
}

/// A borrowed data sink a path can write into.
pub enum SourceMut<'a> {
    Named(&'a mut dyn DataWriter<String>),
    Indexed(&'a mut dyn DataWriter<usize>),
}

impl<'a> From<&'a mut dyn DataWriter<String>> for SourceMut<'a> {
    #[inline]
    fn from(source: &'a mut dyn DataWriter<String>) -> Self {
        SourceMut::Named(source)
    }
}

impl<'a> From<&'a mut dyn DataWriter<usize>> for SourceMut<'a> {
    #[inline]
    fn from(source: &'a mut dyn DataWriter<usize>) -> Self {
        SourceMut::Indexed(source)
    }
}

// -----------------------------------------------------------------------------
// Resolution

type ReadVisit<'v> = dyn FnMut(&mut dyn ValueReader) -> Result<ControlFlow<()>> + 'v;
type WriteVisit<'v> = dyn FnMut(&mut dyn ValueWriter) -> Result<ControlFlow<()>> + 'v;

impl Path {
    /// Visit every reader the path resolves to, in root order.
    ///
    /// The closure returns [`ControlFlow::Break`] to stop early.
    pub fn for_each_reader(
        &self,
        roots: &[SourceRef<'_>],
        visit: &mut ReadVisit<'_>,
    ) -> Result<()> {
        for root in roots {
            if walk_read(*root, &self.keys, visit)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    /// The first resolved value, captured as a [`MemValue`].
    ///
    /// `None` when the path resolves to nothing.
    pub fn read_first(&self, roots: &[SourceRef<'_>]) -> Result<Option<MemValue>> {
        let mut found = None;
        self.for_each_reader(roots, &mut |reader| {
            found = Some(reader.read_raw()?);
            Ok(ControlFlow::Break(()))
        })?;
        Ok(found)
    }

    /// Every resolved value, in root order.
    pub fn read_all(&self, roots: &[SourceRef<'_>]) -> Result<Vec<MemValue>> {
        let mut values = Vec::new();
        self.for_each_reader(roots, &mut |reader| {
            values.push(reader.read_raw()?);
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(values)
    }

    /// Visit every writer the path resolves to, in root order.
    pub fn for_each_writer(
        &self,
        roots: &mut [SourceMut<'_>],
        visit: &mut WriteVisit<'_>,
    ) -> Result<()> {
        for root in roots {
            if walk_write(root, &self.keys, visit)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Write `value` into the first resolved writer.
    ///
    /// Returns whether anything was written.
    pub fn write_first(&self, roots: &mut [SourceMut<'_>], value: &MemValue) -> Result<bool> {
        let mut written = false;
        self.for_each_writer(roots, &mut |writer| {
            writer.write_raw(value)?;
            written = true;
            Ok(ControlFlow::Break(()))
        })?;
        Ok(written)
    }

    /// Write `value` into every resolved writer, returning how many.
    pub fn write_all(&self, roots: &mut [SourceMut<'_>], value: &MemValue) -> Result<usize> {
        let mut written = 0;
        self.for_each_writer(roots, &mut |writer| {
            writer.write_raw(value)?;
            written += 1;
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(written)
    }
}

fn walk_read(
    source: SourceRef<'_>,
    keys: &[PathKey],
    visit: &mut ReadVisit<'_>,
) -> Result<ControlFlow<()>> {
    let Some((head, rest)) = keys.split_first() else {
        let mut reader = WholeValueReader { source };
        return visit(&mut reader);
    };
    if rest.is_empty() {
        match (source, head) {
            (SourceRef::Named(s), PathKey::Name(name)) => {
                if let Some(mut entry) = s.entry(&name.to_string()) {
                    return visit(entry.as_mut());
                }
            }
            (SourceRef::Indexed(s), PathKey::Index(index)) => {
                if let Some(mut entry) = s.entry(index) {
                    return visit(entry.as_mut());
                }
            }
            _ => {}
        }
        return Ok(ControlFlow::Continue(()));
    }
    // The next key decides which kind of nested source to descend into.
    let wants_named = matches!(rest[0], PathKey::Name(_));
    match (source, head) {
        (SourceRef::Named(s), PathKey::Name(name)) => {
            let key = name.to_string();
            if wants_named {
                if let Some(nested) = s.nested_named(&key) {
                    return walk_read(SourceRef::Named(nested.as_ref()), rest, visit);
                }
            } else if let Some(nested) = s.nested_indexed(&key) {
                return walk_read(SourceRef::Indexed(nested.as_ref()), rest, visit);
            }
        }
        (SourceRef::Indexed(s), PathKey::Index(index)) => {
            if wants_named {
                if let Some(nested) = s.nested_named(index) {
                    return walk_read(SourceRef::Named(nested.as_ref()), rest, visit);
                }
            } else if let Some(nested) = s.nested_indexed(index) {
                return walk_read(SourceRef::Indexed(nested.as_ref()), rest, visit);
            }
        }
        _ => {}
    }
    Ok(ControlFlow::Continue(()))
}

fn walk_write(
    source: &mut SourceMut<'_>,
    keys: &[PathKey],
    visit: &mut WriteVisit<'_>,
) -> Result<ControlFlow<()>> {
    let Some((head, rest)) = keys.split_first() else {
        let mut writer = WholeValueWriter { source };
        return visit(&mut writer);
    };
    if rest.is_empty() {
        match (source, head) {
            (SourceMut::Named(s), PathKey::Name(name)) => {
                if let Some(mut entry) = s.entry(&name.to_string()) {
                    return visit(entry.as_mut());
                }
            }
            (SourceMut::Indexed(s), PathKey::Index(index)) => {
                if let Some(mut entry) = s.entry(index) {
                    return visit(entry.as_mut());
                }
            }
            _ => {}
        }
        return Ok(ControlFlow::Continue(()));
    }
    let wants_named = matches!(rest[0], PathKey::Name(_));
    match (source, head) {
        (SourceMut::Named(s), PathKey::Name(name)) => {
            let key = name.to_string();
            if wants_named {
                if let Some(mut nested) = s.nested_named(&key) {
                    let mut sub = SourceMut::Named(nested.as_mut());
                    return walk_write(&mut sub, rest, visit);
                }
            } else if let Some(mut nested) = s.nested_indexed(&key) {
                let mut sub = SourceMut::Indexed(nested.as_mut());
                return walk_write(&mut sub, rest, visit);
            }
        }
        (SourceMut::Indexed(s), PathKey::Index(index)) => {
            if wants_named {
                if let Some(mut nested) = s.nested_named(index) {
                    let mut sub = SourceMut::Named(nested.as_mut());
                    return walk_write(&mut sub, rest, visit);
                }
            } else if let Some(mut nested) = s.nested_indexed(index) {
                let mut sub = SourceMut::Indexed(nested.as_mut());
                return walk_write(&mut sub, rest, visit);
            }
        }
        _ => {}
    }
    Ok(ControlFlow::Continue(()))
}

// -----------------------------------------------------------------------------
// Whole-value views

macro_rules! whole_value_scalar_reads {
    ($($fn:ident -> $t:ty = $name:literal),+ $(,)?) => {$(
        fn $fn(&mut self) -> Result<$t> {
            Err(crate::value::kind_mismatch($name, self.kind()))
        }
    )+};
}

/// The empty path's view of a root source.
struct WholeValueReader<'a> {
    source: SourceRef<'a>,
}

impl ValueReader for WholeValueReader<'_> {
    fn kind(&self) -> ValueKind {
        match self.source {
            SourceRef::Named(_) => ValueKind::Object,
            SourceRef::Indexed(_) => ValueKind::Array,
        }
    }

    whole_value_scalar_reads! {
        read_bool -> bool = "bool",
        read_i8 -> i8 = "i8",
        read_i16 -> i16 = "i16",
        read_i32 -> i32 = "i32",
        read_i64 -> i64 = "i64",
        read_i128 -> i128 = "i128",
        read_u8 -> u8 = "u8",
        read_u16 -> u16 = "u16",
        read_u32 -> u32 = "u32",
        read_u64 -> u64 = "u64",
        read_u128 -> u128 = "u128",
        read_f32 -> f32 = "f32",
        read_f64 -> f64 = "f64",
        read_decimal -> rust_decimal::Decimal = "decimal",
        read_char -> char = "char",
        read_str -> String = "str",
        read_datetime -> chrono::DateTime<chrono::Utc> = "datetime",
    }

    fn read_empty(&mut self) -> Result<()> {
        Err(crate::value::kind_mismatch("empty", self.kind()))
    }

    fn read_object(&mut self) -> Result<Box<dyn DataReader<String> + '_>> {
        match self.source {
            SourceRef::Named(s) => Ok(Box::new(s)),
            SourceRef::Indexed(_) => Err(crate::value::kind_mismatch("object", self.kind())),
        }
    }

    fn read_array(&mut self) -> Result<Box<dyn DataReader<usize> + '_>> {
        match self.source {
            SourceRef::Indexed(s) => Ok(Box::new(s)),
            SourceRef::Named(_) => Err(crate::value::kind_mismatch("array", self.kind())),
        }
    }
}

fn copy_named(source: &dyn DataReader<String>, target: &mut dyn DataWriter<String>) -> Result<()> {
    target.initialize(Some(source.len()))?;
    for key in source.keys() {
        let Some(mut reader) = source.entry(&key) else {
            continue;
        };
        let mut writer = target
            .entry(&key)
            .ok_or_else(|| Error::custom("destination refused a named entry"))?;
        reader.transfer_to(writer.as_mut())?;
    }
    Ok(())
}

fn copy_indexed(source: &dyn DataReader<usize>, target: &mut dyn DataWriter<usize>) -> Result<()> {
    target.initialize(Some(source.len()))?;
    for key in source.keys() {
        let Some(mut reader) = source.entry(&key) else {
            continue;
        };
        let mut writer = target
            .entry(&key)
            .ok_or_else(|| Error::custom("destination refused an indexed entry"))?;
        reader.transfer_to(writer.as_mut())?;
    }
    Ok(())
}

macro_rules! whole_value_scalar_writes {
    ($($fn:ident($t:ty) = $name:literal),+ $(,)?) => {$(
        fn $fn(&mut self, _value: $t) -> Result<()> {
            Err(Error::target_mismatch(self.kind_name(), $name))
        }
    )+};
}

/// The empty path's writer over a root sink: replaces its whole content.
struct WholeValueWriter<'w, 'a> {
    source: &'w mut SourceMut<'a>,
}

impl WholeValueWriter<'_, '_> {
    fn kind_name(&self) -> &'static str {
        match self.source {
            SourceMut::Named(_) => "object",
            SourceMut::Indexed(_) => "array",
        }
    }
}

impl ValueWriter for WholeValueWriter<'_, '_> {
    whole_value_scalar_writes! {
        write_bool(bool) = "bool",
        write_i8(i8) = "i8",
        write_i16(i16) = "i16",
        write_i32(i32) = "i32",
        write_i64(i64) = "i64",
        write_i128(i128) = "i128",
        write_u8(u8) = "u8",
        write_u16(u16) = "u16",
        write_u32(u32) = "u32",
        write_u64(u64) = "u64",
        write_u128(u128) = "u128",
        write_f32(f32) = "f32",
        write_f64(f64) = "f64",
        write_decimal(rust_decimal::Decimal) = "decimal",
        write_char(char) = "char",
        write_datetime(chrono::DateTime<chrono::Utc>) = "datetime",
    }

    fn write_str(&mut self, _value: &str) -> Result<()> {
        Err(Error::target_mismatch(self.kind_name(), "str"))
    }

    fn write_empty(&mut self) -> Result<()> {
        Err(Error::target_mismatch(self.kind_name(), "empty"))
    }

    fn write_object(&mut self, source: &dyn DataReader<String>) -> Result<()> {
        match &mut *self.source {
            SourceMut::Named(target) => copy_named(source, *target),
            SourceMut::Indexed(_) => Err(Error::target_mismatch("array", "object")),
        }
    }

    fn write_array(&mut self, source: &dyn DataReader<usize>) -> Result<()> {
        match &mut *self.source {
            SourceMut::Indexed(target) => copy_indexed(source, *target),
            SourceMut::Named(_) => Err(Error::target_mismatch("object", "array")),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::{MemObjectReader, MemObjectWriter, MemValue};
    use alloc::vec;

    fn tree() -> MemValue {
        MemValue::Object(vec![(
            "a".into(),
            MemValue::Object(vec![("b".into(), MemValue::I32(0))]),
        )])
    }

    #[test]
    fn parse_and_display_round_trip() {
        for text in ["a", "a.b", "points[3].label", "[0][1]", ""] {
            let path: Path = text.parse().unwrap();
            assert_eq!(path.to_string(), text);
        }
    }

    #[test]
    fn parse_errors_carry_offsets() {
        let err = Path::parse("a..b").unwrap_err();
        assert_eq!(err.offset, 2);
        let err = Path::parse("a[12").unwrap_err();
        assert_eq!(err.offset, 1);
        let err = Path::parse("a[x]").unwrap_err();
        assert_eq!(err.offset, 2);
    }

    #[test]
    fn absent_keys_resolve_to_nothing() {
        let root = tree();
        let MemValue::Object(entries) = &root else {
            unreachable!()
        };
        let reader = MemObjectReader::new(entries);
        let path: Path = "missing.b".parse().unwrap();
        let values = path.read_all(&[SourceRef::Named(&reader)]).unwrap();
        assert!(values.is_empty());
        assert_eq!(path.read_first(&[SourceRef::Named(&reader)]).unwrap(), None);
    }

    #[test]
    fn fan_out_preserves_root_order() {
        let with_key = MemValue::Object(vec![("a".into(), MemValue::I32(1))]);
        let without = MemValue::Object(vec![("z".into(), MemValue::I32(9))]);
        let also_with = MemValue::Object(vec![("a".into(), MemValue::I32(2))]);
        let sources = [&with_key, &without, &also_with].map(|value| match value {
            MemValue::Object(entries) => MemObjectReader::new(entries),
            _ => unreachable!(),
        });
        let roots: Vec<SourceRef<'_>> = sources
            .iter()
            .map(|reader| SourceRef::Named(reader))
            .collect();

        let path: Path = "a".parse().unwrap();
        let values = path.read_all(&roots).unwrap();
        assert_eq!(values, vec![MemValue::I32(1), MemValue::I32(2)]);
        assert_eq!(
            path.read_first(&roots).unwrap(),
            Some(MemValue::I32(1))
        );
    }

    #[test]
    fn nested_read() {
        let root = tree();
        let MemValue::Object(entries) = &root else {
            unreachable!()
        };
        let reader = MemObjectReader::new(entries);
        let path: Path = "a.b".parse().unwrap();
        assert_eq!(
            path.read_first(&[SourceRef::Named(&reader)]).unwrap(),
            Some(MemValue::I32(0))
        );
    }

    #[test]
    fn nested_write() {
        let mut root = tree();
        {
            let MemValue::Object(entries) = &mut root else {
                unreachable!()
            };
            let mut writer = MemObjectWriter::new(entries);
            let path: Path = "a.b".parse().unwrap();
            let written = path
                .write_first(&mut [SourceMut::Named(&mut writer)], &MemValue::I32(5))
                .unwrap();
            assert!(written);
        }
        assert_eq!(
            root.get("a").and_then(|a| a.get("b")),
            Some(&MemValue::I32(5))
        );
    }

    #[test]
    fn write_descends_through_writer_created_intermediates() {
        // MemObjectWriter creates nested objects on demand, so a two-level
        // path over an empty object still lands.
        let mut root = MemValue::Object(vec![]);
        let MemValue::Object(entries) = &mut root else {
            unreachable!()
        };
        let mut writer = MemObjectWriter::new(entries);
        let path: Path = "a.b".parse().unwrap();
        let written = path
            .write_first(&mut [SourceMut::Named(&mut writer)], &MemValue::I32(1))
            .unwrap();
        assert!(written);
    }

    #[test]
    fn empty_path_reads_the_whole_root() {
        let root = tree();
        let MemValue::Object(entries) = &root else {
            unreachable!()
        };
        let reader = MemObjectReader::new(entries);
        let value = Path::root()
            .read_first(&[SourceRef::Named(&reader)])
            .unwrap();
        assert_eq!(value, Some(root.clone()));
    }

    #[test]
    fn empty_path_replaces_the_whole_root() {
        let mut target = MemValue::Object(vec![]);
        let replacement = tree();
        {
            let MemValue::Object(entries) = &mut target else {
                unreachable!()
            };
            let mut writer = MemObjectWriter::new(entries);
            let written = Path::root()
                .write_first(&mut [SourceMut::Named(&mut writer)], &replacement)
                .unwrap();
            assert!(written);
        }
        assert_eq!(target, replacement);
    }
}

//! Constant pool in a JVM class file.
//!
//! The pool keeps every entry as its kind plus the raw bytes that follow the tag. Typed accessors
//! check the kind of the slot and decode those bytes on demand.

mod constants;

use std::{
    borrow::Cow,
    io::Write,
    sync::{Arc, OnceLock},
};

use bytes::Bytes;
pub use constants::*;

use crate::{
    encoding::{ConstantImport, Encode},
    errors::{ConstantError, DecodeError, EncodeError},
    handle::{ConstantHandle, ConstantKind, Handle, kind_name},
    intrinsics::see_jvm_spec,
    reader::ClassReader,
};

/// The first major version whose `CONSTANT_Utf8` entries must not contain raw NUL bytes.
const STRICT_UTF8_MAJOR_VERSION: u16 = 48;

/// A slot of the constant pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Slot {
    Entry(RawConstant),
    Padding,
}

/// A constant pool entry that has not been decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawConstant {
    kind: ConstantKind,
    data: Bytes,
}

impl RawConstant {
    /// The kind of the entry.
    #[must_use]
    pub const fn kind(&self) -> ConstantKind {
        self.kind
    }

    /// The bytes following the tag of the entry.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<ConstantKind, DecodeError> {
        let tag: u8 = reader.read_value()?;
        let kind = ConstantKind::try_from(tag)?;
        let len = Self::payload_len(reader, kind)?;
        reader.advance(len)?;
        *size += 1 + len;
        Ok(kind)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let tag: u8 = reader.read_value()?;
        let kind = ConstantKind::try_from(tag)?;
        let len = Self::payload_len(reader, kind)?;
        let data = reader.read_many(len)?;
        Ok(Self { kind, data })
    }

    fn payload_len(reader: &mut ClassReader<'_>, kind: ConstantKind) -> Result<usize, DecodeError> {
        let len = match kind {
            ConstantKind::Utf8 => {
                let length: u16 = reader.read_value()?;
                reader.rewind(2);
                2 + usize::from(length)
            }
            ConstantKind::Class
            | ConstantKind::String
            | ConstantKind::MethodType
            | ConstantKind::Module
            | ConstantKind::Package => 2,
            ConstantKind::MethodHandle => 3,
            ConstantKind::Integer
            | ConstantKind::Float
            | ConstantKind::Fieldref
            | ConstantKind::Methodref
            | ConstantKind::InterfaceMethodref
            | ConstantKind::NameAndType
            | ConstantKind::Dynamic
            | ConstantKind::InvokeDynamic => 4,
            ConstantKind::Long | ConstantKind::Double => 8,
            ConstantKind::Unknown => return Err(DecodeError::UnknownConstantTag(kind.tag())),
        };
        Ok(len)
    }
}

/// A JVM constant pool.
#[doc = see_jvm_spec!(4, 4)]
#[derive(Debug, Clone)]
pub struct ConstantPool {
    count: u16,
    slots: Vec<Slot>,
    major_version: u16,
    utf8_cache: Box<[OnceLock<Arc<str>>]>,
}

impl ConstantPool {
    /// Creates an empty constant pool for a class file of the given major version.
    #[must_use]
    pub fn empty(major_version: u16) -> Self {
        Self::from_slots(1, vec![Slot::Padding], major_version)
    }

    fn from_slots(count: u16, slots: Vec<Slot>, major_version: u16) -> Self {
        let utf8_cache = slots.iter().map(|_| OnceLock::new()).collect();
        Self {
            count,
            slots,
            major_version,
            utf8_cache,
        }
    }

    /// Walks over an encoded constant pool and adds its length to `size`.
    ///
    /// # Errors
    /// See [`DecodeError`].
    pub fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        let count: u16 = reader.read_value()?;
        *size += 2;
        let mut index = 1;
        while index < count {
            let kind = RawConstant::measure(reader, size)?;
            index = index.saturating_add(kind.slot_width());
        }
        Ok(())
    }

    /// Decodes a constant pool.
    /// - `major_version` selects the modified UTF-8 dialect used by the `CONSTANT_Utf8` entries.
    ///
    /// # Errors
    /// See [`DecodeError`].
    pub fn decode(reader: &mut ClassReader<'_>, major_version: u16) -> Result<Self, DecodeError> {
        let count: u16 = reader.read_value()?;
        // The `constant_pool` table is indexed from `1` to `constant_pool_count - 1`.
        let mut slots = Vec::with_capacity(usize::from(count));
        slots.push(Slot::Padding);
        let mut index = 1;
        while index < count {
            let entry = RawConstant::decode(reader)?;
            let width = entry.kind.slot_width();
            slots.push(Slot::Entry(entry));
            if width == 2 {
                slots.push(Slot::Padding);
            }
            index = index.saturating_add(width);
        }
        Ok(Self::from_slots(count, slots, major_version))
    }

    /// Gets the count of the constant pool, i.e., the largest valid index plus one.
    /// Note that this is NOT the number of entries.
    #[must_use]
    pub const fn count(&self) -> u16 {
        self.count
    }

    /// Gets the number of entries in the constant pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|it| matches!(it, Slot::Entry(_)))
            .count()
    }

    /// Returns `true` if the constant pool has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The major version of the class file the pool belongs to.
    #[must_use]
    pub const fn major_version(&self) -> u16 {
        self.major_version
    }

    /// Gets the undecoded entry at the given index.
    ///
    /// Returns [`None`] if the index is out of bounds or points to a padding slot.
    #[must_use]
    pub fn entry(&self, index: u16) -> Option<&RawConstant> {
        match self.slots.get(usize::from(index)) {
            Some(Slot::Entry(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Gets the kind of the entry at the given index, or [`ConstantKind::Unknown`] if there is none.
    #[must_use]
    pub fn kind_of(&self, index: u16) -> ConstantKind {
        self.entry(index)
            .map_or(ConstantKind::Unknown, RawConstant::kind)
    }

    /// Creates a handle to the entry at the given index carrying the kind of that entry.
    #[must_use]
    pub fn handle(&self, index: u16) -> ConstantHandle {
        ConstantHandle::new(self.kind_of(index), index)
    }

    /// Iterates over the entries of the pool in index order.
    ///
    /// The unusable slot after a `CONSTANT_Long` or `CONSTANT_Double` is skipped.
    pub fn iter(&self) -> impl Iterator<Item = (ConstantHandle, &RawConstant)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "The pool is decoded from a u16 count, so every index fits into u16."
                )]
                Slot::Entry(entry) => Some((ConstantHandle::new(entry.kind, index as u16), entry)),
                Slot::Padding => None,
            })
    }

    /// Decodes the entry a typed handle points at.
    ///
    /// # Errors
    /// - [`ConstantError::BadIndex`] if there is no entry at the index.
    /// - [`ConstantError::Mismatch`] if the entry is of a different kind.
    /// - [`ConstantError::Decode`] if the entry is malformed.
    pub fn get<T: Constant>(&self, handle: Handle<T>) -> Result<T, ConstantError> {
        let entry = self.entry_of_kind(handle.index(), T::KIND)?;
        T::read(self, handle.index(), entry.data())
    }

    /// Decodes the entry at the given index into a value of whichever kind it is.
    ///
    /// # Errors
    /// See [`ConstantPool::get`].
    pub fn get_any(&self, index: u16) -> Result<AnyConstant, ConstantError> {
        let entry = self.entry(index).ok_or(ConstantError::BadIndex(index))?;
        AnyConstant::read(self, index, entry)
    }

    /// Gets the string value of a `CONSTANT_Utf8` entry.
    ///
    /// Decoded strings are cached, so repeated lookups do not decode the entry again.
    ///
    /// # Errors
    /// See [`ConstantPool::get`].
    pub fn get_utf8(&self, handle: Utf8ConstantHandle) -> Result<&str, ConstantError> {
        self.utf8_arc(handle.index()).map(AsRef::as_ref)
    }

    pub(crate) fn utf8_arc(&self, index: u16) -> Result<&Arc<str>, ConstantError> {
        let cell = self
            .utf8_cache
            .get(usize::from(index))
            .ok_or(ConstantError::BadIndex(index))?;
        if let Some(value) = cell.get() {
            return Ok(value);
        }
        let entry = self.entry_of_kind(index, ConstantKind::Utf8)?;
        let decoded: Arc<str> = decode_utf8_entry(entry.data(), self.major_version)?.into();
        // Racing writers compute the same value, whichever lands first is kept.
        Ok(cell.get_or_init(move || decoded))
    }

    fn entry_of_kind(&self, index: u16, kind: ConstantKind) -> Result<&RawConstant, ConstantError> {
        let entry = self.entry(index).ok_or(ConstantError::BadIndex(index))?;
        if entry.kind == kind {
            Ok(entry)
        } else {
            Err(ConstantError::Mismatch {
                expected: kind_name(kind),
                found: entry.kind,
            })
        }
    }
}

impl PartialEq for ConstantPool {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count
            && self.major_version == other.major_version
            && self.slots == other.slots
    }
}

impl Encode for ConstantPool {
    /// Writes the pool as it was read.
    ///
    /// Entries refer to each other by index, so the pool can only be written with an importer
    /// that preserves handles.
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        if !import.preserves_handles() {
            return Err(EncodeError::Unsupported("re-indexing a constant pool"));
        }
        self.count.encode(writer, import)?;
        for slot in &self.slots {
            if let Slot::Entry(entry) = slot {
                entry.kind.tag().encode(writer, import)?;
                writer.write_all(&entry.data)?;
            }
        }
        Ok(())
    }
}

macro_rules! typed_accessors {
    ($($(#[$doc:meta])* $name:ident => $constant:ty),* $(,)?) => {
        impl ConstantPool {
            $(
                $(#[$doc])*
                ///
                /// # Errors
                /// See [`ConstantPool::get`].
                pub fn $name(&self, handle: Handle<$constant>) -> Result<$constant, ConstantError> {
                    self.get(handle)
                }
            )*
        }
    };
}

typed_accessors! {
    /// Reads a `CONSTANT_Integer` entry.
    get_integer => IntegerConstant,
    /// Reads a `CONSTANT_Float` entry.
    get_float => FloatConstant,
    /// Reads a `CONSTANT_Long` entry.
    get_long => LongConstant,
    /// Reads a `CONSTANT_Double` entry.
    get_double => DoubleConstant,
    /// Reads a `CONSTANT_Class` entry.
    get_class => ClassConstant,
    /// Reads a `CONSTANT_String` entry.
    get_string => StringConstant,
    /// Reads a `CONSTANT_Fieldref` entry.
    get_fieldref => FieldrefConstant,
    /// Reads a `CONSTANT_Methodref` entry.
    get_methodref => MethodrefConstant,
    /// Reads a `CONSTANT_InterfaceMethodref` entry.
    get_interface_methodref => InterfaceMethodrefConstant,
    /// Reads a `CONSTANT_NameAndType` entry.
    get_name_and_type => NameAndTypeConstant,
    /// Reads a `CONSTANT_MethodHandle` entry.
    get_method_handle => MethodHandleConstant,
    /// Reads a `CONSTANT_MethodType` entry.
    get_method_type => MethodTypeConstant,
    /// Reads a `CONSTANT_Dynamic` entry.
    get_dynamic => DynamicConstant,
    /// Reads a `CONSTANT_InvokeDynamic` entry.
    get_invoke_dynamic => InvokeDynamicConstant,
    /// Reads a `CONSTANT_Module` entry.
    get_module => ModuleConstant,
    /// Reads a `CONSTANT_Package` entry.
    get_package => PackageConstant,
}

/// Decodes the payload of a `CONSTANT_Utf8` entry, including its length prefix.
fn decode_utf8_entry(data: &Bytes, major_version: u16) -> Result<String, DecodeError> {
    let bytes = data.get(2..).ok_or(DecodeError::InvalidUtf8)?;
    decode_modified_utf8(bytes, major_version).map(Cow::into_owned)
}

/// Decodes modified UTF-8.
///
/// Class files older than version 48 may contain raw NUL bytes, which are accepted there.
pub(crate) fn decode_modified_utf8(
    bytes: &[u8],
    major_version: u16,
) -> Result<Cow<'_, str>, DecodeError> {
    if major_version < STRICT_UTF8_MAJOR_VERSION && bytes.contains(&0) {
        let mut patched = Vec::with_capacity(bytes.len() + 1);
        for &byte in bytes {
            if byte == 0 {
                patched.extend_from_slice(&[0xC0, 0x80]);
            } else {
                patched.push(byte);
            }
        }
        return cesu8::from_java_cesu8(&patched)
            .map(|it| Cow::Owned(it.into_owned()))
            .map_err(|_| DecodeError::InvalidUtf8);
    }
    cesu8::from_java_cesu8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::tests::{PoolBuilder, arb_pool_entries};

    fn decode(bytes: &[u8], major: u16) -> Result<ConstantPool, DecodeError> {
        let bytes = Bytes::copy_from_slice(bytes);
        let mut reader = ClassReader::new(&bytes);
        let pool = ConstantPool::decode(&mut reader, major)?;
        assert_eq!(reader.remaining(), 0);
        Ok(pool)
    }

    #[test]
    fn empty_pool() {
        let pool = decode(&[0x00, 0x01], 52).unwrap();
        assert_eq!(pool.count(), 1);
        assert!(pool.is_empty());
        assert!(pool.entry(0).is_none());
        assert!(pool.entry(1).is_none());
    }

    #[test]
    fn long_takes_two_slots() {
        let mut builder = PoolBuilder::new();
        let long = builder.long(0x0102_0304_0506_0708);
        let name = builder.utf8("after");
        assert_eq!(name, long + 2);
        let pool = decode(&builder.to_bytes(), 52).unwrap();

        assert_eq!(pool.count(), 4);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.kind_of(long), ConstantKind::Long);
        assert_eq!(pool.kind_of(long + 1), ConstantKind::Unknown);
        let indices: Vec<_> = pool.iter().map(|(it, _)| it.index()).collect();
        assert_eq!(indices, vec![long, name]);
        let value = pool.get_long(Handle::new(long)).unwrap();
        assert_eq!(value.value, 0x0102_0304_0506_0708);
        assert_eq!(pool.get_utf8(Handle::new(name)).unwrap(), "after");
    }

    #[test]
    fn unknown_tag_is_fatal() {
        let err = decode(&[0x00, 0x02, 0x02, 0x00, 0x00], 52).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownConstantTag(2)));
    }

    #[test]
    fn truncated_pool_is_incomplete() {
        let mut builder = PoolBuilder::new();
        builder.utf8("truncated");
        let bytes = builder.to_bytes();
        let err = decode(&bytes[..bytes.len() - 1], 52).unwrap_err();
        assert!(err.is_incomplete());
    }

    #[test]
    fn typed_access_checks_kind() {
        let mut builder = PoolBuilder::new();
        let name = builder.utf8("java/lang/Object");
        let class = builder.class(name);
        let pool = decode(&builder.to_bytes(), 52).unwrap();

        let class_constant = pool.get_class(Handle::new(class)).unwrap();
        assert_eq!(class_constant.name.index(), name);
        assert_eq!(
            pool.get_utf8(class_constant.name).unwrap(),
            "java/lang/Object"
        );

        let err = pool.get_class(Handle::new(name)).unwrap_err();
        assert!(matches!(
            err,
            ConstantError::Mismatch {
                expected: "CONSTANT_Class",
                found: ConstantKind::Utf8
            }
        ));
        assert!(matches!(
            pool.get_utf8(Handle::new(9)),
            Err(ConstantError::BadIndex(9))
        ));
    }

    #[test]
    fn utf8_is_cached() {
        let mut builder = PoolBuilder::new();
        let name = builder.utf8("cached");
        let pool = decode(&builder.to_bytes(), 52).unwrap();
        let first = pool.get_utf8(Handle::new(name)).unwrap();
        let second = pool.get_utf8(Handle::new(name)).unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn modified_utf8_null_and_supplementary() {
        let mut builder = PoolBuilder::new();
        let text = "a\u{0}b\u{1F600}";
        let index = builder.utf8(text);
        let pool = decode(&builder.to_bytes(), 61).unwrap();
        assert_eq!(pool.get_utf8(Handle::new(index)).unwrap(), text);
    }

    #[test]
    fn raw_nul_depends_on_version() {
        let mut builder = PoolBuilder::new();
        let index = builder.utf8_raw(b"a\0b");
        let bytes = builder.to_bytes();

        let legacy = decode(&bytes, 47).unwrap();
        assert_eq!(legacy.get_utf8(Handle::new(index)).unwrap(), "a\u{0}b");

        let strict = decode(&bytes, 48).unwrap();
        assert!(matches!(
            strict.get_utf8(Handle::new(index)),
            Err(ConstantError::Decode(DecodeError::InvalidUtf8))
        ));
    }

    #[test]
    fn method_handle_resolves_reference_kind() {
        let mut builder = PoolBuilder::new();
        let owner_name = builder.utf8("Owner");
        let owner = builder.class(owner_name);
        let name = builder.utf8("run");
        let descriptor = builder.utf8("()V");
        let nat = builder.name_and_type(name, descriptor);
        let method = builder.member_ref(ConstantKind::Methodref, owner, nat);
        let field = builder.member_ref(ConstantKind::Fieldref, owner, nat);
        let static_call = builder.method_handle(6, method);
        let bad_getter = builder.method_handle(1, method);
        let getter = builder.method_handle(1, field);
        let pool = decode(&builder.to_bytes(), 52).unwrap();

        let handle = pool.get_method_handle(Handle::new(static_call)).unwrap();
        assert_eq!(handle.reference_kind, ReferenceKind::InvokeStatic);
        assert_eq!(
            handle.reference,
            ConstantHandle::new(ConstantKind::Methodref, method)
        );
        let handle = pool.get_method_handle(Handle::new(getter)).unwrap();
        assert_eq!(handle.reference.kind(), ConstantKind::Fieldref);
        assert!(matches!(
            pool.get_method_handle(Handle::new(bad_getter)),
            Err(ConstantError::Mismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn slot_accounting(entries in arb_pool_entries()) {
            let mut builder = PoolBuilder::new();
            let mut expected = Vec::new();
            for entry in &entries {
                expected.push(builder.push(entry.clone()));
            }
            let bytes = builder.to_bytes();
            let pool = decode(&bytes, 65).unwrap();

            let wide = entries.iter().filter(|it| it.kind().slot_width() == 2).count();
            prop_assert_eq!(usize::from(pool.count()), 1 + entries.len() + wide);
            prop_assert_eq!(pool.len(), entries.len());
            let indices: Vec<u16> = pool.iter().map(|(it, _)| it.index()).collect();
            prop_assert_eq!(&indices, &expected);
            for (handle, entry) in pool.iter() {
                if entry.kind().slot_width() == 2 {
                    prop_assert!(!indices.contains(&(handle.index() + 1)));
                }
            }
        }

        #[test]
        fn measure_matches_decode(entries in arb_pool_entries(), cut in any::<prop::sample::Index>()) {
            let mut builder = PoolBuilder::new();
            for entry in entries {
                builder.push(entry);
            }
            let full = builder.to_bytes();
            let len = cut.index(full.len() + 1);
            let bytes = Bytes::copy_from_slice(&full[..len]);

            let mut measuring = ClassReader::new(&bytes);
            let mut size = 0;
            let measured = ConstantPool::measure(&mut measuring, &mut size);
            let mut decoding = ClassReader::new(&bytes);
            let decoded = ConstantPool::decode(&mut decoding, 65);

            prop_assert_eq!(measured.is_ok(), decoded.is_ok());
            if measured.is_ok() {
                prop_assert_eq!(size, measuring.position());
                prop_assert_eq!(size, decoding.position());
                prop_assert_eq!(size, full.len());
            } else {
                prop_assert!(decoded.unwrap_err().is_incomplete());
            }
        }

        #[test]
        fn get_any_decodes_every_entry(entries in arb_pool_entries()) {
            let mut builder = PoolBuilder::new();
            for entry in entries {
                builder.push(entry);
            }
            let pool = decode(&builder.to_bytes(), 65).unwrap();
            for (handle, entry) in pool.iter() {
                let value = pool.get_any(handle.index());
                if entry.kind() != ConstantKind::MethodHandle {
                    prop_assert!(value.is_ok());
                    prop_assert_eq!(value.unwrap().kind(), entry.kind());
                }
            }
        }
    }
}

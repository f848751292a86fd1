//! The top-level structure of a class file.

use std::{fmt, path::Path};

use bytes::Bytes;

use crate::{
    access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags},
    attribute::AttributeTable,
    constant_pool::{ClassConstantHandle, ConstantPool, Utf8ConstantHandle},
    errors::DecodeError,
    intrinsics::{layout, see_jvm_spec},
    reader::{ClassReader, Decode},
};

const JAVA_CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// The newest class file major version this crate understands (Java 19).
pub const MAX_SUPPORTED_MAJOR_VERSION: u16 = 63;

/// The size in bytes of the smallest well-formed class file.
pub const MIN_CLASS_FILE_SIZE: usize = 24;

/// The version of a class file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Version {
    major: u16,
    minor: u16,
}

impl Version {
    /// Creates a version from its major and minor numbers.
    #[must_use]
    pub const fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }

    /// The major version.
    #[must_use]
    pub const fn major(&self) -> u16 {
        self.major
    }

    /// The minor version.
    #[must_use]
    pub const fn minor(&self) -> u16 {
        self.minor
    }

    /// Returns `true` if the class file depends on preview features of its Java SE release.
    #[must_use]
    pub const fn is_preview_enabled(&self) -> bool {
        self.major >= 56 && self.minor == 0xFFFF
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Options for reading class files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Class files with a major version above this are rejected with
    /// [`DecodeError::UnsupportedVersion`].
    pub max_major_version: u16,
}

impl ReadOptions {
    /// Sets the newest major version to accept.
    #[must_use]
    pub const fn with_max_major_version(mut self, max_major_version: u16) -> Self {
        self.max_major_version = max_major_version;
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            max_major_version: MAX_SUPPORTED_MAJOR_VERSION,
        }
    }
}

layout! {
    /// A field declared by a class.
    #[doc = see_jvm_spec!(4, 5)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Field {
        /// The access flags of the field.
        pub access_flags: FieldAccessFlags,
        /// The simple name of the field.
        pub name: Utf8ConstantHandle,
        /// The field descriptor of the field.
        pub descriptor: Utf8ConstantHandle,
        /// The attributes of the field.
        pub attributes: AttributeTable,
    }
}

layout! {
    /// A method declared by a class.
    #[doc = see_jvm_spec!(4, 6)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Method {
        /// The access flags of the method.
        pub access_flags: MethodAccessFlags,
        /// The name of the method, or `<init>` or `<clinit>`.
        pub name: Utf8ConstantHandle,
        /// The method descriptor of the method.
        pub descriptor: Utf8ConstantHandle,
        /// The attributes of the method, including its `Code` attribute.
        pub attributes: AttributeTable,
    }
}

/// A decoded class file.
///
/// Attributes and other nested structures hold slices of the buffers the class file was read
/// from, which stay alive as long as those slices do. All handles are only meaningful relative
/// to [`ClassFile::constant_pool`].
#[doc = see_jvm_spec!(4, 1)]
#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    version: Version,
    constant_pool: ConstantPool,
    access_flags: ClassAccessFlags,
    this_class: ClassConstantHandle,
    super_class: ClassConstantHandle,
    interfaces: Vec<ClassConstantHandle>,
    fields: Vec<Field>,
    methods: Vec<Method>,
    attributes: AttributeTable,
    byte_len: usize,
}

impl ClassFile {
    /// Decodes a class file that spans all of `bytes`.
    ///
    /// # Errors
    /// See [`DecodeError`]. Bytes left after the class file are rejected with
    /// [`DecodeError::UnexpectedData`].
    pub fn read(bytes: impl Into<Bytes>) -> Result<Self, DecodeError> {
        Self::read_with_options(bytes, ReadOptions::default())
    }

    /// Decodes a class file that spans all of `bytes` with the given options.
    ///
    /// # Errors
    /// See [`ClassFile::read`].
    pub fn read_with_options(
        bytes: impl Into<Bytes>,
        options: ReadOptions,
    ) -> Result<Self, DecodeError> {
        let bytes = bytes.into();
        Self::read_segments_with_options(std::slice::from_ref(&bytes), options)
    }

    /// Decodes a class file whose bytes are split across `segments`.
    ///
    /// # Errors
    /// See [`ClassFile::read`].
    pub fn read_segments(segments: &[Bytes]) -> Result<Self, DecodeError> {
        Self::read_segments_with_options(segments, ReadOptions::default())
    }

    /// Decodes a class file whose bytes are split across `segments` with the given options.
    ///
    /// # Errors
    /// See [`ClassFile::read`].
    pub fn read_segments_with_options(
        segments: &[Bytes],
        options: ReadOptions,
    ) -> Result<Self, DecodeError> {
        let mut reader = ClassReader::from_segments(segments);
        let class = Self::try_read(&mut reader, options)?;
        if reader.remaining() == 0 {
            Ok(class)
        } else {
            Err(DecodeError::UnexpectedData)
        }
    }

    /// Reads the file at `path` into memory and decodes it.
    ///
    /// # Errors
    /// Returns [`DecodeError::Io`] if the file cannot be read, see [`ClassFile::read`] otherwise.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let bytes = std::fs::read(path)?;
        Self::read(bytes)
    }

    /// Decodes a class file from memory that is not owned by this crate.
    ///
    /// # Safety
    /// `ptr` must be non-null and valid for reads of `len` bytes. The memory must not be mutated
    /// or released while the returned class file, or any byte span cloned out of it, is alive.
    ///
    /// # Errors
    /// See [`ClassFile::read`].
    pub unsafe fn from_raw_parts(ptr: *const u8, len: usize) -> Result<Self, DecodeError> {
        // SAFETY: the caller guarantees the memory is valid and outlives every span of the result.
        let bytes: &'static [u8] = unsafe { std::slice::from_raw_parts(ptr, len) };
        Self::read(Bytes::from_static(bytes))
    }

    /// Decodes one class file from the start of `reader`, leaving any bytes after it unread.
    ///
    /// The magic number and version are checked before anything else is decoded.
    pub(crate) fn try_read(
        reader: &mut ClassReader<'_>,
        options: ReadOptions,
    ) -> Result<Self, DecodeError> {
        let start = reader.position();
        let magic: u32 = reader.read_value()?;
        if magic != JAVA_CLASS_MAGIC {
            return Err(DecodeError::NotAClassFile(magic));
        }
        let minor = reader.read_value()?;
        let major = reader.read_value()?;
        let version = Version::new(major, minor);
        if major > options.max_major_version {
            log::debug!(
                "Rejecting class file version {version}, the newest supported major version is {}",
                options.max_major_version
            );
            return Err(DecodeError::UnsupportedVersion { major, minor });
        }
        let constant_pool = ConstantPool::decode(reader, major)?;
        let access_flags = Decode::decode(reader)?;
        let this_class = Decode::decode(reader)?;
        let super_class = Decode::decode(reader)?;
        let interfaces = Decode::decode(reader)?;
        let fields: Vec<Field> = Decode::decode(reader)?;
        let methods: Vec<Method> = Decode::decode(reader)?;
        let attributes = Decode::decode(reader)?;
        let byte_len = reader.position() - start;
        log::debug!(
            "Decoded class file version {version} with {} constant pool entries, {} fields and {} methods from {byte_len} bytes",
            constant_pool.len(),
            fields.len(),
            methods.len(),
        );
        Ok(Self {
            version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            byte_len,
        })
    }

    /// The version of the class file.
    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    /// The constant pool all handles of this class file refer to.
    #[must_use]
    pub const fn constant_pool(&self) -> &ConstantPool {
        &self.constant_pool
    }

    /// The access flags of the class.
    #[must_use]
    pub const fn access_flags(&self) -> ClassAccessFlags {
        self.access_flags
    }

    /// The class declared by the class file.
    #[must_use]
    pub const fn this_class(&self) -> ClassConstantHandle {
        self.this_class
    }

    /// The direct superclass, or nil for `java/lang/Object` and module descriptors.
    #[must_use]
    pub const fn super_class(&self) -> ClassConstantHandle {
        self.super_class
    }

    /// The direct superinterfaces, in declaration order.
    #[must_use]
    pub fn interfaces(&self) -> &[ClassConstantHandle] {
        &self.interfaces
    }

    /// The fields declared by the class.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The methods declared by the class.
    #[must_use]
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The attributes of the class.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    /// The number of bytes the class file was decoded from.
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Writes the class file in its binary format.
    ///
    /// All structures are written with the handles they were read with. The result decodes to a
    /// class file equal to this one.
    ///
    /// # Errors
    /// See [`EncodeError`](crate::EncodeError).
    #[instability::unstable(feature = "class-encoding")]
    pub fn encode<W>(&self, writer: &mut W) -> Result<(), crate::EncodeError>
    where
        W: std::io::Write + ?Sized,
    {
        use crate::encoding::{Encode, KeepHandles};

        let import = &mut KeepHandles;
        JAVA_CLASS_MAGIC.encode(writer, import)?;
        self.version.minor.encode(writer, import)?;
        self.version.major.encode(writer, import)?;
        self.constant_pool.encode(writer, import)?;
        self.access_flags.encode(writer, import)?;
        self.this_class.encode(writer, import)?;
        self.super_class.encode(writer, import)?;
        self.interfaces.encode(writer, import)?;
        self.fields.encode(writer, import)?;
        self.methods.encode(writer, import)?;
        self.attributes.encode(writer, import)
    }
}

//! Attributes of classes, fields, methods, record components and `Code` attributes.
//!
//! An [`Attribute`] is decoded as its name handle and the bytes of its body. The name is resolved
//! against the constant pool only when the attribute is cast to one of the known layouts with
//! [`Attribute::cast`] or [`Attribute::parse`]. Attributes with names that are not known are kept
//! as they are.

use std::{fmt, io::Write};

use bytes::Bytes;

use crate::{
    constant_pool::{ConstantPool, Utf8ConstantHandle},
    encoding::{ConstantImport, Encode, encode_raw, write_length},
    errors::{CastError, ConstantError, DecodeError, EncodeError},
    intrinsics::see_jvm_spec,
    reader::{ClassReader, Decode, decode_exact},
};

mod class;
mod code;
mod member;
mod module;

pub use class::{
    BootstrapMethod, BootstrapMethodsAttribute, EnclosingMethodAttribute, InnerClass,
    InnerClassesAttribute, NestHostAttribute, NestMembersAttribute, PermittedSubclassesAttribute,
    RecordAttribute, RecordComponent, SourceDebugExtensionAttribute, SourceFileAttribute,
};
pub use code::{
    CodeAttribute, ExceptionHandler, LineNumber, LineNumberTableAttribute, LocalVariable,
    LocalVariableTableAttribute, LocalVariableType, LocalVariableTypeTableAttribute,
    StackMapTableAttribute,
};
pub use member::{
    AnnotationDefaultAttribute, ConstantValueAttribute, DeprecatedAttribute, ExceptionsAttribute,
    MethodParameter, MethodParametersAttribute, ParameterAnnotations,
    RuntimeInvisibleAnnotationsAttribute, RuntimeInvisibleParameterAnnotationsAttribute,
    RuntimeInvisibleTypeAnnotationsAttribute, RuntimeVisibleAnnotationsAttribute,
    RuntimeVisibleParameterAnnotationsAttribute, RuntimeVisibleTypeAnnotationsAttribute,
    SignatureAttribute, SyntheticAttribute,
};
pub use module::{
    Exports, ModuleAttribute, ModuleMainClassAttribute, ModulePackagesAttribute, Opens, Provides,
    Requires,
};

/// A known attribute layout.
///
/// Implemented by the concrete attribute structures so they can be obtained with
/// [`Attribute::cast`].
pub trait AttributeShape: Sized + Encode {
    /// The name of the attribute.
    const KIND: AttributeKind;

    /// Decodes the body of an attribute.
    ///
    /// # Errors
    /// Returns [`CastError`] if the body is malformed or refers to entries the constant pool
    /// does not have.
    fn read(data: &Bytes, pool: &ConstantPool) -> Result<Self, CastError>;
}

macro_rules! attribute_shape {
    (decoded, $kind:ident, $shape:ty) => {
        impl AttributeShape for $shape {
            const KIND: AttributeKind = AttributeKind::$kind;

            fn read(data: &Bytes, _: &ConstantPool) -> Result<Self, CastError> {
                Ok(decode_exact(data)?)
            }
        }
    };
    (resolved, $kind:ident, $shape:ty) => {
        impl AttributeShape for $shape {
            const KIND: AttributeKind = AttributeKind::$kind;

            fn read(data: &Bytes, pool: &ConstantPool) -> Result<Self, CastError> {
                Self::resolve(data, pool)
            }
        }
    };
}

macro_rules! attributes {
    ($($kind:ident => $shape:ident ($read:ident)),+ $(,)?) => {
        /// The names of the attributes with a known layout.
        #[doc = see_jvm_spec!(4, 7)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[cfg_attr(test, derive(proptest_derive::Arbitrary))]
        #[allow(missing_docs)]
        pub enum AttributeKind {
            $($kind,)+
        }

        impl AttributeKind {
            /// All known attribute kinds.
            pub const ALL: &'static [Self] = &[$(Self::$kind,)+];

            /// The name of the attribute as stored in the constant pool.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$kind => stringify!($kind),)+
                }
            }
        }

        /// A fully decoded attribute.
        #[derive(Debug, Clone, PartialEq)]
        #[allow(missing_docs)]
        pub enum ParsedAttribute {
            $($kind($shape),)+
            /// An attribute whose name is not known, kept as it is.
            Unknown(Attribute),
        }

        impl ParsedAttribute {
            /// The kind of the attribute, or [`None`] if it is not known.
            #[must_use]
            pub const fn kind(&self) -> Option<AttributeKind> {
                match self {
                    $(Self::$kind(_) => Some(AttributeKind::$kind),)+
                    Self::Unknown(_) => None,
                }
            }

            fn read(
                kind: AttributeKind,
                data: &Bytes,
                pool: &ConstantPool,
            ) -> Result<Self, CastError> {
                match kind {
                    $(AttributeKind::$kind => $shape::read(data, pool).map(Self::$kind),)+
                }
            }
        }

        impl Encode for ParsedAttribute {
            /// Writes the body of the attribute, without its name and length.
            fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
            where
                W: Write + ?Sized,
                I: ConstantImport + ?Sized,
            {
                match self {
                    $(Self::$kind(it) => it.encode(writer, import),)+
                    Self::Unknown(it) => encode_raw(&it.data, writer, import),
                }
            }
        }

        $(attribute_shape!($read, $kind, $shape);)+
    };
}

attributes! {
    ConstantValue => ConstantValueAttribute(resolved),
    Code => CodeAttribute(decoded),
    StackMapTable => StackMapTableAttribute(decoded),
    Exceptions => ExceptionsAttribute(decoded),
    InnerClasses => InnerClassesAttribute(decoded),
    EnclosingMethod => EnclosingMethodAttribute(decoded),
    Synthetic => SyntheticAttribute(decoded),
    Signature => SignatureAttribute(decoded),
    SourceFile => SourceFileAttribute(decoded),
    SourceDebugExtension => SourceDebugExtensionAttribute(decoded),
    LineNumberTable => LineNumberTableAttribute(decoded),
    LocalVariableTable => LocalVariableTableAttribute(decoded),
    LocalVariableTypeTable => LocalVariableTypeTableAttribute(decoded),
    Deprecated => DeprecatedAttribute(decoded),
    RuntimeVisibleAnnotations => RuntimeVisibleAnnotationsAttribute(decoded),
    RuntimeInvisibleAnnotations => RuntimeInvisibleAnnotationsAttribute(decoded),
    RuntimeVisibleParameterAnnotations => RuntimeVisibleParameterAnnotationsAttribute(decoded),
    RuntimeInvisibleParameterAnnotations => RuntimeInvisibleParameterAnnotationsAttribute(decoded),
    RuntimeVisibleTypeAnnotations => RuntimeVisibleTypeAnnotationsAttribute(decoded),
    RuntimeInvisibleTypeAnnotations => RuntimeInvisibleTypeAnnotationsAttribute(decoded),
    AnnotationDefault => AnnotationDefaultAttribute(decoded),
    BootstrapMethods => BootstrapMethodsAttribute(resolved),
    MethodParameters => MethodParametersAttribute(decoded),
    Module => ModuleAttribute(decoded),
    ModulePackages => ModulePackagesAttribute(decoded),
    ModuleMainClass => ModuleMainClassAttribute(decoded),
    NestHost => NestHostAttribute(decoded),
    NestMembers => NestMembersAttribute(decoded),
    Record => RecordAttribute(decoded),
    PermittedSubclasses => PermittedSubclassesAttribute(decoded),
}

impl AttributeKind {
    /// Looks up the attribute kind with the given name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|it| it.name() == name)
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An attribute with an undecoded body.
///
/// The default value is nil and has no name.
#[doc = see_jvm_spec!(4, 7)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attribute {
    name: Utf8ConstantHandle,
    data: Bytes,
}

impl Attribute {
    /// Creates an attribute from its name and body.
    #[must_use]
    pub const fn new(name: Utf8ConstantHandle, data: Bytes) -> Self {
        Self { name, data }
    }

    /// The name of the attribute.
    #[must_use]
    pub const fn name(&self) -> Utf8ConstantHandle {
        self.name
    }

    /// The body of the attribute.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns `true` if this is the nil value.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.name.is_nil()
    }

    /// Resolves the name of the attribute to a known kind.
    ///
    /// Returns [`None`] if the name is not one of the known attribute names.
    ///
    /// # Errors
    /// Returns [`ConstantError`] if the name cannot be read from the constant pool.
    pub fn kind(&self, pool: &ConstantPool) -> Result<Option<AttributeKind>, ConstantError> {
        Ok(AttributeKind::from_name(pool.get_utf8(self.name)?))
    }

    /// Decodes the body of the attribute as the layout `A`.
    ///
    /// # Errors
    /// Returns [`CastError::InvalidCast`] if the attribute is not named after `A`, or another
    /// [`CastError`] if the body does not decode.
    pub fn cast<A: AttributeShape>(&self, pool: &ConstantPool) -> Result<A, CastError> {
        let expected = A::KIND.name();
        if self.is_nil() {
            return Err(CastError::invalid("nil", expected));
        }
        let name = pool.get_utf8(self.name)?;
        if name != expected {
            return Err(CastError::invalid(name, expected));
        }
        A::read(&self.data, pool)
    }

    /// Decodes the body of the attribute according to its name.
    ///
    /// # Errors
    /// Returns [`CastError`] if the name cannot be resolved or the body does not decode.
    pub fn parse(&self, pool: &ConstantPool) -> Result<ParsedAttribute, CastError> {
        if self.is_nil() {
            return Err(CastError::invalid("nil", "attribute"));
        }
        match self.kind(pool)? {
            Some(kind) => ParsedAttribute::read(kind, &self.data, pool),
            None => Ok(ParsedAttribute::Unknown(self.clone())),
        }
    }

    /// Encodes the attribute, re-encoding its body structurally when handles change.
    ///
    /// With an importer that preserves handles this is the same as [`Encode::encode`].
    ///
    /// # Errors
    /// See [`EncodeError`]. Attributes that are not known and `Code` attributes cannot be
    /// re-indexed.
    pub fn encode_with<W, I>(
        &self,
        pool: &ConstantPool,
        writer: &mut W,
        import: &mut I,
    ) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        if import.preserves_handles() {
            return self.encode(writer, import);
        }
        let parsed = self
            .parse(pool)
            .map_err(|err| EncodeError::from_cast(err, "encoding a malformed attribute"))?;
        let mut body = Vec::new();
        parsed.encode(&mut body, import)?;
        self.name.encode(writer, import)?;
        write_length::<u32, _>(writer, body.len())?;
        writer.write_all(&body)?;
        Ok(())
    }
}

impl Decode for Attribute {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        Utf8ConstantHandle::measure(reader, size)?;
        let length: u32 = reader.read_value()?;
        let length = usize::try_from(length).map_err(|_| DecodeError::UnexpectedData)?;
        reader.advance(length)?;
        *size += size_of::<u32>() + length;
        Ok(())
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let name = Decode::decode(reader)?;
        let length: u32 = reader.read_value()?;
        let length = usize::try_from(length).map_err(|_| DecodeError::UnexpectedData)?;
        let data = reader.read_many(length)?;
        Ok(Self { name, data })
    }
}

impl Encode for Attribute {
    /// Writes the attribute verbatim.
    ///
    /// Fails with [`EncodeError::Unsupported`] unless the importer preserves handles. Use
    /// [`Attribute::encode_with`] to re-index the body.
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        if self.is_nil() {
            return Err(EncodeError::Unsupported("encoding a nil attribute"));
        }
        if !import.preserves_handles() {
            return Err(EncodeError::Unsupported(
                "re-indexing an attribute without its constant pool, use `Attribute::encode_with`",
            ));
        }
        self.name.encode(writer, import)?;
        write_length::<u32, _>(writer, self.data.len())?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

/// The attributes of a class, field, method, record component or `Code` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, derive_more::Deref, derive_more::From)]
pub struct AttributeTable(Vec<Attribute>);

impl AttributeTable {
    /// Finds the first attribute of the given kind.
    ///
    /// # Errors
    /// Returns [`ConstantError`] if the name of an attribute cannot be read from the constant
    /// pool.
    pub fn find(
        &self,
        pool: &ConstantPool,
        kind: AttributeKind,
    ) -> Result<Option<&Attribute>, ConstantError> {
        for attribute in &self.0 {
            if pool.get_utf8(attribute.name)? == kind.name() {
                return Ok(Some(attribute));
            }
        }
        Ok(None)
    }

    /// Finds the first attribute of the layout `A` and decodes it.
    ///
    /// # Errors
    /// See [`AttributeTable::find`] and [`Attribute::cast`].
    pub fn find_as<A: AttributeShape>(&self, pool: &ConstantPool) -> Result<Option<A>, CastError> {
        self.find(pool, A::KIND)?
            .map(|it| A::read(&it.data, pool))
            .transpose()
    }

    /// Encodes the table with [`Attribute::encode_with`].
    ///
    /// # Errors
    /// See [`EncodeError`].
    pub fn encode_with<W, I>(
        &self,
        pool: &ConstantPool,
        writer: &mut W,
        import: &mut I,
    ) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        write_length::<u16, _>(writer, self.0.len())?;
        self.0
            .iter()
            .try_for_each(|it| it.encode_with(pool, writer, import))
    }
}

impl<'a> IntoIterator for &'a AttributeTable {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Decode for AttributeTable {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        Vec::<Attribute>::measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Decode::decode(reader).map(Self)
    }
}

impl Encode for AttributeTable {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.0.encode(writer, import)
    }
}

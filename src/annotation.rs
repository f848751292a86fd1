//! Annotations and type annotations.
//!
//! [`ElementValue`] and [`TypeAnnotationTarget`] keep their payload as a slice of the class
//! file. The `as_*` methods check the tag and decode the slice into a concrete shape.

use std::{fmt, io::Write};

use bytes::Bytes;

use crate::{
    constant_pool::{ConstantPool, Utf8ConstantHandle},
    encoding::{ConstantImport, Encode, encode_table},
    errors::{CastError, ConstantError, DecodeError, EncodeError},
    handle::{ConstantHandle, ConstantKind},
    intrinsics::see_jvm_spec,
    reader::{
        ClassReader, Decode, capture, decode_exact, decode_table, measure_by_decode, measure_table,
    },
};

/// An annotation on a class, field, method, parameter or record component.
#[doc = see_jvm_spec!(4, 7, 16)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// The field descriptor of the annotation interface.
    pub type_name: Utf8ConstantHandle,
    /// The element-value pairs of the annotation.
    pub elements: Vec<ElementValuePair>,
}

impl Annotation {
    /// Finds the value of the element with the given name.
    ///
    /// # Errors
    /// Returns an error if the name of an element cannot be read from the constant pool.
    pub fn element(
        &self,
        pool: &ConstantPool,
        name: &str,
    ) -> Result<Option<&ElementValue>, ConstantError> {
        for pair in &self.elements {
            if pool.get_utf8(pair.name)? == name {
                return Ok(Some(&pair.value));
            }
        }
        Ok(None)
    }
}

impl Annotation {
    /// Measures an annotation whose element values sit `depth` levels deep.
    fn measure_at(
        reader: &mut ClassReader<'_>,
        size: &mut usize,
        depth: usize,
    ) -> Result<(), DecodeError> {
        Utf8ConstantHandle::measure(reader, size)?;
        let count: u16 = reader.read_value()?;
        *size += size_of::<u16>();
        for _ in 0..count {
            Utf8ConstantHandle::measure(reader, size)?;
            ElementValue::measure_at(reader, size, depth)?;
        }
        Ok(())
    }
}

impl Decode for Annotation {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        Self::measure_at(reader, size, 0)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            type_name: Decode::decode(reader)?,
            elements: decode_table::<u16, _>(reader)?,
        })
    }
}

impl Encode for Annotation {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.type_name.encode(writer, import)?;
        encode_table::<u16, _, _, _>(&self.elements, writer, import)
    }
}

/// A named element of an annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementValuePair {
    /// The name of the element.
    pub name: Utf8ConstantHandle,
    /// The value of the element.
    pub value: ElementValue,
}

impl Decode for ElementValuePair {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        Utf8ConstantHandle::measure(reader, size)?;
        ElementValue::measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            name: Decode::decode(reader)?,
            value: Decode::decode(reader)?,
        })
    }
}

impl Encode for ElementValuePair {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.name.encode(writer, import)?;
        self.value.encode(writer, import)
    }
}

/// The tag of an [`ElementValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
#[allow(missing_docs)]
pub enum ElementValueTag {
    Byte = b'B',
    Char = b'C',
    Double = b'D',
    Float = b'F',
    Int = b'I',
    Long = b'J',
    Short = b'S',
    Boolean = b'Z',
    String = b's',
    Enum = b'e',
    Class = b'c',
    Annotation = b'@',
    Array = b'[',
}

impl ElementValueTag {
    /// The kind of constant pool entry a value with this tag refers to, if it is a constant.
    #[must_use]
    pub const fn constant_kind(self) -> Option<ConstantKind> {
        match self {
            Self::Byte | Self::Char | Self::Int | Self::Short | Self::Boolean => {
                Some(ConstantKind::Integer)
            }
            Self::Double => Some(ConstantKind::Double),
            Self::Float => Some(ConstantKind::Float),
            Self::Long => Some(ConstantKind::Long),
            Self::String => Some(ConstantKind::Utf8),
            Self::Enum | Self::Class | Self::Annotation | Self::Array => None,
        }
    }
}

impl TryFrom<u8> for ElementValueTag {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        let tag = match tag {
            b'B' => Self::Byte,
            b'C' => Self::Char,
            b'D' => Self::Double,
            b'F' => Self::Float,
            b'I' => Self::Int,
            b'J' => Self::Long,
            b'S' => Self::Short,
            b'Z' => Self::Boolean,
            b's' => Self::String,
            b'e' => Self::Enum,
            b'c' => Self::Class,
            b'@' => Self::Annotation,
            b'[' => Self::Array,
            unknown => return Err(DecodeError::InvalidElementValueTag(unknown)),
        };
        Ok(tag)
    }
}

impl fmt::Display for ElementValueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", char::from(*self as u8))
    }
}

/// The value of an annotation element.
///
/// The payload is kept undecoded. The default value is nil and has no tag.
#[doc = see_jvm_spec!(4, 7, 16, 1)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementValue {
    tag: Option<ElementValueTag>,
    data: Bytes,
}

/// An enum constant used as an element value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EnumConstValue {
    /// The field descriptor of the enum class.
    pub type_name: Utf8ConstantHandle,
    /// The simple name of the enum constant.
    pub const_name: Utf8ConstantHandle,
}

impl Decode for EnumConstValue {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        measure_by_decode::<Self>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            type_name: Decode::decode(reader)?,
            const_name: Decode::decode(reader)?,
        })
    }
}

impl Encode for EnumConstValue {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.type_name.encode(writer, import)?;
        self.const_name.encode(writer, import)
    }
}

/// The concrete shape of an [`ElementValue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedElementValue {
    /// A primitive or string constant.
    Constant(ElementValueTag, ConstantHandle),
    /// An enum constant.
    Enum(EnumConstValue),
    /// A class literal, given as a return descriptor.
    Class(Utf8ConstantHandle),
    /// A nested annotation.
    Annotation(Annotation),
    /// An array of element values.
    Array(Vec<ElementValue>),
}

impl ElementValue {
    /// The tag of the value, or [`None`] if the value is nil.
    #[must_use]
    pub const fn tag(&self) -> Option<ElementValueTag> {
        self.tag
    }

    /// The undecoded payload following the tag.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns `true` if this is the nil value.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.tag.is_none()
    }

    fn cast_check(
        &self,
        accepted: fn(ElementValueTag) -> bool,
        to: &'static str,
    ) -> Result<ElementValueTag, CastError> {
        match self.tag {
            Some(tag) if accepted(tag) => Ok(tag),
            Some(tag) => Err(CastError::invalid(tag, to)),
            None => Err(CastError::invalid("nil", to)),
        }
    }

    /// Gets the constant pool entry of a primitive or string value.
    ///
    /// The kind of the returned handle is derived from the tag.
    ///
    /// # Errors
    /// Returns [`CastError`] if the value is not a constant.
    pub fn as_constant(&self) -> Result<ConstantHandle, CastError> {
        let tag = self.cast_check(|it| it.constant_kind().is_some(), "constant")?;
        let index: u16 = decode_exact(&self.data)?;
        let kind = tag.constant_kind().unwrap_or_default();
        Ok(ConstantHandle::new(kind, index))
    }

    /// Gets the enum constant of an enum value.
    ///
    /// # Errors
    /// Returns [`CastError`] if the value is not an enum constant.
    pub fn as_enum(&self) -> Result<EnumConstValue, CastError> {
        self.cast_check(|it| it == ElementValueTag::Enum, "enum")?;
        Ok(decode_exact(&self.data)?)
    }

    /// Gets the return descriptor of a class literal.
    ///
    /// # Errors
    /// Returns [`CastError`] if the value is not a class literal.
    pub fn as_class(&self) -> Result<Utf8ConstantHandle, CastError> {
        self.cast_check(|it| it == ElementValueTag::Class, "class")?;
        Ok(decode_exact(&self.data)?)
    }

    /// Decodes a nested annotation.
    ///
    /// # Errors
    /// Returns [`CastError`] if the value is not an annotation.
    pub fn as_annotation(&self) -> Result<Annotation, CastError> {
        self.cast_check(|it| it == ElementValueTag::Annotation, "annotation")?;
        Ok(decode_exact(&self.data)?)
    }

    /// Decodes the elements of an array.
    ///
    /// # Errors
    /// Returns [`CastError`] if the value is not an array.
    pub fn as_array(&self) -> Result<Vec<ElementValue>, CastError> {
        self.cast_check(|it| it == ElementValueTag::Array, "array")?;
        let mut reader = ClassReader::new(&self.data);
        let elements = decode_table::<u16, _>(&mut reader)?;
        if reader.remaining() == 0 {
            Ok(elements)
        } else {
            Err(DecodeError::UnexpectedData.into())
        }
    }

    /// Decodes the value into whichever shape its tag selects.
    ///
    /// # Errors
    /// Returns [`CastError`] if the value is nil or its payload is corrupted.
    pub fn parse(&self) -> Result<ParsedElementValue, CastError> {
        let tag = self.cast_check(|_| true, "element value")?;
        let parsed = match tag {
            ElementValueTag::Enum => ParsedElementValue::Enum(self.as_enum()?),
            ElementValueTag::Class => ParsedElementValue::Class(self.as_class()?),
            ElementValueTag::Annotation => ParsedElementValue::Annotation(self.as_annotation()?),
            ElementValueTag::Array => ParsedElementValue::Array(self.as_array()?),
            constant => ParsedElementValue::Constant(constant, self.as_constant()?),
        };
        Ok(parsed)
    }

    fn measure_at(
        reader: &mut ClassReader<'_>,
        size: &mut usize,
        depth: usize,
    ) -> Result<(), DecodeError> {
        let tag: u8 = reader.read_value()?;
        *size += 1;
        Self::measure_payload(ElementValueTag::try_from(tag)?, reader, size, depth)
    }

    /// Measures the payload of a value `depth` levels below the outermost one.
    fn measure_payload(
        tag: ElementValueTag,
        reader: &mut ClassReader<'_>,
        size: &mut usize,
        depth: usize,
    ) -> Result<(), DecodeError> {
        match tag {
            ElementValueTag::Enum => EnumConstValue::measure(reader, size),
            ElementValueTag::Annotation => Annotation::measure_at(reader, size, nested(depth)?),
            ElementValueTag::Array => {
                let depth = nested(depth)?;
                let count: u16 = reader.read_value()?;
                *size += size_of::<u16>();
                for _ in 0..count {
                    Self::measure_at(reader, size, depth)?;
                }
                Ok(())
            }
            _ => u16::measure(reader, size),
        }
    }
}

/// The deepest an element value may sit inside nested annotations and arrays.
pub const MAX_ELEMENT_VALUE_DEPTH: usize = 256;

fn nested(depth: usize) -> Result<usize, DecodeError> {
    if depth < MAX_ELEMENT_VALUE_DEPTH {
        Ok(depth + 1)
    } else {
        Err(DecodeError::NestingTooDeep(MAX_ELEMENT_VALUE_DEPTH))
    }
}

impl Decode for ElementValue {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        Self::measure_at(reader, size, 0)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let tag: u8 = reader.read_value()?;
        let tag = ElementValueTag::try_from(tag)?;
        let data = capture(reader, |reader, size| {
            Self::measure_payload(tag, reader, size, 0)
        })?;
        Ok(Self {
            tag: Some(tag),
            data,
        })
    }
}

impl Encode for ElementValue {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        let Some(tag) = self.tag else {
            return Err(EncodeError::Unsupported("encoding a nil element value"));
        };
        (tag as u8).encode(writer, import)?;
        if import.preserves_handles() {
            writer.write_all(&self.data)?;
            return Ok(());
        }
        let parsed = self
            .parse()
            .map_err(|err| EncodeError::from_cast(err, "encoding a malformed element value"))?;
        match parsed {
            ParsedElementValue::Constant(_, handle) => handle.encode(writer, import),
            ParsedElementValue::Enum(value) => value.encode(writer, import),
            ParsedElementValue::Class(class) => class.encode(writer, import),
            ParsedElementValue::Annotation(annotation) => annotation.encode(writer, import),
            ParsedElementValue::Array(elements) => {
                encode_table::<u16, _, _, _>(&elements, writer, import)
            }
        }
    }
}

/// The kind of construct a type annotation targets.
#[doc = see_jvm_spec!(4, 7, 20, 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum TargetType {
    /// A type parameter of a generic class or interface.
    ClassTypeParameter = 0x00,
    /// A type parameter of a generic method or constructor.
    MethodTypeParameter = 0x01,
    /// A type in the `extends` or `implements` clause of a class.
    SuperType = 0x10,
    /// A bound of a type parameter of a generic class or interface.
    ClassTypeParameterBound = 0x11,
    /// A bound of a type parameter of a generic method or constructor.
    MethodTypeParameterBound = 0x12,
    /// The type of a field or record component.
    Field = 0x13,
    /// The return type of a method, or the type of a newly constructed object.
    MethodReturn = 0x14,
    /// The receiver type of a method or constructor.
    MethodReceiver = 0x15,
    /// The type of a formal parameter.
    MethodFormalParameter = 0x16,
    /// A type in the `throws` clause of a method or constructor.
    Throws = 0x17,
    /// The type of a local variable.
    LocalVariable = 0x40,
    /// The type of a resource variable.
    ResourceVariable = 0x41,
    /// The type of an exception parameter.
    ExceptionParameter = 0x42,
    /// The type in an `instanceof` expression.
    InstanceOf = 0x43,
    /// The type in a `new` expression.
    New = 0x44,
    /// The type in a constructor reference expression.
    ConstructorReference = 0x45,
    /// The type in a method reference expression.
    MethodReference = 0x46,
    /// The type in a cast expression.
    Cast = 0x47,
    /// A type argument of a generic constructor in a `new` expression.
    ConstructorInvocationTypeArgument = 0x48,
    /// A type argument of a generic method invocation.
    MethodInvocationTypeArgument = 0x49,
    /// A type argument of a generic constructor in a constructor reference.
    ConstructorReferenceTypeArgument = 0x4A,
    /// A type argument of a generic method in a method reference.
    MethodReferenceTypeArgument = 0x4B,
}

impl TargetType {
    /// The layout of the `target_info` following this target type.
    #[must_use]
    pub const fn shape(self) -> TargetShape {
        match self {
            Self::ClassTypeParameter | Self::MethodTypeParameter => TargetShape::TypeParameter,
            Self::SuperType => TargetShape::SuperType,
            Self::ClassTypeParameterBound | Self::MethodTypeParameterBound => {
                TargetShape::TypeParameterBound
            }
            Self::Field | Self::MethodReturn | Self::MethodReceiver => TargetShape::Empty,
            Self::MethodFormalParameter => TargetShape::FormalParameter,
            Self::Throws => TargetShape::Throws,
            Self::LocalVariable | Self::ResourceVariable => TargetShape::LocalVar,
            Self::ExceptionParameter => TargetShape::Catch,
            Self::InstanceOf | Self::New | Self::ConstructorReference | Self::MethodReference => {
                TargetShape::Offset
            }
            Self::Cast
            | Self::ConstructorInvocationTypeArgument
            | Self::MethodInvocationTypeArgument
            | Self::ConstructorReferenceTypeArgument
            | Self::MethodReferenceTypeArgument => TargetShape::TypeArgument,
        }
    }
}

impl TryFrom<u8> for TargetType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let target_type = match value {
            0x00 => Self::ClassTypeParameter,
            0x01 => Self::MethodTypeParameter,
            0x10 => Self::SuperType,
            0x11 => Self::ClassTypeParameterBound,
            0x12 => Self::MethodTypeParameterBound,
            0x13 => Self::Field,
            0x14 => Self::MethodReturn,
            0x15 => Self::MethodReceiver,
            0x16 => Self::MethodFormalParameter,
            0x17 => Self::Throws,
            0x40 => Self::LocalVariable,
            0x41 => Self::ResourceVariable,
            0x42 => Self::ExceptionParameter,
            0x43 => Self::InstanceOf,
            0x44 => Self::New,
            0x45 => Self::ConstructorReference,
            0x46 => Self::MethodReference,
            0x47 => Self::Cast,
            0x48 => Self::ConstructorInvocationTypeArgument,
            0x49 => Self::MethodInvocationTypeArgument,
            0x4A => Self::ConstructorReferenceTypeArgument,
            0x4B => Self::MethodReferenceTypeArgument,
            unknown => return Err(DecodeError::InvalidTargetType(unknown)),
        };
        Ok(target_type)
    }
}

/// The layout of a `target_info` union member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TargetShape {
    TypeParameter,
    SuperType,
    TypeParameterBound,
    Empty,
    FormalParameter,
    Throws,
    LocalVar,
    Catch,
    Offset,
    TypeArgument,
}

impl TargetShape {
    /// The name of the layout in the JVM specification.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::TypeParameter => "type_parameter_target",
            Self::SuperType => "supertype_target",
            Self::TypeParameterBound => "type_parameter_bound_target",
            Self::Empty => "empty_target",
            Self::FormalParameter => "formal_parameter_target",
            Self::Throws => "throws_target",
            Self::LocalVar => "localvar_target",
            Self::Catch => "catch_target",
            Self::Offset => "offset_target",
            Self::TypeArgument => "type_argument_target",
        }
    }

    fn measure(self, reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        let len = match self {
            Self::Empty => 0,
            Self::TypeParameter | Self::FormalParameter => 1,
            Self::SuperType | Self::TypeParameterBound | Self::Throws | Self::Catch | Self::Offset => 2,
            Self::TypeArgument => 3,
            Self::LocalVar => return measure_table::<u16, LocalVarTargetEntry>(reader, size),
        };
        reader.advance(len)?;
        *size += len;
        Ok(())
    }
}

/// A concrete `target_info` layout that a [`TypeAnnotationTarget`] can be cast to.
pub trait TargetInfo: Decode {
    /// The layout this type decodes.
    const SHAPE: TargetShape;
}

macro_rules! target_info {
    ($($(#[$doc:meta])* $name:ident => $shape:ident { $($(#[$field_doc:meta])* $field:ident: $ty:ty),* $(,)? })*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $name {
                $($(#[$field_doc])* pub $field: $ty,)*
            }

            impl TargetInfo for $name {
                const SHAPE: TargetShape = TargetShape::$shape;
            }

            impl Decode for $name {
                fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
                    measure_by_decode::<Self>(reader, size)
                }

                #[allow(unused_variables)]
                fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
                    Ok(Self {
                        $($field: reader.read_value()?,)*
                    })
                }
            }
        )*
    };
}

target_info! {
    /// Targets a type parameter declaration.
    TypeParameterTarget => TypeParameter {
        /// The index of the type parameter.
        type_parameter_index: u8,
    }
    /// Targets a type in the `extends` or `implements` clause.
    SuperTypeTarget => SuperType {
        /// `65535` for the superclass, otherwise an index into `interfaces`.
        supertype_index: u16,
    }
    /// Targets a bound of a type parameter.
    TypeParameterBoundTarget => TypeParameterBound {
        /// The index of the type parameter.
        type_parameter_index: u8,
        /// The index of the bound.
        bound_index: u8,
    }
    /// Targets the type of the annotated declaration itself.
    EmptyTarget => Empty {}
    /// Targets the type of a formal parameter.
    FormalParameterTarget => FormalParameter {
        /// The index of the formal parameter.
        formal_parameter_index: u8,
    }
    /// Targets a type in a `throws` clause.
    ThrowsTarget => Throws {
        /// The index into the `exception_index_table` of the `Exceptions` attribute.
        throws_type_index: u16,
    }
    /// Targets the type of an exception parameter.
    CatchTarget => Catch {
        /// The index into the exception table of the `Code` attribute.
        exception_table_index: u16,
    }
    /// Targets a type in an expression.
    OffsetTarget => Offset {
        /// The offset of the instruction for the expression.
        offset: u16,
    }
    /// Targets a type argument in a cast or a generic invocation.
    TypeArgumentTarget => TypeArgument {
        /// The offset of the instruction for the expression.
        offset: u16,
        /// The index of the type argument.
        type_argument_index: u8,
    }
}

/// Targets the type of local or resource variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LocalVarTarget {
    /// The code ranges in which the variables have a value.
    pub table: Vec<LocalVarTargetEntry>,
}

impl TargetInfo for LocalVarTarget {
    const SHAPE: TargetShape = TargetShape::LocalVar;
}

impl Decode for LocalVarTarget {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        measure_table::<u16, LocalVarTargetEntry>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            table: decode_table::<u16, _>(reader)?,
        })
    }
}

/// A code range of a [`LocalVarTarget`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LocalVarTargetEntry {
    /// The first offset at which the variable has a value.
    pub start_pc: u16,
    /// The length of the range.
    pub length: u16,
    /// The index of the variable in the local variable array.
    pub index: u16,
}

impl Decode for LocalVarTargetEntry {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        measure_by_decode::<Self>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            start_pc: reader.read_value()?,
            length: reader.read_value()?,
            index: reader.read_value()?,
        })
    }
}

/// The `target_type` and `target_info` of a type annotation.
///
/// The `target_info` is kept undecoded. The default value is nil and has no target type.
#[doc = see_jvm_spec!(4, 7, 20, 1)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeAnnotationTarget {
    target_type: Option<TargetType>,
    data: Bytes,
}

impl TypeAnnotationTarget {
    /// The target type, or [`None`] if the target is nil.
    #[must_use]
    pub const fn target_type(&self) -> Option<TargetType> {
        self.target_type
    }

    /// The undecoded `target_info`.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns `true` if this is the nil value.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.target_type.is_none()
    }

    /// Decodes the `target_info` as the given layout.
    ///
    /// # Errors
    /// Returns [`CastError`] if the target type does not use that layout.
    pub fn cast<T: TargetInfo>(&self) -> Result<T, CastError> {
        match self.target_type {
            Some(target_type) if target_type.shape() == T::SHAPE => Ok(decode_exact(&self.data)?),
            Some(target_type) => Err(CastError::invalid(target_type.shape().name(), T::SHAPE.name())),
            None => Err(CastError::invalid("nil", T::SHAPE.name())),
        }
    }

    /// Casts to a [`TypeParameterTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_type_parameter(&self) -> Result<TypeParameterTarget, CastError> {
        self.cast()
    }

    /// Casts to a [`SuperTypeTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_super_type(&self) -> Result<SuperTypeTarget, CastError> {
        self.cast()
    }

    /// Casts to a [`TypeParameterBoundTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_type_parameter_bound(&self) -> Result<TypeParameterBoundTarget, CastError> {
        self.cast()
    }

    /// Casts to an [`EmptyTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_empty(&self) -> Result<EmptyTarget, CastError> {
        self.cast()
    }

    /// Casts to a [`FormalParameterTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_formal_parameter(&self) -> Result<FormalParameterTarget, CastError> {
        self.cast()
    }

    /// Casts to a [`ThrowsTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_throws(&self) -> Result<ThrowsTarget, CastError> {
        self.cast()
    }

    /// Casts to a [`LocalVarTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_local_var(&self) -> Result<LocalVarTarget, CastError> {
        self.cast()
    }

    /// Casts to a [`CatchTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_catch(&self) -> Result<CatchTarget, CastError> {
        self.cast()
    }

    /// Casts to an [`OffsetTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_offset(&self) -> Result<OffsetTarget, CastError> {
        self.cast()
    }

    /// Casts to a [`TypeArgumentTarget`].
    ///
    /// # Errors
    /// See [`TypeAnnotationTarget::cast`].
    pub fn as_type_argument(&self) -> Result<TypeArgumentTarget, CastError> {
        self.cast()
    }
}

impl Decode for TypeAnnotationTarget {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        let target_type: u8 = reader.read_value()?;
        *size += 1;
        TargetType::try_from(target_type)?.shape().measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let target_type: u8 = reader.read_value()?;
        let target_type = TargetType::try_from(target_type)?;
        let data = capture(reader, |reader, size| target_type.shape().measure(reader, size))?;
        Ok(Self {
            target_type: Some(target_type),
            data,
        })
    }
}

impl Encode for TypeAnnotationTarget {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        let Some(target_type) = self.target_type else {
            return Err(EncodeError::Unsupported("encoding a nil type annotation target"));
        };
        // `target_info` holds no constant pool references.
        (target_type as u8).encode(writer, import)?;
        writer.write_all(&self.data)?;
        Ok(())
    }
}

/// A step in a [`TypePath`].
#[doc = see_jvm_spec!(4, 7, 20, 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum TypePathElement {
    /// Deeper in an array type.
    Array,
    /// Deeper in a nested type.
    Nested,
    /// On the bound of a wildcard type argument.
    Bound,
    /// On the type argument at the given index.
    TypeArgument(u8),
}

impl Decode for TypePathElement {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        measure_by_decode::<Self>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let [kind, argument_index]: [u8; 2] = reader.read_value()?;
        match (kind, argument_index) {
            (0, 0) => Ok(Self::Array),
            (1, 0) => Ok(Self::Nested),
            (2, 0) => Ok(Self::Bound),
            (3, index) => Ok(Self::TypeArgument(index)),
            (kind @ 0..=2, index) => Err(DecodeError::InvalidTypeArgumentIndex { kind, index }),
            (kind, _) => Err(DecodeError::InvalidTypePathKind(kind)),
        }
    }
}

impl Encode for TypePathElement {
    fn encode<W, I>(&self, writer: &mut W, _: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        let raw = match self {
            Self::Array => [0, 0],
            Self::Nested => [1, 0],
            Self::Bound => [2, 0],
            Self::TypeArgument(index) => [3, *index],
        };
        writer.write_all(&raw)?;
        Ok(())
    }
}

/// The location of the annotated type within the targeted type.
#[doc = see_jvm_spec!(4, 7, 20, 2)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TypePath {
    /// The steps from the outermost type to the annotated type.
    pub path: Vec<TypePathElement>,
}

impl Decode for TypePath {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        measure_table::<u8, TypePathElement>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            path: decode_table::<u8, _>(reader)?,
        })
    }
}

impl Encode for TypePath {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        encode_table::<u8, _, _, _>(&self.path, writer, import)
    }
}

/// An annotation on a use of a type.
#[doc = see_jvm_spec!(4, 7, 20)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeAnnotation {
    /// The kind and location of the annotated type.
    pub target: TypeAnnotationTarget,
    /// The part of the targeted type that is annotated.
    pub type_path: TypePath,
    /// The field descriptor of the annotation interface.
    pub type_name: Utf8ConstantHandle,
    /// The element-value pairs of the annotation.
    pub elements: Vec<ElementValuePair>,
}

impl Decode for TypeAnnotation {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        TypeAnnotationTarget::measure(reader, size)?;
        TypePath::measure(reader, size)?;
        Utf8ConstantHandle::measure(reader, size)?;
        measure_table::<u16, ElementValuePair>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            target: Decode::decode(reader)?,
            type_path: Decode::decode(reader)?,
            type_name: Decode::decode(reader)?,
            elements: decode_table::<u16, _>(reader)?,
        })
    }
}

impl Encode for TypeAnnotation {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.target.encode(writer, import)?;
        self.type_path.encode(writer, import)?;
        self.type_name.encode(writer, import)?;
        encode_table::<u16, _, _, _>(&self.elements, writer, import)
    }
}

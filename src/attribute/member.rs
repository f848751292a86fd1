use std::io::Write;

use bytes::Bytes;

use crate::{
    access_flags::MethodParameterAccessFlags,
    annotation::{Annotation, ElementValue, TypeAnnotation},
    constant_pool::{ClassConstantHandle, ConstantPool, Utf8ConstantHandle},
    encoding::{ConstantImport, Encode, encode_table},
    errors::{CastError, ConstantError, DecodeError, EncodeError},
    handle::{ConstantHandle, ConstantKind},
    intrinsics::{layout, see_jvm_spec},
    reader::{ClassReader, Decode, decode_exact, decode_table, measure_table},
};

/// The `ConstantValue` attribute of a field.
///
/// The handle carries the kind of the entry it refers to, which is one of `CONSTANT_Integer`,
/// `CONSTANT_Float`, `CONSTANT_Long`, `CONSTANT_Double` or `CONSTANT_String`.
#[doc = see_jvm_spec!(4, 7, 2)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ConstantValueAttribute {
    /// The value of the field.
    pub value: ConstantHandle,
}

impl ConstantValueAttribute {
    pub(super) fn resolve(data: &Bytes, pool: &ConstantPool) -> Result<Self, CastError> {
        let index: u16 = decode_exact(data)?;
        let value = pool.handle(index);
        match value.kind() {
            ConstantKind::Integer
            | ConstantKind::Float
            | ConstantKind::Long
            | ConstantKind::Double
            | ConstantKind::String => Ok(Self { value }),
            ConstantKind::Unknown => Err(ConstantError::BadIndex(index).into()),
            found => Err(ConstantError::Mismatch {
                expected: "a constant value",
                found,
            }
            .into()),
        }
    }
}

impl Encode for ConstantValueAttribute {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.value.encode(writer, import)
    }
}

macro_rules! marker_attribute {
    ($($(#[$meta:meta])* $name:ident;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
            pub struct $name;

            impl Decode for $name {
                fn measure(_: &mut ClassReader<'_>, _: &mut usize) -> Result<(), DecodeError> {
                    Ok(())
                }

                fn decode(_: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
                    Ok(Self)
                }
            }

            impl Encode for $name {
                fn encode<W, I>(&self, _: &mut W, _: &mut I) -> Result<(), EncodeError>
                where
                    W: Write + ?Sized,
                    I: ConstantImport + ?Sized,
                {
                    Ok(())
                }
            }
        )+
    };
}

marker_attribute! {
    /// The `Synthetic` attribute.
    #[doc = see_jvm_spec!(4, 7, 8)]
    SyntheticAttribute;
    /// The `Deprecated` attribute.
    #[doc = see_jvm_spec!(4, 7, 15)]
    DeprecatedAttribute;
}

/// Defines a structure holding a single table prefixed by a `u8` count.
macro_rules! byte_counted {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(#[$field_meta:meta])*
            pub $field:ident: Vec<$item:ty>,
        }
    ) => {
        $(#[$meta])*
        pub struct $name {
            $(#[$field_meta])*
            pub $field: Vec<$item>,
        }

        impl Decode for $name {
            fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
                measure_table::<u8, $item>(reader, size)
            }

            fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
                Ok(Self {
                    $field: decode_table::<u8, _>(reader)?,
                })
            }
        }

        impl Encode for $name {
            fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
            where
                W: Write + ?Sized,
                I: ConstantImport + ?Sized,
            {
                encode_table::<u8, _, _, _>(&self.$field, writer, import)
            }
        }
    };
}

layout! {
    /// The `Exceptions` attribute of a method.
    #[doc = see_jvm_spec!(4, 7, 5)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct ExceptionsAttribute {
        /// The checked exceptions the method may throw.
        pub exceptions: Vec<ClassConstantHandle>,
    }
}

layout! {
    /// The `Signature` attribute.
    #[doc = see_jvm_spec!(4, 7, 9)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct SignatureAttribute {
        /// The generic signature.
        pub signature: Utf8ConstantHandle,
    }
}

layout! {
    /// The `RuntimeVisibleAnnotations` attribute.
    #[doc = see_jvm_spec!(4, 7, 16)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RuntimeVisibleAnnotationsAttribute {
        /// The annotations.
        pub annotations: Vec<Annotation>,
    }
}

layout! {
    /// The `RuntimeInvisibleAnnotations` attribute.
    #[doc = see_jvm_spec!(4, 7, 17)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RuntimeInvisibleAnnotationsAttribute {
        /// The annotations.
        pub annotations: Vec<Annotation>,
    }
}

layout! {
    /// The annotations on one formal parameter.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ParameterAnnotations {
        /// The annotations.
        pub annotations: Vec<Annotation>,
    }
}

byte_counted! {
    /// The `RuntimeVisibleParameterAnnotations` attribute.
    #[doc = see_jvm_spec!(4, 7, 18)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RuntimeVisibleParameterAnnotationsAttribute {
        /// The annotations of each parameter, in declaration order.
        pub parameters: Vec<ParameterAnnotations>,
    }
}

byte_counted! {
    /// The `RuntimeInvisibleParameterAnnotations` attribute.
    #[doc = see_jvm_spec!(4, 7, 19)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RuntimeInvisibleParameterAnnotationsAttribute {
        /// The annotations of each parameter, in declaration order.
        pub parameters: Vec<ParameterAnnotations>,
    }
}

layout! {
    /// The `RuntimeVisibleTypeAnnotations` attribute.
    #[doc = see_jvm_spec!(4, 7, 20)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RuntimeVisibleTypeAnnotationsAttribute {
        /// The type annotations.
        pub annotations: Vec<TypeAnnotation>,
    }
}

layout! {
    /// The `RuntimeInvisibleTypeAnnotations` attribute.
    #[doc = see_jvm_spec!(4, 7, 21)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RuntimeInvisibleTypeAnnotationsAttribute {
        /// The type annotations.
        pub annotations: Vec<TypeAnnotation>,
    }
}

layout! {
    /// The `AnnotationDefault` attribute of an annotation interface element.
    #[doc = see_jvm_spec!(4, 7, 22)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct AnnotationDefaultAttribute {
        /// The default value of the element.
        pub default_value: ElementValue,
    }
}

byte_counted! {
    /// The `MethodParameters` attribute.
    #[doc = see_jvm_spec!(4, 7, 24)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct MethodParametersAttribute {
        /// The formal parameters, in declaration order.
        pub parameters: Vec<MethodParameter>,
    }
}

layout! {
    /// A formal parameter in the `MethodParameters` attribute.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct MethodParameter {
        /// The name of the parameter, or nil if it has no name.
        pub name: Utf8ConstantHandle,
        /// The flags of the parameter.
        pub access_flags: MethodParameterAccessFlags,
    }
}

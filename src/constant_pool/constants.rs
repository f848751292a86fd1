use std::sync::Arc;

use bytes::Bytes;

use super::{ConstantPool, RawConstant};
use crate::{
    errors::{ConstantError, DecodeError},
    handle::{ConstantHandle, ConstantKind, ConstantType, Handle, kind_name},
    intrinsics::see_jvm_spec,
    reader::{ClassReader, Decode, decode_exact, measure_by_decode},
};

/// A value stored in the constant pool.
pub trait Constant: ConstantType + Sized {
    /// Decodes the value of the entry at `index` from the bytes following its tag.
    ///
    /// # Errors
    /// See [`ConstantError`].
    fn read(pool: &ConstantPool, index: u16, data: &Bytes) -> Result<Self, ConstantError>;
}

macro_rules! fixed_constant {
    ($($constant:ident => $kind:ident, $alias:ident { $($field:ident),* });* $(;)?) => {
        $(
            impl ConstantType for $constant {
                const KIND: ConstantKind = ConstantKind::$kind;
            }

            #[doc = concat!("A handle to a [`", stringify!($constant), "`].")]
            pub type $alias = Handle<$constant>;

            impl Decode for $constant {
                fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
                    measure_by_decode::<Self>(reader, size)
                }

                fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
                    Ok(Self {
                        $($field: Decode::decode(reader)?),*
                    })
                }
            }

            impl Constant for $constant {
                fn read(_: &ConstantPool, _: u16, data: &Bytes) -> Result<Self, ConstantError> {
                    Ok(decode_exact(data)?)
                }
            }
        )*
    };
}

/// A `CONSTANT_Utf8` entry.
#[doc = see_jvm_spec!(4, 4, 7)]
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
#[display("{value}")]
pub struct Utf8Constant {
    /// The decoded string.
    pub value: Arc<str>,
}

impl Utf8Constant {
    /// The decoded string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl ConstantType for Utf8Constant {
    const KIND: ConstantKind = ConstantKind::Utf8;
}

impl Constant for Utf8Constant {
    fn read(pool: &ConstantPool, index: u16, _: &Bytes) -> Result<Self, ConstantError> {
        let value = Arc::clone(pool.utf8_arc(index)?);
        Ok(Self { value })
    }
}

/// A handle to a [`Utf8Constant`].
pub type Utf8ConstantHandle = Handle<Utf8Constant>;

/// A `CONSTANT_Integer` entry.
#[doc = see_jvm_spec!(4, 4, 4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegerConstant {
    /// The value.
    pub value: i32,
}

/// A `CONSTANT_Float` entry.
#[doc = see_jvm_spec!(4, 4, 4)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatConstant {
    /// The value.
    pub value: f32,
}

/// A `CONSTANT_Long` entry.
#[doc = see_jvm_spec!(4, 4, 5)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongConstant {
    /// The value.
    pub value: i64,
}

/// A `CONSTANT_Double` entry.
#[doc = see_jvm_spec!(4, 4, 5)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoubleConstant {
    /// The value.
    pub value: f64,
}

/// A `CONSTANT_Class` entry.
#[doc = see_jvm_spec!(4, 4, 1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassConstant {
    /// The binary name of the class or interface.
    pub name: Utf8ConstantHandle,
}

/// A `CONSTANT_String` entry.
#[doc = see_jvm_spec!(4, 4, 3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringConstant {
    /// The content of the string.
    pub value: Utf8ConstantHandle,
}

/// A `CONSTANT_Fieldref` entry.
#[doc = see_jvm_spec!(4, 4, 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldrefConstant {
    /// The class declaring the field.
    pub class: ClassConstantHandle,
    /// The name and descriptor of the field.
    pub name_and_type: NameAndTypeConstantHandle,
}

/// A `CONSTANT_Methodref` entry.
#[doc = see_jvm_spec!(4, 4, 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodrefConstant {
    /// The class declaring the method.
    pub class: ClassConstantHandle,
    /// The name and descriptor of the method.
    pub name_and_type: NameAndTypeConstantHandle,
}

/// A `CONSTANT_InterfaceMethodref` entry.
#[doc = see_jvm_spec!(4, 4, 2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceMethodrefConstant {
    /// The interface declaring the method.
    pub class: ClassConstantHandle,
    /// The name and descriptor of the method.
    pub name_and_type: NameAndTypeConstantHandle,
}

/// A `CONSTANT_NameAndType` entry.
#[doc = see_jvm_spec!(4, 4, 6)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameAndTypeConstant {
    /// The unqualified name.
    pub name: Utf8ConstantHandle,
    /// The field or method descriptor.
    pub descriptor: Utf8ConstantHandle,
}

/// A `CONSTANT_MethodType` entry.
#[doc = see_jvm_spec!(4, 4, 9)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodTypeConstant {
    /// The method descriptor.
    pub descriptor: Utf8ConstantHandle,
}

/// A `CONSTANT_Dynamic` entry.
#[doc = see_jvm_spec!(4, 4, 10)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DynamicConstant {
    /// The index into the `BootstrapMethods` attribute.
    pub bootstrap_method_attr_index: u16,
    /// The name and field descriptor of the constant.
    pub name_and_type: NameAndTypeConstantHandle,
}

/// A `CONSTANT_InvokeDynamic` entry.
#[doc = see_jvm_spec!(4, 4, 10)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvokeDynamicConstant {
    /// The index into the `BootstrapMethods` attribute.
    pub bootstrap_method_attr_index: u16,
    /// The name and method descriptor of the call site.
    pub name_and_type: NameAndTypeConstantHandle,
}

/// A `CONSTANT_Module` entry.
#[doc = see_jvm_spec!(4, 4, 11)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleConstant {
    /// The name of the module.
    pub name: Utf8ConstantHandle,
}

/// A `CONSTANT_Package` entry.
#[doc = see_jvm_spec!(4, 4, 12)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageConstant {
    /// The name of the package in internal form.
    pub name: Utf8ConstantHandle,
}

fixed_constant! {
    IntegerConstant => Integer, IntegerConstantHandle { value };
    FloatConstant => Float, FloatConstantHandle { value };
    LongConstant => Long, LongConstantHandle { value };
    DoubleConstant => Double, DoubleConstantHandle { value };
    ClassConstant => Class, ClassConstantHandle { name };
    StringConstant => String, StringConstantHandle { value };
    FieldrefConstant => Fieldref, FieldrefConstantHandle { class, name_and_type };
    MethodrefConstant => Methodref, MethodrefConstantHandle { class, name_and_type };
    InterfaceMethodrefConstant => InterfaceMethodref, InterfaceMethodrefConstantHandle {
        class, name_and_type
    };
    NameAndTypeConstant => NameAndType, NameAndTypeConstantHandle { name, descriptor };
    MethodTypeConstant => MethodType, MethodTypeConstantHandle { descriptor };
    DynamicConstant => Dynamic, DynamicConstantHandle { bootstrap_method_attr_index, name_and_type };
    InvokeDynamicConstant => InvokeDynamic, InvokeDynamicConstantHandle {
        bootstrap_method_attr_index, name_and_type
    };
    ModuleConstant => Module, ModuleConstantHandle { name };
    PackageConstant => Package, PackageConstantHandle { name };
}

/// The kind of reference a method handle performs.
#[doc = see_jvm_spec!(5, 4, 3, 5)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
#[repr(u8)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ReferenceKind {
    /// `REF_getField`
    #[display("REF_getField")]
    GetField = 1,
    /// `REF_getStatic`
    #[display("REF_getStatic")]
    GetStatic = 2,
    /// `REF_putField`
    #[display("REF_putField")]
    PutField = 3,
    /// `REF_putStatic`
    #[display("REF_putStatic")]
    PutStatic = 4,
    /// `REF_invokeVirtual`
    #[display("REF_invokeVirtual")]
    InvokeVirtual = 5,
    /// `REF_invokeStatic`
    #[display("REF_invokeStatic")]
    InvokeStatic = 6,
    /// `REF_invokeSpecial`
    #[display("REF_invokeSpecial")]
    InvokeSpecial = 7,
    /// `REF_newInvokeSpecial`
    #[display("REF_newInvokeSpecial")]
    NewInvokeSpecial = 8,
    /// `REF_invokeInterface`
    #[display("REF_invokeInterface")]
    InvokeInterface = 9,
}

impl ReferenceKind {
    /// Returns `true` if a method handle of this kind may refer to an entry of the given kind.
    #[must_use]
    pub const fn accepts(self, kind: ConstantKind) -> bool {
        match self {
            Self::GetField | Self::GetStatic | Self::PutField | Self::PutStatic => {
                matches!(kind, ConstantKind::Fieldref)
            }
            Self::InvokeVirtual | Self::NewInvokeSpecial => matches!(kind, ConstantKind::Methodref),
            Self::InvokeStatic | Self::InvokeSpecial => matches!(
                kind,
                ConstantKind::Methodref | ConstantKind::InterfaceMethodref
            ),
            Self::InvokeInterface => matches!(kind, ConstantKind::InterfaceMethodref),
        }
    }

    const fn expected(self) -> &'static str {
        match self {
            Self::GetField | Self::GetStatic | Self::PutField | Self::PutStatic => {
                kind_name(ConstantKind::Fieldref)
            }
            Self::InvokeVirtual | Self::NewInvokeSpecial => kind_name(ConstantKind::Methodref),
            Self::InvokeStatic | Self::InvokeSpecial => {
                "CONSTANT_Methodref or CONSTANT_InterfaceMethodref"
            }
            Self::InvokeInterface => kind_name(ConstantKind::InterfaceMethodref),
        }
    }
}

impl TryFrom<u8> for ReferenceKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let kind = match value {
            1 => Self::GetField,
            2 => Self::GetStatic,
            3 => Self::PutField,
            4 => Self::PutStatic,
            5 => Self::InvokeVirtual,
            6 => Self::InvokeStatic,
            7 => Self::InvokeSpecial,
            8 => Self::NewInvokeSpecial,
            9 => Self::InvokeInterface,
            unknown => return Err(DecodeError::InvalidReferenceKind(unknown)),
        };
        Ok(kind)
    }
}

impl Decode for ReferenceKind {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        Self::decode(reader)?;
        *size += 1;
        Ok(())
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let kind: u8 = reader.read_value()?;
        Self::try_from(kind)
    }
}

/// A `CONSTANT_MethodHandle` entry.
#[doc = see_jvm_spec!(4, 4, 8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodHandleConstant {
    /// The kind of the method handle.
    pub reference_kind: ReferenceKind,
    /// The field or method the handle refers to.
    ///
    /// Which kinds of entries are allowed depends on [`Self::reference_kind`].
    pub reference: ConstantHandle,
}

impl ConstantType for MethodHandleConstant {
    const KIND: ConstantKind = ConstantKind::MethodHandle;
}

/// A handle to a [`MethodHandleConstant`].
pub type MethodHandleConstantHandle = Handle<MethodHandleConstant>;

struct RawMethodHandle {
    reference_kind: ReferenceKind,
    reference_index: u16,
}

impl Decode for RawMethodHandle {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        ReferenceKind::measure(reader, size)?;
        u16::measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            reference_kind: Decode::decode(reader)?,
            reference_index: Decode::decode(reader)?,
        })
    }
}

impl Constant for MethodHandleConstant {
    fn read(pool: &ConstantPool, _: u16, data: &Bytes) -> Result<Self, ConstantError> {
        let RawMethodHandle {
            reference_kind,
            reference_index,
        } = decode_exact(data)?;
        let found = pool
            .entry(reference_index)
            .ok_or(ConstantError::BadIndex(reference_index))?
            .kind();
        if !reference_kind.accepts(found) {
            return Err(ConstantError::Mismatch {
                expected: reference_kind.expected(),
                found,
            });
        }
        Ok(Self {
            reference_kind,
            reference: ConstantHandle::new(found, reference_index),
        })
    }
}

/// A decoded constant pool entry of any kind.
#[derive(Debug, Clone, PartialEq, derive_more::From)]
#[allow(missing_docs)]
pub enum AnyConstant {
    Utf8(Utf8Constant),
    Integer(IntegerConstant),
    Float(FloatConstant),
    Long(LongConstant),
    Double(DoubleConstant),
    Class(ClassConstant),
    String(StringConstant),
    Fieldref(FieldrefConstant),
    Methodref(MethodrefConstant),
    InterfaceMethodref(InterfaceMethodrefConstant),
    NameAndType(NameAndTypeConstant),
    MethodHandle(MethodHandleConstant),
    MethodType(MethodTypeConstant),
    Dynamic(DynamicConstant),
    InvokeDynamic(InvokeDynamicConstant),
    Module(ModuleConstant),
    Package(PackageConstant),
}

impl AnyConstant {
    /// The kind of the entry.
    #[must_use]
    pub const fn kind(&self) -> ConstantKind {
        match self {
            Self::Utf8(_) => ConstantKind::Utf8,
            Self::Integer(_) => ConstantKind::Integer,
            Self::Float(_) => ConstantKind::Float,
            Self::Long(_) => ConstantKind::Long,
            Self::Double(_) => ConstantKind::Double,
            Self::Class(_) => ConstantKind::Class,
            Self::String(_) => ConstantKind::String,
            Self::Fieldref(_) => ConstantKind::Fieldref,
            Self::Methodref(_) => ConstantKind::Methodref,
            Self::InterfaceMethodref(_) => ConstantKind::InterfaceMethodref,
            Self::NameAndType(_) => ConstantKind::NameAndType,
            Self::MethodHandle(_) => ConstantKind::MethodHandle,
            Self::MethodType(_) => ConstantKind::MethodType,
            Self::Dynamic(_) => ConstantKind::Dynamic,
            Self::InvokeDynamic(_) => ConstantKind::InvokeDynamic,
            Self::Module(_) => ConstantKind::Module,
            Self::Package(_) => ConstantKind::Package,
        }
    }

    pub(super) fn read(
        pool: &ConstantPool,
        index: u16,
        entry: &RawConstant,
    ) -> Result<Self, ConstantError> {
        fn read<T: Constant + Into<AnyConstant>>(
            pool: &ConstantPool,
            index: u16,
            data: &Bytes,
        ) -> Result<AnyConstant, ConstantError> {
            T::read(pool, index, data).map(Into::into)
        }

        let data = entry.data();
        match entry.kind() {
            ConstantKind::Utf8 => read::<Utf8Constant>(pool, index, data),
            ConstantKind::Integer => read::<IntegerConstant>(pool, index, data),
            ConstantKind::Float => read::<FloatConstant>(pool, index, data),
            ConstantKind::Long => read::<LongConstant>(pool, index, data),
            ConstantKind::Double => read::<DoubleConstant>(pool, index, data),
            ConstantKind::Class => read::<ClassConstant>(pool, index, data),
            ConstantKind::String => read::<StringConstant>(pool, index, data),
            ConstantKind::Fieldref => read::<FieldrefConstant>(pool, index, data),
            ConstantKind::Methodref => read::<MethodrefConstant>(pool, index, data),
            ConstantKind::InterfaceMethodref => {
                read::<InterfaceMethodrefConstant>(pool, index, data)
            }
            ConstantKind::NameAndType => read::<NameAndTypeConstant>(pool, index, data),
            ConstantKind::MethodHandle => read::<MethodHandleConstant>(pool, index, data),
            ConstantKind::MethodType => read::<MethodTypeConstant>(pool, index, data),
            ConstantKind::Dynamic => read::<DynamicConstant>(pool, index, data),
            ConstantKind::InvokeDynamic => read::<InvokeDynamicConstant>(pool, index, data),
            ConstantKind::Module => read::<ModuleConstant>(pool, index, data),
            ConstantKind::Package => read::<PackageConstant>(pool, index, data),
            ConstantKind::Unknown => Err(ConstantError::BadIndex(index)),
        }
    }
}

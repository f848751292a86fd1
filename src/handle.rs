//! References into the constant pool.
//!
//! A handle is only an index; it carries no value and is meaningless without the
//! [`ConstantPool`](crate::constant_pool::ConstantPool) of the class file it was read from.

use std::{fmt, hash::Hash, marker::PhantomData};

use crate::{
    errors::{ConstantError, DecodeError},
    intrinsics::see_jvm_spec,
    reader::{ClassReader, Decode},
};

/// The kind of a constant pool entry.
#[doc = see_jvm_spec!(4, 4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
#[repr(u8)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ConstantKind {
    /// No entry, or an entry of unknown kind.
    #[default]
    #[display("CONSTANT_Unknown")]
    Unknown = 0,
    /// `CONSTANT_Utf8`
    #[display("CONSTANT_Utf8")]
    Utf8 = 1,
    /// `CONSTANT_Integer`
    #[display("CONSTANT_Integer")]
    Integer = 3,
    /// `CONSTANT_Float`
    #[display("CONSTANT_Float")]
    Float = 4,
    /// `CONSTANT_Long`
    #[display("CONSTANT_Long")]
    Long = 5,
    /// `CONSTANT_Double`
    #[display("CONSTANT_Double")]
    Double = 6,
    /// `CONSTANT_Class`
    #[display("CONSTANT_Class")]
    Class = 7,
    /// `CONSTANT_String`
    #[display("CONSTANT_String")]
    String = 8,
    /// `CONSTANT_Fieldref`
    #[display("CONSTANT_Fieldref")]
    Fieldref = 9,
    /// `CONSTANT_Methodref`
    #[display("CONSTANT_Methodref")]
    Methodref = 10,
    /// `CONSTANT_InterfaceMethodref`
    #[display("CONSTANT_InterfaceMethodref")]
    InterfaceMethodref = 11,
    /// `CONSTANT_NameAndType`
    #[display("CONSTANT_NameAndType")]
    NameAndType = 12,
    /// `CONSTANT_MethodHandle`
    #[display("CONSTANT_MethodHandle")]
    MethodHandle = 15,
    /// `CONSTANT_MethodType`
    #[display("CONSTANT_MethodType")]
    MethodType = 16,
    /// `CONSTANT_Dynamic`
    #[display("CONSTANT_Dynamic")]
    Dynamic = 17,
    /// `CONSTANT_InvokeDynamic`
    #[display("CONSTANT_InvokeDynamic")]
    InvokeDynamic = 18,
    /// `CONSTANT_Module`
    #[display("CONSTANT_Module")]
    Module = 19,
    /// `CONSTANT_Package`
    #[display("CONSTANT_Package")]
    Package = 20,
}

impl ConstantKind {
    /// Returns the tag byte of this kind.
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Returns the number of pool slots an entry of this kind occupies.
    ///
    /// `CONSTANT_Long` and `CONSTANT_Double` take two slots; the second one is unusable.
    #[must_use]
    pub const fn slot_width(self) -> u16 {
        match self {
            Self::Long | Self::Double => 2,
            _ => 1,
        }
    }
}

impl TryFrom<u8> for ConstantKind {
    type Error = DecodeError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        let kind = match tag {
            1 => Self::Utf8,
            3 => Self::Integer,
            4 => Self::Float,
            5 => Self::Long,
            6 => Self::Double,
            7 => Self::Class,
            8 => Self::String,
            9 => Self::Fieldref,
            10 => Self::Methodref,
            11 => Self::InterfaceMethodref,
            12 => Self::NameAndType,
            15 => Self::MethodHandle,
            16 => Self::MethodType,
            17 => Self::Dynamic,
            18 => Self::InvokeDynamic,
            19 => Self::Module,
            20 => Self::Package,
            unknown => return Err(DecodeError::UnknownConstantTag(unknown)),
        };
        Ok(kind)
    }
}

/// An untyped reference to a constant pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::Display)]
#[display("{kind}#{index}")]
pub struct ConstantHandle {
    kind: ConstantKind,
    index: u16,
}

impl ConstantHandle {
    /// Creates a handle to the entry at `index`, expected to be of the given kind.
    #[must_use]
    pub const fn new(kind: ConstantKind, index: u16) -> Self {
        Self { kind, index }
    }

    /// The handle that refers to nothing.
    #[must_use]
    pub const fn nil() -> Self {
        Self {
            kind: ConstantKind::Unknown,
            index: 0,
        }
    }

    /// The expected kind of the referenced entry.
    #[must_use]
    pub const fn kind(&self) -> ConstantKind {
        self.kind
    }

    /// The index of the referenced entry.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Returns `true` if this handle refers to nothing.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.index == 0 || matches!(self.kind, ConstantKind::Unknown)
    }
}

/// A constant type that a typed [`Handle`] can point at.
pub trait ConstantType {
    /// The kind of constant pool entries of this type.
    const KIND: ConstantKind;
}

/// A reference to a constant pool entry of a statically known type.
pub struct Handle<T> {
    index: u16,
    _type: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// Creates a handle to the entry at `index`.
    #[must_use]
    pub const fn new(index: u16) -> Self {
        Self {
            index,
            _type: PhantomData,
        }
    }

    /// The handle that refers to nothing.
    #[must_use]
    pub const fn nil() -> Self {
        Self::new(0)
    }

    /// The index of the referenced entry.
    #[must_use]
    pub const fn index(&self) -> u16 {
        self.index
    }

    /// Returns `true` if this handle refers to nothing.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.index == 0
    }
}

impl<T: ConstantType> Handle<T> {
    /// Forgets the static type of this handle.
    #[must_use]
    pub const fn untyped(self) -> ConstantHandle {
        if self.index == 0 {
            ConstantHandle::nil()
        } else {
            ConstantHandle::new(T::KIND, self.index)
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::nil()
    }
}

impl<T: ConstantType> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>(#{})", T::KIND, self.index)
    }
}

impl<T: ConstantType> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", T::KIND, self.index)
    }
}

impl<T: ConstantType> From<Handle<T>> for ConstantHandle {
    fn from(handle: Handle<T>) -> Self {
        handle.untyped()
    }
}

impl<T: ConstantType> TryFrom<ConstantHandle> for Handle<T> {
    type Error = ConstantError;

    fn try_from(handle: ConstantHandle) -> Result<Self, Self::Error> {
        if handle.index() == 0 {
            Ok(Self::nil())
        } else if handle.kind() == T::KIND {
            Ok(Self::new(handle.index()))
        } else {
            Err(ConstantError::Mismatch {
                expected: kind_name(T::KIND),
                found: handle.kind(),
            })
        }
    }
}

pub(crate) const fn kind_name(kind: ConstantKind) -> &'static str {
    match kind {
        ConstantKind::Unknown => "CONSTANT_Unknown",
        ConstantKind::Utf8 => "CONSTANT_Utf8",
        ConstantKind::Integer => "CONSTANT_Integer",
        ConstantKind::Float => "CONSTANT_Float",
        ConstantKind::Long => "CONSTANT_Long",
        ConstantKind::Double => "CONSTANT_Double",
        ConstantKind::Class => "CONSTANT_Class",
        ConstantKind::String => "CONSTANT_String",
        ConstantKind::Fieldref => "CONSTANT_Fieldref",
        ConstantKind::Methodref => "CONSTANT_Methodref",
        ConstantKind::InterfaceMethodref => "CONSTANT_InterfaceMethodref",
        ConstantKind::NameAndType => "CONSTANT_NameAndType",
        ConstantKind::MethodHandle => "CONSTANT_MethodHandle",
        ConstantKind::MethodType => "CONSTANT_MethodType",
        ConstantKind::Dynamic => "CONSTANT_Dynamic",
        ConstantKind::InvokeDynamic => "CONSTANT_InvokeDynamic",
        ConstantKind::Module => "CONSTANT_Module",
        ConstantKind::Package => "CONSTANT_Package",
    }
}

impl<T> Decode for Handle<T> {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        u16::measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self::new(reader.read_value()?))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    enum Marker {}

    impl ConstantType for Marker {
        const KIND: ConstantKind = ConstantKind::Class;
    }

    #[test]
    fn nil_handles() {
        assert!(ConstantHandle::default().is_nil());
        assert_eq!(ConstantHandle::default().index(), 0);
        assert!(Handle::<Marker>::default().is_nil());
        assert!(ConstantHandle::new(ConstantKind::Utf8, 0).is_nil());
        assert!(ConstantHandle::new(ConstantKind::Unknown, 3).is_nil());
        assert!(Handle::<Marker>::default().untyped().is_nil());
    }

    #[test]
    fn narrowing_checks_kind() {
        let handle = ConstantHandle::new(ConstantKind::Class, 4);
        let typed = Handle::<Marker>::try_from(handle).unwrap();
        assert_eq!(typed.index(), 4);
        assert_eq!(ConstantHandle::from(typed), handle);

        let utf8 = ConstantHandle::new(ConstantKind::Utf8, 4);
        let err = Handle::<Marker>::try_from(utf8).unwrap_err();
        assert!(matches!(
            err,
            ConstantError::Mismatch {
                expected: "CONSTANT_Class",
                found: ConstantKind::Utf8
            }
        ));
    }

    proptest! {
        #[test]
        fn tag_round_trip(kind in any::<ConstantKind>()) {
            if kind == ConstantKind::Unknown {
                prop_assert!(ConstantKind::try_from(kind.tag()).is_err());
            } else {
                prop_assert_eq!(ConstantKind::try_from(kind.tag()).unwrap(), kind);
                prop_assert_eq!(kind.to_string(), kind_name(kind));
            }
        }
    }
}

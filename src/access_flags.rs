//! Access flags and property flags of class file structures.
//!
//! Flags are decoded with [`bitflags::Flags::from_bits_retain`], so bits that are not defined for
//! a structure survive a decode and encode round trip.

use std::io::Write;

use bitflags::bitflags;

use crate::{
    encoding::{ConstantImport, Encode},
    errors::{DecodeError, EncodeError},
    reader::{ClassReader, Decode},
};

bitflags! {
    /// The access flags of a class, interface or module.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct ClassAccessFlags: u16 {
        /// Declared `public`; may be accessed from outside its package.
        const PUBLIC = 0x0001;
        /// Declared `final`; no subclasses allowed.
        const FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by the `invokespecial` instruction.
        const SUPER = 0x0020;
        /// Is an interface, not a class.
        const INTERFACE = 0x0200;
        /// Declared `abstract`; must not be instantiated.
        const ABSTRACT = 0x0400;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface.
        const ANNOTATION = 0x2000;
        /// Declared as an enum class.
        const ENUM = 0x4000;
        /// Is a module, not a class or interface.
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// The access flags of a field.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct FieldAccessFlags: u16 {
        /// Declared `public`; may be accessed from outside its package.
        const PUBLIC = 0x0001;
        /// Declared `private`; accessible only within the defining class and other classes belonging to the same nest.
        const PRIVATE = 0x0002;
        /// Declared `protected`; may be accessed within subclasses.
        const PROTECTED = 0x0004;
        /// Declared `static`.
        const STATIC = 0x0008;
        /// Declared `final`; never directly assigned to after object construction.
        const FINAL = 0x0010;
        /// Declared `volatile`; cannot be cached.
        const VOLATILE = 0x0040;
        /// Declared `transient`; not written or read by a persistent object manager.
        const TRANSIENT = 0x0080;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
        /// Declared as an element of an `enum` class.
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// The access flags of a method.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct MethodAccessFlags: u16 {
        /// Declared `public`; may be accessed from outside its package.
        const PUBLIC = 0x0001;
        /// Declared `private`; accessible only within the defining class and other classes belonging to the same nest.
        const PRIVATE = 0x0002;
        /// Declared `protected`; may be accessed within subclasses.
        const PROTECTED = 0x0004;
        /// Declared `static`.
        const STATIC = 0x0008;
        /// Declared `final`; must not be overridden.
        const FINAL = 0x0010;
        /// Declared `synchronized`; invocation is wrapped by a monitor use.
        const SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler.
        const BRIDGE = 0x0040;
        /// Declared with variable number of arguments.
        const VARARGS = 0x0080;
        /// Declared `native`; implemented in a language other than Java.
        const NATIVE = 0x0100;
        /// Declared `abstract`; no implementation is provided.
        const ABSTRACT = 0x0400;
        /// In a `class` file whose major version is at least 46 and at most 60; Declared `strictfp`.
        const STRICT = 0x0800;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// The access flags of a nested class, as recorded in the `InnerClasses` attribute.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct NestedClassAccessFlags: u16 {
        /// Marked or implicitly `public` in source.
        const PUBLIC = 0x0001;
        /// Marked `private` in source.
        const PRIVATE = 0x0002;
        /// Marked `protected` in source.
        const PROTECTED = 0x0004;
        /// Marked or implicitly `static` in source.
        const STATIC = 0x0008;
        /// Marked or implicitly `final` in source.
        const FINAL = 0x0010;
        /// Was an `interface` in source.
        const INTERFACE = 0x0200;
        /// Marked or implicitly `abstract` in source.
        const ABSTRACT = 0x0400;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
        /// Declared as an annotation interface.
        const ANNOTATION = 0x2000;
        /// Declared as an `enum` class.
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// The access flags of a formal parameter in the `MethodParameters` attribute.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct MethodParameterAccessFlags: u16 {
        /// Declared `final`; may not be assigned to after initialization.
        const FINAL = 0x0010;
        /// Declared synthetic; not present in the source code.
        const SYNTHETIC = 0x1000;
        /// Declared as either `mandated` or `optional`.
        const MANDATED = 0x8000;
    }
}

bitflags! {
    /// The flags of a module.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct ModuleFlags: u16 {
        /// Indicates that this module is open.
        const OPEN = 0x0020;
        /// Indicates that this module was not explicitly or implicitly declared.
        const SYNTHETIC = 0x1000;
        /// Indicates that this module is implicitly declared.
        const MANDATED = 0x8000;
    }
}

bitflags! {
    /// The flags of a `requires` directive.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct RequiresFlags: u16 {
        /// Any module which depends on the current module also depends on the required module.
        const TRANSITIVE = 0x0020;
        /// The dependence is mandatory in the static phase but optional in the dynamic phase.
        const STATIC_PHASE = 0x0040;
        /// Indicates that this dependence was not explicitly or implicitly declared.
        const SYNTHETIC = 0x1000;
        /// Indicates that this dependence was implicitly declared.
        const MANDATED = 0x8000;
    }
}

bitflags! {
    /// The flags of an `exports` directive.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct ExportsFlags: u16 {
        /// Indicates that this export was not explicitly or implicitly declared.
        const SYNTHETIC = 0x1000;
        /// Indicates that this export was implicitly declared.
        const MANDATED = 0x8000;
    }
}

bitflags! {
    /// The flags of an `opens` directive.
    #[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Default)]
    pub struct OpensFlags: u16 {
        /// Indicates that this opening was not explicitly or implicitly declared.
        const SYNTHETIC = 0x1000;
        /// Indicates that this opening was implicitly declared.
        const MANDATED = 0x8000;
    }
}

macro_rules! impl_flags_codec {
    ($($flags:ty),* $(,)?) => {
        $(
            impl Decode for $flags {
                fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
                    u16::measure(reader, size)
                }

                fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
                    Ok(Self::from_bits_retain(reader.read_value()?))
                }
            }

            impl Encode for $flags {
                fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
                where
                    W: Write + ?Sized,
                    I: ConstantImport + ?Sized,
                {
                    self.bits().encode(writer, import)
                }
            }
        )*
    };
}

impl_flags_codec!(
    ClassAccessFlags,
    FieldAccessFlags,
    MethodAccessFlags,
    NestedClassAccessFlags,
    MethodParameterAccessFlags,
    ModuleFlags,
    RequiresFlags,
    ExportsFlags,
    OpensFlags,
);

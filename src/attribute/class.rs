use std::io::Write;

use bytes::Bytes;
use itertools::Itertools;

use super::AttributeTable;
use crate::{
    access_flags::NestedClassAccessFlags,
    constant_pool::{
        ClassConstantHandle, ConstantPool, MethodHandleConstantHandle, NameAndTypeConstantHandle,
        Utf8ConstantHandle,
    },
    encoding::{ConstantImport, Encode},
    errors::{CastError, ConstantError, DecodeError, EncodeError},
    handle::{ConstantHandle, ConstantKind},
    intrinsics::{layout, see_jvm_spec},
    reader::{ClassReader, Decode, decode_exact},
};

layout! {
    /// The `SourceFile` attribute.
    #[doc = see_jvm_spec!(4, 7, 10)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct SourceFileAttribute {
        /// The name of the source file.
        pub source_file: Utf8ConstantHandle,
    }
}

/// The `SourceDebugExtension` attribute.
#[doc = see_jvm_spec!(4, 7, 11)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceDebugExtensionAttribute {
    /// The extended debugging information, in modified UTF-8.
    pub debug_extension: Bytes,
}

impl Decode for SourceDebugExtensionAttribute {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        let remaining = reader.remaining();
        reader.advance(remaining)?;
        *size += remaining;
        Ok(())
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            debug_extension: reader.read_many(reader.remaining())?,
        })
    }
}

impl Encode for SourceDebugExtensionAttribute {
    fn encode<W, I>(&self, writer: &mut W, _: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        writer.write_all(&self.debug_extension)?;
        Ok(())
    }
}

layout! {
    /// The `InnerClasses` attribute.
    #[doc = see_jvm_spec!(4, 7, 6)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct InnerClassesAttribute {
        /// The nested classes.
        pub classes: Vec<InnerClass>,
    }
}

layout! {
    /// An entry of the `InnerClasses` attribute.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct InnerClass {
        /// The nested class.
        pub inner_class: ClassConstantHandle,
        /// The class declaring the nested class, or nil for local and anonymous classes.
        pub outer_class: ClassConstantHandle,
        /// The simple name of the nested class, or nil for anonymous classes.
        pub inner_name: Utf8ConstantHandle,
        /// The flags of the nested class as declared in source.
        pub access_flags: NestedClassAccessFlags,
    }
}

layout! {
    /// The `EnclosingMethod` attribute of a local or anonymous class.
    #[doc = see_jvm_spec!(4, 7, 7)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct EnclosingMethodAttribute {
        /// The innermost class enclosing the class.
        pub class: ClassConstantHandle,
        /// The enclosing method, or nil if the class is not enclosed by a method.
        pub method: NameAndTypeConstantHandle,
    }
}

layout! {
    /// The `BootstrapMethods` attribute.
    #[doc = see_jvm_spec!(4, 7, 23)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct BootstrapMethodsAttribute {
        /// The bootstrap methods, referred to by index from dynamic constants.
        pub methods: Vec<BootstrapMethod>,
    }
}

impl BootstrapMethodsAttribute {
    /// Decodes the attribute and resolves the kinds of the static arguments.
    pub(super) fn resolve(data: &Bytes, pool: &ConstantPool) -> Result<Self, CastError> {
        let mut attribute: Self = decode_exact(data)?;
        for argument in attribute
            .methods
            .iter_mut()
            .flat_map(|it| it.arguments.iter_mut())
        {
            let resolved = pool.handle(argument.index());
            if resolved.kind() == ConstantKind::Unknown {
                return Err(ConstantError::BadIndex(argument.index()).into());
            }
            *argument = resolved;
        }
        Ok(attribute)
    }
}

/// An entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BootstrapMethod {
    /// The bootstrap method.
    pub method: MethodHandleConstantHandle,
    /// The static arguments passed to the bootstrap method.
    pub arguments: Vec<ConstantHandle>,
}

impl Decode for BootstrapMethod {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        MethodHandleConstantHandle::measure(reader, size)?;
        Vec::<u16>::measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let method = Decode::decode(reader)?;
        let arguments: Vec<u16> = Decode::decode(reader)?;
        Ok(Self {
            method,
            arguments: arguments
                .into_iter()
                .map(|it| ConstantHandle::new(ConstantKind::Unknown, it))
                .collect_vec(),
        })
    }
}

impl Encode for BootstrapMethod {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.method.encode(writer, import)?;
        self.arguments.encode(writer, import)
    }
}

layout! {
    /// The `NestHost` attribute.
    #[doc = see_jvm_spec!(4, 7, 28)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct NestHostAttribute {
        /// The host of the nest the class belongs to.
        pub host_class: ClassConstantHandle,
    }
}

layout! {
    /// The `NestMembers` attribute.
    #[doc = see_jvm_spec!(4, 7, 29)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct NestMembersAttribute {
        /// The other members of the nest hosted by the class.
        pub classes: Vec<ClassConstantHandle>,
    }
}

layout! {
    /// The `Record` attribute.
    #[doc = see_jvm_spec!(4, 7, 30)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RecordAttribute {
        /// The components of the record, in declaration order.
        pub components: Vec<RecordComponent>,
    }
}

layout! {
    /// A component of a record class.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct RecordComponent {
        /// The name of the component.
        pub name: Utf8ConstantHandle,
        /// The field descriptor of the component.
        pub descriptor: Utf8ConstantHandle,
        /// The attributes of the component.
        pub attributes: AttributeTable,
    }
}

layout! {
    /// The `PermittedSubclasses` attribute.
    #[doc = see_jvm_spec!(4, 7, 31)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct PermittedSubclassesAttribute {
        /// The classes allowed to extend or implement the sealed class.
        pub classes: Vec<ClassConstantHandle>,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        attribute::{Attribute, AttributeKind, SignatureAttribute},
        encoding::KeepHandles,
        tests::PoolBuilder,
    };

    fn attribute(name: u16, body: &[u8]) -> Attribute {
        Attribute::new(Utf8ConstantHandle::new(name), Bytes::copy_from_slice(body))
    }

    fn be(values: &[u16]) -> Vec<u8> {
        values.iter().flat_map(|it| it.to_be_bytes()).collect()
    }

    #[test]
    fn bootstrap_arguments_resolve_kinds() {
        let mut builder = PoolBuilder::new();
        let name = builder.utf8("BootstrapMethods");
        let owner_name = builder.utf8("java/lang/invoke/LambdaMetafactory");
        let owner = builder.class(owner_name);
        let method_name = builder.utf8("metafactory");
        let descriptor = builder.utf8("()V");
        let nat = builder.name_and_type(method_name, descriptor);
        let method = builder.member_ref(ConstantKind::Methodref, owner, nat);
        let handle = builder.method_handle(6, method);
        let argument = builder.long(7);
        let pool = builder.build(52);

        let body = be(&[1, handle, 2, descriptor, argument]);
        let attribute = attribute(name, &body);
        let bootstrap = attribute
            .cast::<BootstrapMethodsAttribute>(&pool)
            .unwrap();
        assert_eq!(
            bootstrap.methods,
            vec![BootstrapMethod {
                method: MethodHandleConstantHandle::new(handle),
                arguments: vec![
                    ConstantHandle::new(ConstantKind::Utf8, descriptor),
                    ConstantHandle::new(ConstantKind::Long, argument),
                ],
            }]
        );
        assert_eq!(bootstrap.to_bytes(&mut KeepHandles).unwrap(), body);

        let dangling = self::attribute(name, &be(&[1, handle, 1, argument + 1]));
        assert!(matches!(
            dangling.cast::<BootstrapMethodsAttribute>(&pool),
            Err(CastError::Constant(ConstantError::BadIndex(_)))
        ));
    }

    #[test]
    fn inner_classes_and_nest() {
        let mut builder = PoolBuilder::new();
        let inner_classes = builder.utf8("InnerClasses");
        let inner_name = builder.utf8("Outer$Inner");
        let inner = builder.class(inner_name);
        let outer_name = builder.utf8("Outer");
        let outer = builder.class(outer_name);
        let simple_name = builder.utf8("Inner");
        let nest_members = builder.utf8("NestMembers");
        let pool = builder.build(55);

        let body = be(&[1, inner, outer, simple_name, 0x0008]);
        let classes = attribute(inner_classes, &body)
            .cast::<InnerClassesAttribute>(&pool)
            .unwrap();
        let entry = classes.classes[0];
        assert_eq!(entry.inner_class, ClassConstantHandle::new(inner));
        assert_eq!(entry.outer_class, ClassConstantHandle::new(outer));
        assert_eq!(entry.access_flags, NestedClassAccessFlags::STATIC);
        assert_eq!(classes.to_bytes(&mut KeepHandles).unwrap(), body);

        let members = attribute(nest_members, &be(&[1, inner]))
            .cast::<NestMembersAttribute>(&pool)
            .unwrap();
        assert_eq!(members.classes, vec![ClassConstantHandle::new(inner)]);
    }

    #[test]
    fn record_components_have_attributes() {
        let mut builder = PoolBuilder::new();
        let record = builder.utf8("Record");
        let name = builder.utf8("x");
        let descriptor = builder.utf8("I");
        let signature = builder.utf8("Signature");
        let pool = builder.build(61);

        let mut body = be(&[1, name, descriptor, 1, signature]);
        body.extend_from_slice(&2u32.to_be_bytes());
        body.extend_from_slice(&descriptor.to_be_bytes());
        let components = attribute(record, &body)
            .cast::<RecordAttribute>(&pool)
            .unwrap()
            .components;
        assert_eq!(components.len(), 1);
        assert_eq!(pool.get_utf8(components[0].name).unwrap(), "x");
        let signature = components[0]
            .attributes
            .find_as::<SignatureAttribute>(&pool)
            .unwrap()
            .unwrap();
        assert_eq!(signature.signature, Utf8ConstantHandle::new(descriptor));
        assert_eq!(
            components[0].attributes[0].kind(&pool).unwrap(),
            Some(AttributeKind::Signature)
        );
    }

    #[test]
    fn source_debug_extension_takes_the_whole_body() {
        let mut builder = PoolBuilder::new();
        let name = builder.utf8("SourceDebugExtension");
        let pool = builder.build(52);
        let extension = attribute(name, b"SMAP\nMain.kt\n")
            .cast::<SourceDebugExtensionAttribute>(&pool)
            .unwrap();
        assert_eq!(extension.debug_extension.as_ref(), b"SMAP\nMain.kt\n");
        assert_eq!(
            extension.to_bytes(&mut KeepHandles).unwrap(),
            b"SMAP\nMain.kt\n"
        );
    }
}

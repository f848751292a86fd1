use bytes::Bytes;
use proptest::prelude::*;

use crate::{constant_pool::ConstantPool, handle::ConstantKind, reader::ClassReader};

/// An encoded constant pool entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PoolEntry {
    kind: ConstantKind,
    payload: Vec<u8>,
}

impl PoolEntry {
    pub(crate) fn new(kind: ConstantKind, payload: Vec<u8>) -> Self {
        Self { kind, payload }
    }

    pub(crate) const fn kind(&self) -> ConstantKind {
        self.kind
    }
}

fn be(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|it| it.to_be_bytes()).collect()
}

/// Builds the bytes of a constant pool, handing out the index of every entry it adds.
#[derive(Debug, Clone)]
pub(crate) struct PoolBuilder {
    next_index: u16,
    bytes: Vec<u8>,
}

impl PoolBuilder {
    pub(crate) fn new() -> Self {
        Self {
            next_index: 1,
            bytes: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, entry: PoolEntry) -> u16 {
        let index = self.next_index;
        self.bytes.push(entry.kind.tag());
        self.bytes.extend_from_slice(&entry.payload);
        self.next_index += entry.kind.slot_width();
        index
    }

    pub(crate) fn utf8_raw(&mut self, bytes: &[u8]) -> u16 {
        let mut payload = u16::try_from(bytes.len()).unwrap().to_be_bytes().to_vec();
        payload.extend_from_slice(bytes);
        self.push(PoolEntry::new(ConstantKind::Utf8, payload))
    }

    pub(crate) fn utf8(&mut self, value: &str) -> u16 {
        self.utf8_raw(&cesu8::to_java_cesu8(value))
    }

    pub(crate) fn long(&mut self, value: i64) -> u16 {
        self.push(PoolEntry::new(
            ConstantKind::Long,
            value.to_be_bytes().to_vec(),
        ))
    }

    pub(crate) fn class(&mut self, name: u16) -> u16 {
        self.push(PoolEntry::new(ConstantKind::Class, be(&[name])))
    }

    pub(crate) fn name_and_type(&mut self, name: u16, descriptor: u16) -> u16 {
        self.push(PoolEntry::new(
            ConstantKind::NameAndType,
            be(&[name, descriptor]),
        ))
    }

    pub(crate) fn member_ref(&mut self, kind: ConstantKind, class: u16, name_and_type: u16) -> u16 {
        self.push(PoolEntry::new(kind, be(&[class, name_and_type])))
    }

    pub(crate) fn method_handle(&mut self, reference_kind: u8, reference: u16) -> u16 {
        let mut payload = vec![reference_kind];
        payload.extend_from_slice(&reference.to_be_bytes());
        self.push(PoolEntry::new(ConstantKind::MethodHandle, payload))
    }

    pub(crate) fn module(&mut self, name: u16) -> u16 {
        self.push(PoolEntry::new(ConstantKind::Module, be(&[name])))
    }

    pub(crate) fn package(&mut self, name: u16) -> u16 {
        self.push(PoolEntry::new(ConstantKind::Package, be(&[name])))
    }

    /// The encoded pool, starting with `constant_pool_count`.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.next_index.to_be_bytes().to_vec();
        bytes.extend_from_slice(&self.bytes);
        bytes
    }

    pub(crate) fn build(&self, major: u16) -> ConstantPool {
        let bytes = Bytes::from(self.to_bytes());
        ConstantPool::decode(&mut ClassReader::new(&bytes), major).unwrap()
    }
}

/// Entries whose payloads decode, except for method handles whose reference may be dangling.
pub(crate) fn arb_pool_entries() -> impl Strategy<Value = Vec<PoolEntry>> {
    let handle = 1..=u16::MAX;
    let entry = prop_oneof![
        "\\PC{0,16}".prop_map(|it: String| {
            let bytes = cesu8::to_java_cesu8(&it).into_owned();
            let mut payload = u16::try_from(bytes.len()).unwrap().to_be_bytes().to_vec();
            payload.extend(bytes);
            PoolEntry::new(ConstantKind::Utf8, payload)
        }),
        any::<i32>().prop_map(|it| PoolEntry::new(ConstantKind::Integer, it.to_be_bytes().to_vec())),
        any::<f32>().prop_map(|it| PoolEntry::new(ConstantKind::Float, it.to_be_bytes().to_vec())),
        any::<i64>().prop_map(|it| PoolEntry::new(ConstantKind::Long, it.to_be_bytes().to_vec())),
        any::<f64>().prop_map(|it| PoolEntry::new(ConstantKind::Double, it.to_be_bytes().to_vec())),
        (
            prop::sample::select(vec![
                ConstantKind::Class,
                ConstantKind::String,
                ConstantKind::MethodType,
                ConstantKind::Module,
                ConstantKind::Package,
            ]),
            handle.clone(),
        )
            .prop_map(|(kind, it)| PoolEntry::new(kind, be(&[it]))),
        (
            prop::sample::select(vec![
                ConstantKind::Fieldref,
                ConstantKind::Methodref,
                ConstantKind::InterfaceMethodref,
                ConstantKind::NameAndType,
                ConstantKind::Dynamic,
                ConstantKind::InvokeDynamic,
            ]),
            handle.clone(),
            handle.clone(),
        )
            .prop_map(|(kind, first, second)| PoolEntry::new(kind, be(&[first, second]))),
        (1..=9u8, handle).prop_map(|(reference_kind, reference)| {
            let mut payload = vec![reference_kind];
            payload.extend_from_slice(&reference.to_be_bytes());
            PoolEntry::new(ConstantKind::MethodHandle, payload)
        }),
    ];
    prop::collection::vec(entry, 0..32)
}

/// The smallest class file: no constants, members or attributes.
pub(crate) fn minimal_class(major: u16) -> Vec<u8> {
    let mut bytes = 0xCAFE_BABE_u32.to_be_bytes().to_vec();
    bytes.extend(be(&[0, major, 1, 0, 0, 0, 0, 0, 0, 0]));
    bytes
}

/// Builds the bytes of a whole class file.
#[derive(Debug, Clone)]
pub(crate) struct ClassBuilder {
    major: u16,
    pub(crate) pool: PoolBuilder,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassBuilder {
    pub(crate) fn new(major: u16) -> Self {
        Self {
            major,
            pool: PoolBuilder::new(),
            access_flags: 0,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    fn class_named(&mut self, name: &str) -> u16 {
        let name = self.pool.utf8(name);
        self.pool.class(name)
    }

    /// Encodes an attribute whose name is added to the pool.
    pub(crate) fn attribute(&mut self, name: &str, body: &[u8]) -> Vec<u8> {
        let mut bytes = self.pool.utf8(name).to_be_bytes().to_vec();
        bytes.extend_from_slice(&u32::try_from(body.len()).unwrap().to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    fn member(&mut self, access_flags: u16, name: &str, descriptor: &str, attributes: &[Vec<u8>]) -> Vec<u8> {
        let name = self.pool.utf8(name);
        let descriptor = self.pool.utf8(descriptor);
        let mut bytes = be(&[
            access_flags,
            name,
            descriptor,
            u16::try_from(attributes.len()).unwrap(),
        ]);
        attributes.iter().for_each(|it| bytes.extend_from_slice(it));
        bytes
    }

    /// `public class org.example.Sample implements Runnable` with a field `count`, an empty
    /// `run` method and a `SourceFile` attribute.
    pub(crate) fn sample(mut self) -> Self {
        self.access_flags = 0x0021;
        self.this_class = self.class_named("org/example/Sample");
        self.super_class = self.class_named("java/lang/Object");
        let runnable = self.class_named("java/lang/Runnable");
        self.interfaces.push(runnable);

        let field = self.member(0x0002, "count", "I", &[]);
        self.fields.push(field);

        let mut code = be(&[0, 1]);
        code.extend_from_slice(&1u32.to_be_bytes());
        code.push(0xB1);
        code.extend(be(&[0, 0]));
        let code = self.attribute("Code", &code);
        let method = self.member(0x0001, "run", "()V", &[code]);
        self.methods.push(method);

        let source_file = self.pool.utf8("Sample.java");
        let source_file = self.attribute("SourceFile", &source_file.to_be_bytes());
        self.attributes.push(source_file);
        self
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        fn table(bytes: &mut Vec<u8>, items: &[Vec<u8>]) {
            bytes.extend(be(&[u16::try_from(items.len()).unwrap()]));
            items.iter().for_each(|it| bytes.extend_from_slice(it));
        }

        let mut bytes = 0xCAFE_BABE_u32.to_be_bytes().to_vec();
        bytes.extend(be(&[0, self.major]));
        bytes.extend(self.pool.to_bytes());
        bytes.extend(be(&[
            self.access_flags,
            self.this_class,
            self.super_class,
            u16::try_from(self.interfaces.len()).unwrap(),
        ]));
        bytes.extend(be(&self.interfaces));
        table(&mut bytes, &self.fields);
        table(&mut bytes, &self.methods);
        table(&mut bytes, &self.attributes);
        bytes
    }
}

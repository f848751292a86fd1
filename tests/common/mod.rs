#![allow(dead_code)]

//! Hand-assembled class files.

pub const MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

pub fn be(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|it| it.to_be_bytes()).collect()
}

/// The smallest class file: no constants, members or attributes.
pub fn minimal_class(major: u16) -> Vec<u8> {
    let mut bytes = MAGIC.to_vec();
    bytes.extend(be(&[0, major, 1, 0, 0, 0, 0, 0, 0, 0]));
    bytes
}

/// Assembles a class file, adding constants as they are needed.
#[derive(Debug, Default)]
pub struct ClassWriter {
    next_index: u16,
    pool: Vec<u8>,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<Vec<u8>>,
    pub methods: Vec<Vec<u8>>,
    pub attributes: Vec<Vec<u8>>,
}

impl ClassWriter {
    pub fn new() -> Self {
        Self {
            next_index: 1,
            ..Self::default()
        }
    }

    fn constant(&mut self, tag: u8, payload: &[u8], width: u16) -> u16 {
        let index = self.next_index;
        self.pool.push(tag);
        self.pool.extend_from_slice(payload);
        self.next_index += width;
        index
    }

    pub fn utf8(&mut self, value: &str) -> u16 {
        let bytes = cesu8::to_java_cesu8(value);
        let mut payload = be(&[u16::try_from(bytes.len()).unwrap()]);
        payload.extend_from_slice(&bytes);
        self.constant(1, &payload, 1)
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        self.constant(3, &value.to_be_bytes(), 1)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.constant(5, &value.to_be_bytes(), 2)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.constant(7, &be(&[name]), 1)
    }

    pub fn string(&mut self, value: &str) -> u16 {
        let value = self.utf8(value);
        self.constant(8, &be(&[value]), 1)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.constant(12, &be(&[name, descriptor]), 1)
    }

    pub fn methodref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class = self.class(class);
        let name_and_type = self.name_and_type(name, descriptor);
        self.constant(10, &be(&[class, name_and_type]), 1)
    }

    pub fn attribute(&mut self, name: &str, body: &[u8]) -> Vec<u8> {
        let mut bytes = be(&[self.utf8(name)]);
        bytes.extend_from_slice(&u32::try_from(body.len()).unwrap().to_be_bytes());
        bytes.extend_from_slice(body);
        bytes
    }

    pub fn member(
        &mut self,
        access_flags: u16,
        name: &str,
        descriptor: &str,
        attributes: &[Vec<u8>],
    ) -> Vec<u8> {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        let mut bytes = be(&[
            access_flags,
            name,
            descriptor,
            u16::try_from(attributes.len()).unwrap(),
        ]);
        attributes.iter().for_each(|it| bytes.extend_from_slice(it));
        bytes
    }

    pub fn to_bytes(&self, major: u16) -> Vec<u8> {
        fn table(bytes: &mut Vec<u8>, items: &[Vec<u8>]) {
            bytes.extend(be(&[u16::try_from(items.len()).unwrap()]));
            items.iter().for_each(|it| bytes.extend_from_slice(it));
        }

        let mut bytes = MAGIC.to_vec();
        bytes.extend(be(&[0, major, self.next_index]));
        bytes.extend_from_slice(&self.pool);
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

fn enum_tag(writer: &mut ClassWriter, constant: &str) -> Vec<u8> {
    let mut bytes = be(&[writer.utf8("Lorg/example/Tag;"), 1, writer.utf8("kind")]);
    bytes.push(b'e');
    bytes.extend(be(&[
        writer.utf8("Lorg/example/Kind;"),
        writer.utf8(constant),
    ]));
    bytes
}

/// A class that exercises most of the decoder.
///
/// ```java
/// @Tags({@Tag(kind = Kind.ALPHA), @Tag(kind = Kind.BETA)})
/// public final class Rich<T> implements Comparable<T> {
///     public static final long LIMIT = 42L;
///     static void check(int value) { if (value != 0) { return; } }
///     public String toString() { return "rich"; }
/// }
/// ```
pub fn rich_class() -> Vec<u8> {
    let mut writer = ClassWriter::new();
    writer.access_flags = 0x0031;
    writer.this_class = writer.class("org/example/Rich");
    writer.super_class = writer.class("java/lang/Object");
    let comparable = writer.class("java/lang/Comparable");
    writer.interfaces.push(comparable);

    let limit = writer.long(42);
    let constant_value = writer.attribute("ConstantValue", &be(&[limit]));
    let field = writer.member(0x0019, "LIMIT", "J", &[constant_value]);
    writer.fields.push(field);

    // iload_0, ifeq +4, return, return
    let code = [0x1A, 0x99, 0x00, 0x04, 0xB1, 0xB1];
    let stack_map = writer.attribute("StackMapTable", &[0x00, 0x01, 0x05]);
    let line_numbers = writer.attribute("LineNumberTable", &be(&[2, 0, 4, 4, 5]));
    let mut body = be(&[1, 1]);
    body.extend_from_slice(&u32::try_from(code.len()).unwrap().to_be_bytes());
    body.extend_from_slice(&code);
    body.extend(be(&[0, 2]));
    body.extend(stack_map);
    body.extend(line_numbers);
    let check_code = writer.attribute("Code", &body);
    let check = writer.member(0x0008, "check", "(I)V", &[check_code]);
    writer.methods.push(check);

    let rich = writer.string("rich");
    let mut body = be(&[1, 1]);
    body.extend_from_slice(&3u32.to_be_bytes());
    body.extend_from_slice(&[0x12, u8::try_from(rich).unwrap(), 0xB0]);
    body.extend(be(&[0, 0]));
    let to_string_code = writer.attribute("Code", &body);
    let to_string = writer.member(0x0001, "toString", "()Ljava/lang/String;", &[to_string_code]);
    writer.methods.push(to_string);

    let mut annotation = be(&[writer.utf8("Lorg/example/Tags;"), 1, writer.utf8("value")]);
    annotation.push(b'[');
    annotation.extend(be(&[2]));
    for constant in ["ALPHA", "BETA"] {
        annotation.push(b'@');
        annotation.extend(enum_tag(&mut writer, constant));
    }
    let mut body = be(&[1]);
    body.extend(annotation);
    let annotations = writer.attribute("RuntimeVisibleAnnotations", &body);
    writer.attributes.push(annotations);

    let signature = writer.utf8("<T:Ljava/lang/Object;>Ljava/lang/Object;Ljava/lang/Comparable<TT;>;");
    let signature = writer.attribute("Signature", &be(&[signature]));
    writer.attributes.push(signature);
    let source_file = writer.utf8("Rich.java");
    let source_file = writer.attribute("SourceFile", &be(&[source_file]));
    writer.attributes.push(source_file);
    let unknown = writer.attribute("org.example.Custom", &[0xDE, 0xAD]);
    writer.attributes.push(unknown);

    writer.to_bytes(61)
}

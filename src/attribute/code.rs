use std::io::Write;

use bytes::Bytes;

use super::AttributeTable;
use crate::{
    constant_pool::{ClassConstantHandle, Utf8ConstantHandle},
    encoding::{ConstantImport, Encode},
    errors::{DecodeError, EncodeError},
    intrinsics::{layout, see_jvm_spec},
    reader::{ClassReader, Decode},
    stack_map::StackMapFrame,
};

/// The `Code` attribute of a method.
///
/// The instructions are kept as an undecoded span of bytes.
#[doc = see_jvm_spec!(4, 7, 3)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeAttribute {
    /// The maximum depth of the operand stack.
    pub max_stack: u16,
    /// The number of local variables, including the parameters.
    pub max_locals: u16,
    /// The bytecode of the method.
    pub code: Bytes,
    /// The exception handlers of the method.
    pub exception_table: Vec<ExceptionHandler>,
    /// The attributes of the `Code` attribute.
    pub attributes: AttributeTable,
}

impl Decode for CodeAttribute {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        reader.advance(2 * size_of::<u16>())?;
        let code_length: u32 = reader.read_value()?;
        let code_length = usize::try_from(code_length).map_err(|_| DecodeError::UnexpectedData)?;
        reader.advance(code_length)?;
        *size += 2 * size_of::<u16>() + size_of::<u32>() + code_length;
        Vec::<ExceptionHandler>::measure(reader, size)?;
        AttributeTable::measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let max_stack = reader.read_value()?;
        let max_locals = reader.read_value()?;
        let code_length: u32 = reader.read_value()?;
        let code_length = usize::try_from(code_length).map_err(|_| DecodeError::UnexpectedData)?;
        let code = reader.read_many(code_length)?;
        Ok(Self {
            max_stack,
            max_locals,
            code,
            exception_table: Decode::decode(reader)?,
            attributes: Decode::decode(reader)?,
        })
    }
}

impl Encode for CodeAttribute {
    /// Always fails. Re-encoding bytecode is not supported.
    fn encode<W, I>(&self, _writer: &mut W, _import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        Err(EncodeError::Unsupported("re-encoding the bytecode of a Code attribute"))
    }
}

layout! {
    /// An entry of the exception table of a `Code` attribute.
    #[doc = see_jvm_spec!(4, 7, 3)]
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ExceptionHandler {
        /// The first instruction covered by the handler.
        pub start_pc: u16,
        /// The instruction after the last one covered by the handler.
        pub end_pc: u16,
        /// The first instruction of the handler.
        pub handler_pc: u16,
        /// The class of exceptions caught, or nil if the handler catches everything.
        pub catch_type: ClassConstantHandle,
    }
}

layout! {
    /// The `StackMapTable` attribute.
    #[doc = see_jvm_spec!(4, 7, 4)]
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct StackMapTableAttribute {
        /// The frames, in bytecode order.
        pub entries: Vec<StackMapFrame>,
    }
}

layout! {
    /// The `LineNumberTable` attribute.
    #[doc = see_jvm_spec!(4, 7, 12)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct LineNumberTableAttribute {
        /// The mapping from bytecode offsets to source lines.
        pub line_numbers: Vec<LineNumber>,
    }
}

layout! {
    /// An entry of the `LineNumberTable` attribute.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LineNumber {
        /// The first instruction of the line.
        pub start_pc: u16,
        /// The line number in the source file.
        pub line_number: u16,
    }
}

layout! {
    /// The `LocalVariableTable` attribute.
    #[doc = see_jvm_spec!(4, 7, 13)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct LocalVariableTableAttribute {
        /// The local variables.
        pub variables: Vec<LocalVariable>,
    }
}

layout! {
    /// An entry of the `LocalVariableTable` attribute.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LocalVariable {
        /// The first instruction where the variable has a value.
        pub start_pc: u16,
        /// The length of the range where the variable has a value.
        pub length: u16,
        /// The name of the variable.
        pub name: Utf8ConstantHandle,
        /// The field descriptor of the variable.
        pub descriptor: Utf8ConstantHandle,
        /// The index of the variable in the local variable array.
        pub index: u16,
    }
}

layout! {
    /// The `LocalVariableTypeTable` attribute.
    #[doc = see_jvm_spec!(4, 7, 14)]
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
    pub struct LocalVariableTypeTableAttribute {
        /// The local variables with a generic type.
        pub variables: Vec<LocalVariableType>,
    }
}

layout! {
    /// An entry of the `LocalVariableTypeTable` attribute.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct LocalVariableType {
        /// The first instruction where the variable has a value.
        pub start_pc: u16,
        /// The length of the range where the variable has a value.
        pub length: u16,
        /// The name of the variable.
        pub name: Utf8ConstantHandle,
        /// The field signature of the variable.
        pub signature: Utf8ConstantHandle,
        /// The index of the variable in the local variable array.
        pub index: u16,
    }
}

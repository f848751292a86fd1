//! Errors raised while decoding, accessing and encoding class file structures.

use std::{io, num::TryFromIntError};

use crate::handle::ConstantKind;

/// The reader ran out of bytes.
///
/// This is the only error an incremental reader may recover from by waiting for more data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Unexpected end of data at offset {position}, {needed} more bytes are required")]
pub struct Incomplete {
    /// The offset at which the read was attempted.
    pub position: usize,
    /// The number of bytes that were missing.
    pub needed: usize,
}

/// An error that occurs when decoding a class file or one of its structures.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The data ended before the structure was complete.
    #[error("Incomplete class data: {0}")]
    Incomplete(#[from] Incomplete),
    /// The data does not start with the class file magic number.
    #[error("The data is not a Java class file (magic {0:#010x})")]
    NotAClassFile(u32),
    /// The class file is newer than what this decoder understands.
    #[error("Unsupported class file version {major}.{minor}")]
    UnsupportedVersion {
        /// The major version of the class file.
        major: u16,
        /// The minor version of the class file.
        minor: u16,
    },
    /// The constant pool contains an entry with an unknown tag.
    #[error("Unknown constant pool tag {0}")]
    UnknownConstantTag(u8),
    /// An annotation element value has an unknown tag.
    #[error("Invalid element value tag {0:#04x}")]
    InvalidElementValueTag(u8),
    /// A type annotation has an unknown target type.
    #[error("Invalid type annotation target type {0:#04x}")]
    InvalidTargetType(u8),
    /// A type path component has an unknown kind.
    #[error("Invalid type path kind {0}")]
    InvalidTypePathKind(u8),
    /// A type path component other than a type argument step carries a type argument index.
    #[error("Type path kind {kind} cannot have type argument index {index}")]
    InvalidTypeArgumentIndex {
        /// The kind of the type path component.
        kind: u8,
        /// The nonzero type argument index.
        index: u8,
    },
    /// Annotations or arrays in an element value are nested deeper than the decoder allows.
    #[error("Element values are nested deeper than {0} levels")]
    NestingTooDeep(usize),
    /// A stack map frame type falls into the reserved range.
    #[error("Invalid stack map frame type {0}")]
    InvalidStackMapFrameType(u8),
    /// A verification type info has an unknown tag.
    #[error("Invalid verification type info tag {0}")]
    InvalidVerificationTypeTag(u8),
    /// A method handle constant has an unknown reference kind.
    #[error("Invalid method handle reference kind {0}")]
    InvalidReferenceKind(u8),
    /// A `CONSTANT_Utf8` entry is not valid modified UTF-8.
    #[error("Invalid modified UTF-8 string")]
    InvalidUtf8,
    /// A structure did not consume all the bytes it was given.
    #[error("Unexpected data after the end of the structure")]
    UnexpectedData,
    /// The stream ended before a whole class file was read.
    #[error("The stream ended before a valid class file was read")]
    UnexpectedEndOfStream,
    /// An error from the underlying source of bytes.
    #[error("Failed to read from the source: {0}")]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Returns `true` if the error was caused by running out of data rather than by malformed data.
    #[must_use]
    pub const fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete(_))
    }
}

/// An error that occurs when reading a typed value from the constant pool.
#[derive(Debug, thiserror::Error)]
pub enum ConstantError {
    /// The index does not point to an entry.
    #[error("No constant at index {0}")]
    BadIndex(u16),
    /// The entry is of a different kind than requested.
    #[error("Mismatched constant pool entry, expected {expected}, but found {found}")]
    Mismatch {
        /// The requested kind.
        expected: &'static str,
        /// The kind of the entry.
        found: ConstantKind,
    },
    /// The bytes of the entry are malformed.
    #[error("Malformed constant: {0}")]
    Decode(#[from] DecodeError),
}

/// An error that occurs when a tagged value is cast to a concrete shape.
#[derive(Debug, thiserror::Error)]
pub enum CastError {
    /// The tag of the value is not compatible with the requested shape.
    #[error("Cannot cast {from} to {to}")]
    InvalidCast {
        /// The tag of the value.
        from: String,
        /// The requested shape.
        to: &'static str,
    },
    /// The tag could not be resolved against the constant pool.
    #[error(transparent)]
    Constant(#[from] ConstantError),
    /// The stored bytes do not decode as the requested shape.
    #[error("Corrupted data: {0}")]
    Decode(#[from] DecodeError),
}

impl CastError {
    pub(crate) fn invalid(from: impl std::fmt::Display, to: &'static str) -> Self {
        Self::InvalidCast {
            from: from.to_string(),
            to,
        }
    }
}

/// An error that occurs when encoding a class file structure.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// An error from the underlying writer.
    #[error("Failed to write: {0}")]
    Io(#[from] io::Error),
    /// A table is too long for its length field.
    #[error("Table length out of range: {0}")]
    Overflow(#[from] TryFromIntError),
    /// A constant could not be imported into the target pool.
    #[error("Failed to import constant: {0}")]
    Constant(#[from] ConstantError),
    /// The operation is not supported.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl EncodeError {
    /// Converts the failure to re-read a tagged union while encoding it structurally.
    pub(crate) fn from_cast(err: CastError, what: &'static str) -> Self {
        match err {
            CastError::Decode(err) => ConstantError::Decode(err).into(),
            CastError::Constant(err) => err.into(),
            CastError::InvalidCast { .. } => Self::Unsupported(what),
        }
    }
}

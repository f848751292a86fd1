//! Frames of the `StackMapTable` attribute.

use std::io::Write;

use bytes::Bytes;

use crate::{
    constant_pool::ClassConstantHandle,
    encoding::{ConstantImport, Encode, encode_table},
    errors::{CastError, DecodeError, EncodeError},
    intrinsics::see_jvm_spec,
    reader::{ClassReader, Decode, capture, decode_table, measure_by_decode, measure_table},
};

/// The type of a local variable or an operand stack entry.
#[doc = see_jvm_spec!(4, 7, 4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum VerificationTypeInfo {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    /// An instance of the given class.
    Object(ClassConstantHandle),
    /// An object created by the `new` instruction at the given offset, not yet initialized.
    Uninitialized {
        offset: u16,
    },
}

impl VerificationTypeInfo {
    /// The tag of this type.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Top => 0,
            Self::Integer => 1,
            Self::Float => 2,
            Self::Double => 3,
            Self::Long => 4,
            Self::Null => 5,
            Self::UninitializedThis => 6,
            Self::Object(_) => 7,
            Self::Uninitialized { .. } => 8,
        }
    }
}

impl Decode for VerificationTypeInfo {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        measure_by_decode::<Self>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let tag: u8 = reader.read_value()?;
        match tag {
            0 => Ok(Self::Top),
            1 => Ok(Self::Integer),
            2 => Ok(Self::Float),
            3 => Ok(Self::Double),
            4 => Ok(Self::Long),
            5 => Ok(Self::Null),
            6 => Ok(Self::UninitializedThis),
            7 => Ok(Self::Object(Decode::decode(reader)?)),
            8 => Ok(Self::Uninitialized {
                offset: reader.read_value()?,
            }),
            unknown => Err(DecodeError::InvalidVerificationTypeTag(unknown)),
        }
    }
}

impl Encode for VerificationTypeInfo {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.tag().encode(writer, import)?;
        match self {
            Self::Object(class) => class.encode(writer, import),
            Self::Uninitialized { offset } => offset.encode(writer, import),
            _ => Ok(()),
        }
    }
}

/// The layout of a stack map frame, selected by a range of frame types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum StackMapFrameKind {
    /// Frame types `0` to `63`.
    #[display("same_frame")]
    Same,
    /// Frame types `64` to `127`.
    #[display("same_locals_1_stack_item_frame")]
    SameLocals1StackItem,
    /// Frame type `247`.
    #[display("same_locals_1_stack_item_frame_extended")]
    SameLocals1StackItemExtended,
    /// Frame types `248` to `250`.
    #[display("chop_frame")]
    Chop,
    /// Frame type `251`.
    #[display("same_frame_extended")]
    SameExtended,
    /// Frame types `252` to `254`.
    #[display("append_frame")]
    Append,
    /// Frame type `255`.
    #[display("full_frame")]
    Full,
}

impl StackMapFrameKind {
    /// Gets the layout of the given frame type.
    ///
    /// # Errors
    /// Returns [`DecodeError::InvalidStackMapFrameType`] for the reserved frame types `128` to `246`.
    pub const fn of(frame_type: u8) -> Result<Self, DecodeError> {
        match frame_type {
            0..=63 => Ok(Self::Same),
            64..=127 => Ok(Self::SameLocals1StackItem),
            128..=246 => Err(DecodeError::InvalidStackMapFrameType(frame_type)),
            247 => Ok(Self::SameLocals1StackItemExtended),
            248..=250 => Ok(Self::Chop),
            251 => Ok(Self::SameExtended),
            252..=254 => Ok(Self::Append),
            255 => Ok(Self::Full),
        }
    }

    fn measure_body(
        self,
        frame_type: u8,
        reader: &mut ClassReader<'_>,
        size: &mut usize,
    ) -> Result<(), DecodeError> {
        match self {
            Self::Same => Ok(()),
            Self::SameLocals1StackItem => VerificationTypeInfo::measure(reader, size),
            Self::SameLocals1StackItemExtended => {
                u16::measure(reader, size)?;
                VerificationTypeInfo::measure(reader, size)
            }
            Self::Chop | Self::SameExtended => u16::measure(reader, size),
            Self::Append => {
                u16::measure(reader, size)?;
                for _ in 251..frame_type {
                    VerificationTypeInfo::measure(reader, size)?;
                }
                Ok(())
            }
            Self::Full => {
                u16::measure(reader, size)?;
                measure_table::<u16, VerificationTypeInfo>(reader, size)?;
                measure_table::<u16, VerificationTypeInfo>(reader, size)
            }
        }
    }
}

/// A frame with the same locals as the previous frame and an empty stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SameFrame {
    /// The bytecode offset delta from the previous frame.
    pub offset_delta: u16,
}

/// A frame with the same locals as the previous frame and one stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SameLocals1StackItemFrame {
    /// The bytecode offset delta from the previous frame.
    pub offset_delta: u16,
    /// The only entry on the operand stack.
    pub stack: VerificationTypeInfo,
}

/// A frame with the last locals of the previous frame removed and an empty stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ChopFrame {
    /// The bytecode offset delta from the previous frame.
    pub offset_delta: u16,
    /// The number of removed locals, from `1` to `3`.
    pub chopped: u8,
}

/// A frame with locals appended to those of the previous frame and an empty stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AppendFrame {
    /// The bytecode offset delta from the previous frame.
    pub offset_delta: u16,
    /// The appended locals, from `1` to `3` of them.
    pub locals: Vec<VerificationTypeInfo>,
}

/// A frame listing all locals and stack entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FullFrame {
    /// The bytecode offset delta from the previous frame.
    pub offset_delta: u16,
    /// The local variables.
    pub locals: Vec<VerificationTypeInfo>,
    /// The operand stack entries.
    pub stack: Vec<VerificationTypeInfo>,
}

/// A fully decoded stack map frame.
#[doc = see_jvm_spec!(4, 7, 4)]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ParsedStackMapFrame {
    Same(SameFrame),
    SameLocals1StackItem(SameLocals1StackItemFrame),
    SameLocals1StackItemExtended(SameLocals1StackItemFrame),
    Chop(ChopFrame),
    SameExtended(SameFrame),
    Append(AppendFrame),
    Full(FullFrame),
}

impl ParsedStackMapFrame {
    /// The layout of the frame.
    #[must_use]
    pub const fn kind(&self) -> StackMapFrameKind {
        match self {
            Self::Same(_) => StackMapFrameKind::Same,
            Self::SameLocals1StackItem(_) => StackMapFrameKind::SameLocals1StackItem,
            Self::SameLocals1StackItemExtended(_) => {
                StackMapFrameKind::SameLocals1StackItemExtended
            }
            Self::Chop(_) => StackMapFrameKind::Chop,
            Self::SameExtended(_) => StackMapFrameKind::SameExtended,
            Self::Append(_) => StackMapFrameKind::Append,
            Self::Full(_) => StackMapFrameKind::Full,
        }
    }

    fn decode_body(frame_type: u8, reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let frame = match StackMapFrameKind::of(frame_type)? {
            StackMapFrameKind::Same => Self::Same(SameFrame {
                offset_delta: frame_type.into(),
            }),
            StackMapFrameKind::SameLocals1StackItem => {
                Self::SameLocals1StackItem(SameLocals1StackItemFrame {
                    offset_delta: u16::from(frame_type - 64),
                    stack: Decode::decode(reader)?,
                })
            }
            StackMapFrameKind::SameLocals1StackItemExtended => {
                Self::SameLocals1StackItemExtended(SameLocals1StackItemFrame {
                    offset_delta: reader.read_value()?,
                    stack: Decode::decode(reader)?,
                })
            }
            StackMapFrameKind::Chop => Self::Chop(ChopFrame {
                offset_delta: reader.read_value()?,
                chopped: 251 - frame_type,
            }),
            StackMapFrameKind::SameExtended => Self::SameExtended(SameFrame {
                offset_delta: reader.read_value()?,
            }),
            StackMapFrameKind::Append => {
                let offset_delta = reader.read_value()?;
                let locals = (251..frame_type)
                    .map(|_| VerificationTypeInfo::decode(reader))
                    .collect::<Result<_, _>>()?;
                Self::Append(AppendFrame {
                    offset_delta,
                    locals,
                })
            }
            StackMapFrameKind::Full => Self::Full(FullFrame {
                offset_delta: reader.read_value()?,
                locals: decode_table::<u16, _>(reader)?,
                stack: decode_table::<u16, _>(reader)?,
            }),
        };
        Ok(frame)
    }

    /// The frame type byte that encodes this frame.
    ///
    /// # Errors
    /// Returns [`EncodeError::Unsupported`] if the frame cannot be expressed with its layout.
    pub fn frame_type(&self) -> Result<u8, EncodeError> {
        let frame_type = match self {
            Self::Same(SameFrame { offset_delta }) => u8::try_from(*offset_delta)
                .ok()
                .filter(|it| *it <= 63),
            Self::SameLocals1StackItem(frame) => u8::try_from(frame.offset_delta)
                .ok()
                .filter(|it| *it <= 63)
                .map(|it| it + 64),
            Self::SameLocals1StackItemExtended(_) => Some(247),
            Self::Chop(ChopFrame { chopped, .. }) => {
                (1..=3).contains(chopped).then(|| 251 - chopped)
            }
            Self::SameExtended(_) => Some(251),
            Self::Append(AppendFrame { locals, .. }) => {
                (1..=3).contains(&locals.len()).then(|| {
                    #[allow(
                        clippy::cast_possible_truncation,
                        reason = "The length is at most 3."
                    )]
                    let count = locals.len() as u8;
                    251 + count
                })
            }
            Self::Full(_) => Some(255),
        };
        frame_type.ok_or(EncodeError::Unsupported(
            "a stack map frame whose contents do not fit its frame type",
        ))
    }
}

impl Decode for ParsedStackMapFrame {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        StackMapFrame::measure(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let frame_type: u8 = reader.read_value()?;
        Self::decode_body(frame_type, reader)
    }
}

impl Encode for ParsedStackMapFrame {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        self.frame_type()?.encode(writer, import)?;
        match self {
            Self::Same(_) => Ok(()),
            Self::SameLocals1StackItem(frame) => frame.stack.encode(writer, import),
            Self::SameLocals1StackItemExtended(frame) => {
                frame.offset_delta.encode(writer, import)?;
                frame.stack.encode(writer, import)
            }
            Self::Chop(ChopFrame { offset_delta, .. })
            | Self::SameExtended(SameFrame { offset_delta }) => offset_delta.encode(writer, import),
            Self::Append(frame) => {
                frame.offset_delta.encode(writer, import)?;
                frame
                    .locals
                    .iter()
                    .try_for_each(|it| it.encode(writer, import))
            }
            Self::Full(frame) => {
                frame.offset_delta.encode(writer, import)?;
                encode_table::<u16, _, _, _>(&frame.locals, writer, import)?;
                encode_table::<u16, _, _, _>(&frame.stack, writer, import)
            }
        }
    }
}

/// An entry of the `StackMapTable` attribute.
///
/// The frame type is decoded eagerly. The rest of the frame is kept undecoded. The default value is
/// nil and has no frame type.
#[doc = see_jvm_spec!(4, 7, 4)]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackMapFrame {
    frame_type: Option<u8>,
    data: Bytes,
}

impl StackMapFrame {
    /// The frame type byte, or [`None`] if the frame is nil.
    #[must_use]
    pub const fn frame_type(&self) -> Option<u8> {
        self.frame_type
    }

    /// The layout of the frame, or [`None`] if the frame is nil.
    #[must_use]
    pub fn kind(&self) -> Option<StackMapFrameKind> {
        self.frame_type
            .and_then(|it| StackMapFrameKind::of(it).ok())
    }

    /// The undecoded bytes following the frame type.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns `true` if this is the nil value.
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        self.frame_type.is_none()
    }

    /// Decodes the frame.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame is nil or its bytes are corrupted.
    pub fn parse(&self) -> Result<ParsedStackMapFrame, CastError> {
        let frame_type = self
            .frame_type
            .ok_or_else(|| CastError::invalid("nil", "stack map frame"))?;
        let mut reader = ClassReader::new(&self.data);
        let frame = ParsedStackMapFrame::decode_body(frame_type, &mut reader)?;
        if reader.remaining() == 0 {
            Ok(frame)
        } else {
            Err(DecodeError::UnexpectedData.into())
        }
    }

    fn expect(&self, expected: StackMapFrameKind) -> Result<ParsedStackMapFrame, CastError> {
        match self.kind() {
            Some(kind) if kind == expected => self.parse(),
            Some(kind) => Err(CastError::invalid(kind, expected_name(expected))),
            None => Err(CastError::invalid("nil", expected_name(expected))),
        }
    }

    /// Casts to a `same_frame`.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame has a different layout.
    pub fn as_same(&self) -> Result<SameFrame, CastError> {
        match self.expect(StackMapFrameKind::Same)? {
            ParsedStackMapFrame::Same(frame) => Ok(frame),
            other => Err(CastError::invalid(other.kind(), "same_frame")),
        }
    }

    /// Casts to a `same_locals_1_stack_item_frame`.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame has a different layout.
    pub fn as_same_locals_1_stack_item(&self) -> Result<SameLocals1StackItemFrame, CastError> {
        match self.expect(StackMapFrameKind::SameLocals1StackItem)? {
            ParsedStackMapFrame::SameLocals1StackItem(frame) => Ok(frame),
            other => Err(CastError::invalid(
                other.kind(),
                "same_locals_1_stack_item_frame",
            )),
        }
    }

    /// Casts to a `same_locals_1_stack_item_frame_extended`.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame has a different layout.
    pub fn as_same_locals_1_stack_item_extended(
        &self,
    ) -> Result<SameLocals1StackItemFrame, CastError> {
        match self.expect(StackMapFrameKind::SameLocals1StackItemExtended)? {
            ParsedStackMapFrame::SameLocals1StackItemExtended(frame) => Ok(frame),
            other => Err(CastError::invalid(
                other.kind(),
                "same_locals_1_stack_item_frame_extended",
            )),
        }
    }

    /// Casts to a `chop_frame`.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame has a different layout.
    pub fn as_chop(&self) -> Result<ChopFrame, CastError> {
        match self.expect(StackMapFrameKind::Chop)? {
            ParsedStackMapFrame::Chop(frame) => Ok(frame),
            other => Err(CastError::invalid(other.kind(), "chop_frame")),
        }
    }

    /// Casts to a `same_frame_extended`.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame has a different layout.
    pub fn as_same_extended(&self) -> Result<SameFrame, CastError> {
        match self.expect(StackMapFrameKind::SameExtended)? {
            ParsedStackMapFrame::SameExtended(frame) => Ok(frame),
            other => Err(CastError::invalid(other.kind(), "same_frame_extended")),
        }
    }

    /// Casts to an `append_frame`.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame has a different layout.
    pub fn as_append(&self) -> Result<AppendFrame, CastError> {
        match self.expect(StackMapFrameKind::Append)? {
            ParsedStackMapFrame::Append(frame) => Ok(frame),
            other => Err(CastError::invalid(other.kind(), "append_frame")),
        }
    }

    /// Casts to a `full_frame`.
    ///
    /// # Errors
    /// Returns [`CastError`] if the frame has a different layout.
    pub fn as_full(&self) -> Result<FullFrame, CastError> {
        match self.expect(StackMapFrameKind::Full)? {
            ParsedStackMapFrame::Full(frame) => Ok(frame),
            other => Err(CastError::invalid(other.kind(), "full_frame")),
        }
    }
}

const fn expected_name(kind: StackMapFrameKind) -> &'static str {
    match kind {
        StackMapFrameKind::Same => "same_frame",
        StackMapFrameKind::SameLocals1StackItem => "same_locals_1_stack_item_frame",
        StackMapFrameKind::SameLocals1StackItemExtended => {
            "same_locals_1_stack_item_frame_extended"
        }
        StackMapFrameKind::Chop => "chop_frame",
        StackMapFrameKind::SameExtended => "same_frame_extended",
        StackMapFrameKind::Append => "append_frame",
        StackMapFrameKind::Full => "full_frame",
    }
}

impl Decode for StackMapFrame {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        let frame_type: u8 = reader.read_value()?;
        *size += 1;
        StackMapFrameKind::of(frame_type)?.measure_body(frame_type, reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        let frame_type: u8 = reader.read_value()?;
        let kind = StackMapFrameKind::of(frame_type)?;
        let data = capture(reader, |reader, size| {
            kind.measure_body(frame_type, reader, size)
        })?;
        Ok(Self {
            frame_type: Some(frame_type),
            data,
        })
    }
}

impl Encode for StackMapFrame {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        let Some(frame_type) = self.frame_type else {
            return Err(EncodeError::Unsupported("encoding a nil stack map frame"));
        };
        if import.preserves_handles() {
            frame_type.encode(writer, import)?;
            writer.write_all(&self.data)?;
            return Ok(());
        }
        let frame = self
            .parse()
            .map_err(|err| EncodeError::from_cast(err, "encoding a malformed stack map frame"))?;
        frame.encode(writer, import)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        encoding::KeepHandles,
        handle::{ConstantHandle, ConstantKind, Handle},
        reader::decode_exact,
    };

    fn frame(bytes: &[u8]) -> Result<StackMapFrame, DecodeError> {
        decode_exact(&Bytes::copy_from_slice(bytes))
    }

    #[test]
    fn same_frame_upper_bound() {
        let frame = frame(&[63]).unwrap();
        assert_eq!(frame.kind(), Some(StackMapFrameKind::Same));
        assert!(frame.data().is_empty());
        assert_eq!(frame.as_same().unwrap().offset_delta, 63);
        assert!(frame.as_full().is_err());
    }

    #[test]
    fn same_locals_1_stack_item_lower_bound() {
        let frame = frame(&[64, 1]).unwrap();
        let same_locals = frame.as_same_locals_1_stack_item().unwrap();
        assert_eq!(same_locals.offset_delta, 0);
        assert_eq!(same_locals.stack, VerificationTypeInfo::Integer);
        assert!(self::frame(&[64]).unwrap_err().is_incomplete());
    }

    #[test]
    fn same_locals_1_stack_item_extended() {
        let frame = frame(&[247, 0x01, 0x00, 7, 0x00, 0x05]).unwrap();
        let extended = frame.as_same_locals_1_stack_item_extended().unwrap();
        assert_eq!(extended.offset_delta, 256);
        assert_eq!(
            extended.stack,
            VerificationTypeInfo::Object(Handle::new(5))
        );
        assert!(self::frame(&[247, 0x01, 0x00]).unwrap_err().is_incomplete());
    }

    #[test]
    fn same_frame_extended() {
        let frame = frame(&[251, 0x00, 0x40]).unwrap();
        assert_eq!(frame.as_same_extended().unwrap().offset_delta, 64);
        assert!(frame.as_same().is_err());
    }

    #[test]
    fn chop_and_append() {
        let chop = frame(&[248, 0x00, 0x02]).unwrap();
        assert_eq!(
            chop.as_chop().unwrap(),
            ChopFrame {
                offset_delta: 2,
                chopped: 3
            }
        );
        let append = frame(&[253, 0x00, 0x02, 1, 8, 0x00, 0x10]).unwrap();
        assert_eq!(
            append.as_append().unwrap().locals,
            vec![
                VerificationTypeInfo::Integer,
                VerificationTypeInfo::Uninitialized { offset: 0x10 }
            ]
        );
    }

    #[test]
    fn full_frame() {
        let bytes = [255, 0x00, 0x03, 0x00, 0x02, 4, 0, 0x00, 0x01, 6];
        let frame = frame(&bytes).unwrap();
        let full = frame.as_full().unwrap();
        assert_eq!(full.offset_delta, 3);
        assert_eq!(
            full.locals,
            vec![VerificationTypeInfo::Long, VerificationTypeInfo::Top]
        );
        assert_eq!(full.stack, vec![VerificationTypeInfo::UninitializedThis]);
        assert_eq!(frame.to_bytes(&mut KeepHandles).unwrap(), bytes);
    }

    #[test]
    fn reserved_frame_types() {
        for frame_type in [128, 200, 246] {
            let err = frame(&[frame_type]).unwrap_err();
            assert!(matches!(err, DecodeError::InvalidStackMapFrameType(it) if it == frame_type));
        }
    }

    #[test]
    fn invalid_verification_type() {
        let err = frame(&[64, 9]).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidVerificationTypeTag(9)));
    }

    #[test]
    fn nil_frame() {
        let frame = StackMapFrame::default();
        assert!(frame.is_nil());
        assert!(frame.data().is_empty());
        assert!(frame.kind().is_none());
        assert!(frame.parse().is_err());
    }

    #[test]
    fn reindexing_object_types() {
        let frame = frame(&[64, 7, 0x00, 0x05]).unwrap();
        let mut shift = |it: ConstantHandle| -> Result<_, EncodeError> {
            assert_eq!(it.kind(), ConstantKind::Class);
            Ok(ConstantHandle::new(it.kind(), it.index() + 1))
        };
        assert_eq!(frame.to_bytes(&mut shift).unwrap(), [64, 7, 0x00, 0x06]);
    }

    fn arb_verification_type() -> impl Strategy<Value = VerificationTypeInfo> {
        prop_oneof![
            Just(VerificationTypeInfo::Top),
            Just(VerificationTypeInfo::Integer),
            Just(VerificationTypeInfo::Float),
            Just(VerificationTypeInfo::Double),
            Just(VerificationTypeInfo::Long),
            Just(VerificationTypeInfo::Null),
            Just(VerificationTypeInfo::UninitializedThis),
            any::<u16>().prop_map(|it| VerificationTypeInfo::Object(Handle::new(it))),
            any::<u16>().prop_map(|offset| VerificationTypeInfo::Uninitialized { offset }),
        ]
    }

    fn arb_frame() -> impl Strategy<Value = ParsedStackMapFrame> {
        let types = || prop::collection::vec(arb_verification_type(), 0..4);
        prop_oneof![
            (0u16..=63).prop_map(|offset_delta| ParsedStackMapFrame::Same(SameFrame { offset_delta })),
            (0u16..=63, arb_verification_type()).prop_map(|(offset_delta, stack)| {
                ParsedStackMapFrame::SameLocals1StackItem(SameLocals1StackItemFrame {
                    offset_delta,
                    stack,
                })
            }),
            (any::<u16>(), arb_verification_type()).prop_map(|(offset_delta, stack)| {
                ParsedStackMapFrame::SameLocals1StackItemExtended(SameLocals1StackItemFrame {
                    offset_delta,
                    stack,
                })
            }),
            (any::<u16>(), 1u8..=3).prop_map(|(offset_delta, chopped)| {
                ParsedStackMapFrame::Chop(ChopFrame {
                    offset_delta,
                    chopped,
                })
            }),
            any::<u16>().prop_map(|offset_delta| {
                ParsedStackMapFrame::SameExtended(SameFrame { offset_delta })
            }),
            (any::<u16>(), prop::collection::vec(arb_verification_type(), 1..=3)).prop_map(
                |(offset_delta, locals)| {
                    ParsedStackMapFrame::Append(AppendFrame {
                        offset_delta,
                        locals,
                    })
                }
            ),
            (any::<u16>(), types(), types()).prop_map(|(offset_delta, locals, stack)| {
                ParsedStackMapFrame::Full(FullFrame {
                    offset_delta,
                    locals,
                    stack,
                })
            }),
        ]
    }

    proptest! {
        #[test]
        fn frame_round_trip(parsed in arb_frame()) {
            let bytes = parsed.to_bytes(&mut KeepHandles).unwrap();
            let frame = frame(&bytes).unwrap();
            prop_assert_eq!(frame.kind(), Some(parsed.kind()));
            prop_assert_eq!(frame.parse().unwrap(), parsed.clone());
            let mut structural = |it: ConstantHandle| -> Result<_, EncodeError> { Ok(it) };
            prop_assert_eq!(frame.to_bytes(&mut structural).unwrap(), bytes);
        }

        #[test]
        fn measure_matches_decode(parsed in arb_frame(), cut in any::<prop::sample::Index>()) {
            let bytes = parsed.to_bytes(&mut KeepHandles).unwrap();
            let len = cut.index(bytes.len() + 1);
            let input = Bytes::copy_from_slice(&bytes[..len]);

            let mut measuring = ClassReader::new(&input);
            let mut size = 0;
            let measured = StackMapFrame::measure(&mut measuring, &mut size);
            let mut decoding = ClassReader::new(&input);
            let decoded = StackMapFrame::decode(&mut decoding);

            prop_assert_eq!(measured.is_ok(), decoded.is_ok());
            prop_assert_eq!(measured.is_ok(), len == bytes.len());
            if measured.is_ok() {
                prop_assert_eq!(size, len);
                prop_assert_eq!(decoding.position(), len);
            }
        }
    }
}

//! A cursor over the bytes of a class file.
//!
//! Every structure in this crate is decoded by a pair of functions defined by [`Decode`]:
//! [`Decode::measure`] walks over the encoded bytes and only counts them, [`Decode::decode`]
//! walks over the same bytes and materializes the value. Tagged values use the measured length
//! to rewind and capture their payload as one slice of the input.

use bytes::{Bytes, BytesMut};

use crate::errors::{DecodeError, Incomplete};

/// A position-tracking view over one or more segments of bytes.
///
/// Multi-byte values are read in big-endian order. A failed read never moves the cursor.
#[derive(Debug, Clone)]
pub struct ClassReader<'a> {
    segments: &'a [Bytes],
    segment: usize,
    offset: usize,
    position: usize,
    length: usize,
}

impl<'a> ClassReader<'a> {
    /// Creates a reader over a single buffer.
    #[must_use]
    pub fn new(bytes: &'a Bytes) -> Self {
        Self::from_segments(std::slice::from_ref(bytes))
    }

    /// Creates a reader over a sequence of buffers that are read one after another.
    #[must_use]
    pub fn from_segments(segments: &'a [Bytes]) -> Self {
        let length = segments.iter().map(Bytes::len).sum();
        let mut reader = Self {
            segments,
            segment: 0,
            offset: 0,
            position: 0,
            length,
        };
        reader.skip_exhausted_segments();
        reader
    }

    /// The number of bytes read so far.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// The total number of bytes, counted from the start of the input.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the input contains no bytes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The number of bytes left after the current position.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.length - self.position
    }

    /// Reads a value and advances past it.
    ///
    /// # Errors
    /// Returns [`Incomplete`] if not enough bytes remain. The position is left unchanged.
    pub fn read_value<T: Readable>(&mut self) -> Result<T, Incomplete> {
        T::read_from(self)
    }

    /// Reads `N` bytes into an array and advances past them.
    ///
    /// # Errors
    /// Returns [`Incomplete`] if fewer than `N` bytes remain. The position is left unchanged.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], Incomplete> {
        self.ensure(N)?;
        let mut buf = [0u8; N];
        self.copy_into(&mut buf);
        Ok(buf)
    }

    /// Skips `len` bytes.
    ///
    /// # Errors
    /// Returns [`Incomplete`] if fewer than `len` bytes remain. The position is left unchanged.
    pub fn advance(&mut self, len: usize) -> Result<(), Incomplete> {
        self.ensure(len)?;
        self.step(len);
        Ok(())
    }

    /// Returns the next `len` bytes and advances past them.
    ///
    /// The result shares memory with the input when the bytes lie within a single segment.
    /// Bytes spanning a segment boundary are gathered into a new buffer.
    ///
    /// # Errors
    /// Returns [`Incomplete`] if fewer than `len` bytes remain. The position is left unchanged.
    pub fn read_many(&mut self, len: usize) -> Result<Bytes, Incomplete> {
        self.ensure(len)?;
        if len == 0 {
            return Ok(Bytes::new());
        }
        let segment = &self.segments[self.segment];
        if segment.len() - self.offset >= len {
            let slice = segment.slice(self.offset..self.offset + len);
            self.step(len);
            Ok(slice)
        } else {
            let mut gathered = BytesMut::zeroed(len);
            self.copy_into(&mut gathered);
            Ok(gathered.freeze())
        }
    }

    /// Moves the cursor back by `len` bytes.
    ///
    /// Only used to re-read a region whose length was just measured. Walks back over the
    /// segments in between, so the cost grows with `len` rather than with the position.
    pub fn rewind(&mut self, len: usize) {
        debug_assert!(len <= self.position, "rewinding past the start of the input");
        let mut len = len.min(self.position);
        self.position -= len;
        while len > self.offset {
            len -= self.offset;
            self.segment -= 1;
            self.offset = self.segments[self.segment].len();
        }
        self.offset -= len;
    }

    fn ensure(&self, len: usize) -> Result<(), Incomplete> {
        let remaining = self.remaining();
        if remaining < len {
            Err(Incomplete {
                position: self.position,
                needed: len - remaining,
            })
        } else {
            Ok(())
        }
    }

    fn skip_exhausted_segments(&mut self) {
        while self
            .segments
            .get(self.segment)
            .is_some_and(|it| it.len() == self.offset)
        {
            self.segment += 1;
            self.offset = 0;
        }
    }

    fn step(&mut self, mut len: usize) {
        self.position += len;
        while len > 0 {
            let available = self.segments[self.segment].len() - self.offset;
            let taken = len.min(available);
            self.offset += taken;
            len -= taken;
            self.skip_exhausted_segments();
        }
    }

    fn copy_into(&mut self, buf: &mut [u8]) {
        let mut filled = 0;
        while filled < buf.len() {
            let available = &self.segments[self.segment][self.offset..];
            let taken = available.len().min(buf.len() - filled);
            buf[filled..filled + taken].copy_from_slice(&available[..taken]);
            filled += taken;
            self.offset += taken;
            self.position += taken;
            self.skip_exhausted_segments();
        }
    }
}

/// A fixed-size value that can be read from a [`ClassReader`].
pub trait Readable: Sized {
    /// Reads the value and advances the reader past it.
    ///
    /// # Errors
    /// Returns [`Incomplete`] if not enough bytes remain.
    fn read_from(reader: &mut ClassReader<'_>) -> Result<Self, Incomplete>;
}

impl<const N: usize> Readable for [u8; N] {
    fn read_from(reader: &mut ClassReader<'_>) -> Result<Self, Incomplete> {
        reader.read_bytes()
    }
}

macro_rules! impl_readable_for {
    ($($t:ty),*) => {
        $(
            impl Readable for $t {
                fn read_from(reader: &mut ClassReader<'_>) -> Result<Self, Incomplete> {
                    let buf = reader.read_value()?;
                    Ok(Self::from_be_bytes(buf))
                }
            }

            impl Decode for $t {
                fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
                    reader.advance(size_of::<$t>())?;
                    *size += size_of::<$t>();
                    Ok(())
                }

                fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
                    Ok(reader.read_value()?)
                }
            }
        )*
    };
}

impl_readable_for!(u8, u16, u32, i8, i16, i32, i64, f32, f64);

/// A structure with a variable or fixed length encoding.
pub trait Decode: Sized {
    /// Walks over one encoded value without materializing it and adds its length to `size`.
    ///
    /// The walk must consume exactly the bytes [`Decode::decode`] consumes.
    ///
    /// # Errors
    /// Fails at the same point [`Decode::decode`] would fail on the same input.
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError>;

    /// Decodes one value and advances the reader past it.
    ///
    /// # Errors
    /// See [`DecodeError`].
    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError>;
}

/// Runs `measure` over the upcoming bytes, then rewinds and returns the measured bytes as one slice.
pub(crate) fn capture<F>(reader: &mut ClassReader<'_>, measure: F) -> Result<Bytes, DecodeError>
where
    F: FnOnce(&mut ClassReader<'_>, &mut usize) -> Result<(), DecodeError>,
{
    let mut size = 0;
    measure(reader, &mut size)?;
    reader.rewind(size);
    Ok(reader.read_many(size)?)
}

/// Measures the next value of type `T`, then rewinds and returns its bytes as one slice.
pub(crate) fn read_measured<T: Decode>(reader: &mut ClassReader<'_>) -> Result<Bytes, DecodeError> {
    capture(reader, T::measure)
}

/// Measures a small structure by decoding it.
pub(crate) fn measure_by_decode<T: Decode>(
    reader: &mut ClassReader<'_>,
    size: &mut usize,
) -> Result<(), DecodeError> {
    let start = reader.position();
    T::decode(reader)?;
    *size += reader.position() - start;
    Ok(())
}

/// Decodes a value that must span `data` exactly.
pub(crate) fn decode_exact<T: Decode>(data: &Bytes) -> Result<T, DecodeError> {
    let mut reader = ClassReader::new(data);
    let value = T::decode(&mut reader)?;
    if reader.remaining() == 0 {
        Ok(value)
    } else {
        Err(DecodeError::UnexpectedData)
    }
}

/// Measures a table prefixed by a count of type `C`.
pub(crate) fn measure_table<C, T>(
    reader: &mut ClassReader<'_>,
    size: &mut usize,
) -> Result<(), DecodeError>
where
    C: Readable + Into<usize>,
    T: Decode,
{
    let count: C = reader.read_value()?;
    *size += size_of::<C>();
    for _ in 0..count.into() {
        T::measure(reader, size)?;
    }
    Ok(())
}

/// Decodes a table prefixed by a count of type `C`.
pub(crate) fn decode_table<C, T>(reader: &mut ClassReader<'_>) -> Result<Vec<T>, DecodeError>
where
    C: Readable + Into<usize>,
    T: Decode,
{
    let count: C = reader.read_value()?;
    (0..count.into()).map(|_| T::decode(reader)).collect()
}

/// Tables prefixed by a `u16` count, the most common layout in class files.
impl<T: Decode> Decode for Vec<T> {
    fn measure(reader: &mut ClassReader<'_>, size: &mut usize) -> Result<(), DecodeError> {
        measure_table::<u16, T>(reader, size)
    }

    fn decode(reader: &mut ClassReader<'_>) -> Result<Self, DecodeError> {
        decode_table::<u16, T>(reader)
    }
}

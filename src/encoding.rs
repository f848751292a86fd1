//! Writing decoded structures back into their binary form.
//!
//! Every decoded value can be encoded against a (possibly different) constant pool. Handles are
//! passed through a [`ConstantImport`] which maps an entry of the source pool to the equivalent
//! entry of the target pool.

use std::{io::Write, num::TryFromIntError};

use bytes::Bytes;
use num_traits::ToBytes;

use crate::{
    errors::EncodeError,
    handle::{ConstantHandle, ConstantType, Handle},
};

/// Maps constant pool handles of a decoded value to handles of the pool being written.
pub trait ConstantImport {
    /// Returns the handle in the target pool that is equivalent to `handle`.
    ///
    /// # Errors
    /// See [`EncodeError`].
    fn import(&mut self, handle: ConstantHandle) -> Result<ConstantHandle, EncodeError>;

    /// Returns `true` if [`ConstantImport::import`] returns every handle unchanged.
    ///
    /// Raw byte spans can only be copied verbatim when handles are preserved.
    fn preserves_handles(&self) -> bool {
        false
    }
}

impl<F> ConstantImport for F
where
    F: FnMut(ConstantHandle) -> Result<ConstantHandle, EncodeError>,
{
    fn import(&mut self, handle: ConstantHandle) -> Result<ConstantHandle, EncodeError> {
        self(handle)
    }
}

/// The importer used when a value is written next to the constant pool it was read with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeepHandles;

impl ConstantImport for KeepHandles {
    fn import(&mut self, handle: ConstantHandle) -> Result<ConstantHandle, EncodeError> {
        Ok(handle)
    }

    fn preserves_handles(&self) -> bool {
        true
    }
}

/// A structure that can be written in the binary format of a class file.
pub trait Encode {
    /// Writes the structure to `writer`, translating handles with `import`.
    ///
    /// # Errors
    /// See [`EncodeError`].
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized;

    /// Encodes the structure into a new buffer.
    ///
    /// # Errors
    /// See [`EncodeError`].
    fn to_bytes<I>(&self, import: &mut I) -> Result<Vec<u8>, EncodeError>
    where
        I: ConstantImport + ?Sized,
    {
        let mut buf = Vec::new();
        self.encode(&mut buf, import)?;
        Ok(buf)
    }
}

macro_rules! impl_encode_for {
    ($($t:ty),*) => {
        $(
            impl Encode for $t {
                fn encode<W, I>(&self, writer: &mut W, _: &mut I) -> Result<(), EncodeError>
                where
                    W: Write + ?Sized,
                    I: ConstantImport + ?Sized,
                {
                    writer.write_all(&self.to_be_bytes())?;
                    Ok(())
                }
            }
        )*
    };
}

impl_encode_for!(u8, u16, u32, i8, i16, i32, i64, f32, f64);

impl Encode for ConstantHandle {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        let imported = if self.index() == 0 {
            *self
        } else {
            import.import(*self)?
        };
        imported.index().encode(writer, import)
    }
}

impl<T: ConstantType> Encode for Handle<T> {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        import_typed(import, *self)?.index().encode(writer, import)
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode<W, I>(&self, writer: &mut W, import: &mut I) -> Result<(), EncodeError>
    where
        W: Write + ?Sized,
        I: ConstantImport + ?Sized,
    {
        encode_table::<u16, _, _, _>(self, writer, import)
    }
}

/// Translates a typed handle, checking that the importer kept its kind.
pub(crate) fn import_typed<T, I>(import: &mut I, handle: Handle<T>) -> Result<Handle<T>, EncodeError>
where
    T: ConstantType,
    I: ConstantImport + ?Sized,
{
    if handle.is_nil() {
        return Ok(handle);
    }
    let imported = import.import(handle.untyped())?;
    Ok(Handle::try_from(imported)?)
}

pub(crate) fn write_length<Len, W>(writer: &mut W, length: usize) -> Result<(), EncodeError>
where
    W: Write + ?Sized,
    usize: TryInto<Len, Error = TryFromIntError>,
    Len: ToBytes,
{
    let length: Len = length.try_into()?;
    writer.write_all(length.to_be_bytes().as_ref())?;
    Ok(())
}

/// Writes a table prefixed by its length as a `Len`.
pub(crate) fn encode_table<Len, T, W, I>(
    items: &[T],
    writer: &mut W,
    import: &mut I,
) -> Result<(), EncodeError>
where
    T: Encode,
    W: Write + ?Sized,
    I: ConstantImport + ?Sized,
    usize: TryInto<Len, Error = TryFromIntError>,
    Len: ToBytes,
{
    write_length::<Len, _>(writer, items.len())?;
    items.iter().try_for_each(|it| it.encode(writer, import))
}

/// Writes a raw span that may contain constant pool indices.
pub(crate) fn encode_raw<W, I>(data: &Bytes, writer: &mut W, import: &I) -> Result<(), EncodeError>
where
    W: Write + ?Sized,
    I: ConstantImport + ?Sized,
{
    if import.preserves_handles() {
        writer.write_all(data)?;
        Ok(())
    } else {
        Err(EncodeError::Unsupported(
            "re-indexing the constant pool references of an opaque structure",
        ))
    }
}

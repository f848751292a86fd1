//! Decoding class files from sources that deliver bytes in chunks.
//!
//! The decoder is not resumable. Whenever the buffered bytes end inside the class file, the
//! driver asks the source for more and decodes again from the start of the buffer.

use std::{collections::VecDeque, future::Future};

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{
    class_file::{ClassFile, MIN_CLASS_FILE_SIZE, ReadOptions},
    errors::DecodeError,
    reader::ClassReader,
};

/// The bytes a [`ByteSource`] has buffered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadResult {
    /// The buffered bytes that have not been consumed, in order.
    pub segments: Vec<Bytes>,
    /// Whether the source is exhausted, i.e., no bytes will follow [`Self::segments`].
    pub is_completed: bool,
}

impl ReadResult {
    /// The total number of buffered bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.iter().map(Bytes::len).sum()
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.iter().all(Bytes::is_empty)
    }
}

/// A source of bytes that buffers what it has delivered until it is consumed.
pub trait ByteSource {
    /// Waits until at least `min_len` bytes are buffered or the source is exhausted, then returns
    /// everything that is buffered.
    ///
    /// # Errors
    /// Returns [`DecodeError::Io`] if the underlying source fails.
    fn fill(
        &mut self,
        min_len: usize,
    ) -> impl Future<Output = Result<ReadResult, DecodeError>> + Send;

    /// Drops the first `consumed` buffered bytes.
    ///
    /// `examined` is the number of buffered bytes that have been looked at. The next call to
    /// [`ByteSource::fill`] waits for bytes beyond them unless the source is exhausted.
    fn advance(&mut self, consumed: usize, examined: usize);
}

#[derive(Debug, Default)]
struct Buffer {
    segments: VecDeque<Bytes>,
    len: usize,
    examined: usize,
}

impl Buffer {
    fn push(&mut self, chunk: Bytes) {
        if !chunk.is_empty() {
            self.len += chunk.len();
            self.segments.push_back(chunk);
        }
    }

    /// The number of bytes that must be buffered to satisfy a request for `min_len` bytes.
    fn target(&self, min_len: usize) -> usize {
        min_len.max(self.examined + 1)
    }

    fn snapshot(&self, is_completed: bool) -> ReadResult {
        ReadResult {
            segments: self.segments.iter().cloned().collect(),
            is_completed,
        }
    }

    fn consume(&mut self, consumed: usize, examined: usize) {
        let mut left = consumed.min(self.len);
        self.len -= left;
        while left > 0 {
            let Some(front) = self.segments.front_mut() else {
                break;
            };
            if front.len() <= left {
                left -= front.len();
                self.segments.pop_front();
            } else {
                front.advance(left);
                left = 0;
            }
        }
        self.examined = examined.saturating_sub(consumed).min(self.len);
    }
}

/// A source over chunks that are all in memory.
///
/// Every call to [`ByteSource::fill`] delivers as few chunks as possible, which makes it handy for
/// exercising every way a class file can be split.
#[derive(Debug, Default)]
pub struct ChunkedSource {
    pending: VecDeque<Bytes>,
    buffer: Buffer,
}

impl ChunkedSource {
    /// Creates a source that delivers `chunks` one at a time.
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self {
            pending: chunks
                .into_iter()
                .map(Into::into)
                .filter(|it: &Bytes| !it.is_empty())
                .collect(),
            buffer: Buffer::default(),
        }
    }

    /// Returns `true` if every chunk has been delivered and consumed.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.buffer.len == 0
    }

    fn fill_now(&mut self, min_len: usize) -> ReadResult {
        let target = self.buffer.target(min_len);
        while self.buffer.len < target {
            let Some(chunk) = self.pending.pop_front() else {
                break;
            };
            self.buffer.push(chunk);
        }
        self.buffer.snapshot(self.pending.is_empty())
    }
}

impl ByteSource for ChunkedSource {
    fn fill(
        &mut self,
        min_len: usize,
    ) -> impl Future<Output = Result<ReadResult, DecodeError>> + Send {
        std::future::ready(Ok(self.fill_now(min_len)))
    }

    fn advance(&mut self, consumed: usize, examined: usize) {
        self.buffer.consume(consumed, examined);
    }
}

/// A source over a [`tokio::io::AsyncRead`].
#[derive(Debug)]
pub struct AsyncReadSource<R> {
    reader: R,
    buffer: Buffer,
    chunk_size: usize,
    is_completed: bool,
}

impl<R> AsyncReadSource<R> {
    const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

    /// Creates a source reading from `reader`.
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, Self::DEFAULT_CHUNK_SIZE)
    }

    /// Creates a source that asks `reader` for `chunk_size` bytes at a time.
    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buffer: Buffer::default(),
            chunk_size: chunk_size.max(1),
            is_completed: false,
        }
    }

    /// Returns the underlying reader, dropping any bytes that are buffered.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R> ByteSource for AsyncReadSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    // note: not an `async fn`, the future has to be `Send`
    #[allow(clippy::manual_async_fn)]
    fn fill(
        &mut self,
        min_len: usize,
    ) -> impl Future<Output = Result<ReadResult, DecodeError>> + Send {
        async move {
            let target = self.buffer.target(min_len);
            while self.buffer.len < target && !self.is_completed {
                let mut chunk = BytesMut::with_capacity(self.chunk_size);
                if self.reader.read_buf(&mut chunk).await? == 0 {
                    self.is_completed = true;
                } else {
                    self.buffer.push(chunk.freeze());
                }
            }
            Ok(self.buffer.snapshot(self.is_completed))
        }
    }

    fn advance(&mut self, consumed: usize, examined: usize) {
        self.buffer.consume(consumed, examined);
    }
}

/// Decodes the next class file from `source`.
///
/// On success, exactly the bytes of the class file are consumed, so the source may carry on with
/// whatever follows. On failure nothing is consumed.
///
/// # Errors
/// - [`DecodeError::UnexpectedEndOfStream`] if the source is exhausted before a whole class file
///   was buffered.
/// - Any other [`DecodeError`] raised by the decoder or the source.
pub async fn read_class<S>(source: &mut S, options: ReadOptions) -> Result<ClassFile, DecodeError>
where
    S: ByteSource,
{
    let mut min_len = MIN_CLASS_FILE_SIZE;
    loop {
        let ReadResult {
            segments,
            is_completed,
        } = source.fill(min_len).await?;
        let mut reader = ClassReader::from_segments(&segments);
        let buffered = reader.len();
        match ClassFile::try_read(&mut reader, options) {
            Ok(class) => {
                let consumed = reader.position();
                log::trace!("Decoded a class file of {consumed} bytes from {buffered} buffered bytes");
                source.advance(consumed, consumed);
                return Ok(class);
            }
            Err(DecodeError::Incomplete(incomplete)) => {
                source.advance(0, buffered);
                if is_completed {
                    log::trace!("The source ended after {buffered} bytes inside a class file");
                    return Err(DecodeError::UnexpectedEndOfStream);
                }
                log::trace!(
                    "{buffered} buffered bytes are not enough ({incomplete}), waiting for more"
                );
                min_len = buffered + incomplete.needed.max(1);
            }
            Err(err) => {
                source.advance(0, 0);
                return Err(err);
            }
        }
    }
}

impl ClassFile {
    /// Decodes a class file from an asynchronous reader.
    ///
    /// Bytes after the class file are read into the buffer but not decoded.
    ///
    /// # Errors
    /// See [`read_class`].
    pub async fn read_async<R>(reader: R) -> Result<Self, DecodeError>
    where
        R: AsyncRead + Unpin + Send,
    {
        read_class(&mut AsyncReadSource::new(reader), ReadOptions::default()).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use pretty_assertions::assert_eq;
    use tokio::io::ReadBuf;

    use super::*;
    use crate::tests::{ClassBuilder, minimal_class};

    /// Hands out at most one byte per read.
    struct Trickle(Bytes);

    impl AsyncRead for Trickle {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            if !self.0.is_empty() && buf.remaining() > 0 {
                let byte = self.0.split_to(1);
                buf.put_slice(&byte);
            }
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn whole_buffer() {
        let bytes = ClassBuilder::new(61).sample().to_bytes();
        let expected = ClassFile::read(bytes.clone()).unwrap();
        let mut source = ChunkedSource::new([bytes]);
        let class = read_class(&mut source, ReadOptions::default()).await.unwrap();
        assert_eq!(class, expected);
        assert!(source.is_drained());
    }

    #[tokio::test]
    async fn byte_by_byte() {
        let bytes = ClassBuilder::new(61).sample().to_bytes();
        let expected = ClassFile::read(bytes.clone()).unwrap();
        let mut source = ChunkedSource::new(bytes.iter().map(|it| vec![*it]));
        let class = read_class(&mut source, ReadOptions::default()).await.unwrap();
        assert_eq!(class, expected);
        assert!(source.is_drained());

        let class = ClassFile::read_async(Trickle(Bytes::from(bytes))).await.unwrap();
        assert_eq!(class, expected);
    }

    #[tokio::test]
    async fn consecutive_class_files() {
        let first = minimal_class(52);
        let second = ClassBuilder::new(61).sample().to_bytes();
        let stream: Vec<u8> = first.iter().chain(&second).copied().collect();
        let mut source = ChunkedSource::new(stream.chunks(5).map(<[u8]>::to_vec));

        let class = read_class(&mut source, ReadOptions::default()).await.unwrap();
        assert_eq!(class.version().major(), 52);
        assert_eq!(class.byte_len(), first.len());
        let class = read_class(&mut source, ReadOptions::default()).await.unwrap();
        assert_eq!(class, ClassFile::read(second).unwrap());
        assert!(source.is_drained());
        assert!(matches!(
            read_class(&mut source, ReadOptions::default()).await,
            Err(DecodeError::UnexpectedEndOfStream)
        ));
    }

    #[tokio::test]
    async fn truncated_stream() {
        let bytes = ClassBuilder::new(61).sample().to_bytes();
        let truncated = bytes[..bytes.len() - 1].to_vec();
        let mut source = ChunkedSource::new(truncated.chunks(16).map(<[u8]>::to_vec));
        let err = read_class(&mut source, ReadOptions::default()).await.unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEndOfStream));

        let err = ClassFile::read_async(&truncated[..]).await.unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEndOfStream));
    }

    #[tokio::test]
    async fn malformed_data_is_not_retried() {
        let mut bytes = minimal_class(52);
        bytes[0] = 0;
        let mut source = ChunkedSource::new([bytes[..4].to_vec(), bytes[4..].to_vec()]);
        let err = read_class(&mut source, ReadOptions::default()).await.unwrap_err();
        assert!(matches!(err, DecodeError::NotAClassFile(0x00FE_BABE)));

        let mut source = ChunkedSource::new([minimal_class(64)]);
        let err = read_class(&mut source, ReadOptions::default()).await.unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedVersion { major: 64, .. }));
        let options = ReadOptions::default().with_max_major_version(64);
        assert!(read_class(&mut source, options).await.is_ok());
    }

    #[test]
    fn buffer_accounting() {
        let mut buffer = Buffer::default();
        buffer.push(Bytes::from_static(b"abc"));
        buffer.push(Bytes::new());
        buffer.push(Bytes::from_static(b"defg"));
        assert_eq!(buffer.len, 7);
        assert_eq!(buffer.segments.len(), 2);

        buffer.consume(0, 7);
        assert_eq!(buffer.target(3), 8);
        buffer.consume(4, 5);
        assert_eq!(buffer.len, 3);
        assert_eq!(buffer.examined, 1);
        assert_eq!(buffer.snapshot(false).segments, vec![Bytes::from_static(b"efg")]);
    }
}

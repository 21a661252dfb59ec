//! Buffered sequential reader over any byte stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use crate::error::DecodeError;
use crate::reader::BinaryReader;

/// Reads through a [`BufReader`], tracking the cursor itself.
///
/// The input length must be declared up front: end of input means the
/// cursor reached that length, not that the stream momentarily has no
/// bytes available.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: BufReader<R>,
    pos: u64,
    len: u64,
}

impl<R: Read> StreamReader<R> {
    /// Wraps a stream of `len` bytes.
    pub fn new(inner: R, len: u64) -> Self {
        Self {
            inner: BufReader::new(inner),
            pos: 0,
            len,
        }
    }

    /// Wraps a stream of `len` bytes with a buffer of `capacity` bytes.
    pub fn with_capacity(capacity: usize, inner: R, len: u64) -> Self {
        Self {
            inner: BufReader::with_capacity(capacity, inner),
            pos: 0,
            len,
        }
    }

    /// Returns the underlying stream, discarding buffered bytes.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    fn ensure(&self, wanted: u64, context: &'static str) -> Result<(), DecodeError> {
        if self.remaining() < wanted {
            return Err(self.eof_error(context, wanted));
        }
        Ok(())
    }

    fn io_error(&self, source: io::Error, context: &'static str, wanted: u64) -> DecodeError {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            // The stream ended before its declared length.
            DecodeError::UnexpectedEof {
                offset: self.pos,
                context,
                wanted,
                available: 0,
            }
        } else {
            DecodeError::Io {
                offset: self.pos,
                source,
            }
        }
    }
}

impl StreamReader<File> {
    /// Opens a file, taking its length from the file metadata.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        let file = File::open(path).map_err(|source| DecodeError::Io { offset: 0, source })?;
        let len = file
            .metadata()
            .map_err(|source| DecodeError::Io { offset: 0, source })?
            .len();
        Ok(Self::new(file, len))
    }
}

impl<R: Read> BinaryReader for StreamReader<R> {
    fn position(&self) -> u64 {
        self.pos
    }

    fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        self.ensure(N as u64, context)?;
        let mut buf = [0u8; N];
        if let Err(e) = self.inner.read_exact(&mut buf) {
            return Err(self.io_error(e, context, N as u64));
        }
        self.pos += N as u64;
        Ok(buf)
    }

    fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        self.ensure(len as u64, context)?;
        let mut buf = vec![0u8; len];
        if let Err(e) = self.inner.read_exact(&mut buf) {
            return Err(self.io_error(e, context, len as u64));
        }
        self.pos += len as u64;
        Ok(buf)
    }

    fn peek_u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        self.ensure(1, context)?;
        let next = self.inner.fill_buf().map(|buf| buf.first().copied());
        let next = match next {
            Ok(next) => next,
            Err(e) => return Err(self.io_error(e, context, 1)),
        };
        next.ok_or(DecodeError::UnexpectedEof {
            offset: self.pos,
            context,
            wanted: 1,
            available: 0,
        })
    }

    fn skip(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        self.ensure(count, context)?;
        let result = io::copy(&mut self.inner.by_ref().take(count), &mut io::sink());
        let copied = match result {
            Ok(copied) => copied,
            Err(e) => return Err(self.io_error(e, context, count)),
        };
        self.pos += copied;
        if copied < count {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                context,
                wanted: count - copied,
                available: 0,
            });
        }
        Ok(())
    }
}

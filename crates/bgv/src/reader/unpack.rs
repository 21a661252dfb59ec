//! Indexed unpacking over a shared, owned buffer.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use crate::error::DecodeError;
use crate::reader::{BinaryReader, read_source};

/// Decodes fixed-width fields by indexing directly into a buffer.
///
/// The buffer is reference counted and the reader may be restricted to a
/// byte range of it, so independent decoders can work on separate ranges
/// of one immutable input from separate threads. Offsets reported by the
/// reader are relative to the start of its range.
#[derive(Debug, Clone)]
pub struct UnpackReader {
    buf: Arc<[u8]>,
    start: usize,
    end: usize,
    n: usize,
}

impl UnpackReader {
    /// Creates a reader over the whole buffer.
    pub fn new(buf: impl Into<Arc<[u8]>>) -> Self {
        let buf = buf.into();
        let end = buf.len();
        Self {
            buf,
            start: 0,
            end,
            n: 0,
        }
    }

    /// Creates a reader restricted to `range` of a shared buffer.
    ///
    /// The range is clamped to the buffer.
    pub fn with_range(buf: Arc<[u8]>, range: Range<usize>) -> Self {
        let end = range.end.min(buf.len());
        let start = range.start.min(end);
        Self {
            buf,
            start,
            end,
            n: start,
        }
    }

    /// Loads a dump from disk, decompressing it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DecodeError> {
        Ok(Self::new(read_source(path)?))
    }

    /// Returns the shared buffer.
    pub fn buffer(&self) -> &Arc<[u8]> {
        &self.buf
    }

    #[inline]
    fn unpack<const N: usize>(&self, at: usize) -> Option<[u8; N]> {
        if self.end - at < N {
            return None;
        }
        self.buf[at..at + N].try_into().ok()
    }
}

impl BinaryReader for UnpackReader {
    fn position(&self) -> u64 {
        (self.n - self.start) as u64
    }

    fn len(&self) -> u64 {
        (self.end - self.start) as u64
    }

    #[inline]
    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        let value = self
            .unpack::<N>(self.n)
            .ok_or_else(|| self.eof_error(context, N as u64))?;
        self.n += N;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        if self.end - self.n < len {
            return Err(self.eof_error(context, len as u64));
        }
        let bytes = self.buf[self.n..self.n + len].to_vec();
        self.n += len;
        Ok(bytes)
    }

    fn peek_u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        if self.n >= self.end {
            return Err(self.eof_error(context, 1));
        }
        Ok(self.buf[self.n])
    }

    fn skip(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        if ((self.end - self.n) as u64) < count {
            return Err(self.eof_error(context, count));
        }
        self.n += count as usize;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_offsets_are_relative() {
        let buf: Arc<[u8]> = Arc::from(vec![0xaa, 0xbb, 0x00, 0x00, 0x00, 0x07, 0xcc]);
        let mut reader = UnpackReader::with_range(buf.clone(), 2..6);
        assert_eq!(reader.len(), 4);
        assert_eq!(reader.read_i32("test").unwrap(), 7);
        assert!(reader.is_eof());

        let err = reader.read_u8("test").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { offset: 4, .. }));
    }

    #[test]
    fn test_range_clamped() {
        let buf: Arc<[u8]> = Arc::from(vec![1u8, 2, 3]);
        let reader = UnpackReader::with_range(buf, 2..10);
        assert_eq!(reader.len(), 1);
    }

    #[test]
    fn test_readers_share_buffer_across_threads() {
        let buf: Arc<[u8]> = Arc::from((0u8..8).collect::<Vec<_>>());
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let mut reader = UnpackReader::with_range(buf.clone(), i * 4..i * 4 + 4);
                std::thread::spawn(move || reader.read_u32("test").unwrap())
            })
            .collect();
        let values: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(values, vec![0x00010203, 0x04050607]);
    }
}

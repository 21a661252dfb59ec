//! Zero-copy cursor over a borrowed byte slice.

use crate::error::DecodeError;
use crate::reader::BinaryReader;

/// Reads from an in-memory buffer by advancing a subslice.
///
/// Fixed-width values come straight off the front of the remaining slice
/// and [`SliceReader::read_slice`] hands out borrows of the input without
/// copying, which makes this the fastest backend for read-heavy workloads.
#[derive(Debug, Clone)]
pub struct SliceReader<'a> {
    data: &'a [u8],
    rest: &'a [u8],
}

impl<'a> SliceReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, rest: data }
    }

    /// Returns the unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        self.rest
    }

    /// Reads `len` bytes as a borrow of the input.
    #[inline]
    pub fn read_slice(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.rest.len() < len {
            return Err(self.eof_error(context, len as u64));
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        Ok(head)
    }

    /// Reads `len` bytes as a borrowed UTF-8 string.
    pub fn read_str(&mut self, len: usize, context: &'static str) -> Result<&'a str, DecodeError> {
        let offset = self.position();
        let bytes = self.read_slice(len, context)?;
        std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset, context })
    }
}

impl BinaryReader for SliceReader<'_> {
    fn position(&self) -> u64 {
        (self.data.len() - self.rest.len()) as u64
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    #[inline]
    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError> {
        match self.rest.split_first_chunk::<N>() {
            Some((head, tail)) => {
                self.rest = tail;
                Ok(*head)
            }
            None => Err(self.eof_error(context, N as u64)),
        }
    }

    fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<Vec<u8>, DecodeError> {
        self.read_slice(len, context).map(<[u8]>::to_vec)
    }

    fn peek_u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        self.rest
            .first()
            .copied()
            .ok_or_else(|| self.eof_error(context, 1))
    }

    fn skip(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        if (self.rest.len() as u64) < count {
            return Err(self.eof_error(context, count));
        }
        self.rest = &self.rest[count as usize..];
        Ok(())
    }
}

//! Byte-cursor abstraction the decoder reads through.
//!
//! [`BinaryReader`] is the single interface the decoder is written against.
//! Three backends implement it:
//!
//! - [`StreamReader`]: buffered sequential reads from any [`std::io::Read`].
//! - [`SliceReader`]: zero-copy cursor over a borrowed byte slice.
//! - [`UnpackReader`]: indexed unpacking over a shared owned buffer, which
//!   can also be restricted to a byte range so several decoders can work
//!   on one input in parallel.
//!
//! All multi-byte values are big-endian. Every `read_*` has a `skip_*`
//! counterpart that advances the cursor identically without building the
//! value.

mod slice;
mod stream;
mod unpack;

use std::fs;
use std::path::Path;

pub use slice::SliceReader;
pub use stream::StreamReader;
pub use unpack::UnpackReader;

use crate::error::DecodeError;
use crate::limits::ZSTD_MAGIC;

/// Sequential big-endian reader over an input of declared length.
pub trait BinaryReader {
    /// Current cursor offset from the start of the input.
    fn position(&self) -> u64;

    /// Declared length of the input in bytes.
    fn len(&self) -> u64;

    /// Reads exactly `N` bytes.
    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], DecodeError>;

    /// Reads exactly `len` bytes into a new buffer.
    fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<Vec<u8>, DecodeError>;

    /// Returns the next byte without advancing the cursor.
    fn peek_u8(&mut self, context: &'static str) -> Result<u8, DecodeError>;

    /// Advances the cursor by `count` bytes.
    fn skip(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError>;

    /// True only when the cursor sits exactly at the declared length.
    fn is_eof(&self) -> bool {
        self.position() == self.len()
    }

    /// Number of bytes between the cursor and the declared length.
    fn remaining(&self) -> u64 {
        self.len().saturating_sub(self.position())
    }

    /// Builds the error for a read of `wanted` bytes that would pass the end.
    fn eof_error(&self, context: &'static str, wanted: u64) -> DecodeError {
        DecodeError::UnexpectedEof {
            offset: self.position(),
            context,
            wanted,
            available: self.remaining(),
        }
    }

    /// Reads `len` bytes as UTF-8 text.
    fn read_utf8(&mut self, len: usize, context: &'static str) -> Result<String, DecodeError> {
        let offset = self.position();
        let bytes = self.read_bytes(len, context)?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { offset, context })
    }

    #[inline]
    fn read_u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>(context)?[0])
    }

    #[inline]
    fn read_i8(&mut self, context: &'static str) -> Result<i8, DecodeError> {
        Ok(i8::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_u16(&mut self, context: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_i16(&mut self, context: &'static str) -> Result<i16, DecodeError> {
        Ok(i16::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_u32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_i32(&mut self, context: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_u64(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_i64(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_f32(&mut self, context: &'static str) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn read_f64(&mut self, context: &'static str) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.read_array(context)?))
    }

    #[inline]
    fn peek_i8(&mut self, context: &'static str) -> Result<i8, DecodeError> {
        Ok(self.peek_u8(context)? as i8)
    }

    /// Skips `count` one-byte values.
    fn skip_i8(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        self.skip(count, context)
    }

    /// Skips `count` two-byte values.
    fn skip_i16(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        self.skip(count.saturating_mul(2), context)
    }

    /// Skips `count` four-byte integers.
    fn skip_i32(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        self.skip(count.saturating_mul(4), context)
    }

    /// Skips `count` eight-byte integers.
    fn skip_i64(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        self.skip(count.saturating_mul(8), context)
    }

    /// Skips `count` single-precision floats.
    fn skip_f32(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        self.skip(count.saturating_mul(4), context)
    }

    /// Skips `count` double-precision floats.
    fn skip_f64(&mut self, count: u64, context: &'static str) -> Result<(), DecodeError> {
        self.skip(count.saturating_mul(8), context)
    }

    /// Skips a `len`-byte UTF-8 run without validating it.
    fn skip_utf8(&mut self, len: usize, context: &'static str) -> Result<(), DecodeError> {
        self.skip(len as u64, context)
    }
}

/// Decompresses a zstd-framed dump.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    zstd::decode_all(input).map_err(|e| DecodeError::Decompression(e.to_string()))
}

/// Loads a dump from disk, transparently decompressing zstd-framed files.
pub fn read_source(path: impl AsRef<Path>) -> Result<Vec<u8>, DecodeError> {
    let data = fs::read(path.as_ref()).map_err(|source| DecodeError::Io { offset: 0, source })?;
    if data.starts_with(ZSTD_MAGIC) {
        tracing::debug!(path = %path.as_ref().display(), compressed = data.len(), "decompressing zstd dump");
        decompress(&data)
    } else {
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const SAMPLE: [u8; 23] = [
        0xff, // i8 -1
        0x01, 0x02, // u16 258
        0xff, 0xfe, // i16 -2
        0x00, 0x00, 0x01, 0x00, // i32 256
        0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, // i64 min + 1
        0x3f, 0x80, 0x00, 0x00, // f32 1.0
        b'h', b'i', // utf8 "hi"
    ];

    fn exercise<R: BinaryReader>(mut reader: R) {
        assert_eq!(reader.len(), SAMPLE.len() as u64);
        assert_eq!(reader.peek_i8("test").unwrap(), -1);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.read_i8("test").unwrap(), -1);
        assert_eq!(reader.read_u16("test").unwrap(), 258);
        assert_eq!(reader.read_i16("test").unwrap(), -2);
        assert_eq!(reader.read_i32("test").unwrap(), 256);
        assert_eq!(reader.read_i64("test").unwrap(), i64::MIN + 1);
        assert_eq!(reader.read_f32("test").unwrap(), 1.0);
        assert!(!reader.is_eof());
        assert_eq!(reader.read_utf8(2, "test").unwrap(), "hi");
        assert!(reader.is_eof());

        let err = reader.read_u8("tail").unwrap_err();
        assert!(matches!(
            err,
            DecodeError::UnexpectedEof { offset: 23, context: "tail", wanted: 1, available: 0 }
        ));
    }

    fn skip_matches_read<R: BinaryReader>(mut reader: R) {
        reader.skip_i8(1, "test").unwrap();
        reader.skip_i16(2, "test").unwrap();
        reader.skip_i32(1, "test").unwrap();
        reader.skip_i64(1, "test").unwrap();
        reader.skip_f32(1, "test").unwrap();
        assert_eq!(reader.position(), 21);
        reader.skip_utf8(2, "test").unwrap();
        assert!(reader.is_eof());
    }

    fn skip_past_end_fails<R: BinaryReader>(mut reader: R) {
        reader.skip(20, "test").unwrap();
        let err = reader.skip_i32(1, "tail").unwrap_err();
        assert!(matches!(err, DecodeError::UnexpectedEof { wanted: 4, available: 3, .. }));
    }

    #[test]
    fn test_stream_reader() {
        exercise(StreamReader::new(Cursor::new(SAMPLE.to_vec()), SAMPLE.len() as u64));
        skip_matches_read(StreamReader::new(Cursor::new(SAMPLE.to_vec()), SAMPLE.len() as u64));
        skip_past_end_fails(StreamReader::new(Cursor::new(SAMPLE.to_vec()), SAMPLE.len() as u64));
    }

    #[test]
    fn test_slice_reader() {
        exercise(SliceReader::new(&SAMPLE));
        skip_matches_read(SliceReader::new(&SAMPLE));
        skip_past_end_fails(SliceReader::new(&SAMPLE));
    }

    #[test]
    fn test_unpack_reader() {
        exercise(UnpackReader::new(SAMPLE.to_vec()));
        skip_matches_read(UnpackReader::new(SAMPLE.to_vec()));
        skip_past_end_fails(UnpackReader::new(SAMPLE.to_vec()));
    }

    #[test]
    fn test_invalid_utf8() {
        let data = [0xc3, 0x28];
        let mut reader = SliceReader::new(&data);
        let err = reader.read_utf8(2, "name").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8 { offset: 0, context: "name" }));
    }

    #[test]
    fn test_decompress_roundtrip() {
        let compressed = zstd::encode_all(&SAMPLE[..], 3).unwrap();
        assert!(compressed.starts_with(ZSTD_MAGIC));
        assert_eq!(decompress(&compressed).unwrap(), SAMPLE.to_vec());
    }

    #[test]
    fn test_decompress_garbage() {
        let result = decompress(b"not zstd at all");
        assert!(matches!(result, Err(DecodeError::Decompression(_))));
    }
}

//! Error types for BGV decoding, graph lookup and annotation.

use std::io;

use thiserror::Error;

use crate::codec::DecoderState;
use crate::model::NodeId;

/// Broad classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. The decoder that produced it must be discarded.
    Format,
    /// A decoder operation was called out of order. Indicates a caller bug.
    Usage,
    /// A requested graph, node or edge is not present.
    Lookup,
    /// An annotator failed. The graph it was mutating must be discarded.
    Annotate,
}

/// Malformed BGV input.
///
/// Every variant raised from the input stream carries the byte offset at
/// which the problem was detected.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid magic bytes: expected BIGV, found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("unsupported BGV version {major}.{minor}")]
    UnsupportedVersion { major: i8, minor: i8 },

    #[error("unexpected end of input at byte {offset} reading {context} ({wanted} bytes wanted, {available} available)")]
    UnexpectedEof {
        offset: u64,
        context: &'static str,
        wanted: u64,
        available: u64,
    },

    #[error("unknown token 0x{token:02x} in {context} at byte {offset}")]
    UnknownToken {
        offset: u64,
        context: &'static str,
        token: u8,
    },

    #[error("unknown pool id {id} referenced by token 0x{token:02x} at byte {offset}")]
    UnknownPoolId { offset: u64, token: u8, id: u16 },

    #[error("expected {expected} pool object at byte {offset}, found {found}")]
    UnexpectedPoolObject {
        offset: u64,
        expected: &'static str,
        found: &'static str,
    },

    #[error("enum ordinal {ordinal} out of range for {class} ({count} values) at byte {offset}")]
    InvalidEnumOrdinal {
        offset: u64,
        class: String,
        ordinal: i32,
        count: usize,
    },

    #[error("invalid UTF-8 in {context} at byte {offset}")]
    InvalidUtf8 { offset: u64, context: &'static str },

    #[error("negative {field} length {len} at byte {offset}")]
    NegativeLength {
        offset: u64,
        field: &'static str,
        len: i64,
    },

    #[error("{field} length {len} exceeds maximum {max} at byte {offset}")]
    LengthExceedsLimit {
        offset: u64,
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("nesting deeper than {max} levels at byte {offset}")]
    NestingTooDeep { offset: u64, max: usize },

    #[error("duplicate node id {id} at byte {offset}")]
    DuplicateNode { offset: u64, id: NodeId },

    #[error("edge {from} -> {to} references a node missing from the graph ending at byte {offset}")]
    DanglingEdge { offset: u64, from: NodeId, to: NodeId },

    #[error("group closed at byte {offset} with no group open")]
    UnbalancedGroup { offset: u64 },

    #[error("zstd decompression failed: {0}")]
    Decompression(String),

    #[error("I/O error at byte {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: io::Error,
    },
}

impl DecodeError {
    /// Byte offset at which the error was detected, when it came from the stream.
    pub fn offset(&self) -> Option<u64> {
        match self {
            DecodeError::InvalidMagic { .. }
            | DecodeError::UnsupportedVersion { .. }
            | DecodeError::Decompression(_) => None,
            DecodeError::UnexpectedEof { offset, .. }
            | DecodeError::UnknownToken { offset, .. }
            | DecodeError::UnknownPoolId { offset, .. }
            | DecodeError::UnexpectedPoolObject { offset, .. }
            | DecodeError::InvalidEnumOrdinal { offset, .. }
            | DecodeError::InvalidUtf8 { offset, .. }
            | DecodeError::NegativeLength { offset, .. }
            | DecodeError::LengthExceedsLimit { offset, .. }
            | DecodeError::NestingTooDeep { offset, .. }
            | DecodeError::DuplicateNode { offset, .. }
            | DecodeError::DanglingEdge { offset, .. }
            | DecodeError::UnbalancedGroup { offset }
            | DecodeError::Io { offset, .. } => Some(*offset),
        }
    }
}

/// A decoder operation invoked in the wrong state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {operation} when decoder is in state {state:?}")]
pub struct UsageError {
    pub operation: &'static str,
    pub state: DecoderState,
}

/// A requested graph, node or edge is absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("graph {index} not found")]
    GraphNotFound { index: usize },

    #[error("node {id} not found")]
    NodeNotFound { id: NodeId },

    #[error("no edge from node {from} to node {to}")]
    EdgeNotFound { from: NodeId, to: NodeId },

    #[error("node {id} already exists")]
    DuplicateNode { id: NodeId },
}

/// Failure inside an annotator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnnotateError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("node {id} has no node class")]
    MissingNodeClass { id: NodeId },
}

/// Error while producing a BGV stream with [`crate::codec::BgvWriter`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("{kind} values cannot be written as BGV properties")]
    UnsupportedValue { kind: &'static str },

    #[error("{field} length {len} exceeds maximum {max}")]
    LengthExceedsLimit {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("pool id space exhausted")]
    PoolExhausted,
}

/// Any failure surfaced by the crate's runtime operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] DecodeError),

    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Annotate(#[from] AnnotateError),
}

impl Error {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format(_) => ErrorKind::Format,
            Error::Usage(_) => ErrorKind::Usage,
            Error::Lookup(_) => ErrorKind::Lookup,
            Error::Annotate(_) => ErrorKind::Annotate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let format: Error = DecodeError::UnbalancedGroup { offset: 3 }.into();
        assert_eq!(format.kind(), ErrorKind::Format);

        let usage: Error = UsageError {
            operation: "read graph",
            state: DecoderState::Unstarted,
        }
        .into();
        assert_eq!(usage.kind(), ErrorKind::Usage);

        let lookup: Error = LookupError::GraphNotFound { index: 4 }.into();
        assert_eq!(lookup.kind(), ErrorKind::Lookup);

        let annotate: Error = AnnotateError::MissingNodeClass { id: 1 }.into();
        assert_eq!(annotate.kind(), ErrorKind::Annotate);
    }

    #[test]
    fn test_offset_reported() {
        let err = DecodeError::UnknownToken {
            offset: 17,
            context: "property",
            token: 0x4f,
        };
        assert_eq!(err.offset(), Some(17));
        assert_eq!(err.to_string(), "unknown token 0x4f in property at byte 17");
        assert_eq!(DecodeError::UnsupportedVersion { major: 9, minor: 0 }.offset(), None);
    }
}

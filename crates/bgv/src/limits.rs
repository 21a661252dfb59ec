//! Format constants and decoding limits.
//!
//! The limits bound every allocation the decoder makes from a length read
//! off the wire, so a corrupt or hostile dump fails with
//! [`DecodeError::LengthExceedsLimit`](crate::DecodeError::LengthExceedsLimit)
//! instead of exhausting memory.

/// Magic bytes at the start of every BGV file.
pub const MAGIC: &[u8; 4] = b"BIGV";

/// Magic bytes of a zstd frame, used to detect compressed dumps.
pub const ZSTD_MAGIC: &[u8; 4] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Versions (major, minor) this crate decodes when version checking is on.
pub const SUPPORTED_VERSIONS: &[(i8, i8)] = &[(6, 1), (7, 0), (7, 1), (8, 0)];

/// Version written by [`BgvWriter`](crate::codec::BgvWriter) by default.
pub const DEFAULT_VERSION: (i8, i8) = (7, 0);

/// First major version with a document property block.
pub const DOCUMENT_PROPS_MAJOR: i8 = 7;

/// Maximum length of a string in bytes.
pub const MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// Maximum length of a skipped opaque byte run (method bytecode).
pub const MAX_BYTES_LEN: usize = 64 * 1024 * 1024;

/// Maximum number of nodes in one graph.
pub const MAX_NODES: usize = 4 * 1024 * 1024;

/// Maximum number of blocks in one graph.
pub const MAX_BLOCKS: usize = 1024 * 1024;

/// Maximum number of elements in a property array, argument list or node
/// list inside a block.
pub const MAX_ARRAY_LEN: usize = 4 * 1024 * 1024;

/// Maximum number of enum constants in a class.
pub const MAX_ENUM_VALUES: usize = 64 * 1024;

/// Maximum depth of nested pool objects and subgraphs.
pub const MAX_NESTING_DEPTH: usize = 64;

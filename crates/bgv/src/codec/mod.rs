//! BGV wire format.
//!
//! A BGV file is a magic/version header, an optional document property
//! block, then a stream of group and graph records. Values that recur
//! (strings, classes, node classes, methods) are pooled: the first
//! occurrence is tagged `POOL_NEW` with a fresh u16 id and carries the full
//! payload, later occurrences carry only the id. All multi-byte numbers are
//! big-endian.
//!
//! [`BgvDecoder`] reads the format; [`BgvWriter`] produces it.

mod body;
mod decoder;
mod encode;
mod pool;
pub(crate) mod token;
mod value;

pub use decoder::{BgvDecoder, DecoderState, GraphHeader, Group};
pub use encode::{BgvWriter, NodeClassSpec, NodeRecord, PortSpec, PropValue};
pub use pool::Pool;
pub(crate) use value::ValueReader;

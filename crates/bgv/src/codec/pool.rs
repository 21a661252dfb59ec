//! Decoder-local object pool.

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::model::PoolObject;

/// Table of pooled objects keyed by wire id.
///
/// Each decoder owns exactly one pool. Entries live for the whole decode
/// session and are never evicted. A producer may re-send `POOL_NEW` for an
/// id it has recycled; the later definition then replaces the earlier one,
/// which is how references made after the redefinition resolve.
#[derive(Debug, Clone, Default)]
pub struct Pool {
    entries: FxHashMap<u16, PoolObject>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u16) -> Option<&PoolObject> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: u16) -> bool {
        self.entries.contains_key(&id)
    }

    /// Registers a first-occurrence entry.
    pub fn insert(&mut self, id: u16, object: PoolObject) {
        trace!(id, kind = object.kind_name(), value = %object, "pool entry");
        if let Some(previous) = self.entries.insert(id, object) {
            trace!(id, previous = %previous, "pool id redefined");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

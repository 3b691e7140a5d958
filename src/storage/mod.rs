//! Storage collaborator abstraction and backends.
//!
//! The content repository talks to storage only through [`ContentStore`]:
//! point reads, atomic batch writes, identifier allocation for incomplete
//! keys, and prefix-scoped scans. Backends hold no domain logic.
//!
//! ## Modules
//!
//! - `memory`: `BTreeMap`-backed store for tests and embedding
//! - `rocksdb`: RocksDB utilities and the persistent store (feature `rocksdb`)
//!
//! ## Order index
//!
//! An ordered put writes the record plus an index entry
//! `{scope}#{u64::MAX - order (8 BE bytes)}{record key}` whose value is the
//! record key. Iterating the index under `{scope}#` in byte order therefore
//! yields records newest-first.

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use memory::MemoryStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbConfig, RocksDbHandle, RocksDbStore};

use crate::error::Result;
use std::fmt;

/// Separator between an index scope and the ordered suffix.
pub const INDEX_SCOPE_SEPARATOR: u8 = b'#';

/// A lazily-evaluated sequence of `(record key, record bytes)` pairs.
///
/// The first `Err` ends the scan; callers must not pull past it.
pub type ScanIter<'a> = Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + 'a>;

/// Iteration order for [`ContentStore::scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrder {
    /// Records whose key starts with the prefix, ascending by key.
    Key,
    /// Records indexed under the scope, descending by their order value.
    Descending,
}

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Store `value` at `key`.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Store an order-index entry pointing at `target`.
    Index { index_key: Vec<u8>, target: Vec<u8> },
}

/// A group of writes applied atomically: all of them land or none do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a plain record write.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WriteOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Adds a record write plus an order-index entry under `scope`.
    pub fn put_ordered(
        &mut self,
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        scope: &[u8],
        order: u64,
    ) -> &mut Self {
        let key = key.into();
        self.ops.push(WriteOp::Index {
            index_key: order_index_key(scope, order, &key),
            target: key.clone(),
        });
        self.ops.push(WriteOp::Put {
            key,
            value: value.into(),
        });
        self
    }

    /// Returns the queued operations.
    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    /// Consumes the batch, returning its operations.
    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// The storage primitives the content repository is written against.
pub trait ContentStore: Send + Sync + fmt::Debug {
    /// Loads the raw record at `key`. A miss is `Ok(None)`, not an error.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Applies every operation in `batch` atomically.
    fn write(&self, batch: WriteBatch) -> Result<()>;

    /// Allocates the next identifier from the named sequence (starting at 1).
    fn allocate_id(&self, sequence: &str) -> Result<u64>;

    /// Scans records under `prefix` in the requested order, yielding at most
    /// `limit` entries.
    ///
    /// For [`ScanOrder::Key`] the prefix is a record key prefix. For
    /// [`ScanOrder::Descending`] it is an order-index scope as passed to
    /// [`WriteBatch::put_ordered`].
    fn scan(&self, prefix: &[u8], order: ScanOrder, limit: usize) -> Result<ScanIter<'_>>;

    /// Stores a single record.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut batch = WriteBatch::new();
        batch.put(key, value);
        self.write(batch)
    }
}

/// Creates a prefixed key with a separator.
///
/// Format: `{prefix}{separator}{suffix}`
pub fn prefixed_key(prefix: &[u8], separator: u8, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + 1 + suffix.len());
    key.extend_from_slice(prefix);
    key.push(separator);
    key.extend_from_slice(suffix);
    key
}

/// Creates a composite key from two byte slices.
///
/// Format: `{part1}:{part2}` (using colon separator)
pub fn composite_key(part1: &[u8], part2: &[u8]) -> Vec<u8> {
    prefixed_key(part1, b':', part2)
}

/// Inverts an order value so larger values sort first in byte order.
pub fn invert_order(order: u64) -> [u8; 8] {
    (u64::MAX - order).to_be_bytes()
}

/// Returns the prefix shared by every index entry under `scope`.
pub fn order_index_prefix(scope: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + 1);
    key.extend_from_slice(scope);
    key.push(INDEX_SCOPE_SEPARATOR);
    key
}

/// Creates an order-index key: `{scope}#{inverted order}{record key}`.
pub fn order_index_key(scope: &[u8], order: u64, record_key: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(scope.len() + 1 + 8 + record_key.len());
    key.extend_from_slice(scope);
    key.push(INDEX_SCOPE_SEPARATOR);
    key.extend_from_slice(&invert_order(order));
    key.extend_from_slice(record_key);
    key
}

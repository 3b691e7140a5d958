//! In-memory [`ContentStore`] backed by ordered maps.
//!
//! Records and order-index entries live in separate `BTreeMap`s so prefix
//! scans come out in byte order, matching the RocksDB backend. Scans take a
//! snapshot of at most `limit` matching entries under the read lock and then
//! yield them lazily.

use super::{ContentStore, ScanIter, ScanOrder, WriteBatch, WriteOp};
use crate::error::{ChannelStoreError, Result};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::RwLock;
use tracing::trace;

#[derive(Debug, Default)]
struct Tables {
    records: BTreeMap<Vec<u8>, Vec<u8>>,
    index: BTreeMap<Vec<u8>, Vec<u8>>,
    sequences: HashMap<String, u64>,
}

/// A process-local store. Nothing survives drop.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (index entries excluded).
    pub fn record_count(&self) -> usize {
        self.tables
            .read()
            .map(|tables| tables.records.len())
            .unwrap_or(0)
    }

    fn poisoned<T>(_: T) -> ChannelStoreError {
        ChannelStoreError::storage("memory store lock poisoned")
    }
}

fn prefix_range<'a>(
    map: &'a BTreeMap<Vec<u8>, Vec<u8>>,
    prefix: &'a [u8],
) -> impl Iterator<Item = (&'a Vec<u8>, &'a Vec<u8>)> + 'a {
    map.range::<[u8], _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(key, _)| key.starts_with(prefix))
}

impl ContentStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let tables = self.tables.read().map_err(Self::poisoned)?;
        let value = tables.records.get(key).cloned();
        trace!(
            key_len = key.len(),
            found = value.is_some(),
            "memory_get: looked up record"
        );
        Ok(value)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut tables = self.tables.write().map_err(Self::poisoned)?;
        let op_count = batch.len();
        for op in batch.into_ops() {
            match op {
                WriteOp::Put { key, value } => {
                    tables.records.insert(key, value);
                }
                WriteOp::Index { index_key, target } => {
                    tables.index.insert(index_key, target);
                }
            }
        }
        trace!(ops = op_count, "memory_write: applied batch");
        Ok(())
    }

    fn allocate_id(&self, sequence: &str) -> Result<u64> {
        let mut tables = self.tables.write().map_err(Self::poisoned)?;
        let next = tables.sequences.entry(sequence.to_string()).or_insert(0);
        *next += 1;
        Ok(*next)
    }

    fn scan(&self, prefix: &[u8], order: ScanOrder, limit: usize) -> Result<ScanIter<'_>> {
        let tables = self.tables.read().map_err(Self::poisoned)?;

        let rows: Vec<(Vec<u8>, Vec<u8>)> = match order {
            ScanOrder::Key => prefix_range(&tables.records, prefix)
                .take(limit)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            ScanOrder::Descending => {
                let index_prefix = super::order_index_prefix(prefix);
                prefix_range(&tables.index, &index_prefix)
                    .filter_map(|(_, target)| {
                        tables
                            .records
                            .get(target)
                            .map(|value| (target.clone(), value.clone()))
                    })
                    .take(limit)
                    .collect()
            }
        };

        trace!(
            prefix_len = prefix.len(),
            order = ?order,
            records = rows.len(),
            "memory_scan: snapshot taken"
        );

        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

//! RocksDB storage backend.
//!
//! [`RocksDbHandle`] wraps the database with column-family helpers and holds
//! no domain logic. [`RocksDbStore`] implements [`ContentStore`] on top of it.
//!
//! ## Storage Layout
//!
//! - `records`: record key -> bincode-serialized record
//! - `idx_order`: `{scope}#{inverted order}{record key}` -> record key
//! - `meta`: `seq:{name}` -> u64 (big endian) next-id counters

use super::{ContentStore, ScanIter, ScanOrder, WriteBatch, WriteOp};
use crate::error::{ChannelStoreError, Result};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options,
};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, trace};

/// Column family holding records.
pub const CF_RECORDS: &str = "records";
/// Column family holding order-index entries.
pub const CF_IDX_ORDER: &str = "idx_order";
/// Column family holding id sequences.
pub const CF_META: &str = "meta";

const SEQUENCE_PREFIX: &[u8] = b"seq";

// =============================================================================
// RocksDB Configuration
// =============================================================================

/// Configuration for RocksDB storage.
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Maximum number of open files.
    pub max_open_files: i32,
    /// Number of log files to keep.
    pub keep_log_file_num: usize,
    /// Maximum WAL size in bytes.
    pub max_wal_size: u64,
    /// Write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Maximum number of write buffers.
    pub max_write_buffer_number: i32,
    /// Target file size for SST files.
    pub target_file_size_base: u64,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            max_open_files: 128,
            keep_log_file_num: 2,
            max_wal_size: 32 * 1024 * 1024,      // 32MB
            write_buffer_size: 32 * 1024 * 1024, // 32MB
            max_write_buffer_number: 2,
            target_file_size_base: 32 * 1024 * 1024, // 32MB
        }
    }
}

impl RocksDbConfig {
    /// Creates a configuration for long-running server processes.
    ///
    /// Uses larger buffers and more files for higher throughput.
    pub fn for_server() -> Self {
        Self {
            max_open_files: 256,
            keep_log_file_num: 3,
            max_wal_size: 64 * 1024 * 1024,      // 64MB
            write_buffer_size: 64 * 1024 * 1024, // 64MB
            max_write_buffer_number: 3,
            target_file_size_base: 64 * 1024 * 1024, // 64MB
        }
    }

    /// Builds RocksDB Options from this configuration.
    pub fn build_options(&self) -> Options {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(self.max_open_files);
        opts.set_keep_log_file_num(self.keep_log_file_num);
        opts.set_max_total_wal_size(self.max_wal_size);
        opts.increase_parallelism(num_cpus::get() as i32);
        opts.set_write_buffer_size(self.write_buffer_size);
        opts.set_max_write_buffer_number(self.max_write_buffer_number);
        opts.set_target_file_size_base(self.target_file_size_base);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }
}

// =============================================================================
// Database Handle Wrapper
// =============================================================================

/// A wrapper around RocksDB that provides common operations.
pub struct RocksDbHandle {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksDbHandle {
    /// Opens a RocksDB database with the given column families.
    pub fn open(
        db_path: impl AsRef<Path>,
        config: &RocksDbConfig,
        column_families: &[&str],
    ) -> Result<Self> {
        let opts = config.build_options();
        let cf_opts = Options::default();

        let cf_descriptors: Vec<_> = column_families
            .iter()
            .map(|cf| ColumnFamilyDescriptor::new(*cf, cf_opts.clone()))
            .collect();

        let db = DBWithThreadMode::<MultiThreaded>::open_cf_descriptors(
            &opts,
            db_path.as_ref(),
            cf_descriptors,
        )
        .map_err(|e| ChannelStoreError::storage(format!("Failed to open RocksDB: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Gets a column family handle.
    pub fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ChannelStoreError::storage(format!("Column family '{}' not found", name)))
    }

    /// Stores raw bytes at the given key.
    pub fn put_raw(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.cf(cf_name)?;

        trace!(
            cf = cf_name,
            key_len = key.len(),
            value_bytes = value.len(),
            "db_put_raw: storing raw bytes"
        );

        self.db
            .put_cf(&cf, key, value)
            .map_err(|e| ChannelStoreError::storage(format!("Failed to write: {}", e)))?;
        Ok(())
    }

    /// Loads raw bytes from the given key.
    pub fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf_name)?;

        match self.db.get_cf(&cf, key) {
            Ok(Some(bytes)) => {
                trace!(
                    cf = cf_name,
                    key_len = key.len(),
                    value_bytes = bytes.len(),
                    "db_get_raw: found record"
                );
                Ok(Some(bytes))
            }
            Ok(None) => {
                trace!(cf = cf_name, key_len = key.len(), "db_get_raw: key not found");
                Ok(None)
            }
            Err(e) => Err(ChannelStoreError::storage(format!("Failed to read: {}", e))),
        }
    }

    /// Applies a batch of column-family writes atomically.
    pub fn write_batch(&self, batch: rocksdb::WriteBatch) -> Result<()> {
        let op_count = batch.len();
        self.db
            .write(batch)
            .map_err(|e| ChannelStoreError::storage(format!("Failed to write batch: {}", e)))?;
        trace!(ops = op_count, "db_write_batch: committed");
        Ok(())
    }

    /// Returns a lazy iterator over entries whose key starts with `prefix`.
    ///
    /// Iterator errors are surfaced as `Err` items; iteration stops at the
    /// first key outside the prefix.
    pub fn prefix_iter(
        &self,
        cf_name: &str,
        prefix: Vec<u8>,
    ) -> Result<impl Iterator<Item = Result<(Vec<u8>, Vec<u8>)>> + '_> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        Ok(iter
            .map(|item| {
                item.map(|(key, value)| (key.into_vec(), value.into_vec()))
                    .map_err(|e| ChannelStoreError::storage(format!("Iterator error: {}", e)))
            })
            .take_while(move |item| match item {
                Ok((key, _)) => key.starts_with(&prefix),
                Err(_) => true,
            }))
    }

    /// Returns database statistics.
    pub fn stats(&self) -> String {
        self.db
            .property_value("rocksdb.stats")
            .ok()
            .flatten()
            .unwrap_or_else(|| "Stats unavailable".to_string())
    }
}

impl std::fmt::Debug for RocksDbHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbHandle")
            .field("db", &"RocksDB")
            .finish()
    }
}

// =============================================================================
// Content Store
// =============================================================================

/// Database subdirectory under the data directory.
const DB_DIR: &str = "content_db";

/// Persistent [`ContentStore`] on RocksDB.
#[derive(Debug)]
pub struct RocksDbStore {
    db: RocksDbHandle,
    sequence_lock: Mutex<()>,
}

impl RocksDbStore {
    /// Opens (or creates) a store under `data_dir` with default tuning.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(data_dir, &RocksDbConfig::default())
    }

    /// Opens (or creates) a store under `data_dir`.
    pub fn open_with_config(data_dir: impl AsRef<Path>, config: &RocksDbConfig) -> Result<Self> {
        let db_path = data_dir.as_ref().join(DB_DIR);
        let db = RocksDbHandle::open(&db_path, config, &[CF_RECORDS, CF_IDX_ORDER, CF_META])?;
        info!("Opened content RocksDB at {:?}", db_path);

        Ok(Self {
            db,
            sequence_lock: Mutex::new(()),
        })
    }

    /// Returns the wrapped handle.
    pub fn handle(&self) -> &RocksDbHandle {
        &self.db
    }

    fn sequence_key(sequence: &str) -> Vec<u8> {
        super::composite_key(SEQUENCE_PREFIX, sequence.as_bytes())
    }
}

impl ContentStore for RocksDbStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.db.get_raw(CF_RECORDS, key)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let records = self.db.cf(CF_RECORDS)?;
        let index = self.db.cf(CF_IDX_ORDER)?;

        let mut rocks_batch = rocksdb::WriteBatch::default();
        for op in batch.ops() {
            match op {
                WriteOp::Put { key, value } => rocks_batch.put_cf(&records, key, value),
                WriteOp::Index { index_key, target } => {
                    rocks_batch.put_cf(&index, index_key, target)
                }
            }
        }

        self.db.write_batch(rocks_batch)
    }

    fn allocate_id(&self, sequence: &str) -> Result<u64> {
        let _guard = self
            .sequence_lock
            .lock()
            .map_err(|_| ChannelStoreError::storage("sequence lock poisoned"))?;

        let key = Self::sequence_key(sequence);
        let current = match self.db.get_raw(CF_META, &key)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    ChannelStoreError::storage(format!("Corrupt sequence counter '{}'", sequence))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };

        let next = current + 1;
        self.db.put_raw(CF_META, &key, &next.to_be_bytes())?;
        Ok(next)
    }

    fn scan(&self, prefix: &[u8], order: ScanOrder, limit: usize) -> Result<ScanIter<'_>> {
        trace!(
            prefix_len = prefix.len(),
            order = ?order,
            limit = limit,
            "db_scan: starting scan"
        );

        match order {
            ScanOrder::Key => {
                let rows = self.db.prefix_iter(CF_RECORDS, prefix.to_vec())?;
                Ok(Box::new(rows.take(limit)))
            }
            ScanOrder::Descending => {
                let entries = self
                    .db
                    .prefix_iter(CF_IDX_ORDER, super::order_index_prefix(prefix))?;
                let rows = entries
                    .filter_map(move |entry| match entry {
                        Ok((_, target)) => match self.db.get_raw(CF_RECORDS, &target) {
                            Ok(Some(value)) => Some(Ok((target, value))),
                            Ok(None) => None,
                            Err(e) => Some(Err(e)),
                        },
                        Err(e) => Some(Err(e)),
                    })
                    .take(limit);
                Ok(Box::new(rows))
            }
        }
    }
}

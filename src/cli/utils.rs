//! Utility functions for CLI operations.

use crate::config::StoreConfig;
use crate::content::ChannelsRepo;
use crate::error::Result;
use crate::storage::ContentStore;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

#[cfg(feature = "rocksdb")]
use crate::storage::RocksDbStore;

/// Opens the persistent store configured by `config`
#[cfg(feature = "rocksdb")]
pub fn open_store(config: &StoreConfig) -> Result<Arc<RocksDbStore>> {
    if !config.data_dir.exists() {
        fs::create_dir_all(&config.data_dir)?;
    }
    Ok(Arc::new(RocksDbStore::open(&config.data_dir)?))
}

/// Without a persistent backend there is nothing to open.
#[cfg(not(feature = "rocksdb"))]
pub fn open_store(_config: &StoreConfig) -> Result<Arc<crate::storage::MemoryStore>> {
    Err(crate::error::ChannelStoreError::config(
        "channelstore was built without the rocksdb feature",
    ))
}

/// Opens the repository for the configured organization
pub fn open_repo(config: &StoreConfig) -> Result<ChannelsRepo> {
    let store: Arc<dyn ContentStore> = open_store(config)?;
    Ok(ChannelsRepo::new(store, config.org.clone()))
}

/// Returns a writer for `path`, or stdout when no path is given
pub fn output_writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => Ok(Box::new(io::BufWriter::new(fs::File::create(path)?))),
        None => Ok(Box::new(io::stdout().lock())),
    }
}

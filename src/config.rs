//! Environment-driven configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `CHANNELSTORE_DATA` | `channelstore_data` |
//! | `CHANNELSTORE_ORG` | `default` |
//! | `CHANNELSTORE_MAX_COUNT` | `50` |
//! | `CHANNELSTORE_REQUEST_TIMEOUT_MS` | unset |
//! | `CHANNELSTORE_FEED_BASE_URL` | `http://localhost:3000` |

use crate::content::OrgId;
use crate::context::RequestContext;
use crate::error::{ChannelStoreError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default data directory name.
pub const DEFAULT_DATA_DIR: &str = "channelstore_data";

/// Default organization used when none is configured.
pub const DEFAULT_ORG: &str = "default";

/// Default enumerator cap.
pub const DEFAULT_MAX_COUNT: usize = 50;

/// Default base URL for generated feeds.
pub const DEFAULT_FEED_BASE_URL: &str = "http://localhost:3000";

const ENV_DATA: &str = "CHANNELSTORE_DATA";
const ENV_ORG: &str = "CHANNELSTORE_ORG";
const ENV_MAX_COUNT: &str = "CHANNELSTORE_MAX_COUNT";
const ENV_REQUEST_TIMEOUT_MS: &str = "CHANNELSTORE_REQUEST_TIMEOUT_MS";
const ENV_FEED_BASE_URL: &str = "CHANNELSTORE_FEED_BASE_URL";

/// Runtime configuration for a channel store process.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the persistent database.
    pub data_dir: PathBuf,
    /// Organization every key is anchored under.
    pub org: OrgId,
    /// Result cap for enumerations.
    pub max_count: usize,
    /// Per-request timeout, if any.
    pub request_timeout: Option<Duration>,
    /// Base URL used to build feed links.
    pub feed_base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            org: OrgId::default_org(),
            max_count: DEFAULT_MAX_COUNT,
            request_timeout: None,
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
        }
    }
}

impl StoreConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(org) = lookup(ENV_ORG) {
            config.org = OrgId::new(org)
                .map_err(|e| ChannelStoreError::config(format!("{}: {}", ENV_ORG, e)))?;
        }

        if let Some(raw) = lookup(ENV_MAX_COUNT) {
            let max_count: usize = raw.trim().parse().map_err(|_| {
                ChannelStoreError::config(format!("{} must be a number, got '{}'", ENV_MAX_COUNT, raw))
            })?;
            if max_count == 0 {
                return Err(ChannelStoreError::config(format!(
                    "{} must be greater than zero",
                    ENV_MAX_COUNT
                )));
            }
            config.max_count = max_count;
        }

        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().map_err(|_| {
                ChannelStoreError::config(format!(
                    "{} must be a number of milliseconds, got '{}'",
                    ENV_REQUEST_TIMEOUT_MS, raw
                ))
            })?;
            config.request_timeout = Some(Duration::from_millis(millis));
        }

        if let Some(url) = lookup(ENV_FEED_BASE_URL) {
            config.feed_base_url = url.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Creates a request context honoring the configured timeout.
    pub fn request_context(&self) -> RequestContext {
        match self.request_timeout {
            Some(timeout) => RequestContext::with_timeout(timeout),
            None => RequestContext::new(),
        }
    }
}

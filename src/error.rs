//! Error types for channel store operations.

use thiserror::Error;

/// Result type alias for channel store operations.
pub type Result<T> = std::result::Result<T, ChannelStoreError>;

/// Main error type for channel store operations.
#[derive(Error, Debug)]
pub enum ChannelStoreError {
    /// The slug is not registered in the organization
    #[error("No channel with slug: {0}")]
    ChannelNotFound(String),

    /// A post lookup missed within a resolved channel
    #[error("No post {post} in channel: {channel}")]
    PostNotFound { channel: String, post: String },

    /// A channel with this slug already exists
    #[error("Channel already exists: {0}")]
    ChannelExists(String),

    /// Failures from the underlying storage backend
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The request context was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// The request context deadline passed
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Export formatting errors
    #[error("Export error: {0}")]
    Export(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelStoreError {
    /// Creates a new channel-not-found error.
    pub fn channel_not_found<T: ToString>(slug: T) -> Self {
        Self::ChannelNotFound(slug.to_string())
    }

    /// Creates a new post-not-found error.
    pub fn post_not_found<C: ToString, P: ToString>(channel: C, post: P) -> Self {
        Self::PostNotFound {
            channel: channel.to_string(),
            post: post.to_string(),
        }
    }

    /// Creates a new storage error.
    pub fn storage<T: ToString>(msg: T) -> Self {
        Self::Storage(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new invalid input error.
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Creates a new export error.
    pub fn export<T: ToString>(msg: T) -> Self {
        Self::Export(msg.to_string())
    }

    /// Returns true for lookups that missed (channel or post).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ChannelNotFound(_) | Self::PostNotFound { .. })
    }

    /// Returns true if the request context aborted the operation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<bincode::Error> for ChannelStoreError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for ChannelStoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<csv::Error> for ChannelStoreError {
    fn from(err: csv::Error) -> Self {
        Self::Export(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_not_found_message() {
        let err = ChannelStoreError::channel_not_found("news");
        assert_eq!(err.to_string(), "No channel with slug: news");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_storage_error_is_not_not_found() {
        let err = ChannelStoreError::storage("disk full");
        assert!(!err.is_not_found());
        assert!(!err.is_aborted());
    }

    #[test]
    fn test_aborted_kinds() {
        assert!(ChannelStoreError::Cancelled.is_aborted());
        assert!(ChannelStoreError::DeadlineExceeded.is_aborted());
    }
}

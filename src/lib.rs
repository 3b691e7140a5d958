//! # channelstore
//!
//! A hierarchical content store for channels and their posts.
//!
//! Every record lives under an organization root key. Channels are found
//! through a slug index record and posts are stored as children of their
//! channel, so any read is an ancestor-scoped scan rooted at the channel.
//!
//! ## Components
//!
//! - **Key derivation** ([`content::keys`]): deterministic keys for slug
//!   index records, channel records and posts.
//! - **Repository** ([`ChannelsRepo`]): channel creation and lookup, post and
//!   reply creation, store-order listing.
//! - **Connection enumerator** ([`PostsConnection`]): a channel's newest
//!   posts, flat or with replies grouped under their roots.
//! - **Export adapters** ([`export`]): collect, CSV, JSON Feed.
//! - **Storage** ([`storage`]): the [`ContentStore`](storage::ContentStore)
//!   trait with in-memory and RocksDB backends.
//!
//! ## Example
//!
//! ```rust
//! use channelstore::content::{ChannelsRepo, OrgId, PostsConnectionOptions};
//! use channelstore::storage::MemoryStore;
//! use channelstore::RequestContext;
//! use std::sync::Arc;
//!
//! # fn main() -> channelstore::Result<()> {
//! let repo = ChannelsRepo::new(Arc::new(MemoryStore::new()), OrgId::new("acme")?);
//! let ctx = RequestContext::new();
//!
//! repo.create_channel(&ctx, "news")?;
//! let root = repo.create_post(&ctx, "news", "# Launch day")?;
//! repo.create_reply(&ctx, "news", root.id, "Congrats!")?;
//!
//! let connection = repo.posts_connection(PostsConnectionOptions::threaded("news", 50));
//! let posts = channelstore::export::all(&connection, &ctx)?;
//! assert_eq!(posts.len(), 1);
//! assert_eq!(posts[0].replies().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod export;
pub mod storage;

pub use config::StoreConfig;
pub use content::{ChannelsRepo, Post, PostsConnection, PostsConnectionOptions};
pub use context::RequestContext;
pub use error::{ChannelStoreError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Hierarchical content: key derivation, the channels repository and the
//! posts connection enumerator.
//!
//! ```text
//! Org:acme
//! ├── ChannelSlug:news                 -> { content_key: 0000000000000001 }
//! └── ChannelContent:0000000000000001  -> { slug, description }
//!     └── Post:0000000000000007        -> { created_at, parent_post_id, ... }
//! ```

pub mod connection;
pub mod keys;
pub mod repository;
pub mod threading;
pub mod types;

pub use connection::{EnumerationStats, PostStream, PostsConnection, PostsConnectionOptions};
pub use keys::{ChannelId, Key, OrgId, ParentChain, PostId};
pub use repository::{ChannelsRepo, PostScan, LIST_POSTS_LIMIT};
pub use threading::{thread_replies, ThreadedPosts};
pub use types::{ChannelContent, ChannelSlug, MarkdownDocument, MediaType, NewPost, Post};

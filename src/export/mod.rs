//! Adapters that consume a [`PostsConnection`] stream.
//!
//! Each adapter drives one enumeration. What the adapter sees is exactly what
//! the enumerator emits: in threaded mode that is the roots only, with replies
//! nested inside them.

pub mod csv_writer;
pub mod feed;

pub use csv_writer::{format_created_at, write_to_csv, CSV_HEADER};
pub use feed::{make_feed, ChannelFeedUrls, Feed, FeedItem, FeedUrlMaker, JSON_FEED_VERSION};

use crate::content::{Post, PostsConnection};
use crate::context::RequestContext;
use crate::error::Result;

/// Collects every emitted post, in order.
pub fn all(connection: &PostsConnection<'_>, ctx: &RequestContext) -> Result<Vec<Post>> {
    let mut posts = Vec::new();
    connection.enumerate(ctx, |post| posts.push(post))?;
    Ok(posts)
}

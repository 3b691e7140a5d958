//! Content repository: channels and posts under one organization.
//!
//! Every operation is expressed in terms of derived keys and ancestor
//! scoping. A channel is reached only through its slug index record, and
//! posts are only ever read through a resolved [`ParentChain`].

use crate::clock::{Clock, MonotonicStamp, SystemClock};
use crate::content::keys::{
    channel_content_key_for, channel_slug_key_for, post_key_for, posts_scope, validate_slug,
    ChannelId, Key, OrgId, ParentChain, PostId, KIND_CHANNEL_CONTENT, KIND_CHANNEL_SLUG,
    KIND_POST,
};
use crate::content::types::{
    ChannelContent, ChannelSlug, MarkdownDocument, NewPost, Post, StoredChannelContent,
    StoredPost,
};
use crate::context::RequestContext;
use crate::error::{ChannelStoreError, Result};
use crate::storage::{ContentStore, ScanIter, ScanOrder, WriteBatch};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Result cap of [`ChannelsRepo::list_posts_in_channel`].
pub const LIST_POSTS_LIMIT: usize = 100;

/// Maximum markdown body size in bytes (100 KB).
pub const MAX_MARKDOWN_SIZE: usize = 100 * 1024;

/// Maximum command tag length.
pub const MAX_COMMAND_TYPE_LEN: usize = 64;

/// Repository of the channels and posts of one organization.
///
/// Cloning is cheap; clones share the store and the timestamp sequence.
#[derive(Debug, Clone)]
pub struct ChannelsRepo {
    store: Arc<dyn ContentStore>,
    org: OrgId,
    clock: Arc<dyn Clock>,
    stamp: Arc<MonotonicStamp>,
}

impl ChannelsRepo {
    /// Creates a repository over `store` for `org`, stamping posts with wall-clock time.
    pub fn new(store: Arc<dyn ContentStore>, org: OrgId) -> Self {
        Self::with_clock(store, org, Arc::new(SystemClock))
    }

    /// Creates a repository with an explicit clock.
    pub fn with_clock(store: Arc<dyn ContentStore>, org: OrgId, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            org,
            clock,
            stamp: Arc::new(MonotonicStamp::new()),
        }
    }

    /// The organization this repository is rooted at.
    pub fn org(&self) -> &OrgId {
        &self.org
    }

    /// Derives the slug index key for `slug`. Pure, no I/O.
    pub fn channel_slug_key_for(&self, slug: &str) -> Key {
        channel_slug_key_for(&self.org, slug)
    }

    /// Looks up the slug index record.
    ///
    /// Returns `Ok(None)` when the slug is not registered. Storage failures
    /// are errors, never folded into `None`.
    pub fn channel_content_key_for(
        &self,
        ctx: &RequestContext,
        slug: &str,
    ) -> Result<Option<ChannelId>> {
        ctx.check()?;
        let slug_key = self.channel_slug_key_for(slug);
        let record: Option<ChannelSlug> = self.load(&slug_key)?;
        Ok(record.map(|r| r.content_key))
    }

    /// Resolves a slug to the ancestor chain of its posts.
    pub fn resolve_channel(&self, ctx: &RequestContext, slug: &str) -> Result<ParentChain> {
        self.channel_content_key_for(ctx, slug)?
            .map(|channel| ParentChain::new(self.org.clone(), channel))
            .ok_or_else(|| ChannelStoreError::channel_not_found(slug))
    }

    /// Creates a channel.
    ///
    /// The content record and the slug index record are written in one
    /// atomic batch, so a slug never points at a missing channel and no
    /// channel is left unreachable by slug.
    pub fn create_channel(&self, ctx: &RequestContext, slug: &str) -> Result<ChannelContent> {
        ctx.check()?;
        validate_slug(slug)?;

        let slug_key = self.channel_slug_key_for(slug);
        if self.store.get(slug_key.as_bytes())?.is_some() {
            return Err(ChannelStoreError::ChannelExists(slug.to_string()));
        }

        let id = ChannelId::new(self.store.allocate_id(KIND_CHANNEL_CONTENT)?);
        let channel = ChannelContent {
            id,
            slug: slug.to_string(),
            description: String::new(),
        };
        let content_key = channel_content_key_for(&self.org, id);

        let mut batch = WriteBatch::new();
        batch.put(content_key.as_bytes(), encode(&channel.to_stored())?);
        batch.put(slug_key.as_bytes(), encode(&ChannelSlug { content_key: id })?);

        ctx.check()?;
        self.store.write(batch)?;

        info!(org = %self.org, slug = slug, channel = %id, "Created channel");
        Ok(channel)
    }

    /// Loads the base info for a channel.
    pub fn get_channel_info(&self, ctx: &RequestContext, slug: &str) -> Result<ChannelContent> {
        let chain = self.resolve_channel(ctx, slug)?;
        ctx.check()?;
        let stored: Option<StoredChannelContent> = self.load(&chain.channel_key())?;
        stored
            .map(|stored| ChannelContent::from_stored(chain.channel(), stored))
            .ok_or_else(|| ChannelStoreError::channel_not_found(slug))
    }

    /// Lists every channel of the organization, ordered by slug.
    pub fn list_channels(&self, ctx: &RequestContext) -> Result<Vec<ChannelContent>> {
        ctx.check()?;
        let prefix = self.org.root_key().children_prefix(KIND_CHANNEL_SLUG);

        let mut ids = Vec::new();
        for row in self.store.scan(&prefix, ScanOrder::Key, usize::MAX)? {
            ctx.check()?;
            let (_, value) = row?;
            let record: ChannelSlug = decode(&value)?;
            ids.push(record.content_key);
        }

        let mut channels = Vec::with_capacity(ids.len());
        for id in ids {
            ctx.check()?;
            let key = channel_content_key_for(&self.org, id);
            if let Some(stored) = self.load::<StoredChannelContent>(&key)? {
                channels.push(ChannelContent::from_stored(id, stored));
            }
        }
        Ok(channels)
    }

    /// Creates a root post in the channel.
    pub fn create_post(
        &self,
        ctx: &RequestContext,
        channel_slug: &str,
        markdown_source: &str,
    ) -> Result<Post> {
        self.create_post_with(ctx, channel_slug, NewPost::root(markdown_source))
    }

    /// Creates a reply to `parent` in the channel.
    pub fn create_reply(
        &self,
        ctx: &RequestContext,
        channel_slug: &str,
        parent: PostId,
        markdown_source: &str,
    ) -> Result<Post> {
        self.create_post_with(ctx, channel_slug, NewPost::reply(parent, markdown_source))
    }

    /// Creates a post from a full description.
    ///
    /// A parent, when given, must be a post of the same channel.
    pub fn create_post_with(
        &self,
        ctx: &RequestContext,
        channel_slug: &str,
        new_post: NewPost,
    ) -> Result<Post> {
        validate_new_post(&new_post)?;
        let chain = self.resolve_channel(ctx, channel_slug)?;

        if let Some(parent) = new_post.parent_post_id {
            ctx.check()?;
            if self.store.get(post_key_for(&chain, parent).as_bytes())?.is_none() {
                return Err(ChannelStoreError::post_not_found(channel_slug, parent));
            }
        }

        let id = PostId::new(self.store.allocate_id(KIND_POST)?);
        let post = Post {
            id,
            chain: chain.clone(),
            created_at: self.stamp.next(self.clock.as_ref()),
            parent_post_id: new_post.parent_post_id,
            command_type: new_post.command_type.unwrap_or_default(),
            content: MarkdownDocument::new(new_post.markdown_source),
            replies: None,
        };

        let key = post_key_for(&chain, id);
        let mut batch = WriteBatch::new();
        batch.put_ordered(
            key.as_bytes(),
            encode(&post.to_stored())?,
            &posts_scope(&chain),
            post.created_at,
        );

        ctx.check()?;
        self.store.write(batch)?;

        debug!(
            channel = channel_slug,
            post = %id,
            created_at = post.created_at,
            is_reply = post.parent_post_id.is_some(),
            "Created post"
        );
        Ok(post)
    }

    /// Loads one post of the channel.
    pub fn get_post(&self, ctx: &RequestContext, channel_slug: &str, id: PostId) -> Result<Post> {
        let chain = self.resolve_channel(ctx, channel_slug)?;
        ctx.check()?;
        let stored: Option<StoredPost> = self.load(&post_key_for(&chain, id))?;
        stored
            .map(|stored| Post::from_stored(chain, id, stored))
            .ok_or_else(|| ChannelStoreError::post_not_found(channel_slug, id))
    }

    /// Lists up to [`LIST_POSTS_LIMIT`] posts of the channel in store order.
    ///
    /// No reply grouping is applied.
    pub fn list_posts_in_channel(
        &self,
        ctx: &RequestContext,
        channel_slug: &str,
    ) -> Result<Vec<Post>> {
        let chain = self.resolve_channel(ctx, channel_slug)?;
        self.scan_posts(ctx, &chain, ScanOrder::Key, LIST_POSTS_LIMIT)?
            .collect()
    }

    /// Starts an ancestor-scoped scan of the posts under `chain`.
    ///
    /// `ScanOrder::Key` walks records in creation order, `ScanOrder::Descending`
    /// walks the created-at index newest first.
    pub(crate) fn scan_posts(
        &self,
        ctx: &RequestContext,
        chain: &ParentChain,
        order: ScanOrder,
        limit: usize,
    ) -> Result<PostScan<'_>> {
        ctx.check()?;
        let prefix = match order {
            ScanOrder::Key => chain.channel_key().children_prefix(KIND_POST),
            ScanOrder::Descending => posts_scope(chain),
        };
        let rows = self.store.scan(&prefix, order, limit)?;
        Ok(PostScan {
            rows,
            ctx: ctx.clone(),
            chain: chain.clone(),
            scanned: 0,
            done: false,
        })
    }

    fn load<T: DeserializeOwned>(&self, key: &Key) -> Result<Option<T>> {
        match self.store.get(key.as_bytes())? {
            Some(bytes) => decode(&bytes).map(Some),
            None => Ok(None),
        }
    }
}

/// Lazy, fused iterator over decoded posts of one scan.
///
/// The request context is checked before every row. The first error is
/// yielded once and ends the iteration.
pub struct PostScan<'a> {
    rows: ScanIter<'a>,
    ctx: RequestContext,
    chain: ParentChain,
    scanned: usize,
    done: bool,
}

impl PostScan<'_> {
    /// Number of posts decoded so far.
    pub fn scanned(&self) -> usize {
        self.scanned
    }

    fn decode_row(&self, key: &[u8], value: &[u8]) -> Result<Post> {
        let key = Key::from_bytes(key)?;
        if key.kind() != KIND_POST {
            return Err(ChannelStoreError::storage(format!(
                "Scan yielded non-post record {}",
                key
            )));
        }
        let id = key
            .last_id()
            .map(PostId::new)
            .ok_or_else(|| ChannelStoreError::storage(format!("Malformed post key {}", key)))?;
        let stored: StoredPost = decode(value)?;
        Ok(Post::from_stored(self.chain.clone(), id, stored))
    }
}

impl Iterator for PostScan<'_> {
    type Item = Result<Post>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Err(e) = self.ctx.check() {
            self.done = true;
            return Some(Err(e));
        }

        let result = match self.rows.next() {
            Some(Ok((key, value))) => self.decode_row(&key, &value),
            Some(Err(e)) => Err(e),
            None => {
                self.done = true;
                return None;
            }
        };

        match result {
            Ok(post) => {
                self.scanned += 1;
                Some(Ok(post))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::fmt::Debug for PostScan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostScan")
            .field("chain", &self.chain)
            .field("scanned", &self.scanned)
            .field("done", &self.done)
            .finish()
    }
}

fn validate_new_post(new_post: &NewPost) -> Result<()> {
    if new_post.markdown_source.len() > MAX_MARKDOWN_SIZE {
        return Err(ChannelStoreError::invalid_input(format!(
            "Post content exceeds maximum size of {} bytes",
            MAX_MARKDOWN_SIZE
        )));
    }
    if let Some(command_type) = &new_post.command_type {
        if command_type.len() > MAX_COMMAND_TYPE_LEN {
            return Err(ChannelStoreError::invalid_input(format!(
                "Command type exceeds maximum length of {} characters",
                MAX_COMMAND_TYPE_LEN
            )));
        }
    }
    Ok(())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value)
        .map_err(|e| ChannelStoreError::serialization(format!("Failed to serialize: {}", e)))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes)
        .map_err(|e| ChannelStoreError::serialization(format!("Failed to deserialize: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn create_test_repo() -> (ChannelsRepo, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let repo = ChannelsRepo::with_clock(
            Arc::new(MemoryStore::new()),
            OrgId::new("acme").unwrap(),
            clock.clone(),
        );
        (repo, clock)
    }

    #[test]
    fn test_slug_roundtrip() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        let channel = repo.create_channel(&ctx, "news").unwrap();

        let resolved = repo.channel_content_key_for(&ctx, &channel.slug).unwrap();
        assert_eq!(resolved, Some(channel.id));
        assert_eq!(channel.description, "");
    }

    #[test]
    fn test_unregistered_slug_resolves_to_none() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        assert_eq!(repo.channel_content_key_for(&ctx, "nope").unwrap(), None);
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        repo.create_channel(&ctx, "news").unwrap();
        assert!(matches!(
            repo.create_channel(&ctx, "news"),
            Err(ChannelStoreError::ChannelExists(_))
        ));
    }

    #[test]
    fn test_invalid_slug_rejected() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        assert!(matches!(
            repo.create_channel(&ctx, "Bad Slug"),
            Err(ChannelStoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_created_at_strictly_increases() {
        let (repo, _clock) = create_test_repo();
        let ctx = RequestContext::new();
        repo.create_channel(&ctx, "news").unwrap();

        let a = repo.create_post(&ctx, "news", "a").unwrap();
        let b = repo.create_post(&ctx, "news", "b").unwrap();
        assert!(b.created_at > a.created_at);
    }

    #[test]
    fn test_empty_post_is_stored() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        repo.create_channel(&ctx, "news").unwrap();

        let post = repo.create_post(&ctx, "news", "").unwrap();
        let loaded = repo.get_post(&ctx, "news", post.id).unwrap();
        assert_eq!(loaded.content.source, "");
    }

    #[test]
    fn test_reply_to_post_in_other_channel_rejected() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        repo.create_channel(&ctx, "news").unwrap();
        repo.create_channel(&ctx, "random").unwrap();
        let elsewhere = repo.create_post(&ctx, "random", "hi").unwrap();

        let err = repo
            .create_reply(&ctx, "news", elsewhere.id, "reply")
            .unwrap_err();
        assert!(matches!(err, ChannelStoreError::PostNotFound { .. }));
    }

    #[test]
    fn test_cancelled_context_blocks_writes() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        ctx.cancel();
        assert!(matches!(
            repo.create_channel(&ctx, "news"),
            Err(ChannelStoreError::Cancelled)
        ));
        assert_eq!(
            repo.channel_content_key_for(&RequestContext::new(), "news")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_get_post() {
        let (repo, _) = create_test_repo();
        let ctx = RequestContext::new();
        repo.create_channel(&ctx, "news").unwrap();
        let created = repo
            .create_post_with(&ctx, "news", NewPost::root("body").with_command_type("web"))
            .unwrap();

        let loaded = repo.get_post(&ctx, "news", created.id).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.command_type, "web");

        assert!(repo
            .get_post(&ctx, "news", PostId::new(999))
            .unwrap_err()
            .is_not_found());
    }
}

//! Integration tests for the channels repository.
//!
//! These exercise the public API end to end against the in-memory store:
//! channel registration and lookup, post and reply creation, store-order
//! listing, and error propagation from a failing backend.

use channelstore::clock::ManualClock;
use channelstore::content::repository::MAX_MARKDOWN_SIZE;
use channelstore::content::{ChannelsRepo, NewPost, OrgId, PostId, LIST_POSTS_LIMIT};
use channelstore::storage::{ContentStore, MemoryStore, ScanIter, ScanOrder, WriteBatch};
use channelstore::{ChannelStoreError, RequestContext};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Helper to create a repository with a controllable clock.
fn create_test_repo() -> (ChannelsRepo, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_000));
    let repo = ChannelsRepo::with_clock(
        Arc::new(MemoryStore::new()),
        OrgId::new("acme").unwrap(),
        clock.clone(),
    );
    (repo, clock)
}

/// A store whose reads can be switched to fail.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_reads: AtomicBool,
}

impl ContentStore for FlakyStore {
    fn get(&self, key: &[u8]) -> channelstore::Result<Option<Vec<u8>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChannelStoreError::storage("disk on fire"));
        }
        self.inner.get(key)
    }

    fn write(&self, batch: WriteBatch) -> channelstore::Result<()> {
        self.inner.write(batch)
    }

    fn allocate_id(&self, sequence: &str) -> channelstore::Result<u64> {
        self.inner.allocate_id(sequence)
    }

    fn scan(
        &self,
        prefix: &[u8],
        order: ScanOrder,
        limit: usize,
    ) -> channelstore::Result<ScanIter<'_>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ChannelStoreError::storage("disk on fire"));
        }
        self.inner.scan(prefix, order, limit)
    }
}

// =============================================================================
// Channels
// =============================================================================

#[test]
fn test_create_channel_round_trip() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();

    let created = repo.create_channel(&ctx, "news").unwrap();
    assert_eq!(created.slug, "news");
    assert_eq!(created.description, "");

    let resolved = repo.channel_content_key_for(&ctx, "news").unwrap();
    assert_eq!(resolved, Some(created.id));

    let info = repo.get_channel_info(&ctx, "news").unwrap();
    assert_eq!(info, created);
}

#[test]
fn test_slug_key_is_deterministic() {
    let (repo, _) = create_test_repo();
    let a = repo.channel_slug_key_for("news");
    let b = repo.channel_slug_key_for("news");
    assert_eq!(a, b);
    assert_ne!(a, repo.channel_slug_key_for("sports"));
    assert!(repo.org().root_key().is_ancestor_of(&a));
}

#[test]
fn test_unknown_slug_is_channel_not_found() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();

    assert_eq!(repo.channel_content_key_for(&ctx, "ghost").unwrap(), None);

    let err = repo.get_channel_info(&ctx, "ghost").unwrap_err();
    assert!(matches!(err, ChannelStoreError::ChannelNotFound(ref s) if s == "ghost"));
    assert_eq!(err.to_string(), "No channel with slug: ghost");
    assert!(err.is_not_found());
}

#[test]
fn test_duplicate_channel_rejected() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();

    let first = repo.create_channel(&ctx, "news").unwrap();
    let err = repo.create_channel(&ctx, "news").unwrap_err();
    assert!(matches!(err, ChannelStoreError::ChannelExists(ref s) if s == "news"));

    assert_eq!(repo.get_channel_info(&ctx, "news").unwrap().id, first.id);
}

#[test]
fn test_invalid_slugs_rejected() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();

    let too_long = "x".repeat(65);
    for slug in ["", "News", "a/b", "has space", too_long.as_str()] {
        assert!(
            matches!(
                repo.create_channel(&ctx, slug),
                Err(ChannelStoreError::InvalidInput(_))
            ),
            "slug {:?} should be rejected",
            slug
        );
    }
}

#[test]
fn test_channels_are_scoped_by_org() {
    let store = Arc::new(MemoryStore::new());
    let acme = ChannelsRepo::new(store.clone(), OrgId::new("acme").unwrap());
    let globex = ChannelsRepo::new(store, OrgId::new("globex").unwrap());
    let ctx = RequestContext::new();

    acme.create_channel(&ctx, "news").unwrap();

    assert!(globex.get_channel_info(&ctx, "news").unwrap_err().is_not_found());
    globex.create_channel(&ctx, "news").unwrap();

    assert_eq!(acme.list_channels(&ctx).unwrap().len(), 1);
    assert_eq!(globex.list_channels(&ctx).unwrap().len(), 1);
}

#[test]
fn test_list_channels_sorted_by_slug() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();

    for slug in ["sports", "news", "weather"] {
        repo.create_channel(&ctx, slug).unwrap();
    }

    let slugs: Vec<String> = repo
        .list_channels(&ctx)
        .unwrap()
        .into_iter()
        .map(|c| c.slug)
        .collect();
    assert_eq!(slugs, vec!["news", "sports", "weather"]);
}

// =============================================================================
// Posts
// =============================================================================

#[test]
fn test_create_post_and_get() {
    let (repo, clock) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();

    clock.set(42_000);
    let post = repo.create_post(&ctx, "news", "# Hello").unwrap();

    assert!(post.is_root());
    assert_eq!(post.created_at, 42_000);
    assert_eq!(post.command_type, "");
    assert_eq!(post.content.source, "# Hello");
    assert_eq!(post.content.media_type().to_string(), "text/markdown");
    assert!(post.replies.is_none());

    let loaded = repo.get_post(&ctx, "news", post.id).unwrap();
    assert_eq!(loaded, post);
}

#[test]
fn test_create_post_with_command_type() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();

    let post = repo
        .create_post_with(&ctx, "news", NewPost::root("/web hi").with_command_type("web"))
        .unwrap();
    assert_eq!(post.command_type, "web");
}

#[test]
fn test_create_post_in_unknown_channel() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();

    let err = repo.create_post(&ctx, "ghost", "hello").unwrap_err();
    assert!(matches!(err, ChannelStoreError::ChannelNotFound(_)));
}

#[test]
fn test_blank_markdown_stored_and_oversized_rejected() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();

    for source in ["", "   \n\t"] {
        let post = repo.create_post(&ctx, "news", source).unwrap();
        assert_eq!(post.content.source, source);
        let loaded = repo.get_post(&ctx, "news", post.id).unwrap();
        assert_eq!(loaded.content.source, source);
    }
    assert_eq!(repo.list_posts_in_channel(&ctx, "news").unwrap().len(), 2);

    let huge = "x".repeat(MAX_MARKDOWN_SIZE + 1);
    assert!(matches!(
        repo.create_post(&ctx, "news", &huge),
        Err(ChannelStoreError::InvalidInput(_))
    ));
}

#[test]
fn test_created_at_strictly_increases_when_clock_stalls() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();

    let times: Vec<u64> = (0..5)
        .map(|i| repo.create_post(&ctx, "news", &format!("p{}", i)).unwrap().created_at)
        .collect();

    assert!(times.windows(2).all(|w| w[0] < w[1]), "{:?}", times);
}

#[test]
fn test_reply_requires_existing_parent_in_same_channel() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();
    repo.create_channel(&ctx, "sports").unwrap();

    let root = repo.create_post(&ctx, "news", "root").unwrap();
    let reply = repo.create_reply(&ctx, "news", root.id, "reply").unwrap();
    assert_eq!(reply.parent_post_id, Some(root.id));
    assert!(!reply.is_root());

    let err = repo
        .create_reply(&ctx, "news", PostId::new(9_999), "orphan")
        .unwrap_err();
    assert!(matches!(err, ChannelStoreError::PostNotFound { .. }));

    let err = repo.create_reply(&ctx, "sports", root.id, "cross").unwrap_err();
    assert!(matches!(err, ChannelStoreError::PostNotFound { .. }));
}

#[test]
fn test_list_posts_in_channel_returns_all() {
    let (repo, clock) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();
    repo.create_channel(&ctx, "sports").unwrap();

    let mut created = HashSet::new();
    for i in 0..20 {
        clock.advance(10);
        created.insert(repo.create_post(&ctx, "news", &format!("n{}", i)).unwrap().id);
        repo.create_post(&ctx, "sports", "other").unwrap();
    }

    let listed = repo.list_posts_in_channel(&ctx, "news").unwrap();
    let ids: HashSet<PostId> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, created);
    assert!(listed.iter().all(|p| p.replies.is_none()));
}

#[test]
fn test_list_posts_in_channel_is_capped() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();

    for i in 0..LIST_POSTS_LIMIT + 5 {
        repo.create_post(&ctx, "news", &format!("p{}", i)).unwrap();
    }

    assert_eq!(
        repo.list_posts_in_channel(&ctx, "news").unwrap().len(),
        LIST_POSTS_LIMIT
    );
}

#[test]
fn test_list_posts_in_empty_and_unknown_channel() {
    let (repo, _) = create_test_repo();
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();

    assert!(repo.list_posts_in_channel(&ctx, "news").unwrap().is_empty());
    assert!(repo
        .list_posts_in_channel(&ctx, "ghost")
        .unwrap_err()
        .is_not_found());
}

// =============================================================================
// Failure propagation
// =============================================================================

#[test]
fn test_storage_errors_are_not_folded_into_not_found() {
    let store = Arc::new(FlakyStore::default());
    let repo = ChannelsRepo::new(store.clone(), OrgId::new("acme").unwrap());
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();

    store.fail_reads.store(true, Ordering::SeqCst);

    assert!(matches!(
        repo.channel_content_key_for(&ctx, "news"),
        Err(ChannelStoreError::Storage(_))
    ));
    assert!(matches!(
        repo.get_channel_info(&ctx, "news"),
        Err(ChannelStoreError::Storage(_))
    ));
    assert!(matches!(
        repo.list_posts_in_channel(&ctx, "news"),
        Err(ChannelStoreError::Storage(_))
    ));
}

#[test]
fn test_cancelled_context_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let repo = ChannelsRepo::new(store.clone(), OrgId::new("acme").unwrap());
    let ctx = RequestContext::new();
    ctx.cancel();

    assert!(matches!(
        repo.create_channel(&ctx, "news"),
        Err(ChannelStoreError::Cancelled)
    ));
    assert_eq!(store.record_count(), 0);
}

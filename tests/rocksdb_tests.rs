//! Persistence tests for the RocksDB backend.
#![cfg(feature = "rocksdb")]

use channelstore::content::{ChannelsRepo, OrgId, PostsConnectionOptions};
use channelstore::export;
use channelstore::storage::{ContentStore, RocksDbStore};
use channelstore::RequestContext;
use std::sync::Arc;
use tempfile::TempDir;

fn open_repo(dir: &TempDir) -> ChannelsRepo {
    let store: Arc<dyn ContentStore> = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    ChannelsRepo::new(store, OrgId::new("acme").unwrap())
}

#[test]
fn test_channels_and_posts_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let ctx = RequestContext::new();

    let (channel, root, reply) = {
        let repo = open_repo(&dir);
        let channel = repo.create_channel(&ctx, "news").unwrap();
        let root = repo.create_post(&ctx, "news", "root").unwrap();
        let reply = repo.create_reply(&ctx, "news", root.id, "reply").unwrap();
        (channel, root, reply)
    };

    let repo = open_repo(&dir);
    assert_eq!(repo.get_channel_info(&ctx, "news").unwrap(), channel);
    assert_eq!(repo.get_post(&ctx, "news", root.id).unwrap(), root);

    let connection = repo.posts_connection(PostsConnectionOptions::threaded("news", 10));
    let posts = export::all(&connection, &ctx).unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, root.id);
    assert_eq!(posts[0].replies().len(), 1);
    assert_eq!(posts[0].replies()[0].id, reply.id);
}

#[test]
fn test_ids_keep_increasing_after_reopen() {
    let dir = TempDir::new().unwrap();
    let ctx = RequestContext::new();

    let first = {
        let repo = open_repo(&dir);
        repo.create_channel(&ctx, "news").unwrap();
        repo.create_post(&ctx, "news", "one").unwrap()
    };

    let repo = open_repo(&dir);
    let second = repo.create_post(&ctx, "news", "two").unwrap();
    assert!(second.id > first.id);

    let listed = repo.list_posts_in_channel(&ctx, "news").unwrap();
    assert_eq!(listed.len(), 2);
}

#[test]
fn test_flat_enumeration_order_on_disk() {
    let dir = TempDir::new().unwrap();
    let repo = open_repo(&dir);
    let ctx = RequestContext::new();
    repo.create_channel(&ctx, "news").unwrap();
    repo.create_channel(&ctx, "sports").unwrap();

    for i in 0..25 {
        repo.create_post(&ctx, "news", &format!("news {}", i)).unwrap();
        repo.create_post(&ctx, "sports", &format!("sports {}", i)).unwrap();
    }

    let connection = repo.posts_connection(PostsConnectionOptions::flat("news", 10));
    let posts = export::all(&connection, &ctx).unwrap();

    assert_eq!(posts.len(), 10);
    assert_eq!(posts[0].content.source, "news 24");
    assert!(posts.windows(2).all(|w| w[0].created_at > w[1].created_at));
    assert!(posts.iter().all(|p| p.content.source.starts_with("news")));
}

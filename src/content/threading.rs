//! Two-level reply threading over a time-ordered post sequence.
//!
//! Input is a window of posts ordered newest first, as produced by a
//! descending created-at scan. Output is the root posts of that window in the
//! same order, each carrying its direct replies oldest first.
//!
//! A reply is only ever visible under its root. Replies whose parent is not a
//! root of the window (the parent fell outside the scan cap, or the parent is
//! itself a reply) are dropped and counted.

use crate::content::keys::PostId;
use crate::content::types::Post;
use std::collections::HashMap;

/// Result of [`thread_replies`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadedPosts {
    /// Root posts, newest first, each with `replies` set.
    pub roots: Vec<Post>,
    /// Replies that could not be attached to a root in the window.
    pub dropped_replies: usize,
}

/// Groups a newest-first window into roots with attached replies.
///
/// Single forward pass: roots are kept in input order and replies are
/// appended to a per-parent group (so each group is newest first). A finalize
/// pass reverses each group in place and attaches it to its root.
pub fn thread_replies<I>(posts: I) -> ThreadedPosts
where
    I: IntoIterator<Item = Post>,
{
    let mut roots: Vec<Post> = Vec::new();
    let mut replies: HashMap<PostId, Vec<Post>> = HashMap::new();
    let mut reply_count = 0usize;

    for post in posts {
        match post.parent_post_id {
            Some(parent) => {
                reply_count += 1;
                replies.entry(parent).or_default().push(post);
            }
            None => roots.push(post),
        }
    }

    let mut attached = 0usize;
    for root in roots.iter_mut() {
        let mut group = replies.remove(&root.id).unwrap_or_default();
        group.reverse();
        attached += group.len();
        root.replies = Some(group);
    }

    ThreadedPosts {
        roots,
        dropped_replies: reply_count - attached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::keys::{ChannelId, OrgId, ParentChain};
    use crate::content::types::MarkdownDocument;

    fn post(id: u64, created_at: u64, parent: Option<u64>) -> Post {
        Post {
            id: PostId::new(id),
            chain: ParentChain::new(OrgId::new("acme").unwrap(), ChannelId::new(1)),
            created_at,
            parent_post_id: parent.map(PostId::new),
            command_type: String::new(),
            content: MarkdownDocument::new(format!("post {}", id)),
            replies: None,
        }
    }

    fn ids(posts: &[Post]) -> Vec<u64> {
        posts.iter().map(|p| p.id.get()).collect()
    }

    #[test]
    fn test_reference_scenario() {
        // A(t=3), B(t=1) roots; C(parent A, t=4), D(parent A, t=2).
        let (a, b, c, d) = (1, 2, 3, 4);
        let window = vec![
            post(c, 4, Some(a)),
            post(a, 3, None),
            post(d, 2, Some(a)),
            post(b, 1, None),
        ];

        let threaded = thread_replies(window);

        assert_eq!(ids(&threaded.roots), vec![a, b]);
        assert_eq!(ids(threaded.roots[0].replies()), vec![d, c]);
        assert!(threaded.roots[1].replies().is_empty());
        assert!(threaded.roots[1].replies.is_some());
        assert_eq!(threaded.dropped_replies, 0);
    }

    #[test]
    fn test_reply_outside_window_is_dropped() {
        // Parent 9 is not in the window.
        let window = vec![post(2, 5, Some(9)), post(1, 4, None)];
        let threaded = thread_replies(window);

        assert_eq!(ids(&threaded.roots), vec![1]);
        assert!(threaded.roots[0].replies().is_empty());
        assert_eq!(threaded.dropped_replies, 1);
    }

    #[test]
    fn test_reply_to_reply_is_dropped() {
        let window = vec![
            post(3, 3, Some(2)),
            post(2, 2, Some(1)),
            post(1, 1, None),
        ];
        let threaded = thread_replies(window);

        assert_eq!(ids(&threaded.roots), vec![1]);
        assert_eq!(ids(threaded.roots[0].replies()), vec![2]);
        assert_eq!(threaded.dropped_replies, 1);
    }

    #[test]
    fn test_empty_window() {
        let threaded = thread_replies(Vec::new());
        assert!(threaded.roots.is_empty());
        assert_eq!(threaded.dropped_replies, 0);
    }

    #[test]
    fn test_only_replies() {
        let threaded = thread_replies(vec![post(2, 2, Some(1)), post(3, 1, Some(1))]);
        assert!(threaded.roots.is_empty());
        assert_eq!(threaded.dropped_replies, 2);
    }
}

//! Connection enumerator: a channel's posts as a flat or threaded stream.
//!
//! One enumeration issues exactly one ancestor-scoped scan, ordered by
//! `created_at` descending and capped at `max_count`:
//!
//! - **flat** (`include_replies = false`): every scanned post is yielded as
//!   soon as it is read, newest first.
//! - **threaded** (`include_replies = true`): the whole capped window is
//!   buffered on the first pull, then the roots are yielded newest first, each
//!   with its replies attached oldest first. See [`thread_replies`].
//!
//! The scan is ancestor-wide rather than filtered on the parent, so roots and
//! replies share the cap. A reply whose root lies beyond the cap is dropped
//! and counted in [`EnumerationStats::dropped_replies`].
//!
//! [`thread_replies`]: crate::content::threading::thread_replies

use crate::content::repository::{ChannelsRepo, PostScan};
use crate::content::threading::thread_replies;
use crate::content::types::Post;
use crate::context::RequestContext;
use crate::error::{ChannelStoreError, Result};
use crate::storage::ScanOrder;
use std::collections::VecDeque;
use tracing::debug;

/// What to enumerate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsConnectionOptions {
    /// Slug of the channel to scan.
    pub channel_slug: String,
    /// Group replies under their roots instead of streaming every post.
    pub include_replies: bool,
    /// Cap on scanned posts (roots and replies together).
    pub max_count: usize,
}

impl PostsConnectionOptions {
    /// Flat enumeration of up to `max_count` posts.
    pub fn flat(channel_slug: impl Into<String>, max_count: usize) -> Self {
        Self {
            channel_slug: channel_slug.into(),
            include_replies: false,
            max_count,
        }
    }

    /// Threaded enumeration over a window of up to `max_count` posts.
    pub fn threaded(channel_slug: impl Into<String>, max_count: usize) -> Self {
        Self {
            channel_slug: channel_slug.into(),
            include_replies: true,
            max_count,
        }
    }
}

/// Counters describing one finished enumeration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnumerationStats {
    /// Posts read from the scan.
    pub scanned: usize,
    /// Top-level posts emitted.
    pub emitted: usize,
    /// Replies left out because their root was not in the window.
    pub dropped_replies: usize,
}

/// A channel's posts, enumerable any number of times.
///
/// Each call to [`stream`](Self::stream) or [`enumerate`](Self::enumerate)
/// issues a fresh scan.
#[derive(Debug, Clone)]
pub struct PostsConnection<'r> {
    repo: &'r ChannelsRepo,
    options: PostsConnectionOptions,
}

impl<'r> PostsConnection<'r> {
    /// Creates a connection over `repo`.
    pub fn new(repo: &'r ChannelsRepo, options: PostsConnectionOptions) -> Self {
        Self { repo, options }
    }

    /// The options this connection enumerates with.
    pub fn options(&self) -> &PostsConnectionOptions {
        &self.options
    }

    /// Resolves the channel and starts the scan.
    ///
    /// Fails with `ChannelNotFound` before scanning if the slug does not
    /// resolve. The returned stream is finite and cannot be restarted. A zero
    /// `max_count` yields an empty stream without touching the post index.
    pub fn stream(&self, ctx: &RequestContext) -> Result<PostStream<'r>> {
        let chain = self.repo.resolve_channel(ctx, &self.options.channel_slug)?;
        if self.options.max_count == 0 {
            return Ok(PostStream::empty(self.options.channel_slug.clone()));
        }

        let scan = self
            .repo
            .scan_posts(ctx, &chain, ScanOrder::Descending, self.options.max_count)?;

        let mode = if self.options.include_replies {
            Mode::Threaded {
                scan: Some(scan),
                roots: VecDeque::new(),
            }
        } else {
            Mode::Flat { scan }
        };

        Ok(PostStream {
            mode,
            stats: EnumerationStats::default(),
            slug: self.options.channel_slug.clone(),
            finished: false,
        })
    }

    /// Invokes `use_post` for every emitted post, in order.
    ///
    /// On error, posts already handed to `use_post` stay delivered.
    pub fn enumerate<F>(&self, ctx: &RequestContext, mut use_post: F) -> Result<EnumerationStats>
    where
        F: FnMut(Post),
    {
        let mut stream = self.stream(ctx)?;
        for post in stream.by_ref() {
            use_post(post?);
        }
        Ok(stream.stats())
    }
}

enum Mode<'r> {
    Flat {
        scan: PostScan<'r>,
    },
    Threaded {
        scan: Option<PostScan<'r>>,
        roots: VecDeque<Post>,
    },
}

/// Lazy sequence of posts from one enumeration.
///
/// Yields `Err` at most once, after which it is exhausted.
pub struct PostStream<'r> {
    mode: Mode<'r>,
    stats: EnumerationStats,
    slug: String,
    finished: bool,
}

impl PostStream<'_> {
    /// Counters so far. Final once the stream returns `None`.
    pub fn stats(&self) -> EnumerationStats {
        self.stats
    }

    fn empty(slug: String) -> Self {
        Self {
            mode: Mode::Threaded {
                scan: None,
                roots: VecDeque::new(),
            },
            stats: EnumerationStats::default(),
            slug,
            finished: false,
        }
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            debug!(
                channel = %self.slug,
                scanned = self.stats.scanned,
                emitted = self.stats.emitted,
                dropped_replies = self.stats.dropped_replies,
                "Enumerated posts"
            );
        }
    }

    fn fail(&mut self, err: ChannelStoreError) -> Option<Result<Post>> {
        self.mode = Mode::Threaded {
            scan: None,
            roots: VecDeque::new(),
        };
        self.finish();
        Some(Err(err))
    }
}

impl Iterator for PostStream<'_> {
    type Item = Result<Post>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match &mut self.mode {
            Mode::Flat { scan } => match scan.next() {
                Some(Ok(post)) => {
                    self.stats.scanned += 1;
                    self.stats.emitted += 1;
                    Some(Ok(post))
                }
                Some(Err(e)) => self.fail(e),
                None => {
                    self.finish();
                    None
                }
            },
            Mode::Threaded { scan, roots } => {
                if let Some(scan) = scan.take() {
                    let window: Result<Vec<Post>> = scan.collect();
                    let window = match window {
                        Ok(window) => window,
                        Err(e) => return self.fail(e),
                    };
                    self.stats.scanned = window.len();
                    let threaded = thread_replies(window);
                    self.stats.dropped_replies = threaded.dropped_replies;
                    roots.extend(threaded.roots);
                }

                match roots.pop_front() {
                    Some(post) => {
                        self.stats.emitted += 1;
                        Some(Ok(post))
                    }
                    None => {
                        self.finish();
                        None
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for PostStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostStream")
            .field("channel", &self.slug)
            .field("stats", &self.stats)
            .field("finished", &self.finished)
            .finish()
    }
}

impl ChannelsRepo {
    /// Returns a connection over the posts of a channel.
    pub fn posts_connection(&self, options: PostsConnectionOptions) -> PostsConnection<'_> {
        PostsConnection::new(self, options)
    }
}

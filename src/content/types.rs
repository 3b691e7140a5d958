//! Records of the content hierarchy.
//!
//! Public types carry their identifiers; the `Stored*` records are what is
//! serialized. Identifiers live in the key, never in the record body, and a
//! post's `replies` are never persisted.

use crate::content::keys::{ChannelId, ParentChain, PostId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A media type such as `text/markdown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaType {
    /// Top-level type, e.g. `text`.
    pub base_type: String,
    /// Subtype, e.g. `markdown`.
    pub subtype: String,
    /// Optional `key=value` parameters.
    pub parameters: Vec<String>,
}

impl MediaType {
    /// Creates a media type.
    pub fn new(base_type: &str, subtype: &str, parameters: Vec<String>) -> Self {
        Self {
            base_type: base_type.to_string(),
            subtype: subtype.to_string(),
            parameters,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base_type, self.subtype)?;
        for parameter in &self.parameters {
            write!(f, "; {}", parameter)?;
        }
        Ok(())
    }
}

/// A text/markdown document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarkdownDocument {
    /// Markdown source text.
    pub source: String,
}

impl MarkdownDocument {
    /// Wraps markdown source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Always `text/markdown`.
    pub fn media_type(&self) -> MediaType {
        MediaType::new("text", "markdown", Vec::new())
    }
}

/// Secondary index record: slug -> channel content key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSlug {
    /// The channel this slug resolves to.
    pub content_key: ChannelId,
}

/// Stored body of a channel record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredChannelContent {
    pub slug: String,
    pub description: String,
}

/// The main data of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelContent {
    /// Store-assigned identifier.
    pub id: ChannelId,
    /// Denormalized copy of the slug.
    pub slug: String,
    /// Free-form description, empty at creation.
    pub description: String,
}

impl ChannelContent {
    pub(crate) fn from_stored(id: ChannelId, stored: StoredChannelContent) -> Self {
        Self {
            id,
            slug: stored.slug,
            description: stored.description,
        }
    }

    pub(crate) fn to_stored(&self) -> StoredChannelContent {
        StoredChannelContent {
            slug: self.slug.clone(),
            description: self.description.clone(),
        }
    }
}

/// Stored body of a post record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredPost {
    pub created_at: u64,
    pub parent_post_id: Option<PostId>,
    pub command_type: String,
    pub content: MarkdownDocument,
}

/// A post in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Store-assigned identifier.
    pub id: PostId,
    /// Organization and channel this post lives under.
    pub chain: ParentChain,
    /// Creation time in milliseconds since the Unix epoch.
    pub created_at: u64,
    /// The post this one replies to, `None` for root posts.
    pub parent_post_id: Option<PostId>,
    /// Optional command tag, empty when unset.
    pub command_type: String,
    /// Markdown body.
    pub content: MarkdownDocument,
    /// Replies, oldest first. Only set on roots emitted by a threaded
    /// enumeration.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub replies: Option<Vec<Post>>,
}

impl Post {
    pub(crate) fn from_stored(chain: ParentChain, id: PostId, stored: StoredPost) -> Self {
        Self {
            id,
            chain,
            created_at: stored.created_at,
            parent_post_id: stored.parent_post_id,
            command_type: stored.command_type,
            content: stored.content,
            replies: None,
        }
    }

    pub(crate) fn to_stored(&self) -> StoredPost {
        StoredPost {
            created_at: self.created_at,
            parent_post_id: self.parent_post_id,
            command_type: self.command_type.clone(),
            content: self.content.clone(),
        }
    }

    /// Returns true if this post has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_post_id.is_none()
    }

    /// Returns the attached replies, or an empty slice.
    pub fn replies(&self) -> &[Post] {
        self.replies.as_deref().unwrap_or(&[])
    }
}

/// Input for creating a post.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPost {
    /// Markdown source of the post body.
    pub markdown_source: String,
    /// Post being replied to.
    pub parent_post_id: Option<PostId>,
    /// Optional command tag.
    pub command_type: Option<String>,
}

impl NewPost {
    /// A root post with the given body.
    pub fn root(markdown_source: impl Into<String>) -> Self {
        Self {
            markdown_source: markdown_source.into(),
            ..Self::default()
        }
    }

    /// A reply to `parent`.
    pub fn reply(parent: PostId, markdown_source: impl Into<String>) -> Self {
        Self {
            markdown_source: markdown_source.into(),
            parent_post_id: Some(parent),
            command_type: None,
        }
    }

    /// Sets the command tag.
    pub fn with_command_type(mut self, command_type: impl Into<String>) -> Self {
        self.command_type = Some(command_type.into());
        self
    }
}

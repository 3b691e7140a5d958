//! Hierarchical keys and typed identifiers.
//!
//! Every record key is a `/`-joined chain of `Kind:ident` segments anchored
//! at an organization root:
//!
//! ```text
//! Org:{org}/ChannelSlug:{slug}
//! Org:{org}/ChannelContent:{channel id, 16 hex}
//! Org:{org}/ChannelContent:{channel id, 16 hex}/Post:{post id, 16 hex}
//! ```
//!
//! Numeric identifiers are fixed-width lowercase hex so byte order equals
//! numeric order. Key derivation is pure and infallible; names are validated
//! when an [`OrgId`] is built or a channel is created.

use crate::error::{ChannelStoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind name of organization roots.
pub const KIND_ORG: &str = "Org";
/// Kind name of slug index records.
pub const KIND_CHANNEL_SLUG: &str = "ChannelSlug";
/// Kind name of channel records.
pub const KIND_CHANNEL_CONTENT: &str = "ChannelContent";
/// Kind name of post records.
pub const KIND_POST: &str = "Post";

/// Maximum length of a slug or organization name.
pub const MAX_NAME_LEN: usize = 64;

const SEGMENT_SEPARATOR: char = '/';
const KIND_SEPARATOR: char = ':';

/// An organization name, the root anchor of every key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrgId(String);

impl OrgId {
    /// Validates and wraps an organization name.
    ///
    /// Allowed characters are ASCII letters, digits, `_`, `-` and `.`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name("organization", &name, |c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')
        })?;
        Ok(Self(name))
    }

    /// The organization used when none is configured.
    pub fn default_org() -> Self {
        Self(crate::config::DEFAULT_ORG.to_string())
    }

    /// Returns the organization name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the root key of this organization.
    pub fn root_key(&self) -> Key {
        Key::root(KIND_ORG, &self.0)
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store-assigned identifier of a channel's content record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(u64);

impl ChannelId {
    /// Wraps a raw identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Store-assigned identifier of a post, unique within its organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostId(u64);

impl PostId {
    /// Wraps a raw identifier.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Parses the 16-digit hex form produced by `Display`.
    pub fn parse(s: &str) -> Result<Self> {
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| ChannelStoreError::invalid_input(format!("Invalid post id: {}", s)))
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// The explicit ancestor chain of a post: organization root, then channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentChain {
    org: OrgId,
    channel: ChannelId,
}

impl ParentChain {
    /// Creates the chain for posts in `channel`.
    pub fn new(org: OrgId, channel: ChannelId) -> Self {
        Self { org, channel }
    }

    /// The organization at the root of the chain.
    pub fn org(&self) -> &OrgId {
        &self.org
    }

    /// The channel every post under this chain belongs to.
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Key of the channel content record.
    pub fn channel_key(&self) -> Key {
        channel_content_key_for(&self.org, self.channel)
    }
}

/// An encoded hierarchical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    fn root(kind: &str, ident: &str) -> Self {
        Self(format!("{}{}{}", kind, KIND_SEPARATOR, ident))
    }

    /// Returns a child key with a named identifier.
    pub fn child_named(&self, kind: &str, name: &str) -> Self {
        Self(format!(
            "{}{}{}{}{}",
            self.0, SEGMENT_SEPARATOR, kind, KIND_SEPARATOR, name
        ))
    }

    /// Returns a child key with a numeric identifier.
    pub fn child_id(&self, kind: &str, id: u64) -> Self {
        Self(format!(
            "{}{}{}{}{:016x}",
            self.0, SEGMENT_SEPARATOR, kind, KIND_SEPARATOR, id
        ))
    }

    /// Returns the prefix matching every direct child of `kind` under this key.
    pub fn children_prefix(&self, kind: &str) -> Vec<u8> {
        format!("{}{}{}{}", self.0, SEGMENT_SEPARATOR, kind, KIND_SEPARATOR).into_bytes()
    }

    /// Returns the numeric identifier of the last segment, if it has one.
    pub fn last_id(&self) -> Option<u64> {
        let last = self.0.rsplit(SEGMENT_SEPARATOR).next()?;
        let (_, ident) = last.split_once(KIND_SEPARATOR)?;
        if ident.len() != 16 {
            return None;
        }
        u64::from_str_radix(ident, 16).ok()
    }

    /// Returns the kind of the last segment.
    pub fn kind(&self) -> &str {
        self.0
            .rsplit(SEGMENT_SEPARATOR)
            .next()
            .and_then(|segment| segment.split_once(KIND_SEPARATOR))
            .map(|(kind, _)| kind)
            .unwrap_or("")
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        other.0.len() > self.0.len()
            && other.0.starts_with(&self.0)
            && other.0.as_bytes()[self.0.len()] == SEGMENT_SEPARATOR as u8
    }

    /// Returns the encoded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Decodes a key read back from storage.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        std::str::from_utf8(bytes)
            .map(|s| Self(s.to_string()))
            .map_err(|_| ChannelStoreError::storage("Stored key is not valid UTF-8"))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the slug index key for `slug` under the organization root.
pub fn channel_slug_key_for(org: &OrgId, slug: &str) -> Key {
    org.root_key().child_named(KIND_CHANNEL_SLUG, slug)
}

/// Derives the key of a channel content record.
pub fn channel_content_key_for(org: &OrgId, channel: ChannelId) -> Key {
    org.root_key().child_id(KIND_CHANNEL_CONTENT, channel.get())
}

/// Derives the key of a post record.
pub fn post_key_for(chain: &ParentChain, post: PostId) -> Key {
    chain.channel_key().child_id(KIND_POST, post.get())
}

/// Returns the order-index scope of the posts in a channel.
pub fn posts_scope(chain: &ParentChain) -> Vec<u8> {
    let mut scope = chain.channel_key().as_bytes().to_vec();
    scope.push(SEGMENT_SEPARATOR as u8);
    scope.extend_from_slice(KIND_POST.as_bytes());
    scope
}

/// Validates a channel slug: 1–64 characters of `[a-z0-9_-]`.
pub fn validate_slug(slug: &str) -> Result<()> {
    validate_name("slug", slug, |c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-')
    })
}

fn validate_name(what: &str, name: &str, allowed: impl Fn(char) -> bool) -> Result<()> {
    if name.is_empty() {
        return Err(ChannelStoreError::invalid_input(format!(
            "{} cannot be empty",
            what
        )));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ChannelStoreError::invalid_input(format!(
            "{} exceeds maximum length of {} characters",
            what, MAX_NAME_LEN
        )));
    }
    if let Some(bad) = name.chars().find(|c| !allowed(*c)) {
        return Err(ChannelStoreError::invalid_input(format!(
            "{} '{}' contains invalid character '{}'",
            what, name, bad
        )));
    }
    Ok(())
}

//! Syndication feed export in JSON Feed 1.1 form.

use crate::content::PostsConnection;
use crate::context::RequestContext;
use crate::error::Result;
use crate::export::csv_writer::created_at_utc;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use tracing::debug;

/// Value of the feed's `version` member.
pub const JSON_FEED_VERSION: &str = "https://jsonfeed.org/version/1.1";

/// Title given to every feed item.
const ITEM_TITLE: &str = "Post";

/// Supplies the links of a generated feed.
pub trait FeedUrlMaker {
    /// Link to the feed's home page.
    fn url(&self) -> String;

    /// Link to one post, given its id in display form.
    fn item_url(&self, post_id: &str) -> String;

    /// Feed title.
    fn title(&self) -> String {
        "posts".to_string()
    }
}

/// Links of the form `{base}/{slug}` and `{base}/{slug}/posts/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFeedUrls {
    base_url: String,
    channel_slug: String,
}

impl ChannelFeedUrls {
    /// Creates links for `channel_slug` under `base_url`. A trailing `/` on
    /// the base is ignored.
    pub fn new(base_url: impl Into<String>, channel_slug: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            channel_slug: channel_slug.into(),
        }
    }
}

impl FeedUrlMaker for ChannelFeedUrls {
    fn url(&self) -> String {
        format!("{}/{}", self.base_url, self.channel_slug)
    }

    fn item_url(&self, post_id: &str) -> String {
        format!("{}/{}/posts/{}", self.base_url, self.channel_slug, post_id)
    }
}

fn rfc3339<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// A generated feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feed {
    /// Always [`JSON_FEED_VERSION`].
    pub version: &'static str,
    /// From [`FeedUrlMaker::title`].
    pub title: String,
    /// From [`FeedUrlMaker::url`].
    pub home_page_url: String,
    /// Empty for generated feeds.
    pub description: String,
    /// When the feed was generated. Not part of JSON Feed.
    #[serde(skip)]
    pub created: DateTime<Utc>,
    /// One item per emitted post, in enumeration order.
    pub items: Vec<FeedItem>,
}

/// One post in a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedItem {
    /// Post id in display form.
    pub id: String,
    /// From [`FeedUrlMaker::item_url`].
    pub url: String,
    /// Fixed item title.
    pub title: String,
    /// Raw markdown source of the post.
    pub content_text: String,
    /// Post creation time, rendered as RFC 3339 with milliseconds in UTC.
    #[serde(serialize_with = "rfc3339")]
    pub date_published: DateTime<Utc>,
}

impl Feed {
    /// Renders the feed as a JSON Feed 1.1 document.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds a feed with one item per emitted post.
pub fn make_feed<U: FeedUrlMaker + ?Sized>(
    connection: &PostsConnection<'_>,
    ctx: &RequestContext,
    url_maker: &U,
) -> Result<Feed> {
    let created = Utc::now();
    let mut items = Vec::new();
    for post in connection.stream(ctx)? {
        let post = post?;
        let id = post.id.to_string();
        items.push(FeedItem {
            url: url_maker.item_url(&id),
            id,
            title: ITEM_TITLE.to_string(),
            date_published: created_at_utc(post.created_at)?,
            content_text: post.content.source,
        });
    }

    debug!(
        channel = %connection.options().channel_slug,
        items = items.len(),
        "Built feed"
    );

    Ok(Feed {
        version: JSON_FEED_VERSION,
        title: url_maker.title(),
        home_page_url: url_maker.url(),
        description: String::new(),
        created,
        items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_feed_urls() {
        let urls = ChannelFeedUrls::new("https://example.com/", "news");
        assert_eq!(urls.url(), "https://example.com/news");
        assert_eq!(
            urls.item_url("0000000000000002"),
            "https://example.com/news/posts/0000000000000002"
        );
        assert_eq!(urls.title(), "posts");
    }

    #[test]
    fn test_feed_json_shape() {
        let feed = Feed {
            version: JSON_FEED_VERSION,
            title: "posts".to_string(),
            home_page_url: "https://example.com/news".to_string(),
            description: String::new(),
            created: Utc::now(),
            items: vec![FeedItem {
                id: "0000000000000001".to_string(),
                url: "https://example.com/news/posts/0000000000000001".to_string(),
                title: ITEM_TITLE.to_string(),
                content_text: "hello".to_string(),
                date_published: DateTime::<Utc>::from_timestamp_millis(1_000).unwrap(),
            }],
        };

        let value: serde_json::Value = serde_json::from_str(&feed.to_json().unwrap()).unwrap();
        assert_eq!(value["version"], JSON_FEED_VERSION);
        assert_eq!(value["items"][0]["title"], "Post");
        assert_eq!(value["items"][0]["date_published"], "1970-01-01T00:00:01.000Z");
        assert!(value.get("created").is_none());
    }
}

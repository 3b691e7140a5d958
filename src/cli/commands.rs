//! Command implementations for the channelstore CLI.

use crate::{
    cli::utils::{open_repo, open_store, output_writer},
    config::StoreConfig,
    content::{NewPost, Post, PostId, PostsConnectionOptions},
    export::{format_created_at, make_feed, write_to_csv, ChannelFeedUrls},
    Result,
};
use std::io::Write;
use std::path::Path;
use tracing::info;

fn print_post(post: &Post, indent: &str) -> Result<()> {
    let parent = post
        .parent_post_id
        .map(|id| format!(" (reply to {})", id))
        .unwrap_or_default();
    println!(
        "{}{}  {}{}",
        indent,
        post.id,
        format_created_at(post.created_at)?,
        parent
    );
    for line in post.content.source.lines() {
        println!("{}    {}", indent, line);
    }
    Ok(())
}

/// Execute create-channel command
pub fn create_channel(config: &StoreConfig, slug: &str) -> Result<()> {
    let repo = open_repo(config)?;
    let channel = repo.create_channel(&config.request_context(), slug)?;
    info!(
        org = %repo.org(),
        slug = %channel.slug,
        channel_id = %channel.id,
        "✅ Created channel"
    );
    Ok(())
}

/// Execute info command
pub fn info(config: &StoreConfig, slug: &str) -> Result<()> {
    let repo = open_repo(config)?;
    let channel = repo.get_channel_info(&config.request_context(), slug)?;
    println!("slug:        {}", channel.slug);
    println!("id:          {}", channel.id);
    println!("description: {}", channel.description);
    Ok(())
}

/// Execute channels command
pub fn channels(config: &StoreConfig) -> Result<()> {
    let repo = open_repo(config)?;
    let channels = repo.list_channels(&config.request_context())?;
    if channels.is_empty() {
        info!(org = %repo.org(), "No channels found");
        return Ok(());
    }
    for channel in &channels {
        println!("{}  {}", channel.id, channel.slug);
    }
    Ok(())
}

/// Execute post command
pub fn post(
    config: &StoreConfig,
    slug: &str,
    markdown: &str,
    command_type: Option<&str>,
) -> Result<()> {
    let repo = open_repo(config)?;
    let mut new_post = NewPost::root(markdown);
    if let Some(command_type) = command_type {
        new_post = new_post.with_command_type(command_type);
    }
    let post = repo.create_post_with(&config.request_context(), slug, new_post)?;
    info!(channel = slug, post_id = %post.id, "✅ Created post");
    println!("{}", post.id);
    Ok(())
}

/// Execute reply command
pub fn reply(config: &StoreConfig, slug: &str, parent: PostId, markdown: &str) -> Result<()> {
    let repo = open_repo(config)?;
    let post = repo.create_reply(&config.request_context(), slug, parent, markdown)?;
    info!(channel = slug, post_id = %post.id, parent = %parent, "✅ Created reply");
    println!("{}", post.id);
    Ok(())
}

/// Execute list command
pub fn list(config: &StoreConfig, slug: &str) -> Result<()> {
    let repo = open_repo(config)?;
    for post in repo.list_posts_in_channel(&config.request_context(), slug)? {
        print_post(&post, "")?;
    }
    Ok(())
}

fn connection_options(
    config: &StoreConfig,
    slug: &str,
    include_replies: bool,
    max_count: Option<usize>,
) -> PostsConnectionOptions {
    PostsConnectionOptions {
        channel_slug: slug.to_string(),
        include_replies,
        max_count: max_count.unwrap_or(config.max_count),
    }
}

/// Execute threads command
pub fn threads(config: &StoreConfig, slug: &str, max_count: Option<usize>) -> Result<()> {
    let repo = open_repo(config)?;
    let connection = repo.posts_connection(connection_options(config, slug, true, max_count));

    let mut stream = connection.stream(&config.request_context())?;
    for post in stream.by_ref() {
        let post = post?;
        print_post(&post, "")?;
        for reply in post.replies() {
            print_post(reply, "    ")?;
        }
    }

    let stats = stream.stats();
    if stats.dropped_replies > 0 {
        info!(
            dropped_replies = stats.dropped_replies,
            "Some replies belong to posts beyond --max"
        );
    }
    Ok(())
}

/// Execute export-csv command
pub fn export_csv(
    config: &StoreConfig,
    slug: &str,
    output: Option<&Path>,
    include_replies: bool,
    max_count: Option<usize>,
) -> Result<()> {
    let repo = open_repo(config)?;
    let connection =
        repo.posts_connection(connection_options(config, slug, include_replies, max_count));

    let stats = write_to_csv(&connection, &config.request_context(), output_writer(output)?)?;
    if let Some(path) = output {
        info!(file = %path.display(), rows = stats.emitted, "✅ Exported CSV");
    }
    Ok(())
}

/// Execute export-feed command
pub fn export_feed(
    config: &StoreConfig,
    slug: &str,
    output: Option<&Path>,
    max_count: Option<usize>,
) -> Result<()> {
    let repo = open_repo(config)?;
    let connection = repo.posts_connection(connection_options(config, slug, false, max_count));
    let urls = ChannelFeedUrls::new(config.feed_base_url.as_str(), slug);

    let feed = make_feed(&connection, &config.request_context(), &urls)?;
    let mut out = output_writer(output)?;
    out.write_all(feed.to_json()?.as_bytes())?;
    out.write_all(b"\n")?;
    out.flush()?;

    if let Some(path) = output {
        info!(file = %path.display(), items = feed.items.len(), "✅ Exported feed");
    }
    Ok(())
}

/// Execute stats command
#[cfg(feature = "rocksdb")]
pub fn stats(config: &StoreConfig) -> Result<()> {
    let store = open_store(config)?;
    println!("{}", store.handle().stats());
    Ok(())
}

/// Execute stats command
#[cfg(not(feature = "rocksdb"))]
pub fn stats(config: &StoreConfig) -> Result<()> {
    open_store(config).map(|_| ())
}

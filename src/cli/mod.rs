//! Command-line interface for channelstore.
//!
//! Thin front end over [`ChannelsRepo`](crate::content::ChannelsRepo) and the
//! export adapters. Configuration comes from the environment, see
//! [`StoreConfig`].

pub mod args;
pub mod commands;
pub mod utils;

use crate::config::StoreConfig;
use crate::Result;

pub use args::Command;

/// Runs a parsed command against the configured store
pub fn execute(config: &StoreConfig, command: Command) -> Result<()> {
    match command {
        Command::CreateChannel { slug } => commands::create_channel(config, &slug),
        Command::Info { slug } => commands::info(config, &slug),
        Command::Channels => commands::channels(config),
        Command::Post {
            slug,
            markdown,
            command_type,
        } => commands::post(config, &slug, &markdown, command_type.as_deref()),
        Command::Reply {
            slug,
            parent,
            markdown,
        } => commands::reply(config, &slug, parent, &markdown),
        Command::List { slug } => commands::list(config, &slug),
        Command::Threads { slug, max_count } => commands::threads(config, &slug, max_count),
        Command::ExportCsv {
            slug,
            output,
            include_replies,
            max_count,
        } => commands::export_csv(config, &slug, output.as_deref(), include_replies, max_count),
        Command::ExportFeed {
            slug,
            output,
            max_count,
        } => commands::export_feed(config, &slug, output.as_deref(), max_count),
        Command::Stats => commands::stats(config),
    }
}

/// Main entry point for the CLI application
pub fn run() -> Result<()> {
    let command = args::parse_args();
    let config = StoreConfig::from_env()?;
    execute(&config, command)
}

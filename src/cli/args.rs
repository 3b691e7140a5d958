//! Command-line argument parsing for channelstore.

use crate::content::PostId;
use crate::error::{ChannelStoreError, Result};
use std::env;
use std::path::PathBuf;
use std::process;

/// Command-line interface commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateChannel {
        slug: String,
    },
    Info {
        slug: String,
    },
    Channels,
    Post {
        slug: String,
        markdown: String,
        command_type: Option<String>,
    },
    Reply {
        slug: String,
        parent: PostId,
        markdown: String,
    },
    List {
        slug: String,
    },
    Threads {
        slug: String,
        max_count: Option<usize>,
    },
    ExportCsv {
        slug: String,
        output: Option<PathBuf>,
        include_replies: bool,
        max_count: Option<usize>,
    },
    ExportFeed {
        slug: String,
        output: Option<PathBuf>,
        max_count: Option<usize>,
    },
    Stats,
}

/// Parse the process arguments into a Command, exiting with usage on error
pub fn parse_args() -> Command {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_usage();
        process::exit(1);
    }

    match parse_from(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            process::exit(1);
        }
    }
}

/// Parse arguments (without the program name) into a Command
pub fn parse_from(args: &[String]) -> Result<Command> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| ChannelStoreError::invalid_input("missing command"))?;
    let (positional, flags) = split_flags(rest)?;

    let require = |count: usize, usage: &str| -> Result<()> {
        if positional.len() < count {
            return Err(ChannelStoreError::invalid_input(format!(
                "usage: channelstore {}",
                usage
            )));
        }
        Ok(())
    };

    match name.as_str() {
        "create-channel" => {
            require(1, "create-channel <slug>")?;
            Ok(Command::CreateChannel {
                slug: positional[0].clone(),
            })
        }

        "info" => {
            require(1, "info <slug>")?;
            Ok(Command::Info {
                slug: positional[0].clone(),
            })
        }

        "channels" => Ok(Command::Channels),

        "post" => {
            require(2, "post <slug> <markdown> [--command <type>]")?;
            Ok(Command::Post {
                slug: positional[0].clone(),
                markdown: positional[1].clone(),
                command_type: flags.command,
            })
        }

        "reply" => {
            require(3, "reply <slug> <parent_id> <markdown>")?;
            Ok(Command::Reply {
                slug: positional[0].clone(),
                parent: PostId::parse(&positional[1])?,
                markdown: positional[2].clone(),
            })
        }

        "list" => {
            require(1, "list <slug>")?;
            Ok(Command::List {
                slug: positional[0].clone(),
            })
        }

        "threads" => {
            require(1, "threads <slug> [--max <n>]")?;
            Ok(Command::Threads {
                slug: positional[0].clone(),
                max_count: flags.max,
            })
        }

        "export-csv" => {
            require(1, "export-csv <slug> [file] [--threaded] [--max <n>]")?;
            Ok(Command::ExportCsv {
                slug: positional[0].clone(),
                output: positional.get(1).map(PathBuf::from),
                include_replies: flags.threaded,
                max_count: flags.max,
            })
        }

        "export-feed" => {
            require(1, "export-feed <slug> [file] [--max <n>]")?;
            Ok(Command::ExportFeed {
                slug: positional[0].clone(),
                output: positional.get(1).map(PathBuf::from),
                max_count: flags.max,
            })
        }

        "stats" => Ok(Command::Stats),

        other => Err(ChannelStoreError::invalid_input(format!(
            "Unknown command '{}'",
            other
        ))),
    }
}

#[derive(Debug, Default)]
struct Flags {
    max: Option<usize>,
    command: Option<String>,
    threaded: bool,
}

fn split_flags(args: &[String]) -> Result<(Vec<String>, Flags)> {
    let mut positional = Vec::new();
    let mut flags = Flags::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--max" => {
                let value = iter
                    .next()
                    .ok_or_else(|| ChannelStoreError::invalid_input("--max requires a value"))?;
                let max: usize = value.parse().map_err(|_| {
                    ChannelStoreError::invalid_input(format!("Invalid --max value '{}'", value))
                })?;
                flags.max = Some(max);
            }
            "--command" => {
                let value = iter.next().ok_or_else(|| {
                    ChannelStoreError::invalid_input("--command requires a value")
                })?;
                flags.command = Some(value.clone());
            }
            "--threaded" => flags.threaded = true,
            _ => positional.push(arg.clone()),
        }
    }

    Ok((positional, flags))
}

/// Print usage information
pub fn print_usage() {
    println!("channelstore - hierarchical channel and post store");
    println!();
    println!("Usage: channelstore <command> [args...]");
    println!();
    println!("Commands:");
    println!("  create-channel <slug>                         Create a channel");
    println!("  info <slug>                                   Show channel details");
    println!("  channels                                      List channels");
    println!("  post <slug> <markdown> [--command <type>]     Create a root post");
    println!("  reply <slug> <parent_id> <markdown>           Reply to a post");
    println!("  list <slug>                                   List posts in store order");
    println!("  threads <slug> [--max <n>]                    Newest posts with replies");
    println!("  export-csv <slug> [file] [--threaded] [--max <n>]");
    println!("                                                Export posts as CSV");
    println!("  export-feed <slug> [file] [--max <n>]         Export posts as a JSON feed");
    println!("  stats                                         Show storage statistics");
    println!();
    println!("Environment:");
    println!("  CHANNELSTORE_DATA, CHANNELSTORE_ORG, CHANNELSTORE_MAX_COUNT,");
    println!("  CHANNELSTORE_REQUEST_TIMEOUT_MS, CHANNELSTORE_FEED_BASE_URL, RUST_LOG");
}

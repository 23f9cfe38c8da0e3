pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_BROWSE_LIMIT: usize = 2;

#[derive(Parser)]
#[command(name = "gator")]
#[command(about = "Collect posts from RSS feeds", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/gator/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a user and log in as them
    Register {
        name: String,
    },
    /// Switch the current user
    Login {
        name: String,
    },
    /// List users
    Users,
    /// Register a feed and follow it as the current user
    #[command(name = "addfeed")]
    AddFeed {
        /// Display name of the feed
        name: String,
        /// URL of the RSS document
        url: String,
    },
    /// List all feeds
    Feeds,
    /// Follow an already registered feed
    Follow {
        url: String,
    },
    /// Stop following a feed
    Unfollow {
        url: String,
    },
    /// List the feeds the current user follows
    Following,
    /// Show the newest posts from the feeds the current user follows
    Browse {
        #[arg(default_value_t = DEFAULT_BROWSE_LIMIT)]
        limit: usize,
    },
    /// Poll feeds forever, one feed per interval (e.g. "1m30s", "10s")
    Agg {
        time_between_reqs: String,
    },
    /// Delete all users, feeds and posts
    Reset,
}

//! Command-line argument structures and enums

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use nmedia_core::repository::RemovePolicy;

#[derive(Parser)]
#[command(name = "nmedia")]
#[command(version)]
#[command(about = "Read and write the NMedia post feed from the terminal", long_about = None)]
pub struct Cli {
    /// Override the server url from the config file
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// Override the local database location
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the locally stored feed
    Feed {
        /// Insert an ad after every N posts (0 disables ads)
        #[arg(long, default_value_t = 0)]
        ads: usize,

        /// Print posts as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Fetch new posts from the server
    Refresh {
        /// Re-download everything instead of catching up from the newest post
        #[arg(long)]
        all: bool,
    },

    /// Load the next page of older posts
    More {
        /// Number of pages to load
        #[arg(short, long, default_value_t = 1)]
        pages: u32,
    },

    /// Publish a new post or edit an existing one
    Post {
        /// Post text
        content: String,

        /// Image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Id of the post to edit
        #[arg(short, long)]
        edit: Option<i64>,
    },

    /// Like a post
    Like {
        /// Post id
        id: i64,
    },

    /// Remove a like from a post
    Unlike {
        /// Post id
        id: i64,
    },

    /// Delete a post
    #[command(alias = "rm")]
    Delete {
        /// Post id
        id: i64,
    },

    /// Reveal posts discovered by `watch`
    ShowNewer,

    /// Poll the server for newer posts until interrupted
    Watch {
        /// Reveal new posts as soon as they arrive
        #[arg(long)]
        reveal: bool,
    },

    /// Sign in and remember the session
    Login {
        /// Account login
        login: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// Create an account and remember the session
    Register {
        /// Account login
        login: String,

        /// Password
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },

    /// Forget the stored session
    Logout,

    /// Show or change configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,

    /// Set the server url
    Server {
        /// Base url of the posts API
        url: String,
    },

    /// Set the number of posts per page
    PageSize {
        /// Posts per page
        size: u32,
    },

    /// Set the seconds between newer-post polls
    PollInterval {
        /// Seconds between polls
        secs: u64,
    },

    /// Choose what happens to a local deletion the server rejects
    RemovePolicy {
        /// Policy to apply
        #[arg(value_enum)]
        policy: RemovePolicyArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RemovePolicyArg {
    /// Keep the post deleted locally
    KeepLocal,
    /// Put the post back
    Restore,
}

impl From<RemovePolicyArg> for RemovePolicy {
    fn from(arg: RemovePolicyArg) -> Self {
        match arg {
            RemovePolicyArg::KeepLocal => RemovePolicy::KeepLocal,
            RemovePolicyArg::Restore => RemovePolicy::Restore,
        }
    }
}

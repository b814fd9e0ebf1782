//! Command-line front end for the NMedia post feed.

/// CLI module - command-line interface for nmedia
mod cli;

fn main() {
    cli::run_cli();
}

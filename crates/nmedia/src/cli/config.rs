//! Config command handlers

use nmedia_core::config::Config;
use nmedia_core::repository::RemovePolicy;

use crate::cli::args::ConfigCommands;
use crate::cli::util::report;

pub fn handle_config_command(command: Option<ConfigCommands>, mut config: Config) -> bool {
    match command {
        None | Some(ConfigCommands::Show) => {
            show_config(&config);
            return true;
        }
        Some(ConfigCommands::Server { url }) => config.server_url = url,
        Some(ConfigCommands::PageSize { size }) => {
            if size == 0 {
                eprintln!("✗ Page size must be at least 1");
                return false;
            }
            config.page_size = size;
        }
        Some(ConfigCommands::PollInterval { secs }) => {
            if secs == 0 {
                eprintln!("✗ Poll interval must be at least 1 second");
                return false;
            }
            config.poll_interval_secs = secs;
        }
        Some(ConfigCommands::RemovePolicy { policy }) => config.remove_policy = policy.into(),
    }

    match config.save() {
        Ok(()) => {
            println!("✓ Configuration saved");
            show_config(&config);
            true
        }
        Err(e) => report(format!("Could not save config: {}", e)),
    }
}

/// Show the nmedia configuration
fn show_config(config: &Config) {
    println!("NMedia Configuration");
    println!("====================");
    println!("Server: {}", config.server_url);
    match config.database_path() {
        Ok(path) => println!("Database: {}", path.display()),
        Err(e) => println!("Database: <{}>", e),
    }
    println!("Page size: {}", config.page_size);
    println!("Poll interval: {}s", config.poll_interval().as_secs());
    println!("Remove policy: {}", remove_policy_name(config.remove_policy));
    match config.auth_id {
        Some(id) if config.auth().is_some() => println!("Signed in as: user {}", id),
        _ => println!("Signed in as: (anonymous)"),
    }
    if let Some(config_path) = Config::config_path() {
        println!("Config file: {}", config_path.display());
    }
}

fn remove_policy_name(policy: RemovePolicy) -> &'static str {
    match policy {
        RemovePolicy::KeepLocal => "keep-local (deleted posts stay deleted if the server refuses)",
        RemovePolicy::Restore => "restore (deleted posts come back if the server refuses)",
    }
}

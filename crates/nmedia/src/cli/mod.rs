/// Clap argument definitions
mod args;

/// `login`, `register`, `logout` commands
mod auth;

/// Config command handlers
mod config;

/// Feed and post commands
mod posts;

/// Shared CLI utilities
mod util;

use std::sync::Arc;

use clap::Parser;

use nmedia_core::api::HttpPostApi;
use nmedia_core::auth::Session;
use nmedia_core::config::Config;
use nmedia_core::mediator::PostRemoteMediator;
use nmedia_core::pager::Pager;
use nmedia_core::repository::{PostRepository, RepositorySettings};
use nmedia_core::store::SqliteStore;

pub use args::Cli;
use args::Commands;

/// Everything a feed command needs, wired from the config.
pub struct FeedContext {
    pub config: Config,
    pub repository: PostRepository<HttpPostApi>,
    api: Arc<HttpPostApi>,
}

impl FeedContext {
    fn open(config: Config) -> nmedia_core::Result<Self> {
        let session = Session::new(config.auth());
        let database_path = config.database_path()?;
        log::debug!("Opening local store at {}", database_path.display());
        let store = Arc::new(SqliteStore::open(&database_path)?);
        let api = Arc::new(HttpPostApi::new(config.server_url.clone(), session.clone())?);

        let settings = RepositorySettings {
            poll_interval: config.poll_interval(),
            remove_policy: config.remove_policy,
        };
        let repository =
            PostRepository::with_settings(Arc::clone(&api), store, session, settings);

        Ok(Self {
            config,
            repository,
            api,
        })
    }

    /// A pager over the same api, store and session as the repository.
    pub fn pager(&self) -> Pager<HttpPostApi> {
        let mediator = PostRemoteMediator::new(
            Arc::clone(&self.api),
            Arc::clone(self.repository.store()),
            self.repository.session().clone(),
            self.config.page_size,
        );
        Pager::new(mediator)
    }
}

/// Main entry point for the CLI
pub fn run_cli() {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    // Commands that only touch the config file
    let success = match cli.command {
        Commands::Config { command } => config::handle_config_command(command, config),
        Commands::Logout => auth::handle_logout(config),
        command => {
            if let Some(server) = cli.server {
                config.server_url = server;
            }
            if let Some(database) = cli.database {
                config.database_path = Some(database);
            }
            run_feed_command(command, config)
        }
    };

    if !success {
        std::process::exit(1);
    }
}

/// Run a command against the store and the server
/// Returns true on success, false on error
fn run_feed_command(command: Commands, config: Config) -> bool {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("✗ Failed to create Tokio runtime: {}", e);
            return false;
        }
    };

    runtime.block_on(async move {
        let ctx = match FeedContext::open(config) {
            Ok(ctx) => ctx,
            Err(e) => {
                eprintln!("✗ {}", e);
                return false;
            }
        };

        match command {
            Commands::Feed { ads, json } => posts::handle_feed(&ctx, ads, json),
            Commands::Refresh { all } => posts::handle_refresh(&ctx, all).await,
            Commands::More { pages } => posts::handle_more(&ctx, pages).await,
            Commands::Post {
                content,
                image,
                edit,
            } => posts::handle_post(&ctx, content, image.as_deref(), edit).await,
            Commands::Like { id } => posts::handle_like(&ctx, id, true).await,
            Commands::Unlike { id } => posts::handle_like(&ctx, id, false).await,
            Commands::Delete { id } => posts::handle_delete(&ctx, id).await,
            Commands::ShowNewer => posts::handle_show_newer(&ctx),
            Commands::Watch { reveal } => posts::handle_watch(&ctx, reveal).await,
            Commands::Login { login, password } => {
                auth::handle_login(ctx, &login, &password).await
            }
            Commands::Register {
                login,
                password,
                name,
            } => auth::handle_register(ctx, &login, &password, &name).await,
            Commands::Config { .. } | Commands::Logout => unreachable!("handled before startup"),
        }
    })
}

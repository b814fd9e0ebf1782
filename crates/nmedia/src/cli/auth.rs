//! Authentication command handlers.
//!
//! The session returned by the server is stored in the config file so later
//! commands send the token and mark the user's own posts.

use nmedia_core::config::Config;
use nmedia_core::model::AuthState;

use super::FeedContext;
use super::util::report;

/// Handle the login command
pub async fn handle_login(ctx: FeedContext, login: &str, password: &str) -> bool {
    println!("Signing in to {} as {}...", ctx.config.server_url, login);
    match ctx.repository.sign_in(login, password).await {
        Ok(auth) => remember(ctx, auth),
        Err(e) => report(e),
    }
}

/// Handle the register command
pub async fn handle_register(ctx: FeedContext, login: &str, password: &str, name: &str) -> bool {
    println!("Creating account {} on {}...", login, ctx.config.server_url);
    match ctx.repository.sign_up(login, password, name).await {
        Ok(auth) => remember(ctx, auth),
        Err(e) => report(e),
    }
}

/// Handle the logout command
pub fn handle_logout(mut config: Config) -> bool {
    if config.auth().is_none() {
        println!("Not signed in.");
        return true;
    }

    config.set_auth(None);
    match config.save() {
        Ok(()) => {
            println!("✓ Signed out");
            true
        }
        Err(e) => report(format!("Could not save config: {}", e)),
    }
}

fn remember(ctx: FeedContext, auth: AuthState) -> bool {
    ctx.repository.session().set_auth(auth.clone());

    let mut config = ctx.config;
    config.set_auth(Some(&auth));
    if let Err(e) = config.save() {
        eprintln!("Warning: Could not save config: {}", e);
        eprintln!("You will need to sign in again next time.");
    }

    println!("✓ Signed in as user {}", auth.id);
    println!();
    println!("Run 'nmedia refresh --all' to mark your own posts in the local feed.");
    true
}

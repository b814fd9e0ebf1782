//! Feed and post command handlers.

use std::path::Path;

use chrono::Local;
use tokio_util::sync::CancellationToken;

use nmedia_core::feed::compose_feed;
use nmedia_core::model::{MediaUpload, Post};

use super::FeedContext;
use super::util::{print_item, print_post, report};

/// Print the visible posts from the local store.
pub fn handle_feed(ctx: &FeedContext, ads: usize, json: bool) -> bool {
    let posts = match ctx.repository.store().visible_posts() {
        Ok(posts) => posts,
        Err(e) => return report(e),
    };

    if json {
        return match serde_json::to_string_pretty(&posts) {
            Ok(text) => {
                println!("{}", text);
                true
            }
            Err(e) => report(e),
        };
    }

    if posts.is_empty() {
        println!("No posts yet. Run 'nmedia refresh' to load the feed.");
        return true;
    }

    for item in compose_feed(&posts, &Local::now(), ads) {
        print_item(&item);
    }

    match ctx.repository.hidden_count() {
        Ok(0) => {}
        Ok(hidden) => println!("{} newer posts available, run 'nmedia show-newer'", hidden),
        Err(e) => log::warn!("Could not count hidden posts: {}", e),
    }
    true
}

/// Catch up with the server, or reload everything with `all`.
pub async fn handle_refresh(ctx: &FeedContext, all: bool) -> bool {
    let result = if all {
        ctx.repository.refresh_all().await
    } else {
        ctx.pager().refresh().await.map(|_| ())
    };

    match result {
        Ok(()) => {
            let count = ctx.repository.posts().borrow().len();
            println!("✓ Feed refreshed ({} posts)", count);
            true
        }
        Err(e) => report(e),
    }
}

/// Load up to `pages` pages of older posts.
pub async fn handle_more(ctx: &FeedContext, pages: u32) -> bool {
    let mut pager = ctx.pager();
    let before = ctx.repository.posts().borrow().len();

    for _ in 0..pages {
        match pager.load_more().await {
            Ok(page) if page.end_of_pagination => {
                println!("No older posts.");
                break;
            }
            Ok(_) => {}
            Err(e) => return report(e),
        }
    }

    let after = ctx.repository.posts().borrow().len();
    println!("✓ Loaded {} older posts", after.saturating_sub(before));
    true
}

/// Publish a new post, or edit `edit` when given.
pub async fn handle_post(
    ctx: &FeedContext,
    content: String,
    image: Option<&Path>,
    edit: Option<i64>,
) -> bool {
    let upload = match image.map(MediaUpload::from_path).transpose() {
        Ok(upload) => upload,
        Err(e) => return report(e),
    };

    let draft = match edit {
        Some(id) => match ctx.repository.store().get(id) {
            Ok(Some(existing)) => Post {
                content,
                ..existing
            },
            Ok(None) => {
                eprintln!("✗ Post #{} is not in the local feed", id);
                return false;
            }
            Err(e) => return report(e),
        },
        None => Post::draft(content),
    };

    match ctx.repository.save(&draft, upload.as_ref()).await {
        Ok(saved) => {
            println!("✓ Saved post #{}", saved.id);
            print_post(&saved);
            true
        }
        Err(e) => report(e),
    }
}

/// Like or unlike a post from the local feed.
pub async fn handle_like(ctx: &FeedContext, id: i64, like: bool) -> bool {
    let post = match ctx.repository.store().get(id) {
        Ok(Some(post)) => post,
        Ok(None) => {
            eprintln!("✗ Post #{} is not in the local feed", id);
            return false;
        }
        Err(e) => return report(e),
    };

    if post.liked_by_me == like {
        println!("Post #{} is already {}", id, if like { "liked" } else { "not liked" });
        return true;
    }

    let result = if like {
        ctx.repository.like_by_id(&post).await
    } else {
        ctx.repository.unlike_by_id(&post).await
    };

    match result {
        Ok(()) => {
            if let Ok(Some(updated)) = ctx.repository.store().get(id) {
                print_post(&updated);
            }
            true
        }
        Err(e) => report(e),
    }
}

/// Delete a post locally and on the server.
pub async fn handle_delete(ctx: &FeedContext, id: i64) -> bool {
    match ctx.repository.remove_by_id(id).await {
        Ok(()) => {
            println!("✓ Deleted post #{}", id);
            true
        }
        Err(e) => report(e),
    }
}

/// Reveal hidden posts found by the poller.
pub fn handle_show_newer(ctx: &FeedContext) -> bool {
    match ctx.repository.promote_hidden() {
        Ok(0) => {
            println!("No newer posts.");
            true
        }
        Ok(count) => {
            println!("✓ {} newer posts are now in the feed", count);
            true
        }
        Err(e) => report(e),
    }
}

/// Poll for newer posts until Ctrl+C.
pub async fn handle_watch(ctx: &FeedContext, reveal: bool) -> bool {
    let cancel = CancellationToken::new();
    let mut counts = ctx.repository.poll_newer_count(cancel.clone());

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                println!("\nStopping...");
                shutdown.cancel();
            }
            Err(e) => {
                eprintln!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    println!(
        "Watching for newer posts every {}s (Ctrl+C to stop)",
        ctx.config.poll_interval().as_secs()
    );

    while let Some(count) = counts.recv().await {
        if count == 0 {
            continue;
        }
        if reveal {
            match ctx.repository.promote_hidden() {
                Ok(shown) => println!("✓ {} newer posts added to the feed", shown),
                Err(e) => return report(e),
            }
        } else {
            match ctx.repository.hidden_count() {
                Ok(hidden) => println!("{} newer posts available", hidden),
                Err(e) => return report(e),
            }
        }
    }

    println!("Watch stopped.");
    true
}

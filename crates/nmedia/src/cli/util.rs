//! Shared CLI utilities

use chrono::{DateTime, Local};

use nmedia_core::feed::FeedItem;
use nmedia_core::model::Post;

/// Format a Unix timestamp in local time
pub fn format_published(published: i64) -> String {
    match DateTime::from_timestamp(published, 0) {
        Some(utc) => utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        None => published.to_string(),
    }
}

/// Print a post as a short block of text
pub fn print_post(post: &Post) {
    let heart = if post.liked_by_me { "♥" } else { "♡" };
    let owner = if post.owned_by_me { " (you)" } else { "" };
    println!(
        "#{} {}{} · {}",
        post.id,
        post.author,
        owner,
        format_published(post.published)
    );
    println!("  {}", post.content);
    if let Some(attachment) = &post.attachment {
        println!("  [{}] {}", attachment.kind, attachment.url);
    }
    println!("  {} {}", heart, post.likes);
}

/// Print one rendered feed row
pub fn print_item(item: &FeedItem) {
    match item {
        FeedItem::Post(post) => {
            print_post(post);
            println!();
        }
        FeedItem::Ad(ad) => {
            println!("  ~ ad: {} ~", ad.image);
            println!();
        }
        FeedItem::DateSeparator(separator) => {
            let heading = separator.kind.to_string();
            println!("{}", heading);
            println!("{}", "=".repeat(heading.chars().count()));
        }
    }
}

/// Print an error with the CLI's failure marker
pub fn report(e: impl std::fmt::Display) -> bool {
    eprintln!("✗ {}", e);
    false
}

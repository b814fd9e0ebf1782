//! Display-level feed items.
//!
//! Posts come out of the store newest first. [`compose_feed`] groups them
//! under date separators and interleaves ads; none of this is persisted.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, TimeZone};
use serde::Serialize;

use crate::model::Post;

/// Image shown for every ad slot.
pub const AD_IMAGE: &str = "figma.jpg";

/// One row of the rendered feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedItem {
    /// A stored post
    Post(Post),
    /// An ad slot
    Ad(Ad),
    /// Heading for a group of posts of the same age
    DateSeparator(DateSeparator),
}

impl FeedItem {
    /// Stable identity for list diffing.
    ///
    /// Posts keep their id; ads and separators use negative ids so they
    /// never collide with a post.
    pub fn id(&self) -> i64 {
        match self {
            FeedItem::Post(post) => post.id,
            FeedItem::Ad(ad) => -ad.id,
            FeedItem::DateSeparator(separator) => -1_000_000 - separator.kind as i64,
        }
    }
}

/// An ad slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ad {
    /// Position of this ad in the feed, starting at 1
    pub id: i64,
    /// Media name of the banner
    pub image: String,
}

/// A date heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSeparator {
    /// Age bucket of the posts below the heading
    pub kind: DateBucket,
}

/// Age bucket of a post relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DateBucket {
    /// Same calendar day as now (or later)
    Today,
    /// The previous calendar day
    Yesterday,
    /// Anything older
    WeekAgo,
}

impl DateBucket {
    /// Bucket for a post published at `published` (Unix seconds).
    pub fn of<Tz: TimeZone>(published: i64, now: &DateTime<Tz>) -> Self {
        let today = now.date_naive();
        let day = match DateTime::from_timestamp(published, 0) {
            Some(utc) => utc.with_timezone(&now.timezone()).date_naive(),
            None => NaiveDate::MIN,
        };
        if day >= today {
            DateBucket::Today
        } else if today.checked_sub_days(Days::new(1)) == Some(day) {
            DateBucket::Yesterday
        } else {
            DateBucket::WeekAgo
        }
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBucket::Today => write!(f, "Today"),
            DateBucket::Yesterday => write!(f, "Yesterday"),
            DateBucket::WeekAgo => write!(f, "Last week"),
        }
    }
}

/// Interleave `posts` with date separators and ads.
///
/// A separator precedes each run of posts in the same [`DateBucket`]. An ad
/// follows every `ad_every` posts; `0` disables ads.
pub fn compose_feed<Tz: TimeZone>(
    posts: &[Post],
    now: &DateTime<Tz>,
    ad_every: usize,
) -> Vec<FeedItem> {
    let mut items = Vec::with_capacity(posts.len() + posts.len() / ad_every.max(1) + 3);
    let mut current: Option<DateBucket> = None;
    let mut ads = 0;

    for (index, post) in posts.iter().enumerate() {
        let bucket = DateBucket::of(post.published, now);
        if current != Some(bucket) {
            items.push(FeedItem::DateSeparator(DateSeparator { kind: bucket }));
            current = Some(bucket);
        }
        items.push(FeedItem::Post(post.clone()));

        if ad_every > 0 && (index + 1) % ad_every == 0 {
            ads += 1;
            items.push(FeedItem::Ad(Ad {
                id: ads,
                image: AD_IMAGE.to_string(),
            }));
        }
    }

    items
}

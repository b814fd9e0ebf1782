//! Test utilities for nmedia_core
//!
//! This module provides a mock posts server implementing [`PostApi`] that can
//! be shared across all test modules.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::api::{BoxFuture, PostApi};
use crate::error::{FeedError, Result};
use crate::model::{AuthState, Media, MediaUpload, Post};

/// Author id used by [`post`].
pub const AUTHOR_ID: i64 = 100;

/// A saved post with predictable fields.
pub fn post(id: i64) -> Post {
    Post {
        id,
        author: "Netology".to_string(),
        author_id: AUTHOR_ID,
        content: format!("post {}", id),
        published: 1_700_000_000 + id,
        author_avatar: "netology.jpg".to_string(),
        ..Default::default()
    }
}

/// Callback run inside `get_newer`, simulating a concurrent local write.
type Hook = Box<dyn FnOnce() + Send>;

/// A mock posts server.
///
/// Uses `Arc<Mutex<..>>` so clones share the same posts, failure queue and
/// call log.
#[derive(Clone, Default)]
pub struct MockApi {
    posts: Arc<Mutex<Vec<Post>>>,
    failures: Arc<Mutex<VecDeque<FeedError>>>,
    calls: Arc<Mutex<Vec<String>>>,
    newer_hook: Arc<Mutex<Option<Hook>>>,
}

impl MockApi {
    /// Create a new empty mock server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add posts to the server (builder pattern).
    pub fn with_posts(self, ids: &[i64]) -> Self {
        self.posts
            .lock()
            .unwrap()
            .extend(ids.iter().map(|id| post(*id)));
        self
    }

    /// Make the next call fail with `err`, whatever endpoint it hits.
    pub fn fail_next(&self, err: FeedError) {
        self.failures.lock().unwrap().push_back(err);
    }

    /// Run `hook` during the next `get_newer` call, before it answers.
    pub fn before_newer(&self, hook: impl FnOnce() + Send + 'static) {
        *self.newer_hook.lock().unwrap() = Some(Box::new(hook));
    }

    /// Names of the endpoints hit so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Server-side copy of a post (for test assertions).
    pub fn server_post(&self, id: i64) -> Option<Post> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Posts matching `filter`, newest first, at most `count`.
    fn select(&self, filter: impl Fn(&Post) -> bool, count: Option<u32>) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| filter(p))
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        if let Some(count) = count {
            posts.truncate(count as usize);
        }
        posts
    }

    fn set_liked(&self, id: i64, liked: bool) -> Result<Post> {
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;
        if post.liked_by_me != liked {
            post.liked_by_me = liked;
            post.likes += if liked { 1 } else { -1 };
        }
        Ok(post.clone())
    }
}

fn not_found(id: i64) -> FeedError {
    FeedError::Api {
        code: 404,
        message: format!("post {} not found", id),
    }
}

impl PostApi for MockApi {
    fn get_all(&self) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move {
            self.record("get_all".to_string())?;
            Ok(self.select(|_| true, None))
        })
    }

    fn get_latest(&self, count: u32) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move {
            self.record(format!("get_latest({})", count))?;
            Ok(self.select(|_| true, Some(count)))
        })
    }

    fn get_after(&self, id: i64, count: u32) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move {
            self.record(format!("get_after({}, {})", id, count))?;
            Ok(self.select(|p| p.id > id, Some(count)))
        })
    }

    fn get_before(&self, id: i64, count: u32) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move {
            self.record(format!("get_before({}, {})", id, count))?;
            Ok(self.select(|p| p.id < id, Some(count)))
        })
    }

    fn get_newer(&self, id: i64) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move {
            self.record(format!("get_newer({})", id))?;
            let hook = self.newer_hook.lock().unwrap().take();
            if let Some(hook) = hook {
                hook();
            }
            Ok(self.select(|p| p.id > id, None))
        })
    }

    fn save<'a>(&'a self, post: &'a Post) -> BoxFuture<'a, Result<Post>> {
        Box::pin(async move {
            self.record(format!("save({})", post.id))?;
            let mut posts = self.posts.lock().unwrap();
            if post.id == 0 {
                let id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
                let saved = Post {
                    id,
                    author: "Student".to_string(),
                    author_id: AUTHOR_ID,
                    ..post.clone()
                };
                posts.push(saved.clone());
                return Ok(saved);
            }
            let existing = posts
                .iter_mut()
                .find(|p| p.id == post.id)
                .ok_or_else(|| not_found(post.id))?;
            existing.content = post.content.clone();
            existing.attachment = post.attachment.clone();
            Ok(existing.clone())
        })
    }

    fn remove_by_id(&self, id: i64) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.record(format!("remove_by_id({})", id))?;
            self.posts.lock().unwrap().retain(|p| p.id != id);
            Ok(())
        })
    }

    fn like_by_id(&self, id: i64) -> BoxFuture<'_, Result<Post>> {
        Box::pin(async move {
            self.record(format!("like_by_id({})", id))?;
            self.set_liked(id, true)
        })
    }

    fn unlike_by_id(&self, id: i64) -> BoxFuture<'_, Result<Post>> {
        Box::pin(async move {
            self.record(format!("unlike_by_id({})", id))?;
            self.set_liked(id, false)
        })
    }

    fn upload<'a>(&'a self, upload: &'a MediaUpload) -> BoxFuture<'a, Result<Media>> {
        Box::pin(async move {
            self.record(format!("upload({})", upload.file_name))?;
            Ok(Media {
                id: format!("media-{}", upload.file_name),
            })
        })
    }

    fn sign_in<'a>(
        &'a self,
        login: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthState>> {
        Box::pin(async move {
            self.record(format!("sign_in({})", login))?;
            if password == "secret" {
                Ok(AuthState {
                    id: AUTHOR_ID,
                    token: format!("token-{}", login),
                })
            } else {
                Err(FeedError::Api {
                    code: 400,
                    message: "Incorrect password".to_string(),
                })
            }
        })
    }

    fn sign_up<'a>(
        &'a self,
        login: &'a str,
        _password: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<AuthState>> {
        Box::pin(async move {
            self.record(format!("sign_up({}, {})", login, name))?;
            Ok(AuthState {
                id: AUTHOR_ID + 1,
                token: format!("token-{}", login),
            })
        })
    }
}

//! Remote source of posts.
//!
//! [`PostApi`] abstracts over the REST endpoints so the repository and the
//! sync mediator can be driven by the real HTTP client ([`HttpPostApi`]) or a
//! scripted fake in tests. Implementations classify failures into
//! [`FeedError::Api`](crate::error::FeedError::Api),
//! [`FeedError::Network`](crate::error::FeedError::Network) and
//! [`FeedError::Unknown`](crate::error::FeedError::Unknown).

use std::future::Future;
use std::pin::Pin;

use crate::error::Result;
use crate::model::{AuthState, Media, MediaUpload, Post};

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpPostApi;

/// Boxed future returned by [`PostApi`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The remote posts API.
pub trait PostApi: Send + Sync {
    /// `GET /posts`
    fn get_all(&self) -> BoxFuture<'_, Result<Vec<Post>>>;

    /// `GET /posts/latest?count=N`, newest first
    fn get_latest(&self, count: u32) -> BoxFuture<'_, Result<Vec<Post>>>;

    /// `GET /posts/after/{id}?count=N`, posts strictly newer than `id`
    fn get_after(&self, id: i64, count: u32) -> BoxFuture<'_, Result<Vec<Post>>>;

    /// `GET /posts/before/{id}?count=N`, posts strictly older than `id`
    fn get_before(&self, id: i64, count: u32) -> BoxFuture<'_, Result<Vec<Post>>>;

    /// `GET /posts/{id}/newer`, everything newer than `id`
    fn get_newer(&self, id: i64) -> BoxFuture<'_, Result<Vec<Post>>>;

    /// `POST /posts`; creates the post when `id == 0`, updates it otherwise
    fn save<'a>(&'a self, post: &'a Post) -> BoxFuture<'a, Result<Post>>;

    /// `DELETE /posts/{id}`
    fn remove_by_id(&self, id: i64) -> BoxFuture<'_, Result<()>>;

    /// `POST /posts/{id}/likes`
    fn like_by_id(&self, id: i64) -> BoxFuture<'_, Result<Post>>;

    /// `DELETE /posts/{id}/likes`
    fn unlike_by_id(&self, id: i64) -> BoxFuture<'_, Result<Post>>;

    /// `POST /media` (multipart)
    fn upload<'a>(&'a self, upload: &'a MediaUpload) -> BoxFuture<'a, Result<Media>>;

    /// `POST /users/authentication`
    fn sign_in<'a>(&'a self, login: &'a str, password: &'a str)
    -> BoxFuture<'a, Result<AuthState>>;

    /// `POST /users/registration`
    fn sign_up<'a>(
        &'a self,
        login: &'a str,
        password: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<AuthState>>;
}

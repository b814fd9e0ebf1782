//! reqwest-backed implementation of [`PostApi`].

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use super::{BoxFuture, PostApi};
use crate::auth::Session;
use crate::error::{FeedError, Result};
use crate::model::{AuthState, Media, MediaUpload, Post};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-over-HTTP client for the posts API.
///
/// The session token, when present, is sent in the `Authorization` header of
/// every request.
#[derive(Debug, Clone)]
pub struct HttpPostApi {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpPostApi {
    /// Create a client with the default request timeout.
    pub fn new(base_url: impl Into<String>, session: Session) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FeedError::Unknown(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url, session))
    }

    /// Create a client around an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, session: Session) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match self.session.token() {
            Some(token) => request.header(AUTHORIZATION, token),
            None => request,
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = check_status(request.send().await?).await?;
        let bytes = response.bytes().await?;
        decode_body(&bytes)
    }

    async fn fetch_posts(&self, path: &str, count: Option<u32>) -> Result<Vec<Post>> {
        let mut request = self.request(Method::GET, path);
        if let Some(count) = count {
            request = request.query(&[("count", count)]);
        }
        let posts: Vec<Post> = self.fetch(request).await?;
        log::debug!("[HttpPostApi] GET {} returned {} posts", path, posts.len());
        Ok(posts)
    }
}

impl PostApi for HttpPostApi {
    fn get_all(&self) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(self.fetch_posts("posts", None))
    }

    fn get_latest(&self, count: u32) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(self.fetch_posts("posts/latest", Some(count)))
    }

    fn get_after(&self, id: i64, count: u32) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move {
            self.fetch_posts(&format!("posts/after/{}", id), Some(count))
                .await
        })
    }

    fn get_before(&self, id: i64, count: u32) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move {
            self.fetch_posts(&format!("posts/before/{}", id), Some(count))
                .await
        })
    }

    fn get_newer(&self, id: i64) -> BoxFuture<'_, Result<Vec<Post>>> {
        Box::pin(async move { self.fetch_posts(&format!("posts/{}/newer", id), None).await })
    }

    fn save<'a>(&'a self, post: &'a Post) -> BoxFuture<'a, Result<Post>> {
        Box::pin(async move { self.fetch(self.request(Method::POST, "posts").json(post)).await })
    }

    fn remove_by_id(&self, id: i64) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let request = self.request(Method::DELETE, &format!("posts/{}", id));
            check_status(request.send().await?).await?;
            Ok(())
        })
    }

    fn like_by_id(&self, id: i64) -> BoxFuture<'_, Result<Post>> {
        Box::pin(async move {
            self.fetch(self.request(Method::POST, &format!("posts/{}/likes", id)))
                .await
        })
    }

    fn unlike_by_id(&self, id: i64) -> BoxFuture<'_, Result<Post>> {
        Box::pin(async move {
            self.fetch(self.request(Method::DELETE, &format!("posts/{}/likes", id)))
                .await
        })
    }

    fn upload<'a>(&'a self, upload: &'a MediaUpload) -> BoxFuture<'a, Result<Media>> {
        Box::pin(async move {
            let part = reqwest::multipart::Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone());
            let form = reqwest::multipart::Form::new().part("file", part);
            let media: Media = self
                .fetch(self.request(Method::POST, "media").multipart(form))
                .await?;
            log::info!("[HttpPostApi] Uploaded {} as {}", upload.file_name, media.id);
            Ok(media)
        })
    }

    fn sign_in<'a>(
        &'a self,
        login: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<AuthState>> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, "users/authentication")
                .form(&[("login", login), ("pass", password)]);
            self.fetch(request).await
        })
    }

    fn sign_up<'a>(
        &'a self,
        login: &'a str,
        password: &'a str,
        name: &'a str,
    ) -> BoxFuture<'a, Result<AuthState>> {
        Box::pin(async move {
            let request = self
                .request(Method::POST, "users/registration")
                .form(&[("login", login), ("pass", password), ("name", name)]);
            self.fetch(request).await
        })
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a non-2xx response into [`FeedError::Api`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> FeedError {
    let body = body.trim();
    let message = if body.is_empty() {
        status.canonical_reason().unwrap_or("Unknown status").to_string()
    } else {
        body.to_string()
    };
    log::warn!("[HttpPostApi] Request failed: {} {}", status.as_u16(), message);
    FeedError::Api {
        code: status.as_u16(),
        message,
    }
}

fn decode_body<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.is_empty() {
        return Err(FeedError::Unknown("Body is empty".to_string()));
    }
    serde_json::from_slice(bytes)
        .map_err(|e| FeedError::Unknown(format!("Malformed response body: {}", e)))
}

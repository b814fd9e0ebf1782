//! Façade over the local store and the remote API.
//!
//! The store is the only thing the presentation layer reads; writes go to the
//! server and land locally either optimistically (likes, deletes) or once the
//! server has echoed them back (new and edited posts).
//!
//! # Failure policy
//!
//! Every method returns the classified [`FeedError`] to the caller. Likes are
//! compensated locally before the error is returned. Deletes follow the
//! configured [`RemovePolicy`]. The newer-count poller is the one place that
//! swallows errors: it logs them and tries again on the next tick.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::api::PostApi;
use crate::auth::Session;
use crate::error::{FeedError, Result};
use crate::model::{AuthState, MediaUpload, Post};
use crate::store::SqliteStore;

/// Interval between newer-post polls unless configured otherwise.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// What happens to a local deletion when the server rejects it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovePolicy {
    /// The local deletion stands even though the server still has the post
    #[default]
    KeepLocal,
    /// The removed row is written back
    Restore,
}

/// Tunables for [`PostRepository`].
#[derive(Debug, Clone)]
pub struct RepositorySettings {
    /// Delay before each newer-post poll
    pub poll_interval: Duration,
    /// Behaviour of [`PostRepository::remove_by_id`] on remote failure
    pub remove_policy: RemovePolicy,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            remove_policy: RemovePolicy::default(),
        }
    }
}

/// Post repository combining [`SqliteStore`] reads with [`PostApi`] writes.
pub struct PostRepository<A: PostApi> {
    api: Arc<A>,
    store: Arc<SqliteStore>,
    session: Session,
    settings: RepositorySettings,
}

impl<A: PostApi> PostRepository<A> {
    /// Create a repository with default settings.
    pub fn new(api: Arc<A>, store: Arc<SqliteStore>, session: Session) -> Self {
        Self::with_settings(api, store, session, RepositorySettings::default())
    }

    /// Create a repository with explicit settings.
    pub fn with_settings(
        api: Arc<A>,
        store: Arc<SqliteStore>,
        session: Session,
        settings: RepositorySettings,
    ) -> Self {
        Self {
            api,
            store,
            session,
            settings,
        }
    }

    /// Live list of visible posts, newest first.
    pub fn posts(&self) -> watch::Receiver<Vec<Post>> {
        self.store.subscribe()
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<SqliteStore> {
        &self.store
    }

    /// The session used for ownership and auth.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetch every post from the server and store it.
    pub async fn refresh_all(&self) -> Result<()> {
        let posts = self.api.get_all().await?;
        let posts = self.owned(posts);
        self.store.upsert(&posts)?;
        log::info!("[Repository] Refreshed {} posts", posts.len());
        Ok(())
    }

    /// Surface every hidden post. Returns how many were promoted.
    pub fn promote_hidden(&self) -> Result<usize> {
        self.store.promote_hidden()
    }

    /// Number of fetched posts the user has not been shown yet.
    pub fn hidden_count(&self) -> Result<usize> {
        self.store.hidden_count()
    }

    /// Like a post, reflecting the change locally before the server answers.
    pub async fn like_by_id(&self, post: &Post) -> Result<()> {
        self.toggle_like(post.id, true).await
    }

    /// Remove a like, reflecting the change locally before the server answers.
    pub async fn unlike_by_id(&self, post: &Post) -> Result<()> {
        self.toggle_like(post.id, false).await
    }

    async fn toggle_like(&self, id: i64, like: bool) -> Result<()> {
        self.store.toggle_like(id)?;

        let result = if like {
            self.api.like_by_id(id).await
        } else {
            self.api.unlike_by_id(id).await
        };

        match result {
            Ok(updated) => {
                let updated = updated.with_owner(self.session.user_id());
                self.store.upsert(&[updated])?;
                Ok(())
            }
            Err(err) => {
                log::warn!(
                    "[Repository] {} post {} failed, reverting: {}",
                    if like { "Like" } else { "Unlike" },
                    id,
                    err
                );
                self.store.toggle_like(id)?;
                Err(err)
            }
        }
    }

    /// Save a new or edited post, uploading `upload` first when given.
    ///
    /// Nothing is written locally until the server returns the saved post.
    pub async fn save(&self, post: &Post, upload: Option<&MediaUpload>) -> Result<Post> {
        let mut post = post.clone();
        if let Some(upload) = upload {
            let media = self.api.upload(upload).await?;
            post.attachment = Some(media.to_attachment());
        }

        let saved = self
            .api
            .save(&post)
            .await?
            .with_owner(self.session.user_id());
        self.store.upsert(std::slice::from_ref(&saved))?;
        log::info!("[Repository] Saved post {}", saved.id);
        Ok(saved)
    }

    /// Delete a post locally, then on the server.
    pub async fn remove_by_id(&self, id: i64) -> Result<()> {
        let snapshot = match self.settings.remove_policy {
            RemovePolicy::Restore => self.store.get(id)?,
            RemovePolicy::KeepLocal => None,
        };
        self.store.remove(id)?;

        if let Err(err) = self.api.remove_by_id(id).await {
            log::warn!("[Repository] Remote delete of post {} failed: {}", id, err);
            if let Some(post) = snapshot {
                self.store.upsert(&[post])?;
            }
            return Err(err);
        }
        Ok(())
    }

    /// Authenticate; the caller decides where to keep the returned token.
    pub async fn sign_in(&self, login: &str, password: &str) -> Result<AuthState> {
        let auth = self.api.sign_in(login, password).await?;
        log::info!("[Repository] Signed in as {}", login);
        Ok(auth)
    }

    /// Register; the caller decides where to keep the returned token.
    pub async fn sign_up(&self, login: &str, password: &str, name: &str) -> Result<AuthState> {
        let auth = self.api.sign_up(login, password, name).await?;
        log::info!("[Repository] Registered {}", login);
        Ok(auth)
    }

    fn owned(&self, posts: Vec<Post>) -> Vec<Post> {
        let user_id = self.session.user_id();
        posts.into_iter().map(|p| p.with_owner(user_id)).collect()
    }
}

impl<A: PostApi + 'static> PostRepository<A> {
    /// Start polling for posts newer than the newest local one.
    ///
    /// Every poll interval the task fetches newer posts, shadow-inserts them
    /// as hidden and sends the number of newly stored posts. Failed polls are
    /// logged and retried on the next tick. The task stops when `cancel` fires
    /// or the receiver is dropped, and never writes to the store after that.
    pub fn poll_newer_count(&self, cancel: CancellationToken) -> mpsc::Receiver<usize> {
        let (tx, rx) = mpsc::channel(16);
        let poller = NewerCountPoller {
            api: Arc::clone(&self.api),
            store: Arc::clone(&self.store),
            session: self.session.clone(),
            interval: self.settings.poll_interval,
        };
        tokio::spawn(poller.run(cancel, tx));
        rx
    }
}

struct NewerCountPoller<A: PostApi> {
    api: Arc<A>,
    store: Arc<SqliteStore>,
    session: Session,
    interval: Duration,
}

impl<A: PostApi> NewerCountPoller<A> {
    async fn run(self, cancel: CancellationToken, tx: mpsc::Sender<usize>) {
        log::info!("[Poller] Started, polling every {:?}", self.interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tx.closed() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.tick(&cancel) => result,
            };

            let count = match fetched {
                Ok(Some(count)) => count,
                Ok(None) => break,
                Err(err) => {
                    log::warn!("[Poller] Poll failed, retrying next tick: {}", err);
                    continue;
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                sent = tx.send(count) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        log::info!("[Poller] Stopped");
    }

    /// One poll: fetch, then shadow-insert unless cancelled meanwhile.
    ///
    /// Returns `None` when `cancel` fired during the fetch; nothing is
    /// written in that case. An empty store is not polled: the first page
    /// has to come from a refresh so the paging bookmarks get set.
    async fn tick(&self, cancel: &CancellationToken) -> Result<Option<usize>> {
        let Some(since) = self.store.latest_id()? else {
            log::debug!("[Poller] Store is empty, waiting for the first refresh");
            return Ok(Some(0));
        };
        let posts = self.api.get_newer(since).await?;
        if cancel.is_cancelled() {
            log::debug!("[Poller] Cancelled during fetch, dropping {} posts", posts.len());
            return Ok(None);
        }
        if posts.is_empty() {
            return Ok(Some(0));
        }

        let user_id = self.session.user_id();
        let posts: Vec<Post> = posts
            .into_iter()
            .map(|p| Post {
                hidden: true,
                ..p.with_owner(user_id)
            })
            .collect();
        let inserted = self.store.upsert_shadow(&posts)?;
        log::debug!("[Poller] {} newer posts after {}", inserted, since);
        Ok(Some(inserted))
    }
}

impl From<RemovePolicy> for RepositorySettings {
    fn from(remove_policy: RemovePolicy) -> Self {
        Self {
            remove_policy,
            ..Self::default()
        }
    }
}

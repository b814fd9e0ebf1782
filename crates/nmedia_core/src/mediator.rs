//! Paged reconciliation between the remote API and the local store.
//!
//! The mediator answers three kinds of load requests:
//!
//! - **Refresh**: catch up after the AFTER bookmark, or fetch the latest page
//!   when there is none. The fetched posts and the bookmarks are written in
//!   one transaction; the BEFORE bookmark is only set when the store was
//!   empty, which establishes the initial page boundary.
//! - **Prepend**: never fetches. Newer posts arrive through the poller and
//!   hidden-post promotion instead.
//! - **Append**: fetch the page before the BEFORE bookmark and move the
//!   bookmark to the oldest fetched id. Without a bookmark there is nothing
//!   to append.
//!
//! A page with no posts reports the end of pagination and writes nothing.

use std::sync::Arc;

use crate::api::PostApi;
use crate::auth::Session;
use crate::error::FeedError;
use crate::model::{KeyKind, Post, RemoteKey};
use crate::store::SqliteStore;

/// Direction of a page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadType {
    /// Initial load or pull-to-refresh
    Refresh,
    /// Load newer than the first shown item
    Prepend,
    /// Load older than the last shown item
    Append,
}

/// Outcome of a successful page load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediatorSuccess {
    /// No further pages in this direction
    pub end_of_pagination: bool,
}

/// Result of [`PostRemoteMediator::load`]; errors are for the pager to retry or surface.
pub type MediatorResult = Result<MediatorSuccess, FeedError>;

/// Bridges the remote API and the local store for paged loading.
pub struct PostRemoteMediator<A: PostApi> {
    api: Arc<A>,
    store: Arc<SqliteStore>,
    session: Session,
    page_size: u32,
}

impl<A: PostApi> PostRemoteMediator<A> {
    /// Create a mediator loading `page_size` posts per request.
    pub fn new(api: Arc<A>, store: Arc<SqliteStore>, session: Session, page_size: u32) -> Self {
        Self {
            api,
            store,
            session,
            page_size: page_size.max(1),
        }
    }

    /// Posts requested per page.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Load one page in the given direction.
    pub async fn load(&self, load_type: LoadType) -> MediatorResult {
        let posts = match load_type {
            LoadType::Refresh => match self.store.remote_key(KeyKind::After)? {
                Some(id) => self.api.get_after(id, self.page_size).await?,
                None => self.api.get_latest(self.page_size).await?,
            },
            LoadType::Prepend => {
                return Ok(MediatorSuccess {
                    end_of_pagination: true,
                });
            }
            LoadType::Append => match self.store.remote_key(KeyKind::Before)? {
                Some(id) => self.api.get_before(id, self.page_size).await?,
                None => {
                    log::debug!("[Mediator] No BEFORE bookmark, nothing to append");
                    return Ok(MediatorSuccess {
                        end_of_pagination: true,
                    });
                }
            },
        };

        let (Some(newest), Some(oldest)) = (posts.first(), posts.last()) else {
            log::debug!("[Mediator] {:?} returned an empty page", load_type);
            return Ok(MediatorSuccess {
                end_of_pagination: true,
            });
        };
        let (newest, oldest) = (newest.id, oldest.id);

        let user_id = self.session.user_id();
        let posts: Vec<Post> = posts.into_iter().map(|p| p.with_owner(user_id)).collect();

        self.store.transaction(|tx| {
            let keys = match load_type {
                LoadType::Refresh if tx.is_empty()? => {
                    vec![RemoteKey::after(newest), RemoteKey::before(oldest)]
                }
                LoadType::Refresh => vec![RemoteKey::after(newest)],
                LoadType::Prepend => vec![],
                LoadType::Append => vec![RemoteKey::before(oldest)],
            };
            tx.set_remote_keys(&keys)?;
            tx.upsert(&posts)
        })?;

        log::info!(
            "[Mediator] {:?} stored {} posts ({}..={})",
            load_type,
            posts.len(),
            oldest,
            newest
        );

        Ok(MediatorSuccess {
            end_of_pagination: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AuthState;
    use crate::test_utils::{AUTHOR_ID, MockApi};

    fn mediator(api: &MockApi, page_size: u32) -> (PostRemoteMediator<MockApi>, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mediator = PostRemoteMediator::new(
            Arc::new(api.clone()),
            Arc::clone(&store),
            Session::anonymous(),
            page_size,
        );
        (mediator, store)
    }

    #[tokio::test]
    async fn test_refresh_on_empty_store_sets_both_keys() {
        let api = MockApi::new().with_posts(&[103, 104, 105]);
        let (mediator, store) = mediator(&api, 10);

        let result = mediator.load(LoadType::Refresh).await.unwrap();

        assert!(!result.end_of_pagination);
        assert_eq!(api.calls(), vec!["get_latest(10)"]);
        assert_eq!(store.remote_key(KeyKind::After).unwrap(), Some(105));
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), Some(103));
        let ids: Vec<i64> = store.visible_posts().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![105, 104, 103]);
    }

    #[tokio::test]
    async fn test_refresh_with_after_key_catches_up_and_keeps_before() {
        let api = MockApi::new().with_posts(&[1, 2, 3]);
        let (mediator, store) = mediator(&api, 3);
        mediator.load(LoadType::Refresh).await.unwrap();

        // New posts appear on the server
        let api_more = api.clone().with_posts(&[4, 5]);
        mediator.load(LoadType::Refresh).await.unwrap();

        assert_eq!(api_more.calls(), vec!["get_latest(3)", "get_after(3, 3)"]);
        assert_eq!(store.remote_key(KeyKind::After).unwrap(), Some(5));
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), Some(1));
        assert_eq!(store.visible_posts().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_refresh_without_after_key_on_non_empty_store_sets_only_after() {
        let api = MockApi::new().with_posts(&[8, 9]);
        let (mediator, store) = mediator(&api, 10);
        store.upsert(&[crate::test_utils::post(1)]).unwrap();

        mediator.load(LoadType::Refresh).await.unwrap();

        assert_eq!(store.remote_key(KeyKind::After).unwrap(), Some(9));
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), None);
    }

    #[tokio::test]
    async fn test_append_without_before_key_makes_no_call() {
        let api = MockApi::new().with_posts(&[1, 2]);
        let (mediator, _store) = mediator(&api, 10);

        let result = mediator.load(LoadType::Append).await.unwrap();

        assert!(result.end_of_pagination);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_append_pages_backwards_until_exhausted() {
        let api = MockApi::new().with_posts(&[1, 2, 3, 4, 5]);
        let (mediator, store) = mediator(&api, 2);

        mediator.load(LoadType::Refresh).await.unwrap();
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), Some(4));

        let page = mediator.load(LoadType::Append).await.unwrap();
        assert!(!page.end_of_pagination);
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), Some(2));

        mediator.load(LoadType::Append).await.unwrap();
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), Some(1));

        let last = mediator.load(LoadType::Append).await.unwrap();
        assert!(last.end_of_pagination);
        assert_eq!(store.remote_key(KeyKind::Before).unwrap(), Some(1));
        assert_eq!(store.remote_key(KeyKind::After).unwrap(), Some(5));
        assert_eq!(store.visible_posts().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_prepend_never_fetches() {
        let api = MockApi::new().with_posts(&[1]);
        let (mediator, store) = mediator(&api, 10);

        let result = mediator.load(LoadType::Prepend).await.unwrap();

        assert!(result.end_of_pagination);
        assert!(api.calls().is_empty());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_empty_refresh_is_end_of_pagination() {
        let api = MockApi::new();
        let (mediator, store) = mediator(&api, 10);

        let result = mediator.load(LoadType::Refresh).await.unwrap();

        assert!(result.end_of_pagination);
        assert_eq!(store.remote_key(KeyKind::After).unwrap(), None);
    }

    #[tokio::test]
    async fn test_network_failure_leaves_store_untouched() {
        let api = MockApi::new().with_posts(&[1, 2]);
        let (mediator, store) = mediator(&api, 10);
        api.fail_next(FeedError::Network("connection reset".into()));

        let err = mediator.load(LoadType::Refresh).await.unwrap_err();

        assert!(err.is_retryable());
        assert!(store.is_empty().unwrap());
        assert_eq!(store.remote_key(KeyKind::After).unwrap(), None);
    }

    #[tokio::test]
    async fn test_owned_by_me_is_derived_from_session() {
        let api = MockApi::new().with_posts(&[1]);
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let session = Session::new(Some(AuthState {
            id: AUTHOR_ID,
            token: "t".into(),
        }));
        let mediator = PostRemoteMediator::new(Arc::new(api), Arc::clone(&store), session, 10);

        mediator.load(LoadType::Refresh).await.unwrap();

        assert!(store.get(1).unwrap().unwrap().owned_by_me);
    }
}

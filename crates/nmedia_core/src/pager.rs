//! Drives [`PostRemoteMediator`] the way a list screen would.
//!
//! The pager remembers when older pages ran out and owns the retry policy:
//! retryable failures (network errors, 5xx) are retried with exponential
//! backoff, everything else is returned on the first failure.

use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::ExponentialBackoffBuilder;

use crate::api::PostApi;
use crate::error::{FeedError, Result};
use crate::mediator::{LoadType, MediatorSuccess, PostRemoteMediator};

/// Pages through the feed on top of a mediator.
pub struct Pager<A: PostApi> {
    mediator: PostRemoteMediator<A>,
    backoff: ExponentialBackoff,
    append_exhausted: bool,
}

impl<A: PostApi> Pager<A> {
    /// Create a pager that retries for up to 30 seconds.
    pub fn new(mediator: PostRemoteMediator<A>) -> Self {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_elapsed_time(Some(Duration::from_secs(30)))
            .build();
        Self::with_backoff(mediator, backoff)
    }

    /// Create a pager with a custom retry policy.
    pub fn with_backoff(mediator: PostRemoteMediator<A>, backoff: ExponentialBackoff) -> Self {
        Self {
            mediator,
            backoff,
            append_exhausted: false,
        }
    }

    /// Whether older pages ran out since the last refresh.
    pub fn is_exhausted(&self) -> bool {
        self.append_exhausted
    }

    /// Reload from the newest end of the feed.
    pub async fn refresh(&mut self) -> Result<MediatorSuccess> {
        let result = self.load(LoadType::Refresh).await?;
        self.append_exhausted = false;
        Ok(result)
    }

    /// Load the next page of older posts.
    pub async fn load_more(&mut self) -> Result<MediatorSuccess> {
        if self.append_exhausted {
            return Ok(MediatorSuccess {
                end_of_pagination: true,
            });
        }
        let result = self.load(LoadType::Append).await?;
        self.append_exhausted = result.end_of_pagination;
        Ok(result)
    }

    /// Load posts newer than the first shown one.
    pub async fn load_newer(&mut self) -> Result<MediatorSuccess> {
        self.load(LoadType::Prepend).await
    }

    async fn load(&self, load_type: LoadType) -> Result<MediatorSuccess> {
        let mediator = &self.mediator;
        let op = move || async move {
            mediator.load(load_type).await.map_err(|err| {
                if err.is_retryable() {
                    log::warn!("[Pager] {:?} failed, retrying: {}", load_type, err);
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        };

        backoff::future::retry(self.backoff.clone(), op)
            .await
            .inspect_err(|err: &FeedError| {
                log::error!("[Pager] {:?} gave up: {}", load_type, err);
            })
    }
}

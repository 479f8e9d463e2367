//! External publishing service
//!
//! The scheduler never talks HTTP directly. It goes through the [`Publisher`]
//! trait, which has two implementations:
//!
//! - [`http::HttpPublisher`]: the real JSON API client
//! - [`mock::MockPublisher`]: scriptable in-memory service for tests
//!
//! Every call the sync engine makes is additionally bounded by
//! [`with_timeout`], so a hung connection turns into
//! [`PublisherError::Timeout`] instead of a post stuck mid-sync.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::PublisherError;

pub mod http;
pub mod wire;

// Available outside tests so integration tests and the binaries' tests can use it
pub mod mock;

pub use wire::{
    CreatePostRequest, MediaPayload, RemoteAnalytics, RemotePost, RemoteTarget, TargetRequest,
    UpdatePostRequest,
};

pub type PublishResult<T> = std::result::Result<T, PublisherError>;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create a scheduled (or immediate) post. Returns the service's record,
    /// whose `id` becomes the post's remote identifier.
    async fn create_post(&self, request: &CreatePostRequest) -> PublishResult<RemotePost>;

    /// Change an existing remote post. Never creates a new one.
    async fn update_post(
        &self,
        remote_id: &str,
        update: &UpdatePostRequest,
    ) -> PublishResult<RemotePost>;

    async fn delete_post(&self, remote_id: &str) -> PublishResult<()>;

    async fn get_analytics(&self, remote_id: &str) -> PublishResult<RemoteAnalytics>;
}

/// Run `call`, failing with `PublisherError::Timeout` if it takes longer than `limit`
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> PublishResult<T>
where
    F: Future<Output = PublishResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PublisherError::Timeout(limit.as_secs().max(1))),
    }
}

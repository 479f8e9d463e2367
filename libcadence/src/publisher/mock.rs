//! In-memory publishing service for tests
//!
//! `MockPublisher` hands out remote ids, records every request it receives
//! and can be told to fail or stall each kind of call. Clones share state, so
//! a test can keep one handle while the service under test owns another and
//! flip behavior between steps.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use super::{
    CreatePostRequest, PublishResult, Publisher, RemoteAnalytics, RemotePost, RemoteTarget,
    UpdatePostRequest,
};
use crate::error::PublisherError;

/// Behavior switches for [`MockPublisher`]
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    pub create_error: Option<PublisherError>,
    pub update_error: Option<PublisherError>,
    pub delete_error: Option<PublisherError>,
    pub analytics_error: Option<PublisherError>,
    /// Applied before every call, to exercise timeouts
    pub delay: Duration,
    /// Remote ids handed out by `create_post`, in order. Once used up ids
    /// are generated as `ext-<n>`.
    pub remote_ids: VecDeque<String>,
    pub analytics: Option<RemoteAnalytics>,
}

#[derive(Debug, Default)]
struct MockState {
    config: MockConfig,
    created: Vec<CreatePostRequest>,
    updated: Vec<(String, UpdatePostRequest)>,
    deleted: Vec<String>,
    analytics_requests: Vec<String>,
    next_id: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockPublisher {
    state: Arc<Mutex<MockState>>,
}

impl MockPublisher {
    pub fn new(config: MockConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                config,
                ..Default::default()
            })),
        }
    }

    /// A publisher where every call succeeds
    pub fn success() -> Self {
        Self::new(MockConfig::default())
    }

    /// Succeeds, handing out `ids` as remote identifiers
    pub fn with_remote_ids(ids: &[&str]) -> Self {
        Self::new(MockConfig {
            remote_ids: ids.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        })
    }

    /// Every create fails with `error`
    pub fn create_failure(error: PublisherError) -> Self {
        Self::new(MockConfig {
            create_error: Some(error),
            ..Default::default()
        })
    }

    /// Every delete fails with `error`
    pub fn delete_failure(error: PublisherError) -> Self {
        Self::new(MockConfig {
            delete_error: Some(error),
            ..Default::default()
        })
    }

    /// Every call waits `delay` first
    pub fn with_delay(delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..Default::default()
        })
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread must not take every other assertion down with it
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_create_error(&self, error: Option<PublisherError>) {
        self.lock().config.create_error = error;
    }

    pub fn set_update_error(&self, error: Option<PublisherError>) {
        self.lock().config.update_error = error;
    }

    pub fn set_delete_error(&self, error: Option<PublisherError>) {
        self.lock().config.delete_error = error;
    }

    pub fn set_analytics(&self, analytics: Option<RemoteAnalytics>) {
        self.lock().config.analytics = analytics;
    }

    pub fn set_analytics_error(&self, error: Option<PublisherError>) {
        self.lock().config.analytics_error = error;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.lock().config.delay = delay;
    }

    pub fn create_calls(&self) -> Vec<CreatePostRequest> {
        self.lock().created.clone()
    }

    pub fn update_calls(&self) -> Vec<(String, UpdatePostRequest)> {
        self.lock().updated.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.lock().deleted.clone()
    }

    pub fn analytics_calls(&self) -> Vec<String> {
        self.lock().analytics_requests.clone()
    }

    async fn pause(&self) {
        let delay = self.lock().config.delay;
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}

fn remote_post(id: String, request_platforms: Vec<String>, published: bool) -> RemotePost {
    let platforms = request_platforms
        .into_iter()
        .map(|platform| RemoteTarget {
            platform_post_id: published.then(|| format!("{}-native", id)),
            platform_post_url: published.then(|| format!("https://{}.example.com/p/{}", platform, id)),
            platform,
            ..Default::default()
        })
        .collect();

    RemotePost {
        status: if published { "published" } else { "scheduled" }.to_string(),
        id,
        scheduled_for: None,
        platforms,
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn create_post(&self, request: &CreatePostRequest) -> PublishResult<RemotePost> {
        self.pause().await;

        let mut state = self.lock();
        state.created.push(request.clone());
        if let Some(error) = state.config.create_error.clone() {
            return Err(error);
        }

        state.next_id += 1;
        let id = match state.config.remote_ids.pop_front() {
            Some(id) => id,
            None => format!("ext-{}", state.next_id),
        };
        let platforms = request.platforms.iter().map(|p| p.platform.clone()).collect();

        Ok(remote_post(id, platforms, request.publish_now))
    }

    async fn update_post(
        &self,
        remote_id: &str,
        update: &UpdatePostRequest,
    ) -> PublishResult<RemotePost> {
        self.pause().await;

        let mut state = self.lock();
        state.updated.push((remote_id.to_string(), update.clone()));
        if let Some(error) = state.config.update_error.clone() {
            return Err(error);
        }

        let published = update.publish_now.unwrap_or(false);
        Ok(remote_post(remote_id.to_string(), vec!["mock".to_string()], published))
    }

    async fn delete_post(&self, remote_id: &str) -> PublishResult<()> {
        self.pause().await;

        let mut state = self.lock();
        state.deleted.push(remote_id.to_string());
        match state.config.delete_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn get_analytics(&self, remote_id: &str) -> PublishResult<RemoteAnalytics> {
        self.pause().await;

        let mut state = self.lock();
        state.analytics_requests.push(remote_id.to_string());
        if let Some(error) = state.config.analytics_error.clone() {
            return Err(error);
        }

        Ok(state.config.analytics.clone().unwrap_or_else(|| RemoteAnalytics {
            post_id: remote_id.to_string(),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publisher::TargetRequest;

    fn request(publish_now: bool) -> CreatePostRequest {
        CreatePostRequest {
            content: Some("hi".to_string()),
            title: None,
            media_items: vec![],
            platforms: vec![TargetRequest {
                platform: "threads".to_string(),
                account_id: "acc".to_string(),
                platform_specific_data: None,
            }],
            scheduled_for: None,
            publish_now,
            timezone: None,
            hashtags: vec![],
            mentions: vec![],
        }
    }

    #[tokio::test]
    async fn test_hands_out_configured_ids_then_generated() {
        let mock = MockPublisher::with_remote_ids(&["ext-123"]);
        assert_eq!(mock.create_post(&request(false)).await.unwrap().id, "ext-123");
        assert_eq!(mock.create_post(&request(false)).await.unwrap().id, "ext-2");
        assert_eq!(mock.create_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_publish_now_returns_platform_details() {
        let mock = MockPublisher::success();
        let post = mock.create_post(&request(true)).await.unwrap();
        let target = post.target().unwrap();
        assert_eq!(post.status, "published");
        assert!(target.platform_post_url.as_deref().unwrap().starts_with("https://threads."));
    }

    #[tokio::test]
    async fn test_clones_share_behavior() {
        let mock = MockPublisher::success();
        let handle = mock.clone();
        handle.set_create_error(Some(PublisherError::Network("down".to_string())));

        assert!(mock.create_post(&request(false)).await.is_err());
        assert_eq!(handle.create_calls().len(), 1);

        handle.set_create_error(None);
        assert!(mock.create_post(&request(false)).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_failure_is_recorded() {
        let mock = MockPublisher::delete_failure(PublisherError::Api {
            status: 500,
            message: "nope".to_string(),
        });
        assert!(mock.delete_post("ext-1").await.is_err());
        assert_eq!(mock.delete_calls(), vec!["ext-1".to_string()]);
    }
}

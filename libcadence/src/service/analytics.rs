//! Analytics hook
//!
//! Pulls engagement metrics for published posts, keyed by their remote id.
//! Nothing here touches a post's status, and a failed pull is only logged.

use chrono::{Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::events::{Event, EventBus};
use crate::db::Database;
use crate::error::{CadenceError, Result};
use crate::publisher::{with_timeout, Publisher, RemoteAnalytics};
use crate::state::PostStatus;
use crate::types::{PostAnalytics, ScheduledPost};

/// Concurrent metrics requests during a bulk refresh
const REFRESH_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub synced: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<Database>,
    publisher: Arc<dyn Publisher>,
    events: EventBus,
    timeout: Duration,
}

fn to_record(post: &ScheduledPost, remote: RemoteAnalytics) -> PostAnalytics {
    PostAnalytics {
        id: uuid::Uuid::new_v4().to_string(),
        scheduled_post_id: post.id.clone(),
        platform: post.platform,
        views: remote.views,
        likes: remote.likes,
        comments: remote.comments,
        shares: remote.shares,
        saves: remote.saves,
        clicks: remote.clicks,
        impressions: remote.impressions,
        reach: remote.reach,
        engagement_rate: remote.engagement_rate,
        watch_time_seconds: remote.watch_time_seconds,
        avg_watch_percentage: remote.avg_watch_percentage,
        synced_at: remote.synced_at.unwrap_or_else(Utc::now),
    }
}

impl AnalyticsService {
    pub fn new(
        db: Arc<Database>,
        publisher: Arc<dyn Publisher>,
        events: EventBus,
        timeout: Duration,
    ) -> Self {
        Self {
            db,
            publisher,
            events,
            timeout,
        }
    }

    async fn load(&self, post_id: &str) -> Result<ScheduledPost> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("post {}", post_id)))
    }

    /// Refresh the stored metrics for one post.
    ///
    /// Returns `None` when the post is not published, has no remote id, or
    /// the publishing service could not deliver metrics.
    pub async fn sync_post_analytics(&self, post_id: &str) -> Result<Option<PostAnalytics>> {
        let post = self.load(post_id).await?;

        let remote_id = match (&post.status, &post.remote_post_id) {
            (PostStatus::Published, Some(remote_id)) => remote_id.clone(),
            _ => {
                debug!(post_id = %post_id, status = %post.status, "no analytics for unpublished post");
                return Ok(None);
            }
        };

        let remote = match with_timeout(self.timeout, self.publisher.get_analytics(&remote_id)).await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(post_id = %post_id, remote_post_id = %remote_id, error = %e, "analytics pull failed");
                return Ok(None);
            }
        };

        let stored = self.db.upsert_analytics(&to_record(&post, remote)).await?;
        debug!(post_id = %post_id, views = stored.views, "analytics stored");
        self.events.emit(Event::AnalyticsSynced {
            post_id: post_id.to_string(),
        });

        Ok(Some(stored))
    }

    /// Refresh metrics for every post published in the last `days` days
    pub async fn sync_recent_published(&self, days: u32) -> Result<AnalyticsReport> {
        let since = Utc::now() - ChronoDuration::days(i64::from(days));
        let posts = self.db.published_since(since).await?;

        let outcomes: Vec<bool> = stream::iter(posts)
            .map(|post| async move {
                match self.sync_post_analytics(&post.id).await {
                    Ok(stored) => stored.is_some(),
                    Err(e) => {
                        warn!(post_id = %post.id, error = %e, "analytics refresh failed");
                        false
                    }
                }
            })
            .buffer_unordered(REFRESH_CONCURRENCY)
            .collect()
            .await;

        let synced = outcomes.iter().filter(|ok| **ok).count();
        let report = AnalyticsReport {
            synced,
            failed: outcomes.len() - synced,
        };

        info!(days, synced = report.synced, failed = report.failed, "analytics refreshed");
        Ok(report)
    }

    pub async fn get_analytics(&self, post_id: &str) -> Result<Option<PostAnalytics>> {
        self.load(post_id).await?;
        self.db.get_analytics(post_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PublisherError;
    use crate::publisher::mock::MockPublisher;
    use crate::service::scheduler::ScheduleSingle;
    use crate::service::test_support::*;
    use crate::service::CadenceService;

    async fn published(service: &CadenceService, account: &str) -> ScheduledPost {
        let post = service
            .scheduler()
            .schedule_single(ScheduleSingle::new(CONTENT, account, Utc::now()))
            .await
            .unwrap();
        service.sync().publish_now(&post.id).await.unwrap()
    }

    fn metrics(views: i64) -> RemoteAnalytics {
        RemoteAnalytics {
            views,
            likes: 12,
            engagement_rate: 0.05,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sync_post_analytics_upserts() {
        let mock = MockPublisher::success();
        let (service, _temp_dir) = setup(mock.clone()).await;
        let post = published(&service, ACTIVE_ACCOUNT).await;

        mock.set_analytics(Some(metrics(100)));
        service.analytics().sync_post_analytics(&post.id).await.unwrap();
        mock.set_analytics(Some(metrics(250)));
        let stored = service
            .analytics()
            .sync_post_analytics(&post.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stored.views, 250);
        assert_eq!(stored.platform, post.platform);
        assert_eq!(mock.analytics_calls(), vec![
            post.remote_post_id.clone().unwrap(),
            post.remote_post_id.clone().unwrap()
        ]);
        let fetched = service.analytics().get_analytics(&post.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, stored.id);
    }

    #[tokio::test]
    async fn test_unpublished_post_is_skipped() {
        let mock = MockPublisher::success();
        let (service, _temp_dir) = setup(mock.clone()).await;
        let post = service
            .scheduler()
            .schedule_single(ScheduleSingle::new(CONTENT, ACTIVE_ACCOUNT, Utc::now()))
            .await
            .unwrap();

        let result = service.analytics().sync_post_analytics(&post.id).await.unwrap();

        assert!(result.is_none());
        assert!(mock.analytics_calls().is_empty());
    }

    #[tokio::test]
    async fn test_pull_failure_leaves_post_untouched() {
        let mock = MockPublisher::success();
        let (service, _temp_dir) = setup(mock.clone()).await;
        let post = published(&service, ACTIVE_ACCOUNT).await;
        mock.set_analytics_error(Some(PublisherError::RateLimit { retry_after: Some(60) }));

        let result = service.analytics().sync_post_analytics(&post.id).await.unwrap();

        assert!(result.is_none());
        let stored = service.calendar().get(&post.id).await.unwrap();
        assert_eq!(stored.status, PostStatus::Published);
        assert_eq!(stored.retry_count, 0);
    }

    #[tokio::test]
    async fn test_sync_recent_published_counts() {
        let mock = MockPublisher::success();
        let (service, _temp_dir) = setup(mock.clone()).await;
        published(&service, ACTIVE_ACCOUNT).await;
        published(&service, SECOND_ACCOUNT).await;

        let report = service.analytics().sync_recent_published(7).await.unwrap();
        assert_eq!(report, AnalyticsReport { synced: 2, failed: 0 });

        mock.set_analytics_error(Some(PublisherError::Network("down".to_string())));
        let report = service.analytics().sync_recent_published(7).await.unwrap();
        assert_eq!(report, AnalyticsReport { synced: 0, failed: 2 });
    }

    #[tokio::test]
    async fn test_get_analytics_for_missing_post() {
        let (service, _temp_dir) = setup(MockPublisher::success()).await;
        assert!(matches!(
            service.analytics().get_analytics("nope").await,
            Err(CadenceError::NotFound(_))
        ));
    }
}

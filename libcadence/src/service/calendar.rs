//! Calendar and query service
//!
//! Read-side views over scheduled posts plus the two operator mutations
//! that act on an existing post: reschedule and cancel.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use super::events::EventBus;
use super::sync::SyncEngine;
use crate::db::{Database, PostFilter};
use crate::error::{CadenceError, Result};
use crate::state::{PostStatus, Trigger};
use crate::types::ScheduledPost;

/// Largest page `list` returns
pub const MAX_PAGE_SIZE: u32 = 200;

/// Post counts for the queue overview
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    /// Posts not yet published or cancelled
    pub open_by_platform: BTreeMap<String, i64>,
}

#[derive(Clone)]
pub struct CalendarService {
    db: Arc<Database>,
    sync: SyncEngine,
    events: EventBus,
}

impl CalendarService {
    pub fn new(db: Arc<Database>, sync: SyncEngine, events: EventBus) -> Self {
        Self { db, sync, events }
    }

    pub async fn get(&self, post_id: &str) -> Result<ScheduledPost> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("post {}", post_id)))
    }

    /// Non-cancelled posts scheduled within `[from, to]`, earliest first.
    ///
    /// `account_ids` narrows the result to those accounts; an empty list
    /// matches nothing.
    pub async fn range_query(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        account_ids: Option<&[String]>,
    ) -> Result<Vec<ScheduledPost>> {
        if from > to {
            return Err(CadenceError::Validation(format!(
                "range start {} is after its end {}",
                from, to
            )));
        }
        self.db.posts_in_range(from, to, account_ids).await
    }

    pub async fn list(&self, mut filter: PostFilter) -> Result<Vec<ScheduledPost>> {
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        self.db.query_posts(&filter).await
    }

    /// `SCHEDULED` posts due within the next `hours`
    pub async fn upcoming(&self, hours: u32, limit: u32) -> Result<Vec<ScheduledPost>> {
        let now = Utc::now();
        let until = now + Duration::hours(i64::from(hours));
        self.db
            .scheduled_between(now, until, limit.clamp(1, MAX_PAGE_SIZE))
            .await
    }

    pub async fn batch(&self, batch_id: &str) -> Result<Vec<ScheduledPost>> {
        let posts = self.db.posts_in_batch(batch_id).await?;
        if posts.is_empty() {
            return Err(CadenceError::NotFound(format!("batch {}", batch_id)));
        }
        Ok(posts)
    }

    /// Failed posts, most recent failure first
    pub async fn failed(&self, limit: u32) -> Result<Vec<ScheduledPost>> {
        self.db.failed_posts(limit.clamp(1, MAX_PAGE_SIZE)).await
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        let mut stats = QueueStats::default();

        for (status, count) in self.db.count_by_status().await? {
            stats.total += count;
            stats.by_status.insert(status.as_str().to_string(), count);
        }
        for (platform, count) in self.db.count_open_by_platform().await? {
            stats.open_by_platform.insert(platform.as_str().to_string(), count);
        }

        Ok(stats)
    }

    /// Move a post to a new time, and optionally a new timezone.
    ///
    /// A `SCHEDULED` post drops back to `PENDING_SYNC`; if it exists remotely
    /// the remote post is updated at once and any failure from that call is
    /// returned (the post is then `FAILED`). `DRAFT` and `PENDING_SYNC` posts
    /// only change locally. Terminal and in-flight posts are a `Conflict`.
    pub async fn reschedule(
        &self,
        post_id: &str,
        new_time: DateTime<Utc>,
        new_timezone: Option<String>,
    ) -> Result<ScheduledPost> {
        if let Some(tz) = &new_timezone {
            if tz.trim().is_empty() {
                return Err(CadenceError::Validation("timezone must not be empty".to_string()));
            }
        }

        let change = self
            .db
            .modify_post(post_id, |p| {
                p.transition(Trigger::Reschedule)?;
                p.scheduled_for = new_time;
                if let Some(tz) = new_timezone {
                    p.timezone = tz;
                }
                Ok(())
            })
            .await?;

        info!(
            post_id = %post_id,
            from = %change.before.scheduled_for,
            to = %change.after.scheduled_for,
            status = %change.after.status,
            "post rescheduled"
        );
        self.events.emit_change(&change);

        if change.before.status == PostStatus::Scheduled && change.after.remote_post_id.is_some() {
            return self.sync.update_remote_schedule(post_id).await;
        }

        Ok(change.after)
    }

    /// Cancel a post.
    ///
    /// The remote booking, if any, is deleted first on a best-effort basis:
    /// the post is cancelled locally whether or not that call succeeds.
    pub async fn cancel(&self, post_id: &str) -> Result<ScheduledPost> {
        let post = self.get(post_id).await?;
        self.cancel_post(post).await
    }

    async fn cancel_post(&self, post: ScheduledPost) -> Result<ScheduledPost> {
        post.status.apply(Trigger::Cancel)?;

        let mut remote_deleted = self.sync.delete_remote(&post).await;

        let change = self
            .db
            .modify_post(&post.id, |p| p.transition(Trigger::Cancel).map(|_| ()))
            .await?;

        // A push may have created the remote post after our read
        if change.before.remote_post_id.is_some()
            && change.before.remote_post_id != post.remote_post_id
        {
            remote_deleted = self.sync.delete_remote(&change.before).await;
        }

        info!(post_id = %post.id, remote_deleted, "post cancelled");
        self.events.emit_change(&change);
        Ok(change.after)
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

    async fn schedule(service: &CadenceService, account: &str, at: DateTime<Utc>, sync: bool) -> ScheduledPost {
        let mut request = ScheduleSingle::new(CONTENT, account, at);
        request.sync_on_create = sync;
        service.scheduler().schedule_single(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_reschedule_scheduled_post_updates_remote() {
        let mock = MockPublisher::with_remote_ids(&["ext-123"]);
        let (service, _temp_dir) = setup(mock.clone()).await;
        let post = schedule(&service, ACTIVE_ACCOUNT, Utc::now() + Duration::hours(1), true).await;

        let new_time = Utc::now() + Duration::days(2);
        let moved = service
            .calendar()
            .reschedule(&post.id, new_time, Some("America/New_York".to_string()))
            .await
            .unwrap();

        assert_eq!(moved.status, PostStatus::PendingSync);
        assert_eq!(moved.remote_post_id.as_deref(), Some("ext-123"));
        assert_eq!(moved.timezone, "America/New_York");
        assert_eq!(moved.scheduled_for.timestamp(), new_time.timestamp());

        let updates = mock.update_calls();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "ext-123");
        assert_eq!(updates[0].1.timezone.as_deref(), Some("America/New_York"));
        assert_eq!(mock.create_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_reschedule_draft_only_changes_time() {
        let mock = MockPublisher::success();
        let (service, _temp_dir) = setup(mock.clone()).await;
        let post = schedule(&service, ACTIVE_ACCOUNT, Utc::now(), false).await;

        let moved = service
            .calendar()
            .reschedule(&post.id, Utc::now() + Duration::hours(5), None)
            .await
            .unwrap();

        assert_eq!(moved.status, PostStatus::Draft);
        assert_eq!(moved.timezone, "UTC");
        assert!(mock.update_calls().is_empty());
    }

    #[tokio::test]
    async fn test_reschedule_remote_failure_propagates() {
        let mock = MockPublisher::success();
        let (service, _temp_dir) = setup(mock.clone()).await;
        let post = schedule(&service, ACTIVE_ACCOUNT, Utc::now(), true).await;
        mock.set_update_error(Some(PublisherError::Api {
            status: 503,
            message: "unavailable".to_string(),
        }));

        let result = service
            .calendar()
            .reschedule(&post.id, Utc::now() + Duration::hours(3), None)
            .await;

        assert!(matches!(result, Err(CadenceError::Publisher(_))));
        let stored = service.calendar().get(&post.id).await.unwrap();
        assert_eq!(stored.status, PostStatus::Failed);
        assert_eq!(stored.remote_post_id, post.remote_post_id);
    }

    #[tokio::test]
    async fn test_cancel_is_best_effort() {
        let mock = MockPublisher::success();
        let (service, _temp_dir) = setup(mock.clone()).await;
        let post = schedule(&service, ACTIVE_ACCOUNT, Utc::now(), true).await;
        mock.set_delete_error(Some(PublisherError::Network("reset".to_string())));

        let cancelled = service.calendar().cancel(&post.id).await.unwrap();

        assert_eq!(cancelled.status, PostStatus::Cancelled);
        assert_eq!(mock.delete_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_withdraws_post_pushed_after_read() {
        let mock = MockPublisher::with_remote_ids(&["ext-1"]);
        let (service, _temp_dir) = setup(mock.clone()).await;
        let account = service.db().get_account(ACTIVE_ACCOUNT).await.unwrap().unwrap();
        let post = ScheduledPost::new(CONTENT, &account, Utc::now(), "UTC", None, true);
        service.db().insert_post(&post).await.unwrap();

        let read = service.calendar().get(&post.id).await.unwrap();
        assert!(read.remote_post_id.is_none());
        service.sync().push(&post.id).await.unwrap();

        let cancelled = service.calendar().cancel_post(read).await.unwrap();

        assert_eq!(cancelled.status, PostStatus::Cancelled);
        assert_eq!(mock.delete_calls(), vec!["ext-1".to_string()]);
    }

    #[tokio::test]
    async fn test_terminal_posts_reject_changes() {
        let (service, _temp_dir) = setup(MockPublisher::success()).await;
        let post = schedule(&service, ACTIVE_ACCOUNT, Utc::now(), true).await;
        service.sync().publish_now(&post.id).await.unwrap();

        let calendar = service.calendar();
        assert!(matches!(
            calendar.reschedule(&post.id, Utc::now(), None).await,
            Err(CadenceError::Conflict(_))
        ));
        assert!(matches!(
            calendar.cancel(&post.id).await,
            Err(CadenceError::Conflict(_))
        ));
        assert_eq!(calendar.get(&post.id).await.unwrap().status, PostStatus::Published);
    }

    #[tokio::test]
    async fn test_range_query_validates_and_filters() {
        let (service, _temp_dir) = setup(MockPublisher::success()).await;
        let base = Utc::now();
        let first = schedule(&service, ACTIVE_ACCOUNT, base + Duration::hours(1), false).await;
        schedule(&service, SECOND_ACCOUNT, base + Duration::hours(2), false).await;
        let cancelled = schedule(&service, ACTIVE_ACCOUNT, base + Duration::hours(3), false).await;
        service.calendar().cancel(&cancelled.id).await.unwrap();

        let calendar = service.calendar();
        assert!(matches!(
            calendar.range_query(base + Duration::days(1), base, None).await,
            Err(CadenceError::Validation(_))
        ));

        let all = calendar.range_query(base, base + Duration::days(1), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let only_first = calendar
            .range_query(base, base + Duration::days(1), Some(&[ACTIVE_ACCOUNT.to_string()]))
            .await
            .unwrap();
        assert_eq!(only_first.len(), 1);
        assert_eq!(only_first[0].id, first.id);
    }

    #[tokio::test]
    async fn test_upcoming_only_returns_scheduled() {
        let (service, _temp_dir) = setup(MockPublisher::success()).await;
        let soon = schedule(&service, ACTIVE_ACCOUNT, Utc::now() + Duration::hours(2), true).await;
        schedule(&service, SECOND_ACCOUNT, Utc::now() + Duration::hours(3), false).await;
        schedule(&service, THIRD_ACCOUNT, Utc::now() + Duration::hours(48), true).await;

        let upcoming = service.calendar().upcoming(24, 20).await.unwrap();

        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, soon.id);
    }

    #[tokio::test]
    async fn test_batch_not_found_and_stats() {
        let (service, _temp_dir) = setup(MockPublisher::success()).await;
        assert!(matches!(
            service.calendar().batch("nope").await,
            Err(CadenceError::NotFound(_))
        ));

        schedule(&service, ACTIVE_ACCOUNT, Utc::now(), true).await;
        schedule(&service, SECOND_ACCOUNT, Utc::now(), false).await;

        let stats = service.calendar().stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status.get("scheduled"), Some(&1));
        assert_eq!(stats.by_status.get("draft"), Some(&1));
        assert_eq!(stats.open_by_platform.get("twitter"), Some(&1));
    }
}

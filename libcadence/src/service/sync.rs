//! Synchronization engine
//!
//! Folds local scheduling intent into calls against the publishing service
//! and the answers back into local state. A post's `remote_post_id` is the
//! idempotency key: once set, the post is only ever updated or deleted
//! remotely, never created again.
//!
//! Every external call is bounded by the configured timeout and every
//! failure is written onto the post (`FAILED`, `error_message`,
//! `retry_count`) before the error is returned to the caller.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::events::{Event, EventBus};
use crate::db::Database;
use crate::error::{CadenceError, PublisherError, Result};
use crate::publisher::{with_timeout, CreatePostRequest, Publisher, RemotePost, UpdatePostRequest};
use crate::state::{PostStatus, Trigger};
use crate::types::{ConnectedAccount, ContentReference, RemoteStatus, ScheduledPost};

/// Most posts handled by one sweep; the rest wait for the next one
pub const SWEEP_LIMIT: u32 = 1000;

/// Outcome of a sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub synced: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct SyncEngine {
    db: Arc<Database>,
    publisher: Arc<dyn Publisher>,
    events: EventBus,
    timeout: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Marks a post as being synced by this process until dropped
struct InFlight {
    posts: Arc<Mutex<HashSet<String>>>,
    post_id: String,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.posts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.post_id);
    }
}

/// Copy what the service reported about a post onto the local record
fn apply_remote(post: &mut ScheduledPost, remote: &RemotePost) {
    if let Some(status) = remote.remote_status() {
        post.remote_status = Some(status);
    }
    if let Some(target) = remote.target() {
        if let Some(id) = &target.platform_post_id {
            post.platform_post_id = Some(id.clone());
        }
        if let Some(url) = &target.platform_post_url {
            post.remote_post_url = Some(url.clone());
        }
    }
}

impl SyncEngine {
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
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn claim(&self, post_id: &str) -> Result<InFlight> {
        let mut posts = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !posts.insert(post_id.to_string()) {
            return Err(CadenceError::Conflict(format!(
                "post {} is already being synced",
                post_id
            )));
        }
        Ok(InFlight {
            posts: Arc::clone(&self.in_flight),
            post_id: post_id.to_string(),
        })
    }

    async fn load(&self, post_id: &str) -> Result<ScheduledPost> {
        self.db
            .get_post(post_id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("post {}", post_id)))
    }

    /// Account and content a post needs before anything is sent out
    async fn load_targets(&self, post: &ScheduledPost) -> Result<(ConnectedAccount, ContentReference)> {
        let account = self
            .db
            .get_account(&post.account_id)
            .await?
            .ok_or_else(|| CadenceError::Validation(format!("account {} not found", post.account_id)))?;

        if !account.is_active {
            return Err(CadenceError::Validation(format!(
                "account {} is not active",
                account.id
            )));
        }

        let content = self
            .db
            .get_content(&post.content_id)
            .await?
            .ok_or_else(|| CadenceError::Validation(format!("content {} not found", post.content_id)))?;

        Ok((account, content))
    }

    /// Move the post to `FAILED` through `trigger` and keep `message` on it
    async fn record_failure(&self, post_id: &str, trigger: Trigger, message: &str) -> Result<()> {
        let change = self
            .db
            .modify_post(post_id, |p| p.fail(trigger, message))
            .await?;

        warn!(
            post_id = %post_id,
            retry_count = change.after.retry_count,
            error = %message,
            "post failed"
        );
        self.events.emit_change(&change);
        Ok(())
    }

    /// Account and content for a sync, failing the post when either is unusable
    async fn sync_targets(
        &self,
        post: &ScheduledPost,
    ) -> Result<(ConnectedAccount, ContentReference)> {
        match self.load_targets(post).await {
            Ok(targets) => Ok(targets),
            Err(CadenceError::Validation(reason)) => {
                self.record_failure(&post.id, Trigger::SyncFailed, &reason).await?;
                Err(CadenceError::Validation(reason))
            }
            Err(e) => Err(e),
        }
    }

    /// Create the post on the publishing service.
    ///
    /// Only `PENDING_SYNC` posts without a remote id are pushed. On success
    /// the post becomes `SCHEDULED` with its remote id; on failure it becomes
    /// `FAILED` and the error is returned.
    pub async fn push(&self, post_id: &str) -> Result<ScheduledPost> {
        let _guard = self.claim(post_id)?;
        self.push_claimed(post_id).await
    }

    async fn push_claimed(&self, post_id: &str) -> Result<ScheduledPost> {
        let post = self.load(post_id).await?;

        if let Some(remote_id) = &post.remote_post_id {
            return Err(CadenceError::Conflict(format!(
                "post {} was already created remotely as {}",
                post_id, remote_id
            )));
        }
        post.status.apply(Trigger::SyncSucceeded)?;

        let (account, content) = self.sync_targets(&post).await?;

        let request = CreatePostRequest::for_post(&post, &account, &content, false);
        debug!(post_id = %post_id, platform = %post.platform, "pushing post");

        match with_timeout(self.timeout, self.publisher.create_post(&request)).await {
            Ok(remote) => self.record_created(post_id, &remote).await,
            Err(err) => {
                self.record_failure(post_id, Trigger::SyncFailed, &err.to_string())
                    .await?;
                Err(err.into())
            }
        }
    }

    async fn record_created(&self, post_id: &str, remote: &RemotePost) -> Result<ScheduledPost> {
        let result = self
            .db
            .modify_post(post_id, |p| {
                p.assign_remote_id(&remote.id)?;
                apply_remote(p, remote);
                if p.remote_status.is_none() {
                    p.remote_status = Some(RemoteStatus::Scheduled);
                }
                p.transition(Trigger::SyncSucceeded)?;
                Ok(())
            })
            .await;

        match result {
            Ok(change) => {
                info!(post_id = %post_id, remote_post_id = %remote.id, "post scheduled remotely");
                self.events.emit_change(&change);
                Ok(change.after)
            }
            Err(CadenceError::Conflict(reason)) => {
                // Cancelled or rescheduled while the create was in flight
                warn!(
                    post_id = %post_id,
                    remote_post_id = %remote.id,
                    "post changed during push, withdrawing remote post: {}",
                    reason
                );
                if let Err(e) = with_timeout(self.timeout, self.publisher.delete_post(&remote.id)).await {
                    warn!(remote_post_id = %remote.id, error = %e, "could not withdraw remote post");
                }
                Err(CadenceError::Conflict(reason))
            }
            Err(e) => {
                error!(
                    post_id = %post_id,
                    remote_post_id = %remote.id,
                    error = %e,
                    "remote post created but could not be recorded"
                );
                Err(e)
            }
        }
    }

    /// Send the post's current time and timezone to the existing remote post.
    ///
    /// Used after a reschedule. The post must be `PENDING_SYNC` and already
    /// carry a remote id, which is left untouched. Success does not change
    /// the post's status; failure moves it to `FAILED`.
    pub async fn update_remote_schedule(&self, post_id: &str) -> Result<ScheduledPost> {
        let _guard = self.claim(post_id)?;
        self.update_claimed(post_id).await
    }

    async fn update_claimed(&self, post_id: &str) -> Result<ScheduledPost> {
        let post = self.load(post_id).await?;

        let remote_id = post.remote_post_id.clone().ok_or_else(|| {
            CadenceError::Validation(format!("post {} has not been created remotely", post_id))
        })?;
        post.status.apply(Trigger::SyncSucceeded)?;
        self.sync_targets(&post).await?;

        let update = UpdatePostRequest::reschedule(&post);
        debug!(post_id = %post_id, remote_post_id = %remote_id, "updating remote schedule");

        match with_timeout(self.timeout, self.publisher.update_post(&remote_id, &update)).await {
            Ok(remote) => {
                let change = self
                    .db
                    .modify_post(post_id, |p| {
                        apply_remote(p, &remote);
                        Ok(())
                    })
                    .await?;
                info!(
                    post_id = %post_id,
                    remote_post_id = %remote_id,
                    scheduled_for = %change.after.scheduled_for,
                    "remote schedule updated"
                );
                Ok(change.after)
            }
            Err(err) => {
                self.record_failure(post_id, Trigger::SyncFailed, &err.to_string())
                    .await?;
                Err(err.into())
            }
        }
    }

    /// Bring one `PENDING_SYNC` post in line with the publishing service.
    ///
    /// Posts never seen remotely are created; posts that already have a
    /// remote id are updated. Either way success ends in `SCHEDULED`.
    pub async fn sync_post(&self, post_id: &str) -> Result<ScheduledPost> {
        let _guard = self.claim(post_id)?;
        let post = self.load(post_id).await?;

        if post.remote_post_id.is_none() {
            return self.push_claimed(post_id).await;
        }

        self.update_claimed(post_id).await?;
        let change = self
            .db
            .modify_post(post_id, |p| p.transition(Trigger::SyncSucceeded).map(|_| ()))
            .await?;
        self.events.emit_change(&change);
        Ok(change.after)
    }

    /// Sync every post waiting in `PENDING_SYNC`, oldest first.
    ///
    /// One post failing never stops the sweep. `FAILED` posts are not
    /// retried here; they need a reschedule or requeue first.
    pub async fn sweep(&self) -> Result<SweepReport> {
        let pending = self
            .db
            .posts_with_status(PostStatus::PendingSync, SWEEP_LIMIT)
            .await?;

        let mut report = SweepReport::default();
        for post in &pending {
            match self.sync_post(&post.id).await {
                Ok(_) => report.synced += 1,
                // Someone else moved the post on; nothing failed
                Err(CadenceError::Conflict(reason)) => {
                    debug!(post_id = %post.id, "skipped during sweep: {}", reason);
                }
                Err(e) => {
                    warn!(post_id = %post.id, error = %e, "sync failed during sweep");
                    report.failed += 1;
                }
            }
        }

        if !pending.is_empty() {
            info!(synced = report.synced, failed = report.failed, "sweep finished");
        }
        self.events.emit(Event::SweepCompleted {
            synced: report.synced,
            failed: report.failed,
        });

        Ok(report)
    }

    /// Ask the publishing service to drop the post's remote booking.
    ///
    /// Best-effort: returns whether the remote post is gone. A failure is
    /// logged and announced as `RemoteDeleteFailed` but never returned, so
    /// it cannot block a local cancellation.
    pub async fn delete_remote(&self, post: &ScheduledPost) -> bool {
        let Some(remote_id) = post.remote_post_id.as_deref() else {
            return true;
        };

        match with_timeout(self.timeout, self.publisher.delete_post(remote_id)).await {
            Ok(()) => {
                info!(post_id = %post.id, remote_post_id = %remote_id, "remote post deleted");
                true
            }
            Err(PublisherError::NotFound(_)) => {
                debug!(post_id = %post.id, remote_post_id = %remote_id, "remote post already gone");
                true
            }
            Err(err) => {
                warn!(
                    post_id = %post.id,
                    remote_post_id = %remote_id,
                    error = %err,
                    "remote delete failed; the publishing service may still hold this post"
                );
                self.events.emit(Event::RemoteDeleteFailed {
                    post_id: post.id.clone(),
                    remote_post_id: remote_id.to_string(),
                    error: err.to_string(),
                });
                false
            }
        }
    }

    /// Publish the post immediately instead of at its scheduled time.
    ///
    /// A post that already exists remotely is updated to publish now, so its
    /// remote id never changes. Otherwise it is created with the publish-now
    /// flag. Ends in `PUBLISHED` or `FAILED`. A post left in `PUBLISHING` by
    /// an interrupted call is published again.
    pub async fn publish_now(&self, post_id: &str) -> Result<ScheduledPost> {
        let _guard = self.claim(post_id)?;
        let post = self.load(post_id).await?;
        post.status.apply(Trigger::PublishNow)?;

        // Validation problems leave the post as it was
        let (account, content) = self.load_targets(&post).await?;

        let change = self
            .db
            .modify_post(post_id, |p| p.transition(Trigger::PublishNow).map(|_| ()))
            .await?;
        self.events.emit_change(&change);
        let post = change.after;

        let outcome = match post.remote_post_id.as_deref() {
            Some(remote_id) => {
                let update = UpdatePostRequest::publish_now();
                with_timeout(self.timeout, self.publisher.update_post(remote_id, &update)).await
            }
            None => {
                let request = CreatePostRequest::for_post(&post, &account, &content, true);
                with_timeout(self.timeout, self.publisher.create_post(&request)).await
            }
        };

        match outcome {
            Ok(remote) => {
                let result = self
                    .db
                    .modify_post(post_id, |p| {
                        p.assign_remote_id(&remote.id)?;
                        apply_remote(p, &remote);
                        p.remote_status = Some(RemoteStatus::Published);
                        p.transition(Trigger::PublishSucceeded)?;
                        Ok(())
                    })
                    .await;
                let change = match result {
                    Ok(change) => change,
                    Err(e) => {
                        // Never leave the post in PUBLISHING
                        let message = format!(
                            "published remotely as {} but could not record it: {}",
                            remote.id, e
                        );
                        if let Err(fail_err) = self
                            .record_failure(post_id, Trigger::PublishFailed, &message)
                            .await
                        {
                            error!(
                                post_id = %post_id,
                                remote_post_id = %remote.id,
                                error = %fail_err,
                                "could not mark post failed"
                            );
                        }
                        return Err(e);
                    }
                };
                info!(
                    post_id = %post_id,
                    remote_post_id = %remote.id,
                    url = change.after.remote_post_url.as_deref().unwrap_or("-"),
                    "post published"
                );
                self.events.emit_change(&change);
                Ok(change.after)
            }
            Err(err) => {
                self.record_failure(post_id, Trigger::PublishFailed, &err.to_string())
                    .await?;
                Err(err.into())
            }
        }
    }

    /// Put a `FAILED` post back in the sweep's queue
    pub async fn requeue(&self, post_id: &str) -> Result<ScheduledPost> {
        let change = self
            .db
            .modify_post(post_id, |p| p.transition(Trigger::Requeue).map(|_| ()))
            .await?;

        info!(post_id = %post_id, retry_count = change.after.retry_count, "post requeued");
        self.events.emit_change(&change);
        Ok(change.after)
    }
}

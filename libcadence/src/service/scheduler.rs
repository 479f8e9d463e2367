//! Batch coordinator
//!
//! Creates scheduled posts from a content item and one or more target
//! accounts. Multi-account schedules share a fresh `batch_id`; accounts are
//! validated and created in the order given, and a later invalid account
//! does not undo the posts created before it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

use super::events::{Event, EventBus};
use super::sync::SyncEngine;
use crate::db::Database;
use crate::error::{CadenceError, Result};
use crate::state::PostStatus;
use crate::types::{ConnectedAccount, ContentReference, ScheduledPost};

/// One content item to one account
#[derive(Debug, Clone)]
pub struct ScheduleSingle {
    pub content_id: String,
    pub account_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub timezone: String,
    pub platform_specific_config: Option<serde_json::Value>,
    /// Push to the publishing service right away instead of leaving a draft
    pub sync_on_create: bool,
}

impl ScheduleSingle {
    pub fn new(content_id: &str, account_id: &str, scheduled_for: DateTime<Utc>) -> Self {
        Self {
            content_id: content_id.to_string(),
            account_id: account_id.to_string(),
            scheduled_for,
            timezone: "UTC".to_string(),
            platform_specific_config: None,
            sync_on_create: true,
        }
    }
}

/// Per-account part of a multi-account schedule
#[derive(Debug, Clone)]
pub struct AccountSchedule {
    pub account_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub platform_specific_config: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ScheduleMulti {
    pub content_id: String,
    pub targets: Vec<AccountSchedule>,
    pub timezone: String,
    pub sync_on_create: bool,
}

/// Posts created together by one multi-account schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBatch {
    pub batch_id: String,
    pub posts: Vec<ScheduledPost>,
}

#[derive(Clone)]
pub struct Scheduler {
    db: Arc<Database>,
    sync: SyncEngine,
    events: EventBus,
}

fn check_timezone(timezone: &str) -> Result<()> {
    if timezone.trim().is_empty() {
        return Err(CadenceError::Validation("timezone must not be empty".to_string()));
    }
    Ok(())
}

impl Scheduler {
    pub fn new(db: Arc<Database>, sync: SyncEngine, events: EventBus) -> Self {
        Self { db, sync, events }
    }

    async fn require_account(&self, account_id: &str) -> Result<ConnectedAccount> {
        let account = self
            .db
            .get_account(account_id)
            .await?
            .ok_or_else(|| CadenceError::Validation(format!("account {} not found", account_id)))?;

        if !account.is_active {
            return Err(CadenceError::Validation(format!(
                "account {} is not active",
                account_id
            )));
        }
        Ok(account)
    }

    async fn require_content(&self, content_id: &str) -> Result<ContentReference> {
        self.db
            .get_content(content_id)
            .await?
            .ok_or_else(|| CadenceError::Validation(format!("content {} not found", content_id)))
    }

    async fn create(&self, post: &ScheduledPost) -> Result<()> {
        self.db.insert_post(post).await?;

        info!(
            post_id = %post.id,
            account_id = %post.account_id,
            platform = %post.platform,
            batch_id = post.batch_id.as_deref().unwrap_or("-"),
            scheduled_for = %post.scheduled_for,
            status = %post.status,
            "post created"
        );
        self.events.emit(Event::PostCreated {
            post_id: post.id.clone(),
            batch_id: post.batch_id.clone(),
        });
        Ok(())
    }

    /// Push a freshly created post if it is waiting for sync.
    ///
    /// A failed push is already recorded on the post, so it is logged here
    /// and the stored post is returned as it now stands.
    async fn sync_created(&self, post: ScheduledPost) -> Result<ScheduledPost> {
        if post.status != PostStatus::PendingSync {
            return Ok(post);
        }

        if let Err(e) = self.sync.push(&post.id).await {
            warn!(post_id = %post.id, error = %e, "initial sync failed");
        }

        self.db
            .get_post(&post.id)
            .await?
            .ok_or_else(|| CadenceError::NotFound(format!("post {}", post.id)))
    }

    /// Schedule one content item to one account
    pub async fn schedule_single(&self, request: ScheduleSingle) -> Result<ScheduledPost> {
        check_timezone(&request.timezone)?;
        let account = self.require_account(&request.account_id).await?;
        let content = self.require_content(&request.content_id).await?;

        let mut post = ScheduledPost::new(
            &content.id,
            &account,
            request.scheduled_for,
            &request.timezone,
            None,
            request.sync_on_create,
        );
        post.platform_specific_config = request.platform_specific_config;

        self.create(&post).await?;
        self.sync_created(post).await
    }

    /// Schedule one content item to several accounts under a new batch id.
    ///
    /// The first account that fails validation stops the call with a
    /// `Validation` error; posts already created for earlier accounts stay
    /// in place and can be found through the batch id in the message.
    pub async fn schedule_multi(&self, request: ScheduleMulti) -> Result<ScheduleBatch> {
        if request.targets.is_empty() {
            return Err(CadenceError::Validation(
                "at least one target account is required".to_string(),
            ));
        }
        check_timezone(&request.timezone)?;

        let mut seen = HashSet::new();
        for target in &request.targets {
            if !seen.insert(target.account_id.as_str()) {
                return Err(CadenceError::Validation(format!(
                    "account {} is listed more than once",
                    target.account_id
                )));
            }
        }

        let content = self.require_content(&request.content_id).await?;
        let batch_id = uuid::Uuid::new_v4().to_string();
        let total = request.targets.len();
        let mut created = Vec::with_capacity(total);

        for target in request.targets {
            let account = match self.require_account(&target.account_id).await {
                Ok(account) => account,
                Err(CadenceError::Validation(reason)) => {
                    warn!(
                        batch_id = %batch_id,
                        created = created.len(),
                        total,
                        "batch stopped at invalid account"
                    );
                    return Err(CadenceError::Validation(format!(
                        "{} (batch {} stopped after {} of {} posts)",
                        reason,
                        batch_id,
                        created.len(),
                        total
                    )));
                }
                Err(e) => return Err(e),
            };

            let mut post = ScheduledPost::new(
                &content.id,
                &account,
                target.scheduled_for,
                &request.timezone,
                Some(batch_id.clone()),
                request.sync_on_create,
            );
            post.platform_specific_config = target.platform_specific_config;

            self.create(&post).await?;
            created.push(post);
        }

        let mut posts = Vec::with_capacity(created.len());
        for post in created {
            posts.push(self.sync_created(post).await?);
        }

        info!(batch_id = %batch_id, posts = posts.len(), "batch scheduled");
        Ok(ScheduleBatch { batch_id, posts })
    }
}

//! Request and response bodies

use chrono::{DateTime, Utc};
use libcadence::service::scheduler::{AccountSchedule, ScheduleMulti, ScheduleSingle};
use libcadence::{CadenceError, Platform, PostAnalytics, PostFilter, PostStatus};
use serde::{Deserialize, Serialize};

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct CreatePostBody {
    pub content_id: String,
    pub account_id: String,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub platform_specific_config: Option<serde_json::Value>,
    #[serde(default = "default_true")]
    pub sync_on_create: bool,
}

impl From<CreatePostBody> for ScheduleSingle {
    fn from(body: CreatePostBody) -> Self {
        ScheduleSingle {
            content_id: body.content_id,
            account_id: body.account_id,
            scheduled_for: body.scheduled_for,
            timezone: body.timezone,
            platform_specific_config: body.platform_specific_config,
            sync_on_create: body.sync_on_create,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountTargetBody {
    pub account_id: String,
    pub scheduled_for: DateTime<Utc>,
    #[serde(default)]
    pub platform_specific_config: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMultiBody {
    pub content_id: String,
    pub accounts: Vec<AccountTargetBody>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub sync_on_create: bool,
}

impl From<CreateMultiBody> for ScheduleMulti {
    fn from(body: CreateMultiBody) -> Self {
        ScheduleMulti {
            content_id: body.content_id,
            targets: body
                .accounts
                .into_iter()
                .map(|a| AccountSchedule {
                    account_id: a.account_id,
                    scheduled_for: a.scheduled_for,
                    platform_specific_config: a.platform_specific_config,
                })
                .collect(),
            timezone: body.timezone,
            sync_on_create: body.sync_on_create,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub platform: Option<String>,
    pub account_id: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl TryFrom<ListQuery> for PostFilter {
    type Error = CadenceError;

    fn try_from(query: ListQuery) -> Result<Self, Self::Error> {
        let defaults = PostFilter::default();
        Ok(PostFilter {
            status: query.status.as_deref().map(str::parse::<PostStatus>).transpose()?,
            platform: query.platform.as_deref().map(str::parse::<Platform>).transpose()?,
            account_id: query.account_id,
            from: query.from_date,
            to: query.to_date,
            skip: query.skip.unwrap_or(defaults.skip),
            limit: query.limit.unwrap_or(defaults.limit),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpcomingQuery {
    pub hours: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleBody {
    pub scheduled_for: DateTime<Utc>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    /// Comma-separated account ids
    pub account_ids: Option<String>,
}

impl CalendarQuery {
    pub fn account_ids(&self) -> Option<Vec<String>> {
        self.account_ids.as_ref().map(|ids| {
            ids.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect()
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CalendarRescheduleBody {
    pub post_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsWindowQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSyncResponse {
    pub synced: bool,
    pub analytics: Option<PostAnalytics>,
}

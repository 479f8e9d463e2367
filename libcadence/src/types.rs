//! Core data types for Cadence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CadenceError, Result};
use crate::state::{PostStatus, Trigger};

/// Social platforms the publishing service can deliver to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Tiktok,
    Youtube,
    Instagram,
    Reddit,
    Linkedin,
    Twitter,
    Facebook,
    Pinterest,
    Bluesky,
    Threads,
    GoogleBusiness,
}

impl Platform {
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Reddit => "reddit",
            Platform::Linkedin => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::Pinterest => "pinterest",
            Platform::Bluesky => "bluesky",
            Platform::Threads => "threads",
            Platform::GoogleBusiness => "google_business",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "tiktok" => Ok(Platform::Tiktok),
            "youtube" => Ok(Platform::Youtube),
            "instagram" => Ok(Platform::Instagram),
            "reddit" => Ok(Platform::Reddit),
            "linkedin" => Ok(Platform::Linkedin),
            "twitter" => Ok(Platform::Twitter),
            "facebook" => Ok(Platform::Facebook),
            "pinterest" => Ok(Platform::Pinterest),
            "bluesky" => Ok(Platform::Bluesky),
            "threads" => Ok(Platform::Threads),
            "google_business" => Ok(Platform::GoogleBusiness),
            other => Err(CadenceError::Validation(format!(
                "Unknown platform: '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    Single,
    Multi,
}

impl ScheduleMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ScheduleMode::Single => "single",
            ScheduleMode::Multi => "multi",
        }
    }
}

impl FromStr for ScheduleMode {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single" => Ok(ScheduleMode::Single),
            "multi" => Ok(ScheduleMode::Multi),
            other => Err(CadenceError::Validation(format!(
                "Unknown schedule mode: '{}'",
                other
            ))),
        }
    }
}

/// Status last reported by the publishing service.
///
/// Tracked separately from [`PostStatus`]; it is informational and never
/// drives a local transition on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Pending,
    Scheduled,
    Processing,
    Published,
    Failed,
    Partial,
}

impl RemoteStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteStatus::Pending => "pending",
            RemoteStatus::Scheduled => "scheduled",
            RemoteStatus::Processing => "processing",
            RemoteStatus::Published => "published",
            RemoteStatus::Failed => "failed",
            RemoteStatus::Partial => "partial",
        }
    }

    /// Lenient parse: unknown values from the service are dropped rather
    /// than failing the whole response.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(RemoteStatus::Pending),
            "scheduled" => Some(RemoteStatus::Scheduled),
            "processing" => Some(RemoteStatus::Processing),
            "published" => Some(RemoteStatus::Published),
            "failed" => Some(RemoteStatus::Failed),
            "partial" => Some(RemoteStatus::Partial),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Gif,
    Document,
    Thumbnail,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Gif => "gif",
            MediaType::Document => "document",
            MediaType::Thumbnail => "thumbnail",
        }
    }
}

impl FromStr for MediaType {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(MediaType::Image),
            "video" => Ok(MediaType::Video),
            "gif" => Ok(MediaType::Gif),
            "document" => Ok(MediaType::Document),
            "thumbnail" => Ok(MediaType::Thumbnail),
            other => Err(CadenceError::Validation(format!(
                "Unknown media type: '{}'",
                other
            ))),
        }
    }
}

/// A publishing account linked through the service's OAuth flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAccount {
    pub id: String,
    pub platform: Platform,
    /// Account handle on the publishing service
    pub remote_account_id: String,
    pub username: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    pub media_type: MediaType,
    pub alt_text: Option<String>,
}

/// Author-produced content a post points at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentReference {
    pub id: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
    pub media: Vec<MediaItem>,
}

/// One piece of content scheduled to one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub id: String,
    pub content_id: String,
    pub account_id: String,
    /// Copied from the account when the post is created
    pub platform: Platform,
    pub scheduled_for: DateTime<Utc>,
    pub timezone: String,
    pub status: PostStatus,
    pub remote_status: Option<RemoteStatus>,
    pub remote_post_id: Option<String>,
    pub platform_post_id: Option<String>,
    pub remote_post_url: Option<String>,
    pub batch_id: Option<String>,
    pub schedule_mode: ScheduleMode,
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub failed_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
    pub platform_specific_config: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledPost {
    /// Build a new, unsaved post for `account`
    pub fn new(
        content_id: &str,
        account: &ConnectedAccount,
        scheduled_for: DateTime<Utc>,
        timezone: &str,
        batch_id: Option<String>,
        sync_on_create: bool,
    ) -> Self {
        let now = Utc::now();
        let schedule_mode = if batch_id.is_some() {
            ScheduleMode::Multi
        } else {
            ScheduleMode::Single
        };

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content_id: content_id.to_string(),
            account_id: account.id.clone(),
            platform: account.platform,
            scheduled_for,
            timezone: timezone.to_string(),
            status: PostStatus::initial(sync_on_create),
            remote_status: None,
            remote_post_id: None,
            platform_post_id: None,
            remote_post_url: None,
            batch_id,
            schedule_mode,
            error_message: None,
            retry_count: 0,
            failed_at: None,
            published_at: None,
            platform_specific_config: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to the status `trigger` leads to and update the failure and
    /// publish bookkeeping that goes with it.
    pub fn transition(&mut self, trigger: Trigger) -> Result<PostStatus> {
        let next = self.status.apply(trigger)?;
        let now = Utc::now();

        match next {
            PostStatus::Failed => {
                self.retry_count += 1;
                self.failed_at = Some(now);
            }
            PostStatus::Published => {
                self.published_at = Some(now);
                self.error_message = None;
            }
            PostStatus::Scheduled => {
                self.error_message = None;
            }
            _ => {}
        }

        self.status = next;
        self.updated_at = now;
        Ok(next)
    }

    /// Transition into `FAILED` and record why
    pub fn fail(&mut self, trigger: Trigger, message: impl Into<String>) -> Result<()> {
        self.transition(trigger)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Record the remote identifier. It can only ever be set once.
    pub fn assign_remote_id(&mut self, remote_post_id: &str) -> Result<()> {
        match &self.remote_post_id {
            None => {
                self.remote_post_id = Some(remote_post_id.to_string());
                Ok(())
            }
            Some(existing) if existing == remote_post_id => Ok(()),
            Some(existing) => Err(CadenceError::Conflict(format!(
                "post {} already has remote id {}",
                self.id, existing
            ))),
        }
    }
}

/// Engagement metrics pulled for a published post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAnalytics {
    pub id: String,
    pub scheduled_post_id: String,
    pub platform: Platform,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub shares: i64,
    pub saves: i64,
    pub clicks: i64,
    pub impressions: i64,
    pub reach: i64,
    pub engagement_rate: f64,
    pub watch_time_seconds: Option<f64>,
    pub avg_watch_percentage: Option<f64>,
    pub synced_at: DateTime<Utc>,
}

//! JSON shapes exchanged with the publishing service (camelCase on the wire)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ConnectedAccount, ContentReference, RemoteStatus, ScheduledPost};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetRequest {
    pub platform: String,
    pub account_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_specific_data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub media_items: Vec<MediaPayload>,
    pub platforms: Vec<TargetRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    pub publish_now: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub hashtags: Vec<String>,
    pub mentions: Vec<String>,
}

impl CreatePostRequest {
    /// Build the create payload for `post` targeting `account`.
    ///
    /// With `publish_now` the scheduled time is left out and the service
    /// publishes immediately.
    pub fn for_post(
        post: &ScheduledPost,
        account: &ConnectedAccount,
        content: &ContentReference,
        publish_now: bool,
    ) -> Self {
        let media_items = content
            .media
            .iter()
            .map(|m| MediaPayload {
                url: m.url.clone(),
                media_type: m.media_type.as_str().to_string(),
                alt_text: m.alt_text.clone(),
            })
            .collect();

        Self {
            content: content.body.clone(),
            title: content.title.clone(),
            media_items,
            platforms: vec![TargetRequest {
                platform: post.platform.as_str().to_string(),
                account_id: account.remote_account_id.clone(),
                platform_specific_data: post.platform_specific_config.clone(),
            }],
            scheduled_for: (!publish_now).then_some(post.scheduled_for),
            publish_now,
            timezone: Some(post.timezone.clone()),
            hashtags: content.hashtags.clone(),
            mentions: content.mentions.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_now: Option<bool>,
}

impl UpdatePostRequest {
    pub fn reschedule(post: &ScheduledPost) -> Self {
        Self {
            scheduled_for: Some(post.scheduled_for),
            timezone: Some(post.timezone.clone()),
            ..Default::default()
        }
    }

    pub fn publish_now() -> Self {
        Self {
            scheduled_for: Some(Utc::now()),
            publish_now: Some(true),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTarget {
    pub platform: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub platform_post_id: Option<String>,
    #[serde(default)]
    pub platform_post_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePost {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub scheduled_for: Option<DateTime<Utc>>,
    #[serde(default)]
    pub platforms: Vec<RemoteTarget>,
}

impl RemotePost {
    pub fn remote_status(&self) -> Option<RemoteStatus> {
        RemoteStatus::parse(&self.status)
    }

    /// Delivery details for the single platform a post targets
    pub fn target(&self) -> Option<&RemoteTarget> {
        self.platforms.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteAnalytics {
    pub post_id: String,
    pub platform: String,
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
    pub synced_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaItem, MediaType, Platform};
    use serde_json::json;

    fn fixtures() -> (ScheduledPost, ConnectedAccount, ContentReference) {
        let account = ConnectedAccount {
            id: "acc-1".to_string(),
            platform: Platform::Instagram,
            remote_account_id: "late-acc-9".to_string(),
            username: None,
            is_active: true,
        };
        let content = ContentReference {
            id: "c1".to_string(),
            title: None,
            body: Some("Hello".to_string()),
            hashtags: vec!["launch".to_string()],
            mentions: vec![],
            media: vec![MediaItem {
                url: "https://cdn.example.com/a.jpg".to_string(),
                media_type: MediaType::Image,
                alt_text: Some("a cat".to_string()),
            }],
        };
        let at = DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let post = ScheduledPost::new("c1", &account, at, "Europe/Paris", None, true);
        (post, account, content)
    }

    #[test]
    fn test_create_request_wire_format() {
        let (post, account, content) = fixtures();
        let request = CreatePostRequest::for_post(&post, &account, &content, false);
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            value,
            json!({
                "content": "Hello",
                "mediaItems": [{"url": "https://cdn.example.com/a.jpg", "type": "image", "altText": "a cat"}],
                "platforms": [{"platform": "instagram", "accountId": "late-acc-9"}],
                "scheduledFor": "2026-03-01T12:00:00Z",
                "publishNow": false,
                "timezone": "Europe/Paris",
                "hashtags": ["launch"],
                "mentions": []
            })
        );
    }

    #[test]
    fn test_publish_now_request_omits_schedule() {
        let (post, account, content) = fixtures();
        let request = CreatePostRequest::for_post(&post, &account, &content, true);
        assert!(request.publish_now);
        assert!(request.scheduled_for.is_none());
    }

    #[test]
    fn test_update_request_only_sends_set_fields() {
        let (post, _, _) = fixtures();
        let value = serde_json::to_value(UpdatePostRequest::reschedule(&post)).unwrap();
        assert_eq!(
            value,
            json!({"scheduledFor": "2026-03-01T12:00:00Z", "timezone": "Europe/Paris"})
        );
    }

    #[test]
    fn test_remote_post_parses_service_response() {
        let post: RemotePost = serde_json::from_value(json!({
            "_id": "ext-123",
            "status": "scheduled",
            "createdAt": "2026-03-01T10:00:00Z",
            "platforms": [{
                "platform": "instagram",
                "accountId": "late-acc-9",
                "platformPostId": "17890",
                "platformPostUrl": "https://instagram.com/p/17890"
            }]
        }))
        .unwrap();

        assert_eq!(post.id, "ext-123");
        assert_eq!(post.remote_status(), Some(RemoteStatus::Scheduled));
        assert_eq!(
            post.target().and_then(|t| t.platform_post_url.as_deref()),
            Some("https://instagram.com/p/17890")
        );
    }

    #[test]
    fn test_analytics_defaults_missing_counters() {
        let analytics: RemoteAnalytics = serde_json::from_value(json!({
            "postId": "ext-1",
            "platform": "youtube",
            "views": 1200,
            "engagementRate": 0.031,
            "watchTimeSeconds": 5400.0
        }))
        .unwrap();

        assert_eq!(analytics.views, 1200);
        assert_eq!(analytics.likes, 0);
        assert_eq!(analytics.watch_time_seconds, Some(5400.0));
        assert!(analytics.avg_watch_percentage.is_none());
    }
}

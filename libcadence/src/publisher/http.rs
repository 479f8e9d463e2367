//! HTTP client for the publishing service

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CreatePostRequest, PublishResult, Publisher, RemoteAnalytics, RemotePost, UpdatePostRequest};
use crate::config::PublisherConfig;
use crate::error::{ConfigError, PublisherError, Result};

/// Remaining-quota level below which every response logs a warning
const RATE_LIMIT_WARN_THRESHOLD: u64 = 10;

/// Error body returned by the service on 4xx/5xx
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
    errors: Option<serde_json::Value>,
}

impl ErrorBody {
    fn summary(&self, status: StatusCode) -> String {
        let base = self
            .error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("API error: {}", status.as_u16()));

        match &self.errors {
            Some(details) if !details.is_null() => format!("{} ({})", base, details),
            _ => base,
        }
    }
}

/// Publishing service client.
///
/// One `reqwest::Client` (and its connection pool) lives as long as the
/// publisher and is released when it is dropped.
pub struct HttpPublisher {
    http: Client,
    base_url: String,
    api_key: Option<SecretString>,
    timeout: Duration,
}

impl HttpPublisher {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "publisher".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    pub fn from_config(config: &PublisherConfig) -> Result<Self> {
        let api_key = config.api_key();
        if api_key.is_none() {
            warn!(
                env = %config.api_key_env,
                "no publisher API key set; calls to the publishing service will be rejected"
            );
        }
        Self::new(
            config.base_url.clone(),
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> PublishResult<RequestBuilder> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            PublisherError::Authentication("no API key configured".to_string())
        })?;

        Ok(self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(key.expose_secret()))
    }

    async fn send(&self, builder: RequestBuilder) -> PublishResult<Response> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        log_rate_limits(&response);
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> PublishResult<T> {
        let response = self.send(builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PublisherError::Decode(e.to_string()))
    }

    fn transport_error(&self, e: reqwest::Error) -> PublisherError {
        if e.is_timeout() {
            PublisherError::Timeout(self.timeout.as_secs())
        } else {
            PublisherError::Network(e.to_string())
        }
    }
}

/// Map non-success statuses onto `PublisherError`
async fn check_status(response: Response) -> PublishResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok());
        return Err(PublisherError::RateLimit { retry_after });
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body.summary(status);

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublisherError::Authentication(message),
        StatusCode::NOT_FOUND => PublisherError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            PublisherError::Validation(message)
        }
        _ => PublisherError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

fn log_rate_limits(response: &Response) {
    let header = |name: &str| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    };

    let remaining = header("X-RateLimit-Remaining").and_then(|s| s.parse::<u64>().ok());
    if let Some(remaining) = remaining {
        if remaining < RATE_LIMIT_WARN_THRESHOLD {
            let limit = header("X-RateLimit-Limit").unwrap_or_else(|| "?".to_string());
            let reset = header("X-RateLimit-Reset").unwrap_or_else(|| "?".to_string());
            warn!(
                remaining,
                limit = %limit,
                reset = %reset,
                "publishing service rate limit nearly exhausted"
            );
        }
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn create_post(&self, request: &CreatePostRequest) -> PublishResult<RemotePost> {
        let builder = self.request(Method::POST, "/posts")?.json(request);
        let post: RemotePost = self.send_json(builder).await?;

        info!(
            remote_post_id = %post.id,
            status = %post.status,
            publish_now = request.publish_now,
            "remote post created"
        );
        Ok(post)
    }

    async fn update_post(
        &self,
        remote_id: &str,
        update: &UpdatePostRequest,
    ) -> PublishResult<RemotePost> {
        let builder = self
            .request(Method::PUT, &format!("/posts/{}", remote_id))?
            .json(update);
        let post: RemotePost = self.send_json(builder).await?;

        info!(remote_post_id = %remote_id, status = %post.status, "remote post updated");
        Ok(post)
    }

    async fn delete_post(&self, remote_id: &str) -> PublishResult<()> {
        let builder = self.request(Method::DELETE, &format!("/posts/{}", remote_id))?;
        self.send(builder).await?;

        info!(remote_post_id = %remote_id, "remote post deleted");
        Ok(())
    }

    async fn get_analytics(&self, remote_id: &str) -> PublishResult<RemoteAnalytics> {
        let builder = self
            .request(Method::GET, "/analytics")?
            .query(&[("postId", remote_id)]);
        let analytics: RemoteAnalytics = self.send_json(builder).await?;

        debug!(remote_post_id = %remote_id, views = analytics.views, "analytics fetched");
        Ok(analytics)
    }
}

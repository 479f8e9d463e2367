//! Post endpoints (/posts/*, /analytics/*)

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use libcadence::service::analytics::AnalyticsReport;
use libcadence::service::scheduler::ScheduleBatch;
use libcadence::service::sync::SweepReport;
use libcadence::{CadenceError, PostAnalytics, PostFilter, ScheduledPost};
use std::sync::Arc;

use super::dto::{
    AnalyticsSyncResponse, AnalyticsWindowQuery, CreateMultiBody, CreatePostBody, ListQuery,
    RescheduleBody, UpcomingQuery,
};
use crate::error::ApiResult;
use crate::AppState;

const DEFAULT_UPCOMING_HOURS: u32 = 24;
const DEFAULT_UPCOMING_LIMIT: u32 = 20;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/posts", post(create_post).get(list_posts))
        .route("/posts/multi", post(create_multi))
        .route("/posts/upcoming", get(upcoming_posts))
        .route("/posts/sync", post(sweep_pending))
        .route("/posts/batch/{batch_id}", get(batch_posts))
        .route(
            "/posts/{id}",
            get(get_post).put(reschedule_post).delete(cancel_post),
        )
        .route("/posts/{id}/publish", post(publish_post))
        .route("/posts/{id}/requeue", post(requeue_post))
        .route("/posts/{id}/analytics", get(get_post_analytics))
        .route("/posts/{id}/analytics/sync", post(sync_post_analytics))
        .route("/analytics/sync", post(sync_recent_analytics))
}

/// POST /posts - Schedule one piece of content to one account
async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePostBody>,
) -> ApiResult<Json<ScheduledPost>> {
    let post = state.service.scheduler().schedule_single(body.into()).await?;
    Ok(Json(post))
}

/// POST /posts/multi - Schedule one piece of content to several accounts
async fn create_multi(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateMultiBody>,
) -> ApiResult<Json<ScheduleBatch>> {
    let batch = state.service.scheduler().schedule_multi(body.into()).await?;
    Ok(Json(batch))
}

/// GET /posts - Filtered, paginated listing
async fn list_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ScheduledPost>>> {
    let filter = PostFilter::try_from(query)?;
    Ok(Json(state.service.calendar().list(filter).await?))
}

/// GET /posts/upcoming - Scheduled posts due within the next few hours
async fn upcoming_posts(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpcomingQuery>,
) -> ApiResult<Json<Vec<ScheduledPost>>> {
    let posts = state
        .service
        .calendar()
        .upcoming(
            query.hours.unwrap_or(DEFAULT_UPCOMING_HOURS),
            query.limit.unwrap_or(DEFAULT_UPCOMING_LIMIT),
        )
        .await?;
    Ok(Json(posts))
}

/// GET /posts/batch/{batch_id}
async fn batch_posts(
    State(state): State<Arc<AppState>>,
    Path(batch_id): Path<String>,
) -> ApiResult<Json<Vec<ScheduledPost>>> {
    Ok(Json(state.service.calendar().batch(&batch_id).await?))
}

/// GET /posts/{id}
async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledPost>> {
    Ok(Json(state.service.calendar().get(&id).await?))
}

/// PUT /posts/{id} - Move a post to a new time
async fn reschedule_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RescheduleBody>,
) -> ApiResult<Json<ScheduledPost>> {
    let post = state
        .service
        .calendar()
        .reschedule(&id, body.scheduled_for, body.timezone)
        .await?;
    Ok(Json(post))
}

/// DELETE /posts/{id} - Cancel a post, withdrawing it remotely when possible
async fn cancel_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledPost>> {
    Ok(Json(state.service.calendar().cancel(&id).await?))
}

/// POST /posts/{id}/publish - Publish immediately
async fn publish_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledPost>> {
    Ok(Json(state.service.sync().publish_now(&id).await?))
}

/// POST /posts/{id}/requeue - Return a failed post to the sync queue
async fn requeue_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ScheduledPost>> {
    Ok(Json(state.service.sync().requeue(&id).await?))
}

/// POST /posts/sync - Run one sweep over pending posts
async fn sweep_pending(State(state): State<Arc<AppState>>) -> ApiResult<Json<SweepReport>> {
    Ok(Json(state.service.sync().sweep().await?))
}

/// GET /posts/{id}/analytics - Last stored engagement numbers
async fn get_post_analytics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<PostAnalytics>> {
    state
        .service
        .analytics()
        .get_analytics(&id)
        .await?
        .map(Json)
        .ok_or_else(|| CadenceError::NotFound(format!("no analytics for post {}", id)).into())
}

/// POST /posts/{id}/analytics/sync - Pull fresh numbers for one post
async fn sync_post_analytics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalyticsSyncResponse>> {
    let analytics = state.service.analytics().sync_post_analytics(&id).await?;
    Ok(Json(AnalyticsSyncResponse {
        synced: analytics.is_some(),
        analytics,
    }))
}

/// POST /analytics/sync - Refresh every post published in the window
async fn sync_recent_analytics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalyticsWindowQuery>,
) -> ApiResult<Json<AnalyticsReport>> {
    let days = query
        .days
        .unwrap_or(state.service.config().sync.analytics_window_days);
    Ok(Json(
        state.service.analytics().sync_recent_published(days).await?,
    ))
}

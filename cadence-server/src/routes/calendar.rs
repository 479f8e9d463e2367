//! Calendar endpoints (/calendar/*)

use axum::{
    extract::{Query, State},
    routing::{get, put},
    Json, Router,
};
use libcadence::service::calendar::QueueStats;
use libcadence::ScheduledPost;
use std::sync::Arc;

use super::dto::{CalendarQuery, CalendarRescheduleBody};
use crate::error::ApiResult;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calendar", get(calendar_range))
        .route("/calendar/reschedule", put(calendar_reschedule))
        .route("/calendar/stats", get(calendar_stats))
}

/// GET /calendar - Posts scheduled within a date range
async fn calendar_range(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<Vec<ScheduledPost>>> {
    let account_ids = query.account_ids();
    let posts = state
        .service
        .calendar()
        .range_query(query.from_date, query.to_date, account_ids.as_deref())
        .await?;
    Ok(Json(posts))
}

/// PUT /calendar/reschedule - Drag-and-drop style move
async fn calendar_reschedule(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CalendarRescheduleBody>,
) -> ApiResult<Json<ScheduledPost>> {
    let post = state
        .service
        .calendar()
        .reschedule(&body.post_id, body.scheduled_for, body.timezone)
        .await?;
    Ok(Json(post))
}

/// GET /calendar/stats - Queue counts by status and platform
async fn calendar_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<QueueStats>> {
    Ok(Json(state.service.calendar().stats().await?))
}

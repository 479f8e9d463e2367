//! Post analytics storage

use sqlx::Row;

use super::{from_ts, to_ts, Database};
use crate::error::{DbError, Result};
use crate::types::PostAnalytics;

impl Database {
    /// Insert or replace the metrics row for a post.
    ///
    /// Keyed by `scheduled_post_id`; an existing row keeps its `id`.
    pub async fn upsert_analytics(&self, analytics: &PostAnalytics) -> Result<PostAnalytics> {
        sqlx::query(
            r#"
            INSERT INTO post_analytics (
                id, scheduled_post_id, platform, views, likes, comments, shares, saves,
                clicks, impressions, reach, engagement_rate, watch_time_seconds,
                avg_watch_percentage, synced_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(scheduled_post_id) DO UPDATE SET
                platform = excluded.platform,
                views = excluded.views,
                likes = excluded.likes,
                comments = excluded.comments,
                shares = excluded.shares,
                saves = excluded.saves,
                clicks = excluded.clicks,
                impressions = excluded.impressions,
                reach = excluded.reach,
                engagement_rate = excluded.engagement_rate,
                watch_time_seconds = excluded.watch_time_seconds,
                avg_watch_percentage = excluded.avg_watch_percentage,
                synced_at = excluded.synced_at
            "#,
        )
        .bind(&analytics.id)
        .bind(&analytics.scheduled_post_id)
        .bind(analytics.platform.as_str())
        .bind(analytics.views)
        .bind(analytics.likes)
        .bind(analytics.comments)
        .bind(analytics.shares)
        .bind(analytics.saves)
        .bind(analytics.clicks)
        .bind(analytics.impressions)
        .bind(analytics.reach)
        .bind(analytics.engagement_rate)
        .bind(analytics.watch_time_seconds)
        .bind(analytics.avg_watch_percentage)
        .bind(to_ts(analytics.synced_at))
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        self.get_analytics(&analytics.scheduled_post_id)
            .await?
            .ok_or_else(|| DbError::Corrupt("analytics row vanished after upsert".to_string()).into())
    }

    pub async fn get_analytics(&self, post_id: &str) -> Result<Option<PostAnalytics>> {
        let row = sqlx::query(
            r#"
            SELECT id, scheduled_post_id, platform, views, likes, comments, shares, saves,
                   clicks, impressions, reach, engagement_rate, watch_time_seconds,
                   avg_watch_percentage, synced_at
            FROM post_analytics WHERE scheduled_post_id = ?
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some(PostAnalytics {
            id: r.try_get("id").map_err(DbError::SqlxError)?,
            scheduled_post_id: r.try_get("scheduled_post_id").map_err(DbError::SqlxError)?,
            platform: r
                .try_get::<String, _>("platform")
                .map_err(DbError::SqlxError)?
                .parse()?,
            views: r.try_get("views").map_err(DbError::SqlxError)?,
            likes: r.try_get("likes").map_err(DbError::SqlxError)?,
            comments: r.try_get("comments").map_err(DbError::SqlxError)?,
            shares: r.try_get("shares").map_err(DbError::SqlxError)?,
            saves: r.try_get("saves").map_err(DbError::SqlxError)?,
            clicks: r.try_get("clicks").map_err(DbError::SqlxError)?,
            impressions: r.try_get("impressions").map_err(DbError::SqlxError)?,
            reach: r.try_get("reach").map_err(DbError::SqlxError)?,
            engagement_rate: r.try_get("engagement_rate").map_err(DbError::SqlxError)?,
            watch_time_seconds: r.try_get("watch_time_seconds").map_err(DbError::SqlxError)?,
            avg_watch_percentage: r.try_get("avg_watch_percentage").map_err(DbError::SqlxError)?,
            synced_at: from_ts(r.try_get("synced_at").map_err(DbError::SqlxError)?)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ConnectedAccount, Platform, ScheduledPost};
    use chrono::Utc;
    use tempfile::TempDir;

    fn metrics(post_id: &str, views: i64) -> PostAnalytics {
        PostAnalytics {
            id: uuid::Uuid::new_v4().to_string(),
            scheduled_post_id: post_id.to_string(),
            platform: Platform::Youtube,
            views,
            likes: 10,
            comments: 2,
            shares: 1,
            saves: 0,
            clicks: 5,
            impressions: views * 2,
            reach: views,
            engagement_rate: 0.042,
            watch_time_seconds: Some(120.5),
            avg_watch_percentage: None,
            synced_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_keeps_one_row_per_post() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path.to_string_lossy()).await.unwrap();

        let account = ConnectedAccount {
            id: "acc".to_string(),
            platform: Platform::Youtube,
            remote_account_id: "r".to_string(),
            username: None,
            is_active: true,
        };
        let post = ScheduledPost::new("c1", &account, Utc::now(), "UTC", None, true);
        db.insert_post(&post).await.unwrap();

        let first = db.upsert_analytics(&metrics(&post.id, 100)).await.unwrap();
        let second = db.upsert_analytics(&metrics(&post.id, 250)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.views, 250);
        assert_eq!(second.watch_time_seconds, Some(120.5));
        assert!(db.get_analytics("other").await.unwrap().is_none());
    }
}

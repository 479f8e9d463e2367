//! Scheduled post queries

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::{from_opt_ts, from_ts, to_ts, Database};
use crate::error::{CadenceError, DbError, Result};
use crate::state::PostStatus;
use crate::types::{Platform, RemoteStatus, ScheduleMode, ScheduledPost};

const POST_COLUMNS: &str = "id, content_id, account_id, platform, scheduled_for, timezone, \
    status, remote_status, remote_post_id, platform_post_id, remote_post_url, batch_id, \
    schedule_mode, error_message, retry_count, failed_at, published_at, \
    platform_specific_config, created_at, updated_at";

/// Filters for listing posts. Results are ordered by `scheduled_for`.
#[derive(Debug, Clone)]
pub struct PostFilter {
    pub status: Option<PostStatus>,
    pub platform: Option<Platform>,
    pub account_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub skip: u32,
    pub limit: u32,
}

impl Default for PostFilter {
    fn default() -> Self {
        Self {
            status: None,
            platform: None,
            account_id: None,
            from: None,
            to: None,
            skip: 0,
            limit: 50,
        }
    }
}

/// A post as it was read and as it was written back
#[derive(Debug, Clone)]
pub struct PostChange {
    pub before: ScheduledPost,
    pub after: ScheduledPost,
}

impl PostChange {
    pub fn status_changed(&self) -> bool {
        self.before.status != self.after.status
    }
}

fn row_to_post(r: &SqliteRow) -> Result<ScheduledPost> {
    let config: Option<String> = r.try_get("platform_specific_config").map_err(DbError::SqlxError)?;
    let platform_specific_config = config
        .map(|c| serde_json::from_str(&c))
        .transpose()
        .map_err(|e| DbError::Corrupt(format!("platform_specific_config: {}", e)))?;

    let remote_status: Option<String> = r.try_get("remote_status").map_err(DbError::SqlxError)?;
    let retry_count: i64 = r.try_get("retry_count").map_err(DbError::SqlxError)?;

    Ok(ScheduledPost {
        id: r.try_get("id").map_err(DbError::SqlxError)?,
        content_id: r.try_get("content_id").map_err(DbError::SqlxError)?,
        account_id: r.try_get("account_id").map_err(DbError::SqlxError)?,
        platform: r
            .try_get::<String, _>("platform")
            .map_err(DbError::SqlxError)?
            .parse()?,
        scheduled_for: from_ts(r.try_get("scheduled_for").map_err(DbError::SqlxError)?)?,
        timezone: r.try_get("timezone").map_err(DbError::SqlxError)?,
        status: r
            .try_get::<String, _>("status")
            .map_err(DbError::SqlxError)?
            .parse()?,
        remote_status: remote_status.as_deref().and_then(RemoteStatus::parse),
        remote_post_id: r.try_get("remote_post_id").map_err(DbError::SqlxError)?,
        platform_post_id: r.try_get("platform_post_id").map_err(DbError::SqlxError)?,
        remote_post_url: r.try_get("remote_post_url").map_err(DbError::SqlxError)?,
        batch_id: r.try_get("batch_id").map_err(DbError::SqlxError)?,
        schedule_mode: r
            .try_get::<String, _>("schedule_mode")
            .map_err(DbError::SqlxError)?
            .parse::<ScheduleMode>()?,
        error_message: r.try_get("error_message").map_err(DbError::SqlxError)?,
        retry_count: u32::try_from(retry_count).unwrap_or(0),
        failed_at: from_opt_ts(r.try_get("failed_at").map_err(DbError::SqlxError)?)?,
        published_at: from_opt_ts(r.try_get("published_at").map_err(DbError::SqlxError)?)?,
        platform_specific_config,
        created_at: from_ts(r.try_get("created_at").map_err(DbError::SqlxError)?)?,
        updated_at: from_ts(r.try_get("updated_at").map_err(DbError::SqlxError)?)?,
    })
}

fn rows_to_posts(rows: &[SqliteRow]) -> Result<Vec<ScheduledPost>> {
    rows.iter().map(row_to_post).collect()
}

fn config_json(post: &ScheduledPost) -> Option<String> {
    post.platform_specific_config.as_ref().map(|v| v.to_string())
}

impl Database {
    /// Insert a newly created post
    pub async fn insert_post(&self, post: &ScheduledPost) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO scheduled_posts ({}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            POST_COLUMNS
        ))
        .bind(&post.id)
        .bind(&post.content_id)
        .bind(&post.account_id)
        .bind(post.platform.as_str())
        .bind(to_ts(post.scheduled_for))
        .bind(&post.timezone)
        .bind(post.status.as_str())
        .bind(post.remote_status.map(|s| s.as_str()))
        .bind(&post.remote_post_id)
        .bind(&post.platform_post_id)
        .bind(&post.remote_post_url)
        .bind(&post.batch_id)
        .bind(post.schedule_mode.as_str())
        .bind(&post.error_message)
        .bind(i64::from(post.retry_count))
        .bind(post.failed_at.map(to_ts))
        .bind(post.published_at.map(to_ts))
        .bind(config_json(post))
        .bind(to_ts(post.created_at))
        .bind(to_ts(post.updated_at))
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: &str) -> Result<Option<ScheduledPost>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM scheduled_posts WHERE id = ?",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        row.as_ref().map(row_to_post).transpose()
    }

    /// Read a post, let `f` change it, and write it back in one transaction.
    ///
    /// The write only lands if the stored status still equals the status
    /// that was read; otherwise another writer got there first and a
    /// `Conflict` is returned. If `f` fails nothing is written.
    pub async fn modify_post<F>(&self, post_id: &str, f: F) -> Result<PostChange>
    where
        F: FnOnce(&mut ScheduledPost) -> Result<()>,
    {
        let mut tx = self.pool.begin().await.map_err(DbError::SqlxError)?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM scheduled_posts WHERE id = ?",
            POST_COLUMNS
        ))
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(DbError::SqlxError)?
        .ok_or_else(|| CadenceError::NotFound(format!("post {}", post_id)))?;

        let before = row_to_post(&row)?;
        let mut after = before.clone();
        f(&mut after)?;

        write_post(&mut tx, &after, before.status).await?;
        tx.commit().await.map_err(DbError::SqlxError)?;

        Ok(PostChange { before, after })
    }

    /// Posts in `status`, oldest first
    pub async fn posts_with_status(&self, status: PostStatus, limit: u32) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scheduled_posts WHERE status = ? ORDER BY created_at ASC, rowid ASC LIMIT ?",
            POST_COLUMNS
        ))
        .bind(status.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows_to_posts(&rows)
    }

    /// List posts matching `filter`
    pub async fn query_posts(&self, filter: &PostFilter) -> Result<Vec<ScheduledPost>> {
        let mut where_clauses = vec!["1=1"];

        if filter.status.is_some() {
            where_clauses.push("status = ?");
        }
        if filter.platform.is_some() {
            where_clauses.push("platform = ?");
        }
        if filter.account_id.is_some() {
            where_clauses.push("account_id = ?");
        }
        if filter.from.is_some() {
            where_clauses.push("scheduled_for >= ?");
        }
        if filter.to.is_some() {
            where_clauses.push("scheduled_for <= ?");
        }

        let query_str = format!(
            "SELECT {} FROM scheduled_posts WHERE {} ORDER BY scheduled_for ASC, id ASC LIMIT ? OFFSET ?",
            POST_COLUMNS,
            where_clauses.join(" AND ")
        );

        let mut query = sqlx::query(&query_str);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(platform) = filter.platform {
            query = query.bind(platform.as_str());
        }
        if let Some(account_id) = &filter.account_id {
            query = query.bind(account_id);
        }
        if let Some(from) = filter.from {
            query = query.bind(to_ts(from));
        }
        if let Some(to) = filter.to {
            query = query.bind(to_ts(to));
        }

        let rows = query
            .bind(i64::from(filter.limit))
            .bind(i64::from(filter.skip))
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows_to_posts(&rows)
    }

    /// Non-cancelled posts scheduled within `[from, to]`
    pub async fn posts_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        account_ids: Option<&[String]>,
    ) -> Result<Vec<ScheduledPost>> {
        let account_clause = match account_ids {
            Some(ids) if !ids.is_empty() => format!(
                " AND account_id IN ({})",
                vec!["?"; ids.len()].join(", ")
            ),
            // An explicit empty filter matches nothing
            Some(_) => " AND 0".to_string(),
            None => String::new(),
        };

        let query_str = format!(
            "SELECT {} FROM scheduled_posts \
             WHERE scheduled_for >= ? AND scheduled_for <= ? AND status != 'cancelled'{} \
             ORDER BY scheduled_for ASC, id ASC",
            POST_COLUMNS, account_clause
        );

        let mut query = sqlx::query(&query_str).bind(to_ts(from)).bind(to_ts(to));
        for id in account_ids.unwrap_or_default() {
            query = query.bind(id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows_to_posts(&rows)
    }

    /// `SCHEDULED` posts due between `from` and `until`
    pub async fn scheduled_between(
        &self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scheduled_posts \
             WHERE status = 'scheduled' AND scheduled_for >= ? AND scheduled_for <= ? \
             ORDER BY scheduled_for ASC LIMIT ?",
            POST_COLUMNS
        ))
        .bind(to_ts(from))
        .bind(to_ts(until))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows_to_posts(&rows)
    }

    /// All posts sharing `batch_id`, ordered by platform
    pub async fn posts_in_batch(&self, batch_id: &str) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scheduled_posts WHERE batch_id = ? ORDER BY platform ASC, id ASC",
            POST_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows_to_posts(&rows)
    }

    /// `FAILED` posts, most recent failure first
    pub async fn failed_posts(&self, limit: u32) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scheduled_posts WHERE status = 'failed' \
             ORDER BY failed_at DESC, id ASC LIMIT ?",
            POST_COLUMNS
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows_to_posts(&rows)
    }

    /// Published posts that carry a remote id and were published at or after `since`
    pub async fn published_since(&self, since: DateTime<Utc>) -> Result<Vec<ScheduledPost>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scheduled_posts \
             WHERE status = 'published' AND remote_post_id IS NOT NULL AND published_at >= ? \
             ORDER BY published_at ASC",
            POST_COLUMNS
        ))
        .bind(to_ts(since))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows_to_posts(&rows)
    }

    /// Post counts grouped by status
    pub async fn count_by_status(&self) -> Result<Vec<(PostStatus, i64)>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM scheduled_posts GROUP BY status")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter()
            .map(|r| -> Result<(PostStatus, i64)> {
                let status: String = r.try_get("status").map_err(DbError::SqlxError)?;
                let n: i64 = r.try_get("n").map_err(DbError::SqlxError)?;
                Ok((status.parse()?, n))
            })
            .collect()
    }

    /// Counts of posts not yet terminal, grouped by platform
    pub async fn count_open_by_platform(&self) -> Result<Vec<(Platform, i64)>> {
        let rows = sqlx::query(
            "SELECT platform, COUNT(*) AS n FROM scheduled_posts \
             WHERE status NOT IN ('published', 'cancelled') \
             GROUP BY platform ORDER BY platform",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        rows.iter()
            .map(|r| -> Result<(Platform, i64)> {
                let platform: String = r.try_get("platform").map_err(DbError::SqlxError)?;
                let n: i64 = r.try_get("n").map_err(DbError::SqlxError)?;
                Ok((platform.parse()?, n))
            })
            .collect()
    }
}

/// Conditional write of every mutable column
async fn write_post(
    tx: &mut Transaction<'_, Sqlite>,
    post: &ScheduledPost,
    expected_status: PostStatus,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE scheduled_posts SET
            scheduled_for = ?, timezone = ?, status = ?, remote_status = ?,
            remote_post_id = ?, platform_post_id = ?, remote_post_url = ?,
            error_message = ?, retry_count = ?, failed_at = ?, published_at = ?,
            platform_specific_config = ?, updated_at = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(to_ts(post.scheduled_for))
    .bind(&post.timezone)
    .bind(post.status.as_str())
    .bind(post.remote_status.map(|s| s.as_str()))
    .bind(&post.remote_post_id)
    .bind(&post.platform_post_id)
    .bind(&post.remote_post_url)
    .bind(&post.error_message)
    .bind(i64::from(post.retry_count))
    .bind(post.failed_at.map(to_ts))
    .bind(post.published_at.map(to_ts))
    .bind(config_json(post))
    .bind(to_ts(post.updated_at))
    .bind(&post.id)
    .bind(expected_status.as_str())
    .execute(&mut **tx)
    .await
    .map_err(DbError::SqlxError)?;

    if result.rows_affected() == 0 {
        return Err(CadenceError::Conflict(format!(
            "post {} changed while it was being updated",
            post.id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Trigger;
    use crate::types::ConnectedAccount;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn setup_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path.to_string_lossy()).await.unwrap();
        (db, temp_dir)
    }

    fn account(id: &str, platform: Platform) -> ConnectedAccount {
        ConnectedAccount {
            id: id.to_string(),
            platform,
            remote_account_id: format!("remote-{}", id),
            username: None,
            is_active: true,
        }
    }

    fn post_at(account_id: &str, platform: Platform, at: DateTime<Utc>) -> ScheduledPost {
        ScheduledPost::new("content-1", &account(account_id, platform), at, "UTC", None, true)
    }

    #[tokio::test]
    async fn test_insert_and_get_post() {
        let (db, _temp_dir) = setup_db().await;
        let mut post = post_at("a1", Platform::Linkedin, Utc::now());
        post.platform_specific_config = Some(serde_json::json!({"visibility": "public"}));

        db.insert_post(&post).await.unwrap();
        let loaded = db.get_post(&post.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, post.id);
        assert_eq!(loaded.platform, Platform::Linkedin);
        assert_eq!(loaded.status, PostStatus::PendingSync);
        assert_eq!(loaded.scheduled_for.timestamp(), post.scheduled_for.timestamp());
        assert_eq!(loaded.platform_specific_config, post.platform_specific_config);
    }

    #[tokio::test]
    async fn test_get_missing_post() {
        let (db, _temp_dir) = setup_db().await;
        assert!(db.get_post("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_modify_post_persists_change() {
        let (db, _temp_dir) = setup_db().await;
        let post = post_at("a1", Platform::Twitter, Utc::now());
        db.insert_post(&post).await.unwrap();

        let change = db
            .modify_post(&post.id, |p| {
                p.assign_remote_id("ext-1")?;
                p.transition(Trigger::SyncSucceeded)?;
                Ok(())
            })
            .await
            .unwrap();

        assert!(change.status_changed());
        assert_eq!(change.before.status, PostStatus::PendingSync);
        let stored = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.status, PostStatus::Scheduled);
        assert_eq!(stored.remote_post_id.as_deref(), Some("ext-1"));
    }

    #[tokio::test]
    async fn test_modify_post_rolls_back_on_error() {
        let (db, _temp_dir) = setup_db().await;
        let post = post_at("a1", Platform::Twitter, Utc::now());
        db.insert_post(&post).await.unwrap();

        let result = db
            .modify_post(&post.id, |p| {
                p.timezone = "Asia/Tokyo".to_string();
                p.transition(Trigger::PublishSucceeded)?;
                Ok(())
            })
            .await;

        assert!(matches!(result, Err(CadenceError::Conflict(_))));
        let stored = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(stored.timezone, "UTC");
    }

    #[tokio::test]
    async fn test_modify_missing_post_is_not_found() {
        let (db, _temp_dir) = setup_db().await;
        let result = db.modify_post("missing", |_| Ok(())).await;
        assert!(matches!(result, Err(CadenceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_stale_status_write_is_rejected() {
        let (db, _temp_dir) = setup_db().await;
        let post = post_at("a1", Platform::Twitter, Utc::now());
        db.insert_post(&post).await.unwrap();

        db.modify_post(&post.id, |p| p.transition(Trigger::Cancel).map(|_| ()))
            .await
            .unwrap();

        // A writer still holding the PENDING_SYNC snapshot must not win
        let mut tx = db.pool().begin().await.unwrap();
        let mut stale = post.clone();
        stale.transition(Trigger::SyncSucceeded).unwrap();
        let result = write_post(&mut tx, &stale, PostStatus::PendingSync).await;
        assert!(matches!(result, Err(CadenceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_posts_with_status_oldest_first() {
        let (db, _temp_dir) = setup_db().await;
        let mut older = post_at("a1", Platform::Twitter, Utc::now());
        older.created_at = Utc::now() - Duration::hours(2);
        let newer = post_at("a2", Platform::Twitter, Utc::now());
        db.insert_post(&newer).await.unwrap();
        db.insert_post(&older).await.unwrap();

        let pending = db.posts_with_status(PostStatus::PendingSync, 10).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec![older.id.as_str(), newer.id.as_str()]);
    }

    #[tokio::test]
    async fn test_posts_with_status_breaks_ties_by_insertion() {
        let (db, _temp_dir) = setup_db().await;
        let created_at = Utc::now();
        let mut inserted = Vec::new();
        for _ in 0..5 {
            let mut post = post_at("a1", Platform::Twitter, Utc::now());
            post.created_at = created_at;
            db.insert_post(&post).await.unwrap();
            inserted.push(post.id);
        }

        let pending = db.posts_with_status(PostStatus::PendingSync, 10).await.unwrap();
        let ids: Vec<_> = pending.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, inserted);
    }

    #[tokio::test]
    async fn test_range_bounds_keep_sub_second_precision() {
        let (db, _temp_dir) = setup_db().await;
        let to = DateTime::parse_from_rfc3339("2026-03-01T12:00:00.200Z")
            .unwrap()
            .with_timezone(&Utc);
        let post = post_at("a1", Platform::Twitter, to + Duration::milliseconds(300));
        db.insert_post(&post).await.unwrap();

        let loaded = db.get_post(&post.id).await.unwrap().unwrap();
        assert_eq!(loaded.scheduled_for, post.scheduled_for);

        let before = db.posts_in_range(to - Duration::hours(1), to, None).await.unwrap();
        assert!(before.is_empty());
        let after = db
            .posts_in_range(to, to + Duration::seconds(1), None)
            .await
            .unwrap();
        assert_eq!(after.len(), 1);
    }

    #[tokio::test]
    async fn test_posts_in_range_excludes_cancelled_and_filters_accounts() {
        let (db, _temp_dir) = setup_db().await;
        let base = Utc::now();
        let p1 = post_at("a1", Platform::Twitter, base + Duration::hours(1));
        let p2 = post_at("a2", Platform::Reddit, base + Duration::hours(2));
        let p3 = post_at("a1", Platform::Twitter, base + Duration::hours(3));
        let outside = post_at("a1", Platform::Twitter, base + Duration::days(3));
        for p in [&p1, &p2, &p3, &outside] {
            db.insert_post(p).await.unwrap();
        }
        db.modify_post(&p3.id, |p| p.transition(Trigger::Cancel).map(|_| ()))
            .await
            .unwrap();

        let all = db
            .posts_in_range(base, base + Duration::days(1), None)
            .await
            .unwrap();
        let ids: Vec<_> = all.iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec![p1.id.clone(), p2.id.clone()]);

        let only_a2 = db
            .posts_in_range(base, base + Duration::days(1), Some(&["a2".to_string()]))
            .await
            .unwrap();
        assert_eq!(only_a2.len(), 1);
        assert_eq!(only_a2[0].id, p2.id);

        let none = db
            .posts_in_range(base, base + Duration::days(1), Some(&[]))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_query_posts_filters_and_paginates() {
        let (db, _temp_dir) = setup_db().await;
        let base = Utc::now();
        for i in 0..5 {
            let platform = if i % 2 == 0 { Platform::Twitter } else { Platform::Threads };
            db.insert_post(&post_at("a1", platform, base + Duration::minutes(i)))
                .await
                .unwrap();
        }

        let twitter = db
            .query_posts(&PostFilter {
                platform: Some(Platform::Twitter),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(twitter.len(), 3);

        let page = db
            .query_posts(&PostFilter {
                skip: 1,
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[0].scheduled_for <= page[1].scheduled_for);
    }

    #[tokio::test]
    async fn test_remote_post_id_is_unique() {
        let (db, _temp_dir) = setup_db().await;
        let mut a = post_at("a1", Platform::Twitter, Utc::now());
        let mut b = post_at("a2", Platform::Twitter, Utc::now());
        a.remote_post_id = Some("ext-1".to_string());
        b.remote_post_id = Some("ext-1".to_string());

        db.insert_post(&a).await.unwrap();
        assert!(db.insert_post(&b).await.is_err());
    }

    #[tokio::test]
    async fn test_count_by_status() {
        let (db, _temp_dir) = setup_db().await;
        for _ in 0..2 {
            db.insert_post(&post_at("a1", Platform::Twitter, Utc::now()))
                .await
                .unwrap();
        }

        let counts = db.count_by_status().await.unwrap();
        assert_eq!(counts, vec![(PostStatus::PendingSync, 2)]);

        let by_platform = db.count_open_by_platform().await.unwrap();
        assert_eq!(by_platform, vec![(Platform::Twitter, 2)]);
    }
}

//! Connected accounts and content references
//!
//! Both are owned by collaborators outside the scheduler (account linking and
//! content authoring). The scheduler only reads them; the insert helpers exist
//! for those collaborators and for tests.

use chrono::Utc;
use sqlx::Row;

use super::{to_ts, Database};
use crate::error::{DbError, Result};
use crate::types::{ConnectedAccount, ContentReference, MediaItem};

impl Database {
    pub async fn get_account(&self, account_id: &str) -> Result<Option<ConnectedAccount>> {
        let row = sqlx::query(
            r#"
            SELECT id, platform, remote_account_id, username, is_active
            FROM connected_accounts WHERE id = ?
            "#,
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some(ConnectedAccount {
            id: r.try_get("id").map_err(DbError::SqlxError)?,
            platform: r
                .try_get::<String, _>("platform")
                .map_err(DbError::SqlxError)?
                .parse()?,
            remote_account_id: r.try_get("remote_account_id").map_err(DbError::SqlxError)?,
            username: r.try_get("username").map_err(DbError::SqlxError)?,
            is_active: r.try_get("is_active").map_err(DbError::SqlxError)?,
        }))
    }

    /// Insert or replace an account record
    pub async fn upsert_account(&self, account: &ConnectedAccount) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO connected_accounts (id, platform, remote_account_id, username, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                platform = excluded.platform,
                remote_account_id = excluded.remote_account_id,
                username = excluded.username,
                is_active = excluded.is_active
            "#,
        )
        .bind(&account.id)
        .bind(account.platform.as_str())
        .bind(&account.remote_account_id)
        .bind(&account.username)
        .bind(account.is_active)
        .bind(to_ts(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(())
    }

    pub async fn set_account_active(&self, account_id: &str, is_active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE connected_accounts SET is_active = ? WHERE id = ?")
            .bind(is_active)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_content(&self, content_id: &str) -> Result<Option<ContentReference>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, body, hashtags, mentions
            FROM content_items WHERE id = ?
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        let Some(r) = row else {
            return Ok(None);
        };

        let media_rows = sqlx::query(
            r#"
            SELECT url, media_type, alt_text FROM content_media
            WHERE content_id = ? ORDER BY display_order ASC, id ASC
            "#,
        )
        .bind(content_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        let media = media_rows
            .iter()
            .map(|m| -> Result<MediaItem> {
                Ok(MediaItem {
                    url: m.try_get("url").map_err(DbError::SqlxError)?,
                    media_type: m
                        .try_get::<String, _>("media_type")
                        .map_err(DbError::SqlxError)?
                        .parse()?,
                    alt_text: m.try_get("alt_text").map_err(DbError::SqlxError)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ContentReference {
            id: r.try_get("id").map_err(DbError::SqlxError)?,
            title: r.try_get("title").map_err(DbError::SqlxError)?,
            body: r.try_get("body").map_err(DbError::SqlxError)?,
            hashtags: decode_list(&r.try_get::<String, _>("hashtags").map_err(DbError::SqlxError)?)?,
            mentions: decode_list(&r.try_get::<String, _>("mentions").map_err(DbError::SqlxError)?)?,
            media,
        }))
    }

    /// Insert a content item with its media, replacing any previous version
    pub async fn upsert_content(&self, content: &ContentReference) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(DbError::SqlxError)?;

        sqlx::query(
            r#"
            INSERT INTO content_items (id, title, body, hashtags, mentions, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                body = excluded.body,
                hashtags = excluded.hashtags,
                mentions = excluded.mentions
            "#,
        )
        .bind(&content.id)
        .bind(&content.title)
        .bind(&content.body)
        .bind(encode_list(&content.hashtags))
        .bind(encode_list(&content.mentions))
        .bind(to_ts(Utc::now()))
        .execute(&mut *tx)
        .await
        .map_err(DbError::SqlxError)?;

        sqlx::query("DELETE FROM content_media WHERE content_id = ?")
            .bind(&content.id)
            .execute(&mut *tx)
            .await
            .map_err(DbError::SqlxError)?;

        for (order, item) in content.media.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO content_media (content_id, url, media_type, alt_text, display_order)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&content.id)
            .bind(&item.url)
            .bind(item.media_type.as_str())
            .bind(&item.alt_text)
            .bind(order as i64)
            .execute(&mut *tx)
            .await
            .map_err(DbError::SqlxError)?;
        }

        tx.commit().await.map_err(DbError::SqlxError)?;
        Ok(())
    }

    pub async fn delete_content(&self, content_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = ?")
            .bind(content_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }
}

fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

fn decode_list(raw: &str) -> Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| DbError::Corrupt(format!("list column: {}", e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaType, Platform};
    use tempfile::TempDir;

    async fn setup_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db = Database::new(&db_path.to_string_lossy()).await.unwrap();
        (db, temp_dir)
    }

    #[tokio::test]
    async fn test_account_roundtrip_and_deactivate() {
        let (db, _temp_dir) = setup_db().await;
        let account = ConnectedAccount {
            id: "acc-1".to_string(),
            platform: Platform::Instagram,
            remote_account_id: "late-123".to_string(),
            username: Some("studio".to_string()),
            is_active: true,
        };

        db.upsert_account(&account).await.unwrap();
        assert_eq!(db.get_account("acc-1").await.unwrap(), Some(account));

        assert!(db.set_account_active("acc-1", false).await.unwrap());
        assert!(!db.get_account("acc-1").await.unwrap().unwrap().is_active);
        assert!(!db.set_account_active("missing", false).await.unwrap());
    }

    #[tokio::test]
    async fn test_content_with_media_in_order() {
        let (db, _temp_dir) = setup_db().await;
        let content = ContentReference {
            id: "c1".to_string(),
            title: Some("Launch".to_string()),
            body: Some("We shipped".to_string()),
            hashtags: vec!["rust".to_string(), "release".to_string()],
            mentions: vec!["@ferris".to_string()],
            media: vec![
                MediaItem {
                    url: "https://cdn.example.com/a.png".to_string(),
                    media_type: MediaType::Image,
                    alt_text: Some("crab".to_string()),
                },
                MediaItem {
                    url: "https://cdn.example.com/b.mp4".to_string(),
                    media_type: MediaType::Video,
                    alt_text: None,
                },
            ],
        };

        db.upsert_content(&content).await.unwrap();
        assert_eq!(db.get_content("c1").await.unwrap(), Some(content.clone()));

        let mut trimmed = content;
        trimmed.media.truncate(1);
        db.upsert_content(&trimmed).await.unwrap();
        assert_eq!(db.get_content("c1").await.unwrap().unwrap().media.len(), 1);

        assert!(db.delete_content("c1").await.unwrap());
        assert!(db.get_content("c1").await.unwrap().is_none());
    }
}

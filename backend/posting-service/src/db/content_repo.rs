use crate::error::{AppError, Result};
use crate::models::{ContentItem, ContentKind, ContentPayload};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

/// Persistence for individual content items.
///
/// No business rules beyond tag immutability: `update` only swaps the
/// payload of an item whose stored tag matches.
#[async_trait]
pub trait ContentItemStore: Send + Sync {
    /// Insert a new item with a fresh id
    async fn create(&self, payload: &ContentPayload) -> Result<ContentItem>;

    /// Fetch an item, `None` if it does not exist
    async fn get(&self, id: Uuid) -> Result<Option<ContentItem>>;

    /// Replace the payload of an existing item in place.
    ///
    /// Fails with `NotFound` if the item is gone and `TagMismatch` if the
    /// payload's tag differs from the stored one.
    async fn update(&self, id: Uuid, payload: &ContentPayload) -> Result<()>;

    /// Delete an item. Returns `false` if it was already gone.
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

/// Finds content items no parent references any more.
#[async_trait]
pub trait OrphanScanner: Send + Sync {
    /// Oldest-first unreferenced items created before `created_before`.
    async fn find_orphans(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ContentItem>>;

    /// Which of `urls` some media item outside `excluding` still carries.
    ///
    /// Moved media can leave an orphan and a live item sharing one blob;
    /// that blob must outlive the orphan.
    async fn urls_in_use(&self, urls: &[String], excluding: &[Uuid]) -> Result<HashSet<String>>;
}

#[derive(FromRow)]
struct ContentItemRow {
    id: Uuid,
    kind: String,
    body: String,
}

impl TryFrom<ContentItemRow> for ContentItem {
    type Error = AppError;

    fn try_from(row: ContentItemRow) -> Result<Self> {
        let kind: ContentKind = row.kind.parse().map_err(AppError::Internal)?;

        Ok(ContentItem {
            id: row.id,
            payload: ContentPayload::from_parts(kind, row.body),
        })
    }
}

/// Postgres-backed content item store over the `content_items` table.
#[derive(Clone)]
pub struct PgContentItemStore {
    pool: PgPool,
}

impl PgContentItemStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentItemStore for PgContentItemStore {
    async fn create(&self, payload: &ContentPayload) -> Result<ContentItem> {
        let row = sqlx::query_as::<_, ContentItemRow>(
            r#"
            INSERT INTO content_items (id, kind, body)
            VALUES ($1, $2, $3)
            RETURNING id, kind, body
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payload.kind().as_str())
        .bind(payload.body())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    async fn get(&self, id: Uuid) -> Result<Option<ContentItem>> {
        let row = sqlx::query_as::<_, ContentItemRow>(
            "SELECT id, kind, body FROM content_items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ContentItem::try_from).transpose()
    }

    async fn update(&self, id: Uuid, payload: &ContentPayload) -> Result<()> {
        let expected = payload.kind();

        let result = sqlx::query(
            r#"
            UPDATE content_items
            SET body = $2, updated_at = NOW()
            WHERE id = $1 AND kind = $3
            "#,
        )
        .bind(id)
        .bind(payload.body())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing matched: tell a missing row apart from a retag attempt.
        let stored: Option<String> =
            sqlx::query_scalar("SELECT kind FROM content_items WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match stored {
            None => Err(AppError::NotFound(format!("content item {}", id))),
            Some(stored) => Err(AppError::TagMismatch {
                content_id: id,
                stored: stored.parse().map_err(AppError::Internal)?,
                expected,
            }),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM content_items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrphanScanner for PgContentItemStore {
    async fn find_orphans(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query_as::<_, ContentItemRow>(
            r#"
            SELECT c.id, c.kind, c.body
            FROM content_items c
            WHERE c.created_at < $1
              AND NOT EXISTS (
                  SELECT 1 FROM posts p
                  WHERE p.attachments @> jsonb_build_array(jsonb_build_object('content_id', c.id::text))
              )
              AND NOT EXISTS (
                  SELECT 1 FROM messages m
                  WHERE m.attachments @> jsonb_build_array(jsonb_build_object('content_id', c.id::text))
              )
            ORDER BY c.created_at ASC
            LIMIT $2
            "#,
        )
        .bind(created_before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ContentItem::try_from).collect()
    }

    async fn urls_in_use(&self, urls: &[String], excluding: &[Uuid]) -> Result<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let in_use = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT body
            FROM content_items
            WHERE kind <> 'text'
              AND body = ANY($1)
              AND NOT (id = ANY($2))
            "#,
        )
        .bind(urls)
        .bind(excluding)
        .fetch_all(&self.pool)
        .await?;

        Ok(in_use.into_iter().collect())
    }
}

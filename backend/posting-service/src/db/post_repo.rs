use crate::error::Result;
use crate::models::{Attachment, NewPost, Post};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

/// Post persistence. The attachment sequence is a column of the post row,
/// so every sequence write is a single-row update.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn insert(&self, post: NewPost) -> Result<Post>;

    async fn find(&self, post_id: Uuid) -> Result<Option<Post>>;

    /// Replace title, category and attachment sequence in one write.
    /// Returns `false` if the post no longer exists.
    async fn update(
        &self,
        post_id: Uuid,
        title: &str,
        category: &str,
        attachments: &[Attachment],
    ) -> Result<bool>;

    /// Returns `false` if the post was already gone.
    async fn delete(&self, post_id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (id, author_id, title, category, attachments)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, author_id, title, category, attachments, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(post.author_id)
        .bind(&post.title)
        .bind(&post.category)
        .bind(Json(&post.attachments))
        .fetch_one(&self.pool)
        .await?;

        Ok(post)
    }

    async fn find(&self, post_id: Uuid) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            SELECT id, author_id, title, category, attachments, created_at, updated_at
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(post)
    }

    async fn update(
        &self,
        post_id: Uuid,
        title: &str,
        category: &str,
        attachments: &[Attachment],
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE posts
            SET title = $2, category = $3, attachments = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(post_id)
        .bind(title)
        .bind(category)
        .bind(Json(attachments))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

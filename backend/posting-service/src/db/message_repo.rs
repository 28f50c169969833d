use crate::error::Result;
use crate::models::{Attachment, Message, NewMessage};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn insert(&self, message: NewMessage) -> Result<Message>;

    async fn find(&self, message_id: Uuid) -> Result<Option<Message>>;

    /// Replace the attachment sequence in one write.
    /// Returns `false` if the message no longer exists.
    async fn update_attachments(&self, message_id: Uuid, attachments: &[Attachment])
        -> Result<bool>;

    async fn mark_read(&self, message_id: Uuid) -> Result<bool>;

    /// Returns `false` if the message was already gone.
    async fn delete(&self, message_id: Uuid) -> Result<bool>;
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, sender_id, recipient_id, attachments)
            VALUES ($1, $2, $3, $4)
            RETURNING id, sender_id, recipient_id, attachments, read, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(Json(&message.attachments))
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    async fn find(&self, message_id: Uuid) -> Result<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, recipient_id, attachments, read, created_at, updated_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    async fn update_attachments(
        &self,
        message_id: Uuid,
        attachments: &[Attachment],
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET attachments = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(message_id)
        .bind(Json(attachments))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_read(&self, message_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE messages SET read = TRUE, updated_at = NOW() WHERE id = $1 AND read = FALSE",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, message_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

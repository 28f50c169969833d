/// Message service - direct messages with attached content sequences
use super::reconciliation::AttachmentEngine;
use super::uploads::{IncomingFile, UploadMapper};
use crate::db::{ContentItemStore, MessageRepository, UserDirectory};
use crate::error::{AppError, Result};
use crate::models::{ContentDescription, MessageView, NewMessage, ParentKind};
use blob_store::BlobStore;
use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;

pub struct MessageService {
    messages: Arc<dyn MessageRepository>,
    users: Arc<dyn UserDirectory>,
    uploads: UploadMapper,
    engine: AttachmentEngine,
}

impl MessageService {
    pub fn new(
        messages: Arc<dyn MessageRepository>,
        users: Arc<dyn UserDirectory>,
        contents: Arc<dyn ContentItemStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            messages,
            users,
            uploads: UploadMapper::new(blobs.clone()),
            engine: AttachmentEngine::new(contents, blobs),
        }
    }

    /// Send a message to the user with `recipient_nickname`
    pub async fn create_message(
        &self,
        sender_id: Uuid,
        recipient_nickname: &str,
        contents: Vec<ContentDescription>,
        files: Vec<IncomingFile>,
    ) -> Result<MessageView> {
        if !self.users.user_exists(sender_id).await? {
            return Err(AppError::NotFound(format!("user {}", sender_id)));
        }

        let recipient_id = self
            .users
            .find_id_by_nickname(recipient_nickname)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("recipient '{}'", recipient_nickname)))?;

        let batch = self.uploads.prepare(ParentKind::Message, sender_id, files)?;
        let (contents, overlay) =
            super::create_sequence(&self.uploads, &self.engine, batch, contents).await?;

        let new_message = NewMessage {
            sender_id,
            recipient_id,
            attachments: contents.iter().map(Into::into).collect(),
        };

        let message = match self.messages.insert(new_message).await {
            Ok(message) => message,
            Err(e) => {
                self.uploads.discard(&overlay).await;
                return Err(e);
            }
        };

        tracing::info!(
            message_id = %message.id,
            sender_id = %sender_id,
            recipient_id = %recipient_id,
            attachments = contents.len(),
            "Created message"
        );

        Ok(MessageView { message, contents })
    }

    /// Replace a message's content sequence
    pub async fn edit_message(
        &self,
        message_id: Uuid,
        contents: Vec<ContentDescription>,
        files: Vec<IncomingFile>,
    ) -> Result<MessageView> {
        let mut message = self
            .messages
            .find(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {}", message_id)))?;

        let batch = self
            .uploads
            .prepare(ParentKind::Message, message.sender_id, files)?;
        let (payloads, _) = self.uploads.resolve_sequence(batch, contents).await?;

        let reconciliation = self
            .engine
            .reconcile(message.attachments(), &payloads)
            .await?;

        if !self
            .messages
            .update_attachments(message_id, &reconciliation.new_sequence)
            .await?
        {
            return Err(AppError::NotFound(format!("message {}", message_id)));
        }

        tracing::info!(
            message_id = %message_id,
            attachments = reconciliation.new_sequence.len(),
            orphaned = reconciliation.to_delete.len(),
            "Updated message"
        );

        self.engine
            .cleanup(message.parent_ref(), &reconciliation)
            .await?;

        message.attachments = Json(reconciliation.new_sequence);
        message.updated_at = Utc::now();

        Ok(MessageView {
            message,
            contents: reconciliation.contents,
        })
    }

    /// Get a message for display. The first read marks it read.
    pub async fn get_message(&self, message_id: Uuid) -> Result<MessageView> {
        let mut message = self
            .messages
            .find(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {}", message_id)))?;

        let contents = self.engine.resolve_contents(message.attachments()).await?;

        if !message.read {
            self.messages.mark_read(message_id).await?;
            message.read = true;
        }

        Ok(MessageView { message, contents })
    }

    /// Delete a message and everything it references
    pub async fn delete_message(&self, message_id: Uuid) -> Result<()> {
        let message = self
            .messages
            .find(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {}", message_id)))?;

        self.engine
            .delete_all_attachments(message.parent_ref(), message.attachments())
            .await?;

        if !self.messages.delete(message_id).await? {
            tracing::debug!(message_id = %message_id, "Message already removed");
        }

        tracing::info!(message_id = %message_id, "Deleted message");
        Ok(())
    }
}

/// Post service - post lifecycle with attached content sequences
use super::reconciliation::AttachmentEngine;
use super::uploads::{IncomingFile, UploadMapper};
use crate::db::{ContentItemStore, PostRepository, UserDirectory};
use crate::error::{AppError, Result};
use crate::models::{ContentDescription, NewPost, ParentKind, PostView};
use blob_store::BlobStore;
use chrono::Utc;
use sqlx::types::Json;
use std::sync::Arc;
use uuid::Uuid;

/// Fields submitted to create or edit a post.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub category: String,
    /// One description per slot; slots filled by a file may be placeholders
    pub contents: Vec<ContentDescription>,
}

pub struct PostService {
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserDirectory>,
    uploads: UploadMapper,
    engine: AttachmentEngine,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserDirectory>,
        contents: Arc<dyn ContentItemStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            posts,
            users,
            uploads: UploadMapper::new(blobs.clone()),
            engine: AttachmentEngine::new(contents, blobs),
        }
    }

    /// Create a post owned by `author_id`
    pub async fn create_post(
        &self,
        author_id: Uuid,
        draft: PostDraft,
        files: Vec<IncomingFile>,
    ) -> Result<PostView> {
        if !self.users.user_exists(author_id).await? {
            return Err(AppError::NotFound(format!("user {}", author_id)));
        }

        let batch = self.uploads.prepare(ParentKind::Post, author_id, files)?;
        let (contents, overlay) =
            super::create_sequence(&self.uploads, &self.engine, batch, draft.contents).await?;

        let new_post = NewPost {
            author_id,
            title: draft.title,
            category: draft.category,
            attachments: contents.iter().map(Into::into).collect(),
        };

        let post = match self.posts.insert(new_post).await {
            Ok(post) => post,
            Err(e) => {
                // Created records are unreferenced now; the sweeper takes them.
                self.uploads.discard(&overlay).await;
                return Err(e);
            }
        };

        tracing::info!(
            post_id = %post.id,
            author_id = %author_id,
            attachments = contents.len(),
            uploads = overlay.len(),
            "Created post"
        );

        Ok(PostView { post, contents })
    }

    /// Replace a post's title, category and content sequence.
    ///
    /// Unchanged slots keep their records. Records and blobs orphaned by the
    /// edit are reclaimed after the post is written; if that cleanup is
    /// incomplete the edit still stands and `PartialCleanupFailure` is
    /// returned.
    pub async fn edit_post(
        &self,
        post_id: Uuid,
        draft: PostDraft,
        files: Vec<IncomingFile>,
    ) -> Result<PostView> {
        let mut post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        let batch = self.uploads.prepare(ParentKind::Post, post.author_id, files)?;
        let (payloads, _) = self.uploads.resolve_sequence(batch, draft.contents).await?;

        let reconciliation = self.engine.reconcile(post.attachments(), &payloads).await?;

        let updated = self
            .posts
            .update(
                post_id,
                &draft.title,
                &draft.category,
                &reconciliation.new_sequence,
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound(format!("post {}", post_id)));
        }

        tracing::info!(
            post_id = %post_id,
            attachments = reconciliation.new_sequence.len(),
            orphaned = reconciliation.to_delete.len(),
            "Updated post"
        );

        self.engine
            .cleanup(post.parent_ref(), &reconciliation)
            .await?;

        post.title = draft.title;
        post.category = draft.category;
        post.attachments = Json(reconciliation.new_sequence);
        post.updated_at = Utc::now();

        Ok(PostView {
            post,
            contents: reconciliation.contents,
        })
    }

    /// Get a post with its contents in display order
    pub async fn get_post(&self, post_id: Uuid) -> Result<PostView> {
        let post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        let contents = self.engine.resolve_contents(post.attachments()).await?;
        Ok(PostView { post, contents })
    }

    /// Delete a post and everything it references.
    ///
    /// The post row is only removed once every record and blob is gone, so
    /// a failed delete can be retried.
    pub async fn delete_post(&self, post_id: Uuid) -> Result<()> {
        let post = self
            .posts
            .find(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

        self.engine
            .delete_all_attachments(post.parent_ref(), post.attachments())
            .await?;

        if !self.posts.delete(post_id).await? {
            tracing::debug!(post_id = %post_id, "Post already removed");
        }

        tracing::info!(post_id = %post_id, attachments = post.attachments().len(), "Deleted post");
        Ok(())
    }
}

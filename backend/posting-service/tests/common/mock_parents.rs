//! Mock parent repositories, user directory and orphan scanner

use super::mock_content_store::MockContentStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use posting_service::db::{MessageRepository, OrphanScanner, PostRepository, UserDirectory};
use posting_service::error::{AppError, Result};
use posting_service::models::{Attachment, ContentItem, Message, NewMessage, NewPost, Post};
use sqlx::types::Json;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
pub struct MockPostRepository {
    posts: Mutex<HashMap<Uuid, Post>>,
    update_calls: Mutex<usize>,
    fail_inserts: Mutex<bool>,
}

impl MockPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, post_id: Uuid) -> Option<Post> {
        self.posts.lock().unwrap().get(&post_id).cloned()
    }

    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock().unwrap()
    }

    pub fn fail_inserts(&self) {
        *self.fail_inserts.lock().unwrap() = true;
    }

    pub fn referenced_ids(&self) -> HashSet<Uuid> {
        self.posts
            .lock()
            .unwrap()
            .values()
            .flat_map(|post| post.attachments().iter().map(|a| a.content_id))
            .collect()
    }
}

#[async_trait]
impl PostRepository for MockPostRepository {
    async fn insert(&self, post: NewPost) -> Result<Post> {
        if *self.fail_inserts.lock().unwrap() {
            return Err(AppError::DatabaseError("injected insert failure".into()));
        }

        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            author_id: post.author_id,
            title: post.title,
            category: post.category,
            attachments: Json(post.attachments),
            created_at: now,
            updated_at: now,
        };
        self.posts.lock().unwrap().insert(post.id, post.clone());
        Ok(post)
    }

    async fn find(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.post(post_id))
    }

    async fn update(
        &self,
        post_id: Uuid,
        title: &str,
        category: &str,
        attachments: &[Attachment],
    ) -> Result<bool> {
        *self.update_calls.lock().unwrap() += 1;

        let mut posts = self.posts.lock().unwrap();
        let Some(post) = posts.get_mut(&post_id) else {
            return Ok(false);
        };
        post.title = title.to_string();
        post.category = category.to_string();
        post.attachments = Json(attachments.to_vec());
        post.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete(&self, post_id: Uuid) -> Result<bool> {
        Ok(self.posts.lock().unwrap().remove(&post_id).is_some())
    }
}

#[derive(Default)]
pub struct MockMessageRepository {
    messages: Mutex<HashMap<Uuid, Message>>,
    update_calls: Mutex<usize>,
}

impl MockMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&self, message_id: Uuid) -> Option<Message> {
        self.messages.lock().unwrap().get(&message_id).cloned()
    }

    pub fn update_calls(&self) -> usize {
        *self.update_calls.lock().unwrap()
    }

    pub fn referenced_ids(&self) -> HashSet<Uuid> {
        self.messages
            .lock()
            .unwrap()
            .values()
            .flat_map(|message| message.attachments().iter().map(|a| a.content_id))
            .collect()
    }
}

#[async_trait]
impl MessageRepository for MockMessageRepository {
    async fn insert(&self, message: NewMessage) -> Result<Message> {
        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            attachments: Json(message.attachments),
            read: false,
            created_at: now,
            updated_at: now,
        };
        self.messages
            .lock()
            .unwrap()
            .insert(message.id, message.clone());
        Ok(message)
    }

    async fn find(&self, message_id: Uuid) -> Result<Option<Message>> {
        Ok(self.message(message_id))
    }

    async fn update_attachments(
        &self,
        message_id: Uuid,
        attachments: &[Attachment],
    ) -> Result<bool> {
        *self.update_calls.lock().unwrap() += 1;

        let mut messages = self.messages.lock().unwrap();
        let Some(message) = messages.get_mut(&message_id) else {
            return Ok(false);
        };
        message.attachments = Json(attachments.to_vec());
        message.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_read(&self, message_id: Uuid) -> Result<bool> {
        let mut messages = self.messages.lock().unwrap();
        match messages.get_mut(&message_id) {
            Some(message) if !message.read => {
                message.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, message_id: Uuid) -> Result<bool> {
        Ok(self.messages.lock().unwrap().remove(&message_id).is_some())
    }
}

/// Simulated `users` table: id -> nickname
#[derive(Default)]
pub struct MockUserDirectory {
    users: Mutex<HashMap<Uuid, String>>,
}

impl MockUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, nickname: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(id, nickname.to_string());
        id
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        Ok(self.users.lock().unwrap().contains_key(&user_id))
    }

    async fn find_id_by_nickname(&self, nickname: &str) -> Result<Option<Uuid>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(_, name)| name.as_str() == nickname)
            .map(|(id, _)| *id))
    }
}

/// Orphan scan over the mock stores: items no mock post or message references
pub struct MockOrphanScanner {
    pub contents: Arc<MockContentStore>,
    pub posts: Arc<MockPostRepository>,
    pub messages: Arc<MockMessageRepository>,
}

#[async_trait]
impl OrphanScanner for MockOrphanScanner {
    async fn find_orphans(
        &self,
        created_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<ContentItem>> {
        let mut referenced = self.posts.referenced_ids();
        referenced.extend(self.messages.referenced_ids());

        let mut orphans: Vec<_> = self
            .contents
            .all()
            .into_iter()
            .filter(|(item, created_at)| *created_at < created_before && !referenced.contains(&item.id))
            .collect();
        orphans.sort_by_key(|(_, created_at)| *created_at);

        Ok(orphans
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(item, _)| item)
            .collect())
    }

    async fn urls_in_use(&self, urls: &[String], excluding: &[Uuid]) -> Result<HashSet<String>> {
        Ok(self
            .contents
            .all()
            .into_iter()
            .filter(|(item, _)| !excluding.contains(&item.id))
            .filter_map(|(item, _)| item.payload.blob_url().map(str::to_string))
            .filter(|url| urls.contains(url))
            .collect())
    }
}

//! Mock ContentItemStore keeping records in memory

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use posting_service::db::ContentItemStore;
use posting_service::error::{AppError, Result};
use posting_service::models::{ContentItem, ContentKind, ContentPayload};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MockContentStore {
    items: Mutex<HashMap<Uuid, (ContentItem, DateTime<Utc>)>>,
    create_calls: Mutex<usize>,
    update_calls: Mutex<Vec<Uuid>>,
    delete_calls: Mutex<Vec<Uuid>>,
    failing_creates: Mutex<HashSet<ContentKind>>,
    failing_deletes: Mutex<HashSet<Uuid>>,
}

impl MockContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record directly, bypassing call tracking
    pub fn seed(&self, payload: ContentPayload) -> ContentItem {
        self.seed_at(payload, Utc::now())
    }

    pub fn seed_at(&self, payload: ContentPayload, created_at: DateTime<Utc>) -> ContentItem {
        let item = ContentItem {
            id: Uuid::new_v4(),
            payload,
        };
        self.items
            .lock()
            .unwrap()
            .insert(item.id, (item.clone(), created_at));
        item
    }

    /// Overwrite a stored record, tag included
    pub fn overwrite(&self, item: ContentItem) {
        let mut items = self.items.lock().unwrap();
        let created_at = items.get(&item.id).map(|(_, at)| *at).unwrap_or_else(Utc::now);
        items.insert(item.id, (item, created_at));
    }

    /// Remove a record behind the service's back
    pub fn vanish(&self, id: Uuid) {
        self.items.lock().unwrap().remove(&id);
    }

    pub fn item(&self, id: Uuid) -> Option<ContentItem> {
        self.items.lock().unwrap().get(&id).map(|(item, _)| item.clone())
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.items.lock().unwrap().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<(ContentItem, DateTime<Utc>)> {
        self.items.lock().unwrap().values().cloned().collect()
    }

    pub fn fail_creates_of(&self, kind: ContentKind) {
        self.failing_creates.lock().unwrap().insert(kind);
    }

    pub fn fail_deletes_of(&self, id: Uuid) {
        self.failing_deletes.lock().unwrap().insert(id);
    }

    pub fn clear_failures(&self) {
        self.failing_creates.lock().unwrap().clear();
        self.failing_deletes.lock().unwrap().clear();
    }

    pub fn create_calls(&self) -> usize {
        *self.create_calls.lock().unwrap()
    }

    pub fn update_calls(&self) -> Vec<Uuid> {
        self.update_calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<Uuid> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        *self.create_calls.lock().unwrap() = 0;
        self.update_calls.lock().unwrap().clear();
        self.delete_calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl ContentItemStore for MockContentStore {
    async fn create(&self, payload: &ContentPayload) -> Result<ContentItem> {
        *self.create_calls.lock().unwrap() += 1;
        tokio::task::yield_now().await;

        if self.failing_creates.lock().unwrap().contains(&payload.kind()) {
            return Err(AppError::DatabaseError("injected create failure".into()));
        }

        Ok(self.seed(payload.clone()))
    }

    async fn get(&self, id: Uuid) -> Result<Option<ContentItem>> {
        Ok(self.item(id))
    }

    async fn update(&self, id: Uuid, payload: &ContentPayload) -> Result<()> {
        self.update_calls.lock().unwrap().push(id);

        let mut items = self.items.lock().unwrap();
        let (item, _) = items
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("content item {}", id)))?;

        if item.kind() != payload.kind() {
            return Err(AppError::TagMismatch {
                content_id: id,
                stored: item.kind(),
                expected: payload.kind(),
            });
        }

        item.payload = payload.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.delete_calls.lock().unwrap().push(id);

        if self.failing_deletes.lock().unwrap().contains(&id) {
            return Err(AppError::DatabaseError("injected delete failure".into()));
        }

        Ok(self.items.lock().unwrap().remove(&id).is_some())
    }
}

//! Mock BlobStore keeping objects in memory

use async_trait::async_trait;
use blob_store::{BlobStore, BlobStoreError};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

pub const BASE_URL: &str = "https://test-bucket.s3.us-east-1.amazonaws.com/";

#[derive(Default)]
pub struct MockBlobStore {
    objects: Mutex<HashMap<String, (Bytes, String)>>,
    put_calls: Mutex<Vec<String>>,
    delete_calls: Mutex<Vec<String>>,
    /// Puts whose key contains any of these fail
    failing_puts: Mutex<Vec<String>>,
    /// Deletes whose key contains any of these fail
    failing_deletes: Mutex<Vec<String>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly, bypassing call tracking. Returns its URL.
    pub fn seed(&self, key: &str) -> String {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (Bytes::from_static(b"seed"), "application/octet-stream".into()));
        self.object_url(key)
    }

    pub fn fail_puts_matching(&self, fragment: &str) {
        self.failing_puts.lock().unwrap().push(fragment.to_string());
    }

    pub fn fail_deletes_matching(&self, fragment: &str) {
        self.failing_deletes.lock().unwrap().push(fragment.to_string());
    }

    pub fn clear_failures(&self) {
        self.failing_puts.lock().unwrap().clear();
        self.failing_deletes.lock().unwrap().clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.key_from_url(url)
            .map(|key| self.contains(&key))
            .unwrap_or(false)
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn put_calls(&self) -> Vec<String> {
        self.put_calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.put_calls.lock().unwrap().clear();
        self.delete_calls.lock().unwrap().clear();
    }

    fn matches(list: &Mutex<Vec<String>>, key: &str) -> bool {
        list.lock().unwrap().iter().any(|fragment| key.contains(fragment.as_str()))
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String, BlobStoreError> {
        self.put_calls.lock().unwrap().push(key.to_string());
        tokio::task::yield_now().await;

        if Self::matches(&self.failing_puts, key) {
            return Err(BlobStoreError::PutFailed {
                key: key.to_string(),
                message: "injected put failure".into(),
            });
        }

        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(self.object_url(key))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        self.delete_calls.lock().unwrap().push(key.to_string());

        if Self::matches(&self.failing_deletes, key) {
            return Err(BlobStoreError::DeleteFailed {
                key: key.to_string(),
                message: "injected delete failure".into(),
            });
        }

        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}{}", BASE_URL, key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(BASE_URL)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

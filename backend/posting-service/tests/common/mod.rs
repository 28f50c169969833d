//! In-memory collaborators for integration tests.
//!
//! Each mock records the calls it receives and can be told to fail
//! specific operations, so tests can assert on exact write/delete
//! traffic without Postgres or S3.
#![allow(dead_code)]

pub mod mock_blob_store;
pub mod mock_content_store;
pub mod mock_parents;

use mock_blob_store::MockBlobStore;
use mock_content_store::MockContentStore;
use mock_parents::{MockMessageRepository, MockPostRepository, MockUserDirectory};
use posting_service::services::{MessageService, PostService};
use std::sync::Arc;

/// Every collaborator of the post and message services, wired together.
pub struct Harness {
    pub blobs: Arc<MockBlobStore>,
    pub contents: Arc<MockContentStore>,
    pub posts: Arc<MockPostRepository>,
    pub messages: Arc<MockMessageRepository>,
    pub users: Arc<MockUserDirectory>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(MockBlobStore::new()),
            contents: Arc::new(MockContentStore::new()),
            posts: Arc::new(MockPostRepository::new()),
            messages: Arc::new(MockMessageRepository::new()),
            users: Arc::new(MockUserDirectory::new()),
        }
    }

    pub fn post_service(&self) -> PostService {
        PostService::new(
            self.posts.clone(),
            self.users.clone(),
            self.contents.clone(),
            self.blobs.clone(),
        )
    }

    pub fn message_service(&self) -> MessageService {
        MessageService::new(
            self.messages.clone(),
            self.users.clone(),
            self.contents.clone(),
            self.blobs.clone(),
        )
    }
}

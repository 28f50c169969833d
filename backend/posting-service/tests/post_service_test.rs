//! Integration Tests: Post Service
//!
//! Coverage:
//! - Create with text and uploaded media, owner validation
//! - Cleanup of uploaded blobs when a create fails part-way
//! - Edit: metadata, in-place media swap, rejection before any write
//! - Populated reads and cascade delete with retry

mod common;

use bytes::Bytes;
use common::Harness;
use posting_service::error::AppError;
use posting_service::models::{ContentDescription, ContentKind, ContentPayload};
use posting_service::services::{IncomingFile, PostDraft};
use uuid::Uuid;

fn draft(contents: Vec<ContentDescription>) -> PostDraft {
    PostDraft {
        title: "Weekend hike".into(),
        category: "outdoors".into(),
        contents,
    }
}

fn upload(field_name: &str, file_name: &str) -> IncomingFile {
    IncomingFile::new(field_name, file_name, Bytes::from_static(b"media"))
}

#[tokio::test]
async fn test_create_post_with_uploads() {
    let h = Harness::new();
    let author = h.users.add_user("alice");

    let view = h
        .post_service()
        .create_post(
            author,
            draft(vec![ContentDescription::text("trail notes"), ContentDescription::default()]),
            vec![upload("contents[1][image]", "summit.jpg")],
        )
        .await
        .unwrap();

    assert_eq!(view.post.author_id, author);
    assert_eq!(view.contents.len(), 2);
    assert_eq!(view.contents[0].payload, ContentPayload::text("trail notes"));

    let kinds: Vec<_> = view.post.attachments().iter().map(|a| a.kind).collect();
    assert_eq!(kinds, vec![ContentKind::Text, ContentKind::Image]);

    let url = view.contents[1].payload.blob_url().unwrap();
    assert!(h.blobs.contains_url(url));
    assert!(h.posts.post(view.post.id).is_some());
}

#[tokio::test]
async fn test_create_post_for_unknown_author_writes_nothing() {
    let h = Harness::new();

    let err = h
        .post_service()
        .create_post(
            Uuid::new_v4(),
            draft(vec![ContentDescription::text("x")]),
            vec![upload("contents[1]", "a.png")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(h.blobs.put_calls().is_empty());
    assert_eq!(h.contents.create_calls(), 0);
}

#[tokio::test]
async fn test_failed_record_create_discards_uploads() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    h.contents.fail_creates_of(ContentKind::Video);

    let err = h
        .post_service()
        .create_post(
            author,
            draft(Vec::new()),
            vec![upload("contents[0]", "a.png"), upload("contents[1]", "b.mp4")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::DatabaseError(_)));
    assert_eq!(h.blobs.object_count(), 0);
}

#[tokio::test]
async fn test_failed_post_insert_discards_uploads() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    h.posts.fail_inserts();

    let result = h
        .post_service()
        .create_post(author, draft(Vec::new()), vec![upload("contents[0]", "a.png")])
        .await;

    assert!(result.is_err());
    assert_eq!(h.blobs.put_calls().len(), 1);
    assert_eq!(h.blobs.object_count(), 0);
}

#[tokio::test]
async fn test_edit_post_swaps_image_in_place() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    let service = h.post_service();

    let created = service
        .create_post(
            author,
            draft(vec![ContentDescription::text("a")]),
            vec![upload("contents[1]", "old.png")],
        )
        .await
        .unwrap();
    let image_id = created.contents[1].id;
    let old_url = created.contents[1].payload.blob_url().unwrap().to_string();

    let edited = service
        .edit_post(
            created.post.id,
            PostDraft {
                title: "Renamed".into(),
                category: "travel".into(),
                contents: vec![ContentDescription::text("a"), ContentDescription::default()],
            },
            vec![upload("contents[1]", "new.png")],
        )
        .await
        .unwrap();

    assert_eq!(edited.post.title, "Renamed");
    assert_eq!(edited.post.category, "travel");
    assert_eq!(edited.contents[0].id, created.contents[0].id);
    assert_eq!(edited.contents[1].id, image_id);

    let new_url = edited.contents[1].payload.blob_url().unwrap();
    assert_ne!(new_url, old_url);
    assert!(h.blobs.contains_url(new_url));
    assert!(!h.blobs.contains_url(&old_url));

    let stored = h.posts.post(created.post.id).unwrap();
    assert_eq!(stored.title, "Renamed");
    assert_eq!(stored.attachments(), created.post.attachments());
}

#[tokio::test]
async fn test_edit_post_keeps_existing_url_descriptions() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    let service = h.post_service();

    let created = service
        .create_post(
            author,
            draft(Vec::new()),
            vec![upload("contents[0]", "photo.png")],
        )
        .await
        .unwrap();
    let url = created.contents[0].payload.blob_url().unwrap().to_string();
    h.blobs.reset_calls();

    // Client resubmits the stored URL and appends a text slot
    let edited = service
        .edit_post(
            created.post.id,
            draft(vec![ContentDescription::image(url.clone()), ContentDescription::text("more")]),
            Vec::new(),
        )
        .await
        .unwrap();

    assert_eq!(edited.contents[0].id, created.contents[0].id);
    assert_eq!(edited.contents.len(), 2);
    assert!(h.blobs.put_calls().is_empty());
    assert!(h.blobs.delete_calls().is_empty());
    assert!(h.contents.update_calls().is_empty());
}

#[tokio::test]
async fn test_malformed_edit_changes_nothing() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    let service = h.post_service();

    let created = service
        .create_post(author, draft(vec![ContentDescription::text("a")]), Vec::new())
        .await
        .unwrap();
    h.contents.reset_calls();

    let ambiguous = ContentDescription {
        text: Some("a".into()),
        image: Some("https://x/y.png".into()),
        video: None,
    };
    let err = service
        .edit_post(
            created.post.id,
            draft(vec![ambiguous]),
            vec![upload("contents[1]", "z.png")],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::MalformedContent { position: 0, .. }));
    assert_eq!(h.posts.update_calls(), 0);
    assert_eq!(h.contents.create_calls(), 0);
    assert!(h.blobs.put_calls().is_empty());
}

#[tokio::test]
async fn test_edit_missing_post_is_not_found() {
    let h = Harness::new();

    let err = h
        .post_service()
        .edit_post(Uuid::new_v4(), draft(Vec::new()), Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_get_post_returns_contents_in_order() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    let service = h.post_service();

    let created = service
        .create_post(
            author,
            draft(vec![
                ContentDescription::text("one"),
                ContentDescription::default(),
                ContentDescription::text("three"),
            ]),
            vec![upload("contents[1]", "two.mp4")],
        )
        .await
        .unwrap();

    let view = service.get_post(created.post.id).await.unwrap();
    assert_eq!(view.contents, created.contents);
    assert_eq!(view.contents[1].kind(), ContentKind::Video);
}

#[tokio::test]
async fn test_get_post_skips_vanished_record() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    let service = h.post_service();

    let created = service
        .create_post(
            author,
            draft(vec![
                ContentDescription::text("one"),
                ContentDescription::text("two"),
                ContentDescription::text("three"),
            ]),
            Vec::new(),
        )
        .await
        .unwrap();
    h.contents.vanish(created.contents[1].id);

    let view = service.get_post(created.post.id).await.unwrap();

    assert_eq!(view.contents.len(), 2);
    assert_eq!(view.contents[0].id, created.contents[0].id);
    assert_eq!(view.contents[1].id, created.contents[2].id);
    assert_eq!(view.post.attachments().len(), 3);
}

#[tokio::test]
async fn test_delete_post_cascades() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    let service = h.post_service();

    let created = service
        .create_post(
            author,
            draft(vec![ContentDescription::text("bye")]),
            vec![upload("contents[1]", "a.png"), upload("contents[2]", "b.mp4")],
        )
        .await
        .unwrap();

    service.delete_post(created.post.id).await.unwrap();

    assert!(h.posts.post(created.post.id).is_none());
    assert_eq!(h.contents.len(), 0);
    assert_eq!(h.blobs.object_count(), 0);
    assert!(matches!(
        service.get_post(created.post.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_failed_delete_keeps_post_for_retry() {
    let h = Harness::new();
    let author = h.users.add_user("alice");
    let service = h.post_service();

    let created = service
        .create_post(
            author,
            draft(Vec::new()),
            vec![upload("contents[0]", "a.png"), upload("contents[1]", "b.mp4")],
        )
        .await
        .unwrap();
    h.blobs.fail_deletes_matching(".mp4");

    let err = service.delete_post(created.post.id).await.unwrap_err();
    match err {
        AppError::PartialCleanupFailure { parent, failures } => {
            assert_eq!(parent.id, created.post.id);
            assert_eq!(failures.len(), 1);
        }
        other => panic!("expected PartialCleanupFailure, got {:?}", other),
    }
    assert!(h.posts.post(created.post.id).is_some());
    assert!(!h.contents.contains(created.contents[0].id));

    h.blobs.clear_failures();
    service.delete_post(created.post.id).await.unwrap();
    assert!(h.posts.post(created.post.id).is_none());
    assert_eq!(h.contents.len(), 0);
}

/// Posting Service Library
///
/// Owns posts and direct messages together with their ordered attachment
/// sequences of text, image and video content. Images and videos live in
/// the S3 attachment bucket; the service keeps records and blobs in step
/// across creates, edits and deletes.
///
/// # Modules
///
/// - `models`: Content items, attachments, parents and submitted descriptions
/// - `db`: Repository traits and their Postgres implementations
/// - `services`: Upload mapping, attachment reconciliation, post and message flows
/// - `jobs`: Background orphan sweeper
/// - `metrics`: Prometheus collectors and the `/metrics` handler
/// - `error`: Error types and handling
/// - `config`: Configuration management
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

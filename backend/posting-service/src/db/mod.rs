/// Database access layer
///
/// Repository traits consumed by the services, with their Postgres
/// implementations. Schema lives in `migrations/`.
pub mod content_repo;
pub mod message_repo;
pub mod post_repo;
pub mod user_repo;

use sqlx::migrate::Migrator;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

pub use content_repo::{ContentItemStore, OrphanScanner, PgContentItemStore};
pub use message_repo::{MessageRepository, PgMessageRepository};
pub use post_repo::{PgPostRepository, PostRepository};
pub use user_repo::{PgUserDirectory, UserDirectory};

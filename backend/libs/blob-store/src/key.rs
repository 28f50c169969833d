//! Object key scheme: `<prefix>/<owner_id>/<timestamp>-<suffix><extension>`.

use chrono::Utc;
use uuid::Uuid;

/// Build a fresh object key for a file owned by `owner_id`.
///
/// The timestamp keeps keys ordered by upload time; the random suffix keeps
/// keys issued within the same millisecond (concurrent uploads) distinct.
/// `extension` includes the leading dot.
pub fn object_key(prefix: &str, owner_id: Uuid, extension: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let suffix = Uuid::new_v4().simple().to_string();

    format!(
        "{}/{}/{}-{}{}",
        prefix,
        owner_id,
        timestamp,
        &suffix[..8],
        extension
    )
}

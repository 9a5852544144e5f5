//! Entity tag generation
//!
//! Tags are derived from file metadata only, never from content, so they are
//! free to compute on every request.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::fs::ResourceStat;

/// Build the entity tag for a resource
///
/// Strong form is `"ino-size-mtime"`, weak form prefixes it with `W/`.
/// The modification time is an ISO-8601 UTC timestamp with millisecond
/// precision.
pub fn generate_etag(stat: &ResourceStat, weak: bool) -> String {
    let modified: DateTime<Utc> = stat.modified.into();
    let tag = format!(
        "\"{}-{}-{}\"",
        stat.ino,
        stat.size,
        modified.to_rfc3339_opts(SecondsFormat::Millis, true)
    );
    if weak {
        format!("W/{tag}")
    } else {
        tag
    }
}

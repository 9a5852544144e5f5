//! Directory listing
//!
//! Builds a structured, ordered listing of one directory and renders it as
//! a minimal HTML page. Whether a listing is shown at all is decided by the
//! caller.

use std::cmp::Ordering;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use percent_encoding::utf8_percent_encode;

use super::resolve::SEGMENT;
use crate::config::ServerConfig;
use crate::fs::{FileSystem, ResourceStat};
use crate::http::response::escape_html;

const PARENT: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    /// The entry could not be stat'ed
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub stat: Option<ResourceStat>,
}

impl DirectoryEntry {
    pub fn kind(&self) -> EntryKind {
        match self.stat {
            Some(stat) if stat.is_dir => EntryKind::Directory,
            Some(_) => EntryKind::File,
            None => EntryKind::Unknown,
        }
    }
}

/// One displayable line of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub name: String,
    /// Relative, percent-encoded link target
    pub href: String,
    pub kind: EntryKind,
    pub size: String,
    /// `None` when permissions are hidden
    pub permissions: Option<String>,
    pub modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Decoded URL path of the listed directory, ending with `/`
    pub pathname: String,
    pub rows: Vec<ListingRow>,
}

/// Read, stat and order the entries of `dir`
///
/// Entries that fail to stat are kept as [`EntryKind::Unknown`]. A `..`
/// row leads the listing unless `dir` is the served root.
pub async fn read_listing(
    fs: &dyn FileSystem,
    config: &ServerConfig,
    dir: &Path,
    pathname: &str,
) -> io::Result<Listing> {
    let names = fs
        .read_dir(dir)
        .await?
        .into_iter()
        .filter(|name| config.show_dotfiles || !name.starts_with('.'));

    let entries = join_all(names.map(|name| async move {
        let stat = fs.stat(&dir.join(&name)).await.ok();
        DirectoryEntry { name, stat }
    }))
    .await;

    let mut ordered = Vec::with_capacity(entries.len() + 1);
    if let Some(parent) = parent_entry(fs, config, dir).await {
        ordered.push(parent);
    }
    ordered.extend(order_entries(entries));

    Ok(Listing {
        pathname: pathname.to_string(),
        rows: ordered.iter().map(|entry| to_row(entry, config)).collect(),
    })
}

async fn parent_entry(
    fs: &dyn FileSystem,
    config: &ServerConfig,
    dir: &Path,
) -> Option<DirectoryEntry> {
    if dir == config.root {
        return None;
    }
    let parent = dir.parent().filter(|p| p.starts_with(&config.root))?;
    Some(DirectoryEntry {
        name: PARENT.to_string(),
        stat: fs.stat(parent).await.ok(),
    })
}

/// Directories, then files, then unknown entries, each sorted by name
pub fn order_entries(entries: Vec<DirectoryEntry>) -> Vec<DirectoryEntry> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut unknown = Vec::new();
    for entry in entries {
        match entry.kind() {
            EntryKind::Directory => dirs.push(entry),
            EntryKind::File => files.push(entry),
            EntryKind::Unknown => unknown.push(entry),
        }
    }

    for bucket in [&mut dirs, &mut files, &mut unknown] {
        bucket.sort_by(|a, b| compare_names(&a.name, &b.name));
    }

    dirs.into_iter().chain(files).chain(unknown).collect()
}

/// Case-insensitive order with a byte-wise tie break
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn to_row(entry: &DirectoryEntry, config: &ServerConfig) -> ListingRow {
    let kind = entry.kind();
    let href = if entry.name == PARENT {
        "../".to_string()
    } else {
        // "./" keeps names like `javascript:x` from reading as a scheme
        let encoded = utf8_percent_encode(&entry.name, SEGMENT);
        match kind {
            EntryKind::Directory => format!("./{encoded}/"),
            _ => format!("./{encoded}"),
        }
    };

    let size = match entry.stat {
        Some(stat) if kind == EntryKind::File => {
            format_size(stat.size, config.human_readable, config.si)
        }
        _ => String::new(),
    };

    ListingRow {
        name: entry.name.clone(),
        href,
        kind,
        size,
        permissions: (!config.hide_permissions).then(|| format_permissions(entry.stat.as_ref())),
        modified: entry
            .stat
            .map(|stat| format_modified(stat.modified))
            .unwrap_or_default(),
    }
}

/// Size as shown in a listing, e.g. `512B`, `1.5K`, `2.0M`
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64, human_readable: bool, si: bool) -> String {
    if !human_readable {
        return bytes.to_string();
    }

    let (base, units) = if si {
        (1000.0, ["k", "M", "G", "T", "P", "E"])
    } else {
        (1024.0, ["K", "M", "G", "T", "P", "E"])
    };

    let mut value = bytes as f64;
    if value < base {
        return format!("{bytes}B");
    }

    let mut unit = 0;
    value /= base;
    while value >= base && unit < units.len() - 1 {
        value /= base;
        unit += 1;
    }
    format!("{value:.1}{}", units[unit])
}

/// `ls -l` style permission string in parentheses, `(?)` when unknown
pub fn format_permissions(stat: Option<&ResourceStat>) -> String {
    let Some(stat) = stat else {
        return "(?)".to_string();
    };

    let mut out = String::with_capacity(12);
    out.push('(');
    out.push(if stat.is_dir { 'd' } else { '-' });
    for shift in [6, 3, 0] {
        let bits = (stat.mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out.push(')');
    out
}

fn format_modified(modified: SystemTime) -> String {
    DateTime::<Utc>::from(modified)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Render a listing as a self-contained HTML page
pub fn render_html(listing: &Listing) -> String {
    let title = escape_html(&listing.pathname);
    let mut html = String::with_capacity(1024 + listing.rows.len() * 160);

    html.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>Index of {title}</title>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>Index of {title}</h1>\n<table>\n"));

    for row in &listing.rows {
        html.push_str("<tr>");
        if let Some(perms) = &row.permissions {
            html.push_str(&format!("<td><code>{perms}</code></td>"));
        }
        let label = match row.kind {
            EntryKind::Directory => format!("{}/", escape_html(&row.name)),
            _ => escape_html(&row.name),
        };
        html.push_str(&format!(
            "<td>{}</td><td>{}</td><td><a href=\"{}\">{label}</a></td></tr>\n",
            row.modified,
            row.size,
            escape_html(&row.href),
        ));
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

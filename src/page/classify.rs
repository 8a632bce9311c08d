//! Predicates selecting which data directory files take part in page diffing.

use std::fs::Metadata;
use std::path::Path;

use super::PageConfig;

pub const DEFAULT_TABLESPACE: &str = "base";
pub const GLOBAL_TABLESPACE: &str = "global";
pub const NON_DEFAULT_TABLESPACE: &str = "pg_tblspc";

/// Transaction commit status.
pub const XACT_DIR: &str = "pg_xact";
/// Pre-10 name of `pg_xact`.
pub const CLOG_DIR: &str = "pg_clog";
/// Multi-transaction status.
pub const MULTIXACT_DIR: &str = "pg_multixact";

const TRANSACTION_STATE_DIRS: [&str; 3] = [XACT_DIR, CLOG_DIR, MULTIXACT_DIR];

/// The parts of a directory entry the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    pub is_dir: bool,
    pub size: u64,
}

impl EntryInfo {
    pub fn file(size: u64) -> Self {
        Self {
            is_dir: false,
            size,
        }
    }
}

impl From<&Metadata> for EntryInfo {
    fn from(meta: &Metadata) -> Self {
        Self {
            is_dir: meta.is_dir(),
            size: meta.len(),
        }
    }
}

/// SLRU files under these directories are not page-structured for diffing.
pub fn is_transaction_state_path(path: &Path) -> bool {
    let text = path.to_string_lossy();
    TRANSACTION_STATE_DIRS.iter().any(|dir| text.contains(dir))
}

pub fn is_paged_file(entry: &EntryInfo, path: &Path, config: &PageConfig) -> bool {
    if is_transaction_state_path(path) {
        return false;
    }
    is_checksum_validatable_file(entry, path) && entry.size % config.page_size as u64 == 0
}

/// Like [`is_paged_file`] but tolerates a trailing partial page.
pub fn is_checksum_validatable_file(entry: &EntryInfo, path: &Path) -> bool {
    !entry.is_dir && in_tablespace(path) && entry.size > 0 && is_relation_file_name(path)
}

fn in_tablespace(path: &Path) -> bool {
    let text = path.to_string_lossy();
    text.contains(DEFAULT_TABLESPACE) || text.contains(NON_DEFAULT_TABLESPACE)
}

fn is_relation_file_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(parse_relation_file_name)
        .is_some()
}

/// Split `<relfilenode>[.<segment>]` into its numbers.
pub(crate) fn parse_relation_file_name(name: &str) -> Option<(u32, u32)> {
    let (rel, seg) = match name.split_once('.') {
        Some((rel, seg)) => (rel, Some(seg)),
        None => (name, None),
    };
    let rel = parse_digits(rel)?;
    let seg = match seg {
        Some(seg) => parse_digits(seg)?,
        None => 0,
    };
    Some((rel, seg))
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

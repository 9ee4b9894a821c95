use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

use crate::model::item::ItemKind;
use crate::ops::session::Diagnostic;

/// Entries older than this are dropped by `tw recovery prune`.
pub const PRUNE_AGE_DAYS: i64 = 30;

/// Written once at the top of a new log.
const FILE_HEADER: &str = "\
<!-- twig recovery log: data twig could not save or was asked to drop.
     View with: tw recovery
     Prune old entries: tw recovery prune -->

---
";

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// What kind of trouble an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// `store.json` could not be read back
    Parser,
    /// A request named parents that address nothing
    Address,
    /// The store could not be written
    Write,
    /// An item (and its children) was deleted
    Delete,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Parser => write!(f, "parser"),
            RecoveryCategory::Address => write!(f, "address"),
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::Delete => write!(f, "delete"),
        }
    }
}

impl RecoveryCategory {
    pub fn parse_category(s: &str) -> Option<Self> {
        match s {
            "parser" => Some(RecoveryCategory::Parser),
            "address" => Some(RecoveryCategory::Address),
            "write" => Some(RecoveryCategory::Write),
            "delete" => Some(RecoveryCategory::Delete),
            _ => None,
        }
    }
}

/// One entry in the recovery log
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

pub fn recovery_log_path(twig_dir: &Path) -> PathBuf {
    twig_dir.join(".recovery.log")
}

/// Write `content` to `path` via a sibling temp file and rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

impl RecoveryEntry {
    /// `## <rfc3339> [<category>] <description>`, then fields, then a
    /// fenced body, then a `---` rule.
    pub fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {} [{}] {}\n\n",
            self.timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            self.category,
            self.description,
        );

        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }

        if !self.body.is_empty() {
            out.push_str("\n```json\n");
            out.push_str(&self.body);
            if !self.body.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n");
        }

        out.push_str("\n---\n");
        out
    }

    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Append an entry. Failures are reported on stderr and otherwise ignored.
pub fn log_recovery(twig_dir: &Path, entry: RecoveryEntry) {
    if let Err(e) = append_entry(twig_dir, &entry) {
        eprintln!("warning: could not write to recovery log: {}", e);
    }
}

fn append_entry(twig_dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(twig_dir);
    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Record a deleted item with its JSON so it can be re-created by hand.
pub fn log_deletion(twig_dir: &Path, kind: ItemKind, id: &str, snapshot: &str) {
    log_recovery(
        twig_dir,
        RecoveryEntry::new(RecoveryCategory::Delete, format!("{} {} deleted", kind, id))
            .field("Kind", kind.to_string())
            .field("Id", id)
            .body(snapshot),
    );
}

/// Record a delete whose parent ids did not form an address.
pub fn log_malformed_address(twig_dir: &Path, item_id: &str, reason: &str) {
    log_recovery(
        twig_dir,
        RecoveryEntry::new(RecoveryCategory::Address, "delete ignored")
            .field("Id", item_id)
            .field("Reason", reason),
    );
}

/// Write session diagnostics to the log.
pub fn log_diagnostics(twig_dir: &Path, diagnostics: Vec<Diagnostic>) {
    for diagnostic in diagnostics {
        match diagnostic {
            Diagnostic::MalformedAddress { item_id, error } => {
                log_malformed_address(twig_dir, &item_id, &error.to_string())
            }
            Diagnostic::Deleted { kind, id, snapshot } => {
                log_deletion(twig_dir, kind, &id, &snapshot)
            }
            Diagnostic::UnknownPlaceholder { key } => log_recovery(
                twig_dir,
                RecoveryEntry::new(RecoveryCategory::Address, "unknown placeholder key")
                    .field("Key", key),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Entries newest first, optionally limited and filtered by time.
pub fn read_recovery_entries(
    twig_dir: &Path,
    limit: Option<usize>,
    since: Option<DateTime<Utc>>,
) -> Vec<RecoveryEntry> {
    let content = match std::fs::read_to_string(recovery_log_path(twig_dir)) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let mut entries = parse_entries(&content);
    if let Some(since) = since {
        entries.retain(|e| e.timestamp >= since);
    }
    if let Some(n) = limit {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries.reverse();
    entries
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some((timestamp, category, description)) =
            line.strip_prefix("## ").and_then(parse_entry_header)
        else {
            continue;
        };

        let mut fields = Vec::new();
        let mut body = String::new();
        let mut in_body = false;

        for line in lines.by_ref() {
            if in_body {
                if line.starts_with("```") {
                    in_body = false;
                } else {
                    if !body.is_empty() {
                        body.push('\n');
                    }
                    body.push_str(line);
                }
                continue;
            }
            if line == "---" {
                break;
            }
            if line.starts_with("```") {
                in_body = true;
                continue;
            }
            if let Some((key, value)) = line.trim().split_once(": ") {
                fields.push((key.to_string(), value.to_string()));
            }
        }

        entries.push(RecoveryEntry {
            timestamp,
            category,
            description,
            fields,
            body,
        });
    }

    entries
}

/// Parse `<timestamp> [<category>] <description>`
fn parse_entry_header(header: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (timestamp, rest) = header.split_once(" [")?;
    let (category, description) = rest.split_once("] ")?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .ok()?
        .with_timezone(&Utc);
    let category = RecoveryCategory::parse_category(category)?;
    Some((timestamp, category, description.to_string()))
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Drop entries older than `before` (default [`PRUNE_AGE_DAYS`]), or all of
/// them. Returns how many were removed.
pub fn prune_recovery(
    twig_dir: &Path,
    before: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = recovery_log_path(twig_dir);
    if !path.exists() {
        return Ok(0);
    }

    let content = std::fs::read_to_string(&path)?;
    let entries = parse_entries(&content);
    let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));
    let kept: Vec<&RecoveryEntry> = if all {
        Vec::new()
    } else {
        entries.iter().filter(|e| e.timestamp >= cutoff).collect()
    };

    let mut out = FILE_HEADER.to_string();
    for entry in &kept {
        out.push_str(&entry.to_markdown());
    }
    atomic_write(&path, out.as_bytes())?;
    Ok(entries.len() - kept.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_entry(category: RecoveryCategory, desc: &str, body: &str) -> RecoveryEntry {
        RecoveryEntry::new(category, desc)
            .field("Id", "task_3")
            .field("Kind", "task")
            .body(body)
    }

    #[test]
    fn entry_formatting() {
        let md = sample_entry(RecoveryCategory::Delete, "task task_3 deleted", "{}").to_markdown();
        assert!(md.starts_with("## "));
        assert!(md.contains("[delete] task task_3 deleted"));
        assert!(md.contains("Id: task_3\n"));
        assert!(md.contains("```json\n{}\n```"));
        assert!(md.ends_with("---\n"));
    }

    #[test]
    fn log_and_read_back() {
        let tmp = TempDir::new().unwrap();
        log_recovery(tmp.path(), sample_entry(RecoveryCategory::Write, "first", "a"));
        log_recovery(
            tmp.path(),
            sample_entry(RecoveryCategory::Address, "second", ""),
        );

        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].description, "second");
        assert_eq!(entries[0].category, RecoveryCategory::Address);
        assert_eq!(entries[1].body, "a");
        assert_eq!(
            entries[1].fields,
            vec![
                ("Id".to_string(), "task_3".to_string()),
                ("Kind".to_string(), "task".to_string()),
            ]
        );
    }

    #[test]
    fn header_written_once() {
        let tmp = TempDir::new().unwrap();
        log_malformed_address(tmp.path(), "subtask_4", "no folder");
        log_deletion(tmp.path(), ItemKind::Folder, "folder_1", "{\n  \"id\": \"folder_1\"\n}");
        let content = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert_eq!(content.matches("twig recovery log").count(), 1);

        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries[0].category, RecoveryCategory::Delete);
        assert_eq!(entries[0].body, "{\n  \"id\": \"folder_1\"\n}");
        assert_eq!(entries[1].fields[1].1, "no folder");
    }

    #[test]
    fn diagnostics_map_to_categories() {
        use crate::ops::tree_ops::AddressError;
        let tmp = TempDir::new().unwrap();
        log_diagnostics(
            tmp.path(),
            vec![
                Diagnostic::MalformedAddress {
                    item_id: "subtask_3".into(),
                    error: AddressError::TaskWithoutFolder {
                        task_id: "task_2".into(),
                    },
                },
                Diagnostic::Deleted {
                    kind: ItemKind::Task,
                    id: "task_2".into(),
                    snapshot: "{}".into(),
                },
            ],
        );
        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries[0].category, RecoveryCategory::Delete);
        assert_eq!(entries[0].description, "task task_2 deleted");
        assert_eq!(entries[1].category, RecoveryCategory::Address);
        assert_eq!(
            entries[1].fields[1].1,
            "parent task task_2 given without a parent folder"
        );
    }

    #[test]
    fn read_with_limit_keeps_newest() {
        let tmp = TempDir::new().unwrap();
        for i in 0..5 {
            log_recovery(
                tmp.path(),
                sample_entry(RecoveryCategory::Write, &format!("entry {}", i), ""),
            );
        }
        let entries = read_recovery_entries(tmp.path(), Some(2), None);
        let descs: Vec<&str> = entries.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descs, vec!["entry 4", "entry 3"]);
    }

    #[test]
    fn prune_old_and_all() {
        let tmp = TempDir::new().unwrap();
        let mut old = sample_entry(RecoveryCategory::Delete, "old", "");
        old.timestamp = Utc::now() - chrono::Duration::days(60);
        log_recovery(tmp.path(), old);
        log_recovery(tmp.path(), sample_entry(RecoveryCategory::Delete, "new", ""));

        assert_eq!(prune_recovery(tmp.path(), None, false).unwrap(), 1);
        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "new");

        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 1);
        assert!(read_recovery_entries(tmp.path(), None, None).is_empty());
    }

    #[test]
    fn prune_without_log_is_zero() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(prune_recovery(tmp.path(), None, true).unwrap(), 0);
    }

    #[test]
    fn header_parsing() {
        let parsed = parse_entry_header("2026-01-02T03:04:05Z [write] store save failed").unwrap();
        assert_eq!(parsed.1, RecoveryCategory::Write);
        assert_eq!(parsed.2, "store save failed");
        assert!(parse_entry_header("not a header").is_none());
        assert!(parse_entry_header("2026-01-02T03:04:05Z [bogus] x").is_none());
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("store.json");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn entry_json() {
        let json = sample_entry(RecoveryCategory::Parser, "bad store", "{").to_json();
        assert_eq!(json["category"], "parser");
        assert_eq!(json["fields"]["Id"], "task_3");
        assert_eq!(json["body"], "{");
    }
}

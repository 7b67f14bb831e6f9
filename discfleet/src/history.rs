//! Rip history reader.
//!
//! The rip workflow appends one JSON object per finished rip to a history
//! file. The fleet manager only reads it for display, newest first.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Default page size.
pub const DEFAULT_PER_PAGE: usize = 20;

/// Largest page size served.
pub const MAX_PER_PAGE: usize = 200;

/// One page of rip history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryPage {
    pub entries: Vec<Value>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
}

/// Read page `page` (1-based) of the history at `path`, newest first.
///
/// A missing file is an empty history. Lines that are not valid JSON are
/// skipped.
pub fn read_history(path: &Path, page: usize, per_page: usize) -> io::Result<HistoryPage> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, MAX_PER_PAGE);

    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let mut skipped = 0usize;
    let mut entries: Vec<Value> = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str(line) {
            Ok(value) => Some(value),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        debug!(path = %path.display(), skipped, "Skipped malformed history lines");
    }
    entries.reverse();

    let total = entries.len();
    let pages = total.div_ceil(per_page);
    let entries = entries
        .into_iter()
        .skip(page.saturating_sub(1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    Ok(HistoryPage {
        entries,
        page,
        per_page,
        total,
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn history_with(n: usize) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let mut text = String::new();
        for i in 0..n {
            text.push_str(&format!("{{\"id\":{},\"disc\":\"DISC_{}\"}}\n", i, i));
        }
        fs::write(&path, text).unwrap();
        (dir, path)
    }

    #[test]
    fn test_newest_first_paging() {
        let (_dir, path) = history_with(5);

        let first = read_history(&path, 1, 2).unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.pages, 3);
        assert_eq!(first.entries[0]["id"], 4);
        assert_eq!(first.entries[1]["id"], 3);

        let last = read_history(&path, 3, 2).unwrap();
        assert_eq!(last.entries.len(), 1);
        assert_eq!(last.entries[0]["id"], 0);

        assert!(read_history(&path, 9, 2).unwrap().entries.is_empty());
    }

    #[test]
    fn test_page_far_past_end_is_empty() {
        let (_dir, path) = history_with(3);

        let page = read_history(&path, usize::MAX, 20).unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.page, usize::MAX);
        assert_eq!(page.total, 3);
        assert_eq!(page.pages, 1);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let page = read_history(&dir.path().join("none.jsonl"), 1, 20).unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.pages, 0);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        fs::write(&path, "{\"id\":1}\nnot json\n\n{\"id\":2}\n").unwrap();

        let page = read_history(&path, 0, 0).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);
    }
}

//! Reads the per-page `_stats.json` files of a job back into one tree.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::extraction::{StatRecord, STATS_FILENAME};
use crate::layout::PageLayout;

/// Match folder name -> page type name -> stat record.
pub type SessionStatTree = BTreeMap<String, BTreeMap<String, StatRecord>>;

/// Subdirectories of `dir`, sorted by name. Plain files are skipped.
fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Walks `<root>/<match>/<page>/_stats.json`.
///
/// Every page directory must hold a stats file; a missing one is a
/// `MissingStatsFile` error. Pages that are not a known layout are kept in
/// the tree but never reach a table.
pub fn collect_tree(root: &Path) -> Result<SessionStatTree> {
    let mut tree = SessionStatTree::new();

    for match_dir in subdirectories(root)? {
        let pages = tree.entry(dir_name(&match_dir)).or_default();

        for page_dir in subdirectories(&match_dir)? {
            let page = dir_name(&page_dir);
            if PageLayout::from_type_name(&page).is_none() {
                crate::log(&format!(
                    "Warning: {} is not a known page layout, it will not appear in any table",
                    page_dir.display()
                ));
            }

            let stats_path = page_dir.join(STATS_FILENAME);
            if !stats_path.is_file() {
                return Err(PipelineError::MissingStatsFile { path: stats_path }.into());
            }

            let contents = fs::read_to_string(&stats_path)
                .with_context(|| format!("Failed to read {}", stats_path.display()))?;
            let record: StatRecord = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", stats_path.display()))?;
            pages.insert(page, record);
        }
    }

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_page(root: &Path, match_key: &str, page: &str, json: &str) {
        let dir = root.join(match_key).join(page);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(STATS_FILENAME), json).unwrap();
    }

    #[test]
    fn test_collect_tree() {
        let root = tempdir().unwrap();
        write_page(
            root.path(),
            "2024-08-19-0",
            "SUMMARY",
            r#"{"SCORE_HOME": "2", "DATE": "2024-08-19T21:05:09"}"#,
        );
        write_page(
            root.path(),
            "2024-08-19-0",
            "SHOOTING",
            r#"{"TOTAL_SHOTS_HOME": "11", "DATE": "2024-08-19T21:05:40"}"#,
        );
        write_page(
            root.path(),
            "2024-08-19-2",
            "SUMMARY",
            r#"{"SCORE_HOME": "0", "DATE": "2024-08-19T22:10:00"}"#,
        );
        // Aggregate outputs at the job root are not match folders.
        fs::write(root.path().join("session_stats.json"), "{}").unwrap();
        fs::write(root.path().join("SUMMARY.csv"), "").unwrap();

        let tree = collect_tree(root.path()).unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree["2024-08-19-0"].len(), 2);
        assert_eq!(tree["2024-08-19-0"]["SHOOTING"]["TOTAL_SHOTS_HOME"], "11");
        assert_eq!(tree["2024-08-19-2"]["SUMMARY"]["SCORE_HOME"], "0");
    }

    #[test]
    fn test_collect_tree_ignores_screenshots_in_match_folder() {
        let root = tempdir().unwrap();
        write_page(root.path(), "2024-08-19-0", "SUMMARY", r#"{"DATE": "2024-08-19T21:05:09"}"#);
        fs::write(root.path().join("2024-08-19-0").join("shot.jpg"), b"jpeg").unwrap();

        let tree = collect_tree(root.path()).unwrap();
        assert_eq!(tree["2024-08-19-0"].len(), 1);
    }

    #[test]
    fn test_collect_tree_keeps_unknown_page_folders() {
        let root = tempdir().unwrap();
        write_page(root.path(), "2024-08-19-0", "SUMMARY", r#"{"DATE": "2024-08-19T21:05:09"}"#);
        write_page(root.path(), "2024-08-19-0", "LINEUP", r#"{"DATE": "2024-08-19T21:06:00"}"#);

        let tree = collect_tree(root.path()).unwrap();
        let pages: Vec<_> = tree["2024-08-19-0"].keys().map(String::as_str).collect();
        assert_eq!(pages, ["LINEUP", "SUMMARY"]);
        assert_eq!(PageLayout::from_type_name("LINEUP"), None);
        assert_eq!(PageLayout::from_type_name("SUMMARY"), Some(PageLayout::Summary));
    }

    #[test]
    fn test_collect_tree_requires_stats_file() {
        let root = tempdir().unwrap();
        let page_dir = root.path().join("2024-08-19-0").join("PASSING");
        fs::create_dir_all(&page_dir).unwrap();

        let err = collect_tree(root.path()).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::MissingStatsFile { path }) => {
                assert_eq!(path, &page_dir.join(STATS_FILENAME))
            }
            other => panic!("expected MissingStatsFile, got {:?}", other),
        }
    }

    #[test]
    fn test_collect_tree_reports_bad_json() {
        let root = tempdir().unwrap();
        write_page(root.path(), "2024-08-19-0", "SUMMARY", "{ truncated");

        let err = collect_tree(root.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}

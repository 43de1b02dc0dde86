use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

use super::{parse_screenshot_timestamp, session_date, MissedMatches};
use crate::error::PipelineError;

/// One per page layout.
pub const SCREENSHOTS_PER_MATCH: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screenshot {
    pub path: PathBuf,
    pub timestamp: NaiveDateTime,
}

/// Four screenshots assigned to one match folder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchBatch {
    pub session_date: NaiveDate,
    pub index: u32,
    pub screenshots: Vec<Screenshot>,
}

impl MatchBatch {
    /// `{session_date}-{index}`, e.g. `2024-08-19-2`.
    pub fn folder_name(&self) -> String {
        format!("{}-{}", self.session_date.format("%Y-%m-%d"), self.index)
    }
}

/// Groups screenshot files into match batches without touching the disk.
///
/// Files are sorted by capture time and cut into groups of four. Each group
/// takes the session date of its last screenshot. Indices count from 0 per
/// session date and skip the ones listed in `missed`.
pub fn plan_partition(
    source_dir: &Path,
    files: &[PathBuf],
    missed: &MissedMatches,
) -> Result<Vec<MatchBatch>> {
    if files.len() % SCREENSHOTS_PER_MATCH != 0 {
        return Err(PipelineError::MalformedBatch {
            dir: source_dir.to_path_buf(),
            count: files.len(),
        }
        .into());
    }

    let mut screenshots = files
        .iter()
        .map(|path| -> Result<Screenshot> {
            Ok(Screenshot {
                path: path.clone(),
                timestamp: parse_screenshot_timestamp(path)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    screenshots.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.path.cmp(&b.path)));

    let mut batches = Vec::with_capacity(screenshots.len() / SCREENSHOTS_PER_MATCH);
    let mut prev_date: Option<NaiveDate> = None;
    let mut next_index = 0u32;

    for chunk in screenshots.chunks(SCREENSHOTS_PER_MATCH) {
        let last = &chunk[chunk.len() - 1];
        let date = session_date(last.timestamp);
        if prev_date != Some(date) {
            next_index = 0;
        }

        let index = missed.next_available(date, next_index);
        if index != next_index {
            crate::log(&format!(
                "No match stats available for index {} on {}, using index {}",
                next_index, date, index
            ));
        }

        batches.push(MatchBatch {
            session_date: date,
            index,
            screenshots: chunk.to_vec(),
        });
        next_index = index + 1;
        prev_date = Some(date);
    }

    Ok(batches)
}

/// Lists files in `dir` with the given extension (case-insensitive), sorted by name.
pub fn list_screenshots(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if path.is_file() && matches {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Lists and plans the screenshots in `source_dir` without writing anything.
pub fn plan_source(
    source_dir: &Path,
    extension: &str,
    missed: &MissedMatches,
) -> Result<Vec<MatchBatch>> {
    let files = list_screenshots(source_dir, extension)?;
    crate::log(&format!(
        "Found {} screenshots in {}",
        files.len(),
        source_dir.display()
    ));

    plan_partition(source_dir, &files, missed)
}

/// Copies each batch into its `{session_date}-{index}` folder under
/// `dest_dir`. Returns the number of folders.
pub fn copy_batches(batches: &[MatchBatch], dest_dir: &Path) -> Result<usize> {
    for batch in batches {
        let folder = dest_dir.join(batch.folder_name());
        fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create {}", folder.display()))?;

        for screenshot in &batch.screenshots {
            let Some(name) = screenshot.path.file_name() else {
                continue;
            };
            fs::copy(&screenshot.path, folder.join(name)).with_context(|| {
                format!(
                    "Failed to copy {} into {}",
                    screenshot.path.display(),
                    folder.display()
                )
            })?;
        }
        crate::log(&format!("Copied files to folder: {}", batch.folder_name()));
    }

    Ok(batches.len())
}

/// Copies the screenshots in `source_dir` into one folder per match under
/// `dest_dir`. Returns the number of folders.
///
/// The whole batch plan is validated before anything is written.
pub fn partition(
    source_dir: &Path,
    dest_dir: &Path,
    extension: &str,
    missed: &MissedMatches,
) -> Result<usize> {
    let batches = plan_source(source_dir, extension, missed)?;
    copy_batches(&batches, dest_dir)
}

//! The stat record of one page: region name -> recognized text.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::RegionCrop;
use crate::layout::PAGE_ID_LABEL;
use crate::ocr::{self, Recognizer};

pub const STATS_FILENAME: &str = "_stats.json";

/// Key holding the screenshot's capture time.
pub const DATE_KEY: &str = "DATE";
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Region name -> recognized text, plus `DATE`.
pub type StatRecord = BTreeMap<String, String>;

/// Reads below this confidence are kept but logged for review.
const LOW_CONFIDENCE: f32 = 0.5;

/// Reads every stat region of a page.
///
/// The anchor region is skipped. A region whose recognition fails is logged
/// and recorded as an empty string so one bad crop does not lose the page.
pub fn read_page_stats(
    recognizer: &dyn Recognizer,
    crops: &[RegionCrop],
    captured_at: NaiveDateTime,
) -> Result<StatRecord> {
    let mut record = StatRecord::new();

    for crop in crops.iter().filter(|c| c.name != PAGE_ID_LABEL) {
        let allowlist = ocr::resolve(&crop.name)?;
        let text = match recognizer.recognize(&crop.image, &allowlist) {
            Ok(detections) => {
                if let Some(first) = detections.first() {
                    if first.confidence < LOW_CONFIDENCE {
                        crate::log(&format!(
                            "Warning: low confidence {:.2} for region {} ('{}'), see {}",
                            first.confidence,
                            crop.name,
                            first.text,
                            crop.path.display()
                        ));
                    }
                    if !allowlist.allows(&first.text) {
                        crate::log(&format!(
                            "Warning: region {} read '{}' with characters outside its {:?} allowlist",
                            crop.name,
                            first.text,
                            allowlist.kind()
                        ));
                    }
                }
                ocr::first_text(&detections)
            }
            Err(e) => {
                crate::log(&format!(
                    "OCR failed for region {} ({}, {}): {}",
                    crop.name,
                    recognizer.name(),
                    crop.path.display(),
                    e
                ));
                String::new()
            }
        };
        record.insert(crop.name.clone(), text);
    }

    record.insert(
        DATE_KEY.to_string(),
        captured_at.format(DATE_FORMAT).to_string(),
    );
    Ok(record)
}

/// Serializes `value` as pretty JSON to `path`.
///
/// Goes through a temporary file in the same directory so a crash never
/// leaves a half-written file behind.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}

/// Writes `record` to `<dir>/_stats.json`.
pub fn write_stats_file(dir: &Path, record: &StatRecord) -> Result<PathBuf> {
    let path = dir.join(STATS_FILENAME);
    write_json_atomic(&path, record)?;
    Ok(path)
}

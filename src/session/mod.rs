//! Match sessions: capture timestamps, session dates and partitioning of
//! the source folder into one folder per match.

pub mod missed;
pub mod partition;

pub use missed::MissedMatches;
pub use partition::{copy_batches, partition, plan_source};

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::PipelineError;

/// Trailing `YYYYMMDDHHMMSS` of a screenshot file stem.
const TIMESTAMP_PATTERN: &str = r"(\d{14})$";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Hours subtracted from a capture time to get its session date. A gaming
/// day runs from 10:00 to 09:59:59 the next morning.
pub const SESSION_DAY_OFFSET_HOURS: i64 = 10;

fn timestamp_regex() -> &'static Regex {
    static TIMESTAMP_REGEX: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP_REGEX.get_or_init(|| Regex::new(TIMESTAMP_PATTERN).expect("timestamp pattern is valid"))
}

/// Parses the capture time encoded in the last 14 characters of the file stem.
pub fn parse_screenshot_timestamp(path: &Path) -> Result<NaiveDateTime> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let invalid = || PipelineError::InvalidTimestamp { file: file.clone() };

    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(invalid)?;
    let digits = timestamp_regex()
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .ok_or_else(invalid)?;

    let timestamp =
        NaiveDateTime::parse_from_str(digits.as_str(), TIMESTAMP_FORMAT).map_err(|_| invalid())?;
    Ok(timestamp)
}

/// Calendar day a capture belongs to once the session offset is applied.
pub fn session_date(timestamp: NaiveDateTime) -> NaiveDate {
    (timestamp - Duration::hours(SESSION_DAY_OFFSET_HOURS)).date()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_parse_screenshot_timestamp() {
        let ts = parse_screenshot_timestamp(Path::new("src/EA SPORTS FC 24_20240819210509.jpg"))
            .unwrap();
        assert_eq!(ts, at(2024, 8, 19, 21, 5, 9));

        let ts = parse_screenshot_timestamp(Path::new("20240820013000.jpg")).unwrap();
        assert_eq!(ts, at(2024, 8, 20, 1, 30, 0));
    }

    #[test]
    fn test_parse_screenshot_timestamp_rejects_bad_names() {
        for name in [
            "screenshot.jpg",
            "capture_2024081921050.jpg",
            "capture_20241319210509.jpg",
            "capture_20240819210509_edited.jpg",
        ] {
            let err = parse_screenshot_timestamp(Path::new(name)).unwrap_err();
            match err.downcast_ref::<PipelineError>() {
                Some(PipelineError::InvalidTimestamp { file }) => assert_eq!(file, name),
                other => panic!("{}: expected InvalidTimestamp, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_timestamp_regex_is_compiled_once() {
        let first = timestamp_regex();
        parse_screenshot_timestamp(Path::new("20240819210509.jpg")).unwrap();
        assert!(std::ptr::eq(first, timestamp_regex()));
        assert!(first.is_match("capture_20240819210509"));
    }

    #[test]
    fn test_session_date_offset_boundary() {
        let day = NaiveDate::from_ymd_opt(2024, 8, 19).unwrap();
        assert_eq!(session_date(at(2024, 8, 19, 10, 0, 0)), day);
        assert_eq!(session_date(at(2024, 8, 19, 23, 59, 59)), day);
        assert_eq!(session_date(at(2024, 8, 20, 9, 59, 59)), day);
        assert_eq!(
            session_date(at(2024, 8, 19, 9, 59, 59)),
            NaiveDate::from_ymd_opt(2024, 8, 18).unwrap()
        );
    }
}

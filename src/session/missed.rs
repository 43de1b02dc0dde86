//! Known gaps in the match sequence, per session date.
//!
//! ```json
//! { "2024-08-19": { "missed_match_indices": [1] } }
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedDay {
    #[serde(default)]
    pub missed_match_indices: BTreeSet<u32>,
}

/// Session date (`YYYY-MM-DD`) -> match indices that were never captured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissedMatches(BTreeMap<String, MissedDay>);

impl MissedMatches {
    /// Loads the missed-match file. A missing file means no gaps.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            crate::log(&format!(
                "No missed-match file at {}, assuming no gaps",
                path.display()
            ));
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let missed: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse missed-match file {}", path.display()))?;
        crate::log(&format!(
            "Loaded missed matches for {} session date(s)",
            missed.0.len()
        ));
        Ok(missed)
    }

    #[cfg(test)]
    pub fn insert(&mut self, date: NaiveDate, index: u32) {
        self.0
            .entry(date.format("%Y-%m-%d").to_string())
            .or_default()
            .missed_match_indices
            .insert(index);
    }

    pub fn is_missed(&self, date: NaiveDate, index: u32) -> bool {
        self.0
            .get(&date.format("%Y-%m-%d").to_string())
            .is_some_and(|day| day.missed_match_indices.contains(&index))
    }

    /// First index at or after `index` that is not listed as missed.
    pub fn next_available(&self, date: NaiveDate, mut index: u32) -> u32 {
        while self.is_missed(date, index) {
            index += 1;
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let missed = MissedMatches::load(&dir.path().join("job_config.json")).unwrap();
        assert_eq!(missed, MissedMatches::default());
    }

    #[test]
    fn test_load_and_query() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job_config.json");
        std::fs::write(
            &path,
            r#"{ "2024-08-19": { "missed_match_indices": [1, 2, 5] }, "2024-08-20": {} }"#,
        )
        .unwrap();

        let missed = MissedMatches::load(&path).unwrap();
        assert!(missed.is_missed(day(19), 1));
        assert!(!missed.is_missed(day(19), 0));
        assert!(!missed.is_missed(day(20), 1));
        assert!(!missed.is_missed(day(21), 1));

        assert_eq!(missed.next_available(day(19), 0), 0);
        assert_eq!(missed.next_available(day(19), 1), 3);
        assert_eq!(missed.next_available(day(19), 5), 6);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("job_config.json");
        std::fs::write(&path, r#"{ "2024-08-19": { "missed_match_indices": ["one"] } }"#).unwrap();

        let err = MissedMatches::load(&path).unwrap_err();
        assert!(err.to_string().contains("job_config.json"));
    }

    #[test]
    fn test_insert() {
        let mut missed = MissedMatches::default();
        missed.insert(day(19), 4);
        assert!(missed.is_missed(day(19), 4));
        assert_eq!(missed.next_available(day(19), 4), 5);
    }
}

//! Flattens the session tree into one table per page layout.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use super::SessionStatTree;
use crate::error::PipelineError;
use crate::extraction::stats::{StatRecord, DATE_FORMAT, DATE_KEY};
use crate::layout::PageLayout;
use crate::session::session_date;

pub const MATCH_ID_COLUMN: &str = "MATCH_ID";
pub const SESSION_DATE_COLUMN: &str = "Session_Adjusted_Date";

/// One page layout's rows, one per match that has that page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[cfg(test)]
impl StatTable {
    /// Cell value by column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }
}

/// One table per layout; every layout is present, possibly with no rows.
pub struct StatTables {
    tables: BTreeMap<PageLayout, StatTable>,
}

impl StatTables {
    pub fn get(&self, layout: PageLayout) -> &StatTable {
        &self.tables[&layout]
    }
}

/// Match index from the folder name: the token after the last `-`.
pub fn match_id(match_key: &str) -> &str {
    match_key.rsplit('-').next().unwrap_or(match_key)
}

struct PendingRow<'a> {
    record: &'a StatRecord,
    match_id: &'a str,
    session_date: NaiveDate,
}

fn pending_row<'a>(
    match_key: &'a str,
    layout: PageLayout,
    record: &'a StatRecord,
) -> Result<PendingRow<'a>, PipelineError> {
    let malformed = |reason: String| PipelineError::MalformedStatRecord {
        match_key: match_key.to_string(),
        page: layout.type_name().to_string(),
        reason,
    };

    let date = record
        .get(DATE_KEY)
        .ok_or_else(|| malformed(format!("no {} field", DATE_KEY)))?;
    let captured_at = NaiveDateTime::parse_from_str(date, DATE_FORMAT)
        .map_err(|e| malformed(format!("{} '{}' is not a timestamp: {}", DATE_KEY, date, e)))?;

    Ok(PendingRow {
        record,
        match_id: match_id(match_key),
        session_date: session_date(captured_at),
    })
}

fn build_table(tree: &SessionStatTree, layout: PageLayout) -> Result<StatTable, PipelineError> {
    let mut pending = Vec::new();
    for (match_key, pages) in tree {
        if let Some(record) = pages.get(layout.type_name()) {
            pending.push(pending_row(match_key, layout, record)?);
        }
    }

    pending.sort_by_key(|row| {
        (
            row.session_date,
            row.match_id.parse::<u32>().unwrap_or(u32::MAX),
            row.match_id,
        )
    });

    let fields: BTreeSet<&str> = pending
        .iter()
        .flat_map(|row| row.record.keys().map(String::as_str))
        .filter(|k| *k != MATCH_ID_COLUMN && *k != SESSION_DATE_COLUMN)
        .collect();

    let mut columns: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
    columns.push(MATCH_ID_COLUMN.to_string());
    columns.push(SESSION_DATE_COLUMN.to_string());

    let rows = pending
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = fields
                .iter()
                .map(|f| row.record.get(*f).cloned().unwrap_or_default())
                .collect();
            cells.push(row.match_id.to_string());
            cells.push(row.session_date.format("%Y-%m-%d").to_string());
            cells
        })
        .collect();

    Ok(StatTable { columns, rows })
}

/// Builds the four per-layout tables.
///
/// Matches without a given page contribute no row to that table. Rows are
/// ordered by session date, then by numeric match index.
pub fn to_tables(tree: &SessionStatTree) -> Result<StatTables, PipelineError> {
    let mut tables = BTreeMap::new();
    for layout in PageLayout::ALL {
        tables.insert(layout, build_table(tree, layout)?);
    }
    Ok(StatTables { tables })
}

/// Writes `<TYPE>.csv` for every layout into `dir`.
pub fn write_tables(tables: &StatTables, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for layout in PageLayout::ALL {
        let table = tables.get(layout);
        let path = dir.join(format!("{}.csv", layout.type_name()));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

        writer.write_record(&table.columns)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        crate::log(&format!(
            "Wrote {} rows to {}",
            table.rows.len(),
            path.display()
        ));
        paths.push(path);
    }
    Ok(paths)
}

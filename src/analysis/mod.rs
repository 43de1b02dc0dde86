//! Aggregation of per-page stat records into session-wide outputs.
//!
//! This module provides:
//! - Reading `_stats.json` files back into a session tree
//! - Flattening the tree into one table per page layout
//! - JSON export of the tree and CSV export of the tables

pub mod tables;
pub mod tree;

pub use tables::{to_tables, write_tables, StatTables};
pub use tree::{collect_tree, SessionStatTree};

use anyhow::Result;
use std::path::Path;

use crate::extraction::write_json_atomic;

pub const SESSION_STATS_FILENAME: &str = "session_stats.json";

/// Writes the whole tree as pretty JSON, keyed match folder -> page -> record.
pub fn export_session_stats(tree: &SessionStatTree, output_path: &Path) -> Result<()> {
    write_json_atomic(output_path, tree)
}

/// Rebuilds `session_stats.json` and the four CSV tables of a job directory.
pub fn aggregate_job(job_dir: &Path) -> Result<StatTables> {
    let tree = collect_tree(job_dir)?;
    crate::log(&format!(
        "Collected stats for {} matches from {}",
        tree.len(),
        job_dir.display()
    ));

    let tables = to_tables(&tree)?;

    let json_path = job_dir.join(SESSION_STATS_FILENAME);
    export_session_stats(&tree, &json_path)?;
    crate::log(&format!("Session stats JSON saved: {}", json_path.display()));

    write_tables(&tables, job_dir)?;

    Ok(tables)
}

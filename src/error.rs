//! Error taxonomy for the extraction pipeline.
//!
//! Functions return `anyhow::Result`; the variants below are the structural
//! failures callers may want to tell apart (via `downcast_ref`).

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Malformed batch in {}: expected a multiple of 4 screenshots, found {count}", dir.display())]
    MalformedBatch { dir: PathBuf, count: usize },

    #[error("Unknown field type for region '{region}': not listed in any allowlist table")]
    UnknownFieldType { region: String },

    #[error("Unrecognized page type: anchor text was '{text}'")]
    UnrecognizedPageType { text: String },

    #[error("Missing stats file: {}", path.display())]
    MissingStatsFile { path: PathBuf },

    #[error("Invalid screenshot timestamp in '{file}': expected trailing YYYYMMDDHHMMSS")]
    InvalidTimestamp { file: String },

    #[error("Region '{region}' lies outside the {image_width}x{image_height} screenshot")]
    RegionOutOfBounds {
        region: String,
        image_width: u32,
        image_height: u32,
    },

    #[error("Layout table {} has no '{label}' anchor region", path.display())]
    MissingAnchorRegion { path: PathBuf, label: String },

    #[error("Malformed stat record for {match_key}/{page}: {reason}")]
    MalformedStatRecord {
        match_key: String,
        page: String,
        reason: String,
    },
}

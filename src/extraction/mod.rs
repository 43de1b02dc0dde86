//! Per-page extraction: region crops and the stat record read from them.

pub mod regions;
pub mod stats;

pub use regions::{crop_box, extract_regions, RegionCrop};
pub use stats::{read_page_stats, write_json_atomic, write_stats_file, StatRecord, STATS_FILENAME};

//! Pipeline configuration.
//!
//! Loaded from config.json at startup. Provides the data folders, the
//! bounding-box table per page layout, and OCR engine settings.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::layout::PageLayout;

/// Bounding-box CSV for each page layout.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutPaths {
    pub summary: PathBuf,
    pub defending: PathBuf,
    pub passing: PathBuf,
    pub shooting: PathBuf,
}

impl LayoutPaths {
    pub fn path_for(&self, layout: PageLayout) -> &Path {
        match layout {
            PageLayout::Summary => &self.summary,
            PageLayout::Defending => &self.defending,
            PageLayout::Passing => &self.passing,
            PageLayout::Shooting => &self.shooting,
        }
    }

    /// Resolves relative paths against `base`.
    pub fn relative_to(&self, base: &Path) -> Self {
        let join = |p: &PathBuf| if p.is_absolute() { p.clone() } else { base.join(p) };
        Self {
            summary: join(&self.summary),
            defending: join(&self.defending),
            passing: join(&self.passing),
            shooting: join(&self.shooting),
        }
    }
}

impl Default for LayoutPaths {
    fn default() -> Self {
        let dir = PathBuf::from("resources").join("layouts");
        Self {
            summary: dir.join("summary.csv"),
            defending: dir.join("defending.csv"),
            passing: dir.join("passing.csv"),
            shooting: dir.join("shooting.csv"),
        }
    }
}

/// OCR engine settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Explicit Tesseract executable; searched for when unset
    pub tesseract_path: Option<PathBuf>,
    /// Explicit tessdata directory; searched for when unset
    pub tessdata_dir: Option<PathBuf>,
    pub language: String,
    /// Tesseract page segmentation mode (7 = single text line)
    pub psm: u8,
    /// Words below this confidence (0.0 to 1.0) are dropped
    pub min_confidence: f32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            tessdata_dir: None,
            language: "eng".to_string(),
            psm: 7,
            min_confidence: 0.01,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root data folder holding `source_data/` and `jobs/`
    pub base_path: PathBuf,
    /// Extension of screenshot files in the source folder
    pub screenshot_extension: String,
    /// Missed-match JSON; defaults to `<base_path>/job_config.json`
    pub missed_matches_file: Option<PathBuf>,
    pub layouts: LayoutPaths,
    pub ocr: OcrConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("./db/fifa"),
            screenshot_extension: "jpg".to_string(),
            missed_matches_file: None,
            layouts: LayoutPaths::default(),
            ocr: OcrConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn source_dir(&self) -> PathBuf {
        self.base_path.join("source_data")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.base_path.join("jobs")
    }

    pub fn missed_matches_path(&self) -> PathBuf {
        self.missed_matches_file
            .clone()
            .unwrap_or_else(|| self.base_path.join("job_config.json"))
    }
}

/// Default config location: config.json next to the executable.
pub fn default_config_path() -> PathBuf {
    crate::paths::get_exe_dir().join("config.json")
}

/// Loads configuration from `config_path` or returns defaults.
///
/// Relative layout paths are resolved against the config file's directory.
pub fn load_config(config_path: &Path) -> PipelineConfig {
    crate::log(&format!("Looking for config at: {}", config_path.display()));

    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded");
                    config
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse {}: {}. Using defaults.",
                        config_path.display(),
                        e
                    ));
                    PipelineConfig::default()
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read {}: {}. Using defaults.",
                    config_path.display(),
                    e
                ));
                PipelineConfig::default()
            }
        }
    } else {
        crate::log("Config file not found. Using default config.");
        PipelineConfig::default()
    };

    config.layouts = config.layouts.relative_to(&config_dir);
    config
}

//! Page layouts of the post-match statistics screens.
//!
//! Each layout has a bounding-box table exported from the annotation tool,
//! one CSV per layout with columns
//! `label_name,bbox_x,bbox_y,bbox_width,bbox_height`.

pub mod classify;

pub use classify::PageClassifier;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::config::LayoutPaths;
use crate::error::PipelineError;
use crate::ocr::allowlist;

/// Region holding the page title, identical on every layout.
pub const PAGE_ID_LABEL: &str = "PAGE_ID";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PageLayout {
    Summary,
    Defending,
    Passing,
    Shooting,
}

impl PageLayout {
    pub const ALL: [PageLayout; 4] = [
        PageLayout::Summary,
        PageLayout::Defending,
        PageLayout::Passing,
        PageLayout::Shooting,
    ];

    /// Name used for page folders, JSON keys and CSV file names.
    pub fn type_name(self) -> &'static str {
        match self {
            PageLayout::Summary => "SUMMARY",
            PageLayout::Defending => "DEFENDING",
            PageLayout::Passing => "PASSING",
            PageLayout::Shooting => "SHOOTING",
        }
    }

    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|layout| layout.type_name() == name)
    }
}

impl fmt::Display for PageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// A named rectangle on a page, in screenshot pixels.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct BoundingBox {
    pub label_name: String,
    pub bbox_x: u32,
    pub bbox_y: u32,
    pub bbox_width: u32,
    pub bbox_height: u32,
}

impl BoundingBox {
    pub fn same_rect(&self, other: &BoundingBox) -> bool {
        (self.bbox_x, self.bbox_y, self.bbox_width, self.bbox_height)
            == (other.bbox_x, other.bbox_y, other.bbox_width, other.bbox_height)
    }
}

/// Reads one bounding-box table. Extra columns are ignored.
pub fn load_bounding_boxes(path: &Path) -> Result<Vec<BoundingBox>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open bounding-box table: {}", path.display()))?;

    let mut boxes = Vec::new();
    for (row, record) in reader.deserialize().enumerate() {
        let bbox: BoundingBox = record.with_context(|| {
            format!("Invalid bounding box on row {} of {}", row + 2, path.display())
        })?;
        boxes.push(bbox);
    }
    Ok(boxes)
}

/// Bounding-box tables for all four layouts.
#[derive(Clone, Debug)]
pub struct LayoutSet {
    tables: HashMap<PageLayout, Vec<BoundingBox>>,
    anchor: BoundingBox,
}

impl LayoutSet {
    /// Loads and validates the tables named in `paths`.
    ///
    /// Every region must resolve to an allowlist, and the SUMMARY table must
    /// contain the `PAGE_ID` anchor.
    pub fn load(paths: &LayoutPaths) -> Result<Self> {
        let mut tables = HashMap::new();
        for layout in PageLayout::ALL {
            let path = paths.path_for(layout);
            let boxes = load_bounding_boxes(path)?;
            allowlist::validate_regions(boxes.iter().map(|b| b.label_name.as_str()))
                .with_context(|| format!("Invalid {} table {}", layout, path.display()))?;
            crate::log(&format!(
                "Loaded {} layout: {} regions from {}",
                layout,
                boxes.len(),
                path.display()
            ));
            tables.insert(layout, boxes);
        }

        let set = Self::from_tables(tables).map_err(|e| match e {
            PipelineError::MissingAnchorRegion { label, .. } => PipelineError::MissingAnchorRegion {
                path: paths.path_for(PageLayout::Summary).to_path_buf(),
                label,
            },
            other => other,
        })?;
        Ok(set)
    }

    /// Builds a set from in-memory tables. Layouts without a table get an empty one.
    pub fn from_tables(
        mut tables: HashMap<PageLayout, Vec<BoundingBox>>,
    ) -> Result<Self, PipelineError> {
        for layout in PageLayout::ALL {
            tables.entry(layout).or_default();
        }

        let anchor = tables[&PageLayout::Summary]
            .iter()
            .find(|b| b.label_name == PAGE_ID_LABEL)
            .cloned()
            .ok_or_else(|| PipelineError::MissingAnchorRegion {
                path: PageLayout::Summary.type_name().into(),
                label: PAGE_ID_LABEL.to_string(),
            })?;

        for layout in PageLayout::ALL {
            let other = tables[&layout].iter().find(|b| b.label_name == PAGE_ID_LABEL);
            match other {
                Some(b) if !b.same_rect(&anchor) => crate::log(&format!(
                    "Warning: {} anchor region differs from SUMMARY ({:?} vs {:?}); using SUMMARY's",
                    layout, b, anchor
                )),
                _ => {}
            }
        }

        Ok(Self { tables, anchor })
    }

    pub fn boxes(&self, layout: PageLayout) -> &[BoundingBox] {
        self.tables.get(&layout).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The page-identifier region used for classification.
    pub fn anchor(&self) -> &BoundingBox {
        &self.anchor
    }
}

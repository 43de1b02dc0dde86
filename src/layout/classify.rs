//! Page classification from the anchor region's title text.

use anyhow::{Context, Result};
use image::DynamicImage;
use std::path::Path;

use super::{BoundingBox, LayoutSet, PageLayout};
use crate::error::PipelineError;
use crate::extraction::crop_box;
use crate::ocr::{joined_text, Allowlist, Recognizer};

/// Words that can appear in a page title.
const ANCHOR_VOCABULARY: &str = "DRIBBLE TACKLE SUCCESS RATE SHOT ACCURACY PASS ";

/// Maps recognized title text to a layout.
///
/// OCR sometimes drops the space in "PASS ACCURACY" or picks up a stray
/// leading "U"; both spellings are accepted.
pub fn classify_anchor_text(text: &str) -> Result<PageLayout, PipelineError> {
    match text.trim() {
        "DRIBBLE SUCCESS RATE" => Ok(PageLayout::Summary),
        "TACKLE SUCCESS RATE" => Ok(PageLayout::Defending),
        "SHOT ACCURACY" => Ok(PageLayout::Shooting),
        "PASS ACCURACY" | "PASSACCURACY" | "UPASSACCURACY" => Ok(PageLayout::Passing),
        _ => Err(PipelineError::UnrecognizedPageType {
            text: text.to_string(),
        }),
    }
}

/// Determines which layout a screenshot shows by reading its anchor region.
pub struct PageClassifier<'a> {
    recognizer: &'a dyn Recognizer,
    anchor: BoundingBox,
    allowlist: Allowlist,
}

impl<'a> PageClassifier<'a> {
    pub fn new(recognizer: &'a dyn Recognizer, layouts: &LayoutSet) -> Self {
        Self {
            recognizer,
            anchor: layouts.anchor().clone(),
            allowlist: Allowlist::from_vocabulary(ANCHOR_VOCABULARY),
        }
    }

    /// Reads the anchor text without classifying it.
    pub fn read_anchor(&self, screenshot: &DynamicImage) -> Result<String> {
        let crop = crop_box(screenshot, &self.anchor)?;
        let detections = self.recognizer.recognize(&crop, &self.allowlist)?;
        Ok(joined_text(&detections))
    }

    pub fn classify(&self, screenshot: &DynamicImage) -> Result<PageLayout> {
        let text = self.read_anchor(screenshot)?;
        let layout = classify_anchor_text(&text)?;
        crate::log(&format!("Anchor text '{}' -> {} page", text, layout));
        Ok(layout)
    }

    /// Loads a screenshot from disk and classifies it.
    pub fn classify_file(&self, path: &Path) -> Result<PageLayout> {
        let screenshot =
            image::open(path).with_context(|| format!("Failed to load {}", path.display()))?;
        self.classify(&screenshot)
            .with_context(|| format!("Failed to classify {}", path.display()))
    }
}

pub mod allowlist;
pub mod engine;
pub mod setup;

pub use allowlist::{resolve, Allowlist};
pub use engine::TesseractEngine;
pub use setup::ensure_tesseract;

use anyhow::Result;
use image::DynamicImage;

/// One line of text found in a crop.
#[derive(Clone, Debug)]
pub struct Detection {
    pub text: String,
    /// 0.0 to 1.0
    pub confidence: f32,
}

/// Every OCR backend implements this.
///
/// Engines are built once per process and shared by reference; `recognize`
/// must not depend on state left behind by a previous call.
pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Reads text from `crop`, emitting only characters in `allowlist`.
    /// Detections come back in reading order.
    fn recognize(&self, crop: &DynamicImage, allowlist: &Allowlist) -> Result<Vec<Detection>>;
}

/// Text of the first detection, or an empty string when nothing was read.
pub fn first_text(detections: &[Detection]) -> String {
    detections
        .first()
        .map(|d| d.text.clone())
        .unwrap_or_default()
}

/// All detections concatenated in order, without separators.
pub fn joined_text(detections: &[Detection]) -> String {
    detections.iter().map(|d| d.text.as_str()).collect()
}

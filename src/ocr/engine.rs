use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use super::allowlist::Allowlist;
use super::setup::ensure_tesseract;
use super::{Detection, Recognizer};
use crate::config::OcrConfig;

/// Tesseract CLI backend.
///
/// Paths are resolved once in `new`; each `recognize` call writes the crop
/// to a temporary PNG and runs the executable with TSV output.
pub struct TesseractEngine {
    executable: PathBuf,
    tessdata: PathBuf,
    language: String,
    psm: u8,
    min_confidence: f32,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Result<Self> {
        let paths = ensure_tesseract(config)?;
        crate::log(&format!(
            "OCR engine: {} (tessdata {}, lang {}, psm {})",
            paths.executable.display(),
            paths.tessdata.display(),
            config.language,
            config.psm
        ));
        Ok(Self {
            executable: paths.executable,
            tessdata: paths.tessdata,
            language: config.language.clone(),
            psm: config.psm,
            min_confidence: config.min_confidence,
        })
    }
}

impl Recognizer for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, crop: &DynamicImage, allowlist: &Allowlist) -> Result<Vec<Detection>> {
        // Save image to temporary file
        let temp_input = NamedTempFile::with_suffix(".png")?;
        crop.save(temp_input.path())
            .context("Failed to write OCR input image")?;

        // Create temporary output file (Tesseract adds .tsv extension)
        let temp_output = NamedTempFile::new()?;
        let output_base = temp_output.path().to_string_lossy().to_string();

        let output = Command::new(&self.executable)
            .arg(temp_input.path())
            .arg(&output_base)
            .arg("--tessdata-dir")
            .arg(&self.tessdata)
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", allowlist.as_str()))
            .arg("-c")
            .arg("preserve_interword_spaces=1")
            .arg("tsv")
            .output()
            .with_context(|| format!("Failed to run {}", self.executable.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Tesseract failed: {}", stderr));
        }

        let tsv_path = format!("{}.tsv", output_base);
        let tsv_content = std::fs::read_to_string(&tsv_path)
            .map_err(|e| anyhow!("Failed to read Tesseract output: {}", e))?;

        let _ = std::fs::remove_file(&tsv_path);

        Ok(parse_tsv_output(&tsv_content, self.min_confidence))
    }
}

/// Words of one TSV line being accumulated.
#[derive(Default)]
struct LineAccumulator {
    words: Vec<String>,
    conf_sum: f32,
}

impl LineAccumulator {
    fn push(&mut self, text: &str, conf: f32) {
        self.words.push(text.to_string());
        self.conf_sum += conf;
    }

    fn finish(self) -> Option<Detection> {
        if self.words.is_empty() {
            return None;
        }
        let confidence = self.conf_sum / self.words.len() as f32;
        Some(Detection {
            text: self.words.join(" "),
            confidence,
        })
    }
}

/// Parses Tesseract TSV output into one detection per text line.
///
/// Word confidences (0 to 100) are normalised to 0.0 to 1.0; words below
/// `min_confidence` are dropped.
fn parse_tsv_output(tsv: &str, min_confidence: f32) -> Vec<Detection> {
    let mut detections = Vec::new();
    let mut current_key: Option<(i32, i32, i32)> = None;
    let mut current = LineAccumulator::default();

    for line in tsv.lines().skip(1) {
        // TSV fields: level, page_num, block_num, par_num, line_num, word_num,
        //             left, top, width, height, conf, text
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        // Level 5 = word
        if level != 5 {
            continue;
        }

        let text = fields[11].trim();
        if text.is_empty() {
            continue;
        }

        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        if conf < 0.0 {
            continue;
        }
        let conf = conf / 100.0;
        if conf < min_confidence {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        if current_key.is_some() && current_key != Some(key) {
            detections.extend(std::mem::take(&mut current).finish());
        }
        current_key = Some(key);
        current.push(text, conf);
    }

    detections.extend(current.finish());
    detections
}

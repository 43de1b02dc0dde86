//! Job runner - drives one run over the source folder.
//!
//! Creates a timestamped job folder, partitions the screenshots into match
//! folders, processes every screenshot into a page folder holding its crops,
//! `_stats.json` and a copy of the screenshot, then aggregates the job.

use anyhow::{Context, Result};
use chrono::Local;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis;
use crate::config::PipelineConfig;
use crate::extraction::{extract_regions, read_page_stats, write_stats_file};
use crate::extraction::stats::DATE_KEY;
use crate::layout::{LayoutSet, PageClassifier, PageLayout};
use crate::ocr::Recognizer;
use crate::session::{self, MissedMatches};

/// Job folder names: `YYYY-MM-DD-HH-MM-SS`.
const JOB_ID_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

pub fn new_job_id() -> String {
    Local::now().format(JOB_ID_FORMAT).to_string()
}

/// What a finished run produced.
#[derive(Debug)]
pub struct JobSummary {
    pub job_dir: PathBuf,
    pub matches: usize,
    pub pages: usize,
    /// Regions whose text came back empty.
    pub empty_regions: usize,
}

/// Result of processing one screenshot.
#[derive(Debug)]
pub struct PageOutcome {
    pub layout: PageLayout,
    pub page_dir: PathBuf,
    pub regions: usize,
    pub empty_regions: usize,
}

/// Shared, read-only state of a run. The recognizer is built once by the
/// caller and borrowed for every region.
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    layouts: &'a LayoutSet,
    recognizer: &'a dyn Recognizer,
    classifier: PageClassifier<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        layouts: &'a LayoutSet,
        recognizer: &'a dyn Recognizer,
    ) -> Self {
        Self {
            config,
            layouts,
            recognizer,
            classifier: PageClassifier::new(recognizer, layouts),
        }
    }

    /// Runs a new job under `jobs_dir/<job id>`.
    pub fn run(&self, source_dir: &Path, jobs_dir: &Path) -> Result<JobSummary> {
        let job_dir = jobs_dir.join(new_job_id());
        self.run_into(source_dir, &job_dir)
    }

    /// Runs a job into an explicit folder, which should be new or empty.
    ///
    /// The source folder is planned first, so a malformed batch leaves no
    /// job folder behind.
    pub fn run_into(&self, source_dir: &Path, job_dir: &Path) -> Result<JobSummary> {
        crate::log(&format!(
            "Job started: {} -> {} (OCR: {})",
            source_dir.display(),
            job_dir.display(),
            self.recognizer.name()
        ));

        let missed = MissedMatches::load(&self.config.missed_matches_path())?;
        let batches =
            session::plan_source(source_dir, &self.config.screenshot_extension, &missed)?;

        fs::create_dir_all(job_dir)
            .with_context(|| format!("Failed to create job folder {}", job_dir.display()))?;
        let matches = session::copy_batches(&batches, job_dir)?;
        crate::log(&format!("Partitioned into {} match folders", matches));

        let mut pages = 0;
        let mut empty_regions = 0;
        for match_dir in match_folders(job_dir)? {
            for outcome in self.process_match(&match_dir)? {
                pages += 1;
                empty_regions += outcome.empty_regions;
            }
        }

        analysis::aggregate_job(job_dir)?;

        crate::log(&format!(
            "Job finished: {} matches, {} pages, {} empty regions",
            matches, pages, empty_regions
        ));
        Ok(JobSummary {
            job_dir: job_dir.to_path_buf(),
            matches,
            pages,
            empty_regions,
        })
    }

    /// Processes every screenshot in one match folder.
    pub fn process_match(&self, match_dir: &Path) -> Result<Vec<PageOutcome>> {
        let screenshots =
            session::partition::list_screenshots(match_dir, &self.config.screenshot_extension)?;
        let mut seen = HashSet::new();
        let mut outcomes = Vec::with_capacity(screenshots.len());

        for screenshot in screenshots {
            let outcome = self.process_screenshot(&screenshot, match_dir, &seen)?;
            crate::log(&format!(
                "{} -> {} ({} regions, {} empty)",
                screenshot.display(),
                outcome.page_dir.display(),
                outcome.regions,
                outcome.empty_regions
            ));
            seen.insert(outcome.layout);
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    /// Classifies one screenshot and writes its page folder.
    ///
    /// A layout already in `seen` replaces the earlier page of that layout.
    pub fn process_screenshot(
        &self,
        screenshot: &Path,
        match_dir: &Path,
        seen: &HashSet<PageLayout>,
    ) -> Result<PageOutcome> {
        let file_name = screenshot
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let captured_at = session::parse_screenshot_timestamp(screenshot)?;
        let image = image::open(screenshot)
            .with_context(|| format!("Failed to load screenshot {}", screenshot.display()))?;

        let layout = self
            .classifier
            .classify(&image)
            .with_context(|| format!("Failed to classify {}", screenshot.display()))?;

        let page_dir = match_dir.join(layout.type_name());
        if seen.contains(&layout) {
            crate::log(&format!(
                "Warning: {} is a second {} page in {}, replacing the first",
                file_name,
                layout,
                match_dir.display()
            ));
            if page_dir.exists() {
                fs::remove_dir_all(&page_dir)
                    .with_context(|| format!("Failed to clear {}", page_dir.display()))?;
            }
        }

        let crops = extract_regions(&image, self.layouts.boxes(layout), &page_dir)
            .with_context(|| format!("Failed to extract regions from {}", screenshot.display()))?;
        let record = read_page_stats(self.recognizer, &crops, captured_at)
            .with_context(|| format!("Failed to read stats from {}", screenshot.display()))?;
        write_stats_file(&page_dir, &record)?;
        fs::copy(screenshot, page_dir.join(&file_name))
            .with_context(|| format!("Failed to copy {} into {}", file_name, page_dir.display()))?;

        let empty_regions = record
            .iter()
            .filter(|(k, v)| k.as_str() != DATE_KEY && v.is_empty())
            .count();

        Ok(PageOutcome {
            layout,
            page_dir,
            regions: crops.len(),
            empty_regions,
        })
    }
}

/// Match folders of a job, sorted by name.
fn match_folders(job_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(job_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::SESSION_STATS_FILENAME;
    use crate::extraction::{StatRecord, STATS_FILENAME};
    use crate::layout::fixtures::small_layouts;
    use crate::ocr::testing::{detection, FnRecognizer};
    use crate::error::PipelineError;
    use crate::ocr::allowlist::FieldKind;
    use crate::ocr::Allowlist;
    use image::{DynamicImage, Rgb, RgbImage};
    use tempfile::{tempdir, TempDir};

    /// Gray level painted on a screenshot of each layout.
    fn shade(layout: PageLayout) -> u8 {
        match layout {
            PageLayout::Summary => 10,
            PageLayout::Defending => 60,
            PageLayout::Passing => 110,
            PageLayout::Shooting => 160,
        }
    }

    /// Reads the page title from the crop's gray level, and fixed values for
    /// stat regions.
    fn fake_ocr(crop: &DynamicImage, allowlist: &Allowlist) -> Result<Vec<crate::ocr::Detection>> {
        match allowlist.kind() {
            None => {
                let title = match crop.to_rgb8().get_pixel(0, 0)[0] / 50 {
                    0 => "DRIBBLE SUCCESS RATE",
                    1 => "TACKLE SUCCESS RATE",
                    2 => "PASS ACCURACY",
                    3 => "SHOT ACCURACY",
                    _ => "???",
                };
                Ok(vec![detection(title)])
            }
            Some(FieldKind::Text) => Ok(vec![detection("ARSENAL")]),
            Some(FieldKind::NullableInteger) => Ok(vec![]),
            Some(_) => Ok(vec![detection("7")]),
        }
    }

    fn write_screenshot(dir: &Path, stamp: &str, layout: PageLayout) {
        let s = shade(layout);
        RgbImage::from_pixel(40, 40, Rgb([s, s, s]))
            .save(dir.join(format!("EA SPORTS FC 24_{}.jpg", stamp)))
            .unwrap();
    }

    /// Two matches on 2024-08-19, four pages each.
    fn source_with_two_matches() -> TempDir {
        let source = tempdir().unwrap();
        for stamps in [
            ["20240819200000", "20240819200010", "20240819200020", "20240819200030"],
            ["20240819203000", "20240819203010", "20240819203020", "20240819203030"],
        ] {
            for (stamp, layout) in stamps.iter().zip(PageLayout::ALL) {
                write_screenshot(source.path(), stamp, layout);
            }
        }
        source
    }

    fn config_in(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            base_path: dir.to_path_buf(),
            ..PipelineConfig::default()
        }
    }

    fn read_record(path: &Path) -> StatRecord {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_run_job_end_to_end() {
        let source = source_with_two_matches();
        let base = tempdir().unwrap();
        let config = config_in(base.path());
        let layouts = small_layouts();
        let recognizer = FnRecognizer::new(fake_ocr);
        let pipeline = Pipeline::new(&config, &layouts, &recognizer);

        let summary = pipeline.run(source.path(), &config.jobs_dir()).unwrap();
        assert_eq!(summary.matches, 2);
        assert_eq!(summary.pages, 8);
        // POWER_GOALS_HOME is blank on both shooting pages.
        assert_eq!(summary.empty_regions, 2);
        assert!(summary.job_dir.starts_with(config.jobs_dir()));

        let page = summary.job_dir.join("2024-08-19-1").join("SUMMARY");
        let record = read_record(&page.join(STATS_FILENAME));
        assert_eq!(record["TEAM_HOME"], "ARSENAL");
        assert_eq!(record["SCORE_HOME"], "7");
        assert_eq!(record["DATE"], "2024-08-19T20:30:00");
        assert!(!record.contains_key("PAGE_ID"));
        assert!(page.join("PAGE_ID.jpg").exists());
        assert!(page.join("SCORE_HOME.jpg").exists());
        assert!(page.join("EA SPORTS FC 24_20240819203000.jpg").exists());

        let shooting = read_record(
            &summary
                .job_dir
                .join("2024-08-19-0")
                .join("SHOOTING")
                .join(STATS_FILENAME),
        );
        assert_eq!(shooting["TOTAL_SHOTS_HOME"], "7");
        assert_eq!(shooting["POWER_GOALS_HOME"], "");

        assert!(summary.job_dir.join(SESSION_STATS_FILENAME).exists());
        let csv = fs::read_to_string(summary.job_dir.join("PASSING.csv")).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "DATE,TOTAL_PASSES_HOME,MATCH_ID,Session_Adjusted_Date");
        assert_eq!(lines[1], "2024-08-19T20:00:20,7,0,2024-08-19");
        assert_eq!(lines[2], "2024-08-19T20:30:20,7,1,2024-08-19");
    }

    #[test]
    fn test_run_honours_missed_matches() {
        let source = source_with_two_matches();
        let base = tempdir().unwrap();
        fs::write(
            base.path().join("job_config.json"),
            r#"{ "2024-08-19": { "missed_match_indices": [0] } }"#,
        )
        .unwrap();
        let config = config_in(base.path());
        let layouts = small_layouts();
        let recognizer = FnRecognizer::new(fake_ocr);
        let pipeline = Pipeline::new(&config, &layouts, &recognizer);

        let job_dir = base.path().join("job");
        pipeline.run_into(source.path(), &job_dir).unwrap();

        assert!(!job_dir.join("2024-08-19-0").exists());
        assert!(job_dir.join("2024-08-19-1").join("SUMMARY").exists());
        assert!(job_dir.join("2024-08-19-2").join("SHOOTING").exists());
    }

    #[test]
    fn test_run_aborts_on_unrecognized_page() {
        let source = tempdir().unwrap();
        write_screenshot(source.path(), "20240819200000", PageLayout::Summary);
        write_screenshot(source.path(), "20240819200010", PageLayout::Defending);
        // Bright page that no title matches.
        RgbImage::from_pixel(40, 40, Rgb([250, 250, 250]))
            .save(source.path().join("EA SPORTS FC 24_20240819200020.jpg"))
            .unwrap();
        write_screenshot(source.path(), "20240819200030", PageLayout::Shooting);

        let base = tempdir().unwrap();
        let config = config_in(base.path());
        let layouts = small_layouts();
        let recognizer = FnRecognizer::new(fake_ocr);
        let pipeline = Pipeline::new(&config, &layouts, &recognizer);

        let err = pipeline
            .run_into(source.path(), &base.path().join("job"))
            .unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("20240819200020.jpg"));
        assert!(message.contains("'???'"));
    }

    #[test]
    fn test_malformed_batch_leaves_no_job_folder() {
        let source = tempdir().unwrap();
        write_screenshot(source.path(), "20240819200000", PageLayout::Summary);
        write_screenshot(source.path(), "20240819200010", PageLayout::Defending);
        write_screenshot(source.path(), "20240819200020", PageLayout::Passing);

        let base = tempdir().unwrap();
        let config = config_in(base.path());
        let layouts = small_layouts();
        let recognizer = FnRecognizer::new(fake_ocr);
        let pipeline = Pipeline::new(&config, &layouts, &recognizer);

        let err = pipeline.run(source.path(), &config.jobs_dir()).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::MalformedBatch { count, .. }) => assert_eq!(*count, 3),
            other => panic!("expected MalformedBatch, got {:?}", other),
        }
        assert!(!config.jobs_dir().exists());
    }

    #[test]
    fn test_duplicate_layout_replaces_earlier_page() {
        let match_dir = tempdir().unwrap();
        write_screenshot(match_dir.path(), "20240819200000", PageLayout::Summary);
        write_screenshot(match_dir.path(), "20240819200010", PageLayout::Summary);
        write_screenshot(match_dir.path(), "20240819200020", PageLayout::Passing);
        write_screenshot(match_dir.path(), "20240819200030", PageLayout::Shooting);

        let config = config_in(match_dir.path());
        let layouts = small_layouts();
        let recognizer = FnRecognizer::new(fake_ocr);
        let pipeline = Pipeline::new(&config, &layouts, &recognizer);

        let outcomes = pipeline.process_match(match_dir.path()).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[1].layout, PageLayout::Summary);
        assert_eq!(outcomes[1].regions, 3);
        assert_eq!(outcomes[1].page_dir, match_dir.path().join("SUMMARY"));
        assert_eq!(outcomes[0].page_dir, outcomes[1].page_dir);

        let summary = match_dir.path().join("SUMMARY");
        let record = read_record(&summary.join(STATS_FILENAME));
        assert_eq!(record["DATE"], "2024-08-19T20:00:10");
        assert!(!summary.join("EA SPORTS FC 24_20240819200000.jpg").exists());
        assert!(summary.join("EA SPORTS FC 24_20240819200010.jpg").exists());
    }
}

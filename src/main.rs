//! FC Stat Extractor
//!
//! Batch tool that turns post-match statistics screenshots into per-match
//! stat records, a session JSON and one CSV table per page layout.

mod analysis;
mod config;
mod error;
mod extraction;
mod layout;
mod ocr;
mod paths;
mod pipeline;
mod session;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::config::PipelineConfig;
use crate::layout::{LayoutSet, PageClassifier};
use crate::ocr::TesseractEngine;
use crate::pipeline::Pipeline;
use crate::session::MissedMatches;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths::get_log_file())
    {
        let _ = file.write_all(line.as_bytes());
    }
}

#[derive(Parser)]
#[command(name = "fc-stat-extractor")]
#[command(about = "Extract match statistics from post-match screenshots", long_about = None)]
struct Cli {
    /// Config file (defaults to config.json next to the executable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full job: partition, classify, extract, aggregate
    Run {
        /// Screenshot folder (defaults to <base_path>/source_data)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Parent folder for job output (defaults to <base_path>/jobs)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Only split screenshots into per-match folders
    Partition {
        #[arg(long)]
        source: PathBuf,

        #[arg(long)]
        dest: PathBuf,
    },

    /// Rebuild session_stats.json and the CSV tables of an existing job
    Aggregate {
        job_dir: PathBuf,
    },

    /// Print the page layout of one screenshot
    Classify {
        image: PathBuf,
    },

    /// Locate Tesseract and download trained data if missing
    Setup,
}

fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = if let Some(loc) = panic_info.location() {
            format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column())
        } else {
            String::new()
        };
        let log_msg = format!("[PANIC]{} {}\n", location, msg);
        eprintln!("{}", log_msg);
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(paths::get_log_file())
        {
            let _ = file.write_all(log_msg.as_bytes());
        }
    }));
}

fn main() -> Result<()> {
    install_panic_hook();
    paths::ensure_directories()?;

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::default_config_path);
    let config = config::load_config(&config_path);

    let result = match cli.command {
        Commands::Run { source, output } => run(&config, source, output),
        Commands::Partition { source, dest } => {
            let missed = MissedMatches::load(&config.missed_matches_path())?;
            let count =
                session::partition(&source, &dest, &config.screenshot_extension, &missed)?;
            log(&format!("Created {} match folders in {}", count, dest.display()));
            Ok(())
        }
        Commands::Aggregate { job_dir } => {
            analysis::aggregate_job(&job_dir)?;
            Ok(())
        }
        Commands::Classify { image } => classify(&config, &image),
        Commands::Setup => {
            let found = ocr::ensure_tesseract(&config.ocr)?;
            log(&format!(
                "Tesseract: {}, tessdata: {}",
                found.executable.display(),
                found.tessdata.display()
            ));
            Ok(())
        }
    };

    if let Err(e) = &result {
        log(&format!("Error: {:#}", e));
    }
    result
}

fn run(config: &PipelineConfig, source: Option<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let source = source.unwrap_or_else(|| config.source_dir());
    let jobs_dir = output.unwrap_or_else(|| config.jobs_dir());

    let layouts = LayoutSet::load(&config.layouts)?;
    let engine = TesseractEngine::new(&config.ocr)?;
    let pipeline = Pipeline::new(config, &layouts, &engine);

    let summary = pipeline.run(&source, &jobs_dir)?;
    log(&format!(
        "Output written to {} ({} matches, {} pages)",
        summary.job_dir.display(),
        summary.matches,
        summary.pages
    ));
    if summary.empty_regions > 0 {
        log(&format!(
            "Warning: {} regions could not be read and were left empty",
            summary.empty_regions
        ));
    }
    Ok(())
}

fn classify(config: &PipelineConfig, image_path: &std::path::Path) -> Result<()> {
    let layouts = LayoutSet::load(&config.layouts)?;
    let engine = TesseractEngine::new(&config.ocr)?;
    let classifier = PageClassifier::new(&engine, &layouts);

    let page = classifier.classify_file(image_path)?;
    println!("{}", page);
    Ok(())
}

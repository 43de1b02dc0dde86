use anyhow::{anyhow, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::OcrConfig;
use crate::log;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

const COMMON_EXECUTABLES: &[&str] = &[
    "/usr/bin/tesseract",
    "/usr/local/bin/tesseract",
    "/opt/homebrew/bin/tesseract",
    r"C:\Program Files\Tesseract-OCR\tesseract.exe",
    r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
];

const SYSTEM_TESSDATA_DIRS: &[&str] = &[
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4.00/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    "/opt/homebrew/share/tessdata",
    r"C:\Program Files\Tesseract-OCR\tessdata",
    r"C:\Program Files (x86)\Tesseract-OCR\tessdata",
];

pub struct TesseractPaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

/// Returns the directory for downloaded trained data
pub fn get_tessdata_cache_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fc-stat-extractor")
        .join("tessdata")
}

/// Locates Tesseract and its trained data, downloading the language file if necessary.
pub fn ensure_tesseract(config: &OcrConfig) -> Result<TesseractPaths> {
    let executable = find_tesseract_executable(config.tesseract_path.as_deref())?;

    let tessdata = match find_tessdata_dir(config.tessdata_dir.as_deref(), &config.language) {
        Ok(dir) => dir,
        Err(e) => {
            log(&format!("{}. Downloading...", e));
            let cache_dir = get_tessdata_cache_dir();
            fs::create_dir_all(&cache_dir)?;
            download_tessdata(&cache_dir, &config.language)?;
            cache_dir
        }
    };

    Ok(TesseractPaths {
        executable,
        tessdata,
    })
}

/// Downloads `<language>.traineddata` from the tessdata repository
fn download_tessdata(tessdata_dir: &Path, language: &str) -> Result<()> {
    let url = format!("{}/{}.traineddata", TESSDATA_REPO, language);
    let dest = tessdata_dir.join(format!("{}.traineddata", language));

    log(&format!("Downloading {}.traineddata...", language));

    let client = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&url)
        .header("User-Agent", "fc-stat-extractor")
        .send()?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download {}.traineddata: HTTP {}",
            language,
            response.status()
        ));
    }

    let bytes = response.bytes()?;
    let mut file = fs::File::create(&dest)?;
    file.write_all(&bytes)?;

    log(&format!(
        "Downloaded {}.traineddata ({} bytes)",
        language,
        bytes.len()
    ));

    Ok(())
}

/// Finds the Tesseract executable: configured path, then PATH, then common locations
pub fn find_tesseract_executable(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        log(&format!(
            "Configured Tesseract path {} does not exist, searching elsewhere",
            path.display()
        ));
    }

    // Check PATH
    if let Ok(output) = std::process::Command::new("tesseract")
        .arg("--version")
        .output()
    {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    for path in COMMON_EXECUTABLES {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install tesseract-ocr or set ocr.tesseract_path in config.json."
    ))
}

/// Finds a tessdata directory containing `<language>.traineddata`
pub fn find_tessdata_dir(configured: Option<&Path>, language: &str) -> Result<PathBuf> {
    let traineddata = format!("{}.traineddata", language);

    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = configured {
        candidates.push(path.to_path_buf());
    }
    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        candidates.push(PathBuf::from(&prefix));
        candidates.push(PathBuf::from(&prefix).join("tessdata"));
    }
    candidates.push(get_tessdata_cache_dir());
    candidates.extend(SYSTEM_TESSDATA_DIRS.iter().map(PathBuf::from));

    candidates
        .into_iter()
        .find(|dir| dir.join(&traineddata).exists())
        .ok_or_else(|| anyhow!("{} not found in any tessdata directory", traineddata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_configured_tessdata_dir_wins() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("xyz.traineddata"), b"data").unwrap();

        let found = find_tessdata_dir(Some(dir.path()), "xyz").unwrap();
        assert_eq!(found, dir.path());
    }

    #[test]
    fn test_missing_language_is_an_error() {
        let dir = tempdir().unwrap();
        let err = find_tessdata_dir(Some(dir.path()), "no-such-language").unwrap_err();
        assert!(err.to_string().contains("no-such-language.traineddata"));
    }

    #[test]
    fn test_configured_executable_is_used_when_present() {
        let dir = tempdir().unwrap();
        let exe = dir.path().join("tesseract");
        fs::write(&exe, b"").unwrap();

        assert_eq!(find_tesseract_executable(Some(&exe)).unwrap(), exe);
    }
}

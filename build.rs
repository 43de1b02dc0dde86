use std::env;
use std::fs;
use std::path::{Path, PathBuf};

fn main() {
    // Copy layouts and config to target directory
    copy_layouts();
    copy_config();
}

/// OUT_DIR is something like target/release/build/fc-stat-extractor-xxx/out.
/// Going up 3 levels gives target/release (or target/debug).
fn target_dir() -> Option<PathBuf> {
    let out_dir = env::var("OUT_DIR").ok()?;
    Path::new(&out_dir).ancestors().nth(3).map(Path::to_path_buf)
}

/// Copies the bounding-box tables so the executable finds them next to itself.
fn copy_layouts() {
    let Some(target_dir) = target_dir() else {
        return;
    };

    let layouts_src = Path::new("resources/layouts");
    let layouts_dst = target_dir.join("resources").join("layouts");

    if layouts_src.exists() {
        copy_dir_recursive(layouts_src, &layouts_dst);
        // Tell Cargo to re-run if the tables change
        println!("cargo:rerun-if-changed=resources/layouts/");
    }
}

/// Recursively copies a directory and its contents.
fn copy_dir_recursive(src: &Path, dst: &Path) {
    let _ = fs::create_dir_all(dst);

    if let Ok(entries) = fs::read_dir(src) {
        for entry in entries.flatten() {
            let src_path = entry.path();
            let dst_path = dst.join(entry.file_name());

            if src_path.is_dir() {
                copy_dir_recursive(&src_path, &dst_path);
            } else {
                let _ = fs::copy(&src_path, &dst_path);
            }
        }
    }
}

/// Copies config.json to the target directory.
fn copy_config() {
    let Some(target_dir) = target_dir() else {
        return;
    };

    let config_src = Path::new("config.json");
    let config_dst = target_dir.join("config.json");

    if config_src.exists() {
        let _ = fs::copy(config_src, &config_dst);
        println!("cargo:rerun-if-changed=config.json");
    }
}

//! Path utility functions
//!
//! Cache directory lookup and artifact file naming helpers.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Platform cache directory for the application, falling back to the
/// working directory when the platform has none
pub fn get_cache_dir(app_name: &str) -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(app_name)
}

/// Append a suffix to the full file name ("a.bin" + "zst" -> "a.bin.zst")
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Whether a path names a raw firmware image
pub fn is_bin_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("bin"))
        .unwrap_or(false)
}

/// Every raw firmware image below `root`, sorted by path
pub fn find_bin_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_bin_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

//! Local image handling
//!
//! Selection and validation of a user-provided `.bin` file.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::ui::{select_item, Interaction};
use crate::utils::{find_bin_files, format_size, is_bin_file};
use crate::{log_info, log_warn};

const MODULE: &str = "local_image";

/// Offered first when present in the search directory
pub const DEFAULT_IMAGE: &str = "test.bin";

fn invalid(path: &Path, reason: impl Into<String>) -> Error {
    Error::LocalImage {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Check that `path` is a non-empty `.bin` file and return its absolute path
pub fn validate_local_image(path: &Path) -> Result<PathBuf> {
    let metadata = std::fs::metadata(path).map_err(|_| invalid(path, "file does not exist"))?;
    if !metadata.is_file() {
        return Err(invalid(path, "not a regular file"));
    }
    if !is_bin_file(path) {
        return Err(invalid(path, "only .bin files can be flashed"));
    }
    if metadata.len() == 0 {
        return Err(invalid(path, "file is empty"));
    }

    let absolute = std::path::absolute(path).map_err(|e| invalid(path, e.to_string()))?;
    log_info!(
        MODULE,
        "Selected local image: {} ({})",
        absolute.display(),
        format_size(metadata.len())
    );
    Ok(absolute)
}

/// Pick the image to flash: the explicit path, else `test.bin`, else one of
/// the `.bin` files below `search_root`, else a typed path
pub fn resolve_local_image(
    ui: &mut dyn Interaction,
    explicit: Option<&Path>,
    search_root: &Path,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return validate_local_image(path);
    }

    let default = search_root.join(DEFAULT_IMAGE);
    if default.is_file() && ui.confirm(&format!("Flash {}?", default.display()), true) {
        return validate_local_image(&default);
    }

    let mut candidates: Vec<Option<PathBuf>> =
        find_bin_files(search_root).into_iter().map(Some).collect();
    if !candidates.is_empty() {
        candidates.push(None);
        let picked = select_item(ui, "Local images:", &candidates, 0, |_, c| match c {
            Some(path) => path
                .strip_prefix(search_root)
                .unwrap_or(path)
                .display()
                .to_string(),
            None => "Enter a path manually".to_string(),
        })?;
        if let Some(path) = picked {
            return validate_local_image(path);
        }
    }

    loop {
        let answer = ui.input("Path to a .bin file (exit to cancel)")?;
        let answer = answer.trim().trim_matches('"');
        match validate_local_image(Path::new(answer)) {
            Ok(path) => return Ok(path),
            Err(e) => {
                log_warn!(MODULE, "{}", e);
                println!("{}", e);
            }
        }
    }
}

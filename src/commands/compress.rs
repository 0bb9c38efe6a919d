//! Firmware compression
//!
//! Packs every `.bin` below a directory into a `.bin.zst` sibling for
//! publishing alongside the manifest.

use std::path::{Path, PathBuf};

use crate::config;
use crate::decompress::compress_zstd;
use crate::error::{Error, Result};
use crate::utils::{find_bin_files, format_size, reduction_percent, with_suffix};
use crate::{log_info, log_warn};

const MODULE: &str = "compress";

/// One compressed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedFile {
    pub input: PathBuf,
    pub output: PathBuf,
    pub original_size: u64,
    pub compressed_size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressionSummary {
    pub files: Vec<CompressedFile>,
}

impl CompressionSummary {
    pub fn total_original(&self) -> u64 {
        self.files.iter().map(|f| f.original_size).sum()
    }

    pub fn total_compressed(&self) -> u64 {
        self.files.iter().map(|f| f.compressed_size).sum()
    }

    pub fn reduction(&self) -> f64 {
        reduction_percent(self.total_original(), self.total_compressed())
    }
}

/// Compress every `.bin` below `dir` at `level`
pub fn compress_directory(dir: &Path, level: i32) -> Result<CompressionSummary> {
    if !dir.is_dir() {
        return Err(Error::NotFound {
            kind: "directory",
            name: dir.display().to_string(),
        });
    }

    let inputs = find_bin_files(dir);
    if inputs.is_empty() {
        log_warn!(MODULE, "No .bin files found under {}", dir.display());
        return Ok(CompressionSummary::default());
    }
    log_info!(
        MODULE,
        "Compressing {} file(s) under {} at level {}",
        inputs.len(),
        dir.display(),
        level
    );

    let mut summary = CompressionSummary::default();
    for input in inputs {
        let output = with_suffix(&input, config::download::COMPRESSED_SUFFIX.trim_start_matches('.'));
        let (original_size, compressed_size) = compress_zstd(&input, &output, level)?;
        summary.files.push(CompressedFile {
            input,
            output,
            original_size,
            compressed_size,
        });
    }
    Ok(summary)
}

pub fn print_summary(dir: &Path, level: i32, summary: &CompressionSummary) {
    println!("Compression level: {}", level);
    if summary.files.is_empty() {
        println!("No .bin files found under {}/", dir.display());
        return;
    }

    for file in &summary.files {
        println!("  {}", file.input.display());
        println!(
            "    {} -> {} bytes ({:.1}% smaller)",
            file.original_size,
            file.compressed_size,
            reduction_percent(file.original_size, file.compressed_size)
        );
        println!("    output: {}", file.output.display());
    }

    println!();
    println!(
        "Total: {} -> {} ({:.1}% smaller)",
        format_size(summary.total_original()),
        format_size(summary.total_compressed()),
        summary.reduction()
    );
}

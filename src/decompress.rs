//! Decompression module
//!
//! Zstandard decoding of transport-compressed artifacts, and the matching
//! encoder used to publish them.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use zstd::stream::read::Decoder as ZstdDecoder;

use crate::config;
use crate::error::{Error, Result};
use crate::utils::ProgressTracker;
use crate::{log_debug, log_info};

const MODULE: &str = "decompress";

/// Check if a locator or file name is transport-compressed
pub fn needs_decompression(name: &str) -> bool {
    name.to_ascii_lowercase()
        .ends_with(config::download::COMPRESSED_SUFFIX)
}

/// Decompress a zstd file into `output_path`.
/// Returns the decompressed size in bytes.
pub fn decompress_zstd(input_path: &Path, output_path: &Path) -> Result<u64> {
    let input_file = File::open(input_path).map_err(|e| Error::cache(input_path, e))?;
    let total = input_file.metadata().map(|m| m.len()).unwrap_or(0);
    let buf_reader = BufReader::with_capacity(config::download::DECOMPRESS_BUFFER_SIZE, input_file);

    let decoder = ZstdDecoder::new(buf_reader).map_err(|e| Error::DecompressionFailed {
        path: input_path.to_path_buf(),
        reason: format!("failed to create zstd decoder: {}", e),
    })?;

    log_info!(
        MODULE,
        "Decompressing {} -> {}",
        input_path.display(),
        output_path.display()
    );
    log_debug!(MODULE, "Compressed size: {} bytes", total);

    copy_decoded(decoder, input_path, output_path)
}

/// Stream a decoder into the output file. Decode errors are reported
/// against `input_path`, write errors against `output_path`.
fn copy_decoded<R: Read>(mut decoder: R, input_path: &Path, output_path: &Path) -> Result<u64> {
    let output_file = File::create(output_path).map_err(|e| Error::cache(output_path, e))?;
    let mut buf_writer =
        BufWriter::with_capacity(config::download::DECOMPRESS_BUFFER_SIZE, output_file);
    let mut buffer = vec![0u8; config::download::CHUNK_SIZE];
    let mut tracker = ProgressTracker::new(
        "Decompress",
        MODULE,
        0,
        config::logging::DECOMPRESS_LOG_INTERVAL_MB,
    );

    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| Error::DecompressionFailed {
                path: input_path.to_path_buf(),
                reason: format!("zstd decompression error: {}", e),
            })?;

        if bytes_read == 0 {
            break;
        }

        buf_writer
            .write_all(&buffer[..bytes_read])
            .map_err(|e| Error::cache(output_path, e))?;
        tracker.update(bytes_read as u64);
    }

    buf_writer.flush().map_err(|e| Error::cache(output_path, e))?;
    Ok(tracker.finish())
}

/// Compress `input_path` into `output_path` at `level`.
/// Returns `(original_size, compressed_size)`.
pub fn compress_zstd(input_path: &Path, output_path: &Path, level: i32) -> Result<(u64, u64)> {
    let data = std::fs::read(input_path).map_err(|e| Error::cache(input_path, e))?;
    let compressed = zstd::encode_all(data.as_slice(), level).map_err(|e| Error::cache(input_path, e))?;
    std::fs::write(output_path, &compressed).map_err(|e| Error::cache(output_path, e))?;

    log_debug!(
        MODULE,
        "Compressed {}: {} -> {} bytes",
        input_path.display(),
        data.len(),
        compressed.len()
    );
    Ok((data.len() as u64, compressed.len() as u64))
}

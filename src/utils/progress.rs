//! Progress tracking utility
//!
//! Logs throughput of artifact downloads and decompression at fixed
//! byte intervals.

use std::time::Instant;

use super::{bytes_to_mb, MB};
use crate::{log_debug, log_info};

/// Progress tracker for byte-oriented operations
pub struct ProgressTracker {
    /// Operation name for logging (e.g., "Download", "Decompress")
    operation: String,
    module: String,
    /// Total bytes to process (0 if unknown)
    total_bytes: u64,
    processed_bytes: u64,
    start_time: Instant,
    last_log_time: Instant,
    last_log_bytes: u64,
    log_interval_bytes: u64,
}

impl ProgressTracker {
    pub fn new(operation: &str, module: &str, total_bytes: u64, log_interval_mb: u64) -> Self {
        let now = Instant::now();
        Self {
            operation: operation.to_string(),
            module: module.to_string(),
            total_bytes,
            processed_bytes: 0,
            start_time: now,
            last_log_time: now,
            last_log_bytes: 0,
            log_interval_bytes: log_interval_mb * MB,
        }
    }

    /// Record processed bytes; logs when an interval boundary is crossed.
    /// Returns true if a progress line was logged.
    pub fn update(&mut self, bytes_added: u64) -> bool {
        self.processed_bytes += bytes_added;

        if self.log_interval_bytes == 0
            || self.processed_bytes / self.log_interval_bytes
                <= self.last_log_bytes / self.log_interval_bytes
        {
            return false;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_log_time).as_secs_f64();
        let speed_mbps = if elapsed > 0.0 {
            bytes_to_mb(self.processed_bytes - self.last_log_bytes) / elapsed
        } else {
            0.0
        };
        self.last_log_time = now;
        self.last_log_bytes = self.processed_bytes;

        if self.total_bytes > 0 {
            log_debug!(
                &self.module,
                "{} progress: {:.1} MB / {:.1} MB ({:.1}%) @ {:.1} MB/s",
                self.operation,
                bytes_to_mb(self.processed_bytes),
                bytes_to_mb(self.total_bytes),
                self.processed_bytes as f64 / self.total_bytes as f64 * 100.0,
                speed_mbps
            );
        } else {
            log_debug!(
                &self.module,
                "{} progress: {:.1} MB @ {:.1} MB/s",
                self.operation,
                bytes_to_mb(self.processed_bytes),
                speed_mbps
            );
        }
        true
    }

    /// Log completion with the average speed; returns the processed bytes
    pub fn finish(&self) -> u64 {
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        let avg_speed_mbps = if elapsed_secs > 0.0 {
            bytes_to_mb(self.processed_bytes) / elapsed_secs
        } else {
            0.0
        };

        log_info!(
            &self.module,
            "{} complete: {} bytes in {:.1}s (avg {:.1} MB/s)",
            self.operation,
            self.processed_bytes,
            elapsed_secs,
            avg_speed_mbps
        );

        self.processed_bytes
    }
}

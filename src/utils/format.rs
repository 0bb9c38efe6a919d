//! Formatting utilities for human-readable output

/// Bytes per megabyte constant
pub const MB: u64 = 1024 * 1024;

/// Convert bytes to megabytes as f64 (for calculations and logging)
#[inline]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / MB as f64
}

/// Format bytes into human-readable size string (e.g., "1.5 MB", "256 KB")
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Render a flash offset the way the programmer expects it ("0x1000")
pub fn format_address(address: u32) -> String {
    format!("{:#x}", address)
}

/// Percentage saved by compression, 0 for empty input
pub fn reduction_percent(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    (1.0 - compressed as f64 / original as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "2 KB");
        assert_eq!(format_size(1048576), "1.0 MB");
        assert_eq!(format_size(1572864), "1.5 MB");
    }

    #[test]
    fn test_format_address() {
        assert_eq!(format_address(0), "0x0");
        assert_eq!(format_address(0x1000), "0x1000");
        assert_eq!(format_address(0x10000), "0x10000");
    }

    #[test]
    fn test_bytes_to_mb() {
        assert!((bytes_to_mb(0) - 0.0).abs() < f64::EPSILON);
        assert!((bytes_to_mb(1048576) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reduction_percent() {
        assert!((reduction_percent(0, 0) - 0.0).abs() < f64::EPSILON);
        assert!((reduction_percent(100, 25) - 75.0).abs() < 1e-9);
    }
}

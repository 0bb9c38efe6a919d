//! Application configuration
//!
//! Built-in constants grouped by concern, plus the immutable [`Config`]
//! value that is assembled once at startup and threaded into every
//! component.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::utils::get_cache_dir;
use crate::{log_debug, log_info};

const MODULE: &str = "config";

pub mod app {
    /// Application name, used for cache and config directories
    pub const NAME: &str = "firmware-recovery";
    /// User agent sent with every HTTP request
    pub const USER_AGENT: &str = concat!("firmware-recovery/", env!("CARGO_PKG_VERSION"));
    /// Settings file name inside the platform config directory
    pub const SETTINGS_FILE: &str = "settings.json";
}

pub mod urls {
    /// Published device/version manifest
    pub const MANIFEST: &str =
        "https://raw.githubusercontent.com/ExpTechTW/exptech-device-recovery/refs/heads/main/firmware.json";
    /// Base location that relative artifact locators are joined onto
    pub const BASE: &str =
        "https://raw.githubusercontent.com/ExpTechTW/exptech-device-recovery/refs/heads/main";
}

pub mod esp32 {
    pub const CHIP: &str = "esp32";
    pub const BAUD_RATE: u32 = 921_600;
    pub const FLASH_FREQ: &str = "80m";

    /// Merged image written from the start of flash
    pub const COMBINED_ADDRESS: u32 = 0x0;
    pub const BOOTLOADER_ADDRESS: u32 = 0x1000;
    pub const PARTITIONS_ADDRESS: u32 = 0x8000;
    /// OTA data initialiser (boot_app0.bin)
    pub const BOOT_STUB_ADDRESS: u32 = 0xe000;
    pub const APPLICATION_ADDRESS: u32 = 0x10000;

    /// Shared stub locator, relative to the base URL
    pub const BOOT_STUB_LOCATOR: &str = "resources/boot_app0.bin";
}

pub mod download {
    /// Read buffer for network transfers (1 MB)
    pub const CHUNK_SIZE: usize = 1024 * 1024;
    /// Buffered reader/writer capacity for decompression
    pub const DECOMPRESS_BUFFER_SIZE: usize = 4 * 1024 * 1024;
    /// Artifacts must be strictly larger than this many bytes
    pub const MIN_ARTIFACT_SIZE: u64 = 0;
    /// Suffix of the intermediate file written while downloading
    pub const PARTIAL_SUFFIX: &str = "downloading";
    /// Suffix of the intermediate file written while decompressing
    pub const DECODING_SUFFIX: &str = "decoding";
    /// Suffix marking a transport-compressed artifact
    pub const COMPRESSED_SUFFIX: &str = ".zst";
    /// Level used by the compress subcommand (zstd maximum)
    pub const COMPRESSION_LEVEL: i32 = 22;
}

pub mod logging {
    /// Progress log interval for downloads
    pub const DOWNLOAD_LOG_INTERVAL_MB: u64 = 1;
    /// Progress log interval for decompression
    pub const DECOMPRESS_LOG_INTERVAL_MB: u64 = 4;
    /// Log directory name inside the cache directory
    pub const DIR: &str = "logs";
}

/// Flash offsets of every artifact role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLayout {
    pub combined: u32,
    pub bootloader: u32,
    pub partitions: u32,
    pub boot_stub: u32,
    pub application: u32,
}

impl Default for FlashLayout {
    fn default() -> Self {
        Self {
            combined: esp32::COMBINED_ADDRESS,
            bootloader: esp32::BOOTLOADER_ADDRESS,
            partitions: esp32::PARTITIONS_ADDRESS,
            boot_stub: esp32::BOOT_STUB_ADDRESS,
            application: esp32::APPLICATION_ADDRESS,
        }
    }
}

impl FlashLayout {
    /// Split-image offsets must be distinct so plans never overlap
    pub fn validate(&self) -> Result<()> {
        let split = [
            ("bootloader", self.bootloader),
            ("partitions", self.partitions),
            ("boot_stub", self.boot_stub),
            ("application", self.application),
        ];
        for (i, (name, addr)) in split.iter().enumerate() {
            if let Some((other, _)) = split[i + 1..].iter().find(|(_, a)| a == addr) {
                return Err(Error::Config(format!(
                    "{} and {} share flash offset {:#x}",
                    name, other, addr
                )));
            }
        }
        Ok(())
    }
}

/// Optional overrides read from `settings.json`
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub chip: Option<String>,
    pub baud_rate: Option<u32>,
    pub flash_freq: Option<String>,
    pub manifest: Option<String>,
    pub base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub min_artifact_size: Option<u64>,
    pub compress_transfer: Option<bool>,
    pub esptool: Option<String>,
    pub bootloader_address: Option<u32>,
    pub partitions_address: Option<u32>,
    pub boot_stub_address: Option<u32>,
    pub application_address: Option<u32>,
    pub combined_address: Option<u32>,
}

impl Settings {
    /// Default location of the settings file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app::NAME).join(app::SETTINGS_FILE))
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log_debug!(MODULE, "No settings file at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let settings: Settings = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        log_info!(MODULE, "Loaded settings from {}", path.display());
        Ok(settings)
    }
}

/// Immutable runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub chip: String,
    pub baud_rate: u32,
    pub flash_freq: String,
    pub manifest: String,
    pub base_url: String,
    pub cache_dir: PathBuf,
    pub min_artifact_size: u64,
    /// Passed to the programmer as its transfer compression flag
    pub compress_transfer: bool,
    pub esptool: String,
    pub layout: FlashLayout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chip: esp32::CHIP.to_string(),
            baud_rate: esp32::BAUD_RATE,
            flash_freq: esp32::FLASH_FREQ.to_string(),
            manifest: urls::MANIFEST.to_string(),
            base_url: urls::BASE.to_string(),
            cache_dir: get_cache_dir(app::NAME).join("firmware"),
            min_artifact_size: download::MIN_ARTIFACT_SIZE,
            compress_transfer: true,
            esptool: "esptool".to_string(),
            layout: FlashLayout::default(),
        }
    }
}

impl Config {
    /// Apply settings on top of the built-in defaults
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let defaults = Self::default();
        let layout = FlashLayout {
            combined: settings.combined_address.unwrap_or(defaults.layout.combined),
            bootloader: settings.bootloader_address.unwrap_or(defaults.layout.bootloader),
            partitions: settings.partitions_address.unwrap_or(defaults.layout.partitions),
            boot_stub: settings.boot_stub_address.unwrap_or(defaults.layout.boot_stub),
            application: settings.application_address.unwrap_or(defaults.layout.application),
        };
        layout.validate()?;

        Ok(Self {
            chip: settings.chip.unwrap_or(defaults.chip),
            baud_rate: settings.baud_rate.unwrap_or(defaults.baud_rate),
            flash_freq: settings.flash_freq.unwrap_or(defaults.flash_freq),
            manifest: settings.manifest.unwrap_or(defaults.manifest),
            base_url: settings.base_url.unwrap_or(defaults.base_url),
            cache_dir: settings.cache_dir.unwrap_or(defaults.cache_dir),
            min_artifact_size: settings
                .min_artifact_size
                .unwrap_or(defaults.min_artifact_size),
            compress_transfer: settings
                .compress_transfer
                .unwrap_or(defaults.compress_transfer),
            esptool: settings.esptool.unwrap_or(defaults.esptool),
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_is_valid_and_ascending() {
        let layout = FlashLayout::default();
        layout.validate().unwrap();
        assert!(layout.bootloader < layout.partitions);
        assert!(layout.partitions < layout.boot_stub);
        assert!(layout.boot_stub < layout.application);
    }

    #[test]
    fn test_duplicate_offsets_rejected() {
        let layout = FlashLayout {
            boot_stub: esp32::PARTITIONS_ADDRESS,
            ..FlashLayout::default()
        };
        let err = layout.validate().unwrap_err();
        assert!(err.to_string().contains("0x8000"));
    }

    #[test]
    fn test_settings_override_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "baud_rate": 115200, "chip": "esp32s3" }"#).unwrap();
        let config = Config::from_settings(settings).unwrap();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.chip, "esp32s3");
        assert_eq!(config.flash_freq, esp32::FLASH_FREQ);
        assert_eq!(config.layout, FlashLayout::default());
    }

    #[test]
    fn test_missing_settings_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.json")).unwrap();
        assert!(settings.chip.is_none());
    }

    #[test]
    fn test_malformed_settings_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(Error::Config(_))));
    }
}

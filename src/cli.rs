//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{self, Settings};
use crate::manifest::Channel;

#[derive(Parser)]
#[command(name = "firmware-recovery")]
#[command(author, version, about = "Download and flash ESP32 device firmware", long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Accept every default without prompting
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Serial port of the device
    #[arg(short, long, global = true, env = "FIRMWARE_RECOVERY_PORT")]
    pub port: Option<String>,

    /// Serial baud rate
    #[arg(long, global = true)]
    pub baud: Option<u32>,

    /// Target chip passed to esptool
    #[arg(long, global = true)]
    pub chip: Option<String>,

    /// Manifest URL or local file
    #[arg(long, global = true)]
    pub manifest: Option<String>,

    /// Base URL that relative artifact locators resolve against
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Artifact cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// esptool executable
    #[arg(long, global = true)]
    pub esptool: Option<String>,

    /// Settings file (defaults to settings.json in the user config directory)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Options of the manifest flash flow
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FlashArgs {
    /// Device model, as listed by `list`
    #[arg(long)]
    pub model: Option<String>,

    /// Update channel (release or all)
    #[arg(long)]
    pub channel: Option<Channel>,

    /// Firmware version
    #[arg(long = "version", id = "firmware_version")]
    pub version: Option<String>,

    /// Ignore cached artifacts and download again
    #[arg(long)]
    pub redownload: bool,

    /// Fetch and show the flash plan without programming
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select a firmware from the manifest and flash it (default)
    Flash {
        #[command(flatten)]
        args: FlashArgs,
    },

    /// Flash a local .bin file at the combined-image offset
    FlashLocal {
        /// Image to flash; test.bin or a discovered .bin is offered when omitted
        file: Option<PathBuf>,

        /// Show the flash plan without programming
        #[arg(long)]
        dry_run: bool,
    },

    /// Erase the entire flash
    Erase,

    /// Compress every .bin below a directory into .bin.zst
    Compress {
        /// Directory to scan
        #[arg(default_value = "firmware")]
        dir: PathBuf,

        /// zstd compression level (1-22)
        #[arg(long, default_value_t = config::download::COMPRESSION_LEVEL)]
        level: i32,
    },

    /// List products and versions of the manifest
    List,
}

impl Cli {
    /// Layer command-line overrides on top of file settings
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if let Some(baud) = self.baud {
            settings.baud_rate = Some(baud);
        }
        if let Some(chip) = &self.chip {
            settings.chip = Some(chip.clone());
        }
        if let Some(manifest) = &self.manifest {
            settings.manifest = Some(manifest.clone());
        }
        if let Some(base_url) = &self.base_url {
            settings.base_url = Some(base_url.clone());
        }
        if let Some(cache_dir) = &self.cache_dir {
            settings.cache_dir = Some(cache_dir.clone());
        }
        if let Some(esptool) = &self.esptool {
            settings.esptool = Some(esptool.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_means_flash() {
        let cli = Cli::try_parse_from(["firmware-recovery"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.yes);
    }

    #[test]
    fn test_flash_arguments() {
        let cli = Cli::try_parse_from([
            "firmware-recovery",
            "flash",
            "--model",
            "A",
            "--channel",
            "all",
            "--version",
            "25w47a",
            "--dry-run",
            "-y",
        ])
        .unwrap();
        assert!(cli.yes);
        match cli.command {
            Some(Commands::Flash { args }) => {
                assert_eq!(args.model.as_deref(), Some("A"));
                assert_eq!(args.channel, Some(Channel::All));
                assert_eq!(args.version.as_deref(), Some("25w47a"));
                assert!(args.dry_run);
                assert!(!args.redownload);
            }
            _ => panic!("expected flash"),
        }
    }

    #[test]
    fn test_compress_defaults() {
        let cli = Cli::try_parse_from(["firmware-recovery", "compress"]).unwrap();
        match cli.command {
            Some(Commands::Compress { dir, level }) => {
                assert_eq!(dir, PathBuf::from("firmware"));
                assert_eq!(level, 22);
            }
            _ => panic!("expected compress"),
        }
    }

    #[test]
    fn test_overrides_replace_settings() {
        let cli = Cli::try_parse_from([
            "firmware-recovery",
            "--baud",
            "115200",
            "--base-url",
            "https://mirror",
            "list",
        ])
        .unwrap();
        let mut settings = Settings {
            baud_rate: Some(460_800),
            chip: Some("esp32".into()),
            ..Settings::default()
        };
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.baud_rate, Some(115_200));
        assert_eq!(settings.base_url.as_deref(), Some("https://mirror"));
        assert_eq!(settings.chip.as_deref(), Some("esp32"));
    }
}

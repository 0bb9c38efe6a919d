//! Firmware Recovery - download and flash ESP32 device firmware
//!
//! Resolves a product and version from a remote manifest, materialises the
//! required artifacts in a local cache and hands an ordered flash plan to
//! esptool.

mod cli;
mod commands;
mod config;
mod decompress;
mod download;
mod error;
mod flash;
mod logging;
mod manifest;
mod transport;
mod ui;
mod utils;

use std::path::Path;

use clap::Parser;

use cli::{Cli, Commands, FlashArgs};
use commands::catalog::{render_catalog, SelectionArgs};
use commands::compress::{compress_directory, print_summary};
use commands::operations::{self, FlashOptions, Outcome};
use commands::Session;
use config::{Config, Settings};
use error::{Error, Result};
use flash::{EsptoolProgrammer, SystemPorts};
use transport::HttpTransport;
use ui::{Interaction, Terminal, Unattended};

const MODULE: &str = "main";

fn load_config(cli: &Cli) -> Result<Config> {
    let path = cli.settings.clone().or_else(Settings::default_path);
    let mut settings = match path {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };
    cli.apply_overrides(&mut settings);
    Config::from_settings(settings)
}

fn run(cli: Cli) -> Result<Outcome> {
    let config = load_config(&cli)?;
    log_debug!(MODULE, "Configuration: {:?}", config);

    let command = cli.command.unwrap_or(Commands::Flash {
        args: FlashArgs::default(),
    });

    // commands that never touch the device or the network
    if let Commands::Compress { dir, level } = &command {
        let summary = compress_directory(dir, *level)?;
        print_summary(dir, *level, &summary);
        return Ok(Outcome::Completed);
    }

    let transport = HttpTransport::new()?;

    if let Commands::List = command {
        let manifest = manifest::load(&config.manifest, &transport)?;
        for line in render_catalog(&manifest) {
            println!("{}", line);
        }
        return Ok(Outcome::Completed);
    }

    let mut terminal = Terminal;
    let mut unattended = Unattended;
    let ui: &mut dyn Interaction = if cli.yes {
        &mut unattended
    } else {
        &mut terminal
    };
    let mut programmer = EsptoolProgrammer::new(config.esptool.clone());
    let mut session = Session {
        config: &config,
        transport: &transport,
        ports: &SystemPorts,
        ui,
        programmer: &mut programmer,
    };
    let port = cli.port.as_deref();

    match command {
        Commands::Flash { args } => {
            let options = FlashOptions {
                selection: SelectionArgs {
                    model: args.model,
                    channel: args.channel,
                    version: args.version,
                },
                port: cli.port.clone(),
                redownload: args.redownload,
                dry_run: args.dry_run,
            };
            operations::flash_from_manifest(&mut session, &options)
        }
        Commands::FlashLocal { file, dry_run } => operations::flash_local(
            &mut session,
            file.as_deref(),
            Path::new("."),
            port,
            dry_run,
        ),
        Commands::Erase => operations::erase(&mut session, port),
        Commands::Compress { .. } | Commands::List => Ok(Outcome::Completed),
    }
}

fn main() {
    let cli = Cli::parse();

    logging::init();
    logging::set_log_level(cli.verbose);

    log_info!(MODULE, "=== Firmware Recovery Starting ===");
    log_info!(MODULE, "Version: {}", env!("CARGO_PKG_VERSION"));
    log_info!(MODULE, "Log file: {}", logging::log_file_path().display());

    match run(cli) {
        Ok(Outcome::Completed) | Ok(Outcome::Planned(_)) => {}
        Ok(Outcome::Declined) => println!("Cancelled."),
        Ok(Outcome::ProgrammerFailed(_)) => std::process::exit(2),
        Err(Error::Cancelled) => {
            log_info!(MODULE, "Cancelled by user");
            println!("Cancelled.");
        }
        Err(e) => {
            log_error!(MODULE, "{}", e);
            eprintln!("Error: {}", e);
            if let Some(hint) = e.hint() {
                eprintln!("{}", hint);
            }
            std::process::exit(1);
        }
    }
}

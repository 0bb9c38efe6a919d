//! Core operations module
//!
//! Handles the flash, local flash and erase flows.

use std::path::{Path, PathBuf};

use super::catalog::{self, SelectionArgs};
use super::local_image::resolve_local_image;
use super::Session;
use crate::download::{ArtifactRequest, ArtifactSource, Fetcher};
use crate::error::{Error, Result};
use crate::flash::{FlashPlan, FlashRequest, PlanBuilder, PortInfo, PortLister, Target};
use crate::manifest;
use crate::ui::{select_item, Interaction};
use crate::utils::{format_address, format_size};
use crate::{log_error, log_info, log_warn};

const MODULE: &str = "operations";

/// Options of the manifest flash flow
#[derive(Debug, Clone, Default)]
pub struct FlashOptions {
    pub selection: SelectionArgs,
    pub port: Option<String>,
    pub redownload: bool,
    /// Fetch and plan, but do not program
    pub dry_run: bool,
}

/// How an operation ended when it did not fail outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// Dry run: artifacts are cached, nothing was written
    Planned(FlashPlan),
    /// The user declined a confirmation
    Declined,
    /// The programmer failed; the session stays usable
    ProgrammerFailed(String),
}

/// Artifact source that asks the user about undersized payloads and
/// retryable failures
struct SessionSource<'f, 'u> {
    fetcher: Fetcher<'f>,
    ui: &'u mut dyn Interaction,
}

impl ArtifactSource for SessionSource<'_, '_> {
    fn fetch(&mut self, request: &ArtifactRequest) -> Result<PathBuf> {
        loop {
            let result = {
                let ui = &mut *self.ui;
                self.fetcher.fetch_with(request, &mut |path, size| {
                    ui.confirm(
                        &format!(
                            "{} is only {} bytes and may be incomplete. Use it anyway?",
                            path.display(),
                            size
                        ),
                        false,
                    )
                })
            };

            match result {
                Err(e) if e.is_retryable() => {
                    log_warn!(MODULE, "Fetching {} failed: {}", request.role, e);
                    println!("{}", e);
                    if !self.ui.confirm("Retry the download?", false) {
                        return Err(e);
                    }
                }
                other => return other,
            }
        }
    }
}

/// Use the given port, else pick one of the detected ports. Typing a port
/// is offered as the last choice.
fn resolve_port(
    ui: &mut dyn Interaction,
    ports: &dyn PortLister,
    port: Option<&str>,
) -> Result<String> {
    if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(port.to_string());
    }

    let detected = ports.list_ports()?;
    if detected.is_empty() {
        log_error!(MODULE, "No serial port detected");
        return Err(Error::NoSerialPorts);
    }

    let mut choices: Vec<Option<PortInfo>> = detected.into_iter().map(Some).collect();
    choices.push(None);
    let picked = select_item(ui, "Serial ports:", &choices, 0, |_, c| match c {
        Some(port) => port.label(),
        None => "Enter a port manually".to_string(),
    })?;
    if let Some(port) = picked {
        log_info!(MODULE, "Selected serial port {}", port.device);
        return Ok(port.device.clone());
    }

    loop {
        let answer = ui.input("Serial port (e.g. /dev/ttyUSB0 or COM3)")?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

pub fn print_plan(plan: &FlashPlan) {
    println!("Flash plan:");
    for entry in plan.entries() {
        let size = std::fs::metadata(&entry.path).map(|m| m.len()).unwrap_or(0);
        println!(
            "  {:>8}  {:<11} {} ({})",
            format_address(entry.address),
            entry.role.as_str(),
            entry.path.display(),
            format_size(size)
        );
    }
}

/// Map a programmer failure to an outcome; other errors propagate
fn programmer_outcome(result: Result<()>) -> Result<Outcome> {
    let err = match result {
        Ok(()) => return Ok(Outcome::Completed),
        Err(err) => err,
    };

    match err {
        Error::DeviceProgrammerFailed(ref message) => {
            log_error!(MODULE, "{}", err);
            println!("{}", err);
            if let Some(hint) = err.hint() {
                println!("{}", hint);
            }
            Ok(Outcome::ProgrammerFailed(message.clone()))
        }
        _ => Err(err),
    }
}

fn program(session: &mut Session<'_>, port: &str, plan: &FlashPlan) -> Result<Outcome> {
    let request = FlashRequest::new(session.config, port, plan);
    log_info!(
        MODULE,
        "Flashing {} segment(s) to {} on {}",
        plan.len(),
        request.target.chip,
        port
    );
    let outcome = programmer_outcome(session.programmer.write_flash(&request))?;
    if outcome == Outcome::Completed {
        log_info!(MODULE, "Flash completed on {}", port);
        println!("Flash completed.");
    }
    Ok(outcome)
}

/// Manifest flow: select, fetch, plan and program
pub fn flash_from_manifest(session: &mut Session<'_>, options: &FlashOptions) -> Result<Outcome> {
    let config = session.config;
    let manifest = manifest::load(&config.manifest, session.transport)?;
    let selection = catalog::resolve(session.ui, &manifest, &options.selection)?;
    log_info!(
        MODULE,
        "Selected {} {} ({} channel)",
        selection.product.model,
        selection.version.version,
        selection.channel
    );

    let plan = {
        let mut source = SessionSource {
            fetcher: Fetcher::new(session.transport, config).force_redownload(options.redownload),
            ui: &mut *session.ui,
        };
        PlanBuilder::new(&config.layout).build(selection.product, selection.version, &mut source)?
    };
    print_plan(&plan);

    if options.dry_run {
        log_info!(MODULE, "Dry run, skipping the programmer");
        return Ok(Outcome::Planned(plan));
    }

    let port = resolve_port(session.ui, session.ports, options.port.as_deref())?;
    program(session, &port, &plan)
}

/// Flash one local image at the combined-image offset
pub fn flash_local(
    session: &mut Session<'_>,
    file: Option<&Path>,
    search_root: &Path,
    port: Option<&str>,
    dry_run: bool,
) -> Result<Outcome> {
    let path = resolve_local_image(session.ui, file, search_root)?;
    let plan = FlashPlan::single(session.config.layout.combined, path);
    print_plan(&plan);

    if dry_run {
        return Ok(Outcome::Planned(plan));
    }

    let port = resolve_port(session.ui, session.ports, port)?;
    program(session, &port, &plan)
}

/// Erase the whole flash after confirmation
pub fn erase(session: &mut Session<'_>, port: Option<&str>) -> Result<Outcome> {
    let port = resolve_port(session.ui, session.ports, port)?;
    let question = format!(
        "Erase the entire flash of the device on {}? This cannot be undone",
        port
    );
    if !session.ui.confirm(&question, false) {
        log_info!(MODULE, "Erase declined");
        return Ok(Outcome::Declined);
    }

    let target = Target::new(session.config, &port);
    let outcome = programmer_outcome(session.programmer.erase_flash(&target))?;
    if outcome == Outcome::Completed {
        println!("Flash erased.");
    }
    Ok(outcome)
}

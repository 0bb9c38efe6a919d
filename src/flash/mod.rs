//! Flash module
//!
//! Turns a flash plan into an invocation of the device programmer. The
//! serial handshake and byte transfer belong to the external programmer;
//! this module only describes what to write and where.

mod esptool;
mod plan;
mod ports;

pub use esptool::EsptoolProgrammer;
pub use plan::{FlashPlan, PlanBuilder};
pub use ports::{PortInfo, PortLister, SystemPorts};

#[cfg(test)]
pub use ports::testing;

use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;

/// Chip and serial link to program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub chip: String,
    pub port: String,
    pub baud_rate: u32,
}

impl Target {
    pub fn new(config: &Config, port: &str) -> Self {
        Self {
            chip: config.chip.clone(),
            port: port.to_string(),
            baud_rate: config.baud_rate,
        }
    }
}

/// Everything the programmer needs for one write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRequest {
    pub target: Target,
    pub flash_freq: String,
    /// `(hex address, file)` pairs in write order
    pub segments: Vec<(String, PathBuf)>,
    /// Compress data on the serial link
    pub compress: bool,
}

impl FlashRequest {
    pub fn new(config: &Config, port: &str, plan: &FlashPlan) -> Self {
        Self {
            target: Target::new(config, port),
            flash_freq: config.flash_freq.clone(),
            segments: plan.segments(),
            compress: config.compress_transfer,
        }
    }
}

/// External tool that writes and erases device flash
pub trait DeviceProgrammer {
    fn write_flash(&mut self, request: &FlashRequest) -> Result<()>;

    fn erase_flash(&mut self, target: &Target) -> Result<()>;
}

//! esptool backend
//!
//! Runs the esptool command line with inherited stdio so its progress and
//! prompts reach the user directly.

use std::process::Command;

use super::{DeviceProgrammer, FlashRequest, Target};
use crate::error::{Error, Result};
use crate::{log_error, log_info};

const MODULE: &str = "flash::esptool";

pub struct EsptoolProgrammer {
    program: String,
}

impl EsptoolProgrammer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn target_args(target: &Target) -> Vec<String> {
        vec![
            "--chip".to_string(),
            target.chip.clone(),
            "--port".to_string(),
            target.port.clone(),
            "--baud".to_string(),
            target.baud_rate.to_string(),
        ]
    }

    pub fn write_flash_args(request: &FlashRequest) -> Vec<String> {
        let mut args = Self::target_args(&request.target);
        args.push("write-flash".to_string());
        args.push("--flash-freq".to_string());
        args.push(request.flash_freq.clone());
        args.push(if request.compress {
            "--compress".to_string()
        } else {
            "--no-compress".to_string()
        });
        for (address, path) in &request.segments {
            args.push(address.clone());
            args.push(path.to_string_lossy().to_string());
        }
        args
    }

    pub fn erase_flash_args(target: &Target) -> Vec<String> {
        let mut args = Self::target_args(target);
        args.push("erase-flash".to_string());
        args
    }

    fn run(&self, args: &[String]) -> Result<()> {
        log_info!(MODULE, "Running {} {}", self.program, args.join(" "));

        let status = Command::new(&self.program).args(args).status().map_err(|e| {
            log_error!(MODULE, "Failed to start {}: {}", self.program, e);
            Error::DeviceProgrammerFailed(format!("failed to start {}: {}", self.program, e))
        })?;

        if !status.success() {
            log_error!(MODULE, "{} exited with {}", self.program, status);
            return Err(Error::DeviceProgrammerFailed(format!(
                "{} exited with {}",
                self.program, status
            )));
        }

        log_info!(MODULE, "{} finished successfully", self.program);
        Ok(())
    }
}

impl DeviceProgrammer for EsptoolProgrammer {
    fn write_flash(&mut self, request: &FlashRequest) -> Result<()> {
        self.run(&Self::write_flash_args(request))
    }

    fn erase_flash(&mut self, target: &Target) -> Result<()> {
        self.run(&Self::erase_flash_args(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn target() -> Target {
        Target {
            chip: "esp32".into(),
            port: "/dev/ttyUSB0".into(),
            baud_rate: 921_600,
        }
    }

    #[test]
    fn test_write_flash_args() {
        let request = FlashRequest {
            target: target(),
            flash_freq: "80m".into(),
            segments: vec![
                ("0x1000".into(), PathBuf::from("bootloader.bin")),
                ("0x10000".into(), PathBuf::from("firmware.bin")),
            ],
            compress: false,
        };
        assert_eq!(
            EsptoolProgrammer::write_flash_args(&request),
            [
                "--chip", "esp32", "--port", "/dev/ttyUSB0", "--baud", "921600", "write-flash",
                "--flash-freq", "80m", "--no-compress", "0x1000", "bootloader.bin", "0x10000",
                "firmware.bin",
            ]
        );
    }

    #[test]
    fn test_erase_flash_args() {
        assert_eq!(
            EsptoolProgrammer::erase_flash_args(&target()),
            ["--chip", "esp32", "--port", "/dev/ttyUSB0", "--baud", "921600", "erase-flash"]
        );
    }

    #[test]
    fn test_missing_program_is_programmer_failure() {
        let mut programmer = EsptoolProgrammer::new("firmware-recovery-no-such-esptool");
        let err = programmer.erase_flash(&target()).unwrap_err();
        assert!(matches!(err, Error::DeviceProgrammerFailed(_)));
    }
}

//! Serial port discovery
//!
//! Lists candidate ports for the device. Opening and driving the port is
//! left to the programmer.

use serialport::SerialPortType;

use crate::error::Result;
use crate::{log_debug, log_warn};

const MODULE: &str = "flash::ports";

/// One detected serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub device: String,
    pub description: String,
}

impl PortInfo {
    pub fn label(&self) -> String {
        format!("{} ({})", self.device, self.description)
    }
}

/// Source of detected serial ports
pub trait PortLister {
    fn list_ports(&self) -> Result<Vec<PortInfo>>;
}

/// Ports reported by the operating system
pub struct SystemPorts;

fn describe(device: &str, port_type: &SerialPortType) -> String {
    let description = match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| format!("USB {:04x}:{:04x}", usb.vid, usb.pid)),
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => String::new(),
    };

    if description.trim().is_empty() {
        device.to_string()
    } else {
        description
    }
}

impl PortLister for SystemPorts {
    fn list_ports(&self) -> Result<Vec<PortInfo>> {
        let ports = match serialport::available_ports() {
            Ok(ports) => ports,
            Err(e) => {
                // treated as nothing detected
                log_warn!(MODULE, "Serial port enumeration failed: {}", e);
                return Ok(Vec::new());
            }
        };

        let mut found: Vec<PortInfo> = ports
            .into_iter()
            .map(|p| PortInfo {
                description: describe(&p.port_name, &p.port_type),
                device: p.port_name,
            })
            .collect();
        found.sort_by(|a, b| a.device.cmp(&b.device));

        log_debug!(MODULE, "Detected {} serial port(s)", found.len());
        Ok(found)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_shows_device_and_description() {
        let port = PortInfo {
            device: "/dev/ttyUSB0".into(),
            description: "CP2102 USB to UART".into(),
        };
        assert_eq!(port.label(), "/dev/ttyUSB0 (CP2102 USB to UART)");
    }

    #[test]
    fn test_describe_falls_back_to_device() {
        assert_eq!(describe("COM3", &SerialPortType::Unknown), "COM3");
        assert_eq!(describe("/dev/ttyS0", &SerialPortType::PciPort), "PCI");
    }
}

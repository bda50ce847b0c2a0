//! Serial port handling
//!
//! Enumerates the attached devices and opens the controller line as an async byte stream.

use serialport::{SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::ProtocolError;

/// Information about an available serial port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyUSB0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Product name (if available)
    pub product: Option<String>,
}

impl PortInfo {
    /// Port known only by its device name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vid: None,
            pid: None,
            product: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                product: usb.product,
            },
            _ => Self::named(info.port_name),
        }
    }
}

impl std::fmt::Display for PortInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.product, self.vid, self.pid) {
            (Some(product), Some(vid), Some(pid)) => {
                write!(f, "{} ({}, {:04x}:{:04x})", self.name, product, vid, pid)
            }
            (None, Some(vid), Some(pid)) => write!(f, "{} ({:04x}:{:04x})", self.name, vid, pid),
            _ => write!(f, "{}", self.name),
        }
    }
}

/// Sort key so that ttyACM* ports come first, then ttyUSB*, then everything else.
/// Numeric suffixes sort numerically.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List all available serial ports in deterministic order.
///
/// The bridge picks the first entry, so the ordering matters.
pub fn list_ports() -> Result<Vec<PortInfo>, ProtocolError> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    let available =
        serialport::available_ports().map_err(|e| ProtocolError::SerialError(e.to_string()))?;
    for info in available {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // Linux: udev sometimes lags behind freshly plugged adapters
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone()).or_insert_with(|| PortInfo::named(full));
                }
            }
        }
    }

    Ok(sort_ports(map.into_values().collect()))
}

fn sort_ports(mut ports: Vec<PortInfo>) -> Vec<PortInfo> {
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

/// Open a serial port as an async stream, 8N1 without flow control
pub fn open_port(name: &str, baud_rate: u32) -> Result<SerialStream, ProtocolError> {
    tokio_serial::new(name, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| ProtocolError::SerialError(format!("{}: {}", name, e)))
}

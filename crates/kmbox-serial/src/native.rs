//! Cross-platform backend on the `serialport` crate.

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::time::Duration;

use serialport::{SerialPortInfo, SerialPortType};
use tracing::debug;

use crate::config::{DataBits, LineConfig, Parity, StopBits, TimeoutPolicy, DEFAULT_BAUD_RATE};
use crate::error::{Result, SerialError};
use crate::traits::{DeviceEntry, DeviceRegistry, PortHandle, SerialDriver};

/// Timeout applied at open time, before a [`TimeoutPolicy`] is set.
const OPEN_TIMEOUT: Duration = Duration::from_millis(50);

/// WCH vendor id and the CH340/CH341 serial product ids.
const WCH_VID: u16 = 0x1a86;
const CH340_PIDS: [u16; 2] = [0x7523, 0x5523];

/// `serialport`-backed registry and driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl NativeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl SerialDriver for NativeBackend {
    type Port = NativePort;

    fn open(&self, path: &str) -> Result<NativePort> {
        // serialport opens exclusively on Unix (TIOCEXCL) and without sharing on Windows.
        let inner = serialport::new(path, DEFAULT_BAUD_RATE)
            .timeout(OPEN_TIMEOUT)
            .open()
            .map_err(|err| SerialError::Open {
                path: path.to_string(),
                source: io::Error::from(err),
            })?;
        debug!(%path, "opened serial port");
        Ok(NativePort {
            inner,
            write_policy: None,
            applied_timeout: OPEN_TIMEOUT,
        })
    }
}

impl DeviceRegistry for NativeBackend {
    fn scan(&self, visit: &mut dyn FnMut(&dyn DeviceEntry) -> ControlFlow<()>) -> Result<()> {
        let ports = serialport::available_ports()
            .map_err(|err| SerialError::Enumerate(io::Error::from(err)))?;
        for info in ports {
            if visit(&NativeDevice { info }).is_break() {
                break;
            }
        }
        Ok(())
    }
}

struct NativeDevice {
    info: SerialPortInfo,
}

impl DeviceEntry for NativeDevice {
    fn friendly_name(&self) -> Option<String> {
        match &self.info.port_type {
            SerialPortType::UsbPort(usb) => Some(usb_friendly_name(usb, &self.info.port_name)),
            SerialPortType::PciPort => Some(format!("PCI Serial Port ({})", self.info.port_name)),
            SerialPortType::BluetoothPort => {
                Some(format!("Bluetooth Serial Port ({})", self.info.port_name))
            }
            SerialPortType::Unknown => None,
        }
    }

    fn port_name(&self) -> Option<String> {
        Some(self.info.port_name.clone()).filter(|name| !name.is_empty())
    }
}

/// Display name in the shape the Windows driver reports.
///
/// CH340 firmware strings vary ("USB Serial", "USB2.0-Ser!", none at all), so
/// WCH bridges are named from their ids the way the WCH driver names them.
pub fn usb_friendly_name(usb: &serialport::UsbPortInfo, port: &str) -> String {
    if usb.vid == WCH_VID && CH340_PIDS.contains(&usb.pid) {
        return format!("USB-SERIAL CH340 ({port})");
    }
    match usb.product.as_deref().or(usb.manufacturer.as_deref()) {
        Some(name) => format!("{name} ({port})"),
        None => format!("USB Serial Device ({port})"),
    }
}

/// Open port owned through `serialport`. Released on drop.
pub struct NativePort {
    inner: Box<dyn serialport::SerialPort>,
    write_policy: Option<TimeoutPolicy>,
    applied_timeout: Duration,
}

impl NativePort {
    /// `serialport` exposes one timeout; re-arm it per write so the
    /// constant-plus-per-byte budget holds for each payload length.
    fn arm_write_timeout(&mut self, len: usize) -> io::Result<()> {
        let Some(policy) = self.write_policy else {
            return Ok(());
        };
        let deadline = policy.write_deadline(len);
        if deadline != self.applied_timeout {
            self.inner.set_timeout(deadline).map_err(io::Error::from)?;
            self.applied_timeout = deadline;
        }
        Ok(())
    }
}

impl PortHandle for NativePort {
    fn line_config(&self) -> Result<LineConfig> {
        let data_bits = match self.inner.data_bits()? {
            serialport::DataBits::Five => DataBits::Five,
            serialport::DataBits::Six => DataBits::Six,
            serialport::DataBits::Seven => DataBits::Seven,
            serialport::DataBits::Eight => DataBits::Eight,
        };
        let stop_bits = match self.inner.stop_bits()? {
            serialport::StopBits::One => StopBits::One,
            serialport::StopBits::Two => StopBits::Two,
        };
        let parity = match self.inner.parity()? {
            serialport::Parity::None => Parity::None,
            serialport::Parity::Odd => Parity::Odd,
            serialport::Parity::Even => Parity::Even,
        };
        Ok(LineConfig {
            baud_rate: self.inner.baud_rate()?,
            data_bits,
            stop_bits,
            parity,
        })
    }

    fn set_line_config(&mut self, config: &LineConfig) -> Result<()> {
        self.inner.set_baud_rate(config.baud_rate)?;
        self.inner.set_data_bits(match config.data_bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        })?;
        self.inner.set_stop_bits(match config.stop_bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        })?;
        self.inner.set_parity(match config.parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        })?;
        Ok(())
    }

    fn set_timeouts(&mut self, policy: &TimeoutPolicy) -> Result<()> {
        let read = policy.read_deadline(0);
        self.inner.set_timeout(read)?;
        self.applied_timeout = read;
        self.write_policy = Some(*policy);
        Ok(())
    }
}

impl Write for NativePort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm_write_timeout(buf.len())?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl std::fmt::Debug for NativePort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativePort")
            .field("name", &self.inner.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb_info(
        port: &str,
        (vid, pid): (u16, u16),
        product: Option<&str>,
        manufacturer: Option<&str>,
    ) -> SerialPortInfo {
        SerialPortInfo {
            port_name: port.to_string(),
            port_type: SerialPortType::UsbPort(serialport::UsbPortInfo {
                vid,
                pid,
                serial_number: None,
                manufacturer: manufacturer.map(str::to_string),
                product: product.map(str::to_string),
            }),
        }
    }

    const FTDI: (u16, u16) = (0x0403, 0x6001);

    #[test]
    fn usb_friendly_name_prefers_product() {
        let dev = NativeDevice {
            info: usb_info("COM4", FTDI, Some("FT232R USB UART"), Some("FTDI")),
        };
        assert_eq!(dev.friendly_name().as_deref(), Some("FT232R USB UART (COM4)"));
        assert_eq!(dev.port_name().as_deref(), Some("COM4"));
    }

    #[test]
    fn usb_friendly_name_falls_back_to_manufacturer() {
        let dev = NativeDevice {
            info: usb_info("/dev/ttyUSB0", FTDI, None, Some("FTDI")),
        };
        assert_eq!(dev.friendly_name().as_deref(), Some("FTDI (/dev/ttyUSB0)"));
    }

    #[test]
    fn usb_without_strings_still_has_a_name() {
        let dev = NativeDevice {
            info: usb_info("/dev/ttyACM0", (0x2341, 0x0043), None, None),
        };
        assert_eq!(
            dev.friendly_name().as_deref(),
            Some("USB Serial Device (/dev/ttyACM0)")
        );
    }

    #[test]
    fn ch340_is_named_from_its_ids() {
        for product in [Some("USB Serial"), Some("USB2.0-Ser!"), Some("USB2.0-Serial"), None] {
            for pid in CH340_PIDS {
                let dev = NativeDevice {
                    info: usb_info("/dev/ttyUSB0", (WCH_VID, pid), product, None),
                };
                let name = dev.friendly_name().expect("CH340 must have a name");
                assert_eq!(name, "USB-SERIAL CH340 (/dev/ttyUSB0)");
                assert!(name.contains("CH340") && name.contains("USB-SERIAL"));
            }
        }
    }

    #[test]
    fn unknown_port_has_no_friendly_name() {
        let dev = NativeDevice {
            info: SerialPortInfo {
                port_name: "/dev/ttyS0".to_string(),
                port_type: SerialPortType::Unknown,
            },
        };
        assert!(dev.friendly_name().is_none());
    }

    #[test]
    fn open_missing_port_reports_path() {
        let err = NativeBackend::new()
            .open("/dev/kmbox-does-not-exist")
            .expect_err("missing port must not open");
        match err {
            SerialError::Open { path, .. } => assert_eq!(path, "/dev/kmbox-does-not-exist"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

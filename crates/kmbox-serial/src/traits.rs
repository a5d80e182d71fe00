use std::io::Write;
use std::ops::ControlFlow;

use crate::config::{LineConfig, TimeoutPolicy};
use crate::error::Result;

/// An exclusively owned, open serial port.
///
/// Dropping the handle releases the underlying OS resource. Implementations
/// must release exactly once, on every path.
pub trait PortHandle: Write {
    /// Read the line configuration currently in effect.
    fn line_config(&self) -> Result<LineConfig>;

    /// Apply baud rate and framing.
    fn set_line_config(&mut self, config: &LineConfig) -> Result<()>;

    /// Apply read/write timeouts.
    fn set_timeouts(&mut self, policy: &TimeoutPolicy) -> Result<()>;
}

/// Opens serial ports by platform path.
pub trait SerialDriver {
    type Port: PortHandle;

    /// Open `path` for exclusive read/write access.
    fn open(&self, path: &str) -> Result<Self::Port>;
}

/// One device reported by a [`DeviceRegistry`] scan.
///
/// Lookups are lazy: a registry may defer the port-name query until asked.
pub trait DeviceEntry {
    /// Display name from the device registry, if it could be read.
    fn friendly_name(&self) -> Option<String>;

    /// Bound communication port name (`COM5`, `/dev/ttyUSB0`), if any.
    fn port_name(&self) -> Option<String>;
}

/// Enumerates devices of the host's communication-ports class.
pub trait DeviceRegistry {
    /// Visit every present device in enumeration order until `visit` breaks.
    fn scan(&self, visit: &mut dyn FnMut(&dyn DeviceEntry) -> ControlFlow<()>) -> Result<()>;
}

//! In-memory registry and driver for tests.
//!
//! [`MockBackend`] records everything a caller does to it: which paths are
//! currently open, every byte written, flushes, and the last applied line
//! configuration and timeouts. Failure switches let tests drive each error
//! path without hardware.
//!
//! ```ignore
//! let backend = MockBackend::new().with_device(MockDevice::new("USB-SERIAL CH340 (COM5)", "COM5"));
//! let port = backend.open(r"\\.\COM5")?;
//! assert!(backend.is_open(r"\\.\COM5"));
//! drop(port);
//! assert_eq!(backend.close_count(), 1);
//! ```

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::{LineConfig, TimeoutPolicy};
use crate::error::{Result, SerialError};
use crate::path::device_path;
use crate::traits::{DeviceEntry, DeviceRegistry, PortHandle, SerialDriver};

/// Windows `ERROR_ACCESS_DENIED`, reported for ports that are already open.
pub const ACCESS_DENIED: i32 = 5;
/// Windows `ERROR_FILE_NOT_FOUND`, reported for unknown ports.
pub const FILE_NOT_FOUND: i32 = 2;

/// A registry entry served by [`MockBackend`].
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    pub friendly_name: Option<String>,
    pub port_name: Option<String>,
}

impl MockDevice {
    pub fn new(friendly_name: &str, port_name: &str) -> Self {
        Self {
            friendly_name: Some(friendly_name.to_string()),
            port_name: Some(port_name.to_string()),
        }
    }

    /// A device whose friendly name cannot be read.
    pub fn unnamed(port_name: &str) -> Self {
        Self {
            friendly_name: None,
            port_name: Some(port_name.to_string()),
        }
    }

    /// A device with no bound port name.
    pub fn without_port(friendly_name: &str) -> Self {
        Self {
            friendly_name: Some(friendly_name.to_string()),
            port_name: None,
        }
    }
}

/// Failure switches for [`MockBackend`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MockFailures {
    pub enumerate: bool,
    pub read_config: bool,
    pub write_config: bool,
    pub timeouts: bool,
    pub write: bool,
}

#[derive(Debug)]
struct MockState {
    devices: Vec<MockDevice>,
    /// Paths that exist and may be opened.
    present: BTreeSet<String>,
    open: BTreeSet<String>,
    open_attempts: Vec<String>,
    port_name_lookups: Vec<String>,
    closes: usize,
    written: Vec<u8>,
    flushes: usize,
    initial_config: LineConfig,
    line_config: Option<LineConfig>,
    timeouts: Option<TimeoutPolicy>,
    failures: MockFailures,
}

/// Shared-state fake implementing [`DeviceRegistry`] and [`SerialDriver`].
///
/// Clones share state, so a test can keep one clone for assertions while the
/// code under test owns another.
#[derive(Debug, Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                devices: Vec::new(),
                present: BTreeSet::new(),
                open: BTreeSet::new(),
                open_attempts: Vec::new(),
                port_name_lookups: Vec::new(),
                closes: 0,
                written: Vec::new(),
                flushes: 0,
                initial_config: LineConfig::eight_n_one(9_600),
                line_config: None,
                timeouts: None,
                failures: MockFailures::default(),
            })),
        }
    }

    /// Register a device; its port (if any) becomes openable.
    pub fn with_device(self, device: MockDevice) -> Self {
        {
            let mut state = self.lock();
            if let Some(port) = &device.port_name {
                state.present.insert(device_path(port));
            }
            state.devices.push(device);
        }
        self
    }

    /// Make a port openable without listing it in the registry.
    pub fn with_port(self, port: &str) -> Self {
        self.lock().present.insert(device_path(port));
        self
    }

    pub fn with_failures(self, failures: MockFailures) -> Self {
        self.lock().failures = failures;
        self
    }

    pub fn set_failures(&self, failures: MockFailures) {
        self.lock().failures = failures;
    }

    /// Simulate another process holding `port` open.
    pub fn hold_open(&self, port: &str) {
        self.lock().open.insert(device_path(port));
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.lock().open.contains(path)
    }

    pub fn open_count(&self) -> usize {
        self.lock().open.len()
    }

    pub fn open_attempts(&self) -> Vec<String> {
        self.lock().open_attempts.clone()
    }

    /// Port names resolved through [`DeviceEntry::port_name`], in order.
    pub fn port_name_lookups(&self) -> Vec<String> {
        self.lock().port_name_lookups.clone()
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flushes
    }

    pub fn applied_line_config(&self) -> Option<LineConfig> {
        self.lock().line_config
    }

    pub fn applied_timeouts(&self) -> Option<TimeoutPolicy> {
        self.lock().timeouts
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SerialDriver for MockBackend {
    type Port = MockPort;

    fn open(&self, path: &str) -> Result<MockPort> {
        let mut state = self.lock();
        state.open_attempts.push(path.to_string());
        let code = if !state.present.contains(path) {
            Some(FILE_NOT_FOUND)
        } else if state.open.contains(path) {
            Some(ACCESS_DENIED)
        } else {
            None
        };
        if let Some(code) = code {
            return Err(SerialError::Open {
                path: path.to_string(),
                source: io::Error::from_raw_os_error(code),
            });
        }
        state.open.insert(path.to_string());
        Ok(MockPort {
            path: path.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

impl DeviceRegistry for MockBackend {
    fn scan(&self, visit: &mut dyn FnMut(&dyn DeviceEntry) -> ControlFlow<()>) -> Result<()> {
        let devices = {
            let state = self.lock();
            if state.failures.enumerate {
                return Err(SerialError::Enumerate(io::Error::other(
                    "mock enumeration failure",
                )));
            }
            state.devices.clone()
        };
        for device in devices {
            let entry = MockEntry {
                device,
                backend: self,
            };
            if visit(&entry).is_break() {
                break;
            }
        }
        Ok(())
    }
}

struct MockEntry<'a> {
    device: MockDevice,
    backend: &'a MockBackend,
}

impl DeviceEntry for MockEntry<'_> {
    fn friendly_name(&self) -> Option<String> {
        self.device.friendly_name.clone()
    }

    fn port_name(&self) -> Option<String> {
        let name = self.device.port_name.clone()?;
        self.backend.lock().port_name_lookups.push(name.clone());
        Some(name).filter(|name| !name.is_empty())
    }
}

/// Port handle returned by [`MockBackend`]. Marks its path closed on drop.
#[derive(Debug)]
pub struct MockPort {
    path: String,
    state: Arc<Mutex<MockState>>,
}

impl MockPort {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PortHandle for MockPort {
    fn line_config(&self) -> Result<LineConfig> {
        let state = self.lock();
        if state.failures.read_config {
            return Err(io::Error::other("mock GetCommState failure").into());
        }
        Ok(state.line_config.unwrap_or(state.initial_config))
    }

    fn set_line_config(&mut self, config: &LineConfig) -> Result<()> {
        let mut state = self.lock();
        if state.failures.write_config {
            return Err(io::Error::other("mock SetCommState failure").into());
        }
        state.line_config = Some(*config);
        Ok(())
    }

    fn set_timeouts(&mut self, policy: &TimeoutPolicy) -> Result<()> {
        let mut state = self.lock();
        if state.failures.timeouts {
            return Err(io::Error::other("mock SetCommTimeouts failure").into());
        }
        state.timeouts = Some(*policy);
        Ok(())
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.failures.write {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "mock write timeout"));
        }
        state.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock().flushes += 1;
        Ok(())
    }
}

impl Drop for MockPort {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.open.remove(&self.path);
        state.closes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_open_of_same_path_is_denied() {
        let backend = MockBackend::new().with_port("COM5");
        let path = device_path("COM5");

        let first = backend.open(&path).expect("first open should succeed");
        let err = backend.open(&path).expect_err("second open must fail");
        assert_eq!(err.raw_os_error(), Some(ACCESS_DENIED));

        drop(first);
        assert!(!backend.is_open(&path));
        assert_eq!(backend.close_count(), 1);
        backend.open(&path).expect("reopen after release should succeed");
    }

    #[test]
    fn unknown_path_is_not_found() {
        let backend = MockBackend::new();
        let err = backend.open(&device_path("COM9")).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(FILE_NOT_FOUND));
    }

    #[test]
    fn scan_stops_when_visitor_breaks() {
        let backend = MockBackend::new()
            .with_device(MockDevice::new("A", "COM1"))
            .with_device(MockDevice::new("B", "COM2"));
        let mut seen = Vec::new();
        backend
            .scan(&mut |entry| {
                seen.push(entry.friendly_name());
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(seen, vec![Some("A".to_string())]);
    }
}

//! Serial port capabilities for KMBox-class devices.
//!
//! This is the lowest layer of kmbox. It models the two host facilities the
//! upper layers depend on:
//! - a device registry that enumerates communication ports with their
//!   friendly names and bound port names ([`DeviceRegistry`])
//! - a driver that opens a port exclusively and yields a handle supporting
//!   line configuration, timeouts and blocking writes ([`SerialDriver`])
//!
//! Two backends implement both traits:
//! - [`native::NativeBackend`] on top of the `serialport` crate (all platforms)
//! - [`win32::Win32Backend`] on SetupAPI and the Win32 comm API (Windows only)
//!
//! [`SystemBackend`] names the default backend for the target platform.

pub mod config;
pub mod error;
pub mod native;
pub mod path;
pub mod traits;

#[cfg(windows)]
pub mod win32;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::{DataBits, LineConfig, Parity, StopBits, TimeoutPolicy, DEFAULT_BAUD_RATE};
pub use error::{Result, SerialError};
pub use path::device_path;
pub use traits::{DeviceEntry, DeviceRegistry, PortHandle, SerialDriver};

pub use native::NativeBackend;
#[cfg(windows)]
pub use win32::Win32Backend;

/// Default backend for the target platform.
#[cfg(windows)]
pub type SystemBackend = win32::Win32Backend;

/// Default backend for the target platform.
#[cfg(not(windows))]
pub type SystemBackend = native::NativeBackend;

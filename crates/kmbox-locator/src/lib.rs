//! Discovery of KMBox serial devices.
//!
//! A device is a candidate when its friendly name contains one of the
//! configured tokens (`"CH340"` or `"USB-SERIAL"` by default). CH340 clones
//! report slightly different display strings across driver versions, so the
//! match is a case-sensitive substring test, not an exact one.
//!
//! A candidate is only returned after its port has been opened and closed
//! again. The OS lists ports that another process holds open; those are
//! skipped here so the failure never reaches `connect`.

pub mod config;
pub mod locator;

pub use config::{LocatorConfig, DEFAULT_NAME_TOKENS};
pub use locator::{find_device, is_candidate, list_devices, locate, CandidateDevice, DeviceListing};

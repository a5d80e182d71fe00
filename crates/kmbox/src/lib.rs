//! KMBox device discovery and serial command sessions.
//!
//! kmbox drives "KMBox"-class HID emulation boxes that enumerate as CH340
//! USB-to-serial adapters. It finds the device without being told the port,
//! then writes `km.move(dx,dy)` / `km.click(n)` command lines to it.
//!
//! ```no_run
//! use kmbox::{ConnectOptions, Session};
//!
//! let mut session = Session::open(&ConnectOptions::new())?;
//! session.move_by(100, 0);
//! session.left_click();
//! session.close();
//! # Ok::<(), kmbox::ConnectError>(())
//! ```
//!
//! # Crate Structure
//!
//! - [`serial`] — Port enumeration, line configuration and platform backends
//! - [`locator`] — CH340 discovery by friendly name with open verification
//! - [`session`] — Connection lifecycle and `km.*` command framing

/// Re-export serial types.
pub mod serial {
    pub use kmbox_serial::*;
}

/// Re-export locator types.
pub mod locator {
    pub use kmbox_locator::*;
}

/// Re-export session types.
pub mod session {
    pub use kmbox_session::*;
}

pub use kmbox_locator::{find_device, LocatorConfig};
pub use kmbox_session::{
    Button, Command, ConnectError, ConnectOptions, FlushPolicy, Session, TimeoutMode,
};

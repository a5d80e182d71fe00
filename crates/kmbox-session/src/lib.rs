//! Connection to a KMBox device and its `km.*` line protocol.
//!
//! A [`Session`] is either disconnected or owns exactly one open port.
//! Commands are ASCII lines terminated by `\n`, written fire-and-forget:
//!
//! ```text
//! km.move(<dx>,<dy>)
//! km.click(0)   left
//! km.click(1)   right
//! km.click(2)   middle
//! ```
//!
//! Commands on a disconnected session are no-ops, and write failures on a
//! connected one are logged rather than returned.

pub mod command;
pub mod error;
pub mod options;
pub mod session;

pub use command::{encode_command, Button, Command, ParseCommandError, LINE_TERMINATOR};
pub use error::{ConnectError, Result};
pub use options::{ConnectOptions, FlushPolicy, TimeoutMode};
pub use session::Session;

use std::io::Write;

use bytes::BytesMut;
use kmbox_locator::find_device;
use kmbox_serial::{
    device_path, DeviceRegistry, LineConfig, PortHandle, SerialDriver, SystemBackend,
    TimeoutPolicy,
};
use tracing::{debug, info, warn};

use crate::command::{encode_command, Button, Command};
use crate::error::{ConnectError, Result};
use crate::options::{ConnectOptions, FlushPolicy, TimeoutMode};

/// Longest encoded command (`km.move(-2147483648,-2147483648)\n`) fits comfortably.
const COMMAND_BUFFER_CAPACITY: usize = 64;

/// Connection to a KMBox device.
///
/// A session is either disconnected or owns exactly one open port. The port
/// is released by [`close`](Self::close) or when the session is dropped,
/// whichever comes first. Sessions are not shared: every operation that
/// touches the port takes `&mut self`.
pub struct Session<B = SystemBackend>
where
    B: SerialDriver + DeviceRegistry,
{
    backend: B,
    link: Option<Link<B::Port>>,
    debug: bool,
    flush: FlushPolicy,
    buf: BytesMut,
    write_failures: u64,
}

/// The open port plus what was applied to it.
struct Link<P> {
    port: P,
    port_name: String,
    line: LineConfig,
    timeouts: Option<TimeoutPolicy>,
}

impl Session<SystemBackend> {
    /// Disconnected session on the platform's default backend.
    pub fn new() -> Self {
        Self::with_backend(SystemBackend::default())
    }

    /// Create a session on the default backend and connect it.
    pub fn open(options: &ConnectOptions) -> Result<Self> {
        let mut session = Self::new();
        session.connect(options)?;
        Ok(session)
    }
}

impl Default for Session<SystemBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Session<B>
where
    B: SerialDriver + DeviceRegistry,
{
    /// Disconnected session on an explicit backend.
    pub fn with_backend(backend: B) -> Self {
        Self {
            backend,
            link: None,
            debug: false,
            flush: FlushPolicy::default(),
            buf: BytesMut::with_capacity(COMMAND_BUFFER_CAPACITY),
            write_failures: 0,
        }
    }

    /// Open and configure a port.
    ///
    /// Without an explicit port, discovery picks the first verified CH340
    /// candidate. An already connected session is closed first, so a
    /// reconnect behaves like a brand-new session. On error the session is
    /// disconnected and no handle stays open.
    pub fn connect(&mut self, options: &ConnectOptions) -> Result<()> {
        self.close();
        self.debug = options.debug;
        self.flush = options.flush;

        let port_name = match options.explicit_port() {
            Some(port) => port.to_string(),
            None => {
                if self.debug {
                    info!("searching for CH340 device");
                }
                let locator = options
                    .locator
                    .clone()
                    .with_debug(options.debug || options.locator.debug);
                find_device(&self.backend, &self.backend, &locator)
                    .ok_or(ConnectError::DeviceNotFound)?
            }
        };

        let path = device_path(&port_name);
        if self.debug {
            debug!(%path, "attempting to open");
        }
        let mut port = self
            .backend
            .open(&path)
            .map_err(|source| ConnectError::OpenFailed {
                port: port_name.clone(),
                code: source.raw_os_error(),
                source,
            })?;

        // From here on `port` is released by drop on every early return.
        let previous = port
            .line_config()
            .map_err(|source| ConnectError::ConfigReadFailed {
                port: port_name.clone(),
                source,
            })?;
        if self.debug {
            debug!(port = %port_name, line = %previous, "current line configuration");
        }

        let line = LineConfig::eight_n_one(options.baud_rate);
        port.set_line_config(&line)
            .map_err(|source| ConnectError::ConfigWriteFailed {
                port: port_name.clone(),
                source,
            })?;

        let timeouts = match port.set_timeouts(&options.timeouts) {
            Ok(()) => Some(options.timeouts),
            Err(source) => match options.timeout_mode {
                TimeoutMode::BestEffort => {
                    warn!(port = %port_name, err = %source, "failed to set timeouts; continuing");
                    None
                }
                TimeoutMode::Strict => {
                    return Err(ConnectError::TimeoutConfigFailed {
                        port: port_name,
                        source,
                    })
                }
            },
        };

        info!(port = %port_name, line = %line, "connected");
        self.link = Some(Link {
            port,
            port_name,
            line,
            timeouts,
        });
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    /// Name of the connected port.
    pub fn port_name(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.port_name.as_str())
    }

    /// Line configuration applied at connect.
    pub fn line_config(&self) -> Option<LineConfig> {
        self.link.as_ref().map(|link| link.line)
    }

    /// Timeouts applied at connect; `None` when disconnected or when a
    /// best-effort attempt failed.
    pub fn timeouts(&self) -> Option<TimeoutPolicy> {
        self.link.as_ref().and_then(|link| link.timeouts)
    }

    /// Command writes that failed since the session was created.
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// Write one command line. No-op when disconnected; write errors are logged.
    pub fn send(&mut self, command: Command) {
        let flush = self.flush.should_flush(self.debug);
        let Some(link) = self.link.as_mut() else {
            return;
        };

        self.buf.clear();
        encode_command(&command, &mut self.buf);

        if let Err(err) = link.port.write_all(&self.buf) {
            self.write_failures += 1;
            warn!(port = %link.port_name, %command, %err, "command write failed");
            return;
        }
        if flush {
            if let Err(err) = link.port.flush() {
                self.write_failures += 1;
                warn!(port = %link.port_name, %command, %err, "flush failed");
            }
        }
    }

    /// Relative cursor move (`km.move(dx,dy)`).
    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.send(Command::Move { dx, dy });
    }

    pub fn click(&mut self, button: Button) {
        self.send(Command::Click(button));
    }

    pub fn left_click(&mut self) {
        self.click(Button::Left);
    }

    pub fn right_click(&mut self) {
        self.click(Button::Right);
    }

    pub fn middle_click(&mut self) {
        self.click(Button::Middle);
    }

    /// Release the port. Idempotent.
    pub fn close(&mut self) {
        if let Some(link) = self.link.take() {
            let Link { port, port_name, .. } = link;
            drop(port);
            if self.debug {
                info!(port = %port_name, "connection closed");
            } else {
                debug!(port = %port_name, "connection closed");
            }
        }
    }
}

impl<B> Drop for Session<B>
where
    B: SerialDriver + DeviceRegistry,
{
    fn drop(&mut self) {
        self.close();
    }
}

impl<B> std::fmt::Debug for Session<B>
where
    B: SerialDriver + DeviceRegistry,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("port", &self.port_name())
            .field("connected", &self.is_connected())
            .field("debug", &self.debug)
            .finish()
    }
}

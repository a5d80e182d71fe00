use kmbox_serial::SerialError;

/// Errors surfaced by [`Session::connect`](crate::Session::connect).
///
/// Every variant leaves the session disconnected with no open handle.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Discovery finished without a verified candidate.
    #[error("no compatible CH340 device found")]
    DeviceNotFound,

    /// The port could not be opened exclusively.
    #[error("failed to open port {port}: {source}")]
    OpenFailed {
        port: String,
        /// Platform error code, when the OS reported one.
        code: Option<i32>,
        source: SerialError,
    },

    /// The current line configuration could not be read.
    #[error("failed to get serial parameters on {port}: {source}")]
    ConfigReadFailed { port: String, source: SerialError },

    /// Baud rate or framing could not be applied.
    #[error("failed to set serial parameters on {port}: {source}")]
    ConfigWriteFailed { port: String, source: SerialError },

    /// Timeouts could not be applied and [`TimeoutMode::Strict`](crate::TimeoutMode::Strict) is set.
    #[error("failed to set timeouts on {port}: {source}")]
    TimeoutConfigFailed { port: String, source: SerialError },
}

impl ConnectError {
    /// Port the failing attempt targeted, if one had been resolved.
    pub fn port(&self) -> Option<&str> {
        match self {
            ConnectError::DeviceNotFound => None,
            ConnectError::OpenFailed { port, .. }
            | ConnectError::ConfigReadFailed { port, .. }
            | ConnectError::ConfigWriteFailed { port, .. }
            | ConnectError::TimeoutConfigFailed { port, .. } => Some(port),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectError>;

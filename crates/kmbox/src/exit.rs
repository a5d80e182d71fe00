use std::fmt;
use std::io;

use kmbox_serial::SerialError;
use kmbox_session::ConnectError;

// Process exit codes. 2: no device found, 3: port missing or I/O failure,
// 30: doctor check failed, 50: port busy or access denied, 64: bad arguments
// or script.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const NOT_FOUND: i32 = 2;
pub const TRANSPORT_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const PERMISSION_DENIED: i32 = 50;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => TRANSPORT_ERROR,
        _ => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn serial_error(context: &str, err: SerialError) -> CliError {
    match err {
        SerialError::Open { source, path } => io_error(&format!("{context} ({path})"), source),
        SerialError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn connect_error(context: &str, err: ConnectError) -> CliError {
    match err {
        ConnectError::DeviceNotFound => CliError::new(NOT_FOUND, format!("{context}: {err}")),
        ConnectError::OpenFailed { ref source, .. } if is_permission_denied(source) => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

fn is_permission_denied(err: &SerialError) -> bool {
    match err {
        SerialError::Open { source, .. } | SerialError::Io(source) => {
            source.kind() == io::ErrorKind::PermissionDenied
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_not_found_maps_to_not_found() {
        let err = connect_error("connect failed", ConnectError::DeviceNotFound);
        assert_eq!(err.code, NOT_FOUND);
        assert!(err.message.contains("no compatible CH340 device"));
    }

    #[test]
    fn busy_port_maps_to_permission_denied() {
        let err = ConnectError::OpenFailed {
            port: "COM5".to_string(),
            code: Some(5),
            source: SerialError::Open {
                path: r"\\.\COM5".to_string(),
                source: io::Error::from(io::ErrorKind::PermissionDenied),
            },
        };
        assert_eq!(connect_error("connect failed", err).code, PERMISSION_DENIED);
    }

    #[test]
    fn missing_port_maps_to_transport_error() {
        let err = ConnectError::OpenFailed {
            port: "COM9".to_string(),
            code: Some(2),
            source: SerialError::Open {
                path: r"\\.\COM9".to_string(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
        };
        assert_eq!(connect_error("connect failed", err).code, TRANSPORT_ERROR);
    }
}

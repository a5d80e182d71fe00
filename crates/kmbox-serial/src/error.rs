use std::io;

/// Errors that can occur in serial port operations.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// The host device registry could not be enumerated.
    #[error("failed to enumerate serial devices: {0}")]
    Enumerate(#[source] io::Error),

    /// Failed to open the port at the given platform path.
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: io::Error },

    /// The port reported line settings this crate cannot represent.
    #[error("unsupported line setting: {0}")]
    UnsupportedSetting(String),

    /// An I/O error occurred on an open port.
    #[error("serial I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SerialError {
    /// Platform error code behind this error, when the OS reported one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            SerialError::Enumerate(source)
            | SerialError::Open { source, .. }
            | SerialError::Io(source) => source.raw_os_error(),
            SerialError::UnsupportedSetting(_) => None,
        }
    }
}

impl From<serialport::Error> for SerialError {
    fn from(err: serialport::Error) -> Self {
        SerialError::Io(io::Error::from(err))
    }
}

pub type Result<T> = std::result::Result<T, SerialError>;

//! Port name to platform device path resolution.
//!
//! Windows only resolves `COM1`..`COM9` as bare names; anything above needs
//! the `\\.\` device namespace prefix, which is also valid for the low ports,
//! so it is always applied.

const WIN32_DEVICE_PREFIX: &str = r"\\.\";

/// Full platform path for a port name such as `COM12` or `ttyUSB0`.
pub fn device_path(port: &str) -> String {
    #[cfg(windows)]
    {
        windows_device_path(port)
    }

    #[cfg(not(windows))]
    {
        unix_device_path(port)
    }
}

/// Windows device namespace path for `port`. Already-qualified paths pass through.
pub fn windows_device_path(port: &str) -> String {
    if port.starts_with(WIN32_DEVICE_PREFIX) {
        port.to_string()
    } else {
        format!("{WIN32_DEVICE_PREFIX}{port}")
    }
}

/// `/dev` path for `port`. Absolute paths pass through.
pub fn unix_device_path(port: &str) -> String {
    if port.starts_with('/') {
        port.to_string()
    } else {
        format!("/dev/{port}")
    }
}

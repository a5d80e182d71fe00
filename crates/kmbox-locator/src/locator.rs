use std::ops::ControlFlow;

use kmbox_serial::{device_path, DeviceRegistry, Result, SerialDriver};
use tracing::{debug, warn};

use crate::config::LocatorConfig;

/// A candidate that passed open verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDevice {
    pub friendly_name: String,
    pub port_name: String,
    /// Platform path the probe opened.
    pub path: String,
}

/// One enumerated device, as reported by [`list_devices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceListing {
    pub friendly_name: Option<String>,
    pub port_name: Option<String>,
    pub candidate: bool,
}

/// Whether `friendly_name` contains any of `tokens` (case-sensitive).
pub fn is_candidate(friendly_name: &str, tokens: &[String]) -> bool {
    tokens
        .iter()
        .any(|token| !token.is_empty() && friendly_name.contains(token.as_str()))
}

/// Port name of the first candidate that can be opened, or `None`.
pub fn find_device<R, D>(registry: &R, driver: &D, config: &LocatorConfig) -> Option<String>
where
    R: DeviceRegistry + ?Sized,
    D: SerialDriver + ?Sized,
{
    locate(registry, driver, config).map(|candidate| candidate.port_name)
}

/// Run discovery and return the first verified candidate.
///
/// Devices are visited in enumeration order. Unreadable names, non-matching
/// names, candidates without a port name and ports that fail to open are all
/// skipped. Enumeration failure yields `None`.
pub fn locate<R, D>(registry: &R, driver: &D, config: &LocatorConfig) -> Option<CandidateDevice>
where
    R: DeviceRegistry + ?Sized,
    D: SerialDriver + ?Sized,
{
    let mut found = None;

    let scanned = registry.scan(&mut |entry| {
        let Some(friendly_name) = entry.friendly_name() else {
            return ControlFlow::Continue(());
        };
        if config.debug {
            debug!(name = %friendly_name, "found device");
        }
        if !is_candidate(&friendly_name, &config.name_tokens) {
            return ControlFlow::Continue(());
        }

        let Some(port_name) = entry.port_name().filter(|name| !name.is_empty()) else {
            if config.debug {
                debug!(name = %friendly_name, "candidate has no port name");
            }
            return ControlFlow::Continue(());
        };

        let path = device_path(&port_name);
        match driver.open(&path) {
            Ok(probe) => {
                drop(probe);
                if config.debug {
                    debug!(port = %port_name, name = %friendly_name, "found compatible device");
                }
                found = Some(CandidateDevice {
                    friendly_name,
                    port_name,
                    path,
                });
                ControlFlow::Break(())
            }
            Err(err) => {
                if config.debug {
                    warn!(%path, %err, "failed to open test port");
                }
                ControlFlow::Continue(())
            }
        }
    });

    if let Err(err) = scanned {
        if config.debug {
            warn!(%err, "device enumeration failed");
        }
    }

    found
}

/// Every enumerated device with its resolved port name and candidate flag.
///
/// No port is opened. Unlike discovery, enumeration failure is an error here.
pub fn list_devices<R>(registry: &R, config: &LocatorConfig) -> Result<Vec<DeviceListing>>
where
    R: DeviceRegistry + ?Sized,
{
    let mut listings = Vec::new();
    registry.scan(&mut |entry| {
        let friendly_name = entry.friendly_name();
        let candidate = friendly_name
            .as_deref()
            .is_some_and(|name| is_candidate(name, &config.name_tokens));
        listings.push(DeviceListing {
            friendly_name,
            port_name: entry.port_name(),
            candidate,
        });
        ControlFlow::Continue(())
    })?;
    Ok(listings)
}

use kmbox_locator::LocatorConfig;
use kmbox_serial::{TimeoutPolicy, DEFAULT_BAUD_RATE};

/// How a failure to apply timeouts during connect is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutMode {
    /// Log and stay connected with the driver's previous timeouts.
    #[default]
    BestEffort,
    /// Fail the connect with `TimeoutConfigFailed`.
    Strict,
}

/// When a command write is followed by an explicit flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlushPolicy {
    /// Flush only while debug mode is on.
    #[default]
    DebugOnly,
    Always,
    Never,
}

impl FlushPolicy {
    pub fn should_flush(self, debug: bool) -> bool {
        match self {
            FlushPolicy::DebugOnly => debug,
            FlushPolicy::Always => true,
            FlushPolicy::Never => false,
        }
    }
}

/// Parameters for [`Session::connect`](crate::Session::connect).
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Port name (`COM5`, `ttyUSB0`). `None` or empty runs discovery.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub debug: bool,
    pub timeouts: TimeoutPolicy,
    pub timeout_mode: TimeoutMode,
    pub flush: FlushPolicy,
    /// Discovery settings; `debug` is OR-ed with the session's flag.
    pub locator: LocatorConfig,
}

impl ConnectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeout_mode(mut self, mode: TimeoutMode) -> Self {
        self.timeout_mode = mode;
        self
    }

    pub fn flush(mut self, flush: FlushPolicy) -> Self {
        self.flush = flush;
        self
    }

    pub fn locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    /// Explicit, non-empty port name.
    pub(crate) fn explicit_port(&self) -> Option<&str> {
        self.port.as_deref().filter(|port| !port.is_empty())
    }
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            debug: false,
            timeouts: TimeoutPolicy::default(),
            timeout_mode: TimeoutMode::default(),
            flush: FlushPolicy::default(),
            locator: LocatorConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = ConnectOptions::default();
        assert_eq!(opts.baud_rate, 115_200);
        assert_eq!(opts.timeout_mode, TimeoutMode::BestEffort);
        assert_eq!(opts.flush, FlushPolicy::DebugOnly);
        assert!(opts.explicit_port().is_none());
    }

    #[test]
    fn empty_port_means_discovery() {
        assert!(ConnectOptions::new().port("").explicit_port().is_none());
        assert_eq!(ConnectOptions::new().port("COM5").explicit_port(), Some("COM5"));
    }

    #[test]
    fn flush_policy() {
        assert!(FlushPolicy::DebugOnly.should_flush(true));
        assert!(!FlushPolicy::DebugOnly.should_flush(false));
        assert!(FlushPolicy::Always.should_flush(false));
        assert!(!FlushPolicy::Never.should_flush(true));
    }
}

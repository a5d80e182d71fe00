/// Friendly-name tokens that mark a KMBox candidate.
pub const DEFAULT_NAME_TOKENS: [&str; 2] = ["CH340", "USB-SERIAL"];

/// Discovery configuration.
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Case-sensitive substrings; any match makes a device a candidate.
    pub name_tokens: Vec<String>,
    /// Log every enumerated device and each rejected candidate.
    pub debug: bool,
}

impl LocatorConfig {
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            name_tokens: DEFAULT_NAME_TOKENS.iter().map(|t| t.to_string()).collect(),
            debug: false,
        }
    }
}

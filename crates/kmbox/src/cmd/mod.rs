use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use kmbox_locator::LocatorConfig;
use kmbox_serial::DEFAULT_BAUD_RATE;
use kmbox_session::{Button, ConnectOptions, FlushPolicy, TimeoutMode};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod find;
pub mod list;
pub mod pointer;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List enumerated serial devices and whether they match.
    List(ListArgs),
    /// Locate a verified KMBox port.
    Find(FindArgs),
    /// Move the cursor by a relative offset.
    #[command(allow_negative_numbers = true)]
    Move(MoveArgs),
    /// Click a mouse button.
    Click(ClickArgs),
    /// Execute a command script over one connection.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run serial enumeration and discovery health checks.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat, debug: bool) -> CliResult<i32> {
    match command {
        Command::List(args) => list::run(args, format),
        Command::Find(args) => find::run(args, format, debug),
        Command::Move(args) => pointer::run_move(args, format, debug),
        Command::Click(args) => pointer::run_click(args, format, debug),
        Command::Run(args) => run::run(args, format, debug),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

#[derive(Args, Debug, Default)]
pub struct DiscoveryArgs {
    /// Friendly-name token marking a candidate (repeatable). Default: CH340, USB-SERIAL.
    #[arg(long = "match", value_name = "TOKEN")]
    pub tokens: Vec<String>,
}

impl DiscoveryArgs {
    pub fn locator_config(&self, debug: bool) -> LocatorConfig {
        let mut config = LocatorConfig::default().with_debug(debug);
        if !self.tokens.is_empty() {
            config.name_tokens = self.tokens.clone();
        }
        config
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum FlushArg {
    Debug,
    Always,
    Never,
}

impl From<FlushArg> for FlushPolicy {
    fn from(value: FlushArg) -> Self {
        match value {
            FlushArg::Debug => FlushPolicy::DebugOnly,
            FlushArg::Always => FlushPolicy::Always,
            FlushArg::Never => FlushPolicy::Never,
        }
    }
}

#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Port name (e.g. COM5, ttyUSB0). Omit to auto-discover.
    #[arg(long, short = 'p', env = "KMBOX_PORT")]
    pub port: Option<String>,
    /// Baud rate.
    #[arg(long, short = 'b', env = "KMBOX_BAUD", default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Fail the connection when timeouts cannot be applied.
    #[arg(long)]
    pub strict_timeouts: bool,
    /// When to flush after a command write.
    #[arg(long, value_enum, default_value = "debug")]
    pub flush: FlushArg,
    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

impl ConnectionArgs {
    pub fn connect_options(&self, debug: bool) -> ConnectOptions {
        let mut options = ConnectOptions::new()
            .baud_rate(self.baud)
            .debug(debug)
            .flush(self.flush.into())
            .locator(self.discovery.locator_config(debug));
        if let Some(port) = &self.port {
            options = options.port(port.clone());
        }
        if self.strict_timeouts {
            options = options.timeout_mode(TimeoutMode::Strict);
        }
        options
    }
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

#[derive(Args, Debug)]
pub struct FindArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Horizontal offset.
    pub dx: i32,
    /// Vertical offset.
    pub dy: i32,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ButtonArg {
    Left,
    Right,
    Middle,
}

impl From<ButtonArg> for Button {
    fn from(value: ButtonArg) -> Self {
        match value {
            ButtonArg::Left => Button::Left,
            ButtonArg::Right => Button::Right,
            ButtonArg::Middle => Button::Middle,
        }
    }
}

#[derive(Args, Debug)]
pub struct ClickArgs {
    /// Button to click.
    #[arg(value_enum)]
    pub button: ButtonArg,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Script file (`move dx dy`, `click left`, `sleep 50ms`). Reads stdin when omitted.
    pub script: Option<PathBuf>,
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    #[command(flatten)]
    pub discovery: DiscoveryArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_tokens_replace_defaults() {
        let args = DiscoveryArgs {
            tokens: vec!["KMBox".to_string()],
        };
        let config = args.locator_config(true);
        assert_eq!(config.name_tokens, vec!["KMBox".to_string()]);
        assert!(config.debug);
    }

    #[test]
    fn empty_tokens_keep_defaults() {
        let config = DiscoveryArgs::default().locator_config(false);
        assert_eq!(config.name_tokens, LocatorConfig::default().name_tokens);
    }

    #[test]
    fn connection_args_build_options() {
        let args = ConnectionArgs {
            port: Some("COM7".to_string()),
            baud: 9600,
            strict_timeouts: true,
            flush: FlushArg::Always,
            discovery: DiscoveryArgs::default(),
        };
        let options = args.connect_options(false);
        assert_eq!(options.port.as_deref(), Some("COM7"));
        assert_eq!(options.baud_rate, 9600);
        assert_eq!(options.timeout_mode, TimeoutMode::Strict);
        assert_eq!(options.flush, FlushPolicy::Always);
    }
}

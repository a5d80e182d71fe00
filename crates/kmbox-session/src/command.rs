use std::fmt::{self, Write as _};
use std::str::FromStr;

use bytes::BytesMut;

/// Terminator appended to every command line.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Mouse button, numbered as the device expects in `km.click(<n>)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left = 0,
    Right = 1,
    Middle = 2,
}

impl Button {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Button::Left => "left",
            Button::Right => "right",
            Button::Middle => "middle",
        }
    }
}

impl FromStr for Button {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "left" | "0" => Ok(Button::Left),
            "right" | "1" => Ok(Button::Right),
            "middle" | "2" => Ok(Button::Middle),
            other => Err(ParseCommandError::UnknownButton(other.to_string())),
        }
    }
}

/// A device intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Relative cursor move.
    Move { dx: i32, dy: i32 },
    Click(Button),
}

impl fmt::Display for Command {
    /// Wire text without the line terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Move { dx, dy } => write!(f, "km.move({dx},{dy})"),
            Command::Click(button) => write!(f, "km.click({})", button.code()),
        }
    }
}

/// Append the wire form of `command`, terminator included, to `dst`.
pub fn encode_command(command: &Command, dst: &mut BytesMut) {
    // Formatting into a BytesMut cannot fail.
    let _ = write!(dst, "{command}");
    dst.extend_from_slice(&[LINE_TERMINATOR]);
}

/// Errors from parsing command text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("unknown button: {0} (expected left, right or middle)")]
    UnknownButton(String),

    #[error("invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },

    #[error("{command} expects {expected} argument(s), got {got}")]
    Arity {
        command: &'static str,
        expected: usize,
        got: usize,
    },
}

impl FromStr for Command {
    type Err = ParseCommandError;

    /// Accepts `move <dx> <dy>`, `click <button>` and the wire forms
    /// `km.move(<dx>,<dy>)` / `km.click(<n>)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseCommandError::Empty);
        }
        if let Some(rest) = s.strip_prefix("km.") {
            return parse_wire(rest);
        }

        let mut words = s.split_whitespace();
        let verb = words.next().ok_or(ParseCommandError::Empty)?;
        let args: Vec<&str> = words.collect();
        match verb {
            "move" => parse_move(&args),
            "click" => {
                expect_arity("click", 1, args.len())?;
                Ok(Command::Click(args[0].parse()?))
            }
            other => Err(ParseCommandError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_wire(rest: &str) -> Result<Command, ParseCommandError> {
    let unknown = || ParseCommandError::UnknownCommand(format!("km.{rest}"));
    let (name, args) = rest.split_once('(').ok_or_else(unknown)?;
    let args = args.strip_suffix(')').ok_or_else(unknown)?;
    let args: Vec<&str> = args.split(',').map(str::trim).collect();
    match name {
        "move" => parse_move(&args),
        "click" => {
            expect_arity("click", 1, args.len())?;
            Ok(Command::Click(args[0].parse()?))
        }
        _ => Err(unknown()),
    }
}

fn parse_move(args: &[&str]) -> Result<Command, ParseCommandError> {
    expect_arity("move", 2, args.len())?;
    let parse = |value: &str| {
        value
            .parse::<i32>()
            .map_err(|_| ParseCommandError::InvalidArgument {
                command: "move",
                value: value.to_string(),
            })
    };
    Ok(Command::Move {
        dx: parse(args[0])?,
        dy: parse(args[1])?,
    })
}

fn expect_arity(command: &'static str, expected: usize, got: usize) -> Result<(), ParseCommandError> {
    if expected == got {
        Ok(())
    } else {
        Err(ParseCommandError::Arity {
            command,
            expected,
            got,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(command: Command) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_command(&command, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn move_framing_is_exact() {
        assert_eq!(wire(Command::Move { dx: 12, dy: -7 }), b"km.move(12,-7)\n");
        assert_eq!(wire(Command::Move { dx: 100, dy: 0 }), b"km.move(100,0)\n");
    }

    #[test]
    fn move_handles_extreme_values() {
        assert_eq!(
            wire(Command::Move {
                dx: i32::MIN,
                dy: i32::MAX
            }),
            b"km.move(-2147483648,2147483647)\n"
        );
    }

    #[test]
    fn click_vocabulary() {
        assert_eq!(wire(Command::Click(Button::Left)), b"km.click(0)\n");
        assert_eq!(wire(Command::Click(Button::Right)), b"km.click(1)\n");
        assert_eq!(wire(Command::Click(Button::Middle)), b"km.click(2)\n");
    }

    #[test]
    fn button_names_parse_back() {
        for button in [Button::Left, Button::Right, Button::Middle] {
            assert_eq!(button.name().parse::<Button>(), Ok(button));
        }
    }

    #[test]
    fn encode_appends_to_existing_buffer() {
        let mut buf = BytesMut::from(&b"km.click(0)\n"[..]);
        encode_command(&Command::Click(Button::Right), &mut buf);
        assert_eq!(&buf[..], b"km.click(0)\nkm.click(1)\n");
    }

    #[test]
    fn parses_script_syntax() {
        assert_eq!(
            "move 10 -5".parse::<Command>().unwrap(),
            Command::Move { dx: 10, dy: -5 }
        );
        assert_eq!(
            "  click middle ".parse::<Command>().unwrap(),
            Command::Click(Button::Middle)
        );
        assert_eq!(
            "click 1".parse::<Command>().unwrap(),
            Command::Click(Button::Right)
        );
    }

    #[test]
    fn parses_wire_syntax() {
        assert_eq!(
            "km.move(12,-7)".parse::<Command>().unwrap(),
            Command::Move { dx: 12, dy: -7 }
        );
        assert_eq!(
            "km.click(0)".parse::<Command>().unwrap(),
            Command::Click(Button::Left)
        );
    }

    #[test]
    fn display_round_trips_through_parse() {
        let cmd = Command::Move { dx: -3, dy: 44 };
        assert_eq!(cmd.to_string().parse::<Command>().unwrap(), cmd);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Command>(), Err(ParseCommandError::Empty));
        assert!(matches!(
            "scroll 1".parse::<Command>(),
            Err(ParseCommandError::UnknownCommand(_))
        ));
        assert!(matches!(
            "move 1".parse::<Command>(),
            Err(ParseCommandError::Arity { expected: 2, got: 1, .. })
        ));
        assert!(matches!(
            "move x 1".parse::<Command>(),
            Err(ParseCommandError::InvalidArgument { .. })
        ));
        assert!(matches!(
            "click back".parse::<Command>(),
            Err(ParseCommandError::UnknownButton(_))
        ));
        assert!(matches!(
            "km.move(1,2".parse::<Command>(),
            Err(ParseCommandError::UnknownCommand(_))
        ));
    }
}

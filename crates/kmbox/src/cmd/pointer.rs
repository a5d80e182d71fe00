use kmbox_session::{Command, Session};
use serde::Serialize;

use crate::cmd::{ClickArgs, ConnectionArgs, MoveArgs};
use crate::exit::{connect_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_json, OutputFormat, SCHEMA_BASE};

#[derive(Serialize)]
struct SentOutput {
    schema_id: String,
    port: String,
    action: String,
    command: String,
    baud_rate: u32,
}

fn describe(command: Command) -> String {
    match command {
        Command::Move { dx, dy } => format!("move {dx},{dy}"),
        Command::Click(button) => format!("{} click", button.name()),
    }
}

pub fn run_move(args: MoveArgs, format: OutputFormat, debug: bool) -> CliResult<i32> {
    let command = Command::Move {
        dx: args.dx,
        dy: args.dy,
    };
    send_one(&args.connection, command, format, debug)
}

pub fn run_click(args: ClickArgs, format: OutputFormat, debug: bool) -> CliResult<i32> {
    send_one(
        &args.connection,
        Command::Click(args.button.into()),
        format,
        debug,
    )
}

fn send_one(
    connection: &ConnectionArgs,
    command: Command,
    format: OutputFormat,
    debug: bool,
) -> CliResult<i32> {
    let options = connection.connect_options(debug);
    let mut session =
        Session::open(&options).map_err(|err| connect_error("connect failed", err))?;

    session.send(command);
    let port = session.port_name().unwrap_or_default().to_string();
    let failed = session.write_failures() > 0;
    session.close();

    if failed {
        return Err(CliError::new(
            TRANSPORT_ERROR,
            format!("write to {port} failed: {command}"),
        ));
    }

    let output = SentOutput {
        schema_id: format!("{SCHEMA_BASE}/command-sent.schema.json"),
        port,
        action: describe(command),
        command: command.to_string(),
        baud_rate: options.baud_rate,
    };
    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!(
                "{} -> {} @ {} ({})",
                output.action, output.port, output.baud_rate, output.command
            )
        }
        OutputFormat::Raw => println!("{}", output.command),
    }
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use kmbox_session::Button;

    use super::*;

    #[test]
    fn describes_commands_by_name() {
        assert_eq!(describe(Command::Move { dx: 12, dy: -7 }), "move 12,-7");
        assert_eq!(describe(Command::Click(Button::Left)), "left click");
        assert_eq!(describe(Command::Click(Button::Middle)), "middle click");
    }
}

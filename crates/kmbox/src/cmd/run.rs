use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use kmbox_session::{Command, Session};
use serde::Serialize;

use crate::cmd::RunArgs;
use crate::exit::{connect_error, io_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_json, OutputFormat, SCHEMA_BASE};

/// One executable script line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Send(Command),
    Sleep(Duration),
}

#[derive(Serialize)]
struct RunOutput {
    schema_id: String,
    port: String,
    steps: usize,
    executed: usize,
    write_failures: u64,
    interrupted: bool,
}

pub fn run(args: RunArgs, format: OutputFormat, debug: bool) -> CliResult<i32> {
    let source = read_script(&args)?;
    // Validate the whole script before touching the device.
    let steps = parse_script(&source)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let options = args.connection.connect_options(debug);
    let mut session =
        Session::open(&options).map_err(|err| connect_error("connect failed", err))?;

    let mut executed = 0usize;
    for step in &steps {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        match *step {
            Step::Send(command) => session.send(command),
            Step::Sleep(duration) => std::thread::sleep(duration),
        }
        executed += 1;
    }

    let output = RunOutput {
        schema_id: format!("{SCHEMA_BASE}/script-run.schema.json"),
        port: session.port_name().unwrap_or_default().to_string(),
        steps: steps.len(),
        executed,
        write_failures: session.write_failures(),
        interrupted: executed < steps.len(),
    };
    session.close();

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Script run on {}:", output.port);
            println!("  Executed:        {}/{}", output.executed, output.steps);
            println!("  Write failures:  {}", output.write_failures);
            if output.interrupted {
                println!("  Interrupted:     yes");
            }
        }
        OutputFormat::Raw => println!("{}", output.executed),
    }
    Ok(SUCCESS)
}

fn read_script(args: &RunArgs) -> CliResult<String> {
    match &args.script {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err)),
        None => {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .map_err(|err| io_error("failed reading stdin", err))?;
            Ok(source)
        }
    }
}

fn parse_script(source: &str) -> CliResult<Vec<Step>> {
    let mut steps = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let step = parse_step(line)
            .map_err(|message| CliError::new(USAGE, format!("line {}: {message}", index + 1)))?;
        steps.push(step);
    }
    Ok(steps)
}

fn parse_step(line: &str) -> Result<Step, String> {
    if let Some(rest) = line.strip_prefix("sleep") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return parse_duration(rest).map(Step::Sleep);
        }
    }
    line.parse::<Command>()
        .map(Step::Send)
        .map_err(|err| err.to_string())
}

fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(format!("unsupported duration unit: {unit}")),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use kmbox_session::Button;

    use super::*;

    #[test]
    fn parses_script_with_comments_and_sleeps() {
        let script = "\
# warm-up
move 10 0
sleep 50ms   # settle
click left

km.click(2)
sleep 1s
";
        let steps = parse_script(script).expect("script should parse");
        assert_eq!(
            steps,
            vec![
                Step::Send(Command::Move { dx: 10, dy: 0 }),
                Step::Sleep(Duration::from_millis(50)),
                Step::Send(Command::Click(Button::Left)),
                Step::Send(Command::Click(Button::Middle)),
                Step::Sleep(Duration::from_secs(1)),
            ]
        );
    }

    #[test]
    fn bare_sleep_value_is_millis() {
        assert_eq!(parse_step("sleep 20"), Ok(Step::Sleep(Duration::from_millis(20))));
    }

    #[test]
    fn script_errors_report_line_numbers() {
        let err = parse_script("move 1 1\nmove 1\n").unwrap_err();
        assert_eq!(err.code, USAGE);
        assert!(err.message.starts_with("line 2:"), "{}", err.message);
    }

    #[test]
    fn sleep_requires_a_value() {
        assert!(parse_step("sleep").is_err());
        assert!(parse_step("sleep soon").is_err());
        assert!(parse_step("sleepy 1").is_err());
    }
}

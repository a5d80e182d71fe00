use kmbox_locator::locate;
use kmbox_serial::SystemBackend;
use serde::Serialize;

use crate::cmd::FindArgs;
use crate::exit::{CliError, CliResult, NOT_FOUND, SUCCESS};
use crate::output::{print_json, OutputFormat, SCHEMA_BASE};

#[derive(Serialize)]
struct FindOutput {
    schema_id: String,
    port: String,
    name: String,
    path: String,
}

pub fn run(args: FindArgs, format: OutputFormat, debug: bool) -> CliResult<i32> {
    let config = args.discovery.locator_config(debug);
    let backend = SystemBackend::default();
    let candidate = locate(&backend, &backend, &config)
        .ok_or_else(|| CliError::new(NOT_FOUND, "no compatible CH340 device found"))?;

    let output = FindOutput {
        schema_id: format!("{SCHEMA_BASE}/device-found.schema.json"),
        port: candidate.port_name,
        name: candidate.friendly_name,
        path: candidate.path,
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("Device:");
            println!("  Port:  {}", output.port);
            println!("  Name:  {}", output.name);
            println!("  Path:  {}", output.path);
        }
        OutputFormat::Raw => println!("{}", output.port),
    }
    Ok(SUCCESS)
}

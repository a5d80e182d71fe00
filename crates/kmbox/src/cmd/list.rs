use kmbox_locator::{list_devices, DeviceListing};
use kmbox_serial::SystemBackend;
use serde::Serialize;

use crate::cmd::ListArgs;
use crate::exit::{serial_error, CliResult, SUCCESS};
use crate::output::{print_json, print_table, OutputFormat, SCHEMA_BASE};

#[derive(Serialize)]
struct DeviceRow {
    port: Option<String>,
    name: Option<String>,
    candidate: bool,
}

impl From<DeviceListing> for DeviceRow {
    fn from(listing: DeviceListing) -> Self {
        Self {
            port: listing.port_name,
            name: listing.friendly_name,
            candidate: listing.candidate,
        }
    }
}

#[derive(Serialize)]
struct ListOutput {
    schema_id: String,
    devices: Vec<DeviceRow>,
}

pub fn run(args: ListArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.discovery.locator_config(false);
    let devices = list_devices(&SystemBackend::default(), &config)
        .map_err(|err| serial_error("enumeration failed", err))?;

    let output = ListOutput {
        schema_id: format!("{SCHEMA_BASE}/device-list.schema.json"),
        devices: devices.into_iter().map(DeviceRow::from).collect(),
    };
    print_list(&output, format);
    Ok(SUCCESS)
}

fn print_list(output: &ListOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table => {
            let rows = output
                .devices
                .iter()
                .map(|d| {
                    vec![
                        d.port.clone().unwrap_or_else(|| "-".to_string()),
                        d.name.clone().unwrap_or_else(|| "(unreadable)".to_string()),
                        if d.candidate { "yes" } else { "no" }.to_string(),
                    ]
                })
                .collect();
            print_table(&["PORT", "NAME", "CANDIDATE"], rows);
        }
        OutputFormat::Pretty => {
            if output.devices.is_empty() {
                println!("no serial devices found");
            }
            for d in &output.devices {
                println!(
                    "{} {:<10} {}",
                    if d.candidate { "*" } else { " " },
                    d.port.as_deref().unwrap_or("-"),
                    d.name.as_deref().unwrap_or("(unreadable)")
                );
            }
        }
        OutputFormat::Raw => {
            for port in output.devices.iter().filter_map(|d| d.port.as_deref()) {
                println!("{port}");
            }
        }
    }
}

use kmbox_locator::{list_devices, DeviceListing};
use kmbox_serial::SystemBackend;
use serde::Serialize;

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_json, OutputFormat, SCHEMA_BASE};

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Info,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    schema_id: String,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

/// Name of the serial backend compiled for this target.
pub fn backend_name() -> &'static str {
    if cfg!(windows) {
        "win32-setupapi"
    } else {
        "serialport"
    }
}

pub fn run(args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.discovery.locator_config(false);
    let mut checks = vec![platform_backend_check()];

    // Enumeration only; doctor never opens a port.
    match list_devices(&SystemBackend::default(), &config) {
        Ok(devices) => {
            checks.push(CheckResult {
                name: "device_enumeration".to_string(),
                status: CheckStatus::Pass,
                detail: format!("{} serial device(s) enumerated", devices.len()),
            });
            checks.push(candidate_check(&devices, &config.name_tokens));
        }
        Err(err) => checks.push(CheckResult {
            name: "device_enumeration".to_string(),
            status: CheckStatus::Fail,
            detail: format!("enumeration failed: {err}"),
        }),
    }
    checks.push(compiled_features_check());

    let output = build_output(checks);
    print_doctor(&output, format);

    if output.overall == "pass" {
        Ok(SUCCESS)
    } else {
        Ok(HEALTH_CHECK_FAILED)
    }
}

fn build_output(checks: Vec<CheckResult>) -> DoctorOutput {
    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    DoctorOutput {
        schema_id: format!("{SCHEMA_BASE}/doctor-report.schema.json"),
        checks,
        overall: if has_fail { "fail" } else { "pass" },
    }
}

fn platform_backend_check() -> CheckResult {
    CheckResult {
        name: "platform_backend".to_string(),
        status: CheckStatus::Info,
        detail: format!("{} on {}", backend_name(), std::env::consts::OS),
    }
}

fn candidate_check(devices: &[DeviceListing], tokens: &[String]) -> CheckResult {
    let ports: Vec<&str> = devices
        .iter()
        .filter(|d| d.candidate)
        .map(|d| d.port_name.as_deref().unwrap_or("-"))
        .collect();

    if ports.is_empty() {
        CheckResult {
            name: "candidate_devices".to_string(),
            status: CheckStatus::Warn,
            detail: format!("no device name contains any of: {}", tokens.join(", ")),
        }
    } else {
        CheckResult {
            name: "candidate_devices".to_string(),
            status: CheckStatus::Pass,
            detail: ports.join(", "),
        }
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = Vec::new();
    if cfg!(feature = "cli") {
        features.push("cli");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(output),
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("kmbox doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<20} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Warn => "WARN",
        CheckStatus::Info => "INFO",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(port: &str, candidate: bool) -> DeviceListing {
        DeviceListing {
            friendly_name: Some(format!("device ({port})")),
            port_name: Some(port.to_string()),
            candidate,
        }
    }

    #[test]
    fn doctor_output_has_overall_status() {
        let output = build_output(vec![CheckResult {
            name: "x".to_string(),
            status: CheckStatus::Pass,
            detail: "ok".to_string(),
        }]);
        let json = serde_json::to_string(&output).expect("serialize");
        assert!(json.contains("\"overall\":\"pass\""));
        assert!(json.contains("doctor-report.schema.json"));
    }

    #[test]
    fn any_failure_fails_overall() {
        let output = build_output(vec![
            platform_backend_check(),
            CheckResult {
                name: "device_enumeration".to_string(),
                status: CheckStatus::Fail,
                detail: "boom".to_string(),
            },
        ]);
        assert_eq!(output.overall, "fail");
    }

    #[test]
    fn missing_candidates_only_warn() {
        let tokens = vec!["CH340".to_string()];
        let check = candidate_check(&[listing("COM1", false)], &tokens);
        assert!(matches!(check.status, CheckStatus::Warn));
        assert!(check.detail.contains("CH340"));

        let check = candidate_check(&[listing("COM1", false), listing("COM5", true)], &tokens);
        assert!(matches!(check.status, CheckStatus::Pass));
        assert_eq!(check.detail, "COM5");
    }
}

//! Trace a square with the cursor, then left-click.
//!
//! Run with:
//!   cargo run --example move-square
//!
//! Set KMBOX_PORT (e.g. COM5, ttyUSB0) to skip discovery.

use std::thread;
use std::time::Duration;

use kmbox::{ConnectOptions, Session};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut options = ConnectOptions::new();
    if let Ok(port) = std::env::var("KMBOX_PORT") {
        options = options.port(port);
    }

    let mut session = Session::open(&options)?;
    eprintln!(
        "Connected to {} ({})",
        session.port_name().unwrap_or("?"),
        session
            .line_config()
            .map(|config| config.to_string())
            .unwrap_or_default()
    );

    for (dx, dy) in [(100, 0), (0, 100), (-100, 0), (0, -100)] {
        session.move_by(dx, dy);
        thread::sleep(Duration::from_millis(250));
    }
    session.left_click();

    if session.write_failures() > 0 {
        eprintln!("{} write(s) failed", session.write_failures());
    }
    session.close();
    Ok(())
}

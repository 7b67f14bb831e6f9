//! Drives and buses commands - fleet snapshot tables.

use discfleet::status::DriveState;
use discfleet::topology::Bus;

use crate::client::DriveRow;
use crate::error::CliError;
use crate::runner::client_for;

/// Print the drive table.
pub fn run_drives(server: Option<String>) -> Result<(), CliError> {
    let client = client_for(server)?;
    let drives = client.drives()?;
    if drives.is_empty() {
        println!("No drives found");
        return Ok(());
    }

    println!(
        "{:<8} {:<10} {:<28} {:>6} {:<8} {:>7}  BUS",
        "DEVICE", "STATE", "DISC", "PCT", "HEALTH", "CRASHES"
    );
    for row in &drives {
        println!("{}", drive_line(row));
        if let Some(message) = &row.status.error_message {
            println!("         ! {}", message);
        }
    }
    Ok(())
}

/// Print the bus table.
pub fn run_buses(server: Option<String>) -> Result<(), CliError> {
    let client = client_for(server)?;
    let buses = client.buses()?;
    if buses.is_empty() {
        println!("No buses found");
        return Ok(());
    }

    for bus in &buses {
        println!("{}", bus_line(bus));
    }
    Ok(())
}

fn drive_line(row: &DriveRow) -> String {
    let status = &row.status;
    let disc = if status.disc_name.is_empty() {
        "-".to_string()
    } else {
        truncate(&status.disc_name, 28)
    };
    let progress = match status.state {
        DriveState::Idle => "-".to_string(),
        _ => format!("{:.1}", status.progress),
    };
    format!(
        "{:<8} {:<10} {:<28} {:>6} {:<8} {:>7}  {}",
        status.device,
        status.state.as_str(),
        disc,
        progress,
        row.health_tier.as_str(),
        row.crash_count,
        row.bus_id.as_deref().unwrap_or("-"),
    )
}

fn bus_line(bus: &Bus) -> String {
    let reset = if bus.reset_supported {
        "resettable"
    } else {
        "no reset"
    };
    format!(
        "{:<24} {:<8} {:<10} [{}]  {}",
        bus.id,
        bus.bus_type.as_str(),
        reset,
        bus.devices.join(", "),
        bus.controller
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

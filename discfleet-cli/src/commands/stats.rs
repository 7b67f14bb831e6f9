//! Stats command - drive health from the ledger.

use chrono::{DateTime, Local, Utc};
use discfleet::ledger::{DriveHealth, HealthEventKind};

use crate::error::CliError;
use crate::runner::client_for;

/// Show all tracked drives, one drive, or clear one drive's history.
pub fn run(server: Option<String>, device: Option<String>, clear: bool) -> Result<(), CliError> {
    let client = client_for(server)?;

    match (device, clear) {
        (Some(device), true) => {
            let cleared = client.clear_stats(&device)?;
            if cleared.cleared {
                println!("Cleared health history for {}", cleared.device);
            } else {
                println!("No health history recorded for {}", cleared.device);
            }
        }
        (None, true) => {
            return Err(CliError::Config(
                "--clear needs a device, e.g. discfleet stats sr0 --clear".to_string(),
            ));
        }
        (Some(device), false) => {
            let health = client.device_stats(&device)?;
            print!("{}", describe(&health));
        }
        (None, false) => {
            let all = client.stats()?;
            if all.is_empty() {
                println!("No crashes or resets recorded");
            }
            for health in &all {
                println!("{}", summary_line(health));
            }
        }
    }
    Ok(())
}

fn summary_line(health: &DriveHealth) -> String {
    format!(
        "{:<8} {:<8} crashes {:>3} (7d {:>2}, 30d {:>2})  resets {:>3}  last crash {}",
        health.device,
        health.tier.as_str(),
        health.crash_count,
        health.crashes_7d,
        health.crashes_30d,
        health.reset_count,
        format_time(health.last_crash),
    )
}

fn describe(health: &DriveHealth) -> String {
    let mut out = String::new();
    out.push_str(&format!("Drive:        {}\n", health.device));
    out.push_str(&format!("Health:       {}\n", health.tier.as_str()));
    out.push_str(&format!(
        "Crashes:      {} total, {} in 7 days, {} in 30 days\n",
        health.crash_count, health.crashes_7d, health.crashes_30d
    ));
    out.push_str(&format!("Resets:       {}\n", health.reset_count));
    out.push_str(&format!("Last crash:   {}\n", format_time(health.last_crash)));
    out.push_str(&format!("Last reset:   {}\n", format_time(health.last_reset)));
    if !health.events.is_empty() {
        out.push_str("Recent events:\n");
        for event in health.events.iter().rev().take(10) {
            let kind = match event.kind {
                HealthEventKind::Crash => "crash",
                HealthEventKind::Reset => "reset",
            };
            out.push_str(&format!(
                "  {}  {}\n",
                format_time(Some(event.timestamp)),
                kind
            ));
        }
    }
    out
}

/// Render epoch seconds in local time, or `never`.
fn format_time(epoch: Option<f64>) -> String {
    epoch
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs.floor() as i64, 0))
        .map(|utc| {
            utc.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|| "never".to_string())
}

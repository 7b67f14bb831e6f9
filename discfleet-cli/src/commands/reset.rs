//! Reset command - manual bus reset.

use discfleet::recovery::ResetReport;

use crate::error::CliError;
use crate::runner::client_for;

/// Reset `bus_id`. Without `confirm`, a bus with ripping drives is refused.
pub fn run(server: Option<String>, bus_id: &str, confirm: bool) -> Result<(), CliError> {
    let client = client_for(server)?;
    println!("Resetting {}...", bus_id);
    let report = client.reset_bus(bus_id, confirm)?;
    print!("{}", describe(&report));
    Ok(())
}

fn describe(report: &ResetReport) -> String {
    let mut out = format!(
        "Reset {} ({}) covering {}\n",
        report.bus_id,
        report.bus_type,
        report.devices.join(", ")
    );
    if report.recorded.is_empty() {
        out.push_str("No crashed drives were on the bus\n");
    } else {
        out.push_str(&format!(
            "Recorded against: {}\n",
            report.recorded.join(", ")
        ));
    }
    out
}

//! Per-drive rip log access.
//!
//! Rip workers write `<log_dir>/<device>.log`. The dashboard shows the tail.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Default number of lines returned.
pub const DEFAULT_LOG_LINES: usize = 100;

/// Largest tail served.
pub const MAX_LOG_LINES: usize = 2000;

/// True for names like `sr0`; rejects anything that could escape the log dir.
pub fn is_valid_device_name(device: &str) -> bool {
    !device.is_empty()
        && device.len() <= 32
        && device
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Last `lines` lines of a device's log. A missing log is empty.
pub fn tail_log(log_dir: &Path, device: &str, lines: usize) -> io::Result<Vec<String>> {
    if !is_valid_device_name(device) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid device name: {:?}", device),
        ));
    }
    let lines = lines.clamp(1, MAX_LOG_LINES);

    let file = match File::open(log_dir.join(format!("{}.log", device))) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut tail = VecDeque::with_capacity(lines);
    for line in BufReader::new(file).split(b'\n') {
        let line = String::from_utf8_lossy(&line?).trim_end_matches('\r').to_string();
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Ok(tail.into())
}

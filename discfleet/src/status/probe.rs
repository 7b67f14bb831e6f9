//! Identification probes used to confirm suspected crashes.
//!
//! A wedged drive's firmware stops answering SCSI commands, so an inquiry that
//! never returns is strong evidence of a crash. A probe that returns, even
//! with an error, means the drive is alive and the rip is just slow.

use std::io;
use std::process::Stdio;

use futures::future::BoxFuture;
use tokio::process::Command;
use tracing::trace;

/// Sends an identification request to a drive.
///
/// Implementations need not bound their own runtime; the caller applies the
/// timeout and drops the future when it expires.
pub trait DeviceProbe: Send + Sync {
    fn probe<'a>(&'a self, device: &'a str) -> BoxFuture<'a, io::Result<()>>;
}

/// Runs `<program> [args...] /dev/<device>` and waits for it to exit.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
}

impl CommandProbe {
    /// Parse a command line such as `sg_inq` or `sg_turs -v`.
    pub fn from_command_line(command: &str) -> Self {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl DeviceProbe for CommandProbe {
    fn probe<'a>(&'a self, device: &'a str) -> BoxFuture<'a, io::Result<()>> {
        Box::pin(async move {
            if self.program.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "probe command is empty",
                ));
            }

            let status = Command::new(&self.program)
                .args(&self.args)
                .arg(format!("/dev/{}", device))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await?;

            trace!(device, program = %self.program, ?status, "Probe exited");
            if status.success() {
                Ok(())
            } else {
                Err(io::Error::new(
                    io::ErrorKind::Other,
                    format!("{} exited with {}", self.program, status),
                ))
            }
        })
    }
}

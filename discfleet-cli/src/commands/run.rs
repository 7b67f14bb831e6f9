//! Run command - host the fleet manager in the foreground.

use std::net::SocketAddr;

use discfleet::config::ConfigFile;
use discfleet::logging::LogOptions;
use discfleet::service::FleetService;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the run command.
#[derive(Debug, Default)]
pub struct RunArgs {
    pub debug: bool,
    pub quiet: bool,
    pub listen: Option<SocketAddr>,
    pub no_auto_reset: bool,
}

impl RunArgs {
    /// Overlay command-line flags on the loaded configuration.
    fn apply(&self, config: &mut ConfigFile) {
        if let Some(listen) = self.listen {
            config.server.listen = listen;
        }
        if self.no_auto_reset {
            config.recovery.auto_reset = false;
        }
    }
}

/// Run the run command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let mut config = ConfigFile::load()?;
    args.apply(&mut config);

    let runner = CliRunner::new(
        config,
        LogOptions {
            stdout: !args.quiet,
            debug: args.debug,
        },
    )?;
    runner.log_startup("run");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(serve(runner.config().clone()))
}

async fn serve(config: ConfigFile) -> Result<(), CliError> {
    let auto_reset = config.recovery.auto_reset;
    let service = FleetService::start(config).await?;
    println!("discfleet listening on http://{}", service.local_addr());
    if !auto_reset {
        println!("Automatic bus resets are disabled");
    }

    let token = service.shutdown_token();
    tokio::select! {
        _ = shutdown_signal() => info!("Shutdown requested"),
        _ = token.cancelled() => {}
    }

    service.shutdown().await?;
    info!("discfleet stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = ConfigFile::default();
        let args = RunArgs {
            listen: Some("0.0.0.0:9000".parse().unwrap()),
            no_auto_reset: true,
            ..Default::default()
        };
        args.apply(&mut config);
        assert_eq!(config.server.listen.port(), 9000);
        assert!(!config.recovery.auto_reset);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = ConfigFile::default();
        RunArgs::default().apply(&mut config);
        assert_eq!(config, ConfigFile::default());
    }
}

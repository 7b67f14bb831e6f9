//! Fleet service wiring.
//!
//! Builds every component from configuration, runs the periodic activities
//! and the HTTP surface, and tears them down in order on shutdown.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::daemons::{CrashMonitorDaemon, StatusRefreshDaemon};
use super::error::ServiceError;
use crate::api::{self, ApiState};
use crate::config::ConfigFile;
use crate::devices::{DeviceEnumerator, SysfsEnumerator};
use crate::events::EventBus;
use crate::ledger::{DriveStatsLedger, HealthPolicy, LedgerFlushDaemon};
use crate::recovery::RecoveryOrchestrator;
use crate::status::{AggregatorConfig, CommandProbe, DeviceProbe, StatusAggregator, StatusWatcher};
use crate::time::{SharedClock, SystemClock};
use crate::topology::{BusTopology, TopologyTimings};

/// The wired component graph.
#[derive(Clone)]
pub struct FleetComponents {
    pub aggregator: Arc<StatusAggregator>,
    pub topology: Arc<BusTopology>,
    pub ledger: Arc<DriveStatsLedger>,
    pub orchestrator: Arc<RecoveryOrchestrator>,
    pub events: EventBus,
    pub clock: SharedClock,
    pub history_path: PathBuf,
    pub log_dir: PathBuf,
}

impl FleetComponents {
    /// Production wiring: sysfs enumeration, command probe, system clock.
    pub fn from_config(config: &ConfigFile) -> Self {
        let enumerator: Arc<dyn DeviceEnumerator> = Arc::new(SysfsEnumerator::new(
            &config.monitor.sysfs_root,
            &config.monitor.device_prefix,
        ));
        let probe: Arc<dyn DeviceProbe> = Arc::new(CommandProbe::from_command_line(
            &config.monitor.probe_command,
        ));
        Self::build(config, enumerator, probe, Arc::new(SystemClock))
    }

    /// Wire components with the given hardware and time sources.
    pub fn build(
        config: &ConfigFile,
        enumerator: Arc<dyn DeviceEnumerator>,
        probe: Arc<dyn DeviceProbe>,
        clock: SharedClock,
    ) -> Self {
        let events = EventBus::new(clock.clone());

        let aggregator = Arc::new(StatusAggregator::new(
            AggregatorConfig {
                status_dir: config.paths.status_dir.clone(),
                crash_timeout: Duration::from_secs(config.monitor.crash_timeout_secs),
                probe_timeout: Duration::from_secs(config.monitor.probe_timeout_secs),
            },
            Arc::clone(&enumerator),
            probe,
            clock.clone(),
            events.clone(),
        ));

        let topology = Arc::new(BusTopology::new(
            &config.monitor.sysfs_root,
            enumerator,
            TopologyTimings {
                cache_ttl: Duration::from_secs(config.topology.cache_ttl_secs),
                usb_settle: Duration::from_millis(config.topology.usb_settle_ms),
                reenumerate: Duration::from_millis(config.topology.reenumerate_ms),
            },
        ));

        let ledger = Arc::new(DriveStatsLedger::open(
            &config.paths.stats_path,
            HealthPolicy {
                warning_crashes: config.ledger.warning_crashes,
                replace_crashes: config.ledger.replace_crashes,
                retention_days: config.ledger.retention_days,
            },
            clock.clone(),
        ));

        let orchestrator = Arc::new(RecoveryOrchestrator::new(
            Arc::clone(&aggregator),
            Arc::clone(&topology),
            Arc::clone(&ledger),
            events.clone(),
            clock.clone(),
            config.recovery.auto_reset,
        ));

        Self {
            aggregator,
            topology,
            ledger,
            orchestrator,
            events,
            clock,
            history_path: config.paths.history_path.clone(),
            log_dir: config.paths.log_dir.clone(),
        }
    }

    /// State for the HTTP surface.
    pub fn api_state(&self, shutdown: CancellationToken) -> ApiState {
        ApiState {
            aggregator: Arc::clone(&self.aggregator),
            topology: Arc::clone(&self.topology),
            ledger: Arc::clone(&self.ledger),
            orchestrator: Arc::clone(&self.orchestrator),
            events: self.events.clone(),
            clock: self.clock.clone(),
            history_path: self.history_path.clone(),
            log_dir: self.log_dir.clone(),
            shutdown,
        }
    }
}

/// Running fleet manager.
pub struct FleetService {
    components: FleetComponents,
    shutdown: CancellationToken,
    daemons: Vec<JoinHandle<()>>,
    server: JoinHandle<std::io::Result<()>>,
    local_addr: SocketAddr,
}

impl FleetService {
    /// Start with production wiring.
    pub async fn start(config: ConfigFile) -> Result<Self, ServiceError> {
        let components = FleetComponents::from_config(&config);
        Self::start_with(&config, components).await
    }

    /// Start with pre-built components.
    pub async fn start_with(
        config: &ConfigFile,
        components: FleetComponents,
    ) -> Result<Self, ServiceError> {
        std::fs::create_dir_all(&config.paths.status_dir)?;

        let addr = config.server.listen;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServiceError::BindError { addr, source })?;
        let local_addr = listener.local_addr()?;

        let shutdown = CancellationToken::new();
        components.aggregator.refresh();

        let mut daemons = Vec::new();

        let mut refresh = StatusRefreshDaemon::new(
            Arc::clone(&components.aggregator),
            Duration::from_secs(config.monitor.refresh_interval_secs),
        );
        if config.monitor.watch_enabled {
            let wake = Arc::new(Notify::new());
            refresh = refresh.with_wake(Arc::clone(&wake));
            let watcher = StatusWatcher::new(&config.paths.status_dir, wake);
            daemons.push(tokio::spawn(watcher.run(shutdown.clone())));
        }
        daemons.push(tokio::spawn(refresh.run(shutdown.clone())));

        let monitor = CrashMonitorDaemon::new(
            Arc::clone(&components.aggregator),
            Arc::clone(&components.orchestrator),
            Duration::from_secs(config.monitor.crash_check_interval_secs),
        );
        daemons.push(tokio::spawn(monitor.run(shutdown.clone())));

        let flush = LedgerFlushDaemon::new(Arc::clone(&components.ledger))
            .with_flush_interval(Duration::from_secs(config.ledger.flush_interval_secs));
        daemons.push(tokio::spawn(flush.run(shutdown.clone())));

        let router = api::build_router(components.api_state(shutdown.clone()));
        let server = tokio::spawn(api::serve(listener, router, shutdown.clone()));

        info!(
            addr = %local_addr,
            status_dir = %config.paths.status_dir.display(),
            auto_reset = config.recovery.auto_reset,
            "Fleet manager started"
        );

        Ok(Self {
            components,
            shutdown,
            daemons,
            server,
            local_addr,
        })
    }

    /// Address the HTTP surface is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn components(&self) -> &FleetComponents {
        &self.components
    }

    /// Token cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Stop every task and flush the ledger one last time.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        info!("Fleet manager shutting down");
        self.shutdown.cancel();

        let mut failure = None;
        for handle in self.daemons {
            if let Err(e) = handle.await {
                warn!(error = %e, "Daemon task failed");
                failure = Some(ServiceError::TaskError(e.to_string()));
            }
        }

        match self.server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => failure = Some(ServiceError::IoError(e)),
            Err(e) => failure = Some(ServiceError::TaskError(e.to_string())),
        }

        if let Err(e) = self.components.ledger.flush() {
            warn!(error = %e, "Final ledger flush failed");
        }

        info!("Fleet manager stopped");
        failure.map_or(Ok(()), Err)
    }
}

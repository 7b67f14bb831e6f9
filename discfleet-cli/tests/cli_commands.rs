//! End-to-end tests for the discfleet binary.
//!
//! Each test points `HOME` at a temporary directory so the binary never
//! touches the real `~/.discfleet`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use discfleet::config::{
    ConfigFile, ENV_AUTO_RESET, ENV_CRASH_TIMEOUT, ENV_HISTORY_PATH, ENV_LISTEN, ENV_LOG_DIR,
    ENV_PROBE_COMMAND, ENV_PROBE_TIMEOUT, ENV_STATS_PATH, ENV_STATUS_DIR, ENV_SYSFS_ROOT,
};
use discfleet::service::FleetService;
use tempfile::TempDir;

fn discfleet(home: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_discfleet"));
    cmd.env("HOME", home);
    for var in [
        ENV_STATUS_DIR,
        ENV_HISTORY_PATH,
        ENV_STATS_PATH,
        ENV_LOG_DIR,
        ENV_CRASH_TIMEOUT,
        ENV_PROBE_TIMEOUT,
        ENV_AUTO_RESET,
        ENV_LISTEN,
        ENV_SYSFS_ROOT,
        ENV_PROBE_COMMAND,
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

async fn run_blocking(home: PathBuf, args: Vec<String>) -> Output {
    tokio::task::spawn_blocking(move || discfleet(&home).args(&args).output().unwrap())
        .await
        .unwrap()
}

#[test]
fn config_init_then_show() {
    let home = TempDir::new().unwrap();

    let out = discfleet(home.path()).args(["config", "path"]).output().unwrap();
    assert!(out.status.success());
    let path = PathBuf::from(stdout(&out).trim());
    assert_eq!(path, home.path().join(".discfleet").join("config.ini"));

    let out = discfleet(home.path()).args(["config", "init"]).output().unwrap();
    assert!(out.status.success());
    assert!(path.exists());

    let out = discfleet(home.path())
        .args(["config", "show"])
        .env(ENV_CRASH_TIMEOUT, "900")
        .output()
        .unwrap();
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("# Loaded from"));
    assert!(text.contains("[monitor]"));
    assert!(text.contains("crash_timeout_secs = 900"));
}

#[test]
fn invalid_env_override_is_reported() {
    let home = TempDir::new().unwrap();
    let out = discfleet(home.path())
        .args(["config", "show"])
        .env(ENV_CRASH_TIMEOUT, "soon")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Configuration error"));
}

#[test]
fn client_reports_unreachable_service() {
    let home = TempDir::new().unwrap();
    let out = discfleet(home.path())
        .args(["drives", "--server", "http://127.0.0.1:1"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Is the fleet service running?"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_commands_against_running_service() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let sysfs = root.join("sys");
    fs::create_dir_all(sysfs.join("block").join("sr0")).unwrap();

    let mut config = ConfigFile::default();
    config.paths.status_dir = root.join("status");
    config.paths.history_path = root.join("history.jsonl");
    config.paths.stats_path = root.join("drive_stats.json");
    config.paths.log_dir = root.join("logs");
    config.logging.file = root.join("discfleet.log");
    config.monitor.sysfs_root = sysfs;
    config.monitor.probe_command = "true".to_string();
    config.monitor.watch_enabled = false;
    config.server.listen = "127.0.0.1:0".parse().unwrap();

    let service = FleetService::start(config).await.unwrap();
    service.components().ledger.record_crash("sr0");
    let server = format!("http://{}", service.local_addr());
    let home = root.to_path_buf();
    let args = |list: &[&str]| -> Vec<String> {
        list.iter()
            .map(|s| s.to_string())
            .chain(["--server".to_string(), server.clone()])
            .collect()
    };

    let out = run_blocking(home.clone(), args(&["drives"])).await;
    assert!(out.status.success(), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("sr0"));
    assert!(text.contains("unknown-sr0"));

    let out = run_blocking(home.clone(), args(&["buses"])).await;
    assert!(out.status.success());
    assert!(stdout(&out).contains("no reset"));

    let out = run_blocking(home.clone(), args(&["stats", "sr0"])).await;
    assert!(out.status.success());
    assert!(stdout(&out).contains("1 total"));

    let out = run_blocking(home.clone(), args(&["reset", "unknown-sr0", "--confirm"])).await;
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("400"));

    let out = run_blocking(home.clone(), args(&["stats", "sr0", "--clear"])).await;
    assert!(out.status.success());
    assert!(stdout(&out).contains("Cleared health history for sr0"));
    assert!(service.components().ledger.get("sr0").is_none());

    service.shutdown().await.unwrap();
}

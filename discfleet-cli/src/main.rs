//! discfleet CLI - Command-line interface
//!
//! `discfleet run` hosts the fleet manager. The other subcommands are thin
//! clients of a running instance's HTTP surface.

mod client;
mod commands;
mod error;
mod runner;

use std::net::SocketAddr;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::run::RunArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "discfleet")]
#[command(version = discfleet::VERSION)]
#[command(about = "Health monitoring and bus recovery for optical disc ripping drives", long_about = None)]
struct Cli {
    /// Base URL of a running service (default: derived from [server] listen)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fleet manager in the foreground
    Run {
        /// Enable debug logging regardless of RUST_LOG
        #[arg(long)]
        debug: bool,

        /// Log to the log file only, not stdout
        #[arg(long, short)]
        quiet: bool,

        /// Address to serve the query API on
        #[arg(long)]
        listen: Option<SocketAddr>,

        /// Detect and record crashes but never reset a bus automatically
        #[arg(long)]
        no_auto_reset: bool,
    },

    /// Show every drive with its state, health and bus
    Drives,

    /// Show the discovered buses and their member drives
    Buses,

    /// Reset a bus, recovering every drive on it
    Reset {
        /// Bus id as shown by `discfleet buses`
        bus_id: String,

        /// Reset even if drives on the bus are ripping
        #[arg(long, alias = "yes")]
        confirm: bool,
    },

    /// Show drive health history
    Stats {
        /// Limit to one drive
        device: Option<String>,

        /// Clear the drive's history (after replacing it)
        #[arg(long, requires = "device")]
        clear: bool,
    },

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        e.exit();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let server = cli.server;
    match cli.command {
        Commands::Run {
            debug,
            quiet,
            listen,
            no_auto_reset,
        } => commands::run::run(RunArgs {
            debug,
            quiet,
            listen,
            no_auto_reset,
        }),
        Commands::Drives => commands::drives::run_drives(server),
        Commands::Buses => commands::drives::run_buses(server),
        Commands::Reset { bus_id, confirm } => commands::reset::run(server, &bus_id, confirm),
        Commands::Stats { device, clear } => commands::stats::run(server, device, clear),
        Commands::Config(command) => commands::config::run(command),
    }
}

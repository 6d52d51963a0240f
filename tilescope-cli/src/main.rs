//! Tilescope CLI - Command-line interface
//!
//! Runs the overlay engines against a simulated world and manages the
//! engine configuration file.

mod commands;
mod error;
mod world;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tilescope::logging::{init_logging, LoggingConfig};

use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilescope", version, about = "Budgeted spatial discovery for map overlays")]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run overlay cycles against a JSON world fixture
    Simulate(SimulateArgs),

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut logging =
        LoggingConfig::default().with_directive(if cli.verbose { "debug" } else { "warn" });
    if let Some(path) = &cli.log_file {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CliError::Config(format!("Invalid log file {}", path.display())))?;
        logging = logging.with_file(dir, name);
    }
    let _guard = init_logging(logging)?;

    match cli.command {
        Commands::Simulate(args) => {
            let config = commands::config::load(cli.config)?.into_config();
            commands::simulate::run(args, config)
        }
        Commands::Config { command } => commands::config::run(command, cli.config),
    }
}

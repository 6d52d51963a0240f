//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, `config path` and
//! `config init` for viewing and modifying the engine's INI file.

use std::path::PathBuf;

use clap::Subcommand;
use tilescope::config::{config_file_path, ConfigFile, ConfigKey};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., scanner.query_budget)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., scanner.query_budget)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with every default value
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand against `file`, or the default location.
pub fn run(command: ConfigCommands, file: Option<PathBuf>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(file, &key),
        ConfigCommands::Set { key, value } => run_set(file, &key, &value),
        ConfigCommands::List => run_list(file),
        ConfigCommands::Path => run_path(file),
        ConfigCommands::Init { force } => run_init(file, force),
    }
}

/// Load the config file, falling back to defaults at the default path.
pub fn load(file: Option<PathBuf>) -> Result<ConfigFile, CliError> {
    let path = resolve_path(file)?;
    Ok(ConfigFile::load_from(path)?)
}

fn resolve_path(file: Option<PathBuf>) -> Result<PathBuf, CliError> {
    file.or_else(config_file_path).ok_or_else(|| {
        CliError::Config(
            "No configuration directory on this platform. Use --config to pick a file.".to_string(),
        )
    })
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'tilescope config list' to see available keys.",
            key
        ))
    })
}

/// Get a configuration value.
fn run_get(file: Option<PathBuf>, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = load(file)?;
    println!("{}", config_key.get(config.config()));
    Ok(())
}

/// Set a configuration value.
fn run_set(file: Option<PathBuf>, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = load(file)?;
    config_key.set(config.config_mut(), value)?;
    config.save()?;

    println!("Set {} = {}", config_key.name(), config_key.get(config.config()));
    Ok(())
}

/// List all configuration settings.
fn run_list(file: Option<PathBuf>) -> Result<(), CliError> {
    let config = load(file)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";
    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }
        println!("  {} = {}", key.key_name(), key.get(config.config()));
    }

    Ok(())
}

/// Show the configuration file path.
fn run_path(file: Option<PathBuf>) -> Result<(), CliError> {
    println!("{}", resolve_path(file)?.display());
    Ok(())
}

/// Write the defaults to disk.
fn run_init(file: Option<PathBuf>, force: bool) -> Result<(), CliError> {
    let path = resolve_path(file)?;
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }
    let config = ConfigFile::new(&path);
    config.save()?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

// DnaQuery - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading (before logging, so the config can pick the level)
// 3. Logging initialisation (debug mode support)
// 4. One extraction run for the requested date

use clap::Parser;
use dnaquery::app::run::{self, RunOptions};
use dnaquery::platform::config;
use dnaquery::util::{constants, logging};
use std::path::PathBuf;

/// DnaQuery: extract, normalise, and export one day of container logs.
#[derive(Parser, Debug)]
#[command(name = "dnaquery", version, about)]
struct Cli {
    /// Day to process (YYYY-MM-DD).
    #[arg(short = 'd', long = "date")]
    date: String,

    /// Path to the TOML config file.
    #[arg(short = 'c', long = "config", default_value = constants::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Read this archive instead of the one derived from the config.
    #[arg(short = 'i', long = "input")]
    input: Option<PathBuf>,

    /// Write the CSV here instead of the path derived from the config.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Delete the input archive after a successful run.
    #[arg(long = "remove-archive")]
    remove_archive: bool,

    /// Enable debug logging (overrides the config level).
    #[arg(long = "debug")]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();

    let (cfg, warnings) = match config::load_config(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init(cli.debug, cfg.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        config = %cli.config.display(),
        debug = cli.debug,
        "DnaQuery starting"
    );
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    let options = RunOptions {
        date: cli.date,
        input: cli.input,
        output: cli.output,
        remove_archive: cli.remove_archive,
    };

    match run::run(&cfg, &options) {
        Ok(report) => println!("{report}"),
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

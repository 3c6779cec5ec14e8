//! sectioncfg: work with section config files from the command line.
//!
//! Usage:
//!   sectioncfg schema --plugins defs.toml [--isolate] [--update]
//!   sectioncfg check --plugins defs.toml [--allow-unknown] storage.cfg
//!   sectioncfg fmt --plugins defs.toml storage.cfg

use anyhow::Result;
use clap::{Parser, Subcommand};
use sectioncfg_cli::{check_text, format_text, load_config, read_file, schema_json};
use sectioncfg_document::{DocumentCodec, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, debug, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "sectioncfg")]
#[command(about = "Print schemas for, check and normalize section config files")]
struct Args {
    /// TOML file with base properties and plugin definitions
    #[arg(short, long, global = true, default_value = "plugins.toml")]
    plugins: PathBuf,

    /// Settings file
    #[arg(short, long, global = true, default_value = "sectioncfg.toml")]
    settings: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the create (or update) schema as JSON
    Schema {
        /// Keep type-specific properties separate per type
        #[arg(long)]
        isolate: bool,

        /// Print the update schema instead of the create schema
        #[arg(long)]
        update: bool,
    },
    /// Parse a config file and report every problem found
    Check {
        /// Keep unknown section types and options instead of dropping them
        #[arg(long)]
        allow_unknown: bool,

        file: PathBuf,
    },
    /// Print a config file in normalized form
    Fmt {
        /// Keep unknown section types and options instead of dropping them
        #[arg(long)]
        allow_unknown: bool,

        file: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut settings = Settings::load_from(&args.settings);
    debug!(?settings, "effective settings");

    match args.command {
        Command::Schema { isolate, update } => {
            settings.schema.isolate_properties |= isolate;
            let config = load_config(&args.plugins, settings.schema)?;
            println!("{}", schema_json(&config, update)?);
        }
        Command::Check { allow_unknown, file } => {
            settings.parser.allow_unknown |= allow_unknown;
            let config = load_config(&args.plugins, settings.schema)?;
            let codec = DocumentCodec::from_settings(config, &settings);
            let report = check_text(&codec, &read_file(&file)?);
            for warning in &report.warnings {
                println!("{}: {}", file.display(), warning);
            }
            println!("{}: {} sections, {} warnings", file.display(), report.sections, report.warnings.len());
            if !report.is_clean() {
                warn!("{} has problems", file.display());
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::Fmt { allow_unknown, file } => {
            settings.parser.allow_unknown |= allow_unknown;
            let config = load_config(&args.plugins, settings.schema)?;
            let codec = DocumentCodec::from_settings(config, &settings);
            print!("{}", format_text(&codec, &read_file(&file)?)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

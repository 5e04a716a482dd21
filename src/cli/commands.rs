use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crate::core::{
    config::ScanConfig,
    controller::{ScanController, ScanRecord},
    error::ScanError,
    platform::PcscProvider,
    reader::{choose_reader, list_readers},
    service::{CardService, CardServiceProvider, PresenceState},
};
use crate::gui::app::run_gui;

#[derive(Parser)]
#[command(name = "idm-scanner")]
#[command(about = "Read the unique identifier (IDm) of contactless cards through a PCSC reader")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Card presence poll interval in milliseconds (overrides the config file)
    #[arg(long, global = true)]
    pub poll_interval: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List available PCSC readers and mark the one a scan would use
    List {
        /// Show whether a card is present on each reader
        #[arg(short = 'l', long)]
        detailed: bool,
    },

    /// Wait for a card and print its identifier
    Scan {
        /// Give up after this many seconds (waits forever by default)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Output format: spaced, hex or json
        #[arg(short, long, default_value = "spaced")]
        format: OutputFormat,
    },

    /// Open the scanner window
    Gui,
}

#[derive(Clone, Debug, PartialEq)]
pub enum OutputFormat {
    Spaced,
    Hex,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spaced" => Ok(OutputFormat::Spaced),
            "hex" => Ok(OutputFormat::Hex),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {s}")),
        }
    }
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        log::LevelFilter::Debug
    } else if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config = load_config(cli.config.as_deref(), cli.poll_interval)?;

    match cli.command {
        Commands::List { detailed } => cmd_list(&config, detailed),
        Commands::Scan { timeout, format } => cmd_scan(config, timeout, &format),
        Commands::Gui => run_gui(config),
    }
}

/// Build the effective configuration from an optional file and CLI overrides
pub fn load_config(path: Option<&std::path::Path>, poll_interval: Option<u64>) -> Result<ScanConfig> {
    let mut config = match path {
        Some(path) => ScanConfig::load(path).context("Failed to load configuration")?,
        None => ScanConfig::default(),
    };

    if let Some(ms) = poll_interval {
        config.poll_interval_ms = ms;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn cmd_list(config: &ScanConfig, detailed: bool) -> Result<()> {
    let service = PcscProvider::new(config.scope)
        .establish()
        .context("Failed to initialize PCSC")?;

    let readers = match list_readers(&service) {
        Ok(readers) => readers,
        Err(ScanError::NoReaders) => {
            println!("No PCSC readers found.");
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to list readers"),
    };

    let selected = choose_reader(&readers, &config.preferred_readers);

    println!("Available PCSC readers (* = used for scanning):");
    for (i, reader) in readers.iter().enumerate() {
        let marker = if i == selected { '*' } else { ' ' };
        println!(" {marker}[{i}] {reader}");
        if detailed {
            let status = match service.wait_for_change(reader, PresenceState::UNAWARE, Duration::ZERO) {
                Ok(Some(state)) if state.contains(PresenceState::PRESENT) => "Card present",
                Ok(Some(state)) if state.contains(PresenceState::EMPTY) => "No card",
                Ok(_) | Err(_) => "Unknown",
            };
            println!("      Status: {status}");
        }
    }

    Ok(())
}

fn cmd_scan(config: ScanConfig, timeout: Option<u64>, format: &OutputFormat) -> Result<()> {
    let tick = config.poll_interval();
    let deadline = timeout.map(Duration::from_secs);

    let mut controller = ScanController::pcsc(config);
    controller.start();
    let started = Instant::now();

    eprintln!("Waiting for a card...");
    while !controller.is_ready() {
        if !controller.is_ok() {
            bail!("Scan failed: PCSC service or reader unavailable");
        }
        if !controller.is_running() && !controller.is_ready() {
            bail!("Scan stopped before a card was read");
        }
        if let Some(deadline) = deadline {
            if started.elapsed() >= deadline {
                controller.stop();
                bail!("Timed out after {}s waiting for a card", deadline.as_secs());
            }
        }
        thread::sleep(tick);
    }

    let record = controller
        .record()
        .context("Scan finished without a result")?;
    print_record(&record, format)
}

fn print_record(record: &ScanRecord, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Spaced => {
            println!("IDm: {}", record.identifier);
            if let Some(ref reader) = record.reader {
                println!("Reader: {reader}");
            }
            if let Some(protocol) = record.protocol {
                println!("Protocol: {protocol}");
            }
        }
        OutputFormat::Hex => {
            println!("{}", record.identifier.to_hex());
        }
        OutputFormat::Json => {
            let json =
                serde_json::to_string_pretty(record).context("Failed to serialize scan record")?;
            println!("{json}");
        }
    }

    Ok(())
}

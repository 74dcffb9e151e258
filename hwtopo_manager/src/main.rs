use clap::{Parser, Subcommand};
use colored::*;
use hwtopo_core::config::Options;
use hwtopo_core::error::HwResult;
use hwtopo_core::hardware::{CategoryFilter, DiscoveryOptions};
use std::path::PathBuf;

use hwtopo_manager::commands::hardware::{self, OutputFormat, OutputOptions};

#[derive(Parser)]
#[command(name = "hwtopo")]
#[command(about = "hwtopo - bus topology inventory for Linux sysfs")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase output verbosity (show debug messages and device details)
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    /// Suppress everything but errors in the log
    #[arg(short = 'Q', long = "quiet-all", global = true)]
    quiet_all: bool,

    /// Filesystem root holding the sys/ tree (default: /)
    #[arg(long = "root", value_name = "DIR", global = true)]
    root: Option<PathBuf>,

    /// YAML options file
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Human,
        global = true
    )]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long = "pretty", global = true)]
    pretty: bool,

    /// Threads used to resolve USB devices
    #[arg(short = 'j', long = "workers", value_name = "N", global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List root USB devices with their parent bus and ACS state
    Usb,
    /// List CAN network interfaces
    Can,
    /// List legacy serial ports
    Serial,
    /// Show the TPM, if present
    Tpm,
    /// List watchdog timers
    Watchdog,
    /// Scan every device class
    Scan {
        /// Limit the scan to these classes (comma separated)
        #[arg(long = "only", value_name = "CLASS", value_delimiter = ',')]
        only: Vec<CategoryFilter>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize structured logging based on verbosity flags
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet_all {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    log::debug!("hwtopo v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Defaults, then the config file, then `HWTOPO_*`, then flags
fn load_options(cli: &Cli) -> HwResult<Options> {
    let mut options = match &cli.config {
        Some(path) => Options::from_file(path)?.merge_env(),
        None => Options::from_env(),
    };
    if let Some(root) = &cli.root {
        options = options.with_root(root);
    }
    if let Some(workers) = cli.workers {
        options = options.with_workers(workers);
    }
    options.validate()?;
    log::debug!("options: {:?}", options);
    Ok(options)
}

fn run(cli: Cli) -> HwResult<()> {
    let settings = load_options(&cli)?;
    let out = OutputOptions {
        format: cli.format,
        pretty: cli.pretty,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Usb => hardware::run_usb(settings, &out),
        Commands::Can => hardware::run_can(settings, &out),
        Commands::Serial => hardware::run_serial(settings, &out),
        Commands::Tpm => hardware::run_tpm(settings, &out),
        Commands::Watchdog => hardware::run_watchdog(settings, &out),
        Commands::Scan { only } => {
            if !only.is_empty() {
                let classes: Vec<String> = only.iter().map(ToString::to_string).collect();
                log::debug!("scan limited to {}", classes.join(","));
            }
            hardware::run_scan(settings, DiscoveryOptions::only(&only), &out)
        }
    }
}

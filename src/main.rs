//! Betriebsratsumlage - yearly works council levy from payslips
//!
//! A CLI tool that reads a year's payslips, extracts the
//! Betriebsratsumlage of each month and writes a CSV summary.
//!
//! Exit codes:
//!   0 - Success (all twelve months found, no document failed)
//!   1 - A document failed, a month is missing, or a runtime error occurred

mod cli;
mod config;
mod decoder;
mod error;
mod extract;
mod ledger;
mod models;
mod report;
mod run;
mod scanner;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, CONFIG_FILE};
use extract::ValueExtractor;
use scanner::{PayslipScanner, ScanConfig, ScanResult};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("Betriebsratsumlage v{}", env!("CARGO_PKG_VERSION"));

    match run(&args) {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .betriebsratsumlage.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize marker, file names, delimiter and decoder.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete extraction for one year. Returns the exit code.
fn run(args: &Args) -> Result<i32> {
    let mut config = load_config(args)?;
    config.merge_with_args(args);
    config.validate()?;
    debug!("Configuration: {:?}", config);

    let year = args.year();
    let dir = args
        .path
        .clone()
        .context("Payslip directory is required")?;

    // Step 1: Find the payslips
    let scan_config = ScanConfig::new(year, &config.scanner);
    let scan = PayslipScanner::new(dir.clone(), scan_config).scan()?;
    if scan.is_empty() {
        anyhow::bail!(
            "No payslip files found in {} for {} (name containing '{}', extension '{}')",
            dir.display(),
            year,
            config.scanner.name_pattern,
            config.scanner.extension
        );
    }

    // Handle --dry-run: list files and exit
    if args.dry_run {
        return handle_dry_run(&scan);
    }

    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let password = config::resolve_password(args.password.as_deref(), &cwd)?;
    if config.decoder.kind.needs_password() && password.is_none() {
        anyhow::bail!(
            "No payslip password given; use --password, set BRU_PASSWORD or add password=... to a .env file"
        );
    }

    let extractor = ValueExtractor::new(&config.extraction.marker)
        .with_context(|| format!("Invalid marker '{}'", config.extraction.marker))?;
    debug!("Looking for marker {}", extractor.marker());
    let decoder = decoder::build_decoder(config.decoder.kind, &config.decoder.pdftotext_path);

    // Step 2: Extract the value of every payslip
    if !args.quiet {
        println!(
            "📄 Processing {} payslip(s) for {}...",
            scan.payslips.len(),
            year
        );
    }

    let summary = run::process_scan(
        year,
        scan,
        decoder.as_ref(),
        &extractor,
        password.as_deref(),
    );
    let total = summary
        .ledger
        .sum()
        .context("Sum of the monthly values overflows")?;
    info!("Sum: {:.2}", total);

    // Step 3: Write the summary
    let output = config.output_path();
    report::write_summary(&summary, config.general.format, &output, config.delimiter_byte())?;
    info!("{:?} output: '{}'", config.general.format, output.display());

    if !args.quiet {
        println!("\n📊 Summary for {}:", year);
        println!("   Months found: {}/12", summary.ledger.len());
        println!(
            "   Sum: {}",
            report::format_amount(total, config.delimiter_byte())
        );
        if !summary.failures.is_empty() {
            println!("   Failed documents: {}", summary.failures.len());
            for failure in &summary.failures {
                println!("     - {} ({})", failure.path.display(), failure.kind);
            }
        }
        if summary.is_success() {
            println!("\n✅ Complete! Summary saved to: {}", output.display());
        } else {
            println!(
                "\n⚠️  Incomplete. Partial summary saved to: {}",
                output.display()
            );
        }
    }

    Ok(summary.exit_code())
}

/// Handle --dry-run: list the payslips that would be processed, exit.
fn handle_dry_run(scan: &ScanResult) -> Result<i32> {
    println!("\n🔍 Dry run: listing payslips (nothing is decoded)...\n");

    for payslip in &scan.payslips {
        println!("     📄 {:>2}  {}", payslip.month, payslip.path.display());
    }
    for failure in &scan.rejected {
        println!("     ⚠️  {}", failure.message);
    }

    let found: BTreeSet<u32> = scan.payslips.iter().map(|p| p.month).collect();
    let missing: Vec<String> = ledger::MONTHS
        .filter(|m| !found.contains(m))
        .map(|m| m.to_string())
        .collect();
    if !missing.is_empty() {
        println!("\n   No payslip for months: {}", missing.join(", "));
    }

    println!("\n✅ Dry run complete. No documents were decoded.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

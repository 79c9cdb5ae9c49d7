//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Options left unset fall back to the
//! configuration file and then to built-in defaults.

use crate::decoder::DecoderKind;
use crate::report::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Betriebsratsumlage - sum the works council levy of a year's payslips
///
/// Reads every payslip of the given year from a directory, extracts the
/// Betriebsratsumlage line (wage type 841) and writes one CSV row per
/// month plus the yearly sum.
///
/// Examples:
///   betriebsratsumlage ~/Documents/Gehalt 2023
///   betriebsratsumlage ~/Documents/Gehalt 2023 --delimiter , -o umlage.csv
///   betriebsratsumlage ./texts 2023 --decoder text --extension txt
///   betriebsratsumlage ~/Documents/Gehalt 2023 --dry-run
///   betriebsratsumlage --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the payslips
    #[arg(value_name = "PATH", required_unless_present = "init_config")]
    pub path: Option<PathBuf>,

    /// Year to collect (e.g. 2023)
    #[arg(value_name = "YEAR", required_unless_present = "init_config")]
    pub year: Option<String>,

    /// Output file path [default: Betriebsratsumlage.csv]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// CSV delimiter; `;` writes decimal commas [default: ;]
    #[arg(short, long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Output format (csv, json) [default: csv]
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Password of the encrypted payslips [fallback: `password` in .env]
    #[arg(long, env = "BRU_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Text decoder (pdftotext, text) [default: pdftotext]
    #[arg(long, value_name = "DECODER")]
    pub decoder: Option<DecoderKind>,

    /// Path to the pdftotext executable
    #[arg(long, value_name = "FILE")]
    pub pdftotext: Option<PathBuf>,

    /// Wage type code of the Betriebsratsumlage line [default: 841]
    #[arg(long, value_name = "CODE")]
    pub marker: Option<String>,

    /// Substring every payslip file name contains [default: Nettoschein]
    #[arg(long, value_name = "TEXT")]
    pub name_pattern: Option<String>,

    /// Payslip file extension [default: pdf]
    #[arg(long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Search subdirectories too
    #[arg(short, long)]
    pub recursive: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .betriebsratsumlage.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// List the payslips that would be processed and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .betriebsratsumlage.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The year as a number; call after `validate`.
    pub fn year(&self) -> i32 {
        self.year
            .as_deref()
            .and_then(|y| y.parse().ok())
            .unwrap_or_default()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let year = self.year.as_deref().unwrap_or("");
        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Year must have four digits: '{}'", year));
        }

        match self.path {
            Some(ref path) if !path.exists() => {
                return Err(format!("Directory does not exist: {}", path.display()));
            }
            Some(ref path) if !path.is_dir() => {
                return Err(format!("Path is not a directory: {}", path.display()));
            }
            Some(_) => {}
            None => return Err("Payslip directory is required".to_string()),
        }

        if let Some(delimiter) = self.delimiter {
            crate::config::validate_delimiter(delimiter)?;
        }

        if let Some(ref marker) = self.marker {
            if marker.trim().is_empty() {
                return Err("Marker must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_args(dir: &TempDir) -> Args {
        Args::parse_from([
            "betriebsratsumlage",
            dir.path().to_str().unwrap(),
            "2023",
        ])
    }

    #[test]
    fn test_parse_positional() {
        let dir = TempDir::new().unwrap();
        let args = make_args(&dir);
        assert_eq!(args.year(), 2023);
        assert!(args.output.is_none());
        assert!(args.delimiter.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_options() {
        let dir = TempDir::new().unwrap();
        let args = Args::parse_from([
            "betriebsratsumlage",
            dir.path().to_str().unwrap(),
            "2023",
            "--delimiter",
            ",",
            "--format",
            "json",
            "--decoder",
            "text",
            "-o",
            "out.json",
        ]);
        assert_eq!(args.delimiter, Some(','));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.decoder, Some(DecoderKind::Text));
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_init_config_needs_no_positionals() {
        let args = Args::parse_from(["betriebsratsumlage", "--init-config"]);
        assert!(args.init_config);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_year() {
        let dir = TempDir::new().unwrap();
        let mut args = make_args(&dir);
        args.year = Some("23".to_string());
        assert!(args.validate().is_err());
        args.year = Some("20x3".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_directory() {
        let dir = TempDir::new().unwrap();
        let mut args = make_args(&dir);
        args.path = Some(dir.path().join("missing"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_delimiter() {
        let dir = TempDir::new().unwrap();
        let mut args = make_args(&dir);
        args.delimiter = Some('.');
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let dir = TempDir::new().unwrap();
        let mut args = make_args(&dir);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let dir = TempDir::new().unwrap();
        let mut args = make_args(&dir);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}

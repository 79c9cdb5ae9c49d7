//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.betriebsratsumlage.toml` files. The payslip password is never read
//! from this file; without `--password` or `BRU_PASSWORD` it comes from
//! the `password` key of the nearest `.env` file.

use crate::decoder::DecoderKind;
use crate::extract::DEFAULT_MARKER;
use crate::report::{OutputFormat, DEFAULT_DELIMITER};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".betriebsratsumlage.toml";

/// Dotenv file searched for the payslip password.
pub const DOTENV_FILE: &str = ".env";

/// Key of the payslip password in the dotenv file.
pub const DOTENV_PASSWORD_KEY: &str = "password";

/// Output file name without extension, used when no output path is set.
pub const DEFAULT_OUTPUT_STEM: &str = "Betriebsratsumlage";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Value extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Decoder settings.
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Output file path. Defaults to `Betriebsratsumlage.<format>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// CSV delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            delimiter: default_delimiter(),
            format: OutputFormat::default(),
        }
    }
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

/// Value extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Wage type code of the Betriebsratsumlage line.
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
        }
    }
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

/// Payslip scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Substring of payslip file names.
    #[serde(default = "default_name_pattern")]
    pub name_pattern: String,

    /// Payslip file extension.
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Search subdirectories too.
    #[serde(default)]
    pub recursive: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            name_pattern: default_name_pattern(),
            extension: default_extension(),
            recursive: false,
        }
    }
}

fn default_name_pattern() -> String {
    "Nettoschein".to_string()
}

fn default_extension() -> String {
    "pdf".to_string()
}

/// Text decoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Decoder to use.
    #[serde(default)]
    pub kind: DecoderKind,

    /// Path or name of the `pdftotext` executable.
    #[serde(default = "default_pdftotext_path")]
    pub pdftotext_path: PathBuf,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            kind: DecoderKind::default(),
            pdftotext_path: default_pdftotext_path(),
        }
    }
}

fn default_pdftotext_path() -> PathBuf {
    PathBuf::from("pdftotext")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if let Some(delimiter) = args.delimiter {
            self.general.delimiter = delimiter;
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }
        if let Some(ref marker) = args.marker {
            self.extraction.marker = marker.clone();
        }
        if let Some(ref name_pattern) = args.name_pattern {
            self.scanner.name_pattern = name_pattern.clone();
        }
        if let Some(ref extension) = args.extension {
            self.scanner.extension = extension.trim_start_matches('.').to_string();
        }
        if let Some(decoder) = args.decoder {
            self.decoder.kind = decoder;
        }
        if let Some(ref pdftotext) = args.pdftotext {
            self.decoder.pdftotext_path = pdftotext.clone();
        }

        // Flags always override
        if args.recursive {
            self.scanner.recursive = true;
        }
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        validate_delimiter(self.general.delimiter).map_err(anyhow::Error::msg)?;
        if self.extraction.marker.trim().is_empty() {
            anyhow::bail!("Marker must not be empty");
        }
        if self.scanner.extension.is_empty() {
            anyhow::bail!("Extension must not be empty");
        }
        Ok(())
    }

    /// Where the summary is written.
    pub fn output_path(&self) -> PathBuf {
        match self.general.output {
            Some(ref output) => PathBuf::from(output),
            None => {
                PathBuf::from(DEFAULT_OUTPUT_STEM).with_extension(self.general.format.extension())
            }
        }
    }

    /// CSV delimiter as a byte; validated to be ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        self.general.delimiter as u8
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Payslip password: the command line value, else the nearest `.env` file.
///
/// The `.env` file is searched in `start` and its parent directories. It is
/// only parsed, never exported into the process environment.
pub fn resolve_password(given: Option<&str>, start: &Path) -> Result<Option<String>> {
    if let Some(password) = given {
        return Ok(Some(password.to_string()));
    }

    let Some(path) = find_dotenv(start) else {
        debug!("No {} file found from {}", DOTENV_FILE, start.display());
        return Ok(None);
    };
    debug!("Reading password from {}", path.display());
    dotenv_password(&path)
}

/// Nearest `.env` file in `start` or one of its ancestors.
pub fn find_dotenv(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(DOTENV_FILE))
        .find(|path| path.is_file())
}

/// Value of the `password` key in a dotenv file.
fn dotenv_password(path: &Path) -> Result<Option<String>> {
    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    for entry in entries {
        let (key, value) =
            entry.with_context(|| format!("Failed to parse {}", path.display()))?;
        if key == DOTENV_PASSWORD_KEY {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// A delimiter must be one ASCII character that cannot appear in a value.
pub fn validate_delimiter(delimiter: char) -> std::result::Result<(), String> {
    if !delimiter.is_ascii()
        || delimiter.is_ascii_alphanumeric()
        || matches!(delimiter, '.' | ':' | '"' | '\n' | '\r')
    {
        return Err(format!("Invalid CSV delimiter: {:?}", delimiter));
    }
    Ok(())
}

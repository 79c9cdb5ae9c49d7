//! Payslip discovery.
//!
//! Payslips are named `YYYYMM<anything>`, e.g. `202301_Nettoschein.pdf`.
//! The scanner selects the files of one year and reads the month from
//! the two digits after the year.

use crate::models::{DocumentFailure, FailureKind, Payslip};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Configuration for payslip scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Year to collect.
    pub year: i32,
    /// Substring every payslip file name contains.
    pub name_pattern: String,
    /// File extension (without dot).
    pub extension: String,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl ScanConfig {
    pub fn new(year: i32, config: &crate::config::ScannerConfig) -> Self {
        Self {
            year,
            name_pattern: config.name_pattern.clone(),
            extension: config.extension.clone(),
            recursive: config.recursive,
        }
    }
}

/// Files found for the requested year.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Payslips with a valid month, in file name order.
    pub payslips: Vec<Payslip>,
    /// Matching files whose name does not carry a valid month.
    pub rejected: Vec<DocumentFailure>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.payslips.is_empty() && self.rejected.is_empty()
    }
}

/// Scanner for payslip documents in a directory.
pub struct PayslipScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl PayslipScanner {
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all payslips of the configured year.
    pub fn scan(&self) -> Result<ScanResult> {
        if !self.root.is_dir() {
            anyhow::bail!("Not a directory: {}", self.root.display());
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let mut result = ScanResult::default();

        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
        {
            let entry = entry
                .with_context(|| format!("Failed to scan {}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if !self.matches(path) {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            match parse_month(&name, self.config.year) {
                Ok(month) => {
                    debug!("Found payslip for month {}: {}", month, path.display());
                    result.payslips.push(Payslip {
                        path: path.to_path_buf(),
                        year: self.config.year,
                        month,
                    });
                }
                Err(reason) => {
                    result.rejected.push(DocumentFailure::new(
                        path,
                        None,
                        FailureKind::Rejected,
                        reason,
                    ));
                }
            }
        }

        Ok(result)
    }

    /// Check if a file name matches year, name pattern and extension.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case(&self.config.extension) {
            return false;
        }

        name.starts_with(&self.config.year.to_string()) && name.contains(&self.config.name_pattern)
    }
}

/// Read the month that follows the year prefix of a file name.
fn parse_month(name: &str, year: i32) -> std::result::Result<u32, String> {
    let rest = &name[year.to_string().len()..];
    let digits: String = rest.chars().take(2).collect();

    if digits.len() != 2 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("No month after year {} in file name '{}'", year, name));
    }

    let month: u32 = digits
        .parse()
        .map_err(|_| format!("No month after year {} in file name '{}'", year, name))?;
    if !crate::ledger::MONTHS.contains(&month) {
        return Err(format!("Invalid month {:02} in file name '{}'", month, name));
    }

    Ok(month)
}

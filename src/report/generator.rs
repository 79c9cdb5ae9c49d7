//! CSV and JSON summary generation.
//!
//! The CSV has one `<month><delimiter><value>` row per ledger entry in
//! insertion order, followed by `Sum:<delimiter><total>`. Values carry
//! two decimal places. With the `;` delimiter the decimal separator is a
//! comma, as spreadsheet software in German locales expects.

use crate::ledger::MonthlyLedger;
use crate::models::{DocumentFailure, RunSummary};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use csv::{Terminator, WriterBuilder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Default CSV delimiter.
pub const DEFAULT_DELIMITER: char = ';';

/// Output format for the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// CSV format (default)
    #[default]
    Csv,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension of the format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Format an amount with two decimal places.
pub fn format_amount(value: Decimal, delimiter: u8) -> String {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    let formatted = rounded.to_string();

    if delimiter == b';' {
        formatted.replace('.', ",")
    } else {
        formatted
    }
}

/// Generate the CSV summary of a ledger.
pub fn generate_csv(ledger: &MonthlyLedger, delimiter: u8) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for (month, value) in ledger.iter() {
        writer.write_record([month.to_string(), format_amount(value, delimiter)])?;
    }
    let total = ledger.sum().context("Sum of the monthly values overflows")?;
    writer.write_record(["Sum:".to_string(), format_amount(total, delimiter)])?;

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV output: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Write the CSV summary to a file.
pub fn write_csv(path: &Path, ledger: &MonthlyLedger, delimiter: u8) -> Result<()> {
    let content = generate_csv(ledger, delimiter)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write CSV to {}", path.display()))
}

#[derive(Serialize)]
struct JsonSummary<'a> {
    year: i32,
    generated_at: DateTime<Utc>,
    complete: bool,
    months: Vec<JsonMonth>,
    sum: Decimal,
    missing: &'a BTreeSet<u32>,
    failures: &'a [DocumentFailure],
}

#[derive(Serialize)]
struct JsonMonth {
    month: u32,
    value: Decimal,
}

/// Generate a JSON summary of a run.
pub fn generate_json_summary(summary: &RunSummary) -> Result<String> {
    let json = JsonSummary {
        year: summary.year,
        generated_at: Utc::now(),
        complete: summary.is_success(),
        months: summary
            .ledger
            .iter()
            .map(|(month, value)| JsonMonth { month, value })
            .collect(),
        sum: summary
            .ledger
            .sum()
            .context("Sum of the monthly values overflows")?,
        missing: &summary.missing,
        failures: &summary.failures,
    };

    serde_json::to_string_pretty(&json).map_err(Into::into)
}

/// Write the summary of a run in the requested format.
pub fn write_summary(
    summary: &RunSummary,
    format: OutputFormat,
    path: &Path,
    delimiter: u8,
) -> Result<()> {
    match format {
        OutputFormat::Csv => write_csv(path, &summary.ledger, delimiter),
        OutputFormat::Json => {
            let content = generate_json_summary(summary)?;
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write JSON summary to {}", path.display()))
        }
    }
}

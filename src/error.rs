//! Error types for payslip decoding and value extraction.
//!
//! Per-document errors are recoverable: the run loop logs them and moves on
//! to the next payslip. Only plumbing failures (config, directory, output)
//! go through `anyhow` and abort the run.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain plain text from a payslip document.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run '{program}' for '{path}': {source}")]
    Spawn {
        program: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid password for '{path}'")]
    InvalidPassword { path: PathBuf },

    #[error("Error reading '{path}' (exit status {status}): {stderr}")]
    Failed {
        path: PathBuf,
        status: i32,
        stderr: String,
    },
}

/// Failure to find the deduction value in a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Betriebsratsumlage value not found")]
    ValueNotFound,

    #[error("Betriebsratsumlage value '{raw}' is not a valid amount")]
    InvalidAmount { raw: String },
}

/// One or more calendar months have no recorded value after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompleteCoverage {
    pub missing: BTreeSet<u32>,
}

impl fmt::Display for IncompleteCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let months: Vec<String> = self.missing.iter().map(u32::to_string).collect();
        write!(f, "Missing months: {}", months.join(", "))
    }
}

impl std::error::Error for IncompleteCoverage {}

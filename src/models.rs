//! Data models shared by discovery, the run loop and reporting.

use crate::ledger::MonthlyLedger;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A discovered payslip document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payslip {
    /// Full path to the document.
    pub path: PathBuf,
    /// Year taken from the file name.
    pub year: i32,
    /// Month taken from the file name (1 to 12).
    pub month: u32,
}

impl Payslip {
    /// File name for log messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Why a document did not contribute a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// File name matched the search but its month is not 1 to 12.
    Rejected,
    /// The document could not be opened, decrypted or read.
    Decode,
    /// No marker line with a valid amount.
    ValueNotFound,
    /// The value would push the yearly sum past the `Decimal` range.
    Overflow,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Rejected => write!(f, "rejected"),
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::ValueNotFound => write!(f, "value not found"),
            FailureKind::Overflow => write!(f, "sum overflow"),
        }
    }
}

/// A per-document failure recorded during a run.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    /// Month of the document, if the file name yielded a valid one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    pub kind: FailureKind,
    pub message: String,
}

impl DocumentFailure {
    pub fn new(path: &Path, month: Option<u32>, kind: FailureKind, message: String) -> Self {
        Self {
            path: path.to_path_buf(),
            month,
            kind,
            message,
        }
    }
}

/// Result of processing one year's payslips.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub year: i32,
    pub ledger: MonthlyLedger,
    pub failures: Vec<DocumentFailure>,
    pub missing: BTreeSet<u32>,
}

impl RunSummary {
    /// True when every month has a value and no document failed.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.missing.is_empty()
    }

    /// Process exit code: 0 on success, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

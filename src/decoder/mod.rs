//! Payslip text decoding.
//!
//! PDF payslips are usually password protected. Text is extracted with
//! poppler's `pdftotext`, which handles decryption itself. Payslips that
//! were converted beforehand can be read as plain text files.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Turns a payslip document into plain text.
pub trait TextDecoder {
    /// Extract the text of all pages of `path`.
    fn decode(&self, path: &Path, password: Option<&str>) -> Result<String, DecodeError>;
}

/// Available decoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DecoderKind {
    /// PDF documents via `pdftotext` (default)
    #[default]
    Pdftotext,
    /// Already extracted UTF-8 text files
    Text,
}

impl DecoderKind {
    /// Whether documents of this kind need a password.
    pub fn needs_password(&self) -> bool {
        matches!(self, DecoderKind::Pdftotext)
    }
}

/// Build the decoder for `kind`.
pub fn build_decoder(kind: DecoderKind, pdftotext_path: &Path) -> Box<dyn TextDecoder> {
    match kind {
        DecoderKind::Pdftotext => Box::new(PdftotextDecoder::new(pdftotext_path.to_path_buf())),
        DecoderKind::Text => Box::new(PlainTextDecoder),
    }
}

/// Decoder running the `pdftotext` command line tool.
///
/// Output keeps the physical layout so a label and its amount stay on one
/// line. The password is passed as `-upw` and is visible in process
/// listings of the same machine while `pdftotext` runs.
#[derive(Debug, Clone)]
pub struct PdftotextDecoder {
    program: PathBuf,
}

impl PdftotextDecoder {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }

    fn args(path: &Path, password: Option<&str>) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> =
            vec!["-layout".into(), "-enc".into(), "UTF-8".into()];
        if let Some(password) = password {
            args.push("-upw".into());
            args.push(password.into());
        }
        args.push(path.as_os_str().to_os_string());
        // write to stdout
        args.push("-".into());
        args
    }
}

impl TextDecoder for PdftotextDecoder {
    fn decode(&self, path: &Path, password: Option<&str>) -> Result<String, DecodeError> {
        debug!("Running {} on {}", self.program.display(), path.display());

        let output = Command::new(&self.program)
            .args(Self::args(path, password))
            .output()
            .map_err(|source| DecodeError::Spawn {
                program: self.program.display().to_string(),
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if stderr.to_lowercase().contains("password") {
                return Err(DecodeError::InvalidPassword {
                    path: path.to_path_buf(),
                });
            }
            return Err(DecodeError::Failed {
                path: path.to_path_buf(),
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Decoder for payslips already converted to text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextDecoder;

impl TextDecoder for PlainTextDecoder {
    fn decode(&self, path: &Path, _password: Option<&str>) -> Result<String, DecodeError> {
        std::fs::read_to_string(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

//! Betriebsratsumlage value extraction.
//!
//! Payslips list the works council levy on a line that starts with a
//! three digit wage type code, followed by a free text label and the
//! amount with a decimal comma, e.g. `841 Betriebsratsumlage 4,29`.
//! Retroactive corrections add further lines with the same code, so every
//! occurrence is summed.

use crate::error::ExtractError;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

/// Wage type code of the Betriebsratsumlage line.
pub const DEFAULT_MARKER: &str = "841";

/// Finds and sums the marker lines in a payslip's text.
#[derive(Debug, Clone)]
pub struct ValueExtractor {
    marker: String,
    pattern: Regex,
}

impl ValueExtractor {
    /// Build an extractor for the given marker code.
    pub fn new(marker: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(r"{} [a-zA-Z. ]+ (\d+,\d+)", regex::escape(marker)))?;
        Ok(Self {
            marker: marker.to_string(),
            pattern,
        })
    }

    /// The marker code this extractor looks for.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// All amounts following the marker, in text order.
    pub fn amounts(&self, text: &str) -> Result<Vec<Decimal>, ExtractError> {
        self.pattern
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| parse_amount(m.as_str()))
            .collect()
    }

    /// Sum of all amounts following the marker.
    ///
    /// Fails with [`ExtractError::ValueNotFound`] if the marker does not
    /// appear with a well-formed amount anywhere in `text`, and with
    /// [`ExtractError::InvalidAmount`] if the total does not fit a `Decimal`.
    pub fn extract(&self, text: &str) -> Result<Decimal, ExtractError> {
        let amounts = self.amounts(text)?;
        if amounts.is_empty() {
            return Err(ExtractError::ValueNotFound);
        }

        debug!("Marker {} matched {} time(s): {:?}", self.marker, amounts.len(), amounts);
        amounts
            .iter()
            .try_fold(Decimal::ZERO, |total, amount| total.checked_add(*amount))
            .ok_or_else(|| ExtractError::InvalidAmount {
                raw: amounts
                    .iter()
                    .map(|amount| amount.to_string().replace('.', ","))
                    .collect::<Vec<_>>()
                    .join(" + "),
            })
    }
}

/// Parse an amount written with a decimal comma (`12,50`).
fn parse_amount(raw: &str) -> Result<Decimal, ExtractError> {
    raw.replace(',', ".")
        .parse::<Decimal>()
        .map_err(|_| ExtractError::InvalidAmount {
            raw: raw.to_string(),
        })
}

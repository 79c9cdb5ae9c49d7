//! Orchestration of one year's run.
//!
//! Payslips are processed one at a time in discovery order. A document
//! that cannot be decoded or has no Betriebsratsumlage line is logged and
//! recorded as a failure; the loop always continues with the next one.
//! Files the scanner rejected count as failures of the same run.

use crate::decoder::TextDecoder;
use crate::error::IncompleteCoverage;
use crate::extract::ValueExtractor;
use crate::ledger::MonthlyLedger;
use crate::models::{DocumentFailure, FailureKind, Payslip, RunSummary};
use crate::scanner::ScanResult;
use tracing::{debug, error, info, warn};

/// Process a scan result: rejected files first, then every payslip.
pub fn process_scan(
    year: i32,
    scan: ScanResult,
    decoder: &dyn TextDecoder,
    extractor: &ValueExtractor,
    password: Option<&str>,
) -> RunSummary {
    let ScanResult { payslips, rejected } = scan;
    for failure in &rejected {
        error!("{}", failure.message);
    }

    let mut summary = process_payslips(year, &payslips, decoder, extractor, password);
    let mut failures = rejected;
    failures.append(&mut summary.failures);
    summary.failures = failures;
    summary
}

/// Extract the value of each payslip into a fresh ledger.
pub fn process_payslips(
    year: i32,
    payslips: &[Payslip],
    decoder: &dyn TextDecoder,
    extractor: &ValueExtractor,
    password: Option<&str>,
) -> RunSummary {
    let mut ledger = MonthlyLedger::new();
    let mut failures = Vec::new();

    for payslip in payslips {
        match process_payslip(payslip, decoder, extractor, password) {
            Ok(value) => {
                if ledger.sum_with(payslip.month, value).is_none() {
                    let failure = DocumentFailure::new(
                        &payslip.path,
                        Some(payslip.month),
                        FailureKind::Overflow,
                        format!(
                            "Value {} from '{}' overflows the yearly sum",
                            value,
                            payslip.path.display()
                        ),
                    );
                    error!("{}", failure.message);
                    failures.push(failure);
                    continue;
                }

                info!("{:>2} {:.2}", payslip.month, value);
                if let Some(previous) = ledger.put(payslip.month, value) {
                    warn!(
                        "Month {} found again in '{}', replacing {:.2}",
                        payslip.month,
                        payslip.file_name(),
                        previous
                    );
                }
            }
            Err(failure) => {
                error!("{}", failure.message);
                failures.push(failure);
            }
        }
    }

    let missing = ledger.missing_months();
    if !missing.is_empty() {
        error!(
            "{}",
            IncompleteCoverage {
                missing: missing.clone()
            }
        );
    }

    RunSummary {
        year,
        ledger,
        failures,
        missing,
    }
}

fn process_payslip(
    payslip: &Payslip,
    decoder: &dyn TextDecoder,
    extractor: &ValueExtractor,
    password: Option<&str>,
) -> Result<rust_decimal::Decimal, DocumentFailure> {
    debug!(
        "Decoding {} ({}-{:02})",
        payslip.file_name(),
        payslip.year,
        payslip.month
    );
    let text = decoder.decode(&payslip.path, password).map_err(|e| {
        DocumentFailure::new(
            &payslip.path,
            Some(payslip.month),
            FailureKind::Decode,
            e.to_string(),
        )
    })?;

    extractor.extract(&text).map_err(|e| {
        DocumentFailure::new(
            &payslip.path,
            Some(payslip.month),
            FailureKind::ValueNotFound,
            format!("{} in '{}'", e, payslip.path.display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::PlainTextDecoder;
    use crate::extract::DEFAULT_MARKER;
    use crate::ledger::MONTHS;
    use crate::report::generate_csv;
    use crate::scanner::{PayslipScanner, ScanConfig};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::collections::BTreeSet;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_payslip(dir: &Path, month: u32, body: &str) {
        let name = format!("2023{:02}_Nettoschein.txt", month);
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn scan_result(dir: &Path) -> ScanResult {
        let config = ScanConfig {
            year: 2023,
            name_pattern: "Nettoschein".to_string(),
            extension: "txt".to_string(),
            recursive: false,
        };
        PayslipScanner::new(dir.to_path_buf(), config)
            .scan()
            .unwrap()
    }

    fn scan(dir: &Path) -> Vec<Payslip> {
        scan_result(dir).payslips
    }

    fn run(dir: &Path) -> RunSummary {
        let extractor = ValueExtractor::new(DEFAULT_MARKER).unwrap();
        process_payslips(2023, &scan(dir), &PlainTextDecoder, &extractor, None)
    }

    #[test]
    fn test_full_year() {
        let temp_dir = TempDir::new().unwrap();
        for month in MONTHS {
            let body = format!("Gehalt\n841 Betriebsratsumlage {},00\n", month * 100);
            write_payslip(temp_dir.path(), month, &body);
        }

        let summary = run(temp_dir.path());

        assert_eq!(summary.ledger.len(), 12);
        assert_eq!(summary.ledger.sum(), Some(Decimal::new(7800, 0)));
        assert!(summary.missing.is_empty());
        assert!(summary.failures.is_empty());
        assert_eq!(summary.exit_code(), 0);

        let csv = generate_csv(&summary.ledger, b';').unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[0], "1;100,00");
        assert_eq!(lines[11], "12;1200,00");
        assert_eq!(lines[12], "Sum:;7800,00");
    }

    #[test]
    fn test_unparseable_document() {
        let temp_dir = TempDir::new().unwrap();
        for month in MONTHS {
            let body = if month == 7 {
                "Gehalt\nkeine Umlage in diesem Monat\n".to_string()
            } else {
                format!("841 Betriebsratsumlage {},00\n", month * 100)
            };
            write_payslip(temp_dir.path(), month, &body);
        }

        let summary = run(temp_dir.path());

        assert_eq!(summary.failures.len(), 1);
        let failure = &summary.failures[0];
        assert_eq!(failure.kind, FailureKind::ValueNotFound);
        assert_eq!(failure.month, Some(7));
        assert!(failure.message.contains("202307_Nettoschein.txt"));

        assert_eq!(summary.ledger.len(), 11);
        assert_eq!(summary.missing, BTreeSet::from([7]));
        assert_eq!(summary.exit_code(), 1);

        let csv = generate_csv(&summary.ledger, b';').unwrap();
        assert_eq!(csv.lines().count(), 12);
        assert!(csv.ends_with("Sum:;7100,00\n"));
    }

    struct FailingDecoder;

    impl TextDecoder for FailingDecoder {
        fn decode(
            &self,
            path: &Path,
            _password: Option<&str>,
        ) -> Result<String, crate::error::DecodeError> {
            let name = path.file_name().unwrap().to_string_lossy();
            if name.starts_with("202302") {
                Err(crate::error::DecodeError::InvalidPassword {
                    path: path.to_path_buf(),
                })
            } else {
                PlainTextDecoder.decode(path, None)
            }
        }
    }

    #[test]
    fn test_decode_error_continues() {
        let temp_dir = TempDir::new().unwrap();
        for month in 1..=3 {
            write_payslip(temp_dir.path(), month, "841 Betriebsratsumlage 4,29\n");
        }

        let extractor = ValueExtractor::new(DEFAULT_MARKER).unwrap();
        let summary = process_payslips(
            2023,
            &scan(temp_dir.path()),
            &FailingDecoder,
            &extractor,
            Some("wrong"),
        );

        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, FailureKind::Decode);
        assert!(summary.failures[0].message.contains("Invalid password"));
        assert_eq!(summary.ledger.len(), 2);
        assert!(summary.missing.contains(&2));
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_duplicate_month_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        write_payslip(temp_dir.path(), 1, "841 Betriebsratsumlage 4,29\n");
        std::fs::write(
            temp_dir.path().join("202301_Nettoschein_Korrektur.txt"),
            "841 Betriebsratsumlage 4,50\n",
        )
        .unwrap();

        let summary = run(temp_dir.path());

        assert_eq!(summary.ledger.len(), 1);
        assert_eq!(summary.ledger.get(1), Some(Decimal::new(450, 2)));
        assert!(summary.failures.is_empty());
        assert_eq!(summary.missing.len(), 11);
    }

    #[test]
    fn test_no_documents() {
        let temp_dir = TempDir::new().unwrap();
        let summary = run(temp_dir.path());

        assert!(summary.ledger.is_empty());
        assert_eq!(summary.ledger.sum(), Some(Decimal::ZERO));
        assert_eq!(summary.missing.len(), 12);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_rejected_file_fails_complete_year() {
        let temp_dir = TempDir::new().unwrap();
        for month in MONTHS {
            write_payslip(temp_dir.path(), month, "841 Betriebsratsumlage 4,29\n");
        }
        std::fs::write(
            temp_dir.path().join("202313_Nettoschein.txt"),
            "841 Betriebsratsumlage 4,29\n",
        )
        .unwrap();

        let extractor = ValueExtractor::new(DEFAULT_MARKER).unwrap();
        let summary = process_scan(
            2023,
            scan_result(temp_dir.path()),
            &PlainTextDecoder,
            &extractor,
            None,
        );

        assert_eq!(summary.ledger.len(), 12);
        assert!(summary.missing.is_empty());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].kind, FailureKind::Rejected);
        assert!(summary.failures[0]
            .path
            .ends_with("202313_Nettoschein.txt"));
        assert!(!summary.is_success());
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn test_rejected_files_listed_before_document_failures() {
        let temp_dir = TempDir::new().unwrap();
        write_payslip(temp_dir.path(), 1, "keine Umlage\n");
        std::fs::write(temp_dir.path().join("202300_Nettoschein.txt"), "").unwrap();

        let extractor = ValueExtractor::new(DEFAULT_MARKER).unwrap();
        let summary = process_scan(
            2023,
            scan_result(temp_dir.path()),
            &PlainTextDecoder,
            &extractor,
            None,
        );

        let kinds: Vec<FailureKind> = summary.failures.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FailureKind::Rejected, FailureKind::ValueNotFound]);
    }

    #[test]
    fn test_sum_overflow_fails_document_not_run() {
        let temp_dir = TempDir::new().unwrap();
        for month in MONTHS {
            write_payslip(
                temp_dir.path(),
                month,
                "841 Betriebsratsumlage 9999999999999999999999999999,00\n",
            );
        }

        let summary = run(temp_dir.path());

        // seven of these fit a Decimal, the eighth would overflow the total
        let big = Decimal::from_str("9999999999999999999999999999").unwrap();
        assert_eq!(summary.ledger.len(), 7);
        assert!(summary.ledger.sum().is_some());
        assert_eq!(summary.ledger.get(1), Some(big));
        assert_eq!(summary.failures.len(), 5);
        assert!(summary
            .failures
            .iter()
            .all(|f| f.kind == FailureKind::Overflow));
        assert_eq!(summary.missing, (8..=12).collect::<BTreeSet<u32>>());
        assert_eq!(summary.exit_code(), 1);

        assert!(generate_csv(&summary.ledger, b';').is_ok());
    }
}

//! Monthly ledger of extracted values.
//!
//! Holds one value per month key in first-insertion order. A later value
//! for a month replaces the earlier one in place, so each payslip counts
//! once and CSV rows keep the order the payslips were processed in.

use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Months of a calendar year.
pub const MONTHS: RangeInclusive<u32> = 1..=12;

/// Month number to value mapping for one year's run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyLedger {
    entries: Vec<(u32, Decimal)>,
}

impl MonthlyLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value for `month`.
    ///
    /// Returns the replaced value when the month was already present.
    /// The month range is not checked here; see [`MonthlyLedger::missing`].
    pub fn put(&mut self, month: u32, value: Decimal) -> Option<Decimal> {
        match self.entries.iter_mut().find(|(m, _)| *m == month) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((month, value));
                None
            }
        }
    }

    pub fn get(&self, month: u32) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(m, _)| *m == month)
            .map(|(_, v)| *v)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Decimal)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of distinct months stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all stored values, zero for an empty ledger.
    ///
    /// `None` when the total does not fit a `Decimal`.
    pub fn sum(&self) -> Option<Decimal> {
        self.entries
            .iter()
            .try_fold(Decimal::ZERO, |total, (_, v)| total.checked_add(*v))
    }

    /// The sum the ledger would have after `put(month, value)`.
    pub fn sum_with(&self, month: u32, value: Decimal) -> Option<Decimal> {
        self.entries
            .iter()
            .filter(|(m, _)| *m != month)
            .try_fold(value, |total, (_, v)| total.checked_add(*v))
    }

    /// Expected months that have no value.
    ///
    /// Stored keys outside `expected` are ignored.
    pub fn missing<I>(&self, expected: I) -> BTreeSet<u32>
    where
        I: IntoIterator<Item = u32>,
    {
        expected
            .into_iter()
            .filter(|month| self.get(*month).is_none())
            .collect()
    }

    /// Calendar months (1 to 12) that have no value.
    pub fn missing_months(&self) -> BTreeSet<u32> {
        self.missing(MONTHS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 2)
    }

    #[test]
    fn test_put_overwrites_duplicate_month() {
        let mut ledger = MonthlyLedger::new();
        assert_eq!(ledger.put(1, dec(100)), None);
        assert_eq!(ledger.put(2, dec(200)), None);
        assert_eq!(ledger.put(2, dec(250)), Some(dec(200)));
        assert_eq!(ledger.put(3, dec(300)), None);

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.get(2), Some(dec(250)));
        assert_eq!(ledger.sum(), Some(dec(650)));
    }

    #[test]
    fn test_overwrite_keeps_insertion_position() {
        let mut ledger = MonthlyLedger::new();
        ledger.put(5, dec(1));
        ledger.put(1, dec(2));
        ledger.put(5, dec(3));

        let months: Vec<u32> = ledger.iter().map(|(m, _)| m).collect();
        assert_eq!(months, vec![5, 1]);
    }

    #[test]
    fn test_empty_ledger() {
        let ledger = MonthlyLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert_eq!(ledger.sum(), Some(Decimal::ZERO));
        assert_eq!(ledger.missing_months().len(), 12);
    }

    #[test]
    fn test_sum_independent_of_insertion_order() {
        let mut forward = MonthlyLedger::new();
        let mut backward = MonthlyLedger::new();
        for month in MONTHS {
            forward.put(month, dec(i64::from(month) * 137));
        }
        for month in MONTHS.rev() {
            backward.put(month, dec(i64::from(month) * 137));
        }
        assert_eq!(forward.sum(), backward.sum());
        assert_eq!(forward.sum(), Some(dec(137 * 78)));
    }

    #[test]
    fn test_sum_overflow_is_none() {
        let big = Decimal::from_str("9999999999999999999999999999.00").unwrap();
        let mut ledger = MonthlyLedger::new();
        for month in 1..=7 {
            ledger.put(month, big);
        }
        assert!(ledger.sum().is_some());
        assert_eq!(ledger.sum_with(8, big), None);
        // replacing an existing month does not count it twice
        assert!(ledger.sum_with(7, big).is_some());

        for month in 8..=12 {
            ledger.put(month, big);
        }
        assert_eq!(ledger.len(), 12);
        assert_eq!(ledger.sum(), None);
    }

    #[test]
    fn test_missing_last_month() {
        let mut ledger = MonthlyLedger::new();
        for month in 1..=11 {
            ledger.put(month, dec(100));
        }
        assert_eq!(ledger.missing(MONTHS), BTreeSet::from([12]));

        ledger.put(12, dec(100));
        assert!(ledger.missing_months().is_empty());
    }

    #[test]
    fn test_unexpected_keys_ignored_by_missing() {
        let mut ledger = MonthlyLedger::new();
        for month in MONTHS {
            ledger.put(month, dec(1));
        }
        ledger.put(13, dec(1));

        assert_eq!(ledger.len(), 13);
        assert!(ledger.missing_months().is_empty());
    }
}

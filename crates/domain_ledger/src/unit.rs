//! Member units and their reversible history trail
//!
//! A unit carries four balance buckets and the history entries that explain
//! how vouchers moved them. History is the ground truth: every bucket change
//! made after the unit was opened is backed by exactly one history entry, so
//! stripping the entries of one voucher and applying their inverse restores
//! the unit to the state it had before that voucher.
//!
//! # Invariants
//!
//! - Buckets change only through [`Unit::apply`] and [`Unit::revert`]
//! - Entries are matched by `(voucherType, voucherNo)`, never by position
//! - Reverting a voucher that has no entries is a no-op

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{FinancialYear, VoucherKey, VoucherNo, VoucherType};

use crate::allocation::Allocation;
use crate::reversal::Reversal;

/// One of the four balance categories of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    /// Credit paid ahead of any dues
    Advance,
    /// Dues raised in the current financial year
    CurrentFinancialYear,
    /// Dues carried over from the previous financial year
    LastFinancialYear,
    /// Balance eligible for waiver
    Unpaid,
}

/// Signed amounts over the four buckets
///
/// Used both for a unit's balances and for the deltas an allocation or
/// reversal applies to them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Buckets {
    pub advance_amount: Decimal,
    pub current_financial_amount: Decimal,
    pub last_financial_year_amount: Decimal,
    pub unpaid_amount: Decimal,
}

impl Buckets {
    /// All buckets at zero
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, bucket: Bucket) -> Decimal {
        match bucket {
            Bucket::Advance => self.advance_amount,
            Bucket::CurrentFinancialYear => self.current_financial_amount,
            Bucket::LastFinancialYear => self.last_financial_year_amount,
            Bucket::Unpaid => self.unpaid_amount,
        }
    }

    /// Adds a signed delta to one bucket
    pub fn add(&mut self, bucket: Bucket, delta: Decimal) {
        let slot = match bucket {
            Bucket::Advance => &mut self.advance_amount,
            Bucket::CurrentFinancialYear => &mut self.current_financial_amount,
            Bucket::LastFinancialYear => &mut self.last_financial_year_amount,
            Bucket::Unpaid => &mut self.unpaid_amount,
        };
        *slot += delta;
    }

    /// Adds every bucket of `other`
    pub fn add_all(&mut self, other: &Buckets) {
        self.advance_amount += other.advance_amount;
        self.current_financial_amount += other.current_financial_amount;
        self.last_financial_year_amount += other.last_financial_year_amount;
        self.unpaid_amount += other.unpaid_amount;
    }

    /// Every bucket negated
    pub fn negated(&self) -> Self {
        Self {
            advance_amount: -self.advance_amount,
            current_financial_amount: -self.current_financial_amount,
            last_financial_year_amount: -self.last_financial_year_amount,
            unpaid_amount: -self.unpaid_amount,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.advance_amount.is_zero()
            && self.current_financial_amount.is_zero()
            && self.last_financial_year_amount.is_zero()
            && self.unpaid_amount.is_zero()
    }
}

/// Which bucket a history entry settled
///
/// Serialized with the short tags; the long labels written by older records
/// are still accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptFor {
    #[serde(rename = "AdvanceAmount", alias = "Advance Amount")]
    AdvanceAmount,
    #[serde(rename = "CurrentFinancialYearAmount", alias = "Current Financial Year Amount")]
    CurrentFinancialYearAmount,
    #[serde(rename = "LastFinancialYearAmount", alias = "Last Financial Year Amount")]
    LastFinancialYearAmount,
    #[serde(rename = "Waveoff")]
    Waveoff,
}

impl ReceiptFor {
    pub fn bucket(&self) -> Bucket {
        match self {
            ReceiptFor::AdvanceAmount => Bucket::Advance,
            ReceiptFor::CurrentFinancialYearAmount => Bucket::CurrentFinancialYear,
            ReceiptFor::LastFinancialYearAmount => Bucket::LastFinancialYear,
            ReceiptFor::Waveoff => Bucket::Unpaid,
        }
    }

    /// Signed bucket change produced by an entry of `amount`
    ///
    /// Advances grow credit; every other tag retires a balance.
    pub fn signed_effect(&self, amount: Decimal) -> Decimal {
        match self {
            ReceiptFor::AdvanceAmount => amount,
            ReceiptFor::CurrentFinancialYearAmount
            | ReceiptFor::LastFinancialYearAmount
            | ReceiptFor::Waveoff => -amount,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptFor::AdvanceAmount => "AdvanceAmount",
            ReceiptFor::CurrentFinancialYearAmount => "CurrentFinancialYearAmount",
            ReceiptFor::LastFinancialYearAmount => "LastFinancialYearAmount",
            ReceiptFor::Waveoff => "Waveoff",
        }
    }
}

impl fmt::Display for ReceiptFor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReceiptFor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AdvanceAmount" | "Advance Amount" => Ok(ReceiptFor::AdvanceAmount),
            "CurrentFinancialYearAmount" | "Current Financial Year Amount" => {
                Ok(ReceiptFor::CurrentFinancialYearAmount)
            }
            "LastFinancialYearAmount" | "Last Financial Year Amount" => {
                Ok(ReceiptFor::LastFinancialYearAmount)
            }
            "Waveoff" => Ok(ReceiptFor::Waveoff),
            other => Err(format!("Unknown receiptFor tag: {}", other)),
        }
    }
}

/// Audit and reversal record tying a voucher to one bucket effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub financial_year: FinancialYear,
    pub date_received: NaiveDate,
    pub voucher_type: VoucherType,
    pub voucher_no: VoucherNo,
    /// Positive magnitude of the effect
    pub amount: Decimal,
    /// Resolved receipt or payment type label of the owning voucher
    pub type_of_voucher: String,
    pub receipt_for: ReceiptFor,
}

impl HistoryEntry {
    /// Key of the voucher that owns this entry
    pub fn key(&self) -> VoucherKey {
        VoucherKey::new(self.voucher_type, self.voucher_no)
    }

    /// Voucher keys repeat across years, so ownership includes the year
    pub fn belongs_to(&self, financial_year: FinancialYear, key: &VoucherKey) -> bool {
        self.financial_year == financial_year
            && self.voucher_type == key.voucher_type
            && self.voucher_no == key.voucher_no
    }

    /// Signed deltas this entry applied to the unit
    pub fn effect(&self) -> Buckets {
        let mut deltas = Buckets::zero();
        deltas.add(self.receipt_for.bucket(), self.receipt_for.signed_effect(self.amount));
        deltas
    }
}

/// A member unit tracked by the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    name_of_unit: String,
    ledger_page_number: Option<i32>,
    #[serde(flatten)]
    buckets: Buckets,
    #[serde(default)]
    history: Vec<HistoryEntry>,
}

impl Unit {
    /// Opens a unit with zero balances and no history
    pub fn new(name_of_unit: impl Into<String>) -> Self {
        Self {
            name_of_unit: name_of_unit.into(),
            ledger_page_number: None,
            buckets: Buckets::zero(),
            history: Vec::new(),
        }
    }

    /// Sets the page number of the unit in the physical ledger
    pub fn with_ledger_page_number(mut self, page: i32) -> Self {
        self.ledger_page_number = Some(page);
        self
    }

    /// Sets the balances the unit is opened with
    ///
    /// Opening balances are raised outside the voucher flow (dues demanded
    /// at the start of a year) and therefore have no history entries.
    pub fn with_opening_balances(mut self, buckets: Buckets) -> Self {
        self.buckets = buckets;
        self
    }

    /// Rebuilds a unit from persisted state
    pub fn restore(
        name_of_unit: impl Into<String>,
        ledger_page_number: Option<i32>,
        buckets: Buckets,
        history: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            name_of_unit: name_of_unit.into(),
            ledger_page_number,
            buckets,
            history,
        }
    }

    pub fn name(&self) -> &str {
        &self.name_of_unit
    }

    pub fn ledger_page_number(&self) -> Option<i32> {
        self.ledger_page_number
    }

    pub fn buckets(&self) -> &Buckets {
        &self.buckets
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// History entries currently attached for one voucher
    pub fn entries_for<'a>(
        &'a self,
        financial_year: FinancialYear,
        key: &'a VoucherKey,
    ) -> impl Iterator<Item = &'a HistoryEntry> + 'a {
        self.history
            .iter()
            .filter(move |h| h.belongs_to(financial_year, key))
    }

    /// Sum of the signed effects of one voucher's entries
    pub fn net_effect(&self, financial_year: FinancialYear, key: &VoucherKey) -> Buckets {
        self.entries_for(financial_year, key).fold(Buckets::zero(), |mut acc, entry| {
            acc.add_all(&entry.effect());
            acc
        })
    }

    /// Sum of the signed effects of every attached entry
    pub fn history_effect(&self) -> Buckets {
        self.history.iter().fold(Buckets::zero(), |mut acc, entry| {
            acc.add_all(&entry.effect());
            acc
        })
    }

    /// Applies an allocation produced by the allocation engine
    pub fn apply(&mut self, allocation: &Allocation) {
        self.buckets.add_all(allocation.deltas());
        self.history.extend(allocation.entries().iter().cloned());
    }

    /// Strips every entry of `key` and applies the inverse of their effects
    pub fn revert(&mut self, financial_year: FinancialYear, key: &VoucherKey) -> Reversal {
        let (removed, kept): (Vec<HistoryEntry>, Vec<HistoryEntry>) =
            std::mem::take(&mut self.history)
                .into_iter()
                .partition(|h| h.belongs_to(financial_year, key));
        self.history = kept;

        let mut restored = Buckets::zero();
        for entry in &removed {
            restored.add_all(&entry.effect().negated());
        }
        self.buckets.add_all(&restored);

        Reversal::new(financial_year, *key, restored, removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(no: i64, amount: Decimal, receipt_for: ReceiptFor) -> HistoryEntry {
        HistoryEntry {
            financial_year: FinancialYear::starting(2024),
            date_received: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            voucher_type: VoucherType::Rv,
            voucher_no: VoucherNo::new(no),
            amount,
            type_of_voucher: "Subscription".to_string(),
            receipt_for,
        }
    }

    #[test]
    fn test_signed_effects() {
        assert_eq!(entry(1, dec!(10), ReceiptFor::AdvanceAmount).effect().advance_amount, dec!(10));
        assert_eq!(entry(1, dec!(10), ReceiptFor::Waveoff).effect().unpaid_amount, dec!(-10));
        assert_eq!(
            entry(1, dec!(10), ReceiptFor::LastFinancialYearAmount).effect().last_financial_year_amount,
            dec!(-10)
        );
    }

    #[test]
    fn test_revert_only_touches_matching_voucher() {
        let mut unit = Unit::restore(
            "Alpha",
            None,
            Buckets {
                advance_amount: dec!(30),
                current_financial_amount: dec!(0),
                ..Buckets::zero()
            },
            vec![
                entry(1, dec!(50), ReceiptFor::CurrentFinancialYearAmount),
                entry(2, dec!(20), ReceiptFor::AdvanceAmount),
                entry(1, dec!(10), ReceiptFor::AdvanceAmount),
            ],
        );

        let key = VoucherKey::new(VoucherType::Rv, 1);
        let reversal = unit.revert(FinancialYear::starting(2024), &key);

        assert_eq!(reversal.removed().len(), 2);
        assert_eq!(unit.buckets().current_financial_amount, dec!(50));
        assert_eq!(unit.buckets().advance_amount, dec!(20));
        assert_eq!(unit.history().len(), 1);
        assert_eq!(unit.history()[0].voucher_no, VoucherNo::new(2));
    }

    #[test]
    fn test_revert_ignores_same_key_of_other_year() {
        let mut unit = Unit::restore(
            "Alpha",
            None,
            Buckets::zero(),
            vec![entry(1, dec!(50), ReceiptFor::CurrentFinancialYearAmount)],
        );

        let key = VoucherKey::new(VoucherType::Rv, 1);
        let reversal = unit.revert(FinancialYear::starting(2023), &key);

        assert!(reversal.is_empty());
        assert_eq!(unit.history().len(), 1);
        assert!(unit.buckets().is_zero());
    }

    #[test]
    fn test_revert_twice_is_noop() {
        let mut unit = Unit::new("Alpha");
        let key = VoucherKey::new(VoucherType::Rv, 9);

        let fy = FinancialYear::starting(2024);
        let first = unit.revert(fy, &key);
        let before = unit.clone();
        let second = unit.revert(fy, &key);

        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(unit, before);
    }

    #[test]
    fn test_receipt_for_accepts_long_labels() {
        let parsed: ReceiptFor = serde_json::from_str("\"Last Financial Year Amount\"").unwrap();
        assert_eq!(parsed, ReceiptFor::LastFinancialYearAmount);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"LastFinancialYearAmount\"");
    }

    #[test]
    fn test_unit_json_shape() {
        let unit = Unit::new("Alpha").with_ledger_page_number(12);
        let json = serde_json::to_value(&unit).unwrap();

        assert_eq!(json["nameOfUnit"], "Alpha");
        assert_eq!(json["ledgerPageNumber"], 12);
        assert!(json.get("advanceAmount").is_some());
        assert!(json["history"].as_array().unwrap().is_empty());
    }
}

//! Allocation engine
//!
//! Distributes a transacted amount over a unit's buckets. Dues are retired
//! oldest first (last year, then current year) and whatever remains becomes
//! advance credit, so an amount is always fully absorbed. Waivers bypass the
//! waterfall and retire the unpaid balance directly.
//!
//! The engine is pure: it reads the unit's buckets and returns the deltas
//! and history entries to apply. [`Unit::apply`](crate::Unit::apply) is the
//! only consumer of an [`Allocation`].

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{FinancialYear, VoucherKey, VoucherNo, VoucherType};

use crate::error::LedgerError;
use crate::unit::{Buckets, HistoryEntry, ReceiptFor, Unit};
use crate::voucher::Voucher;

/// Voucher attributes copied onto every history entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherMeta {
    pub financial_year: FinancialYear,
    pub date: NaiveDate,
    pub voucher_type: VoucherType,
    pub voucher_no: VoucherNo,
    pub type_of_voucher: String,
}

impl VoucherMeta {
    pub fn from_voucher(voucher: &Voucher) -> Self {
        Self {
            financial_year: voucher.financial_year,
            date: voucher.date,
            voucher_type: voucher.voucher_type,
            voucher_no: voucher.voucher_no,
            type_of_voucher: voucher.label.as_str().to_string(),
        }
    }

    pub fn key(&self) -> VoucherKey {
        VoucherKey::new(self.voucher_type, self.voucher_no)
    }

    fn entry(&self, amount: Decimal, receipt_for: ReceiptFor) -> HistoryEntry {
        HistoryEntry {
            financial_year: self.financial_year,
            date_received: self.date,
            voucher_type: self.voucher_type,
            voucher_no: self.voucher_no,
            amount,
            type_of_voucher: self.type_of_voucher.clone(),
            receipt_for,
        }
    }
}

/// Bucket deltas and history entries produced for one voucher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    deltas: Buckets,
    entries: Vec<HistoryEntry>,
}

impl Allocation {
    /// An allocation that changes nothing
    pub fn empty() -> Self {
        Self::default()
    }

    fn push(&mut self, entry: HistoryEntry) {
        self.deltas.add_all(&entry.effect());
        self.entries.push(entry);
    }

    pub fn deltas(&self) -> &Buckets {
        &self.deltas
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total positive magnitude absorbed by the entries
    pub fn absorbed(&self) -> Decimal {
        self.entries.iter().map(|e| e.amount).sum()
    }
}

/// Runs the oldest-dues-first waterfall
///
/// # Example
///
/// ```rust
/// use domain_ledger::{allocation::{allocate, VoucherMeta}, Buckets};
/// use core_kernel::{FinancialYear, VoucherNo, VoucherType};
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let buckets = Buckets {
///     last_financial_year_amount: dec!(40),
///     current_financial_amount: dec!(50),
///     ..Buckets::zero()
/// };
/// let meta = VoucherMeta {
///     financial_year: FinancialYear::starting(2024),
///     date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
///     voucher_type: VoucherType::Rv,
///     voucher_no: VoucherNo::new(1),
///     type_of_voucher: "UCS Amount".to_string(),
/// };
///
/// let allocation = allocate(&buckets, dec!(100), &meta).unwrap();
/// assert_eq!(allocation.entries().len(), 3);
/// assert_eq!(allocation.deltas().advance_amount, dec!(10));
/// ```
pub fn allocate(
    buckets: &Buckets,
    amount: Decimal,
    meta: &VoucherMeta,
) -> Result<Allocation, LedgerError> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "Transacted amount of {} must not be negative, got {}",
            meta.key(),
            amount
        )));
    }

    let mut allocation = Allocation::empty();
    let mut remaining = amount;

    if buckets.last_financial_year_amount > Decimal::ZERO {
        let consumed = buckets.last_financial_year_amount.min(remaining);
        if consumed > Decimal::ZERO {
            allocation.push(meta.entry(consumed, ReceiptFor::LastFinancialYearAmount));
            remaining -= consumed;
        }
    }

    if remaining > Decimal::ZERO && buckets.current_financial_amount > Decimal::ZERO {
        let consumed = buckets.current_financial_amount.min(remaining);
        allocation.push(meta.entry(consumed, ReceiptFor::CurrentFinancialYearAmount));
        remaining -= consumed;
    }

    if remaining > Decimal::ZERO {
        allocation.push(meta.entry(remaining, ReceiptFor::AdvanceAmount));
    }

    Ok(allocation)
}

/// Retires `amount` of the unpaid balance
///
/// Partial waivers are not made: an amount above the unpaid balance fails.
pub fn waive(
    buckets: &Buckets,
    amount: Decimal,
    meta: &VoucherMeta,
) -> Result<Allocation, LedgerError> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::validation(format!(
            "Waiver amount of {} must not be negative, got {}",
            meta.key(),
            amount
        )));
    }

    if amount > buckets.unpaid_amount {
        return Err(LedgerError::validation(format!(
            "Waiver amount {} exceeds unpaid amount {}",
            amount, buckets.unpaid_amount
        )));
    }

    let mut allocation = Allocation::empty();
    if amount > Decimal::ZERO {
        allocation.push(meta.entry(amount, ReceiptFor::Waveoff));
    }
    Ok(allocation)
}

/// Returns true if booking `voucher` against a unit changes the unit
pub fn affects_unit(voucher: &Voucher) -> bool {
    match voucher.voucher_type {
        VoucherType::Rv => true,
        VoucherType::Pv => voucher.payment_type().is_some_and(|t| t.is_waiver()),
        VoucherType::CeRv | VoucherType::CePv => false,
    }
}

/// Computes the allocation of `voucher` against `unit`
///
/// Receipts run the waterfall and waiver payments retire the unpaid
/// balance; every other voucher leaves the unit untouched.
pub fn plan(unit: &Unit, voucher: &Voucher) -> Result<Allocation, LedgerError> {
    if !affects_unit(voucher) {
        return Ok(Allocation::empty());
    }

    let meta = VoucherMeta::from_voucher(voucher);
    let amount = voucher.transacted_amount();

    match voucher.voucher_type {
        VoucherType::Rv => allocate(unit.buckets(), amount, &meta),
        _ => waive(unit.buckets(), amount, &meta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn meta() -> VoucherMeta {
        VoucherMeta {
            financial_year: FinancialYear::starting(2024),
            date: NaiveDate::from_ymd_opt(2024, 8, 15).unwrap(),
            voucher_type: VoucherType::Rv,
            voucher_no: VoucherNo::new(10),
            type_of_voucher: "UCS Amount".to_string(),
        }
    }

    fn buckets(last: Decimal, current: Decimal, advance: Decimal) -> Buckets {
        Buckets {
            last_financial_year_amount: last,
            current_financial_amount: current,
            advance_amount: advance,
            ..Buckets::zero()
        }
    }

    #[test]
    fn test_last_year_dues_are_retired_first() {
        let allocation = allocate(&buckets(dec!(40), dec!(500), dec!(0)), dec!(100), &meta()).unwrap();

        let tags: Vec<_> = allocation.entries().iter().map(|e| e.receipt_for).collect();
        assert_eq!(
            tags,
            vec![ReceiptFor::LastFinancialYearAmount, ReceiptFor::CurrentFinancialYearAmount]
        );
        assert_eq!(allocation.deltas().last_financial_year_amount, dec!(-40));
        assert_eq!(allocation.deltas().current_financial_amount, dec!(-60));
        assert_eq!(allocation.deltas().advance_amount, dec!(0));
    }

    #[test]
    fn test_surplus_becomes_advance() {
        let allocation = allocate(&buckets(dec!(0), dec!(30), dec!(5)), dec!(100), &meta()).unwrap();

        assert_eq!(allocation.deltas().current_financial_amount, dec!(-30));
        assert_eq!(allocation.deltas().advance_amount, dec!(70));
        assert_eq!(allocation.absorbed(), dec!(100));
    }

    #[test]
    fn test_zero_amount_allocates_nothing() {
        let allocation = allocate(&buckets(dec!(40), dec!(50), dec!(0)), dec!(0), &meta()).unwrap();
        assert!(allocation.is_empty());
        assert!(allocation.deltas().is_zero());
    }

    #[test]
    fn test_negative_dues_are_skipped() {
        let allocation = allocate(&buckets(dec!(-20), dec!(0), dec!(0)), dec!(10), &meta()).unwrap();
        assert_eq!(allocation.entries().len(), 1);
        assert_eq!(allocation.entries()[0].receipt_for, ReceiptFor::AdvanceAmount);
    }

    #[test]
    fn test_waiver_cannot_exceed_unpaid() {
        let unpaid = Buckets {
            unpaid_amount: dec!(50),
            ..Buckets::zero()
        };

        let result = waive(&unpaid, dec!(60), &meta());
        assert!(matches!(result, Err(LedgerError::Validation { .. })));

        let allocation = waive(&unpaid, dec!(50), &meta()).unwrap();
        assert_eq!(allocation.deltas().unpaid_amount, dec!(-50));
        assert_eq!(allocation.entries()[0].receipt_for, ReceiptFor::Waveoff);
    }
}

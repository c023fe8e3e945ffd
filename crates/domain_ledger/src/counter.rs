//! Counter-voucher generator
//!
//! Some voucher labels stand for a transfer between the organisation's own
//! funds. Each such voucher is mirrored by a counter voucher in the opposite
//! ledger: `RV/n` by `CE_RV/n` among the payments, `PV/n` by `CE_PV/n` among
//! the receipts. The mirror carries `method = none`, so it never transacts
//! anything itself; its amount fields show where the transfer landed.

use rust_decimal::Decimal;
use tracing::debug;

use core_kernel::{Ledger, VoucherType};

use crate::error::{LedgerError, MutationContext, SagaStep};
use crate::fixed_deposit::FixedDeposit;
use crate::ports::FixedDepositPort;
use crate::unit::Buckets;
use crate::voucher::{BucketAmounts, Method, PaymentType, ReceiptType, Voucher, VoucherLabel};

/// How a mirrored voucher distributes its amount over the counter voucher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterRule {
    /// Whole transacted amount to `eme_journal_fund`
    FullToEmeJournalFund,
    /// Deposit principal to `fdr`, accrued interest to `eme_journal_fund`
    MaturedFd,
    /// Last-year dues portion to `sydr`, remainder to `eme_journal_fund`
    UcsAmountDrSplit,
    /// Whole transacted amount to `property`
    FullToProperty,
    /// Whole transacted amount to `sydr`
    FullToSydr,
}

impl CounterRule {
    /// The rule for `voucher`, or `None` when it is not mirrored
    pub fn for_voucher(voucher: &Voucher) -> Option<Self> {
        match (&voucher.voucher_type, &voucher.label) {
            (VoucherType::Rv, VoucherLabel::Receipt(receipt_type)) => match receipt_type {
                ReceiptType::InterestOnFd
                | ReceiptType::UcsAmount
                | ReceiptType::LifetimeSubscription
                | ReceiptType::PropertyOnCharge => Some(CounterRule::FullToEmeJournalFund),
                ReceiptType::MaturedFd => Some(CounterRule::MaturedFd),
                ReceiptType::UcsAmountDr => Some(CounterRule::UcsAmountDrSplit),
                ReceiptType::CounterEntry | ReceiptType::Other(_) => None,
            },
            (VoucherType::Pv, VoucherLabel::Payment(payment_type)) => match payment_type {
                PaymentType::DepreciationAmount => Some(CounterRule::FullToProperty),
                PaymentType::Waiver => Some(CounterRule::FullToSydr),
                PaymentType::EmeJournalFund => Some(CounterRule::FullToEmeJournalFund),
                PaymentType::CounterEntry | PaymentType::Other(_) => None,
            },
            _ => None,
        }
    }

    /// Whether the rule needs a fixed-deposit lookup
    pub fn needs_fixed_deposit(&self) -> bool {
        matches!(self, CounterRule::MaturedFd)
    }

    /// Amount fields of the counter voucher
    ///
    /// `last_year_dues` is the unit's `lastFinancialYearAmount` before the
    /// source voucher is applied; it only matters for the UCS split.
    pub fn amounts(
        &self,
        transacted: Decimal,
        last_year_dues: Decimal,
        deposit: Option<&FixedDeposit>,
    ) -> BucketAmounts {
        let mut amounts = BucketAmounts::default();
        match self {
            CounterRule::FullToEmeJournalFund => amounts.eme_journal_fund = transacted,
            CounterRule::FullToProperty => amounts.property = transacted,
            CounterRule::FullToSydr => amounts.sydr = transacted,
            CounterRule::MaturedFd => {
                if let Some(deposit) = deposit {
                    amounts.fdr = deposit.amount;
                    amounts.eme_journal_fund = deposit.interest_amount;
                }
            }
            CounterRule::UcsAmountDrSplit => {
                let against_dues = last_year_dues.max(Decimal::ZERO).min(transacted);
                amounts.sydr = against_dues;
                amounts.eme_journal_fund = transacted - against_dues;
            }
        }
        amounts
    }
}

/// Builds the counter voucher skeleton for `source` with the given amounts
pub fn build_counter_voucher(source: &Voucher, counter_type: VoucherType, amounts: BucketAmounts) -> Voucher {
    let source_kind = match source.ledger() {
        Ledger::Receipt => "receipt",
        Ledger::Payment => "payment",
    };

    Voucher {
        date: source.date,
        voucher_type: counter_type,
        voucher_no: source.voucher_no,
        particulars: source.particulars.clone(),
        custom: source.custom,
        label: VoucherLabel::counter_entry(counter_type.ledger()),
        method: Method::None,
        description: Some(format!(
            "Counter entry for {} voucher {}",
            source_kind, source.voucher_no
        )),
        amounts,
        financial_year: source.financial_year,
        counter_voucher_no: Some(source.voucher_no),
        fdr_no: None,
    }
}

/// Derives the counter voucher mirroring `source`
///
/// `unit_buckets` are the buckets of the source's unit with the source's
/// own effects reverted; `None` for vouchers without a unit.
pub async fn generate(
    source: &Voucher,
    unit_buckets: Option<&Buckets>,
    fixed_deposits: &dyn FixedDepositPort,
    context: &MutationContext,
) -> Result<Option<Voucher>, LedgerError> {
    let (Some(rule), Some(counter_type)) =
        (CounterRule::for_voucher(source), source.voucher_type.counter_type())
    else {
        return Ok(None);
    };

    let deposit = if rule.needs_fixed_deposit() {
        Some(lookup_deposit(source, fixed_deposits, context).await?)
    } else {
        None
    };

    let last_year_dues = unit_buckets
        .map(|b| b.last_financial_year_amount)
        .unwrap_or(Decimal::ZERO);

    let amounts = rule.amounts(source.transacted_amount(), last_year_dues, deposit.as_ref());
    debug!(
        voucher = %source.key(),
        rule = ?rule,
        total = %amounts.total(),
        "Derived counter voucher"
    );

    Ok(Some(build_counter_voucher(source, counter_type, amounts)))
}

async fn lookup_deposit(
    source: &Voucher,
    fixed_deposits: &dyn FixedDepositPort,
    context: &MutationContext,
) -> Result<FixedDeposit, LedgerError> {
    let context = context.clone().step(SagaStep::LookupFixedDeposit);

    let fdr_no = source
        .fdr_no
        .as_deref()
        .map(str::trim)
        .filter(|no| !no.is_empty())
        .ok_or_else(|| LedgerError::Validation {
            message: format!("Matured FD voucher {} requires an fdrNo", source.key()),
            context: Some(context.clone()),
        })?;

    match fixed_deposits.find_by_number(fdr_no).await {
        Ok(Some(deposit)) => Ok(deposit),
        Ok(None) => Err(LedgerError::Dependency {
            message: format!("Fixed deposit {} referenced by {} not found", fdr_no, source.key()),
            context,
            compensated: true,
            source: None,
        }),
        Err(e) => Err(LedgerError::from_port(e, context).compensated(true)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{FinancialYear, VoucherNo};
    use rust_decimal_macros::dec;

    fn voucher(voucher_type: VoucherType, label: VoucherLabel, amount: Decimal) -> Voucher {
        Voucher {
            date: NaiveDate::from_ymd_opt(2024, 9, 9).unwrap(),
            voucher_type,
            voucher_no: VoucherNo::new(7),
            particulars: "Alpha".to_string(),
            custom: false,
            label,
            method: Method::Cash,
            description: None,
            amounts: BucketAmounts {
                cash: amount,
                ..Default::default()
            },
            financial_year: FinancialYear::starting(2024),
            counter_voucher_no: None,
            fdr_no: None,
        }
    }

    #[test]
    fn test_rules_by_label() {
        let ucs = voucher(VoucherType::Rv, VoucherLabel::Receipt(ReceiptType::UcsAmount), dec!(1));
        assert_eq!(CounterRule::for_voucher(&ucs), Some(CounterRule::FullToEmeJournalFund));

        let waiver = voucher(VoucherType::Pv, VoucherLabel::Payment(PaymentType::Waiver), dec!(1));
        assert_eq!(CounterRule::for_voucher(&waiver), Some(CounterRule::FullToSydr));

        let other = voucher(
            VoucherType::Pv,
            VoucherLabel::Payment(PaymentType::Other("Electricity".to_string())),
            dec!(1),
        );
        assert_eq!(CounterRule::for_voucher(&other), None);
    }

    #[test]
    fn test_ucs_split_against_last_year_dues() {
        let amounts = CounterRule::UcsAmountDrSplit.amounts(dec!(100), dec!(40), None);
        assert_eq!(amounts.sydr, dec!(40));
        assert_eq!(amounts.eme_journal_fund, dec!(60));

        let amounts = CounterRule::UcsAmountDrSplit.amounts(dec!(30), dec!(40), None);
        assert_eq!(amounts.sydr, dec!(30));
        assert_eq!(amounts.eme_journal_fund, dec!(0));

        let amounts = CounterRule::UcsAmountDrSplit.amounts(dec!(30), dec!(-5), None);
        assert_eq!(amounts.sydr, dec!(0));
        assert_eq!(amounts.eme_journal_fund, dec!(30));
    }

    #[test]
    fn test_counter_skeleton() {
        let source = voucher(VoucherType::Pv, VoucherLabel::Payment(PaymentType::Waiver), dec!(100));
        let amounts = CounterRule::FullToSydr.amounts(source.transacted_amount(), dec!(0), None);
        let counter = build_counter_voucher(&source, VoucherType::CePv, amounts);

        assert_eq!(counter.voucher_type, VoucherType::CePv);
        assert_eq!(counter.voucher_no, VoucherNo::new(7));
        assert_eq!(counter.counter_voucher_no, Some(VoucherNo::new(7)));
        assert_eq!(counter.method, Method::None);
        assert_eq!(counter.label, VoucherLabel::Receipt(ReceiptType::CounterEntry));
        assert_eq!(counter.amounts.sydr, dec!(100));
        assert_eq!(counter.amounts.total(), dec!(100));
        assert_eq!(
            counter.description.as_deref(),
            Some("Counter entry for payment voucher 7")
        );
        assert!(counter.validate().is_ok());
    }
}

//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating ledger data that keeps the
//! domain invariants: two-decimal amounts, dates inside one financial year
//! and unit balances that are never negative.

use chrono::{Duration, NaiveDate};
use core_kernel::FinancialYear;
use domain_ledger::Buckets;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for non-negative amounts with two decimal places
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|paise| Decimal::new(paise, 2))
}

/// Strategy for strictly positive amounts with two decimal places
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|paise| Decimal::new(paise, 2))
}

/// Strategy for unit balances with every bucket non-negative
pub fn buckets_strategy() -> impl Strategy<Value = Buckets> {
    (
        amount_strategy(),
        amount_strategy(),
        amount_strategy(),
        amount_strategy(),
    )
        .prop_map(|(advance, current, last, unpaid)| Buckets {
            advance_amount: advance,
            current_financial_amount: current,
            last_financial_year_amount: last,
            unpaid_amount: unpaid,
        })
}

/// Strategy for financial years between FY2015-2016 and FY2034-2035
pub fn financial_year_strategy() -> impl Strategy<Value = FinancialYear> {
    (2015i32..2035i32).prop_map(FinancialYear::starting)
}

/// Strategy for a financial year together with a date inside it
pub fn dated_financial_year_strategy() -> impl Strategy<Value = (FinancialYear, NaiveDate)> {
    (financial_year_strategy(), 0i64..365i64).prop_map(|(fy, offset)| {
        let start = NaiveDate::from_ymd_opt(fy.start_year(), 4, 1).unwrap();
        (fy, start + Duration::days(offset))
    })
}

/// Strategy for a sequence of receipt amounts against one unit
pub fn receipt_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Decimal>> {
    proptest::collection::vec(positive_amount_strategy(), 1..=max_len)
}

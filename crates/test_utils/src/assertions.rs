//! Custom Test Assertions
//!
//! Assertion helpers for ledger types that report which bucket or voucher
//! went wrong instead of dumping two whole structs.

use domain_ledger::{Bucket, Buckets, Unit, Voucher};
use rust_decimal::Decimal;

const BUCKETS: [Bucket; 4] = [
    Bucket::Advance,
    Bucket::CurrentFinancialYear,
    Bucket::LastFinancialYear,
    Bucket::Unpaid,
];

/// Asserts that two sets of balances agree bucket by bucket
pub fn assert_buckets_eq(actual: &Buckets, expected: &Buckets) {
    let mismatched: Vec<String> = BUCKETS
        .iter()
        .filter(|bucket| actual.get(**bucket) != expected.get(**bucket))
        .map(|bucket| {
            format!(
                "{:?}: actual={}, expected={}",
                bucket,
                actual.get(*bucket),
                expected.get(*bucket)
            )
        })
        .collect();

    assert!(
        mismatched.is_empty(),
        "Bucket mismatch:\n  {}",
        mismatched.join("\n  ")
    );
}

/// Asserts that a unit's balances equal its opening balances plus its history
pub fn assert_history_consistent(unit: &Unit, opening: &Buckets) {
    let mut expected = *opening;
    expected.add_all(&unit.history_effect());
    assert_buckets_eq(unit.buckets(), &expected);
}

/// Asserts that no bucket of the unit went negative
pub fn assert_no_negative_buckets(unit: &Unit) {
    for bucket in BUCKETS {
        let value = unit.buckets().get(bucket);
        assert!(
            value >= Decimal::ZERO,
            "Unit '{}' has negative {:?}: {}",
            unit.name(),
            bucket,
            value
        );
    }
}

/// Asserts that `counter` mirrors `source`
///
/// Checks the counter type, shared number, back reference, `none` method
/// and that the counter amounts add up to `expected_total`.
pub fn assert_counter_mirrors(source: &Voucher, counter: &Voucher, expected_total: Decimal) {
    assert_eq!(
        Some(counter.voucher_type),
        source.voucher_type.counter_type(),
        "Counter of {} has type {}",
        source.key(),
        counter.voucher_type
    );
    assert_eq!(counter.voucher_no, source.voucher_no, "Counter number differs");
    assert_eq!(
        counter.counter_voucher_no,
        Some(source.voucher_no),
        "Counter does not point back at {}",
        source.key()
    );
    assert_eq!(counter.particulars, source.particulars, "Counter particulars differ");
    assert_eq!(counter.date, source.date, "Counter date differs");
    assert_eq!(
        counter.method.as_str(),
        "none",
        "Counter {} must not transact",
        counter.key()
    );
    assert_eq!(
        counter.amounts.total(),
        expected_total,
        "Counter {} amounts do not add up",
        counter.key()
    );
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that a result is Err and returns the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!("Expected Err matching {}, got Ok({:?})", stringify!($pattern), value),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_buckets_eq_passes() {
        let buckets = Buckets {
            advance_amount: dec!(10),
            ..Buckets::zero()
        };
        assert_buckets_eq(&buckets, &buckets);
    }

    #[test]
    #[should_panic(expected = "Advance: actual=10, expected=0")]
    fn test_assert_buckets_eq_names_bucket() {
        let buckets = Buckets {
            advance_amount: dec!(10),
            ..Buckets::zero()
        };
        assert_buckets_eq(&buckets, &Buckets::zero());
    }

    #[test]
    fn test_fresh_unit_is_consistent() {
        let opening = Buckets {
            current_financial_amount: dec!(500),
            ..Buckets::zero()
        };
        let unit = Unit::new("Alpha").with_opening_balances(opening);
        assert_history_consistent(&unit, &opening);
        assert_no_negative_buckets(&unit);
    }
}

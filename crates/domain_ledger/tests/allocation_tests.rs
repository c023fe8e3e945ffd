//! Allocation engine properties
//!
//! Conservation of the waterfall and exactness of the reversal, checked over
//! generated balances and amounts.

use core_kernel::{VoucherKey, VoucherType};
use domain_ledger::allocation::{allocate, plan, VoucherMeta};
use domain_ledger::{Buckets, PaymentType, ReceiptFor, Unit};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use test_utils::{
    amount_strategy, assert_buckets_eq, assert_history_consistent, assert_no_negative_buckets,
    buckets_strategy, receipt_sequence_strategy, FiscalFixtures, TestVoucherBuilder, UnitFixtures,
};

fn meta(no: i64) -> VoucherMeta {
    VoucherMeta::from_voucher(&TestVoucherBuilder::receipt(no).build())
}

mod waterfall {
    use super::*;

    proptest! {
        #[test]
        fn entries_add_up_to_the_amount(buckets in buckets_strategy(), amount in amount_strategy()) {
            let allocation = allocate(&buckets, amount, &meta(1)).unwrap();
            let total: Decimal = allocation.entries().iter().map(|e| e.amount).sum();
            prop_assert_eq!(total, amount);
            prop_assert!(allocation.entries().iter().all(|e| e.amount > Decimal::ZERO));
        }

        #[test]
        fn dues_are_never_overpaid(buckets in buckets_strategy(), amount in amount_strategy()) {
            let unit = Unit::new("Alpha").with_opening_balances(buckets);
            let mut after = unit.clone();
            after.apply(&allocate(unit.buckets(), amount, &meta(1)).unwrap());

            assert_no_negative_buckets(&after);
            prop_assert!(after.buckets().advance_amount >= buckets.advance_amount);
            prop_assert_eq!(after.buckets().unpaid_amount, buckets.unpaid_amount);
        }

        #[test]
        fn oldest_dues_settle_first(buckets in buckets_strategy(), amount in amount_strategy()) {
            let allocation = allocate(&buckets, amount, &meta(1)).unwrap();
            let tags: Vec<ReceiptFor> = allocation.entries().iter().map(|e| e.receipt_for).collect();

            let rank = |tag: &ReceiptFor| match tag {
                ReceiptFor::LastFinancialYearAmount => 0,
                ReceiptFor::CurrentFinancialYearAmount => 1,
                ReceiptFor::AdvanceAmount => 2,
                ReceiptFor::Waveoff => 3,
            };
            prop_assert!(tags.windows(2).all(|w| rank(&w[0]) < rank(&w[1])));

            if allocation.deltas().advance_amount > Decimal::ZERO {
                prop_assert_eq!(
                    buckets.last_financial_year_amount + buckets.current_financial_amount
                        + allocation.deltas().advance_amount,
                    amount
                );
            }
        }
    }

    #[test]
    fn test_receipt_settles_last_year_then_current_then_advance() {
        let unit = UnitFixtures::alpha_two_year_dues();
        let allocation = allocate(unit.buckets(), dec!(600), &meta(1)).unwrap();

        let entries: Vec<(ReceiptFor, Decimal)> = allocation
            .entries()
            .iter()
            .map(|e| (e.receipt_for, e.amount))
            .collect();
        assert_eq!(
            entries,
            vec![
                (ReceiptFor::LastFinancialYearAmount, dec!(40)),
                (ReceiptFor::CurrentFinancialYearAmount, dec!(500)),
                (ReceiptFor::AdvanceAmount, dec!(60)),
            ]
        );
    }

    #[test]
    fn test_exact_payment_leaves_no_advance() {
        let unit = UnitFixtures::alpha_current_dues();
        let allocation = allocate(unit.buckets(), dec!(500), &meta(1)).unwrap();

        assert_eq!(allocation.entries().len(), 1);
        assert_eq!(allocation.deltas().current_financial_amount, dec!(-500));
        assert_eq!(allocation.deltas().advance_amount, Decimal::ZERO);
    }

    #[test]
    fn test_zero_amount_emits_nothing() {
        let unit = UnitFixtures::alpha_two_year_dues();
        let allocation = allocate(unit.buckets(), Decimal::ZERO, &meta(1)).unwrap();

        assert!(allocation.is_empty());
        assert!(allocation.deltas().is_zero());
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let err = allocate(&Buckets::zero(), dec!(-1), &meta(1)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_waiver_retires_unpaid_only() {
        let unit = UnitFixtures::bravo_unpaid();
        let voucher = TestVoucherBuilder::payment(7)
            .with_unit(UnitFixtures::BRAVO)
            .with_payment_type(PaymentType::Waiver)
            .cash(dec!(100))
            .build();

        let allocation = plan(&unit, &voucher).unwrap();
        assert_eq!(allocation.entries().len(), 1);
        assert_eq!(allocation.entries()[0].receipt_for, ReceiptFor::Waveoff);
        assert_eq!(allocation.deltas().unpaid_amount, dec!(-100));
        assert_eq!(allocation.deltas().current_financial_amount, Decimal::ZERO);
    }

    #[test]
    fn test_waiver_above_unpaid_is_rejected() {
        let unit = UnitFixtures::bravo_unpaid();
        let voucher = TestVoucherBuilder::payment(7)
            .with_unit(UnitFixtures::BRAVO)
            .with_payment_type(PaymentType::Waiver)
            .cash(dec!(100.01))
            .build();

        assert!(plan(&unit, &voucher).unwrap_err().is_validation());
    }

    #[test]
    fn test_ordinary_payment_leaves_unit_alone() {
        let unit = UnitFixtures::bravo_unpaid();
        let voucher = TestVoucherBuilder::payment(8)
            .with_unit(UnitFixtures::BRAVO)
            .cash(dec!(1000))
            .build();

        assert!(plan(&unit, &voucher).unwrap().is_empty());
    }
}

mod reversal {
    use super::*;

    proptest! {
        #[test]
        fn revert_is_exact_inverse(
            opening in buckets_strategy(),
            amounts in receipt_sequence_strategy(6),
            target in 0usize..6,
        ) {
            let fy = FiscalFixtures::fy_2024();
            let mut unit = Unit::new("Alpha").with_opening_balances(opening);
            let mut snapshots = Vec::new();

            for (i, amount) in amounts.iter().enumerate() {
                snapshots.push(unit.clone());
                let allocation = allocate(unit.buckets(), *amount, &meta(i as i64 + 1)).unwrap();
                unit.apply(&allocation);
            }
            assert_history_consistent(&unit, &opening);

            // Reverting the most recent voucher restores the prior state exactly.
            let last = amounts.len() - 1;
            let mut reverted = unit.clone();
            reverted.revert(fy, &VoucherKey::new(VoucherType::Rv, last as i64 + 1));
            prop_assert_eq!(&reverted, &snapshots[last]);

            // Reverting any voucher removes exactly its net effect.
            let target = target % amounts.len();
            let key = VoucherKey::new(VoucherType::Rv, target as i64 + 1);
            let effect = unit.net_effect(fy, &key);
            let mut expected = *unit.buckets();
            expected.add_all(&effect.negated());

            let reversal = unit.revert(fy, &key);
            assert_buckets_eq(unit.buckets(), &expected);
            assert_buckets_eq(reversal.restored(), &effect.negated());
            prop_assert_eq!(unit.entries_for(fy, &key).count(), 0);
            assert_history_consistent(&unit, &opening);
        }
    }

    #[test]
    fn test_revert_then_reapply_round_trips() {
        let fy = FiscalFixtures::fy_2024();
        let mut unit = UnitFixtures::alpha_two_year_dues();
        let voucher = TestVoucherBuilder::receipt(3)
            .with_unit(UnitFixtures::ALPHA)
            .cash(dec!(75))
            .build();

        unit.apply(&plan(&unit, &voucher).unwrap());
        let applied = unit.clone();

        let reversal = unit.revert(fy, &voucher.key());
        assert_eq!(reversal.removed().len(), 2);
        assert_eq!(unit, UnitFixtures::alpha_two_year_dues());

        unit.apply(&plan(&unit, &voucher).unwrap());
        assert_eq!(unit, applied);
    }
}

//! PostgreSQL adapter tests
//!
//! These start a PostgreSQL container and are ignored by default:
//!
//! ```sh
//! cargo test -p infra_db -- --ignored
//! ```

use rust_decimal_macros::dec;
use std::sync::Arc;

use core_kernel::{PortError, VoucherKey, VoucherNo, VoucherType};
use domain_ledger::{
    FixedDepositPort, ReceiptFor, UnitLedgerPort, VoucherFilter, VoucherService, VoucherStore,
    VoucherStoreResolver,
};
use infra_db::{PostgresFixedDeposits, PostgresUnitLedger, PostgresVoucherStores};
use test_utils::{
    assert_buckets_eq, create_isolated_test_database, DepositFixtures, FiscalFixtures,
    TestUnitBuilder, UnitFixtures, VoucherFixtures,
};

mod unit_ledger {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_unit_round_trip_keeps_history_order() {
        let db = create_isolated_test_database().await.unwrap();
        let units = PostgresUnitLedger::new(db.pool().clone());

        let mut unit = UnitFixtures::alpha_two_year_dues();
        units.insert(&unit).await.unwrap();

        let receipt = VoucherFixtures::receipt(1, UnitFixtures::ALPHA, dec!(600));
        let allocation = domain_ledger::allocation::plan(&unit, &receipt).unwrap();
        unit.apply(&allocation);
        units.save(&unit).await.unwrap();

        let stored = units.find_by_name(UnitFixtures::ALPHA).await.unwrap().unwrap();
        assert_eq!(stored, unit);
        let tags: Vec<_> = stored.history().iter().map(|e| e.receipt_for).collect();
        assert_eq!(
            tags,
            vec![
                ReceiptFor::LastFinancialYearAmount,
                ReceiptFor::CurrentFinancialYearAmount,
                ReceiptFor::AdvanceAmount,
            ]
        );
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_duplicate_unit_is_conflict() {
        let db = create_isolated_test_database().await.unwrap();
        let units = PostgresUnitLedger::new(db.pool().clone());

        units.insert(&UnitFixtures::alpha_current_dues()).await.unwrap();
        let err = units.insert(&UnitFixtures::alpha_current_dues()).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_save_of_unknown_unit_is_not_found() {
        let db = create_isolated_test_database().await.unwrap();
        let units = PostgresUnitLedger::new(db.pool().clone());

        let err = units.save(&TestUnitBuilder::new("Ghost").build()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_list_filters_case_insensitively() {
        let db = create_isolated_test_database().await.unwrap();
        let units = PostgresUnitLedger::new(db.pool().clone());

        units.insert(&UnitFixtures::alpha_current_dues()).await.unwrap();
        units.insert(&UnitFixtures::bravo_unpaid()).await.unwrap();

        let all = units.list(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name(), UnitFixtures::ALPHA);

        let bravo = units.list(Some("BATT")).await.unwrap();
        assert_eq!(bravo.len(), 1);
        assert_eq!(bravo[0].name(), UnitFixtures::BRAVO);
    }
}

mod voucher_store {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_store_is_scoped_to_its_year() {
        let db = create_isolated_test_database().await.unwrap();
        let stores = PostgresVoucherStores::new(db.pool().clone());

        let fy = FiscalFixtures::fy_2024();
        let current = stores.store_for(fy).await.unwrap();
        let previous = stores.store_for(fy.previous()).await.unwrap();

        let receipt = VoucherFixtures::receipt(1, UnitFixtures::ALPHA, dec!(100));
        current.insert(&receipt).await.unwrap();

        assert!(current.find_one(&receipt.key()).await.unwrap().is_some());
        assert!(previous.find_one(&receipt.key()).await.unwrap().is_none());

        let err = previous.insert(&receipt).await.unwrap_err();
        assert!(matches!(err, PortError::Validation { .. }));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_insert_duplicate_and_upsert() {
        let db = create_isolated_test_database().await.unwrap();
        let stores = PostgresVoucherStores::new(db.pool().clone());
        let store = stores.store_for(FiscalFixtures::fy_2024()).await.unwrap();

        let receipt = VoucherFixtures::receipt(3, UnitFixtures::ALPHA, dec!(100));
        store.insert(&receipt).await.unwrap();
        assert!(store.insert(&receipt).await.unwrap_err().is_conflict());

        let mut changed = receipt.clone();
        changed.amounts.cash = dec!(250);
        store.upsert(&changed).await.unwrap();

        let stored = store.find_one(&receipt.key()).await.unwrap().unwrap();
        assert_eq!(stored.transacted_amount(), dec!(250));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_update_and_delete_of_missing_voucher_are_not_found() {
        let db = create_isolated_test_database().await.unwrap();
        let stores = PostgresVoucherStores::new(db.pool().clone());
        let store = stores.store_for(FiscalFixtures::fy_2024()).await.unwrap();

        let receipt = VoucherFixtures::receipt(8, UnitFixtures::ALPHA, dec!(10));
        assert!(store.update_one(&receipt.key(), &receipt).await.unwrap_err().is_not_found());
        assert!(store.delete_one(&receipt.key()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_update_under_another_key_is_rejected() {
        let db = create_isolated_test_database().await.unwrap();
        let stores = PostgresVoucherStores::new(db.pool().clone());
        let store = stores.store_for(FiscalFixtures::fy_2024()).await.unwrap();

        let receipt = VoucherFixtures::receipt(1, UnitFixtures::ALPHA, dec!(10));
        store.insert(&receipt).await.unwrap();

        let other = VoucherKey::new(VoucherType::Rv, 2);
        let err = store.update_one(&other, &receipt).await.unwrap_err();
        assert!(matches!(err, PortError::Validation { .. }));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_find_filters_and_last_number() {
        let db = create_isolated_test_database().await.unwrap();
        let stores = PostgresVoucherStores::new(db.pool().clone());
        let store = stores.store_for(FiscalFixtures::fy_2024()).await.unwrap();

        for no in [4, 1, 9] {
            store
                .insert(&VoucherFixtures::receipt(no, UnitFixtures::ALPHA, dec!(10)))
                .await
                .unwrap();
        }
        store
            .insert(&VoucherFixtures::waiver(2, UnitFixtures::BRAVO, dec!(5)))
            .await
            .unwrap();

        let from_four = store
            .find(&VoucherFilter::by_type(VoucherType::Rv).from_number(VoucherNo::new(4)))
            .await
            .unwrap();
        let numbers: Vec<i64> = from_four.iter().map(|v| v.voucher_no.value()).collect();
        assert_eq!(numbers, vec![4, 9]);

        let last = store.find_last(VoucherType::Rv).await.unwrap().unwrap();
        assert_eq!(last.voucher_no, VoucherNo::new(9));
        assert!(store.find_last(VoucherType::CeRv).await.unwrap().is_none());

        let payments = store
            .find(&VoucherFilter::by_ledger(core_kernel::Ledger::Payment))
            .await
            .unwrap();
        assert_eq!(payments.len(), 1);
        assert!(payments[0].payment_type().is_some_and(|t| t.is_waiver()));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_financial_year_registration_is_idempotent() {
        let db = create_isolated_test_database().await.unwrap();
        let stores = PostgresVoucherStores::new(db.pool().clone());

        let fy = FiscalFixtures::fy_2024();
        assert!(stores.register(fy).await.unwrap());
        assert!(!stores.register(fy).await.unwrap());
        assert!(stores.register(fy.previous()).await.unwrap());

        assert_eq!(stores.financial_years().await.unwrap(), vec![fy.previous(), fy]);
    }
}

mod service {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_create_and_cascade_delete_against_postgres() {
        let db = create_isolated_test_database().await.unwrap();
        let pool = db.pool().clone();

        let units = Arc::new(PostgresUnitLedger::new(pool.clone()));
        let deposits = Arc::new(PostgresFixedDeposits::new(pool.clone()));
        let stores = PostgresVoucherStores::new(pool);
        let store = stores.store_for(FiscalFixtures::fy_2024()).await.unwrap();

        let opening = UnitFixtures::alpha_current_dues();
        units.insert(&opening).await.unwrap();
        deposits.insert(&DepositFixtures::matured()).await.unwrap();

        let service = VoucherService::new(units.clone(), deposits);
        for no in 1..=3 {
            service
                .create_voucher(
                    store.as_ref(),
                    VoucherFixtures::receipt(no, UnitFixtures::ALPHA, dec!(100)),
                )
                .await
                .unwrap();
        }
        service
            .create_voucher(store.as_ref(), VoucherFixtures::matured_fd(4, UnitFixtures::ALPHA))
            .await
            .unwrap();

        let counter = store
            .find_one(&VoucherKey::new(VoucherType::CePv, 4))
            .await
            .unwrap();
        assert!(counter.is_some());

        let outcome = service
            .delete_voucher(store.as_ref(), VoucherKey::new(VoucherType::Rv, 2))
            .await
            .unwrap();
        assert_eq!(outcome.deleted.len(), 3);

        let remaining = store.find(&VoucherFilter::new()).await.unwrap();
        let keys: Vec<VoucherKey> = remaining.iter().map(|v| v.key()).collect();
        assert_eq!(keys, vec![VoucherKey::new(VoucherType::Rv, 1)]);

        let unit = units.find_by_name(UnitFixtures::ALPHA).await.unwrap().unwrap();
        let mut expected = *opening.buckets();
        expected.current_financial_amount = dec!(400);
        assert_buckets_eq(unit.buckets(), &expected);
        assert_eq!(unit.history().len(), 1);
    }
}

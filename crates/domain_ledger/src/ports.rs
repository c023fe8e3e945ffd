//! Ledger Domain Ports
//!
//! The voucher service reaches every store through the traits in this
//! module. Adapters live in [`crate::memory`] (in-process, used by tests and
//! the `memory` server backend) and in `infra_db` (PostgreSQL).
//!
//! # Store handles
//!
//! Vouchers are partitioned by financial year. A [`VoucherStoreResolver`]
//! hands out one [`VoucherStore`] per year; the handle is resolved once per
//! request and passed explicitly into every service operation:
//!
//! ```rust,ignore
//! let store = resolver.store_for(financial_year).await?;
//! let outcome = service.create_voucher(store.as_ref(), voucher).await?;
//! ```
//!
//! A store handle holds both ledgers of its year; the receipt and payment
//! halves are told apart by voucher type.

use async_trait::async_trait;
use chrono::Datelike;
use std::sync::Arc;

use core_kernel::{
    DomainPort, FinancialYear, HealthCheckable, Ledger, PortError, VoucherKey, VoucherNo,
    VoucherType,
};

use crate::fixed_deposit::FixedDeposit;
use crate::unit::Unit;
use crate::voucher::Voucher;

/// Persistence of units and their history trail
#[async_trait]
pub trait UnitLedgerPort: DomainPort + HealthCheckable {
    /// Fetches a unit by its unique name
    async fn find_by_name(&self, name: &str) -> Result<Option<Unit>, PortError>;

    /// Replaces a stored unit, buckets and history together
    ///
    /// Fails with `NotFound` if the unit was never registered.
    async fn save(&self, unit: &Unit) -> Result<Unit, PortError>;

    /// Registers a new unit; fails with `Conflict` if the name is taken
    async fn insert(&self, unit: &Unit) -> Result<Unit, PortError>;

    /// Lists units ordered by name, optionally filtered by a
    /// case-insensitive substring of the name
    async fn list(&self, search: Option<&str>) -> Result<Vec<Unit>, PortError>;
}

/// Query over the vouchers of one financial year
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoucherFilter {
    pub voucher_type: Option<VoucherType>,
    pub ledger: Option<Ledger>,
    pub voucher_no: Option<VoucherNo>,
    /// Inclusive lower bound on the voucher number
    pub voucher_no_gte: Option<VoucherNo>,
    pub particulars: Option<String>,
    /// Calendar month (1-12) of the voucher date
    pub month: Option<u32>,
}

impl VoucherFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_type(voucher_type: VoucherType) -> Self {
        Self {
            voucher_type: Some(voucher_type),
            ..Default::default()
        }
    }

    pub fn by_ledger(ledger: Ledger) -> Self {
        Self {
            ledger: Some(ledger),
            ..Default::default()
        }
    }

    pub fn from_number(mut self, voucher_no: VoucherNo) -> Self {
        self.voucher_no_gte = Some(voucher_no);
        self
    }

    pub fn number(mut self, voucher_no: VoucherNo) -> Self {
        self.voucher_no = Some(voucher_no);
        self
    }

    pub fn particulars(mut self, particulars: impl Into<String>) -> Self {
        self.particulars = Some(particulars.into());
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.month = Some(month);
        self
    }

    pub fn matches(&self, voucher: &Voucher) -> bool {
        if let Some(t) = self.voucher_type {
            if voucher.voucher_type != t {
                return false;
            }
        }
        if let Some(ledger) = self.ledger {
            if voucher.ledger() != ledger {
                return false;
            }
        }
        if let Some(no) = self.voucher_no {
            if voucher.voucher_no != no {
                return false;
            }
        }
        if let Some(from) = self.voucher_no_gte {
            if voucher.voucher_no < from {
                return false;
            }
        }
        if let Some(ref particulars) = self.particulars {
            if &voucher.particulars != particulars {
                return false;
            }
        }
        if let Some(month) = self.month {
            if voucher.date.month() != month {
                return false;
            }
        }
        true
    }
}

/// Vouchers of one financial year
#[async_trait]
pub trait VoucherStore: DomainPort {
    /// The financial year this handle is scoped to
    fn financial_year(&self) -> FinancialYear;

    /// Vouchers matching `filter`, ordered by type then ascending number
    async fn find(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, PortError>;

    async fn find_one(&self, key: &VoucherKey) -> Result<Option<Voucher>, PortError>;

    /// Fails with `Conflict` if the key already exists
    async fn insert(&self, voucher: &Voucher) -> Result<Voucher, PortError>;

    /// Replaces the voucher stored under `key`; fails with `NotFound` if absent
    ///
    /// The replacement may carry the same key only.
    async fn update_one(&self, key: &VoucherKey, voucher: &Voucher) -> Result<Voucher, PortError>;

    /// Inserts or replaces by `(voucherType, voucherNo)`
    async fn upsert(&self, voucher: &Voucher) -> Result<Voucher, PortError>;

    /// Fails with `NotFound` if absent
    async fn delete_one(&self, key: &VoucherKey) -> Result<(), PortError>;

    /// The voucher of `voucher_type` with the highest number
    async fn find_last(&self, voucher_type: VoucherType) -> Result<Option<Voucher>, PortError>;
}

/// Resolves financial years to voucher store handles
#[async_trait]
pub trait VoucherStoreResolver: DomainPort + HealthCheckable {
    /// Store handle for `financial_year`; an unregistered year reads empty
    async fn store_for(&self, financial_year: FinancialYear) -> Result<Arc<dyn VoucherStore>, PortError>;

    /// Records a financial year; returns true if it was not known before
    async fn register(&self, financial_year: FinancialYear) -> Result<bool, PortError>;

    /// Registered years, oldest first
    async fn financial_years(&self) -> Result<Vec<FinancialYear>, PortError>;
}

/// Fixed-deposit register
#[async_trait]
pub trait FixedDepositPort: DomainPort + HealthCheckable {
    async fn find_by_number(&self, fdr_no: &str) -> Result<Option<FixedDeposit>, PortError>;

    /// Fails with `Conflict` if the number is taken
    async fn insert(&self, deposit: &FixedDeposit) -> Result<FixedDeposit, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voucher::{BucketAmounts, Method, ReceiptType, VoucherLabel};
    use chrono::NaiveDate;

    fn voucher(no: i64, month: u32) -> Voucher {
        Voucher {
            date: NaiveDate::from_ymd_opt(2024, month, 3).unwrap(),
            voucher_type: VoucherType::Rv,
            voucher_no: VoucherNo::new(no),
            particulars: "Alpha".to_string(),
            custom: false,
            label: VoucherLabel::Receipt(ReceiptType::UcsAmount),
            method: Method::Cash,
            description: None,
            amounts: BucketAmounts::default(),
            financial_year: FinancialYear::starting(2024),
            counter_voucher_no: None,
            fdr_no: None,
        }
    }

    #[test]
    fn test_filter_from_number_is_inclusive() {
        let filter = VoucherFilter::by_type(VoucherType::Rv).from_number(VoucherNo::new(10));
        assert!(filter.matches(&voucher(10, 5)));
        assert!(filter.matches(&voucher(11, 5)));
        assert!(!filter.matches(&voucher(9, 5)));
    }

    #[test]
    fn test_filter_by_ledger_and_month() {
        let filter = VoucherFilter::by_ledger(Ledger::Receipt).month(6);
        assert!(filter.matches(&voucher(1, 6)));
        assert!(!filter.matches(&voucher(1, 7)));
        assert!(!VoucherFilter::by_ledger(Ledger::Payment).matches(&voucher(1, 6)));
    }
}

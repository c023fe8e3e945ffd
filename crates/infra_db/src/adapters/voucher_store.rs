//! PostgreSQL voucher store adapters
//!
//! [`PostgresVoucherStores`] resolves a financial year to a
//! [`PostgresVoucherStore`] handle. Handles are cheap: they share the pool
//! and only carry the year they scope every query to.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;

use core_kernel::{
    DomainPort, FinancialYear, HealthCheckResult, HealthCheckable, PortError, VoucherKey,
    VoucherType,
};
use domain_ledger::{Voucher, VoucherFilter, VoucherStore, VoucherStoreResolver};

use crate::repositories::VoucherRepository;

/// Vouchers of one financial year
#[derive(Debug, Clone)]
pub struct PostgresVoucherStore {
    repository: VoucherRepository,
    financial_year: FinancialYear,
}

impl PostgresVoucherStore {
    pub fn new(pool: PgPool, financial_year: FinancialYear) -> Self {
        Self {
            repository: VoucherRepository::new(pool),
            financial_year,
        }
    }
}

impl DomainPort for PostgresVoucherStore {}

#[async_trait]
impl VoucherStore for PostgresVoucherStore {
    fn financial_year(&self) -> FinancialYear {
        self.financial_year
    }

    #[instrument(skip(self), fields(financial_year = %self.financial_year))]
    async fn find(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, PortError> {
        Ok(self.repository.find(self.financial_year, filter).await?)
    }

    #[instrument(skip(self), fields(financial_year = %self.financial_year, voucher = %key))]
    async fn find_one(&self, key: &VoucherKey) -> Result<Option<Voucher>, PortError> {
        Ok(self.repository.find_one(self.financial_year, key).await?)
    }

    #[instrument(skip(self, voucher), fields(financial_year = %self.financial_year, voucher = %voucher.key()))]
    async fn insert(&self, voucher: &Voucher) -> Result<Voucher, PortError> {
        self.check_year(voucher)?;
        self.repository.insert(voucher).await?;
        Ok(voucher.clone())
    }

    #[instrument(skip(self, voucher), fields(financial_year = %self.financial_year, voucher = %key))]
    async fn update_one(&self, key: &VoucherKey, voucher: &Voucher) -> Result<Voucher, PortError> {
        self.check_year(voucher)?;
        if voucher.key() != *key {
            return Err(PortError::validation_field(
                format!("Cannot store {} under {}", voucher.key(), key),
                "voucherNo",
            ));
        }
        self.repository.update(voucher).await?;
        Ok(voucher.clone())
    }

    #[instrument(skip(self, voucher), fields(financial_year = %self.financial_year, voucher = %voucher.key()))]
    async fn upsert(&self, voucher: &Voucher) -> Result<Voucher, PortError> {
        self.check_year(voucher)?;
        self.repository.upsert(voucher).await?;
        Ok(voucher.clone())
    }

    #[instrument(skip(self), fields(financial_year = %self.financial_year, voucher = %key))]
    async fn delete_one(&self, key: &VoucherKey) -> Result<(), PortError> {
        Ok(self.repository.delete(self.financial_year, key).await?)
    }

    #[instrument(skip(self), fields(financial_year = %self.financial_year))]
    async fn find_last(&self, voucher_type: VoucherType) -> Result<Option<Voucher>, PortError> {
        Ok(self.repository.find_last(self.financial_year, voucher_type).await?)
    }
}

impl PostgresVoucherStore {
    fn check_year(&self, voucher: &Voucher) -> Result<(), PortError> {
        if voucher.financial_year != self.financial_year {
            return Err(PortError::validation_field(
                format!(
                    "Voucher {} of {} written to the {} store",
                    voucher.key(),
                    voucher.financial_year,
                    self.financial_year
                ),
                "financialYear",
            ));
        }
        Ok(())
    }
}

/// Resolves financial years to PostgreSQL store handles
#[derive(Debug, Clone)]
pub struct PostgresVoucherStores {
    repository: VoucherRepository,
}

impl PostgresVoucherStores {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: VoucherRepository::new(pool),
        }
    }
}

impl DomainPort for PostgresVoucherStores {}

#[async_trait]
impl HealthCheckable for PostgresVoucherStores {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(self.repository.pool(), "postgres-voucher-stores").await
    }
}

#[async_trait]
impl VoucherStoreResolver for PostgresVoucherStores {
    async fn store_for(&self, financial_year: FinancialYear) -> Result<Arc<dyn VoucherStore>, PortError> {
        Ok(Arc::new(PostgresVoucherStore::new(
            self.repository.pool().clone(),
            financial_year,
        )))
    }

    #[instrument(skip(self))]
    async fn register(&self, financial_year: FinancialYear) -> Result<bool, PortError> {
        Ok(self.repository.register_financial_year(financial_year).await?)
    }

    async fn financial_years(&self) -> Result<Vec<FinancialYear>, PortError> {
        Ok(self.repository.financial_years().await?)
    }
}

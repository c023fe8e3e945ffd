//! PostgreSQL fixed-deposit adapter

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_ledger::{FixedDeposit, FixedDepositPort};

use crate::repositories::FixedDepositRepository;

/// PostgreSQL-backed implementation of [`FixedDepositPort`]
#[derive(Debug, Clone)]
pub struct PostgresFixedDeposits {
    repository: FixedDepositRepository,
    pool: PgPool,
}

impl PostgresFixedDeposits {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: FixedDepositRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresFixedDeposits {}

#[async_trait]
impl HealthCheckable for PostgresFixedDeposits {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-fixed-deposits").await
    }
}

#[async_trait]
impl FixedDepositPort for PostgresFixedDeposits {
    #[instrument(skip(self))]
    async fn find_by_number(&self, fdr_no: &str) -> Result<Option<FixedDeposit>, PortError> {
        Ok(self.repository.find_by_number(fdr_no).await?)
    }

    #[instrument(skip(self, deposit), fields(fdr_no = %deposit.fdr_no))]
    async fn insert(&self, deposit: &FixedDeposit) -> Result<FixedDeposit, PortError> {
        self.repository.insert(deposit).await?;
        Ok(deposit.clone())
    }
}

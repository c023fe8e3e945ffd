//! PostgreSQL unit ledger adapter

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_ledger::{Unit, UnitLedgerPort};

use crate::repositories::UnitRepository;

/// PostgreSQL-backed implementation of [`UnitLedgerPort`]
#[derive(Debug, Clone)]
pub struct PostgresUnitLedger {
    repository: UnitRepository,
    pool: PgPool,
}

impl PostgresUnitLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: UnitRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &UnitRepository {
        &self.repository
    }
}

impl DomainPort for PostgresUnitLedger {}

#[async_trait]
impl HealthCheckable for PostgresUnitLedger {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-unit-ledger").await
    }
}

#[async_trait]
impl UnitLedgerPort for PostgresUnitLedger {
    #[instrument(skip(self))]
    async fn find_by_name(&self, name: &str) -> Result<Option<Unit>, PortError> {
        debug!("Fetching unit");
        Ok(self.repository.find_by_name(name).await?)
    }

    #[instrument(skip(self, unit), fields(unit = %unit.name(), history = unit.history().len()))]
    async fn save(&self, unit: &Unit) -> Result<Unit, PortError> {
        self.repository.save(unit).await?;
        Ok(unit.clone())
    }

    #[instrument(skip(self, unit), fields(unit = %unit.name()))]
    async fn insert(&self, unit: &Unit) -> Result<Unit, PortError> {
        self.repository.insert(unit).await?;
        Ok(unit.clone())
    }

    #[instrument(skip(self))]
    async fn list(&self, search: Option<&str>) -> Result<Vec<Unit>, PortError> {
        Ok(self.repository.list(search).await?)
    }
}

//! Domain Adapters
//!
//! PostgreSQL implementations of the ledger ports. Each adapter wraps a
//! repository, translates `DatabaseError` into `PortError`, and reports its
//! health with a `SELECT 1` round trip.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::{PostgresUnitLedger, PostgresVoucherStores};
//! use domain_ledger::VoucherService;
//!
//! let units = Arc::new(PostgresUnitLedger::new(pool.clone()));
//! let stores = PostgresVoucherStores::new(pool.clone());
//! let store = stores.store_for(financial_year).await?;
//! ```

pub mod unit_ledger;
pub mod voucher_store;
pub mod fixed_deposit;

pub use unit_ledger::PostgresUnitLedger;
pub use voucher_store::{PostgresVoucherStore, PostgresVoucherStores};
pub use fixed_deposit::PostgresFixedDeposits;

use chrono::Utc;
use core_kernel::{AdapterHealth, HealthCheckResult};
use sqlx::PgPool;

/// Checks database connectivity on behalf of `adapter_id`
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = std::time::Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Healthy,
            latency_ms,
            message: None,
            checked_at: Utc::now(),
        },
        Err(e) => HealthCheckResult {
            adapter_id: adapter_id.to_string(),
            status: AdapterHealth::Unhealthy,
            latency_ms,
            message: Some(format!("Database error: {}", e)),
            checked_at: Utc::now(),
        },
    }
}

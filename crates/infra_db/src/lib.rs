//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the unit ledger, built on SQLx.
//!
//! # Architecture
//!
//! Repositories (`repositories`) own the SQL and map rows to domain types.
//! Adapters (`adapters`) wrap them behind the `domain_ledger` ports so the
//! voucher service never sees a database type.
//!
//! # Schema
//!
//! - `units` / `unit_history`: bucket balances and the ordered history trail
//! - `vouchers`: both ledgers of every financial year, keyed by
//!   `(financial_year, voucher_type, voucher_no)`
//! - `financial_years`: registered years
//! - `fixed_deposits`: the FDR register
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool_from_url, run_migrations, PostgresUnitLedger};
//!
//! let pool = create_pool_from_url("postgres://localhost/ledger").await?;
//! run_migrations(&pool).await?;
//! let units = PostgresUnitLedger::new(pool.clone());
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use repositories::{FixedDepositRepository, UnitRepository, VoucherRepository};
pub use adapters::{
    PostgresFixedDeposits, PostgresUnitLedger, PostgresVoucherStore, PostgresVoucherStores,
};

//! Core Kernel - Foundational types shared by the unit ledger crates
//!
//! This crate provides the building blocks used across the ledger domain and
//! its adapters:
//! - Financial-year resolution (April to March accounting periods)
//! - Voucher identity types (type, number, ledger)
//! - Port error and health abstractions for store adapters

pub mod fiscal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use fiscal::FinancialYear;
pub use identifiers::{Ledger, VoucherKey, VoucherNo, VoucherType};
pub use ports::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
pub use error::CoreError;

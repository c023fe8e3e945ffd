//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! unit ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built units, vouchers and fixed deposits
//! - `builders`: Builder patterns for vouchers and units
//! - `database`: PostgreSQL test container management
//! - `assertions`: Ledger-specific assertion helpers
//! - `generators`: Property-based test data generators
//! - `faults`: Port wrappers that fail on demand

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;
pub mod faults;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
pub use faults::*;

//! Request handlers

pub mod vouchers;
pub mod units;
pub mod fixed_deposits;
pub mod financial_years;
pub mod health;

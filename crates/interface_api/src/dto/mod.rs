//! Request and response data transfer objects

pub mod lenient;
pub mod voucher;
pub mod unit;
pub mod fiscal;

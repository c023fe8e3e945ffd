//! Repository implementations
//!
//! Row-level SQL for each table group. Repositories speak `DatabaseError`;
//! the adapters in [`crate::adapters`] put the domain ports on top.

pub mod unit;
pub mod voucher;
pub mod fixed_deposit;

pub use unit::UnitRepository;
pub use voucher::VoucherRepository;
pub use fixed_deposit::FixedDepositRepository;

//! Unit Ledger Domain
//!
//! This crate implements the bookkeeping core of the unit ledger: every
//! receipt or payment voucher booked against a member unit is distributed
//! over the unit's balance buckets, recorded in the unit's history trail so
//! it can be reversed exactly, and mirrored into the opposite ledger when it
//! represents an internal fund transfer.
//!
//! # Components
//!
//! - **Allocation Engine** (`allocation`): oldest-dues-first waterfall over
//!   last-year dues, current-year dues and advance credit; waivers against
//!   the unpaid balance
//! - **Reversal** (`reversal`): exact undo of a voucher's history entries
//!   and the mutation state machine
//! - **Counter-Voucher Generator** (`counter`): mirrored `CE_RV`/`CE_PV`
//!   vouchers for internal transfers
//! - **Cascading Delete Resolver** (`cascade`): dependent `RV` batches
//! - **Voucher Service** (`service`): orchestrates the above against the
//!   store ports with per-unit serialisation and compensating writes
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{VoucherService, memory::{InMemoryUnitLedger, InMemoryFixedDeposits}};
//!
//! let service = VoucherService::new(units, fixed_deposits);
//! let store = stores.store_for(voucher.financial_year).await?;
//! let outcome = service.create_voucher(store.as_ref(), voucher).await?;
//! ```

pub mod unit;
pub mod voucher;
pub mod fixed_deposit;
pub mod allocation;
pub mod reversal;
pub mod counter;
pub mod cascade;
pub mod ports;
pub mod memory;
pub mod service;
pub mod error;

pub use unit::{Bucket, Buckets, HistoryEntry, ReceiptFor, Unit};
pub use voucher::{
    BucketAmounts, Method, PaymentType, ReceiptType, Voucher, VoucherLabel, CUSTOM_PARTICULARS,
};
pub use fixed_deposit::FixedDeposit;
pub use allocation::{Allocation, VoucherMeta};
pub use reversal::{MutationState, Reversal};
pub use counter::CounterRule;
pub use ports::{
    FixedDepositPort, UnitLedgerPort, VoucherFilter, VoucherStore, VoucherStoreResolver,
};
pub use service::{DeleteOutcome, MutationOutcome, VoucherService};
pub use error::{LedgerError, MutationContext, Operation, SagaStep};

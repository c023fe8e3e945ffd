//! Ledger domain errors
//!
//! Every failure of a voucher mutation falls into one of four kinds:
//! validation (rejected before any write), not found, dependency (a
//! referenced record or the counter voucher could not be read or written)
//! and store (any other persistence failure). Failures after the first
//! write carry a [`MutationContext`] naming the voucher, the unit and the
//! saga step reached so the books can be reconciled by hand.

use std::fmt;
use thiserror::Error;

use core_kernel::{CoreError, PortError, VoucherKey};

use crate::reversal::MutationState;

/// The voucher mutation being performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Query,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Query => "query",
        };
        f.write_str(name)
    }
}

/// Step of a voucher mutation at which a failure occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStep {
    FetchUnit,
    FetchVoucher,
    RevertUnit,
    ReapplyUnit,
    SaveUnit,
    WriteVoucher,
    WriteCounterVoucher,
    DeleteVoucher,
    DeleteCounterVoucher,
    LookupFixedDeposit,
    ResolveBatch,
}

impl fmt::Display for SagaStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SagaStep::FetchUnit => "fetch unit",
            SagaStep::FetchVoucher => "fetch voucher",
            SagaStep::RevertUnit => "revert unit",
            SagaStep::ReapplyUnit => "reapply unit",
            SagaStep::SaveUnit => "save unit",
            SagaStep::WriteVoucher => "write voucher",
            SagaStep::WriteCounterVoucher => "write counter voucher",
            SagaStep::DeleteVoucher => "delete voucher",
            SagaStep::DeleteCounterVoucher => "delete counter voucher",
            SagaStep::LookupFixedDeposit => "look up fixed deposit",
            SagaStep::ResolveBatch => "resolve delete batch",
        };
        f.write_str(name)
    }
}

/// Where a voucher mutation stood when it failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationContext {
    pub operation: Operation,
    pub voucher: Option<VoucherKey>,
    pub unit: Option<String>,
    pub state: MutationState,
    pub step: Option<SagaStep>,
}

impl MutationContext {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            voucher: None,
            unit: None,
            state: MutationState::Start,
            step: None,
        }
    }

    pub fn voucher(mut self, key: VoucherKey) -> Self {
        self.voucher = Some(key);
        self
    }

    pub fn unit(mut self, unit: Option<&str>) -> Self {
        self.unit = unit.map(str::to_string);
        self
    }

    pub fn state(mut self, state: MutationState) -> Self {
        self.state = state;
        self
    }

    pub fn step(mut self, step: SagaStep) -> Self {
        self.step = Some(step);
        self
    }
}

impl fmt::Display for MutationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(key) = &self.voucher {
            write!(f, " voucher {}", key)?;
        }
        if let Some(unit) = &self.unit {
            write!(f, " unit '{}'", unit)?;
        }
        write!(f, " in state {:?}", self.state)?;
        if let Some(step) = &self.step {
            write!(f, " at step '{}'", step)?;
        }
        Ok(())
    }
}

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Rejected before any mutation took place
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        context: Option<MutationContext>,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A voucher with the same type and number already exists
    #[error("Duplicate voucher: {key}")]
    Duplicate { key: VoucherKey },

    /// The counter voucher or a referenced record failed
    #[error("Dependency failure during {context}: {message}")]
    Dependency {
        message: String,
        context: MutationContext,
        /// Whether the writes already made were rolled back
        compensated: bool,
        #[source]
        source: Option<PortError>,
    },

    #[error("Store failure during {context}: {source}")]
    Store {
        context: MutationContext,
        compensated: bool,
        #[source]
        source: PortError,
    },
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation {
            message: message.into(),
            context: None,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn voucher_not_found(key: &VoucherKey) -> Self {
        Self::not_found("Voucher", key)
    }

    pub fn unit_not_found(name: &str) -> Self {
        Self::not_found("Unit", name)
    }

    /// Wraps a port failure that happened at `context`
    ///
    /// Not-found and conflict results keep their meaning; failures while
    /// writing the counter voucher or reading a fixed deposit are dependency
    /// failures; everything else is a store failure.
    pub fn from_port(error: PortError, context: MutationContext) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => LedgerError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Validation { message, .. } => LedgerError::Validation {
                message,
                context: Some(context),
            },
            other => match context.step {
                Some(SagaStep::WriteCounterVoucher)
                | Some(SagaStep::DeleteCounterVoucher)
                | Some(SagaStep::LookupFixedDeposit) => LedgerError::Dependency {
                    message: other.to_string(),
                    context,
                    compensated: false,
                    source: Some(other),
                },
                _ => LedgerError::Store {
                    context,
                    compensated: false,
                    source: other,
                },
            },
        }
    }

    /// Records the outcome of the compensating writes
    pub fn compensated(mut self, rolled_back: bool) -> Self {
        match &mut self {
            LedgerError::Dependency { compensated, .. } | LedgerError::Store { compensated, .. } => {
                *compensated = rolled_back;
            }
            _ => {}
        }
        self
    }

    /// Attaches the mutation context where the variant carries one
    pub fn in_context(mut self, ctx: MutationContext) -> Self {
        match &mut self {
            LedgerError::Validation { context, .. } => *context = Some(ctx),
            LedgerError::Dependency { context, .. } | LedgerError::Store { context, .. } => {
                *context = ctx
            }
            _ => {}
        }
        self
    }

    pub fn context(&self) -> Option<&MutationContext> {
        match self {
            LedgerError::Validation { context, .. } => context.as_ref(),
            LedgerError::Dependency { context, .. } | LedgerError::Store { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }

    pub fn is_dependency(&self) -> bool {
        matches!(self, LedgerError::Dependency { .. })
    }

    pub fn is_store(&self) -> bool {
        matches!(self, LedgerError::Store { .. })
    }

    /// Returns true if partial writes may remain in the stores
    pub fn needs_reconciliation(&self) -> bool {
        match self {
            LedgerError::Dependency { compensated, .. } | LedgerError::Store { compensated, .. } => {
                !compensated
            }
            _ => false,
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::NotFound(id) => LedgerError::not_found("Record", id),
            other => LedgerError::validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::VoucherType;

    fn ctx(step: SagaStep) -> MutationContext {
        MutationContext::new(Operation::Update)
            .voucher(VoucherKey::new(VoucherType::Rv, 4))
            .unit(Some("Alpha"))
            .state(MutationState::Reapplied)
            .step(step)
    }

    #[test]
    fn test_counter_write_failure_is_dependency() {
        let error = LedgerError::from_port(
            PortError::connection("receipts store offline"),
            ctx(SagaStep::WriteCounterVoucher),
        );
        assert!(error.is_dependency());
        assert!(error.needs_reconciliation());
    }

    #[test]
    fn test_unit_write_failure_is_store() {
        let error = LedgerError::from_port(PortError::internal("disk full"), ctx(SagaStep::SaveUnit));
        assert!(error.is_store());
        assert!(!error.compensated(true).needs_reconciliation());
    }

    #[test]
    fn test_port_not_found_stays_not_found() {
        let error = LedgerError::from_port(
            PortError::not_found("Voucher", "RV/4"),
            ctx(SagaStep::FetchVoucher),
        );
        assert!(error.is_not_found());
    }

    #[test]
    fn test_context_display_names_voucher_unit_and_step() {
        let rendered = ctx(SagaStep::SaveUnit).to_string();
        assert!(rendered.contains("RV/4"));
        assert!(rendered.contains("Alpha"));
        assert!(rendered.contains("save unit"));
    }
}

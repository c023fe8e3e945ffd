//! Reversal of applied vouchers and the mutation state machine
//!
//! Updates run `Start → Reverted → Reapplied → Committed`, deletes run
//! `Start → Reverted → Committed` and creates run
//! `Start → Reapplied → Committed`. Any state short of `Committed` may
//! fall into `Failed`.

use serde::{Deserialize, Serialize};

use core_kernel::{FinancialYear, VoucherKey};

use crate::error::LedgerError;
use crate::unit::{Buckets, HistoryEntry};

/// Progress of one voucher mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationState {
    Start,
    Reverted,
    Reapplied,
    Committed,
    Failed,
}

impl MutationState {
    pub fn can_transition_to(&self, target: MutationState) -> bool {
        use MutationState::*;
        matches!(
            (*self, target),
            (Start, Reverted)
                | (Start, Reapplied)
                | (Reverted, Reapplied)
                | (Reverted, Committed)
                | (Reapplied, Committed)
                | (Start, Failed)
                | (Reverted, Failed)
                | (Reapplied, Failed)
        )
    }

    /// Moves to `target`, rejecting transitions the state machine lacks
    pub fn advance(&mut self, target: MutationState) -> Result<(), LedgerError> {
        if !self.can_transition_to(target) {
            return Err(LedgerError::validation(format!(
                "Invalid mutation state transition from {:?} to {:?}",
                self, target
            )));
        }
        *self = target;
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MutationState::Committed | MutationState::Failed)
    }
}

/// What reverting one voucher did to a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reversal {
    financial_year: FinancialYear,
    key: VoucherKey,
    restored: Buckets,
    removed: Vec<HistoryEntry>,
}

impl Reversal {
    pub(crate) fn new(
        financial_year: FinancialYear,
        key: VoucherKey,
        restored: Buckets,
        removed: Vec<HistoryEntry>,
    ) -> Self {
        Self {
            financial_year,
            key,
            restored,
            removed,
        }
    }

    pub fn financial_year(&self) -> FinancialYear {
        self.financial_year
    }

    pub fn key(&self) -> &VoucherKey {
        &self.key
    }

    /// Signed deltas applied to undo the voucher
    pub fn restored(&self) -> &Buckets {
        &self.restored
    }

    /// History entries stripped from the unit
    pub fn removed(&self) -> &[HistoryEntry] {
        &self.removed
    }

    /// True when the unit held no entries for the voucher
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_path() {
        let mut state = MutationState::Start;
        state.advance(MutationState::Reverted).unwrap();
        state.advance(MutationState::Reapplied).unwrap();
        state.advance(MutationState::Committed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_delete_path_skips_reapply() {
        let mut state = MutationState::Start;
        state.advance(MutationState::Reverted).unwrap();
        assert!(state.advance(MutationState::Committed).is_ok());
    }

    #[test]
    fn test_committed_cannot_fail() {
        let mut state = MutationState::Committed;
        assert!(state.advance(MutationState::Failed).is_err());
        assert_eq!(state, MutationState::Committed);
    }

    #[test]
    fn test_start_cannot_commit_directly() {
        assert!(!MutationState::Start.can_transition_to(MutationState::Committed));
    }
}

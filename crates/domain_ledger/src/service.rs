//! Voucher mutation service
//!
//! Entry point for creating, updating and deleting vouchers. Each mutation
//! reverts the voucher's previous effect on its unit, reapplies the new one,
//! derives the counter voucher, and commits everything as a saga:
//!
//! ```text
//! save unit(s) ──► write voucher ──► write / remove counter voucher
//!      ▲                 │                      │
//!      └── restore ◄─────┴──── undo on failure ◄┘
//! ```
//!
//! Every check that can reject a mutation runs before the first write, so
//! validation failures leave the stores untouched. Mutations are serialised
//! per unit and per voucher key through an async lock table.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, instrument, warn};

use core_kernel::{FinancialYear, PortError, VoucherKey, VoucherNo, VoucherType};

use crate::allocation;
use crate::cascade;
use crate::counter;
use crate::error::{LedgerError, MutationContext, Operation, SagaStep};
use crate::ports::{FixedDepositPort, UnitLedgerPort, VoucherStore};
use crate::reversal::MutationState;
use crate::unit::Unit;
use crate::voucher::Voucher;

/// Result of a committed create or update
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub voucher: Voucher,
    pub counter_voucher: Option<Voucher>,
    /// Counter voucher removed because the new label is no longer mirrored
    pub removed_counter: Option<VoucherKey>,
    /// Units in their committed state
    pub units: Vec<Unit>,
    pub state: MutationState,
}

/// Result of a committed (possibly cascading) delete
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub deleted: Vec<VoucherKey>,
    pub counters_deleted: Vec<VoucherKey>,
    pub units: Vec<Unit>,
}

impl DeleteOutcome {
    fn record_unit(&mut self, unit: Unit) {
        match self.units.iter_mut().find(|u| u.name() == unit.name()) {
            Some(slot) => *slot = unit,
            None => self.units.push(unit),
        }
    }
}

/// Orchestrates voucher mutations against the ledger ports
pub struct VoucherService {
    units: Arc<dyn UnitLedgerPort>,
    fixed_deposits: Arc<dyn FixedDepositPort>,
    locks: MutationLocks,
}

impl VoucherService {
    pub fn new(units: Arc<dyn UnitLedgerPort>, fixed_deposits: Arc<dyn FixedDepositPort>) -> Self {
        Self {
            units,
            fixed_deposits,
            locks: MutationLocks::default(),
        }
    }

    /// Books a new voucher
    ///
    /// Fails with `Duplicate` if the key exists and with `NotFound` if the
    /// particulars name an unknown unit.
    #[instrument(
        skip(self, store, voucher),
        fields(voucher = %voucher.key(), financial_year = %store.financial_year())
    )]
    pub async fn create_voucher(
        &self,
        store: &dyn VoucherStore,
        mut voucher: Voucher,
    ) -> Result<MutationOutcome, LedgerError> {
        check_writable(store, &voucher)?;
        let key = voucher.key();
        let ctx = MutationContext::new(Operation::Create)
            .voucher(key)
            .unit(voucher.unit_name());

        let _guards = self
            .locks
            .acquire(lock_keys(store.financial_year(), &[key], &[voucher.unit_name()]))
            .await;

        if fetch_voucher(store, &key, &ctx).await?.is_some() {
            return Err(LedgerError::Duplicate { key });
        }

        let mut change = match voucher.unit_name() {
            Some(name) => Some(UnitChange::unchanged(self.require_unit(name, &ctx).await?)),
            None => None,
        };

        let counter = counter::generate(
            &voucher,
            change.as_ref().map(|c| c.after.buckets()),
            self.fixed_deposits.as_ref(),
            &ctx,
        )
        .await?;
        voucher.counter_voucher_no = counter.as_ref().map(|_| voucher.voucher_no);

        if let Some(change) = change.as_mut() {
            let planned = allocation::plan(&change.after, &voucher)
                .map_err(|e| e.in_context(ctx.clone().step(SagaStep::ReapplyUnit)))?;
            change.after.apply(&planned);
        }

        let previous_counter = match &counter {
            Some(c) => fetch_voucher(store, &c.key(), &ctx).await?,
            None => None,
        };

        let mut saga = Saga::new(self.units.as_ref(), store, ctx);
        saga.advance(MutationState::Reapplied)?;

        if let Some(change) = change.as_ref().filter(|c| c.changed()) {
            saga.save_unit(change).await?;
        }
        saga.insert_voucher(&voucher).await?;
        if let Some(counter) = &counter {
            saga.upsert_counter(previous_counter.as_ref(), counter).await?;
        }
        let state = saga.commit()?;

        info!(
            voucher = %key,
            unit = voucher.unit_name().unwrap_or("-"),
            amount = %voucher.transacted_amount(),
            counter = counter.is_some(),
            "Voucher created"
        );

        Ok(MutationOutcome {
            voucher,
            counter_voucher: counter,
            removed_counter: None,
            units: change.into_iter().map(|c| c.after).collect(),
            state,
        })
    }

    /// Replaces an existing voucher
    ///
    /// The previous voucher's entries are reverted on its unit and the new
    /// payload is applied to the unit its particulars name, which may differ.
    #[instrument(
        skip(self, store, voucher),
        fields(voucher = %voucher.key(), financial_year = %store.financial_year())
    )]
    pub async fn update_voucher(
        &self,
        store: &dyn VoucherStore,
        mut voucher: Voucher,
    ) -> Result<MutationOutcome, LedgerError> {
        check_writable(store, &voucher)?;
        let key = voucher.key();
        let ctx = MutationContext::new(Operation::Update).voucher(key);

        let mut old = fetch_voucher(store, &key, &ctx)
            .await?
            .ok_or_else(|| LedgerError::voucher_not_found(&key))?;

        // The stored voucher may move to another unit while we wait for the
        // locks; retry until the locked units match the stored particulars.
        let _guards = loop {
            let guards = self
                .locks
                .acquire(lock_keys(
                    store.financial_year(),
                    &[key],
                    &[old.unit_name(), voucher.unit_name()],
                ))
                .await;
            let current = fetch_voucher(store, &key, &ctx)
                .await?
                .ok_or_else(|| LedgerError::voucher_not_found(&key))?;
            if current.unit_name() == old.unit_name() {
                old = current;
                break guards;
            }
            old = current;
        };

        if old.custom && old.particulars == voucher.particulars {
            voucher.custom = true;
        }

        let old_unit_name = old.unit_name().map(str::to_string);
        let new_unit_name = voucher.unit_name().map(str::to_string);
        let ctx = ctx.unit(new_unit_name.as_deref().or(old_unit_name.as_deref()));
        let same_unit = old_unit_name == new_unit_name;

        let new_unit = match new_unit_name.as_deref() {
            Some(name) => Some(self.require_unit(name, &ctx).await?),
            None => None,
        };
        let old_unit = match old_unit_name.as_deref() {
            Some(name) if !same_unit => self.find_unit(name, &key, &ctx).await?,
            _ => None,
        };

        let fy = store.financial_year();
        let old_change = old_unit.map(|u| UnitChange::reverted(u, fy, &key));
        let mut new_change = new_unit.map(|u| UnitChange::reverted(u, fy, &key));
        let mut state = MutationState::Start;
        state.advance(MutationState::Reverted)?;

        let counter = counter::generate(
            &voucher,
            new_change.as_ref().map(|c| c.after.buckets()),
            self.fixed_deposits.as_ref(),
            &ctx.clone().state(state),
        )
        .await?;
        voucher.counter_voucher_no = counter.as_ref().map(|_| voucher.voucher_no);

        if let Some(change) = new_change.as_mut() {
            let planned = allocation::plan(&change.after, &voucher)
                .map_err(|e| e.in_context(ctx.clone().state(state).step(SagaStep::ReapplyUnit)))?;
            change.after.apply(&planned);
        }

        let previous_counter = match key.counter_key() {
            Some(counter_key) => fetch_voucher(store, &counter_key, &ctx).await?,
            None => None,
        };

        let mut saga = Saga::new(self.units.as_ref(), store, ctx.state(state));
        saga.advance(MutationState::Reapplied)?;

        for change in [&old_change, &new_change].into_iter().flatten() {
            if change.changed() {
                saga.save_unit(change).await?;
            }
        }
        saga.update_voucher(&old, &voucher).await?;

        let mut removed_counter = None;
        match (&counter, &previous_counter) {
            (Some(counter), previous) => {
                saga.upsert_counter(previous.as_ref(), counter).await?;
            }
            (None, Some(stale)) => {
                saga.delete_voucher(stale, SagaStep::DeleteCounterVoucher).await?;
                removed_counter = Some(stale.key());
            }
            (None, None) => {}
        }
        let state = saga.commit()?;

        info!(
            voucher = %key,
            unit = voucher.unit_name().unwrap_or("-"),
            previous_unit = old.unit_name().unwrap_or("-"),
            amount = %voucher.transacted_amount(),
            counter = counter.is_some(),
            "Voucher updated"
        );

        Ok(MutationOutcome {
            voucher,
            counter_voucher: counter,
            removed_counter,
            units: old_change
                .into_iter()
                .chain(new_change)
                .map(|c| c.after)
                .collect(),
            state,
        })
    }

    /// Deletes a voucher together with its dependent batch and mirrors
    ///
    /// Members are removed highest number first, each as its own saga, so a
    /// failure part way leaves a contiguous run that can be deleted again.
    #[instrument(skip(self, store), fields(voucher = %key, financial_year = %store.financial_year()))]
    pub async fn delete_voucher(
        &self,
        store: &dyn VoucherStore,
        key: VoucherKey,
    ) -> Result<DeleteOutcome, LedgerError> {
        if key.voucher_type.is_counter_entry() {
            return Err(LedgerError::validation(format!(
                "Counter voucher {} is removed with the voucher it mirrors",
                key
            )));
        }

        let batch = cascade::resolve_delete_batch(store, &key).await?;

        let voucher_keys: Vec<VoucherKey> = batch.iter().map(Voucher::key).collect();
        let unit_names: Vec<Option<&str>> = batch.iter().map(Voucher::unit_name).collect();
        let _guards = self
            .locks
            .acquire(lock_keys(store.financial_year(), &voucher_keys, &unit_names))
            .await;

        let mut outcome = DeleteOutcome::default();
        for member in voucher_keys.iter().rev() {
            self.delete_member(store, member, &mut outcome).await?;
        }

        if outcome.deleted.is_empty() {
            return Err(LedgerError::voucher_not_found(&key));
        }

        info!(
            voucher = %key,
            deleted = outcome.deleted.len(),
            counters_deleted = outcome.counters_deleted.len(),
            "Voucher batch deleted"
        );

        Ok(outcome)
    }

    /// Highest voucher number of `voucher_type`, 0 when none exists
    #[instrument(skip(self, store), fields(financial_year = %store.financial_year()))]
    pub async fn last_voucher_no(
        &self,
        store: &dyn VoucherStore,
        voucher_type: VoucherType,
    ) -> Result<VoucherNo, LedgerError> {
        let last = store.find_last(voucher_type).await.map_err(|e| {
            LedgerError::from_port(e, MutationContext::new(Operation::Query).step(SagaStep::FetchVoucher))
                .compensated(true)
        })?;
        Ok(last.map(|v| v.voucher_no).unwrap_or(VoucherNo::new(0)))
    }

    async fn delete_member(
        &self,
        store: &dyn VoucherStore,
        key: &VoucherKey,
        outcome: &mut DeleteOutcome,
    ) -> Result<(), LedgerError> {
        let ctx = MutationContext::new(Operation::Delete).voucher(*key);

        let Some(voucher) = fetch_voucher(store, key, &ctx).await? else {
            // Removed by a concurrent delete between batch resolution and locking.
            return Ok(());
        };
        let ctx = ctx.unit(voucher.unit_name());

        let change = match voucher.unit_name() {
            Some(name) => self
                .find_unit(name, key, &ctx)
                .await?
                .map(|u| UnitChange::reverted(u, store.financial_year(), key)),
            None => None,
        };

        let counter = match key.counter_key() {
            Some(counter_key) => fetch_voucher(store, &counter_key, &ctx).await?,
            None => None,
        };

        let mut saga = Saga::new(self.units.as_ref(), store, ctx);
        saga.advance(MutationState::Reverted)?;

        if let Some(change) = change.as_ref().filter(|c| c.changed()) {
            saga.save_unit(change).await?;
        }
        saga.delete_voucher(&voucher, SagaStep::DeleteVoucher).await?;
        if let Some(counter) = &counter {
            saga.delete_voucher(counter, SagaStep::DeleteCounterVoucher).await?;
        }
        saga.commit()?;

        outcome.deleted.push(*key);
        if let Some(counter) = counter {
            outcome.counters_deleted.push(counter.key());
        }
        if let Some(change) = change {
            outcome.record_unit(change.after);
        }
        Ok(())
    }

    async fn require_unit(&self, name: &str, ctx: &MutationContext) -> Result<Unit, LedgerError> {
        self.units
            .find_by_name(name)
            .await
            .map_err(|e| fetch_failure(e, ctx, SagaStep::FetchUnit))?
            .ok_or_else(|| LedgerError::unit_not_found(name))
    }

    /// Looks up the unit a stored voucher was booked against
    ///
    /// A missing unit is tolerated so that vouchers of removed or renamed
    /// units can still be cleaned up.
    async fn find_unit(
        &self,
        name: &str,
        key: &VoucherKey,
        ctx: &MutationContext,
    ) -> Result<Option<Unit>, LedgerError> {
        let unit = self
            .units
            .find_by_name(name)
            .await
            .map_err(|e| fetch_failure(e, ctx, SagaStep::FetchUnit))?;
        if unit.is_none() {
            warn!(unit = name, voucher = %key, "Unit not found; skipping history reversal");
        }
        Ok(unit)
    }
}

fn check_writable(store: &dyn VoucherStore, voucher: &Voucher) -> Result<(), LedgerError> {
    if voucher.voucher_type.is_counter_entry() {
        return Err(LedgerError::validation(format!(
            "Counter voucher {} is maintained with the voucher it mirrors",
            voucher.key()
        )));
    }
    if voucher.financial_year != store.financial_year() {
        return Err(LedgerError::validation(format!(
            "Voucher {} belongs to {} but was submitted to {}",
            voucher.key(),
            voucher.financial_year,
            store.financial_year()
        )));
    }
    voucher.validate()
}

fn fetch_failure(error: PortError, ctx: &MutationContext, step: SagaStep) -> LedgerError {
    LedgerError::from_port(error, ctx.clone().step(step)).compensated(true)
}

async fn fetch_voucher(
    store: &dyn VoucherStore,
    key: &VoucherKey,
    ctx: &MutationContext,
) -> Result<Option<Voucher>, LedgerError> {
    store
        .find_one(key)
        .await
        .map_err(|e| fetch_failure(e, ctx, SagaStep::FetchVoucher))
}

/// A unit before and after one mutation
struct UnitChange {
    before: Unit,
    after: Unit,
}

impl UnitChange {
    fn unchanged(unit: Unit) -> Self {
        Self {
            before: unit.clone(),
            after: unit,
        }
    }

    fn reverted(unit: Unit, financial_year: FinancialYear, key: &VoucherKey) -> Self {
        let mut change = Self::unchanged(unit);
        change.after.revert(financial_year, key);
        change
    }

    fn changed(&self) -> bool {
        self.before != self.after
    }
}

enum Compensation {
    RestoreUnit(Unit),
    RestoreVoucher(Voucher),
    RemoveVoucher(VoucherKey),
}

impl Compensation {
    fn describe(&self) -> String {
        match self {
            Compensation::RestoreUnit(unit) => format!("restore unit '{}'", unit.name()),
            Compensation::RestoreVoucher(voucher) => format!("restore voucher {}", voucher.key()),
            Compensation::RemoveVoucher(key) => format!("remove voucher {}", key),
        }
    }
}

/// Ordered writes of one mutation with their compensating actions
struct Saga<'a> {
    units: &'a dyn UnitLedgerPort,
    store: &'a dyn VoucherStore,
    context: MutationContext,
    undo: Vec<Compensation>,
}

impl<'a> Saga<'a> {
    fn new(units: &'a dyn UnitLedgerPort, store: &'a dyn VoucherStore, context: MutationContext) -> Self {
        Self {
            units,
            store,
            context,
            undo: Vec::new(),
        }
    }

    fn advance(&mut self, state: MutationState) -> Result<(), LedgerError> {
        if self.context.state == state {
            return Ok(());
        }
        self.context.state.advance(state)
    }

    fn commit(mut self) -> Result<MutationState, LedgerError> {
        self.context.state.advance(MutationState::Committed)?;
        Ok(self.context.state)
    }

    async fn save_unit(&mut self, change: &UnitChange) -> Result<(), LedgerError> {
        match self.units.save(&change.after).await {
            Ok(_) => {
                self.undo.push(Compensation::RestoreUnit(change.before.clone()));
                Ok(())
            }
            Err(e) => Err(self.abort(e, SagaStep::SaveUnit).await),
        }
    }

    async fn insert_voucher(&mut self, voucher: &Voucher) -> Result<(), LedgerError> {
        match self.store.insert(voucher).await {
            Ok(_) => {
                self.undo.push(Compensation::RemoveVoucher(voucher.key()));
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                self.abort(e, SagaStep::WriteVoucher).await;
                Err(LedgerError::Duplicate { key: voucher.key() })
            }
            Err(e) => Err(self.abort(e, SagaStep::WriteVoucher).await),
        }
    }

    async fn update_voucher(&mut self, previous: &Voucher, voucher: &Voucher) -> Result<(), LedgerError> {
        match self.store.update_one(&previous.key(), voucher).await {
            Ok(_) => {
                self.undo.push(Compensation::RestoreVoucher(previous.clone()));
                Ok(())
            }
            Err(e) => Err(self.abort(e, SagaStep::WriteVoucher).await),
        }
    }

    async fn upsert_counter(&mut self, previous: Option<&Voucher>, counter: &Voucher) -> Result<(), LedgerError> {
        match self.store.upsert(counter).await {
            Ok(_) => {
                self.undo.push(match previous {
                    Some(previous) => Compensation::RestoreVoucher(previous.clone()),
                    None => Compensation::RemoveVoucher(counter.key()),
                });
                Ok(())
            }
            Err(e) => Err(self.abort(e, SagaStep::WriteCounterVoucher).await),
        }
    }

    async fn delete_voucher(&mut self, voucher: &Voucher, step: SagaStep) -> Result<(), LedgerError> {
        match self.store.delete_one(&voucher.key()).await {
            Ok(()) => {
                self.undo.push(Compensation::RestoreVoucher(voucher.clone()));
                Ok(())
            }
            Err(e) => Err(self.abort(e, step).await),
        }
    }

    /// Rolls back the completed writes and wraps the failure
    async fn abort(&mut self, error: PortError, step: SagaStep) -> LedgerError {
        let reached = self.context.state;
        let _ = self.context.state.advance(MutationState::Failed);
        let context = self.context.clone().step(step);

        error!(context = %context, reached = ?reached, error = %error, "Voucher mutation failed");

        let compensated = self.compensate().await;
        LedgerError::from_port(error, context).compensated(compensated)
    }

    async fn compensate(&mut self) -> bool {
        let mut complete = true;
        while let Some(action) = self.undo.pop() {
            let result = match &action {
                Compensation::RestoreUnit(unit) => self.units.save(unit).await.map(|_| ()),
                Compensation::RestoreVoucher(voucher) => self.store.upsert(voucher).await.map(|_| ()),
                Compensation::RemoveVoucher(key) => match self.store.delete_one(key).await {
                    Err(e) if e.is_not_found() => Ok(()),
                    other => other,
                },
            };
            match result {
                Ok(()) => warn!(context = %self.context, action = %action.describe(), "Compensated"),
                Err(e) => {
                    error!(
                        context = %self.context,
                        action = %action.describe(),
                        error = %e,
                        "Compensation failed; manual reconciliation required"
                    );
                    complete = false;
                }
            }
        }
        complete
    }
}

/// Async lock table keyed by unit and voucher
#[derive(Default)]
struct MutationLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MutationLocks {
    /// Locks every key, in sorted order so concurrent callers cannot deadlock
    async fn acquire(&self, mut keys: Vec<String>) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();

        let handles: Vec<Arc<Mutex<()>>> = {
            let mut table = self.table.lock().await;
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            keys.into_iter()
                .map(|k| Arc::clone(table.entry(k).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }
}

fn lock_keys(
    financial_year: FinancialYear,
    vouchers: &[VoucherKey],
    units: &[Option<&str>],
) -> Vec<String> {
    vouchers
        .iter()
        .map(|key| format!("voucher:{}:{}", financial_year, key))
        .chain(units.iter().flatten().map(|name| format!("unit:{}", name)))
        .collect()
}

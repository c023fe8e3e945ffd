//! Fault-Injecting Port Wrappers
//!
//! Wrap a working adapter and make chosen calls fail, to drive the
//! compensation paths of the voucher service. A fault can be limited to one
//! voucher key or unit name and to a number of hits.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use core_kernel::{
    DomainPort, FinancialYear, HealthCheckResult, HealthCheckable, PortError, VoucherKey,
    VoucherType,
};
use domain_ledger::{Unit, UnitLedgerPort, Voucher, VoucherFilter, VoucherStore};

/// Voucher store calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreCall {
    Find,
    FindOne,
    Insert,
    UpdateOne,
    Upsert,
    DeleteOne,
    FindLast,
}

#[derive(Debug)]
struct Fault<T> {
    call: T,
    target: Option<String>,
    remaining: AtomicUsize,
}

impl<T: PartialEq> Fault<T> {
    /// Whether this fault fires for `call` on `target`, consuming one hit
    ///
    /// An untargeted fault fires for every target.
    fn trips(&self, call: &T, target: Option<&str>) -> bool {
        if &self.call != call {
            return false;
        }
        if self.target.is_some() && self.target.as_deref() != target {
            return false;
        }
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn injected(call: impl std::fmt::Debug, target: Option<&str>) -> PortError {
    PortError::connection(format!(
        "Injected failure on {:?}{}",
        call,
        target.map(|t| format!(" for {}", t)).unwrap_or_default()
    ))
}

/// Voucher store that fails on configured calls
pub struct FailingVoucherStore {
    inner: Arc<dyn VoucherStore>,
    faults: Vec<Fault<StoreCall>>,
}

impl FailingVoucherStore {
    pub fn new(inner: Arc<dyn VoucherStore>) -> Self {
        Self {
            inner,
            faults: Vec::new(),
        }
    }

    /// Fails every `call`
    pub fn fail_on(mut self, call: StoreCall) -> Self {
        self.faults.push(Fault {
            call,
            target: None,
            remaining: AtomicUsize::new(usize::MAX),
        });
        self
    }

    /// Fails `call` for `key` only, `times` times
    pub fn fail_on_key(mut self, call: StoreCall, key: VoucherKey, times: usize) -> Self {
        self.faults.push(Fault {
            call,
            target: Some(key.to_string()),
            remaining: AtomicUsize::new(times),
        });
        self
    }

    fn check(&self, call: StoreCall, key: Option<&VoucherKey>) -> Result<(), PortError> {
        let target = key.map(VoucherKey::to_string);
        if self
            .faults
            .iter()
            .any(|fault| fault.trips(&call, target.as_deref()))
        {
            return Err(injected(call, target.as_deref()));
        }
        Ok(())
    }
}

impl DomainPort for FailingVoucherStore {}

#[async_trait]
impl VoucherStore for FailingVoucherStore {
    fn financial_year(&self) -> FinancialYear {
        self.inner.financial_year()
    }

    async fn find(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, PortError> {
        self.check(StoreCall::Find, None)?;
        self.inner.find(filter).await
    }

    async fn find_one(&self, key: &VoucherKey) -> Result<Option<Voucher>, PortError> {
        self.check(StoreCall::FindOne, Some(key))?;
        self.inner.find_one(key).await
    }

    async fn insert(&self, voucher: &Voucher) -> Result<Voucher, PortError> {
        self.check(StoreCall::Insert, Some(&voucher.key()))?;
        self.inner.insert(voucher).await
    }

    async fn update_one(&self, key: &VoucherKey, voucher: &Voucher) -> Result<Voucher, PortError> {
        self.check(StoreCall::UpdateOne, Some(key))?;
        self.inner.update_one(key, voucher).await
    }

    async fn upsert(&self, voucher: &Voucher) -> Result<Voucher, PortError> {
        self.check(StoreCall::Upsert, Some(&voucher.key()))?;
        self.inner.upsert(voucher).await
    }

    async fn delete_one(&self, key: &VoucherKey) -> Result<(), PortError> {
        self.check(StoreCall::DeleteOne, Some(key))?;
        self.inner.delete_one(key).await
    }

    async fn find_last(&self, voucher_type: VoucherType) -> Result<Option<Voucher>, PortError> {
        self.check(StoreCall::FindLast, None)?;
        self.inner.find_last(voucher_type).await
    }
}

/// Unit ledger whose `save` fails for configured units
pub struct FailingUnitLedger {
    inner: Arc<dyn UnitLedgerPort>,
    faults: Vec<Fault<()>>,
}

impl FailingUnitLedger {
    pub fn new(inner: Arc<dyn UnitLedgerPort>) -> Self {
        Self {
            inner,
            faults: Vec::new(),
        }
    }

    /// Fails saving `unit` the given number of times
    pub fn fail_save(mut self, unit: &str, times: usize) -> Self {
        self.faults.push(Fault {
            call: (),
            target: Some(unit.to_string()),
            remaining: AtomicUsize::new(times),
        });
        self
    }
}

impl DomainPort for FailingUnitLedger {}

#[async_trait]
impl HealthCheckable for FailingUnitLedger {
    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }
}

#[async_trait]
impl UnitLedgerPort for FailingUnitLedger {
    async fn find_by_name(&self, name: &str) -> Result<Option<Unit>, PortError> {
        self.inner.find_by_name(name).await
    }

    async fn save(&self, unit: &Unit) -> Result<Unit, PortError> {
        if self.faults.iter().any(|fault| fault.trips(&(), Some(unit.name()))) {
            return Err(injected("save", Some(unit.name())));
        }
        self.inner.save(unit).await
    }

    async fn insert(&self, unit: &Unit) -> Result<Unit, PortError> {
        self.inner.insert(unit).await
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Unit>, PortError> {
        self.inner.list(search).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::memory::InMemoryVoucherStore;

    #[tokio::test]
    async fn test_targeted_fault_fires_given_times() {
        let inner = Arc::new(InMemoryVoucherStore::new(FinancialYear::starting(2024)));
        let key = VoucherKey::new(VoucherType::Rv, 1);
        let store = FailingVoucherStore::new(inner).fail_on_key(StoreCall::FindOne, key, 1);

        assert!(store.find_one(&key).await.is_err());
        assert!(store.find_one(&key).await.is_ok());
        assert!(store
            .find_one(&VoucherKey::new(VoucherType::Rv, 2))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_untargeted_fault_always_fires() {
        let inner = Arc::new(InMemoryVoucherStore::new(FinancialYear::starting(2024)));
        let store = FailingVoucherStore::new(inner).fail_on(StoreCall::FindLast);

        for _ in 0..3 {
            let err = store.find_last(VoucherType::Pv).await.unwrap_err();
            assert!(err.is_transient());
        }
    }
}

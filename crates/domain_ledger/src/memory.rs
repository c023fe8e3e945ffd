//! In-memory port adapters
//!
//! These adapters keep everything in process behind `tokio` read/write
//! locks. They back the unit tests, the integration tests, and the server's
//! `memory` storage mode.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use core_kernel::{
    AdapterHealth, DomainPort, FinancialYear, HealthCheckResult, HealthCheckable, PortError,
    VoucherKey, VoucherType,
};

use crate::fixed_deposit::FixedDeposit;
use crate::ports::{FixedDepositPort, UnitLedgerPort, VoucherFilter, VoucherStore, VoucherStoreResolver};
use crate::unit::Unit;
use crate::voucher::Voucher;

fn healthy(adapter_id: &str) -> HealthCheckResult {
    HealthCheckResult {
        message: Some("In-memory adapter always healthy".to_string()),
        status: AdapterHealth::Healthy,
        ..HealthCheckResult::healthy(adapter_id)
    }
}

/// In-memory unit ledger
#[derive(Debug, Default, Clone)]
pub struct InMemoryUnitLedger {
    units: Arc<RwLock<HashMap<String, Unit>>>,
}

impl InMemoryUnitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates with units for testing
    pub async fn with_units(units: Vec<Unit>) -> Self {
        let port = Self::new();
        {
            let mut map = port.units.write().await;
            for unit in units {
                map.insert(unit.name().to_string(), unit);
            }
        }
        port
    }
}

impl DomainPort for InMemoryUnitLedger {}

#[async_trait]
impl HealthCheckable for InMemoryUnitLedger {
    async fn health_check(&self) -> HealthCheckResult {
        healthy("memory-unit-ledger")
    }
}

#[async_trait]
impl UnitLedgerPort for InMemoryUnitLedger {
    async fn find_by_name(&self, name: &str) -> Result<Option<Unit>, PortError> {
        Ok(self.units.read().await.get(name).cloned())
    }

    async fn save(&self, unit: &Unit) -> Result<Unit, PortError> {
        let mut units = self.units.write().await;
        let slot = units
            .get_mut(unit.name())
            .ok_or_else(|| PortError::not_found("Unit", unit.name()))?;
        *slot = unit.clone();
        Ok(unit.clone())
    }

    async fn insert(&self, unit: &Unit) -> Result<Unit, PortError> {
        let mut units = self.units.write().await;
        if units.contains_key(unit.name()) {
            return Err(PortError::conflict(format!("Unit '{}' already exists", unit.name())));
        }
        units.insert(unit.name().to_string(), unit.clone());
        Ok(unit.clone())
    }

    async fn list(&self, search: Option<&str>) -> Result<Vec<Unit>, PortError> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let units = self.units.read().await;
        let mut results: Vec<Unit> = units
            .values()
            .filter(|u| match &needle {
                Some(needle) => u.name().to_lowercase().contains(needle.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        results.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(results)
    }
}

/// Vouchers of one financial year, ordered by key
#[derive(Debug)]
pub struct InMemoryVoucherStore {
    financial_year: FinancialYear,
    vouchers: RwLock<BTreeMap<VoucherKey, Voucher>>,
}

impl InMemoryVoucherStore {
    pub fn new(financial_year: FinancialYear) -> Self {
        Self {
            financial_year,
            vouchers: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.vouchers.read().await.len()
    }
}

impl DomainPort for InMemoryVoucherStore {}

#[async_trait]
impl VoucherStore for InMemoryVoucherStore {
    fn financial_year(&self) -> FinancialYear {
        self.financial_year
    }

    async fn find(&self, filter: &VoucherFilter) -> Result<Vec<Voucher>, PortError> {
        Ok(self
            .vouchers
            .read()
            .await
            .values()
            .filter(|v| filter.matches(v))
            .cloned()
            .collect())
    }

    async fn find_one(&self, key: &VoucherKey) -> Result<Option<Voucher>, PortError> {
        Ok(self.vouchers.read().await.get(key).cloned())
    }

    async fn insert(&self, voucher: &Voucher) -> Result<Voucher, PortError> {
        let mut vouchers = self.vouchers.write().await;
        let key = voucher.key();
        if vouchers.contains_key(&key) {
            return Err(PortError::conflict(format!(
                "Voucher {} already exists in {}",
                key, self.financial_year
            )));
        }
        vouchers.insert(key, voucher.clone());
        Ok(voucher.clone())
    }

    async fn update_one(&self, key: &VoucherKey, voucher: &Voucher) -> Result<Voucher, PortError> {
        if voucher.key() != *key {
            return Err(PortError::validation_field(
                format!("Voucher {} cannot replace {}", voucher.key(), key),
                "voucherNo",
            ));
        }
        let mut vouchers = self.vouchers.write().await;
        let slot = vouchers
            .get_mut(key)
            .ok_or_else(|| PortError::not_found("Voucher", key))?;
        *slot = voucher.clone();
        Ok(voucher.clone())
    }

    async fn upsert(&self, voucher: &Voucher) -> Result<Voucher, PortError> {
        self.vouchers
            .write()
            .await
            .insert(voucher.key(), voucher.clone());
        Ok(voucher.clone())
    }

    async fn delete_one(&self, key: &VoucherKey) -> Result<(), PortError> {
        self.vouchers
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| PortError::not_found("Voucher", key))
    }

    async fn find_last(&self, voucher_type: VoucherType) -> Result<Option<Voucher>, PortError> {
        Ok(self
            .vouchers
            .read()
            .await
            .values()
            .filter(|v| v.voucher_type == voucher_type)
            .max_by_key(|v| v.voucher_no)
            .cloned())
    }
}

/// One in-memory voucher store per financial year
#[derive(Debug, Default)]
pub struct InMemoryVoucherStores {
    stores: RwLock<HashMap<FinancialYear, Arc<InMemoryVoucherStore>>>,
    registered: RwLock<BTreeSet<FinancialYear>>,
}

impl InMemoryVoucherStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// The concrete store for `financial_year`, created on first use
    pub async fn store(&self, financial_year: FinancialYear) -> Arc<InMemoryVoucherStore> {
        if let Some(store) = self.stores.read().await.get(&financial_year) {
            return Arc::clone(store);
        }
        let mut stores = self.stores.write().await;
        Arc::clone(
            stores
                .entry(financial_year)
                .or_insert_with(|| Arc::new(InMemoryVoucherStore::new(financial_year))),
        )
    }
}

impl DomainPort for InMemoryVoucherStores {}

#[async_trait]
impl HealthCheckable for InMemoryVoucherStores {
    async fn health_check(&self) -> HealthCheckResult {
        healthy("memory-voucher-stores")
    }
}

#[async_trait]
impl VoucherStoreResolver for InMemoryVoucherStores {
    async fn store_for(&self, financial_year: FinancialYear) -> Result<Arc<dyn VoucherStore>, PortError> {
        let store: Arc<dyn VoucherStore> = self.store(financial_year).await;
        Ok(store)
    }

    async fn register(&self, financial_year: FinancialYear) -> Result<bool, PortError> {
        Ok(self.registered.write().await.insert(financial_year))
    }

    async fn financial_years(&self) -> Result<Vec<FinancialYear>, PortError> {
        Ok(self.registered.read().await.iter().copied().collect())
    }
}

/// In-memory fixed-deposit register
#[derive(Debug, Default, Clone)]
pub struct InMemoryFixedDeposits {
    deposits: Arc<RwLock<HashMap<String, FixedDeposit>>>,
}

impl InMemoryFixedDeposits {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_deposits(deposits: Vec<FixedDeposit>) -> Self {
        let port = Self::new();
        {
            let mut map = port.deposits.write().await;
            for deposit in deposits {
                map.insert(deposit.fdr_no.clone(), deposit);
            }
        }
        port
    }
}

impl DomainPort for InMemoryFixedDeposits {}

#[async_trait]
impl HealthCheckable for InMemoryFixedDeposits {
    async fn health_check(&self) -> HealthCheckResult {
        healthy("memory-fixed-deposits")
    }
}

#[async_trait]
impl FixedDepositPort for InMemoryFixedDeposits {
    async fn find_by_number(&self, fdr_no: &str) -> Result<Option<FixedDeposit>, PortError> {
        Ok(self.deposits.read().await.get(fdr_no).cloned())
    }

    async fn insert(&self, deposit: &FixedDeposit) -> Result<FixedDeposit, PortError> {
        let mut deposits = self.deposits.write().await;
        if deposits.contains_key(&deposit.fdr_no) {
            return Err(PortError::conflict(format!(
                "Fixed deposit {} already exists",
                deposit.fdr_no
            )));
        }
        deposits.insert(deposit.fdr_no.clone(), deposit.clone());
        Ok(deposit.clone())
    }
}

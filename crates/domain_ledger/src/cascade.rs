//! Cascading delete resolution
//!
//! Receipt vouchers are numbered on the assumption that every earlier `RV`
//! exists, so deleting `RV/n` takes every `RV` numbered `n` or above with
//! it. Other voucher types delete alone.

use tracing::debug;

use core_kernel::{VoucherKey, VoucherType};

use crate::error::{LedgerError, MutationContext, Operation, SagaStep};
use crate::ports::{VoucherFilter, VoucherStore};
use crate::voucher::Voucher;

/// Whether deleting a voucher of this type cascades to later numbers
pub fn cascades(voucher_type: VoucherType) -> bool {
    voucher_type == VoucherType::Rv
}

/// Collects the vouchers deleted together with `key`, sorted by number
///
/// For `RV` the batch is every receipt numbered `key` or above, whether or
/// not `key` itself still exists. Fails with `NotFound` when the batch is
/// empty. The order in which members are deleted is decided by
/// [`VoucherService::delete_voucher`](crate::VoucherService::delete_voucher).
pub async fn resolve_delete_batch(
    store: &dyn VoucherStore,
    key: &VoucherKey,
) -> Result<Vec<Voucher>, LedgerError> {
    let context = || {
        MutationContext::new(Operation::Delete)
            .voucher(*key)
            .step(SagaStep::ResolveBatch)
    };

    let batch = if cascades(key.voucher_type) {
        let filter = VoucherFilter::by_type(key.voucher_type).from_number(key.voucher_no);
        let mut batch = store
            .find(&filter)
            .await
            .map_err(|e| LedgerError::from_port(e, context()).compensated(true))?;
        batch.sort_by_key(|v| v.voucher_no);
        batch
    } else {
        store
            .find_one(key)
            .await
            .map_err(|e| LedgerError::from_port(e, context()).compensated(true))?
            .into_iter()
            .collect()
    };

    if batch.is_empty() {
        return Err(LedgerError::voucher_not_found(key));
    }

    debug!(
        voucher = %key,
        batch_size = batch.len(),
        financial_year = %store.financial_year(),
        "Resolved delete batch"
    );

    Ok(batch)
}

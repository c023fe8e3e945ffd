//! Voucher handlers
//!
//! Every handler resolves the financial year of the request first and then
//! works on the voucher store of that year only.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::{FinancialYear, VoucherType};
use domain_ledger::{Voucher, VoucherFilter, VoucherStore, VoucherStoreResolver};

use crate::dto::fiscal::{resolve_financial_year, YearQuery};
use crate::dto::voucher::*;
use crate::{error::ApiError, AppState};

async fn register_year(state: &AppState, financial_year: FinancialYear) -> Result<(), ApiError> {
    if state.stores.register(financial_year).await? {
        info!(%financial_year, "Registered financial year");
    }
    Ok(())
}

/// Books a new voucher
pub async fn create_voucher(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
    Json(request): Json<VoucherRequest>,
) -> Result<(StatusCode, Json<VoucherMutationResponse>), ApiError> {
    request.validate()?;
    let financial_year = resolve_financial_year(
        query.year.as_deref(),
        request.financial_year.as_deref(),
        request.date,
    )?;
    let voucher = request.into_voucher(financial_year)?;

    register_year(&state, financial_year).await?;
    let store = state.stores.store_for(financial_year).await?;
    let outcome = state.service.create_voucher(store.as_ref(), voucher).await?;

    Ok((
        StatusCode::CREATED,
        Json(VoucherMutationResponse::new("Voucher created successfully", outcome)),
    ))
}

/// Replaces the voucher addressed by the body's `voucherType` and `voucherNo`
pub async fn update_voucher(
    State(state): State<AppState>,
    Query(query): Query<YearQuery>,
    Json(request): Json<VoucherRequest>,
) -> Result<Json<VoucherMutationResponse>, ApiError> {
    request.validate()?;
    let financial_year = resolve_financial_year(
        query.year.as_deref(),
        request.financial_year.as_deref(),
        request.date,
    )?;
    let voucher = request.into_voucher(financial_year)?;

    let store = state.stores.store_for(financial_year).await?;
    let outcome = state.service.update_voucher(store.as_ref(), voucher).await?;

    Ok(Json(VoucherMutationResponse::new(
        "Voucher updated successfully",
        outcome,
    )))
}

/// Deletes a voucher; receipt deletes cascade to later receipt numbers
pub async fn delete_voucher(
    State(state): State<AppState>,
    Query(query): Query<DeleteVoucherQuery>,
) -> Result<Json<DeleteVoucherResponse>, ApiError> {
    query.validate()?;
    let key = query.key()?;
    let financial_year = resolve_financial_year(query.year.as_deref(), None, None)?;

    let store = state.stores.store_for(financial_year).await?;
    let outcome = state.service.delete_voucher(store.as_ref(), key).await?;

    Ok(Json(DeleteVoucherResponse::from(outcome)))
}

/// Lists the vouchers of a financial year, newest date first
pub async fn list_vouchers(
    State(state): State<AppState>,
    Query(query): Query<ListVouchersQuery>,
) -> Result<Json<Vec<Voucher>>, ApiError> {
    query.validate()?;
    let financial_year = resolve_financial_year(query.year.as_deref(), None, None)?;

    let mut filter = VoucherFilter::new();
    filter.ledger = query.ledger;
    filter.month = query.month;

    let store = state.stores.store_for(financial_year).await?;
    let mut vouchers = store.find(&filter).await?;
    vouchers.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.voucher_type.cmp(&b.voucher_type))
            .then_with(|| b.voucher_no.cmp(&a.voucher_no))
    });

    Ok(Json(vouchers))
}

/// Highest voucher number of a type, 0 when the type has none yet
pub async fn last_voucher_no(
    State(state): State<AppState>,
    Query(query): Query<LastVoucherNoQuery>,
) -> Result<Json<LastVoucherNoResponse>, ApiError> {
    query.validate()?;
    let voucher_type = query
        .voucher_type
        .as_deref()
        .ok_or_else(|| ApiError::validation("Voucher type is required"))?
        .parse::<VoucherType>()?;
    let financial_year = resolve_financial_year(query.year.as_deref(), None, None)?;

    let store = state.stores.store_for(financial_year).await?;
    let last = state.service.last_voucher_no(store.as_ref(), voucher_type).await?;

    Ok(Json(LastVoucherNoResponse {
        last_voucher_no: last.value(),
    }))
}

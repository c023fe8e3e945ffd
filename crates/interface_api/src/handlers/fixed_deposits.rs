//! Fixed deposit handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use domain_ledger::{FixedDeposit, FixedDepositPort};

use crate::{error::ApiError, AppState};

/// Gets a fixed deposit by its FDR number
pub async fn get_fixed_deposit(
    State(state): State<AppState>,
    Path(fdr_no): Path<String>,
) -> Result<Json<FixedDeposit>, ApiError> {
    state
        .fixed_deposits
        .find_by_number(&fdr_no)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Fixed deposit not found: {}", fdr_no)))
}

/// Registers a fixed deposit
pub async fn create_fixed_deposit(
    State(state): State<AppState>,
    Json(deposit): Json<FixedDeposit>,
) -> Result<(StatusCode, Json<FixedDeposit>), ApiError> {
    deposit.validate()?;
    let deposit = state.fixed_deposits.insert(&deposit).await?;
    info!(fdr_no = %deposit.fdr_no, "Fixed deposit registered");
    Ok((StatusCode::CREATED, Json(deposit)))
}

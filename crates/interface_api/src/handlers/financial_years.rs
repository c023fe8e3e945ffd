//! Financial year handlers

use axum::{extract::State, Json};

use domain_ledger::VoucherStoreResolver;

use crate::dto::fiscal::FinancialYearsResponse;
use crate::{error::ApiError, AppState};

/// Lists registered financial years, oldest first
pub async fn list_financial_years(
    State(state): State<AppState>,
) -> Result<Json<FinancialYearsResponse>, ApiError> {
    Ok(Json(FinancialYearsResponse {
        financial_years: state.stores.financial_years().await?,
    }))
}

//! Unit handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use validator::Validate;

use domain_ledger::{Unit, UnitLedgerPort};

use crate::dto::unit::*;
use crate::{error::ApiError, AppState};

/// Lists units, optionally filtered by a name substring
pub async fn list_units(
    State(state): State<AppState>,
    Query(query): Query<UnitListQuery>,
) -> Result<Json<Vec<Unit>>, ApiError> {
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(state.units.list(search).await?))
}

/// Gets a unit with its history
pub async fn get_unit(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Unit>, ApiError> {
    state
        .units
        .find_by_name(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Unit not found: {}", name)))
}

/// Registers a unit with opening balances
pub async fn create_unit(
    State(state): State<AppState>,
    Json(request): Json<CreateUnitRequest>,
) -> Result<(StatusCode, Json<Unit>), ApiError> {
    request.validate()?;
    let unit = state.units.insert(&request.into_unit()?).await?;
    info!(unit = %unit.name(), "Unit registered");
    Ok((StatusCode::CREATED, Json(unit)))
}

//! HTTP API Layer
//!
//! This crate provides the REST API of the unit ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: vouchers, units, fixed deposits, financial years, health
//! - **Middleware**: request ids, tracing, audit logging
//! - **DTOs**: request decoding (including `Custom` particulars and
//!   form-style numbers) and response shapes
//! - **Error Handling**: consistent `{ error, message }` responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState, config::ApiConfig};
//!
//! let app = create_router(AppState::in_memory(ApiConfig::default()));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use axum::{
    middleware as axum_middleware,
    routing::get,
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_ledger::memory::{InMemoryFixedDeposits, InMemoryUnitLedger, InMemoryVoucherStores};
use domain_ledger::{FixedDepositPort, UnitLedgerPort, VoucherService, VoucherStoreResolver};
use infra_db::{PostgresFixedDeposits, PostgresUnitLedger, PostgresVoucherStores};

use crate::config::ApiConfig;
use crate::handlers::{financial_years, fixed_deposits, health, units, vouchers};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<VoucherService>,
    pub stores: Arc<dyn VoucherStoreResolver>,
    pub units: Arc<dyn UnitLedgerPort>,
    pub fixed_deposits: Arc<dyn FixedDepositPort>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(
        units: Arc<dyn UnitLedgerPort>,
        stores: Arc<dyn VoucherStoreResolver>,
        fixed_deposits: Arc<dyn FixedDepositPort>,
        config: ApiConfig,
    ) -> Self {
        let service = Arc::new(VoucherService::new(units.clone(), fixed_deposits.clone()));
        Self {
            service,
            stores,
            units,
            fixed_deposits,
            config,
        }
    }

    /// State over fresh in-process stores
    pub fn in_memory(config: ApiConfig) -> Self {
        Self::new(
            Arc::new(InMemoryUnitLedger::new()),
            Arc::new(InMemoryVoucherStores::new()),
            Arc::new(InMemoryFixedDeposits::new()),
            config,
        )
    }

    /// State over PostgreSQL
    pub fn postgres(pool: PgPool, config: ApiConfig) -> Self {
        Self::new(
            Arc::new(PostgresUnitLedger::new(pool.clone())),
            Arc::new(PostgresVoucherStores::new(pool.clone())),
            Arc::new(PostgresFixedDeposits::new(pool)),
            config,
        )
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let voucher_routes = Router::new()
        .route(
            "/",
            get(vouchers::list_vouchers)
                .post(vouchers::create_voucher)
                .put(vouchers::update_voucher)
                .delete(vouchers::delete_voucher),
        )
        .route("/lastVoucherNo", get(vouchers::last_voucher_no));

    let unit_routes = Router::new()
        .route("/", get(units::list_units).post(units::create_unit))
        .route("/:name", get(units::get_unit));

    let fdr_routes = Router::new()
        .route("/", axum::routing::post(fixed_deposits::create_fixed_deposit))
        .route("/:fdr_no", get(fixed_deposits::get_fixed_deposit));

    let api_routes = Router::new()
        .nest("/vouchers", voucher_routes)
        .nest("/units", unit_routes)
        .nest("/fdrs", fdr_routes)
        .route("/financial-years", get(financial_years::list_financial_years))
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

//! bookkeeper Library
//!
//! Personal-finance bookkeeping backend: users, categories, bank accounts
//! and their transactions behind an axum JSON API. Re-exports modules for
//! the binary and integration tests.

use axum::{middleware, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod services;
pub mod store;

pub use api::AppState;
pub use config::Config;
pub use error::{AppError, AppResult, ErrorResponse};
pub use domain::{Amount, AmountError, ServiceError, ServiceResult};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let api_routes = api::create_router().layer(middleware::from_fn(
        api::middleware::logging_middleware,
    ));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        // Outermost first: assign the request id, trace, then echo it back
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

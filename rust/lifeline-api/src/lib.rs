// rust/lifeline-api/src/lib.rs
// Read-only axum surface: bearer-authenticated, paginated item envelopes

pub mod auth;
pub mod handlers;

use axum::routing::get;
use axum::{middleware, Router};
use sqlx::PgPool;

use lifeline_core::Secret;
use lifeline_store::StoreReader;

#[derive(Clone)]
pub struct AppState {
    pub reader: StoreReader,
    pub pool: PgPool,
    pub api_key: Secret,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/hospitals", get(handlers::list_hospitals))
        .route("/patients", get(handlers::list_patients))
        .route("/ambulances", get(handlers::list_ambulances))
        .route("/assignments", get(handlers::list_assignments))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ))
        // The health probe stays outside the bearer check.
        .route("/health", get(handlers::health))
        .with_state(state)
}

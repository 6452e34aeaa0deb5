// rust/lifeline-api/src/handlers.rs
// List endpoints returning the {items, total, limit, offset} envelope,
// plus the unauthenticated health probe

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use lifeline_core::{Ambulance, Hospital, Patient, PatientAssignment};
use lifeline_store::check_connection;

use crate::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl PageParams {
    pub fn clamped(&self) -> (i64, i64) {
        (self.limit.clamp(1, MAX_LIMIT), self.offset.max(0))
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

pub struct ApiError(sqlx::Error);

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(err = %self.0, "store query failed");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// Health probe: 200 when the shared store answers, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    match check_connection(&state.pool).await {
        Ok(()) => (StatusCode::OK, Json(HealthStatus { status: "healthy" })),
        Err(err) => {
            error!(%err, "health check failed to reach the store");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    status: "unhealthy",
                }),
            )
        }
    }
}

pub async fn list_hospitals(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse<Hospital>>, ApiError> {
    let (limit, offset) = params.clamped();
    let page = state.reader.hospitals_page(limit, offset).await?;
    Ok(Json(ListResponse {
        items: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

pub async fn list_patients(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse<Patient>>, ApiError> {
    let (limit, offset) = params.clamped();
    let page = state.reader.patients_page(limit, offset).await?;
    Ok(Json(ListResponse {
        items: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

pub async fn list_ambulances(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse<Ambulance>>, ApiError> {
    let (limit, offset) = params.clamped();
    let page = state.reader.ambulances_page(limit, offset).await?;
    Ok(Json(ListResponse {
        items: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ListResponse<PatientAssignment>>, ApiError> {
    let (limit, offset) = params.clamped();
    let page = state.reader.assignments_page(limit, offset).await?;
    Ok(Json(ListResponse {
        items: page.items,
        total: page.total,
        limit,
        offset,
    }))
}

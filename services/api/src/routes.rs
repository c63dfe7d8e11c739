use crate::infra::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use nutrition_priority::error::AppError;
use nutrition_priority::reports::{
    AggregateReport, BreakdownReport, PrioritySnapshot, RankedRegion, ReportError,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::Ordering;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct LimitParams {
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DistrictParams {
    #[serde(default)]
    pub(crate) district: Option<String>,
}

/// Malformed query strings answer with the same JSON error body as any
/// other invalid argument.
fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    match params {
        Ok(Query(params)) => Ok(params),
        Err(rejection) => Err(ReportError::InvalidArgument(rejection.body_text()).into()),
    }
}

pub(crate) fn report_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/regions/priority", get(priority_regions_endpoint))
        .route("/api/v1/statistics", get(statistics_endpoint))
        .route("/api/v1/statistics/breakdown", get(breakdown_endpoint))
        .route("/api/v1/report", get(snapshot_endpoint))
        .with_state(state)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn priority_regions_endpoint(
    State(state): State<AppState>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<Vec<RankedRegion>>, AppError> {
    let params = query_params(params)?;
    let limit = params.limit.unwrap_or(state.default_limit);
    let regions = state
        .with_session(move |session, reports| reports.priority_regions(session, limit))
        .await?;
    Ok(Json(regions))
}

pub(crate) async fn statistics_endpoint(
    State(state): State<AppState>,
) -> Result<Json<AggregateReport>, AppError> {
    let report = state
        .with_session(|session, reports| reports.statistics(session))
        .await?;
    Ok(Json(report))
}

pub(crate) async fn breakdown_endpoint(
    State(state): State<AppState>,
    params: Result<Query<DistrictParams>, QueryRejection>,
) -> Result<Json<BreakdownReport>, AppError> {
    let DistrictParams { district } = query_params(params)?;
    let report = state
        .with_session(move |session, reports| reports.breakdown(session, district.as_deref()))
        .await?;
    Ok(Json(report))
}

pub(crate) async fn snapshot_endpoint(
    State(state): State<AppState>,
    params: Result<Query<LimitParams>, QueryRejection>,
) -> Result<Json<PrioritySnapshot>, AppError> {
    let params = query_params(params)?;
    let limit = params.limit.unwrap_or(state.default_limit);
    let snapshot = state
        .with_session(move |session, reports| reports.snapshot(session, limit))
        .await?;
    Ok(Json(snapshot))
}

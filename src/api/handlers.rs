//! API Request Handlers

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::*;
use crate::core::advisor::{AdviseRequest, Advisor, Advisory};
use crate::models::errors::AppError;
use crate::models::route::{ImpactSimulation, RouteOutcome};
use crate::models::types::{RawTransaction, RiskAssessment};
use crate::utils::telemetry::AdvisoryTelemetry;

type HandlerResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

/// Shared application state
pub struct AppState {
    pub advisor: Arc<Advisor>,
    pub telemetry: Arc<AdvisoryTelemetry>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(advisor: Arc<Advisor>, telemetry: Arc<AdvisoryTelemetry>) -> Self {
        Self {
            advisor,
            telemetry,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Count the failure and wrap it in the error envelope
    fn reject(&self, err: AppError, start: Instant) -> (StatusCode, Json<ApiResponse<()>>) {
        self.telemetry.record_error();
        let status = StatusCode::from_u16(err.code.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if err.code.is_client_error() {
            warn!(code = err.code_str(), "Rejected request: {}", err.message);
        } else {
            warn!(code = err.code_str(), "Request failed: {}", err);
        }
        (
            status,
            Json(ApiResponse::error(ApiError::from(&err), elapsed_ms(start))),
        )
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let registry = state.advisor.registry();

    let data = StatsData {
        advisory: state.telemetry.get_stats(),
        registry_assets: registry.asset_count(),
        registry_pools: registry.pool_count(),
        uptime_seconds: state.uptime_seconds(),
        api_version: env!("CARGO_PKG_VERSION").to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Route Search
// ============================================

pub async fn find_route(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RouteRequest>,
) -> HandlerResult<RouteOutcome> {
    let start = Instant::now();

    let outcome = state
        .advisor
        .find_best_route(&req.source, &req.destination, req.amount, req.max_hops)
        .map_err(|e| state.reject(e, start))?;

    state
        .telemetry
        .record_route(outcome.is_found(), start.elapsed().as_millis() as u64);

    match outcome.route() {
        Some(route) => info!(
            "🧭 {} {} -> {}: {} hop(s), net {:.6}",
            req.amount,
            route.source(),
            route.destination(),
            route.hop_count(),
            route.net_output
        ),
        None => info!("🧭 {} -> {}: no route", req.source, req.destination),
    }

    Ok(Json(ApiResponse::success(outcome, elapsed_ms(start))))
}

pub async fn simulate_impact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImpactRequest>,
) -> HandlerResult<ImpactSimulation> {
    let start = Instant::now();

    if req.amounts.is_empty() || req.amounts.len() > MAX_IMPACT_SAMPLES {
        state.telemetry.record_error();
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(
                ApiError::bad_request(format!(
                    "amounts must hold between 1 and {} entries",
                    MAX_IMPACT_SAMPLES
                )),
                elapsed_ms(start),
            )),
        ));
    }

    let simulation = state
        .advisor
        .simulate_price_impact(&req.source, &req.destination, &req.amounts, req.max_hops)
        .map_err(|e| state.reject(e, start))?;

    Ok(Json(ApiResponse::success(simulation, elapsed_ms(start))))
}

// ============================================
// Risk Scoring
// ============================================

pub async fn analyze_transaction(
    State(state): State<Arc<AppState>>,
    Json(raw): Json<RawTransaction>,
) -> HandlerResult<RiskAssessment> {
    let start = Instant::now();

    let assessment = state.advisor.analyze(raw).map_err(|e| state.reject(e, start))?;
    record_assessment(&state, &assessment, start);

    Ok(Json(ApiResponse::success(assessment, elapsed_ms(start))))
}

pub async fn check_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddressCheckRequest>,
) -> HandlerResult<RiskAssessment> {
    let start = Instant::now();

    let assessment = state
        .advisor
        .check_address(&req.address)
        .map_err(|e| state.reject(e, start))?;
    record_assessment(&state, &assessment, start);

    Ok(Json(ApiResponse::success(assessment, elapsed_ms(start))))
}

fn record_assessment(state: &AppState, assessment: &RiskAssessment, start: Instant) {
    state.telemetry.record_assessment(
        assessment.level,
        assessment.recommend_against,
        start.elapsed().as_millis() as u64,
    );
    if assessment.recommend_against {
        info!("🛡️ {}", assessment.summary());
    }
}

// ============================================
// Combined Advisory
// ============================================

pub async fn advise(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AdviseRequest>,
) -> HandlerResult<Advisory> {
    let start = Instant::now();

    let advisory = state.advisor.advise(&req).map_err(|e| state.reject(e, start))?;

    let latency = start.elapsed().as_millis() as u64;
    state.telemetry.record_route(advisory.route.is_found(), latency);
    for assessment in advisory
        .assessment
        .iter()
        .chain(advisory.approval.as_ref().map(|a| &a.assessment))
    {
        state
            .telemetry
            .record_assessment(assessment.level, assessment.recommend_against, latency);
    }

    info!(
        "📋 Advisory {} -> {}: proceed={}",
        req.source, req.destination, advisory.proceed
    );

    Ok(Json(ApiResponse::success(advisory, elapsed_ms(start))))
}

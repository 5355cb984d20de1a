//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::models::errors::AppError;
use crate::utils::telemetry::AdvisoryStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "API_BAD_REQUEST".to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "API_INTERNAL_ERROR".to_string(),
            message: message.into(),
            details: None,
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: std::error::Error::source(err).map(|s| s.to_string()),
        }
    }
}

// ============================================
// Route Search
// ============================================

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub source: String,
    pub destination: String,
    pub amount: f64,
    /// Hop limit (default from config)
    #[serde(default)]
    pub max_hops: Option<usize>,
}

// ============================================
// Price Impact Simulation
// ============================================

#[derive(Debug, Deserialize)]
pub struct ImpactRequest {
    pub source: String,
    pub destination: String,
    #[serde(default = "default_impact_amounts")]
    pub amounts: Vec<f64>,
    #[serde(default)]
    pub max_hops: Option<usize>,
}

fn default_impact_amounts() -> Vec<f64> {
    vec![1.0, 10.0, 100.0, 1_000.0]
}

/// Largest sample grid accepted in one request
pub const MAX_IMPACT_SAMPLES: usize = 50;

// ============================================
// Address Check
// ============================================

#[derive(Debug, Deserialize)]
pub struct AddressCheckRequest {
    pub address: String,
}

// ============================================
// Stats / Telemetry
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsData {
    #[serde(flatten)]
    pub advisory: AdvisoryStats,
    pub registry_assets: usize,
    pub registry_pools: usize,
    pub uptime_seconds: u64,
    pub api_version: String,
}

// ============================================
// Health Check
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

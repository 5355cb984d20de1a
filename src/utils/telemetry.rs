//! Advisory telemetry
//!
//! In-process counters for route searches and risk assessments. No addresses
//! or amounts are retained.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::models::types::RiskLevel;

/// Snapshot of the counters
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AdvisoryStats {
    pub routes_requested: u64,
    pub routes_found: u64,
    pub routes_not_found: u64,
    pub assessments: u64,
    /// Assessments per risk level (`LOW`, `MEDIUM`, ...)
    pub assessments_by_level: HashMap<String, u64>,
    pub recommended_against: u64,
    /// Requests that failed validation or loading
    pub errors: u64,
    pub avg_latency_ms: f64,
    pub period_start: u64,
    pub period_end: u64,
}

impl AdvisoryStats {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Lock-free counters (the per-level map takes a short write lock)
pub struct AdvisoryTelemetry {
    routes_requested: AtomicU64,
    routes_found: AtomicU64,
    routes_not_found: AtomicU64,
    assessments: AtomicU64,
    recommended_against: AtomicU64,
    errors: AtomicU64,
    operations: AtomicU64,
    total_latency_ms: AtomicU64,
    level_counts: RwLock<HashMap<RiskLevel, u64>>,
    session_start: u64,
}

impl AdvisoryTelemetry {
    pub fn new() -> Self {
        Self {
            routes_requested: AtomicU64::new(0),
            routes_found: AtomicU64::new(0),
            routes_not_found: AtomicU64::new(0),
            assessments: AtomicU64::new(0),
            recommended_against: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            operations: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            level_counts: RwLock::new(HashMap::new()),
            session_start: current_timestamp(),
        }
    }

    /// Record a completed route search
    pub fn record_route(&self, found: bool, latency_ms: u64) {
        self.routes_requested.fetch_add(1, Ordering::Relaxed);
        if found {
            self.routes_found.fetch_add(1, Ordering::Relaxed);
        } else {
            self.routes_not_found.fetch_add(1, Ordering::Relaxed);
        }
        self.record_latency(latency_ms);
    }

    /// Record a completed risk assessment
    pub fn record_assessment(&self, level: RiskLevel, recommend_against: bool, latency_ms: u64) {
        self.assessments.fetch_add(1, Ordering::Relaxed);
        if recommend_against {
            self.recommended_against.fetch_add(1, Ordering::Relaxed);
        }
        if let Ok(mut counts) = self.level_counts.write() {
            *counts.entry(level).or_insert(0) += 1;
        }
        self.record_latency(latency_ms);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, latency_ms: u64) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> AdvisoryStats {
        let operations = self.operations.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let avg_latency_ms = if operations > 0 {
            total_latency as f64 / operations as f64
        } else {
            0.0
        };

        let assessments_by_level = self
            .level_counts
            .read()
            .map(|counts| {
                counts
                    .iter()
                    .map(|(level, n)| (level.as_str().to_string(), *n))
                    .collect()
            })
            .unwrap_or_default();

        AdvisoryStats {
            routes_requested: self.routes_requested.load(Ordering::Relaxed),
            routes_found: self.routes_found.load(Ordering::Relaxed),
            routes_not_found: self.routes_not_found.load(Ordering::Relaxed),
            assessments: self.assessments.load(Ordering::Relaxed),
            assessments_by_level,
            recommended_against: self.recommended_against.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            avg_latency_ms,
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }
}

impl Default for AdvisoryTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let telemetry = AdvisoryTelemetry::new();
        telemetry.record_route(true, 2);
        telemetry.record_route(false, 4);
        telemetry.record_assessment(RiskLevel::Critical, true, 3);
        telemetry.record_assessment(RiskLevel::Low, false, 3);
        telemetry.record_error();

        let stats = telemetry.get_stats();
        assert_eq!(stats.routes_requested, 2);
        assert_eq!(stats.routes_found, 1);
        assert_eq!(stats.routes_not_found, 1);
        assert_eq!(stats.assessments, 2);
        assert_eq!(stats.recommended_against, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.assessments_by_level.get("CRITICAL"), Some(&1));
        assert!((stats.avg_latency_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_json() {
        let json = AdvisoryStats::default().to_json();
        assert!(json.contains("routes_requested"));
    }
}

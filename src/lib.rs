//! Swap Advisor Library
//!
//! Pre-signing advisory for token swaps:
//! - Route optimizer: lowest-cost multi-hop path over a pool registry
//! - Risk scorer: rule-based assessment of a transaction before signing
//! - Advisory facade combining both, exposed over HTTP and the CLI

pub mod api;
pub mod core;
pub mod models;
pub mod utils;

pub use crate::core::advisor::{AdviseRequest, Advisor, Advisory, ApprovalStep};
pub use crate::core::registry::{Asset, Pool, PoolRegistry};
pub use crate::core::risk_score::{AssessmentBuilder, RiskScorer};
pub use crate::core::router::RouteOptimizer;
pub use crate::core::rules::{default_rules, RiskRule, RuleContext, RuleOutcome};
pub use crate::core::tables::{ReputationTable, RiskTables, SignatureTable};
pub use models::config::{AdvisorConfig, RoutingConfig, ScoringConfig};
pub use models::errors::{AppError, AppResult, ErrorCode};
pub use models::route::{ImpactSimulation, NotFoundReason, RouteCandidate, RouteOutcome, RouteType};
pub use models::types::{
    RawTransaction, RiskAssessment, RiskFactor, RiskLevel, TransactionDescriptor,
};
pub use utils::snapshot::SnapshotCell;
pub use utils::telemetry::{AdvisoryStats, AdvisoryTelemetry};

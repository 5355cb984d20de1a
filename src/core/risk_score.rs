//! Risk Scoring Module
//! Runs the rule set over a transaction and folds the outcomes into a
//! 0-100 score, a level and an ordered list of warnings.
//!
//! - 0-29: LOW
//! - 30-59: MEDIUM
//! - 60-84: HIGH
//! - 85-100: CRITICAL (also forced by any rule flagging a critical condition)

use std::sync::Arc;
use tracing::debug;

use crate::core::rules::{default_rules, AddressReputationRule, RiskRule, RuleContext, RuleOutcome};
use crate::core::tables::RiskTables;
use crate::models::config::ScoringConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::types::{
    parse_address, RawTransaction, RiskAssessment, RiskLevel, ScoreFactor, TransactionDescriptor,
};
use crate::utils::constants::{CRITICAL_RISK_FLOOR, WEIGHT_ADDRESS};

/// Folds ordered rule outcomes into an assessment
pub struct AssessmentBuilder {
    factors: Vec<ScoreFactor>,
    outcomes: Vec<(f32, RuleOutcome)>,
    detected_function: Option<String>,
}

impl AssessmentBuilder {
    pub fn new() -> Self {
        Self {
            factors: Vec::new(),
            outcomes: Vec::new(),
            detected_function: None,
        }
    }

    /// Add one rule result, in evaluation order
    pub fn with_outcome(mut self, name: &str, weight: f32, outcome: RuleOutcome) -> Self {
        self.factors.push(ScoreFactor {
            name: name.to_string(),
            score: outcome.score,
            weight,
            applied: outcome.applicable,
            reason: outcome.reason.clone(),
        });
        self.outcomes.push((weight, outcome));
        self
    }

    pub fn with_function(mut self, function: Option<String>) -> Self {
        self.detected_function = function;
        self
    }

    /// Weighted mean over applicable rules, clamped; critical conditions
    /// force CRITICAL and floor the score
    pub fn build(self, recommend_against_score: u8) -> RiskAssessment {
        let (weighted, total_weight) = self
            .outcomes
            .iter()
            .filter(|(_, o)| o.applicable)
            .fold((0.0f32, 0.0f32), |(sum, w), (weight, o)| {
                (sum + o.score as f32 * weight, w + weight)
            });

        let mean = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            0.0
        };
        let mut score = mean.round().clamp(0.0, 100.0) as u8;

        let forced_critical = self.outcomes.iter().any(|(_, o)| o.critical);
        let level = if forced_critical {
            score = score.max(CRITICAL_RISK_FLOOR);
            RiskLevel::Critical
        } else {
            RiskLevel::from_score(score)
        };

        let mut warnings = Vec::new();
        let mut risk_factors = Vec::new();
        for (_, outcome) in &self.outcomes {
            warnings.extend(outcome.warnings.iter().cloned());
            risk_factors.extend(outcome.factors.iter().map(|f| f.description()));
        }

        RiskAssessment {
            score,
            level,
            warnings,
            risk_factors,
            recommend_against: score >= recommend_against_score,
            forced_critical,
            detected_function: self.detected_function,
            breakdown: self.factors,
            recommendation: generate_recommendation(level),
            recommendations: level_recommendations(level),
        }
    }
}

impl Default for AssessmentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line recommendation
fn generate_recommendation(level: RiskLevel) -> String {
    let action = match level {
        RiskLevel::Low => "Proceed with standard caution.",
        RiskLevel::Medium => "Review transaction details before signing.",
        RiskLevel::High => "High probability of loss. Avoid unless you understand the risks.",
        RiskLevel::Critical => "DO NOT SIGN. This transaction is very likely to lose funds.",
    };
    format!("{} {} RISK - {}", level.emoji(), level.as_str(), action)
}

fn level_recommendations(level: RiskLevel) -> Vec<String> {
    let items: &[&str] = match level {
        RiskLevel::Critical => &[
            "DO NOT INTERACT with this address",
            "Block this address in your wallet",
            "Report to security team if you received tokens from this address",
            "Check if you have any pending transactions with this address",
        ],
        RiskLevel::High => &[
            "HIGH RISK - Avoid transactions with this address",
            "Verify the address through official channels",
            "Never send large amounts to this address",
            "Document any interactions for security review",
        ],
        RiskLevel::Medium => &[
            "MEDIUM RISK - Exercise caution",
            "Double-check address with the recipient",
            "Consider using smaller amounts for testing",
            "Monitor transactions closely",
        ],
        RiskLevel::Low => &[
            "Address appears safe based on available data",
            "Continue with normal security practices",
            "Regular monitoring is still recommended",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

/// Pre-signing transaction risk scorer over one table snapshot
pub struct RiskScorer {
    tables: Arc<RiskTables>,
    config: ScoringConfig,
    rules: Vec<Box<dyn RiskRule>>,
}

impl RiskScorer {
    pub fn new(tables: Arc<RiskTables>, config: ScoringConfig) -> Self {
        Self {
            tables,
            config,
            rules: default_rules(),
        }
    }

    pub fn tables(&self) -> &Arc<RiskTables> {
        &self.tables
    }

    /// Score a validated transaction. Deterministic for fixed tables.
    pub fn analyze(&self, tx: &TransactionDescriptor) -> RiskAssessment {
        let ctx = RuleContext::new(tx, &self.tables, &self.config);

        let assessment = self
            .rules
            .iter()
            .fold(AssessmentBuilder::new(), |builder, rule| {
                builder.with_outcome(rule.name(), rule.weight(), rule.evaluate(&ctx))
            })
            .with_function(ctx.function_name())
            .build(self.config.recommend_against_score);

        debug!(
            "Assessed tx to {}: {} ({}), {} warning(s)",
            tx.to,
            assessment.score,
            assessment.level.as_str(),
            assessment.warnings.len()
        );
        assessment
    }

    /// Validate a caller-supplied transaction, then score it.
    /// Fields that fail to parse are reported after the rule warnings.
    pub fn analyze_raw(&self, raw: RawTransaction) -> AppResult<RiskAssessment> {
        let (tx, notes) = TransactionDescriptor::from_raw(raw)?;
        let mut assessment = self.analyze(&tx);
        assessment
            .warnings
            .extend(notes.into_iter().map(|note| format!("⚠️ {}", note)));
        Ok(assessment)
    }

    /// Address-only assessment
    pub fn check_address(&self, address: &str) -> AppResult<RiskAssessment> {
        let parsed = parse_address(address).ok_or_else(|| AppError::invalid_address(address))?;
        let outcome = AddressReputationRule::assess_address(&parsed, "address", &self.tables);
        Ok(AssessmentBuilder::new()
            .with_outcome("Address reputation", WEIGHT_ADDRESS, outcome)
            .build(self.config.recommend_against_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    fn scorer() -> RiskScorer {
        RiskScorer::new(Arc::new(RiskTables::builtin().unwrap()), ScoringConfig::default())
    }

    #[test]
    fn test_weighted_mean_skips_inapplicable() {
        let assessment = AssessmentBuilder::new()
            .with_outcome("a", 0.5, RuleOutcome::scored(40, "a"))
            .with_outcome("b", 0.5, RuleOutcome::not_applicable("b"))
            .build(60);
        assert_eq!(assessment.score, 40);
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert!(!assessment.recommend_against);
        assert_eq!(assessment.breakdown.len(), 2);
        assert!(!assessment.breakdown[1].applied);
    }

    #[test]
    fn test_critical_condition_floors_score() {
        let mut critical = RuleOutcome::scored(10, "critical");
        critical.critical = true;
        let assessment = AssessmentBuilder::new()
            .with_outcome("a", 0.9, RuleOutcome::scored(0, "a"))
            .with_outcome("b", 0.1, critical)
            .build(60);
        assert_eq!(assessment.score, 85);
        assert_eq!(assessment.level, RiskLevel::Critical);
        assert!(assessment.forced_critical);
        assert!(assessment.recommend_against);
    }

    #[test]
    fn test_no_applicable_rules_is_zero() {
        let assessment = AssessmentBuilder::new().build(60);
        assert_eq!(assessment.score, 0);
        assert_eq!(assessment.level, RiskLevel::Low);
    }

    #[test]
    fn test_plain_transfer_is_low() {
        let tx = TransactionDescriptor::new(
            parse_address("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").unwrap(),
        );
        let assessment = scorer().analyze(&tx);
        // (0.35*30 + 0.30*10 + 0.10*0) / 0.75
        assert_eq!(assessment.score, 18);
        assert_eq!(assessment.level, RiskLevel::Low);
        assert!(assessment.detected_function.is_none());
    }

    #[test]
    fn test_check_address() {
        let s = scorer();
        let bad = s.check_address("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984").unwrap();
        assert_eq!(bad.level, RiskLevel::Critical);
        assert!(bad.score >= 85);

        let good = s.check_address("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D").unwrap();
        assert_eq!(good.score, 5);
        assert_eq!(good.level, RiskLevel::Low);

        let err = s.check_address("0x123").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidAddress);
    }

    #[test]
    fn test_analyze_raw_rejects_bad_to() {
        let raw = RawTransaction {
            to: Some("not-an-address".to_string()),
            ..Default::default()
        };
        let err = scorer().analyze_raw(raw).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransactionDescriptor);
    }

    #[test]
    fn test_analyze_raw_odd_calldata_is_not_an_error() {
        let raw = RawTransaction {
            to: Some("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D".to_string()),
            data: Some("0x095".to_string()),
            ..Default::default()
        };
        let assessment = scorer().analyze_raw(raw).unwrap();
        assert!(assessment.detected_function.is_none());
        assert!(assessment.warnings.iter().any(|w| w.contains("odd number")));
    }
}

//! Risk rules
//!
//! Each rule looks at one aspect of a transaction and returns a sub-score in
//! [0, 100] plus the warnings and risk factors that explain it. Rules are
//! independent; `RiskScorer` runs them in a fixed order and aggregates.

use alloy_primitives::Address;
use std::collections::HashSet;

use crate::core::tables::{
    Listing, ReputationCategory, RiskTables, SignatureCategory, SignatureInfo,
};
use crate::models::config::ScoringConfig;
use crate::models::types::{RiskFactor, TransactionDescriptor};
use crate::utils::constants::{
    unlimited_approval_threshold, wei_to_gwei, BAD_ADDRESS_SCORE, GOOD_ADDRESS_SCORE,
    LIMITED_APPROVAL_SCORE, NEUTRAL_ADDRESS_SCORE, NO_FUNCTION_SCORE, SUSPICIOUS_PATTERN_PENALTY,
    SUSPICIOUS_REPEATED_NIBBLES, SUSPICIOUS_ZERO_NIBBLES, UNDECODABLE_APPROVAL_SCORE,
    UNKNOWN_SELECTOR_SCORE, UNLIMITED_APPROVAL_SCORE, WEIGHT_ADDRESS, WEIGHT_APPROVAL,
    WEIGHT_FUNCTION, WEIGHT_GAS, WEIGHT_VALUE,
};
use crate::utils::decoder::{CallDecoder, DecodedCall};

/// Expected gas band for a plain value transfer
const NATIVE_TRANSFER_GAS: (u64, u64) = (21_000, 100_000);

/// Everything a rule may look at, decoded once per analysis
pub struct RuleContext<'a> {
    pub tx: &'a TransactionDescriptor,
    pub tables: &'a RiskTables,
    pub config: &'a ScoringConfig,
    pub selector: Option<[u8; 4]>,
    pub signature: Option<&'a SignatureInfo>,
    pub decoded: Option<DecodedCall>,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        tx: &'a TransactionDescriptor,
        tables: &'a RiskTables,
        config: &'a ScoringConfig,
    ) -> Self {
        let selector = CallDecoder::selector(&tx.data);
        let signature = selector.as_ref().and_then(|s| tables.signatures.lookup(s));
        let decoded = CallDecoder::decode(&tx.data, tx.value);
        Self {
            tx,
            tables,
            config,
            selector,
            signature,
            decoded,
        }
    }

    /// True when the selector is an approval, per table or decoder
    pub fn is_approval(&self) -> bool {
        self.signature.map(|s| s.is_approval).unwrap_or(false)
            || self
                .decoded
                .as_ref()
                .and_then(DecodedCall::approval_amount)
                .is_some()
    }

    /// Function name for reporting
    pub fn function_name(&self) -> Option<String> {
        match (self.signature, self.selector) {
            (Some(sig), _) => Some(sig.name.clone()),
            (None, Some(selector)) => Some(format!("0x{}", hex::encode(selector))),
            (None, None) => None,
        }
    }
}

/// Result of one rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub score: u8,
    /// Inapplicable rules are left out of the weighted mean
    pub applicable: bool,
    /// Forces the overall level to CRITICAL
    pub critical: bool,
    pub warnings: Vec<String>,
    pub factors: Vec<RiskFactor>,
    pub reason: String,
}

impl RuleOutcome {
    pub fn scored(score: u8, reason: impl Into<String>) -> Self {
        Self {
            score: score.min(100),
            applicable: true,
            critical: false,
            warnings: Vec::new(),
            factors: Vec::new(),
            reason: reason.into(),
        }
    }

    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Self {
            applicable: false,
            ..Self::scored(0, reason)
        }
    }

    fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    fn raise(&mut self, score: u8) {
        self.score = self.score.max(score.min(100));
    }
}

/// A single heuristic
pub trait RiskRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn weight(&self) -> f32;
    fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleOutcome;
}

/// Rules in evaluation order
pub fn default_rules() -> Vec<Box<dyn RiskRule>> {
    vec![
        Box::new(AddressReputationRule),
        Box::new(FunctionSignatureRule),
        Box::new(ApprovalAmountRule),
        Box::new(GasAnomalyRule),
        Box::new(ValueTransferRule),
    ]
}

// ============================================
// 1. Address reputation
// ============================================

pub struct AddressReputationRule;

impl AddressReputationRule {
    /// Score a single address playing `role`
    pub fn assess_address(address: &Address, role: &str, tables: &RiskTables) -> RuleOutcome {
        let listing = tables.reputation.lookup(address);
        let mut outcome = match listing {
            Some(Listing {
                category: ReputationCategory::Bad,
                label,
            }) => {
                let mut outcome = RuleOutcome::scored(
                    BAD_ADDRESS_SCORE,
                    format!("{} {} is listed bad", role, address),
                );
                outcome.critical = true;
                outcome.warn(format!("🚨 Known-bad {} {}: {}", role, address, label));
                outcome.factors.push(RiskFactor::KnownBadAddress {
                    role: role.to_string(),
                    address: *address,
                    label: label.clone(),
                });
                outcome
            }
            Some(Listing {
                category: ReputationCategory::Good,
                label,
            }) => RuleOutcome::scored(GOOD_ADDRESS_SCORE, format!("{} is {}", role, label)),
            None => {
                let mut outcome = RuleOutcome::scored(
                    NEUTRAL_ADDRESS_SCORE,
                    format!("{} {} is unverified", role, address),
                );
                outcome.factors.push(RiskFactor::UnknownAddress {
                    role: role.to_string(),
                    address: *address,
                });
                outcome
            }
        };

        let allowlisted = matches!(listing, Some(l) if l.category == ReputationCategory::Good);
        if !allowlisted && is_suspicious_pattern(address) {
            outcome.score = outcome.score.saturating_add(SUSPICIOUS_PATTERN_PENALTY).min(100);
            outcome.warn(format!("⚠️ Suspicious {} address pattern: {}", role, address));
            outcome.factors.push(RiskFactor::SuspiciousAddressPattern {
                role: role.to_string(),
                address: *address,
            });
        }

        outcome
    }
}

impl RiskRule for AddressReputationRule {
    fn name(&self) -> &'static str {
        "Address reputation"
    }

    fn weight(&self) -> f32 {
        WEIGHT_ADDRESS
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        let mut checked: Vec<(&str, Address)> = vec![("target", ctx.tx.to)];
        if let Some(call) = &ctx.decoded {
            checked.extend(call.embedded_addresses());
        }

        let mut seen = HashSet::new();
        let mut combined = RuleOutcome::scored(0, String::new());
        let mut worst_reason = String::new();

        for (role, address) in checked {
            if !seen.insert(address) {
                continue;
            }
            let outcome = Self::assess_address(&address, role, ctx.tables);
            if outcome.score >= combined.score {
                worst_reason = outcome.reason.clone();
            }
            combined.raise(outcome.score);
            combined.critical |= outcome.critical;
            combined.warnings.extend(outcome.warnings);
            combined.factors.extend(outcome.factors);
        }

        combined.reason = format!("{} address(es) checked; worst: {}", seen.len(), worst_reason);
        combined
    }
}

/// Vanity / poisoning shape: too many zero nibbles or one nibble repeated
fn is_suspicious_pattern(address: &Address) -> bool {
    let hex = hex::encode(address.as_slice());
    let mut counts = [0usize; 16];
    for c in hex.chars() {
        if let Some(d) = c.to_digit(16) {
            counts[d as usize] += 1;
        }
    }
    counts[0] > SUSPICIOUS_ZERO_NIBBLES || counts.iter().any(|&n| n > SUSPICIOUS_REPEATED_NIBBLES)
}

// ============================================
// 2. Function signature
// ============================================

pub struct FunctionSignatureRule;

impl RiskRule for FunctionSignatureRule {
    fn name(&self) -> &'static str {
        "Function signature"
    }

    fn weight(&self) -> f32 {
        WEIGHT_FUNCTION
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        let Some(selector) = ctx.selector else {
            let reason = if ctx.tx.data.is_empty() {
                "No function detected (plain value transfer)"
            } else {
                "No function detected (calldata shorter than a selector)"
            };
            return RuleOutcome::scored(NO_FUNCTION_SCORE, reason);
        };

        let Some(signature) = ctx.signature else {
            let selector_hex = format!("0x{}", hex::encode(selector));
            let mut outcome = RuleOutcome::scored(
                UNKNOWN_SELECTOR_SCORE,
                format!("Unrecognized selector {}", selector_hex),
            );
            outcome.factors.push(RiskFactor::UnknownSelector {
                selector: selector_hex,
            });
            return outcome;
        };

        let mut outcome = RuleOutcome::scored(
            signature.risk_weight,
            format!("{} (weight {})", signature.name, signature.risk_weight),
        );
        if signature.risk_weight >= 50 {
            outcome.factors.push(RiskFactor::RiskyFunction {
                name: signature.name.clone(),
                risk_weight: signature.risk_weight,
            });
        }

        match (signature.category, &ctx.decoded) {
            (SignatureCategory::Approval, decoded) => {
                let spender = decoded
                    .as_ref()
                    .and_then(DecodedCall::approval_spender)
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "an undecoded spender".to_string());
                outcome.warn(format!(
                    "⚠️ Token approval: grants {} the right to move your tokens",
                    spender
                ));
            }
            (SignatureCategory::Ownership, Some(DecodedCall::TransferOwnership { new_owner })) => {
                outcome.warn(format!(
                    "⚠️ Ownership transfer: contract control moves to {}",
                    new_owner
                ));
            }
            (SignatureCategory::Ownership, Some(DecodedCall::RenounceOwnership)) => {
                outcome.warn("⚠️ Renounces contract ownership permanently");
            }
            (SignatureCategory::Ownership, _) => {
                outcome.warn("⚠️ Changes contract ownership");
            }
            (SignatureCategory::Upgrade, _) => {
                outcome.warn("🚨 Proxy upgrade: contract logic will be replaced");
            }
            (SignatureCategory::Execution, Some(DecodedCall::Multicall { calls })) => {
                outcome.warn(format!("⚠️ Batched execution of {} inner calls", calls));
            }
            (SignatureCategory::Execution, _) => {
                outcome.warn("⚠️ Arbitrary call execution through this contract");
            }
            _ => {}
        }

        outcome
    }
}

// ============================================
// 3. Approval amount
// ============================================

pub struct ApprovalAmountRule;

impl ApprovalAmountRule {
    fn unlimited(ctx: &RuleContext<'_>, spender: Option<Address>) -> RuleOutcome {
        let mut outcome =
            RuleOutcome::scored(UNLIMITED_APPROVAL_SCORE, "Unlimited approval amount");
        let allowlisted = spender
            .map(|s| ctx.tables.reputation.is_allowlisted(&s))
            .unwrap_or(false);
        outcome.critical = !allowlisted;
        match spender {
            Some(s) => outcome.warn(format!(
                "🚨 Unlimited approval: {} can spend all of this token",
                s
            )),
            None => outcome.warn("🚨 Unlimited approval to an undecoded spender"),
        }
        outcome.factors.push(RiskFactor::UnlimitedApproval { spender });
        outcome
    }
}

impl RiskRule for ApprovalAmountRule {
    fn name(&self) -> &'static str {
        "Approval amount"
    }

    fn weight(&self) -> f32 {
        WEIGHT_APPROVAL
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        if !ctx.is_approval() {
            return RuleOutcome::not_applicable("Not an approval");
        }

        let threshold = unlimited_approval_threshold();
        let decoded = ctx.decoded.as_ref();
        match decoded.and_then(DecodedCall::approval_amount) {
            Some(amount) if amount >= threshold => {
                Self::unlimited(ctx, decoded.and_then(DecodedCall::approval_spender))
            }
            Some(amount) if amount.is_zero() => {
                let mut outcome = RuleOutcome::scored(0, "Approval revocation");
                outcome.factors.push(RiskFactor::ApprovalRevocation);
                outcome
            }
            Some(amount) => {
                let mut outcome = RuleOutcome::scored(LIMITED_APPROVAL_SCORE, "Limited approval");
                outcome.factors.push(RiskFactor::LimitedApproval { amount });
                outcome
            }
            None => match CallDecoder::trailing_word(&ctx.tx.data) {
                // Truncated arguments still ending in a huge word
                Some(word) if word >= threshold => Self::unlimited(ctx, None),
                _ => {
                    let mut outcome = RuleOutcome::scored(
                        UNDECODABLE_APPROVAL_SCORE,
                        "Approval arguments did not decode",
                    );
                    outcome.warn("⚠️ Approval arguments could not be decoded");
                    outcome.factors.push(RiskFactor::UndecodableApproval);
                    outcome
                }
            },
        }
    }
}

// ============================================
// 4. Gas anomaly
// ============================================

pub struct GasAnomalyRule;

impl RiskRule for GasAnomalyRule {
    fn name(&self) -> &'static str {
        "Gas anomaly"
    }

    fn weight(&self) -> f32 {
        WEIGHT_GAS
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        let tx = ctx.tx;
        if tx.gas.is_none() && tx.gas_price.is_none() {
            return RuleOutcome::not_applicable("No gas parameters supplied");
        }

        let (min_gas, max_gas, category) = match (ctx.selector, ctx.signature) {
            (None, _) => (NATIVE_TRANSFER_GAS.0, NATIVE_TRANSFER_GAS.1, "value transfer"),
            (Some(_), Some(sig)) => {
                let (min, max) = sig.category.expected_gas();
                (min, max, category_name(sig.category))
            }
            (Some(_), None) => {
                let (min, max) = SignatureCategory::Other.expected_gas();
                (min, max, "unknown call")
            }
        };

        let mut outcome = RuleOutcome::scored(0, "Gas parameters within expected range");

        if let Some(gas) = tx.gas {
            if gas < min_gas || gas > max_gas {
                outcome.raise(40);
                outcome.warn(format!(
                    "⚠️ Gas limit {} outside expected {}-{} for {}",
                    gas, min_gas, max_gas, category
                ));
                outcome.factors.push(RiskFactor::GasLimitOutOfRange {
                    gas,
                    min: min_gas,
                    max: max_gas,
                });
            }
        }

        if let Some(price) = tx.gas_price {
            let gwei = wei_to_gwei(price);
            let (min_gwei, max_gwei) =
                (ctx.config.min_gas_price_gwei, ctx.config.max_gas_price_gwei);
            if gwei < min_gwei || gwei > max_gwei {
                outcome.raise(50);
                outcome.warn(format!(
                    "⚠️ Unusual gas price: {:.2} gwei (expected {:.2}-{:.2})",
                    gwei, min_gwei, max_gwei
                ));
                outcome.factors.push(RiskFactor::UnusualGasPrice {
                    gas_gwei: gwei,
                    min_gwei,
                    max_gwei,
                });
            }
        }

        if outcome.score > 0 {
            outcome.reason = "Gas parameters outside expected range".to_string();
        }
        outcome
    }
}

fn category_name(category: SignatureCategory) -> &'static str {
    match category {
        SignatureCategory::Approval => "approval",
        SignatureCategory::Transfer => "token transfer",
        SignatureCategory::Swap => "swap",
        SignatureCategory::Ownership => "ownership change",
        SignatureCategory::Upgrade => "upgrade",
        SignatureCategory::Execution => "execution",
        SignatureCategory::Other => "call",
    }
}

// ============================================
// 5. Value transfer
// ============================================

pub struct ValueTransferRule;

impl RiskRule for ValueTransferRule {
    fn name(&self) -> &'static str {
        "Value transfer"
    }

    fn weight(&self) -> f32 {
        WEIGHT_VALUE
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> RuleOutcome {
        let value_eth = ctx.tx.value_eth();
        let threshold = ctx.config.large_value_eth;
        let mut outcome = RuleOutcome::scored(0, format!("Value {:.4} ETH", value_eth));

        if value_eth > threshold * 10.0 {
            outcome.raise(85);
            outcome.warn(format!("🐋 Very large value: {:.4} ETH", value_eth));
            outcome.factors.push(RiskFactor::LargeValue { value_eth });
        } else if value_eth > threshold {
            outcome.raise(60);
            outcome.warn(format!("🐋 Large value: {:.4} ETH", value_eth));
            outcome.factors.push(RiskFactor::LargeValue { value_eth });
        }

        if !ctx.tx.value.is_zero() && ctx.is_approval() {
            outcome.raise(40);
            outcome.warn("⚠️ Native value attached to an approval call");
            outcome.factors.push(RiskFactor::ValueWithApproval { value_eth });
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::eth_to_wei;
    use crate::utils::decoder::SwapEncoder;
    use alloy_primitives::{address, U256};

    fn tables() -> RiskTables {
        RiskTables::builtin().unwrap()
    }

    fn unknown() -> Address {
        address!("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed")
    }

    #[test]
    fn test_suspicious_pattern() {
        assert!(is_suspicious_pattern(&Address::ZERO));
        assert!(is_suspicious_pattern(&address!("1111111111111111111111111111111111111234")));
        assert!(!is_suspicious_pattern(&address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D")));
    }

    #[test]
    fn test_address_scores() {
        let t = tables();
        let good = AddressReputationRule::assess_address(
            &address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
            "target",
            &t,
        );
        assert_eq!(good.score, 5);

        let bad = AddressReputationRule::assess_address(
            &address!("1f9840a85d5af5bf1d1762f925bdaddc4201f984"),
            "target",
            &t,
        );
        assert_eq!(bad.score, 90);
        assert!(bad.critical);

        let neutral = AddressReputationRule::assess_address(
            &address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            "target",
            &t,
        );
        assert_eq!(neutral.score, 30);
        assert!(!neutral.critical);
    }

    #[test]
    fn test_reputation_checks_embedded_spender() {
        let t = tables();
        let config = ScoringConfig::default();
        let bad_spender = address!("1f9840a85d5af5bf1d1762f925bdaddc4201f984");
        let tx = TransactionDescriptor::new(address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"))
            .with_data(SwapEncoder::encode_approve(bad_spender, U256::from(5u64)));
        let ctx = RuleContext::new(&tx, &t, &config);
        let outcome = AddressReputationRule.evaluate(&ctx);
        assert_eq!(outcome.score, 90);
        assert!(outcome.critical);
        assert!(outcome.warnings[0].contains("spender"));
    }

    #[test]
    fn test_function_rule() {
        let t = tables();
        let config = ScoringConfig::default();

        let score = |tx: &TransactionDescriptor| {
            FunctionSignatureRule
                .evaluate(&RuleContext::new(tx, &t, &config))
                .score
        };

        let plain = TransactionDescriptor::new(unknown());
        assert_eq!(score(&plain), 10);

        let short = TransactionDescriptor::new(unknown()).with_data(vec![0x09, 0x5e]);
        assert_eq!(score(&short), 10);

        let unknown_sel =
            TransactionDescriptor::new(unknown()).with_data(vec![0xde, 0xad, 0xbe, 0xef]);
        let outcome = FunctionSignatureRule.evaluate(&RuleContext::new(&unknown_sel, &t, &config));
        assert_eq!(outcome.score, 30);
        assert_eq!(outcome.factors.len(), 1);
    }

    #[test]
    fn test_approval_amounts() {
        let t = tables();
        let config = ScoringConfig::default();
        let spender = unknown();

        let cases = [
            (U256::MAX, 90, true),
            (U256::ZERO, 0, false),
            (U256::from(1_000u64), 40, false),
        ];
        for (amount, score, critical) in cases {
            let tx = TransactionDescriptor::new(unknown())
                .with_data(SwapEncoder::encode_approve(spender, amount));
            let outcome = ApprovalAmountRule.evaluate(&RuleContext::new(&tx, &t, &config));
            assert_eq!(outcome.score, score);
            assert_eq!(outcome.critical, critical);
        }

        let uniswap = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
        let tx = TransactionDescriptor::new(unknown())
            .with_data(SwapEncoder::encode_approve(uniswap, U256::MAX));
        let outcome = ApprovalAmountRule.evaluate(&RuleContext::new(&tx, &t, &config));
        assert_eq!(outcome.score, 90);
        assert!(!outcome.critical);
    }

    #[test]
    fn test_truncated_approval() {
        let t = tables();
        let config = ScoringConfig::default();

        let mut data = vec![0x09, 0x5e, 0xa7, 0xb3];
        data.extend_from_slice(&[0xff; 32]);
        let tx = TransactionDescriptor::new(unknown()).with_data(data);
        let outcome = ApprovalAmountRule.evaluate(&RuleContext::new(&tx, &t, &config));
        assert_eq!(outcome.score, 90);
        assert!(outcome.critical);

        let tx =
            TransactionDescriptor::new(unknown()).with_data(vec![0x09, 0x5e, 0xa7, 0xb3, 0x01]);
        let outcome = ApprovalAmountRule.evaluate(&RuleContext::new(&tx, &t, &config));
        assert_eq!(outcome.score, 60);
    }

    #[test]
    fn test_gas_rule() {
        let t = tables();
        let config = ScoringConfig::default();

        let none = TransactionDescriptor::new(unknown());
        assert!(!GasAnomalyRule.evaluate(&RuleContext::new(&none, &t, &config)).applicable);

        let score = |gas: u64, gwei: u64| {
            let tx = TransactionDescriptor::new(unknown())
                .with_gas(gas, U256::from(gwei * 1_000_000_000));
            GasAnomalyRule
                .evaluate(&RuleContext::new(&tx, &t, &config))
                .score
        };

        assert_eq!(score(21_000, 20), 0);
        // Gas limit above range
        assert_eq!(score(5_000_000, 20), 40);
        // Gas price above range
        assert_eq!(score(21_000, 900), 50);
    }

    #[test]
    fn test_value_rule() {
        let t = tables();
        let config = ScoringConfig::default();

        let small = TransactionDescriptor::new(unknown()).with_value(eth_to_wei(1.0));
        assert_eq!(ValueTransferRule.evaluate(&RuleContext::new(&small, &t, &config)).score, 0);

        let large = TransactionDescriptor::new(unknown()).with_value(eth_to_wei(15.0));
        assert_eq!(ValueTransferRule.evaluate(&RuleContext::new(&large, &t, &config)).score, 60);

        let whale = TransactionDescriptor::new(unknown()).with_value(eth_to_wei(150.0));
        assert_eq!(ValueTransferRule.evaluate(&RuleContext::new(&whale, &t, &config)).score, 85);

        let approval_with_value = TransactionDescriptor::new(unknown())
            .with_data(SwapEncoder::encode_approve(unknown(), U256::from(1u64)))
            .with_value(eth_to_wei(0.1));
        let outcome =
            ValueTransferRule.evaluate(&RuleContext::new(&approval_with_value, &t, &config));
        assert_eq!(outcome.score, 40);
        assert_eq!(outcome.warnings.len(), 1);
    }
}

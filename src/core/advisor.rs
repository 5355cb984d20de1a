//! Advisory facade
//!
//! find route -> build transaction -> score risk -> advisory.
//! Holds the registry and risk tables as swappable snapshots; every call
//! works on the snapshots it loaded at the start.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::registry::{Asset, PoolRegistry};
use crate::core::risk_score::RiskScorer;
use crate::core::router::RouteOptimizer;
use crate::core::tables::RiskTables;
use crate::models::config::AdvisorConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::route::{ImpactSimulation, RouteCandidate, RouteOutcome};
use crate::models::types::{
    parse_address, RawTransaction, RiskAssessment, SwapParams, TransactionDescriptor,
};
use crate::utils::constants::{
    gwei_to_wei, APPROVAL_GAS, EXTRA_HOP_GAS, SWAP_DEADLINE_SECS, VENUE_ROUTERS,
};
use crate::utils::decoder::SwapEncoder;
use crate::utils::snapshot::SnapshotCell;

/// Request for a combined advisory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdviseRequest {
    pub source: String,
    pub destination: String,
    pub amount: f64,
    #[serde(default)]
    pub max_hops: Option<usize>,
    /// Wallet that signs and receives the output
    #[serde(default)]
    pub sender: Option<String>,
}

/// Approval that must be signed before a token-in swap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub transaction: TransactionDescriptor,
    pub assessment: RiskAssessment,
}

/// Route, the transaction that executes it and its risk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Advisory {
    pub route: RouteOutcome,
    pub transaction: Option<TransactionDescriptor>,
    pub assessment: Option<RiskAssessment>,
    pub approval: Option<ApprovalStep>,
    /// True only when a route exists and no step is advised against
    pub proceed: bool,
    pub notes: Vec<String>,
}

pub struct Advisor {
    config: AdvisorConfig,
    registry: SnapshotCell<PoolRegistry>,
    tables: SnapshotCell<RiskTables>,
}

impl Advisor {
    /// Build from explicit snapshots
    pub fn new(
        config: AdvisorConfig,
        registry: PoolRegistry,
        tables: RiskTables,
    ) -> AppResult<Self> {
        let registry = Arc::new(registry);
        // Fails early when the native asset is missing
        RouteOptimizer::new(Arc::clone(&registry), config.routing.clone())?;

        Ok(Self {
            config,
            registry: SnapshotCell::from_arc(registry),
            tables: SnapshotCell::new(tables),
        })
    }

    /// Load the registry and tables named by the config (built-ins otherwise)
    pub fn from_config(config: AdvisorConfig) -> AppResult<Self> {
        let registry = match &config.pools_file {
            Some(path) => PoolRegistry::from_file(path)?,
            None => PoolRegistry::builtin()?,
        };
        let tables = RiskTables::load(
            config.reputation_file.as_deref(),
            config.signatures_file.as_deref(),
        )?;

        info!(
            "🧭 Advisor ready: {} assets, {} pools, {} reputation entries, {} signatures",
            registry.asset_count(),
            registry.pool_count(),
            tables.reputation.len(),
            tables.signatures.len()
        );

        Self::new(config, registry, tables)
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<PoolRegistry> {
        self.registry.load()
    }

    pub fn tables(&self) -> Arc<RiskTables> {
        self.tables.load()
    }

    /// Swap in a new registry; rejected when it lacks the native asset
    pub fn reload_registry(&self, registry: PoolRegistry) -> AppResult<()> {
        let registry = Arc::new(registry);
        RouteOptimizer::new(Arc::clone(&registry), self.config.routing.clone())?;
        info!(
            "🔄 Registry replaced: {} assets, {} pools",
            registry.asset_count(),
            registry.pool_count()
        );
        self.registry.store(registry);
        Ok(())
    }

    pub fn reload_tables(&self, tables: RiskTables) {
        info!(
            "🔄 Risk tables replaced: {} reputation entries, {} signatures",
            tables.reputation.len(),
            tables.signatures.len()
        );
        self.tables.replace(tables);
    }

    fn optimizer(&self) -> AppResult<RouteOptimizer> {
        RouteOptimizer::new(self.registry.load(), self.config.routing.clone())
    }

    fn scorer(&self) -> RiskScorer {
        RiskScorer::new(self.tables.load(), self.config.scoring.clone())
    }

    fn hops_or_default(&self, max_hops: Option<usize>) -> usize {
        max_hops.unwrap_or(self.config.routing.default_max_hops)
    }

    pub fn find_best_route(
        &self,
        source: &str,
        destination: &str,
        amount: f64,
        max_hops: Option<usize>,
    ) -> AppResult<RouteOutcome> {
        self.optimizer()?
            .find_best_route(source, destination, amount, self.hops_or_default(max_hops))
    }

    pub fn simulate_price_impact(
        &self,
        source: &str,
        destination: &str,
        amounts: &[f64],
        max_hops: Option<usize>,
    ) -> AppResult<ImpactSimulation> {
        self.optimizer()?
            .simulate_price_impact(source, destination, amounts, self.hops_or_default(max_hops))
    }

    pub fn analyze(&self, raw: RawTransaction) -> AppResult<RiskAssessment> {
        self.scorer().analyze_raw(raw)
    }

    pub fn analyze_descriptor(&self, tx: &TransactionDescriptor) -> RiskAssessment {
        self.scorer().analyze(tx)
    }

    pub fn check_address(&self, address: &str) -> AppResult<RiskAssessment> {
        self.scorer().check_address(address)
    }

    /// Route, build the swap (and approval) transactions, then score them
    pub fn advise(&self, request: &AdviseRequest) -> AppResult<Advisory> {
        let sender = match request.sender.as_deref() {
            Some(s) => Some(parse_address(s).ok_or_else(|| AppError::invalid_address(s))?),
            None => None,
        };

        // One snapshot of each for the whole advisory
        let registry = self.registry.load();
        let optimizer = RouteOptimizer::new(Arc::clone(&registry), self.config.routing.clone())?;
        let scorer = self.scorer();

        let outcome = optimizer.find_best_route(
            &request.source,
            &request.destination,
            request.amount,
            self.hops_or_default(request.max_hops),
        )?;

        let mut notes = Vec::new();
        let Some(route) = outcome.route() else {
            if let RouteOutcome::NotFound { reason, .. } = &outcome {
                notes.push(format!("No route: {}", reason.as_str()));
            }
            return Ok(Advisory {
                route: outcome,
                transaction: None,
                assessment: None,
                approval: None,
                proceed: false,
                notes,
            });
        };

        if route.hop_count() == 0 {
            notes.push("Source and destination are the same asset; nothing to sign".to_string());
            return Ok(Advisory {
                route: outcome,
                transaction: None,
                assessment: None,
                approval: None,
                proceed: true,
                notes,
            });
        }

        let Some(plan) = self.build_swap(&registry, route, request, sender, &mut notes) else {
            return Ok(Advisory {
                route: outcome,
                transaction: None,
                assessment: None,
                approval: None,
                proceed: false,
                notes,
            });
        };

        let assessment = scorer.analyze(&plan.swap);
        let approval = plan.approval.map(|tx| ApprovalStep {
            assessment: scorer.analyze(&tx),
            transaction: tx,
        });

        let proceed = !assessment.recommend_against
            && approval
                .as_ref()
                .map(|a| !a.assessment.recommend_against)
                .unwrap_or(true);

        debug!(
            "Advisory {} -> {}: {} ({}), proceed={}",
            route.source(),
            route.destination(),
            assessment.score,
            assessment.level.as_str(),
            proceed
        );

        Ok(Advisory {
            route: outcome,
            transaction: Some(plan.swap),
            assessment: Some(assessment),
            approval,
            proceed,
            notes,
        })
    }

    /// Encode the route as a V2-router swap on the first hop's venue
    fn build_swap(
        &self,
        registry: &PoolRegistry,
        route: &RouteCandidate,
        request: &AdviseRequest,
        sender: Option<Address>,
        notes: &mut Vec<String>,
    ) -> Option<SwapPlan> {
        let assets: Vec<&Asset> = route
            .path
            .iter()
            .filter_map(|symbol| registry.asset_by_symbol(symbol))
            .collect();
        let mut path = Vec::with_capacity(assets.len());
        for asset in &assets {
            match asset.address {
                Some(address) => path.push(address),
                None => {
                    notes.push(format!(
                        "No token address for {}; transaction not built",
                        asset.symbol
                    ));
                    return None;
                }
            }
        }
        let (source, destination) = (assets.first()?, assets.last()?);

        let venue = route.hops.first().map(|h| h.venue.as_str()).unwrap_or_default();
        let (router, base_gas) = match VENUE_ROUTERS.iter().find(|(v, _, _)| *v == venue) {
            Some((_, addr, gas)) => (Address::from_str(addr).ok()?, *gas),
            None => {
                notes.push(format!("No router known for venue {}; transaction not built", venue));
                return None;
            }
        };

        let native = &self.config.routing.native_symbol;
        // Native side only when the caller named the alias (ETH), not WETH itself
        let native_in =
            source.symbol == *native && !request.source.eq_ignore_ascii_case(&source.symbol);
        let native_out = destination.symbol == *native
            && !request.destination.eq_ignore_ascii_case(&destination.symbol);
        let recipient = match sender {
            Some(sender) => sender,
            None => {
                notes.push(
                    "No sender given; swap output recipient left as the zero address".to_string(),
                );
                Address::ZERO
            }
        };

        let (Some(amount_in), Some(amount_out_min)) = (
            source.to_base_units(route.input_amount),
            destination.to_base_units(route.minimum_output),
        ) else {
            warn!(
                "Swap amount {} {} does not fit in 256 bits",
                route.input_amount, source.symbol
            );
            notes.push(format!(
                "Amount {} {} exceeds the token's integer range; transaction not built",
                route.input_amount, source.symbol
            ));
            return None;
        };

        let params = SwapParams {
            amount_in,
            amount_out_min,
            path,
            to: recipient,
            deadline: U256::from(
                (chrono::Utc::now().timestamp() + SWAP_DEADLINE_SECS).max(0) as u64,
            ),
        };

        let gas_price = gwei_to_wei(self.config.routing.gas_price_gwei);
        let gas = base_gas + EXTRA_HOP_GAS * (route.hop_count() as u64 - 1);

        let mut swap = TransactionDescriptor::new(router)
            .with_data(SwapEncoder::encode(&params, native_in, native_out))
            .with_gas(gas, gas_price);
        if native_in {
            swap = swap.with_value(params.amount_in);
        }
        if let Some(sender) = sender {
            swap = swap.with_from(sender);
        }

        let approval = match (native_in, source.address) {
            (false, Some(token)) => {
                let mut tx = TransactionDescriptor::new(token)
                    .with_data(SwapEncoder::encode_approve(router, params.amount_in))
                    .with_gas(APPROVAL_GAS, gas_price);
                if let Some(sender) = sender {
                    tx = tx.with_from(sender);
                }
                Some(tx)
            }
            _ => None,
        };

        Some(SwapPlan { swap, approval })
    }
}

struct SwapPlan {
    swap: TransactionDescriptor,
    approval: Option<TransactionDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::Pool;
    use crate::models::route::NotFoundReason;
    use crate::models::types::RiskLevel;

    fn advisor() -> Advisor {
        Advisor::from_config(AdvisorConfig::default()).unwrap()
    }

    fn request(source: &str, destination: &str, amount: f64) -> AdviseRequest {
        AdviseRequest {
            source: source.to_string(),
            destination: destination.to_string(),
            amount,
            max_hops: None,
            sender: Some("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".to_string()),
        }
    }

    #[test]
    fn test_native_swap_has_no_approval() {
        let advisory = advisor().advise(&request("ETH", "USDC", 1.0)).unwrap();
        let tx = advisory.transaction.unwrap();
        assert!(!tx.value.is_zero());
        assert!(advisory.approval.is_none());
        let assessment = advisory.assessment.unwrap();
        assert!(assessment.level <= RiskLevel::Medium, "{:?}", assessment);
        assert!(advisory.proceed);
    }

    #[test]
    fn test_token_swap_builds_exact_approval() {
        let advisory = advisor().advise(&request("USDC", "WETH", 2000.0)).unwrap();
        let tx = advisory.transaction.unwrap();
        assert!(tx.value.is_zero());
        let approval = advisory.approval.unwrap();
        assert!(!approval
            .assessment
            .warnings
            .iter()
            .any(|w| w.contains("Unlimited")));
        assert!(approval.assessment.level < RiskLevel::Critical);
    }

    #[test]
    fn test_oversized_amount_builds_no_transaction() {
        let advisory = advisor().advise(&request("USDC", "WETH", 1e80)).unwrap();
        assert!(advisory.transaction.is_none());
        assert!(!advisory.proceed);
        assert!(!advisory.notes.is_empty());
    }

    #[test]
    fn test_identity_advisory() {
        let advisory = advisor().advise(&request("WETH", "ETH", 1.0)).unwrap();
        assert!(advisory.transaction.is_none());
        assert!(advisory.proceed);
    }

    #[test]
    fn test_unprofitable_advisory_not_built() {
        let advisory = advisor().advise(&request("WETH", "USDC", 1e-9)).unwrap();
        assert!(!advisory.proceed);
        assert!(matches!(
            advisory.route,
            RouteOutcome::NotFound {
                reason: NotFoundReason::NoProfitableRoute,
                ..
            }
        ));
    }

    #[test]
    fn test_bad_sender_rejected() {
        let mut req = request("ETH", "USDC", 1.0);
        req.sender = Some("0xnope".to_string());
        assert!(advisor().advise(&req).is_err());
    }

    #[test]
    fn test_reload_registry_requires_native() {
        let advisor = advisor();
        let registry = PoolRegistry::new(
            vec![Asset::new("USDC", 1.0, 6), Asset::new("DAI", 1.0, 18)],
            vec![Pool::new("USDC", "DAI", "uniswap", 0.001, 1.0, 1e6)],
        )
        .unwrap();
        assert!(advisor.reload_registry(registry).is_err());
        assert_eq!(advisor.registry().asset_count(), 4);
    }
}

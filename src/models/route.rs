//! Route result types produced by the route optimizer

use serde::{Deserialize, Serialize};

/// Shape of a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteType {
    /// Source equals destination, nothing to swap
    Identity,
    /// One pool
    Direct,
    /// Two or more pools
    MultiHop,
}

impl RouteType {
    pub fn from_hops(hops: usize) -> Self {
        match hops {
            0 => RouteType::Identity,
            1 => RouteType::Direct,
            _ => RouteType::MultiHop,
        }
    }
}

/// One pool traversal inside a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteHop {
    /// Stable pool identifier (`venue:A/B`)
    pub pool: String,
    pub venue: String,
    pub asset_in: String,
    pub asset_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    pub fee_rate: f64,
    /// Fee taken, in `asset_in` units
    pub fee_amount: f64,
    pub price_impact: f64,
}

/// Best route between two assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    /// Asset symbols, source first
    pub path: Vec<String>,
    /// Pool identifiers in traversal order
    pub pools: Vec<String>,
    pub hops: Vec<RouteHop>,
    pub route_type: RouteType,
    pub input_amount: f64,
    /// `1 - prod(1 - fee_i)`
    pub fee_rate: f64,
    /// Destination amount after fees and impact, before gas
    pub estimated_output: f64,
    /// `1 - prod(1 - impact_i)`
    pub price_impact: f64,
    pub gas_cost_usd: f64,
    /// Gas cost expressed in destination units
    pub gas_cost_destination: f64,
    /// `estimated_output - gas_cost_destination`
    pub net_output: f64,
    /// Fees, impact and gas in USD; the search objective
    pub total_cost_usd: f64,
    /// Net output per unit of input
    pub exchange_rate: f64,
    /// `estimated_output` less slippage tolerance
    pub minimum_output: f64,
}

impl RouteCandidate {
    /// Number of pools traversed
    pub fn hop_count(&self) -> usize {
        self.pools.len()
    }

    pub fn is_profitable(&self) -> bool {
        self.net_output > 0.0
    }

    pub fn source(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    pub fn destination(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or_default()
    }
}

/// Why no route was returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// Destination unreachable within the hop limit
    NoPathWithinHops,
    /// The cheapest reachable route loses money
    NoProfitableRoute,
}

impl NotFoundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotFoundReason::NoPathWithinHops => "no path within hop limit",
            NotFoundReason::NoProfitableRoute => "no profitable route",
        }
    }
}

/// Result of a route search. `NotFound` is a valid answer, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Found(RouteCandidate),
    NotFound {
        reason: NotFoundReason,
        /// Loss-making candidate kept for diagnostics only
        best_unprofitable: Option<Box<RouteCandidate>>,
    },
}

impl RouteOutcome {
    pub fn route(&self) -> Option<&RouteCandidate> {
        match self {
            RouteOutcome::Found(route) => Some(route),
            RouteOutcome::NotFound { .. } => None,
        }
    }

    pub fn into_route(self) -> Option<RouteCandidate> {
        match self {
            RouteOutcome::Found(route) => Some(route),
            RouteOutcome::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RouteOutcome::Found(_))
    }
}

/// One amount in a price-impact sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSample {
    pub amount: f64,
    /// `None` when no route was found for this amount
    pub estimated_output: Option<f64>,
    pub net_output: Option<f64>,
    pub price_impact: Option<f64>,
    pub gas_cost_usd: Option<f64>,
    pub path: Vec<String>,
    pub not_found: Option<NotFoundReason>,
}

/// Price-impact sweep over several amounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactSimulation {
    pub source: String,
    pub destination: String,
    pub samples: Vec<ImpactSample>,
    pub recommendations: Vec<String>,
}

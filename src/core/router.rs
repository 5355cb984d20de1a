//! Route Optimizer
//!
//! Lowest-cost multi-hop route search over a `PoolRegistry` snapshot.
//!
//! Every pool contributes an A->B and a B->A edge. The search is a Dijkstra
//! variant over `(asset, hops)` states: a popped state is final, extensions
//! past `max_hops` are discarded and a path never revisits an asset. Edge cost
//! is the USD value lost to fee and price impact on the carried amount plus a
//! fixed per-hop gas cost, so costs only grow along a path.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use tracing::debug;

use crate::core::registry::PoolRegistry;
use crate::models::config::RoutingConfig;
use crate::models::errors::{AppError, AppResult};
use crate::models::route::{
    ImpactSample, ImpactSimulation, NotFoundReason, RouteCandidate, RouteHop, RouteOutcome,
    RouteType,
};
use crate::utils::constants::{gas_cost_usd, HIGH_IMPACT_THRESHOLD, OPTIMAL_IMPACT_THRESHOLD};

// ============================================
// Graph
// ============================================

/// Directed traversal of one pool
#[derive(Debug, Clone)]
struct Edge {
    pool: usize,
    to: usize,
    /// Units of `to` per unit of `from`
    rate: f64,
    fee: f64,
    /// Reserve of the input asset
    reserve_in: f64,
}

/// Result of pushing an amount through one edge
#[derive(Debug, Clone, Copy)]
struct HopQuote {
    fee_amount: f64,
    impact: f64,
    amount_out: f64,
}

impl Edge {
    /// Constant-product impact on the post-fee amount
    fn quote(&self, amount_in: f64) -> HopQuote {
        let fee_amount = amount_in * self.fee;
        let effective = amount_in - fee_amount;
        let impact = effective / (self.reserve_in + effective);
        HopQuote {
            fee_amount,
            impact,
            amount_out: effective * self.rate * (1.0 - impact),
        }
    }
}

/// Arena graph: asset index -> outgoing edge indices
#[derive(Debug)]
struct RouteGraph {
    adjacency: Vec<Vec<usize>>,
    edges: Vec<Edge>,
}

impl RouteGraph {
    fn build(registry: &PoolRegistry) -> Self {
        let mut adjacency = vec![Vec::new(); registry.asset_count()];
        let mut edges = Vec::with_capacity(registry.pool_count() * 2);

        for (pool_idx, pool) in registry.pools().iter().enumerate() {
            let (a, b) = registry.endpoints(pool_idx);

            adjacency[a].push(edges.len());
            edges.push(Edge {
                pool: pool_idx,
                to: b,
                rate: pool.rate,
                fee: pool.fee_rate,
                reserve_in: pool.reserve_a(),
            });

            adjacency[b].push(edges.len());
            edges.push(Edge {
                pool: pool_idx,
                to: a,
                rate: 1.0 / pool.rate,
                fee: pool.fee_rate,
                reserve_in: pool.reserve_b(),
            });
        }

        Self { adjacency, edges }
    }
}

// ============================================
// Search state
// ============================================

/// Partial path reaching `asset` after `hops` edges
#[derive(Debug, Clone)]
struct Label {
    asset: usize,
    /// Asset indices, source first
    path: Vec<usize>,
    /// Edge indices in traversal order
    edges: Vec<usize>,
    /// Amount of `asset` carried forward
    amount: f64,
    cost_usd: f64,
}

impl Label {
    fn hops(&self) -> usize {
        self.edges.len()
    }
}

/// Heap entry; ordered so `BinaryHeap` pops the cheapest first
#[derive(Debug)]
struct Frontier {
    cost: f64,
    hops: usize,
    asset_rank: usize,
    path_ranks: Vec<usize>,
    venue_ranks: Vec<usize>,
    label: usize,
}

impl Frontier {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.hops.cmp(&other.hops))
            .then_with(|| self.asset_rank.cmp(&other.asset_rank))
            .then_with(|| self.path_ranks.cmp(&other.path_ranks))
            .then_with(|| self.venue_ranks.cmp(&other.venue_ranks))
    }
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for a min-heap
        other.key_cmp(self)
    }
}

/// Rank of each item in sorted order, so index vectors compare like their names
fn ranks<'a>(names: impl Iterator<Item = &'a str>) -> Vec<usize> {
    let names: Vec<&str> = names.collect();
    let mut order: Vec<usize> = (0..names.len()).collect();
    order.sort_by(|&x, &y| names[x].cmp(names[y]).then(x.cmp(&y)));
    let mut rank = vec![0; names.len()];
    for (position, &idx) in order.iter().enumerate() {
        rank[idx] = position;
    }
    rank
}

// ============================================
// Optimizer
// ============================================

/// Route optimizer over one registry snapshot
pub struct RouteOptimizer {
    registry: Arc<PoolRegistry>,
    config: RoutingConfig,
    native_price_usd: f64,
}

impl RouteOptimizer {
    /// Fails when the configured native asset is not in the registry
    pub fn new(registry: Arc<PoolRegistry>, config: RoutingConfig) -> AppResult<Self> {
        let native_price_usd = registry
            .asset_by_symbol(&config.native_symbol)
            .map(|asset| asset.price_usd)
            .ok_or_else(|| {
                AppError::invalid_config("ADVISOR_NATIVE_SYMBOL", &config.native_symbol)
            })?;

        Ok(Self {
            registry,
            config,
            native_price_usd,
        })
    }

    pub fn registry(&self) -> &Arc<PoolRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Gas cost of one hop in USD
    pub fn gas_cost_per_hop_usd(&self) -> f64 {
        gas_cost_usd(
            self.config.gas_units_per_hop,
            self.config.gas_price_gwei,
            self.native_price_usd,
        )
    }

    /// Find the lowest-cost route from `source` to `destination`.
    ///
    /// `NotFound` is returned (not an error) when nothing reaches the
    /// destination within `max_hops`, or when the cheapest route has a
    /// non-positive net output; in the latter case the loss-making candidate
    /// is attached for diagnostics.
    pub fn find_best_route(
        &self,
        source: &str,
        destination: &str,
        amount: f64,
        max_hops: usize,
    ) -> AppResult<RouteOutcome> {
        let src = self.registry.require(source)?;
        let dst = self.registry.require(destination)?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::invalid_amount(amount));
        }
        if max_hops < 1 {
            return Err(AppError::invalid_hops(max_hops));
        }

        if src == dst {
            return Ok(RouteOutcome::Found(self.identity_route(src, amount)));
        }

        let graph = RouteGraph::build(&self.registry);
        let Some(best) = self.search(&graph, src, dst, amount, max_hops) else {
            debug!(
                "No path {} -> {} within {} hops",
                source, destination, max_hops
            );
            return Ok(RouteOutcome::NotFound {
                reason: NotFoundReason::NoPathWithinHops,
                best_unprofitable: None,
            });
        };

        let candidate = self.materialize(&graph, &best, amount);
        if !candidate.is_profitable() {
            debug!(
                "Cheapest route {} is unprofitable (net {:.6})",
                candidate.path.join(" -> "),
                candidate.net_output
            );
            return Ok(RouteOutcome::NotFound {
                reason: NotFoundReason::NoProfitableRoute,
                best_unprofitable: Some(Box::new(candidate)),
            });
        }

        debug!(
            "Best route {} ({} hops, cost ${:.4})",
            candidate.path.join(" -> "),
            candidate.hop_count(),
            candidate.total_cost_usd
        );
        Ok(RouteOutcome::Found(candidate))
    }

    /// Run `find_best_route` for each amount and summarize price impact
    pub fn simulate_price_impact(
        &self,
        source: &str,
        destination: &str,
        amounts: &[f64],
        max_hops: usize,
    ) -> AppResult<ImpactSimulation> {
        let mut samples = Vec::with_capacity(amounts.len());
        let mut recommendations = Vec::new();

        for &amount in amounts {
            let sample = match self.find_best_route(source, destination, amount, max_hops)? {
                RouteOutcome::Found(route) => {
                    let pct = route.price_impact * 100.0;
                    if route.price_impact > HIGH_IMPACT_THRESHOLD {
                        recommendations.push(format!(
                            "⚠️ Price impact too high for {} ({:.2}%)",
                            amount, pct
                        ));
                    } else if route.price_impact < OPTIMAL_IMPACT_THRESHOLD {
                        recommendations.push(format!(
                            "✅ Optimal price impact for {} ({:.2}%)",
                            amount, pct
                        ));
                    }
                    ImpactSample {
                        amount,
                        estimated_output: Some(route.estimated_output),
                        net_output: Some(route.net_output),
                        price_impact: Some(route.price_impact),
                        gas_cost_usd: Some(route.gas_cost_usd),
                        path: route.path,
                        not_found: None,
                    }
                }
                RouteOutcome::NotFound { reason, .. } => ImpactSample {
                    amount,
                    estimated_output: None,
                    net_output: None,
                    price_impact: None,
                    gas_cost_usd: None,
                    path: Vec::new(),
                    not_found: Some(reason),
                },
            };
            samples.push(sample);
        }

        let canonical = |symbol: &str| {
            self.registry
                .asset_by_symbol(symbol)
                .map(|a| a.symbol.clone())
                .unwrap_or_else(|| symbol.to_uppercase())
        };

        Ok(ImpactSimulation {
            source: canonical(source),
            destination: canonical(destination),
            samples,
            recommendations,
        })
    }

    fn identity_route(&self, asset: usize, amount: f64) -> RouteCandidate {
        RouteCandidate {
            path: vec![self.registry.asset(asset).symbol.clone()],
            pools: Vec::new(),
            hops: Vec::new(),
            route_type: RouteType::Identity,
            input_amount: amount,
            fee_rate: 0.0,
            estimated_output: amount,
            price_impact: 0.0,
            gas_cost_usd: 0.0,
            gas_cost_destination: 0.0,
            net_output: amount,
            total_cost_usd: 0.0,
            exchange_rate: 1.0,
            minimum_output: amount,
        }
    }

    fn search(
        &self,
        graph: &RouteGraph,
        src: usize,
        dst: usize,
        amount: f64,
        max_hops: usize,
    ) -> Option<Label> {
        let registry = &self.registry;
        let asset_rank = ranks(registry.assets().iter().map(|a| a.symbol.as_str()));
        let venue_rank = ranks(registry.pools().iter().map(|p| p.venue.as_str()));
        let gas_per_hop = self.gas_cost_per_hop_usd();

        let mut labels: Vec<Label> = Vec::new();
        let mut settled: HashSet<(usize, usize)> = HashSet::new();
        let mut heap = BinaryHeap::new();

        labels.push(Label {
            asset: src,
            path: vec![src],
            edges: Vec::new(),
            amount,
            cost_usd: 0.0,
        });
        heap.push(Frontier {
            cost: 0.0,
            hops: 0,
            asset_rank: asset_rank[src],
            path_ranks: vec![asset_rank[src]],
            venue_ranks: Vec::new(),
            label: 0,
        });

        while let Some(entry) = heap.pop() {
            let label = labels[entry.label].clone();
            if !settled.insert((label.asset, label.hops())) {
                continue;
            }
            if label.asset == dst {
                return Some(label);
            }
            if label.hops() >= max_hops {
                continue;
            }

            let carried_value = registry.asset(label.asset).value_usd(label.amount);
            for &edge_idx in &graph.adjacency[label.asset] {
                let edge = &graph.edges[edge_idx];
                if label.path.contains(&edge.to) || settled.contains(&(edge.to, label.hops() + 1)) {
                    continue;
                }

                let quote = edge.quote(label.amount);
                let retained = (1.0 - edge.fee) * (1.0 - quote.impact);
                let step_cost = carried_value * (1.0 - retained) + gas_per_hop;

                let mut path = label.path.clone();
                path.push(edge.to);
                let mut edges = label.edges.clone();
                edges.push(edge_idx);

                let next = Label {
                    asset: edge.to,
                    path,
                    edges,
                    amount: quote.amount_out,
                    cost_usd: label.cost_usd + step_cost,
                };

                heap.push(Frontier {
                    cost: next.cost_usd,
                    hops: next.hops(),
                    asset_rank: asset_rank[next.asset],
                    path_ranks: next.path.iter().map(|&a| asset_rank[a]).collect(),
                    venue_ranks: next
                        .edges
                        .iter()
                        .map(|&e| venue_rank[graph.edges[e].pool])
                        .collect(),
                    label: labels.len(),
                });
                labels.push(next);
            }
        }

        None
    }

    /// Replay a finalized label into a full candidate with per-hop detail
    fn materialize(&self, graph: &RouteGraph, label: &Label, amount: f64) -> RouteCandidate {
        let registry = &self.registry;
        let mut hops = Vec::with_capacity(label.edges.len());
        let mut carried = amount;
        let mut retained_fee = 1.0;
        let mut retained_impact = 1.0;

        for (i, &edge_idx) in label.edges.iter().enumerate() {
            let edge = &graph.edges[edge_idx];
            let pool = &registry.pools()[edge.pool];
            let quote = edge.quote(carried);

            hops.push(RouteHop {
                pool: pool.id(),
                venue: pool.venue.clone(),
                asset_in: registry.asset(label.path[i]).symbol.clone(),
                asset_out: registry.asset(edge.to).symbol.clone(),
                amount_in: carried,
                amount_out: quote.amount_out,
                fee_rate: edge.fee,
                fee_amount: quote.fee_amount,
                price_impact: quote.impact,
            });

            retained_fee *= 1.0 - edge.fee;
            retained_impact *= 1.0 - quote.impact;
            carried = quote.amount_out;
        }

        let destination = registry.asset(label.asset);
        let hop_count = hops.len();
        let gas_cost_usd = self.gas_cost_per_hop_usd() * hop_count as f64;
        let gas_cost_destination = gas_cost_usd / destination.price_usd;
        let net_output = carried - gas_cost_destination;

        RouteCandidate {
            path: label
                .path
                .iter()
                .map(|&a| registry.asset(a).symbol.clone())
                .collect(),
            pools: hops.iter().map(|h| h.pool.clone()).collect(),
            hops,
            route_type: RouteType::from_hops(hop_count),
            input_amount: amount,
            fee_rate: (1.0 - retained_fee).max(0.0),
            estimated_output: carried,
            price_impact: (1.0 - retained_impact).max(0.0),
            gas_cost_usd,
            gas_cost_destination,
            net_output,
            total_cost_usd: label.cost_usd,
            exchange_rate: net_output / amount,
            minimum_output: carried * (1.0 - self.config.slippage_tolerance),
        }
    }
}

//! Pool Registry
//!
//! Immutable table of assets and trading venues. Loaded (and validated) once,
//! then shared as an `Arc<PoolRegistry>` snapshot. Malformed data is rejected
//! here so the route optimizer never sees it.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::try_to_base_units;

/// Fungible asset known to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique identifier (upper-case)
    pub symbol: String,
    /// Reference USD price used for cost comparison
    pub price_usd: f64,
    pub decimals: u8,
    /// Alternative symbols routed as this asset (e.g. ETH for WETH)
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Token contract, when known
    #[serde(default)]
    pub address: Option<Address>,
}

impl Asset {
    pub fn new(symbol: &str, price_usd: f64, decimals: u8) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            price_usd,
            decimals,
            aliases: Vec::new(),
            address: None,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_uppercase());
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = Address::from_str(address).ok();
        self
    }

    /// Scale a decimal amount into integer base units; `None` past 256 bits
    pub fn to_base_units(&self, amount: f64) -> Option<U256> {
        try_to_base_units(amount, self.decimals)
    }

    /// USD value of `amount` at the reference price
    #[inline]
    pub fn value_usd(&self, amount: f64) -> f64 {
        amount * self.price_usd
    }
}

/// Trading venue for an unordered asset pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub asset_a: String,
    pub asset_b: String,
    pub venue: String,
    /// Fraction taken per swap, in (0, 1)
    pub fee_rate: f64,
    /// Quoted units of B per unit of A
    pub rate: f64,
    /// A-side reserve; the B-side reserve is `liquidity_depth * rate`
    pub liquidity_depth: f64,
}

impl Pool {
    pub fn new(
        asset_a: &str,
        asset_b: &str,
        venue: &str,
        fee_rate: f64,
        rate: f64,
        depth: f64,
    ) -> Self {
        Self {
            asset_a: asset_a.to_uppercase(),
            asset_b: asset_b.to_uppercase(),
            venue: venue.to_string(),
            fee_rate,
            rate,
            liquidity_depth: depth,
        }
    }

    /// Stable identifier `venue:A/B`
    pub fn id(&self) -> String {
        format!("{}:{}/{}", self.venue, self.asset_a, self.asset_b)
    }

    #[inline]
    pub fn reserve_a(&self) -> f64 {
        self.liquidity_depth
    }

    #[inline]
    pub fn reserve_b(&self) -> f64 {
        self.liquidity_depth * self.rate
    }
}

/// On-disk registry layout
#[derive(Debug, Deserialize)]
struct RegistryFile {
    assets: Vec<Asset>,
    pools: Vec<Pool>,
}

/// Validated asset + pool snapshot
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    assets: Vec<Asset>,
    pools: Vec<Pool>,
    /// (asset_a index, asset_b index) per pool
    endpoints: Vec<(usize, usize)>,
    /// Symbol or alias (upper-case) -> asset index
    index: HashMap<String, usize>,
}

impl PoolRegistry {
    /// Validate and index assets and pools
    pub fn new(assets: Vec<Asset>, pools: Vec<Pool>) -> AppResult<Self> {
        let mut index = HashMap::new();
        let mut normalized = Vec::with_capacity(assets.len());

        for (i, mut asset) in assets.into_iter().enumerate() {
            asset.symbol = asset.symbol.trim().to_uppercase();
            if asset.symbol.is_empty() {
                return Err(AppError::registry_load(format!("Asset #{} has an empty symbol", i)));
            }
            if !asset.price_usd.is_finite() || asset.price_usd <= 0.0 {
                return Err(AppError::registry_load(format!(
                    "Asset {} has non-positive price {}",
                    asset.symbol, asset.price_usd
                )));
            }
            asset.aliases = asset.aliases.iter().map(|a| a.trim().to_uppercase()).collect();

            let keys = std::iter::once(asset.symbol.clone()).chain(asset.aliases.iter().cloned());
            for key in keys {
                if index.insert(key.clone(), i).is_some() {
                    return Err(AppError::registry_load(format!(
                        "Duplicate asset symbol or alias: {}",
                        key
                    )));
                }
            }
            normalized.push(asset);
        }

        let mut endpoints = Vec::with_capacity(pools.len());
        let mut seen = HashSet::new();
        let mut checked = Vec::with_capacity(pools.len());

        for mut pool in pools {
            let a = *index
                .get(&pool.asset_a.trim().to_uppercase())
                .ok_or_else(|| {
                    AppError::registry_load(format!(
                        "Pool {} references unknown asset {}",
                        pool.id(),
                        pool.asset_a
                    ))
                })?;
            let b = *index
                .get(&pool.asset_b.trim().to_uppercase())
                .ok_or_else(|| {
                    AppError::registry_load(format!(
                        "Pool {} references unknown asset {}",
                        pool.id(),
                        pool.asset_b
                    ))
                })?;

            // Aliases collapse onto canonical symbols
            pool.asset_a = normalized[a].symbol.clone();
            pool.asset_b = normalized[b].symbol.clone();

            if a == b {
                return Err(AppError::registry_load(format!("Pool {} is a self-loop", pool.id())));
            }
            if pool.venue.trim().is_empty() {
                return Err(AppError::registry_load(format!("Pool {} has no venue", pool.id())));
            }
            if !(pool.fee_rate > 0.0 && pool.fee_rate < 1.0) {
                return Err(AppError::registry_load(format!(
                    "Pool {} fee rate {} outside (0, 1)",
                    pool.id(),
                    pool.fee_rate
                )));
            }
            if !pool.rate.is_finite() || pool.rate <= 0.0 {
                return Err(AppError::registry_load(format!(
                    "Pool {} has non-positive rate {}",
                    pool.id(),
                    pool.rate
                )));
            }
            if !pool.liquidity_depth.is_finite() || pool.liquidity_depth <= 0.0 {
                return Err(AppError::registry_load(format!(
                    "Pool {} has non-positive liquidity depth {}",
                    pool.id(),
                    pool.liquidity_depth
                )));
            }

            let pair = if a < b { (a, b) } else { (b, a) };
            if !seen.insert((pool.venue.clone(), pair)) {
                return Err(AppError::registry_load(format!("Duplicate pool {}", pool.id())));
            }

            endpoints.push((a, b));
            checked.push(pool);
        }

        debug!(
            "Registry validated: {} assets, {} pools",
            normalized.len(),
            checked.len()
        );

        Ok(Self {
            assets: normalized,
            pools: checked,
            endpoints,
            index,
        })
    }

    /// Parse `{assets: [...], pools: [...]}`
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let file: RegistryFile = serde_json::from_str(json)?;
        Self::new(file.assets, file.pools)
    }

    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::with_source(
                crate::models::errors::ErrorCode::RegistryLoadError,
                format!("Cannot read pool registry {}", path.display()),
                e,
            )
        })?;
        let registry = Self::from_json_str(&json)?;
        info!(
            "📚 Pool registry loaded from {}: {} assets, {} pools",
            path.display(),
            registry.assets.len(),
            registry.pools.len()
        );
        Ok(registry)
    }

    /// Simulated venues: Uniswap, SushiSwap and 1inch over WETH/USDC/RISE/DAI
    pub fn builtin() -> AppResult<Self> {
        let assets = vec![
            Asset::new("WETH", 2000.0, 18)
                .with_alias("ETH")
                .with_address("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            Asset::new("USDC", 1.0, 6).with_address("0x8A93d247134d91e0de6f96547cB0204e5BE8e5D8"),
            Asset::new("RISE", 0.05, 18).with_address("0xd6e1afe5cA8D00A2EFC01B89997abE2De47fdfAf"),
            Asset::new("DAI", 1.0, 18).with_address("0x6B175474E89094C44Da98b954EedeAC495271d0F"),
        ];

        let pools = vec![
            Pool::new("WETH", "USDC", "uniswap", 0.003, 2000.0, 1000.0),
            Pool::new("WETH", "RISE", "uniswap", 0.003, 40_000.0, 100.0),
            Pool::new("USDC", "RISE", "uniswap", 0.003, 20.0, 50_000.0),
            Pool::new("USDC", "DAI", "uniswap", 0.001, 1.0, 1_000_000.0),
            Pool::new("WETH", "USDC", "sushiswap", 0.0025, 2000.0, 800.0),
            Pool::new("RISE", "USDC", "sushiswap", 0.0025, 0.05, 2_000_000.0),
            Pool::new("WETH", "USDC", "1inch", 0.001, 2000.0, 1200.0),
            Pool::new("RISE", "WETH", "1inch", 0.002, 0.000025, 5_000_000.0),
        ];

        Self::new(assets, pools)
    }

    /// Resolve a symbol or alias to its asset index
    pub fn resolve(&self, symbol: &str) -> Option<usize> {
        self.index.get(&symbol.trim().to_uppercase()).copied()
    }

    /// Resolve a symbol or alias, failing with `UnknownAsset`
    pub fn require(&self, symbol: &str) -> AppResult<usize> {
        self.resolve(symbol).ok_or_else(|| AppError::unknown_asset(symbol))
    }

    pub fn asset_by_symbol(&self, symbol: &str) -> Option<&Asset> {
        self.resolve(symbol).map(|i| &self.assets[i])
    }

    #[inline]
    pub fn asset(&self, index: usize) -> &Asset {
        &self.assets[index]
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    /// Asset indices (a, b) of pool `index`
    #[inline]
    pub fn endpoints(&self, index: usize) -> (usize, usize) {
        self.endpoints[index]
    }

    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    fn two_assets() -> Vec<Asset> {
        vec![Asset::new("WETH", 2000.0, 18), Asset::new("USDC", 1.0, 6)]
    }

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = PoolRegistry::builtin().unwrap();
        assert_eq!(registry.asset_count(), 4);
        assert_eq!(registry.pool_count(), 8);
        assert_eq!(registry.resolve("eth"), registry.resolve("WETH"));
    }

    #[test]
    fn test_rejects_self_loop() {
        let err = PoolRegistry::new(
            two_assets(),
            vec![Pool::new("WETH", "WETH", "uniswap", 0.003, 1.0, 10.0)],
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistryLoadError);
        assert!(err.message.contains("self-loop"));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let cases = [
            Pool::new("WETH", "USDC", "uniswap", 1.0, 2000.0, 10.0),
            Pool::new("WETH", "USDC", "uniswap", 0.0, 2000.0, 10.0),
            Pool::new("WETH", "USDC", "uniswap", -0.1, 2000.0, 10.0),
            Pool::new("WETH", "USDC", "uniswap", f64::NAN, 2000.0, 10.0),
            Pool::new("WETH", "USDC", "uniswap", 0.003, 0.0, 10.0),
            Pool::new("WETH", "USDC", "uniswap", 0.003, 2000.0, -5.0),
            Pool::new("WETH", "USDC", "uniswap", 0.003, f64::NAN, 10.0),
        ];
        for pool in cases {
            let result = PoolRegistry::new(two_assets(), vec![pool]);
            assert_eq!(result.unwrap_err().code, ErrorCode::RegistryLoadError);
        }
    }

    #[test]
    fn test_rejects_unknown_asset_and_duplicates() {
        let err = PoolRegistry::new(
            two_assets(),
            vec![Pool::new("WETH", "DAI", "uniswap", 0.003, 2000.0, 10.0)],
        )
        .unwrap_err();
        assert!(err.message.contains("DAI"));

        let mut assets = two_assets();
        assets.push(Asset::new("usdc", 1.0, 6));
        assert!(PoolRegistry::new(assets, vec![]).is_err());

        let mut assets = two_assets();
        assets[1].price_usd = 0.0;
        assert!(PoolRegistry::new(assets, vec![]).is_err());
    }

    #[test]
    fn test_alias_pools_are_canonicalized() {
        let assets = vec![
            Asset::new("WETH", 2000.0, 18).with_alias("ETH"),
            Asset::new("USDC", 1.0, 6),
        ];
        let registry = PoolRegistry::new(
            assets,
            vec![Pool::new("ETH", "USDC", "uniswap", 0.003, 2000.0, 10.0)],
        )
        .unwrap();
        assert_eq!(registry.pools()[0].asset_a, "WETH");
        assert_eq!(registry.pools()[0].id(), "uniswap:WETH/USDC");
    }

    #[test]
    fn test_from_json_str() {
        let json = r#"{
            "assets": [
                {"symbol": "WETH", "price_usd": 2000.0, "decimals": 18},
                {"symbol": "USDC", "price_usd": 1.0, "decimals": 6}
            ],
            "pools": [
                {"asset_a": "WETH", "asset_b": "USDC", "venue": "uniswap",
                 "fee_rate": 0.003, "rate": 2000.0, "liquidity_depth": 1000.0}
            ]
        }"#;
        let registry = PoolRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.pools()[0].reserve_b(), 2_000_000.0);

        let err = PoolRegistry::from_json_str("{\"assets\": 3}").unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistryLoadError);
    }

    #[test]
    fn test_to_base_units() {
        let registry = PoolRegistry::builtin().unwrap();
        let usdc = registry.asset_by_symbol("USDC").unwrap();
        assert_eq!(usdc.to_base_units(2.5), Some(U256::from(2_500_000u64)));
        assert_eq!(usdc.to_base_units(1e80), None);
    }
}

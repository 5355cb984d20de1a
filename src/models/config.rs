//! Configuration module for the Swap Advisor
//!
//! Defaults come from utils/constants.rs; environment variables override them.

use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    DEFAULT_GAS_PRICE_GWEI, DEFAULT_GAS_UNITS_PER_HOP, DEFAULT_LARGE_VALUE_ETH,
    DEFAULT_MAX_GAS_PRICE_GWEI, DEFAULT_MAX_HOPS, DEFAULT_MIN_GAS_PRICE_GWEI,
    DEFAULT_NATIVE_SYMBOL, DEFAULT_RECOMMEND_AGAINST_SCORE, DEFAULT_SLIPPAGE_TOLERANCE,
    MAX_ALLOWED_HOPS,
};

/// Route optimizer tunables
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    /// Gas units charged per hop
    pub gas_units_per_hop: u64,
    /// Gas price for cost estimates (gwei)
    pub gas_price_gwei: f64,
    /// Asset whose reference price converts gas to USD
    pub native_symbol: String,
    /// Hop limit when the caller does not pass one
    pub default_max_hops: usize,
    /// Slippage applied to `minimum_output`
    pub slippage_tolerance: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            gas_units_per_hop: DEFAULT_GAS_UNITS_PER_HOP,
            gas_price_gwei: DEFAULT_GAS_PRICE_GWEI,
            native_symbol: DEFAULT_NATIVE_SYMBOL.to_string(),
            default_max_hops: DEFAULT_MAX_HOPS,
            slippage_tolerance: DEFAULT_SLIPPAGE_TOLERANCE,
        }
    }
}

/// Risk scorer tunables
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Native value above which a transfer is flagged (ETH)
    pub large_value_eth: f64,
    /// Score at or above which `recommend_against` is set
    pub recommend_against_score: u8,
    /// Gas price band considered normal (gwei)
    pub min_gas_price_gwei: f64,
    pub max_gas_price_gwei: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            large_value_eth: DEFAULT_LARGE_VALUE_ETH,
            recommend_against_score: DEFAULT_RECOMMEND_AGAINST_SCORE,
            min_gas_price_gwei: DEFAULT_MIN_GAS_PRICE_GWEI,
            max_gas_price_gwei: DEFAULT_MAX_GAS_PRICE_GWEI,
        }
    }
}

/// Top-level advisor configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorConfig {
    pub routing: RoutingConfig,
    pub scoring: ScoringConfig,
    /// Pool registry JSON; built-in registry when unset
    pub pools_file: Option<PathBuf>,
    /// Reputation table JSON; built-in lists when unset
    pub reputation_file: Option<PathBuf>,
    /// Signature table JSON; built-in table when unset
    pub signatures_file: Option<PathBuf>,
    /// API bind host
    pub host: String,
    /// API port
    pub port: u16,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            scoring: ScoringConfig::default(),
            pools_file: None,
            reputation_file: None,
            signatures_file: None,
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl AdvisorConfig {
    /// Build configuration from `ADVISOR_*` environment variables.
    ///
    /// Unset variables keep their defaults; set-but-invalid values are
    /// rejected with `CFG_INVALID_VALUE` instead of being ignored.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse_var::<f64, _>(&lookup, "ADVISOR_GAS_PRICE_GWEI")? {
            if !v.is_finite() || v < 0.0 {
                return Err(AppError::invalid_config("ADVISOR_GAS_PRICE_GWEI", &v.to_string()));
            }
            config.routing.gas_price_gwei = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "ADVISOR_GAS_UNITS_PER_HOP")? {
            config.routing.gas_units_per_hop = v;
        }
        if let Some(v) = lookup("ADVISOR_NATIVE_SYMBOL").filter(|s| !s.trim().is_empty()) {
            config.routing.native_symbol = v.trim().to_uppercase();
        }
        if let Some(v) = parse_var::<usize, _>(&lookup, "ADVISOR_MAX_HOPS")? {
            if v < 1 || v > MAX_ALLOWED_HOPS {
                return Err(AppError::invalid_config("ADVISOR_MAX_HOPS", &v.to_string()));
            }
            config.routing.default_max_hops = v;
        }
        if let Some(v) = parse_var::<f64, _>(&lookup, "ADVISOR_LARGE_VALUE_ETH")? {
            if !v.is_finite() || v <= 0.0 {
                return Err(AppError::invalid_config("ADVISOR_LARGE_VALUE_ETH", &v.to_string()));
            }
            config.scoring.large_value_eth = v;
        }
        if let Some(v) = parse_var::<u8, _>(&lookup, "ADVISOR_RECOMMEND_AGAINST_SCORE")? {
            if v > 100 {
                return Err(AppError::invalid_config(
                    "ADVISOR_RECOMMEND_AGAINST_SCORE",
                    &v.to_string(),
                ));
            }
            config.scoring.recommend_against_score = v;
        }

        config.pools_file = lookup("ADVISOR_POOLS_FILE").map(PathBuf::from);
        config.reputation_file = lookup("ADVISOR_REPUTATION_FILE").map(PathBuf::from);
        config.signatures_file = lookup("ADVISOR_SIGNATURES_FILE").map(PathBuf::from);

        if let Some(host) = lookup("ADVISOR_HOST").filter(|s| !s.is_empty()) {
            config.host = host;
        }
        let port = match parse_var::<u16, _>(&lookup, "ADVISOR_PORT")? {
            Some(p) => Some(p),
            None => parse_var::<u16, _>(&lookup, "PORT")?,
        };
        if let Some(port) = port {
            config.port = port;
        }

        info!(
            "⚙️  Config: gas {} gwei x {} units/hop, native {}, max hops {}",
            config.routing.gas_price_gwei,
            config.routing.gas_units_per_hop,
            config.routing.native_symbol,
            config.routing.default_max_hops
        );

        Ok(config)
    }

    /// Bind address for the API server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> AppResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::invalid_config(key, &raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = AdvisorConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, AdvisorConfig::default());
        assert_eq!(config.routing.gas_units_per_hop, 50_000);
        assert_eq!(config.scoring.recommend_against_score, 60);
    }

    #[test]
    fn test_env_overrides() {
        let config = AdvisorConfig::from_lookup(lookup_from(&[
            ("ADVISOR_GAS_PRICE_GWEI", "12.5"),
            ("ADVISOR_MAX_HOPS", "2"),
            ("ADVISOR_NATIVE_SYMBOL", "weth"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(config.routing.gas_price_gwei, 12.5);
        assert_eq!(config.routing.default_max_hops, 2);
        assert_eq!(config.routing.native_symbol, "WETH");
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AdvisorConfig::from_lookup(lookup_from(&[("ADVISOR_MAX_HOPS", "0")]))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigInvalidValue);

        let err = AdvisorConfig::from_lookup(lookup_from(&[("ADVISOR_GAS_PRICE_GWEI", "fast")]))
            .unwrap_err();
        assert!(err.message.contains("ADVISOR_GAS_PRICE_GWEI"));
    }
}

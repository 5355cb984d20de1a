//! Constants Module - Single Source of Truth
//!
//! Every tunable default, sentinel and conversion helper used by the route
//! optimizer and risk scorer lives here. Runtime overrides go through
//! `models::config::AdvisorConfig`.

use alloy_primitives::U256;

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "SwapAdvisor";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// ROUTING DEFAULTS
// ============================================

/// Default hop limit for route search
pub const DEFAULT_MAX_HOPS: usize = 3;

/// Hard ceiling on hop limit accepted from callers
pub const MAX_ALLOWED_HOPS: usize = 6;

/// Gas units charged per hop (a direct swap is ~50k, two hops ~100k)
pub const DEFAULT_GAS_UNITS_PER_HOP: u64 = 50_000;

/// Gas price used for route cost estimates (gwei)
pub const DEFAULT_GAS_PRICE_GWEI: f64 = 5.0;

/// Asset whose reference price converts gas to USD
pub const DEFAULT_NATIVE_SYMBOL: &str = "WETH";

/// Slippage tolerance applied to `minimum_output` (0.5%)
pub const DEFAULT_SLIPPAGE_TOLERANCE: f64 = 0.005;

/// Price impact above which an amount is flagged as too large (5%)
pub const HIGH_IMPACT_THRESHOLD: f64 = 0.05;

/// Price impact below which an amount is considered optimal (1%)
pub const OPTIMAL_IMPACT_THRESHOLD: f64 = 0.01;

// ============================================
// RISK SCORING DEFAULTS
// ============================================

/// Sub-score for an address on neither list
pub const NEUTRAL_ADDRESS_SCORE: u8 = 30;

/// Sub-score for a known-bad address
pub const BAD_ADDRESS_SCORE: u8 = 90;

/// Sub-score for an allowlisted address
pub const GOOD_ADDRESS_SCORE: u8 = 5;

/// Added when an address has a vanity/poisoning-like shape
pub const SUSPICIOUS_PATTERN_PENALTY: u8 = 30;

/// Zero nibbles above which an address looks suspicious
pub const SUSPICIOUS_ZERO_NIBBLES: usize = 35;

/// Repetitions of one nibble above which an address looks suspicious
pub const SUSPICIOUS_REPEATED_NIBBLES: usize = 30;

/// Sub-score for calldata whose selector is not in the table
pub const UNKNOWN_SELECTOR_SCORE: u8 = 30;

/// Sub-score for a call without a function (plain value transfer)
pub const NO_FUNCTION_SCORE: u8 = 10;

/// Sub-score for an unlimited approval
pub const UNLIMITED_APPROVAL_SCORE: u8 = 90;

/// Sub-score for a bounded approval
pub const LIMITED_APPROVAL_SCORE: u8 = 40;

/// Sub-score for approval calldata that does not decode
pub const UNDECODABLE_APPROVAL_SCORE: u8 = 60;

/// Rule weights (sum to 1.0)
pub const WEIGHT_ADDRESS: f32 = 0.35;
pub const WEIGHT_FUNCTION: f32 = 0.30;
pub const WEIGHT_APPROVAL: f32 = 0.15;
pub const WEIGHT_GAS: f32 = 0.10;
pub const WEIGHT_VALUE: f32 = 0.10;

/// Level boundaries: LOW < 30, MEDIUM 30-59, HIGH 60-84, CRITICAL >= 85
pub const MEDIUM_RISK_FLOOR: u8 = 30;
pub const HIGH_RISK_FLOOR: u8 = 60;
pub const CRITICAL_RISK_FLOOR: u8 = 85;

/// Score at or above which proceeding is advised against
pub const DEFAULT_RECOMMEND_AGAINST_SCORE: u8 = 60;

/// Native value (ETH) considered a large transfer
pub const DEFAULT_LARGE_VALUE_ETH: f64 = 10.0;

/// Gas price band considered normal (gwei)
pub const DEFAULT_MIN_GAS_PRICE_GWEI: f64 = 0.01;
pub const DEFAULT_MAX_GAS_PRICE_GWEI: f64 = 300.0;

/// Intrinsic gas of any transaction
pub const INTRINSIC_GAS: u64 = 21_000;

/// Approval amounts at or above 2^255 are treated as unlimited
pub fn unlimited_approval_threshold() -> U256 {
    U256::from(1u8) << 255
}

// ============================================
// DEFAULT REGISTRY DATA
// ============================================

/// Allowlisted router/aggregator addresses
pub const KNOWN_GOOD_ADDRESSES: [(&str, &str); 6] = [
    ("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D", "Uniswap V2 Router"),
    ("0xE592427A0AEce92De3Edee1F18E0157C05861564", "Uniswap V3 Router"),
    ("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45", "Uniswap V3 Router 2"),
    ("0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F", "SushiSwap Router"),
    ("0x1111111254fb6c44bAC0beD2854e76F90643097d", "1inch Router V4"),
    ("0x1111111254EEB25477B68fb85Ed929f73A960582", "1inch Router V5"),
];

/// Locally blacklisted addresses
pub const KNOWN_BAD_ADDRESSES: [(&str, &str); 2] = [
    ("0x1f9840a85d5af5bf1d1762f925bdaddc4201f984", "Fake Uniswap token"),
    ("0x514910771af9ca656af840dff83e8264ecf986ca", "Suspicious contract"),
];

/// Router per venue with its swap gas estimate (venue, router, gas)
pub const VENUE_ROUTERS: [(&str, &str, u64); 3] = [
    ("uniswap", "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D", 150_000),
    ("sushiswap", "0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F", 140_000),
    ("1inch", "0x1111111254fb6c44bAC0beD2854e76F90643097d", 200_000),
];

/// Gas added per extra hop of a multi-hop swap
pub const EXTRA_HOP_GAS: u64 = 50_000;

/// Gas limit for an ERC-20 approval
pub const APPROVAL_GAS: u64 = 50_000;

/// Swap deadline offset from now (seconds)
pub const SWAP_DEADLINE_SECS: i64 = 1_200;

// ============================================
// CONVERSION UTILITIES
// ============================================

/// Convert wei to ETH (or native token)
#[inline]
pub fn wei_to_eth(wei: U256) -> f64 {
    let wei_u128: u128 = wei.try_into().unwrap_or(u128::MAX);
    wei_u128 as f64 / 1e18
}

/// Convert wei to gwei
#[inline]
pub fn wei_to_gwei(wei: U256) -> f64 {
    let wei_u128: u128 = wei.try_into().unwrap_or(u128::MAX);
    wei_u128 as f64 / 1e9
}

/// Convert gwei to wei
#[inline]
pub fn gwei_to_wei(gwei: f64) -> U256 {
    to_base_units(gwei, 9)
}

/// Convert ETH to wei
#[inline]
pub fn eth_to_wei(eth: f64) -> U256 {
    to_base_units(eth, 18)
}

/// Scale a decimal amount into integer base units, saturating at `U256::MAX`
#[inline]
pub fn to_base_units(amount: f64, decimals: u8) -> U256 {
    try_to_base_units(amount, decimals).unwrap_or(U256::MAX)
}

/// Scale a decimal amount into integer base units.
///
/// Non-positive amounts scale to zero. Returns `None` when the scaled value
/// does not fit in 256 bits.
pub fn try_to_base_units(amount: f64, decimals: u8) -> Option<U256> {
    if amount.is_nan() || amount <= 0.0 {
        return Some(U256::ZERO);
    }
    let scaled = (amount * 10f64.powi(decimals as i32)).round();
    if !scaled.is_finite() {
        return None;
    }
    if scaled < 18_446_744_073_709_551_616.0 {
        return Some(U256::from(scaled as u64));
    }

    // Integral above 2^64: mantissa * 2^exponent, shifted without loss
    let bits = scaled.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as usize - 1075;
    let mantissa = (bits & ((1u64 << 52) - 1)) | (1u64 << 52);
    U256::from(mantissa).checked_shl(exponent)
}

/// Gas cost in USD for `gas_units` at `gas_price_gwei`
#[inline]
pub fn gas_cost_usd(gas_units: u64, gas_price_gwei: f64, native_price_usd: f64) -> f64 {
    gas_units as f64 * gas_price_gwei * 1e-9 * native_price_usd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wei_to_eth() {
        let one_eth = U256::from(1_000_000_000_000_000_000u128);
        assert!((wei_to_eth(one_eth) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_eth_to_wei() {
        let wei = eth_to_wei(1.5);
        assert_eq!(wei, U256::from(1_500_000_000_000_000_000u128));
    }

    #[test]
    fn test_to_base_units_usdc() {
        assert_eq!(to_base_units(12.5, 6), U256::from(12_500_000u64));
        assert_eq!(to_base_units(-1.0, 6), U256::ZERO);
    }

    #[test]
    fn test_base_units_beyond_u128() {
        // 1e21 tokens at 18 decimals no longer clamps to u128::MAX
        let big = try_to_base_units(1e21, 18).unwrap();
        assert!(big > U256::from(u128::MAX));
        assert_eq!(
            try_to_base_units(2f64.powi(100), 0),
            Some(U256::from(1u128 << 100))
        );

        assert!(try_to_base_units(1e60, 18).is_none());
        assert!(try_to_base_units(f64::INFINITY, 0).is_none());
        assert_eq!(to_base_units(1e60, 18), U256::MAX);
    }

    #[test]
    fn test_gas_cost_usd() {
        // 50k gas * 5 gwei * $2000
        assert!((gas_cost_usd(50_000, 5.0, 2000.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unlimited_threshold_below_max() {
        assert!(U256::MAX >= unlimited_approval_threshold());
        assert!(U256::from(u128::MAX) < unlimited_approval_threshold());
    }
}

//! Type definitions for the risk scorer
//! Transaction descriptors, risk factors and the assessment result

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{
    wei_to_eth, CRITICAL_RISK_FLOOR, HIGH_RISK_FLOOR, MEDIUM_RISK_FLOOR,
};

/// Risk level classification for transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Score below 30
    Low,
    /// Score 30-59
    Medium,
    /// Score 60-84
    High,
    /// Score 85+ or a rule flagged a critical condition
    Critical,
}

impl RiskLevel {
    /// Classify a numeric score
    pub fn from_score(score: u8) -> Self {
        match score {
            s if s >= CRITICAL_RISK_FLOOR => RiskLevel::Critical,
            s if s >= HIGH_RISK_FLOOR => RiskLevel::High,
            s if s >= MEDIUM_RISK_FLOOR => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            RiskLevel::Low => "✅",
            RiskLevel::Medium => "🟠",
            RiskLevel::High => "🔴",
            RiskLevel::Critical => "💀",
        }
    }
}

/// Detected risk factors in a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RiskFactor {
    /// Address is on the known-bad list
    KnownBadAddress { role: String, address: Address, label: String },
    /// Address is on neither list
    UnknownAddress { role: String, address: Address },
    /// Address has a vanity/poisoning-like shape
    SuspiciousAddressPattern { role: String, address: Address },
    /// Call matches a risky entry in the signature table
    RiskyFunction { name: String, risk_weight: u8 },
    /// Selector not in the signature table
    UnknownSelector { selector: String },
    /// Approval for (effectively) unlimited amount
    UnlimitedApproval { spender: Option<Address> },
    /// Bounded approval
    LimitedApproval { amount: U256 },
    /// Approval set to zero
    ApprovalRevocation,
    /// Approval arguments did not decode
    UndecodableApproval,
    /// Gas limit outside the expected band for the operation
    GasLimitOutOfRange { gas: u64, min: u64, max: u64 },
    /// Gas price outside the configured band
    UnusualGasPrice { gas_gwei: f64, min_gwei: f64, max_gwei: f64 },
    /// Large native value (whale alert)
    LargeValue { value_eth: f64 },
    /// Native value attached to an approval call
    ValueWithApproval { value_eth: f64 },
}

impl RiskFactor {
    pub fn description(&self) -> String {
        match self {
            RiskFactor::KnownBadAddress { role, address, label } => {
                format!("Known-bad {}: {} ({})", role, address, label)
            }
            RiskFactor::UnknownAddress { role, address } => {
                format!("Unverified {}: {}", role, address)
            }
            RiskFactor::SuspiciousAddressPattern { role, address } => {
                format!("Suspicious {} pattern: {}", role, address)
            }
            RiskFactor::RiskyFunction { name, risk_weight } => {
                format!("Function {} (risk weight {})", name, risk_weight)
            }
            RiskFactor::UnknownSelector { selector } => {
                format!("Unrecognized function selector {}", selector)
            }
            RiskFactor::UnlimitedApproval { spender } => match spender {
                Some(spender) => format!("Unlimited approval to {}", spender),
                None => "Unlimited approval to undecoded spender".to_string(),
            },
            RiskFactor::LimitedApproval { amount } => {
                format!("Limited approval of {} base units", amount)
            }
            RiskFactor::ApprovalRevocation => "Approval revocation".to_string(),
            RiskFactor::UndecodableApproval => {
                "Approval arguments could not be decoded".to_string()
            }
            RiskFactor::GasLimitOutOfRange { gas, min, max } => {
                format!("Gas limit {} outside expected range {}-{}", gas, min, max)
            }
            RiskFactor::UnusualGasPrice {
                gas_gwei,
                min_gwei,
                max_gwei,
            } => {
                format!(
                    "Unusual gas price: {:.2} gwei (expected {:.2}-{:.2} gwei)",
                    gas_gwei, min_gwei, max_gwei
                )
            }
            RiskFactor::LargeValue { value_eth } => {
                format!("Large value: {:.4} ETH", value_eth)
            }
            RiskFactor::ValueWithApproval { value_eth } => {
                format!("Native value {:.4} ETH attached to approval", value_eth)
            }
        }
    }
}

/// Individual rule contribution, kept for transparency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub score: u8,
    pub weight: f32,
    pub applied: bool,
    pub reason: String,
}

/// Result of a risk analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Overall score (0-100)
    pub score: u8,
    /// Level derived from the score, or forced by a critical condition
    pub level: RiskLevel,
    /// Warnings in rule-evaluation order
    pub warnings: Vec<String>,
    /// Contributing risk factors in rule-evaluation order
    pub risk_factors: Vec<String>,
    /// True when proceeding is advised against
    pub recommend_against: bool,
    /// True when a rule forced the CRITICAL level
    pub forced_critical: bool,
    /// Function decoded from calldata, if any
    pub detected_function: Option<String>,
    /// Per-rule breakdown
    pub breakdown: Vec<ScoreFactor>,
    /// One-line recommendation
    pub recommendation: String,
    /// Actionable recommendations for the level
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    /// Pretty print the assessment
    pub fn summary(&self) -> String {
        let mut output = format!(
            "\n{} Risk: {} | Score: {}/100\n",
            self.level.emoji(),
            self.level.as_str(),
            self.score
        );
        if let Some(function) = &self.detected_function {
            output.push_str(&format!("   Function: {}\n", function));
        }
        output.push_str(&format!("   {}\n", self.recommendation));

        if !self.warnings.is_empty() {
            output.push_str("   Warnings:\n");
            for warning in &self.warnings {
                output.push_str(&format!("     - {}\n", warning));
            }
        }

        output
    }
}

/// Parsed swap parameters from router calldata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapParams {
    pub amount_in: U256,
    pub amount_out_min: U256,
    pub path: Vec<Address>,
    pub to: Address,
    pub deadline: U256,
}

// ============================================
// Transaction Descriptor
// ============================================

/// Integer field accepted either as a JSON number or a decimal/0x string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(u64),
    Text(String),
}

impl NumericField {
    fn to_u256(&self) -> Option<U256> {
        match self {
            NumericField::Number(n) => Some(U256::from(*n)),
            NumericField::Text(s) => U256::from_str(s.trim()).ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            NumericField::Number(n) => n.to_string(),
            NumericField::Text(s) => s.clone(),
        }
    }
}

impl From<u64> for NumericField {
    fn from(value: u64) -> Self {
        NumericField::Number(value)
    }
}

/// Transaction as supplied by a caller, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub value: Option<NumericField>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub gas: Option<NumericField>,
    #[serde(default)]
    pub gas_price: Option<NumericField>,
}

/// Validated transaction the risk scorer evaluates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub to: Address,
    pub from: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub gas: Option<u64>,
    pub gas_price: Option<U256>,
}

impl TransactionDescriptor {
    /// Plain value transfer to `to`
    pub fn new(to: Address) -> Self {
        Self {
            to,
            from: None,
            value: U256::ZERO,
            data: Bytes::new(),
            gas: None,
            gas_price: None,
        }
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_gas(mut self, gas: u64, gas_price: U256) -> Self {
        self.gas = Some(gas);
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Value in native units
    pub fn value_eth(&self) -> f64 {
        wei_to_eth(self.value)
    }
}

impl TransactionDescriptor {
    /// Validate a caller-supplied transaction.
    ///
    /// Only a missing or malformed `to` is an error. Optional fields that do
    /// not parse fall back to their defaults and are reported in the returned
    /// notes.
    pub fn from_raw(raw: RawTransaction) -> AppResult<(Self, Vec<String>)> {
        let to_str = raw
            .to
            .as_deref()
            .ok_or_else(|| AppError::invalid_descriptor("Missing `to` address"))?;
        let to = parse_address(to_str).ok_or_else(|| {
            AppError::invalid_descriptor(format!(
                "Invalid `to` address: {} (expected 0x + 40 hex characters)",
                to_str
            ))
        })?;

        let mut notes = Vec::new();

        // `from` is informational; a malformed sender is dropped, not fatal
        let from = raw.from.as_deref().and_then(parse_address);

        let value =
            parse_numeric(raw.value.as_ref(), "value", &mut notes).unwrap_or(U256::ZERO);
        let data = parse_calldata(raw.data.as_deref(), &mut notes);
        let gas = parse_numeric(raw.gas.as_ref(), "gas", &mut notes)
            .map(|gas| u64::try_from(gas).unwrap_or(u64::MAX));
        let gas_price = parse_numeric(raw.gas_price.as_ref(), "gas_price", &mut notes);

        Ok((
            Self {
                to,
                from,
                value,
                data,
                gas,
                gas_price,
            },
            notes,
        ))
    }
}

impl TryFrom<RawTransaction> for TransactionDescriptor {
    type Error = AppError;

    fn try_from(raw: RawTransaction) -> AppResult<Self> {
        let (tx, notes) = Self::from_raw(raw)?;
        for note in &notes {
            warn!("{}", note);
        }
        Ok(tx)
    }
}

fn parse_numeric(
    field: Option<&NumericField>,
    name: &str,
    notes: &mut Vec<String>,
) -> Option<U256> {
    let field = field?;
    let parsed = field.to_u256();
    if parsed.is_none() {
        notes.push(format!("Unparseable {} `{}` ignored", name, field.describe()));
    }
    parsed
}

/// Decode as much calldata as possible: an odd trailing nibble is dropped and
/// non-hex input yields empty calldata
fn parse_calldata(data: Option<&str>, notes: &mut Vec<String>) -> Bytes {
    let hex_str = match data.map(str::trim) {
        None | Some("") | Some("0x") => return Bytes::new(),
        Some(s) => s,
    };
    let mut digits = hex_str
        .strip_prefix("0x")
        .or_else(|| hex_str.strip_prefix("0X"))
        .unwrap_or(hex_str);

    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        notes.push("Calldata is not valid hex; treated as empty".to_string());
        return Bytes::new();
    }
    if digits.len() % 2 == 1 {
        notes.push("Calldata has an odd number of hex digits; last one dropped".to_string());
        digits = &digits[..digits.len() - 1];
    }

    hex::decode(digits).map(Bytes::from).unwrap_or_default()
}

/// Parse a `0x` + 40 hex character address. Checksum case is not enforced.
pub fn parse_address(s: &str) -> Option<Address> {
    let s = s.trim();
    let hex_part = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?;
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Address::from_str(hex_part).ok()
}

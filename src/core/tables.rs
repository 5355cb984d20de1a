//! Reputation and function-signature tables used by the risk scorer
//!
//! Both tables are loaded once, validated, and then shared read-only as one
//! `Arc<RiskTables>` snapshot.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::models::errors::{AppError, AppResult, ErrorCode};
use crate::models::types::parse_address;
use crate::utils::constants::{KNOWN_BAD_ADDRESSES, KNOWN_GOOD_ADDRESSES};
use crate::utils::decoder::known_selectors;

// ============================================
// Reputation
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReputationCategory {
    Bad,
    Good,
}

/// One row of the reputation JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationEntry {
    pub address: String,
    pub category: ReputationCategory,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub category: ReputationCategory,
    pub label: String,
}

#[derive(Debug, Clone, Default)]
pub struct ReputationTable {
    entries: HashMap<Address, Listing>,
}

impl ReputationTable {
    pub fn from_entries(entries: Vec<ReputationEntry>) -> AppResult<Self> {
        let mut table = HashMap::with_capacity(entries.len());
        for entry in entries {
            let address = parse_address(&entry.address).ok_or_else(|| {
                AppError::registry_load(format!("Invalid reputation address: {}", entry.address))
            })?;
            let label = entry.label.unwrap_or_else(|| match entry.category {
                ReputationCategory::Bad => "listed bad".to_string(),
                ReputationCategory::Good => "listed good".to_string(),
            });
            let listing = Listing {
                category: entry.category,
                label,
            };
            if let Some(existing) = table.insert(address, listing) {
                if existing.category != entry.category {
                    return Err(AppError::registry_load(format!(
                        "Address {} listed as both good and bad",
                        address
                    )));
                }
            }
        }
        Ok(Self { entries: table })
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let entries: Vec<ReputationEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Router allowlist and local blacklist
    pub fn builtin() -> AppResult<Self> {
        let good = KNOWN_GOOD_ADDRESSES.iter().map(|(addr, label)| ReputationEntry {
            address: addr.to_string(),
            category: ReputationCategory::Good,
            label: Some(label.to_string()),
        });
        let bad = KNOWN_BAD_ADDRESSES.iter().map(|(addr, label)| ReputationEntry {
            address: addr.to_string(),
            category: ReputationCategory::Bad,
            label: Some(label.to_string()),
        });
        Self::from_entries(good.chain(bad).collect())
    }

    #[inline]
    pub fn lookup(&self, address: &Address) -> Option<&Listing> {
        self.entries.get(address)
    }

    pub fn is_allowlisted(&self, address: &Address) -> bool {
        matches!(self.lookup(address), Some(l) if l.category == ReputationCategory::Good)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================
// Function signatures
// ============================================

/// Operation family; drives contextual warnings and expected gas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureCategory {
    Approval,
    Transfer,
    Swap,
    Ownership,
    Upgrade,
    Execution,
    Other,
}

impl SignatureCategory {
    /// Expected gas-limit band (min, max)
    pub fn expected_gas(&self) -> (u64, u64) {
        match self {
            SignatureCategory::Approval => (30_000, 120_000),
            SignatureCategory::Transfer => (30_000, 150_000),
            SignatureCategory::Swap => (90_000, 600_000),
            SignatureCategory::Ownership => (25_000, 120_000),
            SignatureCategory::Upgrade => (30_000, 250_000),
            SignatureCategory::Execution => (50_000, 2_000_000),
            SignatureCategory::Other => (21_000, 3_000_000),
        }
    }
}

/// One row of the signature JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEntry {
    /// `0x` + 8 hex characters
    pub selector: String,
    pub name: String,
    pub risk_weight: u8,
    #[serde(default)]
    pub is_approval: bool,
    #[serde(default)]
    pub category: Option<SignatureCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub name: String,
    pub risk_weight: u8,
    pub is_approval: bool,
    pub category: SignatureCategory,
}

#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    entries: HashMap<[u8; 4], SignatureInfo>,
}

impl SignatureTable {
    pub fn from_entries(entries: Vec<SignatureEntry>) -> AppResult<Self> {
        let mut table = HashMap::with_capacity(entries.len());
        for entry in entries {
            let selector = parse_selector(&entry.selector).ok_or_else(|| {
                AppError::registry_load(format!("Invalid selector: {}", entry.selector))
            })?;
            if entry.risk_weight > 100 {
                return Err(AppError::registry_load(format!(
                    "Selector {} risk weight {} exceeds 100",
                    entry.selector, entry.risk_weight
                )));
            }
            let category = entry.category.unwrap_or(if entry.is_approval {
                SignatureCategory::Approval
            } else {
                SignatureCategory::Other
            });
            let info = SignatureInfo {
                name: entry.name,
                risk_weight: entry.risk_weight,
                is_approval: entry.is_approval,
                category,
            };
            if table.insert(selector, info).is_some() {
                return Err(AppError::registry_load(format!(
                    "Duplicate selector: {}",
                    entry.selector
                )));
            }
        }
        Ok(Self { entries: table })
    }

    pub fn from_json_str(json: &str) -> AppResult<Self> {
        let entries: Vec<SignatureEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Every call the decoder understands, with a fixed per-operation weight
    pub fn builtin() -> AppResult<Self> {
        let entries = known_selectors()
            .into_iter()
            .map(|(selector, signature)| {
                let name = signature.split('(').next().unwrap_or(signature);
                let (risk_weight, category) = builtin_weight(name);
                SignatureEntry {
                    selector: format!("0x{}", hex::encode(selector)),
                    name: signature.to_string(),
                    risk_weight,
                    is_approval: category == SignatureCategory::Approval,
                    category: Some(category),
                }
            })
            .collect();
        Self::from_entries(entries)
    }

    #[inline]
    pub fn lookup(&self, selector: &[u8; 4]) -> Option<&SignatureInfo> {
        self.entries.get(selector)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn builtin_weight(name: &str) -> (u8, SignatureCategory) {
    match name {
        "approve" | "increaseAllowance" => (50, SignatureCategory::Approval),
        "permit" => (55, SignatureCategory::Approval),
        "setApprovalForAll" => (60, SignatureCategory::Approval),
        "transfer" => (20, SignatureCategory::Transfer),
        "transferFrom" => (35, SignatureCategory::Transfer),
        "transferOwnership" => (70, SignatureCategory::Ownership),
        "renounceOwnership" => (60, SignatureCategory::Ownership),
        "upgradeTo" => (80, SignatureCategory::Upgrade),
        "execute" => (75, SignatureCategory::Execution),
        "multicall" => (55, SignatureCategory::Execution),
        name if name.starts_with("swap") => (15, SignatureCategory::Swap),
        _ => (30, SignatureCategory::Other),
    }
}

fn parse_selector(s: &str) -> Option<[u8; 4]> {
    let hex_part = s.trim().strip_prefix("0x")?;
    if hex_part.len() != 8 {
        return None;
    }
    let bytes = hex::decode(hex_part).ok()?;
    bytes.try_into().ok()
}

// ============================================
// Snapshot
// ============================================

/// Everything the risk scorer looks up
#[derive(Debug, Clone, Default)]
pub struct RiskTables {
    pub reputation: ReputationTable,
    pub signatures: SignatureTable,
}

impl RiskTables {
    pub fn new(reputation: ReputationTable, signatures: SignatureTable) -> Self {
        Self {
            reputation,
            signatures,
        }
    }

    pub fn builtin() -> AppResult<Self> {
        Ok(Self::new(ReputationTable::builtin()?, SignatureTable::builtin()?))
    }

    /// Load from JSON files; a missing path falls back to the built-in table
    pub fn load(reputation: Option<&Path>, signatures: Option<&Path>) -> AppResult<Self> {
        let reputation = match reputation {
            Some(path) => {
                let table = ReputationTable::from_json_str(&read_table(path)?)?;
                info!(
                    "🛡️  Reputation table loaded from {}: {} entries",
                    path.display(),
                    table.len()
                );
                table
            }
            None => ReputationTable::builtin()?,
        };
        let signatures = match signatures {
            Some(path) => {
                let table = SignatureTable::from_json_str(&read_table(path)?)?;
                info!(
                    "🔏 Signature table loaded from {}: {} entries",
                    path.display(),
                    table.len()
                );
                table
            }
            None => SignatureTable::builtin()?,
        };
        Ok(Self::new(reputation, signatures))
    }
}

fn read_table(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        AppError::with_source(
            ErrorCode::RegistryLoadError,
            format!("Cannot read table {}", path.display()),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_builtin_tables() {
        let tables = RiskTables::builtin().unwrap();
        assert_eq!(tables.signatures.len(), 14);
        let approve = tables.signatures.lookup(&[0x09, 0x5e, 0xa7, 0xb3]).unwrap();
        assert!(approve.is_approval);
        assert_eq!(approve.name, "approve(address,uint256)");

        let uniswap = Address::from_str("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D").unwrap();
        assert!(tables.reputation.is_allowlisted(&uniswap));
    }

    #[test]
    fn test_reputation_rejects_bad_rows() {
        let err = ReputationTable::from_json_str(r#"[{"address":"0x1234","category":"bad"}]"#)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistryLoadError);

        let err = ReputationTable::from_json_str(
            r#"[{"address":"0x1f9840a85d5af5bf1d1762f925bdaddc4201f984","category":"evil"}]"#,
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::RegistryLoadError);

        let conflicting = r#"[
            {"address":"0x1f9840a85d5af5bf1d1762f925bdaddc4201f984","category":"bad"},
            {"address":"0x1F9840A85D5AF5BF1D1762F925BDADDC4201F984","category":"good"}
        ]"#;
        assert!(ReputationTable::from_json_str(conflicting).is_err());
    }

    #[test]
    fn test_signature_table_json() {
        let table = SignatureTable::from_json_str(
            r#"[{"selector":"0xa9059cbb","name":"transfer","risk_weight":20,"is_approval":false,"category":"transfer"},
                {"selector":"0x095ea7b3","name":"approve","risk_weight":50,"is_approval":true}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        let approve = table.lookup(&[0x09, 0x5e, 0xa7, 0xb3]).unwrap();
        assert_eq!(approve.category, SignatureCategory::Approval);

        assert!(SignatureTable::from_json_str(
            r#"[{"selector":"0x095ea7","name":"x","risk_weight":1}]"#
        )
        .is_err());
        assert!(SignatureTable::from_json_str(
            r#"[{"selector":"0x095ea7b3","name":"x","risk_weight":101}]"#
        )
        .is_err());
    }
}

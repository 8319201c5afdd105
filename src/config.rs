//! Mempool settings (spec §6). Parsing configuration files is out of scope
//! for this crate (spec §1); this stays a plain data struct plus a thin TOML
//! loader, matching the rest of the node's settings surface.

use std::collections::HashSet;

use serde::Deserialize;

use crate::domain::TxId;

/// Bounds and policy knobs the mempool core needs from the wider node
/// configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MempoolSettings {
    pub mempool_capacity: u32,
    pub minimal_fee_amount: u64,
    pub max_transaction_cost: u64,
    #[serde(default)]
    pub blacklisted_transactions: HashSet<TxIdConfig>,
    pub fee_proposition_bytes: Vec<u8>,
    pub invalid_cache: InvalidCacheSettings,
}

/// Hex-encoded transaction id as it appears in settings files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct TxIdConfig(pub TxId);

impl TryFrom<String> for TxIdConfig {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let bytes = hex::decode(value.trim()).map_err(|e| e.to_string())?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| "blacklisted tx id must be 32 bytes".to_string())?;
        Ok(TxIdConfig(TxId::from_bytes(arr)))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvalidCacheSettings {
    pub filter_capacity: usize,
    pub filter_fpr: f64,
    pub front_size: usize,
    pub front_ttl_ms: u64,
    /// Fraction of `filter_capacity` inserts after which the back filter is
    /// rotated (spec §9: "interpret the latter as a fraction of capacity").
    #[serde(default = "default_rotation_fraction")]
    pub rotation_fraction: f64,
}

fn default_rotation_fraction() -> f64 {
    1.0
}

impl Default for InvalidCacheSettings {
    fn default() -> Self {
        Self {
            filter_capacity: 100_000,
            filter_fpr: 0.01,
            front_size: 1_000,
            front_ttl_ms: 10 * 60 * 1000,
            rotation_fraction: 1.0,
        }
    }
}

impl MempoolSettings {
    /// Load settings from a TOML document. Hot-reload and environment
    /// overlays are out of scope; this is a one-shot parse.
    pub fn from_toml(text: &str) -> Result<Self, crate::error::MempoolError> {
        toml::from_str(text).map_err(|e| crate::error::MempoolError::Config(e.to_string()))
    }

    pub fn is_blacklisted(&self, id: &TxId) -> bool {
        self.blacklisted_transactions.iter().any(|w| &w.0 == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_toml() {
        let toml = r#"
            mempool_capacity = 1000
            minimal_fee_amount = 100000
            max_transaction_cost = 5000000
            fee_proposition_bytes = [1, 2, 3]

            [invalid_cache]
            filter_capacity = 10000
            filter_fpr = 0.01
            front_size = 100
            front_ttl_ms = 60000
        "#;
        let settings = MempoolSettings::from_toml(toml).expect("parses");
        assert_eq!(settings.mempool_capacity, 1000);
        assert_eq!(settings.invalid_cache.rotation_fraction, 1.0);
        assert!(settings.blacklisted_transactions.is_empty());
    }
}

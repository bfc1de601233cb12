//! Tradable asset definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Uppercase asset ticker, e.g. "BTC".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetSymbol(String);

impl AssetSymbol {
    /// Try to create a symbol: 1-10 ASCII alphanumerics, forced uppercase.
    pub fn try_new(symbol: impl AsRef<str>) -> Option<Self> {
        let s = symbol.as_ref().trim();
        if s.is_empty() || s.len() > 10 || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(Self(s.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A tradable unit.
///
/// Immutable after creation except `is_active`, which gates whether new
/// wallets and orders may reference the asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: AssetSymbol,
    pub name: String,
    /// Display precision (informational; ledger arithmetic is always 8-dp).
    pub precision: u32,
    pub is_active: bool,
}

impl Asset {
    pub fn new(symbol: AssetSymbol, name: impl Into<String>, precision: u32) -> Self {
        Self {
            symbol,
            name: name.into(),
            precision,
            is_active: true,
        }
    }
}

//! Error taxonomy for the matching and ledger core
//!
//! Validation-class errors are returned to the caller before any side
//! effect; `InternalInconsistency` marks an invariant violation that must
//! abort and roll back the surrounding transaction.

use thiserror::Error;

/// Top-level core error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("insufficient funds in {asset}: required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        required: String,
        available: String,
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("invalid market: {symbol}")]
    InvalidMarket { symbol: String },

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

impl CoreError {
    /// True for invariant violations that warrant rollback and a bounded
    /// retry, as opposed to permanent validation failures.
    pub fn is_internal(&self) -> bool {
        matches!(self, CoreError::InternalInconsistency(_))
    }

    pub fn insufficient_funds(
        asset: impl Into<String>,
        required: impl ToString,
        available: impl ToString,
    ) -> Self {
        CoreError::InsufficientFunds {
            asset: asset.into(),
            required: required.to_string(),
            available: available.to_string(),
        }
    }
}

/// Result alias used across the core crates.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_funds_display() {
        let err = CoreError::insufficient_funds("USDT", "100", "40");
        assert_eq!(
            err.to_string(),
            "insufficient funds in USDT: required 100, available 40"
        );
        assert!(!err.is_internal());
    }

    #[test]
    fn test_internal_flag() {
        assert!(CoreError::InternalInconsistency("negative balance".into()).is_internal());
        assert!(!CoreError::InvalidState("order is filled".into()).is_internal());
    }
}

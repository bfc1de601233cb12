//! Unique identifier types for core entities
//!
//! All row identifiers use UUID v7 for time-sortable ordering. `Ord` is
//! derived on every id so multi-row transactions can acquire locks in a
//! single global order (orders before wallets, each sorted by id).

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new id with the current timestamp.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for an order.
    ///
    /// UUID v7 embeds the creation timestamp, so sorting by id roughly
    /// follows submission order.
    OrderId
}

uuid_id! {
    /// Unique identifier for a trade.
    TradeId
}

uuid_id! {
    /// Unique identifier for a user account.
    UserId
}

uuid_id! {
    /// Unique identifier for a deposit/withdrawal transaction.
    TransactionId
}

/// Market identifier (trading pair).
///
/// Format: "BASE-QUOTE" (e.g., "BTC-USDT", "ETH-USDT").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(String);

impl MarketId {
    /// Try to create a MarketId, returning `None` if the format is invalid.
    pub fn try_new(symbol: impl Into<String>) -> Option<Self> {
        let s: String = symbol.into();
        let mut parts = s.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) if !base.is_empty() && !quote.is_empty() => {
                Some(Self(s))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into (base, quote) asset symbols.
    pub fn split(&self) -> (&str, &str) {
        let mut parts = self.0.split('-');
        // try_new guarantees exactly two non-empty parts
        let base = parts.next().unwrap_or_default();
        let quote = parts.next().unwrap_or_default();
        (base, quote)
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_id_uniqueness() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert_ne!(id1, id2, "OrderIds should be unique");
    }

    #[test]
    fn test_order_id_roughly_time_sorted() {
        let id1 = OrderId::new();
        let id2 = OrderId::new();
        assert!(id1 < id2 || id1.as_uuid().get_timestamp() == id2.as_uuid().get_timestamp());
    }

    #[test]
    fn test_id_serialization() {
        let id = TradeId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: TradeId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn test_market_id_valid() {
        let market = MarketId::try_new("BTC-USDT").unwrap();
        assert_eq!(market.as_str(), "BTC-USDT");
        let (base, quote) = market.split();
        assert_eq!(base, "BTC");
        assert_eq!(quote, "USDT");
    }

    #[test]
    fn test_market_id_invalid() {
        assert!(MarketId::try_new("BTCUSDT").is_none());
        assert!(MarketId::try_new("BTC-").is_none());
        assert!(MarketId::try_new("-USDT").is_none());
        assert!(MarketId::try_new("BTC-USDT-X").is_none());
    }

    #[test]
    fn test_market_id_serialization() {
        let market = MarketId::try_new("ETH-USDT").unwrap();
        let json = serde_json::to_string(&market).unwrap();
        assert_eq!(json, "\"ETH-USDT\"");
        let back: MarketId = serde_json::from_str(&json).unwrap();
        assert_eq!(market, back);
    }
}

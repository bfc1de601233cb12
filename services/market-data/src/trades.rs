//! Public trade history
//!
//! The public feed exposes only what any participant could observe:
//! price, size, and time. Order and user identities stay internal.

use chrono::{DateTime, Utc};
use serde::Serialize;
use types::prelude::*;

/// One execution as shown on the public feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicTrade {
    pub price: Price,
    pub quantity: Quantity,
    pub created_at: DateTime<Utc>,
}

impl From<&Trade> for PublicTrade {
    fn from(trade: &Trade) -> Self {
        Self {
            price: trade.price,
            quantity: trade.quantity,
            created_at: trade.executed_at,
        }
    }
}

/// Most recent `limit` trades, newest first.
pub fn recent(trades: &[Trade], limit: usize) -> Vec<PublicTrade> {
    trades.iter().rev().take(limit).map(PublicTrade::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn trade(p: u64) -> Trade {
        let price = Price::from_u64(p);
        let quantity = Quantity::from_str("1").unwrap();
        Trade::new(
            OrderId::new(),
            OrderId::new(),
            UserId::new(),
            UserId::new(),
            MarketId::try_new("BTC-USDT").unwrap(),
            price,
            quantity,
            price.notional(quantity).unwrap(),
            Utc::now(),
        )
    }

    #[test]
    fn test_recent_is_newest_first_and_limited() {
        let trades: Vec<Trade> = (1..=5).map(trade).collect();
        let recent = recent(&trades, 3);
        let prices: Vec<Price> = recent.iter().map(|t| t.price).collect();
        assert_eq!(
            prices,
            vec![Price::from_u64(5), Price::from_u64(4), Price::from_u64(3)]
        );
    }
}

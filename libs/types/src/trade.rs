//! Immutable trade records
//!
//! One record per execution, created exactly once and never updated or
//! deleted. Trades reconstruct the market ticker and history.

use crate::ids::{MarketId, OrderId, TradeId, UserId};
use crate::numeric::{Amount, Price, Quantity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of one execution between a buy order and a sell order.
///
/// `price` is always the maker's price; `total = price * quantity`
/// truncated at 8 fractional digits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub taker_user_id: UserId,
    pub maker_user_id: UserId,
    pub market: MarketId,
    pub price: Price,
    pub quantity: Quantity,
    pub total: Amount,
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        taker_user_id: UserId,
        maker_user_id: UserId,
        market: MarketId,
        price: Price,
        quantity: Quantity,
        total: Amount,
        executed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TradeId::new(),
            buy_order_id,
            sell_order_id,
            taker_user_id,
            maker_user_id,
            market,
            price,
            quantity,
            total,
            executed_at,
        }
    }

    /// The two sides of a trade must belong to different users.
    pub fn is_self_trade(&self) -> bool {
        self.taker_user_id == self.maker_user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_trade_fields() {
        let price = Price::from_u64(40000);
        let quantity = Quantity::from_str("0.5").unwrap();
        let total = price.notional(quantity).unwrap();
        let trade = Trade::new(
            OrderId::new(),
            OrderId::new(),
            UserId::new(),
            UserId::new(),
            MarketId::try_new("BTC-USDT").unwrap(),
            price,
            quantity,
            total,
            Utc::now(),
        );

        assert_eq!(trade.total, Amount::from_str("20000").unwrap());
        assert!(!trade.is_self_trade());
    }

    #[test]
    fn test_trade_serialization() {
        let price = Price::from_u64(40000);
        let quantity = Quantity::from_str("0.25").unwrap();
        let trade = Trade::new(
            OrderId::new(),
            OrderId::new(),
            UserId::new(),
            UserId::new(),
            MarketId::try_new("ETH-USDT").unwrap(),
            price,
            quantity,
            price.notional(quantity).unwrap(),
            Utc::now(),
        );

        let json = serde_json::to_string(&trade).unwrap();
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, back);
    }
}

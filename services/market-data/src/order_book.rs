//! Aggregated order book depth
//!
//! Depth levels sum `quantity_remaining` over the open orders at each
//! price. Bids are reported best (highest) first, asks best (lowest)
//! first. Market orders never appear: they carry no price and never rest.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use types::prelude::*;

/// One aggregated price level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthLevel {
    pub price: Price,
    /// Sum of `quantity_remaining` at this price.
    pub quantity: Quantity,
    /// `price x quantity`.
    pub total: Amount,
}

/// Depth snapshot of one market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBook {
    pub market: MarketId,
    /// Best bid first.
    pub bids: Vec<DepthLevel>,
    /// Best ask first.
    pub asks: Vec<DepthLevel>,
    pub timestamp: DateTime<Utc>,
}

impl OrderBook {
    /// Aggregate `orders` into at most `depth` levels per side.
    pub fn build(market: MarketId, orders: &[Order], depth: usize, now: DateTime<Utc>) -> Self {
        let mut bids: BTreeMap<Price, Quantity> = BTreeMap::new();
        let mut asks: BTreeMap<Price, Quantity> = BTreeMap::new();

        for order in orders {
            if !order.is_open() || order.quantity_remaining.is_zero() {
                continue;
            }
            let Some(price) = order.price else { continue };
            let side = match order.side {
                Side::Buy => &mut bids,
                Side::Sell => &mut asks,
            };
            let level = side.entry(price).or_insert(Quantity::ZERO);
            // remaining quantities are bounded by placement checks; treat
            // overflow as saturation rather than failing a read
            *level = level.checked_add(order.quantity_remaining).unwrap_or(*level);
        }

        let finalize = |(price, quantity): (Price, Quantity)| DepthLevel {
            price,
            quantity,
            total: price.notional(quantity).unwrap_or(Amount::ZERO),
        };
        Self {
            market,
            bids: bids.into_iter().rev().take(depth).map(finalize).collect(),
            asks: asks.into_iter().take(depth).map(finalize).collect(),
            timestamp: now,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }
}

//! Order lifecycle types
//!
//! State machine: `open -> partially_filled -> filled` via fills,
//! `open|partially_filled -> cancelled` via cancel, `open -> rejected` at
//! placement time. Terminal orders are immutable.

use crate::errors::CoreError;
use crate::ids::{MarketId, OrderId, UserId};
use crate::numeric::{Amount, Price, Quantity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Rests at a limit price until filled or cancelled.
    Limit,
    /// Matches immediately at the best available prices; any unfilled
    /// remainder is auto-cancelled, never left resting.
    Market,
}

/// Order status. `status` is a pure function of `quantity_remaining` plus
/// the terminal flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// A resting or partially-filled intent to trade.
///
/// Invariant: `quantity_filled + quantity_remaining == quantity` at all
/// times. `reserved` tracks the funds currently locked for this order
/// (quote asset for buys, base asset for sells) so cancellation and
/// market-order disposal can release exactly what is still held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub market: MarketId,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price; `None` for market orders.
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub quantity_filled: Quantity,
    pub quantity_remaining: Quantity,
    /// Funds still locked in the owner's wallet for this order.
    pub reserved: Amount,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub filled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create a new open order. `reserved` is the amount locked at
    /// placement.
    pub fn new(
        user_id: UserId,
        market: MarketId,
        side: Side,
        order_type: OrderType,
        price: Option<Price>,
        quantity: Quantity,
        reserved: Amount,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            market,
            side,
            order_type,
            price,
            quantity,
            quantity_filled: Quantity::ZERO,
            quantity_remaining: quantity,
            reserved,
            status: OrderStatus::Open,
            created_at: now,
            filled_at: None,
            cancelled_at: None,
        }
    }

    /// Open and partially-filled orders are the only ones eligible for
    /// matching or cancellation.
    pub fn is_open(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    pub fn is_limit(&self) -> bool {
        self.order_type == OrderType::Limit
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }

    /// Check the fill invariant: filled + remaining == quantity.
    pub fn check_invariant(&self) -> bool {
        self.quantity_filled
            .checked_add(self.quantity_remaining)
            .map(|sum| sum == self.quantity)
            .unwrap_or(false)
    }

    /// Apply a fill of `fill_qty`, updating filled/remaining and status.
    ///
    /// A fill exceeding `quantity_remaining` or applied to a closed order
    /// is an internal inconsistency.
    pub fn apply_fill(&mut self, fill_qty: Quantity, now: DateTime<Utc>) -> Result<(), CoreError> {
        if !self.is_open() {
            return Err(CoreError::InternalInconsistency(format!(
                "order {}: fill applied in status {:?}",
                self.id, self.status
            )));
        }
        let remaining = self.quantity_remaining.checked_sub(fill_qty).ok_or_else(|| {
            CoreError::InternalInconsistency(format!(
                "order {}: fill {} exceeds remaining {}",
                self.id, fill_qty, self.quantity_remaining
            ))
        })?;
        let filled = self.quantity_filled.checked_add(fill_qty).ok_or_else(|| {
            CoreError::InternalInconsistency(format!("order {}: fill overflow", self.id))
        })?;

        self.quantity_filled = filled;
        self.quantity_remaining = remaining;
        if remaining.is_zero() {
            self.status = OrderStatus::Filled;
            self.filled_at = Some(now);
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
        Ok(())
    }

    /// Cancel the order. Allowed only while open.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), CoreError> {
        if !self.is_open() {
            return Err(CoreError::InvalidState(format!(
                "order {} cannot be cancelled in status {:?}",
                self.id, self.status
            )));
        }
        self.status = OrderStatus::Cancelled;
        self.cancelled_at = Some(now);
        Ok(())
    }
}

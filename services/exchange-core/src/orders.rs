//! Order placement and cancellation
//!
//! Placement validates, reserves funds, registers the order and runs a
//! matching pass synchronously. Funds are reserved in the quote asset for
//! buys (quantity x limit price, or quantity x best opposing price for
//! market buys) and in the base asset for sells. The order's `reserved`
//! field tracks exactly what is still locked, so cancellation releases
//! precisely the unspent remainder.

use crate::audit::AuditEntry;
use crate::exchange::Exchange;
use crate::markets::Market;
use chrono::Utc;
use serde_json::json;
use types::prelude::*;

impl Exchange {
    /// Place an order and match it immediately.
    ///
    /// Returns the order as it stands after the matching pass: possibly
    /// partially or fully filled, or cancelled if a market order found no
    /// further liquidity. A matching failure after placement leaves the
    /// order open with its funds reserved; placement itself still
    /// succeeds.
    pub fn place_order(
        &self,
        user_id: UserId,
        market_id: &MarketId,
        side: Side,
        order_type: OrderType,
        price: Option<Price>,
        quantity: Quantity,
    ) -> CoreResult<Order> {
        let now = Utc::now();
        let market = self.markets.market(market_id)?.clone();
        if quantity.is_zero() {
            return Err(CoreError::InvalidParams(
                "quantity must be positive".to_string(),
            ));
        }
        match (order_type, price) {
            (OrderType::Limit, None) => {
                return Err(CoreError::InvalidParams(
                    "limit orders require a price".to_string(),
                ));
            }
            (OrderType::Market, Some(_)) => {
                return Err(CoreError::InvalidParams(
                    "market orders must not carry a price".to_string(),
                ));
            }
            _ => {}
        }

        let (reserve_asset, reserve_amount) = self.required_reservation(
            &market, side, order_type, price, quantity,
        )?;

        let order_id;
        {
            let wallet_id = WalletId::new(user_id, reserve_asset.clone());
            // a missing wallet is just a zero balance to the placement API
            let wallet_row = self.store.wallet_row(&wallet_id).map_err(|_| {
                CoreError::insufficient_funds(reserve_asset.as_str(), reserve_amount, Amount::ZERO)
            })?;
            let mut wallet = wallet_row.lock();
            wallet.lock(reserve_amount, now)?;

            let order = Order::new(
                user_id,
                market.id.clone(),
                side,
                order_type,
                price,
                quantity,
                reserve_amount,
                now,
            );
            order_id = order.id;
            self.audit.record(AuditEntry::new(
                Some(user_id),
                "order.placed",
                format!("order:{order_id}"),
                json!({
                    "market": market.id,
                    "side": side,
                    "type": order_type,
                    "price": price,
                    "quantity": quantity,
                    "reserved": reserve_amount,
                }),
                now,
            ));
            self.store.insert_order(order);
            // wallet guard drops here; matching re-acquires in global order
        }

        if let Err(err) = self.run_matching(order_id) {
            // funds stay consistently reserved; the order remains open for
            // later inspection or cancellation
            tracing::error!(%order_id, error = %err, "matching failed after placement");
        }
        self.store.order_snapshot(order_id)
    }

    /// Cancel an open order and release its remaining reservation.
    ///
    /// Only the owner may cancel; a foreign order id reports `NotFound`
    /// rather than confirming the order exists.
    pub fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> CoreResult<Order> {
        let now = Utc::now();
        let order_row = self.store.order_row(order_id)?;
        let mut order = order_row.lock();
        if order.user_id != user_id {
            return Err(CoreError::NotFound(format!("order {order_id}")));
        }
        if !order.is_open() {
            return Err(CoreError::InvalidState(format!(
                "order {order_id} is no longer open"
            )));
        }

        let market = self.markets.market(&order.market)?;
        let refund_asset = match order.side {
            Side::Buy => market.quote.clone(),
            Side::Sell => market.base.clone(),
        };
        let refund = order.reserved;
        if !refund.is_zero() {
            let wallet_row = self
                .store
                .wallet_row(&WalletId::new(user_id, refund_asset))?;
            wallet_row.lock().unlock(refund, now)?;
        }
        order.cancel(now)?;
        order.reserved = Amount::ZERO;
        self.store.retire_order(&order.market, order_id);

        self.audit.record(AuditEntry::new(
            Some(user_id),
            "order.cancelled",
            format!("order:{order_id}"),
            json!({
                "market": order.market,
                "refunded": refund,
                "quantity_filled": order.quantity_filled,
            }),
            now,
        ));
        Ok(order.clone())
    }

    /// Asset and amount to reserve for a new order.
    ///
    /// Market buys reserve quantity x the best opposing price; without any
    /// opposing liquidity a market order is rejected outright instead of
    /// locking funds for an order that could never trade.
    fn required_reservation(
        &self,
        market: &Market,
        side: Side,
        order_type: OrderType,
        price: Option<Price>,
        quantity: Quantity,
    ) -> CoreResult<(AssetSymbol, Amount)> {
        let overflow =
            || CoreError::InvalidParams("order notional exceeds representable range".to_string());
        match (side, order_type) {
            (Side::Sell, _) => {
                if order_type == OrderType::Market
                    && self.best_opposing_price(market, side).is_none()
                {
                    return Err(no_liquidity());
                }
                Ok((market.base.clone(), quantity.into()))
            }
            (Side::Buy, OrderType::Limit) => {
                let limit = price.ok_or_else(|| {
                    CoreError::InvalidParams("limit orders require a price".to_string())
                })?;
                let amount = limit.notional(quantity).ok_or_else(overflow)?;
                Ok((market.quote.clone(), amount))
            }
            (Side::Buy, OrderType::Market) => {
                let best_ask = self
                    .best_opposing_price(market, side)
                    .ok_or_else(no_liquidity)?;
                let amount = best_ask.notional(quantity).ok_or_else(overflow)?;
                Ok((market.quote.clone(), amount))
            }
        }
    }

    /// Best resting price on the side a `side` taker would trade against:
    /// lowest ask for a buyer, highest bid for a seller.
    fn best_opposing_price(&self, market: &Market, side: Side) -> Option<Price> {
        let want = side.opposite();
        let mut best: Option<Price> = None;
        for id in self.store.open_order_ids(&market.id) {
            let Ok(order) = self.store.order_snapshot(id) else {
                continue;
            };
            if !order.is_open() || order.side != want {
                continue;
            }
            let Some(price) = order.price else { continue };
            best = Some(match (best, side) {
                (None, _) => price,
                (Some(b), Side::Buy) => b.min(price),
                (Some(b), Side::Sell) => b.max(price),
            });
        }
        best
    }
}

fn no_liquidity() -> CoreError {
    CoreError::InvalidParams(
        "market order rejected before locking funds: no resting orders to match against"
            .to_string(),
    )
}

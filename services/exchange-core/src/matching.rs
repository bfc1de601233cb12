//! Price-time-priority matching
//!
//! A matching pass is one atomic multi-row transaction. It snapshots the
//! candidate set, acquires every row lock it could touch in the global
//! order (order rows sorted by id, then wallet rows sorted by key), walks
//! the opposite side in price-time priority, and settles each crossing at
//! the maker's price. Any failure rolls every row back to its acquisition
//! snapshot; no partial trade is ever visible.

use crate::audit::{self, AuditEntry};
use crate::exchange::Exchange;
use crate::markets::Market;
use crate::store::{Row, TxRow};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use types::numeric::fixed;
use types::prelude::*;

/// Internal failures trigger rollback and a bounded retry; validation
/// failures never do.
const MATCH_RETRIES: usize = 3;

/// Which side of the settlement the incoming order takes. Resolved once
/// per pass so the four wallet transfers cannot mix up buyer and seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TradeRoles {
    TakerBuys,
    TakerSells,
}

/// Resting order observed during the candidate snapshot. Side, owner,
/// price and creation time are immutable, so priority computed from the
/// snapshot stays valid; only open/closed state is re-checked under lock.
struct Candidate {
    id: OrderId,
    user_id: UserId,
    price: Price,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct PassOutcome {
    trades: Vec<Trade>,
    audits: Vec<AuditEntry>,
    closed: Vec<OrderId>,
}

impl Exchange {
    /// Run matching for `order_id`, retrying rolled-back passes a bounded
    /// number of times.
    pub(crate) fn run_matching(&self, order_id: OrderId) -> CoreResult<Vec<Trade>> {
        let mut last_err = None;
        for attempt in 1..=MATCH_RETRIES {
            match self.matching_pass(order_id) {
                Ok(trades) => return Ok(trades),
                Err(err) if err.is_internal() => {
                    tracing::warn!(%order_id, attempt, error = %err, "matching pass rolled back");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            CoreError::InternalInconsistency("matching retries exhausted".to_string())
        }))
    }

    /// One atomic matching pass.
    ///
    /// Idempotent: a pass over an order that has already been filled or
    /// cancelled commits nothing. Orders placed after the candidate
    /// snapshot wait for their own pass.
    fn matching_pass(&self, order_id: OrderId) -> CoreResult<Vec<Trade>> {
        let now = Utc::now();
        let taker_row = self.store.order_row(order_id)?;
        let taker_view = taker_row.lock().clone();
        if !taker_view.is_open() {
            return Ok(Vec::new());
        }
        let market = self.markets.market(&taker_view.market)?.clone();

        // Candidate snapshot: priced, open, opposite-side orders owned by
        // someone else. Unpriced (market) orders cannot make.
        let want_side = taker_view.side.opposite();
        let mut candidates: Vec<(Candidate, Row<Order>)> = Vec::new();
        for id in self.store.open_order_ids(&market.id) {
            if id == order_id {
                continue;
            }
            let Ok(row) = self.store.order_row(id) else {
                continue;
            };
            let view = row.lock().clone();
            if !view.is_open() || view.side != want_side || view.user_id == taker_view.user_id {
                continue;
            }
            let Some(price) = view.price else { continue };
            candidates.push((
                Candidate {
                    id,
                    user_id: view.user_id,
                    price,
                    created_at: view.created_at,
                },
                row,
            ));
        }

        // Price-time priority: best price first, then oldest. Ids are
        // time-sortable, so they break exact-timestamp ties fairly.
        match taker_view.side {
            Side::Buy => candidates.sort_by(|a, b| {
                a.0.price
                    .cmp(&b.0.price)
                    .then(a.0.created_at.cmp(&b.0.created_at))
                    .then(a.0.id.cmp(&b.0.id))
            }),
            Side::Sell => candidates.sort_by(|a, b| {
                b.0.price
                    .cmp(&a.0.price)
                    .then(a.0.created_at.cmp(&b.0.created_at))
                    .then(a.0.id.cmp(&b.0.id))
            }),
        }
        let priority: Vec<OrderId> = candidates.iter().map(|c| c.0.id).collect();

        // Row set for the pass. Wallet rows are resolved (and created if
        // missing) before any lock is taken.
        let mut order_rows: Vec<(OrderId, Row<Order>)> = candidates
            .iter()
            .map(|(meta, row)| (meta.id, Arc::clone(row)))
            .collect();
        order_rows.push((order_id, Arc::clone(&taker_row)));
        order_rows.sort_by_key(|(id, _)| *id);

        let mut wallet_ids = BTreeSet::new();
        for user in candidates
            .iter()
            .map(|(meta, _)| meta.user_id)
            .chain([taker_view.user_id])
        {
            wallet_ids.insert(WalletId::new(user, market.base.clone()));
            wallet_ids.insert(WalletId::new(user, market.quote.clone()));
        }
        let wallet_rows: Vec<(WalletId, Row<Wallet>)> = wallet_ids
            .into_iter()
            .map(|id| {
                let row = self.store.wallet_or_create(&id, now);
                (id, row)
            })
            .collect();

        // Acquisition in global order: orders by id, then wallets by key.
        let mut makers: BTreeMap<OrderId, TxRow<'_, Order>> = BTreeMap::new();
        for (id, row) in &order_rows {
            makers.insert(*id, TxRow::acquire(row));
        }
        let mut taker = makers.remove(&order_id).ok_or_else(|| {
            CoreError::InternalInconsistency(format!("order {order_id} missing from pass rows"))
        })?;
        let mut wallets: BTreeMap<WalletId, TxRow<'_, Wallet>> = BTreeMap::new();
        for (id, row) in &wallet_rows {
            wallets.insert(id.clone(), TxRow::acquire(row));
        }

        // A concurrent pass may have settled the taker between snapshot and
        // acquisition.
        if !taker.is_open() {
            return Ok(Vec::new());
        }

        match Self::execute_pass(&market, &mut taker, &mut makers, &priority, &mut wallets, now) {
            Ok(outcome) => {
                for id in &outcome.closed {
                    self.store.retire_order(&market.id, *id);
                }
                self.store.record_trades(&market.id, outcome.trades.clone());
                for entry in outcome.audits {
                    self.audit.record(entry);
                }
                Ok(outcome.trades)
            }
            Err(err) => {
                taker.rollback();
                for row in makers.values_mut() {
                    row.rollback();
                }
                for row in wallets.values_mut() {
                    row.rollback();
                }
                Err(err)
            }
        }
    }

    /// Walk the priority list and settle every crossing. All rows are
    /// already locked; any error here aborts the whole pass.
    fn execute_pass(
        market: &Market,
        taker: &mut TxRow<'_, Order>,
        makers: &mut BTreeMap<OrderId, TxRow<'_, Order>>,
        priority: &[OrderId],
        wallets: &mut BTreeMap<WalletId, TxRow<'_, Wallet>>,
        now: DateTime<Utc>,
    ) -> CoreResult<PassOutcome> {
        let mut outcome = PassOutcome::default();
        let taker_user = taker.user_id;
        let taker_is_buy = taker.is_buy();
        let roles = if taker_is_buy {
            TradeRoles::TakerBuys
        } else {
            TradeRoles::TakerSells
        };

        for maker_id in priority {
            if taker.quantity_remaining.is_zero() {
                break;
            }
            let Some(maker) = makers.get_mut(maker_id) else {
                continue;
            };
            // Re-check under lock: the candidate may have closed since the
            // snapshot, and self-trades are skipped, never rejected.
            if !maker.is_open() || maker.user_id == taker_user {
                continue;
            }
            let Some(price) = maker.price else { continue };

            if let Some(limit) = taker.price {
                let crosses = if taker_is_buy {
                    price <= limit
                } else {
                    price >= limit
                };
                if !crosses {
                    continue;
                }
            }

            let mut qty = taker.quantity_remaining.min(maker.quantity_remaining);
            if taker_is_buy && taker.is_market() {
                // A market buy can spend at most its up-front reservation.
                // Deeper price levels only get more expensive, so running
                // out of budget ends the walk.
                let affordable = taker
                    .reserved
                    .as_decimal()
                    .checked_div(price.as_decimal())
                    .and_then(|q| Quantity::try_new(fixed(q)))
                    .ok_or_else(|| {
                        CoreError::InternalInconsistency(format!(
                            "order {}: budget division failed at price {price}",
                            taker.id
                        ))
                    })?;
                qty = qty.min(affordable);
                if qty.is_zero() {
                    break;
                }
            }
            if qty.is_zero() {
                continue;
            }
            let total = price.notional(qty).ok_or_else(|| {
                CoreError::InternalInconsistency(format!(
                    "order {}: notional overflow at price {price}",
                    taker.id
                ))
            })?;

            let trade = Self::apply_trade(market, roles, taker, maker, price, qty, total, wallets, now)?;
            if !maker.is_open() {
                outcome.closed.push(*maker_id);
            }
            outcome
                .audits
                .push(audit::trade_entry(&trade, "taker", trade.taker_user_id));
            outcome
                .audits
                .push(audit::trade_entry(&trade, "maker", trade.maker_user_id));
            outcome.trades.push(trade);
        }

        // Market orders never rest: cancel the remainder and release
        // whatever part of the reservation was not spent.
        if taker.is_market() {
            if taker.is_open() {
                taker.cancel(now)?;
                outcome.audits.push(AuditEntry::new(
                    Some(taker_user),
                    "order.cancelled",
                    format!("order:{}", taker.id),
                    json!({
                        "market": market.id,
                        "reason": "unfilled market order remainder",
                        "quantity_filled": taker.quantity_filled,
                    }),
                    now,
                ));
            }
            if !taker.reserved.is_zero() {
                let refund_id = if taker_is_buy {
                    WalletId::new(taker_user, market.quote.clone())
                } else {
                    WalletId::new(taker_user, market.base.clone())
                };
                let refund = taker.reserved;
                wallet_mut(wallets, &refund_id)?.unlock(refund, now)?;
                taker.reserved = Amount::ZERO;
            }
        }
        if !taker.is_open() {
            outcome.closed.push(taker.id);
        }
        Ok(outcome)
    }

    /// Settle one execution at the maker's price: four wallet transfers,
    /// reservation bookkeeping, fills on both orders.
    #[allow(clippy::too_many_arguments)]
    fn apply_trade(
        market: &Market,
        roles: TradeRoles,
        taker: &mut TxRow<'_, Order>,
        maker: &mut TxRow<'_, Order>,
        price: Price,
        qty: Quantity,
        total: Amount,
        wallets: &mut BTreeMap<WalletId, TxRow<'_, Wallet>>,
        now: DateTime<Utc>,
    ) -> CoreResult<Trade> {
        let (buy, sell): (&mut Order, &mut Order) = match roles {
            TradeRoles::TakerBuys => (&mut **taker, &mut **maker),
            TradeRoles::TakerSells => (&mut **maker, &mut **taker),
        };
        let buyer_quote = WalletId::new(buy.user_id, market.quote.clone());
        let buyer_base = WalletId::new(buy.user_id, market.base.clone());
        let seller_base = WalletId::new(sell.user_id, market.base.clone());
        let seller_quote = WalletId::new(sell.user_id, market.quote.clone());

        wallet_mut(wallets, &buyer_quote)?.deduct_locked(total, now)?;
        wallet_mut(wallets, &seller_base)?.deduct_locked(qty.into(), now)?;
        wallet_mut(wallets, &buyer_base)?.credit(qty.into(), now)?;
        wallet_mut(wallets, &seller_quote)?.credit(total, now)?;

        buy.reserved = buy
            .reserved
            .checked_sub(total)
            .ok_or_else(|| reservation_underflow(buy.id, total, buy.reserved))?;
        let sold = Amount::from(qty);
        sell.reserved = sell
            .reserved
            .checked_sub(sold)
            .ok_or_else(|| reservation_underflow(sell.id, sold, sell.reserved))?;

        buy.apply_fill(qty, now)?;
        sell.apply_fill(qty, now)?;

        // A limit buy that executed below its limit still holds quote
        // locked at the limit price; release the surplus so the
        // reservation always equals remaining x limit.
        if buy.order_type == OrderType::Limit {
            if let Some(limit) = buy.price {
                let target = limit.notional(buy.quantity_remaining).ok_or_else(|| {
                    CoreError::InternalInconsistency(format!(
                        "order {}: reservation target overflow",
                        buy.id
                    ))
                })?;
                let surplus = buy
                    .reserved
                    .checked_sub(target)
                    .ok_or_else(|| reservation_underflow(buy.id, target, buy.reserved))?;
                if !surplus.is_zero() {
                    wallet_mut(wallets, &buyer_quote)?.unlock(surplus, now)?;
                    buy.reserved = target;
                }
            }
        }

        let (taker_user, maker_user) = match roles {
            TradeRoles::TakerBuys => (buy.user_id, sell.user_id),
            TradeRoles::TakerSells => (sell.user_id, buy.user_id),
        };
        Ok(Trade::new(
            buy.id,
            sell.id,
            taker_user,
            maker_user,
            market.id.clone(),
            price,
            qty,
            total,
            now,
        ))
    }
}

fn wallet_mut<'w, 'a>(
    wallets: &'w mut BTreeMap<WalletId, TxRow<'a, Wallet>>,
    id: &WalletId,
) -> CoreResult<&'w mut TxRow<'a, Wallet>> {
    wallets.get_mut(id).ok_or_else(|| {
        CoreError::InternalInconsistency(format!("wallet {id} not locked by the pass"))
    })
}

fn reservation_underflow(id: OrderId, needed: Amount, held: Amount) -> CoreError {
    CoreError::InternalInconsistency(format!(
        "order {id}: reservation underflow, needed {needed} of {held}"
    ))
}

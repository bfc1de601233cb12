//! Row-locked in-memory store
//!
//! Every mutable entity (wallet, order, transaction) lives behind its own
//! mutex, registered in a concurrent map. Multi-row operations acquire all
//! their row locks up front in a single global order — order rows first,
//! then wallet rows, each class sorted by key — so two operations can never
//! wait on each other in a cycle.
//!
//! [`TxRow`] wraps an acquired row guard together with a snapshot taken at
//! acquisition time. An operation that fails part-way restores every
//! snapshot before releasing its guards, so other threads only ever observe
//! fully-applied or fully-rolled-back states.

use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use types::prelude::*;

use chrono::{DateTime, Utc};

/// A registered row: shared handle to one entity's mutex.
pub type Row<T> = Arc<Mutex<T>>;

/// An acquired row with rollback support.
///
/// Dropping the guard commits whatever state the row holds; call
/// [`TxRow::rollback`] first to restore the state observed at acquisition.
pub struct TxRow<'a, T: Clone> {
    guard: MutexGuard<'a, T>,
    snapshot: T,
}

impl<'a, T: Clone> TxRow<'a, T> {
    /// Lock the row and snapshot its current state.
    pub fn acquire(row: &'a Row<T>) -> Self {
        let guard = row.lock();
        let snapshot = guard.clone();
        Self { guard, snapshot }
    }

    /// Restore the state captured at acquisition.
    pub fn rollback(&mut self) {
        *self.guard = self.snapshot.clone();
    }
}

impl<T: Clone> Deref for TxRow<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T: Clone> DerefMut for TxRow<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

/// Registry of all rows plus the append-only trade log and the per-market
/// open-order index.
///
/// Map shards are only ever held for the duration of a single lookup or
/// insert; no store method blocks on a row mutex while holding a shard.
#[derive(Default)]
pub struct Store {
    wallets: DashMap<WalletId, Row<Wallet>>,
    orders: DashMap<OrderId, Row<Order>>,
    transactions: DashMap<TransactionId, Row<Transaction>>,
    /// Orders that may still match or be cancelled, by market.
    open_orders: DashMap<MarketId, Vec<OrderId>>,
    /// Immutable execution history, by market.
    trades: DashMap<MarketId, Vec<Trade>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wallet_row(&self, id: &WalletId) -> CoreResult<Row<Wallet>> {
        self.wallets
            .get(id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CoreError::NotFound(format!("wallet {id}")))
    }

    /// Fetch the wallet row, creating an empty wallet if none exists yet.
    pub fn wallet_or_create(&self, id: &WalletId, now: DateTime<Utc>) -> Row<Wallet> {
        Arc::clone(
            self.wallets
                .entry(id.clone())
                .or_insert_with(|| {
                    Arc::new(Mutex::new(Wallet::new(id.user_id, id.asset.clone(), now)))
                })
                .value(),
        )
    }

    pub fn wallet_snapshot(&self, id: &WalletId) -> CoreResult<Wallet> {
        Ok(self.wallet_row(id)?.lock().clone())
    }

    /// Snapshot every wallet belonging to `user`.
    pub fn wallets_for_user(&self, user_id: UserId) -> Vec<Wallet> {
        let rows: Vec<Row<Wallet>> = self
            .wallets
            .iter()
            .filter(|e| e.key().user_id == user_id)
            .map(|e| Arc::clone(e.value()))
            .collect();
        rows.iter().map(|r| r.lock().clone()).collect()
    }

    /// Register a new order row and index it as open in its market.
    pub fn insert_order(&self, order: Order) -> Row<Order> {
        let id = order.id;
        let market = order.market.clone();
        let row = Arc::new(Mutex::new(order));
        self.orders.insert(id, Arc::clone(&row));
        self.open_orders.entry(market).or_default().push(id);
        row
    }

    pub fn order_row(&self, id: OrderId) -> CoreResult<Row<Order>> {
        self.orders
            .get(&id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CoreError::NotFound(format!("order {id}")))
    }

    pub fn order_snapshot(&self, id: OrderId) -> CoreResult<Order> {
        Ok(self.order_row(id)?.lock().clone())
    }

    /// Ids currently indexed as open in `market`, oldest first.
    ///
    /// The index may briefly lag the row state; callers re-check `is_open`
    /// under the row lock.
    pub fn open_order_ids(&self, market: &MarketId) -> Vec<OrderId> {
        self.open_orders
            .get(market)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    /// Drop a closed order from the open index.
    pub fn retire_order(&self, market: &MarketId, id: OrderId) {
        if let Some(mut ids) = self.open_orders.get_mut(market) {
            ids.retain(|x| *x != id);
        }
    }

    /// Snapshot all orders belonging to `user`, open or closed.
    pub fn orders_for_user(&self, user_id: UserId) -> Vec<Order> {
        let rows: Vec<Row<Order>> = self
            .orders
            .iter()
            .map(|e| Arc::clone(e.value()))
            .collect();
        rows.iter()
            .map(|r| r.lock().clone())
            .filter(|o| o.user_id == user_id)
            .collect()
    }

    pub fn insert_transaction(&self, tx: Transaction) -> Row<Transaction> {
        let id = tx.id;
        let row = Arc::new(Mutex::new(tx));
        self.transactions.insert(id, Arc::clone(&row));
        row
    }

    pub fn transaction_row(&self, id: TransactionId) -> CoreResult<Row<Transaction>> {
        self.transactions
            .get(&id)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| CoreError::NotFound(format!("transaction {id}")))
    }

    pub fn transaction_snapshot(&self, id: TransactionId) -> CoreResult<Transaction> {
        Ok(self.transaction_row(id)?.lock().clone())
    }

    /// Append executed trades to the market's immutable log.
    pub fn record_trades(&self, market: &MarketId, trades: Vec<Trade>) {
        if trades.is_empty() {
            return;
        }
        self.trades.entry(market.clone()).or_default().extend(trades);
    }

    pub fn trades_snapshot(&self, market: &MarketId) -> Vec<Trade> {
        self.trades
            .get(market)
            .map(|t| t.clone())
            .unwrap_or_default()
    }
}

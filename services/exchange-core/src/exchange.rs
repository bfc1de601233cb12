//! Exchange facade
//!
//! Owns the row store, the market registry and the audit sink. Mutating
//! operations live in the `orders`, `matching` and `funding` modules; this
//! module holds construction, account provisioning and the read API used by
//! market data.

use crate::audit::AuditSink;
use crate::markets::MarketRegistry;
use crate::store::Store;
use chrono::Utc;
use std::sync::Arc;
use types::prelude::*;

pub struct Exchange {
    pub(crate) store: Store,
    pub(crate) markets: MarketRegistry,
    pub(crate) audit: Arc<dyn AuditSink>,
}

impl Exchange {
    pub fn new(markets: MarketRegistry, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store: Store::new(),
            markets,
            audit,
        }
    }

    pub fn markets(&self) -> &MarketRegistry {
        &self.markets
    }

    /// Provision one empty wallet per active asset for a new user.
    ///
    /// Idempotent: wallets that already exist keep their balances.
    pub fn register_user(&self, user_id: UserId) -> Vec<Wallet> {
        let now = Utc::now();
        self.markets
            .active_assets()
            .map(|asset| {
                let id = WalletId::new(user_id, asset.symbol.clone());
                self.store.wallet_or_create(&id, now).lock().clone()
            })
            .collect()
    }

    pub fn wallet(&self, user_id: UserId, asset: &AssetSymbol) -> CoreResult<Wallet> {
        self.store
            .wallet_snapshot(&WalletId::new(user_id, asset.clone()))
    }

    pub fn wallets(&self, user_id: UserId) -> Vec<Wallet> {
        self.store.wallets_for_user(user_id)
    }

    pub fn order(&self, id: OrderId) -> CoreResult<Order> {
        self.store.order_snapshot(id)
    }

    pub fn orders_for_user(&self, user_id: UserId) -> Vec<Order> {
        self.store.orders_for_user(user_id)
    }

    /// Snapshot of the orders currently open in `market`.
    pub fn open_orders_in(&self, market: &MarketId) -> CoreResult<Vec<Order>> {
        self.markets.market(market)?;
        let orders = self
            .store
            .open_order_ids(market)
            .into_iter()
            .filter_map(|id| self.store.order_snapshot(id).ok())
            .filter(|o| o.is_open())
            .collect();
        Ok(orders)
    }

    /// Full execution history for `market`, oldest first.
    pub fn trades_in(&self, market: &MarketId) -> CoreResult<Vec<Trade>> {
        self.markets.market(market)?;
        Ok(self.store.trades_snapshot(market))
    }

    pub fn transaction(&self, id: TransactionId) -> CoreResult<Transaction> {
        self.store.transaction_snapshot(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;

    #[test]
    fn test_register_user_creates_wallet_per_active_asset() {
        let exchange = Exchange::new(MarketRegistry::standard(), Arc::new(MemoryAuditSink::new()));
        let user = UserId::new();
        let wallets = exchange.register_user(user);
        assert_eq!(wallets.len(), 3);
        assert!(wallets.iter().all(|w| w.available.is_zero()));

        let btc = AssetSymbol::try_new("BTC").unwrap();
        assert!(exchange.wallet(user, &btc).is_ok());
    }

    #[test]
    fn test_reads_reject_unknown_market() {
        let exchange = Exchange::new(MarketRegistry::standard(), Arc::new(MemoryAuditSink::new()));
        let bogus = MarketId::try_new("XRP-USDT").unwrap();
        assert!(matches!(
            exchange.open_orders_in(&bogus),
            Err(CoreError::InvalidMarket { .. })
        ));
        assert!(exchange.trades_in(&bogus).is_err());
    }
}

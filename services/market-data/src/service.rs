//! Cached market-data service
//!
//! Read-only facade over the exchange core. Each view has its own TTL
//! cache: depth snapshots stay valid for a second, tickers for five. The
//! caches are constructor-injected so tests can pin TTLs (usually zero)
//! instead of sleeping.

use crate::cache::TtlCache;
use crate::order_book::OrderBook;
use crate::ticker::Ticker;
use crate::trades::{self, PublicTrade};
use chrono::Utc;
use exchange_core::Exchange;
use std::sync::Arc;
use std::time::Duration;
use types::prelude::*;

pub const DEPTH_TTL: Duration = Duration::from_secs(1);
pub const TICKER_TTL: Duration = Duration::from_secs(5);
pub const TRADES_TTL: Duration = Duration::from_secs(1);

/// Largest depth a caller may request.
pub const MAX_DEPTH: usize = 100;
pub const DEFAULT_DEPTH: usize = 20;

/// Largest number of trades the public feed returns per request.
pub const MAX_RECENT_TRADES: usize = 100;
pub const DEFAULT_RECENT_TRADES: usize = 50;

pub struct MarketDataService {
    exchange: Arc<Exchange>,
    depth_cache: TtlCache<(MarketId, usize), OrderBook>,
    ticker_cache: TtlCache<MarketId, Ticker>,
    trades_cache: TtlCache<(MarketId, usize), Vec<PublicTrade>>,
}

impl MarketDataService {
    /// Service with production TTLs.
    pub fn new(exchange: Arc<Exchange>) -> Self {
        Self::with_caches(
            exchange,
            TtlCache::new(DEPTH_TTL),
            TtlCache::new(TICKER_TTL),
            TtlCache::new(TRADES_TTL),
        )
    }

    pub fn with_caches(
        exchange: Arc<Exchange>,
        depth_cache: TtlCache<(MarketId, usize), OrderBook>,
        ticker_cache: TtlCache<MarketId, Ticker>,
        trades_cache: TtlCache<(MarketId, usize), Vec<PublicTrade>>,
    ) -> Self {
        Self {
            exchange,
            depth_cache,
            ticker_cache,
            trades_cache,
        }
    }

    /// Aggregated depth for `market`, at most `depth` levels per side.
    pub fn order_book(&self, market: &MarketId, depth: usize) -> CoreResult<OrderBook> {
        let depth = depth.clamp(1, MAX_DEPTH);
        self.depth_cache
            .get_or_try_insert_with((market.clone(), depth), || {
                let orders = self.exchange.open_orders_in(market)?;
                tracing::debug!(%market, depth, open_orders = orders.len(), "rebuilding depth");
                Ok(OrderBook::build(market.clone(), &orders, depth, Utc::now()))
            })
    }

    /// 24-hour ticker for `market`.
    pub fn ticker(&self, market: &MarketId) -> CoreResult<Ticker> {
        self.ticker_cache.get_or_try_insert_with(market.clone(), || {
            let trades = self.exchange.trades_in(market)?;
            Ok(Ticker::compute(market.clone(), &trades, Utc::now()))
        })
    }

    /// Most recent public trades for `market`, newest first.
    pub fn recent_trades(&self, market: &MarketId, limit: usize) -> CoreResult<Vec<PublicTrade>> {
        let limit = limit.clamp(1, MAX_RECENT_TRADES);
        self.trades_cache
            .get_or_try_insert_with((market.clone(), limit), || {
                let trades = self.exchange.trades_in(market)?;
                Ok(trades::recent(&trades, limit))
            })
    }
}

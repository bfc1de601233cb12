//! Market data views over the exchange core
//!
//! Read-side of the system: aggregated order book depth, a 24-hour
//! rolling ticker, and the public trade feed, each behind its own TTL
//! cache. Everything here is derived state; the exchange core's row store
//! and trade log are the single source of truth.
//!
//! # Modules
//! - `cache`: generic TTL cache
//! - `order_book`: depth aggregation
//! - `ticker`: 24-hour statistics
//! - `trades`: public trade feed
//! - `service`: the cached facade

pub mod cache;
pub mod order_book;
pub mod service;
pub mod ticker;
pub mod trades;

pub use cache::TtlCache;
pub use order_book::{DepthLevel, OrderBook};
pub use service::MarketDataService;
pub use ticker::Ticker;
pub use trades::PublicTrade;

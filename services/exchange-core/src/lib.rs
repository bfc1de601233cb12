//! Matching engine and wallet ledger core
//!
//! Single-process exchange core: a row-locked in-memory store, a
//! price-time-priority continuous double auction, a wallet ledger with
//! available/locked sub-balances, and two-phase funding flows.
//!
//! All monetary arithmetic is 8-fractional-digit fixed-point decimal,
//! truncated toward zero (see `types::numeric`). Multi-row operations are
//! atomic: they acquire every row lock in one global order and roll back
//! to acquisition snapshots on failure.
//!
//! # Modules
//! - `store`: row registry, lock discipline and rollback ([`store::TxRow`])
//! - `markets`: asset and trading-pair registry
//! - `exchange`: the facade, account provisioning and the read API
//! - `orders`: order placement and cancellation
//! - `matching`: the atomic matching pass
//! - `funding`: deposits, withdrawals and admin corrections
//! - `audit`: append-only audit trail

pub mod audit;
pub mod exchange;
pub mod funding;
pub mod markets;
pub mod matching;
pub mod orders;
pub mod store;

pub use audit::{AuditEntry, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use exchange::Exchange;
pub use markets::{Market, MarketRegistry};

//! Types library for the matching and ledger core
//!
//! This library provides all core type definitions shared by the
//! exchange-core and market-data crates, ensuring type safety and
//! deterministic decimal behavior.
//!
//! # Modules
//! - `ids`: Unique identifiers (OrderId, TradeId, UserId, TransactionId, MarketId)
//! - `numeric`: Fixed-point decimal types (Price, Quantity, Amount)
//! - `asset`: Tradable asset definitions
//! - `order`: Order lifecycle types
//! - `trade`: Immutable trade records
//! - `wallet`: Wallet ledger record and primitives
//! - `transaction`: Deposit/withdrawal transactions
//! - `errors`: Error taxonomy

pub mod asset;
pub mod errors;
pub mod ids;
pub mod numeric;
pub mod order;
pub mod trade;
pub mod transaction;
pub mod wallet;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::asset::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::order::*;
    pub use crate::trade::*;
    pub use crate::transaction::*;
    pub use crate::wallet::*;
}

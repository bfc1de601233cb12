//! Wallet ledger record and its four mutation primitives
//!
//! One wallet exists per (user, asset) pair. Both sub-balances are
//! non-negative 8-dp decimals; `total = available + locked` is the quantity
//! the user owns. Callers must hold the wallet's row lock for the duration
//! of any mutation — the primitives themselves only enforce the arithmetic
//! invariants.

use crate::asset::AssetSymbol;
use crate::errors::CoreError;
use crate::ids::UserId;
use crate::numeric::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable row key for a wallet: the (user, asset) pair.
///
/// `Ord` gives the fixed lock-acquisition order for transactions touching
/// several wallets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletId {
    pub user_id: UserId,
    pub asset: AssetSymbol,
}

impl WalletId {
    pub fn new(user_id: UserId, asset: AssetSymbol) -> Self {
        Self { user_id, asset }
    }
}

impl fmt::Display for WalletId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.asset)
    }
}

/// Per-(user, asset) balance record with available/locked sub-balances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub available: Amount,
    pub locked: Amount,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create an empty wallet.
    pub fn new(user_id: UserId, asset: AssetSymbol, now: DateTime<Utc>) -> Self {
        Self {
            id: WalletId::new(user_id, asset),
            available: Amount::ZERO,
            locked: Amount::ZERO,
            updated_at: now,
        }
    }

    /// Total holdings: available + locked.
    pub fn total(&self) -> Amount {
        // Two non-negative 8-dp balances cannot overflow a 96-bit mantissa
        // for any realistic holding; treat overflow as saturation.
        self.available.checked_add(self.locked).unwrap_or(self.available)
    }

    /// Move `amount` from available to locked.
    ///
    /// Fails with `InsufficientFunds` and no partial effect if
    /// `available < amount`.
    pub fn lock(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), CoreError> {
        let remaining = self.available.checked_sub(amount).ok_or_else(|| {
            CoreError::insufficient_funds(self.id.asset.as_str(), amount, self.available)
        })?;
        let locked = self
            .locked
            .checked_add(amount)
            .ok_or_else(|| overflow(&self.id))?;
        self.available = remaining;
        self.locked = locked;
        self.updated_at = now;
        Ok(())
    }

    /// Move `amount` from locked back to available.
    ///
    /// `locked < amount` means a reservation was lost or released twice —
    /// a programming-error-level inconsistency, not a user-facing failure.
    pub fn unlock(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), CoreError> {
        let locked = self
            .locked
            .checked_sub(amount)
            .ok_or_else(|| underflow(&self.id, "unlock", amount, self.locked))?;
        let available = self
            .available
            .checked_add(amount)
            .ok_or_else(|| overflow(&self.id))?;
        self.locked = locked;
        self.available = available;
        self.updated_at = now;
        Ok(())
    }

    /// Consume `amount` from locked (a reservation settled by a trade or an
    /// approved withdrawal).
    pub fn deduct_locked(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), CoreError> {
        let locked = self
            .locked
            .checked_sub(amount)
            .ok_or_else(|| underflow(&self.id, "deduct_locked", amount, self.locked))?;
        self.locked = locked;
        self.updated_at = now;
        Ok(())
    }

    /// Add `amount` to available. No upper bound is enforced at ledger level.
    pub fn credit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), CoreError> {
        let available = self
            .available
            .checked_add(amount)
            .ok_or_else(|| overflow(&self.id))?;
        self.available = available;
        self.updated_at = now;
        Ok(())
    }

    /// Remove `amount` from available directly.
    ///
    /// Used only by admin corrections; order flow always goes through
    /// lock/unlock/deduct_locked.
    pub fn debit(&mut self, amount: Amount, now: DateTime<Utc>) -> Result<(), CoreError> {
        let available = self.available.checked_sub(amount).ok_or_else(|| {
            CoreError::insufficient_funds(self.id.asset.as_str(), amount, self.available)
        })?;
        self.available = available;
        self.updated_at = now;
        Ok(())
    }
}

fn underflow(id: &WalletId, op: &str, amount: Amount, locked: Amount) -> CoreError {
    CoreError::InternalInconsistency(format!(
        "wallet {id}: {op} of {amount} exceeds locked balance {locked}"
    ))
}

fn overflow(id: &WalletId) -> CoreError {
    CoreError::InternalInconsistency(format!("wallet {id}: balance overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::fixed;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn wallet_with(available: &str) -> Wallet {
        let mut w = Wallet::new(
            UserId::new(),
            AssetSymbol::try_new("USDT").unwrap(),
            Utc::now(),
        );
        w.available = Amount::from_str(available).unwrap();
        w
    }

    fn amt(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    #[test]
    fn test_lock_moves_balance() {
        let mut w = wallet_with("10000");
        w.lock(amt("3000"), Utc::now()).unwrap();
        assert_eq!(w.available, amt("7000"));
        assert_eq!(w.locked, amt("3000"));
        assert_eq!(w.total(), amt("10000"));
    }

    #[test]
    fn test_lock_insufficient_no_partial_effect() {
        let mut w = wallet_with("100");
        let err = w.lock(amt("100.00000001"), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds { .. }));
        assert_eq!(w.available, amt("100"));
        assert_eq!(w.locked, Amount::ZERO);
    }

    #[test]
    fn test_unlock_roundtrip() {
        let mut w = wallet_with("10000");
        w.lock(amt("3000"), Utc::now()).unwrap();
        w.unlock(amt("1000"), Utc::now()).unwrap();
        assert_eq!(w.available, amt("8000"));
        assert_eq!(w.locked, amt("2000"));
    }

    #[test]
    fn test_unlock_underflow_is_internal() {
        let mut w = wallet_with("10000");
        w.lock(amt("50"), Utc::now()).unwrap();
        let err = w.unlock(amt("51"), Utc::now()).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(w.locked, amt("50"));
    }

    #[test]
    fn test_deduct_locked() {
        let mut w = wallet_with("10000");
        w.lock(amt("3000"), Utc::now()).unwrap();
        w.deduct_locked(amt("1000"), Utc::now()).unwrap();
        assert_eq!(w.locked, amt("2000"));
        assert_eq!(w.available, amt("7000"));
        assert_eq!(w.total(), amt("9000"));
    }

    #[test]
    fn test_credit() {
        let mut w = wallet_with("10000");
        w.credit(amt("5000"), Utc::now()).unwrap();
        assert_eq!(w.available, amt("15000"));
    }

    #[test]
    fn test_debit_requires_available() {
        let mut w = wallet_with("10");
        assert!(w.debit(amt("11"), Utc::now()).is_err());
        w.debit(amt("4"), Utc::now()).unwrap();
        assert_eq!(w.available, amt("6"));
    }

    proptest! {
        /// Any sequence of valid primitives preserves non-negative balances
        /// and conservation between lock/unlock.
        #[test]
        fn prop_lock_unlock_conserves(start in 0u64..1_000_000, locked in 0u64..1_000_000) {
            let mut w = wallet_with("0");
            w.available = Amount::try_new(fixed(Decimal::from(start))).unwrap();
            let lock_amt = Amount::try_new(Decimal::from(locked)).unwrap();

            let total_before = w.total();
            if w.lock(lock_amt, Utc::now()).is_ok() {
                prop_assert_eq!(w.total(), total_before);
                w.unlock(lock_amt, Utc::now()).unwrap();
                prop_assert_eq!(w.total(), total_before);
                prop_assert_eq!(w.locked, Amount::ZERO);
            } else {
                prop_assert!(Decimal::from(locked) > Decimal::from(start));
            }
            prop_assert!(w.available >= Amount::ZERO);
            prop_assert!(w.locked >= Amount::ZERO);
        }
    }
}

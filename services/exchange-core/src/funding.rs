//! Funding: deposits, withdrawals and admin corrections
//!
//! Deposits and withdrawals are two-phase: users create a pending
//! transaction, an admin approves or rejects it. Withdrawals lock the
//! funds at request time so the balance cannot be spent while the request
//! is pending; approval consumes the lock, rejection releases it.
//! Settlement is exactly-once: the transaction row is locked while its
//! status gate is checked and the wallet mutation applied, and the status
//! change rolls back if the wallet mutation fails.

use crate::audit::AuditEntry;
use crate::exchange::Exchange;
use crate::store::TxRow;
use chrono::Utc;
use serde_json::json;
use types::prelude::*;

impl Exchange {
    /// Request a deposit. No balance changes until an admin approves.
    pub fn deposit(
        &self,
        user_id: UserId,
        asset: AssetSymbol,
        amount: Amount,
        note: Option<String>,
    ) -> CoreResult<Transaction> {
        let now = Utc::now();
        self.markets.active_asset(&asset)?;
        require_positive(amount)?;

        let tx = Transaction::new(user_id, asset, TransactionKind::Deposit, amount, note, now);
        let snapshot = tx.clone();
        self.store.insert_transaction(tx);
        self.audit.record(AuditEntry::new(
            Some(user_id),
            "transaction.deposit_requested",
            format!("transaction:{}", snapshot.id),
            json!({ "asset": snapshot.asset, "amount": snapshot.amount }),
            now,
        ));
        Ok(snapshot)
    }

    /// Request a withdrawal, locking the amount immediately.
    pub fn withdraw(
        &self,
        user_id: UserId,
        asset: AssetSymbol,
        amount: Amount,
        note: Option<String>,
    ) -> CoreResult<Transaction> {
        let now = Utc::now();
        self.markets.active_asset(&asset)?;
        require_positive(amount)?;

        let wallet_row = self.store.wallet_row(&WalletId::new(user_id, asset.clone()))?;
        let tx;
        {
            let mut wallet = wallet_row.lock();
            wallet.lock(amount, now)?;
            tx = Transaction::new(user_id, asset, TransactionKind::Withdraw, amount, note, now);
            self.store.insert_transaction(tx.clone());
        }
        self.audit.record(AuditEntry::new(
            Some(user_id),
            "transaction.withdraw_requested",
            format!("transaction:{}", tx.id),
            json!({ "asset": tx.asset, "amount": tx.amount }),
            now,
        ));
        Ok(tx)
    }

    /// Approve a pending transaction and settle it against the wallet.
    ///
    /// The pending-status gate makes settlement exactly-once: a second
    /// approval attempt fails with `InvalidState` before touching any
    /// balance.
    pub fn approve_transaction(
        &self,
        admin: UserId,
        tx_id: TransactionId,
    ) -> CoreResult<Transaction> {
        let now = Utc::now();
        let tx_row = self.store.transaction_row(tx_id)?;
        let mut tx = TxRow::acquire(&tx_row);
        tx.approve(admin, now)?;

        let wallet_id = WalletId::new(tx.user_id, tx.asset.clone());
        let settle = || -> CoreResult<()> {
            match tx.kind {
                TransactionKind::Deposit => {
                    let row = self.store.wallet_or_create(&wallet_id, now);
                    let result = row.lock().credit(tx.amount, now);
                    result
                }
                TransactionKind::Withdraw => {
                    let row = self.store.wallet_row(&wallet_id)?;
                    let result = row.lock().deduct_locked(tx.amount, now);
                    result
                }
            }
        };
        if let Err(err) = settle() {
            tx.rollback();
            return Err(err);
        }
        tx.complete(now);

        self.audit.record(AuditEntry::new(
            Some(admin),
            "admin.transaction_approved",
            format!("transaction:{tx_id}"),
            json!({
                "user": tx.user_id,
                "kind": tx.kind,
                "asset": tx.asset,
                "amount": tx.amount,
            }),
            now,
        ));
        Ok(tx.clone())
    }

    /// Reject a pending transaction. A rejected withdrawal releases the
    /// funds it had locked.
    pub fn reject_transaction(
        &self,
        admin: UserId,
        tx_id: TransactionId,
        reason: impl Into<String>,
    ) -> CoreResult<Transaction> {
        let now = Utc::now();
        let tx_row = self.store.transaction_row(tx_id)?;
        let mut tx = TxRow::acquire(&tx_row);
        tx.reject(admin, reason, now)?;

        if tx.is_withdraw() {
            let wallet_id = WalletId::new(tx.user_id, tx.asset.clone());
            let released = self
                .store
                .wallet_row(&wallet_id)
                .and_then(|row| row.lock().unlock(tx.amount, now));
            if let Err(err) = released {
                tx.rollback();
                return Err(err);
            }
        }

        self.audit.record(AuditEntry::new(
            Some(admin),
            "admin.transaction_rejected",
            format!("transaction:{tx_id}"),
            json!({
                "user": tx.user_id,
                "kind": tx.kind,
                "reason": tx.rejection_reason,
            }),
            now,
        ));
        Ok(tx.clone())
    }

    /// Credit a user's wallet directly, creating it if needed.
    pub fn admin_credit(
        &self,
        admin: UserId,
        user_id: UserId,
        asset: AssetSymbol,
        amount: Amount,
        note: Option<String>,
    ) -> CoreResult<Wallet> {
        let now = Utc::now();
        self.markets.asset(&asset)?;
        require_positive(amount)?;

        let wallet_id = WalletId::new(user_id, asset);
        let row = self.store.wallet_or_create(&wallet_id, now);
        let snapshot = {
            let mut wallet = row.lock();
            wallet.credit(amount, now)?;
            wallet.clone()
        };
        self.audit.record(AuditEntry::new(
            Some(admin),
            "admin.wallet_credited",
            format!("wallet:{wallet_id}"),
            json!({ "amount": amount, "available": snapshot.available, "note": note }),
            now,
        ));
        Ok(snapshot)
    }

    /// Remove funds from a user's available balance directly.
    ///
    /// Fails with `InsufficientFunds` rather than going negative; locked
    /// funds are never touched by a debit.
    pub fn admin_debit(
        &self,
        admin: UserId,
        user_id: UserId,
        asset: AssetSymbol,
        amount: Amount,
        note: Option<String>,
    ) -> CoreResult<Wallet> {
        let now = Utc::now();
        require_positive(amount)?;

        let wallet_id = WalletId::new(user_id, asset);
        let row = self.store.wallet_row(&wallet_id)?;
        let snapshot = {
            let mut wallet = row.lock();
            wallet.debit(amount, now)?;
            wallet.clone()
        };
        self.audit.record(AuditEntry::new(
            Some(admin),
            "admin.wallet_debited",
            format!("wallet:{wallet_id}"),
            json!({ "amount": amount, "available": snapshot.available, "note": note }),
            now,
        ));
        Ok(snapshot)
    }
}

fn require_positive(amount: Amount) -> CoreResult<()> {
    if amount.is_zero() {
        return Err(CoreError::InvalidParams(
            "amount must be positive".to_string(),
        ));
    }
    Ok(())
}

//! Deposit and withdrawal transaction records
//!
//! Both kinds are created `pending` and settle only through admin
//! approval. Deposits credit the wallet on approval; withdrawals lock
//! funds at request time, consume the lock on approval, and release it on
//! rejection.

use crate::asset::AssetSymbol;
use crate::errors::CoreError;
use crate::ids::{TransactionId, UserId};
use crate::numeric::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

/// A pending or settled funding request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub asset: AssetSymbol,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub status: TransactionStatus,
    pub approved_by: Option<UserId>,
    pub rejection_reason: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(
        user_id: UserId,
        asset: AssetSymbol,
        kind: TransactionKind,
        amount: Amount,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            user_id,
            asset,
            kind,
            amount,
            status: TransactionStatus::Pending,
            approved_by: None,
            rejection_reason: None,
            note,
            created_at: now,
            approved_at: None,
            completed_at: None,
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.kind == TransactionKind::Deposit
    }

    pub fn is_withdraw(&self) -> bool {
        self.kind == TransactionKind::Withdraw
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransactionStatus::Pending
    }

    /// Mark approved. Only pending transactions can be processed.
    pub fn approve(&mut self, approver: UserId, now: DateTime<Utc>) -> Result<(), CoreError> {
        self.ensure_pending()?;
        self.status = TransactionStatus::Approved;
        self.approved_by = Some(approver);
        self.approved_at = Some(now);
        Ok(())
    }

    /// Mark rejected with a reason.
    pub fn reject(
        &mut self,
        approver: UserId,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        self.ensure_pending()?;
        self.status = TransactionStatus::Rejected;
        self.approved_by = Some(approver);
        self.rejection_reason = Some(reason.into());
        self.approved_at = Some(now);
        Ok(())
    }

    /// Mark completed after the ledger mutation has been applied.
    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = TransactionStatus::Completed;
        self.completed_at = Some(now);
    }

    fn ensure_pending(&self) -> Result<(), CoreError> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(CoreError::InvalidState(format!(
                "transaction {} has already been processed",
                self.id
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn pending_withdraw() -> Transaction {
        Transaction::new(
            UserId::new(),
            AssetSymbol::try_new("BTC").unwrap(),
            TransactionKind::Withdraw,
            Amount::from_str("1.5").unwrap(),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn test_new_transaction_pending() {
        let tx = pending_withdraw();
        assert!(tx.is_pending());
        assert!(tx.is_withdraw());
        assert!(tx.approved_by.is_none());
    }

    #[test]
    fn test_approve_then_complete() {
        let mut tx = pending_withdraw();
        let admin = UserId::new();
        tx.approve(admin, Utc::now()).unwrap();
        assert_eq!(tx.status, TransactionStatus::Approved);
        assert_eq!(tx.approved_by, Some(admin));

        tx.complete(Utc::now());
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(tx.completed_at.is_some());
    }

    #[test]
    fn test_double_process_is_invalid_state() {
        let mut tx = pending_withdraw();
        tx.reject(UserId::new(), "no good", Utc::now()).unwrap();
        let err = tx.approve(UserId::new(), Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        assert_eq!(tx.rejection_reason.as_deref(), Some("no good"));
    }
}

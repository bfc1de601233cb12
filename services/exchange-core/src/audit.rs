//! Append-only audit trail
//!
//! Every ledger mutation and trade execution emits one entry, synchronously
//! with the operation that caused it. The sink is a collaborator of the
//! exchange so deployments can swap the log target without touching core
//! logic; tests use [`MemoryAuditSink`] to assert on emitted entries.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use types::prelude::*;

/// One audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Acting user, if the mutation was user-initiated.
    pub actor: Option<UserId>,
    pub action: &'static str,
    /// Entity the entry refers to, e.g. `order:<id>` or `wallet:<user>:<asset>`.
    pub entity: String,
    pub details: serde_json::Value,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: Option<UserId>,
        action: &'static str,
        entity: impl Into<String>,
        details: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            actor,
            action,
            entity: entity.into(),
            details,
            at,
        }
    }
}

/// Trade executions audit both participants: one entry per role.
pub fn trade_entry(trade: &Trade, role: &'static str, user: UserId) -> AuditEntry {
    AuditEntry::new(
        Some(user),
        "trade.executed",
        format!("trade:{}", trade.id),
        json!({
            "market": trade.market,
            "role": role,
            "price": trade.price,
            "quantity": trade.quantity,
            "total": trade.total,
            "buy_order_id": trade.buy_order_id,
            "sell_order_id": trade.sell_order_id,
        }),
        trade.executed_at,
    )
}

/// Destination for audit entries.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Emits entries as structured log events under the `audit` target.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        tracing::info!(
            target: "audit",
            actor = ?entry.actor,
            action = entry.action,
            entity = %entry.entity,
            details = %entry.details,
            "audit entry"
        );
    }
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }

    pub fn count_action(&self, action: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_memory_sink_collects_entries() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEntry::new(
            None,
            "order.placed",
            "order:test",
            json!({}),
            Utc::now(),
        ));
        sink.record(AuditEntry::new(
            None,
            "order.cancelled",
            "order:test",
            json!({}),
            Utc::now(),
        ));
        assert_eq!(sink.entries().len(), 2);
        assert_eq!(sink.count_action("order.placed"), 1);
    }

    #[test]
    fn test_trade_entry_carries_both_order_ids() {
        let price = Price::from_u64(100);
        let qty = Quantity::from_str("2").unwrap();
        let trade = Trade::new(
            OrderId::new(),
            OrderId::new(),
            UserId::new(),
            UserId::new(),
            MarketId::try_new("BTC-USDT").unwrap(),
            price,
            qty,
            price.notional(qty).unwrap(),
            Utc::now(),
        );
        let entry = trade_entry(&trade, "taker", trade.taker_user_id);
        assert_eq!(entry.action, "trade.executed");
        assert_eq!(entry.details["role"], "taker");
        assert_eq!(entry.details["total"], "200.00000000");
    }
}

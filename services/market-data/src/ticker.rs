//! 24-hour rolling ticker
//!
//! Computed from the immutable trade log: last price over all history,
//! open/high/low/volume over the trailing 24 hours. Change is quoted
//! against the window's first trade and the percentage is truncated at two
//! fractional digits, consistent with the ledger's truncate-toward-zero
//! arithmetic.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use types::prelude::*;

/// Market statistics over the trailing 24 hours.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticker {
    pub market: MarketId,
    /// Most recent execution price, regardless of age.
    pub last_price: Option<Price>,
    /// Price of the oldest trade inside the window.
    pub open_24h: Option<Price>,
    pub high_24h: Option<Price>,
    pub low_24h: Option<Price>,
    /// Base-asset volume inside the window.
    pub volume_24h: Quantity,
    /// Quote-asset turnover inside the window.
    pub quote_volume_24h: Amount,
    /// `last - open`; zero when the window is empty.
    pub change_24h: Decimal,
    /// Change relative to the open, in percent, truncated at 2 digits.
    pub change_percent_24h: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Ticker {
    /// Compute the ticker from `trades` (chronological, as recorded).
    pub fn compute(market: MarketId, trades: &[Trade], now: DateTime<Utc>) -> Self {
        let last_price = trades.last().map(|t| t.price);
        let cutoff = now - Duration::hours(24);

        let mut open_24h = None;
        let mut high_24h: Option<Price> = None;
        let mut low_24h: Option<Price> = None;
        let mut volume_24h = Quantity::ZERO;
        let mut quote_volume_24h = Amount::ZERO;

        for trade in trades.iter().filter(|t| t.executed_at >= cutoff) {
            if open_24h.is_none() {
                open_24h = Some(trade.price);
            }
            high_24h = Some(high_24h.map_or(trade.price, |h| h.max(trade.price)));
            low_24h = Some(low_24h.map_or(trade.price, |l| l.min(trade.price)));
            volume_24h = volume_24h
                .checked_add(trade.quantity)
                .unwrap_or(volume_24h);
            quote_volume_24h = quote_volume_24h
                .checked_add(trade.total)
                .unwrap_or(quote_volume_24h);
        }

        let (change_24h, change_percent_24h) = match (last_price, open_24h) {
            (Some(last), Some(open)) => {
                let change = last.as_decimal() - open.as_decimal();
                let percent = change
                    .checked_div(open.as_decimal())
                    .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                    .map(|p| p.round_dp_with_strategy(2, RoundingStrategy::ToZero))
                    .unwrap_or(Decimal::ZERO);
                (change, percent)
            }
            _ => (Decimal::ZERO, Decimal::ZERO),
        };

        Self {
            market,
            last_price,
            open_24h,
            high_24h,
            low_24h,
            volume_24h,
            quote_volume_24h,
            change_24h,
            change_percent_24h,
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn market() -> MarketId {
        MarketId::try_new("BTC-USDT").unwrap()
    }

    fn trade(p: u64, q: &str, at: DateTime<Utc>) -> Trade {
        let price = Price::from_u64(p);
        let quantity = Quantity::from_str(q).unwrap();
        Trade::new(
            OrderId::new(),
            OrderId::new(),
            UserId::new(),
            UserId::new(),
            market(),
            price,
            quantity,
            price.notional(quantity).unwrap(),
            at,
        )
    }

    #[test]
    fn test_empty_history() {
        let ticker = Ticker::compute(market(), &[], Utc::now());
        assert!(ticker.last_price.is_none());
        assert!(ticker.open_24h.is_none());
        assert!(ticker.volume_24h.is_zero());
        assert_eq!(ticker.change_percent_24h, Decimal::ZERO);
    }

    #[test]
    fn test_window_statistics() {
        let now = Utc::now();
        let trades = vec![
            trade(100, "1", now - Duration::hours(23)),
            trade(120, "2", now - Duration::hours(12)),
            trade(110, "1", now - Duration::hours(1)),
        ];
        let ticker = Ticker::compute(market(), &trades, now);

        assert_eq!(ticker.last_price, Some(Price::from_u64(110)));
        assert_eq!(ticker.open_24h, Some(Price::from_u64(100)));
        assert_eq!(ticker.high_24h, Some(Price::from_u64(120)));
        assert_eq!(ticker.low_24h, Some(Price::from_u64(100)));
        assert_eq!(ticker.volume_24h, Quantity::from_str("4").unwrap());
        assert_eq!(ticker.quote_volume_24h, Amount::from_str("450").unwrap());
        assert_eq!(ticker.change_24h, Decimal::from(10));
        assert_eq!(ticker.change_percent_24h, Decimal::from(10));
    }

    #[test]
    fn test_old_trades_leave_window_but_set_last_price() {
        let now = Utc::now();
        let trades = vec![trade(500, "1", now - Duration::hours(48))];
        let ticker = Ticker::compute(market(), &trades, now);

        assert_eq!(ticker.last_price, Some(Price::from_u64(500)));
        assert!(ticker.open_24h.is_none());
        assert!(ticker.volume_24h.is_zero());
        // no window open: change is indeterminate, reported as zero
        assert_eq!(ticker.change_24h, Decimal::ZERO);
    }

    #[test]
    fn test_change_percent_truncates() {
        let now = Utc::now();
        let trades = vec![
            trade(3, "1", now - Duration::hours(2)),
            trade(4, "1", now - Duration::hours(1)),
        ];
        let ticker = Ticker::compute(market(), &trades, now);
        // 1/3 = 33.333...% truncated, never rounded up
        assert_eq!(ticker.change_percent_24h, Decimal::from_str("33.33").unwrap());
    }
}

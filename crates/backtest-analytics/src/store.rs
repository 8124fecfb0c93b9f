use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use trade_core::{DealEntry, DealEvent, TradeRecord};

/// Normalizes a raw deal feed into an ordered, append-only sequence of
/// closed trades.
///
/// Only closing legs produce records; opening legs are consulted for the
/// position's entry price/time but never counted, so a round trip yields
/// exactly one trade.
#[derive(Debug, Clone, Default)]
pub struct TradeStore {
    /// Lower-cased allow-list; empty means every symbol passes.
    allow_list: Vec<String>,
}

impl TradeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_list<S: AsRef<str>>(symbols: &[S]) -> Self {
        Self {
            allow_list: symbols
                .iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    fn symbol_allowed(&self, symbol: &str) -> bool {
        self.allow_list.is_empty() || self.allow_list.iter().any(|s| s == &symbol.to_lowercase())
    }

    /// Ingest the raw feed for the window `[from, to)`.
    ///
    /// Returns records sorted by close time, ties broken by ticket
    /// ascending; re-ingesting the same range yields the identical
    /// sequence. A degenerate range produces an empty result rather than
    /// an error so optimizer loops keep running.
    pub fn ingest(
        &self,
        deals: &[DealEvent],
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<TradeRecord> {
        if to <= from {
            warn!(%from, %to, "degenerate analysis range, returning no trades");
            return Vec::new();
        }

        // First opening leg per position, for entry price/time recovery.
        let mut opens: HashMap<u64, &DealEvent> = HashMap::new();
        for deal in deals {
            if deal.entry == DealEntry::Open {
                opens.entry(deal.position_id).or_insert(deal);
            }
        }

        let mut trades: Vec<TradeRecord> = deals
            .iter()
            .filter(|d| d.entry == DealEntry::Close)
            .filter(|d| d.time >= from && d.time < to)
            .filter(|d| self.symbol_allowed(&d.symbol))
            .map(|close| {
                let open = opens.get(&close.position_id).copied();
                // Feeds truncated at the window edge can miss the opening
                // leg; fall back to the closing fill so the trade still
                // counts with its realized result intact.
                let commission = close.commission
                    + open.map(|o| o.commission).unwrap_or_default();
                TradeRecord {
                    ticket: close.ticket,
                    symbol: close.symbol.clone(),
                    side: open.map(|o| o.side).unwrap_or_else(|| close.side.opposite()),
                    volume: close.volume,
                    open_time: open.map(|o| o.time).unwrap_or(close.time),
                    close_time: close.time,
                    open_price: open.map(|o| o.price).unwrap_or(close.price),
                    close_price: close.price,
                    profit: close.profit,
                    swap: close.swap,
                    commission,
                }
            })
            .collect();

        trades.sort_by(|a, b| {
            a.close_time
                .cmp(&b.close_time)
                .then(a.ticket.cmp(&b.ticket))
        });
        trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use trade_core::TradeSide;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap()
    }

    fn deal(
        ticket: u64,
        position_id: u64,
        symbol: &str,
        side: TradeSide,
        entry: DealEntry,
        hour: u32,
        profit: f64,
    ) -> DealEvent {
        DealEvent {
            ticket,
            position_id,
            symbol: symbol.to_string(),
            side,
            volume: dec!(0.10),
            price: dec!(1.1000),
            time: ts(hour),
            profit: Decimal::try_from(profit).unwrap(),
            swap: Decimal::ZERO,
            commission: Decimal::ZERO,
            entry,
        }
    }

    #[test]
    fn ignores_opening_legs() {
        let deals = vec![
            deal(1, 100, "EURUSD", TradeSide::Long, DealEntry::Open, 9, 0.0),
            deal(2, 100, "EURUSD", TradeSide::Short, DealEntry::Close, 12, 55.0),
        ];

        let trades = TradeStore::new().ingest(&deals, ts(0), ts(23));
        assert_eq!(trades.len(), 1);
        // Position direction comes from the opening leg.
        assert_eq!(trades[0].side, TradeSide::Long);
        assert_eq!(trades[0].open_time, ts(9));
        assert_eq!(trades[0].close_time, ts(12));
    }

    #[test]
    fn missing_open_leg_falls_back_to_close_fill() {
        let deals = vec![deal(
            9,
            500,
            "GBPUSD",
            TradeSide::Short,
            DealEntry::Close,
            10,
            -20.0,
        )];

        let trades = TradeStore::new().ingest(&deals, ts(0), ts(23));
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side, TradeSide::Long);
        assert_eq!(trades[0].open_time, trades[0].close_time);
    }

    #[test]
    fn allow_list_is_case_insensitive() {
        let deals = vec![
            deal(1, 1, "EURUSD", TradeSide::Short, DealEntry::Close, 10, 10.0),
            deal(2, 2, "usdjpy", TradeSide::Short, DealEntry::Close, 11, 10.0),
            deal(3, 3, "GBPUSD", TradeSide::Short, DealEntry::Close, 12, 10.0),
        ];

        let store = TradeStore::with_allow_list(&["eurusd", "USDJPY"]);
        let trades = store.ingest(&deals, ts(0), ts(23));
        let symbols: Vec<&str> = trades.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["EURUSD", "usdjpy"]);
    }

    #[test]
    fn degenerate_range_yields_empty() {
        let deals = vec![deal(1, 1, "EURUSD", TradeSide::Short, DealEntry::Close, 10, 10.0)];
        assert!(TradeStore::new().ingest(&deals, ts(12), ts(12)).is_empty());
        assert!(TradeStore::new().ingest(&deals, ts(12), ts(8)).is_empty());
    }

    #[test]
    fn shuffled_input_sorts_by_close_time_then_ticket() {
        let deals = vec![
            deal(30, 3, "EURUSD", TradeSide::Short, DealEntry::Close, 14, 1.0),
            deal(10, 1, "EURUSD", TradeSide::Short, DealEntry::Close, 12, 1.0),
            // Same close time as ticket 12's trade, higher ticket.
            deal(12, 4, "EURUSD", TradeSide::Short, DealEntry::Close, 12, 1.0),
            deal(20, 2, "EURUSD", TradeSide::Short, DealEntry::Close, 13, 1.0),
        ];

        let store = TradeStore::new();
        let first = store.ingest(&deals, ts(0), ts(23));
        let tickets: Vec<u64> = first.iter().map(|t| t.ticket).collect();
        assert_eq!(tickets, vec![10, 12, 20, 30]);

        // Idempotent: same range, same sequence.
        let second = store.ingest(&deals, ts(0), ts(23));
        let again: Vec<u64> = second.iter().map(|t| t.ticket).collect();
        assert_eq!(tickets, again);
    }
}

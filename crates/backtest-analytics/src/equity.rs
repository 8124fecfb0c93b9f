use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use trade_core::{EquityPoint, TradeRecord};

/// Replay closed trades against a starting balance.
///
/// The curve is seeded with one point at `window_start` and gains one point
/// per trade close, so its length is always `trades.len() + 1`. Input must
/// already be in close-time order (ties by ticket), which is what
/// [`crate::store::TradeStore::ingest`] produces; the running peak is left
/// to the metrics engine so the point stays a pure value type.
pub fn build_equity_curve(
    trades: &[TradeRecord],
    starting_balance: Decimal,
    window_start: DateTime<Utc>,
) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(trades.len() + 1);
    curve.push(EquityPoint {
        timestamp: window_start,
        equity: starting_balance,
    });

    let mut equity = starting_balance;
    for trade in trades {
        equity += trade.net_result();
        curve.push(EquityPoint {
            timestamp: trade.close_time,
            equity,
        });
    }
    curve
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use trade_core::TradeSide;

    fn trade(ticket: u64, hour: u32, profit: Decimal) -> TradeRecord {
        let close_time = Utc.with_ymd_and_hms(2024, 6, 3, hour, 0, 0).unwrap();
        TradeRecord {
            ticket,
            symbol: "EURUSD".to_string(),
            side: TradeSide::Long,
            volume: dec!(0.10),
            open_time: close_time - chrono::Duration::hours(1),
            close_time,
            open_price: dec!(1.1000),
            close_price: dec!(1.1010),
            profit,
            swap: Decimal::ZERO,
            commission: Decimal::ZERO,
        }
    }

    #[test]
    fn curve_has_one_point_per_trade_plus_seed() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let trades = vec![
            trade(1, 10, dec!(100)),
            trade(2, 11, dec!(-40)),
            trade(3, 12, dec!(60)),
        ];

        let curve = build_equity_curve(&trades, dec!(10_000), start);

        assert_eq!(curve.len(), trades.len() + 1);
        assert_eq!(curve[0].timestamp, start);
        assert_eq!(curve[0].equity, dec!(10_000));
        assert_eq!(curve[1].equity, dec!(10_100));
        assert_eq!(curve[2].equity, dec!(10_060));
        assert_eq!(curve[3].equity, dec!(10_120));
    }

    #[test]
    fn timestamps_never_decrease_even_with_simultaneous_closes() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        // Two trades closing at the same instant, pre-sorted by ticket.
        let trades = vec![trade(5, 10, dec!(10)), trade(6, 10, dec!(20))];

        let curve = build_equity_curve(&trades, dec!(1_000), start);

        assert!(curve.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(curve.last().unwrap().equity, dec!(1_030));
    }

    #[test]
    fn empty_trades_yield_seed_only() {
        let start = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let curve = build_equity_curve(&[], dec!(5_000), start);
        assert_eq!(curve.len(), 1);
        assert_eq!(curve[0].equity, dec!(5_000));
    }
}

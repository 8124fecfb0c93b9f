use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use trade_core::TradeRecord;

use crate::equity::build_equity_curve;
use crate::metrics::MetricsEngine;
use crate::models::PerformanceSnapshot;

/// Per-symbol snapshots plus one combined portfolio snapshot.
#[derive(Debug, Clone)]
pub struct PortfolioAggregate {
    pub per_symbol: BTreeMap<String, PerformanceSnapshot>,
    pub combined: PerformanceSnapshot,
}

/// Evaluate every allowed symbol in isolation and the merged portfolio as
/// a whole.
///
/// The combined snapshot re-runs the metrics engine over the merged,
/// re-sorted trade list. Averaging per-symbol ratios (Sharpe, profit
/// factor) would be meaningless, so it is never done here.
pub fn aggregate(
    engine: &MetricsEngine,
    allow_list: &[String],
    per_symbol_trades: &BTreeMap<String, Vec<TradeRecord>>,
    starting_balance: Decimal,
    window_start: DateTime<Utc>,
) -> PortfolioAggregate {
    let allowed: Vec<String> = allow_list.iter().map(|s| s.to_lowercase()).collect();
    let is_allowed =
        |symbol: &str| allowed.is_empty() || allowed.iter().any(|a| a == &symbol.to_lowercase());

    let mut per_symbol = BTreeMap::new();
    let mut merged: Vec<TradeRecord> = Vec::new();

    for (symbol, trades) in per_symbol_trades {
        if !is_allowed(symbol) {
            continue;
        }
        let curve = build_equity_curve(trades, starting_balance, window_start);
        per_symbol.insert(symbol.clone(), engine.evaluate(trades, &curve));
        merged.extend(trades.iter().cloned());
    }

    merged.sort_by(|a, b| {
        a.close_time
            .cmp(&b.close_time)
            .then(a.ticket.cmp(&b.ticket))
    });
    let combined_curve = build_equity_curve(&merged, starting_balance, window_start);
    let combined = engine.evaluate(&merged, &combined_curve);

    PortfolioAggregate {
        per_symbol,
        combined,
    }
}

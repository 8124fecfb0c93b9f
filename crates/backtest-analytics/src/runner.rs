use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use tracing::{info, warn};

use trade_core::{DealEvent, EquityPoint, TradeRecord};

use crate::equity::build_equity_curve;
use crate::metrics::MetricsEngine;
use crate::models::{PassConfig, PerformanceSnapshot};
use crate::report::{self, ComparisonLedger, ReportPaths};
use crate::store::TradeStore;
use crate::walk_forward::{WalkForwardPlanner, WalkForwardWindow};

/// Everything one pass produced. A zero-trade outcome is valid and
/// reportable, not an error.
#[derive(Debug, Clone)]
pub struct PassOutcome {
    pub label: String,
    pub snapshot: PerformanceSnapshot,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub score: f64,
    /// False when artifact export was skipped after exhausting retries.
    pub exported: bool,
}

/// One synchronous ingest → build → evaluate pipeline run. No I/O.
pub fn run_pass(config: &PassConfig, deals: &[DealEvent]) -> PassOutcome {
    let store = TradeStore::with_allow_list(&config.symbols);
    let trades = store.ingest(deals, config.from, config.to);
    let equity_curve = build_equity_curve(&trades, config.starting_balance, config.from);

    let engine = MetricsEngine::with_params(config.risk_free_rate, config.weights);
    let snapshot = engine.evaluate(&trades, &equity_curve);
    let score = report::score(&snapshot, config.criterion);

    info!(
        label = %config.label,
        trades = snapshot.trade_count,
        score,
        "analysis pass complete"
    );

    PassOutcome {
        label: config.label.clone(),
        snapshot,
        trades,
        equity_curve,
        score,
        exported: false,
    }
}

/// Run one pass and emit its artifacts plus a ledger row.
///
/// Export failures are logged and skipped; the computed outcome is still
/// returned so the surrounding optimization run keeps going.
pub fn run_and_export(
    config: &PassConfig,
    deals: &[DealEvent],
    paths: &ReportPaths,
    ledger: &ComparisonLedger,
) -> PassOutcome {
    let mut outcome = run_pass(config, deals);

    match report::export_artifacts(
        paths,
        &outcome.trades,
        &outcome.equity_curve,
        config.starting_balance,
    ) {
        Ok(()) => outcome.exported = true,
        Err(e) => warn!(label = %config.label, error = %e, "skipping artifact export"),
    }
    if let Err(e) = ledger.append(&config.label, &outcome.snapshot, outcome.score) {
        warn!(label = %config.label, error = %e, "skipping ledger row");
    }

    outcome
}

/// Evaluate independent parameter passes in parallel. Passes share nothing
/// mutable except the comparison ledger, whose writes serialize behind the
/// mutex so rows never interleave.
pub fn run_parallel_passes(
    configs: &[PassConfig],
    deals: &[DealEvent],
    ledger: &Mutex<ComparisonLedger>,
) -> Vec<PassOutcome> {
    configs
        .par_iter()
        .map(|config| {
            let outcome = run_pass(config, deals);
            let guard = ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = guard.append(&config.label, &outcome.snapshot, outcome.score) {
                warn!(label = %config.label, error = %e, "skipping ledger row");
            }
            outcome
        })
        .collect()
}

/// In-sample and out-of-sample snapshots for one walk-forward window.
#[derive(Debug, Clone)]
pub struct WindowOutcome {
    pub window: WalkForwardWindow,
    pub in_sample: PassOutcome,
    pub out_sample: PassOutcome,
}

/// Drive the full pipeline over every walk-forward window, anchored at the
/// pass's `from` date. Each window is evaluated independently.
pub fn run_walk_forward(
    config: &PassConfig,
    deals: &[DealEvent],
    planner: &WalkForwardPlanner,
    iterations: usize,
) -> Vec<WindowOutcome> {
    run_walk_forward_from(config, deals, planner, config.from, iterations)
}

pub fn run_walk_forward_from(
    config: &PassConfig,
    deals: &[DealEvent],
    planner: &WalkForwardPlanner,
    base_start: DateTime<Utc>,
    iterations: usize,
) -> Vec<WindowOutcome> {
    planner
        .generate(base_start, iterations)
        .into_iter()
        .map(|window| {
            let in_config = config.with_range(
                format!("{} wf{:02} in", config.label, window.index),
                window.in_start,
                window.in_end,
            );
            let out_config = config.with_range(
                format!("{} wf{:02} out", config.label, window.index),
                window.out_start,
                window.out_end,
            );
            WindowOutcome {
                window,
                in_sample: run_pass(&in_config, deals),
                out_sample: run_pass(&out_config, deals),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use trade_core::{DealEntry, TradeSide};

    use crate::models::{OptimizationCriterion, ScoreWeights};

    fn close_deal(ticket: u64, day: u32, profit: f64) -> DealEvent {
        DealEvent {
            ticket,
            position_id: ticket,
            symbol: "EURUSD".to_string(),
            side: TradeSide::Short,
            volume: dec!(0.10),
            price: dec!(1.1000),
            time: Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap(),
            profit: Decimal::try_from(profit).unwrap(),
            swap: Decimal::ZERO,
            commission: Decimal::ZERO,
            entry: DealEntry::Close,
        }
    }

    fn config(label: &str) -> PassConfig {
        PassConfig {
            label: label.to_string(),
            symbols: Vec::new(),
            from: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            to: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            starting_balance: dec!(10_000),
            risk_free_rate: 0.0,
            weights: ScoreWeights::default(),
            criterion: OptimizationCriterion::Composite,
        }
    }

    #[test]
    fn pass_pipeline_produces_consistent_outcome() {
        let deals = vec![
            close_deal(1, 2, 100.0),
            close_deal(2, 3, -40.0),
            close_deal(3, 4, 60.0),
        ];

        let outcome = run_pass(&config("baseline"), &deals);

        assert_eq!(outcome.snapshot.trade_count, 3);
        assert_eq!(outcome.equity_curve.len(), outcome.trades.len() + 1);
        assert_eq!(outcome.snapshot.net_profit, dec!(120));
        assert_eq!(outcome.score, outcome.snapshot.composite_score);
    }

    #[test]
    fn parallel_passes_serialize_ledger_rows() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Mutex::new(ComparisonLedger::new(dir.path().join("runs.csv")));

        let deals = vec![close_deal(1, 2, 100.0), close_deal(2, 3, -40.0)];
        let configs: Vec<PassConfig> =
            (0..8).map(|i| config(&format!("pass-{i}"))).collect();

        let outcomes = run_parallel_passes(&configs, &deals, &ledger);
        assert_eq!(outcomes.len(), 8);

        let content =
            std::fs::read_to_string(ledger.lock().unwrap().path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // Header exactly once, one intact row per pass.
        assert_eq!(lines.len(), 9);
        assert_eq!(lines.iter().filter(|l| l.starts_with("label,")).count(), 1);
        assert!(lines[1..].iter().all(|l| l.split(',').count() == 7));
    }

    #[test]
    fn export_failure_keeps_the_pass_alive() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ReportPaths {
            trade_history: "/nonexistent-dir/history.csv".into(),
            equity_curve: "/nonexistent-dir/curve.csv".into(),
        };
        let ledger = ComparisonLedger::new(dir.path().join("runs.csv"));

        let deals = vec![close_deal(1, 2, 25.0)];
        let outcome = run_and_export(&config("doomed"), &deals, &paths, &ledger);

        assert!(!outcome.exported);
        assert_eq!(outcome.snapshot.trade_count, 1);
        // The ledger row still landed.
        assert!(std::fs::read_to_string(ledger.path())
            .unwrap()
            .contains("doomed"));
    }

    #[test]
    fn walk_forward_slices_trades_into_windows() {
        // Trades on Jan 2 and Jan 3 (first window's in-sample) and one on
        // Jan 12 (first window's out-of-sample with 10/2-day windows).
        let deals = vec![
            close_deal(1, 2, 100.0),
            close_deal(2, 3, -40.0),
            close_deal(3, 12, 60.0),
        ];

        let planner = WalkForwardPlanner::new(10, 2);
        let outcomes = run_walk_forward(&config("wf"), &deals, &planner, 2);

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].in_sample.snapshot.trade_count, 2);
        assert_eq!(outcomes[0].out_sample.snapshot.trade_count, 1);
        // Second window: in-sample covers Jan 3 - Jan 13.
        assert_eq!(outcomes[1].in_sample.snapshot.trade_count, 2);
        assert_eq!(outcomes[1].out_sample.snapshot.trade_count, 0);
        // Zero-trade out-of-sample is a valid, zeroed snapshot.
        assert_eq!(outcomes[1].out_sample.snapshot.net_profit, Decimal::ZERO);
    }
}

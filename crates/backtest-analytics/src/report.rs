use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use rust_decimal::prelude::*;
use tracing::warn;

use trade_core::{AnalysisError, EquityPoint, Result, TradeRecord};

use crate::models::{OptimizationCriterion, PerformanceSnapshot};

/// File writes get this many attempts before a pass-level failure is
/// surfaced; other passes keep running either way.
const EXPORT_ATTEMPTS: u32 = 3;

const LEDGER_HEADER: [&str; 7] = [
    "label",
    "sharpe",
    "maxDrawdownPct",
    "winRate",
    "profitFactor",
    "recoveryFactor",
    "score",
];

/// Destinations for one pass's tabular artifacts.
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub trade_history: PathBuf,
    pub equity_curve: PathBuf,
}

/// Scalar objective handed to the external search driver.
pub fn score(snapshot: &PerformanceSnapshot, criterion: OptimizationCriterion) -> f64 {
    match criterion {
        OptimizationCriterion::Expectancy => snapshot.expectancy.to_f64().unwrap_or(0.0),
        OptimizationCriterion::Recovery => snapshot.recovery_factor,
        OptimizationCriterion::Composite => snapshot.composite_score,
    }
}

/// Trade history, one row per record, with the running balance after each
/// close in the last column.
pub fn write_trade_history(
    path: &Path,
    trades: &[TradeRecord],
    starting_balance: Decimal,
) -> Result<()> {
    with_retries("trade history", || {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record([
            "ticket",
            "time",
            "symbol",
            "side",
            "volume",
            "openPrice",
            "closePrice",
            "profit",
            "swap",
            "commission",
            "balanceAfter",
        ])?;

        let mut balance = starting_balance;
        for trade in trades {
            balance += trade.net_result();
            writer.write_record([
                trade.ticket.to_string(),
                trade.close_time.to_rfc3339(),
                trade.symbol.clone(),
                trade.side.as_str().to_string(),
                trade.volume.to_string(),
                trade.open_price.to_string(),
                trade.close_price.to_string(),
                trade.profit.to_string(),
                trade.swap.to_string(),
                trade.commission.to_string(),
                balance.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    })
}

pub fn write_equity_curve(path: &Path, curve: &[EquityPoint]) -> Result<()> {
    with_retries("equity curve", || {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["time", "equity"])?;
        for point in curve {
            writer.write_record([point.timestamp.to_rfc3339(), point.equity.to_string()])?;
        }
        writer.flush()?;
        Ok(())
    })
}

/// Convenience wrapper producing both per-pass artifacts.
pub fn export_artifacts(
    paths: &ReportPaths,
    trades: &[TradeRecord],
    curve: &[EquityPoint],
    starting_balance: Decimal,
) -> Result<()> {
    write_trade_history(&paths.trade_history, trades, starting_balance)?;
    write_equity_curve(&paths.equity_curve, curve)
}

/// Append-only strategy-comparison table spanning a whole optimization
/// run. The header is written once; prior rows are never truncated. When
/// passes run concurrently, callers serialize access (a `Mutex` in the
/// runner) so rows stay whole.
#[derive(Debug, Clone)]
pub struct ComparisonLedger {
    path: PathBuf,
}

impl ComparisonLedger {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        label: &str,
        snapshot: &PerformanceSnapshot,
        score: f64,
    ) -> Result<()> {
        with_retries("comparison ledger", || {
            let needs_header = std::fs::metadata(&self.path)
                .map(|m| m.len() == 0)
                .unwrap_or(true);

            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            let mut writer = csv::Writer::from_writer(file);

            if needs_header {
                writer.write_record(LEDGER_HEADER)?;
            }
            writer.write_record([
                label.to_string(),
                format!("{:.4}", snapshot.sharpe_ratio),
                format!("{:.4}", snapshot.max_drawdown_pct),
                format!("{:.4}", snapshot.win_rate),
                format!("{:.4}", snapshot.profit_factor),
                format!("{:.4}", snapshot.recovery_factor),
                format!("{:.4}", score),
            ])?;
            writer.flush()?;
            Ok(())
        })
    }
}

fn with_retries(what: &str, mut op: impl FnMut() -> csv::Result<()>) -> Result<()> {
    let mut last_error = String::new();
    for attempt in 1..=EXPORT_ATTEMPTS {
        match op() {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(what, attempt, error = %e, "report write failed");
                last_error = e.to_string();
            }
        }
    }
    Err(AnalysisError::ExportFailed {
        attempts: EXPORT_ATTEMPTS,
        message: format!("{what}: {last_error}"),
    })
}

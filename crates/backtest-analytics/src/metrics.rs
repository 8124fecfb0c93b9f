use rust_decimal::prelude::*;
use statrs::statistics::Statistics;

use trade_core::{EquityPoint, TradeRecord};

use crate::models::{PerformanceSnapshot, ScoreWeights};

/// Annualization base carried over from the host platform's Sharpe
/// convention; results must stay comparable with its reports.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Upper bound applied to the profit factor when gross loss is zero or
/// vanishingly small, so downstream scoring never sees an infinity.
pub const PROFIT_FACTOR_CAP: f64 = 1000.0;

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// The single consolidated metrics engine. One policy per edge case,
/// applied uniformly at every call site.
#[derive(Debug, Clone)]
pub struct MetricsEngine {
    risk_free_rate: f64,
    weights: ScoreWeights,
}

impl Default for MetricsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsEngine {
    pub fn new() -> Self {
        Self {
            risk_free_rate: 0.0,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_params(risk_free_rate: f64, weights: ScoreWeights) -> Self {
        Self {
            risk_free_rate,
            weights,
        }
    }

    /// Compute the full snapshot for one window.
    ///
    /// `trades` must be in close-time order and `equity_curve` must be the
    /// matching curve from [`crate::equity::build_equity_curve`]. An empty
    /// window is a valid, zeroed result, not an error.
    pub fn evaluate(
        &self,
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
    ) -> PerformanceSnapshot {
        if trades.is_empty() {
            return PerformanceSnapshot::default();
        }

        let mut snapshot = PerformanceSnapshot {
            trade_count: trades.len() as u32,
            ..PerformanceSnapshot::default()
        };

        // P&L decomposition.
        let mut wins = 0u32;
        let mut losses = 0u32;
        for trade in trades {
            let net = trade.net_result();
            snapshot.net_profit += net;
            if net > Decimal::ZERO {
                snapshot.gross_profit += net;
                wins += 1;
                if net > snapshot.largest_win {
                    snapshot.largest_win = net;
                }
            } else if net < Decimal::ZERO {
                snapshot.gross_loss += net;
                losses += 1;
                if net < snapshot.largest_loss {
                    snapshot.largest_loss = net;
                }
            }
        }
        snapshot.expectancy = snapshot.net_profit / Decimal::from(trades.len() as u64);
        if wins > 0 {
            snapshot.average_win = snapshot.gross_profit / Decimal::from(wins);
        }
        if losses > 0 {
            snapshot.average_loss = snapshot.gross_loss / Decimal::from(losses);
        }

        // Break-even trades count on neither side of the win rate.
        let decided = wins + losses;
        if decided > 0 {
            snapshot.win_rate = f64::from(wins) / f64::from(decided);
        }

        snapshot.profit_factor = profit_factor(
            snapshot.gross_profit.to_f64().unwrap_or(0.0),
            snapshot.gross_loss.to_f64().unwrap_or(0.0),
        );

        let (max_dd, max_dd_pct) = max_drawdown(equity_curve);
        snapshot.max_drawdown = max_dd;
        snapshot.max_drawdown_pct = max_dd_pct;

        snapshot.recovery_factor = if max_dd.is_zero() {
            0.0
        } else {
            (snapshot.net_profit / max_dd).to_f64().unwrap_or(0.0)
        };

        let returns = per_trade_returns(trades, equity_curve);
        snapshot.sharpe_ratio = annualized_sharpe(&returns, self.risk_free_rate);
        snapshot.sortino_ratio = annualized_sortino(&returns, self.risk_free_rate);

        if let Some(start) = equity_curve.first() {
            let balance = start.equity.to_f64().unwrap_or(0.0);
            if balance > 0.0 {
                snapshot.total_return =
                    snapshot.net_profit.to_f64().unwrap_or(0.0) / balance;
            }
            if let Some(end) = equity_curve.last() {
                snapshot.cagr = cagr(
                    snapshot.total_return,
                    (end.timestamp - start.timestamp).num_seconds(),
                );
            }
        }

        snapshot.composite_score = self.composite_score(&snapshot);
        snapshot
    }

    /// Weighted scalar objective for a search driver. Monotonically
    /// increasing in profit factor, Sharpe, and recovery factor, and
    /// decreasing in drawdown percent.
    pub fn composite_score(&self, snapshot: &PerformanceSnapshot) -> f64 {
        self.weights.profit_factor * snapshot.profit_factor
            + self.weights.sharpe * snapshot.sharpe_ratio
            + self.weights.recovery * snapshot.recovery_factor
            - self.weights.drawdown_pct * snapshot.max_drawdown_pct
    }
}

/// Gross profit over absolute gross loss. No profits → 0; profit with no
/// loss → the cap; otherwise the plain ratio, bounded by the cap.
fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    let loss = gross_loss.abs();
    if gross_profit <= 0.0 {
        return 0.0;
    }
    if loss == 0.0 {
        return PROFIT_FACTOR_CAP;
    }
    (gross_profit / loss).min(PROFIT_FACTOR_CAP)
}

/// Single forward pass over the curve. The percentage form divides by the
/// peak in force at the trough, not the final peak.
fn max_drawdown(equity_curve: &[EquityPoint]) -> (Decimal, f64) {
    let mut peak = Decimal::MIN;
    let mut max_dd = Decimal::ZERO;
    let mut peak_at_trough = Decimal::ZERO;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let drawdown = peak - point.equity;
        if drawdown > max_dd {
            max_dd = drawdown;
            peak_at_trough = peak;
        }
    }

    if max_dd.is_zero() || peak_at_trough <= Decimal::ZERO {
        return (max_dd, 0.0);
    }
    let pct = (max_dd / peak_at_trough).to_f64().unwrap_or(0.0) * 100.0;
    (max_dd, pct)
}

/// Percent return of each trade against the window's starting balance.
///
/// The constant denominator keeps trades with equal currency results at
/// exactly zero variance, so degenerate Sharpe inputs collapse to 0 instead
/// of a float artifact.
fn per_trade_returns(trades: &[TradeRecord], equity_curve: &[EquityPoint]) -> Vec<f64> {
    let balance = equity_curve
        .first()
        .map(|p| p.equity)
        .unwrap_or(Decimal::ZERO);
    if balance <= Decimal::ZERO {
        return vec![0.0; trades.len()];
    }

    trades
        .iter()
        .map(|trade| (trade.net_result() / balance).to_f64().unwrap_or(0.0))
        .collect()
}

/// Per-trade Sharpe with Bessel-corrected variance, annualized by
/// sqrt(252). Degenerate series (n < 2, zero variance) resolve to 0 rather
/// than NaN.
fn annualized_sharpe(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = Statistics::mean(returns);
    let std_dev = Statistics::std_dev(returns);
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return 0.0;
    }
    (mean - risk_free_rate) / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Sortino over the same per-trade series: downside deviation counts only
/// negative returns, measured across the whole sample.
fn annualized_sortino(returns: &[f64], risk_free_rate: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = Statistics::mean(returns);
    let downside_sq: f64 = returns.iter().map(|r| r.min(0.0).powi(2)).sum();
    let downside_dev = (downside_sq / returns.len() as f64).sqrt();
    if downside_dev <= 0.0 {
        return 0.0;
    }
    (mean - risk_free_rate) / downside_dev * TRADING_DAYS_PER_YEAR.sqrt()
}

fn cagr(total_return: f64, window_seconds: i64) -> f64 {
    if window_seconds <= 0 || total_return <= -1.0 {
        return 0.0;
    }
    let years = window_seconds as f64 / SECONDS_PER_YEAR;
    (1.0 + total_return).powf(1.0 / years) - 1.0
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weights for the composite optimization score. Positive inputs reward the
/// score, drawdown penalizes it, so the score stays monotonic in every
/// component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub profit_factor: f64,
    pub sharpe: f64,
    pub recovery: f64,
    pub drawdown_pct: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            profit_factor: 0.30,
            sharpe: 0.30,
            recovery: 0.25,
            drawdown_pct: 0.15,
        }
    }
}

/// Objective selector for the external parameter-search driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationCriterion {
    /// Average net result per trade.
    Expectancy,
    /// Net profit over max drawdown.
    Recovery,
    /// Weighted blend of profit factor, Sharpe, recovery, and drawdown.
    Composite,
}

/// The full metrics bundle for one analysis window and symbol set.
/// Recomputed fresh per pass; never mutated after construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub trade_count: u32,

    // P&L decomposition: net_profit == gross_profit + gross_loss, with
    // gross_loss stored as a non-positive value.
    pub net_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,

    /// Peak-to-trough decline in account currency, always >= 0.
    pub max_drawdown: Decimal,
    /// Drawdown relative to the peak in force at the trough, in percent.
    pub max_drawdown_pct: f64,

    /// Annualized per-trade Sharpe; 0 with fewer than two trades or zero
    /// variance.
    pub sharpe_ratio: f64,
    /// Downside-deviation variant of Sharpe, same degeneracy policy.
    pub sortino_ratio: f64,
    /// Fraction of winners among trades with a non-zero result, in [0, 1].
    pub win_rate: f64,
    /// Gross profit over absolute gross loss, capped at
    /// [`crate::metrics::PROFIT_FACTOR_CAP`]; 0 when there is no profit.
    pub profit_factor: f64,
    /// Net profit over max drawdown; 0 when drawdown is zero.
    pub recovery_factor: f64,

    /// Net profit as a fraction of the starting balance.
    pub total_return: f64,
    /// Compound annual growth rate over the window's calendar span.
    pub cagr: f64,

    /// Average net result per trade.
    pub expectancy: Decimal,
    pub average_win: Decimal,
    /// Mean losing trade, kept signed (non-positive).
    pub average_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,

    /// Weighted optimization score; see [`ScoreWeights`].
    pub composite_score: f64,
}

/// Configuration for a single analysis pass: one symbol set, one window,
/// one parameter labeling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassConfig {
    /// Row label in the comparison ledger, typically the parameter set.
    pub label: String,
    /// Symbol allow-list, matched case-insensitively; empty passes all.
    pub symbols: Vec<String>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub starting_balance: Decimal,
    /// Per-trade risk-free rate used by Sharpe/Sortino, usually 0.
    pub risk_free_rate: f64,
    pub weights: ScoreWeights,
    pub criterion: OptimizationCriterion,
}

impl PassConfig {
    /// Copy of this pass scoped to a sub-range, for walk-forward segments.
    pub fn with_range(&self, label: String, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            label,
            from,
            to,
            ..self.clone()
        }
    }
}

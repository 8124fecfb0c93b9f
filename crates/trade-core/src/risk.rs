use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

/// Mutable risk bookkeeping with a daily-reset lifecycle.
///
/// Replaces the host terminal's global-variable store (daily loss, peak
/// equity, cooldown timestamps) with an explicit struct that callers pass by
/// reference. Pure state: limit enforcement stays with the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub peak_equity: Decimal,
    pub trough_equity: Decimal,
    /// Drawdown from peak at the latest equity reading, in [0, 1].
    pub current_drawdown_pct: f64,
    pub max_drawdown_pct: f64,
    /// Realized losses accumulated during the current session day.
    pub daily_loss: Decimal,
    pub daily_start_equity: Decimal,
    /// Most recent equity reading, used to seed the next session day.
    pub last_equity: Decimal,
    pub session_date: NaiveDate,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl RiskState {
    pub fn new(session_date: NaiveDate) -> Self {
        Self {
            peak_equity: Decimal::ZERO,
            trough_equity: Decimal::ZERO,
            current_drawdown_pct: 0.0,
            max_drawdown_pct: 0.0,
            daily_loss: Decimal::ZERO,
            daily_start_equity: Decimal::ZERO,
            last_equity: Decimal::ZERO,
            session_date,
            cooldown_until: None,
        }
    }

    /// Fold the latest equity reading into the drawdown statistics.
    pub fn update_equity(&mut self, equity: Decimal, now: DateTime<Utc>) {
        self.reset_if_new_day(now);

        if self.peak_equity.is_zero() {
            self.peak_equity = equity;
            self.trough_equity = equity;
            self.daily_start_equity = equity;
        }
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if equity < self.trough_equity {
            self.trough_equity = equity;
        }
        self.last_equity = equity;

        let drawdown = if self.peak_equity > Decimal::ZERO {
            ((self.peak_equity - equity) / self.peak_equity)
                .to_f64()
                .unwrap_or(0.0)
        } else {
            0.0
        };
        self.current_drawdown_pct = drawdown.max(0.0);
        self.max_drawdown_pct = self.max_drawdown_pct.max(self.current_drawdown_pct);
    }

    /// Track realized P&L for the daily loss counter. Profits do not pay
    /// back earlier losses.
    pub fn register_pnl(&mut self, pnl: Decimal, now: DateTime<Utc>) {
        self.reset_if_new_day(now);
        if pnl < Decimal::ZERO {
            self.daily_loss += -pnl;
        }
    }

    /// Roll the session forward when `now` falls on a new calendar day,
    /// clearing the daily counters.
    pub fn reset_if_new_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.session_date {
            self.session_date = today;
            self.daily_loss = Decimal::ZERO;
            self.daily_start_equity = self.last_equity;
        }
    }

    pub fn apply_cooldown(&mut self, until: DateTime<Utc>) {
        self.cooldown_until = Some(until);
    }

    /// Whether the cooldown window is still active; clears it once elapsed.
    pub fn in_cooldown(&mut self, now: DateTime<Utc>) -> bool {
        match self.cooldown_until {
            Some(until) if now < until => true,
            Some(_) => {
                self.cooldown_until = None;
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    #[test]
    fn tracks_peak_and_drawdown() {
        let mut state = RiskState::new(at(1, 0).date_naive());
        state.update_equity(dec!(10_000), at(1, 9));
        state.update_equity(dec!(10_500), at(1, 10));
        state.update_equity(dec!(10_080), at(1, 11));

        assert_eq!(state.peak_equity, dec!(10_500));
        assert!((state.current_drawdown_pct - 0.04).abs() < 1e-9);
        assert!((state.max_drawdown_pct - 0.04).abs() < 1e-9);
    }

    #[test]
    fn daily_loss_resets_on_new_day() {
        let mut state = RiskState::new(at(1, 0).date_naive());
        state.register_pnl(dec!(-120), at(1, 14));
        state.register_pnl(dec!(80), at(1, 15));
        assert_eq!(state.daily_loss, dec!(120));

        state.register_pnl(dec!(-10), at(2, 9));
        assert_eq!(state.daily_loss, dec!(10));
        assert_eq!(state.session_date, at(2, 9).date_naive());
    }

    #[test]
    fn cooldown_expires() {
        let mut state = RiskState::new(at(1, 0).date_naive());
        state.apply_cooldown(at(1, 12));
        assert!(state.in_cooldown(at(1, 11)));
        assert!(!state.in_cooldown(at(1, 13)));
        assert!(state.cooldown_until.is_none());
    }
}

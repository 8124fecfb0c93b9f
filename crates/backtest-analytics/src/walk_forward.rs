use std::fs;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use trade_core::{AnalysisError, Result};

/// One in-sample/out-of-sample pair. Invariant:
/// `in_start < in_end == out_start < out_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkForwardWindow {
    pub index: usize,
    pub in_start: DateTime<Utc>,
    pub in_end: DateTime<Utc>,
    pub out_start: DateTime<Utc>,
    pub out_end: DateTime<Utc>,
}

/// Generates rolling walk-forward windows with flat calendar-day
/// arithmetic; weekends and holidays are not special-cased.
///
/// Window `i` starts its in-sample at `base + i * out_days`, so each
/// consecutive out-of-sample segment advances by exactly the out-sample
/// length. The planner holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct WalkForwardPlanner {
    in_sample_days: i64,
    out_sample_days: i64,
}

impl WalkForwardPlanner {
    /// Sample lengths below one day are clamped to 1 instead of erroring,
    /// so a misconfigured optimizer keeps producing usable plans.
    pub fn new(in_sample_days: i64, out_sample_days: i64) -> Self {
        if in_sample_days < 1 || out_sample_days < 1 {
            warn!(
                in_sample_days,
                out_sample_days, "sample lengths below 1 day, clamping"
            );
        }
        Self {
            in_sample_days: in_sample_days.max(1),
            out_sample_days: out_sample_days.max(1),
        }
    }

    pub fn window_at(&self, base_start: DateTime<Utc>, index: usize) -> WalkForwardWindow {
        let in_start = base_start + Duration::days(index as i64 * self.out_sample_days);
        let in_end = in_start + Duration::days(self.in_sample_days);
        let out_end = in_end + Duration::days(self.out_sample_days);
        WalkForwardWindow {
            index,
            in_start,
            in_end,
            out_start: in_end,
            out_end,
        }
    }

    /// Generate `iterations` numbered windows. Zero iterations yield an
    /// empty plan; generation itself never fails.
    pub fn generate(
        &self,
        base_start: DateTime<Utc>,
        iterations: usize,
    ) -> Vec<WalkForwardWindow> {
        (0..iterations)
            .map(|i| self.window_at(base_start, i))
            .collect()
    }
}

/// Persist a plan as JSON so the tester layer can replay the exact same
/// windows.
pub fn serialize_plan(windows: &[WalkForwardWindow], path: &Path) -> Result<()> {
    let payload = serde_json::to_string_pretty(windows)
        .map_err(|e| AnalysisError::Serialization(e.to_string()))?;
    fs::write(path, payload).map_err(|e| AnalysisError::Io(e.to_string()))
}

pub fn load_plan(path: &Path) -> Result<Vec<WalkForwardWindow>> {
    let payload = fs::read_to_string(path).map_err(|e| AnalysisError::Io(e.to_string()))?;
    serde_json::from_str(&payload).map_err(|e| AnalysisError::Serialization(e.to_string()))
}

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use trade_core::{AnalysisError, Result};

/// One tunable parameter's sweep definition for the external search
/// driver. The metrics engine never reads these; they exist so parameter
/// metadata round-trips alongside exported results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRange {
    pub name: String,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
    pub is_integer: bool,
}

impl OptimizationRange {
    pub fn new(name: &str, start: f64, stop: f64, step: f64) -> Self {
        Self {
            name: name.to_string(),
            start,
            stop,
            step,
            is_integer: false,
        }
    }

    pub fn integer(name: &str, start: f64, stop: f64, step: f64) -> Self {
        Self {
            is_integer: true,
            ..Self::new(name, start, stop, step)
        }
    }

    /// Expand into concrete sweep values, inclusive of `stop` up to a
    /// float tolerance. A non-positive step degenerates to the single
    /// start value rather than looping forever.
    pub fn values(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.stop < self.start {
            return vec![self.round(self.start)];
        }
        let mut values = Vec::new();
        let mut v = self.start;
        while v <= self.stop + 1e-9 {
            values.push(self.round(v));
            v += self.step;
        }
        values
    }

    fn round(&self, v: f64) -> f64 {
        if self.is_integer {
            v.round()
        } else {
            v
        }
    }
}

/// Cartesian product over every range, one named parameter set per pass.
pub fn expand_grid(ranges: &[OptimizationRange]) -> Vec<BTreeMap<String, f64>> {
    let mut grid: Vec<BTreeMap<String, f64>> = vec![BTreeMap::new()];
    for range in ranges {
        let values = range.values();
        grid = grid
            .into_iter()
            .flat_map(|combo| {
                values.iter().map(move |v| {
                    let mut next = combo.clone();
                    next.insert(range.name.clone(), *v);
                    next
                })
            })
            .collect();
    }
    grid
}

/// Write range metadata as JSON next to the run's other artifacts.
pub fn export_ranges(ranges: &[OptimizationRange], path: &Path) -> Result<()> {
    let payload = serde_json::to_string_pretty(ranges)
        .map_err(|e| AnalysisError::Serialization(e.to_string()))?;
    fs::write(path, payload).map_err(|e| AnalysisError::Io(e.to_string()))
}

pub fn load_ranges(path: &Path) -> Result<Vec<OptimizationRange>> {
    let payload = fs::read_to_string(path).map_err(|e| AnalysisError::Io(e.to_string()))?;
    serde_json::from_str(&payload).map_err(|e| AnalysisError::Serialization(e.to_string()))
}

pub mod aggregate;
pub mod equity;
pub mod metrics;
pub mod models;
pub mod params;
pub mod report;
pub mod runner;
pub mod store;
pub mod walk_forward;


pub use aggregate::{aggregate, PortfolioAggregate};
pub use equity::build_equity_curve;
pub use metrics::MetricsEngine;
pub use models::*;
pub use params::{expand_grid, export_ranges, load_ranges, OptimizationRange};
pub use report::{score, ComparisonLedger, ReportPaths};
pub use runner::{
    run_and_export, run_parallel_passes, run_pass, run_walk_forward, PassOutcome, WindowOutcome,
};
pub use store::TradeStore;
pub use walk_forward::{load_plan, serialize_plan, WalkForwardPlanner, WalkForwardWindow};

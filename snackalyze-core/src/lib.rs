//! Snackalyze core library - filtering, risk scoring and similarity prediction
//! over a fast-food and lifestyle health dataset

#![deny(warnings)]

// Global invariants enforced in this crate:
// - The dataset is loaded once and never mutated afterwards
// - Row order is file order; every derived view preserves it
// - No global mutable state
// - No randomness or clocks; the only I/O besides the CSV is the advisor call
// - Identical input yields byte-for-byte identical output

pub mod advisor;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod html;
pub mod insights;
pub mod predictor;
pub mod report;
pub mod risk;

pub use config::ResolvedConfig;
pub use dataset::{Dataset, HealthRecord};
pub use filter::{FilterCriteria, FilteredView};
pub use predictor::{Prediction, Profile};
pub use risk::{HealthRiskScore, RiskRules};

/// Load a dataset and narrow it with the given criteria in one step
pub fn load_filtered(
    path: &std::path::Path,
    criteria: &FilterCriteria,
) -> anyhow::Result<(Dataset, FilteredView)> {
    let dataset = Dataset::load(path)?;
    let view = FilteredView::new(&dataset, criteria.clone());
    Ok((dataset, view))
}

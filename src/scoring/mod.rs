//! Allocation quality metrics.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Mean satisfaction | Mean of applicable per-student, per-group scores |
//! | Minimum satisfaction | Lowest applicable score |
//! | Mean over-request | Mean of excess requests / capacity over modules |
//! | Complete students | Students holding exactly the required total |
//!
//! # Reference
//! Diebold et al. (2014), "Course Allocation via Stable Matching",
//! Business & Information Systems Engineering 6(2)

mod excess;
mod satisfaction;

pub use excess::{ExcessRequestReport, ExcessRequestRow};
pub use satisfaction::SatisfactionScores;

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationRun;

/// Summary indicators of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationKpi {
    /// Mean applicable satisfaction score (`None` if no score applies).
    pub mean_satisfaction: Option<f64>,
    /// Minimum applicable satisfaction score.
    pub minimum_satisfaction: Option<f64>,
    /// Mean over-request proportion over modules with capacity.
    pub mean_over_request: f64,
    /// Students whose total equals the required total.
    pub complete_students: usize,
    /// Sum of excess requests over all modules.
    pub total_excess_requests: u64,
}

impl AllocationKpi {
    /// Computes the indicators of a run in its current state.
    pub fn calculate(run: &AllocationRun) -> Self {
        let catalogue = run.catalogue();
        let scores = SatisfactionScores::calculate(catalogue, run.state());
        let excess = ExcessRequestReport::calculate(catalogue, run.excess());
        let complete_students = run
            .satisfies_total_exactly()
            .into_iter()
            .filter(|&ok| ok)
            .count();

        Self {
            mean_satisfaction: scores.mean(),
            minimum_satisfaction: scores.minimum(),
            mean_over_request: excess.mean_proportion(),
            complete_students,
            total_excess_requests: run.excess().total(),
        }
    }
}

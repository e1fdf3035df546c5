//! Over-subscription report per module.

use serde::{Deserialize, Serialize};

use crate::allocation::ExcessRequests;
use crate::models::Catalogue;

/// Excess requests for one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessRequestRow {
    pub module_id: String,
    pub module_name: String,
    pub excess_requests: u32,
    /// `excess_requests / capacity`; empty for modules without capacity.
    pub proportion_overrequested: Option<f64>,
}

/// Excess requests of a run, one row per module in catalogue order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcessRequestReport {
    rows: Vec<ExcessRequestRow>,
}

impl ExcessRequestReport {
    /// Builds the report from a run's counter.
    ///
    /// Proportions use the module's total capacity, not its remaining places.
    pub fn calculate(catalogue: &Catalogue, excess: &ExcessRequests) -> Self {
        let rows = catalogue
            .modules()
            .iter()
            .zip(excess.counts())
            .map(|(module, &count)| ExcessRequestRow {
                module_id: module.id.clone(),
                module_name: module.name.clone(),
                excess_requests: count,
                proportion_overrequested: (module.capacity > 0)
                    .then(|| f64::from(count) / f64::from(module.capacity)),
            })
            .collect();
        Self { rows }
    }

    /// Rows in catalogue order.
    pub fn rows(&self) -> &[ExcessRequestRow] {
        &self.rows
    }

    /// Rows by descending count; ties keep catalogue order.
    pub fn sorted_by_count(&self) -> Vec<&ExcessRequestRow> {
        let mut rows: Vec<&ExcessRequestRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.excess_requests.cmp(&a.excess_requests));
        rows
    }

    /// Mean proportion over modules that have capacity (0.0 if none do).
    pub fn mean_proportion(&self) -> f64 {
        let proportions: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|r| r.proportion_overrequested)
            .collect();
        if proportions.is_empty() {
            0.0
        } else {
            proportions.iter().sum::<f64>() / proportions.len() as f64
        }
    }
}

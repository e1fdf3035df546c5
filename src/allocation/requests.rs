//! Excess-request counter owned by a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Per-module count of requests that found no free place.
///
/// A student contributes at most once to each module's count within a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcessRequests {
    counts: Vec<u32>,
    counted: BTreeSet<(usize, usize)>,
}

impl ExcessRequests {
    /// Creates a zeroed counter for `module_count` modules.
    pub fn new(module_count: usize) -> Self {
        Self {
            counts: vec![0; module_count],
            counted: BTreeSet::new(),
        }
    }

    /// Counts a capacity failure of `student` on `module`.
    ///
    /// Returns `false` when this student was already counted for the module.
    pub fn record(&mut self, student: usize, module: usize) -> bool {
        if !self.counted.insert((student, module)) {
            return false;
        }
        self.counts[module] += 1;
        true
    }

    /// Excess requests for a module.
    #[inline]
    pub fn count(&self, module: usize) -> u32 {
        self.counts[module]
    }

    /// Counts indexed by module.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// Sum over all modules.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| u64::from(c)).sum()
    }
}

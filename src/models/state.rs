//! Per-run assignment state.
//!
//! Tracks which modules each student holds and the derived credit
//! aggregates (total, per group, per semester). The state only grows: a
//! module, once granted, is never taken back within a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Catalogue;

/// Modules held by each student and their credit aggregates.
///
/// Indexed by the owning [`Catalogue`]'s student, module, group and
/// semester indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentState {
    held: Vec<BTreeSet<usize>>,
    total: Vec<u32>,
    per_group: Vec<Vec<u32>>,
    per_semester: Vec<Vec<u32>>,
}

impl AssignmentState {
    /// Creates an empty state sized for the catalogue.
    pub fn new(catalogue: &Catalogue) -> Self {
        let students = catalogue.student_count();
        Self {
            held: vec![BTreeSet::new(); students],
            total: vec![0; students],
            per_group: vec![vec![0; catalogue.groups().len()]; students],
            per_semester: vec![vec![0; catalogue.semesters().len()]; students],
        }
    }

    /// Records that `student` holds `module`.
    ///
    /// Returns `false` (and changes nothing) when the module was already held.
    pub fn grant(&mut self, catalogue: &Catalogue, student: usize, module: usize) -> bool {
        if !self.held[student].insert(module) {
            return false;
        }
        let credits = catalogue.module(module).credits;
        self.total[student] += credits;
        self.per_group[student][catalogue.group_of(module)] += credits;
        self.per_semester[student][catalogue.semester_of(module)] += credits;
        true
    }

    /// Whether `student` holds `module`.
    #[inline]
    pub fn holds(&self, student: usize, module: usize) -> bool {
        self.held[student].contains(&module)
    }

    /// Modules held by `student`, in index order.
    pub fn held(&self, student: usize) -> &BTreeSet<usize> {
        &self.held[student]
    }

    /// Total credits held by `student`.
    #[inline]
    pub fn total_credits(&self, student: usize) -> u32 {
        self.total[student]
    }

    /// Credits held by `student` per group.
    pub fn group_credits(&self, student: usize) -> &[u32] {
        &self.per_group[student]
    }

    /// Credits held by `student` per semester.
    pub fn semester_credits(&self, student: usize) -> &[u32] {
        &self.per_semester[student]
    }

    /// Number of students tracked.
    pub fn student_count(&self) -> usize {
        self.held.len()
    }

    /// Number of students holding `module`.
    pub fn holders_of(&self, module: usize) -> usize {
        self.held.iter().filter(|set| set.contains(&module)).count()
    }

    /// Total number of (student, module) holdings.
    pub fn holding_count(&self) -> usize {
        self.held.iter().map(BTreeSet::len).sum()
    }
}

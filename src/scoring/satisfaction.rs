//! Preference satisfaction per student and group.
//!
//! For a student holding `k` of the `m` modules in a group with rank sum
//! `S`, the best possible sum is `1 + .. + k` and the worst is
//! `(m-k+1) + .. + m`. The score is
//!
//! ```text
//! 1 - (S - ideal) / (worst - ideal)
//! ```
//!
//! which is 1.0 for the student's `k` favourites and 0.0 for their `k`
//! least-preferred modules. When `k = 0` or `k = m` the ideal and worst
//! sums coincide and the score is not applicable (`None`). Aggregates skip
//! such entries.

use serde::{Deserialize, Serialize};

use crate::models::{AssignmentState, Catalogue};

/// Satisfaction scores indexed by student, then group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionScores {
    scores: Vec<Vec<Option<f64>>>,
}

impl SatisfactionScores {
    /// Scores every student in every group.
    ///
    /// A held module the student never ranked counts as rank `m`.
    pub fn calculate(catalogue: &Catalogue, state: &AssignmentState) -> Self {
        let scores = (0..catalogue.student_count())
            .map(|s| {
                (0..catalogue.groups().len())
                    .map(|g| group_score(catalogue, state, s, g))
                    .collect()
            })
            .collect();
        Self { scores }
    }

    /// Score of one student in one group.
    pub fn get(&self, student: usize, group: usize) -> Option<f64> {
        self.scores[student][group]
    }

    /// Scores of one student, by group.
    pub fn student(&self, student: usize) -> &[Option<f64>] {
        &self.scores[student]
    }

    /// Number of applicable scores.
    pub fn applicable_count(&self) -> usize {
        self.applicable().count()
    }

    /// Mean over applicable scores.
    pub fn mean(&self) -> Option<f64> {
        let count = self.applicable_count();
        if count == 0 {
            return None;
        }
        Some(self.applicable().sum::<f64>() / count as f64)
    }

    /// Lowest applicable score.
    pub fn minimum(&self) -> Option<f64> {
        self.applicable().reduce(f64::min)
    }

    fn applicable(&self) -> impl Iterator<Item = f64> + '_ {
        self.scores.iter().flatten().filter_map(|&s| s)
    }
}

fn group_score(catalogue: &Catalogue, state: &AssignmentState, student: usize, group: usize) -> Option<f64> {
    let members = catalogue.modules_in_group(group);
    let m = members.len() as f64;

    let held: Vec<f64> = members
        .iter()
        .filter(|&&module| state.holds(student, module))
        .map(|&module| catalogue.rank(student, module).map_or(m, f64::from))
        .collect();
    let k = held.len() as f64;

    let ideal = k * (k + 1.0) / 2.0;
    let worst = k * (2.0 * m - k + 1.0) / 2.0;
    let span = worst - ideal;
    if span.abs() < f64::EPSILON {
        return None;
    }
    let sum: f64 = held.iter().sum();
    Some(1.0 - (sum - ideal) / span)
}

//! A single allocation run.
//!
//! An [`AllocationRun`] owns everything one seeded attempt mutates: the
//! free places per module, the [`AssignmentState`] and the excess-request
//! counter. The catalogue is shared read-only, so many runs can proceed
//! side by side.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::requests::ExcessRequests;
use super::round::{allocate_round, RoundContext, RoundDiagnostic, RoundState};
use crate::config::CreditLimits;
use crate::error::{AllocationError, Result};
use crate::models::{AssignmentState, Catalogue, Module, ResolvedPrior};

/// Per-student results of the credit checks.
///
/// Vectors are indexed by the catalogue's semester or group order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentConstraints {
    pub semester_min: Vec<bool>,
    pub semester_max: Vec<bool>,
    pub group_min: Vec<bool>,
    pub group_max: Vec<bool>,
    /// Total credits equal the required total.
    pub total_exact: bool,
}

impl StudentConstraints {
    /// Whether the hard minimums and the exact total all hold.
    pub fn meets_hard_constraints(&self) -> bool {
        self.total_exact
            && self.group_min.iter().all(|&ok| ok)
            && self.semester_min.iter().all(|&ok| ok)
    }
}

/// One seeded allocation attempt.
#[derive(Debug, Clone)]
pub struct AllocationRun {
    catalogue: Arc<Catalogue>,
    limits: CreditLimits,
    seed: u64,
    allow_least_preferred: bool,
    available: Vec<u32>,
    state: AssignmentState,
    excess: ExcessRequests,
    rounds_run: usize,
    last_diagnostics: Vec<RoundDiagnostic>,
}

impl AllocationRun {
    /// Creates a run with fresh state and the catalogue's free places.
    pub fn new(catalogue: Arc<Catalogue>, limits: CreditLimits, seed: u64) -> Self {
        let available = catalogue.initial_available();
        let state = AssignmentState::new(&catalogue);
        let excess = ExcessRequests::new(catalogue.module_count());
        Self {
            catalogue,
            limits,
            seed,
            allow_least_preferred: true,
            available,
            state,
            excess,
            rounds_run: 0,
            last_diagnostics: Vec::new(),
        }
    }

    /// Sets whether bundles may contain least-preferred modules.
    pub fn with_allow_least_preferred(mut self, allow: bool) -> Self {
        self.allow_least_preferred = allow;
        self
    }

    /// Seeds the state with modules students already hold.
    ///
    /// Held credits count toward every cap and deficit from the first round.
    /// Free places are left untouched.
    ///
    /// # Errors
    /// [`AllocationError::ContractViolation`] once a round has run.
    pub fn load_prior(&mut self, prior: &ResolvedPrior) -> Result<()> {
        if self.rounds_run > 0 {
            return Err(AllocationError::contract(format!(
                "prior assignments loaded after {} round(s)",
                self.rounds_run
            )));
        }
        for &(student, module) in prior.holdings() {
            if student >= self.catalogue.student_count() || module >= self.catalogue.module_count() {
                return Err(AllocationError::contract(format!(
                    "prior holding ({student}, {module}) is outside the catalogue"
                )));
            }
            self.state.grant(&self.catalogue, student, module);
        }
        tracing::debug!(holdings = prior.holdings().len(), "prior assignments loaded");
        Ok(())
    }

    /// Runs one round and returns its diagnostics.
    pub fn run_round(&mut self) -> Result<&[RoundDiagnostic]> {
        let ctx = RoundContext {
            catalogue: &self.catalogue,
            limits: &self.limits,
            seed: self.seed,
            round: self.rounds_run,
            allow_least_preferred: self.allow_least_preferred,
        };
        let mut state = RoundState {
            assignments: &mut self.state,
            available: &mut self.available,
            excess: &mut self.excess,
        };
        self.last_diagnostics = allocate_round(&ctx, &mut state)?;
        self.rounds_run += 1;
        Ok(&self.last_diagnostics)
    }

    /// Runs `rounds` rounds, keeping only the last round's diagnostics.
    pub fn run_rounds(&mut self, rounds: usize) -> Result<&[RoundDiagnostic]> {
        for _ in 0..rounds {
            self.run_round()?;
        }
        Ok(&self.last_diagnostics)
    }

    /// Group minimums per student, per group.
    pub fn satisfies_group_minimums(&self) -> Vec<Vec<bool>> {
        self.per_student(|s| compare(self.state.group_credits(s), &self.limits.group_min, |h, b| h >= b))
    }

    /// Group maximums per student, per group.
    pub fn satisfies_group_maximums(&self) -> Vec<Vec<bool>> {
        self.per_student(|s| compare(self.state.group_credits(s), &self.limits.group_max, |h, b| h <= b))
    }

    /// Semester minimums per student, per semester.
    pub fn satisfies_semester_minimums(&self) -> Vec<Vec<bool>> {
        self.per_student(|s| {
            compare(self.state.semester_credits(s), &self.limits.semester_min, |h, b| h >= b)
        })
    }

    /// Semester maximums per student, per semester.
    pub fn satisfies_semester_maximums(&self) -> Vec<Vec<bool>> {
        self.per_student(|s| {
            compare(self.state.semester_credits(s), &self.limits.semester_max, |h, b| h <= b)
        })
    }

    /// Whether each student's total equals the required total exactly.
    pub fn satisfies_total_exactly(&self) -> Vec<bool> {
        self.per_student(|s| self.state.total_credits(s) == self.limits.required_total)
    }

    /// All credit checks, one entry per student.
    pub fn constraint_report(&self) -> Vec<StudentConstraints> {
        let semester_min = self.satisfies_semester_minimums();
        let semester_max = self.satisfies_semester_maximums();
        let group_min = self.satisfies_group_minimums();
        let group_max = self.satisfies_group_maximums();
        let total = self.satisfies_total_exactly();

        semester_min
            .into_iter()
            .zip(semester_max)
            .zip(group_min)
            .zip(group_max)
            .zip(total)
            .map(
                |((((semester_min, semester_max), group_min), group_max), total_exact)| {
                    StudentConstraints {
                        semester_min,
                        semester_max,
                        group_min,
                        group_max,
                        total_exact,
                    }
                },
            )
            .collect()
    }

    /// Whether every student meets the group and semester minimums and the
    /// exact total.
    pub fn meets_hard_constraints(&self) -> bool {
        self.constraint_report()
            .iter()
            .all(StudentConstraints::meets_hard_constraints)
    }

    /// Modules held by a student, in catalogue order.
    pub fn held_modules(&self, student_id: &str) -> Option<Vec<&Module>> {
        let student = self.catalogue.student_index(student_id)?;
        Some(
            self.state
                .held(student)
                .iter()
                .map(|&m| self.catalogue.module(m))
                .collect(),
        )
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    pub fn limits(&self) -> &CreditLimits {
        &self.limits
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn state(&self) -> &AssignmentState {
        &self.state
    }

    /// Free places per module.
    pub fn available(&self) -> &[u32] {
        &self.available
    }

    pub fn excess(&self) -> &ExcessRequests {
        &self.excess
    }

    pub fn rounds_run(&self) -> usize {
        self.rounds_run
    }

    /// Diagnostics of the most recent round.
    pub fn last_diagnostics(&self) -> &[RoundDiagnostic] {
        &self.last_diagnostics
    }

    fn per_student<T>(&self, f: impl Fn(usize) -> T) -> Vec<T> {
        (0..self.catalogue.student_count()).map(f).collect()
    }
}

fn compare(held: &[u32], bounds: &[u32], ok: impl Fn(u32, u32) -> bool) -> Vec<bool> {
    held.iter().zip(bounds).map(|(&h, &b)| ok(h, b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllocationConfig, CreditBounds};
    use crate::models::{PriorAssignments, Student};

    fn catalogue() -> Arc<Catalogue> {
        Arc::new(
            Catalogue::new(
                vec![
                    Module::new("A")
                        .with_credits(10)
                        .with_group("core")
                        .with_semester("1")
                        .with_capacity(2),
                    Module::new("B")
                        .with_credits(10)
                        .with_group("core")
                        .with_semester("2")
                        .with_capacity(2),
                    Module::new("C")
                        .with_credits(10)
                        .with_group("option")
                        .with_semester("1")
                        .with_capacity(2),
                ],
                vec![
                    Student::new("S1")
                        .with_desired("core", 20)
                        .with_rank("A", 1)
                        .with_rank("B", 2)
                        .with_rank("C", 1),
                    Student::new("S2")
                        .with_desired("option", 10)
                        .with_desired("core", 10)
                        .with_rank("A", 2)
                        .with_rank("B", 1)
                        .with_rank("C", 1),
                ],
            )
            .unwrap(),
        )
    }

    fn limits(cat: &Catalogue) -> CreditLimits {
        let config = AllocationConfig::new(20)
            .with_group_bounds("core", CreditBounds::new(10, 20))
            .with_semester_bounds("1", CreditBounds::at_most(20));
        CreditLimits::resolve(&config, cat)
    }

    #[test]
    fn test_run_reaches_required_total() {
        let cat = catalogue();
        let mut run = AllocationRun::new(cat.clone(), limits(&cat), 1);
        let diags = run.run_rounds(5).unwrap().to_vec();
        assert!(diags.is_empty());
        assert_eq!(run.rounds_run(), 5);
        assert_eq!(run.satisfies_total_exactly(), vec![true, true]);
        assert!(run.meets_hard_constraints());

        let s1: Vec<&str> = run.held_modules("S1").unwrap().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(s1, vec!["A", "B"]);
        let s2: Vec<&str> = run.held_modules("S2").unwrap().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(s2, vec!["B", "C"]);
        assert_eq!(run.available(), &[1, 0, 1]);
        assert!(run.held_modules("S9").is_none());
    }

    #[test]
    fn test_runs_are_deterministic() {
        let cat = catalogue();
        let mut a = AllocationRun::new(cat.clone(), limits(&cat), 99);
        let mut b = AllocationRun::new(cat.clone(), limits(&cat), 99);
        a.run_rounds(3).unwrap();
        b.run_rounds(3).unwrap();
        assert_eq!(a.state(), b.state());
        assert_eq!(a.available(), b.available());
        assert_eq!(a.excess(), b.excess());
    }

    #[test]
    fn test_load_prior_counts_credits_only() {
        let cat = catalogue();
        let prior = PriorAssignments::new()
            .with_holding("S1", "A")
            .resolve(&cat)
            .unwrap();
        let mut run = AllocationRun::new(cat.clone(), limits(&cat), 1);
        run.load_prior(&prior).unwrap();

        assert_eq!(run.state().total_credits(0), 10);
        assert_eq!(run.state().group_credits(0), &[10, 0]);
        assert_eq!(run.state().semester_credits(0), &[10, 0]);
        assert_eq!(run.available(), &[2, 2, 2]);
    }

    #[test]
    fn test_load_prior_after_round_rejected() {
        let cat = catalogue();
        let prior = PriorAssignments::new()
            .with_holding("S1", "A")
            .resolve(&cat)
            .unwrap();
        let mut run = AllocationRun::new(cat.clone(), limits(&cat), 1);
        run.run_round().unwrap();
        let err = run.load_prior(&prior).unwrap_err();
        assert!(matches!(err, AllocationError::ContractViolation(_)));
    }

    #[test]
    fn test_constraint_queries_before_rounds() {
        let cat = catalogue();
        let run = AllocationRun::new(cat.clone(), limits(&cat), 1);

        // Nothing held: core minimum of 10 fails, option minimum of 0 holds.
        assert_eq!(run.satisfies_group_minimums(), vec![vec![false, true]; 2]);
        assert_eq!(run.satisfies_group_maximums(), vec![vec![true, true]; 2]);
        assert_eq!(run.satisfies_semester_minimums(), vec![vec![true, true]; 2]);
        assert_eq!(run.satisfies_semester_maximums(), vec![vec![true, true]; 2]);
        assert_eq!(run.satisfies_total_exactly(), vec![false, false]);
        assert!(!run.meets_hard_constraints());

        let report = run.constraint_report();
        assert_eq!(report.len(), 2);
        assert!(!report[0].total_exact);
        assert_eq!(report[0].group_min, vec![false, true]);
    }
}

//! Randomized-restart search over independent runs.
//!
//! # Algorithm
//!
//! For each repetition `r` in `0..R`:
//! 1. Build a fresh [`AllocationRun`] seeded with `derive_seed(base, r)`.
//! 2. Load prior assignments, if any.
//! 3. Run the round budget.
//! 4. Reject the run if hard-constraint validation is on and it fails.
//! 5. Keep the run if it ranks ahead of the best so far.
//!
//! Repetitions share nothing mutable, so they may run in parallel. The
//! ranking is a total order, so the winner does not depend on the order in
//! which repetitions finish.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::comparator::{derive_seed, CandidateScore, ComparatorStrategy};
use crate::allocation::AllocationRun;
use crate::config::{CreditLimits, SearchSettings};
use crate::error::Result;
use crate::models::{Catalogue, ResolvedPrior};
use crate::scoring::AllocationKpi;

/// Progress report sent after each repetition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Zero-based index of the repetition that just finished.
    pub repetition: usize,
    /// Repetitions requested.
    pub total: usize,
    /// Whether the finished repetition passed validation.
    pub accepted: bool,
    /// Repetition index of the best run so far.
    pub best_repetition: Option<usize>,
    /// Mean satisfaction of the best run so far.
    pub best_mean_satisfaction: Option<f64>,
}

/// The winning run and search totals.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub run: AllocationRun,
    /// Repetition index that produced the run.
    pub repetition: usize,
    pub kpi: AllocationKpi,
    /// Repetitions executed (fewer than requested after an early exit).
    pub repetitions_run: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Result of a search.
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    /// At least one run qualified; the best one is returned.
    Found(Box<SearchResult>),
    /// Every executed run was rejected.
    NoQualifyingAllocation {
        repetitions_run: usize,
        rejected: usize,
    },
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// The winning result, if any.
    pub fn result(&self) -> Option<&SearchResult> {
        match self {
            Self::Found(result) => Some(result),
            Self::NoQualifyingAllocation { .. } => None,
        }
    }

    /// Consumes the outcome, yielding the winning result if any.
    pub fn into_result(self) -> Option<SearchResult> {
        match self {
            Self::Found(result) => Some(*result),
            Self::NoQualifyingAllocation { .. } => None,
        }
    }
}

/// A finished repetition.
#[derive(Debug, Clone)]
struct Candidate {
    run: AllocationRun,
    score: CandidateScore,
    kpi: AllocationKpi,
}

/// Running totals plus the best candidate seen.
#[derive(Debug, Clone, Default)]
struct Tally {
    repetitions_run: usize,
    accepted: usize,
    rejected: usize,
    best: Option<Candidate>,
}

impl Tally {
    fn single(candidate: Candidate, accepted: bool) -> Self {
        if accepted {
            Self {
                repetitions_run: 1,
                accepted: 1,
                rejected: 0,
                best: Some(candidate),
            }
        } else {
            Self {
                repetitions_run: 1,
                accepted: 0,
                rejected: 1,
                best: None,
            }
        }
    }

    fn merge(self, other: Self, comparator: ComparatorStrategy) -> Self {
        let best = match (self.best, other.best) {
            (Some(a), Some(b)) => {
                if comparator.is_better(&b.score, &a.score) {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (a, b) => a.or(b),
        };
        Self {
            repetitions_run: self.repetitions_run + other.repetitions_run,
            accepted: self.accepted + other.accepted,
            rejected: self.rejected + other.rejected,
            best,
        }
    }

    fn into_outcome(self) -> SearchOutcome {
        match self.best {
            Some(best) => SearchOutcome::Found(Box::new(SearchResult {
                repetition: best.score.repetition,
                run: best.run,
                kpi: best.kpi,
                repetitions_run: self.repetitions_run,
                accepted: self.accepted,
                rejected: self.rejected,
            })),
            None => SearchOutcome::NoQualifyingAllocation {
                repetitions_run: self.repetitions_run,
                rejected: self.rejected,
            },
        }
    }
}

/// Best-of-N search over seeded allocation runs.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_allocate::config::{CreditLimits, SearchSettings};
/// use u_allocate::models::{Catalogue, Module, Student};
/// use u_allocate::search::AllocationSearch;
///
/// let catalogue = Arc::new(
///     Catalogue::new(
///         vec![Module::new("M1").with_credits(10).with_capacity(1)],
///         vec![Student::new("S1").with_rank("M1", 1)],
///     )
///     .unwrap(),
/// );
/// let limits = CreditLimits::unbounded(10, &catalogue);
/// let search = AllocationSearch::new(catalogue, limits, SearchSettings::default());
/// let outcome = search.run().unwrap();
/// assert!(outcome.is_found());
/// ```
#[derive(Debug, Clone)]
pub struct AllocationSearch {
    catalogue: Arc<Catalogue>,
    limits: CreditLimits,
    settings: SearchSettings,
    prior: Option<ResolvedPrior>,
}

impl AllocationSearch {
    pub fn new(catalogue: Arc<Catalogue>, limits: CreditLimits, settings: SearchSettings) -> Self {
        Self {
            catalogue,
            limits,
            settings,
            prior: None,
        }
    }

    /// Loads these prior assignments into every run before its first round.
    pub fn with_prior(mut self, prior: ResolvedPrior) -> Self {
        self.prior = Some(prior);
        self
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    /// Executes a single repetition and reports whether it qualifies.
    pub fn run_repetition(&self, repetition: usize) -> Result<(AllocationRun, bool)> {
        let seed = derive_seed(self.settings.base_seed, repetition);
        let mut run = AllocationRun::new(Arc::clone(&self.catalogue), self.limits.clone(), seed)
            .with_allow_least_preferred(self.settings.allow_least_preferred);
        if let Some(prior) = &self.prior {
            run.load_prior(prior)?;
        }
        run.run_rounds(self.settings.rounds_per_repetition)?;

        let accepted = !self.settings.validate_hard_constraints || run.meets_hard_constraints();
        Ok((run, accepted))
    }

    /// Runs all repetitions in order.
    pub fn run(&self) -> Result<SearchOutcome> {
        self.run_with_progress(|_| ControlFlow::Continue(()))
    }

    /// Runs repetitions in order, reporting after each one.
    ///
    /// Returning [`ControlFlow::Break`] from `progress` stops the search; the
    /// outcome then covers the repetitions run so far.
    pub fn run_with_progress<F>(&self, mut progress: F) -> Result<SearchOutcome>
    where
        F: FnMut(SearchProgress) -> ControlFlow<()>,
    {
        let total = self.settings.repetitions;
        let mut tally = Tally::default();

        for repetition in 0..total {
            let (candidate, accepted) = self.evaluate(repetition)?;
            tally = tally.merge(Tally::single(candidate, accepted), self.settings.comparator);

            let best = tally.best.as_ref();
            let flow = progress(SearchProgress {
                repetition,
                total,
                accepted,
                best_repetition: best.map(|c| c.score.repetition),
                best_mean_satisfaction: best.and_then(|c| c.score.mean_satisfaction),
            });
            if flow.is_break() {
                tracing::info!(repetition, total, "search stopped early");
                break;
            }
        }

        self.finish(tally)
    }

    /// Runs all repetitions on the rayon thread pool.
    ///
    /// Yields the same winner as [`run`](Self::run).
    #[cfg(feature = "parallel")]
    pub fn run_parallel(&self) -> Result<SearchOutcome> {
        use rayon::prelude::*;

        let comparator = self.settings.comparator;
        let tally = (0..self.settings.repetitions)
            .into_par_iter()
            .map(|repetition| {
                self.evaluate(repetition)
                    .map(|(candidate, accepted)| Tally::single(candidate, accepted))
            })
            .try_reduce(Tally::default, |a, b| Ok(a.merge(b, comparator)))?;

        self.finish(tally)
    }

    fn evaluate(&self, repetition: usize) -> Result<(Candidate, bool)> {
        let (run, accepted) = self.run_repetition(repetition)?;
        let kpi = AllocationKpi::calculate(&run);
        let score = CandidateScore::new(repetition, &kpi);

        if accepted {
            tracing::info!(
                repetition,
                seed = run.seed(),
                mean_satisfaction = ?kpi.mean_satisfaction,
                mean_over_request = kpi.mean_over_request,
                "repetition accepted"
            );
        } else {
            tracing::warn!(
                repetition,
                seed = run.seed(),
                complete_students = kpi.complete_students,
                "repetition rejected: hard constraints not met"
            );
        }
        Ok((Candidate { run, score, kpi }, accepted))
    }

    fn finish(&self, tally: Tally) -> Result<SearchOutcome> {
        let outcome = tally.into_outcome();
        match &outcome {
            SearchOutcome::Found(result) => tracing::info!(
                repetition = result.repetition,
                accepted = result.accepted,
                rejected = result.rejected,
                mean_satisfaction = ?result.kpi.mean_satisfaction,
                "best allocation selected"
            ),
            SearchOutcome::NoQualifyingAllocation {
                repetitions_run,
                rejected,
            } => tracing::warn!(repetitions_run, rejected, "no qualifying allocation found"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllocationConfig, CreditBounds};
    use crate::models::{Module, PriorAssignments, Student};

    fn catalogue() -> Arc<Catalogue> {
        let modules = (1..=4)
            .map(|i| {
                Module::new(format!("M{i}"))
                    .with_credits(10)
                    .with_group(if i <= 2 { "core" } else { "option" })
                    .with_capacity(3)
            })
            .collect();
        let students = (1..=4)
            .map(|s| {
                let mut student = Student::new(format!("S{s}"))
                    .with_desired("core", 10)
                    .with_desired("option", 10);
                for m in 1..=4u32 {
                    // Rotate preferences so students compete differently.
                    student = student.with_rank(format!("M{m}"), (m + s) % 4 + 1);
                }
                student
            })
            .collect();
        Arc::new(Catalogue::new(modules, students).unwrap())
    }

    fn search(settings: SearchSettings) -> AllocationSearch {
        let cat = catalogue();
        let limits = CreditLimits::unbounded(20, &cat);
        AllocationSearch::new(cat, limits, settings)
    }

    #[test]
    fn test_search_finds_allocation() {
        let outcome = search(SearchSettings::default().with_repetitions(5))
            .run()
            .unwrap();
        let result = outcome.result().unwrap();
        assert_eq!(result.repetitions_run, 5);
        assert_eq!(result.accepted + result.rejected, 5);
        assert!(result.run.meets_hard_constraints());
        assert_eq!(result.run.seed(), derive_seed(0, result.repetition));
    }

    #[test]
    fn test_search_is_reproducible() {
        let settings = SearchSettings::default().with_repetitions(6).with_base_seed(11);
        let a = search(settings.clone()).run().unwrap().into_result().unwrap();
        let b = search(settings).run().unwrap().into_result().unwrap();
        assert_eq!(a.repetition, b.repetition);
        assert_eq!(a.run.state(), b.run.state());
    }

    #[test]
    fn test_winner_ranks_ahead_of_every_repetition() {
        let settings = SearchSettings::default().with_repetitions(8).with_base_seed(3);
        let s = search(settings.clone());
        let result = s.run().unwrap().into_result().unwrap();
        let best = CandidateScore::new(result.repetition, &result.kpi);

        for repetition in 0..8 {
            let (run, accepted) = s.run_repetition(repetition).unwrap();
            if !accepted || repetition == result.repetition {
                continue;
            }
            let other = CandidateScore::new(repetition, &AllocationKpi::calculate(&run));
            assert!(settings.comparator.is_better(&best, &other));
        }
    }

    #[test]
    fn test_no_qualifying_allocation() {
        let cat = catalogue();
        // Every student needs 30 credits in core, which only offers 20.
        let config = AllocationConfig::new(40).with_group_bounds("core", CreditBounds::at_least(30));
        let limits = CreditLimits::resolve(&config, &cat);
        let outcome = AllocationSearch::new(cat, limits, SearchSettings::default().with_repetitions(3))
            .run()
            .unwrap();
        match outcome {
            SearchOutcome::NoQualifyingAllocation {
                repetitions_run,
                rejected,
            } => {
                assert_eq!(repetitions_run, 3);
                assert_eq!(rejected, 3);
            }
            SearchOutcome::Found(_) => panic!("expected no qualifying allocation"),
        }
    }

    #[test]
    fn test_validation_disabled_accepts_incomplete_runs() {
        let cat = catalogue();
        let limits = CreditLimits::unbounded(60, &cat);
        let settings = SearchSettings::default().with_repetitions(2).with_validation(false);
        let outcome = AllocationSearch::new(cat, limits, settings).run().unwrap();
        let result = outcome.result().unwrap();
        assert_eq!(result.accepted, 2);
        assert!(!result.run.meets_hard_constraints());
    }

    #[test]
    fn test_progress_and_early_exit() {
        let mut seen = Vec::new();
        let outcome = search(SearchSettings::default().with_repetitions(10))
            .run_with_progress(|p| {
                seen.push(p.repetition);
                assert_eq!(p.total, 10);
                if p.repetition == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(outcome.result().unwrap().repetitions_run, 3);
    }

    #[test]
    fn test_prior_loaded_into_every_run() {
        let cat = catalogue();
        let prior = PriorAssignments::new()
            .with_holding("S1", "M1")
            .resolve(&cat)
            .unwrap();
        let limits = CreditLimits::unbounded(20, &cat);
        let s = AllocationSearch::new(cat, limits, SearchSettings::default().with_repetitions(3))
            .with_prior(prior);
        for repetition in 0..3 {
            let (run, _) = s.run_repetition(repetition).unwrap();
            assert!(run.state().holds(0, 0));
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let settings = SearchSettings::default().with_repetitions(12).with_base_seed(5);
        let s = search(settings);
        let sequential = s.run().unwrap().into_result().unwrap();
        let parallel = s.run_parallel().unwrap().into_result().unwrap();
        assert_eq!(sequential.repetition, parallel.repetition);
        assert_eq!(sequential.run.state(), parallel.run.state());
        assert_eq!(sequential.accepted, parallel.accepted);
    }
}

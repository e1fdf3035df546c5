//! Constraint evaluation for candidate bundles.
//!
//! A *bundle* is a target module plus those of its direct requirements the
//! student does not hold yet. Evaluation is a pure function of the bundle,
//! the student's current holdings, the run's free places and the credit
//! limits. It reports each predicate separately so the caller can both act
//! on the verdict and record why a bundle was refused.

use serde::{Deserialize, Serialize};

use crate::config::CreditLimits;
use crate::models::{AssignmentState, Catalogue};

/// Outcome of evaluating one bundle, predicate by predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintCheck {
    /// Every bundle module has a free place.
    pub has_capacity: bool,
    /// No bundle module is mutually exclusive with a held module or with
    /// another bundle module.
    pub not_mutually_excluded: bool,
    /// No bundle module is on the student's exclusion list.
    pub not_student_excluded: bool,
    /// No group maximum would be exceeded.
    pub within_group_cap: bool,
    /// The required total would not be exceeded.
    pub within_total_cap: bool,
    /// No semester maximum would be exceeded.
    pub within_semester_cap: bool,
    /// The bundle avoids least-preferred modules, or that is allowed.
    pub preference_acceptable: bool,
}

impl ConstraintCheck {
    /// Whether every predicate holds.
    pub fn is_assignable(&self) -> bool {
        self.has_capacity
            && self.not_mutually_excluded
            && self.not_student_excluded
            && self.within_group_cap
            && self.within_total_cap
            && self.within_semester_cap
            && self.preference_acceptable
    }

    /// Names of the predicates that failed.
    pub fn failed(&self) -> Vec<&'static str> {
        [
            (self.has_capacity, "has_capacity"),
            (self.not_mutually_excluded, "not_mutually_excluded"),
            (self.not_student_excluded, "not_student_excluded"),
            (self.within_group_cap, "within_group_cap"),
            (self.within_total_cap, "within_total_cap"),
            (self.within_semester_cap, "within_semester_cap"),
            (self.preference_acceptable, "preference_acceptable"),
        ]
        .into_iter()
        .filter_map(|(ok, name)| (!ok).then_some(name))
        .collect()
    }
}

/// Everything the evaluator reads for one bundle.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    pub catalogue: &'a Catalogue,
    pub state: &'a AssignmentState,
    /// Free places per module in the current run.
    pub available: &'a [u32],
    pub limits: &'a CreditLimits,
    pub student: usize,
    pub bundle: &'a [usize],
    pub allow_least_preferred: bool,
}

/// Builds the bundle for `module`: the module and its direct requirements,
/// minus anything the student already holds. Target first.
///
/// Requirements are expanded one level only.
pub fn bundle_for(
    catalogue: &Catalogue,
    state: &AssignmentState,
    student: usize,
    module: usize,
) -> Vec<usize> {
    std::iter::once(module)
        .chain(catalogue.requirements_of(module).iter().copied())
        .filter(|&m| !state.holds(student, m))
        .collect()
}

/// Evaluates all predicates for a bundle.
pub fn evaluate_bundle(request: &BundleRequest<'_>) -> ConstraintCheck {
    let BundleRequest {
        catalogue,
        state,
        available,
        limits,
        student,
        bundle,
        allow_least_preferred,
    } = *request;

    let has_capacity = bundle.iter().all(|&m| available[m] > 0);

    let held = state.held(student);
    let not_mutually_excluded = bundle.iter().enumerate().all(|(i, &m)| {
        held.iter().all(|&h| !catalogue.excludes(m, h))
            && bundle[i + 1..].iter().all(|&other| !catalogue.excludes(m, other))
    });

    let not_student_excluded = bundle.iter().all(|&m| !catalogue.refuses(student, m));

    let mut group_add = vec![0u32; catalogue.groups().len()];
    let mut semester_add = vec![0u32; catalogue.semesters().len()];
    let mut total_add = 0u32;
    for &m in bundle {
        let credits = catalogue.module(m).credits;
        group_add[catalogue.group_of(m)] += credits;
        semester_add[catalogue.semester_of(m)] += credits;
        total_add += credits;
    }

    let within_group_cap = fits(state.group_credits(student), &group_add, &limits.group_max);
    let within_semester_cap =
        fits(state.semester_credits(student), &semester_add, &limits.semester_max);
    let within_total_cap =
        state.total_credits(student).saturating_add(total_add) <= limits.required_total;

    let preference_acceptable = allow_least_preferred
        || !bundle
            .iter()
            .any(|&m| is_least_preferred(catalogue, state, student, m));

    ConstraintCheck {
        has_capacity,
        not_mutually_excluded,
        not_student_excluded,
        within_group_cap,
        within_total_cap,
        within_semester_cap,
        preference_acceptable,
    }
}

fn fits(held: &[u32], added: &[u32], max: &[u32]) -> bool {
    held.iter()
        .zip(added)
        .zip(max)
        .all(|((&h, &a), &cap)| h.saturating_add(a) <= cap)
}

/// Sort key for ranks: unranked is worse than any rank.
#[inline]
fn rank_key(rank: Option<u32>) -> u64 {
    rank.map_or(u64::MAX, u64::from)
}

/// Whether `module` carries the worst rank among the modules of its group
/// that the student does not hold yet.
fn is_least_preferred(
    catalogue: &Catalogue,
    state: &AssignmentState,
    student: usize,
    module: usize,
) -> bool {
    let worst = catalogue
        .modules_in_group(catalogue.group_of(module))
        .iter()
        .filter(|&&m| !state.holds(student, m))
        .map(|&m| rank_key(catalogue.rank(student, m)))
        .max();
    worst == Some(rank_key(catalogue.rank(student, module)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllocationConfig, CreditBounds};
    use crate::models::{Module, Student};

    fn catalogue() -> Catalogue {
        Catalogue::new(
            vec![
                Module::new("A").with_credits(10).with_group("g").with_semester("1").with_capacity(1),
                Module::new("B")
                    .with_credits(10)
                    .with_group("g")
                    .with_semester("1")
                    .with_capacity(1)
                    .with_requirement("A"),
                Module::new("C")
                    .with_credits(20)
                    .with_group("g")
                    .with_semester("2")
                    .with_capacity(0)
                    .with_exclusion("A"),
                Module::new("D").with_credits(10).with_group("h").with_semester("2").with_capacity(3),
            ],
            vec![Student::new("S1")
                .with_rank("A", 1)
                .with_rank("B", 2)
                .with_rank("C", 3)
                .with_rank("D", 1)
                .with_excluded("D")],
        )
        .unwrap()
    }

    fn check(
        cat: &Catalogue,
        state: &AssignmentState,
        limits: &CreditLimits,
        bundle: &[usize],
        allow_least_preferred: bool,
    ) -> ConstraintCheck {
        let available = cat.initial_available();
        evaluate_bundle(&BundleRequest {
            catalogue: cat,
            state,
            available: &available,
            limits,
            student: 0,
            bundle,
            allow_least_preferred,
        })
    }

    #[test]
    fn test_bundle_includes_unheld_requirements() {
        let cat = catalogue();
        let mut state = AssignmentState::new(&cat);
        assert_eq!(bundle_for(&cat, &state, 0, 1), vec![1, 0]);

        state.grant(&cat, 0, 0);
        assert_eq!(bundle_for(&cat, &state, 0, 1), vec![1]);

        state.grant(&cat, 0, 1);
        assert!(bundle_for(&cat, &state, 0, 1).is_empty());
    }

    #[test]
    fn test_assignable_bundle() {
        let cat = catalogue();
        let state = AssignmentState::new(&cat);
        let limits = CreditLimits::unbounded(60, &cat);
        let result = check(&cat, &state, &limits, &[1, 0], true);
        assert!(result.is_assignable(), "failed: {:?}", result.failed());
    }

    #[test]
    fn test_capacity_failure() {
        let cat = catalogue();
        let state = AssignmentState::new(&cat);
        let limits = CreditLimits::unbounded(60, &cat);
        let result = check(&cat, &state, &limits, &[2], true);
        assert!(!result.has_capacity);
        assert_eq!(result.failed(), vec!["has_capacity"]);
    }

    #[test]
    fn test_mutual_exclusion_against_held() {
        let cat = catalogue();
        let mut state = AssignmentState::new(&cat);
        state.grant(&cat, 0, 0);
        let limits = CreditLimits::unbounded(60, &cat);
        // C excludes A; the relation was declared on C only.
        let result = check(&cat, &state, &limits, &[2], true);
        assert!(!result.not_mutually_excluded);
    }

    #[test]
    fn test_mutual_exclusion_inside_bundle() {
        let cat = catalogue();
        let state = AssignmentState::new(&cat);
        let limits = CreditLimits::unbounded(60, &cat);
        let result = check(&cat, &state, &limits, &[0, 2], true);
        assert!(!result.not_mutually_excluded);
    }

    #[test]
    fn test_student_exclusion() {
        let cat = catalogue();
        let state = AssignmentState::new(&cat);
        let limits = CreditLimits::unbounded(60, &cat);
        let result = check(&cat, &state, &limits, &[3], true);
        assert!(!result.not_student_excluded);
    }

    #[test]
    fn test_total_cap_is_exact_or_under() {
        let cat = catalogue();
        let state = AssignmentState::new(&cat);

        let exact = CreditLimits::unbounded(20, &cat);
        assert!(check(&cat, &state, &exact, &[1, 0], true).within_total_cap);

        let under = CreditLimits::unbounded(19, &cat);
        assert!(!check(&cat, &state, &under, &[1, 0], true).within_total_cap);
    }

    #[test]
    fn test_group_and_semester_caps() {
        let cat = catalogue();
        let mut state = AssignmentState::new(&cat);
        state.grant(&cat, 0, 0);
        let config = AllocationConfig::new(100)
            .with_group_bounds("g", CreditBounds::at_most(15))
            .with_semester_bounds("1", CreditBounds::at_most(15));
        let limits = CreditLimits::resolve(&config, &cat);

        let result = check(&cat, &state, &limits, &[1], true);
        assert!(!result.within_group_cap);
        assert!(!result.within_semester_cap);
        assert!(result.within_total_cap);
    }

    #[test]
    fn test_least_preferred_gate() {
        let cat = catalogue();
        let state = AssignmentState::new(&cat);
        let limits = CreditLimits::unbounded(100, &cat);

        // C has the worst rank (3) among unheld modules of group g.
        assert!(!check(&cat, &state, &limits, &[2], false).preference_acceptable);
        assert!(check(&cat, &state, &limits, &[2], true).preference_acceptable);
        // A is the favourite.
        assert!(check(&cat, &state, &limits, &[0], false).preference_acceptable);
    }

    #[test]
    fn test_least_preferred_ignores_held_modules() {
        let cat = catalogue();
        let mut state = AssignmentState::new(&cat);
        state.grant(&cat, 0, 2);
        let limits = CreditLimits::unbounded(100, &cat);
        // With C held, B (rank 2) is now the worst remaining in group g.
        assert!(!check(&cat, &state, &limits, &[1], false).preference_acceptable);
        assert!(check(&cat, &state, &limits, &[0], false).preference_acceptable);
    }
}

//! One allocation round.
//!
//! # Algorithm
//!
//! 1. Order each student's groups by credit deficit (desired minus held),
//!    largest first. Ties keep catalogue group order.
//! 2. Shuffle the students with a generator keyed by the run seed and the
//!    round index.
//! 3. Skip students that already hold the required total.
//! 4. Walk the student's groups in deficit order and, within a group, the
//!    modules from most to least preferred. Evaluate every non-empty bundle.
//! 5. A capacity failure counts an excess request on each full bundle module
//!    and the scan continues. The first fully assignable bundle is committed
//!    and the student is done for the round.
//! 6. Students left without an assignment get a [`RoundDiagnostic`].
//!
//! # Complexity
//! O(n * m * b) per round where n=students, m=modules, b=bundle size.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::constraint::{bundle_for, evaluate_bundle, BundleRequest, ConstraintCheck};
use super::requests::ExcessRequests;
use crate::config::CreditLimits;
use crate::error::{AllocationError, Result};
use crate::models::{AssignmentState, Catalogue};

/// A student who received nothing in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDiagnostic {
    /// Student ID.
    pub student_id: String,
    /// Last bundle evaluation (`None` if no bundle was left to evaluate).
    pub check: Option<ConstraintCheck>,
}

/// Read-only inputs to a round.
#[derive(Debug, Clone, Copy)]
pub struct RoundContext<'a> {
    pub catalogue: &'a Catalogue,
    pub limits: &'a CreditLimits,
    /// Seed of the owning run.
    pub seed: u64,
    /// Zero-based round index within the run.
    pub round: usize,
    pub allow_least_preferred: bool,
}

/// Mutable run state a round works on.
#[derive(Debug)]
pub struct RoundState<'a> {
    pub assignments: &'a mut AssignmentState,
    /// Free places per module.
    pub available: &'a mut [u32],
    pub excess: &'a mut ExcessRequests,
}

/// Student visiting order for a round.
///
/// Depends only on the seed and the round index.
pub fn student_order(student_count: usize, seed: u64, round: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(round as u64);
    let mut order: Vec<usize> = (0..student_count).collect();
    order.shuffle(&mut rng);
    order
}

/// A student's groups, largest credit deficit first.
pub fn deficit_order(catalogue: &Catalogue, state: &AssignmentState, student: usize) -> Vec<usize> {
    let held = state.group_credits(student);
    let mut groups: Vec<usize> = (0..catalogue.groups().len()).collect();
    // Stable sort: equal deficits keep catalogue order.
    groups.sort_by_key(|&g| {
        let deficit = i64::from(catalogue.desired(student, g)) - i64::from(held[g]);
        std::cmp::Reverse(deficit)
    });
    groups
}

/// Runs one round, granting each student at most one bundle.
///
/// # Errors
/// [`AllocationError::ContractViolation`] if a commit would take a module
/// below zero free places.
pub fn allocate_round(
    ctx: &RoundContext<'_>,
    state: &mut RoundState<'_>,
) -> Result<Vec<RoundDiagnostic>> {
    let catalogue = ctx.catalogue;
    let deficits: Vec<Vec<usize>> = (0..catalogue.student_count())
        .map(|s| deficit_order(catalogue, state.assignments, s))
        .collect();

    let mut diagnostics = Vec::new();
    let mut granted = 0usize;

    for student in student_order(catalogue.student_count(), ctx.seed, ctx.round) {
        if state.assignments.total_credits(student) >= ctx.limits.required_total {
            continue;
        }

        match choose_bundle(ctx, state, student, &deficits[student]) {
            Ok(bundle) => {
                commit(catalogue, state, student, &bundle)?;
                granted += 1;
            }
            Err(check) => diagnostics.push(RoundDiagnostic {
                student_id: catalogue.student(student).id.clone(),
                check,
            }),
        }
    }

    tracing::debug!(
        round = ctx.round,
        granted,
        unassigned = diagnostics.len(),
        "round complete"
    );
    Ok(diagnostics)
}

/// Scans for the first assignable bundle. On failure returns the last check.
fn choose_bundle(
    ctx: &RoundContext<'_>,
    state: &mut RoundState<'_>,
    student: usize,
    groups: &[usize],
) -> std::result::Result<Vec<usize>, Option<ConstraintCheck>> {
    let catalogue = ctx.catalogue;
    let mut last = None;

    for &group in groups {
        for &module in catalogue.scan_order(student, group) {
            let bundle = bundle_for(catalogue, state.assignments, student, module);
            if bundle.is_empty() {
                continue;
            }

            let check = evaluate_bundle(&BundleRequest {
                catalogue,
                state: state.assignments,
                available: state.available,
                limits: ctx.limits,
                student,
                bundle: &bundle,
                allow_least_preferred: ctx.allow_least_preferred,
            });

            if !check.has_capacity {
                for &m in bundle.iter().filter(|&&m| state.available[m] == 0) {
                    state.excess.record(student, m);
                }
            }
            if check.is_assignable() {
                return Ok(bundle);
            }
            last = Some(check);
        }
    }
    Err(last)
}

fn commit(
    catalogue: &Catalogue,
    state: &mut RoundState<'_>,
    student: usize,
    bundle: &[usize],
) -> Result<()> {
    for &module in bundle {
        let free = state.available[module].checked_sub(1).ok_or_else(|| {
            AllocationError::contract(format!(
                "module '{}' has no free place to grant",
                catalogue.module(module).id
            ))
        })?;
        state.available[module] = free;
        state.assignments.grant(catalogue, student, module);
    }
    tracing::debug!(
        student = %catalogue.student(student).id,
        modules = ?bundle.iter().map(|&m| catalogue.module(m).id.as_str()).collect::<Vec<_>>(),
        "bundle granted"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Module, Student};

    fn run_round(
        catalogue: &Catalogue,
        limits: &CreditLimits,
        assignments: &mut AssignmentState,
        available: &mut [u32],
        excess: &mut ExcessRequests,
        round: usize,
    ) -> Vec<RoundDiagnostic> {
        let ctx = RoundContext {
            catalogue,
            limits,
            seed: 42,
            round,
            allow_least_preferred: true,
        };
        let mut state = RoundState {
            assignments,
            available,
            excess,
        };
        allocate_round(&ctx, &mut state).unwrap()
    }

    #[test]
    fn test_student_order_is_reproducible() {
        let a = student_order(20, 7, 3);
        let b = student_order(20, 7, 3);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..20).collect::<Vec<_>>());

        // Different rounds of the same run draw different orders.
        assert_ne!(student_order(20, 7, 3), student_order(20, 7, 4));
    }

    #[test]
    fn test_deficit_order() {
        let cat = Catalogue::new(
            vec![
                Module::new("A").with_credits(10).with_group("g1"),
                Module::new("B").with_credits(10).with_group("g2"),
                Module::new("C").with_credits(10).with_group("g3"),
            ],
            vec![Student::new("S1")
                .with_desired("g1", 10)
                .with_desired("g2", 30)
                .with_desired("g3", 10)],
        )
        .unwrap();
        let mut state = AssignmentState::new(&cat);
        assert_eq!(deficit_order(&cat, &state, 0), vec![1, 0, 2]);

        state.grant(&cat, 0, 0);
        // g1 deficit is now 0, g3 still 10: g3 moves ahead of g1.
        assert_eq!(deficit_order(&cat, &state, 0), vec![1, 2, 0]);
    }

    #[test]
    fn test_round_grants_one_bundle_per_student() {
        let cat = Catalogue::new(
            vec![
                Module::new("A").with_credits(10).with_capacity(5),
                Module::new("B").with_credits(10).with_capacity(5),
            ],
            vec![
                Student::new("S1").with_rank("A", 1).with_rank("B", 2),
                Student::new("S2").with_rank("A", 1).with_rank("B", 2),
            ],
        )
        .unwrap();
        let limits = CreditLimits::unbounded(20, &cat);
        let mut assignments = AssignmentState::new(&cat);
        let mut available = cat.initial_available();
        let mut excess = ExcessRequests::new(cat.module_count());

        let diags = run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 0);
        assert!(diags.is_empty());
        assert_eq!(assignments.total_credits(0), 10);
        assert_eq!(assignments.total_credits(1), 10);
        assert_eq!(available, vec![3, 5]);

        run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 1);
        assert_eq!(available, vec![3, 3]);

        // Both students are satisfied and skipped.
        let diags = run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 2);
        assert!(diags.is_empty());
        assert_eq!(available, vec![3, 3]);
    }

    #[test]
    fn test_bundle_committed_with_requirement() {
        let cat = Catalogue::new(
            vec![
                Module::new("BASE").with_credits(10).with_capacity(1),
                Module::new("ADV")
                    .with_credits(10)
                    .with_capacity(1)
                    .with_requirement("BASE"),
            ],
            vec![Student::new("S1").with_rank("ADV", 1).with_rank("BASE", 2)],
        )
        .unwrap();
        let limits = CreditLimits::unbounded(20, &cat);
        let mut assignments = AssignmentState::new(&cat);
        let mut available = cat.initial_available();
        let mut excess = ExcessRequests::new(cat.module_count());

        run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 0);
        assert!(assignments.holds(0, 0));
        assert!(assignments.holds(0, 1));
        assert_eq!(available, vec![0, 0]);
    }

    #[test]
    fn test_diagnostic_for_unassigned_student() {
        let cat = Catalogue::new(
            vec![Module::new("A").with_credits(10).with_capacity(0)],
            vec![Student::new("S1").with_rank("A", 1)],
        )
        .unwrap();
        let limits = CreditLimits::unbounded(10, &cat);
        let mut assignments = AssignmentState::new(&cat);
        let mut available = cat.initial_available();
        let mut excess = ExcessRequests::new(cat.module_count());

        let diags = run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 0);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].student_id, "S1");
        let check = diags[0].check.unwrap();
        assert!(!check.has_capacity);
        assert_eq!(excess.count(0), 1);

        // A second round does not count the same student again.
        run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 1);
        assert_eq!(excess.count(0), 1);
    }

    #[test]
    fn test_full_requirement_counts_excess() {
        let cat = Catalogue::new(
            vec![
                Module::new("BASE").with_credits(10).with_capacity(0),
                Module::new("ADV")
                    .with_credits(10)
                    .with_capacity(3)
                    .with_requirement("BASE"),
            ],
            vec![Student::new("S1").with_rank("ADV", 1)],
        )
        .unwrap();
        let limits = CreditLimits::unbounded(20, &cat);
        let mut assignments = AssignmentState::new(&cat);
        let mut available = cat.initial_available();
        let mut excess = ExcessRequests::new(cat.module_count());

        run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 0);
        assert!(!assignments.holds(0, 1));
        assert_eq!(excess.counts(), &[1, 0]);
    }

    #[test]
    fn test_no_bundle_left_gives_empty_check() {
        let cat = Catalogue::new(
            vec![Module::new("A").with_credits(10).with_capacity(1)],
            vec![Student::new("S1").with_rank("A", 1)],
        )
        .unwrap();
        // Needs 20 credits but only one 10-credit module exists.
        let limits = CreditLimits::unbounded(20, &cat);
        let mut assignments = AssignmentState::new(&cat);
        let mut available = cat.initial_available();
        let mut excess = ExcessRequests::new(cat.module_count());

        run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 0);
        let diags = run_round(&cat, &limits, &mut assignments, &mut available, &mut excess, 1);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].check, None);
    }

    #[test]
    fn test_commit_underflow_is_contract_violation() {
        let cat = Catalogue::new(
            vec![Module::new("A").with_credits(10).with_capacity(0)],
            vec![Student::new("S1")],
        )
        .unwrap();
        let mut assignments = AssignmentState::new(&cat);
        let mut available = vec![0];
        let mut excess = ExcessRequests::new(1);
        let mut state = RoundState {
            assignments: &mut assignments,
            available: &mut available,
            excess: &mut excess,
        };
        let err = commit(&cat, &mut state, 0, &[0]).unwrap_err();
        assert!(matches!(err, AllocationError::ContractViolation(_)));
    }
}

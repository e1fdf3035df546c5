//! Output tables for a finished run.
//!
//! | Table | One row per | Columns |
//! |-------|-------------|---------|
//! | Assignment summary | Student | name, id, desired credits per group, rank per held module (0 = not held) |
//! | Excess requests | Module | id, name, count, proportion of capacity |
//! | Module state | Module | catalogue fields with the run's free places |
//! | Constraint summary | Student | one flag per semester/group bound, plus the exact total |
//! | Rosters | Module | assigned students |

use serde::{Deserialize, Serialize};

use crate::allocation::AllocationRun;
use crate::scoring::{ExcessRequestReport, ExcessRequestRow};

/// A table whose columns depend on the catalogue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by header.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }
}

/// One module as it stands after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleStateRow {
    pub module_id: String,
    pub module_name: String,
    pub module_group: String,
    pub semester: String,
    pub credits: u32,
    pub capacity: u32,
    pub available_spaces: u32,
    /// Comma-joined requirement IDs.
    pub required_modules: String,
    /// Comma-joined IDs of mutually exclusive modules (both directions).
    pub mutually_excluded_modules: String,
}

/// Students assigned to one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    pub module_id: String,
    pub module_name: String,
    /// `(student_name, student_id)` in catalogue order.
    pub students: Vec<(String, String)>,
}

/// All output tables of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationReport {
    pub assignment_summary: Table,
    pub excess_requests: Vec<ExcessRequestRow>,
    pub module_state: Vec<ModuleStateRow>,
    pub constraint_summary: Table,
    pub rosters: Vec<Roster>,
}

impl AllocationReport {
    /// Renders every table from the run's current state.
    pub fn from_run(run: &AllocationRun) -> Self {
        Self {
            assignment_summary: assignment_summary(run),
            excess_requests: excess_requests(run),
            module_state: module_state(run),
            constraint_summary: constraint_summary(run),
            rosters: rosters(run),
        }
    }
}

/// Per-student row: desired credits per group, then the student's rank of
/// each held module or 0.
///
/// A held module the student never ranked shows its group's size, the
/// rank it is scored with.
pub fn assignment_summary(run: &AllocationRun) -> Table {
    let catalogue = run.catalogue();
    let state = run.state();

    let mut headers = vec!["student_name".to_string(), "student_id".to_string()];
    headers.extend(catalogue.groups().iter().cloned());
    headers.extend(catalogue.modules().iter().map(|m| m.id.clone()));

    let rows = catalogue
        .students()
        .iter()
        .enumerate()
        .map(|(s, student)| {
            let mut row = vec![student.name.clone(), student.id.clone()];
            row.extend((0..catalogue.groups().len()).map(|g| catalogue.desired(s, g).to_string()));
            row.extend((0..catalogue.module_count()).map(|m| {
                if !state.holds(s, m) {
                    return "0".to_string();
                }
                let group_size = catalogue.modules_in_group(catalogue.group_of(m)).len() as u32;
                catalogue.rank(s, m).unwrap_or(group_size).to_string()
            }));
            row
        })
        .collect();

    Table { headers, rows }
}

/// Excess requests per module, highest count first.
pub fn excess_requests(run: &AllocationRun) -> Vec<ExcessRequestRow> {
    ExcessRequestReport::calculate(run.catalogue(), run.excess())
        .sorted_by_count()
        .into_iter()
        .cloned()
        .collect()
}

/// Catalogue fields with the run's remaining places.
pub fn module_state(run: &AllocationRun) -> Vec<ModuleStateRow> {
    let catalogue = run.catalogue();
    catalogue
        .modules()
        .iter()
        .enumerate()
        .map(|(m, module)| ModuleStateRow {
            module_id: module.id.clone(),
            module_name: module.name.clone(),
            module_group: module.group.clone(),
            semester: module.semester.clone(),
            credits: module.credits,
            capacity: module.capacity,
            available_spaces: run.available()[m],
            required_modules: catalogue.requirement_ids(m).join(","),
            mutually_excluded_modules: catalogue.exclusion_ids(m).join(","),
        })
        .collect()
}

/// Per-student credit checks as `true`/`false` columns.
pub fn constraint_summary(run: &AllocationRun) -> Table {
    let catalogue = run.catalogue();

    let mut headers = vec!["student_name".to_string(), "student_id".to_string()];
    let semesters = catalogue.semesters();
    let groups = catalogue.groups();
    headers.extend(semesters.iter().map(|s| format!("min_credits_per_semester_satisfied_{s}")));
    headers.extend(semesters.iter().map(|s| format!("max_credits_per_semester_not_exceeded_{s}")));
    headers.extend(groups.iter().map(|g| format!("min_credits_per_group_satisfied_{g}")));
    headers.extend(groups.iter().map(|g| format!("max_credits_per_group_not_exceeded_{g}")));
    headers.push("required_credits_total_satisfied".to_string());

    let rows = catalogue
        .students()
        .iter()
        .zip(run.constraint_report())
        .map(|(student, checks)| {
            let mut row = vec![student.name.clone(), student.id.clone()];
            row.extend(
                checks
                    .semester_min
                    .iter()
                    .chain(&checks.semester_max)
                    .chain(&checks.group_min)
                    .chain(&checks.group_max)
                    .chain(std::iter::once(&checks.total_exact))
                    .map(bool::to_string),
            );
            row
        })
        .collect();

    Table { headers, rows }
}

/// Assigned students per module, in catalogue order.
pub fn rosters(run: &AllocationRun) -> Vec<Roster> {
    let catalogue = run.catalogue();
    let state = run.state();
    catalogue
        .modules()
        .iter()
        .enumerate()
        .map(|(m, module)| Roster {
            module_id: module.id.clone(),
            module_name: module.name.clone(),
            students: catalogue
                .students()
                .iter()
                .enumerate()
                .filter(|&(s, _)| state.holds(s, m))
                .map(|(_, student)| (student.name.clone(), student.id.clone()))
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllocationConfig, CreditBounds, CreditLimits};
    use crate::models::{Catalogue, Module, Student};
    use std::sync::Arc;

    fn finished_run() -> AllocationRun {
        let cat = Arc::new(
            Catalogue::new(
                vec![
                    Module::new("A")
                        .with_name("Alpha")
                        .with_credits(10)
                        .with_group("core")
                        .with_semester("1")
                        .with_capacity(2),
                    Module::new("B")
                        .with_name("Beta")
                        .with_credits(10)
                        .with_group("core")
                        .with_semester("2")
                        .with_capacity(2)
                        .with_requirement("A"),
                    Module::new("C")
                        .with_name("Gamma")
                        .with_credits(10)
                        .with_group("option")
                        .with_semester("1")
                        .with_capacity(0)
                        .with_exclusion("A"),
                ],
                vec![Student::new("S1")
                    .with_name("Ada")
                    .with_desired("core", 20)
                    .with_rank("B", 1)
                    .with_rank("A", 2)
                    .with_rank("C", 1)],
            )
            .unwrap(),
        );
        let config = AllocationConfig::new(20).with_group_bounds("core", CreditBounds::at_least(20));
        let limits = CreditLimits::resolve(&config, &cat);
        let mut run = AllocationRun::new(cat, limits, 0);
        run.run_rounds(2).unwrap();
        run
    }

    #[test]
    fn test_assignment_summary() {
        let table = assignment_summary(&finished_run());
        assert_eq!(
            table.headers,
            vec!["student_name", "student_id", "core", "option", "A", "B", "C"]
        );
        assert_eq!(table.rows, vec![vec!["Ada", "S1", "20", "0", "2", "1", "0"]]);
    }

    #[test]
    fn test_module_state() {
        let rows = module_state(&finished_run());
        assert_eq!(rows[0].available_spaces, 1);
        assert_eq!(rows[1].available_spaces, 1);
        assert_eq!(rows[1].required_modules, "A");
        // Exclusion declared on C shows up on A as well.
        assert_eq!(rows[0].mutually_excluded_modules, "C");
        assert_eq!(rows[2].mutually_excluded_modules, "A");
    }

    #[test]
    fn test_constraint_summary() {
        let table = constraint_summary(&finished_run());
        assert_eq!(table.headers.len(), 2 + 2 + 2 + 2 + 2 + 1);
        let col = table.column("required_credits_total_satisfied").unwrap();
        assert_eq!(table.rows[0][col], "true");
        let col = table.column("min_credits_per_group_satisfied_core").unwrap();
        assert_eq!(table.rows[0][col], "true");
    }

    #[test]
    fn test_rosters_and_excess() {
        let report = AllocationReport::from_run(&finished_run());
        let held: Vec<usize> = report.rosters.iter().map(|r| r.students.len()).collect();
        assert_eq!(held, vec![1, 1, 0]);
        assert_eq!(report.rosters[0].students[0], ("Ada".to_string(), "S1".to_string()));
        assert_eq!(report.excess_requests.len(), 3);
    }
}

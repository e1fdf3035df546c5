//! Prior assignments loaded from a previous allocation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::Catalogue;
use crate::error::Result;
use crate::validation::{ValidationError, ValidationErrorKind, ValidationErrors};

/// Modules students already hold before allocation starts.
///
/// Keyed by student ID; students not listed hold nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorAssignments {
    rows: BTreeMap<String, BTreeSet<String>>,
}

/// Prior assignments resolved to catalogue indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPrior {
    holdings: Vec<(usize, usize)>,
}

impl PriorAssignments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a student holds a module.
    pub fn with_holding(mut self, student_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        self.insert(student_id, module_id);
        self
    }

    /// Records that a student holds a module.
    pub fn insert(&mut self, student_id: impl Into<String>, module_id: impl Into<String>) {
        self.rows
            .entry(student_id.into())
            .or_default()
            .insert(module_id.into());
    }

    /// Ensures a student row exists even if it holds nothing.
    pub fn insert_student(&mut self, student_id: impl Into<String>) {
        self.rows.entry(student_id.into()).or_default();
    }

    /// Modules held by a student.
    pub fn holdings_of(&self, student_id: &str) -> Option<&BTreeSet<String>> {
        self.rows.get(student_id)
    }

    /// Number of student rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolves IDs against the catalogue.
    ///
    /// # Errors
    /// Validation errors for every unknown student or module ID.
    pub fn resolve(&self, catalogue: &Catalogue) -> Result<ResolvedPrior> {
        let mut errors = Vec::new();
        let mut holdings = Vec::new();

        for (student_id, modules) in &self.rows {
            let Some(student) = catalogue.student_index(student_id) else {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidStudentReference,
                    format!("Prior assignments list unknown student '{student_id}'"),
                ));
                continue;
            };
            for module_id in modules {
                match catalogue.module_index(module_id) {
                    Some(module) => holdings.push((student, module)),
                    None => errors.push(ValidationError::new(
                        ValidationErrorKind::InvalidModuleReference,
                        format!(
                            "Prior assignments give student '{student_id}' unknown module '{module_id}'"
                        ),
                    )),
                }
            }
        }

        ValidationErrors::new(errors).into_result()?;
        holdings.sort_unstable();
        Ok(ResolvedPrior { holdings })
    }
}

impl ResolvedPrior {
    /// `(student, module)` index pairs, sorted.
    pub fn holdings(&self) -> &[(usize, usize)] {
        &self.holdings
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Module, Student};
    use crate::AllocationError;

    fn catalogue() -> Catalogue {
        Catalogue::new(
            vec![Module::new("A").with_credits(10), Module::new("B").with_credits(10)],
            vec![Student::new("S1"), Student::new("S2")],
        )
        .unwrap()
    }

    #[test]
    fn test_resolve() {
        let prior = PriorAssignments::new()
            .with_holding("S2", "B")
            .with_holding("S1", "A")
            .with_holding("S2", "A");
        let resolved = prior.resolve(&catalogue()).unwrap();
        assert_eq!(resolved.holdings(), &[(0, 0), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_empty_student_row() {
        let mut prior = PriorAssignments::new();
        prior.insert_student("S1");
        assert_eq!(prior.len(), 1);
        assert!(prior.resolve(&catalogue()).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let prior = PriorAssignments::new()
            .with_holding("S9", "A")
            .with_holding("S1", "Z");
        match prior.resolve(&catalogue()).unwrap_err() {
            AllocationError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.contains_kind(&ValidationErrorKind::InvalidStudentReference));
                assert!(errors.contains_kind(&ValidationErrorKind::InvalidModuleReference));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

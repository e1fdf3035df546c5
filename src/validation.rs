//! Input validation for allocation problems.
//!
//! Checks structural integrity of the module and student catalogues
//! before any run starts. Detects:
//! - Duplicate or empty IDs
//! - Modules with zero credits or more free places than capacity
//! - Requirement and exclusion references to unknown modules
//! - Self-referencing requirements and exclusions
//! - Student rankings and exclusions naming unknown modules
//! - Ranks below 1
//!
//! Every problem is collected; validation never stops at the first one.

use std::collections::HashSet;
use std::fmt;

use crate::models::{Module, Student};

/// Validation result.
pub type ValidationResult = Result<(), ValidationErrors>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// An entity has a blank ID.
    EmptyId,
    /// A module carries zero credits.
    InvalidCredits,
    /// A module has more available places than total capacity.
    CapacityMismatch,
    /// A module requires a module that doesn't exist.
    InvalidRequirement,
    /// A module excludes a module that doesn't exist.
    InvalidExclusion,
    /// A module requires or excludes itself.
    SelfReference,
    /// A student ranks or excludes a module that doesn't exist.
    InvalidModuleReference,
    /// A student gives a module rank 0. Ranks start at 1.
    InvalidRank,
    /// A prior-assignment row names an unknown student.
    InvalidStudentReference,
    /// A tabular input lacks a required column.
    MissingColumn,
    /// A cell could not be parsed into the expected type.
    InvalidValue,
    /// A cell contains undecodable characters.
    EncodingArtifact,
    /// A student appears in one input table but not in its companion.
    UnmatchedStudent,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A non-empty collection of validation errors.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    /// Wraps a list of errors.
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }

    /// Number of errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no errors were collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the errors.
    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// Whether any error has the given kind.
    pub fn contains_kind(&self, kind: &ValidationErrorKind) -> bool {
        self.0.iter().any(|e| &e.kind == kind)
    }

    /// Converts into `Ok(())` when empty.
    pub fn into_result(self) -> ValidationResult {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} problem(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Validates the module and student catalogues.
///
/// Checks:
/// 1. No empty or duplicate module IDs
/// 2. No empty or duplicate student IDs
/// 3. Every module carries at least one credit
/// 4. `available_spaces <= capacity` for every module
/// 5. Requirement and exclusion references resolve and are not self-references
/// 6. Student rankings and exclusions name existing modules
/// 7. Every rank is at least 1
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(modules: &[Module], students: &[Student]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut module_ids = HashSet::new();
    for m in modules {
        if m.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                format!("Module '{}' has no module ID", m.name),
            ));
        }
        if !module_ids.insert(m.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate module ID: {}", m.id),
            ));
        }
        if m.credits == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidCredits,
                format!("Module '{}' carries zero credits", m.id),
            ));
        }
        if m.available_spaces > m.capacity {
            errors.push(ValidationError::new(
                ValidationErrorKind::CapacityMismatch,
                format!(
                    "Module '{}' has {} available spaces but a capacity of {}",
                    m.id, m.available_spaces, m.capacity
                ),
            ));
        }
    }

    for m in modules {
        for req in &m.requirements {
            if req == &m.id {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SelfReference,
                    format!("Module '{}' lists itself as a requirement", m.id),
                ));
            } else if !module_ids.contains(req.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRequirement,
                    format!("Module '{}' requires unknown module '{}'", m.id, req),
                ));
            }
        }
        for ex in &m.exclusions {
            if ex == &m.id {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SelfReference,
                    format!("Module '{}' lists itself as mutually exclusive", m.id),
                ));
            } else if !module_ids.contains(ex.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidExclusion,
                    format!("Module '{}' excludes unknown module '{}'", m.id, ex),
                ));
            }
        }
    }

    let mut student_ids = HashSet::new();
    for s in students {
        if s.id.trim().is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyId,
                format!("Student {} has no listed student ID", s.name),
            ));
        }
        if !student_ids.insert(s.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate student ID: {}", s.id),
            ));
        }

        // Sorted so the error list is stable between calls.
        let mut ranked: Vec<&String> = s.rankings.keys().collect();
        ranked.sort();
        for module_id in ranked {
            if !module_ids.contains(module_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidModuleReference,
                    format!("Student '{}' ranks unknown module '{}'", s.id, module_id),
                ));
            }
            if s.rankings[module_id] == 0 {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidRank,
                    format!("Student '{}' gives module '{}' rank 0", s.id, module_id),
                ));
            }
        }
        let mut excluded: Vec<&String> = s.excluded.iter().collect();
        excluded.sort();
        for module_id in excluded {
            if !module_ids.contains(module_id.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidModuleReference,
                    format!("Student '{}' excludes unknown module '{}'", s.id, module_id),
                ));
            }
        }
    }

    ValidationErrors::new(errors).into_result()
}

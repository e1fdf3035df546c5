//! Module model.
//!
//! A module is a capacity-bounded offering carrying a credit weight, a
//! semester tag and a group tag. Modules may directly require other
//! modules and may be mutually exclusive with others.

use serde::{Deserialize, Serialize};

/// A module that students can be allocated to.
///
/// The record is the caller-supplied template. During a run the engine
/// tracks remaining places in its own copy, so a `Module` is never mutated
/// by allocation.
///
/// `exclusions` is the raw list as supplied; the symmetric relation is
/// owned by [`Catalogue`](super::Catalogue), which merges both directions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Unique module identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Credit weight (positive).
    pub credits: u32,
    /// Semester tag.
    pub semester: String,
    /// Group tag.
    pub group: String,
    /// Total number of places.
    pub capacity: u32,
    /// Places still free at input time (`<= capacity`).
    pub available_spaces: u32,
    /// Directly required module IDs (one level deep).
    pub requirements: Vec<String>,
    /// Mutually exclusive module IDs.
    pub exclusions: Vec<String>,
}

impl Module {
    /// Creates a module with the given ID and no credits or places.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            credits: 0,
            semester: String::new(),
            group: String::new(),
            capacity: 0,
            available_spaces: 0,
            requirements: Vec::new(),
            exclusions: Vec::new(),
        }
    }

    /// Sets the module name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the credit weight.
    pub fn with_credits(mut self, credits: u32) -> Self {
        self.credits = credits;
        self
    }

    /// Sets the semester tag.
    pub fn with_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = semester.into();
        self
    }

    /// Sets the group tag.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    /// Sets the capacity. Available places are reset to the full capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self.available_spaces = capacity;
        self
    }

    /// Overrides the number of free places.
    pub fn with_available_spaces(mut self, available: u32) -> Self {
        self.available_spaces = available;
        self
    }

    /// Adds a direct requirement. Duplicates are ignored.
    pub fn with_requirement(mut self, module_id: impl Into<String>) -> Self {
        let id = module_id.into();
        if !self.requirements.contains(&id) {
            self.requirements.push(id);
        }
        self
    }

    /// Adds a mutual exclusion. Duplicates are ignored.
    pub fn with_exclusion(mut self, module_id: impl Into<String>) -> Self {
        let id = module_id.into();
        if !self.exclusions.contains(&id) {
            self.exclusions.push(id);
        }
        self
    }
}

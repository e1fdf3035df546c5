//! Run configuration.
//!
//! An [`AllocationConfig`] carries the credit quotas and search settings.
//! It is usually loaded from a TOML file:
//!
//! ```toml
//! required_credits = 120
//!
//! [groups.core]
//! min = 60
//! max = 90
//!
//! [semesters.1]
//! max = 70
//!
//! [search]
//! repetitions = 100
//! rounds_per_repetition = 20
//! base_seed = 42
//! comparator = "mean_then_over_request"
//! ```
//!
//! Groups and semesters absent from the maps are unbounded (min 0, no
//! maximum). Before a run the configuration is resolved against a
//! [`Catalogue`] into index-based [`CreditLimits`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AllocationError, Result};
use crate::models::Catalogue;
use crate::search::ComparatorStrategy;

/// Minimum and maximum credits for one group or semester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreditBounds {
    /// Minimum credits (hard constraint when validation is enabled).
    #[serde(default)]
    pub min: u32,
    /// Maximum credits. `None` = unbounded.
    #[serde(default)]
    pub max: Option<u32>,
}

impl CreditBounds {
    /// Bounds with both ends set.
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    /// Upper bound only.
    pub fn at_most(max: u32) -> Self {
        Self { min: 0, max: Some(max) }
    }

    /// Lower bound only.
    pub fn at_least(min: u32) -> Self {
        Self { min, max: None }
    }

    fn max_or_unbounded(&self) -> u32 {
        self.max.unwrap_or(u32::MAX)
    }
}

/// Settings for the randomized-restart search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Number of independent runs.
    pub repetitions: usize,
    /// Round budget per run.
    pub rounds_per_repetition: usize,
    /// Base seed from which each run's seed is derived.
    pub base_seed: u64,
    /// Whether a bundle may contain a student's least-preferred remaining module.
    pub allow_least_preferred: bool,
    /// Reject runs that miss group/semester minimums or the exact total.
    pub validate_hard_constraints: bool,
    /// How competing runs are ranked.
    pub comparator: ComparatorStrategy,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            repetitions: 10,
            rounds_per_repetition: 20,
            base_seed: 0,
            allow_least_preferred: true,
            validate_hard_constraints: true,
            comparator: ComparatorStrategy::default(),
        }
    }
}

impl SearchSettings {
    pub fn with_repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds_per_repetition = rounds;
        self
    }

    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_allow_least_preferred(mut self, allow: bool) -> Self {
        self.allow_least_preferred = allow;
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_hard_constraints = validate;
        self
    }

    pub fn with_comparator(mut self, comparator: ComparatorStrategy) -> Self {
        self.comparator = comparator;
        self
    }
}

/// Complete allocation configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Credits every student must end up with (exactly).
    pub required_credits: u32,
    /// Per-group credit bounds, keyed by group label.
    #[serde(default)]
    pub groups: BTreeMap<String, CreditBounds>,
    /// Per-semester credit bounds, keyed by semester label.
    #[serde(default)]
    pub semesters: BTreeMap<String, CreditBounds>,
    /// Search settings.
    #[serde(default)]
    pub search: SearchSettings,
}

impl AllocationConfig {
    /// Creates a configuration with no group or semester bounds.
    pub fn new(required_credits: u32) -> Self {
        Self {
            required_credits,
            groups: BTreeMap::new(),
            semesters: BTreeMap::new(),
            search: SearchSettings::default(),
        }
    }

    /// Sets the bounds for a group.
    pub fn with_group_bounds(mut self, group: impl Into<String>, bounds: CreditBounds) -> Self {
        self.groups.insert(group.into(), bounds);
        self
    }

    /// Sets the bounds for a semester.
    pub fn with_semester_bounds(
        mut self,
        semester: impl Into<String>,
        bounds: CreditBounds,
    ) -> Self {
        self.semesters.insert(semester.into(), bounds);
        self
    }

    /// Replaces the search settings.
    pub fn with_search(mut self, search: SearchSettings) -> Self {
        self.search = search;
        self
    }

    /// Loads a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.required_credits == 0 {
            return Err(AllocationError::config(
                "required_credits",
                "must be at least 1",
            ));
        }
        for (label, bounds) in &self.groups {
            check_bounds(&format!("groups.{label}"), bounds)?;
        }
        for (label, bounds) in &self.semesters {
            check_bounds(&format!("semesters.{label}"), bounds)?;
        }
        if self.search.repetitions == 0 {
            return Err(AllocationError::config(
                "search.repetitions",
                "must be at least 1",
            ));
        }
        if self.search.rounds_per_repetition == 0 {
            return Err(AllocationError::config(
                "search.rounds_per_repetition",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

fn check_bounds(field: &str, bounds: &CreditBounds) -> Result<()> {
    match bounds.max {
        Some(max) if bounds.min > max => Err(AllocationError::config(
            field,
            format!("min ({}) exceeds max ({max})", bounds.min),
        )),
        _ => Ok(()),
    }
}

/// Credit quotas resolved to catalogue group and semester indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditLimits {
    /// Exact credit total every student should reach.
    pub required_total: u32,
    pub group_min: Vec<u32>,
    pub group_max: Vec<u32>,
    pub semester_min: Vec<u32>,
    pub semester_max: Vec<u32>,
}

impl CreditLimits {
    /// Resolves configured bounds against the catalogue's labels.
    ///
    /// Labels the catalogue doesn't know are logged and ignored.
    pub fn resolve(config: &AllocationConfig, catalogue: &Catalogue) -> Self {
        for label in config.groups.keys() {
            if !catalogue.groups().contains(label) {
                tracing::warn!(group = %label, "configured group has no modules");
            }
        }
        for label in config.semesters.keys() {
            if !catalogue.semesters().contains(label) {
                tracing::warn!(semester = %label, "configured semester has no modules");
            }
        }

        let lookup = |map: &BTreeMap<String, CreditBounds>, labels: &[String]| {
            labels
                .iter()
                .map(|l| map.get(l).copied().unwrap_or_default())
                .collect::<Vec<_>>()
        };
        let groups = lookup(&config.groups, catalogue.groups());
        let semesters = lookup(&config.semesters, catalogue.semesters());

        Self {
            required_total: config.required_credits,
            group_min: groups.iter().map(|b| b.min).collect(),
            group_max: groups.iter().map(CreditBounds::max_or_unbounded).collect(),
            semester_min: semesters.iter().map(|b| b.min).collect(),
            semester_max: semesters.iter().map(CreditBounds::max_or_unbounded).collect(),
        }
    }

    /// Limits with only a required total.
    pub fn unbounded(required_total: u32, catalogue: &Catalogue) -> Self {
        Self::resolve(&AllocationConfig::new(required_total), catalogue)
    }
}

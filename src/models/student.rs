//! Student model.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A participant with module preferences.
///
/// Ranks follow the "lower = more preferred" convention. A module missing
/// from `rankings` is treated as having infinite rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Unique student identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Desired credit count per group. A priority signal, not a cap.
    pub desired_per_group: HashMap<String, u32>,
    /// Preference rank per module ID.
    pub rankings: HashMap<String, u32>,
    /// Module IDs the student refuses.
    pub excluded: HashSet<String>,
}

impl Student {
    /// Creates a student with no preferences.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            desired_per_group: HashMap::new(),
            rankings: HashMap::new(),
            excluded: HashSet::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the desired credit count for a group.
    pub fn with_desired(mut self, group: impl Into<String>, credits: u32) -> Self {
        self.desired_per_group.insert(group.into(), credits);
        self
    }

    /// Ranks a module.
    pub fn with_rank(mut self, module_id: impl Into<String>, rank: u32) -> Self {
        self.rankings.insert(module_id.into(), rank);
        self
    }

    /// Excludes a module.
    pub fn with_excluded(mut self, module_id: impl Into<String>) -> Self {
        self.excluded.insert(module_id.into());
        self
    }

    /// Rank of a module, `None` when unranked.
    pub fn rank_of(&self, module_id: &str) -> Option<u32> {
        self.rankings.get(module_id).copied()
    }

    /// Desired credits for a group (0 when not stated).
    pub fn desired_in(&self, group: &str) -> u32 {
        self.desired_per_group.get(group).copied().unwrap_or(0)
    }

    /// Whether the student excludes a module.
    pub fn excludes(&self, module_id: &str) -> bool {
        self.excluded.contains(module_id)
    }
}

//! Preference-driven module allocation.
//!
//! Assigns a catalogue of capacity-limited modules to students from their
//! preference ranks, subject to credit quotas per group and semester,
//! direct requirements, mutual exclusions and personal exclusions. A
//! randomized greedy allocator runs in rounds; a best-of-N search over
//! independently seeded runs picks the most satisfying result.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Module`, `Student`, `Catalogue`,
//!   `AssignmentState`, `PriorAssignments`
//! - **`validation`**: Input integrity checks (duplicate IDs, dangling references)
//! - **`config`**: Credit quotas and search settings (TOML)
//! - **`allocation`**: Constraint evaluation, allocation rounds, single runs
//! - **`scoring`**: Satisfaction scores, excess requests, run KPIs
//! - **`search`**: Randomized-restart search and run ranking
//! - **`report`**: Output tables
//! - **`io`**: CSV readers and writers, zip packaging
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use u_allocate::config::{AllocationConfig, CreditBounds, CreditLimits};
//! use u_allocate::models::{Catalogue, Module, Student};
//! use u_allocate::search::AllocationSearch;
//!
//! let modules = vec![
//!     Module::new("M1").with_credits(10).with_group("core").with_capacity(1),
//!     Module::new("M2").with_credits(10).with_group("core").with_capacity(1),
//! ];
//! let students = vec![
//!     Student::new("S1").with_rank("M1", 1).with_rank("M2", 2),
//!     Student::new("S2").with_rank("M1", 2).with_rank("M2", 1),
//! ];
//! let catalogue = Arc::new(Catalogue::new(modules, students).unwrap());
//!
//! let config = AllocationConfig::new(10).with_group_bounds("core", CreditBounds::at_least(10));
//! let limits = CreditLimits::resolve(&config, &catalogue);
//! let outcome = AllocationSearch::new(catalogue, limits, config.search).run().unwrap();
//!
//! let best = outcome.into_result().unwrap();
//! assert_eq!(best.kpi.complete_students, 2);
//! ```
//!
//! # References
//!
//! - Budish & Cantillon (2012), "The Multi-Unit Assignment Problem"
//! - Diebold et al. (2014), "Course Allocation via Stable Matching"

pub mod allocation;
pub mod config;
pub mod error;
pub mod io;
#[cfg(feature = "cli")]
pub mod logging;
pub mod models;
pub mod report;
pub mod scoring;
pub mod search;
pub mod validation;

pub use error::{AllocationError, Result};

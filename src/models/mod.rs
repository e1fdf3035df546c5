//! Allocation domain models.
//!
//! Provides the input records (modules, students, prior assignments), the
//! resolved catalogue the engine works on, and the per-run assignment
//! state.
//!
//! # Domain Mappings
//!
//! | u-allocate | University | Conference | Training |
//! |------------|-----------|------------|----------|
//! | Module | Elective course | Workshop | Course session |
//! | Student | Student | Attendee | Employee |
//! | Group | Course pathway | Track | Skill area |
//! | Semester | Term | Day | Quarter |

mod catalogue;
mod module;
mod prior;
mod state;
mod student;

pub use catalogue::{Catalogue, ExclusionGraph};
pub use module::Module;
pub use prior::{PriorAssignments, ResolvedPrior};
pub use state::AssignmentState;
pub use student::Student;

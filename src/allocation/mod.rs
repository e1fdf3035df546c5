//! Allocation engine.
//!
//! - [`constraint`]: evaluates whether a bundle may be granted
//! - [`round`]: one pass over all students in a seeded random order
//! - [`run`]: a seeded sequence of rounds with its own mutable state
//!
//! # Reference
//! Budish & Cantillon (2012), "The Multi-Unit Assignment Problem: Theory
//! and Evidence from Course Allocation at Harvard"

pub mod constraint;
mod requests;
pub mod round;
pub mod run;

pub use constraint::{bundle_for, evaluate_bundle, BundleRequest, ConstraintCheck};
pub use requests::ExcessRequests;
pub use round::{allocate_round, RoundContext, RoundDiagnostic, RoundState};
pub use run::{AllocationRun, StudentConstraints};

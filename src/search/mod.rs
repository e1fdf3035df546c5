//! Best-of-N search over seeded allocation runs.
//!
//! Each repetition is an independent [`AllocationRun`](crate::allocation::AllocationRun)
//! with its own derived seed. Qualifying runs are ranked by a
//! [`ComparatorStrategy`] and the best one is returned.
//!
//! # Reference
//! Lourenço, Martin & Stützle (2003), "Iterated Local Search", in
//! Handbook of Metaheuristics, pp. 320-353

mod comparator;
mod controller;

pub use comparator::{derive_seed, CandidateScore, ComparatorStrategy};
pub use controller::{AllocationSearch, SearchOutcome, SearchProgress, SearchResult};

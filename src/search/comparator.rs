//! Ranking of competing runs.
//!
//! Candidates are totally ordered by mean satisfaction, a strategy-specific
//! tiebreak, and finally the repetition index. Because the order is total,
//! the winner is the same whichever order candidates arrive in.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::scoring::AllocationKpi;

/// Tiebreak applied after mean satisfaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparatorStrategy {
    /// Higher mean satisfaction, then lower mean over-request proportion.
    #[default]
    MeanThenOverRequest,
    /// Higher mean satisfaction, then higher minimum satisfaction.
    MeanThenMinimum,
}

/// The figures a candidate is ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub repetition: usize,
    pub mean_satisfaction: Option<f64>,
    pub minimum_satisfaction: Option<f64>,
    pub mean_over_request: f64,
}

impl CandidateScore {
    /// Extracts the ranking figures of a run.
    pub fn new(repetition: usize, kpi: &AllocationKpi) -> Self {
        Self {
            repetition,
            mean_satisfaction: kpi.mean_satisfaction,
            minimum_satisfaction: kpi.minimum_satisfaction,
            mean_over_request: kpi.mean_over_request,
        }
    }
}

impl ComparatorStrategy {
    /// Orders two candidates; `Less` means `a` ranks ahead of `b`.
    pub fn rank(&self, a: &CandidateScore, b: &CandidateScore) -> Ordering {
        higher_first(a.mean_satisfaction, b.mean_satisfaction)
            .then_with(|| match self {
                Self::MeanThenOverRequest => a.mean_over_request.total_cmp(&b.mean_over_request),
                Self::MeanThenMinimum => {
                    higher_first(a.minimum_satisfaction, b.minimum_satisfaction)
                }
            })
            .then_with(|| a.repetition.cmp(&b.repetition))
    }

    /// Whether `a` ranks ahead of `b`.
    pub fn is_better(&self, a: &CandidateScore, b: &CandidateScore) -> bool {
        self.rank(a, b) == Ordering::Less
    }
}

/// Descending order with `None` last.
fn higher_first(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Seed of repetition `repetition`, derived from the base seed with the
/// SplitMix64 finaliser.
pub fn derive_seed(base_seed: u64, repetition: usize) -> u64 {
    let mut z = base_seed.wrapping_add((repetition as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(repetition: usize, mean: Option<f64>, minimum: Option<f64>, over: f64) -> CandidateScore {
        CandidateScore {
            repetition,
            mean_satisfaction: mean,
            minimum_satisfaction: minimum,
            mean_over_request: over,
        }
    }

    #[test]
    fn test_higher_mean_wins() {
        let a = score(5, Some(0.8), Some(0.1), 0.9);
        let b = score(0, Some(0.7), Some(0.7), 0.0);
        for strategy in [ComparatorStrategy::MeanThenOverRequest, ComparatorStrategy::MeanThenMinimum] {
            assert!(strategy.is_better(&a, &b));
            assert!(!strategy.is_better(&b, &a));
        }
    }

    #[test]
    fn test_tiebreaks() {
        let a = score(1, Some(0.5), Some(0.2), 0.1);
        let b = score(0, Some(0.5), Some(0.4), 0.3);

        assert!(ComparatorStrategy::MeanThenOverRequest.is_better(&a, &b));
        assert!(ComparatorStrategy::MeanThenMinimum.is_better(&b, &a));
    }

    #[test]
    fn test_lower_repetition_breaks_full_tie() {
        let a = score(3, Some(0.5), Some(0.5), 0.2);
        let b = score(7, Some(0.5), Some(0.5), 0.2);
        assert_eq!(ComparatorStrategy::default().rank(&a, &b), Ordering::Less);
        assert_eq!(ComparatorStrategy::default().rank(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_no_scores_rank_last() {
        let scored = score(9, Some(0.0), None, 1.0);
        let unscored = score(0, None, None, 0.0);
        assert!(ComparatorStrategy::default().is_better(&scored, &unscored));
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            comparator: ComparatorStrategy,
        }
        let w: Wrapper = toml::from_str("comparator = \"mean_then_over_request\"").unwrap();
        assert_eq!(w.comparator, ComparatorStrategy::MeanThenOverRequest);
        assert_eq!(
            serde_json::to_string(&ComparatorStrategy::MeanThenMinimum).unwrap(),
            "\"mean_then_minimum\""
        );
    }

    #[test]
    fn test_derive_seed() {
        assert_eq!(derive_seed(42, 3), derive_seed(42, 3));
        assert_ne!(derive_seed(42, 0), derive_seed(42, 1));
        assert_ne!(derive_seed(42, 0), derive_seed(43, 0));
    }
}

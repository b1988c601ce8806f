//! Load-distribution statistics and pass/fail classification.
//!
//! Everything here is numeric or enum-valued; wording and bars live in the
//! report module.

use crate::analyzer::LogRecord;
use crate::NODE_COUNT;

/// Share each node would have under a perfect split.
pub const IDEAL_SHARE: f64 = 100.0 / NODE_COUNT as f64;

/// A node below this share of processed requests makes the split unbalanced.
pub const MIN_BALANCED_SHARE: f64 = 0.20;
/// Every node at or below this share makes the split excellently balanced.
pub const MAX_EXCELLENT_SHARE: f64 = 0.40;

/// Success rate at or above which reliability is excellent.
pub const EXCELLENT_SUCCESS_RATE: f64 = 95.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceTier {
    Excellent,
    Good,
    Acceptable,
    Poor,
}

impl BalanceTier {
    pub fn from_std_dev(std_dev: f64) -> Self {
        if std_dev < 5.0 {
            BalanceTier::Excellent
        } else if std_dev < 10.0 {
            BalanceTier::Good
        } else if std_dev < 15.0 {
            BalanceTier::Acceptable
        } else {
            BalanceTier::Poor
        }
    }
}

/// Shares of a non-empty distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeShares {
    /// Percent of processed requests per node; sums to 100.
    pub percentages: [f64; NODE_COUNT],
    /// Population standard deviation of the percentages around
    /// [`IDEAL_SHARE`], not around their own mean.
    pub std_dev: f64,
    pub tier: BalanceTier,
    /// Every node handled at least [`MIN_BALANCED_SHARE`].
    pub balanced: bool,
    /// Balanced and no node above [`MAX_EXCELLENT_SHARE`].
    pub excellently_balanced: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistributionMetrics {
    pub total_processed: u64,
    /// `None` when nothing was processed.
    pub shares: Option<NodeShares>,
}

impl DistributionMetrics {
    pub fn is_neutral(&self) -> bool {
        self.shares.is_none()
    }

    /// Per-node percentages, all zero for a neutral distribution.
    pub fn percentages(&self) -> [f64; NODE_COUNT] {
        self.shares
            .map(|s| s.percentages)
            .unwrap_or([0.0; NODE_COUNT])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Coverage {
    /// Every node processed something.
    Pass,
    /// Some but not all nodes were idle (or none worked at all).
    Warn { active: usize, idle_nodes: Vec<usize> },
    /// Exactly one node did all the work.
    Fail { active_node: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reliability {
    Perfect,
    Excellent(f64),
    /// Below the excellent threshold; reported as a bare percentage.
    Rate(f64),
}

impl Reliability {
    pub fn from_rate(rate: f64) -> Self {
        if rate == 100.0 {
            Reliability::Perfect
        } else if rate >= EXCELLENT_SUCCESS_RATE {
            Reliability::Excellent(rate)
        } else {
            Reliability::Rate(rate)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallResult {
    DemoSuccessful,
    PassedWithMinorIssues,
    IssuesDetected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestVerdict {
    pub coverage: Coverage,
    pub success_rate: f64,
    pub reliability: Reliability,
    pub overall: OverallResult,
}

/// Percentages, spread and balance flags for the processed counts.
pub fn distribution(processed: &[u64; NODE_COUNT]) -> DistributionMetrics {
    let total: u64 = processed.iter().sum();
    if total == 0 {
        return DistributionMetrics {
            total_processed: 0,
            shares: None,
        };
    }

    let total_f = total as f64;
    let mut percentages = [0.0; NODE_COUNT];
    for (pct, &count) in percentages.iter_mut().zip(processed) {
        *pct = count as f64 * 100.0 / total_f;
    }

    let variance = percentages
        .iter()
        .map(|pct| (pct - IDEAL_SHARE).powi(2))
        .sum::<f64>()
        / NODE_COUNT as f64;
    let std_dev = variance.sqrt();

    let balanced = processed
        .iter()
        .all(|&count| count as f64 >= total_f * MIN_BALANCED_SHARE);
    let excellently_balanced = balanced
        && processed
            .iter()
            .all(|&count| count as f64 <= total_f * MAX_EXCELLENT_SHARE);

    DistributionMetrics {
        total_processed: total,
        shares: Some(NodeShares {
            percentages,
            std_dev,
            tier: BalanceTier::from_std_dev(std_dev),
            balanced,
            excellently_balanced,
        }),
    }
}

/// Classifies node participation. Node ids are 1-based.
pub fn coverage(processed: &[u64; NODE_COUNT]) -> Coverage {
    let active: Vec<usize> = (1..=NODE_COUNT).filter(|n| processed[n - 1] > 0).collect();
    match active.len() {
        NODE_COUNT => Coverage::Pass,
        1 => Coverage::Fail {
            active_node: active[0],
        },
        n => Coverage::Warn {
            active: n,
            idle_nodes: (1..=NODE_COUNT).filter(|n| processed[n - 1] == 0).collect(),
        },
    }
}

/// `successes / attempted` as a percentage; 0 when nothing was attempted.
pub fn success_rate(successes: u64, attempted: u64) -> f64 {
    if attempted == 0 {
        return 0.0;
    }
    successes as f64 / attempted as f64 * 100.0
}

pub fn overall(coverage: &Coverage, success_rate: f64) -> OverallResult {
    match coverage {
        Coverage::Pass if success_rate >= EXCELLENT_SUCCESS_RATE => OverallResult::DemoSuccessful,
        Coverage::Pass => OverallResult::PassedWithMinorIssues,
        _ => OverallResult::IssuesDetected,
    }
}

/// Runs every check against `record`.
pub fn evaluate(record: &LogRecord) -> (DistributionMetrics, TestVerdict) {
    let metrics = distribution(&record.processed);
    let coverage = coverage(&record.processed);
    let rate = success_rate(record.successes, record.attempted);
    let verdict = TestVerdict {
        overall: overall(&coverage, rate),
        reliability: Reliability::from_rate(rate),
        success_rate: rate,
        coverage,
    };
    (metrics, verdict)
}

//! Session summary
//!
//! Reduces all trials of a session to accuracy and independence percentages.
//! Two accuracy definitions are in use and callers pick one explicitly:
//!
//! - strict: only independent trials count as accurate
//! - credited: prompted trials also count as accurate

use crate::types::{rounded_percent, Counts, SessionSummary, Trial};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which trials count towards overall accuracy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyPolicy {
    /// Accuracy equals the independence rate
    Strict,
    /// Independent and prompted trials are both accurate
    Credited,
}

impl AccuracyPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccuracyPolicy::Strict => "strict",
            AccuracyPolicy::Credited => "credited",
        }
    }

    /// Accuracy percentage of already aggregated counts
    pub fn accuracy(&self, counts: &Counts) -> u32 {
        match self {
            AccuracyPolicy::Strict => rounded_percent(counts.independent, counts.total()),
            AccuracyPolicy::Credited => {
                rounded_percent(counts.independent + counts.prompted, counts.total())
            }
        }
    }
}

impl fmt::Display for AccuracyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn session_counts(trials: &[Trial]) -> Counts {
    trials
        .iter()
        .fold(Counts::default(), |counts, trial| counts.increment(trial.outcome))
}

/// Summarize a session's trials under the given accuracy policy
pub fn summarize(trials: &[Trial], policy: AccuracyPolicy) -> SessionSummary {
    summarize_counts(&session_counts(trials), policy)
}

/// Summarize already aggregated counts
pub fn summarize_counts(counts: &Counts, policy: AccuracyPolicy) -> SessionSummary {
    SessionSummary {
        overall_accuracy: policy.accuracy(counts),
        independence_rate: counts.independence_ratio(),
        total_attempts: counts.total(),
    }
}

/// Accuracy with no partial credit for prompted trials
pub fn strict_accuracy(trials: &[Trial]) -> u32 {
    AccuracyPolicy::Strict.accuracy(&session_counts(trials))
}

/// Accuracy where any non-error trial counts
pub fn credited_accuracy(trials: &[Trial]) -> u32 {
    AccuracyPolicy::Credited.accuracy(&session_counts(trials))
}

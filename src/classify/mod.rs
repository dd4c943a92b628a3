//! Status classification
//!
//! Maps aggregated counts to a categorical status. Two rule families exist:
//! ratio thresholds on the independence percentage, and the predominant
//! outcome. Which one a screen uses depends on the therapy discipline.

mod predominance;
mod ratio;

pub use predominance::classify_predominance;
pub use ratio::{
    classify_ratio, RatioClassification, RatioClassificationPolicy, Threshold, DEFAULT_MIN_SAMPLE,
};

use crate::aggregate::{StimulusCounts, StimulusTally};
use crate::types::{Counts, RatioStatus, Status, StimulusSummary};
use serde::{Deserialize, Serialize};

/// Rule family used to classify a stimulus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierFamily {
    Ratio,
    Predominance,
}

/// Classify counts under a rule family.
///
/// Empty counts have no predominant outcome; they classify as `insuficiente`.
pub fn classify_status(
    counts: &Counts,
    family: ClassifierFamily,
    policy: &RatioClassificationPolicy,
) -> Status {
    match family {
        ClassifierFamily::Ratio => Status::Ratio(policy.classify(counts).status),
        ClassifierFamily::Predominance => classify_predominance(counts)
            .map(Status::Predominance)
            .unwrap_or(Status::Ratio(RatioStatus::Insufficient)),
    }
}

/// Build the summary for one aggregated stimulus
pub fn summarize_stimulus(
    tally: &StimulusTally,
    family: ClassifierFamily,
    policy: &RatioClassificationPolicy,
) -> StimulusSummary {
    StimulusSummary {
        stimulus_id: tally.stimulus_id.clone(),
        stimulus_label: tally.stimulus_label.clone(),
        counts: tally.counts,
        total: tally.counts.total(),
        independence_ratio: tally.counts.independence_ratio(),
        status: classify_status(&tally.counts, family, policy),
    }
}

/// Build summaries for every stimulus in an aggregate, in aggregate order
pub fn summarize_stimuli(
    counts: &StimulusCounts,
    family: ClassifierFamily,
    policy: &RatioClassificationPolicy,
) -> Vec<StimulusSummary> {
    counts
        .iter()
        .map(|tally| summarize_stimulus(tally, family, policy))
        .collect()
}

//! Ratio-family classification
//!
//! Classifies a stimulus by its independence ratio. Two threshold policies are
//! in use by different screens and both are kept as named policies:
//!
//! | Policy               | positivo | mediano | atencao | critico |
//! |----------------------|----------|---------|---------|---------|
//! | `strict_four_way`    | > 80     | > 60    | else    | -       |
//! | `inclusive_five_way` | >= 80    | >= 60   | >= 40   | else    |
//!
//! Both treat fewer than 5 trials as `insuficiente`.

use crate::types::{Counts, RatioStatus};
use serde::{Deserialize, Serialize};

/// Minimum number of trials for a ratio to be meaningful
pub const DEFAULT_MIN_SAMPLE: u32 = 5;

/// A percentage cut-off, strict (`>`) or inclusive (`>=`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Threshold {
    pub percent: u32,
    #[serde(default)]
    pub inclusive: bool,
}

impl Threshold {
    /// `ratio > percent`
    pub const fn above(percent: u32) -> Self {
        Self {
            percent,
            inclusive: false,
        }
    }

    /// `ratio >= percent`
    pub const fn at_least(percent: u32) -> Self {
        Self {
            percent,
            inclusive: true,
        }
    }

    pub fn admits(&self, ratio: u32) -> bool {
        if self.inclusive {
            ratio >= self.percent
        } else {
            ratio > self.percent
        }
    }
}

/// Thresholds for the ratio family.
///
/// With `attention: None` the policy is four-way and everything below
/// `moderate` is `atencao`; with a threshold, ratios below it are `critico`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatioClassificationPolicy {
    /// Totals below this are `insuficiente`
    pub min_sample: u32,
    pub positive: Threshold,
    pub moderate: Threshold,
    #[serde(default)]
    pub attention: Option<Threshold>,
}

impl Default for RatioClassificationPolicy {
    fn default() -> Self {
        Self::strict_four_way()
    }
}

impl RatioClassificationPolicy {
    /// `>80 / >60 / else`, no `critico` bucket
    pub const fn strict_four_way() -> Self {
        Self {
            min_sample: DEFAULT_MIN_SAMPLE,
            positive: Threshold::above(80),
            moderate: Threshold::above(60),
            attention: None,
        }
    }

    /// `>=80 / >=60 / >=40 / else critico`
    pub const fn inclusive_five_way() -> Self {
        Self {
            min_sample: DEFAULT_MIN_SAMPLE,
            positive: Threshold::at_least(80),
            moderate: Threshold::at_least(60),
            attention: Some(Threshold::at_least(40)),
        }
    }

    /// Whether a stimulus with this many trials is classified on its ratio
    pub fn is_sufficient(&self, total: u32) -> bool {
        total >= self.min_sample
    }

    /// Classify counts under this policy
    pub fn classify(&self, counts: &Counts) -> RatioClassification {
        let total = counts.total();
        let independence_ratio = counts.independence_ratio();

        let status = if !self.is_sufficient(total) {
            RatioStatus::Insufficient
        } else if self.positive.admits(independence_ratio) {
            RatioStatus::Positive
        } else if self.moderate.admits(independence_ratio) {
            RatioStatus::Moderate
        } else {
            match self.attention {
                Some(threshold) if !threshold.admits(independence_ratio) => RatioStatus::Critical,
                _ => RatioStatus::Attention,
            }
        };

        RatioClassification {
            status,
            independence_ratio,
            total,
        }
    }
}

/// Result of a ratio-family classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioClassification {
    pub status: RatioStatus,
    /// Rounded independence percentage; computed even when the sample is insufficient
    pub independence_ratio: u32,
    pub total: u32,
}

/// Classify counts with the given ratio policy
pub fn classify_ratio(counts: &Counts, policy: &RatioClassificationPolicy) -> RatioClassification {
    policy.classify(counts)
}

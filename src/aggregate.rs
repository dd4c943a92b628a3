//! Counts aggregation
//!
//! Folds trials into per-stimulus tri-state counts. [`StimulusCounts::record`]
//! is the only place a trial turns into a count increment; batch aggregation,
//! window merges, and the live session log all go through it.

use crate::types::{Counts, Trial};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel stimulus id used by [`MissingStimulusPolicy::Bucket`]
pub const UNKNOWN_STIMULUS_ID: &str = "unknown";

/// What the input boundary does with an attempt that has no stimulus id
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingStimulusPolicy {
    /// Fail the payload with a validation error
    #[default]
    Reject,
    /// Skip the attempt (logged)
    Drop,
    /// Count the attempt under [`UNKNOWN_STIMULUS_ID`]
    Bucket,
}

/// Counts for one stimulus, with the label it was first seen under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusTally {
    pub stimulus_id: String,
    pub stimulus_label: String,
    pub counts: Counts,
}

/// Per-stimulus counts keyed by stimulus id.
///
/// Iteration follows first-seen order. Equality compares the id → counts
/// mapping only, so aggregates built from reordered input are equal.
#[derive(Debug, Clone, Default)]
pub struct StimulusCounts {
    entries: Vec<StimulusTally>,
    index: HashMap<String, usize>,
}

impl StimulusCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one trial into the counts of its stimulus
    pub fn record(&mut self, trial: &Trial) {
        self.add(
            &trial.stimulus_id,
            &trial.stimulus_label,
            Counts::single(trial.outcome),
        );
    }

    /// Add partial counts for a stimulus
    pub fn add(&mut self, stimulus_id: &str, stimulus_label: &str, counts: Counts) {
        match self.index.get(stimulus_id) {
            Some(&position) => {
                let entry = &mut self.entries[position];
                entry.counts = entry.counts + counts;
            }
            None => {
                self.index
                    .insert(stimulus_id.to_string(), self.entries.len());
                self.entries.push(StimulusTally {
                    stimulus_id: stimulus_id.to_string(),
                    stimulus_label: stimulus_label.to_string(),
                    counts,
                });
            }
        }
    }

    /// Merge another aggregate into this one
    pub fn merge(&mut self, other: &StimulusCounts) {
        for tally in &other.entries {
            self.add(&tally.stimulus_id, &tally.stimulus_label, tally.counts);
        }
    }

    /// Counts for a stimulus, if any trial was recorded for it
    pub fn get(&self, stimulus_id: &str) -> Option<Counts> {
        self.index
            .get(stimulus_id)
            .map(|&position| self.entries[position].counts)
    }

    /// Keep only the given stimulus
    pub fn retain_stimulus(self, stimulus_id: &str) -> Self {
        let mut kept = StimulusCounts::new();
        if let Some(&position) = self.index.get(stimulus_id) {
            let tally = &self.entries[position];
            kept.add(&tally.stimulus_id, &tally.stimulus_label, tally.counts);
        }
        kept
    }

    pub fn iter(&self) -> impl Iterator<Item = &StimulusTally> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all stimuli's counts
    pub fn total(&self) -> Counts {
        self.entries.iter().map(|tally| tally.counts).sum()
    }

    /// Plain id → counts map
    pub fn to_map(&self) -> HashMap<String, Counts> {
        self.entries
            .iter()
            .map(|tally| (tally.stimulus_id.clone(), tally.counts))
            .collect()
    }
}

impl PartialEq for StimulusCounts {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|tally| other.get(&tally.stimulus_id) == Some(tally.counts))
    }
}

impl Eq for StimulusCounts {}

impl<'a> FromIterator<&'a Trial> for StimulusCounts {
    fn from_iter<I: IntoIterator<Item = &'a Trial>>(iter: I) -> Self {
        let mut counts = StimulusCounts::new();
        for trial in iter {
            counts.record(trial);
        }
        counts
    }
}

/// Aggregate trials into per-stimulus counts. Returns a fresh aggregate every call.
pub fn aggregate<'a>(trials: impl IntoIterator<Item = &'a Trial>) -> StimulusCounts {
    trials.into_iter().collect()
}

/// Merge two partial aggregates. Associative and commutative.
pub fn sum_counts(a: &StimulusCounts, b: &StimulusCounts) -> StimulusCounts {
    let mut merged = a.clone();
    merged.merge(b);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrialOutcome;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn trial(stimulus: &str, outcome: TrialOutcome, attempt: u32) -> Trial {
        Trial {
            stimulus_id: stimulus.to_string(),
            stimulus_label: format!("Stimulus {}", stimulus),
            outcome,
            attempt_number: attempt,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 4, 14, 0, attempt).unwrap(),
        }
    }

    /// Deterministic mixed sequence over three stimuli
    fn sample_trials(len: usize) -> Vec<Trial> {
        let stimuli = ["a", "b", "c"];
        (0..len)
            .map(|i| {
                trial(
                    stimuli[(i * 7 + i / 3) % 3],
                    TrialOutcome::ALL[(i * 5 + 1) % 3],
                    i as u32 + 1,
                )
            })
            .collect()
    }

    #[test]
    fn test_aggregate_empty() {
        let trials: Vec<Trial> = Vec::new();
        let counts = aggregate(&trials);
        assert!(counts.is_empty());
        assert_eq!(counts.total(), Counts::default());
    }

    #[test]
    fn test_aggregate_by_stimulus() {
        let trials = vec![
            trial("a", TrialOutcome::Independent, 1),
            trial("a", TrialOutcome::Error, 2),
            trial("b", TrialOutcome::Prompted, 1),
            trial("a", TrialOutcome::Independent, 3),
        ];

        let counts = aggregate(&trials);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts.get("a"), Some(Counts::new(1, 0, 2)));
        assert_eq!(counts.get("b"), Some(Counts::new(0, 1, 0)));
        assert_eq!(counts.get("c"), None);

        let order: Vec<&str> = counts.iter().map(|t| t.stimulus_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_total_conservation() {
        for len in 0..40 {
            let trials = sample_trials(len);
            let counts = aggregate(&trials);
            assert_eq!(counts.total().total() as usize, len);

            for tally in counts.iter() {
                let expected = trials
                    .iter()
                    .filter(|t| t.stimulus_id == tally.stimulus_id)
                    .count();
                assert_eq!(tally.counts.total() as usize, expected);
            }
        }
    }

    #[test]
    fn test_partition_associativity() {
        let trials = sample_trials(24);
        let whole = aggregate(&trials);

        for split in 0..=trials.len() {
            let (left, right) = trials.split_at(split);
            let merged = sum_counts(&aggregate(left), &aggregate(right));
            assert_eq!(merged, whole, "split at {}", split);

            // Commutative
            let swapped = sum_counts(&aggregate(right), &aggregate(left));
            assert_eq!(swapped, whole, "swapped split at {}", split);
        }
    }

    #[test]
    fn test_interleaving_independence() {
        let trials = sample_trials(18);
        let whole = aggregate(&trials);

        // Even/odd interleaving partition
        let evens: Vec<Trial> = trials.iter().step_by(2).cloned().collect();
        let odds: Vec<Trial> = trials.iter().skip(1).step_by(2).cloned().collect();
        assert_eq!(sum_counts(&aggregate(&odds), &aggregate(&evens)), whole);

        let mut reversed = trials.clone();
        reversed.reverse();
        assert_eq!(aggregate(&reversed), whole);
    }

    #[test]
    fn test_sum_counts_associative() {
        let trials = sample_trials(30);
        let (a, rest) = trials.split_at(7);
        let (b, c) = rest.split_at(11);
        let (a, b, c) = (aggregate(a), aggregate(b), aggregate(c));

        assert_eq!(
            sum_counts(&sum_counts(&a, &b), &c),
            sum_counts(&a, &sum_counts(&b, &c))
        );
    }

    #[test]
    fn test_retain_stimulus() {
        let trials = sample_trials(12);
        let only_b = aggregate(&trials).retain_stimulus("b");
        let filtered: Vec<&Trial> = trials.iter().filter(|t| t.stimulus_id == "b").collect();

        assert_eq!(only_b, aggregate(filtered));
        assert_eq!(aggregate(&trials).retain_stimulus("zzz").len(), 0);
    }

    #[test]
    fn test_first_label_wins() {
        let mut first = trial("a", TrialOutcome::Error, 1);
        first.stimulus_label = "Nomear cores".to_string();
        let mut second = trial("a", TrialOutcome::Error, 2);
        second.stimulus_label = "Cores".to_string();

        let counts = aggregate(&[first, second]);
        let tally = counts.iter().next().unwrap();
        assert_eq!(tally.stimulus_label, "Nomear cores");
        assert_eq!(tally.counts, Counts::new(2, 0, 0));
    }
}

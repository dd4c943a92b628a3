//! Live session recording
//!
//! While a clinician registers trials, the session is an append-only trial log
//! with counts derived through the same increment path as the batch
//! aggregator. Writes go through `&mut self`, so there is exactly one writer.

use crate::aggregate::{aggregate, StimulusCounts};
use crate::classify::{summarize_stimuli, ClassifierFamily, RatioClassificationPolicy};
use crate::summary::{summarize, AccuracyPolicy};
use crate::types::{Counts, Session, SessionSummary, StimulusSummary, Trial, TrialOutcome};
use chrono::{DateTime, NaiveDate, Utc};

/// In-progress session: trial log plus derived per-stimulus counts
#[derive(Debug, Clone)]
pub struct LiveSession {
    id: String,
    date: NaiveDate,
    therapist_id: Option<String>,
    program_id: Option<String>,
    trials: Vec<Trial>,
    counts: StimulusCounts,
}

impl LiveSession {
    pub fn new(id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            date,
            therapist_id: None,
            program_id: None,
            trials: Vec::new(),
            counts: StimulusCounts::new(),
        }
    }

    pub fn with_therapist(mut self, therapist_id: impl Into<String>) -> Self {
        self.therapist_id = Some(therapist_id.into());
        self
    }

    pub fn with_program(mut self, program_id: impl Into<String>) -> Self {
        self.program_id = Some(program_id.into());
        self
    }

    /// Resume from an already recorded session
    pub fn from_session(session: Session) -> Self {
        let counts = aggregate(&session.trials);
        Self {
            id: session.id,
            date: session.date,
            therapist_id: session.therapist_id,
            program_id: session.program_id,
            trials: session.trials,
            counts,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append a trial, then update the derived counts.
    ///
    /// The attempt number follows the highest one already logged for the
    /// stimulus, so numbers carried over from a backend session stay unique.
    pub fn record(
        &mut self,
        stimulus_id: &str,
        stimulus_label: &str,
        outcome: TrialOutcome,
        at: DateTime<Utc>,
    ) -> &Trial {
        let attempt_number = self
            .trials
            .iter()
            .filter(|trial| trial.stimulus_id == stimulus_id)
            .map(|trial| trial.attempt_number)
            .max()
            .unwrap_or(0)
            + 1;
        self.trials.push(Trial {
            stimulus_id: stimulus_id.to_string(),
            stimulus_label: stimulus_label.to_string(),
            outcome,
            attempt_number,
            timestamp: at,
        });

        let index = self.trials.len() - 1;
        self.counts.record(&self.trials[index]);
        log::debug!(
            "Recorded {} for {} (attempt {})",
            outcome,
            stimulus_id,
            attempt_number
        );
        &self.trials[index]
    }

    /// Remove the most recent trial and rebuild the counts from the log
    pub fn undo_last(&mut self) -> Option<Trial> {
        let removed = self.trials.pop()?;
        self.counts = aggregate(&self.trials);
        Some(removed)
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn counts(&self) -> &StimulusCounts {
        &self.counts
    }

    /// Counts for one stimulus, zero when nothing was recorded
    pub fn stimulus_counts(&self, stimulus_id: &str) -> Counts {
        self.counts.get(stimulus_id).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Per-stimulus statuses of the trials recorded so far
    pub fn classify(
        &self,
        family: ClassifierFamily,
        policy: &RatioClassificationPolicy,
    ) -> Vec<StimulusSummary> {
        summarize_stimuli(&self.counts, family, policy)
    }

    pub fn summary(&self, policy: AccuracyPolicy) -> SessionSummary {
        summarize(&self.trials, policy)
    }

    /// Finish recording
    pub fn into_session(self) -> Session {
        Session {
            id: self.id,
            date: self.date,
            therapist_id: self.therapist_id,
            program_id: self.program_id,
            trials: self.trials,
        }
    }
}

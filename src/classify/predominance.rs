//! Predominance-family classification
//!
//! Occupational therapy and physiotherapy screens show whichever outcome was
//! recorded most often. Ties go to the better outcome.

use crate::types::{Counts, PredominantOutcome, TrialOutcome};

/// Outcomes in descending order of desirability
const TIE_BREAK_ORDER: [TrialOutcome; 3] = [
    TrialOutcome::Independent,
    TrialOutcome::Prompted,
    TrialOutcome::Error,
];

/// Predominant outcome of the counts, or `None` when no trial was recorded
pub fn classify_predominance(counts: &Counts) -> Option<PredominantOutcome> {
    if counts.total() == 0 {
        return None;
    }

    let mut best = TIE_BREAK_ORDER[0];
    for outcome in &TIE_BREAK_ORDER[1..] {
        if counts.get(*outcome) > counts.get(best) {
            best = *outcome;
        }
    }

    Some(best.into())
}

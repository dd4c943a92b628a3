//! Progress over time
//!
//! One summary point per session, oldest first, so a program's independence
//! rate can be charted across sessions.

use crate::summary::{summarize, AccuracyPolicy};
use crate::types::{Session, SessionSummary, Trial};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Summary of one session within a series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub session_id: String,
    pub date: NaiveDate,
    pub summary: SessionSummary,
}

/// Session summaries ordered by date ascending
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSeries {
    pub accuracy_policy: AccuracyPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus_id: Option<String>,
    pub points: Vec<ProgressPoint>,
}

impl ProgressSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Independence-rate change from the first to the last point, in
    /// percentage points
    pub fn trend(&self) -> Option<i64> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() >= 2 => Some(
                i64::from(last.summary.independence_rate)
                    - i64::from(first.summary.independence_rate),
            ),
            _ => None,
        }
    }
}

/// Build the progress series, optionally restricted to one stimulus.
///
/// Sessions without a matching trial are skipped.
pub fn progress_series(
    sessions: &[Session],
    policy: AccuracyPolicy,
    stimulus_id: Option<&str>,
) -> ProgressSeries {
    let mut points: Vec<ProgressPoint> = sessions
        .iter()
        .filter_map(|session| {
            let trials: Vec<Trial> = match stimulus_id {
                Some(id) => session
                    .trials
                    .iter()
                    .filter(|t| t.stimulus_id == id)
                    .cloned()
                    .collect(),
                None => session.trials.clone(),
            };
            if trials.is_empty() {
                return None;
            }
            Some(ProgressPoint {
                session_id: session.id.clone(),
                date: session.date,
                summary: summarize(&trials, policy),
            })
        })
        .collect();

    points.sort_by_key(|p| p.date);

    ProgressSeries {
        accuracy_policy: policy,
        stimulus_id: stimulus_id.map(str::to_string),
        points,
    }
}

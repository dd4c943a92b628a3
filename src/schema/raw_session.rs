//! Raw session payloads as returned by the practice backend
//!
//! Field names differ between therapy disciplines and backend versions
//! (`attempts` / `tentativas`, `stimulusId` / `estimuloId`, ...). These types
//! accept every known spelling; the adapter turns them into canonical
//! [`Session`](crate::types::Session)s.

use serde::{Deserialize, Serialize};

/// Session object as fetched from the backend listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSession {
    /// Session identifier
    #[serde(alias = "sessionId", alias = "sessaoId")]
    pub id: String,
    /// Session date, `YYYY-MM-DD` or an RFC 3339 timestamp
    #[serde(alias = "data")]
    pub date: String,
    /// Therapist who ran the session
    #[serde(default, alias = "therapistId", alias = "terapeutaId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub therapist_id: Option<String>,
    /// Program the session belongs to
    #[serde(default, alias = "programId", alias = "programaId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    /// Recorded attempts
    #[serde(default, alias = "tentativas", alias = "trials")]
    pub attempts: Vec<RawAttempt>,
}

/// One attempt record embedded in a session payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAttempt {
    /// Stimulus identifier; may be absent in legacy payloads
    #[serde(default, alias = "stimulusId", alias = "estimuloId", alias = "activityId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stimulus_id: Option<String>,
    /// Stimulus display name
    #[serde(default, alias = "stimulusLabel", alias = "estimulo", alias = "label")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stimulus_label: Option<String>,
    /// Outcome tag in any discipline's vocabulary
    #[serde(alias = "resultado", alias = "type")]
    pub outcome: String,
    /// 1-based attempt number within the stimulus
    #[serde(default, alias = "attemptNumber", alias = "tentativa")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    /// RFC 3339 timestamp of the attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl RawAttempt {
    /// Stimulus id, treating blank strings as missing
    pub fn stimulus_id(&self) -> Option<&str> {
        self.stimulus_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Validation errors raised at the input boundary
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Session and attempt index are set when the tag came from a payload
    #[error("{}unknown trial outcome {tag:?}", attempt_location(.session_id, .index))]
    UnknownOutcome {
        tag: String,
        session_id: Option<String>,
        index: Option<usize>,
    },

    #[error("Session {session_id}, attempt {index}: missing stimulus id")]
    MissingStimulus { session_id: String, index: usize },

    #[error("Session {session_id}, attempt {index}: attempt number must be at least 1")]
    InvalidAttemptNumber { session_id: String, index: usize },

    #[error("Session {session_id}, attempt {index}: invalid timestamp {value:?}")]
    InvalidTimestamp {
        session_id: String,
        index: usize,
        value: String,
    },

    #[error("Session {session_id}: invalid date {value:?}")]
    InvalidDate { session_id: String, value: String },

    #[error("Meeting {index}: {reason}")]
    InvalidMeeting { index: usize, reason: String },

    #[error("Window size must be 1, 3 or 5, got {0}")]
    InvalidWindowSize(u32),
}

fn attempt_location(session_id: &Option<String>, index: &Option<usize>) -> String {
    match (session_id, index) {
        (Some(session_id), Some(index)) => format!("Session {session_id}, attempt {index}: "),
        (Some(session_id), None) => format!("Session {session_id}: "),
        _ => String::new(),
    }
}

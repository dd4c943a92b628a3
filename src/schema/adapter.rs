//! Adapter for converting raw backend sessions into canonical sessions
//!
//! This is the input boundary: outcome tags are resolved, missing stimulus ids
//! are handled according to an explicit [`MissingStimulusPolicy`], and anything
//! that would skew counts is rejected rather than coerced.

use crate::aggregate::{MissingStimulusPolicy, UNKNOWN_STIMULUS_ID};
use crate::error::ProgressError;
use crate::schema::raw_session::{RawAttempt, RawSession, ValidationError};
use crate::types::{Session, Trial, TrialOutcome};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// Adapter for converting raw session payloads to canonical sessions
pub struct SessionAdapter;

impl SessionAdapter {
    /// Parse a JSON string containing a single RawSession
    pub fn parse_session(json: &str) -> Result<RawSession, ProgressError> {
        serde_json::from_str(json)
            .map_err(|e| ProgressError::ParseError(format!("Failed to parse session: {}", e)))
    }

    /// Parse a JSON string containing an array of RawSessions
    pub fn parse_array(json: &str) -> Result<Vec<RawSession>, ProgressError> {
        let sessions: Vec<RawSession> = serde_json::from_str(json)?;
        Ok(sessions)
    }

    /// Parse NDJSON (newline-delimited JSON) containing RawSessions
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<RawSession>, ProgressError> {
        let mut sessions = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<RawSession>(trimmed) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    return Err(ProgressError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(sessions)
    }

    /// Convert raw sessions to canonical sessions, failing on the first invalid record
    pub fn to_sessions(
        raw: &[RawSession],
        policy: MissingStimulusPolicy,
    ) -> Result<Vec<Session>, ProgressError> {
        let sessions = raw
            .iter()
            .map(|session| Self::to_session(session, policy))
            .collect::<Result<Vec<_>, _>>()?;

        log::debug!(
            "normalized {} sessions with {} trials",
            sessions.len(),
            sessions.iter().map(|s| s.trials.len()).sum::<usize>()
        );

        Ok(sessions)
    }

    /// Convert one raw session to a canonical session
    pub fn to_session(
        raw: &RawSession,
        policy: MissingStimulusPolicy,
    ) -> Result<Session, ValidationError> {
        let date = parse_session_date(raw)?;
        let mut positions: HashMap<String, u32> = HashMap::new();
        let mut trials = Vec::with_capacity(raw.attempts.len());

        for (index, attempt) in raw.attempts.iter().enumerate() {
            if let Some(trial) =
                normalize_attempt(raw, date, index, attempt, policy, &mut positions)?
            {
                trials.push(trial);
            }
        }

        Ok(Session {
            id: raw.id.clone(),
            date,
            therapist_id: raw.therapist_id.clone(),
            program_id: raw.program_id.clone(),
            trials,
        })
    }

    /// Validate a batch of sessions, reporting every invalid record
    pub fn validate_sessions(
        raw: &[RawSession],
        policy: MissingStimulusPolicy,
    ) -> Vec<ValidationResult> {
        let mut results = Vec::new();

        for (session_index, session) in raw.iter().enumerate() {
            let date = match parse_session_date(session) {
                Ok(date) => date,
                Err(error) => {
                    results.push(ValidationResult {
                        session_index,
                        session_id: session.id.clone(),
                        error,
                    });
                    continue;
                }
            };

            let mut positions: HashMap<String, u32> = HashMap::new();
            for (index, attempt) in session.attempts.iter().enumerate() {
                if let Err(error) =
                    normalize_attempt(session, date, index, attempt, policy, &mut positions)
                {
                    results.push(ValidationResult {
                        session_index,
                        session_id: session.id.clone(),
                        error,
                    });
                }
            }
        }

        results
    }
}

/// A validation failure located within a batch
#[derive(Debug)]
pub struct ValidationResult {
    pub session_index: usize,
    pub session_id: String,
    pub error: ValidationError,
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp
fn parse_session_date(raw: &RawSession) -> Result<NaiveDate, ValidationError> {
    let value = raw.date.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| {
            DateTime::parse_from_rfc3339(value).map(|dt| dt.date_naive())
        })
        .map_err(|_| ValidationError::InvalidDate {
            session_id: raw.id.clone(),
            value: raw.date.clone(),
        })
}

/// Normalize one attempt. `Ok(None)` means the attempt was dropped by policy.
fn normalize_attempt(
    session: &RawSession,
    date: NaiveDate,
    index: usize,
    attempt: &RawAttempt,
    policy: MissingStimulusPolicy,
    positions: &mut HashMap<String, u32>,
) -> Result<Option<Trial>, ValidationError> {
    let outcome = TrialOutcome::from_tag(attempt.outcome.trim()).ok_or_else(|| {
        ValidationError::UnknownOutcome {
            tag: attempt.outcome.clone(),
            session_id: Some(session.id.clone()),
            index: Some(index),
        }
    })?;

    let stimulus_id = match (attempt.stimulus_id(), policy) {
        (Some(id), _) => id.to_string(),
        (None, MissingStimulusPolicy::Reject) => {
            return Err(ValidationError::MissingStimulus {
                session_id: session.id.clone(),
                index,
            });
        }
        (None, MissingStimulusPolicy::Drop) => {
            log::warn!(
                "dropping attempt {} of session {}: no stimulus id",
                index,
                session.id
            );
            return Ok(None);
        }
        (None, MissingStimulusPolicy::Bucket) => {
            log::warn!(
                "counting attempt {} of session {} under '{}'",
                index,
                session.id,
                UNKNOWN_STIMULUS_ID
            );
            UNKNOWN_STIMULUS_ID.to_string()
        }
    };

    let position = positions.entry(stimulus_id.clone()).or_insert(0);
    *position += 1;

    let attempt_number = match attempt.attempt_number {
        Some(0) => {
            return Err(ValidationError::InvalidAttemptNumber {
                session_id: session.id.clone(),
                index,
            });
        }
        Some(number) => number,
        None => *position,
    };

    let timestamp = match attempt.timestamp.as_deref() {
        Some(value) => DateTime::parse_from_rfc3339(value.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| ValidationError::InvalidTimestamp {
                session_id: session.id.clone(),
                index,
                value: value.to_string(),
            })?,
        None => date.and_time(chrono::NaiveTime::MIN).and_utc(),
    };

    let stimulus_label = attempt
        .stimulus_label
        .as_deref()
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(&stimulus_id)
        .to_string();

    Ok(Some(Trial {
        stimulus_id,
        stimulus_label,
        outcome,
        attempt_number,
        timestamp,
    }))
}

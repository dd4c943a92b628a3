//! Pipeline orchestration
//!
//! This module provides the JSON-in/JSON-out API of the engine. Raw backend
//! sessions go through the boundary adapter, then aggregation and
//! classification, and come out as encoded reports.

use crate::billing::{total_for_meetings, Meeting};
use crate::config::{CallSite, EngineConfig};
use crate::error::ProgressError;
use crate::live::LiveSession;
use crate::progress::progress_series;
use crate::report::ReportEncoder;
use crate::schema::SessionAdapter;
use crate::types::Session;
use crate::window::{WindowAggregator, WindowFilters};
use chrono::NaiveDate;

/// Build the multi-session attention report.
///
/// # Arguments
/// * `sessions_json` - JSON array of backend session objects
/// * `config` - Engine configuration (window size, discipline, policies)
/// * `filters` - Therapist, program, date and stimulus filters
///
/// # Example
/// ```ignore
/// let report = attention_report(sessions_json, &EngineConfig::default(), &WindowFilters::default())?;
/// ```
pub fn attention_report(
    sessions_json: &str,
    config: &EngineConfig,
    filters: &WindowFilters,
) -> Result<String, ProgressError> {
    ProgressEngine::with_config(config.clone()).attention_report(sessions_json, filters)
}

/// Build the report of a single session as shown by `site`.
pub fn session_report(
    session_json: &str,
    config: &EngineConfig,
    site: CallSite,
) -> Result<String, ProgressError> {
    ProgressEngine::with_config(config.clone()).session_report(session_json, site)
}

/// Bill a day of meetings.
///
/// # Arguments
/// * `meetings_json` - JSON array of `{"start": "HH:MM", "end": "HH:MM"}`
pub fn billing_report(meetings_json: &str) -> Result<String, ProgressError> {
    ProgressEngine::new().billing_report(meetings_json)
}

/// Parse and validate a JSON array of backend sessions.
pub fn parse_sessions(
    sessions_json: &str,
    config: &EngineConfig,
) -> Result<Vec<Session>, ProgressError> {
    let raw = SessionAdapter::parse_array(sessions_json)?;
    SessionAdapter::to_sessions(&raw, config.missing_stimulus)
}

/// Stateful engine holding the configuration and a report encoder.
///
/// Use this when several reports should share one configuration and encoder
/// instance id.
pub struct ProgressEngine {
    config: EngineConfig,
    encoder: ReportEncoder,
}

impl Default for ProgressEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressEngine {
    /// Create an engine with default settings
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            encoder: ReportEncoder::new(),
        }
    }

    pub fn with_encoder(mut self, encoder: ReportEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration from JSON
    pub fn load_config(&mut self, json: &str) -> Result<(), ProgressError> {
        self.config = EngineConfig::from_json(json)?;
        Ok(())
    }

    /// Current configuration as JSON
    pub fn save_config(&self) -> Result<String, ProgressError> {
        self.config.to_json()
    }

    pub fn attention_report(
        &self,
        sessions_json: &str,
        filters: &WindowFilters,
    ) -> Result<String, ProgressError> {
        let sessions = parse_sessions(sessions_json, &self.config)?;
        self.attention_report_for(&sessions, filters)
    }

    /// Attention report over already validated sessions
    pub fn attention_report_for(
        &self,
        sessions: &[Session],
        filters: &WindowFilters,
    ) -> Result<String, ProgressError> {
        let policy = self.config.ratio_policy_for(CallSite::AttentionReport);
        let window = WindowAggregator::with_policy(policy).aggregate_window(
            sessions,
            self.config.window_size,
            filters,
        );
        log::debug!(
            "Attention window: {} sessions, {} stimuli, {} flagged",
            window.session_ids.len(),
            window.all.len(),
            window.filtered.len()
        );

        self.encoder.encode_attention_to_json(
            &window,
            self.config.discipline,
            self.config.window_size,
        )
    }

    pub fn session_report(&self, session_json: &str, site: CallSite) -> Result<String, ProgressError> {
        let raw = SessionAdapter::parse_session(session_json)?;
        let session = SessionAdapter::to_session(&raw, self.config.missing_stimulus)?;
        self.encoder.encode_session_to_json(&session, &self.config, site)
    }

    pub fn billing_report(&self, meetings_json: &str) -> Result<String, ProgressError> {
        let meetings: Vec<Meeting> = serde_json::from_str(meetings_json)?;
        let totals = total_for_meetings(&meetings)?;
        self.encoder.encode_billing_to_json(meetings.len(), totals)
    }

    /// Progress series across sessions, optionally for one stimulus
    pub fn progress_report(
        &self,
        sessions_json: &str,
        stimulus_id: Option<&str>,
    ) -> Result<String, ProgressError> {
        let sessions = parse_sessions(sessions_json, &self.config)?;
        let policy = self.config.accuracy_policy_for(CallSite::SessionsList);
        let series = progress_series(&sessions, policy, stimulus_id);
        self.encoder.encode_progress_to_json(&series)
    }

    /// Start recording a new session
    pub fn live_session(&self, session_id: impl Into<String>, date: NaiveDate) -> LiveSession {
        LiveSession::new(session_id, date)
    }

    /// Report on a live session as the registration screen shows it
    pub fn live_report(&self, live: &LiveSession) -> Result<String, ProgressError> {
        let session = live.clone().into_session();
        self.encoder
            .encode_session_to_json(&session, &self.config, CallSite::SessionRegistration)
    }
}

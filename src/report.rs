//! Report encoding
//!
//! Turns engine results into JSON report payloads carrying producer metadata,
//! so exported reports can be traced back to the engine build that made them.

use crate::aggregate::aggregate;
use crate::billing::MeetingTotals;
use crate::classify::summarize_stimuli;
use crate::config::{CallSite, EngineConfig};
use crate::error::ProgressError;
use crate::labels::Discipline;
use crate::progress::{ProgressPoint, ProgressSeries};
use crate::summary::{summarize, AccuracyPolicy};
use crate::types::{Counts, Session, SessionSummary, StimulusSummary};
use crate::window::{WindowReport, WindowSize};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Engine build that produced a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One stimulus line of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusRow {
    pub stimulus_id: String,
    pub stimulus_label: String,
    pub counts: Counts,
    pub total: u32,
    pub independence_ratio: u32,
    /// Status tag, e.g. `atencao` or `desempenhou_com_ajuda`
    pub status: String,
    /// Status as shown to clinicians
    pub status_label: String,
}

impl StimulusRow {
    fn from_summary(summary: &StimulusSummary, discipline: Discipline) -> Self {
        Self {
            stimulus_id: summary.stimulus_id.clone(),
            stimulus_label: summary.stimulus_label.clone(),
            counts: summary.counts,
            total: summary.total,
            independence_ratio: summary.independence_ratio,
            status: summary.status.as_str().to_string(),
            status_label: discipline.status_label(summary.status).to_string(),
        }
    }
}

/// Multi-session attention report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttentionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub discipline: Discipline,
    pub window_size: WindowSize,
    pub session_ids: Vec<String>,
    pub has_sufficient_data: bool,
    pub all: Vec<StimulusRow>,
    /// Stimuli needing attention, worst first
    pub attention: Vec<StimulusRow>,
}

/// Single-session report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub discipline: Discipline,
    pub call_site: CallSite,
    pub session_id: String,
    pub date: NaiveDate,
    pub accuracy_policy: AccuracyPolicy,
    pub summary: SessionSummary,
    pub stimuli: Vec<StimulusRow>,
}

/// Progress of a program across sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub accuracy_policy: AccuracyPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stimulus_id: Option<String>,
    pub points: Vec<ProgressPoint>,
    /// Independence-rate change between first and last point
    pub trend: Option<i64>,
}

/// Billed hours for a day of meetings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub meetings: usize,
    pub minutes_realized: i64,
    pub hours_billed: u32,
}

/// Report encoder with a per-instance id
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn producer(&self) -> ReportProducer {
        ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: ENGINE_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        }
    }

    pub fn encode_attention(
        &self,
        window: &WindowReport,
        discipline: Discipline,
        window_size: WindowSize,
    ) -> AttentionReport {
        let rows = |summaries: &[StimulusSummary]| -> Vec<StimulusRow> {
            summaries
                .iter()
                .map(|s| StimulusRow::from_summary(s, discipline))
                .collect()
        };

        AttentionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            discipline,
            window_size,
            session_ids: window.session_ids.clone(),
            has_sufficient_data: window.has_sufficient_data,
            all: rows(&window.all),
            attention: rows(&window.filtered),
        }
    }

    /// Summarize and classify one session the way `site` does
    pub fn encode_session(
        &self,
        session: &Session,
        config: &EngineConfig,
        site: CallSite,
    ) -> SessionReport {
        let accuracy_policy = config.accuracy_policy_for(site);
        let family = config.classifier_family_for(site);
        let ratio_policy = config.ratio_policy_for(site);

        let stimuli = summarize_stimuli(&aggregate(&session.trials), family, &ratio_policy)
            .iter()
            .map(|s| StimulusRow::from_summary(s, config.discipline))
            .collect();

        SessionReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            discipline: config.discipline,
            call_site: site,
            session_id: session.id.clone(),
            date: session.date,
            accuracy_policy,
            summary: summarize(&session.trials, accuracy_policy),
            stimuli,
        }
    }

    pub fn encode_progress(&self, series: &ProgressSeries) -> ProgressReport {
        ProgressReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            accuracy_policy: series.accuracy_policy,
            stimulus_id: series.stimulus_id.clone(),
            points: series.points.clone(),
            trend: series.trend(),
        }
    }

    pub fn encode_billing(&self, meetings: usize, totals: MeetingTotals) -> BillingReport {
        BillingReport {
            report_version: REPORT_VERSION.to_string(),
            producer: self.producer(),
            computed_at_utc: Utc::now().to_rfc3339(),
            meetings,
            minutes_realized: totals.minutes_realized,
            hours_billed: totals.hours_billed,
        }
    }

    pub fn encode_attention_to_json(
        &self,
        window: &WindowReport,
        discipline: Discipline,
        window_size: WindowSize,
    ) -> Result<String, ProgressError> {
        to_json(&self.encode_attention(window, discipline, window_size))
    }

    pub fn encode_session_to_json(
        &self,
        session: &Session,
        config: &EngineConfig,
        site: CallSite,
    ) -> Result<String, ProgressError> {
        to_json(&self.encode_session(session, config, site))
    }

    pub fn encode_progress_to_json(&self, series: &ProgressSeries) -> Result<String, ProgressError> {
        to_json(&self.encode_progress(series))
    }

    pub fn encode_billing_to_json(
        &self,
        meetings: usize,
        totals: MeetingTotals,
    ) -> Result<String, ProgressError> {
        to_json(&self.encode_billing(meetings, totals))
    }
}

fn to_json<T: Serialize>(report: &T) -> Result<String, ProgressError> {
    serde_json::to_string_pretty(report).map_err(ProgressError::JsonError)
}

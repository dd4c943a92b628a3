//! Windowed multi-session aggregation
//!
//! Merges the most recent N sessions of a patient into one per-stimulus view
//! and extracts the stimuli that need clinical attention, worst first.

use crate::aggregate::{aggregate, StimulusCounts};
use crate::classify::{
    summarize_stimuli, ClassifierFamily, RatioClassificationPolicy, DEFAULT_MIN_SAMPLE,
};
use crate::schema::ValidationError;
use crate::types::{Session, StimulusSummary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

/// Number of most recent sessions merged into a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum WindowSize {
    One,
    #[default]
    Three,
    Five,
}

impl WindowSize {
    pub fn as_usize(&self) -> usize {
        u32::from(*self) as usize
    }
}

impl TryFrom<u32> for WindowSize {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WindowSize::One),
            3 => Ok(WindowSize::Three),
            5 => Ok(WindowSize::Five),
            other => Err(ValidationError::InvalidWindowSize(other)),
        }
    }
}

impl From<WindowSize> for u32 {
    fn from(size: WindowSize) -> Self {
        match size {
            WindowSize::One => 1,
            WindowSize::Three => 3,
            WindowSize::Five => 5,
        }
    }
}

/// Inclusive date interval; an open end matches every date on that side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}

/// Session and stimulus filters applied before windowing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowFilters {
    #[serde(default)]
    pub stimulus_id: Option<String>,
    #[serde(default)]
    pub therapist_id: Option<String>,
    #[serde(default)]
    pub program_id: Option<String>,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

impl WindowFilters {
    /// Whether a session passes the therapist, program and date filters
    pub fn admits(&self, session: &Session) -> bool {
        let field_matches = |filter: &Option<String>, value: &Option<String>| match filter {
            Some(wanted) => value.as_deref() == Some(wanted.as_str()),
            None => true,
        };

        field_matches(&self.therapist_id, &session.therapist_id)
            && field_matches(&self.program_id, &session.program_id)
            && self
                .date_range
                .map_or(true, |range| range.contains(session.date))
    }
}

/// Result of a windowed aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowReport {
    /// Every aggregated stimulus, in first-seen order
    pub all: Vec<StimulusSummary>,
    /// Stimuli with status `atencao` or `critico`, worst first
    pub filtered: Vec<StimulusSummary>,
    /// At least one stimulus has [`DEFAULT_MIN_SAMPLE`] trials, whatever the
    /// policy's own `min_sample`
    pub has_sufficient_data: bool,
    /// Selected sessions, most recent first
    pub session_ids: Vec<String>,
}

/// Windowed aggregator, always classifying with the ratio family
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    policy: RatioClassificationPolicy,
}

impl Default for WindowAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowAggregator {
    /// Aggregator with the inclusive five-way policy of the attention report
    pub fn new() -> Self {
        Self::with_policy(RatioClassificationPolicy::inclusive_five_way())
    }

    pub fn with_policy(policy: RatioClassificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RatioClassificationPolicy {
        &self.policy
    }

    /// Most recent `size` sessions passing the filters, newest first.
    /// Sessions sharing a date keep their input order.
    pub fn select<'a>(
        &self,
        sessions: &'a [Session],
        size: WindowSize,
        filters: &WindowFilters,
    ) -> Vec<&'a Session> {
        let mut selected: Vec<&Session> = sessions.iter().filter(|s| filters.admits(s)).collect();
        selected.sort_by_key(|s| Reverse(s.date));
        selected.truncate(size.as_usize());
        selected
    }

    /// Aggregate and classify the selected window
    pub fn aggregate_window(
        &self,
        sessions: &[Session],
        size: WindowSize,
        filters: &WindowFilters,
    ) -> WindowReport {
        let selected = self.select(sessions, size, filters);

        let mut merged = StimulusCounts::new();
        for session in &selected {
            merged.merge(&aggregate(&session.trials));
        }
        if let Some(stimulus_id) = &filters.stimulus_id {
            merged = merged.retain_stimulus(stimulus_id);
        }

        if merged.is_empty() {
            log::warn!(
                "No trials in window ({} of {} sessions selected)",
                selected.len(),
                sessions.len()
            );
            return WindowReport::default();
        }

        log::debug!(
            "Window of {} sessions covers {} stimuli",
            selected.len(),
            merged.len()
        );

        let all = summarize_stimuli(&merged, ClassifierFamily::Ratio, &self.policy);
        let has_sufficient_data = all.iter().any(|s| s.total >= DEFAULT_MIN_SAMPLE);
        let filtered = attention_list(&all);

        WindowReport {
            all,
            filtered,
            has_sufficient_data,
            session_ids: selected.iter().map(|s| s.id.clone()).collect(),
        }
    }
}

/// Entries needing attention, sorted by severity, then ratio ascending, then
/// total descending
pub fn attention_list(summaries: &[StimulusSummary]) -> Vec<StimulusSummary> {
    let mut ranked: Vec<(u8, &StimulusSummary)> = summaries
        .iter()
        .filter_map(|s| {
            s.status
                .ratio()
                .and_then(|status| status.severity_rank())
                .map(|rank| (rank, s))
        })
        .collect();

    ranked.sort_by_key(|(rank, s)| (*rank, s.independence_ratio, Reverse(s.total)));
    ranked.into_iter().map(|(_, s)| s.clone()).collect()
}

/// Aggregate a window with the default attention-report policy
pub fn aggregate_window(
    sessions: &[Session],
    size: WindowSize,
    filters: &WindowFilters,
) -> WindowReport {
    WindowAggregator::new().aggregate_window(sessions, size, filters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Counts, RatioStatus, Status, Trial, TrialOutcome};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    /// Session with the given per-stimulus (erro, ajuda, indep) distribution
    fn session(id: &str, day: u32, stimuli: &[(&str, u32, u32, u32)]) -> Session {
        let mut trials = Vec::new();
        for (stimulus, error, prompted, independent) in stimuli {
            let outcomes = std::iter::repeat(TrialOutcome::Error)
                .take(*error as usize)
                .chain(std::iter::repeat(TrialOutcome::Prompted).take(*prompted as usize))
                .chain(std::iter::repeat(TrialOutcome::Independent).take(*independent as usize));
            for (n, outcome) in outcomes.enumerate() {
                trials.push(Trial {
                    stimulus_id: stimulus.to_string(),
                    stimulus_label: stimulus.to_uppercase(),
                    outcome,
                    attempt_number: n as u32 + 1,
                    timestamp: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
                });
            }
        }
        Session {
            id: id.to_string(),
            date: date(day),
            therapist_id: Some("t-1".to_string()),
            program_id: Some("p-1".to_string()),
            trials,
        }
    }

    fn five_sessions() -> Vec<Session> {
        vec![
            // Oldest two are outside a window of 3
            session("s1", 1, &[("a", 0, 0, 10), ("d", 10, 0, 0)]),
            session("s2", 2, &[("a", 0, 0, 10)]),
            session("s3", 3, &[("a", 2, 1, 1), ("b", 1, 1, 0), ("c", 0, 0, 3)]),
            session("s5", 5, &[("a", 1, 0, 1), ("b", 2, 0, 1), ("c", 0, 1, 2)]),
            session("s4", 4, &[("a", 0, 1, 1), ("b", 0, 1, 0), ("c", 1, 0, 1)]),
        ]
    }

    fn ids(summaries: &[StimulusSummary]) -> Vec<&str> {
        summaries.iter().map(|s| s.stimulus_id.as_str()).collect()
    }

    #[test]
    fn test_window_size_serde() {
        let size: WindowSize = serde_json::from_str("5").unwrap();
        assert_eq!(size, WindowSize::Five);
        assert_eq!(serde_json::to_string(&WindowSize::One).unwrap(), "1");
        assert!(serde_json::from_str::<WindowSize>("4").is_err());
        assert_eq!(
            WindowSize::try_from(2u32),
            Err(ValidationError::InvalidWindowSize(2))
        );
    }

    #[test]
    fn test_end_to_end_window_of_three() {
        let report = aggregate_window(&five_sessions(), WindowSize::Three, &WindowFilters::default());

        assert_eq!(report.session_ids, vec!["s5", "s4", "s3"]);
        // "d" only appears in the oldest session
        assert_eq!(ids(&report.all), vec!["a", "b", "c"]);

        // a: erro 3, ajuda 2, indep 3 -> 38% critico
        // b: erro 3, ajuda 2, indep 1 -> 17% critico
        // c: erro 1, ajuda 1, indep 6 -> 75% mediano
        let a = &report.all[0];
        assert_eq!(a.counts, Counts::new(3, 2, 3));
        assert_eq!(a.independence_ratio, 38);
        assert_eq!(a.status, Status::Ratio(RatioStatus::Critical));
        assert_eq!(report.all[2].status, Status::Ratio(RatioStatus::Moderate));

        assert_eq!(ids(&report.filtered), vec!["b", "a"]);
        assert!(report.has_sufficient_data);
    }

    #[test]
    fn test_window_of_one_uses_latest_session() {
        let report = aggregate_window(&five_sessions(), WindowSize::One, &WindowFilters::default());
        assert_eq!(report.session_ids, vec!["s5"]);
        assert_eq!(report.all[0].counts, Counts::new(1, 0, 1));
        // no stimulus reaches five trials in a single session
        assert!(!report.has_sufficient_data);
        assert!(report.filtered.is_empty());
    }

    #[test]
    fn test_filtered_ordering_tie_breaks() {
        let sessions = vec![session(
            "s1",
            1,
            &[
                ("attention-big", 3, 0, 3),
                ("attention-small", 5, 0, 5),
                ("critical-mid", 7, 0, 3),
                ("critical-low", 4, 0, 1),
                ("positive", 0, 0, 5),
            ],
        )];
        let report = aggregate_window(&sessions, WindowSize::One, &WindowFilters::default());

        // critico first by ratio (20 < 30), then atencao at 50% with more data first
        assert_eq!(
            ids(&report.filtered),
            vec!["critical-low", "critical-mid", "attention-small", "attention-big"]
        );
        assert_eq!(report.all.len(), 5);
    }

    #[test]
    fn test_empty_input() {
        let report = aggregate_window(&[], WindowSize::Five, &WindowFilters::default());
        assert_eq!(report, WindowReport::default());
        assert!(!report.has_sufficient_data);
    }

    #[test]
    fn test_filters_excluding_everything() {
        let filters = WindowFilters {
            therapist_id: Some("someone-else".to_string()),
            ..Default::default()
        };
        let report = aggregate_window(&five_sessions(), WindowSize::Five, &filters);
        assert_eq!(report, WindowReport::default());
    }

    #[test]
    fn test_date_range_applies_before_window() {
        let filters = WindowFilters {
            date_range: Some(DateRange {
                from: None,
                to: Some(date(3)),
            }),
            ..Default::default()
        };
        let report = aggregate_window(&five_sessions(), WindowSize::Three, &filters);
        assert_eq!(report.session_ids, vec!["s3", "s2", "s1"]);
        assert_eq!(ids(&report.all), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_program_filter() {
        let mut sessions = five_sessions();
        sessions[3].program_id = Some("p-2".to_string());
        let filters = WindowFilters {
            program_id: Some("p-1".to_string()),
            ..Default::default()
        };
        let report = aggregate_window(&sessions, WindowSize::Three, &filters);
        assert_eq!(report.session_ids, vec!["s4", "s3", "s2"]);
    }

    #[test]
    fn test_stimulus_filter_before_or_after_merge() {
        let sessions = five_sessions();
        let aggregator = WindowAggregator::new();

        for stimulus in ["a", "b", "c", "d", "missing"] {
            let filters = WindowFilters {
                stimulus_id: Some(stimulus.to_string()),
                ..Default::default()
            };
            let after = aggregator.aggregate_window(&sessions, WindowSize::Five, &filters);

            // Filtering the trials before aggregation yields the same report
            let prefiltered: Vec<Session> = sessions
                .iter()
                .map(|s| Session {
                    trials: s
                        .trials
                        .iter()
                        .filter(|t| t.stimulus_id == stimulus)
                        .cloned()
                        .collect(),
                    ..s.clone()
                })
                .collect();
            let before =
                aggregator.aggregate_window(&prefiltered, WindowSize::Five, &WindowFilters::default());

            assert_eq!(after, before, "stimulus {}", stimulus);
        }
    }

    #[test]
    fn test_equal_dates_keep_input_order() {
        let sessions = vec![
            session("first", 2, &[("a", 0, 0, 1)]),
            session("second", 2, &[("a", 0, 0, 1)]),
            session("older", 1, &[("a", 0, 0, 1)]),
        ];
        let report = aggregate_window(&sessions, WindowSize::One, &WindowFilters::default());
        assert_eq!(report.session_ids, vec!["first"]);
    }

    #[test]
    fn test_strict_policy_window() {
        let aggregator = WindowAggregator::with_policy(RatioClassificationPolicy::strict_four_way());
        let report =
            aggregator.aggregate_window(&five_sessions(), WindowSize::Three, &WindowFilters::default());
        // The four-way policy has no critico bucket
        assert!(report
            .filtered
            .iter()
            .all(|s| s.status == Status::Ratio(RatioStatus::Attention)));
        assert_eq!(ids(&report.filtered), vec!["b", "a"]);
    }

    #[test]
    fn test_sufficient_data_ignores_policy_min_sample() {
        let policy = RatioClassificationPolicy {
            min_sample: 3,
            ..RatioClassificationPolicy::inclusive_five_way()
        };
        let report = WindowAggregator::with_policy(policy).aggregate_window(
            &five_sessions(),
            WindowSize::One,
            &WindowFilters::default(),
        );

        // b has three trials: classified under this policy, still short of five
        assert_eq!(report.all[1].counts.total(), 3);
        assert_eq!(report.all[1].status, Status::Ratio(RatioStatus::Critical));
        assert!(!report.has_sufficient_data);
    }
}

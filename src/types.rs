//! Core types for the therapy-progress engine
//!
//! This module defines the data that flows through each stage: recorded trials,
//! canonical sessions, aggregated counts, statuses, and the summaries built from them.

use crate::schema::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;

/// Outcome of a single recorded attempt.
///
/// Every therapy discipline records the same three-way outcome under its own
/// vocabulary; parsing accepts all of them and serialization always emits the
/// canonical tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum TrialOutcome {
    /// No success
    Error,
    /// Success with support
    Prompted,
    /// Unaided success
    Independent,
}

impl TrialOutcome {
    /// All outcomes, worst first
    pub const ALL: [TrialOutcome; 3] = [
        TrialOutcome::Error,
        TrialOutcome::Prompted,
        TrialOutcome::Independent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrialOutcome::Error => "error",
            TrialOutcome::Prompted => "prompted",
            TrialOutcome::Independent => "independent",
        }
    }

    /// Resolve a canonical or discipline-specific outcome tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "error" | "erro" | "naoDesempenhou" | "nao_desempenhou" => Some(TrialOutcome::Error),
            "prompted" | "ajuda" | "desempenhouComAjuda" | "desempenhou_com_ajuda" => {
                Some(TrialOutcome::Prompted)
            }
            "independent" | "indep" | "independente" | "acerto" | "desempenhou" => {
                Some(TrialOutcome::Independent)
            }
            _ => None,
        }
    }
}

impl FromStr for TrialOutcome {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrialOutcome::from_tag(s).ok_or_else(|| ValidationError::UnknownOutcome {
            tag: s.to_string(),
            session_id: None,
            index: None,
        })
    }
}

impl TryFrom<String> for TrialOutcome {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, ValidationError> {
        value.parse()
    }
}

impl From<TrialOutcome> for &'static str {
    fn from(outcome: TrialOutcome) -> Self {
        outcome.as_str()
    }
}

impl fmt::Display for TrialOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded attempt for one stimulus. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trial {
    /// Stimulus (activity) this attempt belongs to
    pub stimulus_id: String,
    /// Human-readable stimulus name
    pub stimulus_label: String,
    /// Recorded outcome
    pub outcome: TrialOutcome,
    /// 1-based attempt number within the stimulus
    pub attempt_number: u32,
    /// When the attempt was recorded
    pub timestamp: DateTime<Utc>,
}

/// A therapy session with its recorded trials, already normalized at the boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier
    pub id: String,
    /// Calendar date of the session
    pub date: NaiveDate,
    /// Therapist who ran the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub therapist_id: Option<String>,
    /// Program the session belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    /// Recorded trials
    #[serde(default)]
    pub trials: Vec<Trial>,
}

/// Tri-state attempt counts for one stimulus.
///
/// Wire names follow the clinical vocabulary (`erro`, `ajuda`, `indep`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Counts {
    #[serde(rename = "erro")]
    pub error: u32,
    #[serde(rename = "ajuda")]
    pub prompted: u32,
    #[serde(rename = "indep")]
    pub independent: u32,
}

impl Counts {
    pub const fn new(error: u32, prompted: u32, independent: u32) -> Self {
        Self {
            error,
            prompted,
            independent,
        }
    }

    /// Total number of trials folded into these counts
    pub fn total(&self) -> u32 {
        self.error + self.prompted + self.independent
    }

    /// Count for a single outcome
    pub fn get(&self, outcome: TrialOutcome) -> u32 {
        match outcome {
            TrialOutcome::Error => self.error,
            TrialOutcome::Prompted => self.prompted,
            TrialOutcome::Independent => self.independent,
        }
    }

    /// Counts after folding one more trial with the given outcome
    pub fn increment(self, outcome: TrialOutcome) -> Self {
        self + Counts::single(outcome)
    }

    /// Counts of exactly one trial
    pub fn single(outcome: TrialOutcome) -> Self {
        match outcome {
            TrialOutcome::Error => Counts::new(1, 0, 0),
            TrialOutcome::Prompted => Counts::new(0, 1, 0),
            TrialOutcome::Independent => Counts::new(0, 0, 1),
        }
    }

    /// Independent trials as a rounded percentage of the total (0 when empty)
    pub fn independence_ratio(&self) -> u32 {
        rounded_percent(self.independent, self.total())
    }
}

impl Add for Counts {
    type Output = Counts;

    fn add(self, rhs: Counts) -> Counts {
        Counts {
            error: self.error + rhs.error,
            prompted: self.prompted + rhs.prompted,
            independent: self.independent + rhs.independent,
        }
    }
}

impl Sum for Counts {
    fn sum<I: Iterator<Item = Counts>>(iter: I) -> Self {
        iter.fold(Counts::default(), Add::add)
    }
}

/// `part / whole * 100`, rounded half-up on the percentage. Returns 0 when `whole` is 0.
///
/// Integer arithmetic keeps `.5` boundaries exact.
pub fn rounded_percent(part: u32, whole: u32) -> u32 {
    if whole == 0 {
        return 0;
    }
    let (part, whole) = (u64::from(part), u64::from(whole));
    ((200 * part + whole) / (2 * whole)) as u32
}

/// Ratio-family status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatioStatus {
    #[serde(rename = "insuficiente")]
    Insufficient,
    #[serde(rename = "positivo")]
    Positive,
    #[serde(rename = "mediano")]
    Moderate,
    #[serde(rename = "atencao")]
    Attention,
    #[serde(rename = "critico")]
    Critical,
}

impl RatioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatioStatus::Insufficient => "insuficiente",
            RatioStatus::Positive => "positivo",
            RatioStatus::Moderate => "mediano",
            RatioStatus::Attention => "atencao",
            RatioStatus::Critical => "critico",
        }
    }

    /// Display label used on badges and reports
    pub fn label(&self) -> &'static str {
        match self {
            RatioStatus::Insufficient => "Insuficiente",
            RatioStatus::Positive => "Positivo",
            RatioStatus::Moderate => "Mediano",
            RatioStatus::Attention => "Atenção",
            RatioStatus::Critical => "Crítico",
        }
    }

    /// Rank within the attention whitelist; lower is more severe.
    /// `None` for statuses that never appear on attention lists.
    pub fn severity_rank(&self) -> Option<u8> {
        match self {
            RatioStatus::Critical => Some(0),
            RatioStatus::Attention => Some(1),
            _ => None,
        }
    }

    pub fn needs_attention(&self) -> bool {
        self.severity_rank().is_some()
    }
}

impl fmt::Display for RatioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predominance-family status: the outcome recorded most often
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredominantOutcome {
    #[serde(rename = "desempenhou")]
    Performed,
    #[serde(rename = "desempenhou_com_ajuda")]
    PerformedWithHelp,
    #[serde(rename = "nao_desempenhou")]
    NotPerformed,
}

impl PredominantOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredominantOutcome::Performed => "desempenhou",
            PredominantOutcome::PerformedWithHelp => "desempenhou_com_ajuda",
            PredominantOutcome::NotPerformed => "nao_desempenhou",
        }
    }

    /// The trial outcome this status stands for
    pub fn outcome(&self) -> TrialOutcome {
        match self {
            PredominantOutcome::Performed => TrialOutcome::Independent,
            PredominantOutcome::PerformedWithHelp => TrialOutcome::Prompted,
            PredominantOutcome::NotPerformed => TrialOutcome::Error,
        }
    }
}

impl From<TrialOutcome> for PredominantOutcome {
    fn from(outcome: TrialOutcome) -> Self {
        match outcome {
            TrialOutcome::Independent => PredominantOutcome::Performed,
            TrialOutcome::Prompted => PredominantOutcome::PerformedWithHelp,
            TrialOutcome::Error => PredominantOutcome::NotPerformed,
        }
    }
}

/// Status of a stimulus under either rule family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Status {
    Ratio(RatioStatus),
    Predominance(PredominantOutcome),
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ratio(status) => status.as_str(),
            Status::Predominance(outcome) => outcome.as_str(),
        }
    }

    /// Ratio status, if this status came from the ratio family
    pub fn ratio(&self) -> Option<RatioStatus> {
        match self {
            Status::Ratio(status) => Some(*status),
            Status::Predominance(_) => None,
        }
    }
}

/// Per-stimulus result built for one rendering pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StimulusSummary {
    pub stimulus_id: String,
    pub stimulus_label: String,
    pub counts: Counts,
    /// erro + ajuda + indep
    pub total: u32,
    /// Rounded independence percentage (0-100)
    pub independence_ratio: u32,
    pub status: Status,
}

/// Session-level scalars
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Accuracy under the selected accuracy policy (0-100)
    pub overall_accuracy: u32,
    /// Independent trials as a percentage of all trials (0-100)
    pub independence_rate: u32,
    pub total_attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_tags() {
        assert_eq!("erro".parse::<TrialOutcome>().unwrap(), TrialOutcome::Error);
        assert_eq!(
            "desempenhouComAjuda".parse::<TrialOutcome>().unwrap(),
            TrialOutcome::Prompted
        );
        assert_eq!(
            "acerto".parse::<TrialOutcome>().unwrap(),
            TrialOutcome::Independent
        );
        assert_eq!(
            "desempenhou".parse::<TrialOutcome>().unwrap(),
            TrialOutcome::Independent
        );

        let err = "maybe".parse::<TrialOutcome>().unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_outcome_serde() {
        let outcome: TrialOutcome = serde_json::from_str(r#""naoDesempenhou""#).unwrap();
        assert_eq!(outcome, TrialOutcome::Error);
        assert_eq!(serde_json::to_string(&outcome).unwrap(), r#""error""#);

        assert!(serde_json::from_str::<TrialOutcome>(r#""partial""#).is_err());
    }

    #[test]
    fn test_outcome_try_from_string() {
        assert_eq!(
            TrialOutcome::try_from("ajuda".to_string()),
            Ok(TrialOutcome::Prompted)
        );
        assert_eq!(
            TrialOutcome::try_from("partial".to_string()),
            Err(ValidationError::UnknownOutcome {
                tag: "partial".to_string(),
                session_id: None,
                index: None,
            })
        );
    }

    #[test]
    fn test_counts_wire_names() {
        let counts = Counts::new(1, 2, 3);
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["erro"], 1);
        assert_eq!(json["ajuda"], 2);
        assert_eq!(json["indep"], 3);
    }

    #[test]
    fn test_counts_increment_is_pure() {
        let before = Counts::new(1, 1, 1);
        let after = before.increment(TrialOutcome::Independent);
        assert_eq!(before, Counts::new(1, 1, 1));
        assert_eq!(after, Counts::new(1, 1, 2));
        assert_eq!(after.total(), 4);
    }

    #[test]
    fn test_counts_sum() {
        let total: Counts = vec![Counts::new(1, 0, 2), Counts::new(0, 3, 1)]
            .into_iter()
            .sum();
        assert_eq!(total, Counts::new(1, 3, 3));
    }

    #[test]
    fn test_rounded_percent_half_up() {
        assert_eq!(rounded_percent(0, 0), 0);
        assert_eq!(rounded_percent(1, 8), 13); // 12.5
        assert_eq!(rounded_percent(3, 8), 38); // 37.5
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(3, 5), 60);
        assert_eq!(rounded_percent(7, 7), 100);
    }

    #[test]
    fn test_status_serializes_flat() {
        let ratio = Status::Ratio(RatioStatus::Attention);
        let predominance = Status::Predominance(PredominantOutcome::PerformedWithHelp);
        assert_eq!(serde_json::to_string(&ratio).unwrap(), r#""atencao""#);
        assert_eq!(
            serde_json::to_string(&predominance).unwrap(),
            r#""desempenhou_com_ajuda""#
        );

        let parsed: Status = serde_json::from_str(r#""critico""#).unwrap();
        assert_eq!(parsed, Status::Ratio(RatioStatus::Critical));
    }

    #[test]
    fn test_severity_rank() {
        assert!(RatioStatus::Critical.severity_rank() < RatioStatus::Attention.severity_rank());
        assert!(!RatioStatus::Moderate.needs_attention());
        assert!(!RatioStatus::Insufficient.needs_attention());
    }
}

//! Therapy disciplines and their outcome vocabulary
//!
//! All disciplines share one [`TrialOutcome`] type; only the labels shown to
//! clinicians and the default classifier family differ.

use crate::classify::ClassifierFamily;
use crate::types::{PredominantOutcome, Status, TrialOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Therapy discipline a program belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// Fonoaudiologia
    #[default]
    SpeechTherapy,
    /// Terapia ocupacional
    OccupationalTherapy,
    /// Fisioterapia
    Physiotherapy,
    /// Musicoterapia
    MusicTherapy,
}

/// Display labels for the three outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeLabels {
    pub error: &'static str,
    pub prompted: &'static str,
    pub independent: &'static str,
}

impl OutcomeLabels {
    pub fn get(&self, outcome: TrialOutcome) -> &'static str {
        match outcome {
            TrialOutcome::Error => self.error,
            TrialOutcome::Prompted => self.prompted,
            TrialOutcome::Independent => self.independent,
        }
    }
}

const SPEECH_LABELS: OutcomeLabels = OutcomeLabels {
    error: "Erro",
    prompted: "Ajuda",
    independent: "Independente",
};

const PERFORMANCE_LABELS: OutcomeLabels = OutcomeLabels {
    error: "Não desempenhou",
    prompted: "Desempenhou com ajuda",
    independent: "Desempenhou",
};

const MUSIC_LABELS: OutcomeLabels = OutcomeLabels {
    error: "Erro",
    prompted: "Ajuda",
    independent: "Acerto",
};

impl Discipline {
    pub const ALL: [Discipline; 4] = [
        Discipline::SpeechTherapy,
        Discipline::OccupationalTherapy,
        Discipline::Physiotherapy,
        Discipline::MusicTherapy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::SpeechTherapy => "speech_therapy",
            Discipline::OccupationalTherapy => "occupational_therapy",
            Discipline::Physiotherapy => "physiotherapy",
            Discipline::MusicTherapy => "music_therapy",
        }
    }

    /// Outcome labels shown for this discipline
    pub fn outcome_labels(&self) -> OutcomeLabels {
        match self {
            Discipline::SpeechTherapy => SPEECH_LABELS,
            Discipline::OccupationalTherapy | Discipline::Physiotherapy => PERFORMANCE_LABELS,
            Discipline::MusicTherapy => MUSIC_LABELS,
        }
    }

    /// Rule family this discipline's screens classify stimuli with
    pub fn classifier_family(&self) -> ClassifierFamily {
        match self {
            Discipline::SpeechTherapy | Discipline::MusicTherapy => ClassifierFamily::Ratio,
            Discipline::OccupationalTherapy | Discipline::Physiotherapy => {
                ClassifierFamily::Predominance
            }
        }
    }

    /// Display label for a status under this discipline's vocabulary
    pub fn status_label(&self, status: Status) -> &'static str {
        match status {
            Status::Ratio(status) => status.label(),
            Status::Predominance(outcome) => self.predominance_label(outcome),
        }
    }

    fn predominance_label(&self, outcome: PredominantOutcome) -> &'static str {
        self.outcome_labels().get(outcome.outcome())
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RatioStatus;

    #[test]
    fn test_performance_vocabulary() {
        let labels = Discipline::OccupationalTherapy.outcome_labels();
        assert_eq!(labels.get(TrialOutcome::Error), "Não desempenhou");
        assert_eq!(labels.get(TrialOutcome::Prompted), "Desempenhou com ajuda");
        assert_eq!(labels.get(TrialOutcome::Independent), "Desempenhou");
        assert_eq!(labels, Discipline::Physiotherapy.outcome_labels());
    }

    #[test]
    fn test_music_vocabulary() {
        let labels = Discipline::MusicTherapy.outcome_labels();
        assert_eq!(labels.get(TrialOutcome::Independent), "Acerto");
    }

    #[test]
    fn test_classifier_family() {
        assert_eq!(
            Discipline::SpeechTherapy.classifier_family(),
            ClassifierFamily::Ratio
        );
        assert_eq!(
            Discipline::OccupationalTherapy.classifier_family(),
            ClassifierFamily::Predominance
        );
    }

    #[test]
    fn test_status_labels() {
        let speech = Discipline::SpeechTherapy;
        assert_eq!(speech.status_label(Status::Ratio(RatioStatus::Attention)), "Atenção");

        let ot = Discipline::OccupationalTherapy;
        assert_eq!(
            ot.status_label(Status::Predominance(PredominantOutcome::PerformedWithHelp)),
            "Desempenhou com ajuda"
        );
    }

    #[test]
    fn test_discipline_serde() {
        let d: Discipline = serde_json::from_str(r#""music_therapy""#).unwrap();
        assert_eq!(d, Discipline::MusicTherapy);
        for discipline in Discipline::ALL {
            let json = serde_json::to_string(&discipline).unwrap();
            assert_eq!(json, format!("\"{}\"", discipline.as_str()));
        }
    }
}

//! Engine configuration
//!
//! Screens differ in which ratio thresholds and accuracy definition they use.
//! Each screen is a [`CallSite`] with its own defaults; [`EngineConfig`] can
//! override them globally.

use crate::aggregate::MissingStimulusPolicy;
use crate::classify::{ClassifierFamily, RatioClassificationPolicy};
use crate::error::ProgressError;
use crate::labels::Discipline;
use crate::summary::AccuracyPolicy;
use crate::window::WindowSize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screen that requests a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSite {
    /// Live trial registration
    SessionRegistration,
    /// Preview of the last session before starting a new one
    LastSessionPreview,
    /// Session history list
    SessionsList,
    /// Multi-session attention report
    AttentionReport,
}

impl CallSite {
    pub const ALL: [CallSite; 4] = [
        CallSite::SessionRegistration,
        CallSite::LastSessionPreview,
        CallSite::SessionsList,
        CallSite::AttentionReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallSite::SessionRegistration => "session_registration",
            CallSite::LastSessionPreview => "last_session_preview",
            CallSite::SessionsList => "sessions_list",
            CallSite::AttentionReport => "attention_report",
        }
    }

    pub fn default_ratio_policy(&self) -> RatioClassificationPolicy {
        match self {
            CallSite::AttentionReport => RatioClassificationPolicy::inclusive_five_way(),
            _ => RatioClassificationPolicy::strict_four_way(),
        }
    }

    pub fn default_accuracy_policy(&self) -> AccuracyPolicy {
        match self {
            CallSite::SessionRegistration | CallSite::LastSessionPreview => AccuracyPolicy::Strict,
            CallSite::SessionsList | CallSite::AttentionReport => AccuracyPolicy::Credited,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine-wide settings, loaded from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub discipline: Discipline,
    #[serde(default)]
    pub window_size: WindowSize,
    #[serde(default)]
    pub missing_stimulus: MissingStimulusPolicy,
    /// Overrides every call site's ratio policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratio_policy: Option<RatioClassificationPolicy>,
    /// Overrides every call site's accuracy policy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_policy: Option<AccuracyPolicy>,
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ProgressError> {
        serde_json::from_str(json).map_err(|e| ProgressError::ConfigError(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, ProgressError> {
        serde_json::to_string_pretty(self).map_err(|e| ProgressError::EncodingError(e.to_string()))
    }

    /// Effective ratio policy for a call site
    pub fn ratio_policy_for(&self, site: CallSite) -> RatioClassificationPolicy {
        self.ratio_policy.unwrap_or_else(|| site.default_ratio_policy())
    }

    /// Effective accuracy policy for a call site
    pub fn accuracy_policy_for(&self, site: CallSite) -> AccuracyPolicy {
        self.accuracy_policy.unwrap_or_else(|| site.default_accuracy_policy())
    }

    /// Classifier family for a call site. The attention report always ranks
    /// stimuli by ratio.
    pub fn classifier_family_for(&self, site: CallSite) -> ClassifierFamily {
        match site {
            CallSite::AttentionReport => ClassifierFamily::Ratio,
            _ => self.discipline.classifier_family(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_call_site_defaults() {
        let config = EngineConfig::default();

        assert_eq!(
            config.ratio_policy_for(CallSite::SessionRegistration),
            RatioClassificationPolicy::strict_four_way()
        );
        assert_eq!(
            config.ratio_policy_for(CallSite::AttentionReport),
            RatioClassificationPolicy::inclusive_five_way()
        );
        assert_eq!(
            config.accuracy_policy_for(CallSite::LastSessionPreview),
            AccuracyPolicy::Strict
        );
        assert_eq!(
            config.accuracy_policy_for(CallSite::SessionsList),
            AccuracyPolicy::Credited
        );
    }

    #[test]
    fn test_overrides_apply_to_every_site() {
        let config = EngineConfig {
            ratio_policy: Some(RatioClassificationPolicy::inclusive_five_way()),
            accuracy_policy: Some(AccuracyPolicy::Strict),
            ..Default::default()
        };
        for site in CallSite::ALL {
            assert_eq!(
                config.ratio_policy_for(site),
                RatioClassificationPolicy::inclusive_five_way()
            );
            assert_eq!(config.accuracy_policy_for(site), AccuracyPolicy::Strict);
        }
    }

    #[test]
    fn test_classifier_family_per_site() {
        let config = EngineConfig {
            discipline: Discipline::Physiotherapy,
            ..Default::default()
        };
        assert_eq!(
            config.classifier_family_for(CallSite::SessionsList),
            ClassifierFamily::Predominance
        );
        assert_eq!(
            config.classifier_family_for(CallSite::AttentionReport),
            ClassifierFamily::Ratio
        );
    }

    #[test]
    fn test_from_json_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.window_size, WindowSize::Three);
        assert_eq!(config.discipline, Discipline::SpeechTherapy);
        assert_eq!(config.missing_stimulus, MissingStimulusPolicy::Reject);
    }

    #[test]
    fn test_from_json_full() {
        let json = r#"{
            "discipline": "occupational_therapy",
            "window_size": 5,
            "missing_stimulus": "bucket",
            "accuracy_policy": "credited"
        }"#;
        let config = EngineConfig::from_json(json).unwrap();
        assert_eq!(config.discipline, Discipline::OccupationalTherapy);
        assert_eq!(config.window_size, WindowSize::Five);
        assert_eq!(config.missing_stimulus, MissingStimulusPolicy::Bucket);
        assert_eq!(config.accuracy_policy, Some(AccuracyPolicy::Credited));

        let round_trip = EngineConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(matches!(
            EngineConfig::from_json(r#"{"window": 3}"#),
            Err(ProgressError::ConfigError(_))
        ));
        assert!(matches!(
            EngineConfig::from_json(r#"{"window_size": 4}"#),
            Err(ProgressError::ConfigError(_))
        ));
    }
}

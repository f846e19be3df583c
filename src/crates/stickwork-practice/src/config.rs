use serde::{Deserialize, Serialize};

use stickwork_core::{ms_per_beat, DrumKit};

use crate::error::{PracticeError, Result};

/// Settings for one practice session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    /// Largest timing error, either side, that still counts as a hit
    pub tolerance_ms: f64,
    /// Input latency subtracted from every hit; may be negative
    pub latency_ms: f64,
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Hits this close to the expected time count as perfect
    pub perfect_window_ms: f64,
    /// Voice to MIDI note table
    pub kit: DrumKit,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            tolerance_ms: 100.0,
            latency_ms: 0.0,
            bpm: 120.0,
            perfect_window_ms: 25.0,
            kit: DrumKit::default(),
        }
    }
}

impl PracticeConfig {
    /// Load a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PracticeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    pub fn with_tolerance(mut self, tolerance_ms: f64) -> Self {
        self.tolerance_ms = tolerance_ms;
        self
    }

    pub fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_kit(mut self, kit: DrumKit) -> Self {
        self.kit = kit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ms_per_beat(self.bpm)?;
        if !self.tolerance_ms.is_finite() || self.tolerance_ms < 0.0 {
            return Err(PracticeError::InvalidConfig(format!(
                "tolerance must be a non-negative number of milliseconds, got {}",
                self.tolerance_ms
            )));
        }
        if !self.perfect_window_ms.is_finite() || self.perfect_window_ms < 0.0 {
            return Err(PracticeError::InvalidConfig(format!(
                "perfect window must be a non-negative number of milliseconds, got {}",
                self.perfect_window_ms
            )));
        }
        if !self.latency_ms.is_finite() {
            return Err(PracticeError::InvalidConfig(format!(
                "latency must be finite, got {}",
                self.latency_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stickwork_core::VoiceId;

    #[test]
    fn test_defaults() {
        let config = PracticeConfig::default();
        assert_eq!(config.tolerance_ms, 100.0);
        assert_eq!(config.latency_ms, 0.0);
        assert_eq!(config.bpm, 120.0);
        assert_eq!(config.perfect_window_ms, 25.0);
        assert_eq!(config.kit.note_for(VoiceId::Kick), Some(36));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = PracticeConfig::from_json_str(r#"{"bpm": 90, "latency_ms": -12.5}"#).unwrap();
        assert_eq!(config.bpm, 90.0);
        assert_eq!(config.latency_ms, -12.5);
        assert_eq!(config.tolerance_ms, 100.0);

        let empty = PracticeConfig::from_json_str("{}").unwrap();
        assert_eq!(empty, PracticeConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            PracticeConfig::from_json_str(r#"{"bpm": 0}"#),
            Err(PracticeError::Timing(_))
        ));
        assert!(matches!(
            PracticeConfig::from_json_str(r#"{"tolerance_ms": -1}"#),
            Err(PracticeError::InvalidConfig(_))
        ));
        assert!(matches!(
            PracticeConfig::from_json_str("not json"),
            Err(PracticeError::ConfigJson(_))
        ));
    }
}

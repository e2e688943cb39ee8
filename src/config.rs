//! Persisted review configuration.
//!
//! A flat record of named numeric fields plus the optional calibration
//! sub-record, round-tripped through JSON. Validation reports findings as
//! strings rather than erroring: a review session shows them to the user
//! and decides whether to proceed.

use serde::{Deserialize, Serialize};

use crate::calibration::PitchCalibration;
use crate::lbw::STUMP_HEIGHT_M;

/// Full pitch length between the two bowling creases, meters.
pub const PITCH_LENGTH_M: f64 = 20.12;
/// Prepared pitch width, meters.
pub const PITCH_WIDTH_M: f64 = 3.05;

/// Numeric setup of one review session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewConfig {
    pub pitch_length_m: f64,
    pub pitch_width_m: f64,
    pub stump_height_m: f64,
    /// Camera height above the pitch surface.
    pub camera_height_m: f64,
    /// Camera distance behind the bowler-end stumps.
    pub camera_distance_m: f64,
    /// Camera offset from the pitch center line, signed.
    pub camera_lateral_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<PitchCalibration>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            pitch_length_m: PITCH_LENGTH_M,
            pitch_width_m: PITCH_WIDTH_M,
            stump_height_m: STUMP_HEIGHT_M,
            camera_height_m: 1.6,
            camera_distance_m: 6.0,
            camera_lateral_m: 0.0,
            calibration: None,
        }
    }
}

impl ReviewConfig {
    /// Parse from JSON text.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str(text).map_err(|e| format!("invalid review config: {e}"))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("serialize review config: {e}"))
    }

    /// Range-check every field, returning one finding per violation. An
    /// empty list means the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut findings = Vec::new();
        let positive = [
            ("pitch_length_m", self.pitch_length_m),
            ("pitch_width_m", self.pitch_width_m),
            ("stump_height_m", self.stump_height_m),
            ("camera_height_m", self.camera_height_m),
            ("camera_distance_m", self.camera_distance_m),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                findings.push(format!("{name} must be a positive number, got {value}"));
            }
        }
        if !self.camera_lateral_m.is_finite() {
            findings.push(format!(
                "camera_lateral_m must be finite, got {}",
                self.camera_lateral_m
            ));
        }
        if let Some(cal) = &self.calibration {
            if cal.corners.iter().flatten().any(|v| !v.is_finite()) {
                findings.push("calibration corners contain non-finite values".to_string());
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_config_is_valid() {
        assert!(ReviewConfig::default().validate().is_empty());
    }

    #[test]
    fn json_round_trip_is_lossless() {
        let cfg = ReviewConfig {
            camera_height_m: 1.85,
            camera_lateral_m: -0.4,
            calibration: Some(PitchCalibration::from_pixel_corners([
                [150.0, 850.0],
                [650.0, 850.0],
                [530.0, 150.0],
                [270.0, 150.0],
            ])),
            ..ReviewConfig::default()
        };
        let text = cfg.to_json().unwrap();
        let back = ReviewConfig::from_json(&text).unwrap();
        assert_relative_eq!(back.camera_height_m, 1.85);
        assert_relative_eq!(back.camera_lateral_m, -0.4);
        assert_relative_eq!(back.pitch_length_m, PITCH_LENGTH_M);
        let cal = back.calibration.expect("calibration survives");
        assert_relative_eq!(cal.corners[0][0], 150.0);
    }

    #[test]
    fn findings_name_the_field() {
        let cfg = ReviewConfig {
            pitch_length_m: -1.0,
            camera_lateral_m: f64::NAN,
            ..ReviewConfig::default()
        };
        let findings = cfg.validate();
        assert_eq!(findings.len(), 2);
        assert!(findings[0].contains("pitch_length_m"));
        assert!(findings[1].contains("camera_lateral_m"));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(ReviewConfig::from_json("{\"pitch_length_m\": \"long\"}").is_err());
    }
}

//! LBW assessment from the pitch-plane track.
//!
//! Fixed ICC dimensions, three boolean line checks, and a three-way decision
//! from the predicted lateral offset at the stumps plane. The human-readable
//! reason follows real adjudication order: pitching first, then impact line,
//! then the wicket zone.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::LbwError;
use crate::trajectory::{fit_lateral_trend, LATERAL_FIT_WINDOW};
use crate::types::PitchPlanePoint;

/// Wicket width, meters (9 in).
pub const WICKET_WIDTH_M: f64 = 0.2286;
/// Cricket ball radius, meters.
pub const BALL_RADIUS_M: f64 = 0.036;
/// Stump height, meters (28 in).
pub const STUMP_HEIGHT_M: f64 = 0.71;
/// Slack added to the wicket half-width for the line checks.
pub const LINE_TOLERANCE_M: f64 = BALL_RADIUS_M;
/// Width of the umpire's-call band beyond the wicket half-width.
pub const UMPIRES_CALL_ZONE_M: f64 = BALL_RADIUS_M;

/// Slack for threshold comparisons. The predicted lateral comes out of a
/// least-squares solve whose rounding noise must not flip a prediction
/// sitting exactly on a boundary.
const THRESHOLD_EPS: f64 = 1e-9;

/// Three-way LBW verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Out,
    NotOut,
    UmpiresCall,
}

/// Full assessment result, serialized into the tracking payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LbwAssessment {
    pub decision: Decision,
    pub pitching_in_line: bool,
    pub impact_in_line: bool,
    pub wickets_hitting: bool,
    /// Predicted lateral offset at the stumps plane, meters.
    pub predicted_lateral_m: f64,
    pub reason: String,
}

/// Assess LBW from the pitch-plane track and the two event indices.
///
/// `pitch_index` marks the bounce sample and `impact_index` the pad impact;
/// the impact must come strictly after the pitch. The lateral offset at the
/// stumps is predicted by the trailing linear fit, falling back to the
/// impact sample's lateral value when the fit is degenerate.
pub fn assess(
    track: &[PitchPlanePoint],
    pitch_index: usize,
    impact_index: usize,
) -> Result<LbwAssessment, LbwError> {
    if track.is_empty() {
        return Err(LbwError::EmptyTrack);
    }
    let n = track.len();
    if pitch_index >= n {
        return Err(LbwError::IndexOutOfRange {
            which: "pitch",
            index: pitch_index,
            len: n,
        });
    }
    if impact_index >= n {
        return Err(LbwError::IndexOutOfRange {
            which: "impact",
            index: impact_index,
            len: n,
        });
    }
    if impact_index <= pitch_index {
        return Err(LbwError::ImpactNotAfterPitch {
            pitch: pitch_index,
            impact: impact_index,
        });
    }

    let pitch = &track[pitch_index];
    let impact = &track[impact_index];

    let predicted_lateral_m =
        match fit_lateral_trend(track, pitch_index, impact_index, LATERAL_FIT_WINDOW) {
            Some(fit) => fit.at_stumps(),
            None => {
                debug!("lateral fit unavailable; using impact lateral {:.4}", impact.y_m);
                impact.y_m
            }
        };

    let half_width = WICKET_WIDTH_M / 2.0;
    let line_limit = half_width + LINE_TOLERANCE_M + THRESHOLD_EPS;
    let pitching_in_line = pitch.y_m.abs() <= line_limit;
    let impact_in_line = impact.y_m.abs() <= line_limit;
    let wickets_hitting = predicted_lateral_m.abs() <= line_limit;

    let offset = predicted_lateral_m.abs();
    let zone_decision = if offset <= half_width + THRESHOLD_EPS {
        Decision::Out
    } else if offset <= half_width + UMPIRES_CALL_ZONE_M + THRESHOLD_EPS {
        Decision::UmpiresCall
    } else {
        Decision::NotOut
    };

    // Adjudication order: a failed pitching or impact check overrides the
    // wicket-zone outcome.
    let (decision, reason) = if !pitching_in_line {
        (Decision::NotOut, "NOT OUT — pitched outside line")
    } else if !impact_in_line {
        (Decision::NotOut, "NOT OUT — impact outside line")
    } else {
        match zone_decision {
            Decision::Out => (Decision::Out, "OUT — hitting the stumps"),
            Decision::UmpiresCall => (Decision::UmpiresCall, "UMPIRE'S CALL — clipping the stumps"),
            Decision::NotOut => (Decision::NotOut, "NOT OUT — missing the stumps"),
        }
    };

    Ok(LbwAssessment {
        decision,
        pitching_in_line,
        impact_in_line,
        wickets_hitting,
        predicted_lateral_m,
        reason: reason.to_string(),
    })
}

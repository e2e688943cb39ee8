//! Error taxonomy for the tracking pipeline.
//!
//! Four families, mirroring how failures are handled:
//! - validation errors ([`CalibrationError`], malformed requests) are local
//!   and never silently recovered;
//! - numerical failures ([`HomographyError::Singular`]) surface as a distinct
//!   fault so callers can ask the user to recalibrate;
//! - resource failures ([`TrackingError::DecodeExhausted`]) are retried with
//!   backoff before being surfaced;
//! - precondition failures ([`LbwError`]) are fatal to the call.

use thiserror::Error;

/// Homography solve and transform failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HomographyError {
    #[error("homography requires exactly {needed} correspondences, got {got}")]
    PointCount { needed: usize, got: usize },
    #[error("homography system is singular (pivot below 1e-10); recalibration required")]
    Singular,
}

/// Calibration quadrilateral validation failures. Each variant names the
/// check that failed so the UI can show an actionable message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("calibration requires exactly 4 corner points, got {0}")]
    CornerCount(usize),
    #[error("tapped corners are nearly degenerate: area {area:.1} px² is below {min_area:.0} px²")]
    DegenerateArea { area: f64, min_area: f64 },
    #[error("corner {index} is collinear with its neighbours; re-tap the pitch corners")]
    CollinearCorners { index: usize },
    #[error("corners are not in convex order (crossed quadrilateral); tap them going around the pitch")]
    NonConvex,
    #[error("normalized corners require a source image size")]
    MissingImageSize,
}

/// Failures while acquiring and tracking frames.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackingError {
    #[error("invalid segment: start {start_ms} ms, end {end_ms} ms")]
    InvalidSegment { start_ms: i64, end_ms: i64 },
    #[error("frame decode failed at {time_ms} ms after {attempts} attempts: {last}")]
    DecodeExhausted {
        time_ms: i64,
        attempts: u32,
        last: String,
    },
    #[error("tracking session was disposed")]
    Disposed,
    #[error("tracking produced no points")]
    EmptyTrack,
    #[error("seed pixel ({x:.1}, {y:.1}) lies outside the {width}x{height} frame")]
    SeedOutOfFrame {
        x: f64,
        y: f64,
        width: usize,
        height: usize,
    },
}

/// Precondition failures of the LBW engine and height model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LbwError {
    #[error("ball track is empty")]
    EmptyTrack,
    #[error("{which} index {index} is out of range for a track of {len} points")]
    IndexOutOfRange {
        which: &'static str,
        index: usize,
        len: usize,
    },
    #[error("impact index {impact} must come after pitch index {pitch}")]
    ImpactNotAfterPitch { pitch: usize, impact: usize },
}

/// Terminal error of one tracking run. A run fails as a whole with a single
/// error; per-frame hiccups that were recovered end up as warnings in the
/// outcome instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
    #[error(transparent)]
    Homography(#[from] HomographyError),
    #[error(transparent)]
    Tracking(#[from] TrackingError),
    #[error(transparent)]
    Lbw(#[from] LbwError),
}

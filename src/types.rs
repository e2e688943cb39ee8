//! Shared pipeline entities.
//!
//! Every type here is produced by exactly one pipeline stage and consumed
//! read-only downstream; nothing is mutated after construction.

use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

/// One measured or estimated ball position in the image plane.
///
/// `confidence` is 1.0 only when the position comes from a direct detection;
/// coasted (predicted-only) samples carry a reduced confidence.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrackPoint {
    pub t_ms: i64,
    pub x_px: f64,
    pub y_px: f64,
    pub confidence: f64,
}

/// A track sample mapped into pitch-plane meters.
///
/// The origin sits at the striker's stumps; `x_m` increases toward the
/// bowler's end, `y_m` is lateral across the pitch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PitchPlanePoint {
    pub t_ms: i64,
    pub x_m: f64,
    pub y_m: f64,
}

/// A reconstructed 3D trajectory sample (pitch-plane position plus a
/// synthesized height).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TrajectoryPoint3D {
    pub t_ms: i64,
    pub x_m: f64,
    pub y_m: f64,
    pub z_m: f64,
}

impl TrajectoryPoint3D {
    pub fn from_plane(p: PitchPlanePoint, z_m: f64) -> Self {
        Self {
            t_ms: p.t_ms,
            x_m: p.x_m,
            y_m: p.y_m,
            z_m,
        }
    }
}

/// A bounce or impact frame estimate with the confidence of its source
/// (1.0 for caller-supplied overrides, lower for heuristics).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EventEstimate {
    pub index: usize,
    pub confidence: f64,
}

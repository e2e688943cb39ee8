//! Piecewise vertical profile for the tracked ball.
//!
//! Height is synthesized in three regimes anchored at the bounce and impact
//! indices: a linear descent from the release height to ball-radius height,
//! a low parabolic arc between bounce and impact peaking at 1.3× the impact
//! height, and a linear decay after impact. A geometric approximation, not
//! an integrated projectile model: the anchors come from observed samples,
//! the shape between them is parametric.

use crate::error::LbwError;
use crate::lbw::BALL_RADIUS_M;
use crate::types::{PitchPlanePoint, TrajectoryPoint3D};

/// Tunables of the piecewise height model, meters.
#[derive(Clone, Copy, Debug)]
pub struct HeightModelParams {
    /// Height at the first tracked sample (typical delivery release).
    pub release_height_m: f64,
    /// Height at the impact sample (typical pad height).
    pub impact_height_m: f64,
    /// Peak of the bounce-to-impact arc as a multiple of the impact height.
    pub loft_factor: f64,
}

impl Default for HeightModelParams {
    fn default() -> Self {
        Self {
            release_height_m: 2.2,
            impact_height_m: 0.45,
            loft_factor: 1.3,
        }
    }
}

/// Attach a height to every pitch-plane sample.
///
/// `bounce_index` and `impact_index` must lie inside the track and satisfy
/// `bounce < impact`. The returned profile is non-increasing up to the
/// bounce, has a single interior maximum strictly between bounce and impact,
/// and decays linearly (clamped at zero) afterwards.
pub fn synthesize_heights(
    track: &[PitchPlanePoint],
    bounce_index: usize,
    impact_index: usize,
    params: &HeightModelParams,
) -> Result<Vec<TrajectoryPoint3D>, LbwError> {
    if track.is_empty() {
        return Err(LbwError::EmptyTrack);
    }
    let n = track.len();
    if bounce_index >= n {
        return Err(LbwError::IndexOutOfRange {
            which: "bounce",
            index: bounce_index,
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
    if impact_index <= bounce_index {
        return Err(LbwError::ImpactNotAfterPitch {
            pitch: bounce_index,
            impact: impact_index,
        });
    }

    let out = track
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let z = height_at(i, bounce_index, impact_index, n, params);
            TrajectoryPoint3D::from_plane(*p, z)
        })
        .collect();
    Ok(out)
}

fn height_at(
    i: usize,
    bounce: usize,
    impact: usize,
    n: usize,
    params: &HeightModelParams,
) -> f64 {
    if i <= bounce {
        // Release down to ball radius at the bounce sample.
        if bounce == 0 {
            return BALL_RADIUS_M;
        }
        let s = i as f64 / bounce as f64;
        params.release_height_m + s * (BALL_RADIUS_M - params.release_height_m)
    } else if i <= impact {
        // Parabola through (0, radius) and (1, impact height) whose maximum
        // is loft_factor times the impact height, strictly inside the arc.
        let s = (i - bounce) as f64 / (impact - bounce) as f64;
        let h_imp = params.impact_height_m;
        let rise = h_imp - BALL_RADIUS_M;
        let peak_rise = params.loft_factor * h_imp - BALL_RADIUS_M;
        let z = if peak_rise > rise.max(0.0) {
            let b = 2.0 * peak_rise + 2.0 * (peak_rise * (peak_rise - rise)).sqrt();
            let a = -b * b / (4.0 * peak_rise);
            BALL_RADIUS_M + b * s + a * s * s
        } else {
            BALL_RADIUS_M + s * rise
        };
        z.max(BALL_RADIUS_M)
    } else {
        // Linear decay toward zero past impact, never negative.
        let span = (n - 1 - impact).max(1) as f64;
        let s = (i - impact) as f64 / span;
        (params.impact_height_m * (1.0 - s)).max(0.0)
    }
}

//! Lateral-trend fit and stump-plane extrapolation.
//!
//! An ordinary least-squares line `y = a + b*x` over the trailing window of
//! pitch-plane samples ending at impact. Samples at or before the bounce
//! never enter the fit; the post-bounce path is what travels on to the
//! stumps. A degenerate fit returns `None` and callers fall back to the raw
//! impact lateral value.

use log::debug;

use crate::types::{PitchPlanePoint, TrajectoryPoint3D};

/// Default number of trailing samples in the lateral fit.
pub const LATERAL_FIT_WINDOW: usize = 10;

/// Denominator threshold below which the normal equations are treated as
/// degenerate (vertical cluster in x).
const FIT_DENOM_EPS: f64 = 1e-12;

/// Fitted lateral line `y = intercept + slope * x`.
#[derive(Clone, Copy, Debug)]
pub struct LinearFit {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearFit {
    /// Lateral position at along-pitch coordinate `x`.
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// Lateral position at the stumps plane, x = 0.
    pub fn at_stumps(&self) -> f64 {
        self.intercept
    }
}

/// OLS fit of `y` against `x` over up to `window` samples ending at
/// `impact_index`, excluding indices at or before `bounce_index` and any
/// non-finite samples. `None` when fewer than two valid points remain or
/// the x spread is degenerate.
pub fn fit_lateral_trend(
    track: &[PitchPlanePoint],
    bounce_index: usize,
    impact_index: usize,
    window: usize,
) -> Option<LinearFit> {
    if impact_index >= track.len() || window == 0 {
        return None;
    }
    let lo = impact_index
        .saturating_sub(window - 1)
        .max(bounce_index + 1);
    if lo > impact_index {
        return None;
    }

    let mut n = 0.0;
    let (mut sx, mut sy, mut sxx, mut sxy) = (0.0, 0.0, 0.0, 0.0);
    for p in &track[lo..=impact_index] {
        if !p.x_m.is_finite() || !p.y_m.is_finite() {
            continue;
        }
        n += 1.0;
        sx += p.x_m;
        sy += p.y_m;
        sxx += p.x_m * p.x_m;
        sxy += p.x_m * p.y_m;
    }
    if n < 2.0 {
        return None;
    }

    let denom = n * sxx - sx * sx;
    if denom.abs() < FIT_DENOM_EPS {
        debug!("lateral fit degenerate: x spread {denom:.3e} over {n} points");
        return None;
    }
    let slope = (n * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / n;
    Some(LinearFit { intercept, slope })
}

/// Extend the 3D trajectory from its trailing sample to the stumps plane.
///
/// The appended points continue from the last tracked sample (which may lie
/// past the impact when the impact index was overridden), so the combined
/// path never retraces up-pitch. Lateral positions follow `fit` when
/// present, otherwise they hold the impact sample's lateral value. Heights
/// follow the post-impact linear decay implied by the existing tail,
/// clamped non-negative; timestamps continue at the trailing sample
/// spacing. Returns the appended points only; a track already at or past
/// the stumps yields nothing.
pub fn extend_to_stumps(
    trajectory: &[TrajectoryPoint3D],
    impact_index: usize,
    fit: Option<&LinearFit>,
    steps: usize,
) -> Vec<TrajectoryPoint3D> {
    let Some(impact) = trajectory.get(impact_index) else {
        return Vec::new();
    };
    let Some(last) = trajectory.last() else {
        return Vec::new();
    };
    if !last.x_m.is_finite() || last.x_m <= 0.0 || steps == 0 {
        return Vec::new();
    }

    let dt_ms = trajectory
        .windows(2)
        .last()
        .map(|w| (w[1].t_ms - w[0].t_ms).max(1))
        .unwrap_or(33);
    // Per-step height decay taken from the existing post-impact tail, or a
    // full decay across the extension when the impact is the last sample.
    let dz = match trajectory.get(impact_index + 1) {
        Some(next) => (impact.z_m - next.z_m).max(0.0),
        None => impact.z_m / steps as f64,
    };
    let dx = last.x_m / steps as f64;

    let mut out = Vec::with_capacity(steps);
    for k in 1..=steps {
        let x = (last.x_m - dx * k as f64).max(0.0);
        let y = match fit {
            Some(f) => f.at(x),
            None => impact.y_m,
        };
        let z = (last.z_m - dz * k as f64).clamp(0.0, last.z_m.max(0.0));
        out.push(TrajectoryPoint3D {
            t_ms: last.t_ms + dt_ms * k as i64,
            x_m: x,
            y_m: y,
            z_m: z,
        });
    }
    out
}

//! Approximate camera pose for preview rendering.
//!
//! Derives yaw/tilt/roll from the calibration quad alone. The angles are
//! cosmetic: they drive the 3D preview overlay and are never consumed by the
//! physics or decision pipeline. Keep it that way.

use serde::Serialize;

use crate::types::ImageSize;

const YAW_LIMIT_DEG: f64 = 80.0;
const TILT_LIMIT_DEG: f64 = 35.0;
const ROLL_LIMIT_DEG: f64 = 30.0;
const EDGE_GAIN: f64 = 1.6;
const EDGE_EPS: f64 = 1e-9;

/// Approximate camera orientation, degrees. Preview-only.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct PosePreview {
    pub yaw_deg: f64,
    pub tilt_deg: f64,
    pub roll_deg: f64,
}

/// Estimate a preview pose from the four pitch corners.
///
/// Corners are ordered striker-left, striker-right, bowler-right,
/// bowler-left. When `image_size` is given the corners are normalized by it
/// first so the angles do not depend on resolution. Degenerate or non-finite
/// input yields the zero pose.
pub fn estimate_pose_preview(corners: &[[f64; 2]; 4], image_size: Option<ImageSize>) -> PosePreview {
    let mut pts = *corners;
    if let Some(size) = image_size {
        if size.width == 0 || size.height == 0 {
            return PosePreview::default();
        }
        for p in &mut pts {
            p[0] /= size.width as f64;
            p[1] /= size.height as f64;
        }
    }
    if pts.iter().flatten().any(|v| !v.is_finite()) {
        return PosePreview::default();
    }

    // Striker end is the bottom edge on screen, bowler end the top.
    let bottom = (pts[0], pts[1]);
    let top = (pts[3], pts[2]);
    let left = (pts[0], pts[3]);
    let right = (pts[1], pts[2]);

    let bottom_len = edge_length(bottom);
    let top_len = edge_length(top);
    let left_len = edge_length(left);
    let right_len = edge_length(right);

    let yaw_deg = {
        let top_mid_x = (top.0[0] + top.1[0]) / 2.0;
        let bottom_mid_x = (bottom.0[0] + bottom.1[0]) / 2.0;
        // Screen x grows rightward while yaw is positive to the left.
        let raw = -(top_mid_x - bottom_mid_x).atan().to_degrees();
        clamp_angle(raw, YAW_LIMIT_DEG)
    };

    let tilt_deg = edge_ratio_angle(bottom_len, top_len, TILT_LIMIT_DEG);
    let roll_deg = edge_ratio_angle(right_len, left_len, ROLL_LIMIT_DEG);

    PosePreview {
        yaw_deg,
        tilt_deg,
        roll_deg,
    }
}

fn edge_length((a, b): ([f64; 2], [f64; 2])) -> f64 {
    ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt()
}

/// Arctangent of the amplified relative difference of two edge lengths,
/// zero when the edges are degenerate.
fn edge_ratio_angle(longer: f64, shorter: f64, limit_deg: f64) -> f64 {
    let sum = longer + shorter;
    if !sum.is_finite() || sum < EDGE_EPS {
        return 0.0;
    }
    let raw = (EDGE_GAIN * (longer - shorter) / sum).atan().to_degrees();
    clamp_angle(raw, limit_deg)
}

fn clamp_angle(deg: f64, limit: f64) -> f64 {
    if !deg.is_finite() {
        return 0.0;
    }
    deg.clamp(-limit, limit)
}

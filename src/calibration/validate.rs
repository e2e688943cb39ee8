//! Geometric sanity checks for the tapped calibration quadrilateral.
//!
//! Runs before any homography solve: a degenerate or crossed quad would
//! produce a formally valid but meaningless transform, so it is rejected
//! here with an error naming the failed check.

use crate::error::CalibrationError;

/// Quads with a shoelace area below this many square pixels are rejected as
/// accidental taps.
pub const MIN_QUAD_AREA_PX2: f64 = 250.0;

const COLLINEAR_EPS: f64 = 1e-6;

/// Validate a 4-corner quadrilateral in pixel coordinates.
///
/// Checks, in order:
/// 1. absolute shoelace area ≥ [`MIN_QUAD_AREA_PX2`];
/// 2. no vertex collinear with its neighbours (cross product magnitude);
/// 3. consistent cross-product signs around the quad (convex ordering).
pub fn validate_corners(corners: &[[f64; 2]; 4]) -> Result<(), CalibrationError> {
    let area = shoelace_area(corners).abs();
    if area < MIN_QUAD_AREA_PX2 {
        return Err(CalibrationError::DegenerateArea {
            area,
            min_area: MIN_QUAD_AREA_PX2,
        });
    }

    let mut reference_sign = 0.0f64;
    for i in 0..4 {
        let prev = corners[(i + 3) % 4];
        let curr = corners[i];
        let next = corners[(i + 1) % 4];
        let e1 = [curr[0] - prev[0], curr[1] - prev[1]];
        let e2 = [next[0] - curr[0], next[1] - curr[1]];
        let cross = e1[0] * e2[1] - e1[1] * e2[0];
        if cross.abs() < COLLINEAR_EPS {
            return Err(CalibrationError::CollinearCorners { index: i });
        }
        if reference_sign == 0.0 {
            reference_sign = cross.signum();
        } else if cross.signum() != reference_sign {
            return Err(CalibrationError::NonConvex);
        }
    }
    Ok(())
}

/// Signed shoelace area of the quadrilateral.
fn shoelace_area(corners: &[[f64; 2]; 4]) -> f64 {
    let mut sum = 0.0;
    for i in 0..4 {
        let [x1, y1] = corners[i];
        let [x2, y2] = corners[(i + 1) % 4];
        sum += x1 * y2 - x2 * y1;
    }
    sum / 2.0
}

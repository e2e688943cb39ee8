//! Camera-to-pitch calibration from user-tapped landmarks.
//!
//! The user taps the four pitch corners (striker-left, striker-right,
//! bowler-right, bowler-left) and optionally the two stump bases. Corners
//! arrive either in pixels or normalized to the source image. The module
//! validates the quad, solves the image→pitch homography and, when stump
//! bases are present, refines the fit with two extra center-line
//! correspondences.

pub mod pose;
pub mod validate;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::homography::Homography;
use crate::types::ImageSize;

pub use pose::{estimate_pose_preview, PosePreview};
pub use validate::{validate_corners, MIN_QUAD_AREA_PX2};

/// User-supplied geometric correspondence between the image and the pitch.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PitchCalibration {
    /// Four corners, ordered striker-left, striker-right, bowler-right,
    /// bowler-left.
    pub corners: [[f64; 2]; 4],
    /// When true, `corners` (and `stump_bases`) are fractions of the source
    /// image size instead of pixels.
    #[serde(default)]
    pub normalized: bool,
    /// Optional stump-base taps, one per end, in the same units as `corners`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stump_bases: Option<[[f64; 2]; 2]>,
    /// Size of the image the taps were made on, required to resolve
    /// normalized coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
}

impl PitchCalibration {
    pub fn from_pixel_corners(corners: [[f64; 2]; 4]) -> Self {
        Self {
            corners,
            normalized: false,
            stump_bases: None,
            image_size: None,
        }
    }

    pub fn from_normalized_corners(corners: [[f64; 2]; 4], image_size: ImageSize) -> Self {
        Self {
            corners,
            normalized: true,
            stump_bases: None,
            image_size: Some(image_size),
        }
    }

    /// Corners in pixels, scaling normalized taps by the recorded image size
    /// or by `fallback_size` (typically the first decoded frame).
    pub fn pixel_corners(
        &self,
        fallback_size: Option<ImageSize>,
    ) -> Result<[[f64; 2]; 4], CalibrationError> {
        if !self.normalized {
            return Ok(self.corners);
        }
        let size = self
            .image_size
            .or(fallback_size)
            .ok_or(CalibrationError::MissingImageSize)?;
        Ok(self.corners.map(|p| scale_point(p, size)))
    }

    fn pixel_stump_bases(&self, fallback_size: Option<ImageSize>) -> Option<[[f64; 2]; 2]> {
        let bases = self.stump_bases?;
        if !self.normalized {
            return Some(bases);
        }
        let size = self.image_size.or(fallback_size)?;
        Some(bases.map(|p| scale_point(p, size)))
    }

    /// Validate the quad and solve the image→pitch-plane homography.
    ///
    /// `pitch_length_m` and `pitch_width_m` parameterize the world corners:
    /// the striker end sits at x = 0 and the bowler end at x = length, with
    /// y = ±width/2. Returns the transform plus non-fatal notes (e.g. the
    /// stump-base refinement), never a silently degraded result.
    pub fn solve(
        &self,
        fallback_size: Option<ImageSize>,
        pitch_length_m: f64,
        pitch_width_m: f64,
    ) -> Result<(Homography, Vec<String>), CalibrationSolveError> {
        let corners = self.pixel_corners(fallback_size)?;
        validate_corners(&corners)?;

        let half_w = pitch_width_m / 2.0;
        let world: [[f64; 2]; 4] = [
            [0.0, -half_w],
            [0.0, half_w],
            [pitch_length_m, half_w],
            [pitch_length_m, -half_w],
        ];
        let base = Homography::from_points(&corners, &world)?;

        let mut notes = Vec::new();
        let Some(bases) = self.pixel_stump_bases(fallback_size) else {
            return Ok((base, notes));
        };

        // Order the stump taps with the preliminary solve: the striker base
        // maps closer to x = 0.
        let x0 = base.apply(bases[0])[0];
        let x1 = base.apply(bases[1])[0];
        let (striker, bowler) = if x0.is_finite() && x1.is_finite() && x0 > x1 {
            (bases[1], bases[0])
        } else {
            (bases[0], bases[1])
        };

        let mut src: Vec<[f64; 2]> = corners.to_vec();
        let mut dst: Vec<[f64; 2]> = world.to_vec();
        src.push(striker);
        src.push(bowler);
        dst.push([0.0, 0.0]);
        dst.push([pitch_length_m, 0.0]);

        match Homography::from_correspondences(&src, &dst) {
            Ok(refined) => {
                notes.push("homography refined with both stump bases".to_string());
                Ok((refined, notes))
            }
            Err(err) => {
                // Bad stump taps must not lose a valid 4-corner solve.
                debug!("stump-base refinement failed ({err}); keeping corner-only homography");
                notes.push(format!("stump-base refinement skipped: {err}"));
                Ok((base, notes))
            }
        }
    }
}

fn scale_point(p: [f64; 2], size: ImageSize) -> [f64; 2] {
    [p[0] * size.width as f64, p[1] * size.height as f64]
}

/// Failure of the calibration solve: either the quad is invalid or the
/// homography system is numerically singular.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationSolveError {
    #[error(transparent)]
    Invalid(#[from] CalibrationError),
    #[error(transparent)]
    Numerical(#[from] crate::error::HomographyError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trapezoid() -> [[f64; 2]; 4] {
        [[150.0, 850.0], [650.0, 850.0], [530.0, 150.0], [270.0, 150.0]]
    }

    #[test]
    fn solve_maps_corners_to_world() {
        let cal = PitchCalibration::from_pixel_corners(trapezoid());
        let (h, notes) = cal.solve(None, 20.12, 3.05).unwrap();
        assert!(notes.is_empty());

        let striker_left = h.apply(trapezoid()[0]);
        assert_relative_eq!(striker_left[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(striker_left[1], -1.525, epsilon = 1e-6);

        let bowler_right = h.apply(trapezoid()[2]);
        assert_relative_eq!(bowler_right[0], 20.12, epsilon = 1e-6);
        assert_relative_eq!(bowler_right[1], 1.525, epsilon = 1e-6);
    }

    #[test]
    fn normalized_corners_need_a_size() {
        let cal = PitchCalibration {
            corners: [[0.2, 0.8], [0.8, 0.8], [0.7, 0.2], [0.3, 0.2]],
            normalized: true,
            stump_bases: None,
            image_size: None,
        };
        assert!(matches!(
            cal.pixel_corners(None),
            Err(CalibrationError::MissingImageSize)
        ));

        let size = ImageSize {
            width: 1000,
            height: 1000,
        };
        let px = cal.pixel_corners(Some(size)).unwrap();
        assert_relative_eq!(px[0][0], 200.0);
        assert_relative_eq!(px[0][1], 800.0);
    }

    #[test]
    fn degenerate_quad_blocks_solve() {
        let cal = PitchCalibration::from_pixel_corners([
            [10.0, 10.0],
            [12.0, 10.0],
            [12.0, 12.0],
            [10.0, 12.0],
        ]);
        assert!(matches!(
            cal.solve(None, 20.12, 3.05),
            Err(CalibrationSolveError::Invalid(
                CalibrationError::DegenerateArea { .. }
            ))
        ));
    }

    #[test]
    fn stump_bases_refine_and_are_reordered() {
        let corners = trapezoid();
        let base = {
            let cal = PitchCalibration::from_pixel_corners(corners);
            cal.solve(None, 20.12, 3.05).unwrap().0
        };

        // Synthesize consistent stump-base pixels from the base solve, bowler
        // end listed first to exercise the reordering.
        let center_bottom = [
            (corners[0][0] + corners[1][0]) / 2.0,
            (corners[0][1] + corners[1][1]) / 2.0,
        ];
        let center_top = [
            (corners[2][0] + corners[3][0]) / 2.0,
            (corners[2][1] + corners[3][1]) / 2.0,
        ];
        let cal = PitchCalibration {
            stump_bases: Some([center_top, center_bottom]),
            ..PitchCalibration::from_pixel_corners(corners)
        };
        let (refined, notes) = cal.solve(None, 20.12, 3.05).unwrap();
        assert_eq!(notes.len(), 1);

        // The refined fit still maps the striker center near the origin.
        let p = refined.apply(center_bottom);
        assert_relative_eq!(p[0], base.apply(center_bottom)[0], epsilon = 0.2);
        assert!(p[1].abs() < 0.2);
    }
}

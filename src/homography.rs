//! Plane-to-plane homography from four tapped correspondences.
//!
//! The solver fixes the ninth coefficient to 1 and expresses the DLT
//! equations as an 8×8 linear system, solved by Gaussian elimination with
//! partial pivoting. All shapes are known at compile time, so the solve runs
//! on stack-allocated `nalgebra` matrices.

use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::HomographyError;

/// Pivot magnitudes below this make the system singular.
const PIVOT_EPS: f64 = 1e-10;
/// Projective denominators below this yield a NaN point instead of a divide.
const DENOM_EPS: f64 = 1e-12;

/// A 3×3 planar projective transform with its last element fixed to 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    m: Matrix3<f64>,
}

impl Homography {
    /// Solve the transform mapping each `src[i]` onto `dst[i]`.
    ///
    /// Exactly four correspondences are required; fewer or more is an
    /// argument error. A near-zero pivot during elimination means the
    /// correspondences are degenerate and the solve fails with
    /// [`HomographyError::Singular`].
    pub fn from_points(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Self, HomographyError> {
        if src.len() != 4 || dst.len() != 4 {
            return Err(HomographyError::PointCount {
                needed: 4,
                got: src.len().min(dst.len()),
            });
        }
        Self::from_correspondences(src, dst)
    }

    /// Least-squares solve over four or more correspondences.
    ///
    /// With exactly four points this reduces to the exact 8×8 solve; with
    /// more it minimizes the DLT residual through the normal equations,
    /// which keeps the system at a fixed 8×8 size. Used by the calibration
    /// layer to fold optional stump-base markers into the fit.
    pub(crate) fn from_correspondences(
        src: &[[f64; 2]],
        dst: &[[f64; 2]],
    ) -> Result<Self, HomographyError> {
        let n = src.len();
        if n < 4 || dst.len() != n {
            return Err(HomographyError::PointCount {
                needed: 4,
                got: n.min(dst.len()),
            });
        }

        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();
        if n == 4 {
            // Direct 8x8 DLT system with h33 fixed at 1: two rows per
            // correspondence.
            for i in 0..4 {
                let [x, y] = src[i];
                let [u, v] = dst[i];
                let rx = [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u];
                let ry = [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v];
                for c in 0..8 {
                    a[(2 * i, c)] = rx[c];
                    a[(2 * i + 1, c)] = ry[c];
                }
                b[2 * i] = u;
                b[2 * i + 1] = v;
            }
        } else {
            // Overdetermined: fold the 2n x 8 system into the 8x8 normal
            // equations A^T A h = A^T b.
            for i in 0..n {
                let [x, y] = src[i];
                let [u, v] = dst[i];
                let rows: [[f64; 8]; 2] = [
                    [x, y, 1.0, 0.0, 0.0, 0.0, -x * u, -y * u],
                    [0.0, 0.0, 0.0, x, y, 1.0, -x * v, -y * v],
                ];
                let rhs = [u, v];
                for (row, &r_b) in rows.iter().zip(rhs.iter()) {
                    for r in 0..8 {
                        for c in 0..8 {
                            a[(r, c)] += row[r] * row[c];
                        }
                        b[r] += row[r] * r_b;
                    }
                }
            }
        }

        let h = solve_gaussian(a, b)?;
        Ok(Self {
            m: Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0),
        })
    }

    /// Apply the transform to one point.
    ///
    /// A vanishing projective denominator yields a NaN point rather than a
    /// division fault; callers filter non-finite results.
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        let v = self.m * Vector3::new(p[0], p[1], 1.0);
        if !v[2].is_finite() || v[2].abs() < DENOM_EPS {
            return [f64::NAN, f64::NAN];
        }
        [v[0] / v[2], v[1] / v[2]]
    }

    /// Row-major coefficients, `h33` last and equal to 1.
    pub fn coefficients(&self) -> [f64; 9] {
        let m = &self.m;
        [
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 0)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 0)],
            m[(2, 1)],
            m[(2, 2)],
        ]
    }

    #[cfg(test)]
    pub(crate) fn from_matrix(m: Matrix3<f64>) -> Self {
        Self { m }
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
fn solve_gaussian(
    mut a: SMatrix<f64, 8, 8>,
    mut b: SVector<f64, 8>,
) -> Result<SVector<f64, 8>, HomographyError> {
    for col in 0..8 {
        // Row with the largest absolute value in this column.
        let mut pivot_row = col;
        let mut pivot_mag = a[(col, col)].abs();
        for row in (col + 1)..8 {
            let mag = a[(row, col)].abs();
            if mag > pivot_mag {
                pivot_mag = mag;
                pivot_row = row;
            }
        }
        if pivot_mag < PIVOT_EPS {
            return Err(HomographyError::Singular);
        }
        if pivot_row != col {
            a.swap_rows(col, pivot_row);
            b.swap_rows(col, pivot_row);
        }

        for row in (col + 1)..8 {
            let factor = a[(row, col)] / a[(col, col)];
            if factor == 0.0 {
                continue;
            }
            for c in col..8 {
                a[(row, c)] -= factor * a[(col, c)];
            }
            b[row] -= factor * b[col];
        }
    }

    // Back substitution.
    let mut x = SVector::<f64, 8>::zeros();
    for row in (0..8).rev() {
        let mut sum = b[row];
        for c in (row + 1)..8 {
            sum -= a[(row, c)] * x[c];
        }
        x[row] = sum / a[(row, row)];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> [[f64; 2]; 4] {
        [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
    }

    #[test]
    fn roundtrips_fit_points() {
        let src = [[120.0, 640.0], [560.0, 655.0], [470.0, 120.0], [210.0, 110.0]];
        let dst = [[0.0, -1.525], [0.0, 1.525], [20.12, 1.525], [20.12, -1.525]];
        let h = Homography::from_points(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            let p = h.apply(*s);
            assert_relative_eq!(p[0], d[0], epsilon = 1e-6);
            assert_relative_eq!(p[1], d[1], epsilon = 1e-6);
        }
    }

    #[test]
    fn rejects_wrong_point_count() {
        let src = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        let dst = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        let err = Homography::from_points(&src, &dst).unwrap_err();
        assert_eq!(err, HomographyError::PointCount { needed: 4, got: 3 });
    }

    #[test]
    fn coincident_points_are_singular() {
        let src = [[5.0, 5.0]; 4];
        let dst = unit_square();
        assert_eq!(
            Homography::from_points(&src, &dst).unwrap_err(),
            HomographyError::Singular
        );
    }

    #[test]
    fn collinear_points_are_singular() {
        let src = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let dst = unit_square();
        assert_eq!(
            Homography::from_points(&src, &dst).unwrap_err(),
            HomographyError::Singular
        );
    }

    #[test]
    fn zero_denominator_yields_nan_point() {
        // Third row annihilates points on the line x + y = 1.
        let h = Homography::from_matrix(Matrix3::new(
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 1.0, -1.0,
        ));
        let p = h.apply([0.5, 0.5]);
        assert!(p[0].is_nan() && p[1].is_nan());
    }

    #[test]
    fn overdetermined_fit_matches_exact_solution() {
        let src = [[100.0, 700.0], [600.0, 700.0], [520.0, 150.0], [180.0, 150.0]];
        let dst = [[0.0, -1.5], [0.0, 1.5], [20.0, 1.5], [20.0, -1.5]];
        let exact = Homography::from_points(&src, &dst).unwrap();

        // Add two consistent mid-pitch correspondences.
        let mid_img = [
            [
                (src[0][0] + src[1][0]) / 2.0,
                (src[0][1] + src[1][1]) / 2.0,
            ],
            [
                (src[2][0] + src[3][0]) / 2.0,
                (src[2][1] + src[3][1]) / 2.0,
            ],
        ];
        let mut src6: Vec<[f64; 2]> = src.to_vec();
        let mut dst6: Vec<[f64; 2]> = dst.to_vec();
        for p in mid_img {
            src6.push(p);
            dst6.push(exact.apply(p));
        }
        let refined = Homography::from_correspondences(&src6, &dst6).unwrap();
        for (a, b) in exact
            .coefficients()
            .iter()
            .zip(refined.coefficients().iter())
        {
            assert_relative_eq!(*a, *b, epsilon = 1e-6);
        }
    }
}

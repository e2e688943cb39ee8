//! Constant-velocity Kalman filter over pixel-plane ball measurements.
//!
//! State is `[x, y, vx, vy]`. The filter initializes from the first
//! measurement with confident position and very uncertain velocity, then
//! runs predict-then-conditionally-update once per sampled frame. All
//! matrices are fixed-size `nalgebra` types; the 2×2 innovation covariance
//! is inverted in closed form with an identity-gain fallback when it is
//! numerically singular.

use log::warn;
use nalgebra::{Matrix2, Matrix4, Matrix4x2, Vector2, Vector4};

/// Determinants below this trigger the identity-gain fallback.
const INNOVATION_DET_EPS: f64 = 1e-9;

/// Initial velocity variance: the first measurement says nothing about speed.
const INIT_VELOCITY_VAR: f64 = 1000.0;
/// Initial position variance: the first measurement is trusted.
const INIT_POSITION_VAR: f64 = 0.5;

/// Noise tunables for the constant-velocity model.
#[derive(Clone, Copy, Debug)]
pub struct Kalman2DParams {
    /// Process noise added to the position variance per predict step.
    pub position_noise: f64,
    /// Process noise added to the velocity variance per predict step.
    pub velocity_noise: f64,
    /// Measurement noise variance of the detector, px².
    pub measurement_noise: f64,
}

impl Default for Kalman2DParams {
    fn default() -> Self {
        Self {
            position_noise: 0.5,
            velocity_noise: 600.0,
            measurement_noise: 0.5,
        }
    }
}

/// 2D constant-velocity filter state.
#[derive(Clone, Debug)]
pub struct Kalman2D {
    x: Vector4<f64>,
    p: Matrix4<f64>,
    params: Kalman2DParams,
}

impl Kalman2D {
    /// Initialize from the first available measurement.
    pub fn from_measurement(measurement: [f64; 2], params: Kalman2DParams) -> Self {
        let x = Vector4::new(measurement[0], measurement[1], 0.0, 0.0);
        let p = Matrix4::from_diagonal(&Vector4::new(
            INIT_POSITION_VAR,
            INIT_POSITION_VAR,
            INIT_VELOCITY_VAR,
            INIT_VELOCITY_VAR,
        ));
        Self { x, p, params }
    }

    /// Advance the state by `dt` seconds and inflate the covariance with the
    /// process noise. Returns the predicted position.
    pub fn predict(&mut self, dt: f64) -> [f64; 2] {
        let f = Matrix4::new(
            1.0, 0.0, dt, 0.0, //
            0.0, 1.0, 0.0, dt, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        );
        let q = Matrix4::from_diagonal(&Vector4::new(
            self.params.position_noise,
            self.params.position_noise,
            self.params.velocity_noise,
            self.params.velocity_noise,
        ));
        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + q;
        self.position()
    }

    /// Fold a position-only measurement into the state.
    pub fn update(&mut self, measurement: [f64; 2]) {
        let z = Vector2::new(measurement[0], measurement[1]);
        // H selects the position block, so H P H^T is the top-left 2x2.
        let p_top = self.p.fixed_view::<2, 2>(0, 0).into_owned();
        let r = Matrix2::from_diagonal_element(self.params.measurement_noise);
        let s = p_top + r;

        let det = s[(0, 0)] * s[(1, 1)] - s[(0, 1)] * s[(1, 0)];
        let k: Matrix4x2<f64> = if det.abs() < INNOVATION_DET_EPS {
            warn!("Kalman2D: singular innovation covariance (det={det:.3e}); using identity gain");
            let mut gain = Matrix4x2::zeros();
            gain[(0, 0)] = 1.0;
            gain[(1, 1)] = 1.0;
            gain
        } else {
            // Closed-form 2x2 inverse.
            let s_inv = Matrix2::new(s[(1, 1)], -s[(0, 1)], -s[(1, 0)], s[(0, 0)]) / det;
            let p_cols = self.p.fixed_view::<4, 2>(0, 0).into_owned();
            p_cols * s_inv
        };

        let innovation = z - Vector2::new(self.x[0], self.x[1]);
        self.x += k * innovation;

        // P = (I - K H) P, with K H affecting only the first two columns.
        let mut kh = Matrix4::zeros();
        kh.view_mut((0, 0), (4, 2)).copy_from(&k);
        self.p = (Matrix4::identity() - kh) * self.p;
    }

    pub fn position(&self) -> [f64; 2] {
        [self.x[0], self.x[1]]
    }

    pub fn velocity(&self) -> [f64; 2] {
        [self.x[2], self.x[3]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn velocity_converges_on_noiseless_input() {
        // Constant velocity: 120 px/s in x, -45 px/s in y, 30 fps sampling.
        // Five updates must bring the estimate within 1% of truth, and it
        // must stay there.
        let dt = 1.0 / 30.0;
        let (vx, vy) = (120.0, -45.0);
        let mut filter = Kalman2D::from_measurement([100.0, 400.0], Kalman2DParams::default());

        for step in 1..=8 {
            let t = step as f64 * dt;
            filter.predict(dt);
            filter.update([100.0 + vx * t, 400.0 + vy * t]);

            if step >= 5 {
                let [ex, ey] = filter.velocity();
                assert!(
                    (ex - vx).abs() / vx.abs() < 0.01,
                    "vx estimate {ex} after {step} updates"
                );
                assert!(
                    (ey - vy).abs() / vy.abs() < 0.01,
                    "vy estimate {ey} after {step} updates"
                );
            }
        }
    }

    #[test]
    fn coasts_along_velocity_without_updates() {
        let dt = 0.02;
        let mut filter = Kalman2D::from_measurement([0.0, 0.0], Kalman2DParams::default());
        for step in 1..=10 {
            filter.predict(dt);
            filter.update([50.0 * step as f64 * dt, 0.0]);
        }
        let before = filter.position();
        let predicted = filter.predict(dt);
        assert!(predicted[0] > before[0]);
        assert!(predicted.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn singular_innovation_falls_back_to_measurement() {
        // Zero measurement noise with a collapsed covariance forces the
        // identity-gain path; the state must absorb the measurement and
        // stay finite.
        let params = Kalman2DParams {
            position_noise: 0.0,
            velocity_noise: 0.0,
            measurement_noise: 0.0,
        };
        let mut filter = Kalman2D::from_measurement([10.0, 10.0], params);
        filter.p = Matrix4::zeros();
        filter.update([12.0, 9.0]);
        let [x, y] = filter.position();
        assert_eq!(x, 12.0);
        assert_eq!(y, 9.0);
        assert!(filter.velocity().iter().all(|v| v.is_finite()));
    }
}

//! Constant-velocity Kalman filter over pitch coordinates.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};

use crate::config::TrackingThresholds;
use crate::pitch::PitchPos;

/// Kalman filter for one tracked entity.
/// State: [x, y, vx, vy] in pitch meters / meters-per-second.
#[derive(Debug, Clone)]
pub struct MotionFilter {
    /// State vector: [x, y, vx, vy]
    state: Vector4<f32>,
    /// State covariance (uncertainty)
    covariance: Matrix4<f32>,
    /// Process noise covariance
    process_noise: Matrix4<f32>,
    /// Measurement noise covariance
    measurement_noise: Matrix2<f32>,
}

impl MotionFilter {
    /// Initialize at a measured position with zero velocity and high
    /// velocity uncertainty.
    pub fn new(pos: PitchPos, config: &TrackingThresholds) -> Self {
        let state = Vector4::new(pos.0, pos.1, 0.0, 0.0);

        let mut covariance = Matrix4::identity() * config.initial_covariance;
        covariance[(2, 2)] = config.initial_covariance * 10.0;
        covariance[(3, 3)] = config.initial_covariance * 10.0;

        let mut process_noise = Matrix4::zeros();
        process_noise[(0, 0)] = config.process_noise_pos;
        process_noise[(1, 1)] = config.process_noise_pos;
        process_noise[(2, 2)] = config.process_noise_vel;
        process_noise[(3, 3)] = config.process_noise_vel;

        let measurement_noise = Matrix2::identity() * config.measurement_noise;

        Self { state, covariance, process_noise, measurement_noise }
    }

    /// Advance the state by `dt` seconds under the constant-velocity model.
    pub fn predict(&mut self, dt: f32) {
        let mut f = Matrix4::identity();
        f[(0, 2)] = dt; // x += vx * dt
        f[(1, 3)] = dt; // y += vy * dt

        self.state = f * self.state;
        // P' = F * P * F^T + Q
        self.covariance = f * self.covariance * f.transpose() + self.process_noise;
    }

    /// Incorporate a position measurement (innovation update).
    pub fn update(&mut self, pos: PitchPos) {
        let measurement = Vector2::new(pos.0, pos.1);

        // We observe position only, not velocity.
        #[rustfmt::skip]
        let h = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );

        let innovation = measurement - h * self.state;
        // S = H * P * H^T + R
        let innovation_covariance = h * self.covariance * h.transpose() + self.measurement_noise;

        // S is positive definite for any R > 0; a failed inverse means the
        // covariance degenerated numerically, in which case the correction
        // is skipped and the next measurement re-anchors the state.
        let Some(s_inv) = innovation_covariance.try_inverse() else {
            return;
        };

        // K = P * H^T * S^-1
        let kalman_gain = self.covariance * h.transpose() * s_inv;

        self.state += kalman_gain * innovation;
        self.covariance = (Matrix4::identity() - kalman_gain * h) * self.covariance;
    }

    /// Current position estimate.
    pub fn position(&self) -> PitchPos {
        (self.state[0], self.state[1])
    }

    /// Current velocity estimate (m/s).
    pub fn velocity(&self) -> (f32, f32) {
        (self.state[2], self.state[3])
    }

    /// Current speed estimate (m/s).
    pub fn speed(&self) -> f32 {
        let (vx, vy) = self.velocity();
        (vx * vx + vy * vy).sqrt()
    }

    /// Scalar position uncertainty: trace of the position covariance block.
    pub fn position_uncertainty(&self) -> f32 {
        self.covariance[(0, 0)] + self.covariance[(1, 1)]
    }
}

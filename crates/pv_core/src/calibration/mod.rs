//! Pixel-to-pitch calibration.
//!
//! The adapter maps pixel coordinates from the detector into pitch meters
//! using a supplied homography, four reference-point correspondences, or a
//! fixed uniform scale. The matrix (and its inverse) is computed once at
//! pipeline construction and cached for the stream's duration; projection
//! itself is a pure function.

pub mod homography;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::CalibrationError;
use crate::pitch::{PitchPos, PixelPos};

/// How the pixel-to-pitch mapping is supplied in configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSource {
    /// Row-major 3x3 homography taking pixel coordinates to pitch meters.
    Homography([[f64; 3]; 3]),
    /// Four pixel/pitch correspondences; the homography is estimated by DLT.
    ReferencePoints {
        pixel: [[f64; 2]; 4],
        pitch: [[f64; 2]; 4],
    },
    /// Fixed-pitch assumption: uniform meters-per-pixel scale.
    PixelScale(f64),
}

impl Default for CalibrationSource {
    fn default() -> Self {
        // Matches the common detector output scale of roughly 10 px per meter.
        CalibrationSource::PixelScale(0.1)
    }
}

/// Validated, cached pixel-to-pitch transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    h: Matrix3<f64>,
    h_inv: Matrix3<f64>,
}

impl Calibration {
    /// Build from a configuration source.
    pub fn from_source(source: &CalibrationSource) -> Result<Self, CalibrationError> {
        match source {
            CalibrationSource::Homography(rows) => Self::from_matrix(*rows),
            CalibrationSource::ReferencePoints { pixel, pitch } => {
                Self::from_reference_points(pixel, pitch)
            }
            CalibrationSource::PixelScale(scale) => Self::from_pixel_scale(*scale),
        }
    }

    /// Validate and cache a supplied homography matrix.
    pub fn from_matrix(rows: [[f64; 3]; 3]) -> Result<Self, CalibrationError> {
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(CalibrationError::NonFiniteMatrix);
        }
        #[rustfmt::skip]
        let h = Matrix3::new(
            rows[0][0], rows[0][1], rows[0][2],
            rows[1][0], rows[1][1], rows[1][2],
            rows[2][0], rows[2][1], rows[2][2],
        );
        let det = h.determinant();
        let h_inv = h
            .try_inverse()
            .filter(|_| det.abs() > 1e-12)
            .ok_or(CalibrationError::SingularMatrix { determinant: det })?;
        Ok(Self { h, h_inv })
    }

    /// Estimate the homography from four pixel/pitch correspondences.
    pub fn from_reference_points(
        pixel: &[[f64; 2]; 4],
        pitch: &[[f64; 2]; 4],
    ) -> Result<Self, CalibrationError> {
        let h = homography::estimate_homography(pixel, pitch)?;
        let rows = [
            [h[(0, 0)], h[(0, 1)], h[(0, 2)]],
            [h[(1, 0)], h[(1, 1)], h[(1, 2)]],
            [h[(2, 0)], h[(2, 1)], h[(2, 2)]],
        ];
        Self::from_matrix(rows)
    }

    /// Fixed-pitch fallback: uniform meters-per-pixel scale.
    pub fn from_pixel_scale(scale: f64) -> Result<Self, CalibrationError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(CalibrationError::InvalidScale { scale });
        }
        Self::from_matrix([[scale, 0.0, 0.0], [0.0, scale, 0.0], [0.0, 0.0, 1.0]])
    }

    /// Project a pixel position into pitch meters.
    pub fn pixel_to_pitch(&self, pos: PixelPos) -> PitchPos {
        let p = homography::project(&self.h, pos.0 as f64, pos.1 as f64);
        (p[0] as f32, p[1] as f32)
    }

    /// Project a pitch position back into pixel coordinates.
    pub fn pitch_to_pixel(&self, pos: PitchPos) -> PixelPos {
        let p = homography::project(&self.h_inv, pos.0 as f64, pos.1 as f64);
        (p[0] as f32, p[1] as f32)
    }
}

//! Centralized thresholds configuration.
//!
//! Every tunable the pipeline uses lives here with a documented default.
//! None of the defaults are authoritative: occlusion windows, control radii,
//! and speed thresholds must be tuned against labeled footage for a given
//! camera setup. Presets can be selected via the `PV_THRESHOLD_PROFILE`
//! environment variable.

use serde::{Deserialize, Serialize};
use std::env;

use crate::calibration::CalibrationSource;
use crate::error::AnalyticsError;
use crate::pitch::{GoalEnd, PitchModel};

/// Immutable pipeline configuration, supplied once at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsConfig {
    /// Real-world pitch dimensions and zone partition
    pub pitch: PitchModel,
    /// Pixel-to-pitch mapping source
    pub calibration: CalibrationSource,
    /// Which goal end the home team attacks (away attacks the opposite end)
    pub home_attacks: GoalEnd,
    /// Tracker thresholds
    pub tracking: TrackingThresholds,
    /// Possession / event-detection thresholds
    pub possession: PossessionThresholds,
    /// Kinematics thresholds
    pub kinematics: KinematicsThresholds,
    /// Tactical aggregation thresholds
    pub tactical: TacticalThresholds,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            pitch: PitchModel::default(),
            calibration: CalibrationSource::default(),
            home_attacks: GoalEnd::Right,
            tracking: TrackingThresholds::default(),
            possession: PossessionThresholds::default(),
            kinematics: KinematicsThresholds::default(),
            tactical: TacticalThresholds::default(),
        }
    }
}

impl AnalyticsConfig {
    /// Preset for low-quality detector output: wider association gates,
    /// longer coasting, heavier smoothing.
    pub fn noisy_detector() -> Self {
        Self {
            tracking: TrackingThresholds {
                gating_distance_m: 6.0,
                max_coast_frames: 45,
                min_confidence: 0.2,
                ball_min_confidence: 0.6,
                ..TrackingThresholds::default()
            },
            kinematics: KinematicsThresholds {
                smoothing_window: 9,
                ..KinematicsThresholds::default()
            },
            ..Self::default()
        }
    }

    /// Load a preset from `PV_THRESHOLD_PROFILE` or use defaults.
    pub fn from_env_or_default() -> Self {
        match env::var("PV_THRESHOLD_PROFILE").unwrap_or_default().to_lowercase().as_str() {
            "noisy_detector" => Self::noisy_detector(),
            _ => Self::default(),
        }
    }

    /// Reject configurations that cannot produce meaningful analytics.
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.pitch.length_m <= 0.0 || self.pitch.width_m <= 0.0 {
            return Err(AnalyticsError::InvalidConfig("pitch dimensions must be positive".into()));
        }
        if self.tracking.gating_distance_m <= 0.0 {
            return Err(AnalyticsError::InvalidConfig("gating distance must be positive".into()));
        }
        if self.possession.kick_speed_mps <= self.possession.control_speed_mps {
            return Err(AnalyticsError::InvalidConfig(
                "kick speed threshold must exceed control speed threshold".into(),
            ));
        }
        if self.possession.control_radius_m <= 0.0 {
            return Err(AnalyticsError::InvalidConfig("control radius must be positive".into()));
        }
        if self.kinematics.smoothing_window == 0 {
            return Err(AnalyticsError::InvalidConfig("smoothing window must be at least 1".into()));
        }
        if self.tactical.window_s <= 0.0 {
            return Err(AnalyticsError::InvalidConfig("tactical window must be positive".into()));
        }
        Ok(())
    }
}

/// Multi-object tracker thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackingThresholds {
    /// Maximum association cost (pitch meters) for a valid match; inclusive.
    pub gating_distance_m: f32,
    /// Frames a track may coast without a matching detection before it is
    /// archived as lost.
    pub max_coast_frames: u32,
    /// Minimum detector confidence for player-like detections.
    pub min_confidence: f32,
    /// Minimum detector confidence for ball detections (the ball pipeline
    /// runs at a stricter threshold since only one ball may exist).
    pub ball_min_confidence: f32,
    /// Weight of bbox-size dissimilarity in the association cost, in
    /// meters-equivalent per unit of relative size difference.
    pub size_cost_weight: f32,
    /// Process noise for position (meters).
    pub process_noise_pos: f32,
    /// Process noise for velocity (meters/second).
    pub process_noise_vel: f32,
    /// Measurement noise (meters): projected detection jitter.
    pub measurement_noise: f32,
    /// Initial state covariance.
    pub initial_covariance: f32,
}

impl Default for TrackingThresholds {
    fn default() -> Self {
        Self {
            gating_distance_m: 4.0,
            max_coast_frames: 30,
            min_confidence: 0.3,
            ball_min_confidence: 0.5,
            size_cost_weight: 0.5,
            process_noise_pos: 0.5,
            process_noise_vel: 2.0,
            measurement_noise: 0.25,
            initial_covariance: 10.0,
        }
    }
}

/// Possession-episode and event-detection thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PossessionThresholds {
    /// Distance within which a player can control the ball (meters).
    pub control_radius_m: f32,
    /// Ball speed below which it counts as controlled (m/s).
    pub control_speed_mps: f32,
    /// Ball speed above which a departure counts as a kick (m/s).
    pub kick_speed_mps: f32,
    /// Seconds a ball may travel uncontrolled before the episode resolves
    /// to a loose ball.
    pub transit_timeout_s: f64,
    /// Extra width (meters) beyond each post within which a launch still
    /// counts as a shot attempt; inside the mouth itself it is on target.
    pub shot_aim_margin_m: f32,
}

impl Default for PossessionThresholds {
    fn default() -> Self {
        Self {
            control_radius_m: 2.0,
            control_speed_mps: 2.0,
            kick_speed_mps: 8.0,
            transit_timeout_s: 3.0,
            shot_aim_margin_m: 3.0,
        }
    }
}

/// Kinematics thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KinematicsThresholds {
    /// Centered moving-average window (samples) applied before
    /// differentiation. Must be odd; even values are rounded up.
    pub smoothing_window: u32,
    /// Speed above which movement counts as sprinting (m/s).
    pub sprint_speed_mps: f32,
    /// Minimum duration a sprint must be sustained (seconds).
    pub sprint_min_duration_s: f64,
    /// Speed above which distance counts as high-intensity (m/s).
    pub high_intensity_speed_mps: f32,
    /// Upper bound of the walking speed zone (m/s).
    pub walking_speed_mps: f32,
    /// Upper bound of the jogging speed zone (m/s).
    pub jogging_speed_mps: f32,
    /// Upper bound of the running speed zone (m/s); above is sprinting.
    pub running_speed_mps: f32,
}

impl Default for KinematicsThresholds {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            sprint_speed_mps: 7.0,
            sprint_min_duration_s: 1.0,
            high_intensity_speed_mps: 5.5,
            walking_speed_mps: 2.0,
            jogging_speed_mps: 4.0,
            running_speed_mps: 7.0,
        }
    }
}

/// Tactical aggregation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TacticalThresholds {
    /// Aggregation window length in seconds.
    pub window_s: f64,
}

impl Default for TacticalThresholds {
    fn default() -> Self {
        Self { window_s: 60.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let config = AnalyticsConfig::default();
        assert!((config.tracking.gating_distance_m - 4.0).abs() < 1e-6);
        assert_eq!(config.tracking.max_coast_frames, 30);
        assert!((config.possession.control_radius_m - 2.0).abs() < 1e-6);
        assert!((config.kinematics.sprint_speed_mps - 7.0).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_noisy_detector_preset() {
        let config = AnalyticsConfig::noisy_detector();
        // Wider gate and longer coasting than default
        assert!(config.tracking.gating_distance_m > 4.0);
        assert!(config.tracking.max_coast_frames > 30);
        // Heavier smoothing
        assert!(config.kinematics.smoothing_window > 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_default() {
        let config = AnalyticsConfig::from_env_or_default();
        assert!((config.tracking.gating_distance_m - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_validation_rejects_inverted_speed_thresholds() {
        let mut config = AnalyticsConfig::default();
        config.possession.kick_speed_mps = 1.0; // below control speed
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_window() {
        let mut config = AnalyticsConfig::default();
        config.tactical.window_s = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalyticsConfig::default();
        config.kinematics.smoothing_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialization_round_trip() {
        let config = AnalyticsConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AnalyticsConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

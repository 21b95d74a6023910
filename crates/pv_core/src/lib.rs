//! # pv_core - Tracking-to-Analytics Core for Match Video
//!
//! Converts raw per-frame object detections (player and ball positions)
//! from a match video into structured performance analytics:
//! technical events (passes, shots, goals), physical metrics (distance,
//! speed, sprints), and tactical summaries (shape, zones, possession).
//!
//! ## Pipeline
//! Calibration → Tracker → Kinematics → {Event Detector, Tactical
//! Aggregator} → Report. Frames flow strictly forward in timestamp order.
//!
//! Video decoding, model inference, and the serving layer live outside this
//! crate; its only contract is a detection stream plus configuration in, a
//! structured [`MatchAnalysis`] (or a typed error) out.

pub mod analysis;
pub mod calibration;
pub mod config;
pub mod error;
pub mod kinematics;
pub mod models;
pub mod pipeline;
pub mod pitch;
pub mod possession;
pub mod report;
pub mod tracker;

pub use calibration::{Calibration, CalibrationSource};
pub use config::AnalyticsConfig;
pub use error::{AnalyticsError, CalibrationError, Result, SequenceError};
pub use models::{
    Detection, DetectionClass, EventKind, FrameDetections, MatchEvent, TeamSide, TrackId,
};
pub use pipeline::AnalyticsPipeline;
pub use pitch::PitchModel;
pub use possession::{EpisodeOutcome, PossessionEpisode};
pub use report::{MatchAnalysis, TrackReport};
pub use tracker::{Track, TrackStatus};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Per-frame detections as supplied by the external perception model.

use serde::{Deserialize, Serialize};

use crate::pitch::PixelPos;

/// Closed set of entity classes the detector reports.
///
/// Association logic matches exhaustively per class; adding a variant is a
/// deliberate API change, not an open-ended string.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectionClass {
    Player,
    Goalkeeper,
    Referee,
    Ball,
}

impl DetectionClass {
    /// Whether this class takes part in possession and team aggregates.
    pub fn is_team_entity(self) -> bool {
        matches!(self, DetectionClass::Player | DetectionClass::Goalkeeper)
    }
}

/// Team side assigned by the external detector's jersey classifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TeamSide {
    Home,
    Away,
}

impl TeamSide {
    pub fn opponent(self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }
}

/// One observation from one frame. Ephemeral; consumed once by the tracker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub class: DetectionClass,
    /// Team side, when the detector could classify the jersey.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamSide>,
    /// Bounding-box center (or point detection) in pixels.
    pub pixel_pos: PixelPos,
    /// Bounding-box extents in pixels, when the detector provides a box.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox_size: Option<(f32, f32)>,
    /// Detector confidence in [0, 1].
    pub confidence: f32,
}

impl Detection {
    /// A malformed detection is skipped with a warning, never fatal.
    pub fn is_well_formed(&self) -> bool {
        let finite_pos = self.pixel_pos.0.is_finite() && self.pixel_pos.1.is_finite();
        let finite_box = self
            .bbox_size
            .map_or(true, |(w, h)| w.is_finite() && h.is_finite() && w >= 0.0 && h >= 0.0);
        finite_pos && finite_box && (0.0..=1.0).contains(&self.confidence)
    }
}

/// One batch of detections for a single frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameDetections {
    pub frame_index: u64,
    /// Seconds from stream start. Monotonically increasing across batches.
    pub timestamp_s: f64,
    pub detections: Vec<Detection>,
}

//! Discrete technical events inferred from ball and player motion.

use serde::{Deserialize, Serialize};

use super::detection::TeamSide;
use super::TrackId;
use crate::pitch::PitchPos;

/// A timestamped technical event. Immutable once emitted; always references
/// tracks that were live (active or coasting) at its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchEvent {
    pub timestamp_s: f64,
    pub frame_index: u64,
    #[serde(rename = "type")]
    pub event_type: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamSide>,
    /// Track of the primary actor (passer, shooter, scorer).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_track_id: Option<TrackId>,
    /// Track of the target (pass receiver, interceptor).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_track_id: Option<TrackId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<EventDetails>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Pass,
    Shot,
    Goal,
    PossessionChange,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EventDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_outcome: Option<PassOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_distance_m: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_range: Option<PassRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_direction: Option<PassDirection>,
    /// For shots: whether the launch trajectory intersects the goal mouth.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_target: Option<bool>,
    /// Ball position when the event occurred (pitch meters).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ball_position: Option<PitchPos>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    Complete,
    Intercepted,
}

/// Direction of a pass relative to the passing team's attacking end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassDirection {
    Forward,
    Backward,
    Lateral,
}

/// Classify a pass by length: short < 15 m, medium < 30 m, long otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PassRange {
    Short,
    Medium,
    Long,
}

impl PassRange {
    pub fn from_distance_m(distance: f32) -> Self {
        if distance < 15.0 {
            PassRange::Short
        } else if distance < 30.0 {
            PassRange::Medium
        } else {
            PassRange::Long
        }
    }
}

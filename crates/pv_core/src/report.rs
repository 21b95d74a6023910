//! Final structured result handed to the external API/storage layer.

use serde::{Deserialize, Serialize};

use crate::analysis::TacticalSummary;
use crate::kinematics::TrackKinematics;
use crate::models::{DetectionClass, MatchEvent, TeamSide, TrackId};
use crate::possession::PossessionEpisode;
use crate::tracker::TrackStatus;

/// Per-track summary: identity, lifetime, and kinematic signals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackReport {
    pub track_id: TrackId,
    pub class: DetectionClass,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamSide>,
    pub status: TrackStatus,
    pub first_seen_s: f64,
    pub last_seen_s: f64,
    pub sample_count: usize,
    pub kinematics: TrackKinematics,
}

/// The complete analytics result for one stream.
///
/// A truncated stream still yields everything computed so far, with the
/// abort reason recorded; the caller never receives a silent empty result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MatchAnalysis {
    /// Elapsed stream time in seconds
    pub duration_s: f64,
    pub frames_processed: u64,
    /// Frames dropped whole for malformed input (warned, never fatal)
    pub frames_skipped: u64,
    /// Individual detections dropped for malformed input
    pub detections_skipped: u64,
    /// Every track ever created, archived ones included
    pub tracks: Vec<TrackReport>,
    /// Ordered event sequence
    pub events: Vec<MatchEvent>,
    pub episodes: Vec<PossessionEpisode>,
    pub tactical: TacticalSummary,
    /// Why processing stopped early, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_round_trip() {
        let analysis = MatchAnalysis {
            duration_s: 90.0,
            frames_processed: 2250,
            ..Default::default()
        };
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(!json.contains("abort_reason"), "absent abort reason is skipped");
        let back: MatchAnalysis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, analysis);
    }

    #[test]
    fn test_abort_reason_serialized_when_present() {
        let analysis = MatchAnalysis {
            abort_reason: Some("out-of-order frame".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&analysis).unwrap();
        assert!(json.contains("abort_reason"));
    }
}

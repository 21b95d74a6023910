//! Persistent track identities and their lifecycle.

use serde::{Deserialize, Serialize};

use super::motion_filter::MotionFilter;
use super::ProjectedDetection;
use crate::config::TrackingThresholds;
use crate::models::{DetectionClass, TeamSide, TrackId};
use crate::pitch::{PitchPos, PixelPos};

/// Track lifecycle status. The states are mutually exclusive with defined
/// transitions: Active ⇄ Coasting → Lost.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    /// Confirmed by a detection this frame
    Active,
    /// Predicted without confirmation, within the coasting budget
    Coasting,
    /// Coasting budget exceeded; archived, excluded from association
    Lost,
}

impl TrackStatus {
    /// Live tracks participate in association and event references.
    pub fn is_live(self) -> bool {
        matches!(self, TrackStatus::Active | TrackStatus::Coasting)
    }
}

/// One confirmed observation on a track's history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrackSample {
    pub timestamp_s: f64,
    pub frame_index: u64,
    pub pitch_pos: PitchPos,
    pub pixel_pos: PixelPos,
    pub confidence: f32,
}

/// A persistent identity maintained across frames for one physical entity.
#[derive(Debug, Clone)]
pub struct Track {
    pub id: TrackId,
    pub class: DetectionClass,
    pub status: TrackStatus,
    /// Confirmed samples, strictly increasing in timestamp.
    pub samples: Vec<TrackSample>,
    pub filter: MotionFilter,
    /// Consecutive frames without a matching detection.
    pub misses: u32,
    /// Consecutive frames with a matching detection; association ties are
    /// broken toward the longer streak (identity favors incumbency).
    pub active_streak: u32,
    /// Per-side jersey-classification votes accumulated from detections.
    team_votes: [u32; 2],
    /// Most recent bbox extents, for the size term of the association cost.
    pub last_bbox_size: Option<(f32, f32)>,
}

impl Track {
    pub fn new(
        id: TrackId,
        det: &ProjectedDetection,
        timestamp_s: f64,
        frame_index: u64,
        config: &TrackingThresholds,
    ) -> Self {
        let mut track = Self {
            id,
            class: det.class,
            status: TrackStatus::Active,
            samples: Vec::new(),
            filter: MotionFilter::new(det.pitch_pos, config),
            misses: 0,
            active_streak: 1,
            team_votes: [0, 0],
            last_bbox_size: det.bbox_size,
        };
        track.push_sample(det, timestamp_s, frame_index);
        track
    }

    /// Incorporate a matched detection: innovation update, sample append,
    /// status back to Active.
    pub fn confirm(&mut self, det: &ProjectedDetection, timestamp_s: f64, frame_index: u64) {
        self.filter.update(det.pitch_pos);
        self.push_sample(det, timestamp_s, frame_index);
        self.status = TrackStatus::Active;
        self.misses = 0;
        self.active_streak = self.active_streak.saturating_add(1);
        self.last_bbox_size = det.bbox_size.or(self.last_bbox_size);
    }

    /// Record a frame without a matching detection. The filter keeps
    /// predicting without correction; exceeding the coasting budget
    /// archives the track.
    pub fn mark_missed(&mut self, max_coast_frames: u32) {
        if !self.status.is_live() {
            return;
        }
        self.misses = self.misses.saturating_add(1);
        self.active_streak = 0;
        self.status =
            if self.misses > max_coast_frames { TrackStatus::Lost } else { TrackStatus::Coasting };
    }

    /// Force-archive the track (used when a superseding identity exists,
    /// e.g. a replacement ball track).
    pub fn archive(&mut self) {
        self.status = TrackStatus::Lost;
        self.active_streak = 0;
    }

    fn push_sample(&mut self, det: &ProjectedDetection, timestamp_s: f64, frame_index: u64) {
        // Invariant: sample timestamps are strictly increasing.
        debug_assert!(
            self.samples.last().map_or(true, |s| timestamp_s > s.timestamp_s),
            "track {} sample timestamps must be strictly increasing",
            self.id
        );
        if let Some(team) = det.team {
            match team {
                TeamSide::Home => self.team_votes[0] += 1,
                TeamSide::Away => self.team_votes[1] += 1,
            }
        }
        self.samples.push(TrackSample {
            timestamp_s,
            frame_index,
            pitch_pos: det.pitch_pos,
            pixel_pos: det.pixel_pos,
            confidence: det.confidence,
        });
    }

    /// Team assignment by majority vote over the track's detections.
    pub fn team(&self) -> Option<TeamSide> {
        match self.team_votes {
            [0, 0] => None,
            [h, a] if h >= a => Some(TeamSide::Home),
            _ => Some(TeamSide::Away),
        }
    }

    pub fn is_live(&self) -> bool {
        self.status.is_live()
    }

    pub fn last_sample(&self) -> Option<&TrackSample> {
        self.samples.last()
    }

    /// Current position estimate (filter state, valid while coasting too).
    pub fn position(&self) -> PitchPos {
        self.filter.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(pos: PitchPos) -> ProjectedDetection {
        ProjectedDetection {
            class: DetectionClass::Player,
            team: Some(TeamSide::Home),
            pitch_pos: pos,
            pixel_pos: (pos.0 * 10.0, pos.1 * 10.0),
            bbox_size: Some((20.0, 40.0)),
            confidence: 0.9,
        }
    }

    #[test]
    fn test_lifecycle_transitions() {
        let config = TrackingThresholds { max_coast_frames: 2, ..Default::default() };
        let mut track = Track::new(0, &detection((10.0, 10.0)), 0.0, 0, &config);
        assert_eq!(track.status, TrackStatus::Active);

        track.mark_missed(config.max_coast_frames);
        assert_eq!(track.status, TrackStatus::Coasting);
        track.mark_missed(config.max_coast_frames);
        assert_eq!(track.status, TrackStatus::Coasting);
        // Third miss exceeds the budget of 2
        track.mark_missed(config.max_coast_frames);
        assert_eq!(track.status, TrackStatus::Lost);

        // Lost is terminal for miss accounting
        track.mark_missed(config.max_coast_frames);
        assert_eq!(track.status, TrackStatus::Lost);
    }

    #[test]
    fn test_confirm_resets_misses() {
        let config = TrackingThresholds::default();
        let mut track = Track::new(0, &detection((10.0, 10.0)), 0.0, 0, &config);
        track.mark_missed(config.max_coast_frames);
        assert_eq!(track.status, TrackStatus::Coasting);

        track.confirm(&detection((10.2, 10.0)), 0.08, 2);
        assert_eq!(track.status, TrackStatus::Active);
        assert_eq!(track.misses, 0);
        assert_eq!(track.samples.len(), 2);
    }

    #[test]
    fn test_streak_accounting() {
        let config = TrackingThresholds::default();
        let mut track = Track::new(0, &detection((10.0, 10.0)), 0.0, 0, &config);
        assert_eq!(track.active_streak, 1);
        track.confirm(&detection((10.1, 10.0)), 0.04, 1);
        assert_eq!(track.active_streak, 2);
        track.mark_missed(config.max_coast_frames);
        assert_eq!(track.active_streak, 0);
    }

    #[test]
    fn test_team_majority_vote() {
        let config = TrackingThresholds::default();
        let mut det = detection((10.0, 10.0));
        let mut track = Track::new(0, &det, 0.0, 0, &config);

        // Two misclassified away frames against three home frames
        det.team = Some(TeamSide::Away);
        track.confirm(&det, 0.04, 1);
        track.confirm(&det, 0.08, 2);
        det.team = Some(TeamSide::Home);
        track.confirm(&det, 0.12, 3);
        track.confirm(&det, 0.16, 4);

        assert_eq!(track.team(), Some(TeamSide::Home));
    }

    #[test]
    fn test_no_team_without_votes() {
        let config = TrackingThresholds::default();
        let mut det = detection((10.0, 10.0));
        det.team = None;
        let track = Track::new(0, &det, 0.0, 0, &config);
        assert_eq!(track.team(), None);
    }
}

//! Multi-object tracker: predict, associate, update.
//!
//! Maintains a consistent identity per physical entity despite detection
//! noise, missed frames, and occlusion. Tracks live in an arena keyed by
//! their id; lost tracks are archived in place (status flip, never deleted)
//! so later analytics can still resolve them.

pub mod association;
pub mod motion_filter;
pub mod track;

use rayon::prelude::*;

use crate::config::TrackingThresholds;
use crate::models::{DetectionClass, TeamSide, TrackId};
use crate::pitch::{PitchPos, PixelPos};

use association::{DetectionCandidate, TrackCandidate};
pub use track::{Track, TrackSample, TrackStatus};

/// A detection after calibration: pitch coordinates alongside the original
/// pixel observation.
#[derive(Debug, Clone, Copy)]
pub struct ProjectedDetection {
    pub class: DetectionClass,
    pub team: Option<TeamSide>,
    pub pitch_pos: PitchPos,
    pub pixel_pos: PixelPos,
    pub bbox_size: Option<(f32, f32)>,
    pub confidence: f32,
}

/// Per-frame view of the ball used by the event detector.
#[derive(Debug, Clone, Copy)]
pub struct BallSnapshot {
    pub track_id: TrackId,
    pub pos: PitchPos,
    pub velocity: (f32, f32),
    pub speed: f32,
}

/// Per-frame view of a live team entity used by the event detector.
#[derive(Debug, Clone, Copy)]
pub struct PlayerSnapshot {
    pub track_id: TrackId,
    pub team: Option<TeamSide>,
    pub pos: PitchPos,
}

#[derive(Debug)]
pub struct Tracker {
    config: TrackingThresholds,
    /// Arena: a track's id is its index; entries are never removed.
    tracks: Vec<Track>,
    /// The single live ball identity, when one exists.
    ball_track: Option<TrackId>,
    last_timestamp: Option<f64>,
}

impl Tracker {
    pub fn new(config: TrackingThresholds) -> Self {
        Self { config, tracks: Vec::new(), ball_track: None, last_timestamp: None }
    }

    /// Run one predict-associate-update cycle.
    ///
    /// The caller guarantees frame order; within the frame, track predictions
    /// advance in parallel (no track depends on another's state inside one
    /// timestep).
    pub fn step(&mut self, timestamp_s: f64, frame_index: u64, detections: &[ProjectedDetection]) {
        let dt = self.last_timestamp.map(|last| (timestamp_s - last) as f32).unwrap_or(0.0);
        self.last_timestamp = Some(timestamp_s);

        if dt > 0.0 {
            self.tracks
                .par_iter_mut()
                .filter(|t| t.is_live())
                .for_each(|t| t.filter.predict(dt));
        }

        let mut matched = vec![false; self.tracks.len()];

        for class in [DetectionClass::Player, DetectionClass::Goalkeeper, DetectionClass::Referee]
        {
            self.associate_class(class, timestamp_s, frame_index, detections, &mut matched);
        }
        self.step_ball(timestamp_s, frame_index, detections, &mut matched);

        // Unmatched live tracks coast; past the budget they are archived.
        for (idx, track) in self.tracks.iter_mut().enumerate() {
            if idx < matched.len() && !matched[idx] {
                track.mark_missed(self.config.max_coast_frames);
            }
        }
        if let Some(ball_id) = self.ball_track {
            if !self.tracks[ball_id as usize].is_live() {
                self.ball_track = None;
            }
        }
    }

    fn associate_class(
        &mut self,
        class: DetectionClass,
        timestamp_s: f64,
        frame_index: u64,
        detections: &[ProjectedDetection],
        matched: &mut [bool],
    ) {
        let track_indices: Vec<usize> = self
            .tracks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_live() && t.class == class)
            .map(|(i, _)| i)
            .collect();

        let det_indices: Vec<usize> = detections
            .iter()
            .enumerate()
            .filter(|(_, d)| d.class == class && d.confidence >= self.config.min_confidence)
            .map(|(i, _)| i)
            .collect();

        if det_indices.is_empty() {
            return;
        }

        let candidates: Vec<TrackCandidate> = track_indices
            .iter()
            .map(|&i| TrackCandidate {
                predicted_pos: self.tracks[i].position(),
                bbox_size: self.tracks[i].last_bbox_size,
                active_streak: self.tracks[i].active_streak,
            })
            .collect();
        let det_candidates: Vec<DetectionCandidate> = det_indices
            .iter()
            .map(|&i| DetectionCandidate {
                pitch_pos: detections[i].pitch_pos,
                bbox_size: detections[i].bbox_size,
            })
            .collect();

        let pairs = association::associate(
            &candidates,
            &det_candidates,
            self.config.gating_distance_m,
            self.config.size_cost_weight,
        );

        let mut det_matched = vec![false; det_indices.len()];
        for (t_local, d_local) in pairs {
            let track_idx = track_indices[t_local];
            let det = &detections[det_indices[d_local]];
            self.tracks[track_idx].confirm(det, timestamp_s, frame_index);
            matched[track_idx] = true;
            det_matched[d_local] = true;
        }

        // Unmatched detections spawn fresh identities.
        for (d_local, &det_idx) in det_indices.iter().enumerate() {
            if !det_matched[d_local] {
                self.spawn_track(&detections[det_idx], timestamp_s, frame_index);
            }
        }
    }

    /// Ball association runs separately at a stricter confidence threshold:
    /// exactly one ball identity may be live at a time.
    fn step_ball(
        &mut self,
        timestamp_s: f64,
        frame_index: u64,
        detections: &[ProjectedDetection],
        matched: &mut [bool],
    ) {
        let mut candidates: Vec<&ProjectedDetection> = detections
            .iter()
            .filter(|d| {
                d.class == DetectionClass::Ball && d.confidence >= self.config.ball_min_confidence
            })
            .collect();
        if candidates.is_empty() {
            return;
        }
        // Several simultaneous ball candidates: keep the most confident one,
        // the rest are noise.
        candidates.sort_by(|a, b| {
            b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal)
        });
        if candidates.len() > 1 {
            log::debug!(
                "frame {}: dropping {} extra ball candidate(s) as noise",
                frame_index,
                candidates.len() - 1
            );
        }
        let best = candidates[0];

        if let Some(ball_id) = self.ball_track {
            let idx = ball_id as usize;
            if self.tracks[idx].is_live() {
                let dist =
                    crate::pitch::geometry::distance_m(self.tracks[idx].position(), best.pitch_pos);
                if dist <= self.config.gating_distance_m {
                    self.tracks[idx].confirm(best, timestamp_s, frame_index);
                    matched[idx] = true;
                    return;
                }
                // The candidate is incompatible with the current ball
                // identity; the old track is superseded, not duplicated.
                self.tracks[idx].archive();
            }
        }

        let id = self.spawn_track(best, timestamp_s, frame_index);
        self.ball_track = Some(id);
    }

    fn spawn_track(
        &mut self,
        det: &ProjectedDetection,
        timestamp_s: f64,
        frame_index: u64,
    ) -> TrackId {
        let id = self.tracks.len() as TrackId;
        self.tracks.push(Track::new(id, det, timestamp_s, frame_index, &self.config));
        id
    }

    /// Every track ever created, archived ones included.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(id as usize)
    }

    /// Current ball state, when a live ball identity exists.
    pub fn ball_snapshot(&self) -> Option<BallSnapshot> {
        let id = self.ball_track?;
        let track = &self.tracks[id as usize];
        if !track.is_live() {
            return None;
        }
        Some(BallSnapshot {
            track_id: id,
            pos: track.position(),
            velocity: track.filter.velocity(),
            speed: track.filter.speed(),
        })
    }

    /// Current live team entities (players and goalkeepers).
    pub fn player_snapshots(&self) -> Vec<PlayerSnapshot> {
        self.tracks
            .iter()
            .filter(|t| t.is_live() && t.class.is_team_entity())
            .map(|t| PlayerSnapshot { track_id: t.id, team: t.team(), pos: t.position() })
            .collect()
    }
}

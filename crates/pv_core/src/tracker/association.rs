//! Gated minimum-cost bipartite matching between predicted tracks and
//! detections.

use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;

use crate::pitch::{geometry, PitchPos};

/// Cost resolution: integer millimeters.
const COST_SCALE: f32 = 1000.0;
/// Each cost unit is subdivided so that exact-cost ties resolve by
/// incumbency without reordering distinct costs.
const TIE_BREAK: i64 = 1024;
/// Sentinel for pairs outside the gate (or class-incompatible).
const UNMATCHABLE: i64 = i64::MAX / 1_000_000;

/// A track's view into association: predicted position plus tie-break data.
#[derive(Debug, Clone, Copy)]
pub struct TrackCandidate {
    pub predicted_pos: PitchPos,
    pub bbox_size: Option<(f32, f32)>,
    pub active_streak: u32,
}

/// A detection's view into association.
#[derive(Debug, Clone, Copy)]
pub struct DetectionCandidate {
    pub pitch_pos: PitchPos,
    pub bbox_size: Option<(f32, f32)>,
}

/// Association cost: pitch-space distance plus weighted relative
/// bbox-size dissimilarity (when both sides carry a box).
pub fn association_cost(
    track: &TrackCandidate,
    det: &DetectionCandidate,
    size_cost_weight: f32,
) -> f32 {
    let dist = geometry::distance_m(track.predicted_pos, det.pitch_pos);
    let size_term = match (track.bbox_size, det.bbox_size) {
        (Some((tw, th)), Some((dw, dh))) => {
            let ta = tw * th;
            let da = dw * dh;
            let larger = ta.max(da);
            if larger > 0.0 {
                (ta - da).abs() / larger
            } else {
                0.0
            }
        }
        _ => 0.0,
    };
    dist + size_cost_weight * size_term
}

/// Solve the assignment problem and return matched `(track_idx, det_idx)`
/// pairs.
///
/// Matches whose cost exceeds `gating_distance_m` are rejected; a cost
/// exactly at the threshold is accepted. Ties in cost prefer the track with
/// the longer continuous active streak.
pub fn associate(
    tracks: &[TrackCandidate],
    detections: &[DetectionCandidate],
    gating_distance_m: f32,
    size_cost_weight: f32,
) -> Vec<(usize, usize)> {
    if tracks.is_empty() || detections.is_empty() {
        return Vec::new();
    }

    let scaled_cost = |t: &TrackCandidate, d: &DetectionCandidate| -> i64 {
        let cost = association_cost(t, d, size_cost_weight);
        if cost > gating_distance_m {
            return UNMATCHABLE;
        }
        let base = (cost * COST_SCALE).round() as i64;
        // Longer streak -> smaller tie-break term -> preferred on ties.
        let incumbency = (TIE_BREAK - 1) - (t.active_streak as i64).min(TIE_BREAK - 1);
        base * TIE_BREAK + incumbency
    };

    // kuhn_munkres requires rows <= columns; transpose when tracks
    // outnumber detections.
    let transpose = tracks.len() > detections.len();
    let (rows, cols) =
        if transpose { (detections.len(), tracks.len()) } else { (tracks.len(), detections.len()) };

    let weights = Matrix::from_fn(rows, cols, |(r, c)| {
        let (track_idx, det_idx) = if transpose { (c, r) } else { (r, c) };
        scaled_cost(&tracks[track_idx], &detections[det_idx])
    });

    let (_, assignment) = kuhn_munkres_min(&weights);

    let mut matches = Vec::new();
    for (row, &col) in assignment.iter().enumerate() {
        let (track_idx, det_idx) = if transpose { (col, row) } else { (row, col) };
        let cost = association_cost(&tracks[track_idx], &detections[det_idx], size_cost_weight);
        // Inclusive gate: a cost exactly at the threshold is a valid match.
        if cost <= gating_distance_m {
            matches.push((track_idx, det_idx));
        }
    }
    matches
}

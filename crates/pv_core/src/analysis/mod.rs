//! Tactical aggregation over finalized track and possession data.
//!
//! Pure functions: aggregating the same finalized data twice yields
//! identical summaries. No additional inference happens here.

pub mod shape;

use serde::{Deserialize, Serialize};

use crate::config::TacticalThresholds;
use crate::models::TeamSide;
use crate::pitch::{PitchModel, PitchPos};
use crate::possession::PossessionSummary;
use crate::tracker::Track;

pub use shape::TeamShape;

/// One team's aggregate over a single window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamWindowSummary {
    /// Distinct tracks observed in the window
    pub track_count: usize,
    pub shape: TeamShape,
    /// Sample counts per pitch zone (indexed by the pitch zone partition)
    pub zone_occupancy: Vec<u32>,
}

/// Both teams' aggregates over one time window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowSummary {
    pub start_s: f64,
    pub end_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home: Option<TeamWindowSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub away: Option<TeamWindowSummary>,
}

/// Finalized tactical output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TacticalSummary {
    pub windows: Vec<WindowSummary>,
    /// Controlled time per team over total elapsed time, in percent.
    pub possession_home_pct: f32,
    pub possession_away_pct: f32,
    /// Whole-stream per-zone sample counts per team.
    pub zone_counts_home: Vec<u32>,
    pub zone_counts_away: Vec<u32>,
}

/// Aggregate team positioning and possession over fixed windows.
pub fn aggregate(
    tracks: &[Track],
    possession: &PossessionSummary,
    pitch: &PitchModel,
    config: &TacticalThresholds,
    duration_s: f64,
) -> TacticalSummary {
    let mut summary = TacticalSummary {
        zone_counts_home: vec![0; pitch.zone_count()],
        zone_counts_away: vec![0; pitch.zone_count()],
        ..Default::default()
    };

    if duration_s > 0.0 {
        summary.possession_home_pct =
            (possession.controlled_time_home_s / duration_s * 100.0) as f32;
        summary.possession_away_pct =
            (possession.controlled_time_away_s / duration_s * 100.0) as f32;
    }

    // Per-team samples: (timestamp, track id, position)
    let mut home_samples: Vec<(f64, u32, PitchPos)> = Vec::new();
    let mut away_samples: Vec<(f64, u32, PitchPos)> = Vec::new();
    for track in tracks {
        if !track.class.is_team_entity() {
            continue;
        }
        let Some(team) = track.team() else { continue };
        let bucket = match team {
            TeamSide::Home => &mut home_samples,
            TeamSide::Away => &mut away_samples,
        };
        for sample in &track.samples {
            bucket.push((sample.timestamp_s, track.id, sample.pitch_pos));
            let zone = pitch.zone_index(sample.pitch_pos);
            match team {
                TeamSide::Home => summary.zone_counts_home[zone] += 1,
                TeamSide::Away => summary.zone_counts_away[zone] += 1,
            }
        }
    }

    let window_count = if duration_s > 0.0 {
        (duration_s / config.window_s).ceil() as usize
    } else {
        0
    };

    for w in 0..window_count {
        let start_s = w as f64 * config.window_s;
        let end_s = (start_s + config.window_s).min(duration_s);
        summary.windows.push(WindowSummary {
            start_s,
            end_s,
            home: team_window(&home_samples, start_s, end_s, pitch),
            away: team_window(&away_samples, start_s, end_s, pitch),
        });
    }

    summary
}

fn team_window(
    samples: &[(f64, u32, PitchPos)],
    start_s: f64,
    end_s: f64,
    pitch: &PitchModel,
) -> Option<TeamWindowSummary> {
    let in_window: Vec<&(f64, u32, PitchPos)> =
        samples.iter().filter(|(t, _, _)| *t >= start_s && *t < end_s).collect();
    if in_window.is_empty() {
        return None;
    }

    let positions: Vec<PitchPos> = in_window.iter().map(|(_, _, p)| *p).collect();
    let shape = shape::team_shape(&positions)?;

    let mut track_ids: Vec<u32> = in_window.iter().map(|(_, id, _)| *id).collect();
    track_ids.sort_unstable();
    track_ids.dedup();

    let mut zone_occupancy = vec![0u32; pitch.zone_count()];
    for pos in &positions {
        zone_occupancy[pitch.zone_index(*pos)] += 1;
    }

    Some(TeamWindowSummary { track_count: track_ids.len(), shape, zone_occupancy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackingThresholds;
    use crate::models::DetectionClass;
    use crate::tracker::ProjectedDetection;

    fn make_track(id: u32, team: TeamSide, base: PitchPos, n: usize) -> Track {
        let config = TrackingThresholds::default();
        let det = |pos: PitchPos| ProjectedDetection {
            class: DetectionClass::Player,
            team: Some(team),
            pitch_pos: pos,
            pixel_pos: (pos.0 * 10.0, pos.1 * 10.0),
            bbox_size: None,
            confidence: 0.9,
        };
        let mut track = Track::new(id, &det(base), 0.0, 0, &config);
        for i in 1..n as u64 {
            let pos = (base.0 + i as f32 * 0.1, base.1);
            track.confirm(&det(pos), i as f64 * 0.04, i);
        }
        track
    }

    fn empty_possession() -> PossessionSummary {
        PossessionSummary {
            episodes: Vec::new(),
            events: Vec::new(),
            controlled_time_home_s: 0.0,
            controlled_time_away_s: 0.0,
        }
    }

    #[test]
    fn test_possession_percentage() {
        let possession = PossessionSummary {
            controlled_time_home_s: 40.0,
            controlled_time_away_s: 20.0,
            ..empty_possession()
        };
        let summary = aggregate(
            &[],
            &possession,
            &PitchModel::default(),
            &TacticalThresholds::default(),
            100.0,
        );
        assert!((summary.possession_home_pct - 40.0).abs() < 1e-4);
        assert!((summary.possession_away_pct - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_windows_cover_duration() {
        let config = TacticalThresholds { window_s: 60.0 };
        let summary =
            aggregate(&[], &empty_possession(), &PitchModel::default(), &config, 150.0);
        assert_eq!(summary.windows.len(), 3);
        assert!((summary.windows[2].end_s - 150.0).abs() < 1e-9);
        // No samples: per-team summaries absent, never fabricated
        assert!(summary.windows.iter().all(|w| w.home.is_none() && w.away.is_none()));
    }

    #[test]
    fn test_team_split_and_zone_counts() {
        let tracks = vec![
            make_track(0, TeamSide::Home, (20.0, 34.0), 10),
            make_track(1, TeamSide::Away, (80.0, 34.0), 10),
        ];
        let summary = aggregate(
            &tracks,
            &empty_possession(),
            &PitchModel::default(),
            &TacticalThresholds::default(),
            1.0,
        );
        assert_eq!(summary.windows.len(), 1);
        let window = &summary.windows[0];
        assert_eq!(window.home.as_ref().unwrap().track_count, 1);
        assert_eq!(window.away.as_ref().unwrap().track_count, 1);

        // Home samples sit in the defensive-center zone, away in the
        // attacking-center zone (3x3 partition).
        assert_eq!(summary.zone_counts_home.iter().sum::<u32>(), 10);
        assert_eq!(summary.zone_counts_away.iter().sum::<u32>(), 10);
        assert_eq!(summary.zone_counts_home[1], 10);
        assert_eq!(summary.zone_counts_away[7], 10);
    }

    #[test]
    fn test_centroid_tracks_positions() {
        let tracks = vec![
            make_track(0, TeamSide::Home, (20.0, 20.0), 1),
            make_track(1, TeamSide::Home, (40.0, 48.0), 1),
        ];
        let summary = aggregate(
            &tracks,
            &empty_possession(),
            &PitchModel::default(),
            &TacticalThresholds::default(),
            1.0,
        );
        let home = summary.windows[0].home.as_ref().unwrap();
        assert!((home.shape.centroid.0 - 30.0).abs() < 1e-4);
        assert!((home.shape.centroid.1 - 34.0).abs() < 1e-4);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let tracks = vec![
            make_track(0, TeamSide::Home, (20.0, 30.0), 25),
            make_track(1, TeamSide::Home, (35.0, 40.0), 25),
            make_track(2, TeamSide::Away, (70.0, 30.0), 25),
        ];
        let possession = PossessionSummary {
            controlled_time_home_s: 0.6,
            controlled_time_away_s: 0.2,
            ..empty_possession()
        };
        let pitch = PitchModel::default();
        let config = TacticalThresholds::default();

        let first = aggregate(&tracks, &possession, &pitch, &config, 1.0);
        let second = aggregate(&tracks, &possession, &pitch, &config, 1.0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_duration_yields_empty_summary() {
        let summary = aggregate(
            &[],
            &empty_possession(),
            &PitchModel::default(),
            &TacticalThresholds::default(),
            0.0,
        );
        assert!(summary.windows.is_empty());
        assert_eq!(summary.possession_home_pct, 0.0);
    }
}

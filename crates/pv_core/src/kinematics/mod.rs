//! Kinematic signals derived from a track's position history.
//!
//! Raw pitch positions are smoothed before differentiation to suppress
//! detector jitter. Frame gaps beyond the coasting budget split the history
//! into independent segments: distance is never accumulated across such a
//! gap, so occlusion cannot inflate totals with phantom teleportation.

use serde::{Deserialize, Serialize};

use crate::config::KinematicsThresholds;
use crate::pitch::{geometry, PitchPos};
use crate::tracker::TrackSample;

/// A contiguous interval of sustained high-speed movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Sprint {
    pub start_s: f64,
    pub end_s: f64,
    pub peak_speed_mps: f32,
    pub distance_m: f32,
}

/// Share of moving time spent in each speed band, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct SpeedZones {
    pub walking_pct: f32,
    pub jogging_pct: f32,
    pub running_pct: f32,
    pub sprinting_pct: f32,
}

/// Kinematic summary for one track.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TrackKinematics {
    pub total_distance_m: f32,
    /// Distance covered above the high-intensity speed threshold.
    pub high_intensity_distance_m: f32,
    /// Distance covered above the sprint speed threshold.
    pub sprint_distance_m: f32,
    pub avg_speed_mps: f32,
    pub max_speed_mps: f32,
    pub max_acceleration_mps2: f32,
    pub speed_zones: SpeedZones,
    pub sprints: Vec<Sprint>,
}

/// Derive the kinematic summary from a track's confirmed samples.
///
/// `max_coast_frames` is the same budget the tracker uses: a frame gap
/// beyond it breaks continuity instead of being bridged.
pub fn analyze_track(
    samples: &[TrackSample],
    config: &KinematicsThresholds,
    max_coast_frames: u32,
) -> TrackKinematics {
    if samples.len() < 2 {
        return TrackKinematics::default();
    }

    let mut result = TrackKinematics::default();
    let mut zone_time = [0.0f64; 4];
    let mut moving_time = 0.0f64;

    for segment in split_segments(samples, max_coast_frames) {
        analyze_segment(segment, config, &mut result, &mut zone_time, &mut moving_time);
    }

    if moving_time > 0.0 {
        result.avg_speed_mps = (result.total_distance_m as f64 / moving_time) as f32;
        result.speed_zones = SpeedZones {
            walking_pct: (zone_time[0] / moving_time * 100.0) as f32,
            jogging_pct: (zone_time[1] / moving_time * 100.0) as f32,
            running_pct: (zone_time[2] / moving_time * 100.0) as f32,
            sprinting_pct: (zone_time[3] / moving_time * 100.0) as f32,
        };
    }

    result
}

/// Split sample history at frame gaps exceeding the coasting budget.
///
/// The number of missed frames between consecutive samples is the index
/// gap minus one, matching the tracker's miss counter.
fn split_segments(samples: &[TrackSample], max_coast_frames: u32) -> Vec<&[TrackSample]> {
    let mut segments = Vec::new();
    let mut start = 0;
    for i in 1..samples.len() {
        let missed_frames =
            samples[i].frame_index.saturating_sub(samples[i - 1].frame_index).saturating_sub(1);
        if missed_frames > max_coast_frames as u64 {
            segments.push(&samples[start..i]);
            start = i;
        }
    }
    segments.push(&samples[start..]);
    segments
}

/// Centered moving average over the segment, window clamped at the edges.
fn smooth_positions(segment: &[TrackSample], window: u32) -> Vec<PitchPos> {
    let half = (window.max(1) / 2) as usize;
    (0..segment.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(segment.len());
            let n = (hi - lo) as f32;
            let sum = segment[lo..hi]
                .iter()
                .fold((0.0f32, 0.0f32), |acc, s| (acc.0 + s.pitch_pos.0, acc.1 + s.pitch_pos.1));
            (sum.0 / n, sum.1 / n)
        })
        .collect()
}

fn analyze_segment(
    segment: &[TrackSample],
    config: &KinematicsThresholds,
    result: &mut TrackKinematics,
    zone_time: &mut [f64; 4],
    moving_time: &mut f64,
) {
    if segment.len() < 2 {
        return;
    }

    let smoothed = smooth_positions(segment, config.smoothing_window);

    let mut prev_speed: Option<(f64, f32)> = None;

    let mut sprint_start: Option<f64> = None;
    let mut sprint_peak = 0.0f32;
    let mut sprint_dist = 0.0f32;
    let mut sprint_last_end = segment[0].timestamp_s;

    for i in 1..segment.len() {
        let dt = segment[i].timestamp_s - segment[i - 1].timestamp_s;
        if dt <= 0.0 {
            continue;
        }
        let step = geometry::distance_m(smoothed[i - 1], smoothed[i]);
        let speed = (step as f64 / dt) as f32;

        result.total_distance_m += step;
        if speed > config.high_intensity_speed_mps {
            result.high_intensity_distance_m += step;
        }
        if speed > config.sprint_speed_mps {
            result.sprint_distance_m += step;
        }
        result.max_speed_mps = result.max_speed_mps.max(speed);
        *moving_time += dt;

        let zone = if speed <= config.walking_speed_mps {
            0
        } else if speed <= config.jogging_speed_mps {
            1
        } else if speed <= config.running_speed_mps {
            2
        } else {
            3
        };
        zone_time[zone] += dt;

        if let Some((prev_t, prev_v)) = prev_speed {
            let accel_dt = segment[i].timestamp_s - prev_t;
            if accel_dt > 0.0 {
                let accel = ((speed - prev_v) as f64 / accel_dt).abs() as f32;
                result.max_acceleration_mps2 = result.max_acceleration_mps2.max(accel);
            }
        }
        prev_speed = Some((segment[i].timestamp_s, speed));

        // Sprint accumulation within the segment.
        if speed > config.sprint_speed_mps {
            if sprint_start.is_none() {
                sprint_start = Some(segment[i - 1].timestamp_s);
                sprint_peak = 0.0;
                sprint_dist = 0.0;
            }
            sprint_peak = sprint_peak.max(speed);
            sprint_dist += step;
            sprint_last_end = segment[i].timestamp_s;
        } else if let Some(start) = sprint_start.take() {
            close_sprint(result, config, start, sprint_last_end, sprint_peak, sprint_dist);
        }
    }

    if let Some(start) = sprint_start {
        close_sprint(result, config, start, sprint_last_end, sprint_peak, sprint_dist);
    }
}

fn close_sprint(
    result: &mut TrackKinematics,
    config: &KinematicsThresholds,
    start_s: f64,
    end_s: f64,
    peak_speed_mps: f32,
    distance_m: f32,
) {
    if end_s - start_s >= config.sprint_min_duration_s {
        result.sprints.push(Sprint { start_s, end_s, peak_speed_mps, distance_m });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, frame: u64, pos: PitchPos) -> TrackSample {
        TrackSample {
            timestamp_s: t,
            frame_index: frame,
            pitch_pos: pos,
            pixel_pos: (pos.0 * 10.0, pos.1 * 10.0),
            confidence: 0.9,
        }
    }

    /// No smoothing, so displacements are exact.
    fn raw_config() -> KinematicsThresholds {
        KinematicsThresholds { smoothing_window: 1, ..Default::default() }
    }

    #[test]
    fn test_empty_and_single_sample() {
        let config = raw_config();
        assert_eq!(analyze_track(&[], &config, 30), TrackKinematics::default());
        let one = [sample(0.0, 0, (10.0, 10.0))];
        assert_eq!(analyze_track(&one, &config, 30), TrackKinematics::default());
    }

    #[test]
    fn test_stationary_entity_covers_no_distance() {
        let config = raw_config();
        let samples: Vec<_> = (0..50).map(|i| sample(i as f64 * 0.04, i, (30.0, 30.0))).collect();
        let k = analyze_track(&samples, &config, 30);
        assert!(k.total_distance_m < 1e-4);
        assert!(k.sprints.is_empty());
    }

    #[test]
    fn test_constant_speed_distance_and_average() {
        let config = raw_config();
        // 3 m/s along x for 10 seconds at 25 fps
        let samples: Vec<_> = (0..251)
            .map(|i| {
                let t = i as f64 * 0.04;
                sample(t, i, (10.0 + 3.0 * t as f32, 20.0))
            })
            .collect();
        let k = analyze_track(&samples, &config, 30);
        assert!((k.total_distance_m - 30.0).abs() < 0.1, "distance {}", k.total_distance_m);
        assert!((k.avg_speed_mps - 3.0).abs() < 0.05, "avg {}", k.avg_speed_mps);
        assert!((k.max_speed_mps - 3.0).abs() < 0.05);
        // 3 m/s sits in the jogging band
        assert!(k.speed_zones.jogging_pct > 99.0);
        assert!(k.sprints.is_empty());
    }

    #[test]
    fn test_gap_within_budget_counts_straight_line_displacement() {
        let config = raw_config();
        // 10-frame gap (within the 30-frame budget): the 5 m displacement
        // across it is counted as the straight-line distance.
        let samples = [
            sample(0.0, 0, (10.0, 10.0)),
            sample(0.04, 1, (10.0, 10.0)),
            sample(0.44, 11, (13.0, 14.0)),
        ];
        let k = analyze_track(&samples, &config, 30);
        assert!((k.total_distance_m - 5.0).abs() < 1e-4, "distance {}", k.total_distance_m);
    }

    #[test]
    fn test_gap_beyond_budget_excluded_from_distance() {
        let config = raw_config();
        // Same geometry, but the gap exceeds the budget: no phantom
        // teleportation distance.
        let samples = [
            sample(0.0, 0, (10.0, 10.0)),
            sample(0.04, 1, (10.0, 10.0)),
            sample(2.0, 50, (13.0, 14.0)),
        ];
        let k = analyze_track(&samples, &config, 30);
        assert!(k.total_distance_m < 1e-4, "distance {}", k.total_distance_m);
    }

    #[test]
    fn test_sprint_detection() {
        let config = raw_config();
        let mut samples = Vec::new();
        let fps = 25.0;
        let mut x = 0.0f32;
        // 2 s walk, 2 s sprint at 8 m/s, 2 s walk
        for i in 0..150u64 {
            let t = i as f64 / fps;
            let speed = if (50..100).contains(&i) { 8.0 } else { 1.0 };
            x += speed / fps as f32;
            samples.push(sample(t, i, (x, 20.0)));
        }
        let k = analyze_track(&samples, &config, 30);
        assert_eq!(k.sprints.len(), 1, "exactly one sprint expected");
        let sprint = &k.sprints[0];
        assert!((sprint.peak_speed_mps - 8.0).abs() < 0.2);
        assert!((sprint.distance_m - 16.0).abs() < 0.5, "sprint distance {}", sprint.distance_m);
        assert!(sprint.end_s - sprint.start_s >= 1.9);
        assert!(k.sprint_distance_m > 15.0);
        assert!(k.high_intensity_distance_m >= k.sprint_distance_m);
    }

    #[test]
    fn test_short_burst_below_min_duration_not_a_sprint() {
        let config = raw_config();
        let mut samples = Vec::new();
        let fps = 25.0;
        let mut x = 0.0f32;
        // Only 0.4 s above the sprint threshold
        for i in 0..50u64 {
            let t = i as f64 / fps;
            let speed = if (20..30).contains(&i) { 8.0 } else { 1.0 };
            x += speed / fps as f32;
            samples.push(sample(t, i, (x, 20.0)));
        }
        let k = analyze_track(&samples, &config, 30);
        assert!(k.sprints.is_empty());
        // The distance still counts toward the sprint-speed band
        assert!(k.sprint_distance_m > 0.0);
    }

    #[test]
    fn test_smoothing_damps_jitter_speed() {
        // Alternating +-0.2 m jitter around a fixed point at 25 fps reads
        // as 5 m/s raw; smoothing should cut the apparent peak well below.
        let raw = raw_config();
        let smoothed_cfg =
            KinematicsThresholds { smoothing_window: 5, ..Default::default() };
        let samples: Vec<_> = (0..100)
            .map(|i| {
                let jitter = if i % 2 == 0 { 0.2 } else { -0.2 };
                sample(i as f64 * 0.04, i, (30.0 + jitter, 30.0))
            })
            .collect();

        let k_raw = analyze_track(&samples, &raw, 30);
        let k_smooth = analyze_track(&samples, &smoothed_cfg, 30);
        assert!(
            k_smooth.max_speed_mps < k_raw.max_speed_mps * 0.25,
            "smoothing should suppress jitter: raw {} vs smooth {}",
            k_raw.max_speed_mps,
            k_smooth.max_speed_mps
        );
    }

    #[test]
    fn test_speed_zone_percentages_sum_to_100() {
        let config = raw_config();
        let mut samples = Vec::new();
        let fps = 25.0;
        let mut x = 0.0f32;
        for i in 0..200u64 {
            let t = i as f64 / fps;
            let speed = match i / 50 {
                0 => 1.0, // walking
                1 => 3.0, // jogging
                2 => 5.0, // running
                _ => 8.0, // sprinting
            };
            x += speed / fps as f32;
            samples.push(sample(t, i, (x, 20.0)));
        }
        let k = analyze_track(&samples, &config, 30);
        let sum = k.speed_zones.walking_pct
            + k.speed_zones.jogging_pct
            + k.speed_zones.running_pct
            + k.speed_zones.sprinting_pct;
        assert!((sum - 100.0).abs() < 0.1, "zones sum to {}", sum);
        assert!(k.speed_zones.walking_pct > 20.0);
        assert!(k.speed_zones.sprinting_pct > 20.0);
    }
}

//! The analytics pipeline: ordered frame ingestion through to the final
//! report.
//!
//! Frames are consumed in strict timestamp order; detection ingestion can be
//! decoupled from processing with a bounded channel so a faster detector
//! blocks instead of ballooning memory. A fatal mid-stream error aborts only
//! the stream being processed and keeps everything computed so far.

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::analysis;
use crate::calibration::Calibration;
use crate::config::AnalyticsConfig;
use crate::error::{Result, SequenceError};
use crate::kinematics;
use crate::models::FrameDetections;
use crate::pitch::PitchModel;
use crate::possession::EventDetector;
use crate::report::{MatchAnalysis, TrackReport};
use crate::tracker::{ProjectedDetection, Tracker};

#[derive(Debug)]
pub struct AnalyticsPipeline {
    config: AnalyticsConfig,
    pitch: PitchModel,
    calibration: Calibration,
    tracker: Tracker,
    detector: EventDetector,
    last_timestamp: Option<f64>,
    last_frame_index: Option<u64>,
    frames_processed: u64,
    frames_skipped: u64,
    detections_skipped: u64,
    abort_reason: Option<String>,
}

impl AnalyticsPipeline {
    /// Construct a pipeline. Calibration and configuration problems are
    /// fatal here, before any frame is consumed.
    pub fn new(config: AnalyticsConfig) -> Result<Self> {
        config.validate()?;
        let calibration = Calibration::from_source(&config.calibration)?;
        let pitch = config.pitch.clone();
        let tracker = Tracker::new(config.tracking.clone());
        let detector =
            EventDetector::new(config.possession.clone(), pitch.clone(), config.home_attacks);
        Ok(Self {
            config,
            pitch,
            calibration,
            tracker,
            detector,
            last_timestamp: None,
            last_frame_index: None,
            frames_processed: 0,
            frames_skipped: 0,
            detections_skipped: 0,
            abort_reason: None,
        })
    }

    /// Consume one frame batch.
    ///
    /// Out-of-order or duplicate timestamps are fatal for the stream;
    /// malformed detections within a frame are skipped with a warning.
    pub fn process_frame(&mut self, frame: &FrameDetections) -> Result<()> {
        if !frame.timestamp_s.is_finite() {
            log::warn!("frame {}: non-finite timestamp, frame skipped", frame.frame_index);
            self.frames_skipped += 1;
            return Ok(());
        }
        if let Some(last) = self.last_timestamp {
            if frame.timestamp_s == last {
                return Err(SequenceError::DuplicateTimestamp { timestamp: frame.timestamp_s }.into());
            }
            if frame.timestamp_s < last {
                return Err(
                    SequenceError::OutOfOrderTimestamp { last, got: frame.timestamp_s }.into()
                );
            }
        }
        if let Some(last) = self.last_frame_index {
            if frame.frame_index <= last {
                return Err(
                    SequenceError::OutOfOrderFrame { last, got: frame.frame_index }.into()
                );
            }
        }

        let mut projected = Vec::with_capacity(frame.detections.len());
        for det in &frame.detections {
            if !det.is_well_formed() {
                log::warn!(
                    "frame {}: malformed {:?} detection skipped",
                    frame.frame_index,
                    det.class
                );
                self.detections_skipped += 1;
                continue;
            }
            let pitch_pos = self.calibration.pixel_to_pitch(det.pixel_pos);
            if !pitch_pos.0.is_finite() || !pitch_pos.1.is_finite() {
                log::warn!(
                    "frame {}: detection projects outside the homography plane, skipped",
                    frame.frame_index
                );
                self.detections_skipped += 1;
                continue;
            }
            projected.push(ProjectedDetection {
                class: det.class,
                team: det.team,
                pitch_pos,
                pixel_pos: det.pixel_pos,
                bbox_size: det.bbox_size,
                confidence: det.confidence,
            });
        }

        self.last_timestamp = Some(frame.timestamp_s);
        self.last_frame_index = Some(frame.frame_index);

        self.tracker.step(frame.timestamp_s, frame.frame_index, &projected);

        let ball = self.tracker.ball_snapshot();
        let players = self.tracker.player_snapshots();
        self.detector.step(frame.timestamp_s, frame.frame_index, ball.as_ref(), &players);

        self.frames_processed += 1;
        Ok(())
    }

    /// Record why processing stopped early; the partial result survives.
    pub fn abort(&mut self, reason: impl Into<String>) {
        self.abort_reason = Some(reason.into());
    }

    /// Produce the final structured result from everything processed so far.
    pub fn finalize(self) -> MatchAnalysis {
        let duration_s = self.last_timestamp.unwrap_or(0.0);

        let tracks: Vec<TrackReport> = self
            .tracker
            .tracks()
            .iter()
            .map(|track| TrackReport {
                track_id: track.id,
                class: track.class,
                team: track.team(),
                status: track.status,
                first_seen_s: track.samples.first().map(|s| s.timestamp_s).unwrap_or(0.0),
                last_seen_s: track.samples.last().map(|s| s.timestamp_s).unwrap_or(0.0),
                sample_count: track.samples.len(),
                kinematics: kinematics::analyze_track(
                    &track.samples,
                    &self.config.kinematics,
                    self.config.tracking.max_coast_frames,
                ),
            })
            .collect();

        let possession = self.detector.finalize(duration_s);
        let tactical = analysis::aggregate(
            self.tracker.tracks(),
            &possession,
            &self.pitch,
            &self.config.tactical,
            duration_s,
        );

        MatchAnalysis {
            duration_s,
            frames_processed: self.frames_processed,
            frames_skipped: self.frames_skipped,
            detections_skipped: self.detections_skipped,
            tracks,
            events: possession.events,
            episodes: possession.episodes,
            tactical,
            abort_reason: self.abort_reason,
        }
    }

    /// Convenience: drive a whole detection stream to a result.
    ///
    /// A fatal mid-stream error does not discard work: the result carries
    /// everything computed up to the bad frame plus the abort reason.
    pub fn run<I>(config: AnalyticsConfig, frames: I) -> Result<MatchAnalysis>
    where
        I: IntoIterator<Item = FrameDetections>,
    {
        let mut pipeline = Self::new(config)?;
        for frame in frames {
            if let Err(err) = pipeline.process_frame(&frame) {
                log::warn!("stream aborted: {}", err);
                pipeline.abort(err.to_string());
                break;
            }
        }
        Ok(pipeline.finalize())
    }

    /// Spawn a consumer thread fed through a bounded channel.
    ///
    /// The returned sender applies backpressure: once `capacity` frames are
    /// queued, the producer blocks until the pipeline catches up. Dropping
    /// the sender ends the stream and finalizes the result.
    pub fn spawn_ingest(
        config: AnalyticsConfig,
        capacity: usize,
    ) -> Result<(Sender<FrameDetections>, std::thread::JoinHandle<MatchAnalysis>)> {
        let mut pipeline = Self::new(config)?;
        let (tx, rx): (Sender<FrameDetections>, Receiver<FrameDetections>) = bounded(capacity);
        let handle = std::thread::spawn(move || {
            for frame in rx.iter() {
                if let Err(err) = pipeline.process_frame(&frame) {
                    log::warn!("stream aborted: {}", err);
                    pipeline.abort(err.to_string());
                    break;
                }
            }
            pipeline.finalize()
        });
        Ok((tx, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::models::{Detection, DetectionClass, EventKind, TeamSide};

    fn player_det(x: f32, y: f32, team: TeamSide) -> Detection {
        Detection {
            class: DetectionClass::Player,
            team: Some(team),
            pixel_pos: (x, y),
            bbox_size: Some((20.0, 40.0)),
            confidence: 0.9,
        }
    }

    fn ball_det(x: f32, y: f32) -> Detection {
        Detection {
            class: DetectionClass::Ball,
            team: None,
            pixel_pos: (x, y),
            bbox_size: None,
            confidence: 0.9,
        }
    }

    /// Default config projects pixels at 0.1 m/px, so pitch (x m, y m) is
    /// pixel (10x, 10y).
    fn frame(i: u64, detections: Vec<Detection>) -> FrameDetections {
        FrameDetections { frame_index: i, timestamp_s: i as f64 / 25.0, detections }
    }

    #[test]
    fn test_construction_rejects_bad_calibration() {
        let mut config = AnalyticsConfig::default();
        config.calibration = crate::calibration::CalibrationSource::Homography([
            [1.0, 2.0, 3.0],
            [2.0, 4.0, 6.0],
            [0.0, 0.0, 1.0],
        ]);
        let err = AnalyticsPipeline::new(config).unwrap_err();
        assert!(matches!(err, AnalyticsError::Calibration(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_out_of_order_timestamp_rejected() {
        let mut pipeline = AnalyticsPipeline::new(AnalyticsConfig::default()).unwrap();
        pipeline.process_frame(&frame(0, vec![])).unwrap();
        pipeline.process_frame(&frame(1, vec![])).unwrap();

        let bad = FrameDetections { frame_index: 2, timestamp_s: 0.01, detections: vec![] };
        let err = pipeline.process_frame(&bad).unwrap_err();
        assert!(matches!(err, AnalyticsError::Sequence(SequenceError::OutOfOrderTimestamp { .. })));
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let mut pipeline = AnalyticsPipeline::new(AnalyticsConfig::default()).unwrap();
        pipeline.process_frame(&frame(0, vec![])).unwrap();
        let dup = FrameDetections { frame_index: 1, timestamp_s: 0.0, detections: vec![] };
        let err = pipeline.process_frame(&dup).unwrap_err();
        assert!(matches!(err, AnalyticsError::Sequence(SequenceError::DuplicateTimestamp { .. })));
    }

    #[test]
    fn test_malformed_detection_skipped_not_fatal() {
        let mut pipeline = AnalyticsPipeline::new(AnalyticsConfig::default()).unwrap();
        let mut bad = player_det(200.0, 300.0, TeamSide::Home);
        bad.confidence = 2.0;
        pipeline
            .process_frame(&frame(0, vec![bad, player_det(400.0, 300.0, TeamSide::Home)]))
            .unwrap();

        let analysis = pipeline.finalize();
        assert_eq!(analysis.detections_skipped, 1);
        assert_eq!(analysis.frames_processed, 1);
        assert_eq!(analysis.tracks.len(), 1);
    }

    #[test]
    fn test_end_to_end_pass_scenario() {
        // Player A at pitch (30, 34), B at (50, 34); the ball travels from
        // A to B at 12.5 m/s. Expect one completed pass A -> B in the final
        // report.
        let mut frames = Vec::new();
        let a_px = (300.0, 340.0);
        let b_px = (500.0, 340.0);

        let mut i = 0u64;
        // Settle control with A
        for _ in 0..15 {
            frames.push(frame(
                i,
                vec![
                    player_det(a_px.0, a_px.1, TeamSide::Home),
                    player_det(b_px.0, b_px.1, TeamSide::Home),
                    ball_det(a_px.0, a_px.1),
                ],
            ));
            i += 1;
        }
        // Ball in flight: 12.5 m/s = 0.5 m per frame = 5 px per frame
        let mut ball_x = a_px.0;
        while ball_x < b_px.0 {
            ball_x += 5.0;
            frames.push(frame(
                i,
                vec![
                    player_det(a_px.0, a_px.1, TeamSide::Home),
                    player_det(b_px.0, b_px.1, TeamSide::Home),
                    ball_det(ball_x.min(b_px.0), a_px.1),
                ],
            ));
            i += 1;
        }
        // Ball settles with B
        for _ in 0..25 {
            frames.push(frame(
                i,
                vec![
                    player_det(a_px.0, a_px.1, TeamSide::Home),
                    player_det(b_px.0, b_px.1, TeamSide::Home),
                    ball_det(b_px.0, b_px.1),
                ],
            ));
            i += 1;
        }

        let analysis = AnalyticsPipeline::run(AnalyticsConfig::default(), frames).unwrap();

        assert!(analysis.abort_reason.is_none());
        let passes: Vec<_> =
            analysis.events.iter().filter(|e| e.event_type == EventKind::Pass).collect();
        assert_eq!(passes.len(), 1, "events: {:?}", analysis.events);
        // Player tracks: A and B (plus the ball track)
        assert_eq!(analysis.tracks.len(), 3);
        assert!(analysis.tactical.possession_home_pct > 0.0);
    }

    #[test]
    fn test_run_keeps_partial_result_on_mid_stream_error() {
        let frames = vec![
            frame(0, vec![player_det(300.0, 340.0, TeamSide::Home)]),
            frame(1, vec![player_det(302.0, 340.0, TeamSide::Home)]),
            // Out-of-order timestamp: fatal for the stream
            FrameDetections { frame_index: 2, timestamp_s: 0.0, detections: vec![] },
            frame(3, vec![player_det(304.0, 340.0, TeamSide::Home)]),
        ];
        let analysis = AnalyticsPipeline::run(AnalyticsConfig::default(), frames).unwrap();

        assert_eq!(analysis.frames_processed, 2, "work before the bad frame is kept");
        assert!(analysis.abort_reason.as_deref().unwrap_or("").contains("out-of-order"));
        assert_eq!(analysis.tracks.len(), 1);
    }

    #[test]
    fn test_bounded_ingest_round_trip() {
        let (tx, handle) = AnalyticsPipeline::spawn_ingest(AnalyticsConfig::default(), 4).unwrap();
        for i in 0..50u64 {
            tx.send(frame(i, vec![player_det(300.0 + i as f32, 340.0, TeamSide::Away)])).unwrap();
        }
        drop(tx);
        let analysis = handle.join().unwrap();
        assert_eq!(analysis.frames_processed, 50);
        assert_eq!(analysis.tracks.len(), 1);
        assert_eq!(analysis.tracks[0].team, Some(TeamSide::Away));
    }

    #[test]
    fn test_empty_stream_yields_wellformed_empty_result() {
        let analysis =
            AnalyticsPipeline::run(AnalyticsConfig::default(), Vec::new()).unwrap();
        assert_eq!(analysis.frames_processed, 0);
        assert_eq!(analysis.duration_s, 0.0);
        assert!(analysis.tracks.is_empty());
        assert!(analysis.events.is_empty());
    }
}

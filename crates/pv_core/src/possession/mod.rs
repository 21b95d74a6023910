//! Possession episodes and technical-event inference.
//!
//! A finite-state machine consumes the ball track's kinematics and its
//! proximity to player tracks, and emits discrete events (pass, shot, goal,
//! possession change). Ambiguous motion is never classified: when ball speed
//! sits between the control and kick thresholds with no clear departure, the
//! machine waits until the situation resolves or times out, preferring
//! omission over a wrong label.

use serde::{Deserialize, Serialize};

use crate::config::PossessionThresholds;
use crate::models::{
    EventDetails, EventKind, MatchEvent, PassDirection, PassOutcome, PassRange, TeamSide, TrackId,
};
use crate::pitch::{geometry, GoalEnd, PitchModel, PitchPos};
use crate::tracker::{BallSnapshot, PlayerSnapshot};

/// How a possession episode ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeOutcome {
    /// Control passed to the other team
    Turnover,
    /// The ball went uncontrolled past the transit timeout
    LooseBall,
    Goal,
    OutOfPlay,
    /// The stream ended with the episode still open
    EndOfStream,
}

/// A contiguous interval during which one team retains the ball.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PossessionEpisode {
    pub team: TeamSide,
    pub start_s: f64,
    pub end_s: f64,
    /// Ordered controlling players (consecutive duplicates collapsed).
    pub controllers: Vec<TrackId>,
    /// Indices into the detector's emitted event sequence.
    pub event_indices: Vec<usize>,
    pub outcome: EpisodeOutcome,
}

/// Current control state of the ball.
#[derive(Debug, Clone, Copy)]
enum Phase {
    /// No clear possession
    Neutral,
    /// One player within the control radius with the ball moving slowly
    Controlled { player: TrackId, team: TeamSide },
    /// Ball moving between controllers
    InTransit {
        from_player: TrackId,
        from_team: TeamSide,
        launch_pos: PitchPos,
        launch_s: f64,
        launch_frame: u64,
        /// True only when the departure exceeded the kick speed threshold;
        /// an ambiguous drift never produces a pass event.
        kicked: bool,
        /// A launch aimed at the goal region is a shot candidate; it is
        /// emitted only if no player controls the ball in between. The flag
        /// records on-target classification from the launch trajectory.
        pending_shot: Option<bool>,
    },
}

#[derive(Debug)]
struct OpenEpisode {
    team: TeamSide,
    start_s: f64,
    controllers: Vec<TrackId>,
    event_indices: Vec<usize>,
}

/// Per-stream possession state machine.
///
/// The episode context lives inside the detector instance and is passed
/// explicitly through the pipeline; concurrent analyses of separate streams
/// share nothing.
#[derive(Debug)]
pub struct EventDetector {
    config: PossessionThresholds,
    pitch: PitchModel,
    home_attacks: GoalEnd,
    phase: Phase,
    open_episode: Option<OpenEpisode>,
    episodes: Vec<PossessionEpisode>,
    events: Vec<MatchEvent>,
    /// Accumulated controlled seconds per team [home, away].
    controlled_time: [f64; 2],
    last_step_s: Option<f64>,
}

/// Finalized possession output for the report assembler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PossessionSummary {
    pub episodes: Vec<PossessionEpisode>,
    pub events: Vec<MatchEvent>,
    pub controlled_time_home_s: f64,
    pub controlled_time_away_s: f64,
}

impl EventDetector {
    pub fn new(config: PossessionThresholds, pitch: PitchModel, home_attacks: GoalEnd) -> Self {
        Self {
            config,
            pitch,
            home_attacks,
            phase: Phase::Neutral,
            open_episode: None,
            episodes: Vec::new(),
            events: Vec::new(),
            controlled_time: [0.0, 0.0],
            last_step_s: None,
        }
    }

    fn attack_end(&self, team: TeamSide) -> GoalEnd {
        match team {
            TeamSide::Home => self.home_attacks,
            TeamSide::Away => self.home_attacks.opposite(),
        }
    }

    /// Advance the machine by one frame.
    pub fn step(
        &mut self,
        timestamp_s: f64,
        frame_index: u64,
        ball: Option<&BallSnapshot>,
        players: &[PlayerSnapshot],
    ) {
        let dt = self.last_step_s.map(|last| (timestamp_s - last).max(0.0)).unwrap_or(0.0);
        self.last_step_s = Some(timestamp_s);

        // Controlled time accrues for the phase that held over the interval.
        if let Phase::Controlled { team, .. } = self.phase {
            match team {
                TeamSide::Home => self.controlled_time[0] += dt,
                TeamSide::Away => self.controlled_time[1] += dt,
            }
        }

        let Some(ball) = ball else {
            // Ball unseen this frame: a transit can still time out.
            self.check_transit_timeout(timestamp_s);
            return;
        };

        if self.pitch.is_out_of_bounds(ball.pos) {
            self.resolve_out_of_bounds(timestamp_s, frame_index, ball);
            return;
        }

        // Nearest team player inside the control radius; entities without a
        // team assignment cannot anchor possession.
        let controller = players
            .iter()
            .filter(|p| p.team.is_some())
            .map(|p| (p, geometry::distance_m(p.pos, ball.pos)))
            .filter(|(_, d)| *d <= self.config.control_radius_m)
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(p, _)| p);

        match self.phase {
            Phase::Neutral => {
                if let Some(player) = controller {
                    if ball.speed < self.config.control_speed_mps {
                        self.gain_control(timestamp_s, frame_index, player, ball, None);
                    }
                }
            }
            Phase::Controlled { player, team } => {
                let away_from_controller = players
                    .iter()
                    .find(|p| p.track_id == player)
                    .map(|p| {
                        geometry::dot(
                            ball.velocity,
                            (ball.pos.0 - p.pos.0, ball.pos.1 - p.pos.1),
                        ) > 0.0
                    })
                    .unwrap_or(true);

                if ball.speed > self.config.kick_speed_mps && away_from_controller {
                    self.launch(timestamp_s, frame_index, player, team, ball, true);
                } else if let Some(new_controller) = controller {
                    if new_controller.track_id != player
                        && ball.speed < self.config.control_speed_mps
                    {
                        // Direct takeover without a kick (tackle, pickup).
                        self.gain_control(timestamp_s, frame_index, new_controller, ball, None);
                    }
                } else {
                    // Ball drifted out of everyone's reach below the kick
                    // threshold: ambiguous departure, no event can follow.
                    self.phase = Phase::InTransit {
                        from_player: player,
                        from_team: team,
                        launch_pos: ball.pos,
                        launch_s: timestamp_s,
                        launch_frame: frame_index,
                        kicked: false,
                        pending_shot: None,
                    };
                }
            }
            Phase::InTransit {
                from_player,
                from_team,
                launch_pos,
                launch_s,
                launch_frame,
                kicked,
                ..
            } => {
                if let Some(receiver) = controller {
                    if ball.speed < self.config.control_speed_mps {
                        // Intervening control cancels any pending shot.
                        let pass = (receiver.track_id != from_player && kicked)
                            .then_some((from_player, from_team, launch_pos));
                        self.gain_control(timestamp_s, frame_index, receiver, ball, pass);
                        return;
                    }
                }
                if !kicked && ball.speed > self.config.kick_speed_mps {
                    // An ambiguous departure resolves into a kick once the
                    // smoothed ball speed clears the threshold while still
                    // departing from where control was lost.
                    let departing = geometry::dot(
                        ball.velocity,
                        (ball.pos.0 - launch_pos.0, ball.pos.1 - launch_pos.1),
                    ) >= 0.0;
                    if departing {
                        self.phase = Phase::InTransit {
                            from_player,
                            from_team,
                            launch_pos,
                            launch_s,
                            launch_frame,
                            kicked: true,
                            pending_shot: self.shot_candidate(from_team, ball),
                        };
                    }
                }
                self.check_transit_timeout(timestamp_s);
            }
        }
    }

    fn check_transit_timeout(&mut self, timestamp_s: f64) {
        if let Phase::InTransit { launch_s, .. } = self.phase {
            if timestamp_s - launch_s > self.config.transit_timeout_s {
                // Loose ball: nobody reached it in time. A shot candidate
                // that died in open play is still a shot attempt.
                self.emit_pending_shot();
                self.close_episode(timestamp_s, EpisodeOutcome::LooseBall);
                self.phase = Phase::Neutral;
            }
        }
    }

    /// Classify a launch trajectory against the attacking goal region.
    ///
    /// `Some(on_target)` when the ray reaches the goal line within the aim
    /// margin of the mouth; `None` when the launch is not a shot attempt.
    fn shot_candidate(&self, team: TeamSide, ball: &BallSnapshot) -> Option<bool> {
        let end = self.attack_end(team);
        let y = self.pitch.ray_goal_line_crossing(ball.pos, ball.velocity, end)?;
        let (y_min, y_max) = self.pitch.goal_mouth_y();
        let aimed = y >= y_min - self.config.shot_aim_margin_m
            && y <= y_max + self.config.shot_aim_margin_m;
        aimed.then_some((y_min..=y_max).contains(&y))
    }

    /// Emit the deferred shot event carried by an in-transit phase, if any.
    fn emit_pending_shot(&mut self) {
        if let Phase::InTransit {
            from_player,
            from_team,
            launch_pos,
            launch_s,
            launch_frame,
            pending_shot: Some(on_target),
            ..
        } = self.phase
        {
            let event = MatchEvent {
                timestamp_s: launch_s,
                frame_index: launch_frame,
                event_type: EventKind::Shot,
                team: Some(from_team),
                player_track_id: Some(from_player),
                target_track_id: None,
                details: Some(EventDetails {
                    on_target: Some(on_target),
                    ball_position: Some(launch_pos),
                    ..Default::default()
                }),
            };
            self.push_event(event);
        }
    }

    /// A new controller takes the ball. Opens/extends/rotates the episode
    /// and emits pass / possession-change events as warranted.
    fn gain_control(
        &mut self,
        timestamp_s: f64,
        frame_index: u64,
        receiver: &PlayerSnapshot,
        ball: &BallSnapshot,
        completed_pass: Option<(TrackId, TeamSide, PitchPos)>,
    ) {
        // Controller selection filters on team presence already.
        let Some(team) = receiver.team else { return };

        if let Some((from_player, from_team, launch_pos)) = completed_pass {
            let outcome = if from_team == team {
                PassOutcome::Complete
            } else {
                PassOutcome::Intercepted
            };
            let distance = geometry::distance_m(launch_pos, ball.pos);
            let direction = pass_direction(launch_pos, ball.pos, self.attack_end(from_team));
            let event = MatchEvent {
                timestamp_s,
                frame_index,
                event_type: EventKind::Pass,
                team: Some(from_team),
                player_track_id: Some(from_player),
                target_track_id: Some(receiver.track_id),
                details: Some(EventDetails {
                    pass_outcome: Some(outcome),
                    pass_distance_m: Some(distance),
                    pass_range: Some(PassRange::from_distance_m(distance)),
                    pass_direction: Some(direction),
                    on_target: None,
                    ball_position: Some(ball.pos),
                }),
            };
            self.push_event(event);
        }

        let team_changed = match &self.open_episode {
            Some(open) => open.team != team,
            None => true,
        };

        if team_changed {
            self.close_episode(timestamp_s, EpisodeOutcome::Turnover);
            self.open_episode = Some(OpenEpisode {
                team,
                start_s: timestamp_s,
                controllers: vec![receiver.track_id],
                event_indices: Vec::new(),
            });
            let event = MatchEvent {
                timestamp_s,
                frame_index,
                event_type: EventKind::PossessionChange,
                team: Some(team),
                player_track_id: Some(receiver.track_id),
                target_track_id: None,
                details: None,
            };
            self.push_event(event);
        } else if let Some(open) = self.open_episode.as_mut() {
            if open.controllers.last() != Some(&receiver.track_id) {
                open.controllers.push(receiver.track_id);
            }
        }

        self.phase = Phase::Controlled { player: receiver.track_id, team };
    }

    /// The controller launches the ball. A trajectory aimed at the attacking
    /// goal region becomes a shot candidate, resolved once it is clear no
    /// player controlled the ball in between.
    fn launch(
        &mut self,
        timestamp_s: f64,
        frame_index: u64,
        player: TrackId,
        team: TeamSide,
        ball: &BallSnapshot,
        kicked: bool,
    ) {
        let pending_shot = self.shot_candidate(team, ball);

        self.phase = Phase::InTransit {
            from_player: player,
            from_team: team,
            launch_pos: ball.pos,
            launch_s: timestamp_s,
            launch_frame: frame_index,
            kicked,
            pending_shot,
        };
    }

    /// The ball left the field of play: goal if it crossed inside the goal
    /// mouth, otherwise out of play.
    fn resolve_out_of_bounds(&mut self, timestamp_s: f64, frame_index: u64, ball: &BallSnapshot) {
        let last_controller = match self.phase {
            Phase::Controlled { player, team } => Some((player, team)),
            Phase::InTransit { from_player, from_team, .. } => Some((from_player, from_team)),
            Phase::Neutral => None,
        };

        let in_mouth = self.pitch.is_in_goal_mouth(ball.pos, GoalEnd::Left)
            || self.pitch.is_in_goal_mouth(ball.pos, GoalEnd::Right);

        // A shot candidate resolves here: the ball left play uncontrolled.
        self.emit_pending_shot();

        if in_mouth {
            if let Some((player, team)) = last_controller {
                let event = MatchEvent {
                    timestamp_s,
                    frame_index,
                    event_type: EventKind::Goal,
                    team: Some(team),
                    player_track_id: Some(player),
                    target_track_id: None,
                    details: Some(EventDetails {
                        ball_position: Some(ball.pos),
                        ..Default::default()
                    }),
                };
                self.push_event(event);
            }
            self.close_episode(timestamp_s, EpisodeOutcome::Goal);
        } else if self.open_episode.is_some() {
            self.close_episode(timestamp_s, EpisodeOutcome::OutOfPlay);
        }
        self.phase = Phase::Neutral;
    }

    fn push_event(&mut self, event: MatchEvent) {
        if let Some(open) = self.open_episode.as_mut() {
            open.event_indices.push(self.events.len());
        }
        self.events.push(event);
    }

    fn close_episode(&mut self, end_s: f64, outcome: EpisodeOutcome) {
        if let Some(open) = self.open_episode.take() {
            self.episodes.push(PossessionEpisode {
                team: open.team,
                start_s: open.start_s,
                end_s,
                controllers: open.controllers,
                event_indices: open.event_indices,
                outcome,
            });
        }
    }

    /// Close any open episode and hand over the finalized output.
    pub fn finalize(mut self, end_s: f64) -> PossessionSummary {
        self.close_episode(end_s, EpisodeOutcome::EndOfStream);
        PossessionSummary {
            episodes: self.episodes,
            events: self.events,
            controlled_time_home_s: self.controlled_time[0],
            controlled_time_away_s: self.controlled_time[1],
        }
    }
}

/// Direction of a pass relative to the passing team's attacking end.
fn pass_direction(from: PitchPos, to: PitchPos, attack_end: GoalEnd) -> PassDirection {
    let raw_dx = to.0 - from.0;
    let dx = match attack_end {
        GoalEnd::Right => raw_dx,
        GoalEnd::Left => -raw_dx,
    };
    let dy = to.1 - from.1;
    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            PassDirection::Forward
        } else {
            PassDirection::Backward
        }
    } else {
        PassDirection::Lateral
    }
}

//! Pitch model: real-world dimensions, goal mouths, and the zone partition.
//!
//! The model is immutable configuration, constructed once and passed
//! explicitly into every component that needs it.

pub mod constants;
pub mod geometry;
pub mod zone;

use serde::{Deserialize, Serialize};

pub use geometry::{PitchPos, PixelPos};
pub use zone::ZonePartition;

/// Which goal line a team attacks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalEnd {
    /// Goal line at x = 0
    Left,
    /// Goal line at x = length_m
    Right,
}

impl GoalEnd {
    pub fn opposite(self) -> Self {
        match self {
            GoalEnd::Left => GoalEnd::Right,
            GoalEnd::Right => GoalEnd::Left,
        }
    }
}

/// Fixed real-world pitch dimensions and tactical zone partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PitchModel {
    /// Pitch length in meters (goal line to goal line)
    pub length_m: f32,
    /// Pitch width in meters (touchline to touchline)
    pub width_m: f32,
    /// Goal mouth width in meters
    pub goal_width_m: f32,
    /// Zone partition used for occupancy aggregation
    pub zones: ZonePartition,
}

impl Default for PitchModel {
    fn default() -> Self {
        Self {
            length_m: constants::field::LENGTH_M,
            width_m: constants::field::WIDTH_M,
            goal_width_m: constants::goal::WIDTH_M,
            zones: ZonePartition::default(),
        }
    }
}

impl PitchModel {
    /// Pitch center point.
    pub fn center(&self) -> PitchPos {
        (self.length_m * 0.5, self.width_m * 0.5)
    }

    /// Check if a position is outside the field of play.
    pub fn is_out_of_bounds(&self, pos: PitchPos) -> bool {
        pos.0 < 0.0 || pos.0 > self.length_m || pos.1 < 0.0 || pos.1 > self.width_m
    }

    /// X coordinate of the given goal line.
    pub fn goal_line_x(&self, end: GoalEnd) -> f32 {
        match end {
            GoalEnd::Left => 0.0,
            GoalEnd::Right => self.length_m,
        }
    }

    /// Y range of the goal mouth (inclusive).
    pub fn goal_mouth_y(&self) -> (f32, f32) {
        let half = self.goal_width_m * 0.5;
        let center_y = self.width_m * 0.5;
        (center_y - half, center_y + half)
    }

    /// Check whether a position lies behind the given goal line and inside
    /// the goal mouth width.
    pub fn is_in_goal_mouth(&self, pos: PitchPos, end: GoalEnd) -> bool {
        let (y_min, y_max) = self.goal_mouth_y();
        if pos.1 < y_min || pos.1 > y_max {
            return false;
        }
        match end {
            GoalEnd::Left => pos.0 <= 0.0,
            GoalEnd::Right => pos.0 >= self.length_m,
        }
    }

    /// Y coordinate where a velocity ray from `from` crosses the given goal
    /// line, if it is moving toward that line at all.
    pub fn ray_goal_line_crossing(
        &self,
        from: PitchPos,
        velocity: (f32, f32),
        end: GoalEnd,
    ) -> Option<f32> {
        let goal_x = self.goal_line_x(end);
        let dx = goal_x - from.0;
        // Must actually be moving toward the goal line
        if velocity.0.abs() < 1e-6 || dx * velocity.0 <= 0.0 {
            return None;
        }
        let t = dx / velocity.0;
        Some(from.1 + velocity.1 * t)
    }

    /// Check whether a velocity ray from `from` intersects the goal mouth of
    /// the given end.
    ///
    /// Used to classify shots at launch: on-target means the trajectory,
    /// extended to the goal line, crosses inside the goal width.
    pub fn ray_hits_goal_mouth(&self, from: PitchPos, velocity: (f32, f32), end: GoalEnd) -> bool {
        let (y_min, y_max) = self.goal_mouth_y();
        self.ray_goal_line_crossing(from, velocity, end)
            .map_or(false, |y| (y_min..=y_max).contains(&y))
    }

    /// Map a position to its zone index.
    pub fn zone_index(&self, pos: PitchPos) -> usize {
        self.zones.zone_index(pos, self.length_m, self.width_m)
    }

    /// Total number of tactical zones.
    pub fn zone_count(&self) -> usize {
        self.zones.zone_count()
    }
}

//! Pitch zone partition for tactical occupancy.
//!
//! The pitch is divided into a grid of length bands x width bands. The
//! default 3x3 partition gives the familiar thirds (defensive/middle/
//! attacking) crossed with channels (left/center/right).

use serde::{Deserialize, Serialize};

use super::geometry::PitchPos;

/// Grid partition of the pitch into tactical zones.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ZonePartition {
    /// Number of bands along the length axis (goal to goal)
    pub length_bands: u8,
    /// Number of bands along the width axis (touchline to touchline)
    pub width_bands: u8,
}

impl Default for ZonePartition {
    fn default() -> Self {
        // Thirds x channels
        Self { length_bands: 3, width_bands: 3 }
    }
}

impl ZonePartition {
    /// Total number of zones in the partition.
    pub fn zone_count(&self) -> usize {
        self.length_bands as usize * self.width_bands as usize
    }

    /// Map a pitch position to a zone index in `0..zone_count()`.
    ///
    /// Positions outside the pitch are clamped to the nearest edge zone so
    /// occupancy counting stays total.
    pub fn zone_index(&self, pos: PitchPos, length_m: f32, width_m: f32) -> usize {
        let lb = self.length_bands as usize;
        let wb = self.width_bands as usize;

        let band_x = ((pos.0 / length_m) * lb as f32).floor() as isize;
        let band_y = ((pos.1 / width_m) * wb as f32).floor() as isize;

        let band_x = band_x.clamp(0, lb as isize - 1) as usize;
        let band_y = band_y.clamp(0, wb as isize - 1) as usize;

        band_x * wb + band_y
    }
}

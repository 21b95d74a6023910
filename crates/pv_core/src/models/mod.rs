//! External-facing data model: detections in, events out.

pub mod detection;
pub mod events;

pub use detection::{Detection, DetectionClass, FrameDetections, TeamSide};
pub use events::{EventDetails, EventKind, MatchEvent, PassDirection, PassOutcome, PassRange};

/// Persistent track identifier. Strictly increasing, never reused.
pub type TrackId = u32;

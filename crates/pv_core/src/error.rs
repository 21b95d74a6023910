use thiserror::Error;

/// Calibration failures are fatal at pipeline construction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("homography matrix is singular (determinant {determinant:e})")]
    SingularMatrix { determinant: f64 },

    #[error("homography matrix contains non-finite entries")]
    NonFiniteMatrix,

    #[error("reference points are degenerate: {reason}")]
    DegeneratePoints { reason: String },

    #[error("pixel scale must be positive, got {scale}")]
    InvalidScale { scale: f64 },

    #[error("homography estimation failed: {0}")]
    EstimationFailure(String),
}

/// Stream-ordering violations are fatal for the stream being processed;
/// the caller may resubmit a corrected stream to a fresh pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SequenceError {
    #[error("out-of-order frame: timestamp {got}s after {last}s")]
    OutOfOrderTimestamp { last: f64, got: f64 },

    #[error("duplicate frame timestamp {timestamp}s")]
    DuplicateTimestamp { timestamp: f64 },

    #[error("out-of-order frame index: {got} after {last}")]
    OutOfOrderFrame { last: u64, got: u64 },
}

/// Top-level error type for the analytics core.
///
/// Per-frame detection anomalies are deliberately absent: they are absorbed
/// internally (logged, skipped, counted) and never surface as errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalyticsError {
    /// Fatal errors abort the single stream being processed, never global
    /// process state.
    pub fn is_fatal(&self) -> bool {
        match self {
            AnalyticsError::Calibration(_) => true,
            AnalyticsError::Sequence(_) => true,
            AnalyticsError::InvalidConfig(_) => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

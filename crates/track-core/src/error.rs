//! Error taxonomy shared by the geometry, segment and transform layers.

use thiserror::Error;

/// Failures raised while building or querying plans and tracks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackError {
    /// Bearing between coincident points, non-finite coordinates, or a
    /// division by a near-zero distance or airspeed.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// Index outside its owning list, or a distance/time beyond the path.
    #[error("out of range: {0}")]
    OutOfRange(String),
    /// No segment of a path can claim the given waypoint.
    #[error("no segment found for waypoint {0}")]
    NotFound(i64),
    /// Track failed validation or a relocation exceeded its sanity bound.
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
}

impl TrackError {
    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        TrackError::DegenerateGeometry(msg.into())
    }

    pub(crate) fn index(index: usize, len: usize) -> Self {
        TrackError::OutOfRange(format!("index {} (len {})", index, len))
    }

    pub(crate) fn integrity(msg: impl Into<String>) -> Self {
        TrackError::IntegrityViolation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, TrackError>;

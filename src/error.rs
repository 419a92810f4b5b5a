//! Error types for orchestration failures.
//!
//! Only caller mistakes surface here: a missing account, a trail or spot
//! that cannot be resolved, malformed input. Normal game outcomes such as
//! "nothing in range" are empty results, never errors.

use thiserror::Error;

/// Result type for trail-core operations.
pub type TrailResult<T> = Result<T, TrailError>;

/// Errors returned to the orchestration layer.
#[derive(Debug, Error)]
pub enum TrailError {
    /// The request carried no account id.
    #[error("missing account id")]
    MissingAccount,

    /// A trail id could not be resolved.
    #[error("unknown trail: {0}")]
    UnknownTrail(String),

    /// A spot id referenced by a trail or discovery could not be resolved.
    #[error("unknown spot: {0}")]
    UnknownSpot(String),

    /// Latitude or longitude outside the valid range, or not finite.
    #[error("invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// GPX input could not be parsed.
    #[error("GPX parse error: {0}")]
    Gpx(String),

    /// JSON input or output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A JNI call into the host VM failed.
    #[error("JNI error: {0}")]
    Jni(#[from] jni::errors::Error),

    /// The discovery or scan store rejected a write.
    #[error("store error: {0}")]
    Store(String),
}

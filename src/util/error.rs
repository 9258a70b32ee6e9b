//! Error types for starconvex.

use thiserror::Error;

/// Result alias for starconvex operations.
pub type StarConvexResult<T> = std::result::Result<T, StarConvexError>;

/// Errors that can occur when selecting, suppressing, or rendering shapes.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StarConvexError {
    /// A spatial shape has a zero-sized axis or overflows `usize`.
    #[error("invalid dimensions {shape:?}")]
    InvalidDimensions { shape: Vec<usize> },
    /// The backing buffer is shorter than the declared shape requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Two inputs that must agree in shape do not.
    #[error("shape mismatch for {context}: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// The ray count cannot produce a valid ray set.
    #[error("invalid ray count {n_rays}: {reason}")]
    InvalidRays { n_rays: usize, reason: &'static str },
    /// The subsampling grid is inconsistent with the arrays it describes.
    #[error("invalid grid {grid:?}: {reason}")]
    InvalidGrid {
        grid: Vec<usize>,
        reason: &'static str,
    },
    /// A probability or overlap threshold is outside its valid range.
    #[error("invalid threshold {name} = {value}")]
    InvalidThreshold { name: &'static str, value: f32 },
    /// The overlap sentinel would be indistinguishable from an object id.
    #[error("overlap label {label} collides with object ids 1..={objects}")]
    OverlapLabelCollision { label: i32, objects: usize },
    /// More candidates survived thresholding than the configured limit.
    #[error("too many candidates: {count} exceeds limit {limit}")]
    TooManyCandidates { count: usize, limit: usize },
    /// An index is outside the valid range.
    #[error("index {index} out of bounds for {context} (len {len})")]
    IndexOutOfBounds {
        index: usize,
        len: usize,
        context: &'static str,
    },
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// The requested feature is not available in this build.
    #[error("not supported: {0}")]
    NotSupported(&'static str),
}

//! Error types for patchsearch.

use thiserror::Error;

/// Result alias for patchsearch operations.
pub type PatchSearchResult<T> = std::result::Result<T, PatchSearchError>;

/// Errors that can occur while configuring or running a patch search.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PatchSearchError {
    /// The search parameters or collaborator inputs are inconsistent.
    ///
    /// Raised before any search work starts; retrying with the same
    /// arguments fails the same way.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    /// An axis of the volume is smaller than the patch extent along it.
    #[error("degenerate window: axis of size {dim} cannot hold a patch of size {patch}")]
    DegenerateWindow { dim: usize, patch: usize },
    /// Zero-sized or overflowing volume dimensions.
    #[error("invalid dimensions: {frames}x{channels}x{height}x{width}")]
    InvalidDimensions {
        frames: usize,
        channels: usize,
        height: usize,
        width: usize,
    },
    /// A backing buffer is shorter than its declared shape.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A reference or match index does not anchor a patch inside the volume.
    #[error("index {index} does not anchor a patch inside the volume")]
    PatchOutOfBounds { index: usize },
    /// Output buffer length does not match the gathered patch count.
    #[error("output length mismatch: expected {expected}, got {got}")]
    OutputLengthMismatch { expected: usize, got: usize },
    /// A batch lane stopped abnormally; the whole batched call is void.
    #[error("execution lane {lane} failed")]
    LaneFailure { lane: usize },
}

//! Error types for the selection engines.
//!
//! Only configuration and programming errors are reported here. Out-of-range
//! points are clamped, exhausted searches fall back to straight lines, and
//! degenerate selections are valid results.

use thiserror::Error;

/// Errors that can occur while configuring or driving a selection engine
#[derive(Debug, Error)]
pub enum SelectionError {
    /// Raster or mask slice does not match the declared dimensions
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    /// Raster view does not carry RGBA pixels
    #[error("unsupported channel count: expected 4, got {0}")]
    ChannelCount(usize),

    /// Raster view is not laid out row-major in memory
    #[error("raster view is not contiguous")]
    NonContiguous,

    /// Unknown gradient operator name
    #[error("unknown edge kernel: {0}")]
    UnknownKernel(String),

    /// Unknown search algorithm name
    #[error("unknown search algorithm: {0}")]
    UnknownAlgorithm(String),

    /// Unknown region expansion shape name
    #[error("unknown expansion shape: {0}")]
    UnknownShape(String),

    /// Unknown lasso variation name
    #[error("unknown lasso variation: {0}")]
    UnknownVariation(String),

    /// Unknown elastic strength curve name
    #[error("unknown elastic curve: {0}")]
    UnknownCurve(String),

    /// Pixel connectivity other than 4 or 8
    #[error("invalid connectivity: {0} (expected 4 or 8)")]
    InvalidConnectivity(u32),

    /// Option values outside their valid range
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Lasso operation called in a state that does not allow it
    #[error("cannot {operation} while lasso session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
}

/// Result type for selection operations
pub type SelectionResult<T> = Result<T, SelectionError>;

//! Error types for layout operations.

use thiserror::Error;

/// Errors that can occur around a layout run.
///
/// The simulation itself never fails: degenerate numbers are floored or
/// propagated as NaN. Errors only come from validating inputs and from I/O.
#[derive(Error, Debug)]
pub enum LayoutError {
    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The graph references nodes that do not exist.
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// No layout has been computed yet.
    #[error("Layout not initialized")]
    NotInitialized,

    /// I/O error while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to encode a PNG snapshot.
    #[cfg(feature = "png")]
    #[error("Image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

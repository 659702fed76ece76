//! Error types for the screenshot pipeline

use thiserror::Error;

/// Result type alias for screenshot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or taking a screenshot
///
/// Every error is terminal for the call that produced it; nothing in this
/// crate retries.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration value or save target was malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request cannot run: bad URL or missing engine binary
    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    /// The engine ran but left no usable output file
    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    /// Cropping or re-encoding the captured image failed
    #[error("Post-processing failed: {0}")]
    PostProcessFailed(String),

    /// Filesystem or process spawn error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::PostProcessFailed(err.to_string())
    }
}

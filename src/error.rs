//! Error types for pdf-cropper

use thiserror::Error;

/// Result type alias for pdf-cropper
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for pdf-cropper
#[derive(Error, Debug)]
pub enum Error {
    /// Input stream is not a structurally valid PDF
    #[error("Invalid PDF file: {reason}")]
    Parse { reason: String },

    /// Page index outside [1, total]
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: usize, total: usize },

    /// Structural failure while serializing the output document
    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested backend not compiled in, or no backend available at all
    #[error("No usable PDF backend: {reason}")]
    MissingBackend { reason: String },

    /// Document and writer were created by different backends
    #[error("Backend mismatch: document is {document}, writer is {writer}")]
    BackendMismatch {
        document: &'static str,
        writer: &'static str,
    },

    /// Strict mode only: crop margins yield an inverted or zero-area page
    #[error("Degenerate crop on page {page}: margins remove the whole page")]
    DegenerateCrop { page: usize },
}

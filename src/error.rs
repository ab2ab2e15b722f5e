//! Error types for QR generation and its surrounding plumbing

use thiserror::Error;

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating or handing off a QR fragment
#[derive(Error, Debug)]
pub enum Error {
    /// The request failed validation before any rendering was attempted
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The encoder produced no usable vector output within the settle window
    #[error("Encoder produced no output: {0}")]
    EncoderProduceFailure(String),

    /// No measurable QR geometry was found in the encoder output
    #[error("Empty geometry: {0}")]
    EmptyGeometry(String),

    /// The rewritten fragment could not be written out as text
    #[error("Serialization failed: {0}")]
    SerializationFailure(String),

    /// Persisted settings could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),

    /// A panel was requested while the host has no open document
    #[error("No document found; open a document first")]
    NoDocument,

    /// The host refused a window operation
    #[error("Window error: {0}")]
    Window(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Settings(err.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::SerializationFailure(err.to_string())
    }
}

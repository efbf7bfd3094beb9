//! Error types for the lesion core library.

use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the lesion library.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed LIF container
    #[error("Format error: {0}")]
    Format(String),

    /// Embedded metadata document error
    #[error("Metadata error: {0}")]
    Metadata(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Series index out of range
    #[error("Series {requested} not found ({available} series in file)")]
    SeriesNotFound { requested: usize, available: usize },

    /// Channel index out of range
    #[error("Channel {requested} out of range ({available} channels)")]
    ChannelOutOfRange { requested: usize, available: usize },

    /// Plane selection out of range
    #[error("Selection error: {0}")]
    Selection(String),

    /// Series name does not follow the acquisition naming convention
    #[error("Unrecognized series name: {0}")]
    SeriesName(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image export error
    #[error("Export error: {0}")]
    Export(String),

    /// Fixture retrieval error
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Metadata(err.to_string())
    }
}

impl From<png::EncodingError> for Error {
    fn from(err: png::EncodingError) -> Self {
        Error::Export(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
